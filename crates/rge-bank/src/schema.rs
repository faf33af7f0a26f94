//! Bank schemas and the registry built once at startup.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use rge_core::{Error, FieldDef, PrimitiveType, Result};

/// Reconstructed particle bank.
pub const REC_PARTICLE: &str = "REC::Particle";
/// Drift-chamber track bank.
pub const REC_TRACK: &str = "REC::Track";
/// Electromagnetic calorimeter bank.
pub const REC_CALORIMETER: &str = "REC::Calorimeter";
/// Cherenkov counters bank.
pub const REC_CHERENKOV: &str = "REC::Cherenkov";
/// Scintillator (time-of-flight) bank.
pub const REC_SCINTILLATOR: &str = "REC::Scintillator";
/// Forward micromegas tracker bank.
pub const FMT_TRACKS: &str = "FMT::Tracks";

/// Separator between bank id and field name in a full field address.
pub const ADDRESS_SEPARATOR: &str = "::";

/// Immutable, named set of typed fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankSchema {
    name: String,
    fields: Vec<FieldDef>,
    index: HashMap<String, usize>,
}

impl BankSchema {
    /// Create a schema. Field names must be unique and non-empty.
    pub fn new(name: impl Into<String>, fields: Vec<FieldDef>) -> Result<Self> {
        let name = name.into();
        if fields.is_empty() {
            return Err(Error::SchemaMismatch { bank: name, reason: "schema has no fields".into() });
        }
        let mut index = HashMap::with_capacity(fields.len());
        for (i, f) in fields.iter().enumerate() {
            if f.name.is_empty() || f.name.contains(ADDRESS_SEPARATOR) {
                return Err(Error::SchemaMismatch {
                    bank: name,
                    reason: format!("invalid field name `{}`", f.name),
                });
            }
            if index.insert(f.name.clone(), i).is_some() {
                return Err(Error::SchemaMismatch {
                    bank: name,
                    reason: format!("duplicate field `{}`", f.name),
                });
            }
        }
        Ok(Self { name, fields, index })
    }

    /// Convenience constructor from `(name, type)` pairs.
    pub fn from_pairs(name: &str, pairs: &[(&str, PrimitiveType)]) -> Result<Self> {
        Self::new(name, pairs.iter().map(|&(n, k)| FieldDef::new(n, k)).collect())
    }

    /// Bank id (`REC::Particle`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Always `false`; schemas have at least one field.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Position of a field. Accepts the short name (`pindex`) or the full
    /// address (`REC::Track::pindex`).
    pub fn field_index(&self, field: &str) -> Option<usize> {
        if let Some(&i) = self.index.get(field) {
            return Some(i);
        }
        let short = field.strip_prefix(self.name.as_str())?.strip_prefix(ADDRESS_SEPARATOR)?;
        self.index.get(short).copied()
    }

    /// Full `BANK::VAR` address of field `i`.
    pub fn address(&self, i: usize) -> Option<String> {
        self.fields.get(i).map(|f| format!("{}{}{}", self.name, ADDRESS_SEPARATOR, f.name))
    }

    /// Check that a source declares exactly this schema's fields and types.
    ///
    /// Order is not significant; count, names and types are.
    pub fn check_fields(&self, declared: &[FieldDef]) -> Result<()> {
        if declared.len() != self.fields.len() {
            return Err(self.mismatch(format!(
                "source declares {} fields, schema has {}",
                declared.len(),
                self.fields.len()
            )));
        }
        let mut seen = vec![false; self.fields.len()];
        for d in declared {
            let Some(i) = self.field_index(&d.name) else {
                return Err(self.mismatch(format!("unexpected field `{}`", d.name)));
            };
            if std::mem::replace(&mut seen[i], true) {
                return Err(self.mismatch(format!("field `{}` declared twice", d.name)));
            }
            let expected = self.fields[i].kind;
            if d.kind != expected {
                return Err(self.mismatch(format!(
                    "field `{}` is {}, schema expects {}",
                    d.name,
                    d.kind.name(),
                    expected.name()
                )));
            }
        }
        Ok(())
    }

    pub(crate) fn mismatch(&self, reason: String) -> Error {
        Error::SchemaMismatch { bank: self.name.clone(), reason }
    }
}

/// Explicit registry of every bank schema known to a run.
///
/// Built once at startup and passed by reference; never mutated while events
/// are processed.
#[derive(Debug, Clone, Default)]
pub struct BankRegistry {
    schemas: BTreeMap<String, Arc<BankSchema>>,
}

impl BankRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the six CLAS12 banks used by the ntuple maker.
    pub fn clas12() -> Self {
        use PrimitiveType::{Byte, Float, Int, Short};

        let defs: [(&str, &[(&str, PrimitiveType)]); 6] = [
            (
                REC_PARTICLE,
                &[
                    ("pid", Int),
                    ("px", Float),
                    ("py", Float),
                    ("pz", Float),
                    ("vx", Float),
                    ("vy", Float),
                    ("vz", Float),
                    ("vt", Float),
                    ("charge", Byte),
                    ("beta", Float),
                    ("chi2pid", Float),
                    ("status", Short),
                ],
            ),
            (
                REC_TRACK,
                &[
                    ("index", Short),
                    ("pindex", Short),
                    ("detector", Byte),
                    ("sector", Byte),
                    ("status", Short),
                    ("q", Byte),
                    ("chi2", Float),
                    ("NDF", Short),
                ],
            ),
            (
                REC_CALORIMETER,
                &[
                    ("index", Short),
                    ("pindex", Short),
                    ("detector", Byte),
                    ("sector", Byte),
                    ("layer", Byte),
                    ("energy", Float),
                    ("time", Float),
                    ("path", Float),
                ],
            ),
            (
                REC_CHERENKOV,
                &[
                    ("index", Short),
                    ("pindex", Short),
                    ("detector", Byte),
                    ("sector", Byte),
                    ("nphe", Float),
                    ("time", Float),
                    ("path", Float),
                ],
            ),
            (
                REC_SCINTILLATOR,
                &[
                    ("index", Short),
                    ("pindex", Short),
                    ("detector", Byte),
                    ("sector", Byte),
                    ("layer", Byte),
                    ("component", Short),
                    ("energy", Float),
                    ("time", Float),
                    ("path", Float),
                ],
            ),
            (FMT_TRACKS, &[("pindex", Short), ("layer", Byte), ("status", Byte)]),
        ];

        let mut registry = Self::new();
        for (name, pairs) in defs {
            // Static definitions above are unique and well-formed.
            if let Ok(schema) = BankSchema::from_pairs(name, pairs) {
                registry.schemas.insert(name.to_string(), Arc::new(schema));
            }
        }
        registry
    }

    /// Register a schema. Fails if a schema with the same id exists.
    pub fn register(&mut self, schema: BankSchema) -> Result<()> {
        if self.schemas.contains_key(schema.name()) {
            return Err(Error::Config(format!("bank `{}` registered twice", schema.name())));
        }
        self.schemas.insert(schema.name().to_string(), Arc::new(schema));
        Ok(())
    }

    /// Look up a schema.
    pub fn get(&self, bank: &str) -> Result<Arc<BankSchema>> {
        self.schemas.get(bank).cloned().ok_or_else(|| Error::UnknownSchema(bank.to_string()))
    }

    /// `true` if `bank` is registered.
    pub fn contains(&self, bank: &str) -> bool {
        self.schemas.contains_key(bank)
    }

    /// Registered bank ids, sorted.
    pub fn bank_ids(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    /// Iterate over all schemas.
    pub fn schemas(&self) -> impl Iterator<Item = &Arc<BankSchema>> {
        self.schemas.values()
    }
}
