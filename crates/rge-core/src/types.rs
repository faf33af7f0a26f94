//! Common data types shared by bank sources, the reconstruction pipeline and sinks

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Primitive storage type of one bank field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    /// 8-bit signed integer.
    Byte,
    /// 16-bit signed integer.
    Short,
    /// 32-bit signed integer.
    Int,
    /// 32-bit float.
    Float,
}

impl PrimitiveType {
    /// Lowercase type name used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveType::Byte => "byte",
            PrimitiveType::Short => "short",
            PrimitiveType::Int => "int",
            PrimitiveType::Float => "float",
        }
    }
}

/// Name and type of one field, as declared by a schema or a row source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldDef {
    /// Short field name (`pindex`), without the bank prefix.
    pub name: String,
    /// Storage type.
    pub kind: PrimitiveType,
}

impl FieldDef {
    /// Create a field definition.
    pub fn new(name: impl Into<String>, kind: PrimitiveType) -> Self {
        Self { name: name.into(), kind }
    }
}

/// One field value, tagged with its storage type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    /// Byte value.
    Byte(i8),
    /// Short value.
    Short(i16),
    /// Int value.
    Int(i32),
    /// Float value.
    Float(f32),
}

impl FieldValue {
    /// Storage type of this value.
    pub fn kind(self) -> PrimitiveType {
        match self {
            FieldValue::Byte(_) => PrimitiveType::Byte,
            FieldValue::Short(_) => PrimitiveType::Short,
            FieldValue::Int(_) => PrimitiveType::Int,
            FieldValue::Float(_) => PrimitiveType::Float,
        }
    }

    /// Widen to `f64`. Always exact.
    pub fn to_f64(self) -> f64 {
        match self {
            FieldValue::Byte(v) => f64::from(v),
            FieldValue::Short(v) => f64::from(v),
            FieldValue::Int(v) => f64::from(v),
            FieldValue::Float(v) => f64::from(v),
        }
    }

    /// Widen to `i32`. `None` for float fields.
    pub fn to_i32(self) -> Option<i32> {
        match self {
            FieldValue::Byte(v) => Some(i32::from(v)),
            FieldValue::Short(v) => Some(i32::from(v)),
            FieldValue::Int(v) => Some(v),
            FieldValue::Float(_) => None,
        }
    }

    /// Widen to `u32`. `None` for float fields and negative values.
    pub fn to_u32(self) -> Option<u32> {
        self.to_i32().and_then(|v| u32::try_from(v).ok())
    }
}

/// Values of one field for every row of one bank in one event.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Byte column.
    Byte(Vec<i8>),
    /// Short column.
    Short(Vec<i16>),
    /// Int column.
    Int(Vec<i32>),
    /// Float column.
    Float(Vec<f32>),
}

impl Column {
    /// Empty column of the given type.
    pub fn empty(kind: PrimitiveType) -> Self {
        match kind {
            PrimitiveType::Byte => Column::Byte(Vec::new()),
            PrimitiveType::Short => Column::Short(Vec::new()),
            PrimitiveType::Int => Column::Int(Vec::new()),
            PrimitiveType::Float => Column::Float(Vec::new()),
        }
    }

    /// Storage type.
    pub fn kind(&self) -> PrimitiveType {
        match self {
            Column::Byte(_) => PrimitiveType::Byte,
            Column::Short(_) => PrimitiveType::Short,
            Column::Int(_) => PrimitiveType::Int,
            Column::Float(_) => PrimitiveType::Float,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        match self {
            Column::Byte(v) => v.len(),
            Column::Short(v) => v.len(),
            Column::Int(v) => v.len(),
            Column::Float(v) => v.len(),
        }
    }

    /// `true` if the column has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value at `row`, or `None` past the end.
    pub fn get(&self, row: usize) -> Option<FieldValue> {
        match self {
            Column::Byte(v) => v.get(row).map(|&x| FieldValue::Byte(x)),
            Column::Short(v) => v.get(row).map(|&x| FieldValue::Short(x)),
            Column::Int(v) => v.get(row).map(|&x| FieldValue::Int(x)),
            Column::Float(v) => v.get(row).map(|&x| FieldValue::Float(x)),
        }
    }

    /// Drop all rows, keeping the allocation.
    pub fn clear(&mut self) {
        match self {
            Column::Byte(v) => v.clear(),
            Column::Short(v) => v.clear(),
            Column::Int(v) => v.clear(),
            Column::Float(v) => v.clear(),
        }
    }

    /// Replace the contents with a copy of `other`, reusing the allocation.
    ///
    /// Returns `false` (and leaves `self` untouched) if the types differ.
    pub fn copy_from(&mut self, other: &Column) -> bool {
        match (self, other) {
            (Column::Byte(dst), Column::Byte(src)) => {
                dst.clear();
                dst.extend_from_slice(src);
            }
            (Column::Short(dst), Column::Short(src)) => {
                dst.clear();
                dst.extend_from_slice(src);
            }
            (Column::Int(dst), Column::Int(src)) => {
                dst.clear();
                dst.extend_from_slice(src);
            }
            (Column::Float(dst), Column::Float(src)) => {
                dst.clear();
                dst.extend_from_slice(src);
            }
            _ => return false,
        }
        true
    }
}

/// Row data of one bank in one event, as delivered by a row source.
///
/// Fields are kept in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BankRows {
    /// `(field name, values)` pairs.
    pub fields: Vec<(String, Column)>,
}

impl BankRows {
    /// Empty bank rows.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field column.
    pub fn with_field(mut self, name: impl Into<String>, column: Column) -> Self {
        self.fields.push((name.into(), column));
        self
    }

    /// Find a column by field name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }
}

/// All bank rows of one event, keyed by bank id (`REC::Particle`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventRows {
    banks: BTreeMap<String, BankRows>,
}

impl EventRows {
    /// Empty event.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove every bank.
    pub fn clear(&mut self) {
        self.banks.clear();
    }

    /// Insert (or replace) the rows of one bank.
    pub fn insert(&mut self, bank: impl Into<String>, rows: BankRows) {
        self.banks.insert(bank.into(), rows);
    }

    /// Builder-style [`EventRows::insert`].
    pub fn with_bank(mut self, bank: impl Into<String>, rows: BankRows) -> Self {
        self.insert(bank, rows);
        self
    }

    /// Rows of one bank, if the event carries it.
    pub fn bank(&self, bank: &str) -> Option<&BankRows> {
        self.banks.get(bank)
    }

    /// Bank ids present in this event.
    pub fn bank_ids(&self) -> impl Iterator<Item = &str> {
        self.banks.keys().map(String::as_str)
    }
}

/// Number of fields in an [`OutputRecord`].
pub const OUTPUT_RECORD_LEN: usize = 36;

/// Column names of an [`OutputRecord`], in output order.
pub const OUTPUT_FIELD_NAMES: [&str; OUTPUT_RECORD_LEN] = [
    "run_no",
    "event_no",
    "beam_energy",
    "pid",
    "charge",
    "status",
    "mass",
    "vx",
    "vy",
    "vz",
    "px",
    "py",
    "pz",
    "p",
    "theta",
    "phi",
    "beta",
    "chi2",
    "NDF",
    "e_pcal",
    "e_ecin",
    "e_ecou",
    "e_total",
    "dtof",
    "nphe_ltcc",
    "nphe_htcc",
    "Q2",
    "nu",
    "x_bjorken",
    "y_bjorken",
    "W2",
    "zh",
    "Pt2",
    "Pl2",
    "phiPQ",
    "thetaPQ",
];

/// One accepted particle in one event.
///
/// Angles are in radians, energies and momenta in GeV, lengths in cm and
/// times in ns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct OutputRecord {
    pub run_no: f64,
    pub event_no: f64,
    pub beam_energy: f64,
    pub pid: f64,
    pub charge: f64,
    pub status: f64,
    pub mass: f64,
    pub vx: f64,
    pub vy: f64,
    pub vz: f64,
    pub px: f64,
    pub py: f64,
    pub pz: f64,
    pub p: f64,
    pub theta: f64,
    pub phi: f64,
    pub beta: f64,
    pub chi2: f64,
    pub ndf: f64,
    pub e_pcal: f64,
    pub e_ecin: f64,
    pub e_ecou: f64,
    pub e_total: f64,
    pub dtof: f64,
    pub nphe_ltcc: f64,
    pub nphe_htcc: f64,
    pub q2: f64,
    pub nu: f64,
    pub x_bjorken: f64,
    pub y_bjorken: f64,
    pub w2: f64,
    pub zh: f64,
    pub pt2: f64,
    pub pl2: f64,
    pub phi_pq: f64,
    pub theta_pq: f64,
}

impl OutputRecord {
    /// Values in [`OUTPUT_FIELD_NAMES`] order.
    pub fn to_array(&self) -> [f64; OUTPUT_RECORD_LEN] {
        [
            self.run_no,
            self.event_no,
            self.beam_energy,
            self.pid,
            self.charge,
            self.status,
            self.mass,
            self.vx,
            self.vy,
            self.vz,
            self.px,
            self.py,
            self.pz,
            self.p,
            self.theta,
            self.phi,
            self.beta,
            self.chi2,
            self.ndf,
            self.e_pcal,
            self.e_ecin,
            self.e_ecou,
            self.e_total,
            self.dtof,
            self.nphe_ltcc,
            self.nphe_htcc,
            self.q2,
            self.nu,
            self.x_bjorken,
            self.y_bjorken,
            self.w2,
            self.zh,
            self.pt2,
            self.pl2,
            self.phi_pq,
            self.theta_pq,
        ]
    }

    /// Inverse of [`OutputRecord::to_array`].
    pub fn from_array(v: [f64; OUTPUT_RECORD_LEN]) -> Self {
        Self {
            run_no: v[0],
            event_no: v[1],
            beam_energy: v[2],
            pid: v[3],
            charge: v[4],
            status: v[5],
            mass: v[6],
            vx: v[7],
            vy: v[8],
            vz: v[9],
            px: v[10],
            py: v[11],
            pz: v[12],
            p: v[13],
            theta: v[14],
            phi: v[15],
            beta: v[16],
            chi2: v[17],
            ndf: v[18],
            e_pcal: v[19],
            e_ecin: v[20],
            e_ecou: v[21],
            e_total: v[22],
            dtof: v[23],
            nphe_ltcc: v[24],
            nphe_htcc: v[25],
            q2: v[26],
            nu: v[27],
            x_bjorken: v[28],
            y_bjorken: v[29],
            w2: v[30],
            zh: v[31],
            pt2: v[32],
            pl2: v[33],
            phi_pq: v[34],
            theta_pq: v[35],
        }
    }
}
