//! In-memory row source, used by tests and by callers that assemble events
//! programmatically.

use std::collections::BTreeMap;

use rge_core::{BankRows, Column, Error, EventRows, FieldDef, PrimitiveType, Result, RowSource};

use crate::schema::{BankRegistry, BankSchema};

/// Row source backed by a vector of events.
#[derive(Debug, Clone, Default)]
pub struct MemoryEventSource {
    schemas: BTreeMap<String, Vec<FieldDef>>,
    events: Vec<EventRows>,
    cursor: usize,
}

impl MemoryEventSource {
    /// Empty source with no banks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Source declaring every bank of `registry`.
    pub fn from_registry(registry: &BankRegistry) -> Self {
        let schemas = registry
            .schemas()
            .map(|s| (s.name().to_string(), s.fields().to_vec()))
            .collect();
        Self { schemas, events: Vec::new(), cursor: 0 }
    }

    /// Declare (or redeclare) one bank.
    pub fn with_schema(mut self, bank: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        self.schemas.insert(bank.into(), fields);
        self
    }

    /// Stop declaring one bank.
    pub fn without_bank(mut self, bank: &str) -> Self {
        self.schemas.remove(bank);
        self
    }

    /// Append an event.
    pub fn push_event(&mut self, event: EventRows) {
        self.events.push(event);
    }
}

impl RowSource for MemoryEventSource {
    fn schema(&self, bank: &str) -> Option<&[FieldDef]> {
        self.schemas.get(bank).map(Vec::as_slice)
    }

    fn n_events(&self) -> u64 {
        self.events.len() as u64
    }

    fn read_event(&mut self, rows: &mut EventRows) -> Result<bool> {
        let Some(event) = self.events.get(self.cursor) else {
            return Ok(false);
        };
        rows.clone_from(event);
        self.cursor += 1;
        Ok(true)
    }
}

/// Build one bank's rows from sparse records.
///
/// Each record lists `(field, value)` pairs; unlisted fields are zero. Values
/// are cast to the schema type of the field. A name the schema does not know
/// is [`Error::FieldNotFound`]. Handy for hand-written events.
pub fn bank_rows(schema: &BankSchema, records: &[&[(&str, f64)]]) -> Result<BankRows> {
    for (name, _) in records.iter().flat_map(|rec| rec.iter()) {
        if schema.field_index(name).is_none() {
            return Err(Error::FieldNotFound { bank: schema.name().to_string(), field: name.to_string() });
        }
    }

    let mut rows = BankRows::new();
    for (i, field) in schema.fields().iter().enumerate() {
        let values = records.iter().map(|rec| {
            rec.iter().find(|(name, _)| schema.field_index(name) == Some(i)).map_or(0.0, |&(_, v)| v)
        });
        let column = match field.kind {
            PrimitiveType::Byte => Column::Byte(values.map(|v| v as i8).collect()),
            PrimitiveType::Short => Column::Short(values.map(|v| v as i16).collect()),
            PrimitiveType::Int => Column::Int(values.map(|v| v as i32).collect()),
            PrimitiveType::Float => Column::Float(values.map(|v| v as f32).collect()),
        };
        rows.fields.push((field.name.clone(), column));
    }
    Ok(rows)
}
