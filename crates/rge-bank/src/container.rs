//! Schema-bound store of one bank's rows for the current event.

use std::sync::Arc;

use rge_core::{BankRows, Column, Error, EventRows, FieldValue, Result};

use crate::schema::{BankRegistry, BankSchema};

/// One detector bank's rows for the current event.
///
/// Columns are allocated once and refilled every event; a fill either
/// replaces every column or, on error, leaves the previous event untouched.
#[derive(Debug, Clone)]
pub struct BankContainer {
    schema: Arc<BankSchema>,
    n_rows: usize,
    columns: Vec<Column>,
}

impl BankContainer {
    /// Bind an empty container to a registered schema.
    pub fn init(registry: &BankRegistry, bank: &str) -> Result<Self> {
        Ok(Self::from_schema(registry.get(bank)?))
    }

    /// Bind an empty container to `schema`.
    pub fn from_schema(schema: Arc<BankSchema>) -> Self {
        let columns = schema.fields().iter().map(|f| Column::empty(f.kind)).collect();
        Self { schema, n_rows: 0, columns }
    }

    /// Bound schema.
    pub fn schema(&self) -> &BankSchema {
        &self.schema
    }

    /// Bank id.
    pub fn name(&self) -> &str {
        self.schema.name()
    }

    /// Rows in the current event.
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// `true` if the current event has no rows for this bank.
    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    /// Drop the current event's rows.
    pub fn clear(&mut self) {
        for c in &mut self.columns {
            c.clear();
        }
        self.n_rows = 0;
    }

    /// Populate every field from one bank's rows.
    ///
    /// The rows must carry exactly the schema's fields (matched by name), with
    /// the schema's types and a common length.
    pub fn fill(&mut self, rows: &BankRows) -> Result<()> {
        if rows.fields.len() != self.schema.len() {
            return Err(self.schema.mismatch(format!(
                "source provides {} fields, schema has {}",
                rows.fields.len(),
                self.schema.len()
            )));
        }

        let mut sources: Vec<Option<&Column>> = vec![None; self.schema.len()];
        let mut n_rows: Option<usize> = None;
        for (name, column) in &rows.fields {
            let Some(i) = self.schema.field_index(name) else {
                return Err(self.schema.mismatch(format!("unexpected field `{name}`")));
            };
            let expected = self.schema.fields()[i].kind;
            if column.kind() != expected {
                return Err(self.schema.mismatch(format!(
                    "field `{name}` is {}, schema expects {}",
                    column.kind().name(),
                    expected.name()
                )));
            }
            if sources[i].replace(column).is_some() {
                return Err(self.schema.mismatch(format!("field `{name}` provided twice")));
            }
            match n_rows {
                None => n_rows = Some(column.len()),
                Some(n) if n != column.len() => {
                    return Err(self.schema.mismatch(format!(
                        "field `{name}` has {} rows, expected {n}",
                        column.len()
                    )));
                }
                Some(_) => {}
            }
        }

        for (dst, src) in self.columns.iter_mut().zip(sources) {
            // Every slot is filled: counts match and duplicates were rejected.
            if let Some(src) = src {
                dst.copy_from(src);
            }
        }
        self.n_rows = n_rows.unwrap_or(0);
        Ok(())
    }

    /// Fill from a whole event. A bank absent from the event yields zero rows.
    pub fn fill_from_event(&mut self, event: &EventRows) -> Result<()> {
        match event.bank(self.schema.name()) {
            Some(rows) => self.fill(rows),
            None => {
                self.clear();
                Ok(())
            }
        }
    }

    fn column(&self, field: &str) -> Result<&Column> {
        let i = self.schema.field_index(field).ok_or_else(|| Error::FieldNotFound {
            bank: self.schema.name().to_string(),
            field: field.to_string(),
        })?;
        Ok(&self.columns[i])
    }

    /// Number of values stored for `field`; equals [`BankContainer::n_rows`].
    pub fn field_len(&self, field: &str) -> Result<usize> {
        Ok(self.column(field)?.len())
    }

    /// Raw tagged value.
    pub fn value(&self, field: &str, row: usize) -> Result<FieldValue> {
        let column = self.column(field)?;
        if row >= self.n_rows {
            return Err(Error::IndexOutOfRange {
                bank: self.schema.name().to_string(),
                row,
                rows: self.n_rows,
            });
        }
        column.get(row).ok_or_else(|| Error::IndexOutOfRange {
            bank: self.schema.name().to_string(),
            row,
            rows: column.len(),
        })
    }

    /// Value widened to `f64`.
    pub fn get_double(&self, field: &str, row: usize) -> Result<f64> {
        Ok(self.value(field, row)?.to_f64())
    }

    /// Value widened to `i32`. Float fields are rejected.
    pub fn get_int(&self, field: &str, row: usize) -> Result<i32> {
        self.value(field, row)?.to_i32().ok_or_else(|| self.lossy(field, "int"))
    }

    /// Value widened to `u32`. Float fields and negative values are rejected.
    pub fn get_uint(&self, field: &str, row: usize) -> Result<u32> {
        self.value(field, row)?.to_u32().ok_or_else(|| self.lossy(field, "uint"))
    }

    /// Rows whose `field` equals `key`, in stored order.
    ///
    /// This is the particle-index join used by every detector bank.
    pub fn rows_matching(&self, field: &str, key: u32) -> Result<Vec<usize>> {
        let column = self.column(field)?;
        let mut rows = Vec::new();
        for row in 0..self.n_rows {
            let value = column.get(row).and_then(FieldValue::to_u32);
            if value == Some(key) {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    fn lossy(&self, field: &str, requested: &'static str) -> Error {
        Error::LossyConversion {
            bank: self.schema.name().to_string(),
            field: field.to_string(),
            requested,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{REC_CALORIMETER, REC_TRACK};

    fn calorimeter_rows(n: usize) -> BankRows {
        BankRows::new()
            .with_field("index", Column::Short((0..n as i16).collect()))
            .with_field("pindex", Column::Short(vec![0; n]))
            .with_field("detector", Column::Byte(vec![7; n]))
            .with_field("sector", Column::Byte(vec![2; n]))
            .with_field("layer", Column::Byte(vec![1; n]))
            .with_field("energy", Column::Float(vec![0.25; n]))
            .with_field("time", Column::Float(vec![20.0; n]))
            .with_field("path", Column::Float(vec![700.0; n]))
    }

    #[test]
    fn test_init_unknown_schema() {
        let reg = BankRegistry::clas12();
        assert!(matches!(BankContainer::init(&reg, "FOO::Bar"), Err(Error::UnknownSchema(_))));
    }

    #[test]
    fn test_fill_and_read() {
        let reg = BankRegistry::clas12();
        let mut cal = BankContainer::init(&reg, REC_CALORIMETER).unwrap();
        cal.fill(&calorimeter_rows(3)).unwrap();

        assert_eq!(cal.n_rows(), 3);
        for f in cal.schema().fields().to_vec() {
            assert_eq!(cal.field_len(&f.name).unwrap(), 3);
        }
        assert_eq!(cal.get_uint("sector", 1).unwrap(), 2);
        assert_eq!(cal.get_int("REC::Calorimeter::layer", 2).unwrap(), 1);
        assert!((cal.get_double("energy", 0).unwrap() - 0.25).abs() < 1e-7);
    }

    #[test]
    fn test_index_out_of_range() {
        let reg = BankRegistry::clas12();
        let mut cal = BankContainer::init(&reg, REC_CALORIMETER).unwrap();
        cal.fill(&calorimeter_rows(2)).unwrap();
        match cal.get_double("energy", 2) {
            Err(Error::IndexOutOfRange { row, rows, .. }) => {
                assert_eq!(row, 2);
                assert_eq!(rows, 2);
            }
            other => panic!("expected IndexOutOfRange, got {other:?}"),
        }
    }

    #[test]
    fn test_field_not_found() {
        let reg = BankRegistry::clas12();
        let cal = BankContainer::init(&reg, REC_CALORIMETER).unwrap();
        assert!(matches!(cal.get_double("nphe", 0), Err(Error::FieldNotFound { .. })));
    }

    #[test]
    fn test_lossy_reads_rejected() {
        let reg = BankRegistry::clas12();
        let mut cal = BankContainer::init(&reg, REC_CALORIMETER).unwrap();
        cal.fill(&calorimeter_rows(1)).unwrap();
        assert!(matches!(cal.get_int("energy", 0), Err(Error::LossyConversion { .. })));
    }

    #[test]
    fn test_schema_mismatch_keeps_previous_event() {
        let reg = BankRegistry::clas12();
        let mut cal = BankContainer::init(&reg, REC_CALORIMETER).unwrap();
        cal.fill(&calorimeter_rows(2)).unwrap();

        let mut bad = calorimeter_rows(4);
        bad.fields.pop();
        assert!(matches!(cal.fill(&bad), Err(Error::SchemaMismatch { .. })));

        let mut wrong_type = calorimeter_rows(4);
        wrong_type.fields[4].1 = Column::Float(vec![1.0; 4]);
        assert!(matches!(cal.fill(&wrong_type), Err(Error::SchemaMismatch { .. })));

        let mut ragged = calorimeter_rows(4);
        ragged.fields[5].1 = Column::Float(vec![1.0; 3]);
        assert!(matches!(cal.fill(&ragged), Err(Error::SchemaMismatch { .. })));

        assert_eq!(cal.n_rows(), 2);
    }

    #[test]
    fn test_refill_overwrites_previous_event() {
        let reg = BankRegistry::clas12();
        let mut cal = BankContainer::init(&reg, REC_CALORIMETER).unwrap();
        cal.fill(&calorimeter_rows(5)).unwrap();
        cal.fill(&calorimeter_rows(1)).unwrap();
        assert_eq!(cal.n_rows(), 1);
        assert_eq!(cal.field_len("time").unwrap(), 1);
        assert!(cal.get_double("time", 1).is_err());
    }

    #[test]
    fn test_absent_bank_is_empty() {
        let reg = BankRegistry::clas12();
        let mut trk = BankContainer::init(&reg, REC_TRACK).unwrap();
        trk.fill_from_event(&EventRows::new()).unwrap();
        assert!(trk.is_empty());
    }

    #[test]
    fn test_rows_matching() {
        let reg = BankRegistry::clas12();
        let mut cal = BankContainer::init(&reg, REC_CALORIMETER).unwrap();
        let mut rows = calorimeter_rows(4);
        rows.fields[1].1 = Column::Short(vec![1, 0, 1, 2]);
        cal.fill(&rows).unwrap();
        assert_eq!(cal.rows_matching("pindex", 1).unwrap(), vec![0, 2]);
        assert!(cal.rows_matching("pindex", 9).unwrap().is_empty());
    }
}
