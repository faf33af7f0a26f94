//! Parquet event files: one row per event, one list column per bank field.
//!
//! # Layout
//!
//! | Column                 | Arrow Type        | Description                        |
//! |------------------------|-------------------|------------------------------------|
//! | `<BANK>::<VAR>`        | `List<Int8>`      | byte field, one list entry per row |
//! | `<BANK>::<VAR>`        | `List<Int16>`     | short field                        |
//! | `<BANK>::<VAR>`        | `List<Int32>`     | int field                          |
//! | `<BANK>::<VAR>`        | `List<Float32>`   | float field                        |
//!
//! Columns whose name has no `::` separator, or whose item type is not one
//! of the four above, are ignored. A null list reads as zero rows; a null
//! item inside a list is a storage error.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, AsArray, Float32Builder, Int8Builder, Int16Builder, Int32Builder,
    ListArray, ListBuilder,
};
use arrow::datatypes::{DataType, Field, Float32Type, Int8Type, Int16Type, Int32Type, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::{ParquetRecordBatchReader, ParquetRecordBatchReaderBuilder};
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use rge_core::{
    BankRows, Column, Error, EventRows, FieldDef, PrimitiveType, Result, RowSource,
};

use crate::schema::{ADDRESS_SEPARATOR, BankSchema};

/// Events per record batch when reading.
pub const DEFAULT_READ_BATCH_SIZE: usize = 4096;

fn storage<E: std::fmt::Display>(context: &str) -> impl FnOnce(E) -> Error + '_ {
    move |e| Error::Storage(format!("{context}: {e}"))
}

fn primitive_from_arrow(dt: &DataType) -> Option<PrimitiveType> {
    match dt {
        DataType::Int8 => Some(PrimitiveType::Byte),
        DataType::Int16 => Some(PrimitiveType::Short),
        DataType::Int32 => Some(PrimitiveType::Int),
        DataType::Float32 => Some(PrimitiveType::Float),
        _ => None,
    }
}

fn arrow_from_primitive(kind: PrimitiveType) -> DataType {
    match kind {
        PrimitiveType::Byte => DataType::Int8,
        PrimitiveType::Short => DataType::Int16,
        PrimitiveType::Int => DataType::Int32,
        PrimitiveType::Float => DataType::Float32,
    }
}

/// Split `REC::Track::pindex` into (`REC::Track`, `pindex`).
fn split_address(address: &str) -> Option<(&str, &str)> {
    let pos = address.rfind(ADDRESS_SEPARATOR)?;
    let (bank, field) = (&address[..pos], &address[pos + ADDRESS_SEPARATOR.len()..]);
    if bank.is_empty() || field.is_empty() { None } else { Some((bank, field)) }
}

#[derive(Debug, Clone)]
struct BankLayout {
    fields: Vec<FieldDef>,
    columns: Vec<usize>,
}

/// Streaming [`RowSource`] over a Parquet event file.
pub struct ParquetEventSource {
    reader: ParquetRecordBatchReader,
    layout: BTreeMap<String, BankLayout>,
    n_events: u64,
    batch: Option<RecordBatch>,
    row: usize,
}

impl ParquetEventSource {
    /// Open a Parquet event file.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_batch_size(path, DEFAULT_READ_BATCH_SIZE)
    }

    /// Open with an explicit read batch size.
    pub fn open_with_batch_size(path: &Path, batch_size: usize) -> Result<Self> {
        let file = File::open(path)?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)
            .map_err(storage("failed to open Parquet event file"))?;
        let n_events = u64::try_from(builder.metadata().file_metadata().num_rows()).unwrap_or(0);
        let layout = discover_layout(builder.schema())?;
        let reader = builder
            .with_batch_size(batch_size.max(1))
            .build()
            .map_err(storage("failed to build Parquet reader"))?;

        tracing::debug!(
            path = %path.display(),
            events = n_events,
            banks = layout.len(),
            "opened event file"
        );
        Ok(Self { reader, layout, n_events, batch: None, row: 0 })
    }

    /// Bank ids found in the file.
    pub fn bank_ids(&self) -> impl Iterator<Item = &str> {
        self.layout.keys().map(String::as_str)
    }

    fn next_batch(&mut self) -> Result<bool> {
        loop {
            match self.reader.next() {
                None => {
                    self.batch = None;
                    return Ok(false);
                }
                Some(batch) => {
                    let batch = batch.map_err(storage("failed to read Parquet batch"))?;
                    if batch.num_rows() > 0 {
                        self.batch = Some(batch);
                        self.row = 0;
                        return Ok(true);
                    }
                }
            }
        }
    }
}

fn discover_layout(schema: &Schema) -> Result<BTreeMap<String, BankLayout>> {
    let mut layout: BTreeMap<String, BankLayout> = BTreeMap::new();
    for (i, field) in schema.fields().iter().enumerate() {
        let Some((bank, name)) = split_address(field.name()) else {
            continue;
        };
        let DataType::List(item) = field.data_type() else {
            continue;
        };
        let Some(kind) = primitive_from_arrow(item.data_type()) else {
            tracing::warn!(column = %field.name(), "skipping column with unsupported item type");
            continue;
        };
        let entry = layout
            .entry(bank.to_string())
            .or_insert_with(|| BankLayout { fields: Vec::new(), columns: Vec::new() });
        if entry.fields.iter().any(|f| f.name == name) {
            return Err(Error::SchemaMismatch {
                bank: bank.to_string(),
                reason: format!("column `{}` appears twice", field.name()),
            });
        }
        entry.fields.push(FieldDef::new(name, kind));
        entry.columns.push(i);
    }
    Ok(layout)
}

/// One event's entry of a list column. A null list is zero rows; a null
/// item inside a list is an error.
fn list_entry(list: &ListArray, row: usize, bank: &str, field: &FieldDef) -> Result<Column> {
    if list.is_null(row) {
        return Ok(Column::empty(field.kind));
    }
    let values = list.value(row);
    if values.null_count() > 0 {
        return Err(Error::Storage(format!(
            "column `{bank}{ADDRESS_SEPARATOR}{}` has {} null item(s) in event row {row}",
            field.name,
            values.null_count()
        )));
    }
    Ok(match field.kind {
        PrimitiveType::Byte => Column::Byte(values.as_primitive::<Int8Type>().values().to_vec()),
        PrimitiveType::Short => Column::Short(values.as_primitive::<Int16Type>().values().to_vec()),
        PrimitiveType::Int => Column::Int(values.as_primitive::<Int32Type>().values().to_vec()),
        PrimitiveType::Float => {
            Column::Float(values.as_primitive::<Float32Type>().values().to_vec())
        }
    })
}

impl RowSource for ParquetEventSource {
    fn schema(&self, bank: &str) -> Option<&[FieldDef]> {
        self.layout.get(bank).map(|l| l.fields.as_slice())
    }

    fn n_events(&self) -> u64 {
        self.n_events
    }

    fn read_event(&mut self, rows: &mut EventRows) -> Result<bool> {
        let exhausted = self.batch.as_ref().is_none_or(|b| self.row >= b.num_rows());
        if exhausted && !self.next_batch()? {
            return Ok(false);
        }
        let Some(batch) = self.batch.as_ref() else {
            return Ok(false);
        };

        rows.clear();
        for (bank, layout) in &self.layout {
            let mut bank_rows = BankRows::new();
            for (field, &col) in layout.fields.iter().zip(&layout.columns) {
                let list = batch.column(col).as_list::<i32>();
                bank_rows.fields.push((field.name.clone(), list_entry(list, self.row, bank, field)?));
            }
            rows.insert(bank.clone(), bank_rows);
        }
        self.row += 1;
        Ok(true)
    }
}

enum ListColumnBuilder {
    Byte(ListBuilder<Int8Builder>),
    Short(ListBuilder<Int16Builder>),
    Int(ListBuilder<Int32Builder>),
    Float(ListBuilder<Float32Builder>),
}

impl ListColumnBuilder {
    fn new(kind: PrimitiveType) -> Self {
        match kind {
            PrimitiveType::Byte => Self::Byte(ListBuilder::new(Int8Builder::new())),
            PrimitiveType::Short => Self::Short(ListBuilder::new(Int16Builder::new())),
            PrimitiveType::Int => Self::Int(ListBuilder::new(Int32Builder::new())),
            PrimitiveType::Float => Self::Float(ListBuilder::new(Float32Builder::new())),
        }
    }

    /// Append one event's list. `None` appends an empty list; a column of
    /// the wrong type appends nothing and returns `false`.
    fn append(&mut self, column: Option<&Column>) -> bool {
        match (&mut *self, column) {
            (Self::Byte(b), Some(Column::Byte(v))) => b.values().append_slice(v),
            (Self::Short(b), Some(Column::Short(v))) => b.values().append_slice(v),
            (Self::Int(b), Some(Column::Int(v))) => b.values().append_slice(v),
            (Self::Float(b), Some(Column::Float(v))) => b.values().append_slice(v),
            (_, None) => {}
            _ => return false,
        }
        match self {
            Self::Byte(b) => b.append(true),
            Self::Short(b) => b.append(true),
            Self::Int(b) => b.append(true),
            Self::Float(b) => b.append(true),
        }
        true
    }

    fn finish(self) -> ArrayRef {
        match self {
            Self::Byte(mut b) => Arc::new(b.finish()),
            Self::Short(mut b) => Arc::new(b.finish()),
            Self::Int(mut b) => Arc::new(b.finish()),
            Self::Float(mut b) => Arc::new(b.finish()),
        }
    }
}

/// Write events to a Parquet event file with the layout read by
/// [`ParquetEventSource`]. Banks missing from an event are written as empty
/// lists.
pub fn write_event_parquet(path: &Path, schemas: &[&BankSchema], events: &[EventRows]) -> Result<()> {
    let mut fields = Vec::new();
    let mut builders = Vec::new();
    for schema in schemas {
        for (i, f) in schema.fields().iter().enumerate() {
            let name = schema.address(i).unwrap_or_else(|| f.name.clone());
            let item = Field::new("item", arrow_from_primitive(f.kind), true);
            fields.push(Field::new(name, DataType::List(Arc::new(item)), false));
            builders.push((schema.name(), f, ListColumnBuilder::new(f.kind)));
        }
    }

    for event in events {
        for (bank, field, builder) in &mut builders {
            let column = event.bank(bank).and_then(|rows| rows.column(&field.name));
            if !builder.append(column) {
                return Err(Error::SchemaMismatch {
                    bank: bank.to_string(),
                    reason: format!("field `{}` does not hold {} values", field.name, field.kind.name()),
                });
            }
        }
    }

    let arrays: Vec<ArrayRef> = builders.into_iter().map(|(_, _, b)| b.finish()).collect();
    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema, arrays).map_err(storage("failed to build RecordBatch"))?;

    let props = WriterProperties::builder().set_compression(Compression::SNAPPY).build();
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
        .map_err(storage("failed to create Parquet writer"))?;
    writer.write(&batch).map_err(storage("failed to write Parquet"))?;
    writer.close().map_err(storage("failed to close Parquet writer"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_address() {
        assert_eq!(split_address("REC::Track::pindex"), Some(("REC::Track", "pindex")));
        assert_eq!(split_address("run_no"), None);
        assert_eq!(split_address("REC::"), None);
    }

    #[test]
    fn test_null_list_item_is_rejected() {
        let mut pindex = ListBuilder::new(Int16Builder::new());
        pindex.values().append_value(0);
        pindex.append(true);
        pindex.values().append_value(1);
        pindex.values().append_null();
        pindex.append(true);
        let array: ArrayRef = Arc::new(pindex.finish());
        let item = Arc::new(Field::new("item", DataType::Int16, true));
        let schema = Arc::new(Schema::new(vec![Field::new(
            "REC::Track::pindex",
            DataType::List(item),
            false,
        )]));
        let batch = RecordBatch::try_new(schema.clone(), vec![array]).unwrap();

        let path = std::env::temp_dir().join(format!(
            "rge_bank_null_item_{}_{}.parquet",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0)
        ));
        let mut writer = ArrowWriter::try_new(File::create(&path).unwrap(), schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let mut src = ParquetEventSource::open(&path).unwrap();
        let mut rows = EventRows::new();
        assert!(src.read_event(&mut rows).unwrap());
        assert_eq!(rows.bank("REC::Track").unwrap().column("pindex"), Some(&Column::Short(vec![0])));
        match src.read_event(&mut rows) {
            Err(Error::Storage(msg)) => assert!(msg.contains("REC::Track::pindex"), "{msg}"),
            other => panic!("expected Storage error, got {other:?}"),
        }
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_discover_layout_groups_by_bank() {
        let item = |dt| Arc::new(Field::new("item", dt, true));
        let schema = Schema::new(vec![
            Field::new("REC::Track::pindex", DataType::List(item(DataType::Int16)), false),
            Field::new("REC::Track::chi2", DataType::List(item(DataType::Float32)), false),
            Field::new("REC::Cherenkov::nphe", DataType::List(item(DataType::Float32)), false),
            Field::new("REC::Track::weird", DataType::List(item(DataType::Utf8)), false),
            Field::new("event", DataType::Int64, false),
        ]);
        let layout = discover_layout(&schema).unwrap();
        assert_eq!(layout.len(), 2);
        let trk = &layout["REC::Track"];
        assert_eq!(
            trk.fields,
            vec![
                FieldDef::new("pindex", PrimitiveType::Short),
                FieldDef::new("chi2", PrimitiveType::Float)
            ]
        );
        assert_eq!(trk.columns, vec![0, 1]);
    }
}
