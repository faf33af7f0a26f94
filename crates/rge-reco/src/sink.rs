//! Output sinks for accepted-particle records.
//!
//! # Parquet ntuple layout
//!
//! One row per record and one non-nullable `Float32` column per field, named
//! and ordered as [`OUTPUT_FIELD_NAMES`].

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, AsArray, Float32Array};
use arrow::datatypes::{DataType, Field, Float32Type, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use rge_core::{
    Error, OUTPUT_FIELD_NAMES, OUTPUT_RECORD_LEN, OutputRecord, OutputSink, Result,
};

/// Records per written row group.
pub const DEFAULT_WRITE_BATCH_SIZE: usize = 65_536;

fn storage<E: std::fmt::Display>(context: &str) -> impl FnOnce(E) -> Error + '_ {
    move |e| Error::Storage(format!("{context}: {e}"))
}

/// In-memory sink.
#[derive(Debug, Clone, Default)]
pub struct RecordCollector {
    records: Vec<OutputRecord>,
    finished: bool,
}

impl RecordCollector {
    /// Empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records appended so far.
    pub fn records(&self) -> &[OutputRecord] {
        &self.records
    }

    /// `true` once [`OutputSink::finish`] was called.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Take the records.
    pub fn into_records(self) -> Vec<OutputRecord> {
        self.records
    }
}

impl OutputSink for RecordCollector {
    fn append(&mut self, record: &OutputRecord) -> Result<()> {
        self.records.push(*record);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}

/// Arrow schema of the ntuple file.
pub fn ntuple_schema() -> SchemaRef {
    let fields: Vec<Field> =
        OUTPUT_FIELD_NAMES.iter().map(|name| Field::new(*name, DataType::Float32, false)).collect();
    Arc::new(Schema::new(fields))
}

/// Parquet ntuple writer. Records are buffered column-wise and written in
/// batches.
///
/// Rows go to `<path>.partial`; [`OutputSink::finish`] closes that file and
/// renames it to `path`. A writer dropped before `finish` removes the partial
/// file and leaves `path` untouched.
pub struct ParquetNtupleWriter {
    writer: Option<ArrowWriter<File>>,
    path: PathBuf,
    partial: PathBuf,
    schema: SchemaRef,
    columns: Vec<Vec<f32>>,
    batch_size: usize,
    written: u64,
}

impl ParquetNtupleWriter {
    /// Create (truncate) `path`.
    pub fn create(path: &Path) -> Result<Self> {
        Self::with_batch_size(path, DEFAULT_WRITE_BATCH_SIZE)
    }

    /// Create with an explicit batch size.
    pub fn with_batch_size(path: &Path, batch_size: usize) -> Result<Self> {
        let schema = ntuple_schema();
        let props = WriterProperties::builder().set_compression(Compression::SNAPPY).build();
        let partial = partial_path(path);
        let file = File::create(&partial)?;
        let writer = match ArrowWriter::try_new(file, schema.clone(), Some(props)) {
            Ok(w) => w,
            Err(e) => {
                std::fs::remove_file(&partial).ok();
                return Err(storage("failed to create Parquet writer")(e));
            }
        };
        let batch_size = batch_size.max(1);
        Ok(Self {
            writer: Some(writer),
            path: path.to_path_buf(),
            partial,
            schema,
            columns: vec![Vec::with_capacity(batch_size); OUTPUT_RECORD_LEN],
            batch_size,
            written: 0,
        })
    }

    /// Records written or buffered so far.
    pub fn len(&self) -> u64 {
        self.written + self.columns[0].len() as u64
    }

    /// `true` if nothing was appended.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn flush(&mut self) -> Result<()> {
        let n = self.columns[0].len();
        if n == 0 {
            return Ok(());
        }
        let Some(writer) = self.writer.as_mut() else {
            return Err(Error::Storage("ntuple writer already closed".into()));
        };
        let arrays: Vec<ArrayRef> = self
            .columns
            .iter_mut()
            .map(|c| Arc::new(Float32Array::from(std::mem::take(c))) as ArrayRef)
            .collect();
        let batch = RecordBatch::try_new(self.schema.clone(), arrays)
            .map_err(storage("failed to build RecordBatch"))?;
        writer.write(&batch).map_err(storage("failed to write Parquet"))?;
        self.written += n as u64;
        tracing::debug!(rows = n, total = self.written, "flushed ntuple batch");
        Ok(())
    }
}

impl OutputSink for ParquetNtupleWriter {
    fn append(&mut self, record: &OutputRecord) -> Result<()> {
        for (column, value) in self.columns.iter_mut().zip(record.to_array()) {
            column.push(value as f32);
        }
        if self.columns[0].len() >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.flush()?;
        if let Some(writer) = self.writer.take() {
            writer.close().map_err(storage("failed to close Parquet writer"))?;
            std::fs::rename(&self.partial, &self.path)?;
            tracing::debug!(path = %self.path.display(), records = self.written, "ntuple file written");
        }
        Ok(())
    }
}

impl Drop for ParquetNtupleWriter {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            drop(writer);
            if std::fs::remove_file(&self.partial).is_ok() {
                tracing::warn!(path = %self.partial.display(), "removed unfinished ntuple file");
            }
        }
    }
}

/// `<path>.partial`, next to `path`.
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_else(|| "ntuple".into());
    name.push(".partial");
    path.with_file_name(name)
}

/// Read every record of an ntuple file back.
pub fn read_ntuples(path: &Path) -> Result<Vec<OutputRecord>> {
    let file = File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(storage("failed to open ntuple file"))?
        .build()
        .map_err(storage("failed to build Parquet reader"))?;

    let mut records = Vec::new();
    for batch in reader {
        let batch = batch.map_err(storage("failed to read Parquet batch"))?;
        let mut columns = Vec::with_capacity(OUTPUT_RECORD_LEN);
        for name in OUTPUT_FIELD_NAMES {
            let col = batch
                .column_by_name(name)
                .ok_or_else(|| Error::Storage(format!("ntuple column `{name}` missing")))?;
            let values = col
                .as_primitive_opt::<Float32Type>()
                .ok_or_else(|| Error::Storage(format!("ntuple column `{name}` is not Float32")))?;
            columns.push(values);
        }
        for row in 0..batch.num_rows() {
            let mut v = [0.0; OUTPUT_RECORD_LEN];
            for (slot, col) in v.iter_mut().zip(&columns) {
                *slot = f64::from(col.value(row));
            }
            records.push(OutputRecord::from_array(v));
        }
    }
    Ok(records)
}
