use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{
    Float32Builder, Float64Builder, ListBuilder, StringArray, UInt32Array, UInt8Builder,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use log::info;
use parquet::arrow::ArrowWriter;
use serde::{Deserialize, Serialize};

use super::model::{Dataset, DatasetRecord};

pub const COL_ID: &str = "filename";
pub const COL_AUDIO: &str = "audio_content";
pub const COL_MASK: &str = "target_vector";
pub const COL_DURATIONS: &str = "durations_in_s";
pub const COL_RATE: &str = "sample_rate";

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Write the dataset to `path`. Dispatch by extension.
///
/// * `.parquet` / `.pq` – one row per record, list columns for the sequences
/// * `.json`            – `[{ "filename": ..., "audio_content": [...], ... }]`
pub fn save_file(dataset: &Dataset, path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "parquet" | "pq" => save_parquet(dataset, path)?,
        "json" => save_json(dataset, path)?,
        other => bail!("Unsupported output extension: .{other}"),
    }
    info!("wrote {} records to {}", dataset.len(), path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

/// Records-oriented JSON row, shared with the loader.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct JsonRecord {
    pub filename: String,
    pub audio_content: Vec<f32>,
    pub target_vector: Vec<u8>,
    pub durations_in_s: Vec<f64>,
    pub sample_rate: u32,
}

impl From<&DatasetRecord> for JsonRecord {
    fn from(r: &DatasetRecord) -> Self {
        JsonRecord {
            filename: r.identifier.clone(),
            audio_content: r.audio.clone(),
            target_vector: r.mask.clone(),
            durations_in_s: r.durations_s.clone(),
            sample_rate: r.sample_rate,
        }
    }
}

fn save_json(dataset: &Dataset, path: &Path) -> Result<()> {
    let rows: Vec<JsonRecord> = dataset.records().iter().map(JsonRecord::from).collect();
    let file = std::fs::File::create(path).context("creating JSON file")?;
    serde_json::to_writer(std::io::BufWriter::new(file), &rows).context("writing JSON")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Parquet
// ---------------------------------------------------------------------------

fn list_of(item: DataType) -> DataType {
    DataType::List(Arc::new(Field::new("item", item, true)))
}

/// Arrow schema of the exported table.
pub fn dataset_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new(COL_ID, DataType::Utf8, false),
        Field::new(COL_AUDIO, list_of(DataType::Float32), false),
        Field::new(COL_MASK, list_of(DataType::UInt8), false),
        Field::new(COL_DURATIONS, list_of(DataType::Float64), false),
        Field::new(COL_RATE, DataType::UInt32, false),
    ]))
}

/// Build a single record batch holding every record.
pub fn to_record_batch(dataset: &Dataset) -> Result<RecordBatch> {
    let records = dataset.records();

    let mut audio_builder = ListBuilder::new(Float32Builder::new());
    let mut mask_builder = ListBuilder::new(UInt8Builder::new());
    let mut dur_builder = ListBuilder::new(Float64Builder::new());
    for r in records {
        audio_builder.values().append_slice(&r.audio);
        audio_builder.append(true);
        mask_builder.values().append_slice(&r.mask);
        mask_builder.append(true);
        dur_builder.values().append_slice(&r.durations_s);
        dur_builder.append(true);
    }

    let id_array = StringArray::from(
        records.iter().map(|r| r.identifier.as_str()).collect::<Vec<_>>(),
    );
    let rate_array = UInt32Array::from(records.iter().map(|r| r.sample_rate).collect::<Vec<_>>());

    RecordBatch::try_new(
        dataset_schema(),
        vec![
            Arc::new(id_array),
            Arc::new(audio_builder.finish()),
            Arc::new(mask_builder.finish()),
            Arc::new(dur_builder.finish()),
            Arc::new(rate_array),
        ],
    )
    .context("building record batch")
}

fn save_parquet(dataset: &Dataset, path: &Path) -> Result<()> {
    let batch = to_record_batch(dataset)?;
    let file = std::fs::File::create(path).context("creating parquet file")?;
    let mut writer =
        ArrowWriter::try_new(file, batch.schema(), None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Array;

    #[test]
    fn batch_has_one_row_per_record() {
        let ds = Dataset::from_records(vec![DatasetRecord {
            identifier: "rec".into(),
            audio: vec![0.0, 0.5],
            mask: vec![0, 1],
            durations_s: vec![0.25, 1.0],
            sample_rate: 8000,
        }])
        .unwrap();
        let batch = to_record_batch(&ds).unwrap();
        assert_eq!(batch.num_rows(), 1);
        assert_eq!(batch.num_columns(), 5);
        assert_eq!(batch.column(0).len(), 1);
        assert_eq!(batch.schema().field(2).name(), COL_MASK);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = save_file(&Dataset::default(), &dir.path().join("out.pkl")).unwrap_err();
        assert!(err.to_string().contains(".pkl"));
    }
}
