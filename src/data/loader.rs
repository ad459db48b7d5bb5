use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{
    Array, ArrayRef, AsArray, Float32Array, Float64Array, Int32Array, Int64Array,
    LargeListArray, ListArray, StringArray, UInt32Array, UInt8Array,
};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use super::model::{Dataset, DatasetRecord};
use super::writer::{COL_AUDIO, COL_DURATIONS, COL_ID, COL_MASK, COL_RATE, JsonRecord};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a previously exported dataset table.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – the table written by [`super::writer::save_file`]
/// * `.json`    – `[{ "filename": ..., "audio_content": [...], ... }, ...]`
pub fn load_file(path: &Path) -> Result<Dataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let records = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path)?,
        "json" => load_json(path)?,
        other => bail!("Unsupported file extension: .{other}"),
    };
    for r in &records {
        validate_record(r)?;
    }
    Dataset::from_records(records).context("assembling loaded records")
}

fn validate_record(r: &DatasetRecord) -> Result<()> {
    if r.audio.len() != r.mask.len() {
        bail!(
            "Record '{}': audio has {} values but mask has {}",
            r.identifier,
            r.audio.len(),
            r.mask.len()
        );
    }
    if let Some(bad) = r.mask.iter().find(|&&v| v > 1) {
        bail!("Record '{}': mask value {bad} is not binary", r.identifier);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

fn load_json(path: &Path) -> Result<Vec<DatasetRecord>> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let rows: Vec<JsonRecord> = serde_json::from_str(&text).context("parsing JSON")?;

    Ok(rows
        .into_iter()
        .map(|row| DatasetRecord {
            identifier: row.filename,
            audio: row.audio_content,
            mask: row.target_vector,
            durations_s: row.durations_in_s,
            sample_rate: row.sample_rate,
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Expected schema:
/// - `filename`: Utf8
/// - `audio_content`: List<Float32 | Float64>
/// - `target_vector`: List<UInt8 | Int64>
/// - `durations_in_s`: List<Float64>
/// - `sample_rate`: UInt32 | Int32 | Int64
fn load_parquet(path: &Path) -> Result<Vec<DatasetRecord>> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut records = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;

        let id_col = column(&batch, COL_ID)?;
        let audio_col = column(&batch, COL_AUDIO)?;
        let mask_col = column(&batch, COL_MASK)?;
        let dur_col = column(&batch, COL_DURATIONS)?;
        let rate_col = column(&batch, COL_RATE)?;

        for row in 0..batch.num_rows() {
            let identifier = extract_string(id_col, row)
                .with_context(|| format!("Row {row}: failed to read '{COL_ID}'"))?;
            let audio = extract_f32_list(audio_col, row)
                .with_context(|| format!("Row {row}: failed to read '{COL_AUDIO}'"))?;
            let mask = extract_u8_list(mask_col, row)
                .with_context(|| format!("Row {row}: failed to read '{COL_MASK}'"))?;
            let durations_s = extract_f64_list(dur_col, row)
                .with_context(|| format!("Row {row}: failed to read '{COL_DURATIONS}'"))?;
            let sample_rate = extract_rate(rate_col, row)
                .with_context(|| format!("Row {row}: failed to read '{COL_RATE}'"))?;

            records.push(DatasetRecord {
                identifier,
                audio,
                mask,
                durations_s,
                sample_rate,
            });
        }
    }

    Ok(records)
}

// -- Parquet / Arrow helpers --

fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    let idx = batch
        .schema()
        .index_of(name)
        .map_err(|_| anyhow::anyhow!("Parquet file missing '{name}' column"))?;
    Ok(batch.column(idx))
}

/// Inner values of a List or LargeList column at the given row.
fn list_values(col: &Arc<dyn Array>, row: usize) -> Result<ArrayRef> {
    if col.is_null(row) {
        bail!("null value in list column");
    }

    match col.data_type() {
        DataType::List(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<ListArray>()
                .context("expected ListArray")?;
            Ok(list_arr.value(row))
        }
        DataType::LargeList(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<LargeListArray>()
                .context("expected LargeListArray")?;
            Ok(list_arr.value(row))
        }
        other => bail!("Expected List or LargeList column, got {other:?}"),
    }
}

fn extract_f32_list(col: &Arc<dyn Array>, row: usize) -> Result<Vec<f32>> {
    let values = list_values(col, row)?;
    if let Some(arr) = values.as_any().downcast_ref::<Float32Array>() {
        Ok(arr.iter().map(|v| v.unwrap_or(f32::NAN)).collect())
    } else if let Some(arr) = values.as_any().downcast_ref::<Float64Array>() {
        Ok(arr.iter().map(|v| v.unwrap_or(f64::NAN) as f32).collect())
    } else {
        bail!(
            "List inner type is {:?}, expected Float32 or Float64",
            values.data_type()
        )
    }
}

fn extract_f64_list(col: &Arc<dyn Array>, row: usize) -> Result<Vec<f64>> {
    let values = list_values(col, row)?;
    if let Some(arr) = values.as_any().downcast_ref::<Float64Array>() {
        Ok(arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    } else if let Some(arr) = values.as_any().downcast_ref::<Float32Array>() {
        Ok(arr.iter().map(|v| v.unwrap_or(f32::NAN) as f64).collect())
    } else {
        bail!(
            "List inner type is {:?}, expected Float64 or Float32",
            values.data_type()
        )
    }
}

fn extract_u8_list(col: &Arc<dyn Array>, row: usize) -> Result<Vec<u8>> {
    let values = list_values(col, row)?;
    if let Some(arr) = values.as_any().downcast_ref::<UInt8Array>() {
        arr.iter()
            .map(|v| v.context("null mask value"))
            .collect()
    } else if let Some(arr) = values.as_any().downcast_ref::<Int64Array>() {
        arr.iter()
            .map(|v| {
                let v = v.context("null mask value")?;
                u8::try_from(v).with_context(|| format!("mask value {v} out of range"))
            })
            .collect()
    } else {
        bail!(
            "List inner type is {:?}, expected UInt8 or Int64",
            values.data_type()
        )
    }
}

fn extract_string(col: &Arc<dyn Array>, row: usize) -> Result<String> {
    if col.is_null(row) {
        bail!("null identifier");
    }
    match col.data_type() {
        DataType::Utf8 => {
            let s = col
                .as_any()
                .downcast_ref::<StringArray>()
                .context("expected StringArray")?;
            Ok(s.value(row).to_string())
        }
        DataType::LargeUtf8 => Ok(col.as_string::<i64>().value(row).to_string()),
        other => bail!("Expected Utf8 column, got {other:?}"),
    }
}

fn extract_rate(col: &Arc<dyn Array>, row: usize) -> Result<u32> {
    if col.is_null(row) {
        bail!("null sample rate");
    }
    let rate: i64 = match col.data_type() {
        DataType::UInt32 => {
            let arr = col.as_any().downcast_ref::<UInt32Array>().context("expected UInt32Array")?;
            arr.value(row) as i64
        }
        DataType::Int32 => {
            let arr = col.as_any().downcast_ref::<Int32Array>().context("expected Int32Array")?;
            arr.value(row) as i64
        }
        DataType::Int64 => {
            let arr = col.as_any().downcast_ref::<Int64Array>().context("expected Int64Array")?;
            arr.value(row)
        }
        other => bail!("Expected integer sample rate column, got {other:?}"),
    };
    u32::try_from(rate).with_context(|| format!("sample rate {rate} out of range"))
}
