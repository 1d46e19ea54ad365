//! Data loading utilities

use crate::error::{ExoError, Result};
use polars::prelude::*;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Supported tabular formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Csv,
    Tsv,
    /// JSON array of records
    Json,
    /// Line-delimited JSON
    JsonLines,
    Parquet,
}

impl DataFormat {
    /// Format implied by a file name's extension
    pub fn from_file_name(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        if lower.ends_with(".csv") {
            Some(DataFormat::Csv)
        } else if lower.ends_with(".tsv") {
            Some(DataFormat::Tsv)
        } else if lower.ends_with(".jsonl") || lower.ends_with(".ndjson") {
            Some(DataFormat::JsonLines)
        } else if lower.ends_with(".json") {
            Some(DataFormat::Json)
        } else if lower.ends_with(".parquet") || lower.ends_with(".pq") {
            Some(DataFormat::Parquet)
        } else {
            None
        }
    }
}

/// Loads raw mission tables
#[derive(Debug, Clone)]
pub struct DataLoader {
    infer_schema_length: usize,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self {
            infer_schema_length: 1000,
        }
    }

    /// Rows scanned when inferring CSV column types
    pub fn with_infer_schema_length(mut self, rows: usize) -> Self {
        self.infer_schema_length = rows;
        self
    }

    /// Load a file, choosing the reader from its extension. Unknown
    /// extensions are read as CSV.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let format = DataFormat::from_file_name(&path.to_string_lossy()).unwrap_or(DataFormat::Csv);
        let bytes = std::fs::read(path)?;
        let df = self.load_bytes(&bytes, format)?;

        debug!(path = %path.display(), rows = df.height(), columns = df.width(), "Loaded table");
        Ok(df)
    }

    /// Parse an in-memory upload
    pub fn load_bytes(&self, bytes: &[u8], format: DataFormat) -> Result<DataFrame> {
        let df = match format {
            DataFormat::Csv | DataFormat::Tsv => self.read_csv(Cursor::new(bytes), format)?,
            DataFormat::Json => JsonReader::new(Cursor::new(bytes)).finish()?,
            DataFormat::JsonLines => JsonReader::new(Cursor::new(bytes))
                .with_json_format(JsonFormat::JsonLines)
                .finish()?,
            DataFormat::Parquet => ParquetReader::new(Cursor::new(bytes)).finish()?,
        };
        Ok(df)
    }

    fn read_csv(&self, reader: Cursor<&[u8]>, format: DataFormat) -> Result<DataFrame> {
        let separator = if format == DataFormat::Tsv { b'\t' } else { b',' };
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(self.infer_schema_length))
            .with_parse_options(CsvParseOptions::default().with_separator(separator))
            .into_reader_with_file_handle(reader)
            .finish()?;
        Ok(df)
    }
}

/// Writes result tables
pub struct DataSaver;

impl DataSaver {
    /// Save by extension: `.json` and `.parquet` are honored, anything else is CSV
    pub fn save(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut file = File::create(path)?;

        match DataFormat::from_file_name(&path.to_string_lossy()) {
            Some(DataFormat::Json) => JsonWriter::new(&mut file)
                .with_json_format(JsonFormat::Json)
                .finish(df)?,
            Some(DataFormat::JsonLines) => JsonWriter::new(&mut file)
                .with_json_format(JsonFormat::JsonLines)
                .finish(df)?,
            Some(DataFormat::Parquet) => {
                ParquetWriter::new(file).finish(df)?;
            }
            _ => CsvWriter::new(&mut file).finish(df)?,
        }
        Ok(())
    }
}

/// Build a table from JSON records.
///
/// Columns appear in first-seen order. A column whose values are all numbers,
/// booleans or null becomes Float64; any other value makes it a String column
/// with numbers kept as their text. Keys absent from a record are null.
pub fn records_to_dataframe(records: &[Map<String, Value>]) -> Result<DataFrame> {
    let mut names: Vec<&String> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !names.contains(&key) {
                names.push(key);
            }
        }
    }

    let mut columns = Vec::with_capacity(names.len());
    for name in names {
        let values: Vec<Option<&Value>> = records
            .iter()
            .map(|r| r.get(name.as_str()).filter(|v| !v.is_null()))
            .collect();

        let numeric = values
            .iter()
            .flatten()
            .all(|v| v.is_number() || v.is_boolean());

        let column = if numeric {
            let floats: Vec<Option<f64>> = values
                .iter()
                .map(|v| {
                    v.and_then(|v| match v {
                        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
                        other => other.as_f64(),
                    })
                })
                .collect();
            Column::new(name.as_str().into(), floats)
        } else {
            let strings: Vec<Option<String>> = values
                .iter()
                .map(|v| {
                    v.map(|v| match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                })
                .collect();
            Column::new(name.as_str().into(), strings)
        };
        columns.push(column);
    }

    if columns.is_empty() {
        return Ok(DataFrame::empty());
    }
    Ok(DataFrame::new(columns)?)
}

/// Convert a polars cell into JSON
pub fn any_value_to_json(value: &AnyValue) -> Value {
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(v) => Value::from(*v),
        AnyValue::String(v) => Value::from(*v),
        AnyValue::StringOwned(v) => Value::from(v.as_str()),
        AnyValue::Float64(v) => float_to_json(*v),
        AnyValue::Float32(v) => float_to_json(*v as f64),
        AnyValue::Int64(v) => Value::from(*v),
        AnyValue::Int32(v) => Value::from(*v),
        AnyValue::Int16(v) => Value::from(*v),
        AnyValue::Int8(v) => Value::from(*v),
        AnyValue::UInt64(v) => Value::from(*v),
        AnyValue::UInt32(v) => Value::from(*v),
        AnyValue::UInt16(v) => Value::from(*v),
        AnyValue::UInt8(v) => Value::from(*v),
        other => Value::from(other.to_string()),
    }
}

fn float_to_json(v: f64) -> Value {
    serde_json::Number::from_f64(v)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// One row as `(column, value)` pairs in column order
pub fn row_values(df: &DataFrame, row: usize) -> Result<Vec<(String, Value)>> {
    if row >= df.height() {
        return Err(ExoError::InvalidInput(format!(
            "row {} out of range for {} rows",
            row,
            df.height()
        )));
    }
    df.get_columns()
        .iter()
        .map(|col| Ok((col.name().to_string(), any_value_to_json(&col.get(row)?))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_format_from_file_name() {
        assert_eq!(DataFormat::from_file_name("koi.CSV"), Some(DataFormat::Csv));
        assert_eq!(DataFormat::from_file_name("toi.parquet"), Some(DataFormat::Parquet));
        assert_eq!(DataFormat::from_file_name("k2.jsonl"), Some(DataFormat::JsonLines));
        assert_eq!(DataFormat::from_file_name("k2.json"), Some(DataFormat::Json));
        assert_eq!(DataFormat::from_file_name("k2.xlsx"), None);
    }

    #[test]
    fn test_records_to_dataframe_types() {
        let records = vec![
            record(json!({"pl_rade": 2.1, "flag": true, "disposition": "CONFIRMED"})),
            record(json!({"pl_rade": null, "flag": false, "extra": 7})),
        ];
        let df = records_to_dataframe(&records).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.column("pl_rade").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("flag").unwrap().f64().unwrap().get(0), Some(1.0));
        assert_eq!(df.column("disposition").unwrap().dtype(), &DataType::String);
        assert_eq!(df.column("disposition").unwrap().null_count(), 1);
        assert_eq!(df.column("extra").unwrap().f64().unwrap().get(1), Some(7.0));
    }

    #[test]
    fn test_mixed_column_becomes_text() {
        let records = vec![record(json!({"x": 1})), record(json!({"x": "n/a"}))];
        let df = records_to_dataframe(&records).unwrap();
        let x = df.column("x").unwrap().str().unwrap().clone();
        assert_eq!(x.get(0), Some("1"));
        assert_eq!(x.get(1), Some("n/a"));
    }

    #[test]
    fn test_csv_bytes_and_row_values() {
        let csv = b"koi_period,koi_disposition\n9.48,CONFIRMED\n54.4,CANDIDATE\n";
        let df = DataLoader::new().load_bytes(csv, DataFormat::Csv).unwrap();
        assert_eq!(df.shape(), (2, 2));

        let row = row_values(&df, 1).unwrap();
        assert_eq!(row[0], ("koi_period".to_string(), json!(54.4)));
        assert_eq!(row[1], ("koi_disposition".to_string(), json!("CANDIDATE")));
        assert!(row_values(&df, 2).is_err());
    }

    #[test]
    fn test_save_and_load_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/predictions.csv");
        let mut df = df! { "label" => ["CONFIRMED", "CANDIDATE"], "confidence" => [91.0, 64.5] }.unwrap();
        DataSaver::save(&mut df, &path).unwrap();

        let loaded = DataLoader::new().load(&path).unwrap();
        assert_eq!(loaded.shape(), (2, 2));
    }
}
