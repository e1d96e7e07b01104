// Loaders - turn fetched content into a DataSet
// CSV and JSON are supported; column types are inferred from the values

use super::fetcher::RawData;
use super::filetype::Filetype;
use crate::dataset::{DataSet, Row, Value};
use crate::error::{QueryError, Result};
use tracing::debug;

/// Load raw content into a data set, based on its filetype
pub fn load(raw: RawData) -> Result<DataSet> {
    let filetype = match raw.filetype {
        Filetype::Unknown => Filetype::sniff(&raw.content),
        known => known,
    };

    let dataset = match filetype {
        Filetype::Csv => load_csv(&raw.content)?,
        Filetype::Json => load_json(&raw.content)?,
        _ => return Err(QueryError::Load("unsupported filetype".to_string())),
    };

    debug!(
        "loaded {:?} data: {} column(s), {} row(s)",
        filetype,
        dataset.schema.len(),
        dataset.row_count()
    );
    Ok(dataset)
}

/// Load CSV with a header line
pub fn load_csv(content: &str) -> Result<DataSet> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let names: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(Row::new(record.iter().map(parse_field).collect()));
    }

    Ok(DataSet::from_rows(names, rows))
}

/// Type a single CSV field
fn parse_field(field: &str) -> Value {
    if field.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = field.parse::<i64>() {
        return Value::Integer(i);
    }
    if let Ok(f) = field.parse::<f64>() {
        // "inf"/"nan" parse as floats but are almost always text in data files
        if f.is_finite() {
            return Value::Float(f);
        }
    }
    if field.eq_ignore_ascii_case("true") {
        return Value::Boolean(true);
    }
    if field.eq_ignore_ascii_case("false") {
        return Value::Boolean(false);
    }
    Value::Text(field.to_string())
}

/// Load JSON: an array of objects, a single object, or one object per line
pub fn load_json(content: &str) -> Result<DataSet> {
    let records: Vec<serde_json::Value> = match serde_json::from_str(content) {
        Ok(serde_json::Value::Array(items)) => items,
        Ok(object @ serde_json::Value::Object(_)) => vec![object],
        Ok(other) => {
            return Err(QueryError::Load(format!(
                "expected a JSON array or object, found {}",
                json_kind(&other)
            )))
        }
        // Not a single document - try newline-delimited JSON
        Err(err) => {
            let lines = serde_json::Deserializer::from_str(content)
                .into_iter::<serde_json::Value>()
                .collect::<Result<Vec<_>, _>>();
            match lines {
                Ok(lines) if lines.len() > 1 => lines,
                _ => return Err(err.into()),
            }
        }
    };

    let mut names: Vec<String> = Vec::new();
    let mut objects = Vec::with_capacity(records.len());
    for record in records {
        match record {
            serde_json::Value::Object(object) => {
                for key in object.keys() {
                    if !names.iter().any(|n| n == key) {
                        names.push(key.clone());
                    }
                }
                objects.push(object);
            }
            other => {
                return Err(QueryError::Load(format!(
                    "expected JSON objects as records, found {}",
                    json_kind(&other)
                )))
            }
        }
    }

    let rows = objects
        .iter()
        .map(|object| {
            Row::new(
                names
                    .iter()
                    .map(|name| object.get(name).map(Value::from_json).unwrap_or(Value::Null))
                    .collect(),
            )
        })
        .collect();

    Ok(DataSet::from_rows(names, rows))
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
