// Dataset module - the in-memory table a query runs against
// Loaders build a DataSet from fetched content, the executor transforms it,
// and the output functions render it back to text

mod output;

pub use output::OutputFormat;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Represents a single row in a data set
/// Values are positional - value i belongs to schema column i
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }
}

/// A single cell value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// The data type this value carries
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Null => DataType::Null,
            Value::Boolean(_) => DataType::Boolean,
            Value::Integer(_) => DataType::Integer,
            Value::Float(_) => DataType::Float,
            Value::Text(_) => DataType::Text,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the value, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Compare two values (used for WHERE clauses)
    /// Integers and floats compare with each other; other mixed types don't
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Integer(_), Value::Float(_))
            | (Value::Float(_), Value::Integer(_))
            | (Value::Float(_), Value::Float(_)) => {
                let (a, b) = (self.as_f64()?, other.as_f64()?);
                a.partial_cmp(&b)
            }
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Total ordering used for ORDER BY
    /// Falls back to ordering by type when values aren't comparable,
    /// so sorting never fails halfway through
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            _ => self
                .compare(other)
                .unwrap_or_else(|| self.type_rank().cmp(&other.type_rank())),
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Boolean(_) => 1,
            Value::Integer(_) | Value::Float(_) => 2,
            Value::Text(_) => 3,
        }
    }

    /// Convert the value to fit a (wider) column type
    pub fn coerce(self, data_type: DataType) -> Value {
        match (self, data_type) {
            (Value::Null, _) => Value::Null,
            (Value::Integer(i), DataType::Float) => Value::Float(i as f64),
            (value @ Value::Text(_), DataType::Text) => value,
            (value, DataType::Text) => Value::Text(value.to_string()),
            (value, _) => value,
        }
    }

    /// Convert a JSON value into a cell
    /// Arrays and objects are kept as their JSON text
    pub fn from_json(value: &serde_json::Value) -> Value {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
            },
            serde_json::Value::String(s) => Value::Text(s.clone()),
            other => Value::Text(other.to_string()),
        }
    }

    /// Convert the cell into a JSON value
    /// Non-finite floats have no JSON form and become null
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Integer(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            // Keep a visible fraction on whole floats so 2.0 doesn't read as an integer
            Value::Float(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 => {
                write!(f, "{:.1}", v)
            }
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

/// The data types a column can hold
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// No non-null value seen yet
    Null,
    Boolean,
    Integer,
    Float,
    Text,
}

impl DataType {
    /// Widen two types into one that can hold values of both
    pub fn unify(self, other: DataType) -> DataType {
        match (self, other) {
            (a, b) if a == b => a,
            (DataType::Null, t) | (t, DataType::Null) => t,
            (DataType::Integer, DataType::Float) | (DataType::Float, DataType::Integer) => {
                DataType::Float
            }
            _ => DataType::Text,
        }
    }
}

/// Represents a single column definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
}

/// The structure of a data set: which columns exist and their types
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Schema {
    pub columns: Vec<Column>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    /// Find the index of a column by name
    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|col| col.name == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// A table of rows with a schema
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataSet {
    pub schema: Schema,
    pub rows: Vec<Row>,
}

impl DataSet {
    /// Build a data set from named columns and raw rows
    ///
    /// Column types are inferred by unifying every value in the column,
    /// then each value is coerced to its column's type. Short rows are
    /// padded with NULL.
    pub fn from_rows(names: Vec<String>, rows: Vec<Row>) -> Self {
        let mut types = vec![DataType::Null; names.len()];
        for row in &rows {
            for (i, value) in row.values.iter().enumerate().take(names.len()) {
                types[i] = types[i].unify(value.data_type());
            }
        }

        let rows = rows
            .into_iter()
            .map(|row| {
                let mut values = row.values;
                values.resize(names.len(), Value::Null);
                Row::new(
                    values
                        .into_iter()
                        .zip(&types)
                        .map(|(value, data_type)| value.coerce(*data_type))
                        .collect(),
                )
            })
            .collect();

        let columns = names
            .into_iter()
            .zip(types)
            .map(|(name, data_type)| Column { name, data_type })
            .collect();

        Self {
            schema: Schema::new(columns),
            rows,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All values of one column, in row order
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let index = self.schema.get_column_index(name)?;
        Some(self.rows.iter().map(|row| &row.values[index]).collect())
    }
}
