// Output rendering for data sets: JSON, CSV and a text table

use super::{DataSet, Value};
use crate::error::{QueryError, Result};
use std::fmt;
use std::str::FromStr;

/// The text formats a result can be rendered as
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
    Table,
}

impl FromStr for OutputFormat {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            "table" => Ok(OutputFormat::Table),
            _ => Err(QueryError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
            OutputFormat::Table => write!(f, "table"),
        }
    }
}

impl DataSet {
    /// Render the data set in the given format
    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => self.to_json(),
            OutputFormat::Csv => self.to_csv(),
            OutputFormat::Table => Ok(self.to_string()),
        }
    }

    /// Render as a JSON array of objects on a single line
    /// Keys follow the column order of the schema
    pub fn to_json(&self) -> Result<String> {
        let records: Vec<serde_json::Value> = self
            .rows
            .iter()
            .map(|row| {
                let object = self
                    .schema
                    .columns
                    .iter()
                    .zip(&row.values)
                    .map(|(column, value)| (column.name.clone(), value.to_json()))
                    .collect::<serde_json::Map<_, _>>();
                serde_json::Value::Object(object)
            })
            .collect();

        serde_json::to_string(&records).map_err(|e| QueryError::Output(e.to_string()))
    }

    /// Render as CSV with a header line; NULL becomes an empty field
    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());

        writer
            .write_record(self.schema.columns.iter().map(|c| c.name.as_str()))
            .map_err(|e| QueryError::Output(e.to_string()))?;

        for row in &self.rows {
            writer
                .write_record(row.values.iter().map(|value| match value {
                    Value::Null => String::new(),
                    other => other.to_string(),
                }))
                .map_err(|e| QueryError::Output(e.to_string()))?;
        }

        let buf = writer
            .into_inner()
            .map_err(|e| QueryError::Output(e.to_string()))?;
        String::from_utf8(buf).map_err(|e| QueryError::Output(e.to_string()))
    }
}

/// Box-drawn table for terminals
impl fmt::Display for DataSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rows.is_empty() {
            return write!(f, "No rows found");
        }

        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.values.iter().map(|v| v.to_string()).collect())
            .collect();

        // Calculate column widths
        let mut widths: Vec<usize> = self
            .schema
            .columns
            .iter()
            .map(|c| c.name.chars().count())
            .collect();
        for row in &cells {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }

        f.write_str(&border(&widths, "┌", "┬", "┐"))?;
        f.write_str(&table_line(
            self.schema.columns.iter().map(|c| c.name.as_str()),
            &widths,
        ))?;
        f.write_str(&border(&widths, "├", "┼", "┤"))?;
        for row in &cells {
            f.write_str(&table_line(row.iter().map(String::as_str), &widths))?;
        }
        f.write_str(&border(&widths, "└", "┴", "┘"))?;

        write!(f, "\n{} row(s) returned", self.rows.len())
    }
}

fn border(widths: &[usize], left: &str, mid: &str, right: &str) -> String {
    let segments: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
    format!("{}{}{}\n", left, segments.join(mid), right)
}

fn table_line<'a>(values: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let mut out = String::from("│");
    for (value, width) in values.zip(widths) {
        let pad = width - value.chars().count();
        out.push_str(&format!(" {}{} │", value, " ".repeat(pad)));
    }
    out.push('\n');
    out
}
