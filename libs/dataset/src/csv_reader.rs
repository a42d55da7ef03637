use std::collections::HashSet;
use std::io::Read;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use csv::StringRecord;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::{DataType, Field, Row, Schema, SchemaRef, Value};

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvOptions {
    #[serde(default = "default_delimiter")]
    pub delimiter: u8,
    #[serde(default)]
    pub has_header: bool,
}

fn default_delimiter() -> u8 {
    b','
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            has_header: false,
        }
    }
}

impl CsvOptions {
    pub fn reader<R: Read>(&self, rdr: R) -> csv::Reader<R> {
        csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(self.has_header)
            .from_reader(rdr)
    }

    pub fn infer_schema<R: Read>(&self, rdr: R) -> Result<SchemaRef> {
        let mut reader = self.reader(rdr);

        let headers: Vec<String> = if self.has_header {
            let headers = &reader.headers()?.clone();
            headers.iter().map(|s| s.to_string()).collect()
        } else {
            let first_record_count = &reader.headers()?.len();
            (0..*first_record_count)
                .map(|i| format!("c{}", i + 1))
                .collect()
        };

        let header_length = headers.len();
        let mut column_types: Vec<HashSet<DataType>> = vec![HashSet::new(); header_length];
        let mut fields = Vec::new();
        let mut record = StringRecord::new();

        while reader.read_record(&mut record)? {
            for (i, column_type) in column_types.iter_mut().enumerate().take(header_length) {
                if let Some(string) = record.get(i) {
                    if !string.is_empty() {
                        column_type.insert(infer_field_type(string));
                    }
                }
            }
        }

        for (possibilities, field_name) in column_types.iter().zip(&headers) {
            let data_type = match possibilities.len() {
                0 => DataType::String,
                1 => possibilities
                    .iter()
                    .next()
                    .copied()
                    .unwrap_or(DataType::String),
                2 if possibilities.contains(&DataType::Int64)
                    && possibilities.contains(&DataType::Float64) =>
                {
                    DataType::Float64
                }
                _ => DataType::String,
            };
            fields.push(Field::new(field_name, data_type));
        }

        Ok(Arc::new(Schema::try_new(fields)?))
    }
}

fn infer_field_type(string: &str) -> DataType {
    static DECIMAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?(\d+\.\d+)$").unwrap());
    static INTEGER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?(\d+)$").unwrap());
    static BOOLEAN_RE: Lazy<Regex> = Lazy::new(|| {
        RegexBuilder::new(r"^(true)$|^(false)$")
            .case_insensitive(true)
            .build()
            .unwrap()
    });

    if string.starts_with('"') {
        return DataType::String;
    }
    if BOOLEAN_RE.is_match(string) {
        DataType::Boolean
    } else if DECIMAL_RE.is_match(string) {
        DataType::Float64
    } else if INTEGER_RE.is_match(string) {
        DataType::Int64
    } else {
        DataType::String
    }
}

fn parse_value<T: FromStr>(field: &Field, value: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    T::from_str(value).with_context(|| {
        format!(
            "failed to parse '{}' as {} for field '{}'",
            value, field.data_type, field.name
        )
    })
}

/// Converts one csv record into a row typed by `schema`.
///
/// Missing trailing columns, and empty cells of non-string fields, become `null`.
pub fn parse_record(schema: &Schema, record: &StringRecord) -> Result<Row> {
    let mut values = Vec::with_capacity(schema.len());

    for (idx, field) in schema.fields().iter().enumerate() {
        let value = match record.get(idx) {
            None => Value::Null,
            Some(s) if s.is_empty() && field.data_type != DataType::String => Value::Null,
            Some(s) => match field.data_type {
                DataType::Null => Value::Null,
                DataType::Int64 => Value::Int64(parse_value(field, s)?),
                DataType::Float64 => Value::Float64(parse_value(field, s)?),
                DataType::Boolean => Value::Boolean(parse_value(field, &s.to_ascii_lowercase())?),
                DataType::Timestamp => Value::Timestamp(parse_value(field, s)?),
                DataType::String => Value::from(s),
                DataType::Opaque => {
                    anyhow::bail!("field '{}' is opaque and can not be read from csv", field.name)
                }
            },
        };
        values.push(value);
    }

    Ok(Row::new(values))
}
