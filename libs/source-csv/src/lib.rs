mod reader;

use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use yql_dataset::{CsvOptions, DataType, Row, SchemaRef};
use yql_sdk::{BoundedSource, PipelineOptions};

pub use reader::CsvReader;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum CsvInput {
    Path(PathBuf),
    Data(String),
}

impl CsvInput {
    fn open(&self) -> Result<Box<dyn Read + Send>> {
        match self {
            CsvInput::Path(path) => {
                let file = File::open(path)
                    .with_context(|| format!("failed to open csv file '{}'", path.display()))?;
                Ok(Box::new(file))
            }
            CsvInput::Data(data) => Ok(Box::new(Cursor::new(data.clone().into_bytes()))),
        }
    }
}

/// A bounded source over csv records, split by record ranges.
///
/// Every record becomes a [`Row`] typed by the source schema. When a
/// timestamp column is set, its value (milliseconds, `timestamp` or `int64`)
/// is the record timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvSource {
    input: CsvInput,
    options: CsvOptions,
    schema: SchemaRef,
    timestamp_column: Option<String>,
    start: u64,
    end: Option<u64>,
}

impl CsvSource {
    pub fn from_path(
        options: CsvOptions,
        schema: Option<SchemaRef>,
        path: impl AsRef<Path>,
    ) -> Result<Self> {
        Self::new(options, schema, CsvInput::Path(path.as_ref().to_path_buf()))
    }

    pub fn from_data(
        options: CsvOptions,
        schema: Option<SchemaRef>,
        data: impl Into<String>,
    ) -> Result<Self> {
        Self::new(options, schema, CsvInput::Data(data.into()))
    }

    fn new(options: CsvOptions, schema: Option<SchemaRef>, input: CsvInput) -> Result<Self> {
        let schema = match schema {
            Some(schema) => schema,
            None => options.infer_schema(input.open()?)?,
        };
        Ok(Self {
            input,
            options,
            schema,
            timestamp_column: None,
            start: 0,
            end: None,
        })
    }

    pub fn with_timestamp_column(self, name: impl Into<String>) -> Result<Self> {
        let source = Self {
            timestamp_column: Some(name.into()),
            ..self
        };
        source.timestamp_index()?;
        Ok(source)
    }

    #[inline]
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// The records this source reads, as `[start, end)`; `None` reads to the end.
    #[inline]
    pub fn range(&self) -> (u64, Option<u64>) {
        (self.start, self.end)
    }

    fn with_range(&self, start: u64, end: u64) -> Self {
        Self {
            start,
            end: Some(end),
            ..self.clone()
        }
    }

    fn timestamp_index(&self) -> Result<Option<usize>> {
        let name = match &self.timestamp_column {
            Some(name) => name,
            None => return Ok(None),
        };
        let (index, field) = self
            .schema
            .field(name)
            .with_context(|| format!("timestamp column '{}' does not exist", name))?;
        anyhow::ensure!(
            matches!(field.data_type, DataType::Timestamp | DataType::Int64),
            "timestamp column '{}' must be timestamp or int64, actual datatype is {}",
            name,
            field.data_type
        );
        Ok(Some(index))
    }

    fn open_reader(&self) -> Result<csv::Reader<Box<dyn Read + Send>>> {
        let mut reader = self.options.reader(self.input.open()?);
        if self.options.has_header {
            reader.headers().context("failed to read csv header")?;
        }
        Ok(reader)
    }

    /// Byte length of every record in range, in order.
    fn record_sizes(&self) -> Result<Vec<u64>> {
        let mut reader = self.open_reader()?;
        let mut record = csv::ByteRecord::new();
        let mut sizes = Vec::new();
        let mut index = 0u64;

        loop {
            if matches!(self.end, Some(end) if index >= end) {
                break;
            }
            let offset = reader.position().byte();
            if !reader.read_byte_record(&mut record)? {
                break;
            }
            if index >= self.start {
                sizes.push(reader.position().byte() - offset);
            }
            index += 1;
        }

        Ok(sizes)
    }
}

impl BoundedSource for CsvSource {
    type Output = Row;
    type Reader = CsvReader;

    fn split(
        &self,
        desired_bundle_size_bytes: u64,
        _options: &PipelineOptions,
    ) -> Result<Vec<Self>> {
        let sizes = self.record_sizes()?;
        let mut splits = Vec::new();
        let mut start = self.start;
        let mut bundle_size = 0u64;

        for (index, size) in (self.start..).zip(&sizes) {
            bundle_size += size;
            if bundle_size >= desired_bundle_size_bytes {
                splits.push(self.with_range(start, index + 1));
                start = index + 1;
                bundle_size = 0;
            }
        }
        let end = self.start + sizes.len() as u64;
        if start < end {
            splits.push(self.with_range(start, end));
        }

        tracing::debug!(
            records = sizes.len(),
            splits = splits.len(),
            desired_bundle_size_bytes,
            "split csv source"
        );
        Ok(splits)
    }

    fn estimated_size_bytes(&self, _options: &PipelineOptions) -> Result<u64> {
        Ok(self.record_sizes()?.iter().sum())
    }

    fn create_reader(&self, _options: &PipelineOptions) -> Result<Self::Reader> {
        Ok(CsvReader::new(
            self.open_reader()?,
            self.schema.clone(),
            self.timestamp_index()?,
            self.start,
            self.end,
        ))
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.end.map_or(true, |end| end >= self.start),
            "invalid csv record range: {}..{:?}",
            self.start,
            self.end
        );
        self.timestamp_index().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Arc;

    use yql_dataset::{Field, Schema, Value};
    use yql_sdk::BoundedReader;

    use super::*;

    const DATA: &str = "ts,name,amount\n1000,a,1\n2000,b,2\n3000,c,3\n4000,d,4\n5000,e,5\n";

    fn header() -> CsvOptions {
        CsvOptions {
            has_header: true,
            ..CsvOptions::default()
        }
    }

    fn read_all(source: &CsvSource) -> Vec<(Row, i64)> {
        let mut reader = source.create_reader(&PipelineOptions::default()).unwrap();
        let mut records = Vec::new();
        let mut available = reader.start().unwrap();
        while available {
            records.push((
                reader.current().unwrap().clone(),
                reader.current_timestamp().unwrap(),
            ));
            available = reader.advance().unwrap();
        }
        reader.close().unwrap();
        records
    }

    #[test]
    fn test_infer_and_read() {
        let source = CsvSource::from_data(header(), None, DATA)
            .unwrap()
            .with_timestamp_column("ts")
            .unwrap();
        assert_eq!(source.schema().fields()[0], Field::new("ts", DataType::Int64));

        let records = read_all(&source);
        assert_eq!(records.len(), 5);
        assert_eq!(
            records[1].0.values(),
            &[Value::Int64(2000), Value::from("b"), Value::Int64(2)]
        );
        assert_eq!(
            records.iter().map(|(_, ts)| *ts).collect::<Vec<_>>(),
            vec![1000, 2000, 3000, 4000, 5000]
        );
    }

    #[test]
    fn test_split_by_size() {
        let source = CsvSource::from_data(header(), None, DATA).unwrap();
        let options = PipelineOptions::default();
        // every record is 9 bytes, newline included
        assert_eq!(source.estimated_size_bytes(&options).unwrap(), 45);

        let splits = source.split(18, &options).unwrap();
        assert_eq!(
            splits.iter().map(CsvSource::range).collect::<Vec<_>>(),
            vec![(0, Some(2)), (2, Some(4)), (4, Some(5))]
        );
        assert_eq!(splits[2].estimated_size_bytes(&options).unwrap(), 9);

        let names = splits
            .iter()
            .flat_map(read_all)
            .map(|(row, _)| row.get(1).cloned().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            ["a", "b", "c", "d", "e"]
                .iter()
                .map(|name| Value::from(*name))
                .collect::<Vec<_>>()
        );

        let resplit = splits[0].split(1, &options).unwrap();
        assert_eq!(
            resplit.iter().map(CsvSource::range).collect::<Vec<_>>(),
            vec![(0, Some(1)), (1, Some(2))]
        );
    }

    #[test]
    fn test_empty() {
        let source = CsvSource::from_data(header(), None, "ts,name\n").unwrap();
        assert!(source
            .split(10, &PipelineOptions::default())
            .unwrap()
            .is_empty());
        assert!(read_all(&source).is_empty());
    }

    #[test]
    fn test_default_timestamp() {
        let source = CsvSource::from_data(CsvOptions::default(), None, "x\ny\n").unwrap();
        let records = read_all(&source);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].1, yql_sdk::MIN_TIMESTAMP);
    }

    #[test]
    fn test_invalid_timestamp_column() {
        let source = CsvSource::from_data(header(), None, DATA).unwrap();
        assert_eq!(
            source
                .clone()
                .with_timestamp_column("when")
                .unwrap_err()
                .to_string(),
            "timestamp column 'when' does not exist"
        );
        assert!(source.with_timestamp_column("name").is_err());
    }

    #[test]
    fn test_parse_error() {
        let schema = Arc::new(
            Schema::try_new(vec![
                Field::new("id", DataType::Int64),
                Field::new("name", DataType::String),
            ])
            .unwrap(),
        );
        let source =
            CsvSource::from_data(CsvOptions::default(), Some(schema), "1,a\nx,b\n").unwrap();
        let mut reader = source.create_reader(&PipelineOptions::default()).unwrap();
        assert!(reader.start().unwrap());
        let err = reader.advance().unwrap_err();
        assert_eq!(err.to_string(), "failed to parse csv record 1");
    }

    #[test]
    fn test_from_path() {
        let path = std::env::temp_dir().join(format!("yql-source-csv-{}.csv", std::process::id()));
        File::create(&path)
            .unwrap()
            .write_all(DATA.as_bytes())
            .unwrap();

        let source = CsvSource::from_path(header(), None, &path).unwrap();
        assert_eq!(read_all(&source).len(), 5);
        std::fs::remove_file(&path).unwrap();

        assert!(CsvSource::from_path(header(), None, &path).is_err());
    }
}
