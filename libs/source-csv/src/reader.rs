use std::io::Read;

use anyhow::{Context, Result};
use csv::StringRecord;
use yql_dataset::{parse_record, Row, SchemaRef, Value};
use yql_sdk::{BoundedReader, MIN_TIMESTAMP};

pub struct CsvReader {
    reader: csv::Reader<Box<dyn Read + Send>>,
    schema: SchemaRef,
    timestamp_index: Option<usize>,
    start: u64,
    end: Option<u64>,
    next_index: u64,
    record: StringRecord,
    current: Option<(Row, i64)>,
}

impl CsvReader {
    pub(crate) fn new(
        reader: csv::Reader<Box<dyn Read + Send>>,
        schema: SchemaRef,
        timestamp_index: Option<usize>,
        start: u64,
        end: Option<u64>,
    ) -> Self {
        Self {
            reader,
            schema,
            timestamp_index,
            start,
            end,
            next_index: 0,
            record: StringRecord::new(),
            current: None,
        }
    }

    fn read_next(&mut self) -> Result<bool> {
        self.current = None;
        if matches!(self.end, Some(end) if self.next_index >= end) {
            return Ok(false);
        }
        if !self.reader.read_record(&mut self.record)? {
            return Ok(false);
        }

        let index = self.next_index;
        self.next_index += 1;
        let row = parse_record(&self.schema, &self.record)
            .with_context(|| format!("failed to parse csv record {}", index))?;
        let timestamp = match self.timestamp_index.and_then(|idx| row.get(idx)) {
            Some(Value::Timestamp(millis)) | Some(Value::Int64(millis)) => *millis,
            _ => MIN_TIMESTAMP,
        };
        self.current = Some((row, timestamp));
        Ok(true)
    }
}

impl BoundedReader for CsvReader {
    type Item = Row;

    fn start(&mut self) -> Result<bool> {
        let mut skipped = StringRecord::new();
        while self.next_index < self.start {
            if !self.reader.read_record(&mut skipped)? {
                return Ok(false);
            }
            self.next_index += 1;
        }
        self.read_next()
    }

    fn advance(&mut self) -> Result<bool> {
        self.read_next()
    }

    fn current(&self) -> Result<&Row> {
        match &self.current {
            Some((row, _)) => Ok(row),
            None => anyhow::bail!("csv reader has no current record"),
        }
    }

    fn current_timestamp(&self) -> Result<i64> {
        match &self.current {
            Some((_, timestamp)) => Ok(*timestamp),
            None => anyhow::bail!("csv reader has no current record"),
        }
    }

    fn close(&mut self) -> Result<()> {
        self.current = None;
        Ok(())
    }
}
