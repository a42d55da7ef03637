use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use anyhow::Result;
use yql_dataset::{Row, SchemaRef};
use yql_engine::{
    BoxRowReader, InputPartition, RowReader, TableProvider, TableProviderFactory,
    TableProviderRef,
};
use yql_sdk::{BoundedSource, PipelineOptions};

use crate::{planner, row_adapter, Error, PartitionDescriptor, PartitionReader, SourceOptions};

/// Engine provider reading any bounded source of type `S`.
///
/// Registered under the name [`BoundedSourceProvider::name`]; the source
/// itself arrives through [`SourceOptions`].
pub struct BoundedSourceProvider<S> {
    _marker: PhantomData<fn() -> S>,
}

impl<S> Default for BoundedSourceProvider<S> {
    fn default() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<S: BoundedSource> BoundedSourceProvider<S> {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn name() -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl<S: BoundedSource> TableProviderFactory for BoundedSourceProvider<S> {
    fn provider_name(&self) -> &'static str {
        Self::name()
    }

    fn create(&self, options: &HashMap<String, String>) -> Result<TableProviderRef> {
        let options = SourceOptions::from_map(options);
        Ok(Arc::new(SourceTable::<S> {
            source: options.source()?,
            parallelism: options.parallelism()?,
            options: options.pipeline_options()?,
        }))
    }
}

struct SourceTable<S> {
    source: S,
    parallelism: i64,
    options: PipelineOptions,
}

impl<S: BoundedSource> TableProvider for SourceTable<S> {
    fn schema(&self) -> SchemaRef {
        row_adapter::schema()
    }

    fn plan_partitions(&self) -> Result<Vec<InputPartition>> {
        Ok(planner::plan(&self.source, self.parallelism, &self.options)?
            .into_iter()
            .map(InputPartition::from)
            .collect())
    }

    fn create_reader(&self, partition: &InputPartition) -> Result<BoxRowReader> {
        let mut reader = PartitionReader::<S>::new();
        reader.open(&PartitionDescriptor::from(partition.clone()), &self.options)?;
        Ok(Box::new(SourceRowReader { reader }))
    }

    /// Only open and read failures are retried; untyped errors keep the engine default.
    fn should_retry(&self, err: &anyhow::Error) -> bool {
        Error::of(err).map_or(true, Error::is_retryable)
    }
}

struct SourceRowReader<S: BoundedSource> {
    reader: PartitionReader<S>,
}

impl<S: BoundedSource> RowReader for SourceRowReader<S> {
    fn next(&mut self) -> Result<Option<Row>> {
        if !self.reader.advance()? {
            return Ok(None);
        }
        Ok(Some(row_adapter::wrap(self.reader.current()?.clone())))
    }

    fn close(&mut self) -> Result<()> {
        self.reader.close()
    }
}
