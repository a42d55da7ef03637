use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use yql_dataset::{Row, SchemaRef};

/// An opaque handle to one slice of a table.
///
/// The engine only looks at `index` and `estimated_size_bytes`; the payload
/// belongs to the provider that planned it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputPartition {
    pub index: usize,
    pub payload: Vec<u8>,
    pub estimated_size_bytes: u64,
}

/// Pulls the rows of one partition.
pub trait RowReader: Send {
    fn next(&mut self) -> Result<Option<Row>>;

    /// Releases everything the reader holds. Called exactly once by the engine.
    fn close(&mut self) -> Result<()>;
}

pub type BoxRowReader = Box<dyn RowReader>;

pub trait TableProvider: Send + Sync + 'static {
    fn schema(&self) -> SchemaRef;

    /// Called once per execution, on the driver.
    fn plan_partitions(&self) -> Result<Vec<InputPartition>>;

    /// Called inside the worker task that reads `partition`.
    fn create_reader(&self, partition: &InputPartition) -> Result<BoxRowReader>;

    /// Whether a partition task that failed with `err` may run again.
    fn should_retry(&self, _err: &anyhow::Error) -> bool {
        true
    }
}

pub type TableProviderRef = Arc<dyn TableProvider>;

/// A named provider, configured through a string option map.
pub trait TableProviderFactory: Send + Sync + 'static {
    fn provider_name(&self) -> &'static str;

    fn create(&self, options: &HashMap<String, String>) -> Result<TableProviderRef>;
}
