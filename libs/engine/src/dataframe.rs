use std::sync::Arc;

use anyhow::Result;
use futures_util::future::try_join_all;
use futures_util::stream::BoxStream;
use yql_dataset::{DataSet, Row, SchemaRef};

use crate::task::{spawn_partition_tasks, MapFn};
use crate::{InputPartition, SessionConfigRef, TableProviderRef};

/// A lazily evaluated, partitioned collection backed by a table provider.
///
/// Nothing is read until one of the collecting methods runs; every run plans
/// the provider's partitions again.
pub struct DataFrame<T> {
    config: SessionConfigRef,
    provider: TableProviderRef,
    transform: MapFn<T>,
}

impl<T> Clone for DataFrame<T> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            provider: self.provider.clone(),
            transform: self.transform.clone(),
        }
    }
}

impl DataFrame<Row> {
    pub(crate) fn new(config: SessionConfigRef, provider: TableProviderRef) -> Self {
        Self {
            config,
            provider,
            transform: Arc::new(|row: Row| -> Result<Row> { Ok(row) }),
        }
    }

    pub async fn collect_dataset(&self) -> Result<DataSet> {
        let rows = self.collect().await?;
        DataSet::try_new(self.provider.schema(), rows)
    }
}

impl<T: Send + 'static> DataFrame<T> {
    /// Schema of the rows the provider produces.
    pub fn schema(&self) -> SchemaRef {
        self.provider.schema()
    }

    /// Plans the partitions without reading them.
    pub fn partitions(&self) -> Result<Vec<InputPartition>> {
        self.provider.plan_partitions()
    }

    /// Applies `f` to every item, inside the task reading its partition.
    pub fn map<U, F>(self, f: F) -> DataFrame<U>
    where
        U: Send + 'static,
        F: Fn(T) -> Result<U> + Send + Sync + 'static,
    {
        let prev = self.transform;
        DataFrame {
            config: self.config,
            provider: self.provider,
            transform: Arc::new(move |row: Row| -> Result<U> { f(prev(row)?) }),
        }
    }

    /// Runs every partition and returns their items in planning order.
    pub async fn collect_partitions(&self) -> Result<Vec<Vec<T>>> {
        let mut tasks = spawn_partition_tasks(&self.config, &self.provider, &self.transform)?;
        let partitions =
            try_join_all(tasks.handles_mut().map(|handle| async move { handle.await? })).await?;
        Ok(partitions)
    }

    pub async fn collect(&self) -> Result<Vec<T>> {
        Ok(self
            .collect_partitions()
            .await?
            .into_iter()
            .flatten()
            .collect())
    }

    pub async fn count(&self) -> Result<usize> {
        Ok(self
            .collect_partitions()
            .await?
            .iter()
            .map(Vec::len)
            .sum())
    }

    /// Yields items partition by partition, as soon as each partition is read.
    pub fn into_stream(self) -> BoxStream<'static, Result<T>> {
        Box::pin(async_stream::try_stream! {
            let mut tasks = spawn_partition_tasks(&self.config, &self.provider, &self.transform)?;
            for handle in tasks.handles_mut() {
                let items = handle.await??;
                for item in items {
                    yield item;
                }
            }
        })
    }
}
