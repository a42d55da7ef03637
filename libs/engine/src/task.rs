use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use yql_dataset::Row;

use crate::{BoxRowReader, InputPartition, SessionConfigRef, TableProviderRef};

pub(crate) type MapFn<T> = Arc<dyn Fn(Row) -> Result<T> + Send + Sync>;

/// Closes the reader on drop unless it was closed explicitly.
struct ReaderGuard {
    partition: usize,
    reader: Option<BoxRowReader>,
}

impl ReaderGuard {
    fn next(&mut self) -> Result<Option<Row>> {
        match &mut self.reader {
            Some(reader) => reader.next(),
            None => anyhow::bail!("partition reader {} is closed", self.partition),
        }
    }

    fn close(mut self) -> Result<()> {
        match self.reader.take() {
            Some(mut reader) => reader.close(),
            None => Ok(()),
        }
    }
}

impl Drop for ReaderGuard {
    fn drop(&mut self) {
        if let Some(mut reader) = self.reader.take() {
            if let Err(err) = reader.close() {
                tracing::warn!(
                    partition = self.partition,
                    error = %err,
                    "failed to close partition reader"
                );
            }
        }
    }
}

fn run_attempt<T>(
    provider: &TableProviderRef,
    partition: &InputPartition,
    transform: &MapFn<T>,
) -> Result<Vec<T>> {
    let mut guard = ReaderGuard {
        partition: partition.index,
        reader: Some(provider.create_reader(partition)?),
    };

    let mut items = Vec::new();
    let res = loop {
        match guard.next() {
            Ok(Some(row)) => match transform(row) {
                Ok(item) => items.push(item),
                Err(err) => break Err(err),
            },
            Ok(None) => break Ok(()),
            Err(err) => break Err(err),
        }
    };

    match res {
        Ok(()) => {
            guard.close().context("failed to close partition reader")?;
            Ok(items)
        }
        Err(err) => {
            if let Err(close_err) = guard.close() {
                tracing::warn!(
                    partition = partition.index,
                    error = %close_err,
                    "failed to close partition reader after a read failure"
                );
            }
            Err(err)
        }
    }
}

fn run_partition<T>(
    provider: &TableProviderRef,
    partition: &InputPartition,
    transform: &MapFn<T>,
    max_attempts: usize,
) -> Result<Vec<T>> {
    let mut attempt = 1;
    loop {
        match run_attempt(provider, partition, transform) {
            Ok(items) => {
                tracing::debug!(
                    partition = partition.index,
                    attempt,
                    rows = items.len(),
                    "partition task finished"
                );
                return Ok(items);
            }
            Err(err) if attempt < max_attempts && provider.should_retry(&err) => {
                tracing::warn!(
                    partition = partition.index,
                    attempt,
                    error = %err,
                    "partition task failed, retrying"
                );
                attempt += 1;
            }
            Err(err) => {
                return Err(err.context(format!(
                    "partition {} failed after {} attempt(s)",
                    partition.index, attempt
                )))
            }
        }
    }
}

async fn run_partition_task<T: Send + 'static>(
    config: SessionConfigRef,
    semaphore: Arc<Semaphore>,
    provider: TableProviderRef,
    partition: InputPartition,
    transform: MapFn<T>,
) -> Result<Vec<T>> {
    let permit = semaphore.acquire_owned().await?;
    tracing::debug!(
        name = %config.name,
        partition = partition.index,
        estimated_size_bytes = partition.estimated_size_bytes,
        "partition task started"
    );
    let max_attempts = config.task_max_attempts;
    tokio::task::spawn_blocking(move || {
        let _permit = permit;
        run_partition(&provider, &partition, &transform, max_attempts)
    })
    .await?
}

/// Running partition tasks, in planning order.
///
/// Dropping this aborts every task that has not finished. A partition whose
/// blocking read already started runs to completion and closes its reader.
pub(crate) struct PartitionTasks<T> {
    handles: Vec<JoinHandle<Result<Vec<T>>>>,
}

impl<T> PartitionTasks<T> {
    pub(crate) fn handles_mut(
        &mut self,
    ) -> impl Iterator<Item = &mut JoinHandle<Result<Vec<T>>>> {
        self.handles.iter_mut()
    }
}

impl<T> Drop for PartitionTasks<T> {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

/// Plans the provider's partitions and starts one task per partition.
pub(crate) fn spawn_partition_tasks<T: Send + 'static>(
    config: &SessionConfigRef,
    provider: &TableProviderRef,
    transform: &MapFn<T>,
) -> Result<PartitionTasks<T>> {
    let partitions = provider.plan_partitions()?;
    tracing::debug!(
        name = %config.name,
        partitions = partitions.len(),
        "planned partitions"
    );

    let semaphore = Arc::new(Semaphore::new(config.max_concurrent_tasks));
    let handles = partitions
        .into_iter()
        .map(|partition| {
            tokio::spawn(run_partition_task(
                config.clone(),
                semaphore.clone(),
                provider.clone(),
                partition,
                transform.clone(),
            ))
        })
        .collect();
    Ok(PartitionTasks { handles })
}
