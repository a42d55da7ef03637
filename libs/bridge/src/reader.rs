use std::mem;

use anyhow::{Context, Result};
use derive_more::Display;
use yql_sdk::{BoundedReader, BoundedSource, PipelineOptions, WindowedValue};

use crate::{Error, PartitionDescriptor};

/// Lifecycle of a [`PartitionReader`].
#[derive(Debug, Display, Copy, Clone, Eq, PartialEq)]
pub enum ReaderState {
    #[display(fmt = "unopened")]
    Unopened,
    #[display(fmt = "open")]
    Open,
    #[display(fmt = "exhausted")]
    Exhausted,
    #[display(fmt = "failed")]
    Failed,
    #[display(fmt = "closed")]
    Closed,
}

/// Closes the source reader when dropped, unless it was closed explicitly.
struct SourceReaderGuard<R: BoundedReader> {
    partition: usize,
    reader: R,
    closed: bool,
}

impl<R: BoundedReader> SourceReaderGuard<R> {
    fn new(partition: usize, reader: R) -> Self {
        Self {
            partition,
            reader,
            closed: false,
        }
    }

    fn current_record(&self) -> Result<WindowedValue<R::Item>>
    where
        R::Item: Clone,
    {
        let value = self.reader.current()?.clone();
        let timestamp = self.reader.current_timestamp()?;
        Ok(WindowedValue::timestamped_in_global_window(value, timestamp))
    }

    fn close(mut self) -> Result<()> {
        self.closed = true;
        self.reader.close()
    }
}

impl<R: BoundedReader> Drop for SourceReaderGuard<R> {
    fn drop(&mut self) {
        if !self.closed {
            self.closed = true;
            if let Err(err) = self.reader.close() {
                tracing::warn!(
                    partition = self.partition,
                    error = %err,
                    "failed to close source reader"
                );
            }
        }
    }
}

enum State<R: BoundedReader> {
    Unopened,
    Open {
        reader: SourceReaderGuard<R>,
        started: bool,
        current: Option<WindowedValue<R::Item>>,
    },
    Exhausted {
        reader: SourceReaderGuard<R>,
    },
    Failed,
    Closed,
}

impl<R: BoundedReader> State<R> {
    fn kind(&self) -> ReaderState {
        match self {
            State::Unopened => ReaderState::Unopened,
            State::Open { .. } => ReaderState::Open,
            State::Exhausted { .. } => ReaderState::Exhausted,
            State::Failed => ReaderState::Failed,
            State::Closed => ReaderState::Closed,
        }
    }
}

/// Reads one partition of a bounded source, yielding its records in the
/// global window.
///
/// The first [`advance`](PartitionReader::advance) starts the source reader;
/// once it reports no more records every further call returns `false`. Any
/// failure moves the reader to [`ReaderState::Failed`] and releases the
/// source reader.
pub struct PartitionReader<S: BoundedSource> {
    partition: usize,
    state: State<S::Reader>,
}

impl<S: BoundedSource> Default for PartitionReader<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: BoundedSource> PartitionReader<S> {
    pub fn new() -> Self {
        Self {
            partition: 0,
            state: State::Unopened,
        }
    }

    #[inline]
    pub fn state(&self) -> ReaderState {
        self.state.kind()
    }

    pub fn open(
        &mut self,
        partition: &PartitionDescriptor,
        options: &PipelineOptions,
    ) -> Result<()> {
        if !matches!(self.state, State::Unopened) {
            return Err(state_error(format!(
                "can not open partition {}, reader is {}",
                partition.index(),
                self.state()
            )));
        }

        self.partition = partition.index();
        let reader = partition
            .source::<S>()
            .and_then(|source| {
                source.create_reader(options).with_context(|| {
                    Error::Open(format!("failed to open partition {}", partition.index()))
                })
            })
            .map_err(|err| {
                self.state = State::Failed;
                err
            })?;

        tracing::debug!(partition = self.partition, "partition reader opened");
        self.state = State::Open {
            reader: SourceReaderGuard::new(self.partition, reader),
            started: false,
            current: None,
        };
        Ok(())
    }

    /// Moves to the next record, returning `false` once the partition is drained.
    pub fn advance(&mut self) -> Result<bool> {
        match mem::replace(&mut self.state, State::Failed) {
            State::Open {
                reader, started, ..
            } => self.advance_open(reader, started),
            State::Exhausted { reader } => {
                self.state = State::Exhausted { reader };
                Ok(false)
            }
            state => {
                let kind = state.kind();
                self.state = state;
                Err(state_error(format!(
                    "can not advance partition {}, reader is {}",
                    self.partition, kind
                )))
            }
        }
    }

    fn advance_open(
        &mut self,
        mut reader: SourceReaderGuard<S::Reader>,
        started: bool,
    ) -> Result<bool> {
        let partition = self.partition;
        let res = if started {
            reader.reader.advance().with_context(|| {
                Error::Read(format!("failed to read partition {}", partition))
            })
        } else {
            reader.reader.start().with_context(|| {
                Error::Open(format!("failed to start partition {}", partition))
            })
        };
        let res = res.and_then(|available| {
            if available {
                reader.current_record().map(Some).with_context(|| {
                    Error::Read(format!("failed to read partition {}", partition))
                })
            } else {
                Ok(None)
            }
        });

        match res {
            Ok(Some(record)) => {
                self.state = State::Open {
                    reader,
                    started: true,
                    current: Some(record),
                };
                Ok(true)
            }
            Ok(None) => {
                tracing::debug!(partition, "partition reader exhausted");
                self.state = State::Exhausted { reader };
                Ok(false)
            }
            Err(err) => {
                if let Err(close_err) = reader.close() {
                    tracing::warn!(
                        partition,
                        error = %close_err,
                        "failed to close source reader after a read failure"
                    );
                }
                self.state = State::Failed;
                Err(err)
            }
        }
    }

    /// The record produced by the last successful [`advance`](Self::advance).
    pub fn current(&self) -> Result<&WindowedValue<S::Output>> {
        match &self.state {
            State::Open {
                current: Some(record),
                ..
            } => Ok(record),
            State::Open { current: None, .. } => Err(state_error(format!(
                "partition {} has no current record, advance was not called",
                self.partition
            ))),
            state => Err(state_error(format!(
                "partition {} has no current record, reader is {}",
                self.partition,
                state.kind()
            ))),
        }
    }

    /// Releases the source reader. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        match mem::replace(&mut self.state, State::Closed) {
            State::Open { reader, .. } | State::Exhausted { reader } => {
                tracing::debug!(partition = self.partition, "partition reader closed");
                reader.close().with_context(|| {
                    format!("failed to close source reader of partition {}", self.partition)
                })
            }
            State::Unopened | State::Failed | State::Closed => Ok(()),
        }
    }
}

fn state_error(message: String) -> anyhow::Error {
    Error::State(message).into()
}
