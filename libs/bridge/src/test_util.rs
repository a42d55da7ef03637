use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use yql_sdk::{BoundedReader, BoundedSource, PipelineOptions};

#[derive(Default)]
pub struct Tracker {
    opened: AtomicUsize,
    closed: AtomicUsize,
}

impl Tracker {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

static TRACKERS: Lazy<Mutex<HashMap<String, Arc<Tracker>>>> = Lazy::new(Default::default);

/// Counters shared by every reader of the sources named `name`.
pub fn tracker(name: &str) -> Arc<Tracker> {
    TRACKERS
        .lock()
        .entry(name.to_string())
        .or_default()
        .clone()
}

/// Integers whose readers report to a [`Tracker`] and fail on request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedSource {
    name: String,
    values: Vec<i64>,
    fail_open: bool,
    fail_at: Option<usize>,
}

impl TrackedSource {
    pub fn new(name: &str, values: Vec<i64>) -> Self {
        Self {
            name: name.to_string(),
            values,
            fail_open: false,
            fail_at: None,
        }
    }

    pub fn fail_open(self) -> Self {
        Self {
            fail_open: true,
            ..self
        }
    }

    /// Fails when the reader moves to the value at `index`.
    pub fn fail_at(self, index: usize) -> Self {
        Self {
            fail_at: Some(index),
            ..self
        }
    }
}

impl BoundedSource for TrackedSource {
    type Output = i64;
    type Reader = TrackedReader;

    fn split(
        &self,
        desired_bundle_size_bytes: u64,
        _options: &PipelineOptions,
    ) -> Result<Vec<Self>> {
        let per_split = (desired_bundle_size_bytes / 8).max(1) as usize;
        Ok(self
            .values
            .chunks(per_split)
            .map(|values| Self {
                values: values.to_vec(),
                ..self.clone()
            })
            .collect())
    }

    fn estimated_size_bytes(&self, _options: &PipelineOptions) -> Result<u64> {
        Ok(self.values.len() as u64 * 8)
    }

    fn create_reader(&self, _options: &PipelineOptions) -> Result<Self::Reader> {
        anyhow::ensure!(!self.fail_open, "connection refused");
        let tracker = tracker(&self.name);
        tracker.opened.fetch_add(1, Ordering::SeqCst);
        Ok(TrackedReader {
            tracker,
            values: self.values.clone(),
            fail_at: self.fail_at,
            position: None,
        })
    }
}

pub struct TrackedReader {
    tracker: Arc<Tracker>,
    values: Vec<i64>,
    fail_at: Option<usize>,
    position: Option<usize>,
}

impl TrackedReader {
    fn move_to(&mut self, position: usize) -> Result<bool> {
        anyhow::ensure!(self.fail_at != Some(position), "connection reset");
        self.position = Some(position);
        Ok(position < self.values.len())
    }
}

impl BoundedReader for TrackedReader {
    type Item = i64;

    fn start(&mut self) -> Result<bool> {
        self.move_to(0)
    }

    fn advance(&mut self) -> Result<bool> {
        let next = self.position.map_or(0, |position| position + 1);
        self.move_to(next)
    }

    fn current(&self) -> Result<&i64> {
        self.position
            .and_then(|position| self.values.get(position))
            .ok_or_else(|| anyhow::anyhow!("no current value"))
    }

    fn current_timestamp(&self) -> Result<i64> {
        Ok(*self.current()? * 1000)
    }

    fn close(&mut self) -> Result<()> {
        self.tracker.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
