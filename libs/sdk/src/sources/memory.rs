use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{BoundedReader, BoundedSource, PipelineOptions, MIN_TIMESTAMP};

/// A bounded source over elements held in memory, each with an event timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySource<T> {
    elements: Vec<(T, i64)>,
}

impl<T> MemorySource<T> {
    pub fn from_values(values: impl IntoIterator<Item = T>) -> Self {
        Self {
            elements: values
                .into_iter()
                .map(|value| (value, MIN_TIMESTAMP))
                .collect(),
        }
    }

    pub fn from_timestamped(values: impl IntoIterator<Item = (T, i64)>) -> Self {
        Self {
            elements: values.into_iter().collect(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl<T> BoundedSource for MemorySource<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    type Output = T;
    type Reader = MemoryReader<T>;

    /// Cuts the elements into `ceil(size / desired)` contiguous bundles of
    /// near-equal length; earlier bundles take the remainder.
    fn split(
        &self,
        desired_bundle_size_bytes: u64,
        options: &PipelineOptions,
    ) -> Result<Vec<Self>> {
        if self.elements.len() <= 1 {
            return Ok(vec![self.clone()]);
        }

        let total_size = self.estimated_size_bytes(options)?;
        let desired = desired_bundle_size_bytes.max(1);
        let rounding = if total_size % desired == 0 { 0 } else { 1 };
        let num_bundles = (total_size / desired + rounding)
            .max(1)
            .min(self.elements.len() as u64) as usize;

        let base = self.elements.len() / num_bundles;
        let extra = self.elements.len() % num_bundles;
        let mut bundles = Vec::with_capacity(num_bundles);
        let mut offset = 0;

        for idx in 0..num_bundles {
            let len = if idx < extra { base + 1 } else { base };
            bundles.push(Self {
                elements: self.elements[offset..offset + len].to_vec(),
            });
            offset += len;
        }

        Ok(bundles)
    }

    fn estimated_size_bytes(&self, _options: &PipelineOptions) -> Result<u64> {
        self.elements.iter().try_fold(0u64, |size, (value, _)| {
            let value_size =
                bincode::serialized_size(value).context("failed to estimate element size")?;
            Ok(size + value_size)
        })
    }

    fn create_reader(&self, _options: &PipelineOptions) -> Result<Self::Reader> {
        Ok(MemoryReader {
            elements: self.elements.clone(),
            position: None,
        })
    }
}

pub struct MemoryReader<T> {
    elements: Vec<(T, i64)>,
    position: Option<usize>,
}

impl<T> MemoryReader<T> {
    fn current_element(&self) -> Result<&(T, i64)> {
        match self.position {
            Some(position) => self
                .elements
                .get(position)
                .ok_or_else(|| anyhow::anyhow!("reader has no current element")),
            None => anyhow::bail!("reader has not been started"),
        }
    }
}

impl<T: Send> BoundedReader for MemoryReader<T> {
    type Item = T;

    fn start(&mut self) -> Result<bool> {
        self.position = Some(0);
        Ok(!self.elements.is_empty())
    }

    fn advance(&mut self) -> Result<bool> {
        let position = match self.position {
            Some(position) => (position + 1).min(self.elements.len()),
            None => anyhow::bail!("reader has not been started"),
        };
        self.position = Some(position);
        Ok(position < self.elements.len())
    }

    fn current(&self) -> Result<&Self::Item> {
        self.current_element().map(|(value, _)| value)
    }

    fn current_timestamp(&self) -> Result<i64> {
        self.current_element().map(|(_, timestamp)| *timestamp)
    }

    fn close(&mut self) -> Result<()> {
        self.elements.clear();
        self.position = None;
        Ok(())
    }
}
