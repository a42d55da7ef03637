use std::convert::TryFrom;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use yql_engine::InputPartition;
use yql_sdk::{BoundedSource, PipelineOptions};

use crate::codec;

/// One planned slice of a source: the serialized split plus its size estimate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionDescriptor {
    index: usize,
    payload: Vec<u8>,
    estimated_size_bytes: u64,
}

impl PartitionDescriptor {
    pub fn new<S: BoundedSource>(
        index: usize,
        source: &S,
        estimated_size_bytes: u64,
    ) -> Result<Self> {
        Ok(Self {
            index,
            payload: codec::serialize_bytes(source)?,
            estimated_size_bytes,
        })
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn estimated_size_bytes(&self) -> u64 {
        self.estimated_size_bytes
    }

    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn source<S: DeserializeOwned>(&self) -> Result<S> {
        codec::deserialize_bytes(&self.payload)
    }
}

impl From<PartitionDescriptor> for InputPartition {
    fn from(descriptor: PartitionDescriptor) -> Self {
        InputPartition {
            index: descriptor.index,
            payload: descriptor.payload,
            estimated_size_bytes: descriptor.estimated_size_bytes,
        }
    }
}

impl From<InputPartition> for PartitionDescriptor {
    fn from(partition: InputPartition) -> Self {
        Self {
            index: partition.index,
            payload: partition.payload,
            estimated_size_bytes: partition.estimated_size_bytes,
        }
    }
}

/// Hints below one mean "no preference" and plan a single reader.
pub fn effective_parallelism(hint: i64) -> usize {
    if hint < 1 {
        1
    } else {
        usize::try_from(hint).unwrap_or(usize::MAX)
    }
}

/// `ceil(estimated / parallelism)`, never zero.
pub fn desired_bundle_size(estimated_size_bytes: u64, parallelism: usize) -> u64 {
    let parallelism = (parallelism as u64).max(1);
    let rounding = if estimated_size_bytes % parallelism == 0 {
        0
    } else {
        1
    };
    (estimated_size_bytes / parallelism + rounding).max(1)
}

/// Splits `source` into partitions for roughly `parallelism` readers.
///
/// The source decides the final count. A source returning no splits is read
/// as one partition.
pub fn plan<S: BoundedSource>(
    source: &S,
    parallelism: i64,
    options: &PipelineOptions,
) -> Result<Vec<PartitionDescriptor>> {
    let parallelism = effective_parallelism(parallelism);
    let estimated_size_bytes = source
        .estimated_size_bytes(options)
        .context("failed to estimate source size")?;
    let desired_size = desired_bundle_size(estimated_size_bytes, parallelism);

    let splits = source
        .split(desired_size, options)
        .context("failed to split source")?;

    let partitions = if splits.is_empty() {
        tracing::debug!("source returned no splits, reading it as a single partition");
        vec![PartitionDescriptor::new(0, source, estimated_size_bytes)?]
    } else {
        splits
            .iter()
            .enumerate()
            .map(|(index, split)| {
                let size = split
                    .estimated_size_bytes(options)
                    .context("failed to estimate split size")?;
                PartitionDescriptor::new(index, split, size)
            })
            .collect::<Result<Vec<_>>>()?
    };

    tracing::debug!(
        parallelism,
        estimated_size_bytes,
        desired_bundle_size = desired_size,
        partitions = partitions.len(),
        "planned source partitions"
    );
    Ok(partitions)
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use yql_sdk::sources::memory::{MemoryReader, MemorySource};

    use super::*;
    use crate::Error;

    #[test]
    fn test_effective_parallelism() {
        assert_eq!(effective_parallelism(-5), 1);
        assert_eq!(effective_parallelism(0), 1);
        assert_eq!(effective_parallelism(1), 1);
        assert_eq!(effective_parallelism(8), 8);
    }

    #[test]
    fn test_desired_bundle_size() {
        assert_eq!(desired_bundle_size(56, 3), 19);
        assert_eq!(desired_bundle_size(56, 4), 14);
        assert_eq!(desired_bundle_size(0, 4), 1);
        assert_eq!(desired_bundle_size(3, 10), 1);
        assert_eq!(desired_bundle_size(u64::MAX, 1), u64::MAX);
    }

    #[test]
    fn test_plan_balanced() {
        let source = MemorySource::from_values(1..=7i64);
        let partitions = plan(&source, 3, &PipelineOptions::default()).unwrap();

        let sizes = partitions
            .iter()
            .map(|partition| partition.source::<MemorySource<i64>>().unwrap().len())
            .collect::<Vec<_>>();
        assert_eq!(sizes, vec![3, 2, 2]);
        assert_eq!(
            partitions
                .iter()
                .map(PartitionDescriptor::index)
                .collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_eq!(
            partitions
                .iter()
                .map(PartitionDescriptor::estimated_size_bytes)
                .collect::<Vec<_>>(),
            vec![24, 16, 16]
        );
    }

    #[test]
    fn test_plan_non_positive_parallelism() {
        let source = MemorySource::from_values(1..=7i64);
        for hint in &[0, -1] {
            let partitions = plan(&source, *hint, &PipelineOptions::default()).unwrap();
            assert_eq!(partitions.len(), 1);
            assert_eq!(partitions[0].source::<MemorySource<i64>>().unwrap(), source);
        }
    }

    #[test]
    fn test_plan_more_readers_than_records() {
        let source = MemorySource::from_values(vec![1i64, 2]);
        let partitions = plan(&source, 16, &PipelineOptions::default()).unwrap();
        assert_eq!(partitions.len(), 2);
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Unsplittable(Vec<i64>);

    impl BoundedSource for Unsplittable {
        type Output = i64;
        type Reader = MemoryReader<i64>;

        fn split(&self, _desired: u64, _options: &PipelineOptions) -> Result<Vec<Self>> {
            Ok(Vec::new())
        }

        fn estimated_size_bytes(&self, _options: &PipelineOptions) -> Result<u64> {
            Ok(self.0.len() as u64 * 8)
        }

        fn create_reader(&self, options: &PipelineOptions) -> Result<Self::Reader> {
            MemorySource::from_values(self.0.clone()).create_reader(options)
        }
    }

    #[test]
    fn test_plan_without_splits() {
        let source = Unsplittable(vec![1, 2, 3]);
        let partitions = plan(&source, 4, &PipelineOptions::default()).unwrap();
        assert_eq!(partitions.len(), 1);
        assert_eq!(partitions[0].estimated_size_bytes(), 24);
        assert_eq!(partitions[0].source::<Unsplittable>().unwrap(), source);
    }

    #[test]
    fn test_engine_partition_conversion() {
        let source = MemorySource::from_values(vec![1i64]);
        let descriptor = PartitionDescriptor::new(5, &source, 8).unwrap();
        let partition = InputPartition::from(descriptor.clone());
        assert_eq!(partition.index, 5);
        assert_eq!(PartitionDescriptor::from(partition), descriptor);

        let err = PartitionDescriptor::from(InputPartition {
            index: 0,
            payload: vec![0xff],
            estimated_size_bytes: 0,
        })
        .source::<MemorySource<i64>>()
        .unwrap_err();
        assert!(matches!(Error::of(&err), Some(Error::Serialization(_))));
    }
}
