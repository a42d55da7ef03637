use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{PipelineOptions, MIN_TIMESTAMP};

/// A finite data source that can be split into independently readable parts.
///
/// Sources are plain serializable descriptors: they travel to workers as
/// bytes and only acquire resources in [`BoundedSource::create_reader`].
pub trait BoundedSource: Serialize + DeserializeOwned + Send + Sync + 'static {
    type Output: Clone + Send + Sync + 'static;

    type Reader: BoundedReader<Item = Self::Output> + 'static;

    /// Splits into sources of approximately `desired_bundle_size_bytes` each.
    ///
    /// The returned sources must together produce exactly the records of
    /// `self`, each once.
    fn split(&self, desired_bundle_size_bytes: u64, options: &PipelineOptions)
        -> Result<Vec<Self>>;

    fn estimated_size_bytes(&self, options: &PipelineOptions) -> Result<u64>;

    fn create_reader(&self, options: &PipelineOptions) -> Result<Self::Reader>;

    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// A sequential cursor over the records of one [`BoundedSource`].
///
/// `start` is called once, then `advance` until it returns `false`. `current`
/// is only valid after one of them returned `true`.
pub trait BoundedReader: Send {
    type Item;

    fn start(&mut self) -> Result<bool>;

    fn advance(&mut self) -> Result<bool>;

    fn current(&self) -> Result<&Self::Item>;

    fn current_timestamp(&self) -> Result<i64> {
        Ok(MIN_TIMESTAMP)
    }

    fn close(&mut self) -> Result<()>;
}
