use std::any::{type_name, Any};
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use yql_engine::{DataFrame, Session};
use yql_sdk::{PCollection, PCollectionId, PipelineOptions, WindowedValue};

use crate::Error;

/// State shared by the translators of one pipeline.
///
/// Holds the engine session and the dataset each translated transform
/// produced, keyed by its output collection.
pub struct TranslationContext {
    session: Arc<Session>,
    options: PipelineOptions,
    datasets: HashMap<PCollectionId, Box<dyn Any + Send + Sync>>,
}

impl TranslationContext {
    pub fn new(session: Arc<Session>, options: PipelineOptions) -> Self {
        Self {
            session,
            options,
            datasets: HashMap::new(),
        }
    }

    #[inline]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[inline]
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Target parallelism for reads: the pipeline's setting, else the session default.
    pub fn parallelism(&self) -> usize {
        self.options
            .parallelism
            .unwrap_or_else(|| self.session.default_parallelism())
    }

    pub fn put_dataset<T: Send + 'static>(
        &mut self,
        id: PCollectionId,
        dataset: DataFrame<WindowedValue<T>>,
    ) -> Result<()> {
        if self.datasets.contains_key(&id) {
            return Err(
                Error::Translation(format!("dataset for {} is already registered", id)).into(),
            );
        }
        self.datasets.insert(id, Box::new(dataset));
        Ok(())
    }

    pub fn dataset<T: Send + 'static>(
        &self,
        id: PCollectionId,
    ) -> Result<DataFrame<WindowedValue<T>>> {
        let dataset = self
            .datasets
            .get(&id)
            .ok_or_else(|| Error::Translation(format!("no dataset for {}", id)))?;
        dataset
            .downcast_ref::<DataFrame<WindowedValue<T>>>()
            .cloned()
            .ok_or_else(|| {
                Error::Translation(format!(
                    "dataset for {} does not hold {}",
                    id,
                    type_name::<T>()
                ))
                .into()
            })
    }

    /// Typed variant of [`TranslationContext::dataset`].
    pub fn output<T: Send + 'static>(
        &self,
        collection: PCollection<T>,
    ) -> Result<DataFrame<WindowedValue<T>>> {
        self.dataset(collection.id())
    }

    pub fn contains(&self, id: PCollectionId) -> bool {
        self.datasets.contains_key(&id)
    }
}
