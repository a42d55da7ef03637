use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;

use anyhow::Result;
use yql_engine::DataFrame;
use yql_sdk::{AppliedTransform, BoundedSource, Pipeline, TransformSpec, WindowedValue};

use crate::{row_adapter, BoundedSourceProvider, Error, SourceOptions, TranslationContext};

/// Turns one kind of pipeline node into engine datasets.
pub trait TransformTranslator: Send + Sync {
    fn translate_transform(
        &self,
        transform: &AppliedTransform,
        ctx: &mut TranslationContext,
    ) -> Result<()>;
}

/// Translates a bounded read of `S` into a dataset of windowed records.
pub struct ReadSourceTranslator<S> {
    _marker: PhantomData<fn() -> S>,
}

impl<S> Default for ReadSourceTranslator<S> {
    fn default() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<S: BoundedSource> ReadSourceTranslator<S> {
    pub fn new() -> Self {
        Default::default()
    }

    /// Registers the provider for `S` if needed, loads the source through
    /// it and records the dataset as the transform's output.
    ///
    /// Nothing is read here; partitions are planned when the dataset runs.
    pub fn translate(
        &self,
        transform: &AppliedTransform,
        ctx: &mut TranslationContext,
    ) -> Result<DataFrame<WindowedValue<S::Output>>> {
        let source = bounded_source::<S>(transform)?;
        let parallelism = ctx.parallelism();
        let options = SourceOptions::for_source(source, parallelism, ctx.options())?;

        let provider_name = BoundedSourceProvider::<S>::name();
        if ctx
            .session()
            .register_provider(BoundedSourceProvider::<S>::new())
        {
            tracing::debug!(provider = provider_name, "registered bounded source provider");
        }

        let dataset = ctx
            .session()
            .read()
            .format(provider_name)
            .options(options.into_map())
            .load()?
            .map(row_adapter::unwrap::<S::Output>);
        ctx.put_dataset(transform.output(), dataset.clone())?;

        tracing::info!(
            transform = transform.full_name(),
            output = %transform.output(),
            parallelism,
            "translated bounded read"
        );
        Ok(dataset)
    }
}

impl<S: BoundedSource> TransformTranslator for ReadSourceTranslator<S> {
    fn translate_transform(
        &self,
        transform: &AppliedTransform,
        ctx: &mut TranslationContext,
    ) -> Result<()> {
        self.translate(transform, ctx).map(|_| ())
    }
}

fn bounded_source<S: BoundedSource>(transform: &AppliedTransform) -> Result<&S> {
    match transform.spec() {
        TransformSpec::ReadBounded { source_type, .. } => {
            transform.bounded_source::<S>().ok_or_else(|| {
                Error::Translation(format!(
                    "transform '{}' reads {}, expected {}",
                    transform.full_name(),
                    source_type,
                    type_name::<S>()
                ))
                .into()
            })
        }
        TransformSpec::Other { urn } => Err(Error::Translation(format!(
            "transform '{}' is not a bounded read: {}",
            transform.full_name(),
            urn
        ))
        .into()),
    }
}

/// Translates a whole pipeline, dispatching bounded reads by source type.
#[derive(Default)]
pub struct PipelineTranslator {
    translators: HashMap<TypeId, Box<dyn TransformTranslator>>,
}

impl PipelineTranslator {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_source<S: BoundedSource>(mut self) -> Self {
        self.translators
            .insert(TypeId::of::<S>(), Box::new(ReadSourceTranslator::<S>::new()));
        self
    }

    /// Translates every transform in order; the first failure aborts.
    pub fn translate(&self, pipeline: &Pipeline, ctx: &mut TranslationContext) -> Result<()> {
        for transform in pipeline.transforms() {
            let translator = match transform.spec() {
                TransformSpec::ReadBounded { source, .. } => {
                    let source: &dyn Any = &**source;
                    self.translators.get(&source.type_id())
                }
                TransformSpec::Other { .. } => None,
            };

            match translator {
                Some(translator) => translator.translate_transform(transform, ctx)?,
                None => {
                    return Err(Error::Translation(format!(
                        "no translator for transform '{}' ({})",
                        transform.full_name(),
                        transform.spec().urn()
                    ))
                    .into())
                }
            }
        }
        Ok(())
    }
}
