mod context;
mod error;
mod planner;
mod provider;
mod reader;
mod source_options;
mod translator;

pub mod codec;
pub mod row_adapter;

#[cfg(test)]
mod test_util;

pub use context::TranslationContext;
pub use error::Error;
pub use planner::{desired_bundle_size, effective_parallelism, plan, PartitionDescriptor};
pub use provider::BoundedSourceProvider;
pub use reader::{PartitionReader, ReaderState};
pub use source_options::{
    SourceOptions, PARALLELISM_OPTION, PIPELINE_OPTIONS_OPTION, SOURCE_OPTION,
};
pub use translator::{PipelineTranslator, ReadSourceTranslator, TransformTranslator};
