mod options;
mod pane;
mod pipeline;
mod source;
mod window;
mod windowed_value;

pub mod sources;

pub use options::PipelineOptions;
pub use pane::{PaneInfo, Timing};
pub use pipeline::{
    AppliedTransform, PCollection, PCollectionId, Pipeline, TransformSpec, READ_BOUNDED_URN,
};
pub use source::{BoundedReader, BoundedSource};
pub use window::{BoundedWindow, END_OF_GLOBAL_WINDOW, MAX_TIMESTAMP, MIN_TIMESTAMP};
pub use windowed_value::WindowedValue;
