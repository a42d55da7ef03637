mod config;
mod dataframe;
mod provider;
mod registry;
mod session;
mod task;

pub use config::{SessionConfig, SessionConfigRef};
pub use dataframe::DataFrame;
pub use provider::{
    BoxRowReader, InputPartition, RowReader, TableProvider, TableProviderFactory,
    TableProviderRef,
};
pub use registry::ProviderRegistry;
pub use session::{DataFrameReader, Session};
