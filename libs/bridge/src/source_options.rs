use std::collections::HashMap;

use anyhow::{Context, Result};
use yql_sdk::{BoundedSource, PipelineOptions};

use crate::{codec, Error};

/// Base64 of the bincode-encoded source.
pub const SOURCE_OPTION: &str = "source";

/// Target parallelism hint, a decimal integer.
pub const PARALLELISM_OPTION: &str = "parallelism";

/// Pipeline options as JSON.
pub const PIPELINE_OPTIONS_OPTION: &str = "options";

/// The string options that carry a source from translation to the engine
/// provider.
///
/// Keys are write-once: setting a key twice is an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceOptions {
    options: HashMap<String, String>,
}

impl SourceOptions {
    pub fn new() -> Self {
        Default::default()
    }

    /// Encodes everything a worker needs to read `source`.
    pub fn for_source<S: BoundedSource>(
        source: &S,
        parallelism: usize,
        options: &PipelineOptions,
    ) -> Result<Self> {
        let mut source_options = Self::new();
        source_options.insert(SOURCE_OPTION, codec::serialize(source)?)?;
        source_options.insert(PARALLELISM_OPTION, parallelism.to_string())?;
        source_options.insert(
            PIPELINE_OPTIONS_OPTION,
            options.to_json().with_context(|| {
                Error::Serialization("failed to serialize pipeline options".to_string())
            })?,
        )?;
        Ok(source_options)
    }

    pub fn from_map(options: &HashMap<String, String>) -> Self {
        Self {
            options: options.clone(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let key = key.into();
        if self.options.contains_key(&key) {
            return Err(Error::Translation(format!("option '{}' is already set", key)).into());
        }
        self.options.insert(key, value.into());
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    fn required(&self, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| Error::Translation(format!("missing option '{}'", key)).into())
    }

    pub fn source<S: BoundedSource>(&self) -> Result<S> {
        codec::deserialize(self.required(SOURCE_OPTION)?)
    }

    /// The parallelism hint as written; it may be zero or negative.
    pub fn parallelism(&self) -> Result<i64> {
        let value = self.required(PARALLELISM_OPTION)?;
        value.trim().parse().map_err(|_| {
            Error::Translation(format!(
                "option '{}' must be an integer, got '{}'",
                PARALLELISM_OPTION, value
            ))
            .into()
        })
    }

    pub fn pipeline_options(&self) -> Result<PipelineOptions> {
        PipelineOptions::from_json(self.required(PIPELINE_OPTIONS_OPTION)?).with_context(|| {
            Error::Serialization("failed to deserialize pipeline options".to_string())
        })
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn into_map(self) -> HashMap<String, String> {
        self.options
    }
}
