use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Configuration of a pipeline run, shipped to every worker next to the
/// sources it reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOptions {
    #[serde(default = "default_job_name")]
    pub job_name: String,

    /// Overrides the engine's default parallelism when planning reads.
    #[serde(default)]
    pub parallelism: Option<usize>,

    /// Free-form settings sources may need on the worker (endpoints, credentials, ...).
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

fn default_job_name() -> String {
    "noname".to_string()
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            job_name: default_job_name(),
            parallelism: None,
            properties: BTreeMap::new(),
        }
    }
}

impl PipelineOptions {
    pub fn with_job_name(self, job_name: impl Into<String>) -> Self {
        Self {
            job_name: job_name.into(),
            ..self
        }
    }

    pub fn with_parallelism(self, parallelism: usize) -> Self {
        Self {
            parallelism: Some(parallelism),
            ..self
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("failed to serialize pipeline options")
    }

    pub fn from_json(data: &str) -> Result<Self> {
        serde_json::from_str(data).context("failed to deserialize pipeline options")
    }
}
