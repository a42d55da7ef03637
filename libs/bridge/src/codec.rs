//! Transport encoding for source descriptors: bincode bytes, base64 text
//! when they travel through string options.

use std::any::type_name;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::Error;

pub fn serialize_bytes<S: Serialize>(value: &S) -> Result<Vec<u8>> {
    bincode::serialize(value)
        .with_context(|| Error::Serialization(format!("failed to serialize {}", type_name::<S>())))
}

pub fn deserialize_bytes<S: DeserializeOwned>(data: &[u8]) -> Result<S> {
    bincode::deserialize(data).with_context(|| {
        Error::Serialization(format!("failed to deserialize {}", type_name::<S>()))
    })
}

pub fn serialize<S: Serialize>(value: &S) -> Result<String> {
    Ok(base64::encode(serialize_bytes(value)?))
}

pub fn deserialize<S: DeserializeOwned>(data: &str) -> Result<S> {
    let bytes = base64::decode(data).with_context(|| {
        Error::Serialization(format!(
            "failed to decode {} payload as base64",
            type_name::<S>()
        ))
    })?;
    deserialize_bytes(&bytes)
}
