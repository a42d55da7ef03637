//! Carries windowed records through engine rows as a single opaque field.

use std::any::type_name;
use std::sync::Arc;

use anyhow::Result;
use once_cell::sync::Lazy;
use yql_dataset::{DataType, Field, OpaqueValue, Row, Schema, SchemaRef, Value};
use yql_sdk::WindowedValue;

pub const VALUE_FIELD: &str = "value";

static SCHEMA: Lazy<SchemaRef> =
    Lazy::new(|| Arc::new(Schema::from(Field::new(VALUE_FIELD, DataType::Opaque))));

pub fn schema() -> SchemaRef {
    SCHEMA.clone()
}

pub fn wrap<T: Send + Sync + 'static>(record: WindowedValue<T>) -> Row {
    Row::new(vec![Value::Opaque(OpaqueValue::new(record))])
}

pub fn unwrap<T: Clone + Send + Sync + 'static>(row: Row) -> Result<WindowedValue<T>> {
    if row.len() != 1 {
        return Err(adapter_error(format!(
            "expected a row with 1 field, got {} fields",
            row.len()
        )));
    }

    let opaque = match row.into_values().into_iter().next() {
        Some(Value::Opaque(opaque)) => opaque,
        Some(value) => {
            return Err(adapter_error(format!(
                "expected an opaque field, got {}",
                value.data_type()
            )))
        }
        None => return Err(adapter_error("row has no fields".to_string())),
    };

    match opaque.downcast::<WindowedValue<T>>() {
        Ok(record) => Ok(Arc::try_unwrap(record).unwrap_or_else(|record| (*record).clone())),
        Err(opaque) => Err(adapter_error(format!(
            "expected {}, got {}",
            type_name::<WindowedValue<T>>(),
            opaque.type_name()
        ))),
    }
}

fn adapter_error(message: String) -> anyhow::Error {
    crate::Error::Adapter(message).into()
}
