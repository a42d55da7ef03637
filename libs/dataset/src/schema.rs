use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::DataType;

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

pub type SchemaRef = Arc<Schema>;

#[derive(Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn try_new(fields: Vec<Field>) -> Result<Self> {
        let mut names = HashSet::new();

        for field in &fields {
            if !names.insert(field.name.to_ascii_lowercase()) {
                anyhow::bail!("schema contains duplicate field name: '{}'", field.name);
            }
        }

        Ok(Self { fields })
    }

    pub fn field(&self, name: &str) -> Option<(usize, &Field)> {
        self.fields
            .iter()
            .enumerate()
            .find(|(_, f)| f.name.eq_ignore_ascii_case(name))
    }

    #[inline]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Field> for Schema {
    fn from(field: Field) -> Self {
        Self {
            fields: vec![field],
        }
    }
}
