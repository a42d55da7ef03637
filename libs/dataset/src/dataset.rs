use anyhow::Result;

use crate::{Row, SchemaRef};

/// Materialized rows sharing one schema.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSet {
    schema: SchemaRef,
    rows: Vec<Row>,
}

impl DataSet {
    pub fn try_new(schema: SchemaRef, rows: Vec<Row>) -> Result<Self> {
        for (idx, row) in rows.iter().enumerate() {
            anyhow::ensure!(
                row.len() == schema.len(),
                "invalid dataset: expect {} fields, actual {} fields in row {}.",
                schema.len(),
                row.len(),
                idx
            );

            for (value, field) in row.values().iter().zip(schema.fields()) {
                anyhow::ensure!(
                    field.data_type.accepts(value.data_type()),
                    "invalid dataset: expect field '{}' datatype is {}, actual datatype is {} in row {}.",
                    field.name,
                    field.data_type,
                    value.data_type(),
                    idx
                );
            }
        }

        Ok(Self { schema, rows })
    }

    #[inline]
    pub fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    #[inline]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    #[inline]
    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    #[inline]
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }
}
