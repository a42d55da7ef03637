use std::any::Any;
use std::collections::HashSet;
use std::fmt::{self, Debug, Formatter};
use std::marker::PhantomData;
use std::sync::Arc;

use anyhow::Result;
use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::BoundedSource;

pub const READ_BOUNDED_URN: &str = "yql:transform:read_bounded:v1";

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Display, Serialize, Deserialize,
)]
#[display(fmt = "pcollection-{}", _0)]
pub struct PCollectionId(usize);

/// A typed handle to the output of a transform.
pub struct PCollection<T> {
    id: PCollectionId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> PCollection<T> {
    #[inline]
    pub fn id(&self) -> PCollectionId {
        self.id
    }
}

impl<T> Clone for PCollection<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for PCollection<T> {}

impl<T> Debug for PCollection<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "PCollection({})", self.id)
    }
}

#[derive(Clone)]
pub enum TransformSpec {
    ReadBounded {
        source: Arc<dyn Any + Send + Sync>,
        source_type: &'static str,
    },
    Other {
        urn: String,
    },
}

impl TransformSpec {
    pub fn urn(&self) -> &str {
        match self {
            TransformSpec::ReadBounded { .. } => READ_BOUNDED_URN,
            TransformSpec::Other { urn } => urn,
        }
    }
}

impl Debug for TransformSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TransformSpec::ReadBounded { source_type, .. } => f
                .debug_struct("ReadBounded")
                .field("source_type", source_type)
                .finish(),
            TransformSpec::Other { urn } => f.debug_struct("Other").field("urn", urn).finish(),
        }
    }
}

/// A node of the pipeline graph.
#[derive(Debug, Clone)]
pub struct AppliedTransform {
    full_name: String,
    output: PCollectionId,
    spec: TransformSpec,
}

impl AppliedTransform {
    pub fn new(full_name: impl Into<String>, output: PCollectionId, spec: TransformSpec) -> Self {
        Self {
            full_name: full_name.into(),
            output,
            spec,
        }
    }

    #[inline]
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    #[inline]
    pub fn output(&self) -> PCollectionId {
        self.output
    }

    #[inline]
    pub fn spec(&self) -> &TransformSpec {
        &self.spec
    }

    /// The source read by this node, if it is a bounded read of an `S`.
    pub fn bounded_source<S: BoundedSource>(&self) -> Option<&S> {
        match &self.spec {
            TransformSpec::ReadBounded { source, .. } => source.downcast_ref::<S>(),
            TransformSpec::Other { .. } => None,
        }
    }
}

/// An ordered list of transforms, each producing one collection.
#[derive(Debug, Default)]
pub struct Pipeline {
    transforms: Vec<AppliedTransform>,
    names: HashSet<String>,
}

impl Pipeline {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn read<S: BoundedSource>(
        &mut self,
        name: impl Into<String>,
        source: S,
    ) -> Result<PCollection<S::Output>> {
        source.validate()?;
        let id = self.push(
            name.into(),
            TransformSpec::ReadBounded {
                source: Arc::new(source),
                source_type: std::any::type_name::<S>(),
            },
        )?;
        Ok(PCollection {
            id,
            _marker: PhantomData,
        })
    }

    /// Appends a transform this crate knows nothing about beyond its urn.
    pub fn apply_primitive(
        &mut self,
        name: impl Into<String>,
        urn: impl Into<String>,
    ) -> Result<PCollectionId> {
        self.push(name.into(), TransformSpec::Other { urn: urn.into() })
    }

    #[inline]
    pub fn transforms(&self) -> &[AppliedTransform] {
        &self.transforms
    }

    fn push(&mut self, name: String, spec: TransformSpec) -> Result<PCollectionId> {
        anyhow::ensure!(
            !self.names.contains(&name),
            "transform '{}' already exists",
            name
        );
        let id = PCollectionId(self.transforms.len());
        self.names.insert(name.clone());
        self.transforms.push(AppliedTransform::new(name, id, spec));
        Ok(id)
    }
}
