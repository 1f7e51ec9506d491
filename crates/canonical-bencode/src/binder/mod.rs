//! Assignment of decoded [`Value`] trees into typed destinations.

mod impls;

use std::any::type_name;

use crate::error::{Error, ErrorKind, Result};
use crate::metadata::MetadataCache;
use crate::value::{Value, ValueKind};

/// A destination a decoded [`Value`] can be bound into.
pub trait Bind {
    fn bind(&mut self, value: &Value, binder: &Binder<'_>) -> Result<()>;

    /// Called when no value is present for this destination.
    ///
    /// Only nillable shapes (options, sequences, maps, byte buffers) accept
    /// absence; everything else fails with [`ErrorKind::UnmarshalToNil`].
    fn bind_absent(&mut self) -> Result<()> {
        Err(Error::new(
            ErrorKind::UnmarshalToNil,
            format!("cannot assign an absent value to {}", type_name::<Self>()),
        ))
    }
}

/// Binding context: gives [`Bind`] impls access to record metadata.
#[derive(Debug, Clone, Copy)]
pub struct Binder<'a> {
    cache: &'a MetadataCache,
}

impl<'a> Binder<'a> {
    pub fn new(cache: &'a MetadataCache) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &'a MetadataCache {
        self.cache
    }

    /// Assigns `value` into `dest`; `None` means the value is absent.
    pub fn assign<T: Bind + ?Sized>(&self, dest: &mut T, value: Option<&Value>) -> Result<()> {
        match value {
            Some(value) => dest.bind(value, self),
            None => dest.bind_absent(),
        }
    }
}

/// Type-mismatch error for a value of the wrong kind.
pub(crate) fn mismatch<T: ?Sized>(expected: ValueKind, got: &Value) -> Error {
    Error::new(
        ErrorKind::UnmarshalType,
        format!(
            "cannot bind {} into {}: expected {expected}",
            got.kind(),
            type_name::<T>()
        ),
    )
}
