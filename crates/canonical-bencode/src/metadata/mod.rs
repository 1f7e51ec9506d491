//! Structured-record metadata: field declarations, resolved descriptors and
//! the cache that memoizes them per type.

mod cache;
mod tag;

use std::any::type_name;

use crate::binder::{Bind, Binder};
use crate::encoder::{BencodeEncoder, Encode};
use crate::error::{Error, ErrorKind, Result};
use crate::value::Value;

pub use cache::MetadataCache;

/// A struct that maps to a bencode dictionary.
///
/// Usually implemented through [`impl_record!`](crate::impl_record), which
/// also provides the matching [`Encode`] and [`Bind`] impls.
pub trait Record: Default + 'static {
    /// Field declarations, in any order.
    fn fields() -> Vec<Field<Self>>;
}

/// Type-erased access to one field of record `T`.
pub(crate) trait FieldAccess<T>: Send + Sync {
    fn is_zero(&self, record: &T, cache: &MetadataCache) -> bool;
    fn encode(&self, record: &T, enc: &mut BencodeEncoder<'_>) -> Result<()>;
    fn bind(&self, record: &mut T, value: &Value, binder: &Binder<'_>) -> Result<()>;
}

struct Accessor<T, F> {
    get: fn(&T) -> &F,
    get_mut: fn(&mut T) -> &mut F,
}

impl<T, F> FieldAccess<T> for Accessor<T, F>
where
    F: Encode + Bind + 'static,
{
    fn is_zero(&self, record: &T, cache: &MetadataCache) -> bool {
        (self.get)(record).is_zero_with(cache)
    }

    fn encode(&self, record: &T, enc: &mut BencodeEncoder<'_>) -> Result<()> {
        (self.get)(record).encode(enc)
    }

    fn bind(&self, record: &mut T, value: &Value, binder: &Binder<'_>) -> Result<()> {
        (self.get_mut)(record).bind(value, binder)
    }
}

/// Declaration of one record field.
pub struct Field<T> {
    name: &'static str,
    tag: &'static str,
    type_name: &'static str,
    pub(crate) access: Box<dyn FieldAccess<T>>,
}

impl<T: 'static> Field<T> {
    pub fn new<F>(name: &'static str, get: fn(&T) -> &F, get_mut: fn(&mut T) -> &mut F) -> Self
    where
        F: Encode + Bind + 'static,
    {
        Self {
            name,
            tag: "",
            type_name: type_name::<F>(),
            access: Box::new(Accessor { get, get_mut }),
        }
    }

    /// Attaches a `key[,required][,omitempty]` tag.
    pub fn tag(mut self, tag: &'static str) -> Self {
        self.tag = tag;
        self
    }
}

/// Resolved metadata for one record field.
pub struct FieldDescriptor<T> {
    name: &'static str,
    key: String,
    required: bool,
    omit_empty: bool,
    type_name: &'static str,
    access: Box<dyn FieldAccess<T>>,
}

impl<T> FieldDescriptor<T> {
    fn resolve(field: Field<T>) -> Self {
        let parsed = tag::parse_tag(field.tag);
        let key = if parsed.key.is_empty() {
            field.name
        } else {
            parsed.key
        };
        Self {
            name: field.name,
            key: key.to_owned(),
            required: parsed.required,
            omit_empty: parsed.omit_empty,
            type_name: field.type_name,
            access: field.access,
        }
    }

    /// Declared field name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Dictionary key used on the wire.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn required(&self) -> bool {
        self.required
    }

    /// Whether the tag carried `omitempty`. Zero values are omitted either way.
    pub fn omit_empty(&self) -> bool {
        self.omit_empty
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn is_zero(&self, record: &T, cache: &MetadataCache) -> bool {
        self.access.is_zero(record, cache)
    }

    pub(crate) fn encode(&self, record: &T, enc: &mut BencodeEncoder<'_>) -> Result<()> {
        self.access.encode(record, enc)
    }

    pub(crate) fn bind(&self, record: &mut T, value: &Value, binder: &Binder<'_>) -> Result<()> {
        self.access.bind(record, value, binder)
    }
}

impl<T> std::fmt::Debug for FieldDescriptor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("required", &self.required)
            .field("omit_empty", &self.omit_empty)
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// Field descriptors of a record type, sorted ascending by wire key.
pub struct RecordLayout<T> {
    type_name: &'static str,
    fields: Vec<FieldDescriptor<T>>,
}

impl<T: Record> RecordLayout<T> {
    pub(crate) fn build() -> Result<Self> {
        let mut fields: Vec<_> = T::fields()
            .into_iter()
            .map(FieldDescriptor::resolve)
            .collect();
        fields.sort_by(|a, b| a.key.as_bytes().cmp(b.key.as_bytes()));
        if let Some(pair) = fields.windows(2).find(|pair| pair[0].key == pair[1].key) {
            let key = pair[0].key.clone();
            return Err(Error::new(
                ErrorKind::Usage,
                format!(
                    "record {} declares wire key {key:?} more than once",
                    type_name::<T>()
                ),
            )
            .with_field(key));
        }
        Ok(Self {
            type_name: type_name::<T>(),
            fields,
        })
    }
}

impl<T> std::fmt::Debug for RecordLayout<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordLayout")
            .field("type_name", &self.type_name)
            .field("fields", &self.fields)
            .finish()
    }
}

impl<T> RecordLayout<T> {
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn fields(&self) -> &[FieldDescriptor<T>] {
        &self.fields
    }

    pub fn field(&self, key: &str) -> Option<&FieldDescriptor<T>> {
        self.fields
            .binary_search_by(|f| f.key.as_bytes().cmp(key.as_bytes()))
            .ok()
            .map(|i| &self.fields[i])
    }
}
