//! Structured records: structs that map to bencode dictionaries.
//!
//! A record lists its fields once through [`Record::fields`]; the
//! [`MetadataCache`](crate::MetadataCache) turns that into a layout sorted by
//! wire key, which the encoder and binder below share.
//!
//! ```
//! use canonical_bencode::{decode_into, encode, impl_record};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Peer {
//!     ip: String,
//!     port: u16,
//!     id: Option<String>,
//! }
//!
//! impl_record!(Peer {
//!     ip: "ip,required",
//!     port,
//!     id: "peer id",
//! });
//!
//! let peer = Peer { ip: "10.0.0.1".into(), port: 6881, id: None };
//! let bytes = encode(&peer).unwrap();
//! assert_eq!(bytes, b"d2:ip8:10.0.0.14:porti6881ee");
//!
//! let mut back = Peer::default();
//! decode_into(&bytes, &mut back).unwrap();
//! assert_eq!(back, peer);
//! ```

use std::any::type_name;

use crate::binder::{mismatch, Binder};
use crate::encoder::BencodeEncoder;
use crate::error::{Error, ErrorKind, Result};
use crate::metadata::{MetadataCache, Record};
use crate::value::{Value, ValueKind};

/// Writes `record` as a dictionary of its non-zero fields.
///
/// Every required field is checked before the opening `d` is written.
pub fn encode_record<T: Record>(record: &T, enc: &mut BencodeEncoder<'_>) -> Result<()> {
    let layout = enc.cache().resolve::<T>().map_err(|e| {
        Error::new(
            ErrorKind::EncodeUnsupportedType,
            format!("invalid record {}", type_name::<T>()),
        )
        .with_source(e)
    })?;

    let cache = enc.cache();
    let zero: Vec<bool> = layout
        .fields()
        .iter()
        .map(|f| f.is_zero(record, cache))
        .collect();

    if let Some(field) = layout
        .fields()
        .iter()
        .zip(&zero)
        .find_map(|(f, &z)| (z && f.required()).then_some(f))
    {
        return Err(Error::new(
            ErrorKind::EncodeRequiredFieldZero,
            format!("required field {} holds its zero value", field.key()),
        )
        .with_field(field.key()));
    }

    enc.begin_dict()?;
    for (field, &z) in layout.fields().iter().zip(&zero) {
        if z {
            continue;
        }
        enc.write_str(field.key())?;
        field
            .encode(record, enc)
            .map_err(|e| Error::wrap(field.key(), e))?;
    }
    enc.end()
}

/// Binds a decoded dictionary into `record`, field by field in wire-key order.
///
/// Keys with no matching field are ignored; absent optional fields keep their
/// current value.
pub fn bind_record<T: Record>(record: &mut T, value: &Value, binder: &Binder<'_>) -> Result<()> {
    let Value::Dictionary(dict) = value else {
        return Err(mismatch::<T>(ValueKind::Dictionary, value));
    };
    let layout = binder.cache().resolve::<T>().map_err(|e| {
        Error::new(
            ErrorKind::UnmarshalToInvalid,
            format!("invalid record {}", type_name::<T>()),
        )
        .with_source(e)
    })?;

    for field in layout.fields() {
        match dict.get(field.key().as_bytes()) {
            Some(item) => field
                .bind(record, item, binder)
                .map_err(|e| Error::wrap(field.key(), e))?,
            None if field.required() => {
                return Err(Error::new(
                    ErrorKind::UnmarshalRequiredFieldMissing,
                    format!("required field {} is missing", field.key()),
                )
                .with_field(field.key()))
            }
            None => {}
        }
    }
    Ok(())
}

/// A record is zero when every one of its fields is. A record whose layout
/// does not resolve is never zero, so encoding it reports the layout error.
pub fn record_is_zero<T: Record>(record: &T, cache: &MetadataCache) -> bool {
    match cache.resolve::<T>() {
        Ok(layout) => layout.fields().iter().all(|f| f.is_zero(record, cache)),
        Err(_) => false,
    }
}

/// Implements [`Record`], [`Encode`](crate::Encode) and [`Bind`](crate::Bind)
/// for a struct.
///
/// Each field is listed by name, optionally followed by a tag string of the
/// form `key[,required][,omitempty]`. Without a tag (or with an empty key)
/// the field name is the wire key. The struct must implement `Default`.
#[macro_export]
macro_rules! impl_record {
    ($ty:ty { $($field:ident $(: $tag:literal)?),* $(,)? }) => {
        impl $crate::Record for $ty {
            fn fields() -> ::std::vec::Vec<$crate::Field<Self>> {
                ::std::vec![
                    $(
                        $crate::Field::<Self>::new(
                            ::core::stringify!($field),
                            |r| &r.$field,
                            |r| &mut r.$field,
                        )
                        $(.tag($tag))?
                    ),*
                ]
            }
        }

        impl $crate::Encode for $ty {
            fn encode(&self, enc: &mut $crate::BencodeEncoder<'_>) -> $crate::Result<()> {
                $crate::record::encode_record(self, enc)
            }

            fn is_zero(&self) -> bool {
                $crate::record::record_is_zero(self, &$crate::MetadataCache::global())
            }

            fn is_zero_with(&self, cache: &$crate::MetadataCache) -> bool {
                $crate::record::record_is_zero(self, cache)
            }
        }

        impl $crate::Bind for $ty {
            fn bind(
                &mut self,
                value: &$crate::Value,
                binder: &$crate::Binder<'_>,
            ) -> $crate::Result<()> {
                $crate::record::bind_record(self, value, binder)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::decoder::Decoder;
    use crate::encoder::Encoder;
    use crate::error::ErrorKind;
    use crate::metadata::MetadataCache;

    #[derive(Debug, Default, PartialEq)]
    struct Person {
        name: String,
        age: u8,
        nick: Option<String>,
    }

    crate::impl_record!(Person {
        name: "name,required",
        age: "age,required",
        nick: "nick,omitempty",
    });

    #[derive(Debug, Default)]
    struct Twice {
        a: i64,
        b: i64,
    }

    crate::impl_record!(Twice { a: "k", b: "k" });

    fn encode_with(cache: &Arc<MetadataCache>, value: &impl crate::Encode) -> crate::Result<Vec<u8>> {
        let mut enc = Encoder::with_cache(Vec::new(), Arc::clone(cache));
        enc.encode_next(value)?;
        Ok(enc.into_inner())
    }

    #[test]
    fn fields_written_in_key_order_without_zero_values() {
        let cache = Arc::new(MetadataCache::new());
        let p = Person {
            name: "ann".into(),
            age: 30,
            nick: None,
        };
        assert_eq!(encode_with(&cache, &p).unwrap(), b"d3:agei30e4:name3:anne");
        assert!(cache.contains::<Person>());
    }

    #[test]
    fn required_zero_fails_before_writing() {
        let cache = Arc::new(MetadataCache::new());
        let mut out = Vec::new();
        let err = Encoder::with_cache(&mut out, cache)
            .encode_next(&Person {
                name: "ann".into(),
                ..Person::default()
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EncodeRequiredFieldZero);
        assert_eq!(err.field(), Some("age"));
        assert!(out.is_empty());
    }

    #[test]
    fn bind_reports_first_missing_required_key() {
        let cache = Arc::new(MetadataCache::new());
        let mut p = Person::default();
        let err = Decoder::from_slice(b"d4:nick3:bobe")
            .with_cache(cache)
            .decode_next_into(&mut p)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnmarshalRequiredFieldMissing);
        assert_eq!(err.field(), Some("age"));
        assert_eq!(err.message(), "required field age is missing");
    }

    #[test]
    fn bind_wraps_field_errors_with_key() {
        let cache = Arc::new(MetadataCache::new());
        let mut p = Person::default();
        let err = Decoder::from_slice(b"d3:agei300e4:name1:xe")
            .with_cache(cache)
            .decode_next_into(&mut p)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnmarshalOverflow);
        assert_eq!(err.field(), Some("age"));
        assert_eq!(
            err.to_string(),
            "field \"age\": unmarshal overflow: value 300 overflows u8"
        );
    }

    #[test]
    fn duplicate_wire_keys_make_record_unusable() {
        let cache = Arc::new(MetadataCache::new());
        let err = encode_with(&cache, &Twice::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EncodeUnsupportedType);
        assert_eq!(err.root().kind(), ErrorKind::Usage);

        let mut t = Twice::default();
        let err = Decoder::from_slice(b"d1:ki1ee")
            .with_cache(cache)
            .decode_next_into(&mut t)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnmarshalToInvalid);
    }

    #[test]
    fn nested_zero_record_is_omitted() {
        #[derive(Debug, Default)]
        struct Outer {
            inner: Person,
            tag: String,
        }
        crate::impl_record!(Outer { inner, tag });

        let cache = Arc::new(MetadataCache::new());
        let out = Outer {
            inner: Person::default(),
            tag: "t".into(),
        };
        assert_eq!(encode_with(&cache, &out).unwrap(), b"d3:tag1:te");
        assert!(cache.contains::<Person>());
        assert_eq!(cache.len(), 2);
        assert!(!MetadataCache::global().contains::<Outer>());
    }
}
