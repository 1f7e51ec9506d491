//! Canonical bencode codec.
//!
//! Converts between the bencode wire format (byte-strings, integers, lists and
//! key-sorted dictionaries) and Rust values. Only canonical input is accepted:
//! integers without leading zeros or `-0`, exact length prefixes, and
//! dictionary keys that are unique and strictly ascending.
//!
//! - [`decode`] / [`Decoder`] parse bytes into the generic [`Value`] tree.
//! - [`decode_into`] additionally binds the tree into any [`Bind`] type.
//! - [`encode`] / [`Encoder`] write any [`Encode`] type canonically.
//! - [`impl_record!`] maps a struct to a dictionary through field tags.
//!
//! ```
//! use canonical_bencode::{decode, encode, Value};
//!
//! let value = decode(b"d3:bar4:spam3:fooi42ee").unwrap();
//! assert_eq!(value.get("foo"), Some(&Value::Integer(42)));
//! assert_eq!(encode(&value).unwrap(), b"d3:bar4:spam3:fooi42ee");
//! ```

mod binder;
mod config;
mod decoder;
mod encoder;
mod error;
mod metadata;
pub mod record;
mod types;
mod value;

use std::io::Write;

pub use binder::{Bind, Binder};
pub use config::{DecoderConfig, DEFAULT_MAX_DEPTH};
pub use decoder::Decoder;
pub use encoder::{BencodeEncoder, Encode, Encoder};
pub use error::{Category, Cause, Error, ErrorKind, Result};
pub use metadata::{Field, FieldDescriptor, MetadataCache, Record, RecordLayout};
pub use types::{ByteBuf, FromMapKey, MapKey};
pub use value::{Dictionary, Value, ValueKind};

/// Encodes `value` into a fresh buffer.
pub fn encode<T: Encode + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    encode_to(&mut out, value)?;
    Ok(out)
}

/// Encodes `value` into `writer`. Bytes written before a failure stay written.
pub fn encode_to<W: Write, T: Encode + ?Sized>(writer: W, value: &T) -> Result<()> {
    Encoder::new(writer).encode_next(value)
}

/// Decodes exactly one item from `bytes`.
///
/// Unlike [`Decoder::decode_next`], trailing bytes after the item are an
/// error.
pub fn decode(bytes: &[u8]) -> Result<Value> {
    let mut dec = Decoder::from_slice(bytes);
    let value = dec.decode_next()?;
    let rest = dec.get_ref();
    if !rest.is_empty() {
        return Err(Error::new(
            ErrorKind::Syntax,
            format!("{} trailing bytes after the value", rest.len()),
        ));
    }
    Ok(value)
}

/// Decodes exactly one item from `bytes` and binds it into `dest`.
pub fn decode_into<T: Bind + ?Sized>(bytes: &[u8], dest: &mut T) -> Result<()> {
    let value = decode(bytes)?;
    Binder::new(&MetadataCache::global()).assign(dest, Some(&value))
}

/// Drops every record layout held by the process-wide metadata cache.
pub fn clear_metadata_cache() {
    MetadataCache::global().reset();
}
