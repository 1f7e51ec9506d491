//! Bencode encoding of typed values.
//!
//! Values are written straight to the sink; no intermediate [`Value`] tree is
//! built. Every sink failure surfaces as [`ErrorKind::EncodeWriteError`] and
//! bytes already written stay written.
//!
//! [`ErrorKind::EncodeWriteError`]: crate::ErrorKind::EncodeWriteError

mod impls;

use std::io::Write;
use std::sync::Arc;

use tracing::trace;

use crate::error::{Error, ErrorKind, Result};
use crate::metadata::MetadataCache;
use crate::value::Value;

/// A type with a canonical bencode representation.
pub trait Encode {
    fn encode(&self, enc: &mut BencodeEncoder<'_>) -> Result<()>;

    /// Whether this is the type's zero value. Zero-valued record fields are
    /// left out of the encoded dictionary.
    fn is_zero(&self) -> bool {
        false
    }

    /// [`is_zero`](Encode::is_zero) for record fields. Records override it to
    /// resolve their own layout through `cache`.
    fn is_zero_with(&self, cache: &MetadataCache) -> bool {
        let _ = cache;
        self.is_zero()
    }
}

/// Sink plus metadata cache handed to [`Encode`] impls.
pub struct BencodeEncoder<'a> {
    writer: &'a mut dyn Write,
    cache: &'a MetadataCache,
}

impl<'a> BencodeEncoder<'a> {
    pub fn new(writer: &'a mut dyn Write, cache: &'a MetadataCache) -> Self {
        Self { writer, cache }
    }

    pub fn cache(&self) -> &'a MetadataCache {
        self.cache
    }

    fn buf(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes).map_err(Error::write)
    }

    fn u8(&mut self, byte: u8) -> Result<()> {
        self.buf(&[byte])
    }

    pub fn write_integer(&mut self, int: i64) -> Result<()> {
        self.buf(format!("i{int}e").as_bytes())
    }

    /// Integers are 64-bit signed on the wire; larger values are rejected
    /// before anything is written.
    pub fn write_u_integer(&mut self, uint: u64) -> Result<()> {
        let int = i64::try_from(uint).map_err(|_| {
            Error::new(
                ErrorKind::EncodeUnsupportedType,
                format!("value {uint} exceeds i64"),
            )
        })?;
        self.write_integer(int)
    }

    pub fn write_bin(&mut self, buf: &[u8]) -> Result<()> {
        self.buf(format!("{}:", buf.len()).as_bytes())?;
        self.buf(buf)
    }

    pub fn write_str(&mut self, s: &str) -> Result<()> {
        self.write_bin(s.as_bytes())
    }

    pub fn begin_list(&mut self) -> Result<()> {
        self.u8(b'l')
    }

    pub fn begin_dict(&mut self) -> Result<()> {
        self.u8(b'd')
    }

    /// Closes the innermost list or dictionary.
    pub fn end(&mut self) -> Result<()> {
        self.u8(b'e')
    }

    pub fn write_any(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::ByteString(b) => self.write_bin(b),
            Value::Integer(i) => self.write_integer(*i),
            Value::List(items) => {
                self.begin_list()?;
                for item in items {
                    self.write_any(item)?;
                }
                self.end()
            }
            Value::Dictionary(dict) => {
                self.begin_dict()?;
                for (key, val) in dict {
                    self.write_bin(key)?;
                    self.write_any(val)?;
                }
                self.end()
            }
        }
    }

    pub fn encode<T: Encode + ?Sized>(&mut self, value: &T) -> Result<()> {
        value.encode(self)
    }
}

/// Streaming encoder writing one value per call to an owned sink.
pub struct Encoder<W> {
    writer: W,
    cache: Arc<MetadataCache>,
}

impl<W: Write> Encoder<W> {
    pub fn new(writer: W) -> Self {
        Self::with_cache(writer, MetadataCache::global())
    }

    pub fn with_cache(writer: W, cache: Arc<MetadataCache>) -> Self {
        Self { writer, cache }
    }

    /// Appends the encoding of `value` to the sink.
    pub fn encode_next<T: Encode + ?Sized>(&mut self, value: &T) -> Result<()> {
        let mut enc = BencodeEncoder::new(&mut self.writer, &self.cache);
        value.encode(&mut enc)?;
        trace!(value = std::any::type_name::<T>(), "encoded item");
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(Error::write)
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
