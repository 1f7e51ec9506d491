//! Byte payload type and map key shapes.

use std::any::type_name;
use std::borrow::Cow;
use std::ops::{Deref, DerefMut};

use crate::error::{Error, ErrorKind, Result};

/// Raw byte payload that binds and encodes as a bencode byte-string.
///
/// `Vec<u8>` would be treated as a list of integers, so binary fields such as
/// piece hashes use this wrapper instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ByteBuf(pub Vec<u8>);

impl ByteBuf {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

impl Deref for ByteBuf {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.0
    }
}

impl DerefMut for ByteBuf {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.0
    }
}

impl AsRef<[u8]> for ByteBuf {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for ByteBuf {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for ByteBuf {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<ByteBuf> for Vec<u8> {
    fn from(buf: ByteBuf) -> Self {
        buf.0
    }
}

/// Key type of a map that encodes as a bencode dictionary.
///
/// Dictionary keys are byte-strings, so only textual key types are accepted.
/// Other key types implement the trait with `TEXTUAL = false` and are
/// rejected before anything is written or bound.
pub trait MapKey {
    const TEXTUAL: bool;

    fn key_bytes(&self) -> Cow<'_, [u8]>;
}

/// Map key that can be rebuilt from a decoded dictionary key.
pub trait FromMapKey: MapKey + Sized {
    fn from_key_bytes(bytes: &[u8]) -> Result<Self>;
}

impl MapKey for String {
    const TEXTUAL: bool = true;

    fn key_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_bytes())
    }
}

impl FromMapKey for String {
    fn from_key_bytes(bytes: &[u8]) -> Result<Self> {
        String::from_utf8(bytes.to_vec()).map_err(|e| {
            Error::new(ErrorKind::UnmarshalType, "dictionary key is not valid UTF-8").with_source(e)
        })
    }
}

impl MapKey for &str {
    const TEXTUAL: bool = true;

    fn key_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_bytes())
    }
}

impl MapKey for ByteBuf {
    const TEXTUAL: bool = true;

    fn key_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(&self.0)
    }
}

impl FromMapKey for ByteBuf {
    fn from_key_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(ByteBuf(bytes.to_vec()))
    }
}

macro_rules! non_textual_key {
    ($($t:ty),*) => {
        $(
            impl MapKey for $t {
                const TEXTUAL: bool = false;

                fn key_bytes(&self) -> Cow<'_, [u8]> {
                    Cow::Owned(self.to_string().into_bytes())
                }
            }

            impl FromMapKey for $t {
                fn from_key_bytes(_: &[u8]) -> Result<Self> {
                    Err(non_textual_key::<$t>())
                }
            }
        )*
    };
}

non_textual_key!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, bool, char);

pub(crate) fn non_textual_key<K: ?Sized>() -> Error {
    Error::new(
        ErrorKind::UnmarshalMapKey,
        format!("map keys must be strings, got key type {}", type_name::<K>()),
    )
}
