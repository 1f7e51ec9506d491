use std::any::type_name;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use super::{BencodeEncoder, Encode};
use crate::error::{Error, ErrorKind, Result};
use crate::metadata::MetadataCache;
use crate::types::{ByteBuf, MapKey};
use crate::value::Value;

macro_rules! encode_signed {
    ($($t:ty),*) => {
        $(
            impl Encode for $t {
                fn encode(&self, enc: &mut BencodeEncoder<'_>) -> Result<()> {
                    enc.write_integer(i64::from(*self))
                }

                fn is_zero(&self) -> bool {
                    *self == 0
                }
            }
        )*
    };
}

macro_rules! encode_unsigned {
    ($($t:ty),*) => {
        $(
            impl Encode for $t {
                fn encode(&self, enc: &mut BencodeEncoder<'_>) -> Result<()> {
                    enc.write_u_integer(u64::from(*self))
                }

                fn is_zero(&self) -> bool {
                    *self == 0
                }
            }
        )*
    };
}

encode_signed!(i8, i16, i32, i64);
encode_unsigned!(u8, u16, u32, u64);

impl Encode for isize {
    fn encode(&self, enc: &mut BencodeEncoder<'_>) -> Result<()> {
        enc.write_integer(*self as i64)
    }

    fn is_zero(&self) -> bool {
        *self == 0
    }
}

impl Encode for usize {
    fn encode(&self, enc: &mut BencodeEncoder<'_>) -> Result<()> {
        enc.write_u_integer(*self as u64)
    }

    fn is_zero(&self) -> bool {
        *self == 0
    }
}

/// Types bencode cannot represent. Rejected before anything is written.
macro_rules! encode_unsupported {
    ($($t:ty => $zero:expr),*) => {
        $(
            impl Encode for $t {
                fn encode(&self, _: &mut BencodeEncoder<'_>) -> Result<()> {
                    Err(unsupported::<$t>())
                }

                fn is_zero(&self) -> bool {
                    let zero: fn(&$t) -> bool = $zero;
                    zero(self)
                }
            }
        )*
    };
}

encode_unsupported!(
    f32 => |v| *v == 0.0,
    f64 => |v| *v == 0.0,
    bool => |v| !*v,
    char => |v| *v == '\0',
    () => |_| true
);

fn unsupported<T: ?Sized>() -> Error {
    Error::new(
        ErrorKind::EncodeUnsupportedType,
        format!("unsupported type: {}", type_name::<T>()),
    )
}

impl Encode for str {
    fn encode(&self, enc: &mut BencodeEncoder<'_>) -> Result<()> {
        enc.write_str(self)
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl Encode for String {
    fn encode(&self, enc: &mut BencodeEncoder<'_>) -> Result<()> {
        enc.write_str(self)
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl Encode for ByteBuf {
    fn encode(&self, enc: &mut BencodeEncoder<'_>) -> Result<()> {
        enc.write_bin(self)
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl<const N: usize> Encode for [u8; N] {
    fn encode(&self, enc: &mut BencodeEncoder<'_>) -> Result<()> {
        enc.write_bin(self)
    }

    fn is_zero(&self) -> bool {
        self.iter().all(|b| *b == 0)
    }
}

impl Encode for Value {
    fn encode(&self, enc: &mut BencodeEncoder<'_>) -> Result<()> {
        enc.write_any(self)
    }
}

impl<T: Encode + ?Sized> Encode for &T {
    fn encode(&self, enc: &mut BencodeEncoder<'_>) -> Result<()> {
        (**self).encode(enc)
    }

    fn is_zero(&self) -> bool {
        (**self).is_zero()
    }

    fn is_zero_with(&self, cache: &MetadataCache) -> bool {
        (**self).is_zero_with(cache)
    }
}

impl<T: Encode + ?Sized> Encode for Box<T> {
    fn encode(&self, enc: &mut BencodeEncoder<'_>) -> Result<()> {
        (**self).encode(enc)
    }

    fn is_zero(&self) -> bool {
        (**self).is_zero()
    }

    fn is_zero_with(&self, cache: &MetadataCache) -> bool {
        (**self).is_zero_with(cache)
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode(&self, enc: &mut BencodeEncoder<'_>) -> Result<()> {
        match self {
            Some(inner) => inner.encode(enc),
            None => Err(Error::new(
                ErrorKind::EncodeUnsupportedType,
                format!("cannot encode an absent {}", type_name::<T>()),
            )),
        }
    }

    fn is_zero(&self) -> bool {
        self.is_none()
    }
}

impl<T: Encode> Encode for [T] {
    fn encode(&self, enc: &mut BencodeEncoder<'_>) -> Result<()> {
        enc.begin_list()?;
        for (i, item) in self.iter().enumerate() {
            item.encode(enc).map_err(|e| Error::wrap(i.to_string(), e))?;
        }
        enc.end()
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self, enc: &mut BencodeEncoder<'_>) -> Result<()> {
        self.as_slice().encode(enc)
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

/// Writes map entries as a dictionary in ascending key-byte order.
fn encode_map<'m, K, V, I>(enc: &mut BencodeEncoder<'_>, entries: I) -> Result<()>
where
    K: MapKey + 'm,
    V: Encode + 'm,
    I: Iterator<Item = (&'m K, &'m V)>,
{
    if !K::TEXTUAL {
        return Err(Error::new(
            ErrorKind::EncodeMapKeyNotString,
            format!("unsupported map key type: {}", type_name::<K>()),
        ));
    }
    let mut sorted: Vec<_> = entries.map(|(k, v)| (k.key_bytes(), v)).collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    enc.begin_dict()?;
    for (key, value) in sorted {
        enc.write_bin(&key)?;
        value
            .encode(enc)
            .map_err(|e| Error::wrap(String::from_utf8_lossy(&key), e))?;
    }
    enc.end()
}

impl<K: MapKey, V: Encode, S: BuildHasher> Encode for HashMap<K, V, S> {
    fn encode(&self, enc: &mut BencodeEncoder<'_>) -> Result<()> {
        encode_map(enc, self.iter())
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl<K: MapKey, V: Encode> Encode for BTreeMap<K, V> {
    fn encode(&self, enc: &mut BencodeEncoder<'_>) -> Result<()> {
        encode_map(enc, self.iter())
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}
