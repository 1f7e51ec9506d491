use std::any::type_name;
use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};

use super::{mismatch, Bind, Binder};
use crate::error::{Error, ErrorKind, Result};
use crate::types::{non_textual_key, ByteBuf, FromMapKey};
use crate::value::{Dictionary, Value, ValueKind};

fn integer<T: ?Sized>(value: &Value) -> Result<i64> {
    match value {
        Value::Integer(i) => Ok(*i),
        other => Err(mismatch::<T>(ValueKind::Integer, other)),
    }
}

fn overflow<T: ?Sized>(int: i64) -> Error {
    Error::new(
        ErrorKind::UnmarshalOverflow,
        format!("value {int} overflows {}", type_name::<T>()),
    )
}

macro_rules! bind_signed {
    ($($t:ty),*) => {
        $(
            impl Bind for $t {
                fn bind(&mut self, value: &Value, _: &Binder<'_>) -> Result<()> {
                    let int = integer::<$t>(value)?;
                    *self = <$t>::try_from(int).map_err(|_| overflow::<$t>(int))?;
                    Ok(())
                }
            }
        )*
    };
}

macro_rules! bind_unsigned {
    ($($t:ty),*) => {
        $(
            impl Bind for $t {
                fn bind(&mut self, value: &Value, _: &Binder<'_>) -> Result<()> {
                    let int = integer::<$t>(value)?;
                    if int < 0 {
                        return Err(Error::new(
                            ErrorKind::UnmarshalType,
                            format!("cannot bind negative value {int} into {}", type_name::<$t>()),
                        ));
                    }
                    *self = <$t>::try_from(int).map_err(|_| overflow::<$t>(int))?;
                    Ok(())
                }
            }
        )*
    };
}

bind_signed!(i8, i16, i32, i64, isize);
bind_unsigned!(u8, u16, u32, u64, usize);

macro_rules! bind_unsupported {
    ($($t:ty),*) => {
        $(
            impl Bind for $t {
                fn bind(&mut self, value: &Value, _: &Binder<'_>) -> Result<()> {
                    Err(Error::new(
                        ErrorKind::UnmarshalType,
                        format!(
                            "cannot bind {} into {}: no bencode representation",
                            value.kind(),
                            type_name::<$t>()
                        ),
                    ))
                }
            }
        )*
    };
}

bind_unsupported!(f32, f64, bool, char);

fn bytes<'v, T: ?Sized>(value: &'v Value) -> Result<&'v [u8]> {
    match value {
        Value::ByteString(b) => Ok(b),
        other => Err(mismatch::<T>(ValueKind::ByteString, other)),
    }
}

impl Bind for String {
    fn bind(&mut self, value: &Value, _: &Binder<'_>) -> Result<()> {
        let raw = bytes::<String>(value)?;
        let text = std::str::from_utf8(raw).map_err(|e| {
            Error::new(ErrorKind::UnmarshalType, "byte string is not valid UTF-8").with_source(e)
        })?;
        self.clear();
        self.push_str(text);
        Ok(())
    }
}

impl Bind for ByteBuf {
    fn bind(&mut self, value: &Value, _: &Binder<'_>) -> Result<()> {
        let raw = bytes::<ByteBuf>(value)?;
        self.clear();
        self.extend_from_slice(raw);
        Ok(())
    }

    fn bind_absent(&mut self) -> Result<()> {
        self.clear();
        Ok(())
    }
}

impl<const N: usize> Bind for [u8; N] {
    fn bind(&mut self, value: &Value, _: &Binder<'_>) -> Result<()> {
        let raw = bytes::<[u8; N]>(value)?;
        if raw.len() != N {
            return Err(Error::new(
                ErrorKind::UnmarshalType,
                format!("expected {N} bytes, got {}", raw.len()),
            ));
        }
        self.copy_from_slice(raw);
        Ok(())
    }
}

impl Bind for Value {
    fn bind(&mut self, value: &Value, _: &Binder<'_>) -> Result<()> {
        *self = value.clone();
        Ok(())
    }
}

impl<T: Bind + Default> Bind for Option<T> {
    fn bind(&mut self, value: &Value, binder: &Binder<'_>) -> Result<()> {
        let mut inner = T::default();
        inner.bind(value, binder)?;
        *self = Some(inner);
        Ok(())
    }

    fn bind_absent(&mut self) -> Result<()> {
        *self = None;
        Ok(())
    }
}

impl<T: Bind + ?Sized> Bind for Box<T> {
    fn bind(&mut self, value: &Value, binder: &Binder<'_>) -> Result<()> {
        (**self).bind(value, binder)
    }

    fn bind_absent(&mut self) -> Result<()> {
        (**self).bind_absent()
    }
}

impl<T: Bind + Default> Bind for Vec<T> {
    fn bind(&mut self, value: &Value, binder: &Binder<'_>) -> Result<()> {
        let Value::List(items) = value else {
            return Err(mismatch::<Self>(ValueKind::List, value));
        };
        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let mut elem = T::default();
            elem.bind(item, binder)
                .map_err(|e| Error::wrap(i.to_string(), e))?;
            out.push(elem);
        }
        *self = out;
        Ok(())
    }

    fn bind_absent(&mut self) -> Result<()> {
        self.clear();
        Ok(())
    }
}

/// Binds every dictionary entry into a fresh `(K, V)` pair.
fn bind_entries<K, V>(
    value: &Value,
    binder: &Binder<'_>,
    mut insert: impl FnMut(K, V),
) -> Result<()>
where
    K: FromMapKey,
    V: Bind + Default,
{
    if !K::TEXTUAL {
        return Err(non_textual_key::<K>());
    }
    let dict: &Dictionary = match value {
        Value::Dictionary(d) => d,
        other => return Err(mismatch::<Dictionary>(ValueKind::Dictionary, other)),
    };
    for (raw, item) in dict {
        let name = String::from_utf8_lossy(raw);
        let key = K::from_key_bytes(raw).map_err(|e| Error::wrap(&*name, e))?;
        let mut val = V::default();
        val.bind(item, binder)
            .map_err(|e| Error::wrap(&*name, e))?;
        insert(key, val);
    }
    Ok(())
}

impl<K, V, S> Bind for HashMap<K, V, S>
where
    K: FromMapKey + Eq + Hash,
    V: Bind + Default,
    S: BuildHasher + Default,
{
    fn bind(&mut self, value: &Value, binder: &Binder<'_>) -> Result<()> {
        let mut out = HashMap::with_hasher(S::default());
        bind_entries(value, binder, |k, v| {
            out.insert(k, v);
        })?;
        *self = out;
        Ok(())
    }

    fn bind_absent(&mut self) -> Result<()> {
        self.clear();
        Ok(())
    }
}

impl<K, V> Bind for BTreeMap<K, V>
where
    K: FromMapKey + Ord,
    V: Bind + Default,
{
    fn bind(&mut self, value: &Value, binder: &Binder<'_>) -> Result<()> {
        let mut out = BTreeMap::new();
        bind_entries(value, binder, |k, v| {
            out.insert(k, v);
        })?;
        *self = out;
        Ok(())
    }

    fn bind_absent(&mut self) -> Result<()> {
        self.clear();
        Ok(())
    }
}
