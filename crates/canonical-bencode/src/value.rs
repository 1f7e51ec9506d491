//! [`Value`]: the generic decoded item.

use std::collections::BTreeMap;
use std::fmt;

/// Dictionary payload. `BTreeMap` keeps keys in byte-lexicographic order.
pub type Dictionary = BTreeMap<Vec<u8>, Value>;

/// Any decoded bencode item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    ByteString(Vec<u8>),
    Integer(i64),
    List(Vec<Value>),
    Dictionary(Dictionary),
}

/// Discriminant of a [`Value`], used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    ByteString,
    Integer,
    List,
    Dictionary,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueKind::ByteString => "byte string",
            ValueKind::Integer => "integer",
            ValueKind::List => "list",
            ValueKind::Dictionary => "dictionary",
        })
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::ByteString(_) => ValueKind::ByteString,
            Value::Integer(_) => ValueKind::Integer,
            Value::List(_) => ValueKind::List,
            Value::Dictionary(_) => ValueKind::Dictionary,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::ByteString(b) => Some(b),
            _ => None,
        }
    }

    /// Byte-string contents, if they are valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            Value::Dictionary(d) => Some(d),
            _ => None,
        }
    }

    /// Looks up `key` when this value is a dictionary.
    pub fn get(&self, key: impl AsRef<[u8]>) -> Option<&Value> {
        self.as_dict().and_then(|d| d.get(key.as_ref()))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::ByteString(s.as_bytes().to_vec())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::ByteString(s.into_bytes())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::ByteString(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Dictionary> for Value {
    fn from(d: Dictionary) -> Self {
        Value::Dictionary(d)
    }
}

impl From<&Value> for serde_json::Value {
    /// Lossy projection for inspection. Non-UTF-8 byte-strings and keys become
    /// arrays of byte numbers and escaped strings respectively.
    fn from(v: &Value) -> Self {
        match v {
            Value::ByteString(b) => match std::str::from_utf8(b) {
                Ok(s) => serde_json::Value::String(s.to_owned()),
                Err(_) => serde_json::Value::Array(
                    b.iter().map(|byte| serde_json::Value::from(*byte)).collect(),
                ),
            },
            Value::Integer(i) => serde_json::Value::from(*i),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect())
            }
            Value::Dictionary(d) => serde_json::Value::Object(
                d.iter()
                    .map(|(k, v)| (String::from_utf8_lossy(k).into_owned(), v.into()))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(v: Value) -> Self {
        (&v).into()
    }
}
