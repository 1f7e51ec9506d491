//! Bencode error taxonomy.
//!
//! Every failure carries an [`ErrorKind`], a human message, the offending
//! field or key when one applies, and the wrapped cause when the failure is
//! reported on behalf of a nested one.

use std::fmt;

use thiserror::Error;

/// Boxed underlying cause of an [`Error`].
pub type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Broad class of an [`ErrorKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Syntax,
    Structure,
    Binding,
    Encoding,
    Usage,
}

/// Fine-grained classification of a bencode failure.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    #[error("syntax error")]
    Syntax,
    #[error("null root value")]
    NullRootValue,
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("integer syntax error")]
    SyntaxInteger,
    #[error("string length syntax error")]
    SyntaxStringLength,
    #[error("unexpected token")]
    UnexpectedToken,

    #[error("dictionary structure error")]
    StructureDict,
    #[error("dictionary key sort order error")]
    DictKeySort,
    #[error("duplicate dictionary key")]
    DictKeyDup,
    #[error("missing dictionary value")]
    DictValue,

    #[error("unmarshal type mismatch")]
    UnmarshalType,
    #[error("unmarshal overflow")]
    UnmarshalOverflow,
    #[error("unmarshal to nil/non-nillable")]
    UnmarshalToNil,
    #[error("unmarshal to invalid destination")]
    UnmarshalToInvalid,
    #[error("unmarshal map key type error")]
    UnmarshalMapKey,
    #[error("required field missing")]
    UnmarshalRequiredFieldMissing,

    #[error("unsupported type")]
    EncodeUnsupportedType,
    #[error("map key is not a string")]
    EncodeMapKeyNotString,
    #[error("required field holds zero value")]
    EncodeRequiredFieldZero,
    #[error("write error")]
    EncodeWriteError,

    #[error("API usage error")]
    Usage,
}

impl ErrorKind {
    pub fn category(self) -> Category {
        use ErrorKind::*;
        match self {
            Syntax | NullRootValue | UnexpectedEof | SyntaxInteger | SyntaxStringLength
            | UnexpectedToken => Category::Syntax,
            StructureDict | DictKeySort | DictKeyDup | DictValue => Category::Structure,
            UnmarshalType | UnmarshalOverflow | UnmarshalToNil | UnmarshalToInvalid
            | UnmarshalMapKey | UnmarshalRequiredFieldMissing => Category::Binding,
            EncodeUnsupportedType | EncodeMapKeyNotString | EncodeRequiredFieldZero
            | EncodeWriteError => Category::Encoding,
            Usage => Category::Usage,
        }
    }
}

/// A classified, optionally chained bencode failure.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: String,
    field: Option<String>,
    source: Option<Cause>,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            field: None,
            source: None,
        }
    }

    /// Wraps `inner` with field or key context, keeping its kind.
    pub fn wrap(field: impl Into<String>, inner: Error) -> Self {
        Self {
            kind: inner.kind,
            message: String::new(),
            field: Some(field.into()),
            source: Some(Box::new(inner)),
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<Cause>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub(crate) fn write(err: std::io::Error) -> Self {
        Self::new(ErrorKind::EncodeWriteError, "writing to sink").with_source(err)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn category(&self) -> Category {
        self.kind.category()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The field name, list index, or dictionary key this error is about.
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Innermost bencode error in the chain.
    pub fn root(&self) -> &Error {
        let mut current = self;
        while let Some(next) = current
            .source
            .as_deref()
            .and_then(|s| s.downcast_ref::<Error>())
        {
            current = next;
        }
        current
    }

    pub fn is_null_root(&self) -> bool {
        self.kind == ErrorKind::NullRootValue
    }

    pub fn is_unexpected_eof(&self) -> bool {
        self.kind == ErrorKind::UnexpectedEof
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(field) = &self.field {
            write!(f, "field {field:?}: ")?;
        }
        let wrapper = self.message.is_empty() && self.source.is_some();
        if !wrapper {
            write!(f, "{}", self.kind)?;
            if !self.message.is_empty() {
                write!(f, ": {}", self.message)?;
            }
        }
        if let Some(source) = &self.source {
            if !wrapper {
                f.write_str(": ")?;
            }
            write!(f, "{source}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|s| s as &(dyn std::error::Error + 'static))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_renders_field_kind_message_and_cause() {
        let inner = Error::new(ErrorKind::UnmarshalOverflow, "value 99999999999 overflows i8");
        let outer = Error::wrap("age", inner);
        assert_eq!(
            outer.to_string(),
            "field \"age\": unmarshal overflow: value 99999999999 overflows i8"
        );
        assert_eq!(outer.kind(), ErrorKind::UnmarshalOverflow);
        assert_eq!(outer.field(), Some("age"));
    }

    #[test]
    fn root_walks_nested_wrappers() {
        let inner = Error::new(ErrorKind::UnmarshalType, "expected integer").with_field("x");
        let outer = Error::wrap("2", Error::wrap("list", inner));
        assert_eq!(outer.root().field(), Some("x"));
        assert_eq!(outer.root().message(), "expected integer");
    }

    #[test]
    fn io_cause_is_exposed_through_source() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err = Error::write(io);
        let source = std::error::Error::source(&err).expect("source");
        assert_eq!(source.to_string(), "pipe closed");
        assert_eq!(err.category(), Category::Encoding);
    }

    #[test]
    fn every_kind_maps_to_its_category() {
        assert_eq!(ErrorKind::NullRootValue.category(), Category::Syntax);
        assert_eq!(ErrorKind::DictKeyDup.category(), Category::Structure);
        assert_eq!(ErrorKind::UnmarshalMapKey.category(), Category::Binding);
        assert_eq!(ErrorKind::EncodeWriteError.category(), Category::Encoding);
        assert_eq!(ErrorKind::Usage.category(), Category::Usage);
    }
}
