//! `Decoder`: strict recursive-descent bencode reader.
//!
//! Wire format:
//! - Integer: `i<decimal>e`       e.g. `i42e`, `i-7e`
//! - String:  `<byte_len>:<bytes>` e.g. `5:hello`
//! - List:    `l<items>e`
//! - Dict:    `d<sorted key-value pairs>e`
//!
//! Only canonical input is accepted: no leading zeros, no `-0`, dictionary
//! keys strictly ascending.

use std::io::{self, BufRead, Read};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::binder::{Bind, Binder};
use crate::config::DecoderConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::metadata::MetadataCache;
use crate::value::{Dictionary, Value};

/// Longest literal an `i64` can have: `-9223372036854775808`.
const MAX_INTEGER_LEN: usize = 20;

/// Upper bound on the up-front allocation for a byte-string payload.
const PREALLOC_LIMIT: usize = 64 * 1024;

/// Streaming decoder over a buffered reader.
///
/// Each [`decode_next`](Decoder::decode_next) consumes exactly one item and
/// leaves the reader positioned at the first byte after it. After any failure
/// other than [`ErrorKind::NullRootValue`] the reader position is unknown, so
/// the decoder refuses further work.
pub struct Decoder<R> {
    reader: R,
    config: DecoderConfig,
    cache: Arc<MetadataCache>,
    poisoned: bool,
}

impl<'a> Decoder<&'a [u8]> {
    pub fn from_slice(bytes: &'a [u8]) -> Self {
        Self::new(bytes)
    }
}

impl<R: BufRead> Decoder<R> {
    pub fn new(reader: R) -> Self {
        Self::with_config(reader, DecoderConfig::default())
    }

    pub fn with_config(reader: R, config: DecoderConfig) -> Self {
        Self {
            reader,
            config,
            cache: MetadataCache::global(),
            poisoned: false,
        }
    }

    /// Uses `cache` instead of the process-wide metadata cache for binding.
    pub fn with_cache(mut self, cache: Arc<MetadataCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Decodes the next item from the stream.
    ///
    /// Returns [`ErrorKind::NullRootValue`] when the stream is exhausted before
    /// the item starts, and [`ErrorKind::UnexpectedEof`] when it ends inside
    /// one.
    pub fn decode_next(&mut self) -> Result<Value> {
        if self.poisoned {
            return Err(Error::new(
                ErrorKind::Usage,
                "decoder is unusable after a failed decode",
            ));
        }
        match self.read_item(0) {
            Ok(value) => {
                trace!(kind = %value.kind(), "decoded item");
                Ok(value)
            }
            Err(err) if err.is_null_root() => Err(err),
            Err(err) => {
                debug!(error = %err, "decode failed, decoder poisoned");
                self.poisoned = true;
                Err(err)
            }
        }
    }

    /// Decodes the next item and binds it into `dest`.
    pub fn decode_next_into<T: Bind + ?Sized>(&mut self, dest: &mut T) -> Result<()> {
        let value = self.decode_next()?;
        Binder::new(&self.cache).assign(dest, Some(&value))
    }

    fn peek(&mut self) -> Result<Option<u8>> {
        loop {
            match self.reader.fill_buf() {
                Ok(buf) => return Ok(buf.first().copied()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(read_failure(e)),
            }
        }
    }

    fn next_byte(&mut self) -> Result<Option<u8>> {
        let byte = self.peek()?;
        if byte.is_some() {
            self.reader.consume(1);
        }
        Ok(byte)
    }

    fn read_item(&mut self, depth: usize) -> Result<Value> {
        let Some(token) = self.peek()? else {
            return Err(if depth == 0 {
                Error::new(ErrorKind::NullRootValue, "no bytes before end of input")
            } else {
                Error::new(ErrorKind::UnexpectedEof, "expected a value")
            });
        };
        match token {
            b'0'..=b'9' => self.read_string().map(Value::ByteString),
            b'i' => self.read_integer().map(Value::Integer),
            b'l' => self.read_list(depth + 1),
            b'd' => self.read_dict(depth + 1),
            _ => Err(Error::new(
                ErrorKind::UnexpectedToken,
                format!("unexpected token '{}'", [token].escape_ascii()),
            )),
        }
    }

    fn enter(&self, depth: usize) -> Result<()> {
        if self.config.depth_allowed(depth) {
            return Ok(());
        }
        Err(Error::new(
            ErrorKind::Syntax,
            format!("nesting depth {depth} exceeds the configured limit"),
        ))
    }

    fn read_length(&mut self) -> Result<usize> {
        let mut len: usize = 0;
        let mut leading_zero = false;
        loop {
            let Some(byte) = self.next_byte()? else {
                return Err(Error::new(
                    ErrorKind::UnexpectedEof,
                    "unterminated string length",
                ));
            };
            match byte {
                b':' => return Ok(len),
                b'0'..=b'9' => {
                    if leading_zero {
                        return Err(Error::new(
                            ErrorKind::SyntaxStringLength,
                            "string length has a leading zero",
                        ));
                    }
                    leading_zero = len == 0 && byte == b'0';
                    len = len
                        .checked_mul(10)
                        .and_then(|l| l.checked_add(usize::from(byte - b'0')))
                        .ok_or_else(|| {
                            Error::new(ErrorKind::SyntaxStringLength, "string length overflows")
                        })?;
                }
                other => {
                    return Err(Error::new(
                        ErrorKind::SyntaxStringLength,
                        format!("invalid byte '{}' in string length", [other].escape_ascii()),
                    ))
                }
            }
        }
    }

    fn read_string(&mut self) -> Result<Vec<u8>> {
        let len = self.read_length()?;
        if !self.config.string_len_allowed(len) {
            return Err(Error::new(
                ErrorKind::SyntaxStringLength,
                format!("declared length {len} exceeds the configured limit"),
            ));
        }
        let mut data = Vec::with_capacity(len.min(PREALLOC_LIMIT));
        let got = (&mut self.reader)
            .take(len as u64)
            .read_to_end(&mut data)
            .map_err(read_failure)?;
        if got < len {
            return Err(Error::new(
                ErrorKind::UnexpectedEof,
                format!("expected {len} bytes for string, got {got}"),
            ));
        }
        Ok(data)
    }

    fn read_integer(&mut self) -> Result<i64> {
        self.reader.consume(1);
        let mut literal = Vec::with_capacity(MAX_INTEGER_LEN);
        loop {
            match self.next_byte()? {
                None => {
                    return Err(Error::new(
                        ErrorKind::UnexpectedEof,
                        "integer not terminated by 'e'",
                    ))
                }
                Some(b'e') => break,
                Some(byte) => {
                    if literal.len() == MAX_INTEGER_LEN {
                        return Err(Error::new(
                            ErrorKind::SyntaxInteger,
                            format!("integer literal longer than {MAX_INTEGER_LEN} bytes"),
                        ));
                    }
                    literal.push(byte);
                }
            }
        }
        parse_integer(&literal)
    }

    fn read_list(&mut self, depth: usize) -> Result<Value> {
        self.enter(depth)?;
        self.reader.consume(1);
        let mut items = Vec::new();
        loop {
            match self.peek()? {
                None => {
                    return Err(Error::new(
                        ErrorKind::UnexpectedEof,
                        "list not terminated by 'e'",
                    ))
                }
                Some(b'e') => {
                    self.reader.consume(1);
                    return Ok(Value::List(items));
                }
                Some(_) => items.push(self.read_item(depth)?),
            }
        }
    }

    fn read_dict(&mut self, depth: usize) -> Result<Value> {
        self.enter(depth)?;
        self.reader.consume(1);
        let mut dict = Dictionary::new();
        loop {
            match self.peek()? {
                None => {
                    return Err(Error::new(
                        ErrorKind::UnexpectedEof,
                        "dictionary not terminated by 'e'",
                    ))
                }
                Some(b'e') => {
                    self.reader.consume(1);
                    return Ok(Value::Dictionary(dict));
                }
                Some(_) => {}
            }

            let key = match self.read_item(depth)? {
                Value::ByteString(key) => key,
                other => {
                    return Err(Error::new(
                        ErrorKind::StructureDict,
                        format!("dictionary key of kind {} is not a byte string", other.kind()),
                    ))
                }
            };
            let name = String::from_utf8_lossy(&key).into_owned();
            if dict.contains_key(&key) {
                return Err(
                    Error::new(ErrorKind::DictKeyDup, format!("duplicate key {name:?}"))
                        .with_field(name),
                );
            }
            if let Some(prev) = dict.keys().next_back() {
                if key < *prev {
                    let msg = format!(
                        "key {name:?} is not lexicographically after {:?}",
                        String::from_utf8_lossy(prev)
                    );
                    return Err(Error::new(ErrorKind::DictKeySort, msg).with_field(name));
                }
            }

            if self.peek()?.is_none() {
                return Err(Error::new(
                    ErrorKind::DictValue,
                    "missing value (unexpected end of input)",
                )
                .with_field(name));
            }
            let value = self
                .read_item(depth)
                .map_err(|err| Error::wrap(name, err))?;
            dict.insert(key, value);
        }
    }
}

fn read_failure(err: io::Error) -> Error {
    Error::new(ErrorKind::Syntax, "reading input").with_source(err)
}

/// Validates and parses the text between `i` and `e`.
fn parse_integer(literal: &[u8]) -> Result<i64> {
    let text = String::from_utf8_lossy(literal);
    if literal.is_empty() {
        return Err(Error::new(ErrorKind::SyntaxInteger, "empty integer"));
    }
    let digits = literal.strip_prefix(b"-").unwrap_or(literal);
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return Err(Error::new(
            ErrorKind::SyntaxInteger,
            format!("cannot parse integer {text:?}"),
        ));
    }
    if literal == b"-0" {
        return Err(Error::new(
            ErrorKind::SyntaxInteger,
            "invalid integer format: -0",
        ));
    }
    if digits.len() > 1 && digits[0] == b'0' {
        return Err(Error::new(
            ErrorKind::SyntaxInteger,
            format!("invalid integer format (leading zero): {text}"),
        ));
    }
    text.parse::<i64>().map_err(|e| {
        Error::new(
            ErrorKind::SyntaxInteger,
            format!("cannot parse integer {text:?}"),
        )
        .with_source(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(input: &[u8]) -> Result<Value> {
        Decoder::from_slice(input).decode_next()
    }

    #[test]
    fn parse_integer_rules() {
        assert_eq!(parse_integer(b"0").unwrap(), 0);
        assert_eq!(parse_integer(b"-42").unwrap(), -42);
        assert_eq!(parse_integer(b"9223372036854775807").unwrap(), i64::MAX);
        assert_eq!(parse_integer(b"-9223372036854775808").unwrap(), i64::MIN);
        for bad in [&b""[..], b"-", b"+5", b"1.5", b" 1", b"-0", b"00", b"-01"] {
            let err = parse_integer(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::SyntaxInteger, "{bad:?}");
        }
        let err = parse_integer(b"9223372036854775808").unwrap_err();
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn length_rejects_leading_zero_and_garbage() {
        assert_eq!(
            decode_all(b"0:").unwrap(),
            Value::ByteString(Vec::new())
        );
        assert_eq!(
            decode_all(b"04:spam").unwrap_err().kind(),
            ErrorKind::SyntaxStringLength
        );
        assert_eq!(
            decode_all(b"4spam").unwrap_err().kind(),
            ErrorKind::SyntaxStringLength
        );
        assert_eq!(
            decode_all(b"99999999999999999999999:").unwrap_err().kind(),
            ErrorKind::SyntaxStringLength
        );
    }

    #[test]
    fn stream_is_left_after_item() {
        let mut dec = Decoder::from_slice(b"i1e4:spamxyz");
        assert_eq!(dec.decode_next().unwrap(), Value::Integer(1));
        assert_eq!(dec.decode_next().unwrap(), Value::from("spam"));
        assert_eq!(dec.into_inner(), b"xyz");
    }

    #[test]
    fn string_limit_is_checked_before_reading() {
        let cfg = DecoderConfig::default().max_string_len(3);
        let mut dec = Decoder::with_config(&b"4:spam"[..], cfg);
        let err = dec.decode_next().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SyntaxStringLength);
        assert_eq!(dec.into_inner(), b"spam");
    }

    #[test]
    fn depth_limit_counts_containers() {
        let cfg = DecoderConfig::default().max_depth(2);
        assert!(Decoder::with_config(&b"ld1:ai1eee"[..], cfg)
            .decode_next()
            .is_ok());
        let err = Decoder::with_config(&b"lld1:ai1eeee"[..], cfg)
            .decode_next()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
    }

    #[test]
    fn null_root_does_not_poison() {
        let mut dec = Decoder::from_slice(b"");
        assert!(dec.decode_next().unwrap_err().is_null_root());
        assert!(!dec.is_poisoned());
        assert!(dec.decode_next().unwrap_err().is_null_root());
    }

    #[test]
    fn failure_poisons_decoder() {
        let mut dec = Decoder::from_slice(b"i01ei1e");
        assert_eq!(dec.decode_next().unwrap_err().kind(), ErrorKind::SyntaxInteger);
        assert!(dec.is_poisoned());
        assert_eq!(dec.decode_next().unwrap_err().kind(), ErrorKind::Usage);
    }
}
