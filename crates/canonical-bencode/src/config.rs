//! Decoder limits for untrusted input.

/// Nesting depth accepted by [`DecoderConfig::default`].
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Limits applied while decoding.
///
/// Nesting is capped at [`DEFAULT_MAX_DEPTH`] by default, since the decoder
/// recurses once per container. String length is unlimited by default; set
/// it when decoding data from untrusted peers so that a hostile length prefix
/// fails fast instead of exhausting memory.
///
/// ```
/// use canonical_bencode::{Decoder, DecoderConfig, ErrorKind};
///
/// let cfg = DecoderConfig::default().max_depth(2);
/// let mut dec = Decoder::with_config(&b"llli1eeee"[..], cfg);
/// assert_eq!(dec.decode_next().unwrap_err().kind(), ErrorKind::Syntax);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Deepest list/dictionary nesting accepted. The root container is depth 1.
    /// `None` lifts the limit and leaves the call stack as the only bound.
    pub max_depth: Option<usize>,
    /// Largest declared byte-string length accepted.
    pub max_string_len: Option<usize>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_depth: Some(DEFAULT_MAX_DEPTH),
            max_string_len: None,
        }
    }
}

impl DecoderConfig {
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn max_string_len(mut self, len: usize) -> Self {
        self.max_string_len = Some(len);
        self
    }

    pub(crate) fn depth_allowed(&self, depth: usize) -> bool {
        self.max_depth.map_or(true, |max| depth <= max)
    }

    pub(crate) fn string_len_allowed(&self, len: usize) -> bool {
        self.max_string_len.map_or(true, |max| len <= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bounds_depth_only() {
        let cfg = DecoderConfig::default();
        assert_eq!(cfg.max_depth, Some(DEFAULT_MAX_DEPTH));
        assert!(cfg.depth_allowed(DEFAULT_MAX_DEPTH));
        assert!(!cfg.depth_allowed(DEFAULT_MAX_DEPTH + 1));
        assert!(cfg.string_len_allowed(usize::MAX));
    }
}
