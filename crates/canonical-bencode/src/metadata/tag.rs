//! Field tag parsing: `key[,required][,omitempty]`.

const SEPARATOR: char = ',';
/// A tag of just `-` names no key and sets no options.
const NO_KEY: &str = "-";
const OPT_REQUIRED: &str = "required";
const OPT_OMIT_EMPTY: &str = "omitempty";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct ParsedTag<'a> {
    /// Empty when the tag names no key.
    pub key: &'a str,
    pub required: bool,
    pub omit_empty: bool,
}

/// Splits a tag into its wire key and options. Unknown options are ignored.
pub(crate) fn parse_tag(tag: &str) -> ParsedTag<'_> {
    if tag.trim() == NO_KEY {
        return ParsedTag::default();
    }
    let mut parts = tag.split(SEPARATOR);
    let mut parsed = ParsedTag {
        key: parts.next().unwrap_or_default().trim(),
        ..ParsedTag::default()
    };
    for option in parts {
        match option.trim() {
            OPT_REQUIRED => parsed.required = true,
            OPT_OMIT_EMPTY => parsed.omit_empty = true,
            _ => {}
        }
    }
    parsed
}
