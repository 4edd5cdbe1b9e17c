//! Tag-name normalization.
//!
//! The sanitized form is a join key: visually equal names that differ only
//! in case, punctuation or spacing collapse into one tag identity. The
//! original spelling is kept separately for display.

use crate::models::Tag;

/// ASCII and CJK punctuation removed from tag keys, in addition to the
/// General Punctuation (U+2000–U+206F) and Supplemental Punctuation
/// (U+2E00–U+2E7F) blocks and all whitespace.
const STRIPPED: &str = "\\'!\"#$%&()*+,./:;<=>?@[]^`{|}~，。【】『』（）“；：‘";

fn is_stripped(c: char) -> bool {
    c.is_whitespace()
        || ('\u{2000}'..='\u{206F}').contains(&c)
        || ('\u{2E00}'..='\u{2E7F}').contains(&c)
        || c == '\u{FEFF}'
        || STRIPPED.contains(c)
}

/// Lowercase, then drop punctuation and whitespace.
///
/// ```rust
/// use realm_core::tags::sanitize_tag;
///
/// assert_eq!(sanitize_tag("Hello, World!"), "helloworld");
/// assert_eq!(sanitize_tag("『Rust』 语言"), "rust语言");
/// ```
pub fn sanitize_tag(tag_name: &str) -> String {
    tag_name
        .to_lowercase()
        .chars()
        .filter(|c| !is_stripped(*c))
        .collect()
}

/// Split comma-separated tag input into tags.
///
/// Entries are trimmed; empty entries, entries whose key sanitizes to
/// nothing, and repeats of an earlier key are dropped.
pub fn parse_tag_input(input: &str) -> Vec<Tag> {
    let mut tags: Vec<Tag> = Vec::new();
    for name in input.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let sanitized = sanitize_tag(name);
        if sanitized.is_empty() || tags.iter().any(|t| t.sanitized == sanitized) {
            continue;
        }
        tags.push(Tag {
            name: name.to_string(),
            sanitized,
        });
    }
    tags
}
