//! Markdown summarizer.
//!
//! Derives a short display summary and up to nine cover images from raw
//! markdown without running a markdown parser. The result is recomputed
//! from scratch on every edit and is never stored back into the text.
//!
//! # Algorithm
//!
//! 1. Strip a leading front-matter block (`---` line … next `---` line), trim.
//! 2. The first line shaped like `# Title` (exactly one `#`, then
//!    whitespace, then text) becomes the whole summary.
//! 3. Images: every `![alt](url)` anywhere in the text, URL taken up to an
//!    optional `"title"`, deduplicated by exact string, capped at nine.
//! 4. Without a title: drop blank lines, image-only lines and
//!    `<!-- @widget -->` lines; unwrap heading, bold and italic markers;
//!    keep the first ten lines joined by `\n`; cut at 64 characters and
//!    append `...` when cut.
//!
//! # Example
//!
//! ```rust
//! use realm_core::summary::summarize;
//!
//! let s = summarize("# Hello World\nBody text");
//! assert_eq!(s.summary, "Hello World");
//! assert!(s.images.is_empty());
//! ```

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub const MAX_IMAGES: usize = 9;
pub const MAX_SUMMARY_LINES: usize = 10;
pub const MAX_SUMMARY_CHARS: usize = 64;

/// Display summary of a markdown document. When a title was found,
/// `images[0]` is the cover.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub summary: String,
    pub images: Vec<String>,
}

fn image_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"!\[[^\]\n]*\]\(([^)\n]*)\)").expect("valid image regex"))
}

fn image_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:\[?!\[[^\]\n]*\]\([^)\n]*\)(?:\]\([^)\n]*\))?\s*)+$")
            .expect("valid image line regex")
    })
}

fn widget_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^<!--\s*@.+?-->$").expect("valid widget regex"))
}

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#+\s+(.+?)\s*$").expect("valid heading regex"))
}

fn bold_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*\*(.+?)\*\*").expect("valid bold regex"))
}

fn italic_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*(.+?)\*").expect("valid italic regex"))
}

/// Summarize a markdown document. Total: never fails, empty in → empty out.
pub fn summarize(markdown: &str) -> Summary {
    let body = strip_front_matter(markdown).trim();

    let images = cover_images(body);
    let summary = match find_title(body) {
        Some(title) => title.to_string(),
        None => truncate_chars(&body_summary(body), MAX_SUMMARY_CHARS),
    };

    Summary { summary, images }
}

/// Remove a leading `---` … `---` block. Unterminated blocks are kept.
pub fn strip_front_matter(text: &str) -> &str {
    let mut lines = text.split_inclusive('\n');
    match lines.next() {
        Some(first) if first.trim_end_matches(['\r', '\n']) == "---" => {}
        _ => return text,
    }

    let mut offset = text.find('\n').map_or(text.len(), |i| i + 1);
    for line in lines {
        offset += line.len();
        if line.trim_end_matches(['\r', '\n']) == "---" {
            return &text[offset..];
        }
    }
    text
}

/// First `# Title` line, with the marker and surrounding whitespace removed.
fn find_title(text: &str) -> Option<&str> {
    text.lines().find_map(|line| {
        let rest = line.strip_prefix('#')?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let title = rest.trim();
        (!title.is_empty()).then_some(title)
    })
}

fn cover_images(text: &str) -> Vec<String> {
    let mut images: Vec<String> = Vec::new();
    for caps in image_re().captures_iter(text) {
        let target = &caps[1];
        let url = target.split('"').next().unwrap_or_default().trim();
        if url.is_empty() || images.iter().any(|i| i == url) {
            continue;
        }
        images.push(url.to_string());
        if images.len() == MAX_IMAGES {
            break;
        }
    }
    images
}

fn body_summary(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| {
            !line.is_empty() && !image_line_re().is_match(line) && !widget_re().is_match(line)
        })
        .map(|line| {
            let line = heading_re().replace(line, "$1");
            let line = bold_re().replace_all(&line, "$1");
            let line = italic_re().replace_all(&line, "$1").trim().to_string();
            line
        })
        .take(MAX_SUMMARY_LINES)
        .collect::<Vec<_>>()
        .join("\n")
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
