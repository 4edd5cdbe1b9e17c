//! Deterministic label colors.
//!
//! A label such as `":Note"` always maps to the same `#rrggbb` value, so
//! badges for the same node label look identical everywhere.

use std::collections::HashMap;

/// 31-multiplier string hash over UTF-16 code units, wrapping at 32 bits,
/// folded into a fraction in `[0, 1)` by reading its decimal digits as
/// `0.<digits>`.
fn hash_fraction(key: &str) -> f64 {
    let hash = key
        .encode_utf16()
        .fold(0i32, |acc, unit| {
            acc.wrapping_shl(5).wrapping_sub(acc).wrapping_add(i32::from(unit))
        });
    let digits = i64::from(hash).unsigned_abs();
    format!("0.{digits}").parse::<f64>().unwrap_or(0.0)
}

/// Color for a label key.
///
/// ```rust
/// use realm_core::color::label_color;
///
/// let c = label_color(":Note");
/// assert_eq!(c.len(), 7);
/// assert_eq!(c, label_color(":Note"));
/// ```
pub fn label_color(key: &str) -> String {
    let value = ((1u32 << 24) as f64 * hash_fraction(key)) as u32;
    format!("#{:06x}", value & 0x00ff_ffff)
}

/// Memoizing wrapper around [`label_color`].
#[derive(Debug, Default)]
pub struct ColorCache {
    colors: HashMap<String, String>,
}

impl ColorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn color(&mut self, key: &str) -> &str {
        self.colors
            .entry(key.to_string())
            .or_insert_with(|| label_color(key))
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}
