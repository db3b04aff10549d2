//! Image placeholder resolution.
//!
//! Generated articles mark image positions with `![<alt>](image_<k>)`, where
//! `k` is an ASCII decimal without leading zeros and a 1-based index into the
//! resolved image list. Resolution is a pure string transformation: same
//! inputs, same output.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::models::ResolvedImage;

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"!\[([^\]]*)\]\(image_([1-9][0-9]*)\)").expect("placeholder pattern is valid")
    })
}

fn standalone_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^!\[[^\]]*\]\(image_([1-9][0-9]*)\)$").expect("standalone pattern is valid")
    })
}

/// Replace every in-range placeholder with an inline `data:` image.
///
/// Placeholders whose index falls outside `1..=images.len()` are left as
/// literal text, so a truncated or malformed backend response still renders.
/// Repeated indices all render the same image.
pub fn resolve_placeholders(markdown: &str, images: &[ResolvedImage]) -> String {
    if images.is_empty() {
        return markdown.to_string();
    }

    let resolved: Cow<'_, str> =
        placeholder_pattern().replace_all(markdown, |caps: &Captures<'_>| {
            match image_for(&caps[2], images) {
                Some(image) => format!("![{}]({})", image.mime_type, image.data_uri()),
                None => caps[0].to_string(),
            }
        });
    resolved.into_owned()
}

fn image_for<'a>(index: &str, images: &'a [ResolvedImage]) -> Option<&'a ResolvedImage> {
    let k: usize = index.parse().ok()?;
    k.checked_sub(1).and_then(|i| images.get(i))
}

/// Placeholder indices in order of appearance, duplicates included.
///
/// Indices too large to represent are skipped.
pub fn placeholder_indices(markdown: &str) -> Vec<usize> {
    placeholder_pattern()
        .captures_iter(markdown)
        .filter_map(|caps| caps[2].parse().ok())
        .collect()
}

/// The index of a placeholder that makes up the whole (trimmed) text.
pub fn standalone_placeholder(text: &str) -> Option<usize> {
    standalone_pattern()
        .captures(text.trim())
        .and_then(|caps| caps[1].parse().ok())
}
