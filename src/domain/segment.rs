//! URL segment derivation for nodes that do not carry a stored segment.
//!
//! Names are transliterated to ASCII (`pinyin` for Chinese) and slugified
//! (`slug`), so a node called “基线对齐” is routed as `ji-xian-dui-qi`. Stored
//! segments are always lower case because route matching lower-cases the
//! incoming path.

use pinyin::{Pinyin, ToPinyin};
use slug::slugify;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SegmentError {
    #[error("node name is empty")]
    EmptyName,
    #[error("failed to derive a url segment from `{name}`")]
    Unrepresentable { name: String },
}

/// Derive the URL segment for a node name.
pub fn derive_url_segment(name: &str) -> Result<String, SegmentError> {
    if name.trim().is_empty() {
        return Err(SegmentError::EmptyName);
    }

    let candidate = slugify(transliterate_to_ascii(name));
    if candidate.is_empty() {
        return Err(SegmentError::Unrepresentable {
            name: name.to_string(),
        });
    }

    Ok(candidate)
}

/// A segment is usable for routing when it has visible characters.
pub fn is_routable(segment: Option<&str>) -> bool {
    segment.is_some_and(|value| !value.trim().is_empty())
}

fn transliterate_to_ascii(input: &str) -> String {
    let mut output = String::with_capacity(input.len());

    for ch in input.chars() {
        if ch.is_ascii() {
            output.push(ch);
            continue;
        }

        match ch.to_pinyin() {
            Some(py) => append_pinyin(&mut output, py),
            None if ch.is_whitespace() => output.push(' '),
            // slugify decides what to keep
            None => output.push(ch),
        }
    }

    output
}

fn append_pinyin(buffer: &mut String, pinyin: Pinyin) {
    if !buffer.is_empty() && !buffer.ends_with(' ') {
        buffer.push(' ');
    }
    buffer.push_str(pinyin.plain());
}
