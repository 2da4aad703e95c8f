//! Naming
//!
//! Pure functions deriving generated-code names from raw schema names:
//! - `qualify`: `padding` -> `PaddingProperty`
//! - `display_name`: `topLeft` -> `top-left` (stylesheet keys)
//!
//! Qualification is only ever applied to raw names. A qualified name fed
//! back into `qualify` would gain a second suffix.

use regex::Regex;
use std::sync::OnceLock;

/// Suffix appended to every qualified type name unless configured otherwise
pub const DEFAULT_TYPE_SUFFIX: &str = "Property";

fn word_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[A-Z][a-z]+").expect("word pattern is valid"))
}

/// Upper-case the first character
pub fn ucfirst(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lower-case the first character
pub fn lcfirst(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Qualified type name for a raw group name
pub fn qualify(raw_name: &str, suffix: &str) -> String {
    format!("{}{}", ucfirst(raw_name), suffix)
}

/// Recover the raw name from a qualified type name
///
/// Only exact for raw names that started lower-case, which is how schema
/// keys are written. Returns `None` if `type_name` lacks the suffix.
pub fn raw_name(type_name: &str, suffix: &str) -> Option<String> {
    type_name.strip_suffix(suffix).map(lcfirst)
}

/// Hyphenated lower-case form of a camel-case name
///
/// Every `[A-Z][a-z]+` run is a word; text between words (leading
/// lower-case, digits, acronyms) is kept as a word of its own.
pub fn display_name(raw_name: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    let mut last = 0;

    for word in word_pattern().find_iter(raw_name) {
        parts.push(&raw_name[last..word.start()]);
        parts.push(word.as_str());
        last = word.end();
    }
    parts.push(&raw_name[last..]);

    parts
        .into_iter()
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualify() {
        assert_eq!(qualify("size", DEFAULT_TYPE_SUFFIX), "SizeProperty");
        assert_eq!(qualify("topLeft", DEFAULT_TYPE_SUFFIX), "TopLeftProperty");
        assert_eq!(qualify("", DEFAULT_TYPE_SUFFIX), "Property");
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("width"), "width");
        assert_eq!(display_name("topLeft"), "top-left");
        assert_eq!(display_name("backgroundColor"), "background-color");
        assert_eq!(display_name("TopLeft"), "top-left");
    }

    #[test]
    fn test_display_name_keeps_digits_and_acronyms() {
        assert_eq!(display_name("borderWidth2"), "border-width-2");
        assert_eq!(display_name("x2Offset"), "x2-offset");
        assert_eq!(display_name("URLPath"), "url-path");
        assert_eq!(display_name("ABC"), "abc");
    }

    #[test]
    fn test_raw_name_round_trip() {
        for name in ["size", "topLeft", "bottomRightCorner", "iconSize2"] {
            let qualified = qualify(name, DEFAULT_TYPE_SUFFIX);
            let raw = raw_name(&qualified, DEFAULT_TYPE_SUFFIX).unwrap();
            assert_eq!(raw, name);
            assert_eq!(display_name(&raw), display_name(name));
        }
        assert_eq!(raw_name("Size", DEFAULT_TYPE_SUFFIX), None);
    }

    #[test]
    fn test_case_helpers() {
        assert_eq!(ucfirst("color"), "Color");
        assert_eq!(lcfirst("Color"), "color");
        assert_eq!(ucfirst(""), "");
    }
}
