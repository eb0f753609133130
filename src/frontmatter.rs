//! Frontmatter handling for generated book notes.
//!
//! Goals:
//! - Parse user-authored `key: value` frontmatter text.
//! - Merge it onto the book record without silently losing either side.
//! - Render a block that never breaks the surrounding `---` fences.

use crate::record::{KeyCase, Record};
use indexmap::IndexMap;
use regex::Regex;
use std::sync::LazyLock;

static NEEDS_QUOTES_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":\s").expect("valid quote regex"));

/// Ordered key/value frontmatter.
pub type FrontMatter = IndexMap<String, String>;

/// Extra frontmatter to merge onto a record: either already parsed or raw
/// `key: value` text.
#[derive(Debug, Clone)]
pub enum ExtraFrontMatter<'a> {
    Parsed(&'a FrontMatter),
    Text(&'a str),
}

impl<'a> From<&'a str> for ExtraFrontMatter<'a> {
    fn from(text: &'a str) -> Self {
        ExtraFrontMatter::Text(text)
    }
}

impl<'a> From<&'a FrontMatter> for ExtraFrontMatter<'a> {
    fn from(fm: &'a FrontMatter) -> Self {
        ExtraFrontMatter::Parsed(fm)
    }
}

/// Parses line-oriented `key: value` text.
///
/// The first `:` on a line separates key and value, both trimmed. A line
/// without `:` becomes a key with an empty value. Lines with an empty key
/// are skipped. A repeated key keeps its first position and its last value.
pub fn parse_front_matter(text: &str) -> FrontMatter {
    let mut out = FrontMatter::new();
    if text.is_empty() {
        return out;
    }

    for line in text.split('\n') {
        let (key, value) = match line.split_once(':') {
            Some((k, v)) => (k.trim(), v.trim()),
            None => (line.trim(), ""),
        };
        if !key.is_empty() {
            out.insert(key.to_string(), value.to_string());
        }
    }
    out
}

/// Renders entries as `key: value` lines.
///
/// Entries whose value spans lines are dropped. Values containing `: `
/// are double-quoted with `"` escaped as `&quot;`. The block is trimmed.
pub fn to_string_front_matter<I, K, V>(entries: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut out = String::new();
    for (key, value) in entries {
        let key = key.as_ref();
        let value = value.as_ref().trim();
        if value.contains(['\r', '\n']) {
            continue;
        }
        if NEEDS_QUOTES_REGEX.is_match(value) {
            out.push_str(&format!("{}: {}\n", key, quote_value(value)));
        } else {
            out.push_str(&format!("{}: {}\n", key, value));
        }
    }
    out.trim().to_string()
}

fn quote_value(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "&quot;"))
}

/// Merges extra frontmatter onto a book record.
///
/// The record is first converted to `key_case`. For each extra key, in
/// order, the trimmed value either sets the field or, when the field
/// already holds a different non-empty value, is appended as
/// `"<old>, <new>"`. Equal values are kept once. Comparison is exact.
pub fn apply_default_front_matter<'a>(
    record: &Record,
    extra: impl Into<ExtraFrontMatter<'a>>,
    key_case: KeyCase,
) -> FrontMatter {
    let mut merged: FrontMatter = record
        .with_key_case(key_case)
        .iter()
        .map(|(k, v)| (k.to_string(), v.map(ToString::to_string).unwrap_or_default()))
        .collect();

    let parsed;
    let extra = match extra.into() {
        ExtraFrontMatter::Parsed(fm) => fm,
        ExtraFrontMatter::Text(text) => {
            parsed = parse_front_matter(text);
            &parsed
        }
    };

    for (key, value) in extra {
        let value = value.trim();
        match merged.get_mut(key) {
            Some(existing) if !existing.is_empty() && existing.as_str() != value => {
                existing.push_str(", ");
                existing.push_str(value);
            }
            Some(existing) => *existing = value.to_string(),
            None => {
                merged.insert(key.clone(), value.to_string());
            }
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_handles_missing_colon_and_blank_keys() {
        let fm = parse_front_matter("tags: book\nstatus\n: orphan\n\nurl: http://x.y/z\n");
        let entries: Vec<(&str, &str)> =
            fm.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(
            entries,
            [("tags", "book"), ("status", ""), ("url", "http://x.y/z")]
        );
    }

    #[test]
    fn parse_repeated_key_keeps_position_takes_last_value() {
        let fm = parse_front_matter("a: 1\nb: 2\na: 3");
        let entries: Vec<(&str, &str)> =
            fm.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(entries, [("a", "3"), ("b", "2")]);
    }

    #[test]
    fn parse_blank_is_empty() {
        assert!(parse_front_matter("").is_empty());
        assert!(parse_front_matter("\n  \n").is_empty());
    }

    #[test]
    fn render_quotes_drops_multiline_and_trims() {
        let out = to_string_front_matter([
            ("title", "Dune: Messiah"),
            ("quote", "say \"hi\": now"),
            ("desc", "line1\nline2"),
            ("tags", "  sf  "),
            ("empty", ""),
        ]);
        assert_eq!(
            out,
            "title: \"Dune: Messiah\"\nquote: \"say &quot;hi&quot;: now\"\ntags: sf\nempty:"
        );
    }

    #[test]
    fn render_leaves_colon_without_space_unquoted() {
        assert_eq!(
            to_string_front_matter([("cover", "https://x.y/a.jpg")]),
            "cover: https://x.y/a.jpg"
        );
    }

    #[test]
    fn merge_appends_on_conflict_and_keeps_equal_once() {
        let mut r = Record::new();
        r.insert("tag", "a");
        assert_eq!(
            apply_default_front_matter(&r, "tag: b", KeyCase::CamelCase)["tag"],
            "a, b"
        );
        assert_eq!(
            apply_default_front_matter(&r, "tag: a", KeyCase::CamelCase)["tag"],
            "a"
        );
        // exact comparison only.
        assert_eq!(
            apply_default_front_matter(&r, "tag: A", KeyCase::CamelCase)["tag"],
            "a, A"
        );
    }

    #[test]
    fn merge_sets_empty_fields_and_appends_new_keys() {
        let mut r = Record::new();
        r.insert("title", "Dune");
        r.insert_absent("coverUrl");
        r.insert("status", "");

        let mut extra = FrontMatter::new();
        extra.insert("status".to_string(), " unread ".to_string());
        extra.insert("coverUrl".to_string(), "x".to_string());
        extra.insert("created".to_string(), "2024-01-01".to_string());

        let fm = apply_default_front_matter(&r, &extra, KeyCase::CamelCase);
        let keys: Vec<&str> = fm.keys().map(String::as_str).collect();
        assert_eq!(keys, ["title", "coverUrl", "status", "created"]);
        assert_eq!(fm["status"], "unread");
        assert_eq!(fm["coverUrl"], "x");
    }

    #[test]
    fn merge_uses_snake_case_keys_when_requested() {
        let mut r = Record::new();
        r.insert("publishDate", "1965");
        let fm = apply_default_front_matter(&r, "publish_date: 1966", KeyCase::SnakeCase);
        assert_eq!(fm["publish_date"], "1965, 1966");
        assert!(!fm.contains_key("publishDate"));
    }
}
