//! Book metadata as produced by catalog providers.

use crate::record::Record;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static ISBN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(97[89])?\d{9}[\dX]$").expect("valid isbn regex"));

/// Normalized metadata returned by any provider adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Book {
    pub title: String,
    pub subtitle: Option<String>,
    pub author: Option<String>,
    pub authors: Vec<String>,
    pub category: Option<String>,
    pub categories: Vec<String>,
    pub publisher: Option<String>,
    pub publish_date: Option<String>,
    pub total_page: Option<String>,
    pub cover_url: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub preview_link: Option<String>,
    pub isbn: Option<String>,
    pub isbn10: Option<String>,
    pub isbn13: Option<String>,
}

impl Book {
    /// Flattens the book into a template record. Fields keep their
    /// camelCase names; unset optional fields and empty lists are omitted.
    pub fn to_record(&self) -> Record {
        let mut r = Record::new();
        r.insert("title", self.title.as_str());

        let optional = [
            ("subtitle", &self.subtitle),
            ("author", &self.author),
        ];
        push_optional(&mut r, &optional);
        if !self.authors.is_empty() {
            r.insert("authors", self.authors.clone());
        }
        push_optional(&mut r, &[("category", &self.category)]);
        if !self.categories.is_empty() {
            r.insert("categories", self.categories.clone());
        }
        push_optional(
            &mut r,
            &[
                ("publisher", &self.publisher),
                ("publishDate", &self.publish_date),
                ("totalPage", &self.total_page),
                ("coverUrl", &self.cover_url),
                ("description", &self.description),
                ("link", &self.link),
                ("previewLink", &self.preview_link),
                ("isbn", &self.isbn),
                ("isbn10", &self.isbn10),
                ("isbn13", &self.isbn13),
            ],
        );
        r
    }
}

fn push_optional(r: &mut Record, fields: &[(&str, &Option<String>)]) {
    for (key, value) in fields {
        if let Some(v) = value {
            r.insert(*key, v.as_str());
        }
    }
}

/// Shape check for ISBN-10/13: optional `978`/`979` prefix, nine digits and
/// a digit-or-`X` check character. The checksum is not verified.
pub fn is_isbn(s: &str) -> bool {
    ISBN_REGEX.is_match(s)
}
