//! Book metadata providers.
//!
//! A provider is a thin request -> mapping adapter: it turns a query into
//! uniform [`Book`] values and nothing else. Template resolution happens
//! only after a provider call has completed.

mod nl;

pub use nl::NlBooksApi;

use crate::book::{Book, is_isbn};
use crate::error::{Error, Result};

pub trait BookProvider {
    /// Free-text search.
    fn search(&self, query: &str, locale: Option<&str>) -> Result<Vec<Book>>;

    /// Exact ISBN lookup. The default searches for the ISBN and keeps the
    /// result whose `isbn`, `isbn10` or `isbn13` matches.
    fn get_by_isbn(&self, isbn: &str) -> Result<Book> {
        self.search(isbn, None)?
            .into_iter()
            .find(|b| {
                [&b.isbn, &b.isbn10, &b.isbn13]
                    .into_iter()
                    .any(|v| v.as_deref() == Some(isbn))
            })
            .ok_or_else(|| Error::BookNotFound(isbn.to_string()))
    }
}

/// Looks a query up: ISBN-shaped queries (dashes and spaces ignored) go
/// through [`BookProvider::get_by_isbn`], anything else takes the first
/// search hit.
pub fn resolve_query(
    provider: &dyn BookProvider,
    query: &str,
    locale: Option<&str>,
) -> Result<Book> {
    let compact: String = query
        .chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .collect();
    if is_isbn(&compact) {
        return provider.get_by_isbn(&compact);
    }

    provider
        .search(query.trim(), locale)?
        .into_iter()
        .next()
        .ok_or_else(|| Error::NoResults(query.trim().to_string()))
}
