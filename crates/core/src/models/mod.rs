//! Shared domain models.

use serde::{Deserialize, Serialize};

/// A single title held by the library.
///
/// Field names on disk keep the layout of the legacy flat file so existing
/// data files load unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// Title as entered; unique within a library under case-insensitive comparison.
    #[serde(rename = "book_title")]
    pub title: String,
    /// Author credit. Not unique.
    #[serde(rename = "book_author")]
    pub author: String,
    /// Year of publication.
    pub publication_year: u32,
    /// Copies currently on the shelf.
    pub available_copies: u32,
}

impl Book {
    /// Build a new record.
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        publication_year: u32,
        available_copies: u32,
    ) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            publication_year,
            available_copies,
        }
    }

    /// Exact title match ignoring case.
    pub fn title_matches(&self, title: &str) -> bool {
        normalize_title(&self.title) == normalize_title(title)
    }

    /// Whether `query` appears anywhere in the title, ignoring case.
    ///
    /// An empty query matches every book.
    pub fn title_contains(&self, query: &str) -> bool {
        normalize_title(&self.title).contains(&normalize_title(query))
    }
}

/// Case-folded form of a title used for every lookup.
pub fn normalize_title(title: &str) -> String {
    title.to_lowercase()
}
