//! In-memory book collection and the record operations on it.
//!
//! A [`Library`] is owned by whoever drives the session and passed by
//! reference to every operation. Titles are matched ignoring case with a
//! linear scan; insertion order is preserved for listing and search.

use tracing::{debug, warn};

use crate::{
    models::Book,
    storage::{LibraryFile, StorageError},
};

/// What [`Library::add_or_update`] did with the incoming record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new title was appended.
    Added,
    /// The title already existed; only its copy count changed.
    Updated {
        /// Copy count after the increment.
        available_copies: u32,
    },
}

/// Result of a borrow request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorrowOutcome {
    /// One copy was checked out.
    Borrowed {
        /// Copies left on the shelf.
        remaining: u32,
    },
    /// The title exists but every copy is out.
    Unavailable,
    /// No title matches.
    NotFound,
}

/// Result of a return request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnOutcome {
    /// The copy was put back on the shelf.
    Returned {
        /// Copies on the shelf after the return.
        available: u32,
    },
    /// No title matches.
    NotFound,
}

/// Full listing of the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing<'a> {
    /// The library holds no books.
    Empty,
    /// Every record in insertion order.
    Books(&'a [Book]),
}

/// The book collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Library {
    books: Vec<Book>,
}

impl Library {
    /// Create an empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap records that are already known to have unique titles.
    pub(crate) fn from_books(books: Vec<Book>) -> Self {
        Self { books }
    }

    /// Add copies of a title, creating the record if needed.
    ///
    /// When the title is already present only the copy count grows; the
    /// stored author and year are kept and the incoming ones are ignored.
    pub fn add_or_update(
        &mut self,
        title: &str,
        author: &str,
        publication_year: u32,
        copies: u32,
    ) -> AddOutcome {
        if let Some(book) = self.get_mut(title) {
            book.available_copies = book.available_copies.saturating_add(copies);
            debug!(title = %book.title, copies, total = book.available_copies, "Copies added");
            return AddOutcome::Updated {
                available_copies: book.available_copies,
            };
        }

        self.books.push(Book::new(title, author, publication_year, copies));
        debug!(title, copies, "Book added");
        AddOutcome::Added
    }

    /// Every book whose title contains `query`, ignoring case.
    pub fn find(&self, query: &str) -> Vec<&Book> {
        self.books
            .iter()
            .filter(|book| book.title_contains(query))
            .collect()
    }

    /// Check out one copy of an exactly matching title.
    pub fn borrow(&mut self, title: &str) -> BorrowOutcome {
        let Some(book) = self.get_mut(title) else {
            warn!(title, "Borrow refused: unknown title");
            return BorrowOutcome::NotFound;
        };
        if book.available_copies == 0 {
            warn!(title = %book.title, "Borrow refused: no copies available");
            return BorrowOutcome::Unavailable;
        }
        book.available_copies -= 1;
        debug!(title = %book.title, remaining = book.available_copies, "Book borrowed");
        BorrowOutcome::Borrowed {
            remaining: book.available_copies,
        }
    }

    /// Put one copy of an exactly matching title back on the shelf.
    ///
    /// There is no ceiling: returning a copy that was never borrowed still
    /// increments the count.
    pub fn return_book(&mut self, title: &str) -> ReturnOutcome {
        let Some(book) = self.get_mut(title) else {
            warn!(title, "Return refused: unknown title");
            return ReturnOutcome::NotFound;
        };
        book.available_copies = book.available_copies.saturating_add(1);
        debug!(title = %book.title, available = book.available_copies, "Book returned");
        ReturnOutcome::Returned {
            available: book.available_copies,
        }
    }

    /// The whole collection for display.
    pub fn list_all(&self) -> Listing<'_> {
        if self.books.is_empty() {
            Listing::Empty
        } else {
            Listing::Books(&self.books)
        }
    }

    /// Sum of available copies across all titles.
    pub fn total_copies(&self) -> u64 {
        self.books
            .iter()
            .map(|book| u64::from(book.available_copies))
            .sum()
    }

    /// Drop every record and delete the backing file.
    ///
    /// Memory is emptied before the file is touched, so a failed delete still
    /// leaves the library empty.
    pub fn clear(&mut self, file: &LibraryFile) -> Result<(), StorageError> {
        let dropped = self.books.len();
        self.books = Vec::new();
        debug!(dropped, "Library cleared");
        file.delete()?;
        Ok(())
    }

    /// Look up an exact title ignoring case.
    pub fn get(&self, title: &str) -> Option<&Book> {
        self.books.iter().find(|book| book.title_matches(title))
    }

    fn get_mut(&mut self, title: &str) -> Option<&mut Book> {
        self.books.iter_mut().find(|book| book.title_matches(title))
    }

    /// Records in insertion order.
    pub fn books(&self) -> &[Book] {
        &self.books
    }

    /// Consume the library and return its records.
    pub fn into_books(self) -> Vec<Book> {
        self.books
    }

    /// Number of distinct titles.
    pub fn len(&self) -> usize {
        self.books.len()
    }

    /// Whether the library holds no titles.
    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}
