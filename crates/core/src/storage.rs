//! Flat-file persistence for the library collection.

use std::{
    collections::HashSet,
    fs, io,
    path::{Path, PathBuf},
};

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    models::{normalize_title, Book},
    store::Library,
};

/// File name used when no other location is configured.
pub const DEFAULT_DATA_FILE: &str = "library_data.json";

/// Failures raised while reading or writing the backing file.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The file exists but could not be read.
    #[error("failed to read {}", .path.display())]
    Read {
        /// Location of the backing file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The file contents are not a valid record sequence.
    #[error("failed to parse {}", .path.display())]
    Parse {
        /// Location of the backing file.
        path: PathBuf,
        /// Underlying decoder error.
        #[source]
        source: serde_json::Error,
    },
    /// Two records in the file share a title when case is ignored.
    #[error("duplicate title '{title}' in {}", .path.display())]
    DuplicateTitle {
        /// Location of the backing file.
        path: PathBuf,
        /// Second occurrence of the repeated title.
        title: String,
    },
    /// The collection could not be encoded.
    #[error("failed to encode library for {}", .path.display())]
    Encode {
        /// Location of the backing file.
        path: PathBuf,
        /// Underlying encoder error.
        #[source]
        source: serde_json::Error,
    },
    /// The file could not be written.
    #[error("failed to write {}", .path.display())]
    Write {
        /// Location of the backing file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The file exists but could not be removed.
    #[error("failed to delete {}", .path.display())]
    Delete {
        /// Location of the backing file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Result of reading the backing file.
#[derive(Debug)]
pub enum LoadOutcome {
    /// A previous save was found and decoded.
    Loaded(Library),
    /// No file exists yet; start with an empty library.
    NoPriorData,
}

impl LoadOutcome {
    /// Collapse the outcome into a library, empty when nothing was stored.
    pub fn into_library(self) -> Library {
        match self {
            LoadOutcome::Loaded(library) => library,
            LoadOutcome::NoPriorData => Library::new(),
        }
    }
}

/// Handle to the single JSON file holding the collection.
#[derive(Debug, Clone)]
pub struct LibraryFile {
    path: PathBuf,
}

impl LibraryFile {
    /// Create a handle for the provided path. Nothing is touched on disk.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a backing file currently exists.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read the full collection from disk.
    pub fn load(&self) -> Result<LoadOutcome, StorageError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No library data found");
                return Ok(LoadOutcome::NoPriorData);
            }
            Err(source) => {
                return Err(StorageError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let books: Vec<Book> =
            serde_json::from_str(&content).map_err(|source| StorageError::Parse {
                path: self.path.clone(),
                source,
            })?;

        let mut seen = HashSet::with_capacity(books.len());
        for book in &books {
            if !seen.insert(normalize_title(&book.title)) {
                return Err(StorageError::DuplicateTitle {
                    path: self.path.clone(),
                    title: book.title.clone(),
                });
            }
        }

        info!(path = %self.path.display(), books = books.len(), "Library loaded");
        Ok(LoadOutcome::Loaded(Library::from_books(books)))
    }

    /// Overwrite the backing file with the given records.
    pub fn save(&self, books: &[Book]) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| StorageError::Write {
                    path: self.path.clone(),
                    source,
                })?;
            }
        }

        let serialised = encode(books).map_err(|source| StorageError::Encode {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, serialised).map_err(|source| StorageError::Write {
            path: self.path.clone(),
            source,
        })?;
        info!(path = %self.path.display(), books = books.len(), "Library saved");
        Ok(())
    }

    /// Remove the backing file. Returns `false` when there was nothing to remove.
    pub fn delete(&self) -> Result<bool, StorageError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "Library data deleted");
                Ok(true)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No library data to delete");
                Ok(false)
            }
            Err(source) => Err(StorageError::Delete {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

fn encode(books: &[Book]) -> serde_json::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut serializer =
        Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(b"    "));
    books.serialize(&mut serializer)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    fn sample_books() -> Vec<Book> {
        vec![
            Book::new("Dune", "Frank Herbert", 1965, 2),
            Book::new("Foundation", "Isaac Asimov", 1951, 0),
            Book::new("Kindred", "Octavia E. Butler", 1979, 4),
        ]
    }

    #[test]
    fn save_load_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let file = LibraryFile::new(dir.path().join("library_data.json"));
        let books = sample_books();

        file.save(&books)?;
        assert!(file.exists());

        let library = match file.load()? {
            LoadOutcome::Loaded(library) => library,
            LoadOutcome::NoPriorData => panic!("expected saved data"),
        };
        assert_eq!(library.books(), books.as_slice());
        Ok(())
    }

    #[test]
    fn save_overwrites_and_is_stable() -> Result<()> {
        let dir = tempdir()?;
        let file = LibraryFile::new(dir.path().join("library_data.json"));

        file.save(&sample_books())?;
        let first = fs::read(file.path())?;
        let reloaded = file.load()?.into_library();
        file.save(reloaded.books())?;
        assert_eq!(fs::read(file.path())?, first);

        file.save(&[])?;
        assert!(file.load()?.into_library().is_empty());
        Ok(())
    }

    #[test]
    fn writes_four_space_indented_array() -> Result<()> {
        let dir = tempdir()?;
        let file = LibraryFile::new(dir.path().join("library_data.json"));
        file.save(&[Book::new("Emma", "Jane Austen", 1815, 1)])?;

        let content = fs::read_to_string(file.path())?;
        assert!(content.starts_with("[\n    {\n        \"book_title\": \"Emma\""));
        Ok(())
    }

    #[test]
    fn missing_file_reports_no_prior_data() -> Result<()> {
        let dir = tempdir()?;
        let file = LibraryFile::new(dir.path().join("absent.json"));
        assert!(matches!(file.load()?, LoadOutcome::NoPriorData));
        Ok(())
    }

    #[test]
    fn malformed_file_is_an_error() -> Result<()> {
        let dir = tempdir()?;
        let file = LibraryFile::new(dir.path().join("library_data.json"));
        fs::write(file.path(), "{ not json")?;
        assert!(matches!(file.load(), Err(StorageError::Parse { .. })));

        fs::write(
            file.path(),
            r#"[{"book_title":"A","book_author":"B","publication_year":-5,"available_copies":1}]"#,
        )?;
        assert!(matches!(file.load(), Err(StorageError::Parse { .. })));
        Ok(())
    }

    #[test]
    fn duplicate_titles_are_rejected() -> Result<()> {
        let dir = tempdir()?;
        let file = LibraryFile::new(dir.path().join("library_data.json"));
        file.save(&[
            Book::new("Dune", "Frank Herbert", 1965, 1),
            Book::new("DUNE", "Someone Else", 2000, 1),
        ])?;

        match file.load() {
            Err(StorageError::DuplicateTitle { title, .. }) => assert_eq!(title, "DUNE"),
            other => panic!("unexpected load result: {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn delete_is_a_no_op_when_absent() -> Result<()> {
        let dir = tempdir()?;
        let file = LibraryFile::new(dir.path().join("library_data.json"));
        assert!(!file.delete()?);

        file.save(&sample_books())?;
        assert!(file.delete()?);
        assert!(!file.exists());
        assert!(!file.delete()?);
        Ok(())
    }

    #[test]
    fn save_creates_parent_directories() -> Result<()> {
        let dir = tempdir()?;
        let file = LibraryFile::new(dir.path().join("nested/data/library.json"));
        file.save(&sample_books())?;
        assert!(file.exists());
        Ok(())
    }

    #[test]
    fn write_and_read_failures_are_surfaced() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("library_data.json");
        fs::create_dir_all(path.join("inner"))?;
        let file = LibraryFile::new(&path);

        assert!(matches!(
            file.save(&sample_books()),
            Err(StorageError::Write { .. })
        ));
        assert!(matches!(file.load(), Err(StorageError::Read { .. })));
        Ok(())
    }
}
