#![warn(clippy::all, missing_docs)]

//! Core record engine for the bookshelf inventory manager.
//!
//! This crate hosts the book model, the in-memory library store,
//! flat-file persistence and configuration handling used by the
//! terminal UI and any future frontends.

pub mod config;
pub mod models;
pub mod storage;
pub mod store;

pub use config::AppConfig;
pub use models::Book;
pub use storage::{LibraryFile, LoadOutcome, StorageError};
pub use store::{AddOutcome, BorrowOutcome, Library, Listing, ReturnOutcome};
