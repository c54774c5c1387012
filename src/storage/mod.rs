//! Persistence for pools and assignments
//!
//! SQLite is the only production backend; the mock keeps everything in
//! memory for tests and the HTTP router tests.

pub mod repository;

pub use repository::{
    create_mock_repository, create_sqlite_repository, ImportStats, MockRepository,
    PostingRepository, SharedRepository, SqliteRepository,
};
