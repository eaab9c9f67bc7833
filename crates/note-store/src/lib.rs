//! Authoritative note store.
//!
//! The store is the source of truth for all note state; the event stream
//! is a notification mechanism layered on top of it. This crate provides
//! the [`NoteStore`] trait plus two implementations with the same
//! interface: [`PostgresNoteStore`] for production and
//! [`InMemoryNoteStore`] for tests and local runs.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use common::NoteId;
pub use error::{NoteStoreError, Result};
pub use memory::InMemoryNoteStore;
pub use postgres::PostgresNoteStore;
pub use store::{CategoryCounts, NoteStats, NoteStore};
