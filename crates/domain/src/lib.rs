//! Domain layer for the notes synchronization system.
//!
//! This crate provides:
//! - The [`Note`] record and its input types ([`NewNote`], [`NoteUpdate`],
//!   [`NoteFilter`])
//! - The closed [`NoteEvent`] variant set, one variant per routing key,
//!   with envelope encode/decode at the consumer boundary

pub mod events;
pub mod note;

pub use common::NoteId;
pub use events::{NoteEvent, SharePayload, ViewPayload};
pub use note::{NewNote, Note, NoteFilter, NoteUpdate};
