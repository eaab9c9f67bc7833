//! Shared leaf types for the notes synchronization system.

pub mod envelope;
pub mod types;

pub use envelope::EventEnvelope;
pub use types::NoteId;
