//! The note record and its input types.

use chrono::{DateTime, Utc};
use common::NoteId;
use serde::{Deserialize, Serialize};

/// A note as stored in the authoritative store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Store-assigned identifier.
    pub id: NoteId,

    pub title: String,

    pub content: String,

    /// Free-form category; defaults to `"general"`.
    pub category: String,

    pub tags: Vec<String>,

    /// Display color as a `#rrggbb` string.
    pub color: String,

    pub is_favorite: bool,

    pub is_pinned: bool,

    pub due_date: Option<DateTime<Utc>>,

    pub reminder_date: Option<DateTime<Utc>>,

    /// Active public share token, if the note is shared.
    pub shared_token: Option<String>,

    /// Number of successful public accesses. Only ever increases.
    pub view_count: i64,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Note {
    /// Whether the note currently has an active share token.
    pub fn is_shared(&self) -> bool {
        self.shared_token.is_some()
    }
}

/// Input for creating a note.
#[derive(Debug, Clone, Deserialize)]
pub struct NewNote {
    pub title: String,
    pub content: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reminder_date: Option<DateTime<Utc>>,
}

fn default_category() -> String {
    "general".to_string()
}

fn default_color() -> String {
    "#667eea".to_string()
}

/// Input for replacing a note's editable fields.
#[derive(Debug, Clone, Deserialize)]
pub struct NoteUpdate {
    pub title: String,
    pub content: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reminder_date: Option<DateTime<Utc>>,
}

/// Filter for listing notes.
///
/// `search` matches title or content case-insensitively; `category`
/// restricts to one category (`"all"` and `None` mean no restriction).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoteFilter {
    pub search: Option<String>,
    pub category: Option<String>,
}

impl NoteFilter {
    /// Returns the category restriction, treating `"all"` as unrestricted.
    pub fn category_filter(&self) -> Option<&str> {
        match self.category.as_deref() {
            None | Some("all") => None,
            Some(category) => Some(category),
        }
    }
}
