use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::NoteId;
use domain::{NewNote, Note, NoteFilter, NoteUpdate};
use tokio::sync::RwLock;

use crate::{
    NoteStoreError, Result,
    store::{CategoryCounts, NoteStats, NoteStore},
};

/// In-memory note store implementation for testing and local runs.
///
/// Provides the same interface and semantics as the PostgreSQL
/// implementation; mutations run under a single write lock, so the
/// resolve-and-increment path is atomic here too.
#[derive(Clone, Default)]
pub struct InMemoryNoteStore {
    inner: Arc<RwLock<StoreInner>>,
}

#[derive(Default)]
struct StoreInner {
    notes: BTreeMap<i64, Note>,
    next_id: i64,
}

impl InMemoryNoteStore {
    /// Creates a new empty in-memory note store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored notes.
    pub async fn note_count(&self) -> usize {
        self.inner.read().await.notes.len()
    }

    /// Clears all notes.
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.notes.clear();
        inner.next_id = 0;
    }
}

fn matches_filter(note: &Note, filter: &NoteFilter) -> bool {
    if let Some(search) = &filter.search {
        let needle = search.to_lowercase();
        if !note.title.to_lowercase().contains(&needle)
            && !note.content.to_lowercase().contains(&needle)
        {
            return false;
        }
    }
    if let Some(category) = filter.category_filter()
        && note.category != category
    {
        return false;
    }
    true
}

#[async_trait]
impl NoteStore for InMemoryNoteStore {
    async fn create(&self, note: NewNote) -> Result<Note> {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let now = Utc::now();

        let note = Note {
            id: NoteId::new(inner.next_id),
            title: note.title,
            content: note.content,
            category: note.category,
            tags: note.tags,
            color: note.color,
            is_favorite: note.is_favorite,
            is_pinned: note.is_pinned,
            due_date: note.due_date,
            reminder_date: note.reminder_date,
            shared_token: None,
            view_count: 0,
            created_at: now,
            updated_at: now,
        };
        inner.notes.insert(note.id.as_i64(), note.clone());
        Ok(note)
    }

    async fn get(&self, id: NoteId) -> Result<Option<Note>> {
        Ok(self.inner.read().await.notes.get(&id.as_i64()).cloned())
    }

    async fn list(&self, filter: &NoteFilter) -> Result<Vec<Note>> {
        let inner = self.inner.read().await;
        let mut notes: Vec<Note> = inner
            .notes
            .values()
            .filter(|n| matches_filter(n, filter))
            .cloned()
            .collect();
        notes.sort_by(|a, b| {
            b.is_pinned
                .cmp(&a.is_pinned)
                .then(b.created_at.cmp(&a.created_at))
                .then(b.id.cmp(&a.id))
        });
        Ok(notes)
    }

    async fn update(&self, id: NoteId, update: NoteUpdate) -> Result<Note> {
        let mut inner = self.inner.write().await;
        let note = inner
            .notes
            .get_mut(&id.as_i64())
            .ok_or(NoteStoreError::NotFound(id))?;

        note.title = update.title;
        note.content = update.content;
        note.category = update.category;
        note.tags = update.tags;
        note.color = update.color;
        note.is_favorite = update.is_favorite;
        note.is_pinned = update.is_pinned;
        note.due_date = update.due_date;
        note.reminder_date = update.reminder_date;
        note.updated_at = Utc::now();
        Ok(note.clone())
    }

    async fn delete(&self, id: NoteId) -> Result<Note> {
        self.inner
            .write()
            .await
            .notes
            .remove(&id.as_i64())
            .ok_or(NoteStoreError::NotFound(id))
    }

    async fn toggle_favorite(&self, id: NoteId) -> Result<Note> {
        let mut inner = self.inner.write().await;
        let note = inner
            .notes
            .get_mut(&id.as_i64())
            .ok_or(NoteStoreError::NotFound(id))?;
        note.is_favorite = !note.is_favorite;
        note.updated_at = Utc::now();
        Ok(note.clone())
    }

    async fn toggle_pin(&self, id: NoteId) -> Result<Note> {
        let mut inner = self.inner.write().await;
        let note = inner
            .notes
            .get_mut(&id.as_i64())
            .ok_or(NoteStoreError::NotFound(id))?;
        note.is_pinned = !note.is_pinned;
        note.updated_at = Utc::now();
        Ok(note.clone())
    }

    async fn aggregate_counts(&self) -> Result<CategoryCounts> {
        let inner = self.inner.read().await;
        let mut by_category = std::collections::HashMap::new();
        for note in inner.notes.values() {
            *by_category.entry(note.category.clone()).or_insert(0u64) += 1;
        }
        Ok(CategoryCounts {
            total: inner.notes.len() as u64,
            by_category,
        })
    }

    async fn stats(&self) -> Result<NoteStats> {
        let inner = self.inner.read().await;
        let now = Utc::now();
        let mut stats = NoteStats::default();
        for note in inner.notes.values() {
            stats.total += 1;
            match note.category.as_str() {
                "work" => stats.work += 1,
                "personal" => stats.personal += 1,
                "ideas" => stats.ideas += 1,
                _ => {}
            }
            if note.is_favorite {
                stats.favorites += 1;
            }
            if note.is_pinned {
                stats.pinned += 1;
            }
            if note.due_date.is_some_and(|due| due < now) {
                stats.overdue += 1;
            }
        }
        Ok(stats)
    }

    async fn claim_shared_token(&self, id: NoteId, candidate: &str) -> Result<String> {
        let mut inner = self.inner.write().await;
        let note = inner
            .notes
            .get_mut(&id.as_i64())
            .ok_or(NoteStoreError::NotFound(id))?;

        match &note.shared_token {
            Some(existing) => Ok(existing.clone()),
            None => {
                note.shared_token = Some(candidate.to_string());
                Ok(candidate.to_string())
            }
        }
    }

    async fn clear_shared_token(&self, id: NoteId) -> Result<()> {
        let mut inner = self.inner.write().await;
        let note = inner
            .notes
            .get_mut(&id.as_i64())
            .ok_or(NoteStoreError::NotFound(id))?;
        note.shared_token = None;
        Ok(())
    }

    async fn resolve_shared(&self, token: &str) -> Result<Option<Note>> {
        let mut inner = self.inner.write().await;
        let note = inner
            .notes
            .values_mut()
            .find(|n| n.shared_token.as_deref() == Some(token));

        match note {
            Some(note) => {
                note.view_count += 1;
                Ok(Some(note.clone()))
            }
            None => Ok(None),
        }
    }

    async fn list_shared(&self) -> Result<Vec<Note>> {
        let inner = self.inner.read().await;
        let mut notes: Vec<Note> = inner
            .notes
            .values()
            .filter(|n| n.shared_token.is_some())
            .cloned()
            .collect();
        notes.sort_by(|a, b| {
            b.view_count
                .cmp(&a.view_count)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(notes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_note(title: &str, category: &str) -> NewNote {
        NewNote {
            title: title.to_string(),
            content: format!("{title} body"),
            category: category.to_string(),
            tags: Vec::new(),
            color: "#667eea".to_string(),
            is_favorite: false,
            is_pinned: false,
            due_date: None,
            reminder_date: None,
        }
    }

    #[tokio::test]
    async fn create_assigns_sequential_ids() {
        let store = InMemoryNoteStore::new();
        let a = store.create(new_note("a", "general")).await.unwrap();
        let b = store.create(new_note("b", "general")).await.unwrap();
        assert_eq!(a.id.as_i64(), 1);
        assert_eq!(b.id.as_i64(), 2);
    }

    #[tokio::test]
    async fn get_returns_none_for_missing() {
        let store = InMemoryNoteStore::new();
        assert!(store.get(NoteId::new(99)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_missing_note_is_not_found() {
        let store = InMemoryNoteStore::new();
        let err = store
            .update(
                NoteId::new(1),
                NoteUpdate {
                    title: "t".to_string(),
                    content: "c".to_string(),
                    category: "general".to_string(),
                    tags: Vec::new(),
                    color: "#667eea".to_string(),
                    is_favorite: false,
                    is_pinned: false,
                    due_date: None,
                    reminder_date: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, NoteStoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_filters_by_search_and_category() {
        let store = InMemoryNoteStore::new();
        store.create(new_note("Groceries", "personal")).await.unwrap();
        store.create(new_note("Quarterly review", "work")).await.unwrap();
        store.create(new_note("Review checklist", "work")).await.unwrap();

        let work = store
            .list(&NoteFilter {
                search: None,
                category: Some("work".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(work.len(), 2);

        let review = store
            .list(&NoteFilter {
                search: Some("review".to_string()),
                category: None,
            })
            .await
            .unwrap();
        assert_eq!(review.len(), 2);

        let both = store
            .list(&NoteFilter {
                search: Some("checklist".to_string()),
                category: Some("work".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].title, "Review checklist");
    }

    #[tokio::test]
    async fn list_orders_pinned_first() {
        let store = InMemoryNoteStore::new();
        store.create(new_note("first", "general")).await.unwrap();
        let pinned = store.create(new_note("second", "general")).await.unwrap();
        store.toggle_pin(pinned.id).await.unwrap();
        store.create(new_note("third", "general")).await.unwrap();

        let notes = store.list(&NoteFilter::default()).await.unwrap();
        assert_eq!(notes[0].title, "second");
    }

    #[tokio::test]
    async fn toggle_favorite_flips() {
        let store = InMemoryNoteStore::new();
        let note = store.create(new_note("a", "general")).await.unwrap();
        let toggled = store.toggle_favorite(note.id).await.unwrap();
        assert!(toggled.is_favorite);
        let toggled = store.toggle_favorite(note.id).await.unwrap();
        assert!(!toggled.is_favorite);
    }

    #[tokio::test]
    async fn aggregate_counts_by_category() {
        let store = InMemoryNoteStore::new();
        store.create(new_note("a", "work")).await.unwrap();
        store.create(new_note("b", "work")).await.unwrap();
        store.create(new_note("c", "personal")).await.unwrap();

        let counts = store.aggregate_counts().await.unwrap();
        assert_eq!(counts.total, 3);
        assert_eq!(counts.by_category["work"], 2);
        assert_eq!(counts.by_category["personal"], 1);
    }

    #[tokio::test]
    async fn claim_token_is_idempotent() {
        let store = InMemoryNoteStore::new();
        let note = store.create(new_note("a", "general")).await.unwrap();

        let first = store.claim_shared_token(note.id, "token-1").await.unwrap();
        let second = store.claim_shared_token(note.id, "token-2").await.unwrap();
        assert_eq!(first, "token-1");
        assert_eq!(second, "token-1");
    }

    #[tokio::test]
    async fn resolve_increments_view_count() {
        let store = InMemoryNoteStore::new();
        let note = store.create(new_note("a", "general")).await.unwrap();
        store.claim_shared_token(note.id, "tok").await.unwrap();

        let resolved = store.resolve_shared("tok").await.unwrap().unwrap();
        assert_eq!(resolved.view_count, 1);
        let resolved = store.resolve_shared("tok").await.unwrap().unwrap();
        assert_eq!(resolved.view_count, 2);
    }

    #[tokio::test]
    async fn resolve_unknown_token_is_none() {
        let store = InMemoryNoteStore::new();
        assert!(store.resolve_shared("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn concurrent_resolves_lose_no_increments() {
        let store = InMemoryNoteStore::new();
        let note = store.create(new_note("a", "general")).await.unwrap();
        store.claim_shared_token(note.id, "tok").await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..50 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.resolve_shared("tok").await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let note = store.get(note.id).await.unwrap().unwrap();
        assert_eq!(note.view_count, 50);
    }

    #[tokio::test]
    async fn revoked_token_no_longer_resolves() {
        let store = InMemoryNoteStore::new();
        let note = store.create(new_note("a", "general")).await.unwrap();
        store.claim_shared_token(note.id, "tok").await.unwrap();
        store.clear_shared_token(note.id).await.unwrap();

        assert!(store.resolve_shared("tok").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_shared_orders_by_views() {
        let store = InMemoryNoteStore::new();
        let a = store.create(new_note("a", "general")).await.unwrap();
        let b = store.create(new_note("b", "general")).await.unwrap();
        store.claim_shared_token(a.id, "tok-a").await.unwrap();
        store.claim_shared_token(b.id, "tok-b").await.unwrap();
        store.resolve_shared("tok-b").await.unwrap();

        let shared = store.list_shared().await.unwrap();
        assert_eq!(shared.len(), 2);
        assert_eq!(shared[0].title, "b");
    }
}
