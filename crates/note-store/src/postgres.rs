use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::NoteId;
use domain::{NewNote, Note, NoteFilter, NoteUpdate};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{
    NoteStoreError, Result,
    store::{CategoryCounts, NoteStats, NoteStore},
};

const NOTE_COLUMNS: &str = "id, title, content, category, tags, color, is_favorite, is_pinned, \
     due_date, reminder_date, shared_token, view_count, created_at, updated_at";

/// PostgreSQL-backed note store implementation.
#[derive(Clone)]
pub struct PostgresNoteStore {
    pool: PgPool,
}

impl PostgresNoteStore {
    /// Creates a new PostgreSQL note store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_note(row: PgRow) -> Result<Note> {
        Ok(Note {
            id: NoteId::new(row.try_get("id")?),
            title: row.try_get("title")?,
            content: row.try_get("content")?,
            category: row.try_get("category")?,
            tags: row.try_get("tags")?,
            color: row.try_get("color")?,
            is_favorite: row.try_get("is_favorite")?,
            is_pinned: row.try_get("is_pinned")?,
            due_date: row.try_get::<Option<DateTime<Utc>>, _>("due_date")?,
            reminder_date: row.try_get::<Option<DateTime<Utc>>, _>("reminder_date")?,
            shared_token: row.try_get::<Option<String>, _>("shared_token")?,
            view_count: row.try_get("view_count")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl NoteStore for PostgresNoteStore {
    async fn create(&self, note: NewNote) -> Result<Note> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO notes
              (title, content, category, tags, color, is_favorite, is_pinned, due_date, reminder_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {NOTE_COLUMNS}
            "#,
        ))
        .bind(&note.title)
        .bind(&note.content)
        .bind(&note.category)
        .bind(&note.tags)
        .bind(&note.color)
        .bind(note.is_favorite)
        .bind(note.is_pinned)
        .bind(note.due_date)
        .bind(note.reminder_date)
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_note(row)
    }

    async fn get(&self, id: NoteId) -> Result<Option<Note>> {
        let row = sqlx::query(&format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = $1"))
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_note).transpose()
    }

    async fn list(&self, filter: &NoteFilter) -> Result<Vec<Note>> {
        let mut sql = format!("SELECT {NOTE_COLUMNS} FROM notes WHERE 1=1");
        let mut param_count = 0;

        if filter.search.is_some() {
            param_count += 1;
            sql.push_str(&format!(
                " AND (title ILIKE ${param_count} OR content ILIKE ${param_count})"
            ));
        }
        if filter.category_filter().is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND category = ${param_count}"));
        }

        sql.push_str(" ORDER BY is_pinned DESC, created_at DESC");

        let mut query = sqlx::query(&sql);
        if let Some(search) = &filter.search {
            query = query.bind(format!("%{search}%"));
        }
        if let Some(category) = filter.category_filter() {
            query = query.bind(category);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_note).collect()
    }

    async fn update(&self, id: NoteId, update: NoteUpdate) -> Result<Note> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE notes
            SET title = $1, content = $2, category = $3, tags = $4, color = $5,
                is_favorite = $6, is_pinned = $7, due_date = $8, reminder_date = $9,
                updated_at = NOW()
            WHERE id = $10
            RETURNING {NOTE_COLUMNS}
            "#,
        ))
        .bind(&update.title)
        .bind(&update.content)
        .bind(&update.category)
        .bind(&update.tags)
        .bind(&update.color)
        .bind(update.is_favorite)
        .bind(update.is_pinned)
        .bind(update.due_date)
        .bind(update.reminder_date)
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_note)
            .transpose()?
            .ok_or(NoteStoreError::NotFound(id))
    }

    async fn delete(&self, id: NoteId) -> Result<Note> {
        let row = sqlx::query(&format!(
            "DELETE FROM notes WHERE id = $1 RETURNING {NOTE_COLUMNS}"
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_note)
            .transpose()?
            .ok_or(NoteStoreError::NotFound(id))
    }

    async fn toggle_favorite(&self, id: NoteId) -> Result<Note> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE notes
            SET is_favorite = NOT is_favorite, updated_at = NOW()
            WHERE id = $1
            RETURNING {NOTE_COLUMNS}
            "#,
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_note)
            .transpose()?
            .ok_or(NoteStoreError::NotFound(id))
    }

    async fn toggle_pin(&self, id: NoteId) -> Result<Note> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE notes
            SET is_pinned = NOT is_pinned, updated_at = NOW()
            WHERE id = $1
            RETURNING {NOTE_COLUMNS}
            "#,
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_note)
            .transpose()?
            .ok_or(NoteStoreError::NotFound(id))
    }

    async fn aggregate_counts(&self) -> Result<CategoryCounts> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notes")
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query("SELECT category, COUNT(*) AS count FROM notes GROUP BY category")
            .fetch_all(&self.pool)
            .await?;

        let mut by_category = std::collections::HashMap::new();
        for row in rows {
            let category: String = row.try_get("category")?;
            let count: i64 = row.try_get("count")?;
            by_category.insert(category, count as u64);
        }

        Ok(CategoryCounts {
            total: total as u64,
            by_category,
        })
    }

    async fn stats(&self) -> Result<NoteStats> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE category = 'work') AS work,
                COUNT(*) FILTER (WHERE category = 'personal') AS personal,
                COUNT(*) FILTER (WHERE category = 'ideas') AS ideas,
                COUNT(*) FILTER (WHERE is_favorite) AS favorites,
                COUNT(*) FILTER (WHERE is_pinned) AS pinned,
                COUNT(*) FILTER (WHERE due_date IS NOT NULL AND due_date < NOW()) AS overdue
            FROM notes
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(NoteStats {
            total: row.try_get::<i64, _>("total")? as u64,
            work: row.try_get::<i64, _>("work")? as u64,
            personal: row.try_get::<i64, _>("personal")? as u64,
            ideas: row.try_get::<i64, _>("ideas")? as u64,
            favorites: row.try_get::<i64, _>("favorites")? as u64,
            pinned: row.try_get::<i64, _>("pinned")? as u64,
            overdue: row.try_get::<i64, _>("overdue")? as u64,
        })
    }

    async fn claim_shared_token(&self, id: NoteId, candidate: &str) -> Result<String> {
        // COALESCE keeps an existing token, so concurrent claims converge.
        let row = sqlx::query(
            r#"
            UPDATE notes
            SET shared_token = COALESCE(shared_token, $1)
            WHERE id = $2
            RETURNING shared_token
            "#,
        )
        .bind(candidate)
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(NoteStoreError::NotFound(id))?;

        let token: String = row.try_get("shared_token")?;
        Ok(token)
    }

    async fn clear_shared_token(&self, id: NoteId) -> Result<()> {
        let result = sqlx::query("UPDATE notes SET shared_token = NULL WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(NoteStoreError::NotFound(id));
        }
        Ok(())
    }

    async fn resolve_shared(&self, token: &str) -> Result<Option<Note>> {
        // Lookup and increment as one statement so concurrent resolves of
        // the same token never lose an update.
        let row = sqlx::query(&format!(
            r#"
            UPDATE notes
            SET view_count = view_count + 1
            WHERE shared_token = $1
            RETURNING {NOTE_COLUMNS}
            "#,
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_note).transpose()
    }

    async fn list_shared(&self) -> Result<Vec<Note>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {NOTE_COLUMNS}
            FROM notes
            WHERE shared_token IS NOT NULL
            ORDER BY view_count DESC, created_at DESC
            "#,
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_note).collect()
    }
}
