//! Translation rows and the store that reads and writes them.
//!
//! One `translations` table serves every owner type: rows are keyed by the
//! `(owner_type, owner_id)` discriminator pair plus `(field, lang)`, and that
//! full tuple carries a unique index.
//!
//! The free functions operate on a single connection so they can be composed
//! inside a transaction; `TranslationStore` wraps them for one-off calls.

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, Transaction};
use std::sync::Arc;

use crate::error::Result;
use crate::locale::Locale;
use crate::orm::{Db, Model};

/// Polymorphic owner of a set of translations.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Owner {
    pub owner_type: String,
    pub owner_id: i64,
}

impl Owner {
    pub fn new(owner_type: impl Into<String>, owner_id: i64) -> Self {
        Owner {
            owner_type: owner_type.into(),
            owner_id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, FromRow, Serialize)]
pub struct Translation {
    pub id: i64,
    pub owner_type: String,
    pub owner_id: i64,
    pub field: String,
    pub lang: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Translation {
    pub fn owner(&self) -> Owner {
        Owner::new(self.owner_type.clone(), self.owner_id)
    }
}

impl Model for Translation {
    fn table_name() -> &'static str {
        "translations"
    }

    fn create_table_sql() -> String {
        "CREATE TABLE IF NOT EXISTS translations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_type VARCHAR(255) NOT NULL,
            owner_id INTEGER NOT NULL,
            field VARCHAR(255) NOT NULL,
            lang VARCHAR(2) NOT NULL,
            text TEXT NOT NULL,
            created_at DATETIME NOT NULL,
            updated_at DATETIME NOT NULL
        )"
        .to_string()
    }

    fn columns() -> Vec<(String, String)> {
        [
            ("owner_type", "VARCHAR(255) NOT NULL DEFAULT ''"),
            ("owner_id", "INTEGER NOT NULL DEFAULT 0"),
            ("field", "VARCHAR(255) NOT NULL DEFAULT ''"),
            ("lang", "VARCHAR(2) NOT NULL DEFAULT ''"),
            ("text", "TEXT NOT NULL DEFAULT ''"),
            ("created_at", "DATETIME"),
            ("updated_at", "DATETIME"),
        ]
        .into_iter()
        .map(|(name, sqltype)| (name.to_string(), sqltype.to_string()))
        .collect()
    }

    fn index_sql() -> Vec<String> {
        vec![
            "CREATE UNIQUE INDEX IF NOT EXISTS translations_owner_field_lang_unique \
             ON translations (owner_type, owner_id, field, lang)"
                .to_string(),
        ]
    }
}

/// Partial match over translation rows; unset parts match anything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TranslationFilter {
    pub owner: Option<Owner>,
    pub field: Option<String>,
    pub lang: Option<String>,
    pub text: Option<String>,
}

impl TranslationFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn owner(mut self, owner: Owner) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Normalized the same way as `Locale::parse`; codes that would not parse
    /// simply match nothing.
    pub fn lang(mut self, lang: impl AsRef<str>) -> Self {
        self.lang = Some(lang.as_ref().trim().to_ascii_lowercase());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

pub async fn insert(
    conn: &mut SqliteConnection,
    owner: &Owner,
    field: &str,
    lang: &Locale,
    text: &str,
) -> Result<Translation> {
    debug!(
        "Inserting translation {}#{}.{} [{}]",
        owner.owner_type, owner.owner_id, field, lang
    );
    let now = Utc::now();
    let row = sqlx::query_as::<_, Translation>(
        "INSERT INTO translations (owner_type, owner_id, field, lang, text, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)
         RETURNING id, owner_type, owner_id, field, lang, text, created_at, updated_at",
    )
    .bind(&owner.owner_type)
    .bind(owner.owner_id)
    .bind(field)
    .bind(lang.as_str())
    .bind(text)
    .bind(now)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

/// Create the row for `(owner, field, lang)` or overwrite its text in place.
/// The row keeps its id and `created_at` across updates.
pub async fn upsert(
    conn: &mut SqliteConnection,
    owner: &Owner,
    field: &str,
    lang: &Locale,
    text: &str,
) -> Result<Translation> {
    debug!(
        "Upserting translation {}#{}.{} [{}]",
        owner.owner_type, owner.owner_id, field, lang
    );
    let now = Utc::now();
    let row = sqlx::query_as::<_, Translation>(
        "INSERT INTO translations (owner_type, owner_id, field, lang, text, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT (owner_type, owner_id, field, lang)
         DO UPDATE SET text = excluded.text, updated_at = excluded.updated_at
         RETURNING id, owner_type, owner_id, field, lang, text, created_at, updated_at",
    )
    .bind(&owner.owner_type)
    .bind(owner.owner_id)
    .bind(field)
    .bind(lang.as_str())
    .bind(text)
    .bind(now)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

pub async fn select_one(
    conn: &mut SqliteConnection,
    owner: &Owner,
    field: &str,
    lang: &Locale,
) -> Result<Option<Translation>> {
    let row = sqlx::query_as::<_, Translation>(
        "SELECT id, owner_type, owner_id, field, lang, text, created_at, updated_at
         FROM translations
         WHERE owner_type = ? AND owner_id = ? AND field = ? AND lang = ?
         ORDER BY id
         LIMIT 1",
    )
    .bind(&owner.owner_type)
    .bind(owner.owner_id)
    .bind(field)
    .bind(lang.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(row)
}

pub async fn select_for_locale(
    conn: &mut SqliteConnection,
    owner: &Owner,
    lang: &Locale,
) -> Result<Vec<Translation>> {
    let rows = sqlx::query_as::<_, Translation>(
        "SELECT id, owner_type, owner_id, field, lang, text, created_at, updated_at
         FROM translations
         WHERE owner_type = ? AND owner_id = ? AND lang = ?
         ORDER BY id",
    )
    .bind(&owner.owner_type)
    .bind(owner.owner_id)
    .bind(lang.as_str())
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

pub async fn select_for_owner(
    conn: &mut SqliteConnection,
    owner: &Owner,
) -> Result<Vec<Translation>> {
    let rows = sqlx::query_as::<_, Translation>(
        "SELECT id, owner_type, owner_id, field, lang, text, created_at, updated_at
         FROM translations
         WHERE owner_type = ? AND owner_id = ?
         ORDER BY id",
    )
    .bind(&owner.owner_type)
    .bind(owner.owner_id)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

pub async fn select_exists(
    conn: &mut SqliteConnection,
    filter: &TranslationFilter,
) -> Result<bool> {
    let mut query =
        QueryBuilder::<Sqlite>::new("SELECT EXISTS (SELECT 1 FROM translations WHERE 1 = 1");
    if let Some(owner) = &filter.owner {
        query
            .push(" AND owner_type = ")
            .push_bind(owner.owner_type.clone())
            .push(" AND owner_id = ")
            .push_bind(owner.owner_id);
    }
    if let Some(field) = &filter.field {
        query.push(" AND field = ").push_bind(field.clone());
    }
    if let Some(lang) = &filter.lang {
        query.push(" AND lang = ").push_bind(lang.clone());
    }
    if let Some(text) = &filter.text {
        query.push(" AND text = ").push_bind(text.clone());
    }
    query.push(")");

    let (found,): (bool,) = query.build_query_as::<(bool,)>().fetch_one(conn).await?;
    Ok(found)
}

pub async fn update_text(
    conn: &mut SqliteConnection,
    id: i64,
    text: &str,
) -> Result<Translation> {
    let row = sqlx::query_as::<_, Translation>(
        "UPDATE translations SET text = ?, updated_at = ? WHERE id = ?
         RETURNING id, owner_type, owner_id, field, lang, text, created_at, updated_at",
    )
    .bind(text)
    .bind(Utc::now())
    .bind(id)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

pub async fn delete_for_owner(conn: &mut SqliteConnection, owner: &Owner) -> Result<u64> {
    let result = sqlx::query("DELETE FROM translations WHERE owner_type = ? AND owner_id = ?")
        .bind(&owner.owner_type)
        .bind(owner.owner_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

/// Gateway to the `translations` table.
#[derive(Clone, Debug)]
pub struct TranslationStore {
    db: Arc<Db>,
}

impl TranslationStore {
    pub fn new(db: Arc<Db>) -> Self {
        TranslationStore { db }
    }

    pub fn db(&self) -> &Arc<Db> {
        &self.db
    }

    /// Create the `translations` table and its unique index if needed.
    pub async fn migrate(&self) -> Result<()> {
        Translation::migrate(self.db.clone()).await?;
        Ok(())
    }

    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(self.db.begin().await?)
    }

    pub async fn create(
        &self,
        owner: &Owner,
        field: &str,
        lang: &Locale,
        text: &str,
    ) -> Result<Translation> {
        let mut conn = self.db.pool().acquire().await?;
        insert(&mut conn, owner, field, lang, text).await
    }

    pub async fn find_one(
        &self,
        owner: &Owner,
        field: &str,
        lang: &Locale,
    ) -> Result<Option<Translation>> {
        let mut conn = self.db.pool().acquire().await?;
        select_one(&mut conn, owner, field, lang).await
    }

    /// Every row of `owner` in one locale.
    pub async fn find_all(&self, owner: &Owner, lang: &Locale) -> Result<Vec<Translation>> {
        let mut conn = self.db.pool().acquire().await?;
        select_for_locale(&mut conn, owner, lang).await
    }

    /// Every row of `owner`, across all locales.
    pub async fn for_owner(&self, owner: &Owner) -> Result<Vec<Translation>> {
        let mut conn = self.db.pool().acquire().await?;
        select_for_owner(&mut conn, owner).await
    }

    pub async fn exists(&self, filter: &TranslationFilter) -> Result<bool> {
        let mut conn = self.db.pool().acquire().await?;
        select_exists(&mut conn, filter).await
    }

    pub async fn update(&self, record: &Translation, text: &str) -> Result<Translation> {
        let mut conn = self.db.pool().acquire().await?;
        update_text(&mut conn, record.id, text).await
    }

    pub async fn upsert(
        &self,
        owner: &Owner,
        field: &str,
        lang: &Locale,
        text: &str,
    ) -> Result<Translation> {
        let mut conn = self.db.pool().acquire().await?;
        upsert(&mut conn, owner, field, lang, text).await
    }

    pub async fn delete_for_owner(&self, owner: &Owner) -> Result<u64> {
        let mut conn = self.db.pool().acquire().await?;
        delete_for_owner(&mut conn, owner).await
    }
}
