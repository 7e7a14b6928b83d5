//! Minimal async SQLite plumbing for the translation store (sqlx).
//!
//! Usage:
//! let db = Arc::new(Db::connect("sqlite::memory:").await?);
//! Translation::migrate(db.clone()).await?;
//! db.fetch_all::<(String,)>("SELECT field FROM translations").await?
pub use futures::future::BoxFuture;
use log::{debug, info};
use sha2::{Digest, Sha256};
pub use sqlx::FromRow;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Executor, Sqlite, SqlitePool, Transaction};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use walkdir::WalkDir;

use crate::error::TranslateError;

const LEDGER_SQL: &str = "CREATE TABLE IF NOT EXISTS __migrations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT UNIQUE NOT NULL,
    schema_sql TEXT,
    hash TEXT,
    applied_at DATETIME DEFAULT CURRENT_TIMESTAMP
)";

/// Publishable schema for hosts that manage their own migration directory.
pub const TRANSLATIONS_MIGRATION: &str =
    include_str!("../migrations/create_translations_table.sql");

const TRANSLATIONS_MIGRATION_SUFFIX: &str = "_create_translations_table.sql";

/// An async database pool wrapper.
#[derive(Clone, Debug)]
pub struct Db {
    pool: SqlitePool,
}

/// Migration function pointer for a model, e.g. `Translation::migrate`.
pub type MigrationFn = fn(Arc<Db>) -> BoxFuture<'static, Result<(), sqlx::Error>>;

#[async_trait::async_trait]
pub trait Model: Send + Sync {
    fn table_name() -> &'static str;
    fn create_table_sql() -> String;
    fn columns() -> Vec<(String, String)>;

    /// Index statements, re-applied on every migration. Must be idempotent.
    fn index_sql() -> Vec<String> {
        Vec::new()
    }

    async fn migrate(db: Arc<Db>) -> Result<(), sqlx::Error> {
        let table_name = Self::table_name();
        let create_sql = Self::create_table_sql();
        let schema_hash = hash(&create_sql);

        db.execute(LEDGER_SQL).await?;

        let recorded: Option<(String,)> =
            sqlx::query_as("SELECT hash FROM __migrations WHERE name = ?")
                .bind(table_name)
                .fetch_optional(db.pool())
                .await?;

        match recorded {
            None => {
                db.execute(&create_sql).await?;
                sqlx::query("INSERT INTO __migrations (name, schema_sql, hash) VALUES (?, ?, ?)")
                    .bind(table_name)
                    .bind(&create_sql)
                    .bind(&schema_hash)
                    .execute(db.pool())
                    .await?;
                info!(
                    "Migrated `{}` (table created, initial schema applied).",
                    table_name
                );
            }
            Some((recorded_hash,)) if recorded_hash == schema_hash => {
                info!("No schema changes detected for `{}`.", table_name);
            }
            Some(_) => {
                let existing = db.column_names(table_name).await?;
                let mut added = Vec::new();
                for (name, sqltype) in Self::columns() {
                    if !existing.contains(&name) {
                        db.execute(&format!(
                            "ALTER TABLE {} ADD COLUMN {} {}",
                            table_name, name, sqltype
                        ))
                        .await?;
                        added.push((name, sqltype));
                    }
                }
                for (name, sqltype) in &added {
                    info!("Added column `{}.{}` {}", table_name, name, sqltype);
                }
                sqlx::query(
                    "UPDATE __migrations \
                     SET schema_sql = ?, hash = ?, applied_at = CURRENT_TIMESTAMP \
                     WHERE name = ?",
                )
                .bind(&create_sql)
                .bind(&schema_hash)
                .bind(table_name)
                .execute(db.pool())
                .await?;
            }
        }

        for statement in Self::index_sql() {
            db.execute(&statement).await?;
        }
        Ok(())
    }
}

fn hash(s: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn is_in_memory(uri: &str) -> bool {
    uri.contains(":memory:") || uri.contains("mode=memory")
}

impl Db {
    /// Connect to (or create) a SQLite database at the given URI.
    ///
    /// In-memory databases live as long as their connection, so they are
    /// served by a single connection that is never recycled.
    pub async fn connect(uri: &str) -> Result<Self, sqlx::Error> {
        info!("Connecting to SQLite database at URI: {}", uri);
        let options = SqliteConnectOptions::from_str(uri)?.create_if_missing(true);
        let pool_options = if is_in_memory(uri) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
        };
        let pool = pool_options.connect_with(options).await?;
        info!("Connected to SQLite database: {}", uri);
        Ok(Db { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
        debug!("Beginning transaction");
        self.pool.begin().await
    }

    /// Execute an arbitrary SQL statement, e.g. DDL, INSERT, UPDATE.
    pub async fn execute(&self, sql: &str) -> Result<(), sqlx::Error> {
        debug!("Executing SQL: {}", sql);
        let result = self.pool.execute(sql).await;
        match &result {
            Ok(_) => debug!("SQL executed successfully"),
            Err(e) => log::error!("SQL execution failed: {}", e),
        }
        result.map(|_| ())
    }

    /// Fetch all rows and map to a type implementing `FromRow`.
    pub async fn fetch_all<T: for<'r> FromRow<'r, sqlx::sqlite::SqliteRow> + Send + Unpin>(
        &self,
        sql: &str,
    ) -> Result<Vec<T>, sqlx::Error> {
        debug!("Fetching rows with SQL: {}", sql);
        let result = sqlx::query_as(sql).fetch_all(&self.pool).await;
        match &result {
            Ok(rows) => debug!("Fetched {} rows successfully", rows.len()),
            Err(e) => log::error!("Row fetch failed: {}", e),
        }
        result
    }

    /// Column names of a live table, empty when the table does not exist.
    pub async fn column_names(&self, table: &str) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT name FROM pragma_table_info(?)")
            .bind(table)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }
}

/// Run model migrations in order, stopping at the first failure.
pub async fn migrate_all(db: Arc<Db>, migrations: &[MigrationFn]) -> Result<(), sqlx::Error> {
    info!("Starting migration of {} models...", migrations.len());
    for migrate in migrations {
        if let Err(e) = migrate(db.clone()).await {
            log::error!("Migration failed for a model: {}", e);
            return Err(e);
        }
    }
    info!("Migration completed for {} models.", migrations.len());
    Ok(())
}

/// `*.sql` files directly inside `dir`, sorted by filename.
/// A missing or unreadable `dir` is an error, not an empty list.
fn migration_files(dir: &Path) -> Result<Vec<PathBuf>, TranslateError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).max_depth(1) {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.depth() == 0 || !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension().map(|e| e == "sql").unwrap_or(false) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Applies file-based migrations located in `migrations_dir`.
/// Files already recorded in the migration ledger are skipped.
/// Returns how many files were applied.
pub async fn apply_migration_files(
    db: Arc<Db>,
    migrations_dir: impl AsRef<Path>,
) -> Result<usize, TranslateError> {
    db.execute(LEDGER_SQL).await?;

    let mut applied_count = 0;
    for path in migration_files(migrations_dir.as_ref())? {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let applied: Option<(i64,)> = sqlx::query_as("SELECT id FROM __migrations WHERE name = ?")
            .bind(&filename)
            .fetch_optional(db.pool())
            .await?;
        if applied.is_some() {
            info!("Migration `{}` already applied.", filename);
            continue;
        }

        let sql = fs::read_to_string(&path)?;
        info!("Applying migration file: {}", filename);
        let mut tx = db.begin().await?;
        (&mut *tx).execute(sql.as_str()).await?;
        sqlx::query("INSERT INTO __migrations (name, schema_sql, hash) VALUES (?, ?, ?)")
            .bind(&filename)
            .bind(&sql)
            .bind(hash(&sql))
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        info!("Migration `{}` applied.", filename);
        applied_count += 1;
    }

    Ok(applied_count)
}

/// Copy the translations table migration into `dir`, timestamped, unless one
/// was published there before. Returns the path of the migration file.
pub fn publish_migration(dir: impl AsRef<Path>) -> Result<PathBuf, TranslateError> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let published = migration_files(dir)?.into_iter().find(|path| {
        path.file_name()
            .map(|name| name.to_string_lossy().ends_with(TRANSLATIONS_MIGRATION_SUFFIX))
            .unwrap_or(false)
    });
    if let Some(existing) = published {
        info!("Migration already published at {}", existing.display());
        return Ok(existing);
    }

    let timestamp = chrono::Utc::now().format("%Y_%m_%d_%H%M%S");
    let path = dir.join(format!("{}{}", timestamp, TRANSLATIONS_MIGRATION_SUFFIX));
    fs::write(&path, TRANSLATIONS_MIGRATION)?;
    info!("Published translations migration to {}", path.display());
    Ok(path)
}
