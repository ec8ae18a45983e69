use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AccountError;
use crate::users::repo_types::{ProfileUpdate, User};

const DB_FILE: &str = "users.db";

const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id BLOB PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    first_name TEXT,
    last_name TEXT,
    phone TEXT,
    membership_level TEXT NOT NULL DEFAULT 'bronze',
    points INTEGER NOT NULL DEFAULT 0 CHECK (points >= 0),
    created_at TEXT NOT NULL
)
"#;

/// Columns the first schema generation did not have, each with the ALTER
/// that backfills existing rows with the documented default.
const SCHEMA_UPGRADES: &[(&str, &str)] = &[
    ("first_name", "ALTER TABLE users ADD COLUMN first_name TEXT"),
    ("last_name", "ALTER TABLE users ADD COLUMN last_name TEXT"),
    ("phone", "ALTER TABLE users ADD COLUMN phone TEXT"),
    (
        "membership_level",
        "ALTER TABLE users ADD COLUMN membership_level TEXT NOT NULL DEFAULT 'bronze'",
    ),
    (
        "points",
        "ALTER TABLE users ADD COLUMN points INTEGER NOT NULL DEFAULT 0",
    ),
];

/// Columns every on-disk generation must carry; a users table without them
/// is treated as corrupt.
const CORE_COLUMNS: &[&str] = &["id", "email", "password_hash", "created_at"];

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, phone, \
                            membership_level, points, created_at";

/// Owns the on-disk user set. Cheap to clone; all clones share one pool.
#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

impl UserStore {
    /// Open (or create) the store under `data_dir` and bring the schema up
    /// to date. Every commit is synchronous, so a mutation that returned Ok
    /// is on disk.
    pub async fn open(data_dir: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let options = SqliteConnectOptions::new()
            .filename(data_dir.join(DB_FILE))
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Full)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn migrate(&self) -> anyhow::Result<()> {
        if let Err(e) = self.upgrade_schema().await {
            warn!(error = %e, "users schema migration failed; degrading to a fresh empty schema");
            sqlx::query("DROP TABLE IF EXISTS users")
                .execute(&self.pool)
                .await?;
            sqlx::query(CREATE_USERS_TABLE).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn upgrade_schema(&self) -> anyhow::Result<()> {
        sqlx::query(CREATE_USERS_TABLE).execute(&self.pool).await?;
        let columns: Vec<String> = sqlx::query_scalar("SELECT name FROM pragma_table_info('users')")
            .fetch_all(&self.pool)
            .await?;
        for required in CORE_COLUMNS {
            if !columns.iter().any(|c| c == required) {
                anyhow::bail!("users table is missing core column {required}");
            }
        }
        for (column, alter) in SCHEMA_UPGRADES {
            if !columns.iter().any(|c| c == column) {
                info!(column = %column, "adding missing users column");
                sqlx::query(alter).execute(&self.pool).await?;
            }
        }
        Ok(())
    }

    /// Insert a new user with defaults for everything but the credentials.
    /// The UNIQUE constraint on email decides races between concurrent
    /// registrations; exactly one caller wins.
    pub async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<User, AccountError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, email, password_hash, created_at) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(password_hash)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => AccountError::DuplicateEmail,
            _ => AccountError::Storage(e),
        })?;
        Ok(user)
    }

    /// Find a user by email. Exact match, case-sensitive.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AccountError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AccountError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// Sparse update: a None bind leaves the stored column untouched via
    /// COALESCE. Returns None when the id does not exist.
    pub async fn update_profile(
        &self,
        id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, AccountError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET \
                 first_name = COALESCE($1, first_name), \
                 last_name = COALESCE($2, last_name), \
                 phone = COALESCE($3, phone), \
                 membership_level = COALESCE($4, membership_level), \
                 points = COALESCE($5, points) \
             WHERE id = $6 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(update.first_name.as_deref())
        .bind(update.last_name.as_deref())
        .bind(update.phone.as_deref())
        .bind(update.membership_level)
        .bind(update.points)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }
}
