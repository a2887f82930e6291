//! SQLite-backed store
//!
//! Reference implementation of the persistence contract on rusqlite with an
//! r2d2 connection pool. Timestamps are stored as RFC 3339 `TEXT`, the user
//! `store` bag and the open `data` payloads as JSON `TEXT`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use serde_json::Value;

use super::records::{BotInstance, BotTemplate, BotUser, StoreBag, UserKey, UserPatch};
use super::store::{InstanceStore, StoreResult, TemplateStore, UserStore};

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Create a new database connection pool
///
/// Initializes a pool with up to 10 connections and ensures the schema
/// exists. Migration is idempotent; running it on every startup is safe.
pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path);
    let pool = Pool::builder()
        .max_size(10) // Maximum 10 connections in the pool
        .build(manager)?;

    // Ensure schema is up to date on first connection
    let conn = pool.get()?;
    if let Err(e) = migrate_schema(&conn) {
        log::warn!("Failed to migrate schema: {}", e);
    }

    Ok(pool)
}

/// Ensure all engine tables exist
fn migrate_schema(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS bot_template (
            id        INTEGER PRIMARY KEY CHECK (id = 1),
            data      TEXT NOT NULL DEFAULT '{}',
            update_dt TEXT NOT NULL,
            create_dt TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS bot_instances (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            token     TEXT NOT NULL,
            data      TEXT NOT NULL DEFAULT '{}',
            update_dt TEXT NOT NULL,
            create_dt TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS bot_users (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            instance_id INTEGER,
            chat_id     INTEGER NOT NULL,
            user_id     INTEGER NOT NULL,
            first_name  TEXT NOT NULL,
            last_name   TEXT,
            username    TEXT,
            state       TEXT NOT NULL DEFAULT '',
            store       TEXT NOT NULL DEFAULT '{}',
            blocked     INTEGER NOT NULL DEFAULT 0,
            update_dt   TEXT NOT NULL,
            create_dt   TEXT NOT NULL
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_bot_users_identity
            ON bot_users (COALESCE(instance_id, 0), chat_id, user_id);",
    )
}

/// Raw row fetched from the bot_users table before JSON/timestamp decoding.
struct UserRow {
    id: i64,
    instance_id: Option<i64>,
    chat_id: i64,
    user_id: i64,
    first_name: String,
    last_name: Option<String>,
    username: Option<String>,
    state: String,
    store: String,
    blocked: i64,
    update_dt: String,
    create_dt: String,
}

impl UserRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            instance_id: row.get(1)?,
            chat_id: row.get(2)?,
            user_id: row.get(3)?,
            first_name: row.get(4)?,
            last_name: row.get(5)?,
            username: row.get(6)?,
            state: row.get(7)?,
            store: row.get(8)?,
            blocked: row.get(9)?,
            update_dt: row.get(10)?,
            create_dt: row.get(11)?,
        })
    }

    fn into_user(self) -> StoreResult<BotUser> {
        Ok(BotUser {
            id: self.id,
            instance_id: self.instance_id,
            chat_id: self.chat_id,
            user_id: self.user_id as u64,
            first_name: self.first_name,
            last_name: self.last_name,
            username: self.username,
            state: self.state,
            store: serde_json::from_str::<StoreBag>(&self.store)?,
            blocked: self.blocked != 0,
            update_dt: parse_dt(&self.update_dt)?,
            create_dt: parse_dt(&self.create_dt)?,
        })
    }
}

fn parse_dt(s: &str) -> StoreResult<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}

const USER_COLUMNS: &str = "id, instance_id, chat_id, user_id, first_name, last_name, username, \
                            state, store, blocked, update_dt, create_dt";

/// SQLite implementation of all three store traits.
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Open (or create) the database at `path` and wrap it in a store.
    pub fn open(path: &str) -> Result<Self, r2d2::Error> {
        Ok(Self::new(create_pool(path)?))
    }

    fn conn(&self) -> StoreResult<DbConnection> {
        Ok(self.pool.get()?)
    }

    /// Seed the singleton template row. Replaces any existing one.
    pub fn put_template(&self, data: Value) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn()?.execute(
            "INSERT INTO bot_template (id, data, update_dt, create_dt) VALUES (1, ?1, ?2, ?2)
             ON CONFLICT(id) DO UPDATE SET data = ?1, update_dt = ?2",
            params![serde_json::to_string(&data)?, now],
        )?;
        Ok(())
    }

    /// Register a bot instance, returning its assigned id.
    pub fn add_instance(&self, token: &str, data: Value) -> StoreResult<i64> {
        let conn = self.conn()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO bot_instances (token, data, update_dt, create_dt) VALUES (?1, ?2, ?3, ?3)",
            params![token, serde_json::to_string(&data)?, now],
        )?;
        Ok(conn.last_insert_rowid())
    }
}

#[async_trait]
impl TemplateStore for SqliteStore {
    async fn find_singleton(&self) -> StoreResult<Option<BotTemplate>> {
        let conn = self.conn()?;
        let row: Option<(String, String, String)> = conn
            .query_row(
                "SELECT data, update_dt, create_dt FROM bot_template WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        match row {
            Some((data, update_dt, create_dt)) => Ok(Some(BotTemplate {
                data: serde_json::from_str(&data)?,
                update_dt: parse_dt(&update_dt)?,
                create_dt: parse_dt(&create_dt)?,
            })),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl InstanceStore for SqliteStore {
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<BotInstance>> {
        let conn = self.conn()?;
        let row: Option<(String, String, String, String)> = conn
            .query_row(
                "SELECT token, data, update_dt, create_dt FROM bot_instances WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        match row {
            Some((token, data, update_dt, create_dt)) => Ok(Some(BotInstance {
                id,
                token,
                data: serde_json::from_str(&data)?,
                update_dt: parse_dt(&update_dt)?,
                create_dt: parse_dt(&create_dt)?,
            })),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl UserStore for SqliteStore {
    async fn find_by_key(&self, key: &UserKey) -> StoreResult<Option<BotUser>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM bot_users
             WHERE COALESCE(instance_id, 0) = ?1 AND chat_id = ?2 AND user_id = ?3"
        );
        let row = conn
            .query_row(
                &sql,
                params![key.instance_id.unwrap_or(0), key.chat_id, key.user_id as i64],
                UserRow::from_row,
            )
            .optional()?;

        row.map(UserRow::into_user).transpose()
    }

    async fn insert(&self, user: BotUser) -> StoreResult<BotUser> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO bot_users (instance_id, chat_id, user_id, first_name, last_name, \
             username, state, store, blocked, update_dt, create_dt)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                user.instance_id,
                user.chat_id,
                user.user_id as i64,
                user.first_name,
                user.last_name,
                user.username,
                user.state,
                serde_json::to_string(&user.store)?,
                user.blocked as i64,
                user.update_dt.to_rfc3339(),
                user.create_dt.to_rfc3339(),
            ],
        )?;
        let id = conn.last_insert_rowid();
        Ok(BotUser { id, ..user })
    }

    async fn update(&self, id: i64, patch: UserPatch) -> StoreResult<()> {
        self.conn()?.execute(
            "UPDATE bot_users SET state = ?1, store = ?2, update_dt = ?3 WHERE id = ?4",
            params![
                patch.state,
                serde_json::to_string(&patch.store)?,
                patch.update_dt.to_rfc3339(),
                id,
            ],
        )?;
        Ok(())
    }
}
