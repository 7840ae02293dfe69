use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use tempo_session::SessionStore;
use tempo_types::{Phase, Session, SessionConfig, SessionState, UserKey};
use tracing::{debug, info};

use crate::{Result, StoreError};

/// Current schema version, tracked in `PRAGMA user_version`.
const SCHEMA_VERSION: i32 = 1;

const SELECT_COLUMNS: &str = "user_key, pomodoro_minutes, short_break_minutes, long_break_minutes,
     auto_transition, phase, remaining_seconds, running, completed_in_cycle, total_completed";

/// Thin repository over SQLite for timer sessions.
///
/// Cheap to clone; clones share one connection behind a mutex. The async
/// [`SessionStore`] methods run the blocking SQLite calls on tokio's
/// blocking pool.
#[derive(Clone)]
pub struct SqliteSessionStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSessionStore {
    /// Open (or create) the database at `path` and bring the schema up to date.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.create_schema()?;
        info!(path = %path.display(), "Session store opened");
        Ok(store)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.create_schema()?;
        Ok(store)
    }

    fn create_schema(&self) -> Result<()> {
        let conn = self.conn.lock();
        let current_version: i32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap_or(0);

        if current_version >= SCHEMA_VERSION {
            debug!("Schema up to date (version {})", current_version);
            return Ok(());
        }

        conn.execute_batch(
            r#"
            -- One timer session per user
            CREATE TABLE IF NOT EXISTS timer_sessions (
                user_key INTEGER PRIMARY KEY,
                pomodoro_minutes INTEGER NOT NULL DEFAULT 25,
                short_break_minutes INTEGER NOT NULL DEFAULT 5,
                long_break_minutes INTEGER NOT NULL DEFAULT 15,
                auto_transition INTEGER NOT NULL DEFAULT 0,
                phase TEXT NOT NULL DEFAULT 'pomodoro',
                remaining_seconds INTEGER NOT NULL DEFAULT 0,
                running INTEGER NOT NULL DEFAULT 0,
                completed_in_cycle INTEGER NOT NULL DEFAULT 0,
                total_completed INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- Startup recovery scans for running timers
            CREATE INDEX IF NOT EXISTS idx_timer_sessions_running
                ON timer_sessions(running);
            "#,
        )?;

        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        info!("Schema created (version {})", SCHEMA_VERSION);
        Ok(())
    }

    // ── Blocking operations ─────────────────────────────────────────

    pub fn load_blocking(&self, user: UserKey) -> Result<Option<Session>> {
        let key = to_sql_key(user)?;
        let raw = self
            .conn
            .lock()
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM timer_sessions WHERE user_key = ?1"),
                params![key],
                RawSession::from_row,
            )
            .optional()?;
        raw.map(RawSession::into_session).transpose()
    }

    pub fn insert_blocking(&self, session: &Session) -> Result<()> {
        let key = to_sql_key(session.user_key)?;
        let now = Utc::now().to_rfc3339();
        let (config, state) = (&session.config, &session.state);

        let result = self.conn.lock().execute(
            "INSERT INTO timer_sessions (user_key, pomodoro_minutes, short_break_minutes,
                 long_break_minutes, auto_transition, phase, remaining_seconds, running,
                 completed_in_cycle, total_completed, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
            params![
                key,
                config.pomodoro_minutes,
                config.short_break_minutes,
                config.long_break_minutes,
                config.auto_transition,
                state.phase.as_str(),
                state.remaining_seconds,
                state.running,
                state.completed_in_cycle,
                state.total_completed,
                now,
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::AlreadyExists(session.user_key))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn save_blocking(&self, session: &Session) -> Result<()> {
        let key = to_sql_key(session.user_key)?;
        let now = Utc::now().to_rfc3339();
        let (config, state) = (&session.config, &session.state);

        let changed = self.conn.lock().execute(
            "UPDATE timer_sessions
             SET pomodoro_minutes = ?2,
                 short_break_minutes = ?3,
                 long_break_minutes = ?4,
                 auto_transition = ?5,
                 phase = ?6,
                 remaining_seconds = ?7,
                 running = ?8,
                 completed_in_cycle = ?9,
                 total_completed = ?10,
                 updated_at = ?11
             WHERE user_key = ?1",
            params![
                key,
                config.pomodoro_minutes,
                config.short_break_minutes,
                config.long_break_minutes,
                config.auto_transition,
                state.phase.as_str(),
                state.remaining_seconds,
                state.running,
                state.completed_in_cycle,
                state.total_completed,
                now,
            ],
        )?;

        if changed == 0 {
            return Err(StoreError::NotFound(session.user_key));
        }
        Ok(())
    }

    pub fn list_running_blocking(&self) -> Result<Vec<UserKey>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT user_key FROM timer_sessions WHERE running = 1 ORDER BY user_key",
        )?;
        let keys = stmt.query_map([], |row| row.get::<_, i64>(0))?;

        let mut users = Vec::new();
        for key in keys {
            users.push(from_sql_key(key?)?);
        }
        Ok(users)
    }

    /// Delete a user's row. Returns whether a row existed.
    ///
    /// Account deletion normally cascades outside this crate; this exists for
    /// tooling and tests.
    pub fn delete_blocking(&self, user: UserKey) -> Result<bool> {
        let key = to_sql_key(user)?;
        let changed = self
            .conn
            .lock()
            .execute("DELETE FROM timer_sessions WHERE user_key = ?1", params![key])?;
        Ok(changed > 0)
    }

    async fn blocking<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&SqliteSessionStore) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || task(&store))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn load_by_user(&self, user: UserKey) -> tempo_session::Result<Option<Session>> {
        Ok(self.blocking(move |db| db.load_blocking(user)).await?)
    }

    async fn insert(&self, session: &Session) -> tempo_session::Result<()> {
        let session = session.clone();
        Ok(self.blocking(move |db| db.insert_blocking(&session)).await?)
    }

    async fn save(&self, session: &Session) -> tempo_session::Result<()> {
        let session = session.clone();
        Ok(self.blocking(move |db| db.save_blocking(&session)).await?)
    }

    async fn list_running(&self) -> tempo_session::Result<Vec<UserKey>> {
        Ok(self.blocking(|db| db.list_running_blocking()).await?)
    }
}

/// Column values as stored, before domain validation.
struct RawSession {
    user_key: i64,
    pomodoro_minutes: u32,
    short_break_minutes: u32,
    long_break_minutes: u32,
    auto_transition: bool,
    phase: String,
    remaining_seconds: u32,
    running: bool,
    completed_in_cycle: u32,
    total_completed: u32,
}

impl RawSession {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            user_key: row.get(0)?,
            pomodoro_minutes: row.get(1)?,
            short_break_minutes: row.get(2)?,
            long_break_minutes: row.get(3)?,
            auto_transition: row.get(4)?,
            phase: row.get(5)?,
            remaining_seconds: row.get(6)?,
            running: row.get(7)?,
            completed_in_cycle: row.get(8)?,
            total_completed: row.get(9)?,
        })
    }

    fn into_session(self) -> Result<Session> {
        let corrupt = |reason: String| StoreError::Corrupt {
            user: self.user_key,
            reason,
        };
        let phase: Phase = self.phase.parse().map_err(|e| corrupt(format!("{e}")))?;

        Ok(Session {
            user_key: from_sql_key(self.user_key)?,
            config: SessionConfig {
                pomodoro_minutes: self.pomodoro_minutes,
                short_break_minutes: self.short_break_minutes,
                long_break_minutes: self.long_break_minutes,
                auto_transition: self.auto_transition,
            },
            state: SessionState {
                phase,
                remaining_seconds: self.remaining_seconds,
                running: self.running,
                completed_in_cycle: self.completed_in_cycle,
                total_completed: self.total_completed,
            },
        })
    }
}

fn to_sql_key(user: UserKey) -> Result<i64> {
    i64::try_from(user.0).map_err(|_| StoreError::KeyOutOfRange(user))
}

fn from_sql_key(key: i64) -> Result<UserKey> {
    u64::try_from(key)
        .map(UserKey)
        .map_err(|_| StoreError::Corrupt {
            user: key,
            reason: "negative user key".to_string(),
        })
}
