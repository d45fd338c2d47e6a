// ABOUTME: Persistent session bindings for chat conversations using SQLite.
// ABOUTME: Maps conversation keys to agent session ids and keeps a per-peer catalog.

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// A session known for a peer scope, as shown by `/sessions`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionRecord {
    pub session_id: String,
    pub title: String,
    pub created_at: String,
}

#[derive(Clone)]
pub struct SessionStore {
    db: Arc<Mutex<Connection>>,
    data_path: PathBuf,
}

impl SessionStore {
    pub fn new<P: AsRef<Path>>(data_path: P) -> Result<Self> {
        let data_path = data_path.as_ref().to_path_buf();

        std::fs::create_dir_all(&data_path).context("Failed to create data directory")?;

        let db_path = data_path.join("sessions.db");
        let conn = Connection::open(&db_path).context("Failed to open SQLite database")?;

        // Conversation key -> bound agent session
        conn.execute(
            "CREATE TABLE IF NOT EXISTS bindings (
                conversation_key TEXT PRIMARY KEY,
                session_id TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;

        // Catalog of sessions created or adopted per peer scope
        conn.execute(
            "CREATE TABLE IF NOT EXISTS sessions (
                peer_key TEXT NOT NULL,
                session_id TEXT NOT NULL,
                title TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (peer_key, session_id)
            )",
            [],
        )?;

        tracing::info!(
            data = %data_path.display(),
            db = %db_path.display(),
            "SessionStore initialized"
        );

        Ok(SessionStore {
            db: Arc::new(Mutex::new(conn)),
            data_path,
        })
    }

    /// Open an in-memory store, for tests
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS bindings (
                conversation_key TEXT PRIMARY KEY,
                session_id TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS sessions (
                peer_key TEXT NOT NULL,
                session_id TEXT NOT NULL,
                title TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (peer_key, session_id)
            )",
            [],
        )?;
        Ok(SessionStore {
            db: Arc::new(Mutex::new(conn)),
            data_path: PathBuf::new(),
        })
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    /// Session id bound to a conversation key, if any
    pub fn binding(&self, conversation_key: &str) -> Result<Option<String>> {
        let db = self
            .db
            .lock()
            .map_err(|e| anyhow::anyhow!("Database mutex poisoned: {}", e))?;
        let mut stmt =
            db.prepare("SELECT session_id FROM bindings WHERE conversation_key = ?1")?;
        let session = stmt.query_row(params![conversation_key], |row| row.get::<_, String>(0));

        match session {
            Ok(id) => Ok(Some(id)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Point a conversation key at a session, replacing any prior binding
    pub fn bind(&self, conversation_key: &str, session_id: &str) -> Result<()> {
        let db = self
            .db
            .lock()
            .map_err(|e| anyhow::anyhow!("Database mutex poisoned: {}", e))?;
        db.execute(
            "INSERT INTO bindings (conversation_key, session_id, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(conversation_key) DO UPDATE SET
                 session_id = excluded.session_id,
                 updated_at = excluded.updated_at",
            params![
                conversation_key,
                session_id,
                chrono::Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    /// Record a session into a peer's catalog. Re-recording an existing
    /// (peer, session) pair keeps the original title and timestamp.
    pub fn record_session(&self, peer_key: &str, session_id: &str, title: &str) -> Result<()> {
        let db = self
            .db
            .lock()
            .map_err(|e| anyhow::anyhow!("Database mutex poisoned: {}", e))?;
        db.execute(
            "INSERT OR IGNORE INTO sessions (peer_key, session_id, title, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                peer_key,
                session_id,
                title,
                chrono::Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    /// All sessions recorded for a peer scope, oldest first
    pub fn sessions_for(&self, peer_key: &str) -> Result<Vec<SessionRecord>> {
        let db = self
            .db
            .lock()
            .map_err(|e| anyhow::anyhow!("Database mutex poisoned: {}", e))?;
        let mut stmt = db.prepare(
            "SELECT session_id, title, created_at FROM sessions
             WHERE peer_key = ?1 ORDER BY created_at, session_id",
        )?;
        let rows = stmt.query_map(params![peer_key], |row| {
            Ok(SessionRecord {
                session_id: row.get(0)?,
                title: row.get(1)?,
                created_at: row.get(2)?,
            })
        })?;

        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row?);
        }
        Ok(sessions)
    }
}
