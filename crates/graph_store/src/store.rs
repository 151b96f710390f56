//! SQLite-backed graph store
//!
//! Three tables: sessions, branches, messages. Message ids are AUTOINCREMENT
//! rowids, so they are strictly increasing and never reused; replay
//! algorithms order by id, not by timestamp.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use chat_core::{Branch, Message, MessageDraft, MessageKind, Session};

use crate::error::{Result, StoreError};

/// CRUD primitives of the conversation graph. Multi-row writes commit in a
/// single transaction; a message insert and its predecessor's
/// `chosen_next_id` rewrite are never observable independently.
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn init(&self) -> Result<()>;

    /// Insert a session together with its root branch.
    async fn create_session(&self, session: Session, root: Branch) -> Result<()>;

    async fn get_session(&self, session_id: Uuid) -> Result<Session>;

    /// Sessions ordered by most recent activity.
    async fn list_sessions(&self) -> Result<Vec<Session>>;

    async fn set_primary_branch(
        &self,
        session_id: Uuid,
        branch_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<()>;

    async fn set_session_title(&self, session_id: Uuid, title: String) -> Result<()>;

    async fn touch_session(&self, session_id: Uuid, at: DateTime<Utc>) -> Result<()>;

    async fn insert_branch(&self, branch: Branch) -> Result<()>;

    async fn get_branch(&self, branch_id: Uuid) -> Result<Branch>;

    /// Insert one message, rewrite the predecessor's `chosen_next_id`, and
    /// touch the session's activity timestamp, all in one transaction.
    /// Returns the persisted message with its assigned id.
    async fn append_message(
        &self,
        session_id: Uuid,
        branch_id: Uuid,
        parent_message_id: Option<i64>,
        draft: MessageDraft,
        at: DateTime<Utc>,
    ) -> Result<Message>;

    async fn get_message(&self, message_id: i64) -> Result<Message>;

    /// Highest message id in a branch, if the branch has any own messages.
    async fn last_message_id_in_branch(&self, branch_id: Uuid) -> Result<Option<i64>>;

    /// A branch's own messages in ascending id order, optionally bounded by
    /// an inclusive upper id.
    async fn messages_in_branch(&self, branch_id: Uuid, upto: Option<i64>)
        -> Result<Vec<Message>>;
}

#[derive(Debug, Clone)]
pub struct SqliteGraphStore {
    db_path: PathBuf,
}

impl SqliteGraphStore {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    async fn with_connection<T, F>(&self, func: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = open_connection(&db_path)?;
            func(&mut connection)
        })
        .await
        .map_err(|error| StoreError::Task(error.to_string()))?
    }
}

#[async_trait]
impl GraphStore for SqliteGraphStore {
    async fn init(&self) -> Result<()> {
        self.with_connection(|connection| {
            connection.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS sessions (
                    session_id TEXT PRIMARY KEY,
                    workspace TEXT,
                    title TEXT,
                    system_prompt TEXT NOT NULL DEFAULT '',
                    model TEXT NOT NULL,
                    primary_branch_id TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS branches (
                    branch_id TEXT PRIMARY KEY,
                    session_id TEXT NOT NULL,
                    parent_branch_id TEXT,
                    branch_from_message_id INTEGER,
                    created_at TEXT NOT NULL,
                    FOREIGN KEY(session_id) REFERENCES sessions(session_id) ON DELETE CASCADE
                );

                CREATE TABLE IF NOT EXISTS messages (
                    message_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    session_id TEXT NOT NULL,
                    branch_id TEXT NOT NULL,
                    parent_message_id INTEGER,
                    chosen_next_id INTEGER,
                    kind TEXT NOT NULL,
                    content TEXT NOT NULL DEFAULT '',
                    payload TEXT,
                    thought_signature TEXT,
                    created_at TEXT NOT NULL,
                    FOREIGN KEY(session_id) REFERENCES sessions(session_id) ON DELETE CASCADE,
                    FOREIGN KEY(branch_id) REFERENCES branches(branch_id) ON DELETE CASCADE
                );

                CREATE INDEX IF NOT EXISTS idx_branches_session ON branches(session_id);
                CREATE INDEX IF NOT EXISTS idx_messages_branch ON messages(branch_id);
                CREATE INDEX IF NOT EXISTS idx_messages_session ON messages(session_id);
                "#,
            )?;
            Ok(())
        })
        .await
    }

    async fn create_session(&self, session: Session, root: Branch) -> Result<()> {
        self.with_connection(move |connection| {
            let tx = connection.transaction()?;
            tx.execute(
                r#"
                INSERT INTO sessions (
                    session_id, workspace, title, system_prompt, model,
                    primary_branch_id, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    session.session_id.to_string(),
                    session.workspace,
                    session.title,
                    session.system_prompt,
                    session.model,
                    session.primary_branch_id.to_string(),
                    format_timestamp(session.created_at),
                    format_timestamp(session.updated_at),
                ],
            )?;
            insert_branch_row(&tx, &root)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn get_session(&self, session_id: Uuid) -> Result<Session> {
        self.with_connection(move |connection| {
            let raw = connection
                .query_row(
                    r#"
                    SELECT session_id, workspace, title, system_prompt, model,
                           primary_branch_id, created_at, updated_at
                    FROM sessions WHERE session_id = ?1
                    "#,
                    params![session_id.to_string()],
                    raw_session_from_row,
                )
                .optional()?;
            raw.map(session_from_raw)
                .transpose()?
                .ok_or(StoreError::SessionNotFound(session_id))
        })
        .await
    }

    async fn list_sessions(&self) -> Result<Vec<Session>> {
        self.with_connection(|connection| {
            let mut statement = connection.prepare(
                r#"
                SELECT session_id, workspace, title, system_prompt, model,
                       primary_branch_id, created_at, updated_at
                FROM sessions ORDER BY updated_at DESC
                "#,
            )?;
            let rows = statement.query_map([], raw_session_from_row)?;
            let mut sessions = Vec::new();
            for raw in rows {
                sessions.push(session_from_raw(raw?)?);
            }
            Ok(sessions)
        })
        .await
    }

    async fn set_primary_branch(
        &self,
        session_id: Uuid,
        branch_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.with_connection(move |connection| {
            let updated = connection.execute(
                "UPDATE sessions SET primary_branch_id = ?1, updated_at = ?2 WHERE session_id = ?3",
                params![
                    branch_id.to_string(),
                    format_timestamp(at),
                    session_id.to_string()
                ],
            )?;
            if updated == 0 {
                return Err(StoreError::SessionNotFound(session_id));
            }
            Ok(())
        })
        .await
    }

    async fn set_session_title(&self, session_id: Uuid, title: String) -> Result<()> {
        self.with_connection(move |connection| {
            let updated = connection.execute(
                "UPDATE sessions SET title = ?1 WHERE session_id = ?2",
                params![title, session_id.to_string()],
            )?;
            if updated == 0 {
                return Err(StoreError::SessionNotFound(session_id));
            }
            Ok(())
        })
        .await
    }

    async fn touch_session(&self, session_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        self.with_connection(move |connection| {
            let updated = connection.execute(
                "UPDATE sessions SET updated_at = ?1 WHERE session_id = ?2",
                params![format_timestamp(at), session_id.to_string()],
            )?;
            if updated == 0 {
                return Err(StoreError::SessionNotFound(session_id));
            }
            Ok(())
        })
        .await
    }

    async fn insert_branch(&self, branch: Branch) -> Result<()> {
        self.with_connection(move |connection| {
            let tx = connection.transaction()?;
            insert_branch_row(&tx, &branch)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn get_branch(&self, branch_id: Uuid) -> Result<Branch> {
        self.with_connection(move |connection| {
            let raw = connection
                .query_row(
                    r#"
                    SELECT branch_id, session_id, parent_branch_id,
                           branch_from_message_id, created_at
                    FROM branches WHERE branch_id = ?1
                    "#,
                    params![branch_id.to_string()],
                    raw_branch_from_row,
                )
                .optional()?;
            raw.map(branch_from_raw)
                .transpose()?
                .ok_or(StoreError::BranchNotFound(branch_id))
        })
        .await
    }

    async fn append_message(
        &self,
        session_id: Uuid,
        branch_id: Uuid,
        parent_message_id: Option<i64>,
        draft: MessageDraft,
        at: DateTime<Utc>,
    ) -> Result<Message> {
        self.with_connection(move |connection| {
            let payload_json = draft
                .payload
                .as_ref()
                .map(|value| serde_json::to_string(value))
                .transpose()
                .map_err(|e| StoreError::InvalidData(e.to_string()))?;

            let tx = connection.transaction()?;
            tx.execute(
                r#"
                INSERT INTO messages (
                    session_id, branch_id, parent_message_id, kind, content,
                    payload, thought_signature, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    session_id.to_string(),
                    branch_id.to_string(),
                    parent_message_id,
                    draft.kind.as_str(),
                    draft.content,
                    payload_json,
                    draft.thought_signature,
                    format_timestamp(at),
                ],
            )?;
            let message_id = tx.last_insert_rowid();

            if let Some(parent_id) = parent_message_id {
                let updated = tx.execute(
                    "UPDATE messages SET chosen_next_id = ?1 WHERE message_id = ?2",
                    params![message_id, parent_id],
                )?;
                if updated == 0 {
                    return Err(StoreError::MessageNotFound(parent_id));
                }
            }

            let touched = tx.execute(
                "UPDATE sessions SET updated_at = ?1 WHERE session_id = ?2",
                params![format_timestamp(at), session_id.to_string()],
            )?;
            if touched == 0 {
                return Err(StoreError::SessionNotFound(session_id));
            }

            tx.commit()?;

            Ok(Message {
                message_id,
                session_id,
                branch_id,
                parent_message_id,
                chosen_next_id: None,
                kind: draft.kind,
                content: draft.content,
                payload: draft.payload,
                thought_signature: draft.thought_signature,
                created_at: at,
            })
        })
        .await
    }

    async fn get_message(&self, message_id: i64) -> Result<Message> {
        self.with_connection(move |connection| {
            let raw = connection
                .query_row(
                    &format!("{} WHERE message_id = ?1", SELECT_MESSAGE),
                    params![message_id],
                    raw_message_from_row,
                )
                .optional()?;
            raw.map(message_from_raw)
                .transpose()?
                .ok_or(StoreError::MessageNotFound(message_id))
        })
        .await
    }

    async fn last_message_id_in_branch(&self, branch_id: Uuid) -> Result<Option<i64>> {
        self.with_connection(move |connection| {
            let last = connection.query_row(
                "SELECT MAX(message_id) FROM messages WHERE branch_id = ?1",
                params![branch_id.to_string()],
                |row| row.get::<_, Option<i64>>(0),
            )?;
            Ok(last)
        })
        .await
    }

    async fn messages_in_branch(
        &self,
        branch_id: Uuid,
        upto: Option<i64>,
    ) -> Result<Vec<Message>> {
        self.with_connection(move |connection| {
            let mut statement = connection.prepare(&format!(
                "{} WHERE branch_id = ?1 AND (?2 IS NULL OR message_id <= ?2) \
                 ORDER BY message_id ASC",
                SELECT_MESSAGE
            ))?;
            let rows = statement.query_map(params![branch_id.to_string(), upto], raw_message_from_row)?;
            let mut messages = Vec::new();
            for raw in rows {
                messages.push(message_from_raw(raw?)?);
            }
            Ok(messages)
        })
        .await
    }
}

const SELECT_MESSAGE: &str = r#"
    SELECT message_id, session_id, branch_id, parent_message_id,
           chosen_next_id, kind, content, payload, thought_signature,
           created_at
    FROM messages
"#;

fn insert_branch_row(connection: &Connection, branch: &Branch) -> Result<()> {
    connection.execute(
        r#"
        INSERT INTO branches (
            branch_id, session_id, parent_branch_id, branch_from_message_id,
            created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
        params![
            branch.branch_id.to_string(),
            branch.session_id.to_string(),
            branch.parent_branch_id.map(|id| id.to_string()),
            branch.branch_from_message_id,
            format_timestamp(branch.created_at),
        ],
    )?;
    Ok(())
}

struct RawSession {
    session_id: String,
    workspace: Option<String>,
    title: Option<String>,
    system_prompt: String,
    model: String,
    primary_branch_id: String,
    created_at: String,
    updated_at: String,
}

fn raw_session_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawSession> {
    Ok(RawSession {
        session_id: row.get(0)?,
        workspace: row.get(1)?,
        title: row.get(2)?,
        system_prompt: row.get(3)?,
        model: row.get(4)?,
        primary_branch_id: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn session_from_raw(raw: RawSession) -> Result<Session> {
    Ok(Session {
        session_id: parse_uuid(&raw.session_id)?,
        workspace: raw.workspace,
        title: raw.title,
        system_prompt: raw.system_prompt,
        model: raw.model,
        primary_branch_id: parse_uuid(&raw.primary_branch_id)?,
        created_at: parse_timestamp(&raw.created_at)?,
        updated_at: parse_timestamp(&raw.updated_at)?,
    })
}

struct RawBranch {
    branch_id: String,
    session_id: String,
    parent_branch_id: Option<String>,
    branch_from_message_id: Option<i64>,
    created_at: String,
}

fn raw_branch_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawBranch> {
    Ok(RawBranch {
        branch_id: row.get(0)?,
        session_id: row.get(1)?,
        parent_branch_id: row.get(2)?,
        branch_from_message_id: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn branch_from_raw(raw: RawBranch) -> Result<Branch> {
    Ok(Branch {
        branch_id: parse_uuid(&raw.branch_id)?,
        session_id: parse_uuid(&raw.session_id)?,
        parent_branch_id: raw.parent_branch_id.as_deref().map(parse_uuid).transpose()?,
        branch_from_message_id: raw.branch_from_message_id,
        created_at: parse_timestamp(&raw.created_at)?,
    })
}

struct RawMessage {
    message_id: i64,
    session_id: String,
    branch_id: String,
    parent_message_id: Option<i64>,
    chosen_next_id: Option<i64>,
    kind: String,
    content: String,
    payload: Option<String>,
    thought_signature: Option<String>,
    created_at: String,
}

fn raw_message_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawMessage> {
    Ok(RawMessage {
        message_id: row.get(0)?,
        session_id: row.get(1)?,
        branch_id: row.get(2)?,
        parent_message_id: row.get(3)?,
        chosen_next_id: row.get(4)?,
        kind: row.get(5)?,
        content: row.get(6)?,
        payload: row.get(7)?,
        thought_signature: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn message_from_raw(raw: RawMessage) -> Result<Message> {
    let kind = MessageKind::parse(&raw.kind)
        .ok_or_else(|| StoreError::InvalidData(format!("unknown message kind: {}", raw.kind)))?;
    let payload = raw
        .payload
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .map_err(|e| StoreError::InvalidData(format!("malformed payload json: {}", e)))?;
    Ok(Message {
        message_id: raw.message_id,
        session_id: parse_uuid(&raw.session_id)?,
        branch_id: parse_uuid(&raw.branch_id)?,
        parent_message_id: raw.parent_message_id,
        chosen_next_id: raw.chosen_next_id,
        kind,
        content: raw.content,
        payload,
        thought_signature: raw.thought_signature,
        created_at: parse_timestamp(&raw.created_at)?,
    })
}

fn open_connection(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let connection = Connection::open(path)?;
    connection.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        PRAGMA foreign_keys = ON;
        PRAGMA synchronous = NORMAL;
        "#,
    )?;
    Ok(connection)
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339()
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StoreError::InvalidData(format!("malformed timestamp: {}", e)))
}

fn parse_uuid(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| StoreError::InvalidData(format!("malformed uuid: {}", e)))
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use chat_core::{Branch, MessageDraft, MessageKind, Session};

    use super::*;

    async fn open_store(dir: &tempfile::TempDir) -> SqliteGraphStore {
        let store = SqliteGraphStore::new(dir.path().join("conversations.db"));
        store.init().await.expect("init store");
        store
    }

    #[tokio::test]
    async fn create_and_load_session_with_root_branch() {
        let dir = tempdir().expect("temp dir");
        let store = open_store(&dir).await;

        let (session, root) = Session::new("gemini-2.5-flash", "be brief");
        store
            .create_session(session.clone(), root.clone())
            .await
            .expect("create session");

        let loaded = store.get_session(session.session_id).await.expect("load");
        assert_eq!(loaded.primary_branch_id, root.branch_id);
        assert_eq!(loaded.model, "gemini-2.5-flash");

        let loaded_root = store.get_branch(root.branch_id).await.expect("load branch");
        assert!(loaded_root.is_root());
        assert_eq!(loaded_root.session_id, session.session_id);
    }

    #[tokio::test]
    async fn append_assigns_increasing_ids_and_rewrites_chosen_next() {
        let dir = tempdir().expect("temp dir");
        let store = open_store(&dir).await;

        let (session, root) = Session::new("gemini-2.5-flash", "");
        store
            .create_session(session.clone(), root.clone())
            .await
            .expect("create session");

        let first = store
            .append_message(
                session.session_id,
                root.branch_id,
                None,
                MessageDraft::user("hi"),
                Utc::now(),
            )
            .await
            .expect("first append");
        let second = store
            .append_message(
                session.session_id,
                root.branch_id,
                Some(first.message_id),
                MessageDraft::model("hello"),
                Utc::now(),
            )
            .await
            .expect("second append");

        assert!(second.message_id > first.message_id);
        assert_eq!(second.parent_message_id, Some(first.message_id));

        let reread = store.get_message(first.message_id).await.expect("reread");
        assert_eq!(reread.chosen_next_id, Some(second.message_id));
        assert_eq!(reread.kind, MessageKind::User);
    }

    #[tokio::test]
    async fn append_with_unknown_parent_rolls_back() {
        let dir = tempdir().expect("temp dir");
        let store = open_store(&dir).await;

        let (session, root) = Session::new("gemini-2.5-flash", "");
        store
            .create_session(session.clone(), root.clone())
            .await
            .expect("create session");

        let result = store
            .append_message(
                session.session_id,
                root.branch_id,
                Some(9999),
                MessageDraft::user("orphan"),
                Utc::now(),
            )
            .await;
        assert!(matches!(result, Err(StoreError::MessageNotFound(9999))));

        // The message insert must not have survived the failed transaction.
        let messages = store
            .messages_in_branch(root.branch_id, None)
            .await
            .expect("list");
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn messages_in_branch_respects_upper_bound() {
        let dir = tempdir().expect("temp dir");
        let store = open_store(&dir).await;

        let (session, root) = Session::new("gemini-2.5-flash", "");
        store
            .create_session(session.clone(), root.clone())
            .await
            .expect("create session");

        let mut parent = None;
        let mut ids = Vec::new();
        for text in ["a", "b", "c"] {
            let message = store
                .append_message(
                    session.session_id,
                    root.branch_id,
                    parent,
                    MessageDraft::user(text),
                    Utc::now(),
                )
                .await
                .expect("append");
            parent = Some(message.message_id);
            ids.push(message.message_id);
        }

        let bounded = store
            .messages_in_branch(root.branch_id, Some(ids[1]))
            .await
            .expect("bounded list");
        assert_eq!(
            bounded.iter().map(|m| m.message_id).collect::<Vec<_>>(),
            &ids[..2]
        );

        let unbounded = store
            .messages_in_branch(root.branch_id, None)
            .await
            .expect("unbounded list");
        assert_eq!(unbounded.len(), 3);
    }

    #[tokio::test]
    async fn payload_and_thought_signature_roundtrip() {
        let dir = tempdir().expect("temp dir");
        let store = open_store(&dir).await;

        let (session, root) = Session::new("gemini-2.5-flash", "");
        store
            .create_session(session.clone(), root.clone())
            .await
            .expect("create session");

        let call = serde_json::json!({"name": "lookup", "args": {"q": "weather"}});
        let message = store
            .append_message(
                session.session_id,
                root.branch_id,
                None,
                MessageDraft::function_call(call.clone()).with_thought_signature("sig-1"),
                Utc::now(),
            )
            .await
            .expect("append");

        let reread = store.get_message(message.message_id).await.expect("reread");
        assert_eq!(reread.payload, Some(call));
        assert_eq!(reread.thought_signature.as_deref(), Some("sig-1"));
    }

    #[tokio::test]
    async fn lookups_report_not_found() {
        let dir = tempdir().expect("temp dir");
        let store = open_store(&dir).await;

        let missing = Uuid::new_v4();
        assert!(matches!(
            store.get_session(missing).await,
            Err(StoreError::SessionNotFound(id)) if id == missing
        ));
        assert!(matches!(
            store.get_branch(missing).await,
            Err(StoreError::BranchNotFound(id)) if id == missing
        ));
        assert!(matches!(
            store.get_message(5).await,
            Err(StoreError::MessageNotFound(5))
        ));
    }
}
