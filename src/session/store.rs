//! Session persistence
//!
//! Stores the full session collection as a single serialized blob in an
//! embedded `sled` database, alongside the user's text-to-speech settings.
//! Reads are forgiving: a missing or undecodable blob yields defaults and a
//! warning, never an error, so a damaged history file can't take the chat
//! down with it.

use crate::error::{KaviraError, Result};
use crate::session::{sort_newest_first, upsert, ChatSession, TtsConfig};
use sled::Db;
use std::path::Path;

const SESSIONS_KEY: &[u8] = b"sessions";
const TTS_CONFIG_KEY: &[u8] = b"tts_config";

/// Session persistence manager
///
/// Wraps an embedded `sled` database holding the serialized session
/// collection and the TTS settings.
pub struct SessionStore {
    db: Db,
}

impl SessionStore {
    /// Open or create a store at the given path
    ///
    /// # Errors
    ///
    /// Returns `KaviraError::Storage` if the database cannot be opened
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use kavira::session::SessionStore;
    ///
    /// # fn main() -> kavira::error::Result<()> {
    /// let store = SessionStore::new("/tmp/sessions.db")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let db = sled::open(path)
            .map_err(|e| KaviraError::Storage(format!("Failed to open database: {}", e)))?;
        Ok(Self { db })
    }

    /// Open the store at the default location
    ///
    /// Honors the `KAVIRA_SESSIONS_DB` override.
    pub fn open_default() -> Result<Self> {
        let path = crate::config::Config::sessions_db_path()?;
        tracing::debug!("Opening session store at {}", path.display());
        Self::new(path)
    }

    /// Load all sessions, newest first
    ///
    /// A missing blob yields an empty list. A blob that fails to decode is
    /// logged and swallowed, also yielding an empty list; history damage
    /// never becomes a hard failure.
    pub fn load(&self) -> Vec<ChatSession> {
        let bytes = match self.db.get(SESSIONS_KEY) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to read sessions blob: {}", e);
                return Vec::new();
            }
        };

        match serde_json::from_slice::<Vec<ChatSession>>(&bytes) {
            Ok(mut sessions) => {
                sort_newest_first(&mut sessions);
                sessions
            }
            Err(e) => {
                tracing::warn!("Discarding corrupt sessions blob: {}", e);
                Vec::new()
            }
        }
    }

    /// Serialize and overwrite the full session collection
    ///
    /// # Errors
    ///
    /// Returns `KaviraError::Storage` if serialization or the write fails
    pub fn save_all(&self, sessions: &[ChatSession]) -> Result<()> {
        let value = serde_json::to_vec(sessions)
            .map_err(|e| KaviraError::Storage(format!("Serialization failed: {}", e)))?;

        self.db
            .insert(SESSIONS_KEY, value)
            .map_err(|e| KaviraError::Storage(format!("Insert failed: {}", e)))?;

        self.db
            .flush()
            .map_err(|e| KaviraError::Storage(format!("Flush failed: {}", e)))?;

        Ok(())
    }

    /// Merge one session into the stored collection
    ///
    /// Applies the replacement rules from [`crate::session::upsert`] and
    /// persists the result.
    pub fn upsert(&self, session: ChatSession) -> Result<()> {
        let sessions = upsert(self.load(), session);
        self.save_all(&sessions)
    }

    /// Delete a session by exact id
    ///
    /// Returns `true` when a session was removed. When the last session is
    /// deleted the blob itself is removed rather than rewritten as an
    /// empty list.
    ///
    /// # Errors
    ///
    /// Returns `KaviraError::Storage` if the write fails
    pub fn delete_by_id(&self, id: &str) -> Result<bool> {
        let sessions = self.load();
        let before = sessions.len();
        let remaining: Vec<ChatSession> = sessions.into_iter().filter(|s| s.id != id).collect();

        if remaining.len() == before {
            return Ok(false);
        }

        if remaining.is_empty() {
            self.db
                .remove(SESSIONS_KEY)
                .map_err(|e| KaviraError::Storage(format!("Remove failed: {}", e)))?;
            self.db
                .flush()
                .map_err(|e| KaviraError::Storage(format!("Flush failed: {}", e)))?;
        } else {
            self.save_all(&remaining)?;
        }

        Ok(true)
    }

    /// Whether the sessions blob currently exists
    pub fn has_sessions_blob(&self) -> bool {
        matches!(self.db.get(SESSIONS_KEY), Ok(Some(_)))
    }

    /// Whether TTS settings have ever been saved
    ///
    /// Callers fall back to the config-file defaults when nothing has been
    /// persisted yet.
    pub fn has_tts_config(&self) -> bool {
        matches!(self.db.get(TTS_CONFIG_KEY), Ok(Some(_)))
    }

    /// Load the persisted TTS settings
    ///
    /// Missing or corrupt settings fall back to the default configuration.
    pub fn load_tts(&self) -> TtsConfig {
        match self.db.get(TTS_CONFIG_KEY) {
            Ok(Some(bytes)) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                tracing::warn!("Discarding corrupt TTS settings: {}", e);
                TtsConfig::default()
            }),
            Ok(None) => TtsConfig::default(),
            Err(e) => {
                tracing::warn!("Failed to read TTS settings: {}", e);
                TtsConfig::default()
            }
        }
    }

    /// Persist the TTS settings
    ///
    /// # Errors
    ///
    /// Returns `KaviraError::Storage` if serialization or the write fails
    pub fn save_tts(&self, config: &TtsConfig) -> Result<()> {
        let value = serde_json::to_vec(config)
            .map_err(|e| KaviraError::Storage(format!("Serialization failed: {}", e)))?;

        self.db
            .insert(TTS_CONFIG_KEY, value)
            .map_err(|e| KaviraError::Storage(format!("Insert failed: {}", e)))?;

        self.db
            .flush()
            .map_err(|e| KaviraError::Storage(format!("Flush failed: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat_mode::ChatMode;
    use crate::session::{Message, TtsEngine};
    use tempfile::TempDir;

    fn create_test_store() -> (SessionStore, TempDir) {
        let dir = TempDir::new().expect("create temp dir");
        let store = SessionStore::new(dir.path().join("sessions.db")).expect("open store");
        (store, dir)
    }

    fn sample_session(user_text: &str, model_text: &str) -> ChatSession {
        ChatSession::new(
            ChatMode::Fast,
            vec![Message::user(user_text), Message::model(model_text)],
        )
    }

    #[test]
    fn test_load_empty_store() {
        let (store, _dir) = create_test_store();
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let (store, _dir) = create_test_store();
        let session = sample_session("hello", "hi there");

        store.save_all(std::slice::from_ref(&session)).unwrap();
        let loaded = store.load();

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0], session);
    }

    #[test]
    fn test_load_sorts_newest_first() {
        let (store, _dir) = create_test_store();
        let mut old = sample_session("old", "a");
        old.timestamp = 100;
        let mut new = sample_session("new", "b");
        new.timestamp = 200;

        store.save_all(&[old, new]).unwrap();
        let loaded = store.load();

        assert_eq!(loaded[0].timestamp, 200);
        assert_eq!(loaded[1].timestamp, 100);
    }

    #[test]
    fn test_corrupt_blob_yields_empty_list() {
        let (store, _dir) = create_test_store();
        store
            .db
            .insert(SESSIONS_KEY, b"{definitely not json]".as_slice())
            .unwrap();

        assert!(store.load().is_empty());
    }

    #[test]
    fn test_corrupt_blob_does_not_block_saving() {
        let (store, _dir) = create_test_store();
        store.db.insert(SESSIONS_KEY, b"garbage".as_slice()).unwrap();

        let session = sample_session("fresh start", "ok");
        store.upsert(session).unwrap();
        assert_eq!(store.load().len(), 1);
    }

    #[test]
    fn test_upsert_inserts_and_replaces() {
        let (store, _dir) = create_test_store();
        let session = sample_session("q1", "a1");
        store.upsert(session.clone()).unwrap();

        let mut updated = session.clone();
        updated.messages.push(Message::user("q2"));
        updated.timestamp += 1;
        store.upsert(updated).unwrap();

        let loaded = store.load();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].messages.len(), 3);
    }

    #[test]
    fn test_upsert_unchanged_resave_preserves_stored_state() {
        let (store, _dir) = create_test_store();
        let mut session = sample_session("q", "reply");
        session.timestamp = 1_000;
        store.upsert(session.clone()).unwrap();

        // Identical content under the same id is skipped, not rewritten
        session.timestamp = 2_000;
        store.upsert(session).unwrap();

        let loaded = store.load();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].timestamp, 1_000);
    }

    #[test]
    fn test_upsert_keeps_sessions_sharing_a_tail() {
        let (store, _dir) = create_test_store();
        store.upsert(sample_session("first", "same reply")).unwrap();
        store.upsert(sample_session("second", "same reply")).unwrap();

        assert_eq!(store.load().len(), 2);
    }

    #[test]
    fn test_delete_by_id() {
        let (store, _dir) = create_test_store();
        let keep = sample_session("keep", "a");
        let drop = sample_session("drop", "b");
        store.save_all(&[keep.clone(), drop.clone()]).unwrap();

        assert!(store.delete_by_id(&drop.id).unwrap());
        let loaded = store.load();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, keep.id);
    }

    #[test]
    fn test_delete_unknown_id_returns_false() {
        let (store, _dir) = create_test_store();
        store.save_all(&[sample_session("a", "b")]).unwrap();
        assert!(!store.delete_by_id("no-such-id").unwrap());
        assert_eq!(store.load().len(), 1);
    }

    #[test]
    fn test_delete_last_session_removes_blob() {
        let (store, _dir) = create_test_store();
        let session = sample_session("only", "one");
        store.save_all(std::slice::from_ref(&session)).unwrap();
        assert!(store.has_sessions_blob());

        assert!(store.delete_by_id(&session.id).unwrap());
        assert!(!store.has_sessions_blob());
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_tts_defaults_when_missing() {
        let (store, _dir) = create_test_store();
        let config = store.load_tts();
        assert_eq!(config, TtsConfig::default());
    }

    #[test]
    fn test_tts_roundtrip() {
        let (store, _dir) = create_test_store();
        let config = TtsConfig {
            enabled: true,
            engine: TtsEngine::Gemini,
            voice: "Zephyr".to_string(),
        };
        store.save_tts(&config).unwrap();
        assert_eq!(store.load_tts(), config);
    }

    #[test]
    fn test_corrupt_tts_falls_back_to_default() {
        let (store, _dir) = create_test_store();
        store
            .db
            .insert(TTS_CONFIG_KEY, b"not json".as_slice())
            .unwrap();
        assert_eq!(store.load_tts(), TtsConfig::default());
    }

    #[test]
    fn test_store_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sessions.db");
        let session = sample_session("persist me", "ok");

        {
            let store = SessionStore::new(&path).unwrap();
            store.upsert(session.clone()).unwrap();
        }

        let store = SessionStore::new(&path).unwrap();
        let loaded = store.load();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, session.id);
    }
}
