//! Durable per-user conversation profiles
//!
//! The whole store is a single JSON document mapping the user id (as a
//! string) to that user's profile. Every mutation rewrites the full document,
//! so mutations for *all* users go through one writer lock; otherwise two
//! interleaved read-modify-writes for different users lose one update.
//! Plain reads skip the lock: writes land via rename, so a reader sees either
//! the old or the new document, never a torn one.

mod profile;

pub use profile::{HistoryEntry, Role, Turn, UserProfile};
use profile::StoredProfile;

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

/// Stable transport-level user identifier
pub type UserId = i64;

/// Number of turns fed back as context when the caller has no preference
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Store document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

type Document = BTreeMap<String, StoredProfile>;

/// Profile store backed by one JSON file
#[derive(Clone)]
pub struct JsonProfileStore {
    inner: Arc<Inner>,
}

struct Inner {
    path: PathBuf,
    default_model: String,
    writer: Mutex<()>,
}

impl JsonProfileStore {
    /// Open the store at `path`. A missing file is an empty store; an existing
    /// file must parse, so a corrupt store is reported at startup rather than
    /// on the first message.
    pub fn open(path: impl AsRef<Path>, default_model: impl Into<String>) -> StoreResult<Self> {
        let store = Self {
            inner: Arc::new(Inner {
                path: path.as_ref().to_path_buf(),
                default_model: default_model.into(),
                writer: Mutex::new(()),
            }),
        };
        let document = store.read_document()?;
        tracing::debug!(
            path = %store.inner.path.display(),
            profiles = document.len(),
            "Profile store opened"
        );
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    // ==================== Reads ====================

    /// Existing profile, or a freshly persisted default one. Records with
    /// missing fields are healed and written back before returning.
    pub fn get_profile(&self, user_id: UserId) -> StoreResult<UserProfile> {
        let document = self.read_document()?;
        if let Some(stored) = document.get(&user_id.to_string()) {
            if stored.is_complete() {
                return Ok(stored.clone().heal(&self.inner.default_model));
            }
        }

        self.update(user_id, |existing| {
            let profile = existing.unwrap_or_else(|| self.new_profile());
            (profile.clone(), profile)
        })
    }

    /// The last `limit` turns, oldest first. Never creates a profile.
    pub fn recent_history(&self, user_id: UserId, limit: usize) -> StoreResult<Vec<HistoryEntry>> {
        let mut document = self.read_document()?;
        Ok(document
            .remove(&user_id.to_string())
            .map(|stored| stored.heal(&self.inner.default_model).recent_history(limit))
            .unwrap_or_default())
    }

    // ==================== Mutations ====================

    pub fn set_model(&self, user_id: UserId, model: &str) -> StoreResult<()> {
        self.update(user_id, |existing| {
            let mut profile = existing.unwrap_or_else(|| self.new_profile());
            profile.model = model.to_string();
            (profile, ())
        })
    }

    /// Flip web search and return the new value. A profile created here
    /// starts with web search *off*, unlike every other creation path.
    pub fn toggle_web_search(&self, user_id: UserId) -> StoreResult<bool> {
        self.update(user_id, |existing| {
            let profile = match existing {
                Some(mut profile) => {
                    profile.web_search_enabled = !profile.web_search_enabled;
                    profile
                }
                None => UserProfile {
                    web_search_enabled: false,
                    ..self.new_profile()
                },
            };
            let enabled = profile.web_search_enabled;
            (profile, enabled)
        })
    }

    /// Single-turn append; exchanges go through [`Self::append_exchange`]
    #[cfg(test)]
    pub fn append_turn(&self, user_id: UserId, role: Role, content: &str) -> StoreResult<()> {
        self.append_exchange(user_id, vec![Turn::new(role, content)])
    }

    /// Append several turns in one write, so they become visible together
    pub fn append_exchange(&self, user_id: UserId, turns: Vec<Turn>) -> StoreResult<()> {
        self.update(user_id, |existing| {
            let mut profile = existing.unwrap_or_else(|| self.new_profile());
            profile.history.extend(turns);
            (profile, ())
        })
    }

    /// Empty the history, keeping model and web-search choice. No-op for
    /// users without a profile.
    pub fn clear_history(&self, user_id: UserId) -> StoreResult<()> {
        let _guard = self.lock_writer();
        let mut document = self.read_document()?;
        let key = user_id.to_string();
        let Some(stored) = document.remove(&key) else {
            return Ok(());
        };

        let mut profile = stored.heal(&self.inner.default_model);
        profile.history.clear();
        document.insert(key, profile.into());
        self.write_document(&document)
    }

    // ==================== Internals ====================

    fn new_profile(&self) -> UserProfile {
        UserProfile::new(self.inner.default_model.clone())
    }

    fn lock_writer(&self) -> std::sync::MutexGuard<'_, ()> {
        // The guarded section holds no data, so a poisoned lock is still usable
        self.inner.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Serialized read-modify-write of the whole document
    fn update<R>(
        &self,
        user_id: UserId,
        apply: impl FnOnce(Option<UserProfile>) -> (UserProfile, R),
    ) -> StoreResult<R> {
        let _guard = self.lock_writer();
        let mut document = self.read_document()?;
        let key = user_id.to_string();

        let existing = document
            .remove(&key)
            .map(|stored| stored.heal(&self.inner.default_model));
        let (profile, result) = apply(existing);
        document.insert(key, profile.into());

        self.write_document(&document)?;
        Ok(result)
    }

    fn read_document(&self) -> StoreResult<Document> {
        let path = &self.inner.path;
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Document::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.clone(),
                    source,
                })
            }
        };

        if raw.trim().is_empty() {
            return Ok(Document::new());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write to a sibling temp file, then rename over the store
    fn write_document(&self, document: &Document) -> StoreResult<()> {
        let path = &self.inner.path;
        let json = serde_json::to_vec_pretty(document)?;

        let file_name = path
            .file_name()
            .map_or_else(|| "store".into(), |n| n.to_string_lossy());
        let tmp_path = path.with_file_name(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4()));

        let io_err = |source| StoreError::Io {
            path: tmp_path.clone(),
            source,
        };
        let mut file = fs::File::create(&tmp_path).map_err(io_err)?;
        file.write_all(&json).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        drop(file);

        if let Err(source) = fs::rename(&tmp_path, path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(StoreError::Io {
                path: path.clone(),
                source,
            });
        }
        Ok(())
    }
}
