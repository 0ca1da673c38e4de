//! # Session Store
//!
//! Holds the signed-in session, persists it, and keeps several storefront
//! instances (tabs, windows) on the same session.
//!
//! ## Persistence
//! The session is written through a [`SessionStorage`]. The binary uses a
//! JSON file in the data directory; tests use [`MemorySessionStorage`].
//! Storage failures are logged and never fail a sign-in: the session then
//! lives in memory only.
//!
//! ## Cross-Instance Sync
//! ```text
//! ┌──────────────┐   SessionEvent { origin: A, change }   ┌──────────────┐
//! │  Store A     │ ─────────────── broadcast ───────────► │  Store B     │
//! │  sign_in()   │                                        │  sync()      │
//! └──────────────┘                                        └──────────────┘
//!        │                                                       │
//!        ▼                                                       ▼
//!   own events are ignored                     Lagged ──► reload from storage
//! ```
//! Delivery is at most once and unordered across senders. A store that
//! missed events re-reads the shared storage, which always holds the last
//! write.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use souq_core::{Session, UserProfile};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::AuthError;

// =============================================================================
// Storage
// =============================================================================

/// Session storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Session storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored session is unreadable: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Session storage lock poisoned")]
    Poisoned,
}

/// Where the session survives restarts.
pub trait SessionStorage: Send + Sync + fmt::Debug {
    fn load(&self) -> Result<Option<Session>, StorageError>;
    fn save(&self, session: &Session) -> Result<(), StorageError>;
    fn clear(&self) -> Result<(), StorageError>;
}

/// JSON file storage.
#[derive(Debug, Clone)]
pub struct FileSessionStorage {
    path: PathBuf,
}

impl FileSessionStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSessionStorage { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStorage for FileSessionStorage {
    fn load(&self) -> Result<Option<Session>, StorageError> {
        match std::fs::read_to_string(&self.path) {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, session: &Session) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string(session)?;

        // Write-then-rename so a reader never sees half a file.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory storage. Holds serialized JSON so sharing one instance
/// between stores behaves like a shared file.
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    slot: std::sync::Mutex<Option<String>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        MemorySessionStorage::default()
    }

    /// Stores raw text, e.g. to simulate a corrupted entry.
    pub fn put_raw(&self, raw: impl Into<String>) -> Result<(), StorageError> {
        *self.slot.lock().map_err(|_| StorageError::Poisoned)? = Some(raw.into());
        Ok(())
    }
}

impl SessionStorage for MemorySessionStorage {
    fn load(&self) -> Result<Option<Session>, StorageError> {
        let slot = self.slot.lock().map_err(|_| StorageError::Poisoned)?;
        match slot.as_deref() {
            Some(json) => Ok(Some(serde_json::from_str(json)?)),
            None => Ok(None),
        }
    }

    fn save(&self, session: &Session) -> Result<(), StorageError> {
        let json = serde_json::to_string(session)?;
        *self.slot.lock().map_err(|_| StorageError::Poisoned)? = Some(json);
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        *self.slot.lock().map_err(|_| StorageError::Poisoned)? = None;
        Ok(())
    }
}

// =============================================================================
// Channel
// =============================================================================

/// What changed.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionChange {
    SignedIn(Session),
    SignedOut,
}

/// A session change published by one store.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEvent {
    /// Id of the publishing store.
    pub origin: String,
    pub change: SessionChange,
}

/// Broadcast channel shared by every store of one user.
#[derive(Debug, Clone)]
pub struct SessionChannel {
    tx: broadcast::Sender<SessionEvent>,
}

impl SessionChannel {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        SessionChannel { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Publishes an event. Nobody listening is not an error.
    pub fn publish(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for SessionChannel {
    fn default() -> Self {
        SessionChannel::new(16)
    }
}

// =============================================================================
// Store
// =============================================================================

/// The signed-in session of one storefront instance.
#[derive(Debug)]
pub struct SessionStore {
    id: String,
    current: RwLock<Option<Session>>,
    storage: Arc<dyn SessionStorage>,
    channel: SessionChannel,
    events: Mutex<broadcast::Receiver<SessionEvent>>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn SessionStorage>, channel: SessionChannel) -> Self {
        let events = Mutex::new(channel.subscribe());
        SessionStore {
            id: Uuid::new_v4().to_string(),
            current: RwLock::new(None),
            storage,
            channel,
            events,
        }
    }

    /// A store with private in-memory storage and its own channel.
    pub fn in_memory() -> Self {
        SessionStore::new(Arc::new(MemorySessionStorage::new()), SessionChannel::default())
    }

    /// Id carried as `origin` on this store's events.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Restores the persisted session.
    ///
    /// ## Behavior
    /// - Valid, unexpired entry: becomes the current session
    /// - Expired or unreadable entry: removed from storage, no session
    /// - Storage unavailable: no session, logged
    pub async fn bootstrap(&self) -> Option<Session> {
        let restored = self.read_storage();
        *self.current.write().await = restored.clone();

        match &restored {
            Some(session) => info!(
                user_id = %session.user.id,
                is_mock = session.is_mock,
                "Session restored"
            ),
            None => debug!("No session to restore"),
        }

        restored
    }

    /// Current session, after applying changes from other instances.
    ///
    /// An expired session is dropped here.
    pub async fn current(&self) -> Option<Session> {
        self.sync().await;

        let session = self.current.read().await.clone()?;
        if session.is_expired(Utc::now()) {
            info!(user_id = %session.user.id, "Session expired");
            self.clear().await;
            return None;
        }

        Some(session)
    }

    /// The signed-in user.
    pub async fn require_user(&self) -> Result<UserProfile, AuthError> {
        self.current()
            .await
            .map(|s| s.user)
            .ok_or(AuthError::NotSignedIn)
    }

    /// The signed-in user, who must be an admin on a real session.
    pub async fn require_admin(&self) -> Result<UserProfile, AuthError> {
        let session = self.current().await.ok_or(AuthError::NotSignedIn)?;
        let user = session.user;
        if session.is_mock || !user.is_admin() {
            warn!(user_id = %user.id, "Non-admin attempted an admin command");
            return Err(AuthError::Forbidden("admin access required".to_string()));
        }
        Ok(user)
    }

    /// Makes `session` current, persists it and tells other instances.
    pub async fn set(&self, session: Session) {
        if let Err(e) = self.storage.save(&session) {
            warn!(error = %e, "Could not persist session, keeping it in memory");
        }

        *self.current.write().await = Some(session.clone());
        self.channel.publish(SessionEvent {
            origin: self.id.clone(),
            change: SessionChange::SignedIn(session),
        });
    }

    /// Signs out locally, clears storage and tells other instances.
    pub async fn clear(&self) {
        if let Err(e) = self.storage.clear() {
            warn!(error = %e, "Could not clear stored session");
        }

        *self.current.write().await = None;
        self.channel.publish(SessionEvent {
            origin: self.id.clone(),
            change: SessionChange::SignedOut,
        });
    }

    /// Applies pending events from other instances.
    ///
    /// ## Returns
    /// Number of foreign events applied (a storage resync counts as one).
    pub async fn sync(&self) -> usize {
        let mut events = self.events.lock().await;
        let mut applied = 0;

        loop {
            match events.try_recv() {
                Ok(event) if event.origin == self.id => continue,
                Ok(event) => {
                    debug!(origin = %event.origin, "Applying session change from another instance");
                    let next = match event.change {
                        SessionChange::SignedIn(session) => Some(session),
                        SessionChange::SignedOut => None,
                    };
                    *self.current.write().await = next;
                    applied += 1;
                }
                Err(TryRecvError::Lagged(missed)) => {
                    warn!(missed, "Session events missed, reloading from storage");
                    *self.current.write().await = self.read_storage();
                    applied += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }

        applied
    }

    /// Loads from storage, discarding expired or unreadable entries.
    fn read_storage(&self) -> Option<Session> {
        match self.storage.load() {
            Ok(Some(session)) if session.is_expired(Utc::now()) => {
                debug!("Stored session expired, discarding");
                self.discard_stored();
                None
            }
            Ok(session) => session,
            Err(StorageError::Corrupt(e)) => {
                warn!(error = %e, "Stored session unreadable, discarding");
                self.discard_stored();
                None
            }
            Err(e) => {
                warn!(error = %e, "Session storage unavailable");
                None
            }
        }
    }

    fn discard_stored(&self) {
        if let Err(e) = self.storage.clear() {
            warn!(error = %e, "Could not clear stored session");
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use souq_core::AccountType;

    fn session(email: &str, ttl: Duration) -> Session {
        Session {
            user: UserProfile {
                id: format!("id-{email}"),
                email: email.to_string(),
                full_name: "Test".to_string(),
                account_type: AccountType::Customer,
                reseller_plan: None,
                is_active: true,
                created_at: Utc::now(),
            },
            access_token: "token".to_string(),
            expires_at: Utc::now() + ttl,
            is_mock: false,
        }
    }

    fn pair(capacity: usize) -> (SessionStore, SessionStore, Arc<MemorySessionStorage>) {
        let storage = Arc::new(MemorySessionStorage::new());
        let channel = SessionChannel::new(capacity);
        let a = SessionStore::new(storage.clone(), channel.clone());
        let b = SessionStore::new(storage.clone(), channel);
        (a, b, storage)
    }

    #[tokio::test]
    async fn test_set_persists_and_bootstrap_restores() {
        let storage = Arc::new(MemorySessionStorage::new());
        let store = SessionStore::new(storage.clone(), SessionChannel::default());
        store.set(session("a@example.com", Duration::hours(1))).await;

        let restarted = SessionStore::new(storage, SessionChannel::default());
        let restored = restarted.bootstrap().await.unwrap();
        assert_eq!(restored.user.email, "a@example.com");
        assert!(restarted.require_user().await.is_ok());
    }

    #[tokio::test]
    async fn test_bootstrap_discards_expired_and_corrupt() {
        let storage = Arc::new(MemorySessionStorage::new());
        storage
            .save(&session("old@example.com", Duration::hours(-1)))
            .unwrap();
        let store = SessionStore::new(storage.clone(), SessionChannel::default());
        assert!(store.bootstrap().await.is_none());
        assert!(storage.load().unwrap().is_none());

        storage.put_raw("{not json").unwrap();
        assert!(store.bootstrap().await.is_none());
        assert!(storage.load().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_session_dropped_on_read() {
        let store = SessionStore::in_memory();
        store.set(session("a@example.com", Duration::milliseconds(-1))).await;
        assert!(store.current().await.is_none());
        assert!(matches!(store.require_user().await, Err(AuthError::NotSignedIn)));
    }

    #[tokio::test]
    async fn test_require_admin() {
        let store = SessionStore::in_memory();
        store.set(session("c@example.com", Duration::hours(1))).await;
        assert!(matches!(store.require_admin().await, Err(AuthError::Forbidden(_))));

        let mut admin = session("admin@example.com", Duration::hours(1));
        admin.user.account_type = AccountType::Admin;
        store.set(admin.clone()).await;
        assert!(store.require_admin().await.is_ok());

        admin.is_mock = true;
        store.set(admin).await;
        assert!(matches!(store.require_admin().await, Err(AuthError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_changes_reach_other_instance() {
        let (a, b, _) = pair(16);

        a.set(session("a@example.com", Duration::hours(1))).await;
        assert_eq!(b.current().await.unwrap().user.email, "a@example.com");

        b.clear().await;
        assert!(a.current().await.is_none());
    }

    #[tokio::test]
    async fn test_own_events_ignored() {
        let (a, _b, _) = pair(16);
        a.set(session("a@example.com", Duration::hours(1))).await;
        assert_eq!(a.sync().await, 0);
        assert!(a.current().await.is_some());
    }

    #[tokio::test]
    async fn test_lagged_receiver_resyncs_from_storage() {
        let (a, b, _) = pair(1);

        a.set(session("first@example.com", Duration::hours(1))).await;
        a.set(session("second@example.com", Duration::hours(1))).await;
        a.set(session("third@example.com", Duration::hours(1))).await;

        // b missed events; storage holds the last write.
        assert!(b.sync().await >= 1);
        assert_eq!(b.current().await.unwrap().user.email, "third@example.com");
    }

    #[test]
    fn test_file_storage_roundtrip() {
        let path = std::env::temp_dir()
            .join(format!("souq-session-{}", Uuid::new_v4()))
            .join("session.json");
        let storage = FileSessionStorage::new(&path);

        assert!(storage.load().unwrap().is_none());
        storage.save(&session("f@example.com", Duration::hours(1))).unwrap();
        assert_eq!(storage.load().unwrap().unwrap().user.email, "f@example.com");

        storage.clear().unwrap();
        assert!(storage.load().unwrap().is_none());
        storage.clear().unwrap();

        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }
}
