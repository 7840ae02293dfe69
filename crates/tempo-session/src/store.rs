//! Durable storage seam for timer sessions.
//!
//! The cache and the engine only ever talk to storage through
//! [`SessionStore`], so the SQLite adapter, the in-memory store below, and
//! test doubles are interchangeable.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tempo_types::{Session, UserKey};

use crate::error::{Error, Result};

/// Trait for session storage backends.
///
/// One record per user. Writes are full-record replacements; the engine is
/// the only writer for a given user, so no compare-and-swap is required.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Load the user's session. Returns `Ok(None)` if no record exists.
    async fn load_by_user(&self, user: UserKey) -> Result<Option<Session>>;

    /// Create the default record for a new account.
    ///
    /// Fails with [`Error::AlreadyExists`] if a record is present.
    async fn create_default(&self, user: UserKey) -> Result<Session> {
        let session = Session::with_defaults(user);
        self.insert(&session).await?;
        Ok(session)
    }

    /// Insert a new record. Fails with [`Error::AlreadyExists`] if one is present.
    async fn insert(&self, session: &Session) -> Result<()>;

    /// Replace an existing record. Fails with [`Error::NotFound`] if the
    /// record was deleted underneath us.
    async fn save(&self, session: &Session) -> Result<()>;

    /// Users whose persisted state says the timer is running.
    async fn list_running(&self) -> Result<Vec<UserKey>>;
}

/// In-process session store.
///
/// Useful for tests and for running the engine without durability. The
/// store can be switched offline to exercise storage-failure paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<UserKey, Session>>,
    offline: AtomicBool,
    saves: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with [`Error::Storage`] (or succeed again).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of successful `insert`/`save` calls so far.
    pub fn write_count(&self) -> u64 {
        self.saves.load(Ordering::SeqCst)
    }

    /// Remove a record, as the account-deletion cascade would.
    pub fn remove(&self, user: UserKey) -> Option<Session> {
        self.records.lock().remove(&user)
    }

    /// Direct read that bypasses the offline switch.
    pub fn peek(&self, user: UserKey) -> Option<Session> {
        self.records.lock().get(&user).cloned()
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Storage("memory store is offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load_by_user(&self, user: UserKey) -> Result<Option<Session>> {
        self.check_online()?;
        Ok(self.records.lock().get(&user).cloned())
    }

    async fn insert(&self, session: &Session) -> Result<()> {
        self.check_online()?;
        let mut records = self.records.lock();
        if records.contains_key(&session.user_key) {
            return Err(Error::AlreadyExists(session.user_key));
        }
        records.insert(session.user_key, session.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn save(&self, session: &Session) -> Result<()> {
        self.check_online()?;
        let mut records = self.records.lock();
        match records.get_mut(&session.user_key) {
            Some(record) => {
                *record = session.clone();
                self.saves.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            None => Err(Error::NotFound(session.user_key)),
        }
    }

    async fn list_running(&self) -> Result<Vec<UserKey>> {
        self.check_online()?;
        let mut running: Vec<UserKey> = self
            .records
            .lock()
            .values()
            .filter(|s| s.state.running)
            .map(|s| s.user_key)
            .collect();
        running.sort();
        Ok(running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_default_then_load() {
        let store = MemoryStore::new();
        let created = store.create_default(UserKey(1)).await.unwrap();
        let loaded = store.load_by_user(UserKey(1)).await.unwrap();
        assert_eq!(loaded, Some(created));
        assert!(store.load_by_user(UserKey(2)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_twice_fails() {
        let store = MemoryStore::new();
        store.create_default(UserKey(1)).await.unwrap();
        let result = store.create_default(UserKey(1)).await;
        assert!(matches!(result, Err(Error::AlreadyExists(UserKey(1)))));
    }

    #[tokio::test]
    async fn test_save_missing_record() {
        let store = MemoryStore::new();
        let result = store.save(&Session::with_defaults(UserKey(9))).await;
        assert!(matches!(result, Err(Error::NotFound(UserKey(9)))));
    }

    #[tokio::test]
    async fn test_offline_switch() {
        let store = MemoryStore::new();
        store.create_default(UserKey(1)).await.unwrap();
        store.set_offline(true);
        assert!(matches!(
            store.load_by_user(UserKey(1)).await,
            Err(Error::Storage(_))
        ));
        store.set_offline(false);
        assert!(store.load_by_user(UserKey(1)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_list_running() {
        let store = MemoryStore::new();
        let mut running = store.create_default(UserKey(2)).await.unwrap();
        store.create_default(UserKey(1)).await.unwrap();
        running.state.running = true;
        store.save(&running).await.unwrap();

        assert_eq!(store.list_running().await.unwrap(), vec![UserKey(2)]);
        assert_eq!(store.write_count(), 3);
    }
}
