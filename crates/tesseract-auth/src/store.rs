//! Credential persistence.
//!
//! The verifier doesn't care where credentials live. It needs exactly two
//! operations, captured by the [`CredentialStore`] trait: look a user up,
//! and insert a user only if the name is still free.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use tokio::sync::RwLock;

use crate::StoreError;

/// One stored login. Created on registration and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    /// Unique key.
    pub username: String,
    /// Random per-user salt, hex.
    pub salt: String,
    /// `hash_password(password, salt)`, hex.
    pub hash: String,
}

/// Durable username → credential mapping.
///
/// # Atomicity
///
/// `insert_if_absent` must check and insert as one step. Two concurrent
/// registrations for the same name must end with exactly one record and
/// exactly one `Ok(true)`.
pub trait CredentialStore: Send + Sync + 'static {
    /// Looks up the record for `username`.
    fn find(
        &self,
        username: &str,
    ) -> impl std::future::Future<Output = Result<Option<CredentialRecord>, StoreError>> + Send;

    /// Stores `record` unless its username is taken.
    ///
    /// Returns `Ok(true)` if the record was written, `Ok(false)` if a
    /// record for that username already existed (which is left untouched).
    fn insert_if_absent(
        &self,
        record: CredentialRecord,
    ) -> impl std::future::Future<Output = Result<bool, StoreError>> + Send;
}

/// A [`CredentialStore`] that keeps everything in memory.
///
/// Lost on restart. Good for tests and single-process demos.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    records: RwLock<HashMap<String, CredentialRecord>>,
}

impl MemoryCredentialStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Returns `true` if nobody has registered yet.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl CredentialStore for MemoryCredentialStore {
    async fn find(&self, username: &str) -> Result<Option<CredentialRecord>, StoreError> {
        Ok(self.records.read().await.get(username).cloned())
    }

    async fn insert_if_absent(&self, record: CredentialRecord) -> Result<bool, StoreError> {
        // The write lock is held across the check and the insert.
        match self.records.write().await.entry(record.username.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(true)
            }
        }
    }
}
