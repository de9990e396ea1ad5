//! # Storage Interfaces for the Token Lifecycle
//!
//! Persisted state lives behind three object-safe traits: refresh
//! credentials, the access-token blacklist and the id audit log. The core
//! protocol only ever talks to these traits; the in-memory implementations
//! here back tests and single-node deployments, while production adapters
//! for a document or relational store plug in behind the same contracts.
//!
//! ## Atomicity contract
//!
//! `CredentialStore::revoke` is a conditional update: it marks a credential
//! revoked only where it is not already revoked, and reports whether the
//! update applied. The rotation engine relies on this to guarantee at most
//! one successful rotation per credential under concurrent refresh calls.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

use shared::error::AuthResult;
use shared::types::{BlacklistEntry, IdRecord, RefreshCredential};

// =============================================================================
// TRAITS
// =============================================================================

/// Persisted refresh credentials, keyed by token hash for lookup
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Persist a new credential
    async fn insert(&self, credential: RefreshCredential) -> AuthResult<()>;

    /// Find the non-revoked credential matching a refresh token hash
    async fn find_active_by_hash(&self, hash: &str) -> AuthResult<Option<RefreshCredential>>;

    /// Mark a credential revoked where it is not already revoked.
    /// Returns whether the update applied.
    async fn revoke(&self, credential_id: &str) -> AuthResult<bool>;

    /// Record a successful use of the credential
    async fn touch_last_used(&self, credential_id: &str, when: DateTime<Utc>) -> AuthResult<()>;
}

/// Durable records of revoked access-token ids
#[async_trait]
pub trait BlacklistStore: Send + Sync {
    /// Persist a blacklist entry
    async fn insert(&self, entry: BlacklistEntry) -> AuthResult<()>;

    /// Whether an unexpired entry exists for this jti
    async fn contains(&self, jti: &str) -> AuthResult<bool>;

    /// Drop entries whose expiry has passed. Returns how many were dropped.
    async fn purge_expired(&self) -> AuthResult<usize>;
}

/// Append-only audit log for generated ids
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Append an id audit row
    async fn record(&self, record: IdRecord) -> AuthResult<()>;
}

// =============================================================================
// IN-MEMORY IMPLEMENTATIONS
// =============================================================================

/// In-memory credential store
#[derive(Default)]
pub struct MemoryCredentialStore {
    credentials: RwLock<HashMap<String, RefreshCredential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored credentials, revoked included
    pub fn len(&self) -> usize {
        self.credentials.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.read().is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn insert(&self, credential: RefreshCredential) -> AuthResult<()> {
        debug!(
            credential_id = %credential.id,
            principal_id = %credential.principal_id,
            kind = %credential.kind,
            "Storing refresh credential"
        );
        self.credentials
            .write()
            .insert(credential.id.clone(), credential);
        Ok(())
    }

    async fn find_active_by_hash(&self, hash: &str) -> AuthResult<Option<RefreshCredential>> {
        let credentials = self.credentials.read();
        Ok(credentials
            .values()
            .find(|c| !c.revoked && c.refresh_token_hash == hash)
            .cloned())
    }

    async fn revoke(&self, credential_id: &str) -> AuthResult<bool> {
        let mut credentials = self.credentials.write();
        match credentials.get_mut(credential_id) {
            Some(credential) if !credential.revoked => {
                credential.revoked = true;
                debug!(credential_id = %credential_id, "Credential revoked");
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn touch_last_used(&self, credential_id: &str, when: DateTime<Utc>) -> AuthResult<()> {
        let mut credentials = self.credentials.write();
        if let Some(credential) = credentials.get_mut(credential_id) {
            credential.last_used_at = Some(when);
        }
        Ok(())
    }
}

/// In-memory blacklist store
#[derive(Default)]
pub struct MemoryBlacklistStore {
    entries: RwLock<HashMap<String, BlacklistEntry>>,
}

impl MemoryBlacklistStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlacklistStore for MemoryBlacklistStore {
    async fn insert(&self, entry: BlacklistEntry) -> AuthResult<()> {
        debug!(jti = %entry.jti, reason = %entry.reason, "Blacklisting access token");
        self.entries.write().insert(entry.jti.clone(), entry);
        Ok(())
    }

    async fn contains(&self, jti: &str) -> AuthResult<bool> {
        let entries = self.entries.read();
        Ok(entries
            .get(jti)
            .map(|e| !e.is_expired(Utc::now()))
            .unwrap_or(false))
    }

    async fn purge_expired(&self) -> AuthResult<usize> {
        let mut entries = self.entries.write();
        let now = Utc::now();
        let before = entries.len();
        entries.retain(|_, e| !e.is_expired(now));
        Ok(before - entries.len())
    }
}

/// In-memory id audit log
#[derive(Default)]
pub struct MemoryAuditStore {
    records: RwLock<Vec<IdRecord>>,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded rows
    pub fn records(&self) -> Vec<IdRecord> {
        self.records.read().clone()
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn record(&self, record: IdRecord) -> AuthResult<()> {
        self.records.write().push(record);
        Ok(())
    }
}
