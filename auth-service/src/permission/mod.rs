//! # Permission Encoding and Resolution
//!
//! Authorization consumes a comma-separated grant string per principal
//! ("operator:read,device:manage,..."). This module owns that encoding and
//! the resolver interface the authentication layer uses to attach grants to
//! a request after a token is verified and found not blacklisted.
//!
//! The core never computes permissions; "no permissions" is a legitimate
//! resolver answer and must be treated as a hard authorization failure,
//! never a default-allow.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use shared::error::AuthResult;
use shared::types::PrincipalId;

// =============================================================================
// PERMISSIONS
// =============================================================================

/// Named permissions and permission groups.
///
/// Compound variants expand to every grant of their resource; the suffixed
/// variants carry a single grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Operator,
    Device,
    App,
    Rom,
    Auth,
    OperatorRead,
    OperatorWrite,
    OperatorDelete,
    OperatorManage,
    DeviceRead,
    DeviceWrite,
    DeviceDelete,
    DeviceManage,
    AppRead,
    AppWrite,
    AppDelete,
    AppManage,
    RomRead,
    RomWrite,
    RomDelete,
    RomManage,
    DeviceWriteSelf,
    DeviceUpdateSelf,
    DeviceReadSelf,
}

impl Permission {
    /// The grant strings this permission expands to
    pub fn grants(&self) -> &'static [&'static str] {
        match self {
            Permission::Operator => &[
                "operator:read",
                "operator:write",
                "operator:delete",
                "operator:manage",
            ],
            Permission::Device => &[
                "device:read",
                "device:write",
                "device:delete",
                "device:manage",
            ],
            Permission::App => &["app:read", "app:write", "app:delete", "app:manage"],
            Permission::Rom => &["rom:read", "rom:write", "rom:delete", "rom:manage"],
            Permission::Auth => &["auth"],
            Permission::OperatorRead => &["operator:read"],
            Permission::OperatorWrite => &["operator:write"],
            Permission::OperatorDelete => &["operator:delete"],
            Permission::OperatorManage => &["operator:manage"],
            Permission::DeviceRead => &["device:read"],
            Permission::DeviceWrite => &["device:write"],
            Permission::DeviceDelete => &["device:delete"],
            Permission::DeviceManage => &["device:manage"],
            Permission::AppRead => &["app:read"],
            Permission::AppWrite => &["app:write"],
            Permission::AppDelete => &["app:delete"],
            Permission::AppManage => &["app:manage"],
            Permission::RomRead => &["rom:read"],
            Permission::RomWrite => &["rom:write"],
            Permission::RomDelete => &["rom:delete"],
            Permission::RomManage => &["rom:manage"],
            Permission::DeviceWriteSelf => &["device:write:self"],
            Permission::DeviceUpdateSelf => &["device:update:self"],
            Permission::DeviceReadSelf => &["device:read:self"],
        }
    }
}

// =============================================================================
// PERMISSION SET
// =============================================================================

/// A principal's grants: set semantics, comma-separated wire encoding
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<String>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the comma-separated encoding; blank segments are skipped
    pub fn parse(encoded: &str) -> Self {
        let grants = encoded
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self(grants)
    }

    /// The comma-separated encoding, grants in lexical order
    pub fn encode(&self) -> String {
        self.0.iter().cloned().collect::<Vec<_>>().join(",")
    }

    /// Add every grant of a permission
    pub fn grant(&mut self, permission: Permission) -> &mut Self {
        for grant in permission.grants() {
            self.0.insert((*grant).to_string());
        }
        self
    }

    /// Whether a specific grant string is present
    pub fn contains(&self, grant: &str) -> bool {
        self.0.contains(grant)
    }

    /// Whether the principal holds every grant of a permission
    pub fn allows(&self, permission: Permission) -> bool {
        permission.grants().iter().all(|g| self.contains(g))
    }

    /// An empty set means "no permissions": a hard deny, never default-allow
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

// =============================================================================
// RESOLVER
// =============================================================================

/// Maps a principal id to its grants.
///
/// `None` means the principal has no permission record at all; callers must
/// treat it exactly like an empty set.
#[async_trait]
pub trait PermissionResolver: Send + Sync {
    async fn permissions_of(&self, principal_id: PrincipalId)
        -> AuthResult<Option<PermissionSet>>;
}

/// In-memory resolver backing tests and single-node deployments
#[derive(Default)]
pub struct MemoryPermissionResolver {
    permissions: RwLock<HashMap<PrincipalId, PermissionSet>>,
}

impl MemoryPermissionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a principal's grants
    pub fn set(&self, principal_id: PrincipalId, permissions: PermissionSet) {
        self.permissions.write().insert(principal_id, permissions);
    }
}

#[async_trait]
impl PermissionResolver for MemoryPermissionResolver {
    async fn permissions_of(
        &self,
        principal_id: PrincipalId,
    ) -> AuthResult<Option<PermissionSet>> {
        Ok(self.permissions.read().get(&principal_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_encode_roundtrip() {
        let set = PermissionSet::parse("operator:read, device:manage ,,auth");
        assert_eq!(set.len(), 3);
        assert!(set.contains("operator:read"));
        assert!(set.contains("device:manage"));
        assert!(set.contains("auth"));

        let encoded = set.encode();
        assert_eq!(PermissionSet::parse(&encoded), set);
    }

    #[test]
    fn test_compound_permission_expands() {
        let mut set = PermissionSet::new();
        set.grant(Permission::Operator);
        assert_eq!(set.len(), 4);
        assert!(set.allows(Permission::OperatorRead));
        assert!(set.allows(Permission::Operator));
        assert!(!set.allows(Permission::DeviceRead));
    }

    #[test]
    fn test_empty_set_means_deny() {
        let set = PermissionSet::parse("");
        assert!(set.is_empty());
        assert!(!set.allows(Permission::Auth));
        assert_eq!(set.encode(), "");
    }

    #[tokio::test]
    async fn test_memory_resolver() {
        let resolver = MemoryPermissionResolver::new();
        let principal = PrincipalId(99);

        assert!(resolver.permissions_of(principal).await.unwrap().is_none());

        let mut set = PermissionSet::new();
        set.grant(Permission::DeviceReadSelf);
        resolver.set(principal, set);

        let found = resolver.permissions_of(principal).await.unwrap().unwrap();
        assert!(found.contains("device:read:self"));
    }
}
