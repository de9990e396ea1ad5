//! # Principal Directory
//!
//! The collaborator that owns principal records and checks the primary
//! credentials at login: phone + password for operators, uuid + signature
//! hash for devices. Password hashing and device key management are outside
//! the token lifecycle core; this trait is the seam they plug in behind.
//!
//! Authentication answers are deliberately `Option<PrincipalId>`: the
//! caller maps `None` to a bare unauthorized signal without learning
//! whether the principal exists.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

use shared::error::{AuthError, AuthResult};
use shared::types::PrincipalId;

/// Principal records and primary-credential checks
#[async_trait]
pub trait PrincipalDirectory: Send + Sync {
    /// Check an operator's phone + password; `None` on any mismatch
    async fn authenticate_operator(
        &self,
        phone: &str,
        password: &str,
    ) -> AuthResult<Option<PrincipalId>>;

    /// Check a device's uuid + signature hash; `None` on any mismatch
    async fn authenticate_device(
        &self,
        uuid: &str,
        signature_hash: &str,
    ) -> AuthResult<Option<PrincipalId>>;

    /// Store a new operator under a freshly generated id
    async fn register_operator(
        &self,
        id: PrincipalId,
        phone: &str,
        password: &str,
    ) -> AuthResult<()>;

    /// Store a new device under a freshly generated id
    async fn register_device(
        &self,
        id: PrincipalId,
        uuid: &str,
        signature_hash: &str,
    ) -> AuthResult<()>;
}

struct OperatorRecord {
    id: PrincipalId,
    password: String,
}

struct DeviceRecord {
    id: PrincipalId,
    signature_hash: String,
}

/// In-memory directory. Stores primary credentials verbatim; real
/// deployments put a hashing directory behind the same trait.
#[derive(Default)]
pub struct MemoryDirectory {
    operators: RwLock<HashMap<String, OperatorRecord>>,
    devices: RwLock<HashMap<String, DeviceRecord>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PrincipalDirectory for MemoryDirectory {
    async fn authenticate_operator(
        &self,
        phone: &str,
        password: &str,
    ) -> AuthResult<Option<PrincipalId>> {
        let operators = self.operators.read();
        Ok(operators
            .get(phone)
            .filter(|record| record.password == password)
            .map(|record| record.id))
    }

    async fn authenticate_device(
        &self,
        uuid: &str,
        signature_hash: &str,
    ) -> AuthResult<Option<PrincipalId>> {
        let devices = self.devices.read();
        Ok(devices
            .get(uuid)
            .filter(|record| record.signature_hash == signature_hash)
            .map(|record| record.id))
    }

    async fn register_operator(
        &self,
        id: PrincipalId,
        phone: &str,
        password: &str,
    ) -> AuthResult<()> {
        let mut operators = self.operators.write();
        if operators.contains_key(phone) {
            return Err(AuthError::Storage(format!(
                "operator already registered: {}",
                phone
            )));
        }
        debug!(principal_id = %id, "Registered operator");
        operators.insert(
            phone.to_string(),
            OperatorRecord {
                id,
                password: password.to_string(),
            },
        );
        Ok(())
    }

    async fn register_device(
        &self,
        id: PrincipalId,
        uuid: &str,
        signature_hash: &str,
    ) -> AuthResult<()> {
        let mut devices = self.devices.write();
        if devices.contains_key(uuid) {
            return Err(AuthError::Storage(format!(
                "device already registered: {}",
                uuid
            )));
        }
        debug!(principal_id = %id, "Registered device");
        devices.insert(
            uuid.to_string(),
            DeviceRecord {
                id,
                signature_hash: signature_hash.to_string(),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_operator_authentication() {
        let directory = MemoryDirectory::new();
        directory
            .register_operator(PrincipalId(1), "13800000000", "hunter2")
            .await
            .unwrap();

        assert_eq!(
            directory
                .authenticate_operator("13800000000", "hunter2")
                .await
                .unwrap(),
            Some(PrincipalId(1))
        );
        assert!(directory
            .authenticate_operator("13800000000", "wrong")
            .await
            .unwrap()
            .is_none());
        assert!(directory
            .authenticate_operator("13900000000", "hunter2")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_device_authentication() {
        let directory = MemoryDirectory::new();
        directory
            .register_device(PrincipalId(2), "dev-uuid-1", "sig-hash-1")
            .await
            .unwrap();

        assert_eq!(
            directory
                .authenticate_device("dev-uuid-1", "sig-hash-1")
                .await
                .unwrap(),
            Some(PrincipalId(2))
        );
        assert!(directory
            .authenticate_device("dev-uuid-1", "sig-hash-2")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let directory = MemoryDirectory::new();
        directory
            .register_device(PrincipalId(3), "dev-uuid", "sig")
            .await
            .unwrap();
        assert!(directory
            .register_device(PrincipalId(4), "dev-uuid", "sig")
            .await
            .is_err());
    }
}
