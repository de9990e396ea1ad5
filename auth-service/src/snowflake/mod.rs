//! # Snowflake ID Generator
//!
//! Produces globally unique, time-ordered 64-bit principal ids:
//! 41-bit relative timestamp | 5-bit datacenter | 5-bit worker | 12-bit
//! sequence. Every generated id is appended to the audit store with its
//! principal kind and node label.
//!
//! ## Ordering invariant
//!
//! For any two ids generated by the same process, the later one is >= the
//! earlier one. The (last_timestamp, sequence) pair is the only shared
//! mutable state and is guarded by a single mutex; a wall clock running
//! backwards is a hard error, never silently tolerated.

use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

use shared::config::SnowflakeConfig;
use shared::constants::*;
use shared::error::{AuthError, AuthResult};
use shared::types::{IdRecord, PrincipalId, PrincipalKind};

use crate::store::AuditStore;

/// Mutable generator state, single-writer by construction
struct GeneratorState {
    last_timestamp: i64,
    sequence: i64,
}

/// Snowflake id generator with audit side channel
pub struct SnowflakeIdGenerator {
    datacenter_id: i64,
    worker_id: i64,
    node: String,
    audit: Arc<dyn AuditStore>,
    state: Mutex<GeneratorState>,
}

impl SnowflakeIdGenerator {
    /// Create a generator, failing fast on out-of-range configuration
    pub fn new(config: &SnowflakeConfig, audit: Arc<dyn AuditStore>) -> AuthResult<Self> {
        config.validate()?;

        info!(
            datacenter_id = config.datacenter_id,
            worker_id = config.worker_id,
            node = %config.node,
            "Initializing snowflake id generator"
        );

        Ok(Self {
            datacenter_id: config.datacenter_id,
            worker_id: config.worker_id,
            node: config.node.clone(),
            audit,
            state: Mutex::new(GeneratorState {
                last_timestamp: -1,
                sequence: 0,
            }),
        })
    }

    /// Generate the next id for a principal kind and persist an audit row.
    ///
    /// An audit write failure is logged and swallowed; the already-computed
    /// id is still returned.
    pub async fn next_id(&self, kind: PrincipalKind) -> AuthResult<PrincipalId> {
        let id = self.generate()?;

        let record = IdRecord {
            id,
            kind,
            node: self.node.clone(),
            created_at: Utc::now(),
        };
        if let Err(err) = self.audit.record(record).await {
            warn!(id, kind = %kind, error = %err, "Audit write failed for generated id");
        }

        debug!(id, kind = %kind, "Generated principal id");
        Ok(PrincipalId(id))
    }

    /// Compose the next raw id under the generator lock
    fn generate(&self) -> AuthResult<i64> {
        let mut state = self.state.lock();

        let mut timestamp = current_millis();
        if timestamp < state.last_timestamp {
            return Err(AuthError::ClockRegression {
                behind_ms: state.last_timestamp - timestamp,
            });
        }

        if timestamp == state.last_timestamp {
            state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if state.sequence == 0 {
                // Sequence exhausted within this millisecond
                timestamp = wait_next_millis(state.last_timestamp);
            }
        } else {
            state.sequence = 0;
        }

        state.last_timestamp = timestamp;

        Ok(((timestamp - SNOWFLAKE_EPOCH_MS) << TIMESTAMP_SHIFT)
            | (self.datacenter_id << DATACENTER_ID_SHIFT)
            | (self.worker_id << WORKER_ID_SHIFT)
            | state.sequence)
    }
}

fn current_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Spin until the clock advances past `last_timestamp`
fn wait_next_millis(last_timestamp: i64) -> i64 {
    let mut timestamp = current_millis();
    while timestamp <= last_timestamp {
        std::hint::spin_loop();
        timestamp = current_millis();
    }
    timestamp
}
