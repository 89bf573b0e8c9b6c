//! Market state snapshots
//!
//! A snapshot captures the full mutable state of a market (ledger,
//! sessions, asset registry, replay nonces) alongside a SHA-256 hash of
//! its static configuration. Restore validates the hash so state is
//! never rehydrated under a different configuration.
//!
//! The event log is not part of the snapshot: it is an audit artifact,
//! not reconstructable input state.

use crate::auth::ActionType;
use crate::ledger::FundPoolLedger;
use crate::market::AssetConfig;
use crate::models::Symbol;
use crate::session::engine::SessionEngine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors from snapshot capture and restore
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("config hash mismatch: snapshot {snapshot}, live {live}")]
    ConfigMismatch { snapshot: String, live: String },

    #[error("snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Complete mutable market state plus the config hash it was captured
/// under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// SHA-256 of the canonical static configuration.
    pub config_hash: String,

    pub ledger: FundPoolLedger,
    pub engine: SessionEngine,
    pub assets: Vec<(Symbol, AssetConfig)>,
    pub nonces: Vec<(Symbol, ActionType, u64)>,
}

/// Deterministic SHA-256 hash of a serializable configuration.
///
/// Canonicalizes through a sorted-key JSON rendering so the hash does
/// not depend on map iteration order.
pub fn compute_config_hash<T: Serialize>(config: &T) -> Result<String, SnapshotError> {
    use serde_json::Value;
    use std::collections::BTreeMap;

    fn canonicalize(value: Value) -> Value {
        match value {
            Value::Object(map) => {
                let sorted: BTreeMap<String, Value> =
                    map.into_iter().map(|(k, v)| (k, canonicalize(v))).collect();
                Value::Object(sorted.into_iter().collect())
            }
            Value::Array(arr) => Value::Array(arr.into_iter().map(canonicalize).collect()),
            other => other,
        }
    }

    let value = serde_json::to_value(config)?;
    let json = serde_json::to_string(&canonicalize(value))?;

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}
