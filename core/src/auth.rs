//! Request authentication and replay protection
//!
//! Privileged user actions arrive with an off-system signature over a
//! canonical SHA-256 digest of the request. This module verifies the
//! signature against the configured signer, enforces an effective-time
//! deadline and a strictly-increasing nonce per (caller, action) pair.
//!
//! The signature scheme itself is out of scope and sits behind
//! [`SignatureScheme`]; [`KeyedScheme`] is the in-memory reference
//! implementation.
//!
//! Verification is two-phase so the nonce only persists when the whole
//! transaction succeeds: [`AuthService::verify`] returns a
//! [`NonceUpdate`] and [`AuthService::apply`] commits it.

use crate::models::{Symbol, Timestamp};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use thiserror::Error;

/// Errors from request verification
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("signature does not recover to the configured signer")]
    InvalidSignature,

    #[error("request expired: effective until {effective_time}, now {now}")]
    Expired {
        effective_time: Timestamp,
        now: Timestamp,
    },

    #[error("nonce {nonce} replayed: high-water mark {high_water}")]
    Replayed { nonce: u64, high_water: u64 },
}

/// Nonce partition. Each action type carries an independent
/// high-water mark per caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionType {
    PlaceOrder,
    Exercise,
    WinningWithdraw,
    LpCashWithdraw,
    LpRewardWithdraw,
    ReferralWithdraw,
}

impl ActionType {
    fn tag(self) -> u8 {
        match self {
            ActionType::PlaceOrder => 1,
            ActionType::Exercise => 2,
            ActionType::WinningWithdraw => 3,
            ActionType::LpCashWithdraw => 4,
            ActionType::LpRewardWithdraw => 5,
            ActionType::ReferralWithdraw => 6,
        }
    }
}

/// Recovers the signing identity from a digest and signature. Returns
/// `None` when the signature is malformed or unverifiable.
pub trait SignatureScheme: std::fmt::Debug {
    fn recover(&self, digest: &[u8; 32], signature: &[u8]) -> Option<Symbol>;
}

/// Keyed reference scheme: the signature is the SHA-256 of a shared
/// secret concatenated with the digest.
#[derive(Debug, Clone)]
pub struct KeyedScheme {
    signer: Symbol,
    secret: Vec<u8>,
}

impl KeyedScheme {
    pub fn new(signer: Symbol, secret: impl Into<Vec<u8>>) -> Self {
        Self {
            signer,
            secret: secret.into(),
        }
    }

    /// Produce a signature the scheme will recover. Used by callers
    /// that hold the secret (tests, local tooling).
    pub fn sign(&self, digest: &[u8; 32]) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(&self.secret);
        hasher.update(digest);
        hasher.finalize().to_vec()
    }
}

impl SignatureScheme for KeyedScheme {
    fn recover(&self, digest: &[u8; 32], signature: &[u8]) -> Option<Symbol> {
        if self.sign(digest) == signature {
            Some(self.signer)
        } else {
            None
        }
    }
}

/// A verified nonce advance, committed only when the enclosing
/// transaction succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NonceUpdate {
    caller: Symbol,
    action: ActionType,
    nonce: u64,
}

/// Canonical request digest: action tag, caller, effective time, nonce
/// and the action-specific message bytes, hashed with SHA-256.
pub fn request_digest(
    action: ActionType,
    caller: Symbol,
    effective_time: Timestamp,
    nonce: u64,
    message: &[u8],
) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update([action.tag()]);
    hasher.update(caller.as_bytes());
    hasher.update(effective_time.to_le_bytes());
    hasher.update(nonce.to_le_bytes());
    hasher.update(message);
    hasher.finalize().into()
}

/// Signature verification plus per-(caller, action) replay protection.
#[derive(Debug)]
pub struct AuthService {
    signer: Symbol,
    scheme: Box<dyn SignatureScheme>,
    nonces: HashMap<(Symbol, ActionType), u64>,
}

impl AuthService {
    pub fn new(signer: Symbol, scheme: Box<dyn SignatureScheme>) -> Self {
        Self {
            signer,
            scheme,
            nonces: HashMap::new(),
        }
    }

    pub fn signer(&self) -> Symbol {
        self.signer
    }

    pub fn high_water(&self, caller: Symbol, action: ActionType) -> u64 {
        self.nonces.get(&(caller, action)).copied().unwrap_or(0)
    }

    pub fn nonces(&self) -> &HashMap<(Symbol, ActionType), u64> {
        &self.nonces
    }

    /// Restore replay state from a snapshot.
    pub fn restore_nonces(&mut self, nonces: HashMap<(Symbol, ActionType), u64>) {
        self.nonces = nonces;
    }

    /// Verify a signed request. Returns the nonce advance to commit
    /// via [`AuthService::apply`] once the transaction succeeds.
    pub fn verify(
        &self,
        action: ActionType,
        caller: Symbol,
        effective_time: Timestamp,
        nonce: u64,
        message: &[u8],
        signature: &[u8],
        now: Timestamp,
    ) -> Result<NonceUpdate, AuthError> {
        let digest = request_digest(action, caller, effective_time, nonce, message);
        match self.scheme.recover(&digest, signature) {
            Some(recovered) if recovered == self.signer => {}
            _ => return Err(AuthError::InvalidSignature),
        }
        if now >= effective_time {
            return Err(AuthError::Expired {
                effective_time,
                now,
            });
        }
        let high_water = self.high_water(caller, action);
        if nonce <= high_water {
            return Err(AuthError::Replayed { nonce, high_water });
        }
        Ok(NonceUpdate {
            caller,
            action,
            nonce,
        })
    }

    /// Persist a verified nonce advance.
    pub fn apply(&mut self, update: NonceUpdate) {
        self.nonces
            .insert((update.caller, update.action), update.nonce);
    }
}
