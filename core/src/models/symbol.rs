//! Interned 16-byte identifier
//!
//! Funds, assets and account identities are opaque fixed-width symbols,
//! not display strings. Equality and hashing are byte-wise; the printable
//! form exists only for logs and serialization.
//!
//! CRITICAL: Symbols are value types (Copy); never allocate per lookup.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Width of every identifier in the system (bytes).
pub const SYMBOL_LEN: usize = 16;

/// Errors from constructing a [`Symbol`]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SymbolError {
    #[error("symbol is empty")]
    Empty,

    #[error("symbol longer than {SYMBOL_LEN} bytes: {len}")]
    TooLong { len: usize },

    #[error("symbol contains a non-printable or non-ascii byte")]
    InvalidByte,
}

/// Opaque 16-byte identifier for funds, assets and accounts.
///
/// Shorter names are zero-padded on the right, so `Symbol::new("BTC")`
/// and the 16-byte form compare equal.
///
/// # Example
/// ```
/// use option_pool_core_rs::Symbol;
///
/// let a = Symbol::new("BTC_USD").unwrap();
/// let b = Symbol::new("BTC_USD").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.to_string(), "BTC_USD");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol([u8; SYMBOL_LEN]);

impl Symbol {
    /// Intern an ascii name (1..=16 printable bytes).
    pub fn new(name: &str) -> Result<Self, SymbolError> {
        let bytes = name.as_bytes();
        if bytes.is_empty() {
            return Err(SymbolError::Empty);
        }
        if bytes.len() > SYMBOL_LEN {
            return Err(SymbolError::TooLong { len: bytes.len() });
        }
        if bytes.iter().any(|b| !b.is_ascii_graphic()) {
            return Err(SymbolError::InvalidByte);
        }
        let mut buf = [0u8; SYMBOL_LEN];
        buf[..bytes.len()].copy_from_slice(bytes);
        Ok(Self(buf))
    }

    /// Raw 16-byte form.
    pub fn as_bytes(&self) -> &[u8; SYMBOL_LEN] {
        &self.0
    }

    fn name(&self) -> &str {
        let end = self
            .0
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(SYMBOL_LEN);
        // Constructor guarantees ascii
        std::str::from_utf8(&self.0[..end]).unwrap_or("")
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Symbol {
    type Err = SymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for Symbol {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Symbol {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Symbol::new(&s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_and_display() {
        let s = Symbol::new("USDT_POOL").unwrap();
        assert_eq!(s.to_string(), "USDT_POOL");
        assert_eq!(s.as_bytes()[9], 0); // zero-padded
    }

    #[test]
    fn test_padding_is_canonical() {
        let a = Symbol::new("ETH").unwrap();
        let b: Symbol = "ETH".parse().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert_eq!(Symbol::new(""), Err(SymbolError::Empty));
        assert_eq!(
            Symbol::new("ABCDEFGHIJKLMNOPQ"),
            Err(SymbolError::TooLong { len: 17 })
        );
        assert_eq!(Symbol::new("A B"), Err(SymbolError::InvalidByte));
    }

    #[test]
    fn test_serde_round_trip() {
        let s = Symbol::new("BTC_USD").unwrap();
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, "\"BTC_USD\"");
        let back: Symbol = serde_json::from_str(&json).unwrap();
        assert_eq!(s, back);
    }
}
