//! Trust store trait and types
//!
//! Defines the core interface shared by every trust store backend.

use crate::errors::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Type of trust store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustStoreType {
    /// NSS shared database driven through `certutil`
    Nss,
    /// Windows CryptoAPI registry-backed store
    #[serde(rename = "cryptoapi")]
    CryptoApi,
}

impl TrustStoreType {
    /// Get the configuration representation of this type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nss => "nss",
            Self::CryptoApi => "cryptoapi",
        }
    }
}

impl FromStr for TrustStoreType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "nss" => Ok(Self::Nss),
            "cryptoapi" | "capi" => Ok(Self::CryptoApi),
            _ => Err(format!("Unknown trust store type: {}", s)),
        }
    }
}

impl fmt::Display for TrustStoreType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Trait for trust store backends
///
/// Each backend owns the lifecycle of the entries it creates and must never
/// touch entries it cannot prove it owns.
pub trait TrustStore: Send + Sync + fmt::Debug {
    /// Make the given certificate (DER, or PEM-wrapped DER) trusted.
    ///
    /// Injecting the same certificate again refreshes its timestamp so that a
    /// later [`TrustStore::clean`] treats it as fresh.
    fn inject(&self, der_bytes: &[u8]) -> Result<()>;

    /// Remove every owned entry whose last-modified time is too far from now.
    fn clean(&self) -> Result<()>;

    /// Get the backend type identifier
    fn store_type(&self) -> TrustStoreType;
}
