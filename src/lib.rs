//! # certinject
//!
//! Injects dynamically minted TLS certificates into operating-system trust
//! stores and later sweeps out the ones that have gone stale.
//!
//! ## Architecture
//!
//! ```text
//! caller -> TrustStoreDispatcher -> TrustStore backend -> Certificate -> OS store / certutil
//! ```
//!
//! ## Core Components
//!
//! - **Certificate**: DER/PEM decoding, SHA-1 and SHA-256 identities, registry blob encoding
//! - **CryptoAPI store**: registry-backed Windows physical stores, ownership marked per entry
//! - **NSS store**: PEM mirror directory plus an NSS shared database driven by `certutil`
//! - **Dispatcher**: routes inject and clean to the stores enabled in configuration
//!
//! Entries carry no expiry of their own. A store entry is stale once its
//! last-modified time is more than `expire_seconds` away from now, and only
//! entries the store can prove it created are ever removed.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use certinject::{InjectConfig, Result, TrustStoreDispatcher};
//!
//! fn main() -> Result<()> {
//!     let config = InjectConfig::load(None)?;
//!     let dispatcher = TrustStoreDispatcher::from_config(&config)?;
//!     let der = std::fs::read("example.bit.der")?;
//!     dispatcher.inject(&der)?;
//!     dispatcher.clean()
//! }
//! ```

pub mod certificate;
pub mod cli;
pub mod config;
pub mod errors;
pub mod observability;
pub mod stores;

// Re-export commonly used types and traits
pub use certificate::Certificate;
pub use config::InjectConfig;
pub use errors::{CertInjectError, ErrorKind, Result};
pub use stores::{TrustStore, TrustStoreDispatcher, TrustStoreType};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
