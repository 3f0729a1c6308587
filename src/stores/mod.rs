//! Trust store backends
//!
//! Every backend implements [`TrustStore`] and only ever removes entries it
//! can prove it created:
//!
//! - **NSS**: PEM mirror directory plus an NSS shared database driven by `certutil`
//! - **CryptoAPI**: Windows registry-backed physical stores
//!
//! [`TrustStoreDispatcher`] routes inject and clean calls to the stores
//! selected in configuration.

pub mod backend;
pub mod cryptoapi;
pub mod dispatcher;
pub mod expiry;
pub mod file;
pub mod nss;

pub use backend::{TrustStore, TrustStoreType};
pub use cryptoapi::{CryptoApiStore, MemoryHive};
pub use dispatcher::TrustStoreDispatcher;
pub use expiry::{Clock, ExpiryPolicy, ManualClock, SystemClock};
pub use nss::{CertDatabaseTool, Certutil, NssStore};
