//! CryptoAPI trust store backend
//!
//! Certificates are written straight into the registry layout that backs the
//! Windows system certificate stores:
//!
//! ```text
//! <root>\<physical>\<logical>\Certificates\<UPPERHEX-SHA1>
//!     Namecoin = DWORD 1          (ownership marker)
//!     Blob     = REG_BINARY       (stripped certificate registry blob)
//! ```
//!
//! Expiry uses the key's last-write time; entries without the marker are
//! never touched.

pub mod hive;
pub mod memory;
#[cfg(windows)]
pub mod windows;

use std::fmt;
use std::io;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::certificate::Certificate;
use crate::config::CryptoApiConfig;
use crate::errors::{CertInjectError, Result};
use crate::store_span;
use crate::stores::backend::{TrustStore, TrustStoreType};
use crate::stores::expiry::{Clock, ExpiryPolicy, SystemClock};

pub use hive::{RegistryHive, RegistryKey, RootKey};
pub use memory::{MemoryHive, MemoryKey, RegistryValue};
#[cfg(windows)]
pub use windows::WindowsRegistry;

/// Name of the DWORD value marking a key as ours
pub const MARKER_VALUE_NAME: &str = "Namecoin";

/// Expected content of the marker value
pub const MARKER_VALUE: u32 = 1;

/// Name of the binary value holding the certificate blob
pub const BLOB_VALUE_NAME: &str = "Blob";

/// Physical scopes that can be selected by name
pub const PHYSICAL_STORE_NAMES: [&str; 4] = ["current-user", "system", "enterprise", "group-policy"];

/// Registry root and path prefix of a physical store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicalStore {
    pub root: RootKey,
    pub physical: &'static str,
}

impl PhysicalStore {
    /// Look up a physical store by its configuration name
    pub fn from_name(name: &str) -> Result<Self> {
        let (root, physical) = match name {
            "current-user" => (RootKey::CurrentUser, r"SOFTWARE\Microsoft\SystemCertificates"),
            "system" => (RootKey::LocalMachine, r"SOFTWARE\Microsoft\SystemCertificates"),
            "enterprise" => (RootKey::LocalMachine, r"SOFTWARE\Microsoft\EnterpriseCertificates"),
            "group-policy" => (RootKey::LocalMachine, r"SOFTWARE\Policies\SystemCertificates"),
            _ => return Err(CertInjectError::UnknownPhysicalStore(name.to_string())),
        };
        Ok(Self { root, physical })
    }

    /// Resolve the certificates key of `logical_store` inside this physical store
    pub fn location(&self, logical_store: &str) -> StoreLocation {
        StoreLocation {
            root: self.root,
            key_path: format!(r"{}\{}\Certificates", self.physical, logical_store),
        }
    }
}

/// Fully resolved registry key of a logical store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLocation {
    pub root: RootKey,
    pub key_path: String,
}

impl fmt::Display for StoreLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, r"{}\{}", self.root, self.key_path)
    }
}

/// Resolve the configured scope and logical store to a registry location
pub fn resolve_store(config: &CryptoApiConfig) -> Result<StoreLocation> {
    Ok(PhysicalStore::from_name(&config.scope)?.location(&config.logical_store))
}

/// Registry-backed CryptoAPI trust store
pub struct CryptoApiStore<H: RegistryHive> {
    hive: H,
    config: CryptoApiConfig,
    expiry: ExpiryPolicy,
    clock: Arc<dyn Clock>,
}

impl<H: RegistryHive> fmt::Debug for CryptoApiStore<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CryptoApiStore")
            .field("hive", &self.hive)
            .field("scope", &self.config.scope)
            .field("logical_store", &self.config.logical_store)
            .field("expiry", &self.expiry)
            .finish()
    }
}

impl<H: RegistryHive> CryptoApiStore<H> {
    pub fn new(hive: H, config: CryptoApiConfig, expiry: ExpiryPolicy) -> Self {
        Self { hive, config, expiry, clock: Arc::new(SystemClock) }
    }

    /// Replace the clock used to judge staleness
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn hive(&self) -> &H {
        &self.hive
    }

    fn open_store(&self) -> Result<(StoreLocation, H::Key)> {
        let location = resolve_store(&self.config)?;
        let key = self
            .hive
            .open_key(location.root, &location.key_path)
            .map_err(|e| CertInjectError::registry(format!("couldn't open cert store {}", location), e))?;
        Ok((location, key))
    }

    /// Whether the entry named `name` is ours and stale.
    ///
    /// Open and metadata failures are errors; a missing or foreign marker
    /// only means the entry is not ours.
    fn check_expired(&self, store_key: &H::Key, name: &str) -> Result<bool> {
        let cert_key = store_key
            .open_subkey(name)
            .map_err(|e| CertInjectError::registry(format!("couldn't open cert registry key {}", name), e))?;

        match cert_key.get_dword(MARKER_VALUE_NAME) {
            Ok(MARKER_VALUE) => {}
            Ok(other) => {
                debug!(entry = %name, marker = other, "Skipping certificate with unrecognised marker");
                return Ok(false);
            }
            Err(_) => {
                debug!(entry = %name, "Skipping certificate without marker");
                return Ok(false);
            }
        }

        let modified = cert_key.last_write_time().map_err(|e| {
            CertInjectError::registry(format!("couldn't read metadata for cert registry key {}", name), e)
        })?;

        let now = self.clock.now();
        let expired = self.expiry.is_expired(now, modified);
        debug!(
            entry = %name,
            age_seconds = ExpiryPolicy::age(now, modified).num_seconds(),
            expired,
            "Checked certificate age"
        );
        Ok(expired)
    }
}

impl<H: RegistryHive> TrustStore for CryptoApiStore<H> {
    fn inject(&self, der_bytes: &[u8]) -> Result<()> {
        let _span = store_span!("inject", TrustStoreType::CryptoApi).entered();

        let cert = Certificate::from_bytes(der_bytes)?;
        let (location, store_key) = self.open_store()?;

        // CryptoAPI identifies certificates by uppercase hex SHA-1
        let name = cert.fingerprint_hex().to_uppercase();

        let cert_key = store_key.create_subkey(&name).map_err(|e| {
            CertInjectError::registry(format!("couldn't create registry key for certificate {}", name), e)
        })?;

        // Re-opening an existing key keeps its last-write time, so drop and
        // rewrite the marker to make a re-injected certificate look fresh.
        match cert_key.delete_value(MARKER_VALUE_NAME) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(CertInjectError::registry(
                    format!("couldn't reset marker registry value for certificate {}", name),
                    e,
                ))
            }
        }

        cert_key.set_dword(MARKER_VALUE_NAME, MARKER_VALUE).map_err(|e| {
            CertInjectError::registry(format!("couldn't set marker registry value for certificate {}", name), e)
        })?;

        cert_key.set_binary(BLOB_VALUE_NAME, &cert.to_registry_blob()).map_err(|e| {
            CertInjectError::registry(format!("couldn't set blob registry value for certificate {}", name), e)
        })?;

        info!(store = %location, fingerprint = %name, "Injected certificate into CryptoAPI store");
        Ok(())
    }

    fn clean(&self) -> Result<()> {
        let _span = store_span!("clean", TrustStoreType::CryptoApi).entered();

        let (location, store_key) = self.open_store()?;

        let names = store_key.subkey_names().map_err(|e| {
            CertInjectError::registry(format!("couldn't list certs in cert store {}", location), e)
        })?;

        let mut removed = 0usize;
        for name in names {
            if !self.check_expired(&store_key, &name)? {
                continue;
            }

            match store_key.delete_subkey(&name) {
                Ok(()) => {
                    removed += 1;
                    info!(store = %location, fingerprint = %name, "Removed expired certificate");
                }
                Err(e) => {
                    warn!(store = %location, fingerprint = %name, error = %e, "Couldn't delete expired cert");
                }
            }
        }

        debug!(store = %location, removed, "CryptoAPI sweep finished");
        Ok(())
    }

    fn store_type(&self) -> TrustStoreType {
        TrustStoreType::CryptoApi
    }
}
