//! # Configuration Settings
//!
//! Defines the configuration structure for certificate injection.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::errors::{CertInjectError, Result};
use crate::stores::cryptoapi::PhysicalStore;
use crate::stores::TrustStoreType;

/// Default staleness threshold: 30 minutes
pub const DEFAULT_EXPIRE_SECONDS: u64 = 60 * 30;

/// Main injection configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct InjectConfig {
    /// Trust stores to inject into and clean, in order
    pub stores: Vec<TrustStoreType>,

    /// Seconds after which an injected certificate is considered stale
    #[validate(range(
        min = 1,
        max = 31_536_000,
        message = "Expire seconds must be between 1 and 31536000"
    ))]
    pub expire_seconds: u64,

    /// CryptoAPI backend configuration
    #[validate(nested)]
    pub cryptoapi: CryptoApiConfig,

    /// NSS backend configuration
    #[validate(nested)]
    pub nss: NssConfig,

    /// Observability configuration
    #[validate(nested)]
    pub observability: ObservabilityConfig,
}

impl Default for InjectConfig {
    fn default() -> Self {
        Self {
            stores: Vec::new(),
            expire_seconds: DEFAULT_EXPIRE_SECONDS,
            cryptoapi: CryptoApiConfig::default(),
            nss: NssConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl InjectConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(CertInjectError::from)?;

        self.validate_custom()?;

        Ok(())
    }

    /// Checks that depend on which stores are selected
    fn validate_custom(&self) -> Result<()> {
        if self.stores.contains(&TrustStoreType::Nss) {
            if self.nss.cert_dir.as_os_str().is_empty() {
                return Err(CertInjectError::config("Empty nsscertdir configuration."));
            }
            if self.nss.db_dir.as_os_str().is_empty() {
                return Err(CertInjectError::config("Empty nssdbdir configuration."));
            }
        }

        if self.stores.contains(&TrustStoreType::CryptoApi) {
            PhysicalStore::from_name(&self.cryptoapi.scope)?;
        }

        Ok(())
    }
}

/// CryptoAPI registry store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CryptoApiConfig {
    /// Physical store: current-user, system, enterprise or group-policy
    #[validate(length(min = 1, message = "CryptoAPI scope cannot be empty"))]
    pub scope: String,

    /// Logical store inside the physical store
    #[validate(custom(function = "validate_logical_store"))]
    pub logical_store: String,
}

impl Default for CryptoApiConfig {
    fn default() -> Self {
        Self { scope: "system".to_string(), logical_store: "Root".to_string() }
    }
}

/// Logical store names become a registry path segment
pub fn validate_logical_store(name: &str) -> std::result::Result<(), ValidationError> {
    if name.is_empty() || name.contains('\\') {
        let mut error = ValidationError::new("logical_store");
        error.message = Some("Logical store must be a single non-empty registry key name".into());
        return Err(error);
    }
    Ok(())
}

/// NSS database store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct NssConfig {
    /// Directory holding the PEM mirror files
    pub cert_dir: PathBuf,

    /// NSS shared database directory (passed as `sql:<dir>`)
    pub db_dir: PathBuf,

    /// certutil executable
    pub certutil_path: PathBuf,

    /// Sleep between retries of a transient certutil failure
    #[validate(range(max = 60_000, message = "Retry delay must be at most 60000 ms"))]
    pub retry_delay_ms: u64,

    /// Retries of a transient import failure; `None` retries until it succeeds
    pub inject_max_retries: Option<u32>,

    /// Retries of a transient delete failure during clean
    #[validate(range(max = 100, message = "Clean retries must be at most 100"))]
    pub clean_retries: u32,
}

impl Default for NssConfig {
    fn default() -> Self {
        Self {
            cert_dir: PathBuf::new(),
            db_dir: PathBuf::new(),
            certutil_path: PathBuf::from("certutil"),
            retry_delay_ms: 1,
            inject_max_retries: None,
            clean_retries: 1,
        }
    }
}

impl NssConfig {
    /// Retry delay as Duration
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Observability configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level used when RUST_LOG is not set
    #[validate(custom(function = "validate_log_level"))]
    pub log_level: String,

    /// Emit logs as JSON lines
    pub json_logging: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { log_level: "info".to_string(), json_logging: false }
    }
}

pub fn validate_log_level(level: &str) -> std::result::Result<(), ValidationError> {
    match level.to_ascii_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => {
            let mut error = ValidationError::new("log_level");
            error.message = Some("Log level must be one of trace, debug, info, warn, error".into());
            Err(error)
        }
    }
}
