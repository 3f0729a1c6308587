//! NSS trust store backend
//!
//! Certificates are mirrored as PEM files in a directory owned by this
//! process and imported into an NSS shared database with `certutil`. The
//! mirror file's modification time is the only record of when a certificate
//! was last injected, so sweeps walk the mirror directory rather than the
//! database.

pub mod certutil;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::certificate::Certificate;
use crate::config::NssConfig;
use crate::errors::{CertInjectError, Result};
use crate::store_span;
use crate::stores::backend::{TrustStore, TrustStoreType};
use crate::stores::expiry::{Clock, ExpiryPolicy, SystemClock};
use crate::stores::file::write_pem_file;

pub use certutil::{CertDatabaseTool, Certutil, ToolOutcome, ToolOutput};

/// Prefix of every nickname this backend creates in the NSS database
pub const NICKNAME_PREFIX: &str = "Namecoin-";

/// Extension of mirror files
pub const MIRROR_FILE_SUFFIX: &str = ".pem";

/// NSS nickname for a certificate identified by its SHA-256 hex
pub fn nickname_from_fingerprint_hex(fingerprint_hex: &str) -> String {
    format!("{}{}", NICKNAME_PREFIX, fingerprint_hex)
}

/// Mirror file name for a certificate identified by its SHA-256 hex
pub fn mirror_file_name(fingerprint_hex: &str) -> String {
    format!("{}{}", fingerprint_hex, MIRROR_FILE_SUFFIX)
}

/// Recover the SHA-256 hex from a mirror file name.
///
/// Returns `None` for anything this backend would not have written.
pub fn fingerprint_from_file_name(file_name: &str) -> Option<&str> {
    let hex = file_name.strip_suffix(MIRROR_FILE_SUFFIX)?;
    let owned = hex.len() == 64 && hex.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
    owned.then_some(hex)
}

/// How a database delete ended for one entry
enum DeleteOutcome {
    Deleted,
    AlreadyAbsent,
    /// Transient failure that outlived its retries; the mirror file stays
    RetryFailed(CertInjectError),
}

/// NSS shared-database trust store
#[derive(Debug)]
pub struct NssStore<T: CertDatabaseTool> {
    tool: T,
    config: NssConfig,
    expiry: ExpiryPolicy,
    clock: Arc<dyn Clock>,
}

impl NssStore<Certutil> {
    /// Store driving the `certutil` binary named in the configuration
    pub fn with_certutil(config: NssConfig, expiry: ExpiryPolicy) -> Self {
        let tool = Certutil::new(config.certutil_path.clone());
        Self::new(tool, config, expiry)
    }
}

impl<T: CertDatabaseTool> NssStore<T> {
    pub fn new(tool: T, config: NssConfig, expiry: ExpiryPolicy) -> Self {
        Self { tool, config, expiry, clock: Arc::new(SystemClock) }
    }

    /// Replace the clock used to judge staleness
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn tool(&self) -> &T {
        &self.tool
    }

    fn directories(&self) -> Result<(&Path, &Path)> {
        if self.config.cert_dir.as_os_str().is_empty() {
            return Err(CertInjectError::config("Empty nsscertdir configuration."));
        }
        if self.config.db_dir.as_os_str().is_empty() {
            return Err(CertInjectError::config("Empty nssdbdir configuration."));
        }
        Ok((&self.config.cert_dir, &self.config.db_dir))
    }

    /// Path of the mirror file for `cert`
    pub fn mirror_path(&self, cert: &Certificate) -> PathBuf {
        self.config.cert_dir.join(mirror_file_name(&cert.sha256_hex()))
    }

    fn is_expired(&self, modified: DateTime<Utc>) -> bool {
        let now = self.clock.now();
        let expired = self.expiry.is_expired(now, modified);
        debug!(
            age_seconds = ExpiryPolicy::age(now, modified).num_seconds(),
            expired,
            "Checked certificate age"
        );
        expired
    }

    fn delete_from_database(&self, db_dir: &Path, nickname: &str) -> Result<DeleteOutcome> {
        let args = certutil::delete_args(db_dir, nickname);
        let mut output = self.tool.run(&args)?;
        let mut retries = 0u32;

        loop {
            match output.classify() {
                ToolOutcome::Success => return Ok(DeleteOutcome::Deleted),
                ToolOutcome::AlreadyAbsent => {
                    warn!(
                        nickname,
                        "Tried to delete certificate from NSS database, but the certificate was already not present in NSS database"
                    );
                    return Ok(DeleteOutcome::AlreadyAbsent);
                }
                ToolOutcome::Transient if retries < self.config.clean_retries => {
                    retries += 1;
                    warn!(
                        nickname,
                        retry = retries,
                        delay_ms = self.config.retry_delay_ms,
                        "Temporary SEC_ERROR_PKCS11_GENERAL_ERROR deleting certificate from NSS database; retrying"
                    );
                    thread::sleep(self.config.retry_delay());
                    output = match self.tool.run(&args) {
                        Ok(output) => output,
                        Err(e) => return Ok(DeleteOutcome::RetryFailed(e)),
                    };
                }
                ToolOutcome::Transient => {
                    return Ok(DeleteOutcome::RetryFailed(CertInjectError::transient(
                        format!("deleting cert {} from NSS database", nickname),
                        retries + 1,
                        output.combined,
                    )));
                }
                ToolOutcome::Failed if retries > 0 => {
                    return Ok(DeleteOutcome::RetryFailed(CertInjectError::tool(
                        format!("deleting cert {} from NSS database", nickname),
                        output.status,
                        output.combined,
                    )));
                }
                ToolOutcome::Failed => {
                    return Err(CertInjectError::tool(
                        format!("deleting cert {} from NSS database", nickname),
                        output.status,
                        output.combined,
                    ));
                }
            }
        }
    }
}

impl<T: CertDatabaseTool> TrustStore for NssStore<T> {
    fn inject(&self, der_bytes: &[u8]) -> Result<()> {
        let _span = store_span!("inject", TrustStoreType::Nss).entered();

        let (_, db_dir) = self.directories()?;
        let cert = Certificate::from_bytes(der_bytes)?;

        let fingerprint_hex = cert.sha256_hex();
        let path = self.mirror_path(&cert);
        let nickname = nickname_from_fingerprint_hex(&fingerprint_hex);
        let args = certutil::import_args(db_dir, &nickname, &path);

        let mut retries = 0u32;
        loop {
            write_pem_file(cert.raw(), &path)?;

            let output = self.tool.run(&args)?;
            match output.classify() {
                ToolOutcome::Success => {
                    info!(nickname = %nickname, path = %path.display(), "Injected certificate into NSS database");
                    return Ok(());
                }
                ToolOutcome::Transient => {
                    if let Some(max) = self.config.inject_max_retries {
                        if retries >= max {
                            return Err(CertInjectError::transient(
                                "injecting cert to NSS database",
                                retries + 1,
                                output.combined,
                            ));
                        }
                    }
                    retries += 1;
                    warn!(
                        nickname = %nickname,
                        retry = retries,
                        delay_ms = self.config.retry_delay_ms,
                        "Temporary SEC_ERROR_PKCS11_GENERAL_ERROR injecting certificate to NSS database; retrying"
                    );
                    thread::sleep(self.config.retry_delay());
                }
                ToolOutcome::AlreadyAbsent | ToolOutcome::Failed => {
                    return Err(CertInjectError::tool(
                        "injecting cert to NSS database",
                        output.status,
                        output.combined,
                    ));
                }
            }
        }
    }

    fn clean(&self) -> Result<()> {
        let _span = store_span!("clean", TrustStoreType::Nss).entered();

        let (cert_dir, db_dir) = self.directories()?;

        let entries = fs::read_dir(cert_dir).map_err(|e| {
            CertInjectError::Io(std::io::Error::new(
                e.kind(),
                format!("Error enumerating files in cert directory {}: {}", cert_dir.display(), e),
            ))
        })?;

        let mut errors = Vec::new();
        let mut removed = 0usize;

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    errors.push(CertInjectError::Io(e));
                    continue;
                }
            };

            let file_name = entry.file_name();
            let Some(fingerprint_hex) = file_name.to_str().and_then(fingerprint_from_file_name) else {
                debug!(file = ?file_name, "Skipping file outside the mirror naming convention");
                continue;
            };

            let modified = match entry.metadata().and_then(|m| {
                if m.is_file() {
                    m.modified().map(Some)
                } else {
                    Ok(None)
                }
            }) {
                Ok(Some(modified)) => DateTime::<Utc>::from(modified),
                Ok(None) => continue,
                Err(e) => {
                    errors.push(CertInjectError::Io(std::io::Error::new(
                        e.kind(),
                        format!("Error checking if NSS cert is expired: {}", e),
                    )));
                    continue;
                }
            };

            if !self.is_expired(modified) {
                continue;
            }

            let nickname = nickname_from_fingerprint_hex(fingerprint_hex);
            match self.delete_from_database(db_dir, &nickname)? {
                DeleteOutcome::Deleted | DeleteOutcome::AlreadyAbsent => {}
                DeleteOutcome::RetryFailed(e) => {
                    // Leave the mirror file so the next sweep tries again
                    errors.push(e);
                    continue;
                }
            }

            fs::remove_file(entry.path()).map_err(|e| {
                CertInjectError::Io(std::io::Error::new(
                    e.kind(),
                    format!("Error deleting NSS cert from filesystem: {}", e),
                ))
            })?;
            removed += 1;
            info!(nickname = %nickname, "Removed expired certificate from NSS database");
        }

        debug!(removed, failed = errors.len(), "NSS sweep finished");

        if !errors.is_empty() {
            return Err(CertInjectError::Aggregate(errors));
        }
        Ok(())
    }

    fn store_type(&self) -> TrustStoreType {
        TrustStoreType::Nss
    }
}
