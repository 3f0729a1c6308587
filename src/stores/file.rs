//! Write a certificate to disk as a PEM file.
//!
//! Used by the NSS backend for its mirror directory. Not a selectable store on
//! its own: nothing ever sweeps files written here except the NSS backend.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::certificate::{pem_encode, PEM_CERTIFICATE_LABEL};
use crate::errors::{CertInjectError, Result};

/// Write `der_bytes` wrapped in a `CERTIFICATE` PEM envelope to `path`.
///
/// Overwrites any existing file, which also refreshes its modification time.
pub fn write_pem_file(der_bytes: &[u8], path: &Path) -> Result<()> {
    let pem = pem_encode(PEM_CERTIFICATE_LABEL, der_bytes);
    fs::write(path, pem).map_err(|e| {
        CertInjectError::Io(std::io::Error::new(
            e.kind(),
            format!("writing cert {}: {}", path.display(), e),
        ))
    })?;
    debug!(path = %path.display(), "Wrote certificate PEM file");
    Ok(())
}
