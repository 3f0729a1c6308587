//! # Certificate Model
//!
//! An immutable wrapper around the raw DER bytes of an X.509 certificate.
//! Identity (fingerprints) and the store-specific encodings are derived from
//! the raw bytes on demand; nothing else about the certificate is interpreted.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use pem::{EncodeConfig, LineEnding, Pem};
use ring::digest::{digest, SHA1_FOR_LEGACY_USE_ONLY};
use sha2::{Digest, Sha256};
use x509_parser::pem::parse_x509_pem;

use crate::errors::{CertInjectError, Result};

/// PEM block label accepted on input and emitted on output
pub const PEM_CERTIFICATE_LABEL: &str = "CERTIFICATE";

/// Length of the stripped registry blob header
pub const REGISTRY_BLOB_HEADER_LEN: usize = 12;

/// Property id of the encoded certificate record (`CERT_CERT_PROP_ID`)
const REGISTRY_BLOB_CERT_PROP_ID: u32 = 0x20;

/// Reserved field, always 1 in blobs written by Windows itself
const REGISTRY_BLOB_RESERVED: u32 = 0x01;

/// A parsed certificate, held as its raw DER bytes.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Certificate {
    raw: Vec<u8>,
}

impl Certificate {
    /// Parse a certificate from DER bytes, or from a single PEM `CERTIFICATE` block.
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        let der = match parse_x509_pem(buf) {
            Ok((_, pem)) => {
                if pem.label != PEM_CERTIFICATE_LABEL {
                    return Err(CertInjectError::UnexpectedPemType { label: pem.label });
                }
                pem.contents
            }
            // Not PEM, hand the bytes to the DER decoder as they are
            Err(_) => buf.to_vec(),
        };

        let (remainder, _) = x509_parser::parse_x509_certificate(&der).map_err(CertInjectError::Der)?;
        if !remainder.is_empty() {
            return Err(CertInjectError::TrailingData { len: remainder.len() });
        }

        Ok(Self { raw: der })
    }

    /// Read a whole file and parse it with [`Certificate::from_bytes`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(CertInjectError::InvalidPath);
        }

        let mut buf = Vec::new();
        File::open(path)?.read_to_end(&mut buf)?;

        Self::from_bytes(&buf)
    }

    /// Raw DER bytes
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// SHA-1 over the raw bytes
    pub fn fingerprint(&self) -> [u8; 20] {
        sha1_fingerprint(&self.raw)
    }

    /// Lowercase hex SHA-1 fingerprint
    pub fn fingerprint_hex(&self) -> String {
        hex::encode(self.fingerprint())
    }

    /// Lowercase hex SHA-1 fingerprint with `:` between bytes
    pub fn fingerprint_colons(&self) -> String {
        self.fingerprint().iter().map(|b| format!("{:02x}", b)).collect::<Vec<_>>().join(":")
    }

    /// Lowercase hex SHA-256 over the raw bytes
    pub fn sha256_hex(&self) -> String {
        hex::encode(Sha256::digest(&self.raw))
    }

    /// Subject distinguished name, for diagnostics only
    pub fn subject(&self) -> Option<String> {
        x509_parser::parse_x509_certificate(&self.raw)
            .ok()
            .map(|(_, cert)| cert.subject().to_string())
    }

    /// Stripped Windows "Certificate Registry Blob" for this certificate
    pub fn to_registry_blob(&self) -> Vec<u8> {
        registry_blob(&self.raw)
    }

    /// PEM envelope of type `CERTIFICATE`
    pub fn to_pem(&self) -> String {
        pem_encode(PEM_CERTIFICATE_LABEL, &self.raw)
    }
}

impl fmt::Display for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CERTIFICATE({})", self.fingerprint_hex())
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("fingerprint", &self.fingerprint_hex())
            .field("len", &self.raw.len())
            .finish()
    }
}

/// SHA-1 of arbitrary bytes, as used for CryptoAPI certificate identity.
pub fn sha1_fingerprint(bytes: &[u8]) -> [u8; 20] {
    let hash = digest(&SHA1_FOR_LEGACY_USE_ONLY, bytes);
    let mut out = [0u8; 20];
    out.copy_from_slice(hash.as_ref());
    out
}

/// Build the registry blob for raw DER bytes.
///
/// A blob written by Windows carries several property records (key
/// identifier, MD5 and SHA-1 hashes, signature hash, public key length...).
/// Only the `0x20` record holding the encoded certificate is required: the
/// others are regenerated by the OS the first time the certificate is used.
///
/// Layout: `20 00 00 00 | 01 00 00 00 | <len u32 LE> | <DER bytes>`.
pub fn registry_blob(der: &[u8]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(REGISTRY_BLOB_HEADER_LEN + der.len());
    blob.extend_from_slice(&REGISTRY_BLOB_CERT_PROP_ID.to_le_bytes());
    blob.extend_from_slice(&REGISTRY_BLOB_RESERVED.to_le_bytes());
    blob.extend_from_slice(&(der.len() as u32).to_le_bytes());
    blob.extend_from_slice(der);
    blob
}

/// Wrap bytes in a PEM envelope with 64-column base64 lines and `\n` endings.
pub fn pem_encode(label: &str, bytes: &[u8]) -> String {
    let config = EncodeConfig::new().set_line_ending(LineEnding::LF);
    pem::encode_config(&Pem::new(label, bytes), config)
}
