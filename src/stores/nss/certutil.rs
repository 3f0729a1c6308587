//! `certutil` invocation and output classification.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::errors::{CertInjectError, Result};

/// Output signature of a transient NSS failure (usually a locked database)
pub const TRANSIENT_SIGNATURE: &str = "SEC_ERROR_PKCS11_GENERAL_ERROR";

/// Output signature of a delete for a nickname that is not in the database
pub const ALREADY_ABSENT_SIGNATURE: &str = "SEC_ERROR_UNRECOGNIZED_OID";

/// Trust flags for imported certificates: trusted CA and peer for TLS
pub const TRUST_FLAGS: &str = "CP,,";

/// What a finished tool run means to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolOutcome {
    Success,
    Transient,
    AlreadyAbsent,
    Failed,
}

/// Result of one tool run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub success: bool,
    /// Human readable exit status
    pub status: String,
    /// stdout followed by stderr
    pub combined: String,
}

impl ToolOutput {
    pub fn success() -> Self {
        Self { success: true, status: "exit status: 0".to_string(), combined: String::new() }
    }

    pub fn failure(code: i32, combined: impl Into<String>) -> Self {
        Self { success: false, status: format!("exit status: {}", code), combined: combined.into() }
    }

    pub fn classify(&self) -> ToolOutcome {
        if self.success {
            ToolOutcome::Success
        } else if self.combined.contains(TRANSIENT_SIGNATURE) {
            ToolOutcome::Transient
        } else if self.combined.contains(ALREADY_ABSENT_SIGNATURE) {
            ToolOutcome::AlreadyAbsent
        } else {
            ToolOutcome::Failed
        }
    }
}

/// The external certificate database tool
pub trait CertDatabaseTool: Send + Sync + fmt::Debug {
    /// Run the tool to completion with `args`.
    ///
    /// A nonzero exit is reported through [`ToolOutput`]; `Err` means the
    /// tool could not be run at all.
    fn run(&self, args: &[String]) -> Result<ToolOutput>;
}

/// NSS `certutil` run as a subprocess
#[derive(Debug, Clone)]
pub struct Certutil {
    program: PathBuf,
}

impl Default for Certutil {
    fn default() -> Self {
        Self::new("certutil")
    }
}

impl Certutil {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into() }
    }
}

impl CertDatabaseTool for Certutil {
    fn run(&self, args: &[String]) -> Result<ToolOutput> {
        debug!(program = %self.program.display(), ?args, "Running certificate database tool");

        let output = Command::new(&self.program).args(args).output().map_err(|e| {
            CertInjectError::Io(std::io::Error::new(
                e.kind(),
                format!("failed to run {}: {}", self.program.display(), e),
            ))
        })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(ToolOutput { success: output.status.success(), status: output.status.to_string(), combined })
    }
}

fn database_arg(db_dir: &Path) -> String {
    format!("sql:{}", db_dir.display())
}

/// Arguments importing `cert_file` into the database under `nickname`
pub fn import_args(db_dir: &Path, nickname: &str, cert_file: &Path) -> Vec<String> {
    vec![
        "-d".to_string(),
        database_arg(db_dir),
        "-A".to_string(),
        "-t".to_string(),
        TRUST_FLAGS.to_string(),
        "-n".to_string(),
        nickname.to_string(),
        "-a".to_string(),
        "-i".to_string(),
        cert_file.display().to_string(),
    ]
}

/// Arguments deleting `nickname` from the database
pub fn delete_args(db_dir: &Path, nickname: &str) -> Vec<String> {
    vec![
        "-d".to_string(),
        database_arg(db_dir),
        "-D".to_string(),
        "-n".to_string(),
        nickname.to_string(),
    ]
}
