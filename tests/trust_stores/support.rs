use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use certinject::config::NssConfig;
use certinject::errors::Result;
use certinject::stores::nss::{CertDatabaseTool, ToolOutput};
use certinject::stores::ManualClock;
use certinject::Certificate;
use chrono::DateTime;
use tempfile::TempDir;

/// Fresh self-signed certificate in DER form.
pub fn self_signed_der(name: &str) -> Vec<u8> {
    rcgen::generate_simple_self_signed(vec![name.to_string()])
        .expect("generate certificate")
        .cert
        .der()
        .to_vec()
}

pub fn self_signed(name: &str) -> Certificate {
    Certificate::from_bytes(&self_signed_der(name)).expect("parse generated certificate")
}

/// Clock pinned to a fixed instant.
pub fn manual_clock() -> ManualClock {
    ManualClock::new(DateTime::from_timestamp(1_700_000_000, 0).expect("valid timestamp"))
}

/// certutil output for a locked database
pub fn transient_failure() -> ToolOutput {
    ToolOutput::failure(
        255,
        "certutil: function failed: SEC_ERROR_PKCS11_GENERAL_ERROR: A PKCS #11 module returned CKR_GENERAL_ERROR",
    )
}

/// certutil output for deleting a nickname that is not present
pub fn already_absent() -> ToolOutput {
    ToolOutput::failure(
        255,
        "certutil: could not find certificate named \"Namecoin-x\": SEC_ERROR_UNRECOGNIZED_OID",
    )
}

/// One recorded tool invocation
#[derive(Debug, Clone)]
pub struct ToolCall {
    pub args: Vec<String>,
    /// Content of the `-i` input file at the time of the call
    pub input: Option<String>,
}

#[derive(Debug, Default)]
struct ScriptState {
    responses: VecDeque<ToolOutput>,
    calls: Vec<ToolCall>,
}

/// Certificate database tool that replays canned outputs, then succeeds.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTool {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedTool {
    pub fn new(responses: impl IntoIterator<Item = ToolOutput>) -> Self {
        let tool = Self::default();
        tool.push(responses);
        tool
    }

    pub fn push(&self, responses: impl IntoIterator<Item = ToolOutput>) {
        self.state.lock().unwrap().responses.extend(responses);
    }

    pub fn calls(&self) -> Vec<ToolCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }
}

impl CertDatabaseTool for ScriptedTool {
    fn run(&self, args: &[String]) -> Result<ToolOutput> {
        let input = args
            .iter()
            .position(|a| a == "-i")
            .and_then(|i| args.get(i + 1))
            .and_then(|path| std::fs::read_to_string(path).ok());

        let mut state = self.state.lock().unwrap();
        state.calls.push(ToolCall { args: args.to_vec(), input });
        Ok(state.responses.pop_front().unwrap_or_else(ToolOutput::success))
    }
}

/// Temporary mirror and database directories for an NSS store.
pub struct NssDirs {
    _temp_dir: TempDir,
    pub cert_dir: PathBuf,
    pub db_dir: PathBuf,
}

impl NssDirs {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let cert_dir = temp_dir.path().join("certs");
        let db_dir = temp_dir.path().join("nssdb");
        std::fs::create_dir_all(&cert_dir).expect("create cert dir");
        std::fs::create_dir_all(&db_dir).expect("create db dir");
        Self { _temp_dir: temp_dir, cert_dir, db_dir }
    }

    pub fn config(&self) -> NssConfig {
        NssConfig {
            cert_dir: self.cert_dir.clone(),
            db_dir: self.db_dir.clone(),
            retry_delay_ms: 0,
            ..Default::default()
        }
    }

    pub fn mirror_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.cert_dir)
            .expect("list cert dir")
            .map(|e| e.expect("dir entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    pub fn mirror_path(&self, cert: &Certificate) -> PathBuf {
        self.cert_dir.join(format!("{}.pem", cert.sha256_hex()))
    }
}

impl Default for NssDirs {
    fn default() -> Self {
        Self::new()
    }
}

pub fn exists(path: &Path) -> bool {
    path.try_exists().unwrap_or(false)
}

/// Clock starting at the wall-clock time, for stores keyed on file mtimes.
pub fn clock_at_now() -> ManualClock {
    ManualClock::new(chrono::Utc::now())
}
