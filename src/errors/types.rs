//! # Error Types
//!
//! Error taxonomy for trust store operations using `thiserror`.

use std::fmt;

use x509_parser::error::X509Error;

/// Custom result type for certinject operations
pub type Result<T> = std::result::Result<T, CertInjectError>;

/// Main error type for certificate injection and cleanup
#[derive(thiserror::Error, Debug)]
pub enum CertInjectError {
    /// Missing or invalid configuration values
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// No trust store backend is enabled
    #[error("no store was selected")]
    NoStoreSelected,

    /// The configured CryptoAPI physical store name is not recognised
    #[error(
        "invalid choice for physical store '{0}', consider: current-user, system, enterprise, group-policy"
    )]
    UnknownPhysicalStore(String),

    /// An empty path was supplied where a certificate file was expected
    #[error("invalid certificate path: path is empty")]
    InvalidPath,

    /// The input was PEM encoded but not a certificate block
    #[error("unexpected PEM block type '{label}', expected CERTIFICATE")]
    UnexpectedPemType { label: String },

    /// The DER decoder rejected the certificate bytes
    #[error("failed to parse certificate: {0}")]
    Der(#[source] x509_parser::nom::Err<X509Error>),

    /// Bytes left over after a complete DER certificate
    #[error("failed to parse certificate: {len} trailing byte(s) after DER")]
    TrailingData { len: usize },

    /// Registry open/enumerate/read/write failures
    #[error("Registry error: {context}: {source}")]
    Registry {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// The external tool reported a retryable failure and retries ran out
    #[error("Transient failure during {operation} after {attempts} attempt(s):\n{output}")]
    Transient {
        operation: String,
        attempts: u32,
        output: String,
    },

    /// The external tool failed with an unrecognised error
    #[error("Error {operation}: {status}\n{output}")]
    Tool {
        operation: String,
        status: String,
        output: String,
    },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Per-entry failures collected during a sweep
    #[error("{} errors found: {}", .0.len(), join_errors(.0))]
    Aggregate(Vec<CertInjectError>),
}

/// Coarse classification of [`CertInjectError`] variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Format,
    TransientBackend,
    FatalBackend,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Configuration => write!(f, "configuration"),
            ErrorKind::Format => write!(f, "format"),
            ErrorKind::TransientBackend => write!(f, "transient_backend"),
            ErrorKind::FatalBackend => write!(f, "fatal_backend"),
        }
    }
}

fn join_errors(errors: &[CertInjectError]) -> String {
    let joined = errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ");
    format!("[{}]", joined)
}

impl CertInjectError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), source: None }
    }

    /// Create a configuration error with source
    pub fn config_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Config { message: message.into(), source: Some(source) }
    }

    /// Create a registry error with context
    pub fn registry<S: Into<String>>(context: S, source: std::io::Error) -> Self {
        Self::Registry { context: context.into(), source }
    }

    /// Create a fatal external tool error
    pub fn tool<O: Into<String>, S: Into<String>>(operation: O, status: S, output: String) -> Self {
        Self::Tool { operation: operation.into(), status: status.into(), output }
    }

    /// Create a transient external tool error
    pub fn transient<O: Into<String>>(operation: O, attempts: u32, output: String) -> Self {
        Self::Transient { operation: operation.into(), attempts, output }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config { .. }
            | Self::NoStoreSelected
            | Self::UnknownPhysicalStore(_)
            | Self::InvalidPath => ErrorKind::Configuration,
            Self::UnexpectedPemType { .. } | Self::Der(_) | Self::TrailingData { .. } => {
                ErrorKind::Format
            }
            Self::Transient { .. } => ErrorKind::TransientBackend,
            Self::Registry { .. } | Self::Tool { .. } | Self::Io(_) | Self::Aggregate(_) => {
                ErrorKind::FatalBackend
            }
        }
    }

    /// Check if this error should be retried
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::TransientBackend
    }
}

impl From<config::ConfigError> for CertInjectError {
    fn from(error: config::ConfigError) -> Self {
        Self::config_with_source("Configuration loading failed", Box::new(error))
    }
}

impl From<validator::ValidationErrors> for CertInjectError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages = Vec::new();
        collect_validation_messages("", &errors, &mut messages);
        messages.sort();

        Self::config(format!("Validation failed: {}", messages.join("; ")))
    }
}

/// Flatten nested validation errors into `path: message` strings
fn collect_validation_messages(
    prefix: &str,
    errors: &validator::ValidationErrors,
    out: &mut Vec<String>,
) {
    use validator::ValidationErrorsKind;

    for (field, kind) in errors.errors() {
        let path =
            if prefix.is_empty() { field.to_string() } else { format!("{}.{}", prefix, field) };
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                let error_messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| e.message.as_ref().map_or("Invalid value".to_string(), |m| m.to_string()))
                    .collect();
                out.push(format!("{}: {}", path, error_messages.join(", ")));
            }
            ValidationErrorsKind::Struct(nested) => collect_validation_messages(&path, nested, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_validation_messages(&format!("{}[{}]", path, index), nested, out);
                }
            }
        }
    }
}
