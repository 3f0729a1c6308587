//! # Error Handling
//!
//! Error types for certificate injection and trust store sweeps, built with
//! `thiserror`. Every public operation returns [`Result`].

pub mod types;

pub use types::{CertInjectError, ErrorKind, Result};
