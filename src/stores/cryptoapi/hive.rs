//! Registry access traits.
//!
//! The CryptoAPI backend only needs a handful of registry primitives. They
//! are expressed as traits so the backend runs against the real Windows
//! registry or against [`super::MemoryHive`].
//!
//! Key handles are plain values: dropping one releases the underlying handle,
//! so every early return in the backend closes what it opened.

use std::fmt;
use std::io;

use chrono::{DateTime, Utc};

/// Predefined registry root a physical store lives under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RootKey {
    CurrentUser,
    LocalMachine,
}

impl RootKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CurrentUser => "HKEY_CURRENT_USER",
            Self::LocalMachine => "HKEY_LOCAL_MACHINE",
        }
    }
}

impl fmt::Display for RootKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Entry point into a registry
pub trait RegistryHive: Send + Sync + fmt::Debug {
    type Key: RegistryKey;

    /// Open an existing key with full access.
    fn open_key(&self, root: RootKey, path: &str) -> io::Result<Self::Key>;
}

/// Open registry key handle
pub trait RegistryKey: Sized {
    /// Create a subkey, or open it if it already exists.
    ///
    /// Opening an existing key does not change its last-write time.
    fn create_subkey(&self, name: &str) -> io::Result<Self>;

    fn open_subkey(&self, name: &str) -> io::Result<Self>;

    /// Names of the immediate subkeys.
    fn subkey_names(&self) -> io::Result<Vec<String>>;

    /// Delete an immediate subkey that has no subkeys of its own.
    fn delete_subkey(&self, name: &str) -> io::Result<()>;

    /// Delete a value; fails with [`io::ErrorKind::NotFound`] if it is absent.
    fn delete_value(&self, name: &str) -> io::Result<()>;

    fn set_dword(&self, name: &str, value: u32) -> io::Result<()>;

    fn set_binary(&self, name: &str, value: &[u8]) -> io::Result<()>;

    fn get_dword(&self, name: &str) -> io::Result<u32>;

    fn last_write_time(&self) -> io::Result<DateTime<Utc>>;
}
