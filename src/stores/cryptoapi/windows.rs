//! Windows registry implementation of the hive traits, backed by `winreg`.

use std::io;

use chrono::{DateTime, Utc};
use winreg::enums::{HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE, KEY_ALL_ACCESS, REG_BINARY};
use winreg::{RegKey, RegValue};

use super::hive::{RegistryHive, RegistryKey, RootKey};

/// 100ns intervals between 1601-01-01 and 1970-01-01
const FILETIME_UNIX_EPOCH_OFFSET: i64 = 116_444_736_000_000_000;

/// The live Windows registry
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsRegistry;

impl RegistryHive for WindowsRegistry {
    type Key = RegKey;

    fn open_key(&self, root: RootKey, path: &str) -> io::Result<RegKey> {
        let predef = match root {
            RootKey::CurrentUser => HKEY_CURRENT_USER,
            RootKey::LocalMachine => HKEY_LOCAL_MACHINE,
        };
        RegKey::predef(predef).open_subkey_with_flags(path, KEY_ALL_ACCESS)
    }
}

impl RegistryKey for RegKey {
    fn create_subkey(&self, name: &str) -> io::Result<Self> {
        // The disposition (created vs opened) does not matter: callers refresh
        // the last-write time themselves.
        let (key, _disposition) = self.create_subkey_with_flags(name, KEY_ALL_ACCESS)?;
        Ok(key)
    }

    fn open_subkey(&self, name: &str) -> io::Result<Self> {
        self.open_subkey_with_flags(name, KEY_ALL_ACCESS)
    }

    fn subkey_names(&self) -> io::Result<Vec<String>> {
        self.enum_keys().collect()
    }

    fn delete_subkey(&self, name: &str) -> io::Result<()> {
        RegKey::delete_subkey(self, name)
    }

    fn delete_value(&self, name: &str) -> io::Result<()> {
        RegKey::delete_value(self, name)
    }

    fn set_dword(&self, name: &str, value: u32) -> io::Result<()> {
        self.set_value(name, &value)
    }

    fn set_binary(&self, name: &str, value: &[u8]) -> io::Result<()> {
        self.set_raw_value(name, &RegValue { bytes: value.to_vec(), vtype: REG_BINARY })
    }

    fn get_dword(&self, name: &str) -> io::Result<u32> {
        self.get_value::<u32, _>(name)
    }

    fn last_write_time(&self) -> io::Result<DateTime<Utc>> {
        let info = self.query_info()?;
        let ticks = ((info.last_write_time.dwHighDateTime as i64) << 32)
            | info.last_write_time.dwLowDateTime as i64;
        let since_epoch = ticks - FILETIME_UNIX_EPOCH_OFFSET;
        let secs = since_epoch.div_euclid(10_000_000);
        let nanos = (since_epoch.rem_euclid(10_000_000) * 100) as u32;
        DateTime::from_timestamp(secs, nanos).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "registry last-write time out of range")
        })
    }
}
