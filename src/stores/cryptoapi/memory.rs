//! In-process registry hive.
//!
//! Mirrors the registry semantics the CryptoAPI backend relies on: keys must
//! exist before they can be opened, creating an existing key leaves its
//! last-write time alone, and every value write or delete bumps it.

use std::collections::{BTreeMap, HashSet};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::hive::{RegistryHive, RegistryKey, RootKey};
use crate::stores::expiry::{Clock, SystemClock};

/// Stored registry value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryValue {
    DWord(u32),
    Binary(Vec<u8>),
}

#[derive(Debug)]
struct Node {
    values: BTreeMap<String, RegistryValue>,
    last_write: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct State {
    nodes: BTreeMap<String, Node>,
    undeletable: HashSet<String>,
}

/// Registry tree kept in memory, timestamped by a [`Clock`].
#[derive(Debug, Clone)]
pub struct MemoryHive {
    state: Arc<Mutex<State>>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryHive {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

fn join(parent: &str, name: &str) -> String {
    format!("{}\\{}", parent, name)
}

fn full_path(root: RootKey, path: &str) -> String {
    join(root.as_str(), path.trim_matches('\\'))
}

fn not_found(path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("registry key not found: {}", path))
}

impl MemoryHive {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { state: Arc::new(Mutex::new(State::default())), clock }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Create `path` under `root` and all of its ancestors.
    pub fn ensure_key(&self, root: RootKey, path: &str) {
        let now = self.clock.now();
        let mut state = self.lock();
        let mut current = root.as_str().to_string();
        for segment in path.split('\\').filter(|s| !s.is_empty()) {
            current = join(&current, segment);
            state
                .nodes
                .entry(current.clone())
                .or_insert_with(|| Node { values: BTreeMap::new(), last_write: now });
        }
    }

    /// Whether `path` under `root` exists.
    pub fn key_exists(&self, root: RootKey, path: &str) -> bool {
        self.lock().nodes.contains_key(&full_path(root, path))
    }

    /// Read a value, if present.
    pub fn value(&self, root: RootKey, path: &str, name: &str) -> Option<RegistryValue> {
        self.lock().nodes.get(&full_path(root, path)).and_then(|n| n.values.get(name).cloned())
    }

    /// Last-write time of a key, if present.
    pub fn last_write(&self, root: RootKey, path: &str) -> Option<DateTime<Utc>> {
        self.lock().nodes.get(&full_path(root, path)).map(|n| n.last_write)
    }

    /// Make deletion of `path` fail with `PermissionDenied`, as a restrictive ACL would.
    pub fn deny_delete(&self, root: RootKey, path: &str) {
        self.lock().undeletable.insert(full_path(root, path));
    }
}

impl RegistryHive for MemoryHive {
    type Key = MemoryKey;

    fn open_key(&self, root: RootKey, path: &str) -> io::Result<MemoryKey> {
        let path = full_path(root, path);
        if !self.lock().nodes.contains_key(&path) {
            return Err(not_found(&path));
        }
        Ok(MemoryKey { hive: self.clone(), path })
    }
}

/// Handle to a key inside a [`MemoryHive`]
#[derive(Debug, Clone)]
pub struct MemoryKey {
    hive: MemoryHive,
    path: String,
}

impl MemoryKey {
    fn with_node<T>(&self, f: impl FnOnce(&mut Node) -> io::Result<T>) -> io::Result<T> {
        let mut state = self.hive.lock();
        let node = state.nodes.get_mut(&self.path).ok_or_else(|| not_found(&self.path))?;
        f(node)
    }

    fn write_value(&self, name: &str, value: RegistryValue) -> io::Result<()> {
        let now = self.hive.clock.now();
        self.with_node(|node| {
            node.values.insert(name.to_string(), value);
            node.last_write = now;
            Ok(())
        })
    }
}

impl RegistryKey for MemoryKey {
    fn create_subkey(&self, name: &str) -> io::Result<Self> {
        let now = self.hive.clock.now();
        let path = join(&self.path, name);
        let mut state = self.hive.lock();
        if !state.nodes.contains_key(&self.path) {
            return Err(not_found(&self.path));
        }
        if !state.nodes.contains_key(&path) {
            state.nodes.insert(path.clone(), Node { values: BTreeMap::new(), last_write: now });
            if let Some(parent) = state.nodes.get_mut(&self.path) {
                parent.last_write = now;
            }
        }
        Ok(MemoryKey { hive: self.hive.clone(), path })
    }

    fn open_subkey(&self, name: &str) -> io::Result<Self> {
        let path = join(&self.path, name);
        if !self.hive.lock().nodes.contains_key(&path) {
            return Err(not_found(&path));
        }
        Ok(MemoryKey { hive: self.hive.clone(), path })
    }

    fn subkey_names(&self) -> io::Result<Vec<String>> {
        let state = self.hive.lock();
        if !state.nodes.contains_key(&self.path) {
            return Err(not_found(&self.path));
        }
        let prefix = format!("{}\\", self.path);
        Ok(state
            .nodes
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix))
            .filter(|rest| !rest.contains('\\'))
            .map(str::to_string)
            .collect())
    }

    fn delete_subkey(&self, name: &str) -> io::Result<()> {
        let now = self.hive.clock.now();
        let path = join(&self.path, name);
        let mut state = self.hive.lock();
        if state.undeletable.contains(&path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("access denied deleting {}", path),
            ));
        }
        let child_prefix = format!("{}\\", path);
        if state.nodes.keys().any(|k| k.starts_with(&child_prefix)) {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("registry key {} has subkeys", path),
            ));
        }
        state.nodes.remove(&path).ok_or_else(|| not_found(&path))?;
        if let Some(parent) = state.nodes.get_mut(&self.path) {
            parent.last_write = now;
        }
        Ok(())
    }

    fn delete_value(&self, name: &str) -> io::Result<()> {
        let now = self.hive.clock.now();
        self.with_node(|node| {
            node.values.remove(name).ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, format!("registry value not found: {}", name))
            })?;
            node.last_write = now;
            Ok(())
        })
    }

    fn set_dword(&self, name: &str, value: u32) -> io::Result<()> {
        self.write_value(name, RegistryValue::DWord(value))
    }

    fn set_binary(&self, name: &str, value: &[u8]) -> io::Result<()> {
        self.write_value(name, RegistryValue::Binary(value.to_vec()))
    }

    fn get_dword(&self, name: &str) -> io::Result<u32> {
        self.with_node(|node| match node.values.get(name) {
            Some(RegistryValue::DWord(v)) => Ok(*v),
            Some(RegistryValue::Binary(_)) => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("registry value {} is not a DWORD", name),
            )),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("registry value not found: {}", name),
            )),
        })
    }

    fn last_write_time(&self) -> io::Result<DateTime<Utc>> {
        self.with_node(|node| Ok(node.last_write))
    }
}
