// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Key-value backends for the credential store.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Durable key-value surface with synchronous visibility.
///
/// Writes never fail from the caller's point of view: a backend that cannot
/// persist keeps its in-memory view authoritative and logs the failure.
pub trait KeyValueStore: Send {
    fn read(&self, key: &str) -> Option<String>;
    fn write(&mut self, key: &str, value: &str);
    fn delete(&mut self, key: &str);

    /// Apply several changes as one unit; `None` deletes the key.
    ///
    /// Durable backends override this to persist the batch at once.
    fn update(&mut self, changes: &[(&str, Option<&str>)]) {
        for (key, value) in changes {
            match value {
                Some(value) => self.write(key, value),
                None => self.delete(key),
            }
        }
    }
}

/// Process-local backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn write(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_owned(), value.to_owned());
    }

    fn delete(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

/// JSON-file backend: the whole map is rewritten atomically on every change.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
    /// Successful saves since open.
    saves: u64,
}

impl FileStore {
    /// Open (or lazily create) the store at `path`. A missing file is empty.
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let entries = if path.exists() { load(&path)? } else { BTreeMap::new() };
        Ok(Self { path, entries, saves: 0 })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&mut self) {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                if let Err(e) = std::fs::create_dir_all(dir) {
                    tracing::warn!(err = %e, "failed to create credential dir");
                    return;
                }
            }
        }
        if let Err(e) = save(&self.path, &self.entries) {
            tracing::warn!(path = %self.path.display(), err = %e, "failed to persist credentials");
            return;
        }
        self.saves += 1;
        tracing::debug!(path = %self.path.display(), saves = self.saves, "credentials saved");
    }

    /// Apply one change to the in-memory map; true if anything changed.
    fn apply(&mut self, key: &str, value: Option<&str>) -> bool {
        match value {
            Some(value) if self.entries.get(key).map(String::as_str) == Some(value) => false,
            Some(value) => {
                self.entries.insert(key.to_owned(), value.to_owned());
                true
            }
            None => self.entries.remove(key).is_some(),
        }
    }
}

impl KeyValueStore for FileStore {
    fn read(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn write(&mut self, key: &str, value: &str) {
        self.update(&[(key, Some(value))]);
    }

    fn delete(&mut self, key: &str) {
        self.update(&[(key, None)]);
    }

    fn update(&mut self, changes: &[(&str, Option<&str>)]) {
        let mut changed = false;
        for (key, value) in changes {
            changed |= self.apply(key, *value);
        }
        if changed {
            self.flush();
        }
    }
}

fn load(path: &Path) -> anyhow::Result<BTreeMap<String, String>> {
    let contents = std::fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    let entries: BTreeMap<String, String> = serde_json::from_str(&contents)?;
    Ok(entries)
}

/// Write tmp + rename so a reader never sees a partial file.
///
/// The temp name carries PID and a counter so concurrent saves from several
/// stores on one path cannot interleave bytes in a shared `.tmp`.
fn save(path: &Path, entries: &BTreeMap<String, String>) -> anyhow::Result<()> {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    let json = serde_json::to_string_pretty(entries)?;
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp_name = format!(
        "{}.{}.{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        std::process::id(),
        seq,
    );
    let tmp_path = path.with_file_name(tmp_name);
    write_private(&tmp_path, json.as_bytes())?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(unix)]
fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file =
        std::fs::OpenOptions::new().write(true).create(true).truncate(true).mode(0o600).open(path)?;
    file.write_all(bytes)
}

#[cfg(not(unix))]
fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, bytes)
}

#[cfg(test)]
#[path = "persist_tests.rs"]
mod tests;
