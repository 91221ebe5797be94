//! Durable single-slot token persistence.
//!
//! DESIGN
//! ======
//! The session keeps exactly one credential: the bearer token as a plain
//! string. Absence of the slot (or a blank one) means anonymous. Backends are
//! synchronous because the slot is tiny and written only on login/logout.

use std::fmt;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::net::types::REDACTED;

/// A single durable key-value slot holding the bearer token.
pub trait TokenStore: Send + Sync {
    /// Read the persisted token. `Ok(None)` when nothing is stored.
    fn load(&self) -> io::Result<Option<String>>;

    /// Persist `token`, replacing any previous value.
    fn save(&self, token: &str) -> io::Result<()>;

    /// Remove the persisted token. Clearing an empty slot succeeds.
    fn clear(&self) -> io::Result<()>;
}

// =============================================================================
// FILE STORE
// =============================================================================

/// Token slot backed by a single file.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> io::Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => Ok(non_blank(&raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn save(&self, token: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, token)?;
        restrict_permissions(&self.path)
    }

    fn clear(&self) -> io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> io::Result<()> {
    Ok(())
}

fn non_blank(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() { None } else { Some(trimmed.to_owned()) }
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// In-memory token slot. Clones share the same slot.
#[derive(Clone, Default)]
pub struct MemoryTokenStore {
    slot: Arc<Mutex<Option<String>>>,
}

impl fmt::Debug for MemoryTokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let held = self.get().map(|_| REDACTED);
        f.debug_struct("MemoryTokenStore").field("slot", &held).finish()
    }
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that starts out holding `token`.
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self { slot: Arc::new(Mutex::new(Some(token.into()))) }
    }

    /// Current slot contents.
    #[must_use]
    pub fn get(&self) -> Option<String> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> io::Result<Option<String>> {
        Ok(self.get())
    }

    fn save(&self, token: &str) -> io::Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_owned());
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

#[cfg(test)]
#[path = "storage_test.rs"]
mod tests;
