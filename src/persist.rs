//! Draft persistence port and implementations.
//!
//! The wizard writes its full draft through this key-value port after every
//! mutation and reads it back on construction. Failures are best-effort by
//! design: a write error is logged and dropped, a read/parse error reads as
//! "absent". Nothing here may surface an error to the user.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::{debug, error, info};

/// Key-value persistence for wizard drafts.
///
/// `get` returns None for missing keys AND for unreadable values; `set` and
/// `delete` are fire-and-forget.
pub trait DraftStore: Send + Sync {
  fn get(&self, key: &str) -> Option<String>;
  fn set(&self, key: &str, value: &str);
  fn delete(&self, key: &str);
}

/// File-backed store: one JSON file per key under a data directory.
///
/// Keys come from clients, so they are sanitized to a conservative charset
/// before touching the filesystem.
pub struct FileDraftStore {
  dir: PathBuf,
}

impl FileDraftStore {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    let dir = dir.into();
    if let Err(e) = std::fs::create_dir_all(&dir) {
      error!(target: "studyplan_backend", dir = %dir.display(), error = %e, "Failed to create draft directory");
    }
    Self { dir }
  }

  /// Directory from PLANNER_DATA_DIR, defaulting to ./data.
  pub fn from_env() -> Self {
    let dir = std::env::var("PLANNER_DATA_DIR").unwrap_or_else(|_| "./data".into());
    info!(target: "studyplan_backend", %dir, "Draft store directory");
    Self::new(dir)
  }

  fn path_for(&self, key: &str) -> PathBuf {
    let safe: String = key
      .chars()
      .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
      .collect();
    self.dir.join(format!("{safe}.json"))
  }
}

impl DraftStore for FileDraftStore {
  fn get(&self, key: &str) -> Option<String> {
    let path = self.path_for(key);
    match std::fs::read_to_string(&path) {
      Ok(s) => Some(s),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
      Err(e) => {
        error!(target: "studyplan_backend", path = %path.display(), error = %e, "Draft read failed; treating as absent");
        None
      }
    }
  }

  fn set(&self, key: &str, value: &str) {
    let path = self.path_for(key);
    if let Err(e) = std::fs::write(&path, value) {
      error!(target: "studyplan_backend", path = %path.display(), error = %e, "Draft write failed (best-effort, dropped)");
    } else {
      debug!(target: "wizard", %key, bytes = value.len(), "Draft persisted");
    }
  }

  fn delete(&self, key: &str) {
    let path = self.path_for(key);
    match std::fs::remove_file(&path) {
      Ok(()) => debug!(target: "wizard", %key, "Draft deleted"),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
      Err(e) => {
        error!(target: "studyplan_backend", path = %path.display(), error = %e, "Draft delete failed");
      }
    }
  }
}

/// In-memory store for tests and ephemeral setups.
#[derive(Default)]
pub struct MemoryDraftStore {
  entries: Mutex<HashMap<String, String>>,
}

impl MemoryDraftStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl DraftStore for MemoryDraftStore {
  fn get(&self, key: &str) -> Option<String> {
    self.entries.lock().ok()?.get(key).cloned()
  }

  fn set(&self, key: &str, value: &str) {
    if let Ok(mut m) = self.entries.lock() {
      m.insert(key.to_string(), value.to_string());
    }
  }

  fn delete(&self, key: &str) {
    if let Ok(mut m) = self.entries.lock() {
      m.remove(key);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn memory_store_round_trip() {
    let store = MemoryDraftStore::new();
    assert_eq!(store.get("k"), None);
    store.set("k", "v");
    assert_eq!(store.get("k").as_deref(), Some("v"));
    store.delete("k");
    assert_eq!(store.get("k"), None);
  }

  #[test]
  fn file_store_round_trip_and_key_sanitization() {
    let dir = std::env::temp_dir().join(format!("studyplan-store-{}", uuid::Uuid::new_v4()));
    let store = FileDraftStore::new(&dir);

    store.set("user../../etc", "{\"step\":1}");
    // Sanitized key stays inside the data directory.
    assert!(dir.join("user______etc.json").exists());
    assert_eq!(store.get("user../../etc").as_deref(), Some("{\"step\":1}"));

    store.delete("user../../etc");
    assert_eq!(store.get("user../../etc"), None);

    let _ = std::fs::remove_dir_all(&dir);
  }
}
