//! Per-build cache of raw asset bytes.

use std::io::ErrorKind;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};
use dashmap::DashMap;
use tracing::warn;

use crate::asset_paths::split_query;

/// Loads asset bytes once and serves them from memory afterwards.
///
/// Entries are keyed by the full identifier (path and query). Physical reads are keyed by path,
/// so one file requested under several queries is read from disk a single time.
#[derive(Debug, Default)]
pub struct ContentStore {
  by_id: DashMap<String, Arc<[u8]>>,
  by_path: DashMap<String, Arc<[u8]>>,
  reads: AtomicUsize,
}

impl ContentStore {
  /// Create an empty store.
  pub fn new() -> Self {
    Self::default()
  }

  /// Fetch the content for an identifier.
  ///
  /// A missing file is logged and reported as `None`; any other I/O failure is an error.
  pub async fn get(&self, id: &str) -> Result<Option<Arc<[u8]>>> {
    if let Some(content) = self.by_id.get(id) {
      return Ok(Some(Arc::clone(content.value())));
    }

    let (path, _) = split_query(id);
    let cached = self.by_path.get(path).map(|entry| Arc::clone(entry.value()));
    let content = match cached {
      Some(content) => content,
      None => match tokio::fs::read(path).await {
        Ok(bytes) => {
          self.reads.fetch_add(1, Ordering::Relaxed);
          let bytes: Arc<[u8]> = bytes.into();
          self.by_path.insert(path.to_string(), Arc::clone(&bytes));
          bytes
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {
          warn!(target: "lib_assets", "[lib-assets]: file not found {id}");
          return Ok(None);
        }
        Err(err) => {
          return Err(err).with_context(|| format!("failed to read asset {path}"));
        }
      },
    };

    self.by_id.insert(id.to_string(), Arc::clone(&content));
    Ok(Some(content))
  }

  /// Number of distinct identifiers currently cached.
  pub fn len(&self) -> usize {
    self.by_id.len()
  }

  /// Whether nothing has been cached yet.
  pub fn is_empty(&self) -> bool {
    self.by_id.is_empty()
  }

  /// Number of reads that actually hit the filesystem.
  pub fn physical_reads(&self) -> usize {
    self.reads.load(Ordering::Relaxed)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  #[tokio::test]
  async fn returns_none_for_missing_files() {
    let temp = tempdir().unwrap();
    let store = ContentStore::new();
    let id = temp.path().join("missing.png").to_string_lossy().into_owned();

    assert!(store.get(&id).await.unwrap().is_none());
    assert!(store.is_empty());
  }

  #[tokio::test]
  async fn caches_per_identifier_but_reads_each_path_once() {
    let temp = tempdir().unwrap();
    let file = temp.path().join("logo.png");
    std::fs::write(&file, b"png").unwrap();
    let path = file.to_string_lossy().into_owned();

    let store = ContentStore::new();
    let plain = store.get(&path).await.unwrap().unwrap();
    let sized = store.get(&format!("{path}?width=10")).await.unwrap().unwrap();
    let again = store.get(&path).await.unwrap().unwrap();

    assert_eq!(&*plain, b"png");
    assert_eq!(plain, sized);
    assert_eq!(plain, again);
    assert_eq!(store.len(), 2);
    assert_eq!(store.physical_reads(), 1);
  }

  #[tokio::test]
  async fn serves_cached_bytes_after_file_changes() {
    let temp = tempdir().unwrap();
    let file = temp.path().join("a.txt");
    std::fs::write(&file, b"first").unwrap();
    let path = file.to_string_lossy().into_owned();

    let store = ContentStore::new();
    store.get(&path).await.unwrap();
    std::fs::write(&file, b"second").unwrap();

    assert_eq!(&*store.get(&path).await.unwrap().unwrap(), b"first");
  }
}
