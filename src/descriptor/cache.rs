use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use anyhow::{Context, Result};
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tracing::debug;

use super::compiler::{CompilerAdapter, SfcDescriptor, SfcParseResult};
use crate::asset_paths::{normalize_path, to_slash};
use crate::error::PipelineError;

/// Inputs needed to create a descriptor on a cache miss.
#[derive(Debug, Clone, Copy)]
pub struct DescriptorOptions<'a> {
  /// Project root used to derive descriptor ids.
  pub root: &'a Path,
  /// Compiler adapter selected for the session.
  pub compiler: &'a CompilerAdapter,
}

#[derive(Debug, Clone)]
struct CacheEntry {
  mtime: SystemTime,
  descriptor: Arc<SfcDescriptor>,
}

/// Memoised component descriptors validated against the file's modification time.
#[derive(Debug, Default)]
pub struct DescriptorCache {
  entries: DashMap<PathBuf, CacheEntry>,
}

impl DescriptorCache {
  /// Create an empty cache.
  pub fn new() -> Self {
    Self::default()
  }

  /// Return the descriptor for `filename`, parsing it when absent or stale.
  ///
  /// The first parse error is returned as [`PipelineError::ComponentParse`]; failed parses are
  /// never cached.
  pub async fn get_descriptor(
    &self,
    filename: &Path,
    id: &str,
    options: DescriptorOptions<'_>,
  ) -> Result<Arc<SfcDescriptor>> {
    let mtime = modified_time(filename).await?;
    if let Some(entry) = self.entries.get(filename)
      && entry.mtime == mtime
    {
      return Ok(Arc::clone(&entry.descriptor));
    }

    let source = tokio::fs::read_to_string(filename)
      .await
      .with_context(|| format!("failed to read {}", filename.display()))?;
    let SfcParseResult {
      mut descriptor,
      errors,
    } = options.compiler.parse(&source, id);

    if let Some(first) = errors.into_iter().next() {
      return Err(
        PipelineError::ComponentParse {
          file: filename.to_path_buf(),
          message: first.to_string(),
        }
        .into(),
      );
    }

    descriptor.id = descriptor_id(options.root, filename);
    let descriptor = Arc::new(descriptor);
    debug!(
      target: "lib_assets",
      "parsed {} ({} style blocks)",
      filename.display(),
      descriptor.styles.len()
    );
    self.entries.insert(filename.to_path_buf(), CacheEntry {
      mtime,
      descriptor: Arc::clone(&descriptor),
    });
    Ok(descriptor)
  }

  /// Number of cached descriptors.
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  /// Whether the cache is empty.
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

async fn modified_time(filename: &Path) -> Result<SystemTime> {
  tokio::fs::metadata(filename)
    .await
    .and_then(|meta| meta.modified())
    .with_context(|| format!("failed to stat {}", filename.display()))
}

/// Short hash of the file's root-relative path; stable across content edits.
pub fn descriptor_id(root: &Path, filename: &Path) -> String {
  let normalized = normalize_path(filename);
  let relative = normalized
    .strip_prefix(normalize_path(root))
    .map(Path::to_path_buf)
    .unwrap_or(normalized);
  let digest = Sha256::digest(to_slash(&relative).as_bytes());
  hex::encode(digest)[..8].to_string()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::descriptor::BlockParser;
  use std::fs::{File, FileTimes};
  use std::time::Duration;
  use tempfile::tempdir;

  fn adapter() -> CompilerAdapter {
    CompilerAdapter::V3(Arc::new(BlockParser))
  }

  fn set_mtime(path: &Path, offset_secs: u64) {
    let file = File::options().write(true).open(path).unwrap();
    let time = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000 + offset_secs);
    file.set_times(FileTimes::new().set_modified(time)).unwrap();
  }

  #[tokio::test]
  async fn returns_cached_descriptor_while_mtime_is_unchanged() {
    let temp = tempdir().unwrap();
    let file = temp.path().join("A.vue");
    std::fs::write(&file, "<style>.a{}</style>").unwrap();
    set_mtime(&file, 0);

    let cache = DescriptorCache::new();
    let compiler = adapter();
    let options = DescriptorOptions {
      root: temp.path(),
      compiler: &compiler,
    };

    let first = cache.get_descriptor(&file, "A.vue", options).await.unwrap();
    let second = cache.get_descriptor(&file, "A.vue", options).await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cache.len(), 1);
  }

  #[tokio::test]
  async fn reparses_when_mtime_changes() {
    let temp = tempdir().unwrap();
    let file = temp.path().join("A.vue");
    std::fs::write(&file, "<style>.a{}</style>").unwrap();
    set_mtime(&file, 0);

    let cache = DescriptorCache::new();
    let compiler = adapter();
    let options = DescriptorOptions {
      root: temp.path(),
      compiler: &compiler,
    };
    let first = cache.get_descriptor(&file, "A.vue", options).await.unwrap();

    std::fs::write(&file, "<style>.a{}</style><style>.b{}</style>").unwrap();
    set_mtime(&file, 10);

    let second = cache.get_descriptor(&file, "A.vue", options).await.unwrap();
    assert_eq!(first.styles.len(), 1);
    assert_eq!(second.styles.len(), 2);
    assert_eq!(first.id, second.id);
  }

  #[tokio::test]
  async fn propagates_first_parse_error_without_caching() {
    let temp = tempdir().unwrap();
    let file = temp.path().join("Broken.vue");
    std::fs::write(&file, "<style>.a{}").unwrap();

    let cache = DescriptorCache::new();
    let compiler = adapter();
    let err = cache
      .get_descriptor(&file, "Broken.vue", DescriptorOptions {
        root: temp.path(),
        compiler: &compiler,
      })
      .await
      .unwrap_err();

    assert!(matches!(
      err.downcast_ref::<PipelineError>(),
      Some(PipelineError::ComponentParse { .. })
    ));
    assert!(cache.is_empty());
  }

  #[test]
  fn descriptor_id_depends_on_relative_path_only() {
    let a = descriptor_id(Path::new("/one"), Path::new("/one/src/A.vue"));
    let b = descriptor_id(Path::new("/two"), Path::new("/two/src/A.vue"));
    let c = descriptor_id(Path::new("/one"), Path::new("/one/src/B.vue"));
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(a.len(), 8);
  }
}
