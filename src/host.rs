//! Capabilities the pipeline borrows from the host bundler.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::asset_paths::{clean_url, resolve_full_id};
use crate::models::EmittedAsset;

/// Module resolution and file emission provided by the host build tool.
#[async_trait]
pub trait HostContext: Send + Sync {
  /// Resolve a specifier against an importer, skipping this pipeline's own hook.
  ///
  /// Returns the canonical identifier, or `None` when the host cannot resolve it.
  async fn resolve(&self, specifier: &str, importer: &str) -> Option<String>;

  /// Register a file with the host's build output.
  fn emit_file(&self, asset: EmittedAsset);
}

/// Filesystem-backed host used by the CLI and tests.
///
/// Relative and absolute specifiers resolve against the importer's directory when the target
/// exists; bare specifiers are left unresolved. Emitted files are collected in memory.
#[derive(Debug, Default)]
pub struct FsHost {
  emitted: Mutex<Vec<EmittedAsset>>,
}

impl FsHost {
  /// Create a host with no emitted files.
  pub fn new() -> Self {
    Self::default()
  }

  /// Files emitted so far, in emission order.
  pub fn emitted(&self) -> Vec<EmittedAsset> {
    self
      .emitted
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
      .clone()
  }
}

#[async_trait]
impl HostContext for FsHost {
  async fn resolve(&self, specifier: &str, importer: &str) -> Option<String> {
    if !(specifier.starts_with('.') || specifier.starts_with('/')) {
      return None;
    }

    let candidate = resolve_full_id(importer, specifier);
    match tokio::fs::try_exists(clean_url(&candidate)).await {
      Ok(true) => Some(candidate),
      _ => None,
    }
  }

  fn emit_file(&self, asset: EmittedAsset) {
    self
      .emitted
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
      .push(asset);
  }
}
