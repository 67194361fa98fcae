//! State owned by a single build: caches, emitted asset records and the selected compiler.

use std::sync::Arc;

use anyhow::Result;
use dashmap::{DashMap, DashSet};
use tokio::sync::OnceCell;

use crate::asset_paths::NamingOracle;
use crate::config::{NormalisedOptions, Options, ResolvedConfig};
use crate::content::ContentStore;
use crate::css::{Passthrough, StylePreprocessor};
use crate::descriptor::{CompilerAdapter, ComponentParsers, DescriptorCache};
use crate::error::PipelineError;
use crate::models::{AssetManifest, AssetRecord, InlinedAssetRecord, ManifestAsset};

/// Everything one build accumulates. Nothing outlives the session.
pub struct BuildSession {
  config: ResolvedConfig,
  options: NormalisedOptions,
  naming: NamingOracle,
  content: ContentStore,
  descriptors: DescriptorCache,
  parsers: ComponentParsers,
  compiler: OnceCell<CompilerAdapter>,
  preprocessor: Arc<dyn StylePreprocessor>,
  assets: DashMap<String, AssetRecord>,
  module_assets: DashMap<String, String>,
  inlined: DashMap<String, InlinedAssetRecord>,
  extracted: DashSet<String>,
}

impl std::fmt::Debug for BuildSession {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("BuildSession")
      .field("config", &self.config)
      .field("options", &self.options)
      .field("compiler", &self.compiler.get())
      .field("assets", &self.assets.len())
      .field("inlined", &self.inlined.len())
      .finish_non_exhaustive()
  }
}

impl BuildSession {
  /// Start a session for the resolved host configuration.
  pub fn new(config: ResolvedConfig, options: &Options) -> Result<Self, PipelineError> {
    let options = options.normalise(&config.root)?;
    let naming = NamingOracle::new(options.name.clone(), config.root.clone());
    Ok(Self {
      config,
      options,
      naming,
      content: ContentStore::new(),
      descriptors: DescriptorCache::new(),
      parsers: ComponentParsers::default(),
      compiler: OnceCell::new(),
      preprocessor: Arc::new(Passthrough),
      assets: DashMap::new(),
      module_assets: DashMap::new(),
      inlined: DashMap::new(),
      extracted: DashSet::new(),
    })
  }

  /// Replace the stylesheet preprocessor.
  pub fn with_preprocessor(mut self, preprocessor: Arc<dyn StylePreprocessor>) -> Self {
    self.preprocessor = preprocessor;
    self
  }

  /// Replace the parsers used once the compiler version is detected.
  pub fn with_parsers(mut self, parsers: ComponentParsers) -> Self {
    self.parsers = parsers;
    self
  }

  /// Use this compiler instead of detecting one from the project.
  pub fn with_compiler(mut self, compiler: CompilerAdapter) -> Self {
    self.compiler = OnceCell::from(compiler);
    self
  }

  /// Host settings captured at configuration time.
  pub fn config(&self) -> &ResolvedConfig {
    &self.config
  }

  /// Options with defaults applied.
  pub fn options(&self) -> &NormalisedOptions {
    &self.options
  }

  /// Naming oracle for the configured template.
  pub fn naming(&self) -> &NamingOracle {
    &self.naming
  }

  /// Raw content cache.
  pub fn content(&self) -> &ContentStore {
    &self.content
  }

  /// Component descriptor cache.
  pub fn descriptors(&self) -> &DescriptorCache {
    &self.descriptors
  }

  /// Stylesheet preprocessor.
  pub fn preprocessor(&self) -> &dyn StylePreprocessor {
    self.preprocessor.as_ref()
  }

  /// Compiler adapter, detected from the project on first use.
  pub async fn compiler(&self) -> Result<&CompilerAdapter> {
    self
      .compiler
      .get_or_try_init(|| CompilerAdapter::detect(&self.config.root, &self.parsers))
      .await
  }

  /// Claim an identifier for extraction; false when it was already claimed.
  pub fn claim_extraction(&self, id: &str) -> bool {
    self.extracted.insert(id.to_string())
  }

  /// Emitted record for an identifier.
  pub fn asset(&self, id: &str) -> Option<AssetRecord> {
    self.assets.get(id).map(|entry| entry.value().clone())
  }

  pub(crate) fn record_asset(&self, record: AssetRecord) {
    self
      .assets
      .insert(record.identifier.as_str().to_string(), record);
  }

  /// Output path served by the load hook for an identifier resolved in public URL mode.
  pub fn module_asset(&self, id: &str) -> Option<String> {
    self.module_assets.get(id).map(|entry| entry.value().clone())
  }

  pub(crate) fn record_module_asset(&self, id: &str, output_path: &str) {
    self
      .module_assets
      .insert(id.to_string(), output_path.to_string());
  }

  pub(crate) fn record_inlined(&self, record: InlinedAssetRecord) {
    self.inlined.insert(record.data_uri.clone(), record);
  }

  /// Output paths of every emitted asset, sorted and deduplicated.
  pub fn asset_paths(&self) -> Vec<String> {
    let mut paths: Vec<String> = self
      .assets
      .iter()
      .map(|entry| entry.value().output_path.clone())
      .collect();
    paths.sort();
    paths.dedup();
    paths
  }

  /// Inlined data URIs recorded so far, ordered by data URI.
  pub fn inlined(&self) -> Vec<InlinedAssetRecord> {
    let mut records: Vec<InlinedAssetRecord> = self
      .inlined
      .iter()
      .map(|entry| entry.value().clone())
      .collect();
    records.sort_by(|a, b| a.data_uri.cmp(&b.data_uri));
    records
  }

  /// Serialisable snapshot of what this session emitted.
  pub fn manifest(&self) -> AssetManifest {
    let mut assets: Vec<ManifestAsset> = self
      .assets
      .iter()
      .map(|entry| ManifestAsset {
        identifier: entry.value().identifier.clone(),
        output_path: entry.value().output_path.clone(),
      })
      .collect();
    assets.sort_by(|a, b| a.identifier.cmp(&b.identifier));

    AssetManifest {
      public_url: self.options.public_url.clone(),
      assets,
      inlined: self.inlined(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::AssetIdentifier;
  use tempfile::tempdir;

  #[test]
  fn manifest_lists_records_in_identifier_order() {
    let temp = tempdir().unwrap();
    let session = BuildSession::new(ResolvedConfig::library(temp.path()), &Options {
      public_url: Some("/static".into()),
      ..Options::default()
    })
    .unwrap();

    for (id, path) in [("/src/b.png", "assets/b.png"), ("/src/a.png", "assets/a.png")] {
      session.record_asset(AssetRecord {
        identifier: AssetIdentifier::new(id),
        output_path: path.into(),
        content: Arc::from(&b"x"[..]),
      });
    }
    session.record_inlined(InlinedAssetRecord {
      data_uri: "data:image/png;base64,eA==".into(),
      output_path: "assets/a.png".into(),
    });

    let manifest = session.manifest();
    assert_eq!(manifest.public_url.as_deref(), Some("/static"));
    assert_eq!(manifest.assets[0].identifier.as_str(), "/src/a.png");
    assert_eq!(manifest.inlined.len(), 1);
    assert_eq!(session.asset_paths(), vec!["assets/a.png", "assets/b.png"]);
  }

  #[test]
  fn claims_each_identifier_once() {
    let temp = tempdir().unwrap();
    let session = BuildSession::new(ResolvedConfig::library(temp.path()), &Options::default()).unwrap();
    assert!(session.claim_extraction("/src/a.css"));
    assert!(!session.claim_extraction("/src/a.css"));
  }

  #[tokio::test]
  async fn preset_compiler_skips_detection() {
    let temp = tempdir().unwrap();
    let session = BuildSession::new(ResolvedConfig::library(temp.path()), &Options::default())
      .unwrap()
      .with_compiler(CompilerAdapter::V3(Arc::new(crate::descriptor::BlockParser)));
    assert_eq!(session.compiler().await.unwrap().version(), "3");
  }

  #[tokio::test]
  async fn detection_failure_surfaces_from_compiler() {
    let temp = tempdir().unwrap();
    let session = BuildSession::new(ResolvedConfig::library(temp.path()), &Options::default()).unwrap();
    assert!(session.compiler().await.is_err());
  }
}
