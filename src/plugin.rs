//! Hook-shaped entry points driven by the host build tool.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};

use crate::bundle::{BundleRewriter, MANIFEST_FILE, save_manifest};
use crate::config::{Options, ResolvedConfig, check_formats};
use crate::css::StylePreprocessor;
use crate::descriptor::{CompilerAdapter, ComponentParsers};
use crate::engine::AssetResolutionEngine;
use crate::error::PipelineError;
use crate::host::HostContext;
use crate::models::{AssetManifest, OutputBundle, Resolution, RewriteReport};
use crate::session::BuildSession;

/// Library asset plugin.
///
/// `config_resolved` starts a fresh [`BuildSession`]; the other hooks are inert until then and
/// whenever the host is not producing a library build.
pub struct LibAssetsPlugin {
  options: Options,
  preprocessor: Option<Arc<dyn StylePreprocessor>>,
  parsers: Option<ComponentParsers>,
  compiler: Option<CompilerAdapter>,
  session: Option<BuildSession>,
}

impl std::fmt::Debug for LibAssetsPlugin {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("LibAssetsPlugin")
      .field("options", &self.options)
      .field("session", &self.session)
      .finish_non_exhaustive()
  }
}

impl LibAssetsPlugin {
  /// Create the plugin, rejecting options whose filters do not compile.
  ///
  /// Filters are compiled again against the project root in `config_resolved`.
  pub fn new(options: Options) -> Result<Self, PipelineError> {
    options.normalise(Path::new(""))?;
    Ok(Self {
      options,
      preprocessor: None,
      parsers: None,
      compiler: None,
      session: None,
    })
  }

  /// Use a stylesheet preprocessor for every session.
  pub fn with_preprocessor(mut self, preprocessor: Arc<dyn StylePreprocessor>) -> Self {
    self.preprocessor = Some(preprocessor);
    self
  }

  /// Use these component parsers once the compiler version is detected.
  pub fn with_parsers(mut self, parsers: ComponentParsers) -> Self {
    self.parsers = Some(parsers);
    self
  }

  /// Skip compiler detection and always use this adapter.
  pub fn with_compiler(mut self, compiler: CompilerAdapter) -> Self {
    self.compiler = Some(compiler);
    self
  }

  /// Capture the host's resolved configuration and start a new build session.
  pub fn config_resolved(&mut self, config: ResolvedConfig) -> Result<(), PipelineError> {
    if let Some(lib) = &config.lib
      && !check_formats(&lib.formats)
      && self.options.public_url.is_some()
    {
      warn!(
        target: "lib_assets",
        "[lib-assets] The publicUrl configuration will be applied to all output formats."
      );
    }

    let mut session = BuildSession::new(config, &self.options)?;
    if let Some(preprocessor) = &self.preprocessor {
      session = session.with_preprocessor(Arc::clone(preprocessor));
    }
    if let Some(parsers) = &self.parsers {
      session = session.with_parsers(parsers.clone());
    }
    if let Some(compiler) = &self.compiler {
      session = session.with_compiler(compiler.clone());
    }
    self.session = Some(session);
    Ok(())
  }

  /// Session of the current build.
  pub fn session(&self) -> Option<&BuildSession> {
    self.session.as_ref()
  }

  fn library_session(&self) -> Option<&BuildSession> {
    self.session.as_ref().filter(|session| session.config().is_lib())
  }

  /// Resolution hook: emit assets and tell the host how to reference them.
  pub async fn resolve_id(
    &self,
    host: &Arc<dyn HostContext>,
    source: &str,
    importer: Option<&str>,
  ) -> Result<Resolution> {
    let Some(session) = self.library_session() else {
      return Ok(Resolution::PassThrough);
    };
    AssetResolutionEngine::new(session)
      .resolve_reference(host, importer, source)
      .await
  }

  /// Load hook: serve identifiers resolved in public URL mode as modules exporting their URL.
  pub fn load(&self, id: &str) -> Option<String> {
    let session = self.library_session()?;
    let asset_path = session.module_asset(id)?;
    let public_dir = session.options().public_dir.as_deref().unwrap_or_default();
    Some(format!("export default '{public_dir}{asset_path}'"))
  }

  /// Post-write hook: correct asset references across the written bundle.
  pub async fn write_bundle(&self, bundle: &OutputBundle) -> Result<RewriteReport> {
    let Some(session) = self.library_session() else {
      return Ok(RewriteReport::default());
    };
    debug!(target: "lib_assets", "rewriting {} output files", bundle.len());
    BundleRewriter::from_session(session).run(bundle).await
  }

  /// Snapshot of the current build's emitted assets.
  pub fn manifest(&self) -> Option<AssetManifest> {
    self.session.as_ref().map(BuildSession::manifest)
  }

  /// Save the manifest next to the build output so `lib-assets rewrite` can replay the rewrite.
  pub fn save_manifest(&self) -> Result<Option<PathBuf>> {
    let Some(session) = self.library_session() else {
      return Ok(None);
    };
    let path = session.config().out_dir.join(MANIFEST_FILE);
    save_manifest(&path, &session.manifest())?;
    Ok(Some(path))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::host::FsHost;
  use tempfile::tempdir;

  #[tokio::test]
  async fn hooks_are_inert_outside_library_builds() {
    let temp = tempdir().unwrap();
    std::fs::write(temp.path().join("a.png"), b"png").unwrap();

    let mut plugin = LibAssetsPlugin::new(Options::default()).unwrap();
    let host: Arc<dyn HostContext> = Arc::new(FsHost::new());
    let importer = temp.path().join("main.js").to_string_lossy().into_owned();

    let before = plugin.resolve_id(&host, "./a.png", Some(&importer)).await.unwrap();
    assert_eq!(before, Resolution::PassThrough);

    let mut config = ResolvedConfig::library(temp.path());
    config.lib = None;
    plugin.config_resolved(config).unwrap();

    let after = plugin.resolve_id(&host, "./a.png", Some(&importer)).await.unwrap();
    assert_eq!(after, Resolution::PassThrough);
    assert!(plugin.load("anything").is_none());
    assert!(plugin.write_bundle(&OutputBundle::new()).await.unwrap().written.is_empty());
  }

  #[test]
  fn rejects_invalid_filters() {
    let result = LibAssetsPlugin::new(Options {
      exclude: vec!["/[/".into()],
      ..Options::default()
    });
    assert!(matches!(result, Err(PipelineError::InvalidPattern { .. })));
  }

  #[tokio::test]
  async fn load_serves_public_url_modules() {
    let temp = tempdir().unwrap();
    std::fs::write(temp.path().join("a.png"), b"png").unwrap();

    let mut plugin = LibAssetsPlugin::new(Options {
      public_url: Some("https://cdn.example.com".into()),
      name: Some("[name].[ext]".into()),
      ..Options::default()
    })
    .unwrap();
    plugin
      .config_resolved(ResolvedConfig::library(temp.path()))
      .unwrap();

    let host: Arc<dyn HostContext> = Arc::new(FsHost::new());
    let importer = temp.path().join("main.js").to_string_lossy().into_owned();
    let Resolution::Module { id } = plugin.resolve_id(&host, "./a.png", Some(&importer)).await.unwrap()
    else {
      panic!("expected module resolution");
    };
    assert_eq!(
      plugin.load(&id).as_deref(),
      Some("export default 'https://cdn.example.com/assets/a.png'")
    );
    assert!(plugin.load("/elsewhere.png").is_none());
  }
}
