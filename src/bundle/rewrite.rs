//! Post-write correction of asset references across the final output set.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use super::replace::{contains_bounded, replace_bounded};
use crate::asset_paths::{is_assets_importer, output_dir, relative_output_path};
use crate::config::public_dir_of;
use crate::models::{AssetManifest, InlinedAssetRecord, OutputBundle, RewriteReport};
use crate::session::BuildSession;

/// Output path to text content, the working representation of every rewrite pass.
pub type SourceMap = BTreeMap<String, String>;

/// Rewrites inlined data URIs and root-relative asset references once the host has written the
/// bundle.
#[derive(Debug, Clone)]
pub struct BundleRewriter {
  out_dir: PathBuf,
  public_dir: Option<String>,
  assets: Vec<String>,
  inlined: Vec<InlinedAssetRecord>,
}

impl BundleRewriter {
  /// Rewriter for everything a session emitted.
  pub fn from_session(session: &BuildSession) -> Self {
    Self {
      out_dir: session.config().out_dir.clone(),
      public_dir: session.options().public_dir.clone(),
      assets: session.asset_paths(),
      inlined: session.inlined(),
    }
  }

  /// Rewriter for a manifest saved by an earlier build.
  pub fn from_manifest(manifest: &AssetManifest, out_dir: impl Into<PathBuf>) -> Self {
    let mut assets: Vec<String> = manifest
      .assets
      .iter()
      .map(|asset| asset.output_path.clone())
      .collect();
    assets.sort();
    assets.dedup();

    Self {
      out_dir: out_dir.into(),
      public_dir: manifest
        .public_url
        .as_deref()
        .filter(|url| !url.is_empty())
        .map(public_dir_of),
      assets,
      inlined: manifest.inlined.clone(),
    }
  }

  /// Text view of every output file.
  pub fn snapshot(bundle: &OutputBundle) -> SourceMap {
    bundle
      .iter()
      .map(|(name, file)| (name.clone(), file.to_text()))
      .collect()
  }

  /// Swap inlined data URIs in stylesheets for the emitted asset path.
  pub fn replace_inlined(&self, sources: &SourceMap) -> SourceMap {
    let mut updated = sources.clone();
    for (name, content) in updated.iter_mut() {
      if Path::new(name).extension().is_none_or(|ext| ext != "css") {
        continue;
      }
      for record in &self.inlined {
        if !content.contains(&record.data_uri) {
          continue;
        }
        let target = match &self.public_dir {
          Some(public_dir) => format!("{public_dir}{}", record.output_path),
          None => format!("./{}", record.output_path),
        };
        *content = content.replace(&record.data_uri, &target);
      }
    }
    updated
  }

  /// Rewrite `./<asset>` references relative to each importing file's own directory.
  pub fn relativize(&self, sources: &SourceMap) -> SourceMap {
    let mut updated = sources.clone();
    for (name, content) in updated.iter_mut() {
      if !is_assets_importer(name) {
        continue;
      }
      let file_dir = output_dir(name);
      for asset in &self.assets {
        let relative = relative_output_path(file_dir, asset);
        let original = format!("./{asset}");
        if *asset != relative && contains_bounded(content, &original) {
          *content = replace_bounded(content, &original, &relative);
        }
      }
    }
    updated
  }

  /// Run both passes and return only the files whose content changed.
  ///
  /// The de-inline pass must come first: it introduces the `./` references the second pass
  /// relativizes.
  pub fn rewrite(&self, bundle: &OutputBundle) -> SourceMap {
    let initial = Self::snapshot(bundle);
    let deinlined = self.replace_inlined(&initial);
    let finalized = self.relativize(&deinlined);

    finalized
      .into_iter()
      .filter(|(name, content)| initial.get(name) != Some(content))
      .collect()
  }

  /// Rewrite the bundle and persist the changed files under the output directory.
  pub async fn run(&self, bundle: &OutputBundle) -> Result<RewriteReport> {
    let changed = self.rewrite(bundle);
    let mut report = RewriteReport::default();

    for (name, content) in changed {
      let target = self.out_dir.join(&name);
      tokio::fs::write(&target, content)
        .await
        .with_context(|| format!("failed to write {}", target.display()))?;
      debug!(target: "lib_assets", "rewrote {}", target.display());
      report.written.push(name);
    }

    if !report.written.is_empty() {
      info!(
        target: "lib_assets",
        "[lib-assets] rewrote asset references in {} file(s)",
        report.written.len()
      );
    }
    Ok(report)
  }
}
