//! Discovery of asset references inside stylesheets and component style blocks.

mod extract;
mod preprocess;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};

pub use extract::scan_references;
pub use preprocess::{Passthrough, StylePreprocessor};

use crate::alias::resolve_references;
use crate::asset_paths::{should_ignore_asset_reference, split_query};
use crate::descriptor::{DescriptorOptions, is_component_file};
use crate::host::HostContext;
use crate::session::BuildSession;

/// Extracts and resolves the asset references of one CSS-like identifier.
#[derive(Debug, Clone, Copy)]
pub struct CssReferenceExtractor<'a> {
  session: &'a BuildSession,
}

impl<'a> CssReferenceExtractor<'a> {
  /// Extractor bound to a build session.
  pub fn new(session: &'a BuildSession) -> Self {
    Self { session }
  }

  /// Raw reference strings found in the identifier's content, before alias resolution.
  ///
  /// Component files contribute the union of their style blocks; a missing file yields nothing.
  pub async fn raw_references(&self, id: &str) -> Result<Vec<String>> {
    let Some(content) = self.session.content().get(id).await? else {
      return Ok(Vec::new());
    };

    let (path, _) = split_query(id);
    if !is_component_file(path) {
      return Ok(self.scan(id, &String::from_utf8_lossy(&content)).await);
    }

    let compiler = self.session.compiler().await?;
    let descriptor = self
      .session
      .descriptors()
      .get_descriptor(Path::new(path), id, DescriptorOptions {
        root: &self.session.config().root,
        compiler,
      })
      .await?;

    let mut references: Vec<String> = Vec::new();
    for style in &descriptor.styles {
      for reference in self.scan(id, &style.content).await {
        if !references.contains(&reference) {
          references.push(reference);
        }
      }
    }
    Ok(references)
  }

  /// Resolved identifiers of every asset the content references.
  pub async fn extract(&self, host: &Arc<dyn HostContext>, id: &str) -> Result<Vec<String>> {
    let references: Vec<String> = self
      .raw_references(id)
      .await?
      .into_iter()
      .filter(|reference| !should_ignore_asset_reference(reference))
      .collect();
    if references.is_empty() {
      return Ok(references);
    }

    debug!(target: "lib_assets", "{id}: resolving {} references", references.len());
    resolve_references(host, &self.session.config().alias, &references, id).await
  }

  async fn scan(&self, id: &str, code: &str) -> Vec<String> {
    let source = match self.session.preprocessor().preprocess(code, id).await {
      Ok(source) => source,
      Err(err) => {
        warn!(target: "lib_assets", "[lib-assets]: failed to preprocess {id}: {err:#}");
        code.to_string()
      }
    };
    scan_references(&source)
  }
}
