//! Resolution-time half of the pipeline: classify, fetch, emit and track assets.

use std::sync::Arc;

use anyhow::Result;
use base64::{Engine as _, engine::general_purpose};
use tracing::debug;

use crate::asset_paths::{
  NameSource, clean_url, is_css_request, join_output_path, resolve_full_id,
  should_ignore_asset_reference, split_query, to_slash,
};
use crate::css::CssReferenceExtractor;
use crate::host::HostContext;
use crate::mime;
use crate::models::{AssetIdentifier, AssetRecord, EmittedAsset, InlinedAssetRecord, Resolution};
use crate::session::BuildSession;

/// Orchestrates discovery, filtering and emission for one build session.
#[derive(Debug, Clone, Copy)]
pub struct AssetResolutionEngine<'a> {
  session: &'a BuildSession,
}

impl<'a> AssetResolutionEngine<'a> {
  /// Engine operating on `session`.
  pub fn new(session: &'a BuildSession) -> Self {
    Self { session }
  }

  /// Intercept a reference encountered by the host module graph.
  ///
  /// Stylesheet-like identifiers have their nested assets emitted first. The identifier itself is
  /// then emitted when it passes the asset filter and is above the size limit.
  pub async fn resolve_reference(
    &self,
    host: &Arc<dyn HostContext>,
    importer: Option<&str>,
    source: &str,
  ) -> Result<Resolution> {
    if should_ignore_asset_reference(source) {
      return Ok(Resolution::PassThrough);
    }

    let id = self.full_id(importer, source);

    if is_css_request(&id) {
      self.handle_css_assets(host, &id).await?;
    }

    if !self.session.options().filter.is_match(&id) {
      return Ok(Resolution::PassThrough);
    }

    let Some(content) = self.session.content().get(&id).await? else {
      return Ok(Resolution::PassThrough);
    };
    if self.session.options().is_below_limit(content.len()) {
      debug!(target: "lib_assets", "{id}: {} bytes, left to the host", content.len());
      return Ok(Resolution::PassThrough);
    }

    let asset_path = self.emit_asset(host, &id, content);
    if self.session.options().public_url.is_some() {
      self.session.record_module_asset(&id, &asset_path);
      Ok(Resolution::Module { id })
    } else {
      Ok(Resolution::External {
        id: format!("./{asset_path}"),
      })
    }
  }

  /// Emit every asset referenced by a stylesheet-like identifier.
  ///
  /// Discovered stylesheets are queued as well; each identifier is extracted once per session.
  pub async fn handle_css_assets(&self, host: &Arc<dyn HostContext>, id: &str) -> Result<()> {
    let extractor = CssReferenceExtractor::new(self.session);
    let mut pending = vec![id.to_string()];

    while let Some(current) = pending.pop() {
      if !self.session.claim_extraction(&current) {
        continue;
      }

      for asset_id in extractor.extract(host, &current).await? {
        if is_css_request(&asset_id) {
          pending.push(asset_id.clone());
        }
        if !self.session.options().filter.is_match(&asset_id) {
          continue;
        }
        let Some(content) = self.session.content().get(&asset_id).await? else {
          continue;
        };
        if self.session.options().is_below_limit(content.len()) {
          continue;
        }

        let data_uri = data_uri(&asset_id, &content);
        let output_path = self.emit_asset(host, &asset_id, content);
        self.session.record_inlined(InlinedAssetRecord {
          data_uri,
          output_path,
        });
      }
    }

    Ok(())
  }

  /// Emit an asset through the host and return its output-relative path.
  ///
  /// An identifier that was already emitted in this session returns its recorded path.
  pub fn emit_asset(&self, host: &Arc<dyn HostContext>, id: &str, content: Arc<[u8]>) -> String {
    if let Some(record) = self.session.asset(id) {
      return record.output_path;
    }

    let (path, query) = split_query(id);
    let url = self.session.naming().file_name(&NameSource {
      resource_path: path,
      resource_query: query,
      content: &content,
    });
    let config = self.session.config();
    let asset_path = join_output_path(&config.assets_dir, &url);
    let file_name = match query {
      Some(query) => asset_path.replace(&format!("?{query}"), ""),
      None => asset_path.clone(),
    };

    debug!(target: "lib_assets", "emitting {id} as {file_name}");
    host.emit_file(EmittedAsset {
      file_name,
      name: to_slash(&config.out_dir.join(&asset_path)),
      source: content.to_vec(),
    });
    self.session.record_asset(AssetRecord {
      identifier: AssetIdentifier::new(id),
      output_path: asset_path.clone(),
      content,
    });
    asset_path
  }

  fn full_id(&self, importer: Option<&str>, source: &str) -> String {
    match importer.filter(|importer| !importer.is_empty()) {
      Some(importer) => resolve_full_id(importer, source),
      None => {
        let root = format!("{}/", to_slash(&self.session.config().root));
        resolve_full_id(&root, source)
      }
    }
  }
}

/// `data:<mime>;base64,<content>` as a stylesheet pipeline would inline the asset.
pub fn data_uri(id: &str, content: &[u8]) -> String {
  format!(
    "data:{};base64,{}",
    mime::from_path(clean_url(id)),
    general_purpose::STANDARD.encode(content)
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::{Options, ResolvedConfig};
  use crate::host::FsHost;
  use std::path::Path;
  use tempfile::tempdir;

  fn session(root: &Path, options: Options) -> BuildSession {
    BuildSession::new(ResolvedConfig::library(root), &options).unwrap()
  }

  fn host() -> (Arc<FsHost>, Arc<dyn HostContext>) {
    let fs_host = Arc::new(FsHost::new());
    let dyn_host: Arc<dyn HostContext> = fs_host.clone();
    (fs_host, dyn_host)
  }

  fn importer(root: &Path) -> String {
    root.join("src/main.js").to_string_lossy().into_owned()
  }

  #[tokio::test]
  async fn emits_asset_and_returns_relative_external() {
    let temp = tempdir().unwrap();
    std::fs::create_dir_all(temp.path().join("src")).unwrap();
    std::fs::write(temp.path().join("src/a.png"), b"png bytes").unwrap();

    let session = session(temp.path(), Options::default());
    let (fs_host, host) = host();
    let resolution = AssetResolutionEngine::new(&session)
      .resolve_reference(&host, Some(&importer(temp.path())), "./a.png")
      .await
      .unwrap();

    let Resolution::External { id } = resolution else {
      panic!("expected external resolution, got {resolution:?}");
    };
    assert!(id.starts_with("./assets/"));
    assert!(id.ends_with(".png"));

    let emitted = fs_host.emitted();
    assert_eq!(emitted.len(), 1);
    assert_eq!(format!("./{}", emitted[0].file_name), id);
    assert!(emitted[0].name.ends_with(&emitted[0].file_name));
    assert_eq!(emitted[0].source, b"png bytes");
  }

  #[tokio::test]
  async fn root_relative_exclude_skips_matching_assets() {
    let temp = tempdir().unwrap();
    std::fs::create_dir_all(temp.path().join("src/icons")).unwrap();
    std::fs::write(temp.path().join("src/icons/a.png"), b"icon").unwrap();
    std::fs::write(temp.path().join("src/b.png"), b"photo").unwrap();

    let session = session(temp.path(), Options {
      exclude: vec!["src/icons/**".into()],
      ..Options::default()
    });
    let (fs_host, host) = host();
    let engine = AssetResolutionEngine::new(&session);

    let excluded = engine
      .resolve_reference(&host, Some(&importer(temp.path())), "./icons/a.png")
      .await
      .unwrap();
    assert_eq!(excluded, Resolution::PassThrough);
    assert!(fs_host.emitted().is_empty());

    let kept = engine
      .resolve_reference(&host, Some(&importer(temp.path())), "./b.png")
      .await
      .unwrap();
    assert!(matches!(kept, Resolution::External { .. }));
    assert_eq!(fs_host.emitted().len(), 1);
  }

  #[tokio::test]
  async fn public_url_resolves_to_synthetic_module() {
    let temp = tempdir().unwrap();
    std::fs::create_dir_all(temp.path().join("src")).unwrap();
    std::fs::write(temp.path().join("src/a.png"), b"png bytes").unwrap();

    let session = session(temp.path(), Options {
      public_url: Some("/static".into()),
      ..Options::default()
    });
    let (_, host) = host();
    let resolution = AssetResolutionEngine::new(&session)
      .resolve_reference(&host, Some(&importer(temp.path())), "./a.png")
      .await
      .unwrap();

    let Resolution::Module { id } = resolution else {
      panic!("expected module resolution, got {resolution:?}");
    };
    assert!(id.ends_with("/src/a.png"));
    assert!(session.module_asset(&id).unwrap().starts_with("assets/"));
  }

  #[tokio::test]
  async fn assets_at_or_below_limit_are_not_emitted() {
    let temp = tempdir().unwrap();
    std::fs::create_dir_all(temp.path().join("src")).unwrap();
    std::fs::write(temp.path().join("src/a.png"), b"1234").unwrap();

    let session = session(temp.path(), Options {
      limit: Some(4),
      ..Options::default()
    });
    let (fs_host, host) = host();
    let resolution = AssetResolutionEngine::new(&session)
      .resolve_reference(&host, Some(&importer(temp.path())), "./a.png")
      .await
      .unwrap();

    assert_eq!(resolution, Resolution::PassThrough);
    assert!(fs_host.emitted().is_empty());
    assert!(session.asset_paths().is_empty());
  }

  #[tokio::test]
  async fn non_assets_and_missing_files_pass_through() {
    let temp = tempdir().unwrap();
    let session = session(temp.path(), Options::default());
    let (fs_host, host) = host();
    let engine = AssetResolutionEngine::new(&session);
    let importer = importer(temp.path());

    for source in ["./util.js", "./missing.png", "https://cdn.example.com/a.png"] {
      let resolution = engine
        .resolve_reference(&host, Some(&importer), source)
        .await
        .unwrap();
      assert_eq!(resolution, Resolution::PassThrough, "{source}");
    }
    assert!(fs_host.emitted().is_empty());
  }

  #[tokio::test]
  async fn stylesheet_assets_are_emitted_and_recorded_as_inlined() {
    let temp = tempdir().unwrap();
    let src = temp.path().join("src");
    std::fs::create_dir_all(src.join("img")).unwrap();
    std::fs::write(src.join("img/logo.png"), b"logo").unwrap();
    std::fs::write(src.join("theme.css"), ".t { background: url(./img/logo.png) }").unwrap();
    std::fs::write(
      src.join("main.css"),
      "@import url('./theme.css'); .a { background: url('./img/logo.png') }",
    )
    .unwrap();

    let session = session(temp.path(), Options::default());
    let (fs_host, host) = host();
    let resolution = AssetResolutionEngine::new(&session)
      .resolve_reference(&host, Some(&importer(temp.path())), "./main.css")
      .await
      .unwrap();

    assert_eq!(resolution, Resolution::PassThrough);
    assert_eq!(fs_host.emitted().len(), 1);
    let inlined = session.inlined();
    assert_eq!(inlined.len(), 1);
    assert_eq!(inlined[0].data_uri, data_uri("/x/logo.png", b"logo"));
    assert_eq!(inlined[0].output_path, session.asset_paths()[0]);
    assert!(!session.claim_extraction(&src.join("theme.css").to_string_lossy()));
  }

  #[tokio::test]
  async fn empty_importer_resolves_against_root() {
    let temp = tempdir().unwrap();
    std::fs::write(temp.path().join("a.svg"), b"<svg/>").unwrap();

    let session = session(temp.path(), Options::default());
    let (_, host) = host();
    let resolution = AssetResolutionEngine::new(&session)
      .resolve_reference(&host, Some(""), "./a.svg")
      .await
      .unwrap();
    assert!(matches!(resolution, Resolution::External { .. }));
  }

  #[test]
  fn data_uri_uses_mime_of_clean_path() {
    assert_eq!(data_uri("/a.svg?inline", b"x"), "data:image/svg+xml;base64,eA==");
    assert_eq!(data_uri("/a.unknown", b"x"), "data:application/octet-stream;base64,eA==");
  }
}
