//! Data structures shared between the resolution phase and the post-write rewrite phase.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::asset_paths::split_query;

/// Absolute filesystem path plus optional query, the unit of asset identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetIdentifier(String);

impl AssetIdentifier {
  /// Wrap an identifier string.
  pub fn new(id: impl Into<String>) -> Self {
    Self(id.into())
  }

  /// Full identifier including the query.
  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// Filesystem path portion.
  pub fn path(&self) -> &str {
    split_query(&self.0).0
  }

  /// Query portion without the leading `?`.
  pub fn query(&self) -> Option<&str> {
    split_query(&self.0).1
  }
}

impl fmt::Display for AssetIdentifier {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// An asset that was emitted as a standalone output file.
#[derive(Debug, Clone)]
pub struct AssetRecord {
  /// Identifier the asset was resolved from.
  pub identifier: AssetIdentifier,
  /// Output path relative to the build output root.
  pub output_path: String,
  /// Raw content bytes.
  pub content: Arc<[u8]>,
}

/// A data URI that the host's stylesheet pipeline embedded and that must be swapped back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlinedAssetRecord {
  /// Exact `data:<mime>;base64,<content>` string to search for.
  pub data_uri: String,
  /// Output-relative path of the emitted copy.
  pub output_path: String,
}

/// File handed to the host's output-emission facility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedAsset {
  /// Output-relative file name, without any query marker.
  pub file_name: String,
  /// Descriptive name: the output directory joined with the asset path.
  pub name: String,
  /// File content.
  pub source: Vec<u8>,
}

/// Result of intercepting a reference during module resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
  /// Not an asset handled here; the host continues normal resolution.
  PassThrough,
  /// Resolved to this identifier, which the load hook serves as a synthetic module.
  Module {
    /// Identifier to load.
    id: String,
  },
  /// Resolved to an external reference relative to the importing output file.
  External {
    /// `./`-prefixed output path of the emitted asset.
    id: String,
  },
}

/// Body of a written output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputFile {
  /// Code chunk.
  Chunk {
    /// Generated code.
    code: String,
  },
  /// Textual asset (stylesheets, manifests).
  Text(String),
  /// Binary asset.
  Binary(Vec<u8>),
}

impl OutputFile {
  /// Content coerced to text.
  pub fn to_text(&self) -> String {
    match self {
      Self::Chunk { code } => code.clone(),
      Self::Text(text) => text.clone(),
      Self::Binary(bytes) => String::from_utf8_lossy(bytes).into_owned(),
    }
  }
}

/// Final output set keyed by output-relative path.
pub type OutputBundle = BTreeMap<String, OutputFile>;

/// Serialisable snapshot of what a build emitted, sufficient to rerun the rewrite phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetManifest {
  /// Public base URL the build was configured with.
  #[serde(default)]
  pub public_url: Option<String>,
  /// Emitted assets.
  #[serde(default)]
  pub assets: Vec<ManifestAsset>,
  /// Inlined data URIs and the emitted paths replacing them.
  #[serde(default)]
  pub inlined: Vec<InlinedAssetRecord>,
}

/// Emitted asset entry of an [`AssetManifest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestAsset {
  /// Identifier the asset was resolved from.
  pub identifier: AssetIdentifier,
  /// Output-relative path.
  pub output_path: String,
}

/// Outcome of the post-write rewrite phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteReport {
  /// Output-relative paths of the files whose content changed and was persisted.
  pub written: Vec<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn identifier_exposes_path_and_query() {
    let id = AssetIdentifier::new("/src/a.png?width=10");
    assert_eq!(id.path(), "/src/a.png");
    assert_eq!(id.query(), Some("width=10"));
    assert_eq!(id.to_string(), "/src/a.png?width=10");

    let bare = AssetIdentifier::new("/src/a.png");
    assert_eq!(bare.query(), None);
  }

  #[test]
  fn binary_output_coerces_to_text() {
    let file = OutputFile::Binary(b"a{}".to_vec());
    assert_eq!(file.to_text(), "a{}");
  }

  #[test]
  fn manifest_serialises_camel_case() {
    let manifest = AssetManifest {
      public_url: Some("/static".into()),
      assets: vec![ManifestAsset {
        identifier: AssetIdentifier::new("/src/a.png"),
        output_path: "assets/a.png".into(),
      }],
      inlined: Vec::new(),
    };
    let json = serde_json::to_string(&manifest).unwrap();
    assert!(json.contains("\"publicUrl\":\"/static\""));
    assert!(json.contains("\"outputPath\":\"assets/a.png\""));
    let back: AssetManifest = serde_json::from_str(&json).unwrap();
    assert_eq!(back, manifest);
  }
}
