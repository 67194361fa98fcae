//! Loading and saving the asset manifest consumed by the standalone rewrite command.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::models::AssetManifest;

/// Conventional manifest file name inside the output directory.
pub const MANIFEST_FILE: &str = "lib-assets.manifest.json";

/// Load an asset manifest from disk.
pub fn load_manifest(path: &Path) -> Result<AssetManifest> {
  let content = fs::read_to_string(path)
    .with_context(|| format!("manifest not found at {}", path.display()))?;
  let manifest: AssetManifest =
    serde_json::from_str(&content).context("failed to parse asset manifest JSON")?;
  Ok(manifest)
}

/// Write an asset manifest as prettified JSON, creating parent directories as needed.
pub fn save_manifest(path: &Path, manifest: &AssetManifest) -> Result<()> {
  if let Some(parent) = path.parent()
    && !parent.as_os_str().is_empty()
  {
    fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {}", parent.display()))?;
  }
  let json = serde_json::to_string_pretty(manifest).context("failed to serialise asset manifest")?;
  fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::{AssetIdentifier, ManifestAsset};
  use tempfile::tempdir;

  #[test]
  fn saves_and_loads_manifest() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("dist").join(MANIFEST_FILE);
    let manifest = AssetManifest {
      public_url: None,
      assets: vec![ManifestAsset {
        identifier: AssetIdentifier::new("/src/a.png"),
        output_path: "assets/a.png".into(),
      }],
      inlined: Vec::new(),
    };

    save_manifest(&path, &manifest).unwrap();
    assert_eq!(load_manifest(&path).unwrap(), manifest);
  }

  #[test]
  fn missing_manifest_is_an_error() {
    let temp = tempdir().unwrap();
    let err = load_manifest(&temp.path().join(MANIFEST_FILE)).unwrap_err();
    assert!(err.to_string().contains("manifest not found"));
  }
}
