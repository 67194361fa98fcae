use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::{Captures, Regex};
use sha2::{Digest, Sha256};

use crate::asset_paths::{normalize_path, to_slash};

/// Template used when no `name` option is configured.
pub const DEFAULT_NAME_TEMPLATE: &str = "[contenthash].[ext]";

/// Hex characters kept from the content digest when a hash token carries no length.
pub const DEFAULT_HASH_LENGTH: usize = 16;

fn token_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| {
    Regex::new(r"\[(name|ext|path|folder|query|hash|contenthash)(?::(\d+))?\]")
      .expect("invalid name token regex")
  })
}

/// Resource description handed to the naming oracle.
#[derive(Debug, Clone, Copy)]
pub struct NameSource<'a> {
  /// Absolute path of the resource, without query.
  pub resource_path: &'a str,
  /// Query attached to the identifier, without the leading `?`.
  pub resource_query: Option<&'a str>,
  /// Raw content bytes; hashes derive from these, never from the path.
  pub content: &'a [u8],
}

/// Deterministic mapping from a resource to its output filename.
#[derive(Debug, Clone)]
pub struct NamingOracle {
  template: String,
  root: PathBuf,
}

impl NamingOracle {
  /// Create an oracle for the template; `[path]` is computed relative to `root`.
  pub fn new(template: impl Into<String>, root: impl Into<PathBuf>) -> Self {
    Self {
      template: template.into(),
      root: root.into(),
    }
  }

  /// Interpolate the template for the given resource.
  pub fn file_name(&self, source: &NameSource<'_>) -> String {
    let path = Path::new(source.resource_path);
    let mut digest: Option<String> = None;

    token_pattern()
      .replace_all(&self.template, |caps: &Captures<'_>| match &caps[1] {
        "name" => path
          .file_stem()
          .map(|stem| stem.to_string_lossy().into_owned())
          .unwrap_or_else(|| "file".into()),
        "ext" => path
          .extension()
          .map(|ext| ext.to_string_lossy().into_owned())
          .unwrap_or_else(|| "bin".into()),
        "path" => self.relative_dir(path),
        "folder" => path
          .parent()
          .and_then(Path::file_name)
          .map(|name| name.to_string_lossy().into_owned())
          .unwrap_or_default(),
        "query" => source
          .resource_query
          .map(|query| format!("?{query}"))
          .unwrap_or_default(),
        _ => {
          let full = digest.get_or_insert_with(|| content_hash(source.content));
          let length = caps
            .get(2)
            .and_then(|m| m.as_str().parse::<usize>().ok())
            .unwrap_or(DEFAULT_HASH_LENGTH)
            .min(full.len());
          full[..length].to_string()
        }
      })
      .into_owned()
  }

  fn relative_dir(&self, path: &Path) -> String {
    let Some(parent) = path.parent() else {
      return String::new();
    };
    let parent = normalize_path(parent);
    let relative = parent
      .strip_prefix(normalize_path(&self.root))
      .map(Path::to_path_buf)
      .unwrap_or(parent);
    let rendered = to_slash(&relative);
    let trimmed = rendered.trim_matches('/');
    if trimmed.is_empty() {
      String::new()
    } else {
      format!("{trimmed}/")
    }
  }
}

/// Full hex SHA-256 digest of the content.
pub fn content_hash(content: &[u8]) -> String {
  hex::encode(Sha256::digest(content))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn source<'a>(path: &'a str, query: Option<&'a str>, content: &'a [u8]) -> NameSource<'a> {
    NameSource {
      resource_path: path,
      resource_query: query,
      content,
    }
  }

  #[test]
  fn default_template_uses_content_hash_and_extension() {
    let oracle = NamingOracle::new(DEFAULT_NAME_TEMPLATE, "/project");
    let name = oracle.file_name(&source("/project/src/logo.png", None, b"png-bytes"));
    let hash = &content_hash(b"png-bytes")[..DEFAULT_HASH_LENGTH];
    assert_eq!(name, format!("{hash}.png"));
  }

  #[test]
  fn is_deterministic_and_path_independent_for_hashes() {
    let oracle = NamingOracle::new("[contenthash:8].[ext]", "/project");
    let a = oracle.file_name(&source("/project/a/logo.png", None, b"same"));
    let b = oracle.file_name(&source("/project/b/other.png", None, b"same"));
    let again = oracle.file_name(&source("/project/a/logo.png", None, b"same"));
    assert_eq!(a, b);
    assert_eq!(a, again);
    assert_eq!(a.len(), "12345678.png".len());
  }

  #[test]
  fn different_content_changes_hash() {
    let oracle = NamingOracle::new("[name].[hash:8].[ext]", "/project");
    let a = oracle.file_name(&source("/project/logo.png", None, b"one"));
    let b = oracle.file_name(&source("/project/logo.png", None, b"two"));
    assert_ne!(a, b);
    assert!(a.starts_with("logo."));
  }

  #[test]
  fn interpolates_path_folder_and_query() {
    let oracle = NamingOracle::new("[path][folder]-[name][query].[ext]", "/project");
    let name = oracle.file_name(&source("/project/src/icons/star.svg", Some("inline"), b""));
    assert_eq!(name, "src/icons/icons-star?inline.svg");
  }

  #[test]
  fn leaves_unknown_tokens_untouched() {
    let oracle = NamingOracle::new("[emoji]-[name].[ext]", "/project");
    let name = oracle.file_name(&source("/project/a.txt", None, b""));
    assert_eq!(name, "[emoji]-a.txt");
  }
}
