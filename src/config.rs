//! Plugin options and the host build settings captured when configuration is resolved.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use crate::alias::Alias;
use crate::asset_paths::{AssetFilter, DEFAULT_NAME_TEMPLATE, FilterPattern};
use crate::error::PipelineError;

const DEFAULT_CONFIG_FILE: &str = "lib-assets.config.json";

/// User-facing plugin options.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Options {
  /// Patterns selecting which resolved identifiers are assets; defaults to the known asset types.
  pub include: Option<Vec<String>>,
  /// Patterns removing identifiers from the asset set.
  pub exclude: Vec<String>,
  /// Output filename template.
  pub name: Option<String>,
  /// Size in bytes at or below which assets are left to the host for inlining (0 = always emit).
  pub limit: Option<u64>,
  /// Public base URL; when set assets are served through synthetic modules.
  pub public_url: Option<String>,
}

impl Options {
  /// Attempt to load options from the provided directory.
  ///
  /// When the options file does not exist or fails to parse we fall back to default values so
  /// builds without a configuration file behave exactly like the built-in defaults.
  pub fn discover(root: &Path) -> Self {
    let candidate = root.join(DEFAULT_CONFIG_FILE);
    Self::from_path(&candidate).unwrap_or_default()
  }

  /// Read options from a specific JSON file.
  pub fn from_path(path: &Path) -> Option<Self> {
    let content = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&content) {
      Ok(options) => Some(options),
      Err(err) => {
        warn!(
          target: "lib_assets",
          "[lib-assets] ignoring malformed options file {}: {err}",
          path.display()
        );
        None
      }
    }
  }

  /// Compile filters against the project `root` and apply defaults.
  pub fn normalise(&self, root: &Path) -> Result<NormalisedOptions, PipelineError> {
    let exclude = self
      .exclude
      .iter()
      .map(|pattern| FilterPattern::parse(pattern, root))
      .collect::<Result<Vec<_>, _>>()?;

    let filter = match &self.include {
      Some(include) => AssetFilter::new(
        include
          .iter()
          .map(|pattern| FilterPattern::parse(pattern, root))
          .collect::<Result<Vec<_>, _>>()?,
        exclude,
      ),
      None => AssetFilter::default().with_exclude(exclude),
    };

    let public_url = self
      .public_url
      .as_deref()
      .filter(|url| !url.is_empty())
      .map(str::to_string);

    Ok(NormalisedOptions {
      filter,
      name: self
        .name
        .clone()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_NAME_TEMPLATE.to_string()),
      limit: self.limit.unwrap_or(0),
      public_dir: public_url.as_deref().map(public_dir_of),
      public_url,
    })
  }
}

/// Options after defaults have been applied and filters compiled.
#[derive(Debug, Clone)]
pub struct NormalisedOptions {
  /// Asset include/exclude filter.
  pub filter: AssetFilter,
  /// Naming template.
  pub name: String,
  /// Inline threshold in bytes.
  pub limit: u64,
  /// Public base URL as configured.
  pub public_url: Option<String>,
  /// Public base URL with a guaranteed trailing `/`.
  pub public_dir: Option<String>,
}

impl NormalisedOptions {
  /// Whether content of this size stays with the host instead of being emitted.
  pub fn is_below_limit(&self, size: usize) -> bool {
    self.limit > 0 && size as u64 <= self.limit
  }
}

pub(crate) fn public_dir_of(url: &str) -> String {
  if url.ends_with('/') {
    url.to_string()
  } else {
    format!("{url}/")
  }
}

/// Output format of a library build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryFormat {
  /// ES modules.
  Es,
  /// CommonJS.
  Cjs,
  /// Universal module definition.
  Umd,
  /// Immediately invoked function expression.
  Iife,
}

impl LibraryFormat {
  /// Formats consumed by another bundler rather than loaded directly.
  pub fn is_intermediate(self) -> bool {
    matches!(self, Self::Es | Self::Cjs)
  }

  /// Formats loaded directly by the final consumer.
  pub fn is_final(self) -> bool {
    matches!(self, Self::Umd | Self::Iife)
  }
}

/// Library build settings. Without them the pipeline stays inactive.
#[derive(Debug, Clone, Deserialize)]
pub struct LibConfig {
  /// Formats the library is emitted in.
  #[serde(default = "default_formats")]
  pub formats: Vec<LibraryFormat>,
}

impl Default for LibConfig {
  fn default() -> Self {
    Self {
      formats: default_formats(),
    }
  }
}

fn default_formats() -> Vec<LibraryFormat> {
  vec![LibraryFormat::Es, LibraryFormat::Umd]
}

/// True when the formats belong to exactly one of the intermediate or final groups.
pub fn check_formats(formats: &[LibraryFormat]) -> bool {
  let intermediate = formats.iter().any(|format| format.is_intermediate());
  let fin = formats.iter().any(|format| format.is_final());
  intermediate != fin
}

/// Host build settings captured at configuration-resolved time.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
  /// Project root; descriptor ids and `[path]` tokens are relative to it.
  pub root: PathBuf,
  /// Build output directory.
  pub out_dir: PathBuf,
  /// Subdirectory of the output that receives emitted assets.
  pub assets_dir: String,
  /// Library settings, `None` when the host is not building a library.
  pub lib: Option<LibConfig>,
  /// Alias table applied to stylesheet references.
  pub alias: Vec<Alias>,
}

impl ResolvedConfig {
  /// Library build rooted at `root` with the conventional `dist/assets` layout.
  pub fn library(root: impl Into<PathBuf>) -> Self {
    let root = root.into();
    Self {
      out_dir: root.join("dist"),
      root,
      assets_dir: "assets".into(),
      lib: Some(LibConfig::default()),
      alias: Vec::new(),
    }
  }

  /// Whether the host is producing a library build.
  pub fn is_lib(&self) -> bool {
    self.lib.is_some()
  }
}
