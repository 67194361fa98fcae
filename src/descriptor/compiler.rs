use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::PipelineError;

/// One `<style>` block of a component file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SfcStyleBlock {
  /// Raw block content.
  pub content: String,
  /// Value of the `lang` attribute.
  pub lang: Option<String>,
  /// Whether the block carries `scoped`.
  pub scoped: bool,
  /// Whether the block carries `module`.
  pub module: bool,
}

/// Parsed structure of a component file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SfcDescriptor {
  /// Stable id derived from the file's project-relative path.
  pub id: String,
  /// Filename the descriptor was parsed for.
  pub filename: String,
  /// Style blocks in source order.
  pub styles: Vec<SfcStyleBlock>,
}

/// Error reported by a component parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SfcError {
  /// Human readable message.
  pub message: String,
  /// Byte offset in the source where the problem was detected.
  pub offset: usize,
}

impl std::fmt::Display for SfcError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} (at byte {})", self.message, self.offset)
  }
}

impl std::error::Error for SfcError {}

/// Descriptor plus every error the parser reported.
#[derive(Debug, Clone, Default)]
pub struct SfcParseResult {
  /// Parsed descriptor; partial when `errors` is not empty.
  pub descriptor: SfcDescriptor,
  /// Reported errors in source order.
  pub errors: Vec<SfcError>,
}

/// Arguments of the version 2 calling convention: a single options object.
#[derive(Debug, Clone, Copy)]
pub struct SfcParseOptionsV2<'a> {
  /// Component source.
  pub source: &'a str,
  /// Filename used in diagnostics.
  pub filename: &'a str,
  /// Whether to produce source maps.
  pub source_map: bool,
}

/// Options of the version 3 calling convention, passed next to the source.
#[derive(Debug, Clone, Copy)]
pub struct SfcParseOptionsV3<'a> {
  /// Filename used in diagnostics.
  pub filename: &'a str,
  /// Whether to produce source maps.
  pub source_map: bool,
}

/// Version 2 parser: returns the descriptor or fails outright.
pub trait SfcParserV2: Send + Sync {
  /// Parse a component file.
  fn parse(&self, options: SfcParseOptionsV2<'_>) -> Result<SfcDescriptor, SfcError>;
}

/// Version 3 parser: always returns a descriptor alongside collected errors.
pub trait SfcParserV3: Send + Sync {
  /// Parse a component file.
  fn parse(&self, source: &str, options: SfcParseOptionsV3<'_>) -> SfcParseResult;
}

/// Component compiler selected once per session.
#[derive(Clone)]
pub enum CompilerAdapter {
  /// Version 2 calling convention.
  V2(Arc<dyn SfcParserV2>),
  /// Version 3 calling convention.
  V3(Arc<dyn SfcParserV3>),
}

impl std::fmt::Debug for CompilerAdapter {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::V2(_) => f.write_str("CompilerAdapter::V2"),
      Self::V3(_) => f.write_str("CompilerAdapter::V3"),
    }
  }
}

impl CompilerAdapter {
  /// Pick the calling convention for a compiler major version.
  pub fn select(version: &str, parsers: &ComponentParsers) -> Result<Self, PipelineError> {
    match version {
      "2" => Ok(Self::V2(Arc::clone(&parsers.v2))),
      "3" => Ok(Self::V3(Arc::clone(&parsers.v3))),
      other => Err(PipelineError::UnknownCompilerVersion {
        version: other.to_string(),
      }),
    }
  }

  /// Detect the compiler version installed under `root` and select the matching adapter.
  pub async fn detect(root: &Path, parsers: &ComponentParsers) -> Result<Self> {
    let version = resolve_compiler_version(root).await?;
    Ok(Self::select(&version, parsers)?)
  }

  /// Major version this adapter speaks.
  pub fn version(&self) -> &'static str {
    match self {
      Self::V2(_) => "2",
      Self::V3(_) => "3",
    }
  }

  /// Parse a component file regardless of the calling convention in use.
  ///
  /// A version 2 failure becomes the single reported error, paired with the descriptor of an
  /// empty source.
  pub fn parse(&self, source: &str, filename: &str) -> SfcParseResult {
    match self {
      Self::V2(parser) => match parser.parse(SfcParseOptionsV2 {
        source,
        filename,
        source_map: false,
      }) {
        Ok(descriptor) => SfcParseResult {
          descriptor,
          errors: Vec::new(),
        },
        Err(err) => SfcParseResult {
          descriptor: parser
            .parse(SfcParseOptionsV2 {
              source: "",
              filename,
              source_map: false,
            })
            .unwrap_or_default(),
          errors: vec![err],
        },
      },
      Self::V3(parser) => parser.parse(source, SfcParseOptionsV3 {
        filename,
        source_map: false,
      }),
    }
  }
}

/// Parser implementations available for each calling convention.
#[derive(Clone)]
pub struct ComponentParsers {
  /// Version 2 parser.
  pub v2: Arc<dyn SfcParserV2>,
  /// Version 3 parser.
  pub v3: Arc<dyn SfcParserV3>,
}

impl Default for ComponentParsers {
  fn default() -> Self {
    let parser = Arc::new(super::BlockParser);
    Self {
      v2: parser.clone(),
      v3: parser,
    }
  }
}

impl std::fmt::Debug for ComponentParsers {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ComponentParsers").finish_non_exhaustive()
  }
}

#[derive(Debug, Deserialize)]
struct PackageMeta {
  #[serde(default)]
  version: String,
}

/// Read the major version of the component compiler installed in the project.
pub async fn resolve_compiler_version(root: &Path) -> Result<String> {
  let manifest = root.join("node_modules").join("vue").join("package.json");
  let content = match tokio::fs::read_to_string(&manifest).await {
    Ok(content) => content,
    Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
      return Err(
        PipelineError::CompilerNotFound {
          root: root.to_path_buf(),
        }
        .into(),
      );
    }
    Err(err) => {
      return Err(err).with_context(|| format!("failed to read {}", manifest.display()));
    }
  };

  let meta: PackageMeta = serde_json::from_str(&content)
    .with_context(|| format!("failed to parse {}", manifest.display()))?;
  Ok(meta.version.split('.').next().unwrap_or_default().to_string())
}
