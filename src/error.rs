//! Build-fatal error conditions raised by the asset pipeline.
//!
//! Soft conditions (missing files, preprocessing failures) never surface here; they are logged
//! and the pipeline continues with an empty or unprocessed result.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort processing of the file that triggered them.
#[derive(Debug, Error)]
pub enum PipelineError {
  /// The component parser reported at least one error; only the first is carried.
  #[error("failed to parse component file {file}: {message}")]
  ComponentParse {
    /// Component file whose parse failed.
    file: PathBuf,
    /// First error reported by the parser.
    message: String,
  },
  /// No component compiler package could be located for the project.
  #[error(
    "failed to resolve the component compiler from {root}; vue (>=2.7.0) must be present in the dependency tree"
  )]
  CompilerNotFound {
    /// Project root the lookup started from.
    root: PathBuf,
  },
  /// The component compiler was found but its major version is not supported.
  #[error("unknown component compiler version `{version}`")]
  UnknownCompilerVersion {
    /// Major version string read from the compiler package.
    version: String,
  },
  /// A filter pattern could not be compiled.
  #[error("invalid filter pattern `{pattern}`: {source}")]
  InvalidPattern {
    /// Pattern as written in the options.
    pattern: String,
    /// Underlying regex compilation error.
    source: regex::Error,
  },
}
