#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![allow(clippy::module_inception)]

pub mod alias;
pub mod asset_paths;
pub mod bundle;
pub mod config;
pub mod content;
pub mod css;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod host;
pub mod mime;
pub mod models;
pub mod plugin;
pub mod session;

pub use bundle::BundleRewriter;
pub use config::{LibConfig, LibraryFormat, Options, ResolvedConfig};
pub use engine::AssetResolutionEngine;
pub use error::PipelineError;
pub use host::{FsHost, HostContext};
pub use models::{AssetManifest, OutputBundle, OutputFile, Resolution, RewriteReport};
pub use plugin::LibAssetsPlugin;
pub use session::BuildSession;
