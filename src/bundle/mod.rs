//! Post-write rewriting of the emitted bundle.

mod manifest;
mod replace;
mod rewrite;

pub use manifest::{MANIFEST_FILE, load_manifest, save_manifest};
pub use replace::{contains_bounded, replace_bounded};
pub use rewrite::{BundleRewriter, SourceMap};
