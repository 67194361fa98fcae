//! Helpers for classifying identifiers and computing asset output paths.
//!
//! Filtering, naming and path arithmetic live in focused submodules so each can be tested on
//! its own. Output paths are always forward-slash strings relative to the build output root.

mod filters;
mod naming;
mod paths;

pub use filters::{
  AssetFilter, FilterPattern, KNOWN_ASSET_TYPES, is_assets_importer, is_css_request,
  should_ignore_asset_reference,
};
pub use naming::{DEFAULT_HASH_LENGTH, DEFAULT_NAME_TEMPLATE, NameSource, NamingOracle, content_hash};
pub use paths::{
  clean_url, join_output_path, normalize_path, output_dir, relative_output_path, resolve_full_id,
  split_query, to_slash,
};
