//! Component-file descriptors: compiler adapters, the built-in block parser and the
//! modification-time validated cache.

mod block;
mod cache;
mod compiler;

pub use block::BlockParser;
pub use cache::{DescriptorCache, DescriptorOptions, descriptor_id};
pub use compiler::{
  CompilerAdapter, ComponentParsers, SfcDescriptor, SfcError, SfcParseOptionsV2,
  SfcParseOptionsV3, SfcParseResult, SfcParserV2, SfcParserV3, SfcStyleBlock,
  resolve_compiler_version,
};

/// Extension of component files whose style blocks are scanned.
pub const COMPONENT_EXTENSION: &str = "vue";

/// Whether the (query-free) path names a component file.
pub fn is_component_file(path: &str) -> bool {
  std::path::Path::new(path)
    .extension()
    .is_some_and(|ext| ext == COMPONENT_EXTENSION)
}
