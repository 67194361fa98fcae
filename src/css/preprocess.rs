use anyhow::Result;
use async_trait::async_trait;

/// Style-language preprocessor (Sass, Less, PostCSS...) run before references are scanned.
#[async_trait]
pub trait StylePreprocessor: Send + Sync {
  /// Compile `code` belonging to `id` into plain CSS.
  async fn preprocess(&self, code: &str, id: &str) -> Result<String>;
}

/// Preprocessor that returns its input unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct Passthrough;

#[async_trait]
impl StylePreprocessor for Passthrough {
  async fn preprocess(&self, code: &str, _id: &str) -> Result<String> {
    Ok(code.to_string())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn passthrough_returns_input() {
    let out = Passthrough.preprocess(".a{}", "/src/a.css").await.unwrap();
    assert_eq!(out, ".a{}");
  }
}
