use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;

use super::compiler::{
  SfcDescriptor, SfcError, SfcParseOptionsV2, SfcParseOptionsV3, SfcParseResult, SfcParserV2,
  SfcParserV3, SfcStyleBlock,
};

fn style_open_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| Regex::new(r"(?i)<style(\s[^>]*)?>").expect("invalid style tag regex"))
}

fn attribute_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| {
    Regex::new(r#"([\w:-]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#)
      .expect("invalid attribute regex")
  })
}

/// Built-in component parser that only understands top-level `<style>` blocks.
///
/// It speaks both calling conventions so a project can run without an external compiler as long
/// as style extraction is all that is needed.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlockParser;

impl BlockParser {
  fn parse_source(source: &str, filename: &str) -> SfcParseResult {
    let mut descriptor = SfcDescriptor {
      filename: filename.to_string(),
      ..SfcDescriptor::default()
    };
    let mut errors = Vec::new();
    let template = template_range(source);
    let mut cursor = 0;

    while let Some(open) = style_open_pattern().find_at(source, cursor) {
      if template
        .as_ref()
        .is_some_and(|range| range.contains(&open.start()))
      {
        cursor = template.as_ref().map_or(open.end(), |range| range.end);
        continue;
      }

      let body_start = open.end();
      let Some(close) = find_ignore_case(&source[body_start..], "</style>") else {
        errors.push(SfcError {
          message: "unclosed <style> block".into(),
          offset: open.start(),
        });
        break;
      };

      let attributes = style_open_pattern()
        .captures(open.as_str())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or_default();

      let mut block = SfcStyleBlock {
        content: source[body_start..body_start + close].to_string(),
        ..SfcStyleBlock::default()
      };
      for caps in attribute_pattern().captures_iter(attributes) {
        let value = caps
          .get(2)
          .or_else(|| caps.get(3))
          .or_else(|| caps.get(4))
          .map(|m| m.as_str().to_string());
        match &caps[1] {
          "lang" => block.lang = value,
          "scoped" => block.scoped = true,
          "module" => block.module = true,
          _ => {}
        }
      }
      descriptor.styles.push(block);
      cursor = body_start + close + "</style>".len();
    }

    SfcParseResult { descriptor, errors }
  }
}

fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
  haystack.to_ascii_lowercase().find(needle)
}

fn template_range(source: &str) -> Option<Range<usize>> {
  let lower = source.to_ascii_lowercase();
  let start = lower.find("<template")?;
  let end = lower.rfind("</template>")?;
  (end > start).then(|| start..end + "</template>".len())
}

impl SfcParserV2 for BlockParser {
  fn parse(&self, options: SfcParseOptionsV2<'_>) -> Result<SfcDescriptor, SfcError> {
    let SfcParseResult { descriptor, errors } =
      Self::parse_source(options.source, options.filename);
    match errors.into_iter().next() {
      Some(err) => Err(err),
      None => Ok(descriptor),
    }
  }
}

impl SfcParserV3 for BlockParser {
  fn parse(&self, source: &str, options: SfcParseOptionsV3<'_>) -> SfcParseResult {
    Self::parse_source(source, options.filename)
  }
}
