use std::sync::OnceLock;

use regex::Regex;

fn css_url_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| {
    Regex::new(r#"url\((\s*(?:'[^']+'|"[^"]+")\s*|[^'")]+)\)"#).expect("invalid css url regex")
  })
}

// https://drafts.csswg.org/css-syntax-3/#identifier-code-point
fn is_identifier_code_point(c: char) -> bool {
  c.is_ascii_alphanumeric() || matches!(c, '_' | '-') || ('\u{80}'..='\u{FFFF}').contains(&c)
}

/// Arguments of every `url(...)` not preceded by an identifier code point.
///
/// Scanning resumes right after each match, so adjacent calls are all reported.
fn url_arguments(source: &str) -> Vec<&str> {
  let mut arguments = Vec::new();
  let mut at = 0;
  while let Some(caps) = css_url_pattern().captures_at(source, at) {
    let (Some(call), Some(argument)) = (caps.get(0), caps.get(1)) else {
      break;
    };
    if source[..call.start()].chars().next_back().is_some_and(is_identifier_code_point) {
      at = call.start() + "url(".len();
      continue;
    }
    arguments.push(argument.as_str());
    at = call.end();
  }
  arguments
}

fn css_image_set_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| {
    Regex::new(r"image-set\(((?:[\w\-]+\([^)]*\)|[^)])*)\)").expect("invalid css image-set regex")
  })
}

/// Collect the asset references named by `url(...)` and `image-set(...)` in style text.
///
/// Quotes are stripped and duplicates removed; first occurrence order is kept.
pub fn scan_references(source: &str) -> Vec<String> {
  let mut references = Vec::new();

  for argument in url_arguments(source) {
    push_unique(&mut references, strip_quotes(argument.trim()));
  }

  for caps in css_image_set_pattern().captures_iter(source) {
    for candidate in image_set_candidates(&caps[1]) {
      push_unique(&mut references, candidate);
    }
  }

  references
}

fn push_unique(references: &mut Vec<String>, candidate: &str) {
  if !candidate.is_empty() && !references.iter().any(|existing| existing == candidate) {
    references.push(candidate.to_string());
  }
}

fn strip_quotes(value: &str) -> &str {
  let quoted = value.len() >= 2
    && ((value.starts_with('\'') && value.ends_with('\''))
      || (value.starts_with('"') && value.ends_with('"')));
  if quoted { &value[1..value.len() - 1] } else { value }
}

/// Split an `image-set` argument list into its image references.
///
/// `url(...)` candidates are skipped because the `url` scan already reports them; other
/// functions (gradients) name no file.
fn image_set_candidates(arguments: &str) -> Vec<&str> {
  split_top_level(arguments)
    .into_iter()
    .filter_map(|option| {
      let option = option.trim();
      if let Some(quote) = option.chars().next().filter(|c| *c == '"' || *c == '\'') {
        let rest = &option[1..];
        return rest.find(quote).map(|end| &rest[..end]);
      }
      let token = option.split_whitespace().next()?;
      (!token.contains('(')).then_some(token)
    })
    .collect()
}

fn split_top_level(arguments: &str) -> Vec<&str> {
  let mut parts = Vec::new();
  let mut depth = 0usize;
  let mut quote: Option<char> = None;
  let mut start = 0;

  for (index, c) in arguments.char_indices() {
    match (quote, c) {
      (Some(open), c) if c == open => quote = None,
      (Some(_), _) => {}
      (None, '"' | '\'') => quote = Some(c),
      (None, '(') => depth += 1,
      (None, ')') => depth = depth.saturating_sub(1),
      (None, ',') if depth == 0 => {
        parts.push(&arguments[start..index]);
        start = index + 1;
      }
      _ => {}
    }
  }
  parts.push(&arguments[start..]);
  parts
}
