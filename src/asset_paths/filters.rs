use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::asset_paths::{clean_url, to_slash};
use crate::error::PipelineError;

/// Extension patterns of the assets handled by default.
///
/// Entries are regex fragments so that spelling variants (`jpg`/`jpeg`, `woff`/`woff2`) share a
/// single entry.
pub const KNOWN_ASSET_TYPES: &[&str] = &[
  // images
  "apng",
  "png",
  "jpe?g",
  "jfif",
  "pjpeg",
  "pjp",
  "gif",
  "svg",
  "ico",
  "webp",
  "avif",
  // media
  "mp4",
  "webm",
  "ogg",
  "mp3",
  "wav",
  "flac",
  "aac",
  "opus",
  // fonts
  "woff2?",
  "eot",
  "ttf",
  "otf",
  // other
  "webmanifest",
  "pdf",
  "txt",
];

fn default_assets_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| {
    Regex::new(&format!(r"\.({})(\?.*)?$", KNOWN_ASSET_TYPES.join("|")))
      .expect("invalid known asset types regex")
  })
}

fn css_lang_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| {
    Regex::new(r"\.(css|less|sass|scss|styl|stylus|pcss|postcss|sss)(?:$|\?)")
      .expect("invalid css lang regex")
  })
}

fn assets_importer_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| {
    Regex::new(r"\.(css|js|cjs|mjs)(?:$|\?)").expect("invalid assets importer regex")
  })
}

fn asset_reference_ignores() -> &'static [Regex] {
  static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
  PATTERNS
    .get_or_init(|| {
      vec![
        Regex::new(r"(?i)^https?://").expect("invalid http(s) regex"),
        Regex::new(r"^//").expect("invalid protocol-relative regex"),
        Regex::new(r"(?i)^data:").expect("invalid data URI regex"),
        Regex::new(r"(?i)^mailto:").expect("invalid mailto regex"),
        Regex::new(r"^#").expect("invalid fragment regex"),
      ]
    })
    .as_slice()
}

/// Whether the identifier names style-language content that may reference further assets.
pub fn is_css_request(id: &str) -> bool {
  css_lang_pattern().is_match(id)
}

/// Whether an output file is eligible for the relativization pass.
pub fn is_assets_importer(name: &str) -> bool {
  assets_importer_pattern().is_match(name)
}

/// Determine whether a stylesheet reference points outside the project and must be skipped.
///
/// External URLs, data URIs and bare fragments never name a file on disk.
pub fn should_ignore_asset_reference(value: &str) -> bool {
  asset_reference_ignores()
    .iter()
    .any(|pattern| pattern.is_match(value))
}

/// A single include/exclude rule.
#[derive(Debug, Clone)]
pub enum FilterPattern {
  /// Glob matched against the identifier with its query removed.
  Glob {
    /// Pattern as written.
    source: String,
    /// Compiled, anchored translation of the glob.
    compiled: Regex,
  },
  /// Regular expression searched within the full identifier.
  Regex(Regex),
}

impl FilterPattern {
  /// Parse a pattern string: `/body/flags` is a regex, anything else is a glob.
  ///
  /// Relative globs are anchored at `root`. Globs starting with `**` or `/` match as written.
  pub fn parse(pattern: &str, root: &Path) -> Result<Self, PipelineError> {
    if let Some(rest) = pattern.strip_prefix('/')
      && let Some(end) = rest.rfind('/')
      && end > 0
    {
      let (body, flags) = (&rest[..end], &rest[end + 1..]);
      if flags.chars().all(|c| matches!(c, 'i' | 'm' | 's' | 'u' | 'g' | 'y')) {
        let inline: String = flags.chars().filter(|c| matches!(c, 'i' | 'm' | 's')).collect();
        let source = if inline.is_empty() {
          body.to_string()
        } else {
          format!("(?{inline}){body}")
        };
        return Self::regex(&source);
      }
    }
    Self::glob(pattern, root)
  }

  /// Compile a regular expression rule.
  pub fn regex(source: &str) -> Result<Self, PipelineError> {
    Regex::new(source)
      .map(Self::Regex)
      .map_err(|source_err| PipelineError::InvalidPattern {
        pattern: source.to_string(),
        source: source_err,
      })
  }

  /// Compile a glob rule (`**`, `*` and `?` wildcards); an empty `root` leaves it unanchored.
  pub fn glob(source: &str, root: &Path) -> Result<Self, PipelineError> {
    let compiled = Regex::new(&glob_to_regex(source, root)).map_err(|err| PipelineError::InvalidPattern {
      pattern: source.to_string(),
      source: err,
    })?;
    Ok(Self::Glob {
      source: source.to_string(),
      compiled,
    })
  }

  /// Test the rule against an identifier.
  pub fn is_match(&self, id: &str) -> bool {
    match self {
      Self::Glob { compiled, .. } => compiled.is_match(clean_url(id)),
      Self::Regex(regex) => regex.is_match(id),
    }
  }
}

fn glob_to_regex(glob: &str, root: &Path) -> String {
  let mut out = String::from("^");
  let mut glob = glob;
  let root = to_slash(root);
  if !root.is_empty() && !glob.starts_with("**") && !glob.starts_with('/') && !Path::new(glob).is_absolute() {
    out.push_str(&regex::escape(root.trim_end_matches('/')));
    out.push('/');
    glob = glob.trim_start_matches("./");
  }

  let mut chars = glob.chars().peekable();
  while let Some(c) = chars.next() {
    match c {
      '*' if chars.peek() == Some(&'*') => {
        chars.next();
        if chars.peek() == Some(&'/') {
          chars.next();
          out.push_str("(?:.*/)?");
        } else {
          out.push_str(".*");
        }
      }
      '*' => out.push_str("[^/]*"),
      '?' => out.push_str("[^/]"),
      other => out.push_str(&regex::escape(&other.to_string())),
    }
  }
  out.push('$');
  out
}

/// Include/exclude filter deciding which resolved identifiers are treated as assets.
#[derive(Debug, Clone)]
pub struct AssetFilter {
  include: Vec<FilterPattern>,
  exclude: Vec<FilterPattern>,
}

impl Default for AssetFilter {
  fn default() -> Self {
    Self {
      include: vec![FilterPattern::Regex(default_assets_pattern().clone())],
      exclude: Vec::new(),
    }
  }
}

impl AssetFilter {
  /// Build a filter from explicit rule lists; an empty include list accepts everything.
  pub fn new(include: Vec<FilterPattern>, exclude: Vec<FilterPattern>) -> Self {
    Self { include, exclude }
  }

  /// Replace the exclusion rules, keeping the inclusion rules.
  pub fn with_exclude(mut self, exclude: Vec<FilterPattern>) -> Self {
    self.exclude = exclude;
    self
  }

  /// Determine whether the identifier is an asset handled by the pipeline.
  pub fn is_match(&self, id: &str) -> bool {
    if id.contains('\0') {
      return false;
    }

    if self.exclude.iter().any(|pattern| pattern.is_match(id)) {
      return false;
    }

    self.include.is_empty() || self.include.iter().any(|pattern| pattern.is_match(id))
  }
}
