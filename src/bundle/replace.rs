//! Substring replacement that only touches whole `./<path>` references.

fn is_path_char(c: char) -> bool {
  c.is_ascii_alphanumeric() || matches!(c, '.' | '/' | '_' | '-')
}

fn is_bounded(haystack: &str, start: usize, end: usize) -> bool {
  let before = haystack[..start].chars().next_back();
  let after = haystack[end..].chars().next();
  !before.is_some_and(is_path_char) && !after.is_some_and(is_path_char)
}

/// Whether `needle` occurs in `haystack` as a standalone reference.
pub fn contains_bounded(haystack: &str, needle: &str) -> bool {
  !needle.is_empty()
    && haystack
      .match_indices(needle)
      .any(|(start, _)| is_bounded(haystack, start, start + needle.len()))
}

/// Replace every standalone occurrence of `needle`.
///
/// Occurrences that continue a longer path on either side (`../assets/a.png` when looking for
/// `./assets/a.png`, or `./assets/a.png.map`) are left alone.
pub fn replace_bounded(haystack: &str, needle: &str, replacement: &str) -> String {
  if needle.is_empty() {
    return haystack.to_string();
  }

  let mut out = String::with_capacity(haystack.len());
  let mut last = 0;
  for (start, _) in haystack.match_indices(needle) {
    let end = start + needle.len();
    if start < last || !is_bounded(haystack, start, end) {
      continue;
    }
    out.push_str(&haystack[last..start]);
    out.push_str(replacement);
    last = end;
  }
  out.push_str(&haystack[last..]);
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn replaces_quoted_and_bare_references() {
    let css = ".a{background:url(./assets/a.png)} .b{background:url(\"./assets/a.png?v=1\")}";
    assert_eq!(
      replace_bounded(css, "./assets/a.png", "../assets/a.png"),
      ".a{background:url(../assets/a.png)} .b{background:url(\"../assets/a.png?v=1\")}"
    );
  }

  #[test]
  fn skips_references_that_continue_a_longer_path() {
    let js = "import a from '../assets/a.png'; const m = './assets/a.png.map'; x('/base./assets/a.png')";
    assert_eq!(replace_bounded(js, "./assets/a.png", "../assets/a.png"), js);
    assert!(!contains_bounded(js, "./assets/a.png"));
  }

  #[test]
  fn detects_standalone_reference() {
    assert!(contains_bounded("export default './assets/a.png';", "./assets/a.png"));
    assert!(!contains_bounded("", "./assets/a.png"));
  }
}
