use std::path::{Component, Path, PathBuf};

/// Split an identifier into its path and optional query (text after the first `?`).
pub fn split_query(id: &str) -> (&str, Option<&str>) {
  match id.split_once('?') {
    Some((path, query)) => (path, Some(query)),
    None => (id, None),
  }
}

/// Strip any query or fragment suffix from an identifier.
pub fn clean_url(id: &str) -> &str {
  match id.find(['?', '#']) {
    Some(index) => &id[..index],
    None => id,
  }
}

/// Lexically normalise a path, folding `.` and `..` segments without touching the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
  let mut result = PathBuf::new();
  for component in path.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => {
        if !result.pop() && !result.has_root() {
          result.push("..");
        }
      }
      other => result.push(other.as_os_str()),
    }
  }
  result
}

/// Resolve `source` relative to the directory of `importer`.
///
/// An importer ending in `/` is itself treated as the directory. Queries on the importer are
/// ignored when locating its directory, queries on the source are preserved.
pub fn resolve_full_id(importer: &str, source: &str) -> String {
  let importer_dir = if importer.ends_with('/') || importer.ends_with(std::path::MAIN_SEPARATOR) {
    PathBuf::from(importer)
  } else {
    Path::new(split_query(importer).0)
      .parent()
      .map(Path::to_path_buf)
      .unwrap_or_default()
  };

  let (source_path, query) = split_query(source);
  let resolved = normalize_path(&importer_dir.join(source_path));
  let resolved = to_slash(&resolved);
  match query {
    Some(query) => format!("{resolved}?{query}"),
    None => resolved,
  }
}

/// Render a path with forward slashes regardless of platform.
pub fn to_slash(path: &Path) -> String {
  path.to_string_lossy().replace('\\', "/")
}

/// Join an output directory and a file name into an output-relative path.
///
/// The generated path always uses forward slashes so that references written into bundles are
/// identical on every platform.
pub fn join_output_path(dir: &str, file: &str) -> String {
  let segments: Vec<&str> = dir
    .split(['/', '\\'])
    .chain(file.split(['/', '\\']))
    .filter(|segment| !segment.is_empty() && *segment != ".")
    .collect();
  segments.join("/")
}

/// Directory portion of an output-relative path (empty for files at the output root).
pub fn output_dir(name: &str) -> &str {
  match name.rfind('/') {
    Some(index) => &name[..index],
    None => "",
  }
}

/// Compute the path of `to` relative to the output directory `from_dir`.
///
/// Both arguments are output-relative, forward-slash paths.
pub fn relative_output_path(from_dir: &str, to: &str) -> String {
  let from: Vec<&str> = from_dir
    .split('/')
    .filter(|segment| !segment.is_empty() && *segment != ".")
    .collect();
  let target: Vec<&str> = to
    .split('/')
    .filter(|segment| !segment.is_empty() && *segment != ".")
    .collect();

  let shared = from
    .iter()
    .zip(target.iter())
    .take_while(|(a, b)| a == b)
    .count();

  let mut parts: Vec<&str> = vec![".."; from.len() - shared];
  parts.extend(&target[shared..]);
  parts.join("/")
}
