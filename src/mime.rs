//! MIME type lookup for data URIs built from asset contents.

use std::path::Path;

/// Fallback used when the extension is not recognised.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Guess the MIME type of an asset from its (query-free) path.
pub fn from_path(path: &str) -> &'static str {
  let ext = Path::new(path)
    .extension()
    .and_then(|e| e.to_str())
    .map(|e| e.to_ascii_lowercase());
  from_extension(ext.as_deref())
}

/// Guess the MIME type from a bare extension.
pub fn from_extension(ext: Option<&str>) -> &'static str {
  match ext {
    // Images
    Some("apng") => "image/apng",
    Some("png") => "image/png",
    Some("jpg" | "jpeg" | "jfif" | "pjpeg" | "pjp") => "image/jpeg",
    Some("gif") => "image/gif",
    Some("svg") => "image/svg+xml",
    Some("ico") => "image/x-icon",
    Some("webp") => "image/webp",
    Some("avif") => "image/avif",

    // Media
    Some("mp4") => "video/mp4",
    Some("webm") => "video/webm",
    Some("ogg") => "audio/ogg",
    Some("mp3") => "audio/mpeg",
    Some("wav") => "audio/wav",
    Some("flac") => "audio/flac",
    Some("aac") => "audio/aac",
    Some("opus") => "audio/ogg",

    // Fonts
    Some("woff") => "font/woff",
    Some("woff2") => "font/woff2",
    Some("eot") => "application/vnd.ms-fontobject",
    Some("ttf") => "font/ttf",
    Some("otf") => "font/otf",

    // Other
    Some("webmanifest") => "application/manifest+json",
    Some("pdf") => "application/pdf",
    Some("txt") => "text/plain",
    Some("css") => "text/css",
    Some("js" | "mjs" | "cjs") => "text/javascript",

    _ => OCTET_STREAM,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn detects_image_types() {
    assert_eq!(from_path("/src/logo.png"), "image/png");
    assert_eq!(from_path("/src/photo.JPG"), "image/jpeg");
    assert_eq!(from_path("/src/icon.svg"), "image/svg+xml");
  }

  #[test]
  fn detects_fonts() {
    assert_eq!(from_path("fonts/inter.woff2"), "font/woff2");
    assert_eq!(from_path("fonts/legacy.eot"), "application/vnd.ms-fontobject");
  }

  #[test]
  fn falls_back_to_octet_stream() {
    assert_eq!(from_path("/src/blob"), OCTET_STREAM);
    assert_eq!(from_path("/src/archive.xyz"), OCTET_STREAM);
  }
}
