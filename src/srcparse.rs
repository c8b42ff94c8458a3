//! Parsing of `@font-face` `src` descriptor values.
//!
//! The parser is intentionally lax, built from the same splitting and
//! stripping steps browsers survive on: split on `url(`, cut trailing
//! `format(...)` hints, shed quotes, fragments and query strings. Junk that
//! survives cleaning still produces an entry; it just never matches a
//! format or extension lookup and therefore never loads.

use crate::format::FontFormat;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// One font file referenced from a `src` descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontFileRef {
  /// Local path (already resolved against the stylesheet directory) or a
  /// remote `http(s)` URL, kept verbatim.
  pub path: String,
  /// Lowercased extension taken from the URL. When the URL has no dot this
  /// holds the whole lowercased URL, which simply never matches a lookup.
  pub extension: String,
  /// Raw `format(...)` hint as written in the CSS, unvalidated.
  pub format: Option<String>,
}

impl FontFileRef {
  pub fn is_remote(&self) -> bool {
    is_remote_url(&self.path)
  }

  /// The format hint resolved to a known format, when it is one.
  pub fn known_format(&self) -> Option<FontFormat> {
    self.format.as_deref().and_then(FontFormat::from_css_name)
  }
}

/// Insertion-ordered collection of the files one rule references.
///
/// Lookups scan from the back so that the latest reference to a format or
/// extension wins, mirroring how repeated `src` declarations override each
/// other in CSS.
#[derive(Debug, Clone, Default)]
pub struct FontFileMap {
  files: Vec<FontFileRef>,
}

impl FontFileMap {
  pub fn new() -> FontFileMap {
    FontFileMap::default()
  }

  pub fn is_empty(&self) -> bool {
    self.files.is_empty()
  }

  pub fn len(&self) -> usize {
    self.files.len()
  }

  pub fn iter(&self) -> impl Iterator<Item = &FontFileRef> {
    self.files.iter()
  }

  pub fn by_format(&self, format: FontFormat) -> Option<&FontFileRef> {
    self
      .files
      .iter()
      .rev()
      .find(|f| f.known_format() == Some(format))
  }

  pub fn by_extension(&self, extension: &str) -> Option<&FontFileRef> {
    self.files.iter().rev().find(|f| f.extension == extension)
  }

  /// First reference wins for path and extension; a later `format(...)`
  /// hint for the same path overrides an earlier one, junk included.
  fn upsert(&mut self, path: String, extension: String, format: Option<String>) {
    if let Some(existing) = self.files.iter_mut().find(|f| f.path == path) {
      if format.is_some() {
        existing.format = format;
      }
    } else {
      self.files.push(FontFileRef {
        path,
        extension,
        format,
      });
    }
  }
}

fn regex(pattern: &'static str, desc: &'static str) -> Regex {
  Regex::new(pattern).unwrap_or_else(|err| panic!("invalid {desc} regex: {err}"))
}

pub fn is_remote_url(path: &str) -> bool {
  static REMOTE: OnceLock<Regex> = OnceLock::new();
  REMOTE
    .get_or_init(|| regex(r"(?i)^https?://", "remote url"))
    .is_match(path)
}

/// Parse one raw `src` value into `files`.
///
/// Relative URLs resolve against `src_root`, the directory of the
/// stylesheet being processed. A leading `/` is treated as relative to that
/// same root.
pub fn parse_font_src(src: &str, src_root: &Path, files: &mut FontFileMap) {
  static LINE_BREAKS: OnceLock<Regex> = OnceLock::new();
  static URL_OPEN: OnceLock<Regex> = OnceLock::new();
  static FORMAT_CUT: OnceLock<Regex> = OnceLock::new();
  static FORMAT_HEAD: OnceLock<Regex> = OnceLock::new();
  static FORMAT_END: OnceLock<Regex> = OnceLock::new();
  let line_breaks = LINE_BREAKS.get_or_init(|| regex(r"[\r\n\t]+", "line breaks"));
  let url_open = URL_OPEN.get_or_init(|| regex(r"(?i)url[ ]*\([ ]*", "url open"));
  let format_cut =
    FORMAT_CUT.get_or_init(|| regex(r"(?i)\)[ ]+format[ ]*\(.*$", "format cut"));
  let format_head =
    FORMAT_HEAD.get_or_init(|| regex(r#"(?i)^.*\)[ ]+format[ ]*\([ ]*["']*"#, "format head"));
  let format_end =
    FORMAT_END.get_or_init(|| regex(r#"["']*[ ]*\)[ ]*[,;]*[ ]*$"#, "format end"));

  let normalized = line_breaks.replace_all(src, " ");

  for segment in url_open.split(&normalized) {
    if !segment.contains(')') {
      continue;
    }

    let mut url: &str = &format_cut.replace(segment, "");
    if let Some(semi) = url.find(';') {
      url = &url[..semi];
    }
    url = url.trim_start_matches(|c| c == '"' || c == '\'');
    url = url.trim_end_matches(|c| c == '"' || c == '\'' || c == ' ' || c == ')');
    if let Some(hash) = url.find('#') {
      url = &url[..hash];
    }
    if let Some(query) = url.find('?') {
      url = &url[..query];
    }
    if url.is_empty() {
      continue;
    }

    let extension = match url.rfind('.') {
      Some(dot) => url[dot + 1..].to_ascii_lowercase(),
      None => url.to_ascii_lowercase(),
    };

    let format = if format_cut.is_match(segment) {
      let head_stripped = format_head.replace(segment, "");
      Some(format_end.replace(&head_stripped, "").into_owned())
    } else {
      None
    };

    let path = if is_remote_url(url) {
      url.to_string()
    } else {
      src_root
        .join(url.trim_start_matches('/'))
        .to_string_lossy()
        .into_owned()
    };
    files.upsert(path, extension, format);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parsed(src: &str) -> FontFileMap {
    let mut files = FontFileMap::new();
    parse_font_src(src, Path::new("/css"), &mut files);
    files
  }

  #[test]
  fn url_and_format_are_extracted() {
    let files = parsed("url(\"fonts/a.woff2\") format(\"woff2\")");
    let file = files.by_format(FontFormat::Woff2).unwrap();
    assert_eq!(file.path, "/css/fonts/a.woff2");
    assert_eq!(file.extension, "woff2");
    assert_eq!(file.format.as_deref(), Some("woff2"));
  }

  #[test]
  fn multiple_clauses_parse_in_order() {
    let files = parsed(
      "url(a.eot?#iefix) format('embedded-opentype'),\n    url(a.woff) format('woff'),\n    url(a.ttf) format('truetype')",
    );
    assert_eq!(files.len(), 3);
    assert!(files.by_format(FontFormat::EmbeddedOpentype).is_some());
    assert!(files.by_extension("ttf").is_some());
  }

  #[test]
  fn split_is_case_insensitive_and_space_tolerant() {
    let files = parsed("URL ( 'a.woff' ) FORMAT ( 'woff' )");
    let file = files.by_extension("woff").unwrap();
    assert_eq!(file.known_format(), Some(FontFormat::Woff));
  }

  #[test]
  fn format_requires_a_space_after_the_closing_paren() {
    let files = parsed("url(a.woff)format(\"woff\")");
    assert!(files.by_format(FontFormat::Woff).is_none());
  }

  #[test]
  fn fragments_and_queries_are_stripped() {
    let files = parsed("url(a.svg#glyph-id), url(b.eot?v=4.7.0)");
    assert!(files.by_extension("svg").is_some());
    assert!(files.by_extension("eot").is_some());
    assert!(files
      .iter()
      .all(|f| !f.path.contains('#') && !f.path.contains('?')));
  }

  #[test]
  fn remote_urls_are_kept_verbatim() {
    let files = parsed("url(https://cdn.example.com/a.woff2) format(\"woff2\")");
    let file = files.by_format(FontFormat::Woff2).unwrap();
    assert_eq!(file.path, "https://cdn.example.com/a.woff2");
    assert!(file.is_remote());
  }

  #[test]
  fn root_relative_urls_resolve_against_the_stylesheet_root() {
    let files = parsed("url(/fonts/a.ttf)");
    let file = files.by_extension("ttf").unwrap();
    assert_eq!(file.path, "/css/fonts/a.ttf");
  }

  #[test]
  fn repeated_paths_keep_the_first_entry_but_take_the_new_format() {
    let mut files = FontFileMap::new();
    parse_font_src("url(a.woff)", Path::new("/css"), &mut files);
    parse_font_src("url(a.woff) format(\"woff\")", Path::new("/css"), &mut files);
    assert_eq!(files.len(), 1);
    assert_eq!(
      files.by_extension("woff").unwrap().known_format(),
      Some(FontFormat::Woff)
    );
  }

  #[test]
  fn a_later_junk_hint_erases_an_earlier_format() {
    let mut files = FontFileMap::new();
    parse_font_src("url(a.woff) format(\"woff\")", Path::new("/css"), &mut files);
    parse_font_src("url(a.woff) format(\"mystery\")", Path::new("/css"), &mut files);
    assert_eq!(files.len(), 1);
    assert!(files.by_format(FontFormat::Woff).is_none());
  }

  #[test]
  fn latest_entry_wins_format_and_extension_lookups() {
    let files = parsed("url(old.woff) format(\"woff\"), url(new.woff) format(\"woff\")");
    let file = files.by_format(FontFormat::Woff).unwrap();
    assert!(file.path.ends_with("new.woff"));
  }

  #[test]
  fn unknown_format_hints_are_kept_raw() {
    let files = parsed("url(a.blob) format(\"fantasy\")");
    let file = files.by_extension("blob").unwrap();
    assert_eq!(file.format.as_deref(), Some("fantasy"));
    assert_eq!(file.known_format(), None);
  }

  #[test]
  fn urls_without_extensions_use_the_whole_name() {
    let files = parsed("url(iconfont)");
    assert!(files.by_extension("iconfont").is_some());
  }

  #[test]
  fn local_clauses_produce_no_loadable_candidates() {
    // the text before the first url( still becomes an entry, but one no
    // format or extension lookup will ever return
    let files = parsed("local(\"Helvetica\"), local(Arial)");
    assert_eq!(files.len(), 1);
    assert!(files.by_extension("ttf").is_none());
    assert!(files.by_format(FontFormat::Truetype).is_none());
  }
}
