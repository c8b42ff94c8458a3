//! Glyph discovery: CSS `content` values and external content files.
//!
//! Extraction is regex-based and deliberately forgiving; a stylesheet or a
//! content file never fails the run. Scans are deterministic (input order)
//! and deduplicate through [`GlyphSet`].

use crate::config::{ContentSource, ScanType};
use crate::report::ScanReport;
use log::{debug, warn};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// The set of required glyphs, one entry per Unicode code point.
#[derive(Debug, Clone, Default)]
pub struct GlyphSet {
  chars: HashSet<char>,
}

impl GlyphSet {
  pub fn new() -> GlyphSet {
    GlyphSet::default()
  }

  /// Add a glyph; returns false when it was already present.
  pub fn insert(&mut self, ch: char) -> bool {
    self.chars.insert(ch)
  }

  pub fn contains(&self, ch: char) -> bool {
    self.chars.contains(&ch)
  }

  pub fn len(&self) -> usize {
    self.chars.len()
  }

  pub fn is_empty(&self) -> bool {
    self.chars.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = char> + '_ {
    self.chars.iter().copied()
  }

  /// Glyphs in ascending code-point order, for stable logging and tests.
  pub fn sorted(&self) -> Vec<char> {
    let mut out: Vec<char> = self.chars.iter().copied().collect();
    out.sort_unstable();
    out
  }
}

impl FromIterator<char> for GlyphSet {
  fn from_iter<I: IntoIterator<Item = char>>(iter: I) -> GlyphSet {
    GlyphSet {
      chars: iter.into_iter().collect(),
    }
  }
}

fn regex(pattern: &'static str, desc: &'static str) -> Regex {
  Regex::new(pattern).unwrap_or_else(|err| panic!("invalid {desc} regex: {err}"))
}

/// Strip the quotes wrapping a `content` value.
///
/// A single trailing quote (optionally followed by spaces) must be present
/// for anything to be stripped; the leading quote is then removed only when
/// the value starts with optional spaces plus a quote. The two quotes need
/// not match each other. Unterminated values pass through untouched, quote
/// included.
fn strip_content_quotes(value: &str) -> &str {
  let end_trimmed = value.trim_end_matches(' ');
  if !(end_trimmed.ends_with('"') || end_trimmed.ends_with('\'')) {
    return value;
  }
  let without_trailing = &end_trimmed[..end_trimmed.len() - 1];
  let start_trimmed = without_trailing.trim_start_matches(' ');
  if start_trimmed.starts_with('"') || start_trimmed.starts_with('\'') {
    &start_trimmed[1..]
  } else {
    without_trailing
  }
}

/// Extract every glyph referenced by one raw CSS `content` value.
///
/// Escape sequences (`\` + 2-6 hex digits) are decoded first and removed;
/// the remainder is walked code point by code point, so astral characters
/// count as one glyph. Nothing is filtered here, whitespace included.
pub fn scan_content_value(value: &str, glyphs: &mut GlyphSet) {
  static CSS_ESCAPE: OnceLock<Regex> = OnceLock::new();
  let escape = CSS_ESCAPE.get_or_init(|| regex(r"\\[0-9A-Fa-f]{2,6}", "css escape"));

  let stripped = strip_content_quotes(value);

  let mut remainder = String::with_capacity(stripped.len());
  let mut last = 0;
  for m in escape.find_iter(stripped) {
    if let Some(ch) = u32::from_str_radix(&m.as_str()[1..], 16)
      .ok()
      .and_then(char::from_u32)
    {
      debug!("content escape {} -> U+{:04X}", m.as_str(), ch as u32);
      glyphs.insert(ch);
    }
    remainder.push_str(&stripped[last..m.start()]);
    last = m.end();
  }
  remainder.push_str(&stripped[last..]);

  for ch in remainder.chars() {
    glyphs.insert(ch);
  }
}

/// Scan every raw `content` declaration value from a stylesheet.
pub fn scan_content_values<'a, I>(values: I, glyphs: &mut GlyphSet)
where
  I: IntoIterator<Item = &'a str>,
{
  for value in values {
    scan_content_value(value, glyphs);
  }
}

fn scan_html_escaped(text: &str, min: u32, max: u32, glyphs: &mut GlyphSet) {
  static HEX_REF: OnceLock<Regex> = OnceLock::new();
  static DEC_REF: OnceLock<Regex> = OnceLock::new();
  let hex = HEX_REF.get_or_init(|| regex(r"&#[Xx][0-9A-Fa-f]{2,6};", "hex char ref"));
  let dec = DEC_REF.get_or_init(|| regex(r"&#[0-9]{2,8};", "decimal char ref"));

  for m in hex.find_iter(text) {
    let digits = &m.as_str()[3..m.as_str().len() - 1];
    let decoded = u32::from_str_radix(digits, 16)
      .ok()
      .filter(|cp| *cp >= min && *cp <= max)
      .and_then(char::from_u32);
    if let Some(ch) = decoded {
      glyphs.insert(ch);
    }
  }
  for m in dec.find_iter(text) {
    let digits = &m.as_str()[2..m.as_str().len() - 1];
    let decoded = digits
      .parse::<u32>()
      .ok()
      .filter(|cp| *cp >= min && *cp <= max)
      .and_then(char::from_u32);
    if let Some(ch) = decoded {
      glyphs.insert(ch);
    }
  }
}

fn scan_unescaped(text: &str, min: u32, max: u32, glyphs: &mut GlyphSet) {
  for ch in text.chars() {
    let cp = ch as u32;
    if cp >= min && cp <= max && cp >= 0x20 {
      glyphs.insert(ch);
    }
  }
}

/// Scan the configured external content sources into `glyphs`.
///
/// Unreadable files are skipped and recorded in the report; a bad glob
/// pattern skips just that pattern. File bytes are decoded as UTF-8 with
/// replacement, matching how text editors and browsers treat stray bytes.
pub fn scan_content_sources(
  sources: &[ContentSource],
  glyphs: &mut GlyphSet,
  report: &mut ScanReport,
) {
  for source in sources {
    let (min, max) = source.bounds();
    for pattern in &source.files {
      let paths = match glob::glob(pattern) {
        Ok(paths) => paths,
        Err(err) => {
          warn!("invalid content glob {pattern}: {err}");
          continue;
        }
      };
      for entry in paths {
        let path = match entry {
          Ok(path) => path,
          Err(err) => {
            warn!("content glob entry error under {pattern}: {err}");
            continue;
          }
        };
        let bytes = match std::fs::read(&path) {
          Ok(bytes) => bytes,
          Err(err) => {
            warn!("skipping unreadable content file {}: {err}", path.display());
            report.unreadable_files.push(path);
            continue;
          }
        };
        let text = String::from_utf8_lossy(&bytes);
        match source.scan_type {
          ScanType::HtmlEscaped => scan_html_escaped(&text, min, max, glyphs),
          ScanType::Unescaped => scan_unescaped(&text, min, max, glyphs),
        }
        report.files_scanned += 1;
      }
    }
  }
}
