//! User options and their resolution into a runnable configuration.
//!
//! [`Options`] mirrors the JSON config surface one to one; [`Config`] is the
//! resolved bundle the pipeline actually consumes, with the output directory
//! made absolute against the stylesheet location and the zero-match policy
//! exclusion applied.

use crate::error::{ConfigError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// How emitted font files and `src` URLs are cache-busted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheBusting {
  /// Rename each emitted file to `<base>-<hash8>.<ext>`.
  #[default]
  File,
  /// Keep plain filenames, append `?fonthash=<hash8>` to each URL.
  Query,
  /// No cache busting.
  None,
}

impl CacheBusting {
  /// Parse the user-supplied mode. Matching is case-insensitive and any
  /// unrecognized value degrades to `None`.
  pub fn parse(raw: &str) -> CacheBusting {
    match raw.to_lowercase().as_str() {
      "file" => CacheBusting::File,
      "query" => CacheBusting::Query,
      _ => CacheBusting::None,
    }
  }
}

/// A glyph (or code-point bound) given either as a number or as a string
/// whose first code point is used.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum GlyphSpec {
  /// Numeric code point, e.g. `90`
  Code(u32),
  /// Single-character string, e.g. `"A"`
  Text(String),
}

impl GlyphSpec {
  /// Resolve to a code point. Empty strings resolve to `None`.
  pub fn code_point(&self) -> Option<u32> {
    match self {
      GlyphSpec::Code(cp) => Some(*cp),
      GlyphSpec::Text(s) => s.chars().next().map(|ch| ch as u32),
    }
  }
}

/// How an external content file is scanned for glyphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum ScanType {
  /// Extract `&#x...;` / `&#...;` numeric character references.
  HtmlEscaped,
  /// Scan raw text code point by code point.
  #[default]
  Unescaped,
}

impl From<String> for ScanType {
  fn from(raw: String) -> ScanType {
    if raw == "html_escaped" {
      ScanType::HtmlEscaped
    } else {
      ScanType::Unescaped
    }
  }
}

/// One external content source: glob patterns plus an inclusive code-point
/// window and a scan mode.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentSource {
  /// Glob patterns for the files to scan
  pub files: Vec<String>,
  /// Lower code-point bound (number or single character), default 20
  #[serde(default)]
  pub min: Option<GlyphSpec>,
  /// Upper code-point bound (number or single character), default 0xFFFFFFFF
  #[serde(default)]
  pub max: Option<GlyphSpec>,
  /// Scan mode, default unescaped
  #[serde(default)]
  pub scan_type: ScanType,
}

impl ContentSource {
  pub const DEFAULT_MIN: u32 = 20;
  pub const DEFAULT_MAX: u32 = 0xFFFF_FFFF;

  /// Resolved inclusive `[min, max]` window. A numeric `0` counts as unset
  /// and takes the default; a string bound resolves to its first code point.
  pub fn bounds(&self) -> (u32, u32) {
    fn effective(spec: &GlyphSpec) -> Option<u32> {
      match spec {
        GlyphSpec::Code(0) => None,
        GlyphSpec::Code(cp) => Some(*cp),
        GlyphSpec::Text(s) => s.chars().next().map(|ch| ch as u32),
      }
    }
    let min = self
      .min
      .as_ref()
      .and_then(effective)
      .unwrap_or(Self::DEFAULT_MIN);
    let max = self
      .max
      .as_ref()
      .and_then(effective)
      .unwrap_or(Self::DEFAULT_MAX);
    (min, max)
  }
}

/// The raw option surface, deserializable from a JSON config file.
///
/// Every field is optional; missing fields take the documented defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Options {
  /// When non-empty, only these families are subsetted; others are preserved
  pub purge_only_fonts: Vec<String>,
  /// Families left completely untouched
  pub ignore_fonts: Vec<String>,
  /// Families copied to the output directory without subsetting
  pub preserve_fonts: Vec<String>,
  /// Glyphs always kept in processed fonts (when the font has them)
  pub preserve_glyphs: Vec<GlyphSpec>,
  /// External content sources contributing required glyphs
  pub content: Vec<ContentSource>,
  /// When true (default), remote `src` URLs are never downloaded
  pub ignore_urls: bool,
  /// Preserve a font none of whose glyphs are required
  pub preserve_all_on_zero_matching_glyphs: bool,
  /// Ignore a font none of whose glyphs are required
  pub ignore_all_on_zero_matching_glyphs: bool,
  /// Keep all code points 0-254 present in processed fonts
  pub preserve_ascii: bool,
  /// Cache-busting mode: "file", "query" or anything else for none
  pub cache_busting: String,
  /// Output directory for emitted fonts, relative to the stylesheet
  pub to: Option<String>,
}

impl Default for Options {
  fn default() -> Options {
    Options {
      purge_only_fonts: Vec::new(),
      ignore_fonts: Vec::new(),
      preserve_fonts: Vec::new(),
      preserve_glyphs: Vec::new(),
      content: Vec::new(),
      ignore_urls: true,
      preserve_all_on_zero_matching_glyphs: true,
      ignore_all_on_zero_matching_glyphs: false,
      preserve_ascii: false,
      cache_busting: "file".to_string(),
      to: None,
    }
  }
}

impl Options {
  /// Load options from a JSON file.
  pub fn from_json_file(path: &Path) -> Result<Options> {
    let text = std::fs::read_to_string(path).map_err(|err| ConfigError::InvalidFile {
      path: path.display().to_string(),
      message: err.to_string(),
    })?;
    let options = serde_json::from_str(&text).map_err(|err| ConfigError::InvalidFile {
      path: path.display().to_string(),
      message: err.to_string(),
    })?;
    Ok(options)
  }
}

/// The resolved configuration consumed by the pipeline.
#[derive(Debug, Clone)]
pub struct Config {
  pub purge_only_fonts: Vec<String>,
  pub ignore_fonts: Vec<String>,
  pub preserve_fonts: Vec<String>,
  pub preserve_glyphs: Vec<GlyphSpec>,
  pub content: Vec<ContentSource>,
  pub ignore_urls: bool,
  pub preserve_all_on_zero_matching_glyphs: bool,
  pub ignore_all_on_zero_matching_glyphs: bool,
  pub preserve_ascii: bool,
  pub cache_busting: CacheBusting,
  /// Output directory as it appears inside rewritten `url(...)` values
  pub relative_to: String,
  /// Output directory on disk
  pub absolute_to: PathBuf,
}

impl Config {
  /// Resolve raw options against the stylesheet paths.
  ///
  /// `css_from` is the stylesheet being processed; `css_to` is where the
  /// rewritten stylesheet will be written, when that differs. The output
  /// directory is the configured `to` (default `"fonts"`) taken as-is when
  /// absolute, otherwise joined onto the directory of `css_to` (falling
  /// back to `css_from`'s directory).
  ///
  /// Setting `ignore_all_on_zero_matching_glyphs` forces
  /// `preserve_all_on_zero_matching_glyphs` off; the exclusion is
  /// deliberately one-directional.
  pub fn resolve(options: Options, css_from: &Path, css_to: Option<&Path>) -> Config {
    let relative_to = options.to.unwrap_or_else(|| "fonts".to_string());

    let absolute_to = if Path::new(&relative_to).is_absolute() {
      PathBuf::from(&relative_to)
    } else {
      let base = css_to
        .unwrap_or(css_from)
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
      base.join(&relative_to)
    };

    let mut preserve_all = options.preserve_all_on_zero_matching_glyphs;
    if options.ignore_all_on_zero_matching_glyphs {
      preserve_all = false;
    }

    Config {
      purge_only_fonts: options.purge_only_fonts,
      ignore_fonts: options.ignore_fonts,
      preserve_fonts: options.preserve_fonts,
      preserve_glyphs: options.preserve_glyphs,
      content: options.content,
      ignore_urls: options.ignore_urls,
      preserve_all_on_zero_matching_glyphs: preserve_all,
      ignore_all_on_zero_matching_glyphs: options.ignore_all_on_zero_matching_glyphs,
      preserve_ascii: options.preserve_ascii,
      cache_busting: CacheBusting::parse(&options.cache_busting),
      relative_to,
      absolute_to,
    }
  }
}
