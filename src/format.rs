//! Font format identifiers and the fixed processing-order tables.
//!
//! Formats are a closed enum so lookups are typed end to end; the CSS-level
//! `format("...")` names and file extensions hang off accessors instead of
//! being scattered as string literals.

use std::fmt;

/// A web font container format, identified the way CSS `format()` names them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontFormat {
  /// `embedded-opentype`, the legacy IE `.eot` container
  EmbeddedOpentype,
  /// `woff2`, Brotli-compressed
  Woff2,
  /// `woff`, zlib-compressed
  Woff,
  /// `truetype`, raw sfnt with glyf outlines
  Truetype,
  /// `opentype`, raw sfnt with CFF outlines
  Opentype,
  /// the legacy SVG font format
  Svg,
}

impl FontFormat {
  /// Name as used inside CSS `format("...")` clauses.
  pub fn css_name(self) -> &'static str {
    match self {
      FontFormat::EmbeddedOpentype => "embedded-opentype",
      FontFormat::Woff2 => "woff2",
      FontFormat::Woff => "woff",
      FontFormat::Truetype => "truetype",
      FontFormat::Opentype => "opentype",
      FontFormat::Svg => "svg",
    }
  }

  /// Conventional file extension, without the dot.
  pub fn extension(self) -> &'static str {
    match self {
      FontFormat::EmbeddedOpentype => "eot",
      FontFormat::Woff2 => "woff2",
      FontFormat::Woff => "woff",
      FontFormat::Truetype => "ttf",
      FontFormat::Opentype => "otf",
      FontFormat::Svg => "svg",
    }
  }

  /// Parse a `format("...")` argument. Unrecognized names yield `None`;
  /// the common extension-style aliases (`ttf`, `otf`, `eot`) are accepted.
  pub fn from_css_name(name: &str) -> Option<FontFormat> {
    let name = name.trim();
    let lowered = name.to_ascii_lowercase();
    match lowered.as_str() {
      "embedded-opentype" | "eot" => Some(FontFormat::EmbeddedOpentype),
      "woff2" => Some(FontFormat::Woff2),
      "woff" => Some(FontFormat::Woff),
      "truetype" | "ttf" => Some(FontFormat::Truetype),
      "opentype" | "otf" => Some(FontFormat::Opentype),
      "svg" => Some(FontFormat::Svg),
      _ => None,
    }
  }
}

impl fmt::Display for FontFormat {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.css_name())
  }
}

/// Priority order for locating a usable source font for a `@font-face` rule.
/// The first format whose referenced file can be materialized locally wins.
pub const FORMAT_LOAD_ORDER: &[FontFormat] = &[
  FontFormat::Truetype,
  FontFormat::Opentype,
  FontFormat::Svg,
];

/// Emission order for output formats. The order is also the order of the
/// generated `format()` clauses inside the rewritten `src` declaration.
pub const FORMAT_OUTPUT_ORDER: &[FontFormat] = &[
  FontFormat::EmbeddedOpentype,
  FontFormat::Woff2,
  FontFormat::Woff,
  FontFormat::Truetype,
  FontFormat::Svg,
];
