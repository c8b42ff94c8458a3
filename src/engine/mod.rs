//! Font engine: parsing, conversion and subsetting.
//!
//! The pipeline talks to fonts exclusively through the [`FontEngine`] trait,
//! which works on byte buffers so callers keep control of all file I/O and
//! tests can substitute fixed-outcome engines. [`TtfEngine`] is the real
//! implementation: TrueType is the working format, other source flavours are
//! converted into it and output containers are generated from it.

mod build;
mod convert;
mod sfnt;
mod subset;

use crate::error::{FontError, Result};
use crate::format::FontFormat;

/// Byte-level font operations, keyed on [`FontFormat`].
pub trait FontEngine: Send + Sync {
  /// Lists every code point the font maps to a usable glyph, ascending.
  fn code_points(&self, ttf: &[u8]) -> Result<Vec<u32>>;

  /// Subsets a TrueType font to the given code points. Glyph 0 always
  /// survives; hinting tables and instructions are dropped unless kept.
  fn subset(&self, ttf: &[u8], code_points: &[u32], keep_hinting: bool) -> Result<Vec<u8>>;

  /// Converts a source font into TrueType flavour.
  fn to_truetype(&self, bytes: &[u8], from: FontFormat) -> Result<Vec<u8>>;

  /// Converts a TrueType font into an output container format.
  fn from_truetype(&self, ttf: &[u8], to: FontFormat) -> Result<Vec<u8>>;
}

/// The built-in engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct TtfEngine;

impl FontEngine for TtfEngine {
  fn code_points(&self, ttf: &[u8]) -> Result<Vec<u32>> {
    Ok(subset::glyph_code_points(ttf)?)
  }

  fn subset(&self, ttf: &[u8], code_points: &[u32], keep_hinting: bool) -> Result<Vec<u8>> {
    Ok(subset::subset_truetype(ttf, code_points, keep_hinting)?)
  }

  fn to_truetype(&self, bytes: &[u8], from: FontFormat) -> Result<Vec<u8>> {
    match from {
      FontFormat::Truetype => {
        ttf_parser::Face::parse(bytes, 0).map_err(|e| FontError::Parse(e.to_string()))?;
        Ok(bytes.to_vec())
      }
      FontFormat::Opentype => Ok(build::truetype_from_opentype(bytes)?),
      FontFormat::Svg => Ok(build::truetype_from_svg(&String::from_utf8_lossy(bytes))?),
      other => Err(unsupported(other, FontFormat::Truetype)),
    }
  }

  fn from_truetype(&self, ttf: &[u8], to: FontFormat) -> Result<Vec<u8>> {
    match to {
      FontFormat::EmbeddedOpentype => Ok(convert::truetype_to_eot(ttf)?),
      FontFormat::Woff2 => Ok(convert::truetype_to_woff2(ttf)?),
      FontFormat::Woff => Ok(convert::truetype_to_woff(ttf)?),
      FontFormat::Truetype => Ok(ttf.to_vec()),
      FontFormat::Svg => Ok(convert::truetype_to_svg(ttf)?),
      FontFormat::Opentype => Err(unsupported(FontFormat::Truetype, to)),
    }
  }
}

fn unsupported(from: FontFormat, to: FontFormat) -> crate::error::Error {
  FontError::UnsupportedConversion {
    from: from.css_name().to_string(),
    to: to.css_name().to_string(),
  }
  .into()
}
