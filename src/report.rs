//! Structured run reporting.
//!
//! The pipeline never aborts on a per-font failure; it degrades the font's
//! action and keeps going. Every swallowed failure lands here so callers
//! and tests can assert on exact failure counts instead of scraping logs.

use crate::analyze::FontAction;
use crate::format::FontFormat;
use std::path::PathBuf;
use thiserror::Error;

/// One recoverable failure encountered while handling a single font.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FontFailure {
  /// A remote source could not be downloaded
  #[error("download of {url} failed: {message}")]
  Download { url: String, message: String },

  /// A located source could not be converted to the canonical TTF
  #[error("cannot convert {path} ({format}) to truetype: {message}")]
  LoadConversion {
    path: String,
    format: FontFormat,
    message: String,
  },

  /// Subsetting the canonical TTF failed
  #[error("cannot subset {path}: {message}")]
  Subset { path: String, message: String },

  /// An output format could not be produced from the finalized TTF
  #[error("cannot produce {format} output: {message}")]
  OutputConversion { format: FontFormat, message: String },

  /// A cache-busting hash or rename failed
  #[error("cache busting failed for {path}: {message}")]
  CacheBusting { path: String, message: String },

  /// The whole rule failed in a way the per-step handling did not cover
  #[error("rule failed: {message}")]
  Rule { message: String },
}

/// Per-`@font-face`-rule outcome.
#[derive(Debug, Clone)]
pub struct FontOutcome {
  /// Quote-stripped `font-family` value; empty when the rule had none
  pub family: String,
  /// Action chosen by the analyzer
  pub initial_action: FontAction,
  /// Action after any pipeline downgrades
  pub final_action: FontAction,
  /// Failures swallowed along the way
  pub failures: Vec<FontFailure>,
}

/// Glyph-scanning statistics.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
  /// Content files successfully read
  pub files_scanned: usize,
  /// Content files skipped because they could not be read
  pub unreadable_files: Vec<PathBuf>,
}

/// Everything a run did, font by font.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
  /// Size of the global required glyph set
  pub glyph_count: usize,
  /// External content scanning statistics
  pub scan: ScanReport,
  /// One entry per `@font-face` rule, in document order
  pub fonts: Vec<FontOutcome>,
}

impl RunReport {
  /// Total failures across all fonts.
  pub fn failure_count(&self) -> usize {
    self.fonts.iter().map(|f| f.failures.len()).sum()
  }

  /// Fonts whose final action was downgraded from the analyzer's choice.
  pub fn downgraded(&self) -> impl Iterator<Item = &FontOutcome> {
    self
      .fonts
      .iter()
      .filter(|f| f.initial_action != f.final_action)
  }
}
