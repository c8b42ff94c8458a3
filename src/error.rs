//! Error types for fontpurge
//!
//! This module provides error types for all subsystems:
//! - Configuration errors (bad option values, unreadable config files)
//! - CSS errors (stylesheet-level failures)
//! - Font errors (parsing, conversion, subsetting)
//! - Fetch errors (remote font downloads)
//!
//! All errors use the `thiserror` crate for minimal boilerplate and
//! proper error trait implementations. Per-font failures that the pipeline
//! recovers from are reported through [`crate::report::FontFailure`] instead
//! of this hierarchy; these types cover the genuinely fallible paths.

use thiserror::Error;

/// Result type alias for fontpurge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for fontpurge
///
/// Each variant wraps a more specific error type for that subsystem.
#[derive(Error, Debug)]
pub enum Error {
  /// Configuration error
  #[error("Config error: {0}")]
  Config(#[from] ConfigError),

  /// CSS processing error
  #[error("CSS error: {0}")]
  Css(#[from] CssError),

  /// Font parsing, conversion or subsetting error
  #[error("Font error: {0}")]
  Font(#[from] FontError),

  /// Remote fetch error
  #[error("Fetch error: {0}")]
  Fetch(#[from] FetchError),

  /// I/O error (file reading, writing, directory scans)
  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  /// Generic error for miscellaneous issues
  #[error("{0}")]
  Other(String),
}

/// Errors resolving the user-supplied options into a usable configuration
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
  /// A config file could not be read or parsed
  #[error("Invalid config file {path}: {message}")]
  InvalidFile { path: String, message: String },

  /// An option value was out of range or the wrong shape
  #[error("Invalid value for option {option}: {message}")]
  InvalidValue { option: String, message: String },
}

/// Errors at the stylesheet level
///
/// The stylesheet editor itself is lenient (unparseable regions pass
/// through verbatim), so these only cover the I/O around it.
#[derive(Error, Debug, Clone)]
pub enum CssError {
  /// The input stylesheet could not be read
  #[error("Cannot read stylesheet {path}: {message}")]
  Unreadable { path: String, message: String },

  /// The rewritten stylesheet could not be written
  #[error("Cannot write stylesheet {path}: {message}")]
  Unwritable { path: String, message: String },
}

/// Errors raised by the font engine
///
/// Engine errors are structural: they describe the font bytes, not the file
/// they came from. Callers that know the path attach it when reporting.
#[derive(Error, Debug, Clone)]
pub enum FontError {
  /// The font data could not be parsed at all
  #[error("cannot parse font: {0}")]
  Parse(String),

  /// A required sfnt table was missing
  #[error("missing required `{0}` table")]
  MissingTable(&'static str),

  /// A table was present but its contents did not decode
  #[error("malformed `{table}` table: {message}")]
  Malformed { table: &'static str, message: String },

  /// The engine cannot perform the requested conversion
  #[error("unsupported conversion from {from} to {to}")]
  UnsupportedConversion { from: String, to: String },

  /// The font maps no code points at all
  #[error("font maps no code points")]
  EmptyCmap,
}

/// Errors fetching a remote font source
#[derive(Error, Debug, Clone)]
pub enum FetchError {
  /// The request failed before producing a response body
  #[error("GET {url} failed: {message}")]
  Request { url: String, message: String },

  /// The server answered with a non-success status
  #[error("GET {url} returned HTTP {status}")]
  Status { url: String, status: u16 },
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn error_messages_include_subsystem_prefix() {
    let err = Error::Font(FontError::MissingTable("glyf"));
    assert_eq!(err.to_string(), "Font error: missing required `glyf` table");
  }

  #[test]
  fn io_errors_convert_automatically() {
    fn read() -> Result<Vec<u8>> {
      Ok(std::fs::read("/nonexistent/fontpurge-test-path")?)
    }
    assert!(matches!(read(), Err(Error::Io(_))));
  }
}
