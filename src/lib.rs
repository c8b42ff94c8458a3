pub mod analyze;
pub mod config;
pub mod css;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod format;
pub mod glyphs;
pub mod hash;
pub mod pipeline;
pub mod report;
pub mod srcparse;

pub use config::{CacheBusting, Config, ContentSource, GlyphSpec, Options, ScanType};
pub use error::{Error, Result};
pub use pipeline::{purge_file, PurgeOutput, Purger};

// Re-export the seams embedders substitute in tests and custom stacks
pub use analyze::{FailureEvent, FontAction};
pub use engine::{FontEngine, TtfEngine};
pub use fetch::{HttpFetcher, RemoteFetcher};
pub use format::{FontFormat, FORMAT_LOAD_ORDER, FORMAT_OUTPUT_ORDER};
pub use glyphs::GlyphSet;
pub use report::{FontFailure, FontOutcome, RunReport, ScanReport};
