//! Command-line front end for the fontpurge pipeline.

use clap::{ArgAction, Parser};
use fontpurge::analyze::FontAction;
use fontpurge::config::{ContentSource, Options, ScanType};
use fontpurge::pipeline;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
  name = "fontpurge",
  version,
  about = "Subset @font-face files down to the glyphs a stylesheet actually uses"
)]
struct Cli {
  /// Stylesheet to process
  css: PathBuf,

  /// Write the rewritten stylesheet here instead of in place
  #[arg(short, long, value_name = "FILE")]
  output: Option<PathBuf>,

  /// JSON file carrying the full options surface
  #[arg(long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Output directory for emitted fonts, relative to the stylesheet
  #[arg(long, value_name = "DIR")]
  to: Option<String>,

  /// Cache-busting mode: file, query or none
  #[arg(long, value_name = "MODE")]
  cache_busting: Option<String>,

  /// Download remote font sources instead of ignoring them
  #[arg(long, action = ArgAction::SetTrue)]
  follow_urls: bool,

  /// Family to leave completely untouched (repeatable)
  #[arg(long = "ignore-font", value_name = "FAMILY")]
  ignore_font: Vec<String>,

  /// Family to copy to the output directory without subsetting (repeatable)
  #[arg(long = "preserve-font", value_name = "FAMILY")]
  preserve_font: Vec<String>,

  /// Subset only these families, preserving all others (repeatable)
  #[arg(long = "purge-only-font", value_name = "FAMILY")]
  purge_only_font: Vec<String>,

  /// Glob of content files whose text contributes required glyphs (repeatable)
  #[arg(long = "content-files", value_name = "GLOB")]
  content_files: Vec<String>,

  /// Keep all code points 0-254 present in processed fonts
  #[arg(long, action = ArgAction::SetTrue)]
  preserve_ascii: bool,
}

impl Cli {
  /// Resolve the option surface: the JSON config file (when given) forms
  /// the base, direct flags override or extend it.
  fn to_options(&self) -> fontpurge::Result<Options> {
    let mut options = match &self.config {
      Some(path) => Options::from_json_file(path)?,
      None => Options::default(),
    };
    if let Some(to) = &self.to {
      options.to = Some(to.clone());
    }
    if let Some(mode) = &self.cache_busting {
      options.cache_busting = mode.clone();
    }
    if self.follow_urls {
      options.ignore_urls = false;
    }
    if self.preserve_ascii {
      options.preserve_ascii = true;
    }
    options.ignore_fonts.extend(self.ignore_font.iter().cloned());
    options
      .preserve_fonts
      .extend(self.preserve_font.iter().cloned());
    options
      .purge_only_fonts
      .extend(self.purge_only_font.iter().cloned());
    if !self.content_files.is_empty() {
      options.content.push(ContentSource {
        files: self.content_files.clone(),
        min: None,
        max: None,
        scan_type: ScanType::default(),
      });
    }
    Ok(options)
  }
}

fn run(cli: &Cli) -> fontpurge::Result<()> {
  let options = cli.to_options()?;
  let report = pipeline::purge_file(options, &cli.css, cli.output.as_deref())?;

  let mut processed = 0;
  let mut preserved = 0;
  let mut ignored = 0;
  for font in &report.fonts {
    match font.final_action {
      FontAction::Process => processed += 1,
      FontAction::Preserve => preserved += 1,
      FontAction::Ignore => ignored += 1,
    }
  }
  println!(
    "{} required glyphs; {} font-face rules: {} processed, {} preserved, {} ignored",
    report.glyph_count,
    report.fonts.len(),
    processed,
    preserved,
    ignored
  );
  if report.failure_count() > 0 {
    eprintln!("{} recoverable failures:", report.failure_count());
    for font in &report.fonts {
      for failure in &font.failures {
        let family = if font.family.is_empty() {
          "<unnamed>"
        } else {
          &font.family
        };
        eprintln!("  {family}: {failure}");
      }
    }
  }
  Ok(())
}

fn main() {
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
  let cli = Cli::parse();
  if let Err(err) = run(&cli) {
    eprintln!("fontpurge: {err}");
    std::process::exit(1);
  }
}
