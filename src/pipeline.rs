//! The purge pipeline.
//!
//! [`Purger`] drives one stylesheet end to end: collect the required glyph
//! set, analyze each `@font-face` rule, write subsetted (or preserved) font
//! files in every output format, and rewrite the rule's `src` declarations
//! to point at them. Failures inside a rule downgrade that rule's action
//! and land in the [`RunReport`]; they never abort the run. Only run-level
//! problems, such as an uncreatable output directory, surface as errors.

use crate::analyze::{FailureEvent, FontAction, FontAnalysis, FontAnalyzer};
use crate::config::{CacheBusting, Config, Options};
use crate::css::Stylesheet;
use crate::engine::{FontEngine, TtfEngine};
use crate::error::{CssError, Error, Result};
use crate::fetch::{HttpFetcher, RemoteFetcher};
use crate::format::{FontFormat, FORMAT_OUTPUT_ORDER};
use crate::glyphs::{self, GlyphSet};
use crate::hash;
use crate::report::{FontFailure, FontOutcome, RunReport};
use crate::srcparse::{parse_font_src, FontFileMap};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Result of one stylesheet run.
#[derive(Debug)]
pub struct PurgeOutput {
  /// The rewritten stylesheet text.
  pub css: String,
  /// What happened, font by font.
  pub report: RunReport,
}

/// The subsetting pipeline, bound to one resolved configuration.
pub struct Purger {
  config: Config,
  engine: Box<dyn FontEngine>,
  fetcher: Box<dyn RemoteFetcher>,
}

impl Purger {
  /// Build a pipeline with the built-in engine and HTTP fetcher.
  pub fn new(config: Config) -> Purger {
    Purger {
      config,
      engine: Box::new(TtfEngine),
      fetcher: Box::new(HttpFetcher::new()),
    }
  }

  /// Substitute the font engine.
  pub fn with_engine(mut self, engine: Box<dyn FontEngine>) -> Purger {
    self.engine = engine;
    self
  }

  /// Substitute the remote fetcher.
  pub fn with_fetcher(mut self, fetcher: Box<dyn RemoteFetcher>) -> Purger {
    self.fetcher = fetcher;
    self
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  /// Rewrite one stylesheet.
  ///
  /// `css_path` is the stylesheet's own location; relative `src` URLs
  /// resolve against its directory. Font files land in the configured
  /// output directory, which is created if missing.
  pub fn purge_stylesheet(&self, css: &str, css_path: &Path) -> Result<PurgeOutput> {
    fs::create_dir_all(&self.config.absolute_to)?;

    let mut report = RunReport::default();
    let mut glyphs = GlyphSet::new();
    let content_values = crate::css::collect_content_values(css);
    glyphs::scan_content_values(content_values.iter().map(String::as_str), &mut glyphs);
    glyphs::scan_content_sources(&self.config.content, &mut glyphs, &mut report.scan);
    report.glyph_count = glyphs.len();
    debug!(
      "{} required glyphs ({} from stylesheet values, {} content files scanned)",
      glyphs.len(),
      content_values.len(),
      report.scan.files_scanned
    );

    let src_root = css_path.parent().unwrap_or_else(|| Path::new("."));
    let analyzer = FontAnalyzer::new(&self.config, self.engine.as_ref(), self.fetcher.as_ref());

    let mut sheet = Stylesheet::parse(css);
    for rule in sheet.font_faces_mut() {
      let family = rule.family().unwrap_or_default();
      let old_srcs = rule.take_src_values();
      let mut files = FontFileMap::new();
      for src in &old_srcs {
        parse_font_src(src, src_root, &mut files);
      }

      let mut failures = Vec::new();
      let analysis = analyzer.analyze(&family, &files, &glyphs, &mut failures);
      let initial_action = analysis.action;
      debug!(
        "{family}: {initial_action}, keeping {} glyphs",
        analysis.final_glyph_set.len()
      );

      let (new_srcs, final_action) =
        self.emit_rule_outputs(&files, &analysis, &old_srcs, &mut failures);
      for src in &new_srcs {
        rule.push_declaration("src", src.clone());
      }
      report.fonts.push(FontOutcome {
        family,
        initial_action,
        final_action,
        failures,
      });
    }

    Ok(PurgeOutput {
      css: sheet.to_css(),
      report,
    })
  }

  /// Produce the output files and new `src` values for one rule.
  ///
  /// Any error the fallible stage propagates is contained here: the rule
  /// reverts to its original `src` values, counts as ignored and records a
  /// `Rule` failure. The temporary working TTF, when the analyzer created
  /// one, is removed on every path.
  fn emit_rule_outputs(
    &self,
    files: &FontFileMap,
    analysis: &FontAnalysis,
    old_srcs: &[String],
    failures: &mut Vec<FontFailure>,
  ) -> (Vec<String>, FontAction) {
    let result = self.generate_sources(files, analysis, old_srcs, failures);

    if let Some(source) = &analysis.source {
      if source.temporary {
        force_remove(&source.path);
      }
    }

    match result {
      Ok(outcome) => outcome,
      Err(err) => {
        warn!("rule processing failed: {err}");
        failures.push(FontFailure::Rule {
          message: err.to_string(),
        });
        (old_srcs.to_vec(), FontAction::Ignore)
      }
    }
  }

  fn generate_sources(
    &self,
    files: &FontFileMap,
    analysis: &FontAnalysis,
    old_srcs: &[String],
    failures: &mut Vec<FontFailure>,
  ) -> Result<(Vec<String>, FontAction)> {
    let mut action = analysis.action;
    let source = match &analysis.source {
      Some(source) if action != FontAction::Ignore => source,
      _ => return Ok((old_srcs.to_vec(), FontAction::Ignore)),
    };

    // The working copy's basename, extensions shed, names every output
    // file. Temporary copies carry a doubled extension (face.otf.ttf).
    let base = source
      .path
      .file_name()
      .map(|name| name.to_string_lossy().into_owned())
      .unwrap_or_default();
    let root = if source.temporary {
      strip_extension(strip_extension(&base)).to_string()
    } else {
      strip_extension(&base).to_string()
    };
    let mut final_ttf = self.config.absolute_to.join(format!("{root}.ttf"));
    debug!("finalized ttf destination {}", final_ttf.display());

    if action == FontAction::Process {
      let code_points: Vec<u32> = analysis
        .final_glyph_set
        .iter()
        .map(|&ch| ch as u32)
        .collect();
      let keep_hinting = !source.temporary;
      let written = fs::read(&source.path)
        .map_err(Error::from)
        .and_then(|ttf| self.engine.subset(&ttf, &code_points, keep_hinting))
        .and_then(|out| fs::write(&final_ttf, out).map_err(Error::from));
      if let Err(err) = written {
        warn!("subsetting {} failed: {err}", source.path.display());
        failures.push(FontFailure::Subset {
          path: source.path.display().to_string(),
          message: err.to_string(),
        });
        action = action.downgrade(FailureEvent::SubsetFailed);
      }
    }
    if action == FontAction::Preserve && source.path != final_ttf {
      fs::copy(&source.path, &final_ttf)?;
    }

    if final_ttf.exists() {
      clean_similar_files(&final_ttf, &root, ".ttf");
    }
    if self.config.cache_busting == CacheBusting::File && final_ttf.exists() {
      if let Some(busted) = self.hash_rename(&final_ttf, &root, "ttf", failures) {
        final_ttf = busted;
      }
    }
    if !final_ttf.exists() {
      return Ok((
        old_srcs.to_vec(),
        action.downgrade(FailureEvent::FinalizeFailed),
      ));
    }

    let mut new_srcs = Vec::new();
    let mut main_parts = Vec::new();
    for &format in FORMAT_OUTPUT_ORDER {
      let ext = format.extension();
      let mut dest = if format == FontFormat::Truetype {
        final_ttf.clone()
      } else {
        self.config.absolute_to.join(format!("{root}.{ext}"))
      };

      if format != FontFormat::Truetype {
        let preserved_original = if action == FontAction::Preserve {
          files
            .by_format(format)
            .or_else(|| files.by_extension(ext))
            .map(|file| PathBuf::from(&file.path))
            .filter(|path| path.exists())
        } else {
          None
        };

        if let Some(original) = preserved_original {
          debug!("copying preserved {} source {}", ext, original.display());
          if original != dest {
            fs::copy(&original, &dest)?;
          }
        } else {
          let converted = fs::read(&final_ttf)
            .map_err(Error::from)
            .and_then(|ttf| self.engine.from_truetype(&ttf, format))
            .and_then(|out| fs::write(&dest, out).map_err(Error::from));
          if let Err(err) = converted {
            warn!("conversion to {format} failed: {err}");
            failures.push(FontFailure::OutputConversion {
              format,
              message: err.to_string(),
            });
            continue;
          }
        }

        if dest.exists() {
          clean_similar_files(&dest, &root, ext);
        }
        if self.config.cache_busting == CacheBusting::File && dest.exists() {
          if let Some(busted) = self.hash_rename(&dest, &root, ext, failures) {
            dest = busted;
          }
        }
      }

      if dest.exists() {
        main_parts.push(self.source_url(&dest, format, false, failures));
        if format == FontFormat::EmbeddedOpentype {
          // old-IE single-format syntax: a bare clause as its own src line
          new_srcs.push(self.source_url(&dest, format, true, failures));
        }
      }
    }
    new_srcs.push(main_parts.join(", "));

    Ok((new_srcs, action))
  }

  /// Rename `path` to `<root>-<hash8>.<ext>` beside it, force-removing any
  /// file already at that name. Returns `None` when hashing or renaming
  /// fails; the file then keeps its unbusted name and the failure is
  /// recorded.
  fn hash_rename(
    &self,
    path: &Path,
    root: &str,
    ext: &str,
    failures: &mut Vec<FontFailure>,
  ) -> Option<PathBuf> {
    let renamed = (|| -> Result<PathBuf> {
      let hash = hash::file_hash8(path)?;
      let busted = self.config.absolute_to.join(format!("{root}-{hash}.{ext}"));
      force_remove(&busted);
      fs::rename(path, &busted)?;
      Ok(busted)
    })();
    match renamed {
      Ok(busted) => Some(busted),
      Err(err) => {
        warn!("cache busting failed for {}: {err}", path.display());
        failures.push(FontFailure::CacheBusting {
          path: path.display().to_string(),
          message: err.to_string(),
        });
        None
      }
    }
  }

  /// Build one `url(...)` clause for an emitted file.
  ///
  /// Under query busting the clause carries `?fonthash=<hash8>` of the
  /// file as produced. Embedded-opentype substitutes the legacy `?#iefix`
  /// fragment for an empty buster; its bare (formatless) clause never
  /// carries the fragment.
  fn source_url(
    &self,
    path: &Path,
    format: FontFormat,
    bare_eot: bool,
    failures: &mut Vec<FontFailure>,
  ) -> String {
    let mut buster = String::new();
    if self.config.cache_busting == CacheBusting::Query {
      match hash::file_hash8(path) {
        Ok(hash) => buster = format!("?fonthash={hash}"),
        Err(err) => {
          warn!("cache busting hash failed for {}: {err}", path.display());
          failures.push(FontFailure::CacheBusting {
            path: path.display().to_string(),
            message: err.to_string(),
          });
        }
      }
    }
    let name = path
      .file_name()
      .map(|name| name.to_string_lossy().into_owned())
      .unwrap_or_default();
    let url_path = format!("{}/{name}", self.config.relative_to);
    if bare_eot {
      format!("url(\"{url_path}{buster}\")")
    } else if buster.is_empty() && format == FontFormat::EmbeddedOpentype {
      format!("url(\"{url_path}?#iefix\") format(\"{}\")", format.css_name())
    } else {
      format!("url(\"{url_path}{buster}\") format(\"{}\")", format.css_name())
    }
  }
}

/// Read `input`, purge it, and write the rewritten stylesheet to `output`
/// (or back over `input`). Returns the run report.
pub fn purge_file(options: Options, input: &Path, output: Option<&Path>) -> Result<RunReport> {
  let css = fs::read_to_string(input).map_err(|err| CssError::Unreadable {
    path: input.display().to_string(),
    message: err.to_string(),
  })?;
  let config = Config::resolve(options, input, output);
  let purger = Purger::new(config);
  let outcome = purger.purge_stylesheet(&css, input)?;
  let target = output.unwrap_or(input);
  fs::write(target, outcome.css).map_err(|err| CssError::Unwritable {
    path: target.display().to_string(),
    message: err.to_string(),
  })?;
  Ok(outcome.report)
}

/// Strip the final `.ext` component, when there is one.
fn strip_extension(name: &str) -> &str {
  match name.rfind('.') {
    Some(dot) => &name[..dot],
    None => name,
  }
}

/// Remove a file, swallowing every error.
fn force_remove(path: &Path) {
  let _ = fs::remove_file(path);
}

/// Delete sibling files whose names start with `root_base` and end with
/// `suffix`, keeping `save_path` itself. This clears stale outputs from
/// earlier runs, old hash names included.
fn clean_similar_files(save_path: &Path, root_base: &str, suffix: &str) {
  let Some(dir) = save_path.parent() else {
    return;
  };
  let Some(save_name) = save_path.file_name().and_then(|name| name.to_str()) else {
    return;
  };
  let Ok(entries) = fs::read_dir(dir) else {
    return;
  };
  for entry in entries.flatten() {
    let name = entry.file_name();
    let Some(name) = name.to_str() else { continue };
    if name != save_name && name.starts_with(root_base) && name.ends_with(suffix) {
      debug!("removing stale output {name}");
      force_remove(&dir.join(name));
    }
  }
}
