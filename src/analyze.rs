//! Per-rule font analysis.
//!
//! For one `@font-face` rule this locates a TrueType working copy of the
//! font (downloading and converting other formats when allowed), inventories
//! its code points and decides what the pipeline should do with it. All
//! failures along the way degrade the decision instead of aborting; they are
//! recorded so the caller can report them.

use crate::config::Config;
use crate::engine::FontEngine;
use crate::fetch::RemoteFetcher;
use crate::format::{FontFormat, FORMAT_LOAD_ORDER};
use crate::glyphs::GlyphSet;
use crate::report::FontFailure;
use crate::srcparse::FontFileMap;
use log::{debug, warn};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// What the pipeline does with one `@font-face` rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontAction {
  /// Leave the rule and its files untouched.
  Ignore,
  /// Copy the font to the output directory without subsetting.
  Preserve,
  /// Subset the font down to the required glyphs.
  Process,
}

impl FontAction {
  pub fn as_str(self) -> &'static str {
    match self {
      FontAction::Ignore => "ignore",
      FontAction::Preserve => "preserve",
      FontAction::Process => "process",
    }
  }
}

impl fmt::Display for FontAction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A pipeline failure that forces an action downgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureEvent {
  /// Subsetting did not produce the destination TTF.
  SubsetFailed,
  /// The finalized destination TTF is missing after subset or copy.
  FinalizeFailed,
}

impl FontAction {
  /// The downgrade applied when a pipeline step fails. A failed subset
  /// falls back to preserving the font; a missing finalized TTF leaves
  /// nothing to emit, so the rule is ignored.
  pub fn downgrade(self, event: FailureEvent) -> FontAction {
    match (self, event) {
      (FontAction::Process, FailureEvent::SubsetFailed) => FontAction::Preserve,
      (action, FailureEvent::SubsetFailed) => action,
      (_, FailureEvent::FinalizeFailed) => FontAction::Ignore,
    }
  }
}

/// The TrueType working copy the pipeline operates on.
#[derive(Debug, Clone)]
pub struct TtfSource {
  pub path: PathBuf,
  /// True when the file was produced by this run (downloaded or converted)
  /// and must be removed once the rule is finished.
  pub temporary: bool,
}

/// Outcome of analyzing one rule.
#[derive(Debug)]
pub struct FontAnalysis {
  pub action: FontAction,
  /// Glyphs to keep when processing, ascending by code point.
  pub final_glyph_set: Vec<char>,
  /// Present even for `Ignore` so temporary files still get cleaned up.
  pub source: Option<TtfSource>,
}

pub struct FontAnalyzer<'a> {
  config: &'a Config,
  engine: &'a dyn FontEngine,
  fetcher: &'a dyn RemoteFetcher,
}

impl<'a> FontAnalyzer<'a> {
  pub fn new(
    config: &'a Config,
    engine: &'a dyn FontEngine,
    fetcher: &'a dyn RemoteFetcher,
  ) -> FontAnalyzer<'a> {
    FontAnalyzer {
      config,
      engine,
      fetcher,
    }
  }

  /// Analyze one rule's font files against the required glyph set.
  pub fn analyze(
    &self,
    family: &str,
    files: &FontFileMap,
    required: &GlyphSet,
    failures: &mut Vec<FontFailure>,
  ) -> FontAnalysis {
    let source = self.find_ttf_source(files, failures);

    let ignored_family = self.config.ignore_fonts.iter().any(|f| f == family);
    let Some(source) = source else {
      debug!("{family}: no usable truetype source, ignoring");
      return FontAnalysis {
        action: FontAction::Ignore,
        final_glyph_set: Vec::new(),
        source: None,
      };
    };
    if ignored_family {
      debug!("{family}: listed in ignore_fonts");
      return FontAnalysis {
        action: FontAction::Ignore,
        final_glyph_set: Vec::new(),
        source: Some(source),
      };
    }

    let inventory = match fs::read(&source.path) {
      Ok(bytes) => match self.engine.code_points(&bytes) {
        Ok(cps) => cps,
        Err(err) => {
          warn!("failed to read code points from {}: {err}", source.path.display());
          Vec::new()
        }
      },
      Err(err) => {
        warn!("failed to read {}: {err}", source.path.display());
        Vec::new()
      }
    };
    let present: HashSet<u32> = inventory.iter().copied().collect();

    let mut matching = 0usize;
    let mut keep: BTreeSet<char> = BTreeSet::new();
    for ch in required.iter() {
      if present.contains(&(ch as u32)) {
        matching += 1;
        keep.insert(ch);
      }
    }
    for spec in &self.config.preserve_glyphs {
      if let Some(ch) = spec.code_point().filter(|cp| present.contains(cp)).and_then(char::from_u32) {
        keep.insert(ch);
      }
    }
    if self.config.preserve_ascii {
      for cp in 0u32..=254 {
        if present.contains(&cp) {
          if let Some(ch) = char::from_u32(cp) {
            keep.insert(ch);
          }
        }
      }
    }
    debug!("{family}: {matching} of {} required glyphs present", required.len());

    let zero = matching == 0;
    let preserved_family = self.config.preserve_fonts.iter().any(|f| f == family);
    let outside_purge_list = !self.config.purge_only_fonts.is_empty()
      && !self.config.purge_only_fonts.iter().any(|f| f == family);

    if zero && self.config.ignore_all_on_zero_matching_glyphs {
      return FontAnalysis {
        action: FontAction::Ignore,
        final_glyph_set: Vec::new(),
        source: Some(source),
      };
    }
    if (zero && self.config.preserve_all_on_zero_matching_glyphs)
      || preserved_family
      || outside_purge_list
    {
      return FontAnalysis {
        action: FontAction::Preserve,
        final_glyph_set: Vec::new(),
        source: Some(source),
      };
    }

    let mut final_glyph_set: Vec<char> = keep.into_iter().collect();
    if final_glyph_set.is_empty() {
      // keep at least one glyph so the font stays structurally valid
      match inventory.iter().copied().find_map(char::from_u32) {
        Some(ch) => final_glyph_set.push(ch),
        None => {
          failures.push(FontFailure::Subset {
            path: source.path.display().to_string(),
            message: "font has no usable glyphs".to_string(),
          });
          return FontAnalysis {
            action: FontAction::Ignore,
            final_glyph_set: Vec::new(),
            source: Some(source),
          };
        }
      }
    }

    FontAnalysis {
      action: FontAction::Process,
      final_glyph_set,
      source: Some(source),
    }
  }

  /// Walk the load order (ttf, then otf, then svg) until one referenced
  /// file yields a TrueType working copy.
  fn find_ttf_source(
    &self,
    files: &FontFileMap,
    failures: &mut Vec<FontFailure>,
  ) -> Option<TtfSource> {
    for format in FORMAT_LOAD_ORDER {
      let candidate = files
        .by_format(*format)
        .or_else(|| files.by_extension(format.extension()));
      let Some(candidate) = candidate else { continue };

      let mut path = PathBuf::from(&candidate.path);
      let mut downloaded = false;
      if !self.config.ignore_urls && candidate.is_remote() {
        match self.download(&candidate.path, *format) {
          Ok(tmp) => {
            path = tmp;
            downloaded = true;
          }
          Err(err) => {
            warn!("download failed for {}: {err}", candidate.path);
            failures.push(FontFailure::Download {
              url: candidate.path.clone(),
              message: err.to_string(),
            });
            continue;
          }
        }
      }
      if !path.exists() {
        continue;
      }

      let source = if *format == FontFormat::Truetype {
        if downloaded {
          // keep the working copy clearly separated from the download
          let mut renamed = path.clone().into_os_string();
          renamed.push(".ttf");
          let renamed = PathBuf::from(renamed);
          let _ = fs::remove_file(&renamed);
          match fs::rename(&path, &renamed) {
            Ok(()) => Some(TtfSource {
              path: renamed,
              temporary: true,
            }),
            Err(err) => {
              failures.push(FontFailure::LoadConversion {
                path: path.display().to_string(),
                format: *format,
                message: err.to_string(),
              });
              None
            }
          }
        } else {
          Some(TtfSource {
            path: path.clone(),
            temporary: false,
          })
        }
      } else {
        self.convert_candidate(&path, *format, failures)
      };

      if downloaded {
        let _ = fs::remove_file(&path);
      }
      if source.is_some() {
        return source;
      }
    }
    None
  }

  fn convert_candidate(
    &self,
    path: &Path,
    format: FontFormat,
    failures: &mut Vec<FontFailure>,
  ) -> Option<TtfSource> {
    let base = match path.file_name() {
      Some(name) => name.to_os_string(),
      None => return None,
    };
    let mut ttf_name = base;
    ttf_name.push(".ttf");
    let ttf_path = self.config.absolute_to.join(ttf_name);

    let result = fs::read(path)
      .map_err(crate::error::Error::from)
      .and_then(|bytes| self.engine.to_truetype(&bytes, format))
      .and_then(|ttf| fs::write(&ttf_path, ttf).map_err(crate::error::Error::from));
    match result {
      Ok(()) => {
        debug!("converted {} to {}", path.display(), ttf_path.display());
        Some(TtfSource {
          path: ttf_path,
          temporary: true,
        })
      }
      Err(err) => {
        warn!("conversion to truetype failed for {}: {err}", path.display());
        failures.push(FontFailure::LoadConversion {
          path: path.display().to_string(),
          format,
          message: err.to_string(),
        });
        None
      }
    }
  }

  /// Download a remote candidate into the output directory under its URL
  /// basename, appending the expected extension when missing.
  fn download(&self, url: &str, format: FontFormat) -> crate::error::Result<PathBuf> {
    let base = url.rsplit(['/', '\\']).next().unwrap_or("");
    let base = base.split('?').next().unwrap_or(base);
    let base = base.split('#').next().unwrap_or(base);
    let dotted = format!(".{}", format.extension());
    let name = if base.to_ascii_lowercase().ends_with(&dotted) {
      base.to_string()
    } else {
      format!("{base}{dotted}")
    };
    let target = self.config.absolute_to.join(name);

    let bytes = self.fetcher.fetch(url)?;
    let _ = fs::remove_file(&target);
    fs::write(&target, bytes)?;
    debug!("downloaded {url} to {}", target.display());
    Ok(target)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::{GlyphSpec, Options};
  use crate::error::{Error, FetchError};

  struct StubEngine {
    code_points: Vec<u32>,
  }

  impl FontEngine for StubEngine {
    fn code_points(&self, _ttf: &[u8]) -> crate::error::Result<Vec<u32>> {
      Ok(self.code_points.clone())
    }
    fn subset(
      &self,
      _ttf: &[u8],
      _code_points: &[u32],
      _keep_hinting: bool,
    ) -> crate::error::Result<Vec<u8>> {
      Ok(b"subset".to_vec())
    }
    fn to_truetype(&self, _bytes: &[u8], _from: FontFormat) -> crate::error::Result<Vec<u8>> {
      Ok(b"converted".to_vec())
    }
    fn from_truetype(&self, _ttf: &[u8], _to: FontFormat) -> crate::error::Result<Vec<u8>> {
      Ok(b"output".to_vec())
    }
  }

  struct StaticFetcher {
    bytes: Vec<u8>,
  }

  impl RemoteFetcher for StaticFetcher {
    fn fetch(&self, _url: &str) -> crate::error::Result<Vec<u8>> {
      Ok(self.bytes.clone())
    }
  }

  struct FailingFetcher;

  impl RemoteFetcher for FailingFetcher {
    fn fetch(&self, url: &str) -> crate::error::Result<Vec<u8>> {
      Err(Error::Fetch(FetchError::Status {
        url: url.to_string(),
        status: 404,
      }))
    }
  }

  struct PanickingFetcher;

  impl RemoteFetcher for PanickingFetcher {
    fn fetch(&self, _url: &str) -> crate::error::Result<Vec<u8>> {
      panic!("fetch must not be called when ignore_urls is set");
    }
  }

  fn config_in(dir: &Path, options: Options) -> Config {
    let options = Options {
      to: Some(dir.join("out").to_string_lossy().into_owned()),
      ..options
    };
    Config::resolve(options, &dir.join("styles.css"), None)
  }

  fn set_of(chars: &[char]) -> GlyphSet {
    chars.iter().copied().collect()
  }

  fn files_for(path: &str, extension: &str) -> FontFileMap {
    let mut files = FontFileMap::new();
    crate::srcparse::parse_font_src(
      &format!("url({path})"),
      Path::new("/nonexistent"),
      &mut files,
    );
    assert!(files.by_extension(extension).is_some());
    files
  }

  fn local_ttf(dir: &Path, name: &str) -> (FontFileMap, PathBuf) {
    let path = dir.join(name);
    fs::write(&path, b"fake ttf").expect("write fixture");
    let mut files = FontFileMap::new();
    crate::srcparse::parse_font_src(
      &format!("url({name}) format(\"truetype\")"),
      dir,
      &mut files,
    );
    (files, path)
  }

  #[test]
  fn downgrades_cover_every_action_event_pair() {
    use FailureEvent::*;
    use FontAction::*;
    for (action, event, expected) in [
      (Process, SubsetFailed, Preserve),
      (Preserve, SubsetFailed, Preserve),
      (Ignore, SubsetFailed, Ignore),
      (Process, FinalizeFailed, Ignore),
      (Preserve, FinalizeFailed, Ignore),
      (Ignore, FinalizeFailed, Ignore),
    ] {
      assert_eq!(action.downgrade(event), expected, "{action} on {event:?}");
    }
  }

  #[test]
  fn missing_files_mean_ignore() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config_in(dir.path(), Options::default());
    fs::create_dir_all(&config.absolute_to).expect("mkdir");
    let engine = StubEngine { code_points: vec![] };
    let analyzer = FontAnalyzer::new(&config, &engine, &PanickingFetcher);

    let files = files_for("gone.ttf", "ttf");
    let mut failures = Vec::new();
    let analysis = analyzer.analyze("X", &files, &set_of(&['a']), &mut failures);
    assert_eq!(analysis.action, FontAction::Ignore);
    assert!(analysis.source.is_none());
    assert!(failures.is_empty());
  }

  #[test]
  fn ignored_families_keep_their_source_for_cleanup() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config_in(
      dir.path(),
      Options {
        ignore_fonts: vec!["Icons".to_string()],
        ..Options::default()
      },
    );
    let engine = StubEngine {
      code_points: vec!['a' as u32],
    };
    let analyzer = FontAnalyzer::new(&config, &engine, &PanickingFetcher);

    let (files, path) = local_ttf(dir.path(), "icons.ttf");
    let mut failures = Vec::new();
    let analysis = analyzer.analyze("Icons", &files, &set_of(&['a']), &mut failures);
    assert_eq!(analysis.action, FontAction::Ignore);
    let source = analysis.source.expect("source kept");
    assert_eq!(source.path, path);
    assert!(!source.temporary);
  }

  #[test]
  fn zero_matching_glyphs_preserve_by_default() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config_in(dir.path(), Options::default());
    let engine = StubEngine {
      code_points: vec!['z' as u32],
    };
    let analyzer = FontAnalyzer::new(&config, &engine, &PanickingFetcher);

    let (files, _) = local_ttf(dir.path(), "body.ttf");
    let mut failures = Vec::new();
    let analysis = analyzer.analyze("Body", &files, &set_of(&['a']), &mut failures);
    assert_eq!(analysis.action, FontAction::Preserve);
  }

  #[test]
  fn zero_matching_glyphs_ignore_when_configured() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config_in(
      dir.path(),
      Options {
        ignore_all_on_zero_matching_glyphs: true,
        ..Options::default()
      },
    );
    let engine = StubEngine {
      code_points: vec!['z' as u32],
    };
    let analyzer = FontAnalyzer::new(&config, &engine, &PanickingFetcher);

    let (files, _) = local_ttf(dir.path(), "body.ttf");
    let mut failures = Vec::new();
    let analysis = analyzer.analyze("Body", &files, &set_of(&['a']), &mut failures);
    assert_eq!(analysis.action, FontAction::Ignore);
  }

  #[test]
  fn matching_glyphs_process_with_sorted_set() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config_in(dir.path(), Options::default());
    let engine = StubEngine {
      code_points: vec!['a' as u32, 'b' as u32, 'z' as u32],
    };
    let analyzer = FontAnalyzer::new(&config, &engine, &PanickingFetcher);

    let (files, _) = local_ttf(dir.path(), "icons.ttf");
    let mut failures = Vec::new();
    let analysis = analyzer.analyze("Icons", &files, &set_of(&['b', 'a', 'q']), &mut failures);
    assert_eq!(analysis.action, FontAction::Process);
    assert_eq!(analysis.final_glyph_set, vec!['a', 'b']);
    assert!(failures.is_empty());
  }

  #[test]
  fn preserve_glyphs_join_only_when_present_in_font() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config_in(
      dir.path(),
      Options {
        preserve_glyphs: vec![
          GlyphSpec::Text("Z".to_string()),
          GlyphSpec::Code('q' as u32),
        ],
        ..Options::default()
      },
    );
    // the font has Z but not q
    let engine = StubEngine {
      code_points: vec!['Z' as u32, 'a' as u32],
    };
    let analyzer = FontAnalyzer::new(&config, &engine, &PanickingFetcher);

    let (files, _) = local_ttf(dir.path(), "icons.ttf");
    let mut failures = Vec::new();
    let analysis = analyzer.analyze("Icons", &files, &set_of(&['a']), &mut failures);
    assert_eq!(analysis.action, FontAction::Process);
    assert_eq!(analysis.final_glyph_set, vec!['Z', 'a']);
  }

  #[test]
  fn preserve_ascii_keeps_low_code_points_present_in_font() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config_in(
      dir.path(),
      Options {
        preserve_ascii: true,
        ..Options::default()
      },
    );
    let engine = StubEngine {
      code_points: vec![65, 66, 254, 255, 0x2014],
    };
    let analyzer = FontAnalyzer::new(&config, &engine, &PanickingFetcher);

    let (files, _) = local_ttf(dir.path(), "text.ttf");
    let mut failures = Vec::new();
    let analysis = analyzer.analyze("Text", &files, &set_of(&['\u{2014}']), &mut failures);
    assert_eq!(analysis.action, FontAction::Process);
    // 255 is above the preserved range and was not required
    assert_eq!(analysis.final_glyph_set, vec!['A', 'B', '\u{fe}', '\u{2014}']);
  }

  #[test]
  fn purge_only_list_preserves_everything_else() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config_in(
      dir.path(),
      Options {
        purge_only_fonts: vec!["Icons".to_string()],
        ..Options::default()
      },
    );
    let engine = StubEngine {
      code_points: vec!['a' as u32],
    };
    let analyzer = FontAnalyzer::new(&config, &engine, &PanickingFetcher);

    let (files, _) = local_ttf(dir.path(), "other.ttf");
    let mut failures = Vec::new();
    let analysis = analyzer.analyze("Other", &files, &set_of(&['a']), &mut failures);
    assert_eq!(analysis.action, FontAction::Preserve);

    let (files, _) = local_ttf(dir.path(), "icons.ttf");
    let analysis = analyzer.analyze("Icons", &files, &set_of(&['a']), &mut failures);
    assert_eq!(analysis.action, FontAction::Process);
  }

  #[test]
  fn remote_urls_are_ignored_by_default() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config_in(dir.path(), Options::default());
    let engine = StubEngine {
      code_points: vec!['a' as u32],
    };
    let analyzer = FontAnalyzer::new(&config, &engine, &PanickingFetcher);

    let files = files_for("https://cdn.example.com/icons.ttf", "ttf");
    let mut failures = Vec::new();
    let analysis = analyzer.analyze("Icons", &files, &set_of(&['a']), &mut failures);
    assert_eq!(analysis.action, FontAction::Ignore);
    assert!(failures.is_empty());
  }

  #[test]
  fn downloads_produce_a_temporary_working_copy() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config_in(
      dir.path(),
      Options {
        ignore_urls: false,
        ..Options::default()
      },
    );
    fs::create_dir_all(&config.absolute_to).expect("mkdir");
    let engine = StubEngine {
      code_points: vec!['a' as u32],
    };
    let fetcher = StaticFetcher {
      bytes: b"remote ttf".to_vec(),
    };
    let analyzer = FontAnalyzer::new(&config, &engine, &fetcher);

    let files = files_for("https://cdn.example.com/icons.ttf?v=4#frag", "ttf");
    let mut failures = Vec::new();
    let analysis = analyzer.analyze("Icons", &files, &set_of(&['a']), &mut failures);
    assert_eq!(analysis.action, FontAction::Process);
    let source = analysis.source.expect("source");
    assert!(source.temporary);
    assert_eq!(source.path, config.absolute_to.join("icons.ttf.ttf"));
    assert!(source.path.exists());
    // the raw download itself is gone, only the working copy remains
    assert!(!config.absolute_to.join("icons.ttf").exists());
  }

  #[test]
  fn failed_downloads_are_recorded_and_skipped() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config_in(
      dir.path(),
      Options {
        ignore_urls: false,
        ..Options::default()
      },
    );
    fs::create_dir_all(&config.absolute_to).expect("mkdir");
    let engine = StubEngine {
      code_points: vec!['a' as u32],
    };
    let analyzer = FontAnalyzer::new(&config, &engine, &FailingFetcher);

    let files = files_for("https://cdn.example.com/icons.ttf", "ttf");
    let mut failures = Vec::new();
    let analysis = analyzer.analyze("Icons", &files, &set_of(&['a']), &mut failures);
    assert_eq!(analysis.action, FontAction::Ignore);
    assert_eq!(failures.len(), 1);
    assert!(matches!(failures[0], FontFailure::Download { .. }));
  }

  #[test]
  fn opentype_sources_are_converted_into_the_output_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config_in(dir.path(), Options::default());
    fs::create_dir_all(&config.absolute_to).expect("mkdir");
    let engine = StubEngine {
      code_points: vec!['a' as u32],
    };
    let analyzer = FontAnalyzer::new(&config, &engine, &PanickingFetcher);

    let otf = dir.path().join("face.otf");
    fs::write(&otf, b"fake otf").expect("write fixture");
    let mut files = FontFileMap::new();
    crate::srcparse::parse_font_src("url(face.otf) format(\"opentype\")", dir.path(), &mut files);

    let mut failures = Vec::new();
    let analysis = analyzer.analyze("Face", &files, &set_of(&['a']), &mut failures);
    assert_eq!(analysis.action, FontAction::Process);
    let source = analysis.source.expect("source");
    assert!(source.temporary);
    assert_eq!(source.path, config.absolute_to.join("face.otf.ttf"));
    assert!(source.path.exists());
    // local originals are never deleted
    assert!(otf.exists());
  }

  #[test]
  fn fallback_keeps_the_first_available_glyph() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config_in(
      dir.path(),
      Options {
        preserve_all_on_zero_matching_glyphs: false,
        ..Options::default()
      },
    );
    let engine = StubEngine {
      code_points: vec!['m' as u32, 'n' as u32],
    };
    let analyzer = FontAnalyzer::new(&config, &engine, &PanickingFetcher);

    let (files, _) = local_ttf(dir.path(), "icons.ttf");
    let mut failures = Vec::new();
    let analysis = analyzer.analyze("Icons", &files, &set_of(&['q']), &mut failures);
    assert_eq!(analysis.action, FontAction::Process);
    assert_eq!(analysis.final_glyph_set, vec!['m']);
  }

  #[test]
  fn empty_fonts_downgrade_to_ignore_with_a_failure() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config_in(
      dir.path(),
      Options {
        preserve_all_on_zero_matching_glyphs: false,
        ..Options::default()
      },
    );
    let engine = StubEngine { code_points: vec![] };
    let analyzer = FontAnalyzer::new(&config, &engine, &PanickingFetcher);

    let (files, _) = local_ttf(dir.path(), "empty.ttf");
    let mut failures = Vec::new();
    let analysis = analyzer.analyze("Empty", &files, &set_of(&['q']), &mut failures);
    assert_eq!(analysis.action, FontAction::Ignore);
    assert_eq!(failures.len(), 1);
    assert!(matches!(failures[0], FontFailure::Subset { .. }));
  }
}
