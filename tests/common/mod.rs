//! Shared fixtures for the integration tests.
//!
//! Fixture fonts are built by declaring an SVG font document and converting
//! it through the public engine, so the bytes on disk are real TrueType
//! files produced by the same path a `.svg` source would take.

#![allow(dead_code)]

use fontpurge::{FontEngine, FontFormat, TtfEngine};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// An SVG font document with one square glyph per entry of `chars`.
pub fn svg_font(family: &str, chars: &[char]) -> String {
  let mut glyphs = String::new();
  for &ch in chars {
    let _ = writeln!(
      glyphs,
      "      <glyph unicode=\"&#x{:X};\" horiz-adv-x=\"600\" d=\"M 50 0 L 550 0 L 550 500 L 50 500 Z\"/>",
      ch as u32
    );
  }
  format!(
    r#"<svg xmlns="http://www.w3.org/2000/svg">
  <defs>
    <font id="{family}" horiz-adv-x="600">
      <font-face font-family="{family}" units-per-em="1000" ascent="800" descent="-200"/>
      <missing-glyph horiz-adv-x="500"/>
{glyphs}    </font>
  </defs>
</svg>
"#
  )
}

/// A TrueType font mapping exactly `chars`, plus the missing glyph.
pub fn ttf_with_glyphs(family: &str, chars: &[char]) -> Vec<u8> {
  let svg = svg_font(family, chars);
  TtfEngine
    .to_truetype(svg.as_bytes(), FontFormat::Svg)
    .expect("fixture font builds")
}

/// Writes `contents` at `dir/name`, creating parent directories.
pub fn write_file(dir: &Path, name: &str, contents: impl AsRef<[u8]>) -> PathBuf {
  let path = dir.join(name);
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).expect("create fixture dir");
  }
  fs::write(&path, contents.as_ref()).expect("write fixture file");
  path
}

/// Code points mapped by the font file at `path`, ascending.
pub fn mapped_code_points(path: &Path) -> Vec<u32> {
  let bytes = fs::read(path).expect("read font file");
  TtfEngine.code_points(&bytes).expect("inventory font")
}

/// Names of the regular files directly under `dir`, sorted.
pub fn file_names(dir: &Path) -> Vec<String> {
  let mut names: Vec<String> = fs::read_dir(dir)
    .expect("list output dir")
    .filter_map(|entry| entry.ok())
    .filter(|entry| entry.path().is_file())
    .map(|entry| entry.file_name().to_string_lossy().into_owned())
    .collect();
  names.sort();
  names
}
