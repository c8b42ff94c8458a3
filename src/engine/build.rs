//! Builds TrueType fonts from glyph outlines.
//!
//! This is the landing strip for non-TrueType sources: CFF-flavoured
//! OpenType fonts have their outlines re-extracted through `ttf_parser`,
//! SVG fonts are parsed with `roxmltree` and `svgtypes`, and both feed the
//! same quadratic contour model before table assembly. Cubic curves are
//! approximated by split quadratics, which is visually lossless at text
//! sizes.

use std::collections::HashMap;

use log::warn;
use svgtypes::{PathParser, PathSegment};
use ttf_parser::{Face, GlyphId, RawFace, Tag};

use crate::engine::sfnt::{self, build_loca, loca_format_for, SfntBuilder};
use crate::error::FontError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutlinePoint {
  pub x: i16,
  pub y: i16,
  pub on_curve: bool,
}

/// A glyph outline as quadratic contours in font units, y-up.
#[derive(Debug, Clone, Default)]
pub struct GlyphOutline {
  pub contours: Vec<Vec<OutlinePoint>>,
}

impl GlyphOutline {
  pub fn is_empty(&self) -> bool {
    self.contours.iter().all(|contour| contour.is_empty())
  }
}

/// One glyph headed into a built font. Glyph ids follow slice order, so the
/// first entry becomes glyph 0 and should be the notdef shape.
#[derive(Debug, Clone)]
pub struct GlyphSource {
  pub code_point: Option<u32>,
  pub advance: u16,
  pub outline: GlyphOutline,
}

#[derive(Debug, Clone, Copy)]
pub struct FontMetrics {
  pub units_per_em: u16,
  pub ascent: i16,
  pub descent: i16,
}

impl Default for FontMetrics {
  fn default() -> Self {
    Self {
      units_per_em: 1000,
      ascent: 800,
      descent: -200,
    }
  }
}

/// Accumulates drawing commands into quadratic contours.
///
/// Both outline sources feed this: `ttf_parser` callbacks for OpenType
/// fonts and parsed path data for SVG fonts.
struct ContourSink {
  contours: Vec<Vec<(f32, f32, bool)>>,
  current: Vec<(f32, f32, bool)>,
  position: (f32, f32),
}

impl ContourSink {
  fn new() -> Self {
    Self {
      contours: Vec::new(),
      current: Vec::new(),
      position: (0.0, 0.0),
    }
  }

  fn move_to(&mut self, x: f32, y: f32) {
    self.flush();
    self.current.push((x, y, true));
    self.position = (x, y);
  }

  fn line_to(&mut self, x: f32, y: f32) {
    self.current.push((x, y, true));
    self.position = (x, y);
  }

  fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
    self.current.push((x1, y1, false));
    self.current.push((x, y, true));
    self.position = (x, y);
  }

  fn cubic_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
    // Midpoint split: each half of the cubic gets one quadratic whose
    // control point is the cubic control scaled towards the endpoint.
    let (x0, y0) = self.position;
    let q1 = (x0 + 0.75 * (x1 - x0), y0 + 0.75 * (y1 - y0));
    let q2 = (x + 0.75 * (x2 - x), y + 0.75 * (y2 - y));
    let mid = ((q1.0 + q2.0) / 2.0, (q1.1 + q2.1) / 2.0);
    self.quad_to(q1.0, q1.1, mid.0, mid.1);
    self.quad_to(q2.0, q2.1, x, y);
  }

  fn close(&mut self) {
    self.flush();
  }

  fn flush(&mut self) {
    if !self.current.is_empty() {
      self.contours.push(std::mem::take(&mut self.current));
    }
  }

  fn finish(mut self) -> GlyphOutline {
    self.flush();
    let contours = self
      .contours
      .into_iter()
      .map(|contour| {
        let mut points: Vec<OutlinePoint> = contour
          .into_iter()
          .map(|(x, y, on_curve)| OutlinePoint {
            x: round_coord(x),
            y: round_coord(y),
            on_curve,
          })
          .collect();
        // Contours close implicitly; an explicit return to the start point
        // would double it.
        if points.len() > 1 {
          let (first, last) = (points[0], points[points.len() - 1]);
          if last.on_curve && first.on_curve && last.x == first.x && last.y == first.y {
            points.pop();
          }
        }
        points
      })
      .filter(|points| !points.is_empty())
      .collect();
    GlyphOutline { contours }
  }
}

fn round_coord(value: f32) -> i16 {
  value.round().clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16
}

struct OutlineCollector {
  sink: ContourSink,
}

impl OutlineCollector {
  fn new() -> Self {
    Self {
      sink: ContourSink::new(),
    }
  }

  fn finish(self) -> GlyphOutline {
    self.sink.finish()
  }
}

impl ttf_parser::OutlineBuilder for OutlineCollector {
  fn move_to(&mut self, x: f32, y: f32) {
    self.sink.move_to(x, y);
  }

  fn line_to(&mut self, x: f32, y: f32) {
    self.sink.line_to(x, y);
  }

  fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
    self.sink.quad_to(x1, y1, x, y);
  }

  fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
    self.sink.cubic_to(x1, y1, x2, y2, x, y);
  }

  fn close(&mut self) {
    self.sink.close();
  }
}

/// Converts an OpenType font to TrueType flavour.
///
/// Fonts that already carry a `glyf` table pass through unchanged; CFF
/// outlines are re-extracted glyph by glyph and rebuilt as quadratics.
pub fn truetype_from_opentype(bytes: &[u8]) -> Result<Vec<u8>, FontError> {
  let raw = RawFace::parse(bytes, 0).map_err(|e| FontError::Parse(e.to_string()))?;
  if raw.table(Tag::from_bytes(b"glyf")).is_some() {
    return Ok(bytes.to_vec());
  }

  let face = Face::parse(bytes, 0).map_err(|e| FontError::Parse(e.to_string()))?;
  let count = face.number_of_glyphs();

  // Lowest code point wins when several map to the same glyph.
  let mut glyph_to_cp: HashMap<u16, u32> = HashMap::new();
  if let Some(cmap) = face.tables().cmap {
    let mut mapped = std::collections::BTreeSet::new();
    for subtable in cmap.subtables {
      if !subtable.is_unicode() {
        continue;
      }
      subtable.codepoints(|cp| {
        mapped.insert(cp);
      });
    }
    for cp in mapped {
      let Some(ch) = char::from_u32(cp) else {
        continue;
      };
      if let Some(glyph) = face.glyph_index(ch) {
        glyph_to_cp.entry(glyph.0).or_insert(cp);
      }
    }
  }

  let mut glyphs = Vec::with_capacity(count as usize);
  for gid in 0..count {
    let glyph = GlyphId(gid);
    let mut collector = OutlineCollector::new();
    let outline = match face.outline_glyph(glyph, &mut collector) {
      Some(_) => collector.finish(),
      None => GlyphOutline::default(),
    };
    glyphs.push(GlyphSource {
      code_point: glyph_to_cp.get(&gid).copied(),
      advance: face.glyph_hor_advance(glyph).unwrap_or(0),
      outline,
    });
  }

  let metrics = FontMetrics {
    units_per_em: face.units_per_em(),
    ascent: face.ascender(),
    descent: face.descender(),
  };
  let family = windows_name(&face, ttf_parser::name_id::FAMILY).unwrap_or_else(|| "Unknown".to_string());
  build_truetype(&metrics, &family, &glyphs)
}

/// Converts an SVG font document to a TrueType font.
///
/// Only the first `font` element is read. Glyphs with multi-character
/// `unicode` attributes (ligatures) keep their outlines but stay unmapped.
pub fn truetype_from_svg(text: &str) -> Result<Vec<u8>, FontError> {
  let doc = roxmltree::Document::parse(text).map_err(|e| FontError::Parse(e.to_string()))?;
  let font = doc
    .descendants()
    .find(|node| node.has_tag_name("font"))
    .ok_or_else(|| FontError::Parse("no font element in SVG document".to_string()))?;

  let font_face = font.descendants().find(|node| node.has_tag_name("font-face"));
  let units_per_em = font_face
    .and_then(|node| node.attribute("units-per-em"))
    .and_then(|value| value.parse::<f64>().ok())
    .map_or(1000, |value| value.round().max(16.0) as u16);
  let default_descent = -((units_per_em / 5) as i16);
  let descent = font_face
    .and_then(|node| node.attribute("descent"))
    .and_then(|value| value.parse::<f64>().ok())
    .map_or(default_descent, |value| value.round() as i16);
  let ascent = font_face
    .and_then(|node| node.attribute("ascent"))
    .and_then(|value| value.parse::<f64>().ok())
    .map_or_else(|| units_per_em as i16 + descent, |value| value.round() as i16);

  let default_advance = font
    .attribute("horiz-adv-x")
    .and_then(|value| value.parse::<f64>().ok())
    .map_or(units_per_em, |value| value.round().max(0.0) as u16);
  let family = font_face
    .and_then(|node| node.attribute("font-family"))
    .or_else(|| font.attribute("id"))
    .unwrap_or("Unknown")
    .to_string();

  let glyph_advance = |node: &roxmltree::Node<'_, '_>| {
    node
      .attribute("horiz-adv-x")
      .and_then(|value| value.parse::<f64>().ok())
      .map_or(default_advance, |value| value.round().max(0.0) as u16)
  };
  let glyph_outline = |node: &roxmltree::Node<'_, '_>| {
    let Some(data) = node.attribute("d") else {
      return GlyphOutline::default();
    };
    match parse_svg_path(data) {
      Ok(outline) => outline,
      Err(err) => {
        warn!("Skipping unparseable glyph outline: {err}");
        GlyphOutline::default()
      }
    }
  };

  let mut glyphs = Vec::new();
  match font.children().find(|node| node.has_tag_name("missing-glyph")) {
    Some(node) => glyphs.push(GlyphSource {
      code_point: None,
      advance: glyph_advance(&node),
      outline: glyph_outline(&node),
    }),
    None => glyphs.push(GlyphSource {
      code_point: None,
      advance: default_advance,
      outline: GlyphOutline::default(),
    }),
  }

  for node in font.children().filter(|node| node.has_tag_name("glyph")) {
    let code_point = node.attribute("unicode").and_then(|value| {
      let mut chars = value.chars();
      match (chars.next(), chars.next()) {
        (Some(ch), None) => Some(ch as u32),
        _ => None,
      }
    });
    glyphs.push(GlyphSource {
      code_point,
      advance: glyph_advance(&node),
      outline: glyph_outline(&node),
    });
  }

  let metrics = FontMetrics {
    units_per_em,
    ascent,
    descent,
  };
  build_truetype(&metrics, &family, &glyphs)
}

/// Assembles a complete TrueType font from glyph sources.
pub fn build_truetype(
  metrics: &FontMetrics,
  family: &str,
  glyphs: &[GlyphSource],
) -> Result<Vec<u8>, FontError> {
  if glyphs.is_empty() {
    return Err(FontError::Parse("cannot build a font with no glyphs".to_string()));
  }

  let mut glyf = Vec::new();
  let mut offsets = Vec::with_capacity(glyphs.len() + 1);
  let mut bbox = BboxAccumulator::new();
  let mut max_points = 0_u16;
  let mut max_contours = 0_u16;
  for glyph in glyphs {
    offsets.push(glyf.len() as u32);
    if glyph.outline.is_empty() {
      continue;
    }
    glyf.extend_from_slice(&encode_simple_glyph(&glyph.outline));
    while glyf.len() % 4 != 0 {
      glyf.push(0);
    }
    let points: usize = glyph.outline.contours.iter().map(Vec::len).sum();
    max_points = max_points.max(points as u16);
    max_contours = max_contours.max(glyph.outline.contours.len() as u16);
    for contour in &glyph.outline.contours {
      for point in contour {
        bbox.add(point.x, point.y);
      }
    }
  }
  offsets.push(glyf.len() as u32);
  let loca_format = loca_format_for(glyf.len());

  let mut pairs: Vec<(u32, u16)> = Vec::new();
  for (gid, glyph) in glyphs.iter().enumerate() {
    if let Some(cp) = glyph.code_point {
      pairs.push((cp, gid as u16));
    }
  }

  let mut hmtx = Vec::with_capacity(glyphs.len() * 4);
  for glyph in glyphs {
    let lsb = glyph
      .outline
      .contours
      .iter()
      .flatten()
      .map(|point| point.x)
      .min()
      .unwrap_or(0);
    sfnt::push_u16(&mut hmtx, glyph.advance);
    sfnt::push_i16(&mut hmtx, lsb);
  }

  let mut builder = SfntBuilder::new();
  builder.add(b"cmap", sfnt::build_cmap(&pairs));
  builder.add(b"glyf", glyf);
  builder.add(b"head", build_head(metrics, &bbox, loca_format));
  builder.add(b"hhea", build_hhea(metrics, &bbox, glyphs));
  builder.add(b"hmtx", hmtx);
  builder.add(b"loca", build_loca(&offsets, loca_format));
  builder.add(b"maxp", build_maxp(glyphs.len() as u16, max_points, max_contours));
  builder.add(b"name", build_name(family));
  builder.add(b"OS/2", build_os2(metrics, glyphs, &pairs));
  builder.add(b"post", build_post());
  builder.build()
}

struct BboxAccumulator {
  x_min: i16,
  y_min: i16,
  x_max: i16,
  y_max: i16,
  any: bool,
}

impl BboxAccumulator {
  fn new() -> Self {
    Self {
      x_min: 0,
      y_min: 0,
      x_max: 0,
      y_max: 0,
      any: false,
    }
  }

  fn add(&mut self, x: i16, y: i16) {
    if self.any {
      self.x_min = self.x_min.min(x);
      self.y_min = self.y_min.min(y);
      self.x_max = self.x_max.max(x);
      self.y_max = self.y_max.max(y);
    } else {
      self.x_min = x;
      self.y_min = y;
      self.x_max = x;
      self.y_max = y;
      self.any = true;
    }
  }
}

const ON_CURVE: u8 = 0x01;
const X_SHORT: u8 = 0x02;
const Y_SHORT: u8 = 0x04;
const X_SAME_OR_POSITIVE: u8 = 0x10;
const Y_SAME_OR_POSITIVE: u8 = 0x20;

/// Encodes one simple glyph record. Empty outlines encode to zero bytes.
pub(crate) fn encode_simple_glyph(outline: &GlyphOutline) -> Vec<u8> {
  let contours: Vec<&Vec<OutlinePoint>> =
    outline.contours.iter().filter(|contour| !contour.is_empty()).collect();
  if contours.is_empty() {
    return Vec::new();
  }

  let mut bbox = BboxAccumulator::new();
  for contour in &contours {
    for point in contour.iter() {
      bbox.add(point.x, point.y);
    }
  }

  let mut out = Vec::new();
  sfnt::push_i16(&mut out, contours.len() as i16);
  sfnt::push_i16(&mut out, bbox.x_min);
  sfnt::push_i16(&mut out, bbox.y_min);
  sfnt::push_i16(&mut out, bbox.x_max);
  sfnt::push_i16(&mut out, bbox.y_max);

  let mut end_pt = 0_u16;
  for contour in &contours {
    end_pt += contour.len() as u16;
    sfnt::push_u16(&mut out, end_pt - 1);
  }
  sfnt::push_u16(&mut out, 0); // instructionLength

  // One flag byte per point; repeats are legal but not worth the size here.
  let mut flags = Vec::new();
  let mut x_bytes = Vec::new();
  let mut y_bytes = Vec::new();
  let mut prev = (0_i16, 0_i16);
  for contour in &contours {
    for point in contour.iter() {
      let mut flag = if point.on_curve { ON_CURVE } else { 0 };
      let dx = i32::from(point.x) - i32::from(prev.0);
      let dy = i32::from(point.y) - i32::from(prev.1);

      if dx == 0 {
        flag |= X_SAME_OR_POSITIVE;
      } else if dx.unsigned_abs() <= 255 {
        flag |= X_SHORT;
        if dx > 0 {
          flag |= X_SAME_OR_POSITIVE;
        }
        x_bytes.push(dx.unsigned_abs() as u8);
      } else {
        x_bytes.extend_from_slice(&(dx as i16).to_be_bytes());
      }

      if dy == 0 {
        flag |= Y_SAME_OR_POSITIVE;
      } else if dy.unsigned_abs() <= 255 {
        flag |= Y_SHORT;
        if dy > 0 {
          flag |= Y_SAME_OR_POSITIVE;
        }
        y_bytes.push(dy.unsigned_abs() as u8);
      } else {
        y_bytes.extend_from_slice(&(dy as i16).to_be_bytes());
      }

      flags.push(flag);
      prev = (point.x, point.y);
    }
  }
  out.extend_from_slice(&flags);
  out.extend_from_slice(&x_bytes);
  out.extend_from_slice(&y_bytes);
  out
}

fn build_head(metrics: &FontMetrics, bbox: &BboxAccumulator, loca_format: i16) -> Vec<u8> {
  let mut out = Vec::with_capacity(54);
  sfnt::push_u32(&mut out, 0x0001_0000); // version
  sfnt::push_u32(&mut out, 0x0001_0000); // fontRevision
  sfnt::push_u32(&mut out, 0); // checkSumAdjustment, patched at assembly
  sfnt::push_u32(&mut out, 0x5F0F_3CF5); // magicNumber
  sfnt::push_u16(&mut out, 0x0003); // flags: baseline and lsb at zero
  sfnt::push_u16(&mut out, metrics.units_per_em);
  out.extend_from_slice(&[0; 16]); // created, modified
  sfnt::push_i16(&mut out, bbox.x_min);
  sfnt::push_i16(&mut out, bbox.y_min);
  sfnt::push_i16(&mut out, bbox.x_max);
  sfnt::push_i16(&mut out, bbox.y_max);
  sfnt::push_u16(&mut out, 0); // macStyle
  sfnt::push_u16(&mut out, 8); // lowestRecPPEM
  sfnt::push_i16(&mut out, 2); // fontDirectionHint
  sfnt::push_i16(&mut out, loca_format);
  sfnt::push_i16(&mut out, 0); // glyphDataFormat
  out
}

fn build_hhea(metrics: &FontMetrics, bbox: &BboxAccumulator, glyphs: &[GlyphSource]) -> Vec<u8> {
  let advance_max = glyphs.iter().map(|glyph| glyph.advance).max().unwrap_or(0);
  let mut out = Vec::with_capacity(36);
  sfnt::push_u32(&mut out, 0x0001_0000); // version
  sfnt::push_i16(&mut out, metrics.ascent);
  sfnt::push_i16(&mut out, metrics.descent);
  sfnt::push_i16(&mut out, 0); // lineGap
  sfnt::push_u16(&mut out, advance_max);
  sfnt::push_i16(&mut out, bbox.x_min); // minLeftSideBearing
  sfnt::push_i16(&mut out, 0); // minRightSideBearing
  sfnt::push_i16(&mut out, bbox.x_max); // xMaxExtent
  sfnt::push_i16(&mut out, 1); // caretSlopeRise
  sfnt::push_i16(&mut out, 0); // caretSlopeRun
  sfnt::push_i16(&mut out, 0); // caretOffset
  out.extend_from_slice(&[0; 8]); // reserved
  sfnt::push_i16(&mut out, 0); // metricDataFormat
  sfnt::push_u16(&mut out, glyphs.len() as u16);
  out
}

fn build_maxp(num_glyphs: u16, max_points: u16, max_contours: u16) -> Vec<u8> {
  let mut out = Vec::with_capacity(32);
  sfnt::push_u32(&mut out, 0x0001_0000); // version
  sfnt::push_u16(&mut out, num_glyphs);
  sfnt::push_u16(&mut out, max_points);
  sfnt::push_u16(&mut out, max_contours);
  sfnt::push_u16(&mut out, 0); // maxCompositePoints
  sfnt::push_u16(&mut out, 0); // maxCompositeContours
  sfnt::push_u16(&mut out, 1); // maxZones
  sfnt::push_u16(&mut out, 0); // maxTwilightPoints
  sfnt::push_u16(&mut out, 0); // maxStorage
  sfnt::push_u16(&mut out, 0); // maxFunctionDefs
  sfnt::push_u16(&mut out, 0); // maxInstructionDefs
  sfnt::push_u16(&mut out, 0); // maxStackElements
  sfnt::push_u16(&mut out, 0); // maxSizeOfInstructions
  sfnt::push_u16(&mut out, 0); // maxComponentElements
  sfnt::push_u16(&mut out, 0); // maxComponentDepth
  out
}

fn build_post() -> Vec<u8> {
  let mut out = vec![0_u8; 32];
  out[..4].copy_from_slice(&0x0003_0000_u32.to_be_bytes());
  out
}

/// Minimal `name` table: family, subfamily, full name and version, all as
/// Windows Unicode records.
fn build_name(family: &str) -> Vec<u8> {
  let records: [(u16, &str); 4] = [
    (1, family),
    (2, "Regular"),
    (4, family),
    (5, "Version 1.0"),
  ];

  let mut out = Vec::new();
  sfnt::push_u16(&mut out, 0); // format
  sfnt::push_u16(&mut out, records.len() as u16);
  sfnt::push_u16(&mut out, 6 + 12 * records.len() as u16); // stringOffset

  let mut strings = Vec::new();
  for (name_id, value) in records {
    let encoded: Vec<u8> = value
      .encode_utf16()
      .flat_map(|unit| unit.to_be_bytes())
      .collect();
    sfnt::push_u16(&mut out, 3); // platform: Windows
    sfnt::push_u16(&mut out, 1); // encoding: Unicode BMP
    sfnt::push_u16(&mut out, 0x0409); // language: en-US
    sfnt::push_u16(&mut out, name_id);
    sfnt::push_u16(&mut out, encoded.len() as u16);
    sfnt::push_u16(&mut out, strings.len() as u16);
    strings.extend_from_slice(&encoded);
  }
  out.extend_from_slice(&strings);
  out
}

fn build_os2(metrics: &FontMetrics, glyphs: &[GlyphSource], pairs: &[(u32, u16)]) -> Vec<u8> {
  let advance_sum: u32 = glyphs.iter().map(|glyph| u32::from(glyph.advance)).sum();
  let avg_width = (advance_sum / glyphs.len().max(1) as u32) as i16;
  let first_cp = pairs.iter().map(|&(cp, _)| cp).min().unwrap_or(0);
  let last_cp = pairs.iter().map(|&(cp, _)| cp).max().unwrap_or(0);
  let scale = |base: i32| ((base * i32::from(metrics.units_per_em)) / 1000) as i16;

  let mut out = Vec::with_capacity(86);
  sfnt::push_u16(&mut out, 1); // version
  sfnt::push_i16(&mut out, avg_width);
  sfnt::push_u16(&mut out, 400); // usWeightClass
  sfnt::push_u16(&mut out, 5); // usWidthClass
  sfnt::push_u16(&mut out, 0); // fsType: installable embedding
  sfnt::push_i16(&mut out, scale(650)); // ySubscriptXSize
  sfnt::push_i16(&mut out, scale(600)); // ySubscriptYSize
  sfnt::push_i16(&mut out, 0); // ySubscriptXOffset
  sfnt::push_i16(&mut out, scale(75)); // ySubscriptYOffset
  sfnt::push_i16(&mut out, scale(650)); // ySuperscriptXSize
  sfnt::push_i16(&mut out, scale(600)); // ySuperscriptYSize
  sfnt::push_i16(&mut out, 0); // ySuperscriptXOffset
  sfnt::push_i16(&mut out, scale(350)); // ySuperscriptYOffset
  sfnt::push_i16(&mut out, scale(50)); // yStrikeoutSize
  sfnt::push_i16(&mut out, scale(250)); // yStrikeoutPosition
  sfnt::push_i16(&mut out, 0); // sFamilyClass
  out.extend_from_slice(&[0; 10]); // panose
  let latin = pairs.iter().any(|&(cp, _)| cp < 0x80);
  sfnt::push_u32(&mut out, u32::from(latin)); // ulUnicodeRange1
  sfnt::push_u32(&mut out, 0);
  sfnt::push_u32(&mut out, 0);
  sfnt::push_u32(&mut out, 0);
  out.extend_from_slice(b"NONE"); // achVendID
  sfnt::push_u16(&mut out, 0x0040); // fsSelection: regular
  sfnt::push_u16(&mut out, first_cp.min(0xFFFF) as u16);
  sfnt::push_u16(&mut out, last_cp.min(0xFFFF) as u16);
  sfnt::push_i16(&mut out, metrics.ascent); // sTypoAscender
  sfnt::push_i16(&mut out, metrics.descent); // sTypoDescender
  sfnt::push_i16(&mut out, 0); // sTypoLineGap
  sfnt::push_u16(&mut out, metrics.ascent.max(0) as u16); // usWinAscent
  sfnt::push_u16(&mut out, (-i32::from(metrics.descent)).max(0) as u16); // usWinDescent
  sfnt::push_u32(&mut out, 1); // ulCodePageRange1: Latin 1
  sfnt::push_u32(&mut out, 0); // ulCodePageRange2
  out
}

pub(crate) fn windows_name(face: &Face<'_>, name_id: u16) -> Option<String> {
  face
    .names()
    .into_iter()
    .find(|name| name.name_id == name_id && name.is_unicode())
    .and_then(|name| name.to_string())
}

/// Parses SVG path data into quadratic contours.
pub(crate) fn parse_svg_path(data: &str) -> Result<GlyphOutline, FontError> {
  let mut sink = ContourSink::new();
  let mut current = (0.0_f32, 0.0_f32);
  let mut subpath_start = (0.0_f32, 0.0_f32);
  let mut last_cubic_ctrl: Option<(f32, f32)> = None;
  let mut last_quad_ctrl: Option<(f32, f32)> = None;

  for segment in PathParser::from(data) {
    let seg = segment.map_err(|e| FontError::Parse(format!("bad path data: {e}")))?;
    match seg {
      PathSegment::MoveTo { abs, x, y } => {
        let (nx, ny) = resolve(abs, current, x, y);
        sink.move_to(nx, ny);
        current = (nx, ny);
        subpath_start = current;
        last_cubic_ctrl = None;
        last_quad_ctrl = None;
      }
      PathSegment::LineTo { abs, x, y } => {
        let (nx, ny) = resolve(abs, current, x, y);
        sink.line_to(nx, ny);
        current = (nx, ny);
        last_cubic_ctrl = None;
        last_quad_ctrl = None;
      }
      PathSegment::HorizontalLineTo { abs, x } => {
        let nx = if abs { x as f32 } else { current.0 + x as f32 };
        sink.line_to(nx, current.1);
        current.0 = nx;
        last_cubic_ctrl = None;
        last_quad_ctrl = None;
      }
      PathSegment::VerticalLineTo { abs, y } => {
        let ny = if abs { y as f32 } else { current.1 + y as f32 };
        sink.line_to(current.0, ny);
        current.1 = ny;
        last_cubic_ctrl = None;
        last_quad_ctrl = None;
      }
      PathSegment::CurveTo {
        abs,
        x1,
        y1,
        x2,
        y2,
        x,
        y,
      } => {
        let (cx1, cy1) = resolve(abs, current, x1, y1);
        let (cx2, cy2) = resolve(abs, current, x2, y2);
        let (nx, ny) = resolve(abs, current, x, y);
        sink.cubic_to(cx1, cy1, cx2, cy2, nx, ny);
        current = (nx, ny);
        last_cubic_ctrl = Some((cx2, cy2));
        last_quad_ctrl = None;
      }
      PathSegment::SmoothCurveTo { abs, x2, y2, x, y } => {
        let (cx1, cy1) = match last_cubic_ctrl {
          Some((px, py)) => (2.0 * current.0 - px, 2.0 * current.1 - py),
          None => current,
        };
        let (cx2, cy2) = resolve(abs, current, x2, y2);
        let (nx, ny) = resolve(abs, current, x, y);
        sink.cubic_to(cx1, cy1, cx2, cy2, nx, ny);
        current = (nx, ny);
        last_cubic_ctrl = Some((cx2, cy2));
        last_quad_ctrl = None;
      }
      PathSegment::Quadratic { abs, x1, y1, x, y } => {
        let (cx1, cy1) = resolve(abs, current, x1, y1);
        let (nx, ny) = resolve(abs, current, x, y);
        sink.quad_to(cx1, cy1, nx, ny);
        current = (nx, ny);
        last_quad_ctrl = Some((cx1, cy1));
        last_cubic_ctrl = None;
      }
      PathSegment::SmoothQuadratic { abs, x, y } => {
        let (cx1, cy1) = match last_quad_ctrl {
          Some((px, py)) => (2.0 * current.0 - px, 2.0 * current.1 - py),
          None => current,
        };
        let (nx, ny) = resolve(abs, current, x, y);
        sink.quad_to(cx1, cy1, nx, ny);
        current = (nx, ny);
        last_quad_ctrl = Some((cx1, cy1));
        last_cubic_ctrl = None;
      }
      PathSegment::EllipticalArc {
        abs,
        rx,
        ry,
        x_axis_rotation,
        large_arc,
        sweep,
        x,
        y,
      } => {
        let (nx, ny) = resolve(abs, current, x, y);
        append_arc(
          &mut sink,
          current,
          (rx as f32, ry as f32),
          x_axis_rotation as f32,
          large_arc,
          sweep,
          (nx, ny),
        );
        current = (nx, ny);
        last_cubic_ctrl = None;
        last_quad_ctrl = None;
      }
      PathSegment::ClosePath { .. } => {
        sink.close();
        current = subpath_start;
        last_cubic_ctrl = None;
        last_quad_ctrl = None;
      }
    }
  }
  Ok(sink.finish())
}

fn resolve(abs: bool, current: (f32, f32), x: f64, y: f64) -> (f32, f32) {
  if abs {
    (x as f32, y as f32)
  } else {
    (current.0 + x as f32, current.1 + y as f32)
  }
}

/// Converts an elliptical arc to cubic segments of at most a quarter turn,
/// per the SVG implementation notes.
fn append_arc(
  sink: &mut ContourSink,
  from: (f32, f32),
  radii: (f32, f32),
  rotation_deg: f32,
  large_arc: bool,
  sweep: bool,
  to: (f32, f32),
) {
  let (x1, y1) = (f64::from(from.0), f64::from(from.1));
  let (x2, y2) = (f64::from(to.0), f64::from(to.1));
  let mut rx = f64::from(radii.0).abs();
  let mut ry = f64::from(radii.1).abs();
  if rx == 0.0 || ry == 0.0 || (x1 == x2 && y1 == y2) {
    sink.line_to(to.0, to.1);
    return;
  }

  let phi = f64::from(rotation_deg).to_radians();
  let (sin_phi, cos_phi) = phi.sin_cos();
  let dx = (x1 - x2) / 2.0;
  let dy = (y1 - y2) / 2.0;
  let x1p = cos_phi * dx + sin_phi * dy;
  let y1p = -sin_phi * dx + cos_phi * dy;

  let lambda = (x1p * x1p) / (rx * rx) + (y1p * y1p) / (ry * ry);
  if lambda > 1.0 {
    let scale = lambda.sqrt();
    rx *= scale;
    ry *= scale;
  }

  let sign = if large_arc != sweep { 1.0 } else { -1.0 };
  let num = (rx * rx) * (ry * ry) - (rx * rx) * (y1p * y1p) - (ry * ry) * (x1p * x1p);
  let den = (rx * rx) * (y1p * y1p) + (ry * ry) * (x1p * x1p);
  let coef = sign * (num / den).max(0.0).sqrt();
  let cxp = coef * rx * y1p / ry;
  let cyp = -coef * ry * x1p / rx;
  let cx = cos_phi * cxp - sin_phi * cyp + (x1 + x2) / 2.0;
  let cy = sin_phi * cxp + cos_phi * cyp + (y1 + y2) / 2.0;

  let angle = |ux: f64, uy: f64, vx: f64, vy: f64| (ux * vy - uy * vx).atan2(ux * vx + uy * vy);
  let theta1 = angle(1.0, 0.0, (x1p - cxp) / rx, (y1p - cyp) / ry);
  let mut dtheta = angle(
    (x1p - cxp) / rx,
    (y1p - cyp) / ry,
    (-x1p - cxp) / rx,
    (-y1p - cyp) / ry,
  );
  if !sweep && dtheta > 0.0 {
    dtheta -= std::f64::consts::TAU;
  } else if sweep && dtheta < 0.0 {
    dtheta += std::f64::consts::TAU;
  }

  let segments = (dtheta.abs() / std::f64::consts::FRAC_PI_2).ceil().max(1.0) as usize;
  let delta = dtheta / segments as f64;
  let t = 4.0 / 3.0 * (delta / 4.0).tan();

  let point = |theta: f64| {
    let (sin_t, cos_t) = theta.sin_cos();
    (
      cx + rx * cos_phi * cos_t - ry * sin_phi * sin_t,
      cy + rx * sin_phi * cos_t + ry * cos_phi * sin_t,
    )
  };
  let derivative = |theta: f64| {
    let (sin_t, cos_t) = theta.sin_cos();
    (
      -rx * cos_phi * sin_t - ry * sin_phi * cos_t,
      -rx * sin_phi * sin_t + ry * cos_phi * cos_t,
    )
  };

  let mut theta = theta1;
  let mut start = point(theta);
  for _ in 0..segments {
    let next = theta + delta;
    let end = point(next);
    let d1 = derivative(theta);
    let d2 = derivative(next);
    sink.cubic_to(
      (start.0 + t * d1.0) as f32,
      (start.1 + t * d1.1) as f32,
      (end.0 - t * d2.0) as f32,
      (end.1 - t * d2.1) as f32,
      end.0 as f32,
      end.1 as f32,
    );
    theta = next;
    start = end;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::engine::tests::{square_outline, test_glyph};

  #[test]
  fn built_font_parses_and_maps_glyphs() {
    let glyphs = vec![test_glyph(None, 500), test_glyph(Some('a'), 620)];
    let font = build_truetype(&FontMetrics::default(), "Demo", &glyphs).unwrap();

    let face = Face::parse(&font, 0).unwrap();
    assert_eq!(face.number_of_glyphs(), 2);
    assert_eq!(face.units_per_em(), 1000);
    let glyph = face.glyph_index('a').expect("a should map");
    assert_eq!(face.glyph_hor_advance(glyph), Some(620));
  }

  #[test]
  fn built_outlines_survive_a_parse_round_trip() {
    let glyphs = vec![test_glyph(None, 500), test_glyph(Some('a'), 620)];
    let font = build_truetype(&FontMetrics::default(), "Demo", &glyphs).unwrap();

    let face = Face::parse(&font, 0).unwrap();
    let glyph = face.glyph_index('a').unwrap();
    let bbox = face.glyph_bounding_box(glyph).expect("outline expected");
    assert_eq!((bbox.x_min, bbox.y_min), (0, 0));
    assert_eq!((bbox.x_max, bbox.y_max), (200, 200));
  }

  #[test]
  fn family_name_round_trips() {
    let glyphs = vec![test_glyph(None, 500)];
    let font = build_truetype(&FontMetrics::default(), "My Face", &glyphs).unwrap();
    let face = Face::parse(&font, 0).unwrap();
    assert_eq!(
      windows_name(&face, ttf_parser::name_id::FAMILY).as_deref(),
      Some("My Face")
    );
  }

  #[test]
  fn cubics_become_quadratic_pairs() {
    let mut sink = ContourSink::new();
    sink.move_to(0.0, 0.0);
    sink.cubic_to(0.0, 100.0, 100.0, 100.0, 100.0, 0.0);
    let outline = sink.finish();
    assert_eq!(outline.contours.len(), 1);
    // Start point, two off-curve controls and two on-curve ends.
    let on_curve: Vec<bool> = outline.contours[0].iter().map(|p| p.on_curve).collect();
    assert_eq!(on_curve, vec![true, false, true, false, true]);
  }

  #[test]
  fn closing_point_duplicates_are_dropped() {
    let outline = parse_svg_path("M 0 0 L 100 0 L 100 100 L 0 0 Z").unwrap();
    assert_eq!(outline.contours.len(), 1);
    assert_eq!(outline.contours[0].len(), 3);
  }

  #[test]
  fn relative_and_shorthand_segments_resolve() {
    let outline = parse_svg_path("M 10 10 h 20 v 20 l -20 0 z").unwrap();
    let points = &outline.contours[0];
    assert_eq!(points.len(), 4);
    assert_eq!((points[1].x, points[1].y), (30, 10));
    assert_eq!((points[2].x, points[2].y), (30, 30));
    assert_eq!((points[3].x, points[3].y), (10, 30));
  }

  #[test]
  fn arcs_are_flattened_to_curves() {
    let outline = parse_svg_path("M 0 0 A 50 50 0 0 1 100 0").unwrap();
    let points = &outline.contours[0];
    let last = points.last().unwrap();
    assert_eq!((last.x, last.y), (100, 0));
    assert!(points.iter().any(|point| !point.on_curve));
    // A positive-sweep arc between these endpoints dips below the axis.
    assert!(points.iter().any(|point| point.y < -20));
  }

  #[test]
  fn bad_path_data_is_an_error() {
    assert!(parse_svg_path("M 10 oops").is_err());
  }

  #[test]
  fn svg_font_documents_convert() {
    let svg = r##"<?xml version="1.0"?>
<svg xmlns="http://www.w3.org/2000/svg">
  <defs>
    <font id="icons" horiz-adv-x="1000">
      <font-face font-family="Icons" units-per-em="1000" ascent="800" descent="-200"/>
      <missing-glyph horiz-adv-x="500"/>
      <glyph unicode="&#xe600;" horiz-adv-x="900" d="M 0 0 L 900 0 L 900 700 L 0 700 Z"/>
      <glyph unicode="a" d="M 0 0 L 500 0 L 500 500 Z"/>
    </font>
  </defs>
</svg>"##;
    let font = truetype_from_svg(svg).unwrap();
    let face = Face::parse(&font, 0).unwrap();
    assert_eq!(face.units_per_em(), 1000);
    assert_eq!(face.number_of_glyphs(), 3);

    let icon = face.glyph_index('\u{e600}').expect("icon should map");
    assert_eq!(face.glyph_hor_advance(icon), Some(900));
    let letter = face.glyph_index('a').expect("a should map");
    assert_eq!(face.glyph_hor_advance(letter), Some(1000));
    assert_eq!(
      windows_name(&face, ttf_parser::name_id::FAMILY).as_deref(),
      Some("Icons")
    );
  }

  #[test]
  fn svg_ligature_glyphs_stay_unmapped() {
    let svg = r##"<svg xmlns="http://www.w3.org/2000/svg"><defs>
      <font id="f"><font-face units-per-em="1000"/>
      <glyph unicode="fi" d="M 0 0 L 10 0 L 10 10 Z"/>
    </font></defs></svg>"##;
    let font = truetype_from_svg(svg).unwrap();
    let face = Face::parse(&font, 0).unwrap();
    // Glyph exists but nothing maps to it.
    assert_eq!(face.number_of_glyphs(), 2);
    assert!(face.glyph_index('f').is_none());
  }

  #[test]
  fn documents_without_a_font_element_are_rejected() {
    let err = truetype_from_svg("<svg xmlns='http://www.w3.org/2000/svg'/>").unwrap_err();
    assert!(err.to_string().contains("no font element"));
  }

  #[test]
  fn truetype_input_passes_through_opentype_conversion() {
    let glyphs = vec![test_glyph(None, 500), test_glyph(Some('a'), 620)];
    let font = build_truetype(&FontMetrics::default(), "Demo", &glyphs).unwrap();
    let out = truetype_from_opentype(&font).unwrap();
    assert_eq!(out, font);
  }

  #[test]
  fn empty_glyph_list_is_rejected() {
    assert!(build_truetype(&FontMetrics::default(), "X", &[]).is_err());
  }

  #[test]
  fn square_outline_encodes_with_expected_bbox() {
    let record = encode_simple_glyph(&square_outline(200));
    assert_eq!(crate::engine::sfnt::read_i16(&record, 0), Some(1));
    assert_eq!(crate::engine::sfnt::read_i16(&record, 2), Some(0));
    assert_eq!(crate::engine::sfnt::read_i16(&record, 6), Some(200));
  }
}
