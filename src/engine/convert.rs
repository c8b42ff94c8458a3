//! Output container conversions from TrueType.
//!
//! WOFF wraps the sfnt tables with per-table zlib compression, WOFF2
//! brotli-compresses the whole table stream behind a flag-byte directory,
//! EOT prepends the embedded-font prefix to the raw TrueType data, and the
//! SVG writer re-emits outlines as an SVG font document.

use std::fmt::Write as _;
use std::io::Write as _;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use ttf_parser::{Face, GlyphId, RawFace, Tag};

use crate::engine::build::windows_name;
use crate::engine::sfnt::{padded_len, push_u16, push_u32, read_u16, read_u32, table_checksum};
use crate::error::FontError;

const WOFF_SIGNATURE: u32 = 0x774F_4646; // "wOFF"
const WOFF2_SIGNATURE: u32 = 0x774F_4632; // "wOF2"
const EOT_MAGIC: u16 = 0x504C;
const EOT_VERSION: u32 = 0x0002_0001;

/// Known-table indices from the WOFF2 table directory format. Anything else
/// is written with an explicit tag.
const WOFF2_KNOWN_TAGS: [&[u8; 4]; 13] = [
  b"cmap", b"head", b"hhea", b"hmtx", b"maxp", b"name", b"OS/2", b"post", b"cvt ", b"fpgm",
  b"glyf", b"loca", b"prep",
];

/// Transform version 3 in the two high flag bits: table stored untransformed.
const WOFF2_NULL_TRANSFORM: u8 = 0b1100_0000;

fn parse_err(e: impl std::fmt::Display) -> FontError {
  FontError::Parse(e.to_string())
}

fn le_u16(out: &mut Vec<u8>, value: u16) {
  out.extend_from_slice(&value.to_le_bytes());
}

fn le_u32(out: &mut Vec<u8>, value: u32) {
  out.extend_from_slice(&value.to_le_bytes());
}

fn sorted_tables<'a>(raw: &RawFace<'a>) -> Vec<(Tag, &'a [u8])> {
  let mut tables: Vec<(Tag, &'a [u8])> = raw
    .table_records
    .into_iter()
    .filter_map(|record| raw.table(record.tag).map(|data| (record.tag, data)))
    .collect();
  tables.sort_by_key(|&(tag, _)| tag.0);
  tables
}

/// Wraps a TrueType font in a WOFF 1.0 container.
pub fn truetype_to_woff(ttf: &[u8]) -> Result<Vec<u8>, FontError> {
  let raw = RawFace::parse(ttf, 0).map_err(parse_err)?;
  let tables = sorted_tables(&raw);
  let flavor = read_u32(ttf, 0).ok_or_else(|| FontError::Parse("empty font".to_string()))?;
  // WOFF carries the font version from `head.fontRevision`.
  let revision = raw
    .table(Tag::from_bytes(b"head"))
    .and_then(|head| read_u32(head, 4))
    .unwrap_or(0);

  let total_sfnt_size: u32 = 12
    + 16 * tables.len() as u32
    + tables
      .iter()
      .map(|(_, data)| padded_len(data.len()) as u32)
      .sum::<u32>();

  // Compress each table up front; a table that does not shrink is stored raw.
  let mut blocks: Vec<Vec<u8>> = Vec::with_capacity(tables.len());
  for (_, data) in &tables {
    let compressed = zlib_compress(data)?;
    if compressed.len() < data.len() {
      blocks.push(compressed);
    } else {
      blocks.push(data.to_vec());
    }
  }

  let mut out = Vec::new();
  push_u32(&mut out, WOFF_SIGNATURE);
  push_u32(&mut out, flavor);
  push_u32(&mut out, 0); // length, patched below
  push_u16(&mut out, tables.len() as u16);
  push_u16(&mut out, 0); // reserved
  push_u32(&mut out, total_sfnt_size);
  push_u16(&mut out, (revision >> 16) as u16); // majorVersion
  push_u16(&mut out, revision as u16); // minorVersion
  for _ in 0..5 {
    push_u32(&mut out, 0); // metadata and private blocks unused
  }

  let mut offset = 44 + 20 * tables.len();
  for ((tag, data), block) in tables.iter().zip(&blocks) {
    out.extend_from_slice(&tag.to_bytes());
    push_u32(&mut out, offset as u32);
    push_u32(&mut out, block.len() as u32);
    push_u32(&mut out, data.len() as u32);
    push_u32(&mut out, table_checksum(data));
    offset += padded_len(block.len());
  }
  for block in &blocks {
    out.extend_from_slice(block);
    out.resize(padded_len(out.len()), 0);
  }

  let length = out.len() as u32;
  out[8..12].copy_from_slice(&length.to_be_bytes());
  Ok(out)
}

/// Wraps a TrueType font in a WOFF2 container.
///
/// The `glyf` and `loca` tables are stored with the null transform; no
/// attempt is made at the optional glyph-stream transform.
pub fn truetype_to_woff2(ttf: &[u8]) -> Result<Vec<u8>, FontError> {
  let raw = RawFace::parse(ttf, 0).map_err(parse_err)?;
  let tables = sorted_tables(&raw);
  let flavor = read_u32(ttf, 0).ok_or_else(|| FontError::Parse("empty font".to_string()))?;

  let mut directory = Vec::new();
  let mut stream = Vec::new();
  let mut total_sfnt_size = 12 + 16 * tables.len() as u32;
  for (tag, data) in &tables {
    let bytes = tag.to_bytes();
    let known = WOFF2_KNOWN_TAGS.iter().position(|known| **known == bytes);
    let mut flag = known.unwrap_or(63) as u8;
    if &bytes == b"glyf" || &bytes == b"loca" {
      flag |= WOFF2_NULL_TRANSFORM;
    }
    directory.push(flag);
    if known.is_none() {
      directory.extend_from_slice(&bytes);
    }
    write_uint_base128(&mut directory, data.len() as u32);
    stream.extend_from_slice(data);
    total_sfnt_size += padded_len(data.len()) as u32;
  }

  let compressed = brotli_compress(&stream)?;

  let mut out = Vec::new();
  push_u32(&mut out, WOFF2_SIGNATURE);
  push_u32(&mut out, flavor);
  push_u32(&mut out, 0); // length, patched below
  push_u16(&mut out, tables.len() as u16);
  push_u16(&mut out, 0); // reserved
  push_u32(&mut out, total_sfnt_size);
  push_u32(&mut out, compressed.len() as u32);
  for _ in 0..6 {
    push_u32(&mut out, 0); // version, metadata and private blocks unused
  }
  out.extend_from_slice(&directory);
  out.extend_from_slice(&compressed);
  out.resize(padded_len(out.len()), 0);

  let length = out.len() as u32;
  out[8..12].copy_from_slice(&length.to_be_bytes());
  Ok(out)
}

/// Prepends the Embedded OpenType prefix to the raw font data.
///
/// Writes a version 0x00020001 prefix with an empty root string, which is
/// what legacy IE accepts for same-origin use. All prefix fields are
/// little-endian, unlike the sfnt payload that follows.
pub fn truetype_to_eot(ttf: &[u8]) -> Result<Vec<u8>, FontError> {
  let face = Face::parse(ttf, 0).map_err(parse_err)?;
  let raw = RawFace::parse(ttf, 0).map_err(parse_err)?;
  let os2 = raw.table(Tag::from_bytes(b"OS/2"));
  let head = raw
    .table(Tag::from_bytes(b"head"))
    .ok_or(FontError::MissingTable("head"))?;

  let mut panose = [0_u8; 10];
  if let Some(bytes) = os2.and_then(|table| table.get(32..42)) {
    panose.copy_from_slice(bytes);
  }
  let italic = os2
    .and_then(|table| read_u16(table, 62))
    .map_or(0, |fs_selection| (fs_selection & 1) as u8);
  let weight = os2.and_then(|table| read_u16(table, 4)).unwrap_or(400);
  let unicode_ranges = [42, 46, 50, 54]
    .map(|at| os2.and_then(|table| read_u32(table, at)).unwrap_or(0));
  let codepage_ranges =
    [78, 82].map(|at| os2.and_then(|table| read_u32(table, at)).unwrap_or(0));
  let checksum_adjustment = read_u32(head, 8).unwrap_or(0);

  let family = windows_name(&face, ttf_parser::name_id::FAMILY)
    .unwrap_or_else(|| "Unknown".to_string());
  let style = windows_name(&face, ttf_parser::name_id::SUBFAMILY)
    .unwrap_or_else(|| "Regular".to_string());
  let version = windows_name(&face, ttf_parser::name_id::VERSION)
    .unwrap_or_else(|| "Version 1.0".to_string());
  let full = windows_name(&face, ttf_parser::name_id::FULL_NAME).unwrap_or_else(|| family.clone());

  let mut out = Vec::new();
  le_u32(&mut out, 0); // EOTSize, patched below
  le_u32(&mut out, ttf.len() as u32);
  le_u32(&mut out, EOT_VERSION);
  le_u32(&mut out, 0); // flags
  out.extend_from_slice(&panose);
  out.push(0x01); // charset: DEFAULT_CHARSET
  out.push(italic);
  le_u32(&mut out, u32::from(weight));
  le_u16(&mut out, 0); // fsType: installable
  le_u16(&mut out, EOT_MAGIC);
  for range in unicode_ranges {
    le_u32(&mut out, range);
  }
  for range in codepage_ranges {
    le_u32(&mut out, range);
  }
  le_u32(&mut out, checksum_adjustment);
  for _ in 0..4 {
    le_u32(&mut out, 0); // reserved
  }
  for name in [&family, &style, &version, &full] {
    le_u16(&mut out, 0); // padding before each name block
    let encoded: Vec<u8> = name.encode_utf16().flat_map(u16::to_le_bytes).collect();
    le_u16(&mut out, encoded.len() as u16);
    out.extend_from_slice(&encoded);
  }
  le_u16(&mut out, 0); // padding before the root string
  le_u16(&mut out, 0); // empty root string
  out.extend_from_slice(ttf);

  let size = out.len() as u32;
  out[..4].copy_from_slice(&size.to_le_bytes());
  Ok(out)
}

/// Re-emits a TrueType font as an SVG font document.
pub fn truetype_to_svg(ttf: &[u8]) -> Result<Vec<u8>, FontError> {
  let face = Face::parse(ttf, 0).map_err(parse_err)?;
  let family = windows_name(&face, ttf_parser::name_id::FAMILY)
    .unwrap_or_else(|| "Unknown".to_string());
  let upem = face.units_per_em();

  let mut mapped = std::collections::BTreeMap::new();
  if let Some(cmap) = face.tables().cmap {
    let mut points = std::collections::BTreeSet::new();
    for subtable in cmap.subtables {
      if !subtable.is_unicode() {
        continue;
      }
      subtable.codepoints(|cp| {
        points.insert(cp);
      });
    }
    for cp in points {
      let Some(ch) = char::from_u32(cp) else {
        continue;
      };
      if let Some(glyph) = face.glyph_index(ch) {
        mapped.insert(cp, glyph);
      }
    }
  }

  let default_advance = face.glyph_hor_advance(GlyphId(0)).unwrap_or(upem);
  let mut out = String::new();
  out.push_str("<?xml version=\"1.0\" standalone=\"no\"?>\n");
  out.push_str("<svg xmlns=\"http://www.w3.org/2000/svg\">\n<defs>\n");
  let _ = writeln!(
    out,
    "<font id=\"{}\" horiz-adv-x=\"{default_advance}\">",
    xml_escape(&family)
  );
  let _ = writeln!(
    out,
    "<font-face font-family=\"{}\" units-per-em=\"{upem}\" ascent=\"{}\" descent=\"{}\"/>",
    xml_escape(&family),
    face.ascender(),
    face.descender()
  );

  match glyph_path_data(&face, GlyphId(0)) {
    Some(d) => {
      let _ = writeln!(out, "<missing-glyph horiz-adv-x=\"{default_advance}\" d=\"{d}\"/>");
    }
    None => {
      let _ = writeln!(out, "<missing-glyph horiz-adv-x=\"{default_advance}\"/>");
    }
  }
  for (&cp, &glyph) in &mapped {
    let advance = face.glyph_hor_advance(glyph).unwrap_or(default_advance);
    match glyph_path_data(&face, glyph) {
      Some(d) => {
        let _ = writeln!(
          out,
          "<glyph unicode=\"&#x{cp:X};\" horiz-adv-x=\"{advance}\" d=\"{d}\"/>"
        );
      }
      None => {
        let _ = writeln!(out, "<glyph unicode=\"&#x{cp:X};\" horiz-adv-x=\"{advance}\"/>");
      }
    }
  }
  out.push_str("</font>\n</defs>\n</svg>\n");
  Ok(out.into_bytes())
}

fn glyph_path_data(face: &Face<'_>, glyph: GlyphId) -> Option<String> {
  let mut writer = PathWriter::default();
  face.outline_glyph(glyph, &mut writer)?;
  if writer.data.is_empty() {
    None
  } else {
    Some(writer.data.trim_end().to_string())
  }
}

/// Emits outline callbacks as SVG path data, y-up as in SVG fonts.
#[derive(Default)]
struct PathWriter {
  data: String,
}

impl ttf_parser::OutlineBuilder for PathWriter {
  fn move_to(&mut self, x: f32, y: f32) {
    let _ = write!(self.data, "M {x} {y} ");
  }

  fn line_to(&mut self, x: f32, y: f32) {
    let _ = write!(self.data, "L {x} {y} ");
  }

  fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
    let _ = write!(self.data, "Q {x1} {y1} {x} {y} ");
  }

  fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
    let _ = write!(self.data, "C {x1} {y1} {x2} {y2} {x} {y} ");
  }

  fn close(&mut self) {
    self.data.push_str("Z ");
  }
}

fn xml_escape(value: &str) -> String {
  let mut out = String::with_capacity(value.len());
  for ch in value.chars() {
    match ch {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      _ => out.push(ch),
    }
  }
  out
}

fn zlib_compress(data: &[u8]) -> Result<Vec<u8>, FontError> {
  let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
  encoder
    .write_all(data)
    .and_then(|_| encoder.finish())
    .map_err(|e| FontError::Parse(format!("zlib compression failed: {e}")))
}

fn brotli_compress(data: &[u8]) -> Result<Vec<u8>, FontError> {
  let params = brotli::enc::BrotliEncoderParams {
    quality: 11,
    size_hint: data.len(),
    ..Default::default()
  };
  let mut out = Vec::new();
  brotli::enc::BrotliCompress(&mut &data[..], &mut out, &params)
    .map_err(|e| FontError::Parse(format!("brotli compression failed: {e}")))?;
  Ok(out)
}

/// WOFF2 UIntBase128 encoding: 7-bit groups, high bit flags more bytes.
fn write_uint_base128(out: &mut Vec<u8>, mut value: u32) {
  let mut groups = [0_u8; 5];
  let mut count = 0;
  loop {
    groups[count] = (value & 0x7F) as u8;
    count += 1;
    value >>= 7;
    if value == 0 {
      break;
    }
  }
  for i in (1..count).rev() {
    out.push(groups[i] | 0x80);
  }
  out.push(groups[0]);
}
