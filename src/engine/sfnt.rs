//! Low-level sfnt primitives shared by the subsetter and converters.
//!
//! Reading goes through `ttf_parser::RawFace`; this module adds the byte
//! helpers, checksum math, `loca` codecs, `cmap` builders and the table
//! assembler needed to write fonts back out.

use crate::error::FontError;

pub const SFNT_VERSION_TRUETYPE: u32 = 0x0001_0000;

/// Magic constant the whole-file checksum must sum to.
const CHECKSUM_MAGIC: u32 = 0xB1B0_AFBA;

/// Offset of `checkSumAdjustment` within the `head` table.
const HEAD_CHECKSUM_OFFSET: usize = 8;

pub fn read_u16(data: &[u8], at: usize) -> Option<u16> {
  let bytes = data.get(at..at + 2)?;
  Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

pub fn read_i16(data: &[u8], at: usize) -> Option<i16> {
  read_u16(data, at).map(|value| value as i16)
}

pub fn read_u32(data: &[u8], at: usize) -> Option<u32> {
  let bytes = data.get(at..at + 4)?;
  Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

pub fn push_u16(out: &mut Vec<u8>, value: u16) {
  out.extend_from_slice(&value.to_be_bytes());
}

pub fn push_i16(out: &mut Vec<u8>, value: i16) {
  out.extend_from_slice(&value.to_be_bytes());
}

pub fn push_u32(out: &mut Vec<u8>, value: u32) {
  out.extend_from_slice(&value.to_be_bytes());
}

/// Rounds a length up to a 4-byte boundary.
pub fn padded_len(len: usize) -> usize {
  (len + 3) & !3
}

/// Sums a table as big-endian u32 words, zero-padding the tail.
pub fn table_checksum(data: &[u8]) -> u32 {
  let mut sum = 0_u32;
  let mut chunks = data.chunks_exact(4);
  for chunk in &mut chunks {
    sum = sum.wrapping_add(u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
  }
  let tail = chunks.remainder();
  if !tail.is_empty() {
    let mut last = [0_u8; 4];
    last[..tail.len()].copy_from_slice(tail);
    sum = sum.wrapping_add(u32::from_be_bytes(last));
  }
  sum
}

/// Decodes a `loca` table into glyph data offsets.
///
/// Returns `num_glyphs + 1` entries. Truncated tables repeat the last
/// decodable offset so lookups degrade to empty glyphs instead of panics.
pub fn parse_loca(loca: &[u8], format: i16, num_glyphs: u16) -> Vec<u32> {
  let count = num_glyphs as usize + 1;
  let mut offsets = Vec::with_capacity(count);
  for i in 0..count {
    let offset = if format == 0 {
      read_u16(loca, i * 2).map(|short| u32::from(short) * 2)
    } else {
      read_u32(loca, i * 4)
    };
    match offset {
      Some(offset) => offsets.push(offset),
      None => offsets.push(offsets.last().copied().unwrap_or(0)),
    }
  }
  offsets
}

/// Encodes glyph offsets as a `loca` table in the given format.
pub fn build_loca(offsets: &[u32], format: i16) -> Vec<u8> {
  let mut out = Vec::with_capacity(offsets.len() * if format == 0 { 2 } else { 4 });
  for &offset in offsets {
    if format == 0 {
      push_u16(&mut out, (offset / 2) as u16);
    } else {
      push_u32(&mut out, offset);
    }
  }
  out
}

/// Picks the `loca` format for a rebuilt `glyf` table.
///
/// Glyph records are 4-byte aligned, so every offset is even and the short
/// format works whenever the half-offsets fit in a u16.
pub fn loca_format_for(glyf_len: usize) -> i16 {
  if glyf_len > 0x1FFFE {
    1
  } else {
    0
  }
}

/// Builds a `cmap` table for the given code point to glyph id pairs.
///
/// BMP-only fonts get a single format 4 subtable (Windows, Unicode BMP);
/// anything mapping beyond the BMP gets a format 12 subtable (Windows,
/// Unicode full) instead.
pub fn build_cmap(pairs: &[(u32, u16)]) -> Vec<u8> {
  let mut sorted = pairs.to_vec();
  sorted.sort_by_key(|&(cp, _)| cp);
  sorted.dedup_by_key(|&mut (cp, _)| cp);

  let bmp_only = sorted.last().map_or(true, |&(cp, _)| cp < 0xFFFF);
  let (encoding_id, subtable) = if bmp_only {
    let bmp: Vec<(u16, u16)> = sorted.iter().map(|&(cp, gid)| (cp as u16, gid)).collect();
    (1_u16, build_cmap_format4(&bmp))
  } else {
    (10_u16, build_cmap_format12(&sorted))
  };

  let mut cmap = Vec::with_capacity(12 + subtable.len());
  push_u16(&mut cmap, 0); // version
  push_u16(&mut cmap, 1); // numTables
  push_u16(&mut cmap, 3); // platform: Windows
  push_u16(&mut cmap, encoding_id);
  push_u32(&mut cmap, 12); // subtable offset
  cmap.extend_from_slice(&subtable);
  cmap
}

fn build_cmap_format4(pairs: &[(u16, u16)]) -> Vec<u8> {
  // Group contiguous code points into segments. Single-char segments use
  // idDelta; longer runs index into glyphIdArray so the glyph ids within a
  // run can be arbitrary.
  let mut segments: Vec<(u16, u16, Vec<u16>)> = Vec::new();
  for &(cp, gid) in pairs {
    if let Some(last) = segments.last_mut() {
      if cp == last.1 + 1 {
        last.1 = cp;
        last.2.push(gid);
        continue;
      }
    }
    segments.push((cp, cp, vec![gid]));
  }
  segments.push((0xFFFF, 0xFFFF, vec![0]));

  let seg_count = segments.len() as u16;
  let seg_count_x2 = seg_count * 2;
  let entry_selector = seg_count.ilog2() as u16;
  let search_range = (1_u16 << entry_selector) * 2;
  let range_shift = seg_count_x2 - search_range;

  let mut end_codes = Vec::with_capacity(segments.len());
  let mut start_codes = Vec::with_capacity(segments.len());
  let mut id_deltas = Vec::with_capacity(segments.len());
  let mut id_range_offsets = Vec::with_capacity(segments.len());
  let mut glyph_id_array: Vec<u16> = Vec::new();

  for (i, (start, end, gids)) in segments.iter().enumerate() {
    start_codes.push(*start);
    end_codes.push(*end);
    if *start == 0xFFFF {
      id_deltas.push(1_i16);
      id_range_offsets.push(0_u16);
    } else if gids.len() == 1 {
      id_deltas.push((i32::from(gids[0]) - i32::from(*start)) as i16);
      id_range_offsets.push(0);
    } else {
      id_deltas.push(0);
      // Byte distance from this idRangeOffset slot to the run's first
      // glyphIdArray entry.
      let slots_remaining = (segments.len() - i) as u16;
      id_range_offsets.push((slots_remaining + glyph_id_array.len() as u16) * 2);
      glyph_id_array.extend_from_slice(gids);
    }
  }

  let length = 16 + 8 * segments.len() + 2 * glyph_id_array.len();
  let mut out = Vec::with_capacity(length);
  push_u16(&mut out, 4); // format
  push_u16(&mut out, length as u16);
  push_u16(&mut out, 0); // language
  push_u16(&mut out, seg_count_x2);
  push_u16(&mut out, search_range);
  push_u16(&mut out, entry_selector);
  push_u16(&mut out, range_shift);
  for &code in &end_codes {
    push_u16(&mut out, code);
  }
  push_u16(&mut out, 0); // reservedPad
  for &code in &start_codes {
    push_u16(&mut out, code);
  }
  for &delta in &id_deltas {
    push_i16(&mut out, delta);
  }
  for &offset in &id_range_offsets {
    push_u16(&mut out, offset);
  }
  for &gid in &glyph_id_array {
    push_u16(&mut out, gid);
  }
  out
}

fn build_cmap_format12(pairs: &[(u32, u16)]) -> Vec<u8> {
  // Sequential map groups: code point and glyph id must both advance by one
  // to extend a group.
  let mut groups: Vec<(u32, u32, u32)> = Vec::new();
  for &(cp, gid) in pairs {
    if let Some(last) = groups.last_mut() {
      let extent = last.1 - last.0;
      if cp == last.1 + 1 && u32::from(gid) == last.2 + extent + 1 {
        last.1 = cp;
        continue;
      }
    }
    groups.push((cp, cp, u32::from(gid)));
  }

  let length = 16 + 12 * groups.len();
  let mut out = Vec::with_capacity(length);
  push_u16(&mut out, 12); // format
  push_u16(&mut out, 0); // reserved
  push_u32(&mut out, length as u32);
  push_u32(&mut out, 0); // language
  push_u32(&mut out, groups.len() as u32);
  for &(start, end, start_gid) in &groups {
    push_u32(&mut out, start);
    push_u32(&mut out, end);
    push_u32(&mut out, start_gid);
  }
  out
}

/// Assembles sfnt tables into a complete font file.
///
/// Tables are sorted by tag, padded to 4 bytes, checksummed, and the `head`
/// table's `checkSumAdjustment` is patched so the whole file sums to the
/// magic constant. The caller must add `head` with a zeroed adjustment.
pub struct SfntBuilder {
  tables: Vec<([u8; 4], Vec<u8>)>,
}

impl SfntBuilder {
  pub fn new() -> Self {
    Self { tables: Vec::new() }
  }

  pub fn add(&mut self, tag: &[u8; 4], data: Vec<u8>) {
    self.tables.push((*tag, data));
  }

  pub fn build(mut self) -> Result<Vec<u8>, FontError> {
    if self.tables.is_empty() {
      return Err(FontError::Parse("no tables to write".to_string()));
    }
    self.tables.sort_by_key(|(tag, _)| *tag);

    let count = self.tables.len() as u16;
    let entry_selector = count.ilog2() as u16;
    let search_range = 1_u16 << (4 + entry_selector);
    let range_shift = count * 16 - search_range;

    let mut out = Vec::new();
    push_u32(&mut out, SFNT_VERSION_TRUETYPE);
    push_u16(&mut out, count);
    push_u16(&mut out, search_range);
    push_u16(&mut out, entry_selector);
    push_u16(&mut out, range_shift);

    // Directory entries record the unpadded length; the stream itself pads
    // each table to a word boundary.
    let mut offset = 12 + self.tables.len() * 16;
    let mut head_offset = None;
    for (tag, data) in &self.tables {
      if tag == b"head" {
        head_offset = Some(offset);
      }
      out.extend_from_slice(tag);
      push_u32(&mut out, table_checksum(data));
      push_u32(&mut out, offset as u32);
      push_u32(&mut out, data.len() as u32);
      offset += padded_len(data.len());
    }
    for (_, data) in &self.tables {
      out.extend_from_slice(data);
      out.resize(padded_len(out.len()), 0);
    }

    if let Some(head_offset) = head_offset {
      let adjustment = CHECKSUM_MAGIC.wrapping_sub(table_checksum(&out));
      let at = head_offset + HEAD_CHECKSUM_OFFSET;
      if at + 4 <= out.len() {
        out[at..at + 4].copy_from_slice(&adjustment.to_be_bytes());
      }
    }
    Ok(out)
  }
}
