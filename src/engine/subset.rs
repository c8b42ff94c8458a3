//! TrueType subsetting.
//!
//! Rebuilds a font with only the requested code points. Glyph ids are
//! remapped to a contiguous range starting at 0, composite references are
//! rewritten, and the metric and mapping tables are regenerated to match.
//! When hinting is dropped, the `cvt `, `fpgm` and `prep` tables are omitted
//! and per-glyph instructions are removed.

use std::collections::{BTreeSet, HashMap};

use ttf_parser::{Face, RawFace, Tag};

use crate::engine::sfnt::{
  self, build_loca, loca_format_for, parse_loca, read_i16, read_u16, SfntBuilder,
};
use crate::error::FontError;

const ARG_1_AND_2_ARE_WORDS: u16 = 0x0001;
const WE_HAVE_A_SCALE: u16 = 0x0008;
const MORE_COMPONENTS: u16 = 0x0020;
const WE_HAVE_AN_X_AND_Y_SCALE: u16 = 0x0040;
const WE_HAVE_A_TWO_BY_TWO: u16 = 0x0080;
const WE_HAVE_INSTRUCTIONS: u16 = 0x0100;

/// Control glyphs that never count towards a font's usable inventory.
const EXCLUDED_GLYPH_NAMES: [&str; 3] = [".notdef", ".null", "nonmarkingreturn"];

/// Lists every code point the font maps to a usable glyph, ascending.
pub fn glyph_code_points(ttf: &[u8]) -> Result<Vec<u32>, FontError> {
  let face = Face::parse(ttf, 0).map_err(|e| FontError::Parse(e.to_string()))?;
  let cmap = face.tables().cmap.ok_or(FontError::MissingTable("cmap"))?;

  let mut mapped = BTreeSet::new();
  for subtable in cmap.subtables {
    if !subtable.is_unicode() {
      continue;
    }
    subtable.codepoints(|cp| {
      mapped.insert(cp);
    });
  }

  let mut points = Vec::with_capacity(mapped.len());
  for cp in mapped {
    let Some(ch) = char::from_u32(cp) else {
      continue;
    };
    let Some(glyph) = face.glyph_index(ch) else {
      continue;
    };
    let named_control = face
      .glyph_name(glyph)
      .map_or(false, |name| EXCLUDED_GLYPH_NAMES.contains(&name));
    if !named_control {
      points.push(cp);
    }
  }
  Ok(points)
}

/// Subsets a TrueType font to the given code points.
///
/// Code points the font does not map are skipped. Glyph 0 is always kept.
pub fn subset_truetype(
  ttf: &[u8],
  code_points: &[u32],
  keep_hinting: bool,
) -> Result<Vec<u8>, FontError> {
  let face = Face::parse(ttf, 0).map_err(|e| FontError::Parse(e.to_string()))?;
  let raw = RawFace::parse(ttf, 0).map_err(|e| FontError::Parse(e.to_string()))?;
  let table =
    |tag: &'static [u8; 4]| raw.table(Tag::from_bytes(tag)).ok_or(FontError::MissingTable(tag_name(tag)));

  let glyf = table(b"glyf")?;
  let head = table(b"head")?;
  let hhea = table(b"hhea")?;
  let hmtx = table(b"hmtx")?;
  let maxp = table(b"maxp")?;

  let loca_format = read_i16(head, 50).ok_or(malformed("head", "missing indexToLocFormat"))?;
  let loca = parse_loca(table(b"loca")?, loca_format, face.number_of_glyphs());

  // Map requested code points onto old glyph ids, then close over composite
  // components so every referenced glyph survives.
  let mut pairs: Vec<(u32, u16)> = Vec::new();
  let mut needed: BTreeSet<u16> = BTreeSet::new();
  needed.insert(0);
  for &cp in code_points {
    let Some(ch) = char::from_u32(cp) else {
      continue;
    };
    if let Some(glyph) = face.glyph_index(ch) {
      pairs.push((cp, glyph.0));
      needed.insert(glyph.0);
    }
  }
  for gid in needed.clone() {
    collect_composite_deps(glyf, &loca, gid, &mut needed);
  }

  let mut remap: HashMap<u16, u16> = HashMap::with_capacity(needed.len());
  for (new_gid, &old_gid) in needed.iter().enumerate() {
    remap.insert(old_gid, new_gid as u16);
  }
  let new_count = needed.len() as u16;

  let (new_glyf, offsets) = rebuild_glyf(glyf, &loca, &needed, &remap, keep_hinting);
  let new_loca_format = loca_format_for(new_glyf.len());

  let num_h_metrics = read_u16(hhea, 34).ok_or(malformed("hhea", "missing numberOfHMetrics"))?;
  let new_hmtx = rebuild_hmtx(hmtx, &needed, num_h_metrics as usize);

  let new_pairs: Vec<(u32, u16)> = pairs
    .iter()
    .filter_map(|&(cp, old_gid)| remap.get(&old_gid).map(|&new_gid| (cp, new_gid)))
    .collect();

  let mut new_head = head.to_vec();
  if new_head.len() < 54 {
    return Err(malformed("head", "table too short"));
  }
  new_head[8..12].fill(0);
  new_head[50..52].copy_from_slice(&new_loca_format.to_be_bytes());

  let mut new_hhea = hhea.to_vec();
  new_hhea.resize(new_hhea.len().max(36), 0);
  new_hhea[34..36].copy_from_slice(&new_count.to_be_bytes());

  let mut new_maxp = maxp.to_vec();
  if new_maxp.len() < 6 {
    return Err(malformed("maxp", "table too short"));
  }
  new_maxp[4..6].copy_from_slice(&new_count.to_be_bytes());

  let mut builder = SfntBuilder::new();
  builder.add(b"cmap", sfnt::build_cmap(&new_pairs));
  builder.add(b"glyf", new_glyf);
  builder.add(b"head", new_head);
  builder.add(b"hhea", new_hhea);
  builder.add(b"hmtx", new_hmtx);
  builder.add(b"loca", build_loca(&offsets, new_loca_format));
  builder.add(b"maxp", new_maxp);
  builder.add(b"post", rebuild_post(raw.table(Tag::from_bytes(b"post"))));
  if let Some(name) = raw.table(Tag::from_bytes(b"name")) {
    builder.add(b"name", name.to_vec());
  }
  if let Some(os2) = raw.table(Tag::from_bytes(b"OS/2")) {
    builder.add(b"OS/2", os2.to_vec());
  }
  if keep_hinting {
    for tag in [b"cvt ", b"fpgm", b"prep"] {
      if let Some(data) = raw.table(Tag::from_bytes(tag)) {
        builder.add(tag, data.to_vec());
      }
    }
  }
  builder.build()
}

fn tag_name(tag: &'static [u8; 4]) -> &'static str {
  std::str::from_utf8(tag).unwrap_or("????")
}

fn malformed(table: &'static str, message: &str) -> FontError {
  FontError::Malformed {
    table,
    message: message.to_string(),
  }
}

fn glyph_record<'a>(glyf: &'a [u8], loca: &[u32], gid: u16) -> Option<&'a [u8]> {
  let idx = gid as usize;
  let start = *loca.get(idx)? as usize;
  let end = *loca.get(idx + 1)? as usize;
  if start >= end || start >= glyf.len() {
    return None;
  }
  Some(&glyf[start..end.min(glyf.len())])
}

fn collect_composite_deps(glyf: &[u8], loca: &[u32], gid: u16, needed: &mut BTreeSet<u16>) {
  let Some(record) = glyph_record(glyf, loca, gid) else {
    return;
  };
  let Some(contours) = read_i16(record, 0) else {
    return;
  };
  if contours >= 0 {
    return;
  }

  let mut pos = 10;
  loop {
    let (Some(flags), Some(component)) = (read_u16(record, pos), read_u16(record, pos + 2)) else {
      return;
    };
    if needed.insert(component) {
      collect_composite_deps(glyf, loca, component, needed);
    }
    pos += component_args_len(flags);
    if flags & MORE_COMPONENTS == 0 {
      return;
    }
  }
}

/// Bytes occupied by one component record, flags and glyph id included.
fn component_args_len(flags: u16) -> usize {
  let mut len = 4;
  len += if flags & ARG_1_AND_2_ARE_WORDS != 0 { 4 } else { 2 };
  if flags & WE_HAVE_A_SCALE != 0 {
    len += 2;
  } else if flags & WE_HAVE_AN_X_AND_Y_SCALE != 0 {
    len += 4;
  } else if flags & WE_HAVE_A_TWO_BY_TWO != 0 {
    len += 8;
  }
  len
}

fn rebuild_glyf(
  glyf: &[u8],
  loca: &[u32],
  needed: &BTreeSet<u16>,
  remap: &HashMap<u16, u16>,
  keep_hinting: bool,
) -> (Vec<u8>, Vec<u32>) {
  let mut new_glyf: Vec<u8> = Vec::new();
  let mut offsets: Vec<u32> = Vec::with_capacity(needed.len() + 1);

  for &old_gid in needed {
    offsets.push(new_glyf.len() as u32);
    let Some(record) = glyph_record(glyf, loca, old_gid) else {
      continue;
    };
    let Some(contours) = read_i16(record, 0) else {
      continue;
    };

    if contours >= 0 {
      if keep_hinting {
        new_glyf.extend_from_slice(record);
      } else {
        new_glyf.extend_from_slice(&strip_simple_instructions(record));
      }
    } else {
      let mut rewritten = record.to_vec();
      rewrite_composite(&mut rewritten, remap, !keep_hinting);
      new_glyf.extend_from_slice(&rewritten);
    }
    // Keep glyph records word-aligned so short loca offsets stay even.
    while new_glyf.len() % 4 != 0 {
      new_glyf.push(0);
    }
  }
  offsets.push(new_glyf.len() as u32);
  (new_glyf, offsets)
}

/// Zeroes the instruction block of a simple glyph record.
///
/// Malformed records are copied untouched; they carry no glyph references,
/// so passing them through cannot corrupt the remapping.
fn strip_simple_instructions(record: &[u8]) -> Vec<u8> {
  let Some(contours) = read_i16(record, 0) else {
    return record.to_vec();
  };
  let end_pts_end = 10 + contours as usize * 2;
  let Some(instr_len) = read_u16(record, end_pts_end) else {
    return record.to_vec();
  };
  let rest = end_pts_end + 2 + instr_len as usize;
  if rest > record.len() {
    return record.to_vec();
  }
  let mut out = Vec::with_capacity(record.len() - instr_len as usize);
  out.extend_from_slice(&record[..end_pts_end]);
  out.extend_from_slice(&[0, 0]);
  out.extend_from_slice(&record[rest..]);
  out
}

/// Rewrites component glyph ids in place and optionally drops instructions.
fn rewrite_composite(record: &mut Vec<u8>, remap: &HashMap<u16, u16>, strip_instructions: bool) {
  let mut pos = 10;
  loop {
    let (Some(mut flags), Some(component)) = (read_u16(record, pos), read_u16(record, pos + 2))
    else {
      return;
    };
    if strip_instructions && flags & WE_HAVE_INSTRUCTIONS != 0 {
      flags &= !WE_HAVE_INSTRUCTIONS;
      record[pos..pos + 2].copy_from_slice(&flags.to_be_bytes());
    }
    if let Some(&new_gid) = remap.get(&component) {
      record[pos + 2..pos + 4].copy_from_slice(&new_gid.to_be_bytes());
    }
    pos += component_args_len(flags);
    if flags & MORE_COMPONENTS == 0 {
      break;
    }
  }
  // Instructions trail the last component; cutting there drops them.
  if strip_instructions && pos <= record.len() {
    record.truncate(pos);
  }
}

fn rebuild_hmtx(hmtx: &[u8], needed: &BTreeSet<u16>, num_h_metrics: usize) -> Vec<u8> {
  let mut out = Vec::with_capacity(needed.len() * 4);
  for &old_gid in needed {
    let idx = old_gid as usize;
    let (advance, lsb) = if idx < num_h_metrics {
      (read_u16(hmtx, idx * 4), read_i16(hmtx, idx * 4 + 2))
    } else {
      // Tail glyphs share the last advance and carry their own lsb.
      let last = num_h_metrics.saturating_sub(1);
      (
        read_u16(hmtx, last * 4),
        read_i16(hmtx, num_h_metrics * 4 + (idx - num_h_metrics) * 2),
      )
    };
    sfnt::push_u16(&mut out, advance.unwrap_or(0));
    sfnt::push_i16(&mut out, lsb.unwrap_or(0));
  }
  out
}

/// Truncates `post` to version 3.0, keeping the metrics header and dropping
/// glyph names, which would otherwise dangle after remapping.
fn rebuild_post(post: Option<&[u8]>) -> Vec<u8> {
  let mut out = vec![0_u8; 32];
  out[..4].copy_from_slice(&0x0003_0000_u32.to_be_bytes());
  if let Some(post) = post {
    let keep = post.len().min(32);
    if keep > 4 {
      out[4..keep].copy_from_slice(&post[4..keep]);
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::engine::tests::{sample_ttf, square_outline};

  #[test]
  fn subset_keeps_only_requested_code_points() {
    let font = sample_ttf();
    let out = subset_truetype(&font, &['a' as u32, 'c' as u32], true).unwrap();
    let face = Face::parse(&out, 0).unwrap();
    assert_eq!(face.number_of_glyphs(), 3);
    assert!(face.glyph_index('a').is_some());
    assert!(face.glyph_index('b').is_none());
    assert!(face.glyph_index('c').is_some());
  }

  #[test]
  fn subset_preserves_advance_widths() {
    let font = sample_ttf();
    let out = subset_truetype(&font, &['c' as u32], true).unwrap();
    let face = Face::parse(&out, 0).unwrap();
    let glyph = face.glyph_index('c').unwrap();
    assert_eq!(face.glyph_hor_advance(glyph), Some(700));
  }

  #[test]
  fn unmapped_code_points_are_skipped() {
    let font = sample_ttf();
    let out = subset_truetype(&font, &['a' as u32, 'z' as u32], true).unwrap();
    let face = Face::parse(&out, 0).unwrap();
    assert_eq!(face.number_of_glyphs(), 2);
    assert!(face.glyph_index('z').is_none());
  }

  #[test]
  fn empty_request_still_keeps_glyph_zero() {
    let font = sample_ttf();
    let out = subset_truetype(&font, &[], true).unwrap();
    let face = Face::parse(&out, 0).unwrap();
    assert_eq!(face.number_of_glyphs(), 1);
  }

  #[test]
  fn subset_output_outlines_still_draw() {
    let font = sample_ttf();
    let out = subset_truetype(&font, &['a' as u32], true).unwrap();
    let face = Face::parse(&out, 0).unwrap();
    let glyph = face.glyph_index('a').unwrap();
    let bbox = face.glyph_bounding_box(glyph).expect("outline should survive");
    assert!(bbox.x_max > bbox.x_min);
  }

  #[test]
  fn inventory_lists_mapped_code_points_ascending() {
    let font = sample_ttf();
    let points = glyph_code_points(&font).unwrap();
    assert_eq!(points, vec!['a' as u32, 'b' as u32, 'c' as u32]);
  }

  #[test]
  fn inventory_of_non_font_data_is_an_error() {
    assert!(glyph_code_points(b"not a font").is_err());
  }

  #[test]
  fn component_record_sizes_follow_flags() {
    assert_eq!(component_args_len(0), 6);
    assert_eq!(component_args_len(ARG_1_AND_2_ARE_WORDS), 8);
    assert_eq!(component_args_len(ARG_1_AND_2_ARE_WORDS | WE_HAVE_A_SCALE), 10);
    assert_eq!(component_args_len(WE_HAVE_A_TWO_BY_TWO), 14);
  }

  #[test]
  fn composite_dependencies_are_collected_transitively() {
    // Glyph 1 is simple; glyph 2 references 1; glyph 3 references 2.
    let simple = simple_record(&square_outline(10));
    let comp_a = composite_record(1, false);
    let comp_b = composite_record(2, false);
    let (glyf, loca) = pack_glyphs(&[Vec::new(), simple, comp_a, comp_b]);

    let mut needed = BTreeSet::from([0_u16, 3]);
    collect_composite_deps(&glyf, &loca, 3, &mut needed);
    assert_eq!(needed, BTreeSet::from([0, 1, 2, 3]));
  }

  #[test]
  fn composite_references_are_remapped() {
    let mut record = composite_record(7, false);
    let remap = HashMap::from([(7_u16, 1_u16)]);
    rewrite_composite(&mut record, &remap, false);
    assert_eq!(read_u16(&record, 12), Some(1));
  }

  #[test]
  fn stripping_removes_simple_glyph_instructions() {
    let mut record = simple_record(&square_outline(10));
    // Splice a 3-byte instruction block into the encoded record.
    let contours = read_i16(&record, 0).unwrap() as usize;
    let instr_at = 10 + contours * 2;
    record.splice(instr_at..instr_at + 2, [0, 3, 1, 2, 3]);

    let stripped = strip_simple_instructions(&record);
    assert_eq!(stripped.len(), record.len() - 3);
    assert_eq!(read_u16(&stripped, instr_at), Some(0));
  }

  #[test]
  fn stripping_clears_composite_instruction_flag() {
    let mut record = composite_record(1, true);
    let with_instructions = record.len();
    let remap = HashMap::from([(1_u16, 1_u16)]);
    rewrite_composite(&mut record, &remap, true);
    assert!(record.len() < with_instructions);
    assert_eq!(read_u16(&record, 10).unwrap() & WE_HAVE_INSTRUCTIONS, 0);
  }

  fn simple_record(outline: &crate::engine::build::GlyphOutline) -> Vec<u8> {
    crate::engine::build::encode_simple_glyph(outline)
  }

  /// One-component composite with zero offsets, optionally followed by a
  /// two-byte instruction block.
  fn composite_record(component: u16, with_instructions: bool) -> Vec<u8> {
    let mut out = Vec::new();
    sfnt::push_i16(&mut out, -1);
    for _ in 0..4 {
      sfnt::push_i16(&mut out, 0);
    }
    let mut flags = ARG_1_AND_2_ARE_WORDS;
    if with_instructions {
      flags |= WE_HAVE_INSTRUCTIONS;
    }
    sfnt::push_u16(&mut out, flags);
    sfnt::push_u16(&mut out, component);
    sfnt::push_i16(&mut out, 0);
    sfnt::push_i16(&mut out, 0);
    if with_instructions {
      sfnt::push_u16(&mut out, 2);
      out.extend_from_slice(&[0xB0, 0x00]);
    }
    out
  }

  fn pack_glyphs(records: &[Vec<u8>]) -> (Vec<u8>, Vec<u32>) {
    let mut glyf = Vec::new();
    let mut loca = Vec::new();
    for record in records {
      loca.push(glyf.len() as u32);
      glyf.extend_from_slice(record);
      while glyf.len() % 4 != 0 {
        glyf.push(0);
      }
    }
    loca.push(glyf.len() as u32);
    (glyf, loca)
  }
}
