//! Stylesheet parsing and rewriting.
//!
//! The stylesheet is split into segments by walking the top-level token
//! stream: `@font-face` rules (anywhere, including inside conditional
//! at-rules) are parsed into editable declaration lists, and every other
//! byte of the input is carried through verbatim as a raw slice. Only the
//! font-face blocks themselves are re-emitted with normalized formatting;
//! untouched rules, comments and whitespace round-trip exactly.

use cssparser::{Parser, ParserInput, Token};

/// One `property: value` pair inside an `@font-face` block.
///
/// The value is the raw source text between the colon and the terminating
/// semicolon, trimmed. No component-level parsing happens here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
  pub property: String,
  pub value: String,
}

/// An editable `@font-face` rule.
#[derive(Debug, Clone)]
pub struct FontFaceRule {
  prelude: String,
  declarations: Vec<Declaration>,
}

impl FontFaceRule {
  /// The declared family name, with one leading and one trailing quote
  /// stripped independently. When the rule declares `font-family` more
  /// than once the last declaration wins.
  pub fn family(&self) -> Option<String> {
    let mut family = None;
    for decl in &self.declarations {
      if decl.property.eq_ignore_ascii_case("font-family") {
        let mut value = decl.value.as_str();
        if value.starts_with('"') || value.starts_with('\'') {
          value = &value[1..];
        }
        if value.ends_with('"') || value.ends_with('\'') {
          value = &value[..value.len() - 1];
        }
        family = Some(value.to_string());
      }
    }
    family
  }

  pub fn declarations(&self) -> &[Declaration] {
    &self.declarations
  }

  /// Remove every `src` declaration, returning their raw values in source
  /// order.
  pub fn take_src_values(&mut self) -> Vec<String> {
    let mut values = Vec::new();
    self.declarations.retain_mut(|decl| {
      if decl.property.eq_ignore_ascii_case("src") {
        values.push(std::mem::take(&mut decl.value));
        false
      } else {
        true
      }
    });
    values
  }

  /// Append a declaration at the end of the block.
  pub fn push_declaration(&mut self, property: &str, value: String) {
    self.declarations.push(Declaration {
      property: property.to_string(),
      value,
    });
  }

  fn write(&self, out: &mut String) {
    out.push_str(&self.prelude);
    out.push('{');
    for decl in &self.declarations {
      out.push_str("\n  ");
      out.push_str(&decl.property);
      out.push_str(": ");
      out.push_str(&decl.value);
      out.push(';');
    }
    out.push_str("\n}");
  }
}

#[derive(Debug, Clone)]
enum Segment {
  /// Verbatim source text: rules we do not touch, comments, whitespace.
  Raw(String),
  /// A conditional at-rule (`@media`, `@supports`, ...) with at least one
  /// font-face somewhere inside. The head is the raw prelude up to `{`.
  Block { head: String, inner: Vec<Segment> },
  FontFace(FontFaceRule),
}

/// A parsed stylesheet holding editable font-face rules.
#[derive(Debug, Clone)]
pub struct Stylesheet {
  segments: Vec<Segment>,
}

impl Stylesheet {
  /// Parse a stylesheet. Tokenization never fails; malformed input ends up
  /// in raw segments and round-trips unchanged.
  pub fn parse(css: &str) -> Stylesheet {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    let mut segments = Vec::new();
    parse_segments(&mut parser, &mut segments);
    Stylesheet { segments }
  }

  /// All font-face rules in document order, conditional groups included.
  pub fn font_faces_mut(&mut self) -> Vec<&mut FontFaceRule> {
    let mut out = Vec::new();
    collect_font_faces_mut(&mut self.segments, &mut out);
    out
  }

  pub fn font_face_count(&self) -> usize {
    fn count(segments: &[Segment]) -> usize {
      segments
        .iter()
        .map(|segment| match segment {
          Segment::FontFace(_) => 1,
          Segment::Block { inner, .. } => count(inner),
          Segment::Raw(_) => 0,
        })
        .sum()
    }
    count(&self.segments)
  }

  pub fn to_css(&self) -> String {
    let mut out = String::new();
    write_segments(&self.segments, &mut out);
    out
  }
}

fn write_segments(segments: &[Segment], out: &mut String) {
  for segment in segments {
    match segment {
      Segment::Raw(text) => out.push_str(text),
      Segment::Block { head, inner } => {
        out.push_str(head);
        out.push('{');
        write_segments(inner, out);
        out.push('}');
      }
      Segment::FontFace(rule) => rule.write(out),
    }
  }
}

fn collect_font_faces_mut<'a>(segments: &'a mut [Segment], out: &mut Vec<&'a mut FontFaceRule>) {
  for segment in segments {
    match segment {
      Segment::FontFace(rule) => out.push(rule),
      Segment::Block { inner, .. } => collect_font_faces_mut(inner, out),
      Segment::Raw(_) => {}
    }
  }
}

/// Walk one rule list, splitting out font-face rules and recursing into
/// at-rule blocks. Returns true when a font-face was found at this level or
/// below. Everything else stays inside contiguous raw runs; unparsed blocks
/// are skipped by the tokenizer and their text remains part of the run.
fn parse_segments<'i>(parser: &mut Parser<'i, '_>, out: &mut Vec<Segment>) -> bool {
  let mut found = false;
  let mut raw_start = parser.position();
  let mut rule_start = parser.position();
  let mut in_prelude = false;
  let mut is_at_rule = false;
  let mut is_font_face = false;

  loop {
    let before = parser.position();
    let token = match parser.next_including_whitespace_and_comments() {
      Ok(token) => token.clone(),
      Err(_) => break,
    };
    match token {
      Token::WhiteSpace(_) | Token::Comment(_) | Token::CDO | Token::CDC => {}
      Token::AtKeyword(ref name) => {
        if !in_prelude {
          in_prelude = true;
          is_at_rule = true;
          is_font_face = name.eq_ignore_ascii_case("font-face");
          rule_start = before;
        }
      }
      Token::Semicolon => {
        // statement at-rules such as @import end here
        in_prelude = false;
        is_at_rule = false;
        is_font_face = false;
      }
      Token::CurlyBracketBlock => {
        let head_end = before;
        if is_font_face {
          let raw = parser.slice(raw_start..rule_start);
          if !raw.is_empty() {
            out.push(Segment::Raw(raw.to_string()));
          }
          let declarations = parser
            .parse_nested_block(|nested| {
              Ok::<_, cssparser::ParseError<'i, ()>>(parse_declarations(nested))
            })
            .unwrap_or_default();
          out.push(Segment::FontFace(FontFaceRule {
            prelude: parser.slice(rule_start..head_end).to_string(),
            declarations,
          }));
          raw_start = parser.position();
          found = true;
        } else if is_at_rule {
          let mut inner = Vec::new();
          let nested_found = parser
            .parse_nested_block(|nested| {
              Ok::<_, cssparser::ParseError<'i, ()>>(parse_segments(nested, &mut inner))
            })
            .unwrap_or(false);
          if nested_found {
            let raw = parser.slice(raw_start..rule_start);
            if !raw.is_empty() {
              out.push(Segment::Raw(raw.to_string()));
            }
            out.push(Segment::Block {
              head: parser.slice(rule_start..head_end).to_string(),
              inner,
            });
            raw_start = parser.position();
            found = true;
          }
        }
        in_prelude = false;
        is_at_rule = false;
        is_font_face = false;
      }
      _ => {
        if !in_prelude {
          in_prelude = true;
          is_at_rule = false;
          is_font_face = false;
          rule_start = before;
        }
      }
    }
  }

  let tail = parser.slice_from(raw_start);
  if !tail.is_empty() {
    out.push(Segment::Raw(tail.to_string()));
  }
  found
}

/// Parse the body of an `@font-face` block into declarations, preserving
/// raw value text.
fn parse_declarations<'i>(parser: &mut Parser<'i, '_>) -> Vec<Declaration> {
  let mut declarations = Vec::new();
  loop {
    let token = match parser.next_including_whitespace_and_comments() {
      Ok(token) => token.clone(),
      Err(_) => break,
    };
    let name = match token {
      Token::Ident(ref name) => name.as_ref().to_string(),
      _ => continue,
    };
    // seek the colon; anything else means this was not a declaration
    let mut found_colon = false;
    loop {
      match parser.next_including_whitespace_and_comments() {
        Ok(&Token::Colon) => {
          found_colon = true;
          break;
        }
        Ok(&Token::WhiteSpace(_)) | Ok(&Token::Comment(_)) => {}
        Ok(_) | Err(_) => break,
      }
    }
    if !found_colon {
      continue;
    }
    let value_start = parser.position();
    let mut value_end = value_start;
    loop {
      let token = match parser.next_including_whitespace_and_comments() {
        Ok(token) => token.clone(),
        Err(_) => break,
      };
      match token {
        Token::Semicolon => break,
        Token::Function(_)
        | Token::ParenthesisBlock
        | Token::SquareBracketBlock
        | Token::CurlyBracketBlock => {
          drain_block(parser);
          value_end = parser.position();
        }
        _ => {
          value_end = parser.position();
        }
      }
    }
    let value = parser.slice(value_start..value_end).trim().to_string();
    declarations.push(Declaration {
      property: name,
      value,
    });
  }
  declarations
}

fn drain_block<'i>(parser: &mut Parser<'i, '_>) {
  let _ = parser.parse_nested_block(|nested| {
    while nested.next_including_whitespace_and_comments().is_ok() {}
    Ok::<_, cssparser::ParseError<'i, ()>>(())
  });
}

/// Collect the raw value of every `content` declaration in the stylesheet,
/// at any nesting depth.
pub fn collect_content_values(css: &str) -> Vec<String> {
  let mut input = ParserInput::new(css);
  let mut parser = Parser::new(&mut input);
  let mut values = Vec::new();
  collect_content_in(&mut parser, &mut values);
  values
}

fn collect_content_in<'i>(parser: &mut Parser<'i, '_>, out: &mut Vec<String>) {
  loop {
    let token = match parser.next_including_whitespace_and_comments() {
      Ok(token) => token.clone(),
      Err(_) => break,
    };
    match token {
      Token::Ident(ref name) if name.eq_ignore_ascii_case("content") => {
        // confirm this is a declaration by finding the colon
        let mut found_colon = false;
        loop {
          match parser.next_including_whitespace_and_comments() {
            Ok(&Token::Colon) => {
              found_colon = true;
              break;
            }
            Ok(&Token::WhiteSpace(_)) | Ok(&Token::Comment(_)) => {}
            Ok(&Token::CurlyBracketBlock) => {
              // `content` was a selector; scan the rule body instead
              let _ = parser.parse_nested_block(|nested| {
                collect_content_in(nested, out);
                Ok::<_, cssparser::ParseError<'i, ()>>(())
              });
              break;
            }
            Ok(_) | Err(_) => break,
          }
        }
        if !found_colon {
          continue;
        }
        let value_start = parser.position();
        let mut value_end = value_start;
        let mut selector_lookalike = false;
        loop {
          let token = match parser.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => break,
          };
          match token {
            Token::Semicolon => break,
            Token::CurlyBracketBlock => {
              // a block here means `content:hover`-style selector text,
              // not a declaration; recurse into the body and discard
              let _ = parser.parse_nested_block(|nested| {
                collect_content_in(nested, out);
                Ok::<_, cssparser::ParseError<'i, ()>>(())
              });
              selector_lookalike = true;
              break;
            }
            Token::Function(_) | Token::ParenthesisBlock | Token::SquareBracketBlock => {
              drain_block(parser);
              value_end = parser.position();
            }
            _ => {
              value_end = parser.position();
            }
          }
        }
        if !selector_lookalike {
          out.push(parser.slice(value_start..value_end).trim().to_string());
        }
      }
      Token::Function(_)
      | Token::ParenthesisBlock
      | Token::SquareBracketBlock
      | Token::CurlyBracketBlock => {
        let _ = parser.parse_nested_block(|nested| {
          collect_content_in(nested, out);
          Ok::<_, cssparser::ParseError<'i, ()>>(())
        });
      }
      _ => {}
    }
  }
}
