//! Content hashing for cache-busted filenames and URLs.

use crate::error::Result;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Number of trailing hex characters kept from the digest.
pub const HASH_SUFFIX_LEN: usize = 8;

fn hex_digest(bytes: &[u8]) -> String {
  let mut hasher = Sha256::new();
  hasher.update(bytes);
  let digest = hasher.finalize();
  let mut out = String::with_capacity(digest.len() * 2);
  for byte in digest {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    out.push(HEX[(byte >> 4) as usize] as char);
    out.push(HEX[(byte & 0x0f) as usize] as char);
  }
  out
}

/// SHA-256 of `bytes`, truncated to the trailing [`HASH_SUFFIX_LEN`] hex
/// characters.
pub fn content_hash8(bytes: &[u8]) -> String {
  let full = hex_digest(bytes);
  full[full.len() - HASH_SUFFIX_LEN..].to_string()
}

/// SHA-256 of a file's bytes, truncated to the trailing hex characters used
/// in cache-busted names.
pub fn file_hash8(path: &Path) -> Result<String> {
  let bytes = std::fs::read(path)?;
  Ok(content_hash8(&bytes))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hash_is_trailing_8_hex_chars() {
    // sha256("hello world") = b94d...f7ace2efcde9
    let h = content_hash8(b"hello world");
    assert_eq!(h, "e2efcde9");
    let full = hex_digest(b"hello world");
    assert_eq!(h, full[full.len() - 8..]);
  }

  #[test]
  fn identical_content_hashes_identically() {
    assert_eq!(content_hash8(b"abc"), content_hash8(b"abc"));
    assert_ne!(content_hash8(b"abc"), content_hash8(b"abd"));
  }
}
