//! Runs against the compiled binary: flag surface, exit codes, summary
//! output and on-disk results.

mod common;

use common::{mapped_code_points, ttf_with_glyphs, write_file};
use std::fs;
use std::process::Command;
use tempfile::tempdir;

#[test]
fn help_lists_the_option_surface() {
  let output = Command::new(env!("CARGO_BIN_EXE_fontpurge"))
    .arg("--help")
    .output()
    .expect("run fontpurge --help");

  assert!(output.status.success());
  let help = String::from_utf8_lossy(&output.stdout);
  for flag in [
    "--output",
    "--config",
    "--to",
    "--cache-busting",
    "--follow-urls",
    "--ignore-font",
    "--preserve-font",
    "--purge-only-font",
    "--content-files",
    "--preserve-ascii",
  ] {
    assert!(help.contains(flag), "help should mention {flag}; got:\n{help}");
  }
}

#[test]
fn missing_stylesheet_fails_with_a_message() {
  let dir = tempdir().expect("tempdir");
  let output = Command::new(env!("CARGO_BIN_EXE_fontpurge"))
    .arg(dir.path().join("absent.css"))
    .output()
    .expect("run fontpurge");

  assert!(!output.status.success());
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(
    stderr.contains("fontpurge:"),
    "fatal errors go to stderr; got:\n{stderr}"
  );
}

#[test]
fn flags_drive_an_end_to_end_run() {
  let dir = tempdir().expect("tempdir");
  let root = dir.path();
  write_file(root, "sample.ttf", ttf_with_glyphs("Sample", &['a', 'b', 'c']));
  write_file(root, "content/index.txt", "ab");
  let css_path = write_file(
    root,
    "style.css",
    concat!(
      "@font-face {\n",
      "  font-family: Sample;\n",
      "  src: url(\"sample.ttf\") format(\"truetype\");\n",
      "}\n",
    ),
  );

  let output = Command::new(env!("CARGO_BIN_EXE_fontpurge"))
    .arg(&css_path)
    .args(["--cache-busting", "none"])
    .arg("--content-files")
    .arg(root.join("content/*.txt"))
    .output()
    .expect("run fontpurge");

  assert!(
    output.status.success(),
    "stderr:\n{}",
    String::from_utf8_lossy(&output.stderr)
  );
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(
    stdout.contains("2 required glyphs; 1 font-face rules: 1 processed, 0 preserved, 0 ignored"),
    "summary line missing; got:\n{stdout}"
  );
  assert_eq!(
    mapped_code_points(&root.join("fonts/sample.ttf")),
    ['a' as u32, 'b' as u32]
  );
  let css = fs::read_to_string(&css_path).expect("rewritten css");
  assert!(css.contains("url(\"fonts/sample.ttf\") format(\"truetype\")"));
}

#[test]
fn json_config_drives_the_run() {
  let dir = tempdir().expect("tempdir");
  let root = dir.path();
  write_file(root, "brand.ttf", ttf_with_glyphs("Brand", &['a', 'b']));
  let css_path = write_file(
    root,
    "style.css",
    concat!(
      "@font-face {\n",
      "  font-family: Brand;\n",
      "  src: url(\"brand.ttf\") format(\"truetype\");\n",
      "}\n",
      ".a { content: \"a\"; }\n",
    ),
  );
  let config_path = write_file(
    root,
    "purge.json",
    r#"{ "cache_busting": "none", "preserve_fonts": ["Brand"], "to": "assets" }"#,
  );

  let output = Command::new(env!("CARGO_BIN_EXE_fontpurge"))
    .arg(&css_path)
    .arg("--config")
    .arg(&config_path)
    .output()
    .expect("run fontpurge");

  assert!(
    output.status.success(),
    "stderr:\n{}",
    String::from_utf8_lossy(&output.stderr)
  );
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(
    stdout.contains("0 processed, 1 preserved, 0 ignored"),
    "preserve summary missing; got:\n{stdout}"
  );
  assert_eq!(
    mapped_code_points(&root.join("assets/brand.ttf")),
    ['a' as u32, 'b' as u32]
  );
  let css = fs::read_to_string(&css_path).expect("rewritten css");
  assert!(css.contains("url(\"assets/brand.ttf\")"));
}
