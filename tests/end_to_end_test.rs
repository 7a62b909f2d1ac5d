use beamer_slides::html::{latex_source_to_html, HtmlOptions};
use beamer_slides::lint::{lint_source, LintSummary};
use beamer_slides::render::{self, CompileConfig, PageRange, PreviewConfig};
use beamer_slides::{markdown_to_latex, DocumentOptions};
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn run_command(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_beamer-slides"))
        .args(args)
        .output()
        .expect("Failed to execute command")
}

fn count_files_with_pattern(dir: &Path, pattern: &str) -> usize {
    let glob_pattern = format!("{}/{}", dir.to_string_lossy(), pattern);
    glob::glob(&glob_pattern)
        .expect("Failed to read glob pattern")
        .filter_map(Result::ok)
        .count()
}

const PRESENTATION: &str = r#"---
title: "Beamer Slides Presentation"
author: Test Author
theme: Berlin
colorTheme: whale
aspectRatio: "16:9"
---

## Introduction

* Bullet point 1
* Bullet point 2 with **bold**
* Bullet point 3 with `inline_code`

Notes: welcome everyone

---

## Code Example

```rust
fn main() {
    println!("Hello, world!");
}
```

## Tables

| Column 1 | Column 2 | Column 3 |
|----------|----------|----------|
| Cell 1   | Cell 2   | Cell 3   |
| 50%      | $10      | a_b      |

## Mixed Content

### Subheading

1. Numbered item 1
2. Numbered item 2

> A quote with *emphasis*

## Pipeline

```mermaid
flowchart LR
  write[Write] --> lint[Lint]
  lint --> build[Build]
```
"#;

#[test]
fn test_markdown_to_html_pipeline() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .is_test(true)
        .try_init();

    let latex = markdown_to_latex(PRESENTATION, &DocumentOptions::default());
    assert!(latex.contains("\\usetheme{Berlin}"));
    assert!(latex.contains("\\usecolortheme{whale}"));
    assert!(latex.contains("\\documentclass[aspectratio=169]{beamer}"));
    assert!(latex.contains("50\\% & \\$10 & a\\_b"));

    let issues = lint_source(&latex);
    assert_eq!(LintSummary::from_issues(&issues), LintSummary::default());

    let html = latex_source_to_html(&latex, &HtmlOptions::default());
    assert!(html.contains("<h1>Beamer Slides Presentation</h1>"));
    assert!(html.contains("<p class=\"author\">Test Author</p>"));
    assert_eq!(html.matches("<section class=\"slide\">").count(), 5);
    assert!(html.contains("<strong>bold</strong>"));
    assert!(html.contains("<code>inline_code</code>"));
    assert!(html.contains("<pre><code class=\"language-text\">") || html.contains("<pre><code>"));
    assert!(html.contains("<td>50%</td><td>$10</td><td>a_b</td>"));
    assert!(html.contains("<blockquote>"));
    assert!(html.contains("[Diagram: see the compiled PDF]"));
    assert!(html.contains("<aside class=\"notes\">welcome everyone</aside>"));
}

#[test]
fn test_convert_lint_html_commands() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let base_dir = temp_dir.path();

    let markdown_path = base_dir.join("talk.md");
    let tex_path = base_dir.join("talk.tex");
    let html_path = base_dir.join("talk.html");
    fs::write(&markdown_path, PRESENTATION).expect("Failed to write markdown file");

    let output = run_command(&["convert", markdown_path.to_str().unwrap()]);
    assert!(
        output.status.success(),
        "convert failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(tex_path.exists());

    let output = run_command(&["lint", tex_path.to_str().unwrap()]);
    assert!(
        output.status.success(),
        "lint failed: {}",
        String::from_utf8_lossy(&output.stdout)
    );

    let output = run_command(&[
        "html",
        tex_path.to_str().unwrap(),
        "-o",
        html_path.to_str().unwrap(),
        "--mode",
        "link",
        "--js",
        "nav.js",
    ]);
    assert!(
        output.status.success(),
        "html failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let html = fs::read_to_string(&html_path).expect("Failed to read HTML file");
    assert!(html.contains("<script src=\"nav.js\"></script>"));
    assert!(html.contains("<h2>Tables</h2>"));
}

#[test]
#[ignore] // Ignore by default as it requires a TeX distribution
fn test_build_command() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let markdown_path = temp_dir.path().join("talk.md");
    fs::write(&markdown_path, PRESENTATION).expect("Failed to write markdown file");

    let output = run_command(&["build", markdown_path.to_str().unwrap()]);
    assert!(
        output.status.success(),
        "build failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(temp_dir.path().join("talk.pdf").exists());
}

#[test]
#[ignore] // Ignore by default as it requires a TeX distribution and pdftoppm
fn test_compile_and_preview() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let tex_path = temp_dir.path().join("talk.tex");
    fs::write(
        &tex_path,
        markdown_to_latex(PRESENTATION, &DocumentOptions::default()),
    )
    .expect("Failed to write LaTeX file");

    let pdf_path = render::compile_document(&tex_path, &CompileConfig::default())
        .expect("Failed to compile document");
    assert!(pdf_path.exists());

    let preview_dir = temp_dir.path().join("preview");
    let config = PreviewConfig {
        output_dir: preview_dir.clone(),
        pages: PageRange {
            first: 1,
            last: Some(2),
        },
        width: 320,
        ..PreviewConfig::default()
    };
    let images = render::render_pages(&pdf_path, &config).expect("Failed to render pages");

    assert_eq!(images.len(), 2);
    assert_eq!(count_files_with_pattern(&preview_dir, "page*.png"), 2);
    assert!(render::first_page_image(&preview_dir, "page").is_some());
}

#[test]
fn test_missing_engine_is_reported() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let tex_path = temp_dir.path().join("talk.tex");
    fs::write(&tex_path, "\\documentclass{beamer}").expect("Failed to write LaTeX file");

    let config = CompileConfig {
        engine: "definitely-not-a-tex-engine".to_string(),
        passes: 1,
    };
    let result = render::compile_document(&tex_path, &config);
    assert!(matches!(
        result,
        Err(beamer_slides::SlidesError::EngineNotFound(_))
    ));
}
