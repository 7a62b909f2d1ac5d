use super::*;
use crate::diagram::{mermaid_to_tikz, parse_diagram, render_tikz, Direction};
use crate::document::normalize_aspect_ratio;
use crate::html::{latex_source_to_html_with, latex_to_html, render_html, Deck, HtmlSlide, MarkupReader, RegexMarkupReader};
use crate::inline::sanitize_emoji;
use crate::markdown::slide_body_to_latex;
use crate::render::{find_page_images, first_page_image};
use crate::resources::ResourceKind;
use crate::table::{is_separator_row, parse_table_row, render_table};
use std::fs;
use std::io::Write;
use std::str::FromStr;
use tempfile::{NamedTempFile, TempDir};

fn create_temp_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes()).expect("Failed to write to temp file");
    file
}

fn lines(source: &str) -> Vec<String> {
    source.lines().map(str::to_string).collect()
}

fn rules(issues: &[LintIssue]) -> Vec<&'static str> {
    issues.iter().map(|issue| issue.rule).collect()
}

const SAMPLE_DECK: &str = "---
title: \"Quarterly Review\"
author: Ann Example
---

## Overview

Revenue is **up** and costs are *down*.

- First point
- Second point with `snake_case`

## Numbers

| Region | Sales |
|--------|-------|
| North | 10 |
| South | 20 |

Notes: mention the south

## Code

```python
def total(values):
    return sum(values)
```

## Flow

```mermaid
graph LR
  A[Plan] --> B[Build]
  B --> C[Ship]
```
";

#[test]
fn test_escape_latex_all_specials() {
    assert_eq!(
        escape_latex(r"a_b & 50% $5 #1 {x} ~ ^ \"),
        r"a\_b \& 50\% \$5 \#1 \{x\} \textasciitilde{} \textasciicircum{} \textbackslash{}"
    );
}

#[test]
fn test_escape_latex_does_not_double_escape() {
    // The braces of \textbackslash{} must survive untouched
    assert_eq!(escape_latex(r"\{"), r"\textbackslash{}\{");
}

#[test]
fn test_escape_latex_stable_on_plain_text() {
    for text in ["plain words", "Numbers 1, 2 and 3!", "quotes \"here\" (and there)"] {
        assert_eq!(escape_latex(&escape_latex(text)), escape_latex(text));
        assert_eq!(format_inline(text), text);
    }
}

#[test]
fn test_format_inline_spans() {
    assert_eq!(
        format_inline("**bold** and *it* with `a_b`"),
        r"\textbf{bold} and \textit{it} with \texttt{a\_b}"
    );
}

#[test]
fn test_format_inline_escapes_inside_bold() {
    assert_eq!(format_inline("x_y **a_b**"), r"x\_y \textbf{a\_b}");
}

#[test]
fn test_sanitize_emoji() {
    assert_eq!(sanitize_emoji("\u{2705} done \u{1F680}"), "[OK] done ");
    assert_eq!(format_inline("\u{26A0} careful"), "[!] careful");
}

#[test]
fn test_parse_markdown_frontmatter() {
    let parsed = parse_markdown(
        "---\ntitle: \"My Talk\"\nauthor: Ann\ntheme: Berlin\n---\n\n## First\n\nHello\n",
    );

    assert_eq!(parsed.metadata.get("title").map(String::as_str), Some("My Talk"));
    assert_eq!(parsed.metadata.get("author").map(String::as_str), Some("Ann"));
    assert_eq!(parsed.slides.len(), 1);
    assert_eq!(parsed.slides[0].title, "First");

    let latex = generate_latex(&parsed, &DocumentOptions::default());
    assert!(latex.contains(r"\usetheme{Berlin}"));
    assert!(latex.contains(r"\usecolortheme{default}"));
    assert!(latex.contains(r"\documentclass[aspectratio=169]{beamer}"));
    assert!(latex.contains(r"\title{My Talk}"));
    assert!(latex.contains(r"\author{Ann}"));
    assert!(latex.contains(r"\date{\today}"));
    assert!(latex.contains("\\begin{frame}{First}\nHello\n\\end{frame}"));
}

#[test]
fn test_heading_sets_title_without_frontmatter() {
    let parsed = parse_markdown("# Big Title\n\n## Slide\ntext");
    assert_eq!(parsed.metadata.get("title").map(String::as_str), Some("Big Title"));
    assert_eq!(parsed.slides.len(), 1);
}

#[test]
fn test_frontmatter_wins_over_options() {
    let options = DocumentOptions {
        theme: "Warsaw".to_string(),
        color_theme: "beaver".to_string(),
        ..DocumentOptions::default()
    };

    let latex = markdown_to_latex("---\ntheme: Berlin\n---\n## A\nx", &options);
    assert!(latex.contains(r"\usetheme{Berlin}"));
    assert!(latex.contains(r"\usecolortheme{beaver}"));
}

#[test]
fn test_speaker_notes() {
    let parsed = parse_markdown("## A\nText\nNotes: remember this\nmore notes\n## B\nBody");

    assert_eq!(parsed.slides.len(), 2);
    assert_eq!(parsed.slides[0].content, vec!["Text".to_string()]);
    assert_eq!(
        parsed.slides[0].notes,
        vec!["remember this".to_string(), "more notes".to_string()]
    );
    assert!(parsed.slides[1].notes.is_empty());

    let latex = generate_latex(&parsed, &DocumentOptions::default());
    assert_eq!(latex.matches(r"\setbeameroption{show notes}").count(), 1);
    assert!(latex.contains("\\end{frame}\n\\note{\nremember this \\\\\nmore notes\n}"));
}

#[test]
fn test_no_notes_option_without_notes() {
    let latex = markdown_to_latex("## A\nText", &DocumentOptions::default());
    assert!(!latex.contains(r"\setbeameroption"));
    assert!(!latex.contains(r"\note{"));
}

#[test]
fn test_blank_notes_do_not_enable_notes_option() {
    let parsed = parse_markdown("## A\nText\nNotes:\n\n## B\nBody");
    assert!(!parsed.has_notes());

    let latex = generate_latex(&parsed, &DocumentOptions::default());
    assert!(!latex.contains(r"\setbeameroption"));
    assert!(!latex.contains(r"\note{"));
}

#[test]
fn test_empty_frontmatter_value_is_unset() {
    let parsed = parse_markdown("---\ntitle:\nauthor: \"\"\n---\n# Real Title\n## A\nx");
    assert_eq!(parsed.metadata.get("title").map(String::as_str), Some("Real Title"));
    assert!(!parsed.metadata.contains_key("author"));

    let latex = generate_latex(&parsed, &DocumentOptions::default());
    assert!(latex.contains("\\title{Real Title}"));
}

#[test]
fn test_slide_count_matches_headings() {
    let parsed = parse_markdown("## One\na\n## Two\nb\n---\n## Three\nc");
    let titles: Vec<&str> = parsed.slides.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, vec!["One", "Two", "Three"]);
}

#[test]
fn test_break_starts_untitled_slide() {
    let parsed = parse_markdown("## One\na\n---\nplain text");
    assert_eq!(parsed.slides.len(), 2);
    assert_eq!(parsed.slides[1].title, "");

    let latex = generate_latex(&parsed, &DocumentOptions::default());
    assert!(latex.contains("\\begin{frame}{}\nplain text\n\\end{frame}"));
}

#[test]
fn test_code_fence_hides_breaks_and_headings() {
    let parsed = parse_markdown("## One\n```\n---\n## not a slide\n```\n");
    assert_eq!(parsed.slides.len(), 1);
    assert_eq!(parsed.slides[0].content.len(), 4);
}

#[test]
fn test_title_is_escaped() {
    let latex = markdown_to_latex("## Costs & Benefits\nx", &DocumentOptions::default());
    assert!(latex.contains(r"\begin{frame}{Costs \& Benefits}"));
}

#[test]
fn test_lists() {
    let body = slide_body_to_latex(&lines("- one\n- two\n\n1. first"));
    assert_eq!(
        body,
        "\\begin{itemize}\n\\item one\n\\item two\n\\end{itemize}\n\\begin{enumerate}\n\\item first\n\\end{enumerate}"
    );
}

#[test]
fn test_code_block_language() {
    let body = slide_body_to_latex(&lines("```python\nprint('x_y')\n```"));
    assert_eq!(
        body,
        "\\begin{lstlisting}[language=Python]\nprint('x_y')\n\\end{lstlisting}"
    );

    let latex = markdown_to_latex("## Code\n```rust\nfn main() {}\n```", &DocumentOptions::default());
    assert!(latex.contains("\\begin{frame}[fragile]{Code}\n\\begin{lstlisting}\nfn main() {}"));
}

#[test]
fn test_headings_and_quotes_in_body() {
    let body = slide_body_to_latex(&lines("### Sub\n#### Minor\n> quoted"));
    assert!(body.contains(r"{\large\textbf{Sub}}"));
    assert!(body.contains(r"\textbf{Minor}"));
    assert!(body.contains("\\begin{quote}\nquoted\n\\end{quote}"));
}

#[test]
fn test_table_rendering() {
    assert!(is_separator_row("|---|:---:|"));
    assert!(!is_separator_row("| a | b |"));
    assert_eq!(parse_table_row("| a |  | c |"), vec!["a", "", "c"]);

    let body = slide_body_to_latex(&lines("| A | B |\n|---|---|\n| 1 | 2 |\n| 3 |"));
    assert!(body.contains("\\begin{tabular}{ll}"));
    assert!(body.contains("\\textbf{A} & \\textbf{B} \\\\\n\\midrule"));
    assert!(body.contains("1 & 2 \\\\"));
    assert!(body.contains("3 &  \\\\"));
    assert!(body.ends_with("\\bottomrule\n\\end{tabular}\n\\end{center}"));
}

#[test]
fn test_table_drops_wide_rows() {
    let rows = vec![
        vec!["A".to_string(), "B".to_string()],
        vec!["1".to_string(), "2".to_string(), "3".to_string()],
        vec!["4".to_string(), "5".to_string()],
    ];
    let table = render_table(&rows);
    assert!(!table.contains("1 & 2 & 3"));
    assert!(table.contains("4 & 5 \\\\"));
    assert_eq!(render_table(&[]), "");
}

#[test]
fn test_diagram_chain() {
    let graph = parse_diagram("graph LR\n  A[Start] --> B[Middle]\n  B --> C[End]");
    assert_eq!(graph.direction, Direction::Right);
    let ids: Vec<&str> = graph.nodes.keys().map(String::as_str).collect();
    assert_eq!(ids, vec!["A", "B", "C"]);
    assert_eq!(graph.nodes["B"], "Middle");
    assert_eq!(
        graph.edges,
        vec![
            ("A".to_string(), "B".to_string()),
            ("B".to_string(), "C".to_string())
        ]
    );

    let tikz = mermaid_to_tikz("graph LR\n  A[Start] --> B[Middle]\n  B --> C[End]");
    assert!(tikz.contains(r"\node (A) {Start};"));
    assert!(tikz.contains(r"\node (B) [right of=A] {Middle};"));
    assert!(tikz.contains(r"\node (C) [right of=B] {End};"));
    assert!(tikz.contains(r"\draw[->, thick] (B) -- (C);"));
}

#[test]
fn test_diagram_defaults_and_placeholder() {
    let graph = parse_diagram("flowchart TD\nstep_one --> step_two\nX[Lonely]");
    assert_eq!(graph.direction, Direction::Below);
    assert_eq!(graph.nodes.len(), 3);
    assert!(mermaid_to_tikz("graph TD\nstep_one --> step_two").contains(r"[below of=step-one]"));

    assert_eq!(mermaid_to_tikz("graph TD\n%% nothing"), "% diagram: no nodes could be parsed");
}

#[test]
fn test_diagram_branching_keeps_every_edge() {
    let source = "graph LR\n  A --> B\n  A --> C\n  B --> C";
    let graph = parse_diagram(source);
    assert_eq!(graph.edges.len(), 3);

    let tikz = mermaid_to_tikz(source);
    assert!(tikz.contains(r"\node (C) [right of=B] {C};"));
    assert!(tikz.contains(r"\draw[->, thick] (A) -- (C);"));
    assert!(tikz.contains(r"\draw[->, thick] (B) -- (C);"));
}

#[test]
fn test_diagram_edge_keeps_earlier_label() {
    let graph = parse_diagram("graph TD\n  A[Start] --> B\n  B --> A[Other]");
    assert_eq!(graph.nodes["A"], "Start");
    assert_eq!(graph.nodes["B"], "B");
}

#[test]
fn test_diagram_declaration_overwrites_label() {
    let graph = parse_diagram("graph TD\n  A --> B\n  A[Renamed]");
    let ids: Vec<&str> = graph.nodes.keys().map(String::as_str).collect();
    assert_eq!(ids, vec!["A", "B"]);
    assert_eq!(graph.nodes["A"], "Renamed");
    assert!(render_tikz(&graph).contains(r"\node (A) {Renamed};"));
}

#[test]
fn test_aspect_ratio_normalisation() {
    assert_eq!(normalize_aspect_ratio("16:9"), "169");
    assert_eq!(normalize_aspect_ratio("4:3"), "43");
    assert_eq!(normalize_aspect_ratio("7:5"), "169");
}

#[test]
fn test_lint_unmatched_brace_scenario() {
    let source = "\\documentclass{beamer}\n\\begin{document}\n\\begin{frame}{Test\n\\end{document}\n";
    let issues = lint_source(source);
    let brace_errors: Vec<&LintIssue> = issues
        .iter()
        .filter(|issue| issue.rule == "brace-balance")
        .collect();
    assert_eq!(brace_errors.len(), 1);
    assert_eq!(brace_errors[0].severity, Severity::Error);
}

#[test]
fn test_lint_brace_counts() {
    for open in 0..5 {
        for close in 0..5 {
            let source = format!("{}{}", "{".repeat(open), "}".repeat(close));
            let count = lint_source(&source)
                .iter()
                .filter(|issue| issue.rule == "brace-balance")
                .count();
            let expected = if close > open {
                close - open
            } else if open > close {
                1
            } else {
                0
            };
            assert_eq!(count, expected, "open={} close={}", open, close);
        }
    }
}

#[test]
fn test_lint_escaped_braces_and_comments() {
    let source = "\\documentclass{beamer}\n\\begin{document}\n\\{ literal % stray {\n\\end{document}";
    assert!(lint_source(source).is_empty());
}

#[test]
fn test_lint_missing_markers() {
    let issues = lint_source("hello");
    assert_eq!(rules(&issues), vec!["document-class", "begin-document", "end-document"]);
    assert!(issues.iter().all(|issue| issue.line == 1));
}

#[test]
fn test_lint_environment_mismatch() {
    let issues = lint_source("\\begin{itemize}\n\\end{enumerate}");
    let env: Vec<&LintIssue> = issues
        .iter()
        .filter(|issue| issue.rule == "environment-balance")
        .collect();
    assert_eq!(env.len(), 1);
    assert_eq!(env[0].line, 2);
    assert!(env[0].message.contains("closed by"));

    let issues = lint_source("\\end{center}\n\\begin{center}");
    let messages: Vec<&str> = issues
        .iter()
        .filter(|issue| issue.rule == "environment-balance")
        .map(|issue| issue.message.as_str())
        .collect();
    assert_eq!(
        messages,
        vec![
            "\\end{center} without matching \\begin{center}",
            "\\begin{center} is never closed"
        ]
    );
}

#[test]
fn test_lint_skips_verbatim_content() {
    let source = "\\documentclass{beamer}
\\begin{document}
\\begin{frame}[fragile]{Code}
\\begin{lstlisting}
\\begin{itemize} my_var
\\end{lstlisting}
\\end{frame}
\\end{document}";
    assert!(lint_source(source).is_empty());
}

const CODE_FENCE_DECK: &str = "## Tail\n```js\n  return x;\n}\n```\n## Fmt\n```python\nprint(\"{:.0%}\".format(r))\n```";

#[test]
fn test_build_gate_ignores_braces_in_listings() {
    let latex = markdown_to_latex(CODE_FENCE_DECK, &DocumentOptions::default());

    let summary = LintSummary::from_issues(&lint_source(&latex));
    assert_eq!(summary.errors, 2);
    assert!(build_blockers(&latex).is_empty());
}

#[test]
fn test_build_gate_keeps_real_errors() {
    let source = "\\documentclass{beamer}\n\\begin{document}\n\\begin{frame}{Test\n\\end{document}\n";
    let blockers = build_blockers(source);
    assert_eq!(
        blockers
            .iter()
            .filter(|issue| issue.rule == "brace-balance")
            .count(),
        1
    );

    let missing = build_blockers("\\begin{frame}{A}\nx\n\\end{frame}");
    assert!(missing.iter().any(|issue| issue.rule == "document-class"));
    assert!(missing.iter().all(|issue| issue.severity == Severity::Error));
}

#[test]
fn test_lint_frame_titles() {
    let warned = lint_source("\\begin{frame}\nText\n\\end{frame}");
    assert!(warned
        .iter()
        .any(|issue| issue.rule == "frame-title" && issue.line == 1 && issue.severity == Severity::Warning));

    for source in [
        "\\begin{frame}\n\\frametitle{X}\n\\end{frame}",
        "\\begin{frame}[plain]\nx\n\\end{frame}",
        "\\begin{frame}\n\\titlepage\n\\end{frame}",
        "\\begin{frame}[fragile]{Titled}\nx\n\\end{frame}",
    ] {
        assert!(
            !rules(&lint_source(source)).contains(&"frame-title"),
            "unexpected frame-title warning for {:?}",
            source
        );
    }
}

#[test]
fn test_lint_underscores() {
    let issues = lint_source("Some my_var here");
    assert!(issues
        .iter()
        .any(|issue| issue.rule == "unescaped-underscore" && issue.line == 1));

    let clean = lint_source("$x_1$ and \\_ and \\label{sec_a} and \\texttt{a_b}");
    assert!(!rules(&clean).contains(&"unescaped-underscore"));
}

#[test]
fn test_lint_issues_sorted_by_line() {
    let issues = lint_source("x_y\n\\begin{frame}\nbody");
    assert_eq!(
        rules(&issues),
        vec![
            "document-class",
            "begin-document",
            "end-document",
            "unescaped-underscore",
            "environment-balance",
            "frame-title"
        ]
    );
    let line_numbers: Vec<usize> = issues.iter().map(|issue| issue.line).collect();
    assert_eq!(line_numbers, vec![1, 1, 1, 1, 2, 2]);
}

#[test]
fn test_lint_report_format() {
    let issues = vec![
        LintIssue {
            line: 3,
            severity: Severity::Error,
            message: "Unmatched closing brace".to_string(),
            rule: "brace-balance",
        },
        LintIssue {
            line: 5,
            severity: Severity::Warning,
            message: "Frame has no title".to_string(),
            rule: "frame-title",
        },
    ];

    assert_eq!(
        format_report("deck.tex", &issues),
        "\u{2717} deck.tex:3 Unmatched closing brace (brace-balance)\n\u{26A0} deck.tex:5 Frame has no title (frame-title)\n1 error(s), 1 warning(s)\n"
    );
    assert_eq!(format_report("deck.tex", &[]), "0 error(s), 0 warning(s)\n");

    let summary = LintSummary::from_issues(&issues);
    assert!(summary.has_errors());
    assert_eq!(summary.warnings, 1);
}

#[test]
fn test_generated_document_lints_clean() {
    let latex = markdown_to_latex(SAMPLE_DECK, &DocumentOptions::default());
    let issues = lint_source(&latex);
    assert!(issues.is_empty(), "{}", format_report("generated.tex", &issues));

    assert!(latex.contains("\\begin{frame}[fragile]{Code}"));
    assert!(latex.contains("\\begin{tikzpicture}"));
    assert!(latex.contains("\\texttt{snake\\_case}"));
    assert!(latex.contains("\\begin{frame}[plain]\n\\centering\n{\\Huge Questions?}\n\\end{frame}"));
}

#[test]
fn test_latex_to_html_lists_and_bold() {
    let html = latex_to_html("\\begin{itemize}\n\\item One\n\\item \\textbf{Two}\n\\end{itemize}");
    assert_eq!(html, "<ul>\n<li>One\n</li>\n<li><strong>Two</strong>\n</li>\n</ul>");
}

#[test]
fn test_latex_to_html_specials() {
    assert_eq!(
        latex_to_html(r"Price \$5 \& 10\% a\_b"),
        "Price $5 &amp; 10% a_b"
    );
    assert_eq!(latex_to_html("a < b"), "a &lt; b");
    assert_eq!(latex_to_html("\\textit{x} and \\texttt{y}"), "<em>x</em> and <code>y</code>");
}

#[test]
fn test_latex_to_html_code_and_tables() {
    let html = latex_to_html(
        "\\begin{lstlisting}[language=Python]\nx = 1 % not a comment\n\\end{lstlisting}",
    );
    assert_eq!(
        html,
        "<pre><code class=\"language-python\">x = 1 % not a comment</code></pre>"
    );

    assert_eq!(
        latex_to_html("\\begin{lstlisting}\nif (a < b && c) {}\n\\end{lstlisting}"),
        "<pre><code>if (a &lt; b &amp;&amp; c) {}</code></pre>"
    );

    let table = latex_to_html(
        "\\begin{tabular}{ll}\n\\toprule\n\\textbf{A} & \\textbf{B} \\\\\n\\midrule\n1 & 2 \\\\\n\\bottomrule\n\\end{tabular}",
    );
    assert!(table.contains("<tr><th><strong>A</strong></th><th><strong>B</strong></th></tr>"));
    assert!(table.contains("<tr><td>1</td><td>2</td></tr>"));
}

#[test]
fn test_regex_reader_extracts_frames_and_notes() {
    let latex = markdown_to_latex(
        "---\ntitle: Deck\nauthor: Me\n---\n## One\nHello **world**\nNotes: say hi\n## Two\n- a\n- b",
        &DocumentOptions::default(),
    );
    let deck = RegexMarkupReader.read(&latex);

    assert_eq!(deck.title, "Deck");
    assert_eq!(deck.author, "Me");
    assert_eq!(deck.date, None);
    assert_eq!(deck.slides.len(), 2);
    assert_eq!(deck.slides[0].title, "One");
    assert_eq!(deck.slides[0].content, "Hello <strong>world</strong>");
    assert_eq!(deck.slides[0].notes.as_deref(), Some("say hi"));
    assert_eq!(deck.slides[1].title, "Two");
    assert!(deck.slides[1].content.contains("<li>a"));
    assert_eq!(deck.slides[1].notes, None);
}

#[test]
fn test_render_html_page() {
    let deck = Deck {
        title: "<em>Deck</em>".to_string(),
        author: "Me".to_string(),
        date: Some("May 1, 2024".to_string()),
        slides: vec![HtmlSlide {
            title: "One".to_string(),
            content: "<p>Body</p>".to_string(),
            notes: Some("say hi".to_string()),
        }],
    };
    let page = render_html(&deck, &HtmlOptions::default());

    assert!(page.starts_with("<!DOCTYPE html>"));
    assert!(page.contains("<title>Deck</title>"));
    assert!(page.contains("<link rel=\"stylesheet\" href=\"themes/default.css\">"));
    assert!(page.contains("<script src=\"themes/default.js\"></script>"));
    assert!(page.contains("<p class=\"date\">May 1, 2024</p>"));
    assert!(page.contains("<h2>One</h2>\n<p>Body</p>"));
    assert!(page.contains("<aside class=\"notes\">say hi</aside>"));
    assert!(page.contains("<h2>Questions?</h2>"));
}

struct FixedReader;

impl MarkupReader for FixedReader {
    fn read(&self, _source: &str) -> Deck {
        Deck {
            title: "Fixed".to_string(),
            ..Deck::default()
        }
    }
}

#[test]
fn test_custom_markup_reader() {
    let page = latex_source_to_html_with(&FixedReader, "ignored", &HtmlOptions::default());
    assert!(page.contains("<h1>Fixed</h1>"));
}

#[test]
fn test_generate_html_from_file() {
    let latex = markdown_to_latex("## One\nHello", &DocumentOptions::default());
    let file = create_temp_file(&latex);

    let page = generate_html(file.path(), &HtmlOptions::default()).expect("HTML generation failed");
    assert!(page.contains("<h2>One</h2>"));
    assert!(page.contains("Hello"));

    assert!(generate_html(std::path::Path::new("/nonexistent/deck.tex"), &HtmlOptions::default()).is_err());
}

#[test]
fn test_resource_tags() {
    let css = create_temp_file("body { color: red; }");
    let resource = ResourceFile::new(css.path().to_str().expect("Invalid temp path"));

    let embedded = resource
        .tag(ResourceKind::Stylesheet, true)
        .expect("Failed to embed resource");
    assert_eq!(embedded, "<style>body { color: red; }</style>");

    let linked = ResourceFile::new("https://example.com/app.js")
        .tag(ResourceKind::Script, false)
        .expect("Failed to link resource");
    assert_eq!(linked, "<script src=\"https://example.com/app.js\"></script>");

    assert!(ResourceFile::new("/nonexistent/style.css").content().is_err());
}

#[test]
fn test_page_range_parsing() {
    assert_eq!(
        PageRange::from_str("3").ok(),
        Some(PageRange { first: 3, last: Some(3) })
    );
    assert_eq!(
        PageRange::from_str("2-5").ok(),
        Some(PageRange { first: 2, last: Some(5) })
    );
    assert_eq!(
        PageRange::from_str("4-").ok(),
        Some(PageRange { first: 4, last: None })
    );
    assert!(PageRange::from_str("5-2").is_err());
    assert!(PageRange::from_str("0").is_err());
    assert!(PageRange::from_str("abc").is_err());
}

#[test]
fn test_first_page_image_variants() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    assert_eq!(first_page_image(dir.path(), "page"), None);

    fs::write(dir.path().join("page-01.png"), b"").expect("Failed to write image");
    assert_eq!(
        first_page_image(dir.path(), "page"),
        Some(dir.path().join("page-01.png"))
    );

    let single = TempDir::new().expect("Failed to create temp dir");
    fs::write(single.path().join("page.png"), b"").expect("Failed to write image");
    assert_eq!(
        first_page_image(single.path(), "page"),
        Some(single.path().join("page.png"))
    );
}

#[test]
fn test_find_page_images_ordered_by_page() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    for name in ["page-10.png", "page-2.png", "page-1.png", "other-3.png"] {
        fs::write(dir.path().join(name), b"").expect("Failed to write image");
    }

    let images = find_page_images(dir.path(), "page").expect("Failed to list images");
    let names: Vec<String> = images
        .iter()
        .filter_map(|path| path.file_name())
        .map(|name| name.to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["page-1.png", "page-2.png", "page-10.png"]);
}

#[test]
fn test_theme_store_round_trip() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let store = ThemeStore::new(dir.path().join("themes"));
    assert!(store.load_all().expect("Failed to load themes").is_empty());

    let theme = CustomTheme {
        name: "corporate".to_string(),
        base_theme: "Berlin".to_string(),
        color_theme: "whale".to_string(),
        aspect_ratio: "43".to_string(),
    };
    store.save(&theme).expect("Failed to save theme");
    fs::write(store.dir().join("broken.toml"), "not = [valid").expect("Failed to write file");
    fs::write(
        store.dir().join("empty.toml"),
        "name = \"empty\"\nbase_theme = \"\"\ncolor_theme = \"x\"\naspect_ratio = \"169\"\n",
    )
    .expect("Failed to write file");

    assert_eq!(store.load_all().expect("Failed to load themes"), vec![theme.clone()]);
    assert_eq!(store.get("corporate").expect("Lookup failed"), Some(theme));
    assert_eq!(store.get("missing").expect("Lookup failed"), None);

    assert!(store.remove("corporate").expect("Remove failed"));
    assert!(!store.remove("corporate").expect("Remove failed"));
}

#[test]
fn test_theme_store_rejects_bad_names() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let store = ThemeStore::new(dir.path());
    let theme = CustomTheme {
        name: "../escape".to_string(),
        base_theme: "Berlin".to_string(),
        color_theme: "default".to_string(),
        aspect_ratio: "169".to_string(),
    };
    assert!(store.save(&theme).is_err());
}

#[test]
fn test_config_document_options_precedence() {
    let config = Config::default();
    assert_eq!(config.theme, "Madrid");
    assert_eq!(config.engine, "pdflatex");
    assert_eq!(config.debounce_ms, 500);

    let custom = CustomTheme {
        name: "corp".to_string(),
        base_theme: "Berlin".to_string(),
        color_theme: "whale".to_string(),
        aspect_ratio: "43".to_string(),
    };
    let options = config.get_document_options(Some(&custom), Some("Warsaw".to_string()), None, None);
    assert_eq!(options.theme, "Warsaw");
    assert_eq!(options.color_theme, "whale");
    assert_eq!(options.aspect_ratio, "43");

    let compile = config.get_compile_config(None, Some(0));
    assert_eq!(compile.passes, 1);
}

#[test]
fn test_rebuild_scheduler_coalesces() {
    let scheduler = RebuildScheduler::new();
    assert!(scheduler.request());
    assert!(scheduler.is_running());

    // Any number of requests while running collapse into one
    assert!(!scheduler.request());
    assert!(!scheduler.request());
    assert!(scheduler.is_pending());

    assert!(scheduler.finish());
    assert!(!scheduler.is_pending());
    assert!(scheduler.is_running());

    assert!(!scheduler.finish());
    assert!(!scheduler.is_running());
    assert!(scheduler.request());
}

#[test]
fn test_rebuild_writes_latex_and_html() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let source = dir.path().join("deck.md");
    fs::write(&source, SAMPLE_DECK).expect("Failed to write source");

    let config = WatchConfig {
        source_path: source,
        compile: None,
        html_output: Some(dir.path().join("site").join("deck.html")),
        ..WatchConfig::default()
    };
    let outcome = watch::rebuild(&config).expect("Rebuild failed");

    assert_eq!(outcome.latex_path, dir.path().join("deck.tex"));
    assert!(outcome.latex_path.exists());
    assert_eq!(outcome.lint, LintSummary::default());
    assert_eq!(outcome.pdf_path, None);

    let html = fs::read_to_string(dir.path().join("site").join("deck.html")).expect("Missing HTML");
    assert!(html.contains("<h1>Quarterly Review</h1>"));
    assert!(html.contains("<h2>Numbers</h2>"));
}

#[test]
fn test_rebuild_compiles_despite_braces_in_code() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let source = dir.path().join("deck.md");
    fs::write(&source, CODE_FENCE_DECK).expect("Failed to write source");

    let config = WatchConfig {
        source_path: source,
        compile: Some(CompileConfig {
            engine: "definitely-not-a-tex-engine".to_string(),
            passes: 1,
        }),
        ..WatchConfig::default()
    };

    // Reaching the engine means the lint report did not stop the build
    let result = watch::rebuild(&config);
    assert!(matches!(result, Err(SlidesError::EngineNotFound(_))));
}

#[test]
fn test_write_html_reports_write_error() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let result = write_html_to_file("<html></html>", dir.path());
    assert!(matches!(result, Err(SlidesError::FileWriteError { .. })));
}

#[test]
fn test_has_extension() {
    assert!(utils::has_extension(std::path::Path::new("deck.MD"), "md"));
    assert!(!utils::has_extension(std::path::Path::new("deck.tex"), "md"));
    assert!(!utils::has_extension(std::path::Path::new("deck"), "md"));
}
