// ABOUTME: Document assembly module for the beamer-slides application
// ABOUTME: Wraps converted slides in a complete Beamer document with preamble, title and closing frames

use crate::inline::{escape_latex, format_inline, sanitize_emoji};
use crate::markdown::{notes_to_latex, parse_markdown, slide_body_to_latex, Metadata, ParsedMarkdown};
use log::{info, warn};

const PREAMBLE: &str = r"\usepackage[utf8]{inputenc}
\usepackage[T1]{fontenc}
\usepackage{lmodern}
\usepackage{graphicx}
\usepackage{booktabs}
\usepackage{listings}
\usepackage{tikz}
\usetikzlibrary{arrows.meta,positioning,shapes}
\lstset{basicstyle=\ttfamily\small, breaklines=true, frame=single, columns=fullflexible}
\setbeamertemplate{navigation symbols}{}";

const CLOSING_FRAME: &str = r"\begin{frame}[plain]
\centering
{\Huge Questions?}
\end{frame}";

/// Aspect ratios accepted by the beamer class option.
const ASPECT_RATIOS: &[&str] = &["1610", "169", "149", "54", "43", "32", "141", "235"];

/// Defaults for a generated document. Frontmatter values take precedence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentOptions {
    pub theme: String,
    pub color_theme: String,
    pub aspect_ratio: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub date: Option<String>,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            theme: "Madrid".to_string(),
            color_theme: "default".to_string(),
            aspect_ratio: "169".to_string(),
            title: None,
            author: None,
            date: None,
        }
    }
}

/// Settings after merging frontmatter over the command defaults.
struct ResolvedSettings {
    theme: String,
    color_theme: String,
    aspect_ratio: String,
    title: String,
    author: String,
    date: String,
}

fn lookup<'a>(metadata: &'a Metadata, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| metadata.get(*key))
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
}

impl ResolvedSettings {
    fn resolve(metadata: &Metadata, options: &DocumentOptions) -> Self {
        let theme = lookup(metadata, &["theme"]).unwrap_or(options.theme.as_str());
        let color_theme = lookup(metadata, &["colorTheme", "colortheme", "color_theme"])
            .unwrap_or(options.color_theme.as_str());
        let aspect_ratio = lookup(metadata, &["aspectRatio", "aspectratio", "aspect_ratio", "aspect"])
            .unwrap_or(options.aspect_ratio.as_str());

        let title = lookup(metadata, &["title"])
            .or(options.title.as_deref())
            .map(|title| escape_latex(&sanitize_emoji(title)))
            .unwrap_or_else(|| "Presentation".to_string());
        let author = lookup(metadata, &["author"])
            .or(options.author.as_deref())
            .map(|author| escape_latex(&sanitize_emoji(author)))
            .unwrap_or_default();
        let date = lookup(metadata, &["date"])
            .or(options.date.as_deref())
            .map(|date| escape_latex(&sanitize_emoji(date)))
            .unwrap_or_else(|| "\\today".to_string());

        Self {
            theme: theme.to_string(),
            color_theme: color_theme.to_string(),
            aspect_ratio: normalize_aspect_ratio(aspect_ratio),
            title,
            author,
            date,
        }
    }
}

/// Normalize `16:9`, `16/9` or `169` to the beamer class option value.
/// Unknown ratios fall back to 16:9.
pub fn normalize_aspect_ratio(value: &str) -> String {
    let compact: String = value
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    if ASPECT_RATIOS.contains(&compact.as_str()) {
        compact
    } else {
        warn!("Unsupported aspect ratio: {}. Using 16:9 instead.", value);
        "169".to_string()
    }
}

/// Assemble a complete Beamer document from parsed slides.
pub fn generate_latex(parsed: &ParsedMarkdown, options: &DocumentOptions) -> String {
    let settings = ResolvedSettings::resolve(&parsed.metadata, options);
    info!(
        "Generating document with {} slides (theme {}, color theme {})",
        parsed.slides.len(),
        settings.theme,
        settings.color_theme
    );

    let mut doc = String::new();
    doc.push_str(&format!(
        "\\documentclass[aspectratio={}]{{beamer}}\n",
        settings.aspect_ratio
    ));
    doc.push_str(&format!("\\usetheme{{{}}}\n", settings.theme));
    doc.push_str(&format!("\\usecolortheme{{{}}}\n", settings.color_theme));
    doc.push_str(PREAMBLE);
    doc.push('\n');
    if parsed.has_notes() {
        doc.push_str("\\setbeameroption{show notes}\n");
    }
    doc.push('\n');

    doc.push_str(&format!("\\title{{{}}}\n", settings.title));
    doc.push_str(&format!("\\author{{{}}}\n", settings.author));
    doc.push_str(&format!("\\date{{{}}}\n", settings.date));
    doc.push_str("\n\\begin{document}\n\n");
    doc.push_str("\\begin{frame}\n\\titlepage\n\\end{frame}\n\n");

    for slide in &parsed.slides {
        let body = slide_body_to_latex(&slide.content);
        let fragile = if body.contains("\\begin{lstlisting}") {
            "[fragile]"
        } else {
            ""
        };

        doc.push_str(&format!(
            "\\begin{{frame}}{}{{{}}}\n",
            fragile,
            format_inline(&slide.title)
        ));
        if !body.is_empty() {
            doc.push_str(&body);
            doc.push('\n');
        }
        doc.push_str("\\end{frame}\n");

        let notes = notes_to_latex(&slide.notes);
        if !notes.is_empty() {
            doc.push_str("\\note{\n");
            doc.push_str(&notes);
            doc.push_str("\n}\n");
        }
        doc.push('\n');
    }

    doc.push_str(CLOSING_FRAME);
    doc.push_str("\n\n\\end{document}\n");
    doc
}

/// Convert Markdown source straight to a Beamer document.
pub fn markdown_to_latex(source: &str, options: &DocumentOptions) -> String {
    generate_latex(&parse_markdown(source), options)
}
