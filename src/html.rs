// ABOUTME: HTML export module for the beamer-slides application
// ABOUTME: Extracts frames from Beamer source and renders them as a single static web presentation

use crate::errors::{Result, SlidesError};
use crate::resources::{ResourceFile, ResourceKind};
use crate::utils;
use log::{debug, info, warn};
use regex::{Captures, Regex};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\title\{([^}]*)\}").expect("Invalid title regex"));

static AUTHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\author\{([^}]*)\}").expect("Invalid author regex"));

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\date\{([^}]*)\}").expect("Invalid date regex"));

/// `\begin{frame}[opts]{Title}` up to the next `\end{frame}`. The match is
/// non-greedy, so an `\end{frame}` inside a listing ends the frame early.
static FRAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\begin\{frame\}(?:\[([^\]]*)\])?\{([^\n]*)\}[ \t]*\n((?s:.*?))\\end\{frame\}")
        .expect("Invalid frame regex")
});

static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)(^|[^\\])%.*$").expect("Invalid comment regex"));

static FRAGILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[fragile\]").expect("Invalid fragile regex"));

static ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\item\b\s*").expect("Invalid item regex"));

static BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\textbf\{([^{}]*)\}").expect("Invalid bold regex"));

static ITALIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\(?:textit|emph)\{([^{}]*)\}").expect("Invalid italic regex"));

static MONO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\texttt\{([^{}]*)\}").expect("Invalid typewriter regex"));

static LISTING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\\begin\{(lstlisting|verbatim)\}(?:\[([^\]]*)\])?[ \t]*\n?((?s:.*?))\n?[ \t]*\\end\{(?:lstlisting|verbatim)\}",
    )
    .expect("Invalid listing regex")
});

static LANGUAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"language=(?:\[[^\]]*\])?([A-Za-z+#]+)").expect("Invalid language regex"));

static TABULAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\begin\{tabular\}\{[^}]*\}((?s:.*?))\\end\{tabular\}")
        .expect("Invalid tabular regex")
});

static TABLE_RULE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\(?:toprule|bottomrule|hline)").expect("Invalid table rule regex")
});

static CENTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\begin\{center\}|\\end\{center\}|\\centering").expect("Invalid center regex")
});

static SIZE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\(?:tiny|scriptsize|footnotesize|small|normalsize|large|Large|LARGE|huge|Huge)\b")
        .expect("Invalid size regex")
});

static TIKZ_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\begin\{tikzpicture\}(?s:.*?)\\end\{tikzpicture\}").expect("Invalid tikz regex")
});

static COMMAND_WITH_ARG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\[a-zA-Z]+\*?(?:\[[^\]]*\])?\{[^{}]*\}").expect("Invalid command regex")
});

static BARE_COMMAND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\[a-zA-Z]+\*?").expect("Invalid bare command regex"));

static BLANK_LINES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*(?:\n[ \t]*)+").expect("Invalid blank line regex"));

static ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^&(?:[a-z]+|#[0-9]+);").expect("Invalid entity regex"));

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("Invalid tag regex"));

const DIAGRAM_PLACEHOLDER: &str = "<p><em>[Diagram: see the compiled PDF]</em></p>";

/// Marker wrapping the index of a protected code block during conversion.
const CODE_MARKER: char = '\u{0}';

const INLINE_STYLE: &str = "body { margin: 0; font-family: sans-serif; }
section { box-sizing: border-box; min-height: 100vh; padding: 4vh 6vw; }
section h2 { margin-top: 0; }
pre { overflow-x: auto; }
table { border-collapse: collapse; margin: 1em auto; }
th, td { padding: 0.3em 0.8em; border-bottom: 1px solid #ccc; }
aside.notes { display: none; }";

/// One exported slide. `content` is already HTML.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlSlide {
    pub title: String,
    pub content: String,
    pub notes: Option<String>,
}

/// A presentation as read back from Beamer source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Deck {
    pub title: String,
    pub author: String,
    pub date: Option<String>,
    pub slides: Vec<HtmlSlide>,
}

/// Turns Beamer source into a [`Deck`].
pub trait MarkupReader {
    fn read(&self, source: &str) -> Deck;
}

/// Pattern-based reader: metadata and frames are located with regular
/// expressions and each body goes through [`latex_to_html`]. It is not a
/// block parser, so nested or irregular input is approximated.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexMarkupReader;

impl MarkupReader for RegexMarkupReader {
    fn read(&self, source: &str) -> Deck {
        let title = first_capture(&TITLE_RE, source)
            .map(|title| latex_to_html(&title))
            .unwrap_or_else(|| "Presentation".to_string());
        let author = first_capture(&AUTHOR_RE, source)
            .map(|author| latex_to_html(&author))
            .unwrap_or_default();
        let date = first_capture(&DATE_RE, source)
            .filter(|date| !date.is_empty() && date != "\\today")
            .map(|date| latex_to_html(&date));

        let mut slides = Vec::new();
        for caps in FRAME_RE.captures_iter(source) {
            let Some(frame) = caps.get(0) else { continue };
            let notes = note_after(&source[frame.end()..]).map(|note| notes_to_html(&note));
            debug!("Extracted frame '{}'", &caps[2]);

            slides.push(HtmlSlide {
                title: latex_to_html(&caps[2]),
                content: latex_to_html(&caps[3]),
                notes,
            });
        }

        Deck {
            title,
            author,
            date,
            slides,
        }
    }
}

fn first_capture(re: &Regex, source: &str) -> Option<String> {
    re.captures(source).map(|caps| caps[1].trim().to_string())
}

/// Return the argument of a `\note{...}` that directly follows a frame,
/// with nested braces balanced.
fn note_after(rest: &str) -> Option<String> {
    let rest = rest.trim_start().strip_prefix("\\note")?;
    let rest = rest.trim_start().strip_prefix('{')?;

    let mut depth = 1usize;
    let mut previous = '\0';
    for (index, c) in rest.char_indices() {
        match c {
            '{' if previous != '\\' => depth += 1,
            '}' if previous != '\\' => {
                depth -= 1;
                if depth == 0 {
                    return Some(rest[..index].trim().to_string());
                }
            }
            _ => {}
        }
        previous = c;
    }

    warn!("Unterminated \\note command, ignoring notes");
    None
}

/// Speaker notes keep their text; only bold commands are converted.
fn notes_to_html(notes: &str) -> String {
    BOLD_RE.replace_all(notes, "<strong>$1</strong>").into_owned()
}

/// Convert a frame body to HTML with a fixed sequence of substitutions.
///
/// Each step is a global replacement over the whole body, so markup that
/// overlaps in ways the sequence does not expect is rendered approximately.
pub fn latex_to_html(body: &str) -> String {
    let mut html = body.replace('<', "&lt;").replace('>', "&gt;");
    html = FRAGILE_RE.replace_all(&html, "").into_owned();

    html = html
        .replace("\\begin{itemize}", "<ul>")
        .replace("\\end{itemize}", "</ul>")
        .replace("\\begin{enumerate}", "<ol>")
        .replace("\\end{enumerate}", "</ol>")
        .replace("\\begin{quote}", "<blockquote>")
        .replace("\\end{quote}", "</blockquote>");
    html = ITEM_RE.replace_all(&html, "<li>").into_owned();
    html = close_list_items(&html);

    html = html
        .replace("\\textbackslash{}", "&#92;")
        .replace("\\textasciitilde{}", "~")
        .replace("\\textasciicircum{}", "^");
    // Innermost commands first; repeat so nested spans resolve.
    for _ in 0..4 {
        let next = BOLD_RE.replace_all(&html, "<strong>$1</strong>");
        let next = ITALIC_RE.replace_all(&next, "<em>$1</em>");
        let next = MONO_RE.replace_all(&next, "<code>$1</code>").into_owned();
        if next == html {
            break;
        }
        html = next;
    }

    let mut code_blocks = Vec::new();
    html = LISTING_RE
        .replace_all(&html, |caps: &Captures| {
            let class = caps
                .get(2)
                .and_then(|opts| LANGUAGE_RE.captures(opts.as_str()))
                .map(|lang| format!(" class=\"language-{}\"", lang[1].to_lowercase()))
                .unwrap_or_default();
            code_blocks.push(format!(
                "<pre><code{}>{}</code></pre>",
                class,
                escape_code(&caps[3])
            ));
            format!("{}{}{}", CODE_MARKER, code_blocks.len() - 1, CODE_MARKER)
        })
        .into_owned();
    html = COMMENT_RE.replace_all(&html, "$1").into_owned();

    html = TABULAR_RE
        .replace_all(&html, |caps: &Captures| tabular_to_html(&caps[1]))
        .into_owned();
    html = html.replace("\\\\", "<br>");

    html = CENTER_RE.replace_all(&html, "").into_owned();
    html = SIZE_RE.replace_all(&html, "").into_owned();
    html = TIKZ_RE.replace_all(&html, DIAGRAM_PLACEHOLDER).into_owned();

    html = COMMAND_WITH_ARG_RE.replace_all(&html, "").into_owned();
    html = BARE_COMMAND_RE.replace_all(&html, "").into_owned();
    html = strip_group_braces(&html);
    html = unescape_specials(&html);

    html = BLANK_LINES_RE.replace_all(&html, "\n\n").into_owned();

    restore_code_blocks(html.trim(), &code_blocks)
}

/// Close `<li>` tags before the next item or the end of the list.
fn close_list_items(html: &str) -> String {
    // One entry per open list: whether it has an unclosed item.
    let mut open_items: Vec<bool> = Vec::new();
    let mut out: Vec<String> = Vec::new();

    for line in html.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("<ul>") || trimmed.starts_with("<ol>") {
            open_items.push(false);
        } else if trimmed.starts_with("<li>") {
            if let Some(open) = open_items.last_mut() {
                if *open {
                    out.push("</li>".to_string());
                }
                *open = true;
            }
        } else if trimmed.starts_with("</ul>") || trimmed.starts_with("</ol>") {
            if open_items.pop() == Some(true) {
                out.push("</li>".to_string());
            }
        }
        out.push(line.to_string());
    }

    out.join("\n")
}

fn tabular_to_html(body: &str) -> String {
    let body = TABLE_RULE_RE.replace_all(body, "");
    let mut header_done = !body.contains("\\midrule");
    let mut rows = Vec::new();

    for segment in body.split("\\midrule") {
        for row in segment.split("\\\\") {
            let row = row.trim();
            if row.is_empty() {
                continue;
            }
            let tag = if header_done { "td" } else { "th" };
            let cells: Vec<String> = split_cells(row)
                .iter()
                .map(|cell| format!("<{tag}>{}</{tag}>", cell.trim()))
                .collect();
            rows.push(format!("<tr>{}</tr>", cells.join("")));
        }
        header_done = true;
    }

    format!("<table>\n{}\n</table>", rows.join("\n"))
}

/// Split a table row on `&` separators, leaving `\&` and HTML entities
/// produced by earlier steps alone.
fn split_cells(row: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut previous = '\0';
    for (index, c) in row.char_indices() {
        let is_separator =
            c == '&' && previous != '\\' && !ENTITY_RE.is_match(&row[index..]);
        if is_separator {
            cells.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
        previous = c;
    }
    cells.push(current);
    cells
}

/// Drop grouping braces left behind by removed commands; escaped braces stay.
fn strip_group_braces(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut previous = '\0';
    for c in html.chars() {
        if (c == '{' || c == '}') && previous != '\\' {
            previous = c;
            continue;
        }
        out.push(c);
        previous = c;
    }
    out
}

fn unescape_specials(html: &str) -> String {
    html.replace("\\_", "_")
        .replace("\\&", "&amp;")
        .replace("\\%", "%")
        .replace("\\$", "$")
        .replace("\\#", "#")
        .replace("\\{", "{")
        .replace("\\}", "}")
}

fn restore_code_blocks(html: &str, code_blocks: &[String]) -> String {
    let mut out = html.to_string();
    for (index, block) in code_blocks.iter().enumerate() {
        out = out.replace(&format!("{}{}{}", CODE_MARKER, index, CODE_MARKER), block);
    }
    out
}

/// Options for the exported page.
#[derive(Debug, Clone)]
pub struct HtmlOptions {
    /// Theme name used for the external `<theme>.css` and `<theme>.js`
    pub theme: String,
    /// Base URL or relative directory holding the theme files
    pub theme_base_url: String,
    pub css_files: Vec<ResourceFile>,
    pub js_files: Vec<ResourceFile>,
    pub embed_resources: bool,
}

impl Default for HtmlOptions {
    fn default() -> Self {
        Self {
            theme: "default".to_string(),
            theme_base_url: "themes".to_string(),
            css_files: Vec::new(),
            js_files: Vec::new(),
            embed_resources: true,
        }
    }
}

fn theme_asset(options: &HtmlOptions, extension: &str) -> String {
    format!(
        "{}/{}.{}",
        options.theme_base_url.trim_end_matches('/'),
        options.theme,
        extension
    )
}

fn push_resource_tags(html: &mut String, files: &[ResourceFile], kind: ResourceKind, embed: bool) {
    for file in files {
        match file.tag(kind, embed) {
            Ok(tag) => {
                html.push_str(&tag);
                html.push('\n');
            }
            Err(e) => warn!("Failed to include resource {}: {}", file.path, e),
        }
    }
}

/// Render a deck as a complete HTML page.
pub fn render_html(deck: &Deck, options: &HtmlOptions) -> String {
    let date = deck
        .date
        .clone()
        .unwrap_or_else(|| chrono::Local::now().format("%B %-d, %Y").to_string());

    let mut html = String::from("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"UTF-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n");
    html.push_str(&format!(
        "<title>{}</title>\n",
        TAG_RE.replace_all(&deck.title, "")
    ));
    html.push_str(&format!(
        "<link rel=\"stylesheet\" href=\"{}\">\n",
        theme_asset(options, "css")
    ));
    html.push_str(&format!("<style>\n{}\n</style>\n", INLINE_STYLE));
    push_resource_tags(
        &mut html,
        &options.css_files,
        ResourceKind::Stylesheet,
        options.embed_resources,
    );
    html.push_str("</head>\n<body>\n<main class=\"deck\">\n");

    html.push_str("<section class=\"title-slide\">\n");
    html.push_str(&format!("<h1>{}</h1>\n", deck.title));
    if !deck.author.is_empty() {
        html.push_str(&format!("<p class=\"author\">{}</p>\n", deck.author));
    }
    html.push_str(&format!("<p class=\"date\">{}</p>\n", date));
    html.push_str("</section>\n");

    for slide in &deck.slides {
        html.push_str("<section class=\"slide\">\n");
        if !slide.title.is_empty() {
            html.push_str(&format!("<h2>{}</h2>\n", slide.title));
        }
        if !slide.content.is_empty() {
            html.push_str(&slide.content);
            html.push('\n');
        }
        if let Some(notes) = &slide.notes {
            html.push_str(&format!("<aside class=\"notes\">{}</aside>\n", notes));
        }
        html.push_str("</section>\n");
    }

    html.push_str("<section class=\"closing\">\n<h2>Questions?</h2>\n</section>\n");
    html.push_str("</main>\n");
    html.push_str(&format!(
        "<script src=\"{}\"></script>\n",
        theme_asset(options, "js")
    ));
    push_resource_tags(
        &mut html,
        &options.js_files,
        ResourceKind::Script,
        options.embed_resources,
    );
    html.push_str("</body>\n</html>\n");

    html
}

/// Convert Beamer source to a complete HTML page using the given reader.
pub fn latex_source_to_html_with(
    reader: &dyn MarkupReader,
    source: &str,
    options: &HtmlOptions,
) -> String {
    let deck = reader.read(source);
    info!("Rendering {} slides to HTML", deck.slides.len());
    render_html(&deck, options)
}

/// Convert Beamer source to a complete HTML page.
pub fn latex_source_to_html(source: &str, options: &HtmlOptions) -> String {
    latex_source_to_html_with(&RegexMarkupReader, source, options)
}

/// Escape a listing body for `<pre>`. The body already had `<` and `>`
/// turned into entities, so those are undone first to escape `&` once.
fn escape_code(body: &str) -> String {
    body.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Generate an HTML page from a `.tex` file.
pub fn generate_html(latex_path: &Path, options: &HtmlOptions) -> Result<String> {
    info!("Generating HTML from LaTeX: {:?}", latex_path);
    utils::validate_file_exists(latex_path)?;

    let source = fs::read_to_string(latex_path).map_err(SlidesError::FileReadError)?;
    Ok(latex_source_to_html(&source, options))
}

/// Write HTML content to a file, creating the parent directory if needed.
pub fn write_html_to_file(html_content: &str, output_path: &Path) -> Result<()> {
    info!("Writing HTML to file: {:?}", output_path);
    utils::ensure_parent_directory_exists(output_path)?;
    fs::write(output_path, html_content).map_err(|source| SlidesError::FileWriteError {
        path: output_path.to_path_buf(),
        source,
    })?;
    Ok(())
}
