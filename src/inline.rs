// ABOUTME: Inline formatting module for the beamer-slides application
// ABOUTME: Escapes LaTeX control characters and converts inline Markdown spans to LaTeX commands

use regex::Regex;
use std::sync::LazyLock;

/// Inline code span: `code`
static CODE_SPAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`]+)`").expect("Invalid code span regex"));

/// Bold span: **text**
static BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("Invalid bold regex"));

/// Italic span: *text*, applied after bold spans are gone
static ITALIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*([^*]+)\*").expect("Invalid italic regex"));

/// Literal replacements for emoji that carry meaning on a slide.
/// Multi-codepoint forms come before their bare counterparts.
const EMOJI_REPLACEMENTS: &[(&str, &str)] = &[
    ("\u{2705}", "[OK]"),
    ("\u{2714}\u{FE0F}", "[OK]"),
    ("\u{2714}", "[OK]"),
    ("\u{274C}", "[X]"),
    ("\u{2716}\u{FE0F}", "[X]"),
    ("\u{26A0}\u{FE0F}", "[!]"),
    ("\u{26A0}", "[!]"),
    ("\u{27A1}\u{FE0F}", "->"),
    ("\u{2192}", "->"),
    ("\u{2B50}", "*"),
    ("\u{1F4A1}", "Tip:"),
    ("\u{1F4DD}", "Note:"),
];

/// Escape characters that have special meaning in LaTeX.
///
/// Every character is mapped exactly once, so the commands produced for
/// backslash, tilde and caret are never escaped a second time:
/// - `\` becomes `\textbackslash{}`
/// - `_ & % $ # { }` get a leading backslash
/// - `~` and `^` become `\textasciitilde{}` and `\textasciicircum{}`
pub fn escape_latex(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + text.len() / 8);

    for c in text.chars() {
        match c {
            '\\' => result.push_str(r"\textbackslash{}"),
            '_' | '&' | '%' | '$' | '#' | '{' | '}' => {
                result.push('\\');
                result.push(c);
            }
            '~' => result.push_str(r"\textasciitilde{}"),
            '^' => result.push_str(r"\textasciicircum{}"),
            _ => result.push(c),
        }
    }

    result
}

/// Replace well-known emoji with text equivalents and drop the rest.
///
/// pdflatex has no glyphs for emoji, so anything left in the common emoji
/// blocks after the replacement table is stripped.
pub fn sanitize_emoji(text: &str) -> String {
    let mut replaced = text.to_string();
    for (emoji, replacement) in EMOJI_REPLACEMENTS {
        if replaced.contains(emoji) {
            replaced = replaced.replace(emoji, replacement);
        }
    }

    replaced.chars().filter(|c| !is_emoji(*c)).collect()
}

fn is_emoji(c: char) -> bool {
    matches!(
        c as u32,
        0x1F000..=0x1FAFF | 0x2600..=0x27BF | 0xFE00..=0xFE0F | 0x200D | 0x2B00..=0x2BFF
    )
}

/// Convert a line of Markdown text to LaTeX.
///
/// Emoji are sanitised, the text is escaped, and only then are bold, italic
/// and inline code spans turned into `\textbf`, `\textit` and `\texttt`.
/// Because escaping happens first, the braces of the generated commands are
/// never escaped.
pub fn format_inline(text: &str) -> String {
    let text = sanitize_emoji(text);
    let mut result = String::with_capacity(text.len() + 16);
    let mut last = 0;

    for caps in CODE_SPAN_RE.captures_iter(&text) {
        let Some(span) = caps.get(0) else { continue };
        result.push_str(&format_emphasis(&text[last..span.start()]));
        result.push_str(r"\texttt{");
        result.push_str(&escape_latex(&caps[1]));
        result.push('}');
        last = span.end();
    }
    result.push_str(&format_emphasis(&text[last..]));

    result
}

fn format_emphasis(segment: &str) -> String {
    if segment.is_empty() {
        return String::new();
    }
    let escaped = escape_latex(segment);
    let bold = BOLD_RE.replace_all(&escaped, r"\textbf{${1}}");
    ITALIC_RE.replace_all(&bold, r"\textit{${1}}").into_owned()
}
