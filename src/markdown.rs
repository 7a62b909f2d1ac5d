// ABOUTME: Markdown parsing module for the beamer-slides application
// ABOUTME: Splits Markdown into metadata and slides, and converts slide bodies to Beamer LaTeX

use crate::diagram::mermaid_to_tikz;
use crate::inline::format_inline;
use crate::table::{is_separator_row, is_table_row, parse_table_row, render_table};
use indexmap::IndexMap;
use log::{debug, warn};
use regex::Regex;
use std::sync::LazyLock;

/// `key: value` line inside a frontmatter block
static FRONTMATTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_-]*)\s*:\s*(.*)$").expect("Invalid frontmatter regex")
});

static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-*]\s+(.*)$").expect("Invalid bullet regex"));

static NUMBERED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+\.\s+(.*)$").expect("Invalid numbered list regex"));

const FRONTMATTER_DELIMITER: &str = "---";
const SLIDE_BREAK: &str = "---";
const CODE_FENCE: &str = "```";

/// Markdown fence tags that the listings package knows, with its name for them.
const LISTINGS_LANGUAGES: &[(&str, &str)] = &[
    ("bash", "bash"),
    ("sh", "sh"),
    ("shell", "bash"),
    ("c", "C"),
    ("cpp", "C++"),
    ("c++", "C++"),
    ("csharp", "[Sharp]C"),
    ("fortran", "Fortran"),
    ("haskell", "Haskell"),
    ("html", "HTML"),
    ("java", "Java"),
    ("latex", "[LaTeX]TeX"),
    ("tex", "TeX"),
    ("lisp", "Lisp"),
    ("make", "make"),
    ("matlab", "Matlab"),
    ("perl", "Perl"),
    ("php", "PHP"),
    ("python", "Python"),
    ("py", "Python"),
    ("r", "R"),
    ("ruby", "Ruby"),
    ("sql", "SQL"),
    ("xml", "XML"),
];

/// Document metadata from frontmatter, in first-seen order.
pub type Metadata = IndexMap<String, String>;

/// One slide as parsed from Markdown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Slide {
    pub title: String,
    pub content: Vec<String>,
    pub notes: Vec<String>,
}

impl Slide {
    fn titled(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Self::default()
        }
    }

    /// True when at least one notes line has text.
    pub fn has_notes(&self) -> bool {
        self.notes.iter().any(|line| !line.trim().is_empty())
    }

    fn is_blank(&self) -> bool {
        self.title.is_empty()
            && !self.has_notes()
            && self.content.iter().all(|line| line.trim().is_empty())
    }
}

/// Result of the parsing phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedMarkdown {
    pub metadata: Metadata,
    pub slides: Vec<Slide>,
}

impl ParsedMarkdown {
    pub fn has_notes(&self) -> bool {
        self.slides.iter().any(Slide::has_notes)
    }
}

/// Which block the scanner is inside. Frontmatter and code are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Region {
    Normal,
    Frontmatter,
    CodeBlock,
}

/// Where plain lines of the open slide go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Content,
    Notes,
}

struct SlideCollector {
    slides: Vec<Slide>,
    current: Option<Slide>,
    target: Target,
}

impl SlideCollector {
    fn new() -> Self {
        Self {
            slides: Vec::new(),
            current: None,
            target: Target::Content,
        }
    }

    /// Close the open slide and open `next`. An untitled slide with nothing in
    /// it (e.g. a `---` directly followed by a heading) is discarded.
    fn start(&mut self, next: Slide) {
        self.close();
        self.current = Some(next);
    }

    fn close(&mut self) {
        if let Some(slide) = self.current.take() {
            if slide.is_blank() {
                debug!("Discarding empty slide");
            } else {
                self.slides.push(slide);
            }
        }
        self.target = Target::Content;
    }

    fn push(&mut self, line: &str) {
        if let Some(slide) = self.current.as_mut() {
            match self.target {
                Target::Content => slide.content.push(line.to_string()),
                Target::Notes => slide.notes.push(line.to_string()),
            }
        }
    }

    fn start_notes(&mut self, first_line: &str) {
        if self.current.is_none() {
            debug!("Ignoring notes outside of any slide");
            return;
        }
        self.target = Target::Notes;
        if !first_line.is_empty() {
            self.push(first_line);
        }
    }
}

/// Split a Markdown presentation into metadata and slides.
///
/// Slides start at `## ` headings or `---` breaks. A leading `---` block is
/// frontmatter; `# ` sets the title unless frontmatter already did. Lines
/// starting with `Note:`/`Notes:` switch the slide into notes until the next
/// slide boundary. Breaks and headings inside code fences are content.
pub fn parse_markdown(source: &str) -> ParsedMarkdown {
    let mut metadata = Metadata::new();
    let mut collector = SlideCollector::new();
    let mut region = Region::Normal;

    for (index, line) in source.lines().enumerate() {
        let trimmed = line.trim();

        if index == 0 && trimmed == FRONTMATTER_DELIMITER {
            region = Region::Frontmatter;
            continue;
        }

        if region == Region::Frontmatter {
            if trimmed == FRONTMATTER_DELIMITER {
                region = Region::Normal;
            } else if let Some(caps) = FRONTMATTER_RE.captures(trimmed) {
                let value = unquote(&caps[2]);
                if value.is_empty() {
                    debug!("Frontmatter key {} has no value", &caps[1]);
                } else {
                    metadata.insert(caps[1].to_string(), value.to_string());
                }
            } else if !trimmed.is_empty() {
                warn!("Ignoring malformed frontmatter line {}: {}", index + 1, line);
            }
            continue;
        }

        if trimmed.starts_with(CODE_FENCE) {
            region = match region {
                Region::CodeBlock => Region::Normal,
                _ => Region::CodeBlock,
            };
            collector.push(line);
            continue;
        }

        if region == Region::CodeBlock {
            collector.push(line);
            continue;
        }

        if trimmed == SLIDE_BREAK {
            collector.start(Slide::default());
            continue;
        }

        let leading = line.trim_start();
        if let Some(rest) = leading
            .strip_prefix("Notes:")
            .or_else(|| leading.strip_prefix("Note:"))
        {
            collector.start_notes(rest.trim());
            continue;
        }

        if let Some(title) = leading.strip_prefix("## ") {
            collector.start(Slide::titled(title.trim()));
            continue;
        }

        if let Some(title) = leading.strip_prefix("# ") {
            if !metadata.contains_key("title") {
                metadata.insert("title".to_string(), title.trim().to_string());
            }
            continue;
        }

        collector.push(line);
    }

    if region == Region::Frontmatter {
        warn!("Frontmatter block was never closed");
    }
    collector.close();

    ParsedMarkdown {
        metadata,
        slides: collector.slides,
    }
}

fn unquote(value: &str) -> &str {
    let value = value.trim();
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Itemize,
    Enumerate,
}

impl ListKind {
    fn environment(self) -> &'static str {
        match self {
            ListKind::Itemize => "itemize",
            ListKind::Enumerate => "enumerate",
        }
    }
}

struct CodeBuffer {
    language: String,
    lines: Vec<String>,
}

/// Line-oriented LaTeX writer for one slide body. List kind, code block and
/// table buffer are tracked independently.
struct BodyWriter {
    out: Vec<String>,
    list: Option<ListKind>,
    code: Option<CodeBuffer>,
    table: Option<Vec<Vec<String>>>,
}

impl BodyWriter {
    fn new() -> Self {
        Self {
            out: Vec::new(),
            list: None,
            code: None,
            table: None,
        }
    }

    fn open_list(&mut self, kind: ListKind) {
        if self.list == Some(kind) {
            return;
        }
        self.close_list();
        self.out
            .push(format!("\\begin{{{}}}", kind.environment()));
        self.list = Some(kind);
    }

    fn close_list(&mut self) {
        if let Some(kind) = self.list.take() {
            self.out.push(format!("\\end{{{}}}", kind.environment()));
        }
    }

    fn flush_table(&mut self) {
        if let Some(rows) = self.table.take() {
            let rendered = render_table(&rows);
            if !rendered.is_empty() {
                self.out.push(rendered);
            }
        }
    }

    fn flush_code(&mut self) {
        let Some(buffer) = self.code.take() else {
            return;
        };

        let lines = &buffer.lines;
        let start = lines.iter().position(|l| !l.trim().is_empty());
        let end = lines.iter().rposition(|l| !l.trim().is_empty());
        let (Some(start), Some(end)) = (start, end) else {
            debug!("Dropping empty {} code block", buffer.language);
            return;
        };
        let body = lines[start..=end].join("\n");

        if buffer.language == "mermaid" {
            self.out.push(mermaid_to_tikz(&body));
            return;
        }

        let language = LISTINGS_LANGUAGES
            .iter()
            .find(|(tag, _)| tag.eq_ignore_ascii_case(&buffer.language))
            .map(|(_, name)| *name);
        match language {
            Some(name) => self.out.push(format!("\\begin{{lstlisting}}[language={}]", name)),
            None => self.out.push("\\begin{lstlisting}".to_string()),
        }
        self.out.push(body);
        self.out.push("\\end{lstlisting}".to_string());
    }

    fn paragraph(&mut self, text: String) {
        self.out.push(text);
        self.out.push(String::new());
    }

    fn line(&mut self, line: &str) {
        let trimmed = line.trim();

        if self.code.is_some() {
            if trimmed.starts_with(CODE_FENCE) {
                self.flush_code();
            } else if let Some(buffer) = self.code.as_mut() {
                buffer.lines.push(line.to_string());
            }
            return;
        }

        if let Some(tag) = trimmed.strip_prefix(CODE_FENCE) {
            self.close_list();
            self.flush_table();
            let language = match tag.trim() {
                "" => "text".to_string(),
                other => other.to_string(),
            };
            self.code = Some(CodeBuffer {
                language,
                lines: Vec::new(),
            });
            return;
        }

        if is_table_row(line) {
            self.close_list();
            if !is_separator_row(line) {
                self.table
                    .get_or_insert_with(Vec::new)
                    .push(parse_table_row(line));
            }
            return;
        }
        self.flush_table();

        if trimmed.is_empty() {
            self.close_list();
            return;
        }

        if let Some(caps) = BULLET_RE.captures(line) {
            self.open_list(ListKind::Itemize);
            self.out.push(format!("\\item {}", format_inline(caps[1].trim())));
            return;
        }

        if let Some(caps) = NUMBERED_RE.captures(line) {
            self.open_list(ListKind::Enumerate);
            self.out.push(format!("\\item {}", format_inline(caps[1].trim())));
            return;
        }

        self.close_list();

        if let Some(text) = trimmed.strip_prefix("#### ") {
            self.paragraph(format!("\\textbf{{{}}}", format_inline(text.trim())));
        } else if let Some(text) = trimmed.strip_prefix("### ") {
            self.paragraph(format!("{{\\large\\textbf{{{}}}}}", format_inline(text.trim())));
        } else if let Some(text) = trimmed.strip_prefix("> ") {
            self.out.push(format!(
                "\\begin{{quote}}\n{}\n\\end{{quote}}",
                format_inline(text.trim())
            ));
        } else {
            self.paragraph(format_inline(trimmed));
        }
    }

    fn finish(mut self) -> String {
        if self.code.is_some() {
            warn!("Code block was not closed before the end of the slide");
            self.flush_code();
        }
        self.close_list();
        self.flush_table();

        self.out.join("\n").trim().to_string()
    }
}

/// Convert the content lines of one slide to a Beamer frame body.
pub fn slide_body_to_latex(lines: &[String]) -> String {
    let mut writer = BodyWriter::new();
    for line in lines {
        writer.line(line);
    }
    writer.finish()
}

/// Convert speaker notes to the body of a `\note{}` command.
pub fn notes_to_latex(notes: &[String]) -> String {
    notes
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .map(format_inline)
        .collect::<Vec<_>>()
        .join(" \\\\\n")
}
