// ABOUTME: Structural linter for the beamer-slides application
// ABOUTME: Validates LaTeX source for required markers, brace and environment balance, frame titles and stray underscores

use crate::errors::{Result, SlidesError};
use crate::utils;
use log::{debug, info, warn};
use regex::Regex;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

static ENVIRONMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\(begin|end)\{([^}]*)\}").expect("Invalid environment regex")
});

static FRAME_BEGIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\begin\{frame\}(?:<[^>]*>)?(?:\[([^\]]*)\])?(.*)$")
        .expect("Invalid frame regex")
});

/// Spans that may legitimately contain underscores, removed before the
/// underscore check. Order matters: escaped dollars go before math spans.
static UNDERSCORE_SAFE_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\\\$",
        r"\$\$.*?\$\$",
        r"\$[^$]*\$",
        r"\\\(.*?\\\)",
        r"\\\[.*?\\\]",
        r"\\texttt\{[^}]*\}",
        r"\\(?:label|ref|eqref|pageref|cite|url|href|includegraphics|input|include|usepackage|lstinline)\*?(?:\[[^\]]*\])?\{[^}]*\}",
        r"\\_",
        r"\\[a-zA-Z@]+\*?",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("Invalid underscore filter regex"))
    .collect()
});

/// Environments whose contents are not LaTeX.
const VERBATIM_ENVIRONMENTS: &[&str] = &["lstlisting", "verbatim", "Verbatim", "minted", "comment"];

/// Frame options that make a missing title intentional.
const UNTITLED_FRAME_OPTIONS: &[&str] = &["plain", "standout", "noframenumbering"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    pub fn icon(self) -> &'static str {
        match self {
            Severity::Error => "\u{2717}",
            Severity::Warning => "\u{26A0}",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A single finding. Lines are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintIssue {
    pub line: usize,
    pub severity: Severity,
    pub message: String,
    pub rule: &'static str,
}

impl LintIssue {
    fn error(line: usize, rule: &'static str, message: String) -> Self {
        Self {
            line,
            severity: Severity::Error,
            message,
            rule,
        }
    }

    fn warning(line: usize, rule: &'static str, message: String) -> Self {
        Self {
            line,
            severity: Severity::Warning,
            message,
            rule,
        }
    }
}

/// Error and warning counts for a lint run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LintSummary {
    pub errors: usize,
    pub warnings: usize,
}

impl LintSummary {
    pub fn from_issues(issues: &[LintIssue]) -> Self {
        let errors = issues
            .iter()
            .filter(|issue| issue.severity == Severity::Error)
            .count();
        Self {
            errors,
            warnings: issues.len() - errors,
        }
    }

    /// Only errors fail a run; warnings are advisory.
    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }
}

impl fmt::Display for LintSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error(s), {} warning(s)", self.errors, self.warnings)
    }
}

/// Run every check over the source and return the findings ordered by line.
/// Findings on the same line keep the order in which checks ran.
pub fn lint_source(source: &str) -> Vec<LintIssue> {
    let lines: Vec<&str> = source.lines().collect();
    let verbatim = verbatim_mask(&lines);

    let mut issues = Vec::new();
    issues.extend(check_required_markers(source));
    issues.extend(check_braces(&lines, None));
    issues.extend(check_environments(&lines));
    issues.extend(check_frame_titles(&lines, &verbatim));
    issues.extend(check_underscores(&lines, &verbatim));

    issues.sort_by_key(|issue| issue.line);
    debug!("Lint produced {} issue(s)", issues.len());
    issues
}

/// Errors that stop a build. Same checks as [`lint_source`], except that
/// braces on `lstlisting`/`verbatim`/`minted` lines are not counted: the engine
/// typesets those verbatim, so a lone `}` or a `%` in a code snippet compiles.
pub fn build_blockers(source: &str) -> Vec<LintIssue> {
    let lines: Vec<&str> = source.lines().collect();
    let verbatim = verbatim_mask(&lines);

    let mut issues = Vec::new();
    issues.extend(check_required_markers(source));
    issues.extend(check_braces(&lines, Some(&verbatim)));
    issues.extend(check_environments(&lines));
    issues.retain(|issue| issue.severity == Severity::Error);

    issues.sort_by_key(|issue| issue.line);
    issues
}

/// Lint a file on disk.
pub fn lint_file(path: &Path) -> Result<Vec<LintIssue>> {
    info!("Linting {:?}", path);
    utils::validate_file_exists(path)?;
    let source = fs::read_to_string(path).map_err(SlidesError::FileReadError)?;
    Ok(lint_source(&source))
}

/// Automatic fixing is not implemented: the source is returned unchanged.
pub fn fix_source(source: &str) -> String {
    warn!("Automatic fixes are not implemented; the source is left unchanged");
    source.to_string()
}

/// Render issues as `<icon> <file>:<line> <message> (<rule>)` lines followed
/// by a summary line.
pub fn format_report(file: &str, issues: &[LintIssue]) -> String {
    let mut report = String::new();
    for issue in issues {
        report.push_str(&format!(
            "{} {}:{} {} ({})\n",
            issue.severity.icon(),
            file,
            issue.line,
            issue.message,
            issue.rule
        ));
    }
    report.push_str(&LintSummary::from_issues(issues).to_string());
    report.push('\n');
    report
}

/// Cut a line at the first unescaped `%`.
fn strip_comment(line: &str) -> &str {
    let mut escaped = false;
    for (index, c) in line.char_indices() {
        match c {
            '\\' => escaped = !escaped,
            '%' if !escaped => return &line[..index],
            _ => escaped = false,
        }
    }
    line
}

/// Mark the lines that sit inside a verbatim environment, delimiters included.
fn verbatim_mask(lines: &[&str]) -> Vec<bool> {
    let mut mask = Vec::with_capacity(lines.len());
    let mut open: Option<&str> = None;

    for line in lines {
        match open {
            Some(name) => {
                mask.push(true);
                if line.contains(&format!("\\end{{{}}}", name)) {
                    open = None;
                }
            }
            None => {
                let code = strip_comment(line);
                let started = VERBATIM_ENVIRONMENTS
                    .iter()
                    .find(|name| code.contains(&format!("\\begin{{{}}}", name)));
                match started {
                    Some(name) => {
                        mask.push(true);
                        if !code.contains(&format!("\\end{{{}}}", name)) {
                            open = Some(*name);
                        }
                    }
                    None => mask.push(false),
                }
            }
        }
    }

    mask
}

fn check_required_markers(source: &str) -> Vec<LintIssue> {
    let required = [
        ("\\documentclass", "document-class", "Missing \\documentclass declaration"),
        ("\\begin{document}", "begin-document", "Missing \\begin{document}"),
        ("\\end{document}", "end-document", "Missing \\end{document}"),
    ];

    required
        .iter()
        .filter(|(marker, _, _)| !source.contains(marker))
        .map(|(_, rule, message)| LintIssue::error(1, *rule, message.to_string()))
        .collect()
}

/// Count `{` and `}` outside comments, ignoring escaped braces. A stray `}`
/// is reported once and the count restarts at zero. Lines flagged in `skip`
/// are not counted.
fn check_braces(lines: &[&str], skip: Option<&[bool]>) -> Vec<LintIssue> {
    let mut issues = Vec::new();
    let mut depth: usize = 0;

    for (index, line) in lines.iter().enumerate() {
        if skip.is_some_and(|mask| mask.get(index).copied().unwrap_or(false)) {
            continue;
        }
        let mut escaped = false;
        for c in strip_comment(line).chars() {
            if escaped {
                escaped = false;
                continue;
            }
            match c {
                '\\' => escaped = true,
                '{' => depth += 1,
                '}' if depth == 0 => issues.push(LintIssue::error(
                    index + 1,
                    "brace-balance",
                    "Unmatched closing brace".to_string(),
                )),
                '}' => depth -= 1,
                _ => {}
            }
        }
    }

    if depth > 0 {
        issues.push(LintIssue::error(
            lines.len().max(1),
            "brace-balance",
            format!("{} unclosed brace(s)", depth),
        ));
    }

    issues
}

fn check_environments(lines: &[&str]) -> Vec<LintIssue> {
    let mut issues = Vec::new();
    let mut stack: Vec<(String, usize)> = Vec::new();
    let mut verbatim: Option<String> = None;

    for (index, line) in lines.iter().enumerate() {
        let line_number = index + 1;
        let code = if verbatim.is_some() {
            *line
        } else {
            strip_comment(line)
        };

        for caps in ENVIRONMENT_RE.captures_iter(code) {
            let name = caps[2].trim().to_string();
            let is_begin = &caps[1] == "begin";

            if let Some(open) = &verbatim {
                if is_begin || name != *open {
                    continue;
                }
                verbatim = None;
            }

            if is_begin {
                if VERBATIM_ENVIRONMENTS.contains(&name.as_str()) {
                    verbatim = Some(name.clone());
                }
                stack.push((name, line_number));
                continue;
            }

            match stack.pop() {
                None => issues.push(LintIssue::error(
                    line_number,
                    "environment-balance",
                    format!("\\end{{{}}} without matching \\begin{{{}}}", name, name),
                )),
                Some((open, opened_at)) if open != name => issues.push(LintIssue::error(
                    line_number,
                    "environment-balance",
                    format!(
                        "\\begin{{{}}} on line {} closed by \\end{{{}}}",
                        open, opened_at, name
                    ),
                )),
                Some(_) => {}
            }
        }
    }

    for (name, opened_at) in stack {
        issues.push(LintIssue::error(
            opened_at,
            "environment-balance",
            format!("\\begin{{{}}} is never closed", name),
        ));
    }

    issues
}

/// Only the line right after the frame is inspected for a title command.
fn check_frame_titles(lines: &[&str], verbatim: &[bool]) -> Vec<LintIssue> {
    let mut issues = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        if verbatim[index] {
            continue;
        }
        let Some(caps) = FRAME_BEGIN_RE.captures(strip_comment(line)) else {
            continue;
        };

        let rest = caps.get(2).map_or("", |m| m.as_str()).trim_start();
        if rest.starts_with('{') || rest.starts_with("\\frametitle") || rest.starts_with("\\titlepage") {
            continue;
        }

        let exempt = caps.get(1).is_some_and(|options| {
            options
                .as_str()
                .split(',')
                .map(|option| option.split('=').next().unwrap_or("").trim())
                .any(|option| UNTITLED_FRAME_OPTIONS.contains(&option))
        });
        if exempt {
            continue;
        }

        let next = lines.get(index + 1).map_or("", |next| next.trim_start());
        if next.starts_with("\\frametitle") || next.starts_with("\\titlepage") || next.starts_with("\\maketitle") {
            continue;
        }

        issues.push(LintIssue::warning(
            index + 1,
            "frame-title",
            "Frame has no title".to_string(),
        ));
    }

    issues
}

fn check_underscores(lines: &[&str], verbatim: &[bool]) -> Vec<LintIssue> {
    let mut issues = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        if verbatim[index] {
            continue;
        }

        let mut text = strip_comment(line).to_string();
        for re in UNDERSCORE_SAFE_RES.iter() {
            text = re.replace_all(&text, "").into_owned();
        }

        if text.contains('_') {
            issues.push(LintIssue::warning(
                index + 1,
                "unescaped-underscore",
                "Unescaped underscore outside math mode".to_string(),
            ));
        }
    }

    issues
}
