// ABOUTME: Library module for the beamer-slides program.
// ABOUTME: Contains Markdown to Beamer conversion, HTML export, linting, building and watching.

// Reexport modules
pub mod config;
pub mod diagram;
pub mod document;
pub mod errors;
pub mod html;
pub mod inline;
pub mod lint;
pub mod markdown;
pub mod render;
pub mod resources;
pub mod table;
pub mod themes;
pub mod utils;
pub mod watch;

// Reexport common types and functions
pub use config::Config;
pub use document::{generate_latex, markdown_to_latex, DocumentOptions};
pub use errors::{Result, SlidesError};
pub use html::{generate_html, latex_source_to_html, write_html_to_file, HtmlOptions};
pub use inline::{escape_latex, format_inline};
pub use lint::{build_blockers, format_report, lint_file, lint_source, LintIssue, LintSummary, Severity};
pub use markdown::{parse_markdown, ParsedMarkdown, Slide};
pub use render::{compile_document, render_pages, CompileConfig, PageRange, PreviewConfig};
pub use resources::ResourceFile;
pub use themes::{CustomTheme, ThemeStore};
pub use watch::{watch_source, RebuildScheduler, WatchConfig};

#[cfg(test)]
mod tests;
