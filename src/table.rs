// ABOUTME: Table rendering module for the beamer-slides application
// ABOUTME: Parses pipe-delimited Markdown table rows and renders them as booktabs tabular blocks

use crate::inline::format_inline;
use log::warn;
use regex::Regex;
use std::sync::LazyLock;

/// Header separator row, e.g. `|---|:---:|`
static SEPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\|?(\s*:?-+:?\s*\|)*\s*:?-+:?\s*\|?$").expect("Invalid table separator regex")
});

/// Whether a line belongs to a pipe table.
pub fn is_table_row(line: &str) -> bool {
    line.trim_start().starts_with('|')
}

/// Whether a table line is the header separator row.
pub fn is_separator_row(line: &str) -> bool {
    SEPARATOR_RE.is_match(line.trim())
}

/// Split a table row into trimmed cells.
///
/// The empty outer cells produced by the leading and trailing pipes are
/// dropped; inner empty cells are kept.
pub fn parse_table_row(line: &str) -> Vec<String> {
    let mut cells: Vec<String> = line
        .trim()
        .split('|')
        .map(|cell| cell.trim().to_string())
        .collect();

    if cells.first().is_some_and(|cell| cell.is_empty()) {
        cells.remove(0);
    }
    if cells.last().is_some_and(|cell| cell.is_empty()) {
        cells.pop();
    }

    cells
}

/// Render a grid of cells as a centered booktabs table.
///
/// The first row is the header and is set in bold. The column count comes
/// from the header: shorter data rows are padded with empty cells, wider rows
/// cannot be placed and are dropped.
pub fn render_table(rows: &[Vec<String>]) -> String {
    let Some((header, data)) = rows.split_first() else {
        return String::new();
    };
    let num_cols = header.len();
    if num_cols == 0 {
        return String::new();
    }

    let mut out = String::new();
    out.push_str("\\begin{center}\n");
    out.push_str(&format!("\\begin{{tabular}}{{{}}}\n", "l".repeat(num_cols)));
    out.push_str("\\toprule\n");

    let header_cells: Vec<String> = header
        .iter()
        .map(|cell| format!("\\textbf{{{}}}", format_inline(cell)))
        .collect();
    out.push_str(&header_cells.join(" & "));
    out.push_str(" \\\\\n");
    out.push_str("\\midrule\n");

    for (index, row) in data.iter().enumerate() {
        if row.len() > num_cols {
            warn!(
                "Dropping table row {} with {} cells (header has {})",
                index + 1,
                row.len(),
                num_cols
            );
            continue;
        }
        let mut cells: Vec<String> = row.iter().map(|cell| format_inline(cell)).collect();
        cells.resize(num_cols, String::new());
        out.push_str(&cells.join(" & "));
        out.push_str(" \\\\\n");
    }

    out.push_str("\\bottomrule\n");
    out.push_str("\\end{tabular}\n");
    out.push_str("\\end{center}");

    out
}
