// ABOUTME: Diagram translation module for the beamer-slides application
// ABOUTME: Converts a small mermaid flowchart subset into a TikZ picture with a linear node chain

use crate::inline::escape_latex;
use indexmap::IndexMap;
use log::{debug, warn};
use regex::Regex;
use std::sync::LazyLock;

/// A node reference inside a flowchart line: `id` or `id[label]`
static NODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9_]+)\s*(?:\[([^\]]*)\])?$").expect("Invalid diagram node regex")
});

/// Edge label written right after an arrow: `-->|label| B`
static EDGE_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\|[^|]*\|\s*").expect("Invalid diagram edge label regex"));

/// Placement direction for the node chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Right,
    Below,
}

impl Direction {
    fn tikz_keyword(self) -> &'static str {
        match self {
            Direction::Right => "right",
            Direction::Below => "below",
        }
    }
}

/// Parsed flowchart: nodes in first-seen order plus edges in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramGraph {
    pub direction: Direction,
    pub nodes: IndexMap<String, String>,
    pub edges: Vec<(String, String)>,
}

impl Default for DiagramGraph {
    fn default() -> Self {
        Self {
            direction: Direction::Below,
            nodes: IndexMap::new(),
            edges: Vec::new(),
        }
    }
}

impl DiagramGraph {
    /// Register a node seen as an edge endpoint. An existing label is kept.
    fn register(&mut self, id: &str, label: Option<&str>) {
        if !self.nodes.contains_key(id) {
            self.nodes
                .insert(id.to_string(), label.unwrap_or(id).to_string());
        }
    }

    /// Register a standalone node declaration, overwriting any label.
    fn declare(&mut self, id: &str, label: &str) {
        self.nodes.insert(id.to_string(), label.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Parse a mermaid-style flowchart.
///
/// Supported lines are the `graph`/`flowchart` header, edges
/// (`A[One] --> B[Two]`, optionally chained and with `|label|` edge text,
/// which is discarded) and bare node declarations (`A[One]`). Anything else
/// is skipped.
pub fn parse_diagram(source: &str) -> DiagramGraph {
    let mut graph = DiagramGraph::default();

    for line in source.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("%%") {
            continue;
        }

        if trimmed.split_whitespace().any(|token| token == "LR") {
            graph.direction = Direction::Right;
        }

        if trimmed.starts_with("graph") || trimmed.starts_with("flowchart") {
            continue;
        }

        if let Some(chain) = parse_edge_chain(trimmed) {
            for (id, label) in &chain {
                graph.register(id, label.as_deref());
            }
            for pair in chain.windows(2) {
                graph.edges.push((pair[0].0.clone(), pair[1].0.clone()));
            }
            continue;
        }

        match NODE_RE.captures(trimmed) {
            Some(caps) if caps.get(2).is_some() => {
                graph.declare(&caps[1], &clean_label(&caps[2]));
            }
            _ => debug!("Skipping unrecognised diagram line: {}", trimmed),
        }
    }

    graph
}

/// Split `A[x] --> B --> C[y]` into its endpoints. Returns `None` unless
/// the line has at least one arrow and every endpoint is a valid node.
fn parse_edge_chain(line: &str) -> Option<Vec<(String, Option<String>)>> {
    let segments: Vec<&str> = line.split("-->").collect();
    if segments.len() < 2 {
        return None;
    }

    let mut chain = Vec::with_capacity(segments.len());
    for segment in segments {
        let segment = EDGE_LABEL_RE.replace(segment.trim(), "");
        let caps = NODE_RE.captures(segment.trim())?;
        let label = caps.get(2).map(|m| clean_label(m.as_str()));
        chain.push((caps[1].to_string(), label));
    }

    Some(chain)
}

fn clean_label(label: &str) -> String {
    label.trim().trim_matches('"').trim().to_string()
}

/// TikZ node names may not contain underscores reliably across versions.
fn tikz_id(id: &str) -> String {
    id.replace('_', "-")
}

/// Render a parsed graph as a TikZ picture.
///
/// Placement is a linear chain: every node sits next to the node registered
/// before it, whatever the edges say. Branching graphs therefore render as a
/// straight line with crossing arrows.
pub fn render_tikz(graph: &DiagramGraph) -> String {
    let mut out = String::new();
    out.push_str("\\begin{center}\n");
    out.push_str(
        "\\begin{tikzpicture}[node distance=3cm, every node/.style={draw, rounded corners, align=center, minimum height=1cm}]\n",
    );

    let mut previous: Option<&str> = None;
    for (id, label) in &graph.nodes {
        match previous {
            None => out.push_str(&format!(
                "\\node ({}) {{{}}};\n",
                tikz_id(id),
                escape_latex(label)
            )),
            Some(prev) => out.push_str(&format!(
                "\\node ({}) [{} of={}] {{{}}};\n",
                tikz_id(id),
                graph.direction.tikz_keyword(),
                tikz_id(prev),
                escape_latex(label)
            )),
        }
        previous = Some(id.as_str());
    }

    for (from, to) in &graph.edges {
        out.push_str(&format!(
            "\\draw[->, thick] ({}) -- ({});\n",
            tikz_id(from),
            tikz_id(to)
        ));
    }

    out.push_str("\\end{tikzpicture}\n");
    out.push_str("\\end{center}");
    out
}

/// Translate a mermaid flowchart into a TikZ block, or a comment
/// placeholder when nothing could be parsed.
pub fn mermaid_to_tikz(source: &str) -> String {
    let graph = parse_diagram(source);
    if graph.is_empty() {
        warn!("Diagram block contained no parseable nodes, emitting placeholder");
        return "% diagram: no nodes could be parsed".to_string();
    }
    render_tikz(&graph)
}
