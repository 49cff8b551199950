//! DOT rendering and best-effort DOT extraction.
//!
//! `to_dot` is the canonical, deterministic serialization every stage reads;
//! `from_dot` interprets corrector replies, which arrive with the usual
//! service noise (fences, stray attributes, implicit nodes).

use rustc_hash::FxHashSet;

use super::{Element, ElementKind, Flow, GraphDescription};
use crate::parser::normalize_diagram_text;

impl ElementKind {
    fn dot_attrs(self) -> &'static str {
        match self {
            ElementKind::Task => "shape=rectangle, style=filled, fillcolor=\"#90EE90\"",
            ElementKind::Event => "shape=circle, style=filled, fillcolor=\"#FFD700\"",
            ElementKind::Gateway => "shape=diamond, style=filled, fillcolor=\"#FFA07A\"",
            ElementKind::Unspecified => "shape=box",
        }
    }

    fn from_shape(shape: &str) -> Self {
        match shape {
            "rectangle" | "box" | "rect" => ElementKind::Task,
            "circle" | "doublecircle" | "ellipse" | "oval" => ElementKind::Event,
            "diamond" => ElementKind::Gateway,
            _ => ElementKind::Unspecified,
        }
    }
}

fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

fn unquote(token: &str) -> String {
    token
        .trim()
        .trim_end_matches(';')
        .trim()
        .trim_matches('"')
        .to_string()
}

impl GraphDescription {
    /// Renders the canonical DOT form: stable ordering, left-to-right layout,
    /// per-kind shapes. Every element id appears verbatim as a quoted node id.
    #[must_use]
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph process {\n  rankdir=LR;\n  splines=ortho;\n");
        for element in &self.elements {
            out.push_str(&format!(
                "  {} [label={}, {}];\n",
                quote(&element.id),
                quote(&element.label),
                element.kind.dot_attrs()
            ));
        }
        for flow in &self.flows {
            out.push_str(&format!(
                "  {} -> {};\n",
                quote(&flow.from),
                quote(&flow.to)
            ));
        }
        out.push_str("}\n");
        out
    }

    /// Extracts a graph description from DOT-like text, best effort.
    ///
    /// Statements that declare edges or nodes are interpreted; the graph
    /// header and layout statements are skipped; anything else is dropped
    /// with a recorded warning. Elements referenced only by edges are
    /// registered implicitly so their identifiers stay addressable.
    #[must_use]
    pub fn from_dot(text: &str) -> (Self, Vec<String>) {
        let cleaned = normalize_diagram_text(text);
        let body = graph_body(&cleaned);
        let mut graph = GraphDescription::default();
        let mut warnings = Vec::new();
        let mut seen: FxHashSet<String> = FxHashSet::default();

        for statement in body.split([';', '\n']) {
            let statement = statement.trim();
            if statement.is_empty() || is_structural(statement) {
                continue;
            }

            if statement.contains("->") {
                let hops: Vec<String> = statement
                    .split("->")
                    .map(|hop| unquote(strip_attributes(hop)))
                    .collect();
                if hops.iter().any(String::is_empty) {
                    warnings.push(format!("dropped malformed edge statement: {statement}"));
                    continue;
                }
                for pair in hops.windows(2) {
                    graph.push_flow(Flow {
                        from: pair[0].clone(),
                        to: pair[1].clone(),
                    });
                }
                continue;
            }

            match parse_node_line(statement) {
                Some(element) => {
                    if seen.insert(element.id.clone()) {
                        graph.push_element(element);
                    }
                }
                None => warnings.push(format!("dropped unrecognized statement: {statement}")),
            }
        }

        // Endpoints that were never declared still need to be addressable.
        let declared: FxHashSet<String> = graph.elements.iter().map(|e| e.id.clone()).collect();
        let implicit: Vec<String> = graph
            .flows
            .iter()
            .flat_map(|f| [f.from.clone(), f.to.clone()])
            .filter(|id| !declared.contains(id))
            .collect();
        for id in implicit {
            if seen.insert(id.clone()) {
                graph.push_element(Element {
                    label: id.clone(),
                    id,
                    kind: ElementKind::Unspecified,
                });
            }
        }

        (graph, warnings)
    }
}

/// Cuts the `digraph <name> { ... }` wrapper away, leaving the statement
/// body. Text without a recognizable header is treated as body already.
fn graph_body(text: &str) -> &str {
    let trimmed = text.trim_start();
    let lowered = trimmed.to_ascii_lowercase();
    if !(lowered.starts_with("digraph") || lowered.starts_with("graph")) {
        return text;
    }
    let Some(open) = trimmed.find('{') else {
        return text;
    };
    let inner = &trimmed[open + 1..];
    match inner.rfind('}') {
        Some(close) => &inner[..close],
        None => inner,
    }
}

fn is_structural(statement: &str) -> bool {
    let lowered = statement.to_ascii_lowercase();
    lowered.starts_with("digraph")
        || lowered.starts_with("graph")
        || lowered.starts_with("subgraph")
        || lowered.starts_with("node ")
        || lowered.starts_with("node[")
        || lowered.starts_with("edge ")
        || lowered.starts_with("edge[")
        || lowered.starts_with("rankdir")
        || lowered.starts_with("splines")
        || lowered.starts_with("ranksep")
        || lowered.starts_with("compound")
        || lowered == "{"
        || lowered == "}"
}

fn strip_attributes(token: &str) -> &str {
    match token.find('[') {
        Some(pos) => &token[..pos],
        None => token,
    }
}

fn parse_node_line(line: &str) -> Option<Element> {
    let (id_part, attrs) = match line.find('[') {
        Some(pos) => {
            let attrs = line[pos + 1..].trim_end_matches([';', ']']).to_string();
            (&line[..pos], attrs)
        }
        None => (line, String::new()),
    };
    let id = unquote(id_part);
    if id.is_empty() || id.contains(char::is_whitespace) {
        return None;
    }

    let label = attr_value(&attrs, "label").unwrap_or_else(|| id.clone());
    let kind = attr_value(&attrs, "shape")
        .map(|shape| ElementKind::from_shape(&shape))
        .unwrap_or(ElementKind::Unspecified);
    Some(Element { id, label, kind })
}

/// Pulls a single `key=value` attribute out of a DOT attribute list, with or
/// without quoting. Good enough for label/shape; ignores everything else.
fn attr_value(attrs: &str, key: &str) -> Option<String> {
    let pos = attrs.find(key)?;
    let rest = attrs[pos + key.len()..].trim_start();
    let rest = rest.strip_prefix('=')?.trim_start();
    if let Some(stripped) = rest.strip_prefix('"') {
        let end = stripped.find('"')?;
        Some(stripped[..end].to_string())
    } else {
        let end = rest
            .find([',', ']', ' '])
            .unwrap_or(rest.len());
        Some(rest[..end].trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_round_trip_preserves_ids_and_kinds() {
        let mut graph = GraphDescription::default();
        graph.push_element(Element {
            id: "start".into(),
            label: "Start".into(),
            kind: ElementKind::Event,
        });
        graph.push_element(Element {
            id: "review".into(),
            label: "Review order".into(),
            kind: ElementKind::Task,
        });
        graph.push_flow(Flow {
            from: "start".into(),
            to: "review".into(),
        });

        let (parsed, warnings) = GraphDescription::from_dot(&graph.to_dot());
        assert!(warnings.is_empty());
        assert_eq!(parsed.element_ids(), graph.element_ids());
        assert_eq!(parsed.flows, graph.flows);
        assert_eq!(parsed.elements[0].kind, ElementKind::Event);
        assert_eq!(parsed.elements[1].label, "Review order");
    }

    #[test]
    fn edge_only_nodes_are_registered_implicitly() {
        let (graph, _) = GraphDescription::from_dot("digraph { a -> b -> c }");
        assert_eq!(graph.elements.len(), 3);
        assert_eq!(graph.flows.len(), 2);
        assert!(graph.contains_element("c"));
    }

    #[test]
    fn fenced_corrector_reply_is_tolerated() {
        let raw = "```dot\ndigraph process {\n  \"a\" [label=\"A\", shape=circle];\n  \"a\" -> \"b\";\n}\n```";
        let (graph, _) = GraphDescription::from_dot(raw);
        assert!(graph.contains_element("a"));
        assert!(graph.contains_element("b"));
        assert_eq!(graph.elements[0].kind, ElementKind::Event);
    }

    #[test]
    fn garbage_lines_produce_warnings_not_failures() {
        let (graph, warnings) =
            GraphDescription::from_dot("digraph {\n  a;\n  %% not dot at all\n}");
        assert!(graph.contains_element("a"));
        assert_eq!(warnings.len(), 1);
    }
}
