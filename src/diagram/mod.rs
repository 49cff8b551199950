//! The diagram boundary: graph descriptions and conversions in and out.
//!
//! Pipeline stages never see a visual artifact; they operate on a
//! [`GraphDescription`], the textual node/edge representation extracted from
//! the uploaded diagram. This module owns that type, its best-effort
//! conversions (`from_svg`, `from_dot`, `to_dot`), and the structural diff
//! used to summarize corrections.

mod dot;
mod svg;

use miette::Diagnostic;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Category of a process element, driving shape/style on rendering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Task,
    Event,
    Gateway,
    Unspecified,
}

impl ElementKind {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            ElementKind::Task => "task",
            ElementKind::Event => "event",
            ElementKind::Gateway => "gateway",
            ElementKind::Unspecified => "element",
        }
    }
}

/// A node of the process graph. `id` is the stable identifier downstream
/// error records address; it must survive every conversion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub id: String,
    pub label: String,
    pub kind: ElementKind,
}

/// A directed sequence flow between two elements, referenced by id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Flow {
    pub from: String,
    pub to: String,
}

/// Textual node/edge representation of a process diagram.
///
/// # Examples
///
/// ```
/// use flowlint::diagram::{Element, ElementKind, Flow, GraphDescription};
///
/// let mut graph = GraphDescription::default();
/// graph.push_element(Element {
///     id: "start".into(),
///     label: "Start".into(),
///     kind: ElementKind::Event,
/// });
/// graph.push_element(Element {
///     id: "review".into(),
///     label: "Review order".into(),
///     kind: ElementKind::Task,
/// });
/// graph.push_flow(Flow { from: "start".into(), to: "review".into() });
///
/// assert!(graph.contains_element("review"));
/// assert!(graph.to_dot().contains("\"start\" -> \"review\""));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GraphDescription {
    pub elements: Vec<Element>,
    pub flows: Vec<Flow>,
}

/// The source artifact yielded no graph description at all. This is the one
/// failure the pipeline cannot degrade around: there is nothing to review.
#[derive(Debug, Error, Diagnostic)]
pub enum ConversionError {
    #[error("no process elements could be extracted from the diagram artifact")]
    #[diagnostic(
        code(flowlint::diagram::empty),
        help("Check that the upload is an SVG export containing shape elements.")
    )]
    Empty,
}

impl GraphDescription {
    pub fn push_element(&mut self, element: Element) {
        self.elements.push(element);
    }

    pub fn push_flow(&mut self, flow: Flow) {
        self.flows.push(flow);
    }

    #[must_use]
    pub fn contains_element(&self, id: &str) -> bool {
        self.elements.iter().any(|e| e.id == id)
    }

    #[must_use]
    pub fn element_ids(&self) -> FxHashSet<&str> {
        self.elements.iter().map(|e| e.id.as_str()).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    fn element(&self, id: &str) -> Option<&Element> {
        self.elements.iter().find(|e| e.id == id)
    }
}

/// Structural diff between two graph descriptions.
///
/// Compares element and flow sets by identifier, plus label changes on
/// surviving elements. This is diagram-aware where a character-level diff is
/// not: moving a definition around the text changes nothing here.
#[must_use]
pub fn summarize_changes(
    before: &GraphDescription,
    after: &GraphDescription,
) -> crate::records::ModificationSummary {
    let before_ids = before.element_ids();
    let mut descriptions = Vec::new();

    for element in &after.elements {
        if !before_ids.contains(element.id.as_str()) {
            descriptions.push(format!(
                "added {} \"{}\"",
                element.kind.label(),
                element.id
            ));
        }
    }
    for element in &before.elements {
        match after.element(&element.id) {
            None => descriptions.push(format!(
                "removed {} \"{}\"",
                element.kind.label(),
                element.id
            )),
            Some(updated) if updated.label != element.label => descriptions.push(format!(
                "relabeled \"{}\": \"{}\" -> \"{}\"",
                element.id, element.label, updated.label
            )),
            Some(_) => {}
        }
    }

    let before_flows: FxHashSet<&Flow> = before.flows.iter().collect();
    let after_flows: FxHashSet<&Flow> = after.flows.iter().collect();
    for flow in &after.flows {
        if !before_flows.contains(flow) {
            descriptions.push(format!("added flow {} -> {}", flow.from, flow.to));
        }
    }
    for flow in &before.flows {
        if !after_flows.contains(flow) {
            descriptions.push(format!("removed flow {} -> {}", flow.from, flow.to));
        }
    }

    crate::records::ModificationSummary {
        changed_element_count: descriptions.len(),
        change_descriptions: descriptions,
    }
}
