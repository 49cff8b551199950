//! Extraction of a graph description from an uploaded SVG artifact.
//!
//! Extraction is best effort: every shape that can be resolved becomes an
//! element, connectors with unresolvable endpoints are dropped with a
//! recorded warning, and only a document with no usable shapes at all fails.
//!
//! Recognized markup, matching common process-diagram exports:
//! - `rect`, `circle`, `ellipse`, `polygon` shapes become elements; `id` is
//!   the element identifier, `name` the label, `data-element-type` (task /
//!   event / gateway) the kind, falling back to a tag-based guess.
//! - `path` connectors reference their endpoints through a
//!   `data-flow` / `bpmnElement` attribute of the form `source_..._target`.

use scraper::{Html, Selector};

use super::{ConversionError, Element, ElementKind, Flow, GraphDescription};

fn selector(source: &'static str) -> Selector {
    Selector::parse(source).expect("static selector is well-formed")
}

fn kind_from_type_label(label: &str) -> Option<ElementKind> {
    match label.to_ascii_lowercase().as_str() {
        "task" | "servicetask" | "usertask" => Some(ElementKind::Task),
        "event" | "startevent" | "endevent" => Some(ElementKind::Event),
        "gateway" | "exclusivegateway" | "parallelgateway" => Some(ElementKind::Gateway),
        _ => None,
    }
}

fn kind_from_tag(tag: &str) -> ElementKind {
    match tag {
        "rect" => ElementKind::Task,
        "circle" | "ellipse" => ElementKind::Event,
        "polygon" => ElementKind::Gateway,
        _ => ElementKind::Unspecified,
    }
}

/// Attribute lookup tolerant of the HTML parser lowercasing names.
fn attr<'a>(element: &'a scraper::ElementRef<'a>, name: &str) -> Option<&'a str> {
    let value = element.value();
    value
        .attr(name)
        .or_else(|| value.attr(name.to_ascii_lowercase().as_str()))
}

impl GraphDescription {
    /// Converts an SVG artifact into a graph description plus the warnings
    /// accumulated for dropped or partially specified markup.
    ///
    /// # Errors
    ///
    /// [`ConversionError::Empty`] when not a single element could be
    /// extracted — the only condition the pipeline treats as fatal.
    pub fn from_svg(svg: &str) -> Result<(Self, Vec<String>), ConversionError> {
        let document = Html::parse_document(svg);
        let mut graph = GraphDescription::default();
        let mut warnings = Vec::new();

        let shapes = selector("rect, circle, ellipse, polygon");
        for (index, shape) in document.select(&shapes).enumerate() {
            let tag = shape.value().name();
            let id = match attr(&shape, "id") {
                Some(id) if !id.trim().is_empty() => id.trim().to_string(),
                _ => {
                    let generated = format!("element_{index}");
                    warnings.push(format!(
                        "{tag} without id, assigned generated identifier {generated}"
                    ));
                    generated
                }
            };
            let label = attr(&shape, "name")
                .map(str::to_string)
                .unwrap_or_else(|| id.clone());
            let kind = attr(&shape, "data-element-type")
                .and_then(kind_from_type_label)
                .unwrap_or_else(|| kind_from_tag(tag));

            if graph.contains_element(&id) {
                warnings.push(format!("duplicate element id {id}, keeping first"));
                continue;
            }
            graph.push_element(Element { id, label, kind });
        }

        let connectors = selector("path");
        for connector in document.select(&connectors) {
            let Some(reference) = attr(&connector, "data-flow")
                .or_else(|| attr(&connector, "bpmnElement"))
            else {
                continue;
            };
            let segments: Vec<&str> = reference.split('_').collect();
            if segments.len() < 2 {
                warnings.push(format!("dropped connector with malformed reference {reference}"));
                continue;
            }
            let (from, to) = (segments[0], segments[segments.len() - 1]);
            if !graph.contains_element(from) || !graph.contains_element(to) {
                warnings.push(format!(
                    "dropped connector {reference}: endpoint not present in diagram"
                ));
                continue;
            }
            graph.push_flow(Flow {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        if graph.is_empty() {
            return Err(ConversionError::Empty);
        }

        for warning in &warnings {
            tracing::warn!(target: "flowlint::diagram", "{warning}");
        }
        Ok((graph, warnings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg">
        <circle id="start" name="Start" data-element-type="event"/>
        <rect id="approve" name="Approve order"/>
        <polygon id="gw1" name="Approved?" data-element-type="gateway"/>
        <path data-flow="start_flow1_approve"/>
        <path data-flow="approve_flow2_gw1"/>
        <path data-flow="gw1_flow3_missing"/>
    </svg>"##;

    #[test]
    fn extracts_elements_and_flows() {
        let (graph, warnings) = GraphDescription::from_svg(SAMPLE).expect("convertible");
        assert_eq!(graph.elements.len(), 3);
        assert_eq!(graph.flows.len(), 2);
        assert_eq!(graph.elements[0].kind, ElementKind::Event);
        assert_eq!(graph.elements[1].label, "Approve order");
        // The connector to a missing endpoint is dropped, with a warning.
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("missing"));
    }

    #[test]
    fn shape_without_id_gets_generated_identifier() {
        let svg = r#"<svg><rect name="Orphan"/></svg>"#;
        let (graph, warnings) = GraphDescription::from_svg(svg).expect("convertible");
        assert_eq!(graph.elements[0].id, "element_0");
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn empty_document_is_a_conversion_failure() {
        assert!(matches!(
            GraphDescription::from_svg("<svg></svg>"),
            Err(ConversionError::Empty)
        ));
        assert!(matches!(
            GraphDescription::from_svg("this is not svg at all"),
            Err(ConversionError::Empty)
        ));
    }

    #[test]
    fn round_trip_preserves_identifier_set() {
        let (graph, _) = GraphDescription::from_svg(SAMPLE).expect("convertible");
        let (reparsed, _) = GraphDescription::from_dot(&graph.to_dot());
        assert_eq!(reparsed.element_ids(), graph.element_ids());
    }
}
