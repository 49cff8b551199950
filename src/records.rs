//! Structured records carried inside message payloads.
//!
//! Stages exchange strings on the bus; this module defines the envelope those
//! strings encode and the record types materialized from it. Records are
//! derived views over message content: they are produced once at parse time
//! (inside an action) and again at aggregation time, never stored apart from
//! the messages that carry them.

use serde::{Deserialize, Serialize};

use crate::message::StageName;

/// Category tag used when a stage's raw output could not be parsed at all.
pub const PARSE_ERROR_TYPE: &str = "parse error";

/// Category tag used when the completion service failed or timed out.
pub const SERVICE_ERROR_TYPE: &str = "service error";

/// Sentinel surfaced in place of an empty error list.
pub const NO_ISSUES_SENTINEL: &str = "no issues found";

/// Sentinel surfaced in place of an empty correction list.
pub const NO_CORRECTIONS_SENTINEL: &str = "no corrections made";

/// Default suggestion when a record omits one.
pub const NO_SUGGESTION: &str = "no specific suggestion";

/// A single finding reported by a reviewing stage.
///
/// Missing fields in the raw service output are filled with documented
/// sentinels by the [parser](crate::parser) rather than aborting the batch.
/// `unresolved` is set by the aggregator when `element` names an identifier
/// that does not exist in the reviewed graph; such records are retained, not
/// dropped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Name of the reporting stage.
    pub source: StageName,
    /// Category tag, e.g. "deadlock", "description_mismatch", "parse error".
    pub error_type: String,
    pub description: String,
    pub suggestion: String,
    /// Identifier of the diagram element the finding refers to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<String>,
    /// True when `element` could not be resolved against the reviewed graph.
    #[serde(default)]
    pub unresolved: bool,
}

impl ErrorRecord {
    pub fn new(
        source: StageName,
        error_type: impl Into<String>,
        description: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self {
            source,
            error_type: error_type.into(),
            description: description.into(),
            suggestion: suggestion.into(),
            element: None,
            unresolved: false,
        }
    }

    #[must_use]
    pub fn with_element(mut self, element: impl Into<String>) -> Self {
        self.element = Some(element.into());
        self
    }
}

/// Summary of what a corrector changed, computed as a structural diff between
/// the original and the corrected graph description.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModificationSummary {
    pub changed_element_count: usize,
    pub change_descriptions: Vec<String>,
}

/// A corrected diagram produced by a corrector stage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionRecord {
    /// Name of the correcting stage.
    pub source: StageName,
    /// Corrected graph description text, normalized of formatting artifacts.
    pub corrected_diagram: String,
    pub modifications: ModificationSummary,
    /// Log sequence position of the carrying message. Zero until the
    /// aggregator materializes the record from the log.
    #[serde(default)]
    pub produced_at: u64,
}

/// Envelope encoded into [`Message::content`](crate::message::Message).
///
/// `Empty` is the sentinel "no result" payload: a stage that cannot produce
/// output still publishes one so downstream joins are never starved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    /// A textual graph description, e.g. the seed diagram.
    Diagram { text: String },
    /// Findings from a reviewing stage. May be empty.
    Review { records: Vec<ErrorRecord> },
    /// A corrected diagram from a corrector stage.
    Correction { record: CorrectionRecord },
    /// Sentinel published when a stage had nothing to contribute.
    Empty { reason: String },
}

impl Payload {
    /// Encodes the payload for the wire. Encoding a payload built from owned
    /// data cannot fail; a breakage here is a programming error, so the
    /// fallback keeps the bus moving with an explicit sentinel.
    #[must_use]
    pub fn encode(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|e| format!("{{\"kind\":\"empty\",\"reason\":\"encode failure: {e}\"}}"))
    }

    /// Decodes a message content string; `None` when the content is not a
    /// payload envelope (e.g. foreign messages on a shared log).
    #[must_use]
    pub fn decode(content: &str) -> Option<Self> {
        serde_json::from_str(content).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_round_trips_review() {
        let payload = Payload::Review {
            records: vec![
                ErrorRecord::new(
                    StageName::new("checker"),
                    "deadlock",
                    "parallel branches never merge",
                    "add a join gateway",
                )
                .with_element("gw_2"),
            ],
        };
        let decoded = Payload::decode(&payload.encode()).expect("decodes");
        assert_eq!(decoded, payload);
    }

    #[test]
    fn decode_rejects_non_envelope_content() {
        assert_eq!(Payload::decode("digraph { a -> b }"), None);
        assert_eq!(Payload::decode(""), None);
    }
}
