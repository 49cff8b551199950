//! Reduction of the finished log into the final report.
//!
//! The aggregator is a pure function of the ordered message log: one scan,
//! last write wins per producing stage. In wirings that allow re-review
//! loops only the most recent assessment of a stage is meaningful — earlier
//! records are superseded, never merged. Running the aggregator twice over
//! the same log yields a structurally identical result.

use std::path::{Path, PathBuf};

use serde_json::{Value, json};

use crate::diagram::GraphDescription;
use crate::message::{Message, StageName};
use crate::parser::normalize_diagram_text;
use crate::records::{
    CorrectionRecord, ErrorRecord, NO_CORRECTIONS_SENTINEL, NO_ISSUES_SENTINEL, Payload,
};
use crate::services::ArtifactRef;

/// The outcome of a completed run.
///
/// `errors` holds at most one record per distinct reporting stage and
/// `corrections` at most one per distinct corrector, both in the order the
/// stages first appeared on the log. `diagram_text` is the normalized graph
/// description chosen for rendering — the latest correction, or the seed
/// when no corrector produced one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Report {
    /// Rendered artifact, when the renderer collaborator succeeded.
    pub final_diagram: Option<ArtifactRef>,
    pub diagram_text: String,
    pub errors: Vec<ErrorRecord>,
    pub corrections: Vec<CorrectionRecord>,
}

impl Report {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.corrections.is_empty()
    }

    /// The persisted-artifact view of the error list: explicit sentinel in
    /// place of an empty list, never an omitted field.
    #[must_use]
    pub fn suggestions_json(&self) -> Value {
        if self.errors.is_empty() {
            json!([NO_ISSUES_SENTINEL])
        } else {
            json!(self.errors)
        }
    }

    /// The persisted-artifact view of the correction list.
    #[must_use]
    pub fn corrections_json(&self) -> Value {
        if self.corrections.is_empty() {
            json!([NO_CORRECTIONS_SENTINEL])
        } else {
            json!(self.corrections)
        }
    }

    /// The run artifact document: `{diagram_svg, suggestions, corrections}`.
    #[must_use]
    pub fn to_artifact_json(&self) -> Value {
        json!({
            "diagram_svg": self.final_diagram.as_ref().map(ArtifactRef::as_str),
            "suggestions": self.suggestions_json(),
            "corrections": self.corrections_json(),
        })
    }

    /// Writes the run artifact document into `dir` for durability and
    /// post-hoc inspection, returning the written path.
    ///
    /// # Errors
    ///
    /// Propagates filesystem errors from directory creation or the write.
    pub fn write_artifact(&self, dir: &Path) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join("latest_report.json");
        let body = serde_json::to_string_pretty(&self.to_artifact_json())
            .expect("artifact document serializes");
        std::fs::write(&path, body)?;
        Ok(path)
    }
}

/// Aggregated view of the log before rendering: the chosen diagram text plus
/// the last-write-wins record sets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Aggregate {
    pub diagram_text: String,
    pub errors: Vec<ErrorRecord>,
    pub corrections: Vec<CorrectionRecord>,
}

impl Aggregate {
    /// Pairs the aggregate with the rendered artifact (or `None` when the
    /// renderer was absent or failed).
    #[must_use]
    pub fn into_report(self, final_diagram: Option<ArtifactRef>) -> Report {
        Report {
            final_diagram,
            diagram_text: self.diagram_text,
            errors: self.errors,
            corrections: self.corrections,
        }
    }
}

/// Reduces a finished log to its aggregate. Pure: no mutation of the log, no
/// dependence on anything but the log contents and the seed graph.
#[must_use]
pub fn aggregate(log: &[Message], seed: &GraphDescription) -> Aggregate {
    // Last-seen record (of the last-seen record set) per reviewing stage,
    // keyed in first-appearance order. None marks a stage whose latest
    // review reported nothing.
    let mut reviews: Vec<(StageName, Option<ErrorRecord>)> = Vec::new();
    let mut corrections: Vec<(StageName, CorrectionRecord)> = Vec::new();

    for message in log {
        match Payload::decode(&message.content) {
            Some(Payload::Review { records }) => {
                let latest = records.into_iter().last();
                upsert(&mut reviews, &message.producer, latest);
            }
            Some(Payload::Correction { mut record }) => {
                record.produced_at = message.sequence;
                upsert(&mut corrections, &message.producer, record);
            }
            _ => {}
        }
    }

    let mut errors: Vec<ErrorRecord> = reviews.into_iter().filter_map(|(_, r)| r).collect();
    for record in &mut errors {
        if let Some(element) = &record.element {
            record.unresolved = !seed.contains_element(element);
            if record.unresolved {
                tracing::warn!(
                    target: "flowlint::aggregator",
                    source = %record.source,
                    element = %element,
                    "finding references an element absent from the reviewed graph"
                );
            }
        }
    }

    let corrections: Vec<CorrectionRecord> = corrections.into_iter().map(|(_, r)| r).collect();
    let chosen = corrections
        .iter()
        .max_by_key(|record| record.produced_at)
        .map(|record| record.corrected_diagram.clone())
        .unwrap_or_else(|| seed.to_dot());

    Aggregate {
        diagram_text: normalize_diagram_text(&chosen),
        errors,
        corrections,
    }
}

fn upsert<T>(entries: &mut Vec<(StageName, T)>, key: &StageName, value: T) {
    match entries.iter_mut().find(|(existing, _)| existing == key) {
        Some((_, slot)) => *slot = value,
        None => entries.push((key.clone(), value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageDraft;
    use crate::records::ModificationSummary;

    fn seed() -> GraphDescription {
        GraphDescription::from_dot("digraph { a -> b }").0
    }

    fn review_message(stage: &str, records: Vec<ErrorRecord>, sequence: u64) -> Message {
        MessageDraft::broadcast(
            StageName::new(stage),
            "review",
            Payload::Review { records }.encode(),
        )
        .into_message(sequence)
    }

    #[test]
    fn later_review_supersedes_earlier_one() {
        let stage = StageName::new("checker");
        let first = ErrorRecord::new(stage.clone(), "orphan", "first", "s");
        let second = ErrorRecord::new(stage.clone(), "deadlock", "second", "s");
        let log = vec![
            review_message("checker", vec![first], 0),
            review_message("checker", vec![second.clone()], 1),
        ];
        let aggregate = aggregate(&log, &seed());
        assert_eq!(aggregate.errors, vec![second]);
    }

    #[test]
    fn empty_latest_review_clears_a_stage() {
        let stage = StageName::new("checker");
        let first = ErrorRecord::new(stage, "orphan", "first", "s");
        let log = vec![
            review_message("checker", vec![first], 0),
            review_message("checker", vec![], 1),
        ];
        assert!(aggregate(&log, &seed()).errors.is_empty());
    }

    #[test]
    fn unresolved_elements_are_marked_not_dropped() {
        let stage = StageName::new("checker");
        let known = ErrorRecord::new(stage.clone(), "t", "d", "s").with_element("a");
        let unknown = ErrorRecord::new(stage, "t", "d", "s").with_element("ghost");
        let log = vec![
            review_message("checker", vec![known], 0),
            review_message("text_checker", vec![unknown], 1),
        ];
        let aggregate = aggregate(&log, &seed());
        assert_eq!(aggregate.errors.len(), 2);
        assert!(!aggregate.errors[0].unresolved);
        assert!(aggregate.errors[1].unresolved);
    }

    #[test]
    fn aggregation_is_idempotent_over_an_unchanged_log() {
        let stage = StageName::new("checker");
        let record = ErrorRecord::new(stage, "t", "d", "s");
        let log = vec![review_message("checker", vec![record], 0)];
        let seed = seed();
        assert_eq!(aggregate(&log, &seed), aggregate(&log, &seed));
    }

    #[test]
    fn final_diagram_is_the_highest_sequence_correction() {
        let correction = |stage: &str, dot: &str, sequence: u64| {
            MessageDraft::broadcast(
                StageName::new(stage),
                "correction",
                Payload::Correction {
                    record: CorrectionRecord {
                        source: StageName::new(stage),
                        corrected_diagram: dot.to_string(),
                        modifications: ModificationSummary::default(),
                        produced_at: 0,
                    },
                }
                .encode(),
            )
            .into_message(sequence)
        };
        let log = vec![
            correction("corrector", "digraph { a -> b -> c }", 3),
            correction("fast_corrector", "digraph { a -> c }", 4),
        ];
        let aggregate = aggregate(&log, &seed());
        assert_eq!(aggregate.corrections.len(), 2);
        assert_eq!(aggregate.diagram_text, "digraph { a -> c }");
        assert_eq!(aggregate.corrections[0].produced_at, 3);
    }

    #[test]
    fn clean_run_falls_back_to_seed_and_sentinels() {
        let aggregate = aggregate(&[], &seed());
        assert!(aggregate.errors.is_empty());
        let report = aggregate.into_report(None);
        assert!(report.is_clean());
        assert_eq!(report.suggestions_json(), json!([NO_ISSUES_SENTINEL]));
        assert_eq!(report.corrections_json(), json!([NO_CORRECTIONS_SENTINEL]));
        let artifact = report.to_artifact_json();
        assert_eq!(artifact["diagram_svg"], Value::Null);
    }
}
