//! Correction of the diagram from the accumulated review reports.

use std::sync::Arc;

use async_trait::async_trait;

use super::{Action, guarded_completion};
use crate::bus::MemoryView;
use crate::config::StageConfig;
use crate::diagram::{GraphDescription, summarize_changes};
use crate::event::EventEmitter;
use crate::message::StageName;
use crate::parser::normalize_diagram_text;
use crate::records::{CorrectionRecord, Payload};
use crate::services::CompletionService;

const PROMPT_TEMPLATE: &str = r#"You are a correction expert for BPMN 2.0 process
graphs in DOT notation. Produce a corrected version of the graph below so it can
be rendered directly.

Original process graph:
{diagram}

Identified issues (prioritized):
{report}

Requirements:
1. Correct the identified issues in the DOT code.
2. Node attributes belong in brackets, comma separated, e.g. a [label="Start"].
3. The output must be valid DOT, usable by a renderer as-is.
4. Respond with the corrected DOT code only — no explanation, no markdown
   formatting."#;

/// Rewrites the diagram according to every review on the log, emitting the
/// corrected graph with a structural modification summary.
///
/// When no reviewer reported anything, the stage publishes its sentinel
/// without spending a completion call.
pub struct Correction {
    service: Arc<dyn CompletionService>,
    config: StageConfig,
}

impl Correction {
    pub const NAME: &'static str = "correction";

    pub fn new(service: Arc<dyn CompletionService>, config: StageConfig) -> Self {
        Self { service, config }
    }
}

#[async_trait]
impl Action for Correction {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn run(
        &self,
        stage: &StageName,
        memory: MemoryView<'_>,
        events: &EventEmitter,
    ) -> Payload {
        let Some(diagram) = memory.seed_diagram() else {
            return Payload::Empty {
                reason: "no diagram description available".to_string(),
            };
        };
        let records = memory.latest_review_records();
        if records.is_empty() {
            return Payload::Empty {
                reason: "no corrections required".to_string(),
            };
        }

        let report = serde_json::to_string_pretty(&records)
            .unwrap_or_else(|_| "[]".to_string());
        let prompt = PROMPT_TEMPLATE
            .replace("{diagram}", &diagram)
            .replace("{report}", &report);

        let reply =
            match guarded_completion(self.service.as_ref(), &self.config, &prompt, stage, events)
                .await
            {
                Ok(reply) => reply,
                Err(reason) => {
                    return Payload::Empty {
                        reason: format!("correction unavailable: {reason}"),
                    };
                }
            };

        let corrected = normalize_diagram_text(&reply);
        if corrected.is_empty() {
            return Payload::Empty {
                reason: "correction reply was empty".to_string(),
            };
        }

        let (before, _) = GraphDescription::from_dot(&diagram);
        let (after, warnings) = GraphDescription::from_dot(&corrected);
        for warning in warnings {
            tracing::debug!(target: "flowlint::actions", stage = %stage, "{warning}");
        }

        Payload::Correction {
            record: CorrectionRecord {
                source: stage.clone(),
                corrected_diagram: corrected,
                modifications: summarize_changes(&before, &after),
                produced_at: 0,
            },
        }
    }
}
