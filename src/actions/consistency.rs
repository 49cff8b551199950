//! Consistency review between the diagram and its textual description.

use std::sync::Arc;

use async_trait::async_trait;

use super::{Action, guarded_completion};
use crate::bus::MemoryView;
use crate::config::StageConfig;
use crate::event::EventEmitter;
use crate::message::StageName;
use crate::parser::parse_error_records;
use crate::records::{ErrorRecord, Payload, SERVICE_ERROR_TYPE};
use crate::services::CompletionService;

const PROMPT_TEMPLATE: &str = r#"Compare the following process graph with the text
description and identify inconsistencies. Do not propose a corrected graph.

Process graph:
{diagram}

Text description:
{description}

Requirements:
1. Describe each inconsistency in a user-readable way.
2. Include the context of the specific elements involved.
3. The final output must be a valid, machine-readable JSON array with no
   extra explanation and no markdown formatting.

Respond in this shape:
{"error_type": "description_mismatch", "errors": [
  {"element_id": "...", "description": "...", "suggestion": "..."}
]}"#;

/// Compares the diagram against the free-text process description held as
/// role-local context, supplied at construction.
pub struct ConsistencyCheck {
    service: Arc<dyn CompletionService>,
    config: StageConfig,
    description: String,
}

impl ConsistencyCheck {
    pub const NAME: &'static str = "consistency_check";

    pub fn new(
        service: Arc<dyn CompletionService>,
        config: StageConfig,
        description: impl Into<String>,
    ) -> Self {
        Self {
            service,
            config,
            description: description.into(),
        }
    }
}

#[async_trait]
impl Action for ConsistencyCheck {
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

        let prompt = PROMPT_TEMPLATE
            .replace("{diagram}", &diagram)
            .replace("{description}", &self.description);
        match guarded_completion(self.service.as_ref(), &self.config, &prompt, stage, events).await
        {
            Ok(reply) => Payload::Review {
                records: parse_error_records(stage, &reply),
            },
            Err(reason) => Payload::Review {
                records: vec![ErrorRecord::new(
                    stage.clone(),
                    SERVICE_ERROR_TYPE,
                    format!("consistency review unavailable: {reason}"),
                    "retry once the completion backend is reachable",
                )],
            },
        }
    }
}
