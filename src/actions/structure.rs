//! Structural review of the process graph.

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

const PROMPT_TEMPLATE: &str = r#"You are a BPMN 2.0 process validation expert.
Strictly analyze the following process graph (DOT notation) for workflow logic
errors and structural violations:

1. Process structure
   - orphaned nodes (no incoming or outgoing connection)
   - paths unreachable from the start event
   - circular dependencies
   - parallel gateway branch/merge mismatches
2. Element usage
   - start/end event shape violations
   - gateway type and flow mismatches, missing condition expressions
   - undefined task types
3. Control flow
   - conflicting or overlapping branch conditions
   - missing default paths
   - unbound signal or message triggers
4. Organizational policy
   - ambiguous lane ownership
   - cross-lane flows without gateways
   - resource contention without locks

Process graph:
{diagram}

Respond with a JSON array only, one object per finding:
[{"element_id": "...", "error_type": "...", "description": "...", "suggestion": "..."}]
Do not include any extra explanation or markdown formatting."#;

/// Reviews the seeded graph description for structural violations.
pub struct StructureCheck {
    service: Arc<dyn CompletionService>,
    config: StageConfig,
}

impl StructureCheck {
    pub const NAME: &'static str = "structure_check";

    pub fn new(service: Arc<dyn CompletionService>, config: StageConfig) -> Self {
        Self { service, config }
    }
}

#[async_trait]
impl Action for StructureCheck {
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

        let prompt = PROMPT_TEMPLATE.replace("{diagram}", &diagram);
        match guarded_completion(self.service.as_ref(), &self.config, &prompt, stage, events).await
        {
            Ok(reply) => Payload::Review {
                records: parse_error_records(stage, &reply),
            },
            Err(reason) => Payload::Review {
                records: vec![ErrorRecord::new(
                    stage.clone(),
                    SERVICE_ERROR_TYPE,
                    format!("structural review unavailable: {reason}"),
                    "retry once the completion backend is reachable",
                )],
            },
        }
    }
}
