//! Actions: the unit of work bound to a role.
//!
//! An action takes one turn's inputs from memory, issues a single call to
//! the completion service, and tolerantly parses the reply into a payload.
//! Failure never crosses the action boundary: a dead backend, a timeout, or
//! unreadable output degrades to a fallback payload, and the owning role
//! still publishes — the invariant that keeps the bus free of deadlock.

mod consistency;
mod correction;
mod structure;

use async_trait::async_trait;

pub use consistency::ConsistencyCheck;
pub use correction::Correction;
pub use structure::StructureCheck;

use crate::bus::MemoryView;
use crate::config::StageConfig;
use crate::event::{EventEmitter, PipelineEvent};
use crate::message::StageName;
use crate::records::Payload;
use crate::services::CompletionService;

/// The unit of work executed when a role is woken.
#[async_trait]
pub trait Action: Send + Sync {
    /// Stable identifier recorded as `caused_by` on the published message.
    fn name(&self) -> &'static str;

    /// Executes one turn. Infallible by contract: external failures are
    /// absorbed into fallback payloads.
    async fn run(
        &self,
        stage: &StageName,
        memory: MemoryView<'_>,
        events: &EventEmitter,
    ) -> Payload;
}

/// Issues the stage's single completion call under its configured timeout.
///
/// Timeout and backend failure are indistinguishable to the caller: both
/// come back as the reason string the action folds into its fallback output.
pub(crate) async fn guarded_completion(
    service: &dyn CompletionService,
    config: &StageConfig,
    prompt: &str,
    stage: &StageName,
    events: &EventEmitter,
) -> Result<String, String> {
    let reason = match tokio::time::timeout(config.timeout, service.complete(&config.model, prompt))
        .await
    {
        Ok(Ok(reply)) => return Ok(reply),
        Ok(Err(err)) => err.to_string(),
        Err(_) => format!("timed out after {:?}", config.timeout),
    };

    tracing::warn!(
        target: "flowlint::actions",
        stage = %stage,
        model = %config.model,
        %reason,
        "completion call failed, degrading to fallback output"
    );
    events.emit(PipelineEvent::ServiceFallback {
        stage: stage.clone(),
        reason: reason.clone(),
    });
    Err(reason)
}
