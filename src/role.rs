//! Roles: pipeline stages bound to an action.
//!
//! A role lives for exactly one run and takes exactly one turn. Waking,
//! reading memory, and publishing are the bus's business; the role's job is
//! to wrap its action's output in a message carrying its own identity — and
//! to always produce that message, so the pipeline never stalls on a stage
//! that had nothing to say.

use std::sync::Arc;

use crate::actions::Action;
use crate::bus::MemoryView;
use crate::event::{EventEmitter, PipelineEvent};
use crate::message::{MessageDraft, StageName};
use crate::records::Payload;

/// Turn lifecycle of a role within a single run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TurnState {
    #[default]
    Idle,
    Done,
}

/// One pipeline participant: a name, the producers it reacts to, and the
/// action executed on its single turn.
pub struct Role {
    name: StageName,
    watches: Vec<StageName>,
    action: Arc<dyn Action>,
    turn: TurnState,
}

impl Role {
    pub fn new(name: StageName, watches: Vec<StageName>, action: Arc<dyn Action>) -> Self {
        Self {
            name,
            watches,
            action,
            turn: TurnState::default(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &StageName {
        &self.name
    }

    #[must_use]
    pub fn watches(&self) -> &[StageName] {
        &self.watches
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.turn == TurnState::Idle
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.turn == TurnState::Done
    }

    pub(crate) fn mark_done(&mut self) {
        self.turn = TurnState::Done;
    }

    /// Executes the role's single turn: run the bound action over the given
    /// memory view and wrap its payload in an outbound message draft.
    ///
    /// Infallible by contract — the action absorbs external failures into
    /// fallback payloads, so a turn always yields a publishable message.
    pub async fn take_turn(
        &self,
        memory: MemoryView<'_>,
        events: &EventEmitter,
    ) -> MessageDraft {
        events.emit(PipelineEvent::TurnStarted {
            stage: self.name.clone(),
        });
        tracing::info!(target: "flowlint::role", stage = %self.name, "turn started");

        let payload = self.action.run(&self.name, memory, events).await;

        let outcome = match &payload {
            Payload::Diagram { .. } => "diagram",
            Payload::Review { .. } => "review",
            Payload::Correction { .. } => "correction",
            Payload::Empty { .. } => "empty",
        };
        events.emit(PipelineEvent::TurnCompleted {
            stage: self.name.clone(),
            action: self.action.name().to_string(),
            outcome: outcome.to_string(),
        });
        tracing::info!(
            target: "flowlint::role",
            stage = %self.name,
            action = self.action.name(),
            outcome,
            "turn completed"
        );

        MessageDraft::broadcast(self.name.clone(), self.action.name(), payload.encode())
    }
}

impl std::fmt::Debug for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Role")
            .field("name", &self.name)
            .field("watches", &self.watches)
            .field("action", &self.action.name())
            .field("turn", &self.turn)
            .finish()
    }
}
