//! Best-effort observability events for a pipeline run.
//!
//! Events are a side channel: they let a caller watch turns and fallbacks
//! while the run executes, without touching the message log. Emission never
//! blocks and never fails the pipeline — a dropped receiver simply means
//! nobody is listening.

use crate::message::StageName;

/// Something observable that happened during a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PipelineEvent {
    /// A stage was woken and its action is about to run.
    TurnStarted { stage: StageName },
    /// A stage finished its turn; `outcome` names the payload kind produced.
    TurnCompleted {
        stage: StageName,
        action: String,
        outcome: String,
    },
    /// The completion service failed or timed out and the stage degraded to
    /// its fallback output.
    ServiceFallback { stage: StageName, reason: String },
    /// A message was appended to the bus log.
    MessagePublished { producer: StageName, sequence: u64 },
    /// The diagram boundary dropped or repaired a piece of the artifact.
    ConversionWarning { detail: String },
}

/// Cloneable handle that forwards events to an optional channel.
#[derive(Clone, Debug, Default)]
pub struct EventEmitter {
    sender: Option<flume::Sender<PipelineEvent>>,
}

impl EventEmitter {
    /// An emitter that discards everything.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// An emitter paired with the receiver that observes it.
    #[must_use]
    pub fn channel() -> (Self, flume::Receiver<PipelineEvent>) {
        let (tx, rx) = flume::unbounded();
        (Self { sender: Some(tx) }, rx)
    }

    /// Sends an event if anyone is listening.
    pub fn emit(&self, event: PipelineEvent) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(event);
        }
    }
}
