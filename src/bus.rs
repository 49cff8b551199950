//! The message bus: append-only log plus turn-based dispatch.
//!
//! The bus owns the single piece of shared state in a run — the ordered,
//! append-only message log. Stages never talk to each other directly: every
//! turn reads a read-only projection of the log ([`MemoryView`]) and yields
//! one outbound message the bus appends.
//!
//! [`MessageBus::run`] drives execution to a fixed point. Each round it
//! collects the roles whose every watched producer has already published
//! (join semantics) and that have not yet taken their single turn, executes
//! those turns concurrently, then publishes their output in registration
//! order so the log is deterministic. Because every role publishes even when
//! its action fails — a sentinel at worst — downstream joins are never
//! starved, and an acyclic watch graph reaches its fixed point in at most one
//! round per role.

use futures_util::future::join_all;

use crate::event::{EventEmitter, PipelineEvent};
use crate::message::{Message, MessageDraft, StageName};
use crate::records::{ErrorRecord, Payload};
use crate::role::Role;

/// Read-only, ordered view over a snapshot of the bus log.
///
/// Handed to actions during a turn; a pure projection, never a private
/// mutable copy. Accessors are named and explicit — input selection is part
/// of a stage's contract, not inferred from message provenance text.
#[derive(Clone, Copy, Debug)]
pub struct MemoryView<'a> {
    log: &'a [Message],
}

impl<'a> MemoryView<'a> {
    #[must_use]
    pub fn new(log: &'a [Message]) -> Self {
        Self { log }
    }

    /// Every message in publish order.
    #[must_use]
    pub fn messages(&self) -> &'a [Message] {
        self.log
    }

    /// Most recent message published by `producer`.
    #[must_use]
    pub fn latest_from(&self, producer: &StageName) -> Option<&'a Message> {
        self.log.iter().rev().find(|m| m.is_from(producer))
    }

    /// Decoded payload of the most recent message from `producer`.
    #[must_use]
    pub fn latest_payload_from(&self, producer: &StageName) -> Option<Payload> {
        self.latest_from(producer)
            .and_then(|m| Payload::decode(&m.content))
    }

    /// The diagram text seeded by the pipeline source.
    #[must_use]
    pub fn seed_diagram(&self) -> Option<String> {
        match self.latest_payload_from(&StageName::source()) {
            Some(Payload::Diagram { text }) => Some(text),
            _ => None,
        }
    }

    /// Latest review records per reviewing producer, flattened in the order
    /// each producer first appeared on the log. Earlier reviews from the same
    /// producer are superseded, not merged.
    #[must_use]
    pub fn latest_review_records(&self) -> Vec<ErrorRecord> {
        let mut per_producer: Vec<(StageName, Vec<ErrorRecord>)> = Vec::new();
        for message in self.log {
            if let Some(Payload::Review { records }) = Payload::decode(&message.content) {
                match per_producer
                    .iter_mut()
                    .find(|(producer, _)| producer == &message.producer)
                {
                    Some((_, slot)) => *slot = records,
                    None => per_producer.push((message.producer.clone(), records)),
                }
            }
        }
        per_producer
            .into_iter()
            .flat_map(|(_, records)| records)
            .collect()
    }
}

/// Append-only message log with turn-based dispatch.
#[derive(Debug, Default)]
pub struct MessageBus {
    log: Vec<Message>,
    events: EventEmitter,
}

impl MessageBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_events(events: EventEmitter) -> Self {
        Self {
            log: Vec::new(),
            events,
        }
    }

    /// Appends a message to the log, assigning its sequence position, and
    /// makes it visible to every role's memory.
    pub fn publish(&mut self, draft: MessageDraft) -> &Message {
        let sequence = self.log.len() as u64;
        let message = draft.into_message(sequence);
        self.events.emit(PipelineEvent::MessagePublished {
            producer: message.producer.clone(),
            sequence,
        });
        tracing::debug!(
            target: "flowlint::bus",
            producer = %message.producer,
            caused_by = %message.caused_by,
            sequence,
            "message published"
        );
        self.log.push(message);
        self.log.last().expect("just pushed")
    }

    /// The full ordered log.
    #[must_use]
    pub fn log(&self) -> &[Message] {
        &self.log
    }

    /// True once `producer` has published at least one message.
    #[must_use]
    pub fn has_output_from(&self, producer: &StageName) -> bool {
        self.log.iter().any(|m| m.is_from(producer))
    }

    /// Runs roles to the fixed point where no role has unconsumed matching
    /// input. Returns the number of rounds executed.
    ///
    /// Within a round all runnable turns execute concurrently; their output
    /// is published in registration order, keeping the log deterministic for
    /// a given wiring and set of action results.
    pub async fn run(&mut self, roles: &mut [Role]) -> usize {
        let mut rounds = 0;
        loop {
            let runnable: Vec<usize> = roles
                .iter()
                .enumerate()
                .filter(|(_, role)| {
                    role.is_idle()
                        && role
                            .watches()
                            .iter()
                            .all(|watched| self.has_output_from(watched))
                })
                .map(|(index, _)| index)
                .collect();
            if runnable.is_empty() {
                break;
            }
            rounds += 1;
            tracing::debug!(
                target: "flowlint::bus",
                round = rounds,
                stages = runnable.len(),
                "executing round"
            );

            let snapshot = self.log.clone();
            let turns = runnable
                .iter()
                .map(|&index| roles[index].take_turn(MemoryView::new(&snapshot), &self.events));
            let drafts = join_all(turns).await;

            for (&index, draft) in runnable.iter().zip(drafts) {
                roles[index].mark_done();
                self.publish(draft);
            }
        }
        rounds
    }
}
