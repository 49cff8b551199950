use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name of a pipeline stage, used both as a role identifier and as the
/// producer tag on published messages.
///
/// Stage names are the currency of the watch graph: a stage declares the
/// producers it reacts to by name, and the bus matches those names against
/// the `producer` field of every published [`Message`].
///
/// # Examples
///
/// ```
/// use flowlint::message::StageName;
///
/// let checker = StageName::new("checker");
/// assert_eq!(checker.as_str(), "checker");
/// assert_eq!(checker.to_string(), "checker");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageName(String);

impl StageName {
    /// Producer tag of the seed message published by the pipeline itself
    /// before any stage has run.
    pub const SOURCE: &'static str = "input";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The pipeline-source producer, origin of the initial graph description.
    #[must_use]
    pub fn source() -> Self {
        Self(Self::SOURCE.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_source(&self) -> bool {
        self.0 == Self::SOURCE
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StageName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Addressing of a published message.
///
/// The watch graph decides who actually consumes a message; `Recipients` is
/// provenance metadata carried for inspection and replay, mirroring the
/// `sent_to` field of the originating request.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Recipients {
    /// Visible to every stage's memory.
    #[default]
    Broadcast,
    /// Addressed to a named set of stages.
    Stages(Vec<StageName>),
}

/// An immutable unit of communication on the message bus.
///
/// Messages are published exactly once and never mutated afterwards; the bus
/// log is a strictly ordered, append-only sequence and `sequence` is the
/// position assigned at publish time. `content` is a string payload, usually
/// an encoded [`Payload`](crate::records::Payload).
///
/// # Examples
///
/// ```
/// use flowlint::message::{MessageDraft, Recipients, StageName};
///
/// let draft = MessageDraft::broadcast(
///     StageName::new("checker"),
///     "structure_check",
///     "{\"kind\":\"review\",\"records\":[]}",
/// );
/// assert_eq!(draft.sent_to, Recipients::Broadcast);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier of this message.
    pub id: Uuid,
    /// String payload; often an encoded structured record.
    pub content: String,
    /// Stage that published the message.
    pub producer: StageName,
    /// Identifier of the action that caused the publication.
    pub caused_by: String,
    /// Stage the message was sent from (normally equal to `producer`).
    pub sent_from: StageName,
    /// Addressing metadata.
    pub sent_to: Recipients,
    /// Position in the append-only log, assigned at publish time.
    pub sequence: u64,
    /// Wall-clock publish time.
    pub published_at: DateTime<Utc>,
}

impl Message {
    /// Returns true if this message was published by the given producer.
    #[must_use]
    pub fn is_from(&self, producer: &StageName) -> bool {
        &self.producer == producer
    }
}

/// A message before publication: everything except the identity and ordering
/// fields the bus assigns when it appends to the log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageDraft {
    pub content: String,
    pub producer: StageName,
    pub caused_by: String,
    pub sent_to: Recipients,
}

impl MessageDraft {
    /// Creates a broadcast draft, the common case for stage output.
    pub fn broadcast(
        producer: StageName,
        caused_by: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            producer,
            caused_by: caused_by.into(),
            sent_to: Recipients::Broadcast,
        }
    }

    /// Creates a draft addressed to specific stages.
    pub fn addressed(
        producer: StageName,
        caused_by: impl Into<String>,
        content: impl Into<String>,
        recipients: Vec<StageName>,
    ) -> Self {
        Self {
            content: content.into(),
            producer,
            caused_by: caused_by.into(),
            sent_to: Recipients::Stages(recipients),
        }
    }

    pub(crate) fn into_message(self, sequence: u64) -> Message {
        Message {
            id: Uuid::new_v4(),
            content: self.content,
            producer: self.producer.clone(),
            caused_by: self.caused_by,
            sent_from: self.producer,
            sent_to: self.sent_to,
            sequence,
            published_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_to_message_assigns_identity_and_sequence() {
        let draft = MessageDraft::broadcast(StageName::new("checker"), "structure_check", "body");
        let msg = draft.into_message(7);
        assert_eq!(msg.sequence, 7);
        assert_eq!(msg.producer, StageName::new("checker"));
        assert_eq!(msg.sent_from, msg.producer);
        assert_eq!(msg.caused_by, "structure_check");
        assert_eq!(msg.content, "body");
    }

    #[test]
    fn source_tag_is_recognized() {
        assert!(StageName::source().is_source());
        assert!(!StageName::new("checker").is_source());
    }

    #[test]
    fn message_serializes_round_trip() {
        let msg = MessageDraft::addressed(
            StageName::source(),
            "seed",
            "digraph {}",
            vec![StageName::new("checker")],
        )
        .into_message(0);
        let json = serde_json::to_string(&msg).expect("serialize");
        let back: Message = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(msg, back);
    }
}
