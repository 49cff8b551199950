//! Scripted collaborator doubles and fixtures for tests.
//!
//! The pipeline's external collaborators are trait objects, so tests (ours
//! and downstream users') exercise runs with canned behavior instead of a
//! live backend. Replies are keyed by model name — stages are told apart by
//! their configured model, which also mirrors how deployments separate them.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use rustc_hash::FxHashMap;

use crate::services::{
    ArtifactRef, CompletionService, DiagramRenderer, RenderError, ServiceError,
};

/// Model key matched when no model-specific script exists.
pub const ANY_MODEL: &str = "*";

/// Completion double replaying scripted replies per model, in order.
#[derive(Default)]
pub struct ScriptedCompletion {
    replies: Mutex<FxHashMap<String, VecDeque<String>>>,
}

impl ScriptedCompletion {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a reply for `model` (or [`ANY_MODEL`] as a wildcard).
    #[must_use]
    pub fn with_reply(self, model: &str, reply: &str) -> Self {
        self.replies
            .lock()
            .expect("script lock")
            .entry(model.to_string())
            .or_default()
            .push_back(reply.to_string());
        self
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(&self, model: &str, _prompt: &str) -> Result<String, ServiceError> {
        let mut replies = self.replies.lock().expect("script lock");
        let scripted = replies
            .get_mut(model)
            .and_then(VecDeque::pop_front)
            .or_else(|| replies.get_mut(ANY_MODEL).and_then(VecDeque::pop_front));
        scripted.ok_or_else(|| ServiceError::Unavailable {
            reason: format!("no scripted reply for model {model}"),
        })
    }
}

/// Completion double that always fails.
#[derive(Default)]
pub struct FailingCompletion;

#[async_trait]
impl CompletionService for FailingCompletion {
    async fn complete(&self, _model: &str, _prompt: &str) -> Result<String, ServiceError> {
        Err(ServiceError::Unavailable {
            reason: "scripted failure".to_string(),
        })
    }
}

/// Completion double that stalls before answering, for timeout coverage.
pub struct SlowCompletion {
    pub delay: Duration,
    pub reply: String,
}

#[async_trait]
impl CompletionService for SlowCompletion {
    async fn complete(&self, _model: &str, _prompt: &str) -> Result<String, ServiceError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.reply.clone())
    }
}

/// Renderer double that stores nothing: the artifact reference embeds the
/// rendered DOT so assertions can see exactly what was handed over.
#[derive(Default)]
pub struct EchoRenderer;

#[async_trait]
impl DiagramRenderer for EchoRenderer {
    async fn render(&self, dot: &str) -> Result<ArtifactRef, RenderError> {
        Ok(ArtifactRef::new(format!("inline:{dot}")))
    }
}

/// Renderer double that always fails.
#[derive(Default)]
pub struct FailingRenderer;

#[async_trait]
impl DiagramRenderer for FailingRenderer {
    async fn render(&self, _dot: &str) -> Result<ArtifactRef, RenderError> {
        Err(RenderError::Unavailable {
            reason: "scripted failure".to_string(),
        })
    }
}

/// A small order process: start event, review task, approval gateway,
/// shipping task, end event, fully connected.
pub const ORDER_PROCESS_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg">
  <circle id="start" name="Order received" data-element-type="event"/>
  <rect id="review" name="Review order"/>
  <polygon id="approved" name="Approved?" data-element-type="gateway"/>
  <rect id="ship" name="Ship order"/>
  <circle id="end" name="Done" data-element-type="event"/>
  <path data-flow="start_f1_review"/>
  <path data-flow="review_f2_approved"/>
  <path data-flow="approved_f3_ship"/>
  <path data-flow="ship_f4_end"/>
</svg>"##;

/// An empty review reply: well-formed, zero findings.
pub const CLEAN_REVIEW_REPLY: &str = "[]";
