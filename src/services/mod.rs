//! External collaborators: the text completion backend and the diagram
//! renderer.
//!
//! Both are opaque, slow, and allowed to fail; the pipeline treats their
//! output as untrusted data and degrades around every error. The traits here
//! are the seams — production implementations live in [`http`] and
//! [`graphviz`], scripted doubles in [`crate::utils::testing`].

pub mod graphviz;
pub mod http;

use async_trait::async_trait;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use graphviz::GraphvizRenderer;
pub use http::HttpCompletionService;

/// Stable reference to a stored artifact (a path or URI). Handed out by the
/// storage collaborator; the pipeline only carries it, never manages the
/// underlying lifecycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactRef(String);

impl ArtifactRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Failures of the completion backend. Callers bound every request with a
/// timeout and treat timeout identically to failure.
#[derive(Debug, Error, Diagnostic)]
pub enum ServiceError {
    #[error("completion backend returned status {status}")]
    #[diagnostic(code(flowlint::services::http_status))]
    Http { status: u16 },

    #[error("completion request failed: {source}")]
    #[diagnostic(code(flowlint::services::transport))]
    Transport {
        #[from]
        source: reqwest::Error,
    },

    #[error("completion reply had no readable content: {detail}")]
    #[diagnostic(
        code(flowlint::services::malformed_reply),
        help("The backend is expected to answer in the chat-completions shape.")
    )]
    MalformedReply { detail: String },

    #[error("completion backend unavailable: {reason}")]
    #[diagnostic(code(flowlint::services::unavailable))]
    Unavailable { reason: String },
}

/// Failures of the diagram renderer.
#[derive(Debug, Error, Diagnostic)]
pub enum RenderError {
    #[error("renderer exited unsuccessfully: {detail}")]
    #[diagnostic(code(flowlint::services::render_failed))]
    Failed { detail: String },

    #[error("renderer io error")]
    #[diagnostic(code(flowlint::services::render_io))]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("renderer unavailable: {reason}")]
    #[diagnostic(code(flowlint::services::render_unavailable))]
    Unavailable { reason: String },
}

/// The free-text generation collaborator.
///
/// `model` comes from per-stage configuration; `prompt` is the full request
/// text. The reply is arbitrary: well-formedness is the caller's problem,
/// by way of the tolerant parser.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, model: &str, prompt: &str) -> Result<String, ServiceError>;
}

/// The rendering collaborator: turns a graph description in DOT form into a
/// stored visual artifact.
#[async_trait]
pub trait DiagramRenderer: Send + Sync {
    async fn render(&self, dot: &str) -> Result<ArtifactRef, RenderError>;
}
