//! Renderer backed by the local `dot` executable.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;
use uuid::Uuid;

use super::{ArtifactRef, DiagramRenderer, RenderError};

/// Renders DOT text to an SVG file by invoking Graphviz, returning the path
/// of the produced file as the artifact reference.
pub struct GraphvizRenderer {
    output_dir: PathBuf,
    binary: String,
}

impl GraphvizRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            binary: "dot".to_string(),
        }
    }

    /// Overrides the Graphviz executable, e.g. an absolute path.
    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }
}

#[async_trait]
impl DiagramRenderer for GraphvizRenderer {
    async fn render(&self, dot: &str) -> Result<ArtifactRef, RenderError> {
        std::fs::create_dir_all(&self.output_dir)?;
        let stem = Uuid::new_v4();
        let dot_path = self.output_dir.join(format!("{stem}.dot"));
        let svg_path = self.output_dir.join(format!("{stem}.svg"));
        std::fs::write(&dot_path, dot)?;

        let status = Command::new(&self.binary)
            .arg("-Tsvg")
            .arg(&dot_path)
            .arg("-o")
            .arg(&svg_path)
            .status()
            .await
            .map_err(|e| RenderError::Unavailable {
                reason: format!("failed to launch {}: {e}", self.binary),
            })?;

        if !status.success() {
            return Err(RenderError::Failed {
                detail: format!("{} exited with {status}", self.binary),
            });
        }
        Ok(ArtifactRef::new(svg_path.display().to_string()))
    }
}
