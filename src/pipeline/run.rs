//! Driving a compiled pipeline through one review run.

use miette::Diagnostic;
use thiserror::Error;
use tracing::instrument;

use super::Pipeline;
use crate::aggregator::{Report, aggregate};
use crate::bus::MessageBus;
use crate::diagram::{ConversionError, GraphDescription};
use crate::event::PipelineEvent;
use crate::message::{MessageDraft, StageName};
use crate::records::Payload;

/// Action identifier carried by the seed message.
const SEED_ACTION: &str = "seed";

/// Run-aborting failures. Everything else a run encounters — dead backends,
/// unreadable replies, renderer trouble — degrades into report data instead.
#[derive(Debug, Error, Diagnostic)]
pub enum PipelineError {
    /// The source artifact yielded no graph description to operate on.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Conversion(#[from] ConversionError),
}

impl Pipeline {
    /// Reviews an uploaded SVG artifact against the configured stages.
    ///
    /// Consumes the pipeline: roles take a single turn per run.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Conversion`] when no graph description can be
    /// extracted from the artifact — the only fatal condition.
    #[instrument(skip(self, svg), err)]
    pub async fn review_svg(self, svg: &str) -> Result<Report, PipelineError> {
        let (graph, warnings) = GraphDescription::from_svg(svg)?;
        for detail in warnings {
            self.events.emit(PipelineEvent::ConversionWarning { detail });
        }
        Ok(self.review_graph(graph).await)
    }

    /// Reviews an already-extracted graph description, bypassing the lossy
    /// artifact conversion.
    pub async fn review_graph(mut self, graph: GraphDescription) -> Report {
        let mut bus = MessageBus::with_events(self.events.clone());
        bus.publish(MessageDraft::broadcast(
            StageName::source(),
            SEED_ACTION,
            Payload::Diagram {
                text: graph.to_dot(),
            }
            .encode(),
        ));

        let rounds = bus.run(&mut self.roles).await;
        tracing::info!(
            target: "flowlint::pipeline",
            rounds,
            messages = bus.log().len(),
            "bus reached fixed point"
        );

        let aggregate = aggregate(bus.log(), &graph);

        let final_diagram = match &self.renderer {
            Some(renderer) => match renderer.render(&aggregate.diagram_text).await {
                Ok(artifact) => Some(artifact),
                Err(err) => {
                    tracing::warn!(
                        target: "flowlint::pipeline",
                        error = %err,
                        "renderer failed, report carries no artifact"
                    );
                    None
                }
            },
            None => None,
        };

        let report = aggregate.into_report(final_diagram);
        match report.write_artifact(&self.config.reports_dir) {
            Ok(path) => {
                tracing::info!(target: "flowlint::pipeline", path = %path.display(), "run artifact written")
            }
            Err(err) => tracing::warn!(
                target: "flowlint::pipeline",
                error = %err,
                "failed to persist run artifact"
            ),
        }
        report
    }
}
