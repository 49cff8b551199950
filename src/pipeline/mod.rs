//! Pipeline assembly: an explicit, validated stage-dependency graph.
//!
//! Stages declare the producers they react to by name; [`PipelineBuilder`]
//! validates the resulting watch graph at construction — unknown targets,
//! duplicates, and cycles are build errors, not runtime surprises. The
//! compiled [`Pipeline`] is single-use: roles live only for the run.

mod run;

pub use run::PipelineError;

use std::sync::Arc;

use miette::Diagnostic;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::actions::{Action, ConsistencyCheck, Correction, StructureCheck};
use crate::config::PipelineConfig;
use crate::event::EventEmitter;
use crate::message::StageName;
use crate::role::Role;
use crate::services::{CompletionService, DiagramRenderer};

/// Stage names of the standard wiring.
pub const CHECKER: &str = "checker";
pub const TEXT_CHECKER: &str = "text_checker";
pub const CORRECTOR: &str = "corrector";
pub const FAST_CORRECTOR: &str = "fast_corrector";

/// All standard stage names, in wiring order.
pub const STANDARD_STAGES: &[&str] = &[CHECKER, TEXT_CHECKER, CORRECTOR, FAST_CORRECTOR];

/// Declaration of one stage: its name, the producers it waits on, and the
/// action bound to its single turn.
pub struct StageSpec {
    pub name: StageName,
    pub watches: Vec<StageName>,
    pub action: Arc<dyn Action>,
}

impl StageSpec {
    pub fn new(
        name: impl Into<String>,
        watches: impl IntoIterator<Item = StageName>,
        action: Arc<dyn Action>,
    ) -> Self {
        Self {
            name: StageName::new(name),
            watches: watches.into_iter().collect(),
            action,
        }
    }
}

/// Errors detected while validating a pipeline wiring.
#[derive(Debug, Error, Diagnostic)]
pub enum BuildError {
    #[error("duplicate stage name: {name}")]
    #[diagnostic(code(flowlint::pipeline::duplicate_stage))]
    DuplicateStage { name: StageName },

    #[error("stage name {name:?} is reserved for the pipeline source")]
    #[diagnostic(code(flowlint::pipeline::reserved_name))]
    ReservedName { name: StageName },

    #[error("stage {stage} watches nothing and would never be woken")]
    #[diagnostic(
        code(flowlint::pipeline::no_watches),
        help("Every stage must watch the source or at least one other stage.")
    )]
    NoWatches { stage: StageName },

    #[error("stage {stage} watches unknown producer {target}")]
    #[diagnostic(code(flowlint::pipeline::unknown_watch_target))]
    UnknownWatchTarget { stage: StageName, target: StageName },

    #[error("watch graph contains a cycle through stage {stage}")]
    #[diagnostic(
        code(flowlint::pipeline::cyclic_watch_graph),
        help("Stages may only watch producers upstream of them.")
    )]
    CyclicWatchGraph { stage: StageName },
}

/// Builder for a validated pipeline.
pub struct PipelineBuilder {
    specs: Vec<StageSpec>,
    config: PipelineConfig,
    renderer: Option<Arc<dyn DiagramRenderer>>,
    events: EventEmitter,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            specs: Vec::new(),
            config: PipelineConfig::new(),
            renderer: None,
            events: EventEmitter::disabled(),
        }
    }

    #[must_use]
    pub fn add_stage(mut self, spec: StageSpec) -> Self {
        self.specs.push(spec);
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn DiagramRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    #[must_use]
    pub fn with_events(mut self, events: EventEmitter) -> Self {
        self.events = events;
        self
    }

    /// Validates the wiring and compiles the pipeline.
    ///
    /// # Errors
    ///
    /// See [`BuildError`]: duplicate or reserved stage names, empty watch
    /// sets, watches on unknown producers, and cyclic watch graphs.
    pub fn build(self) -> Result<Pipeline, BuildError> {
        let source = StageName::source();
        let mut graph: DiGraph<StageName, ()> = DiGraph::new();
        let mut indices: FxHashMap<StageName, NodeIndex> = FxHashMap::default();
        indices.insert(source.clone(), graph.add_node(source.clone()));

        for spec in &self.specs {
            if spec.name.is_source() {
                return Err(BuildError::ReservedName {
                    name: spec.name.clone(),
                });
            }
            if indices.contains_key(&spec.name) {
                return Err(BuildError::DuplicateStage {
                    name: spec.name.clone(),
                });
            }
            indices.insert(spec.name.clone(), graph.add_node(spec.name.clone()));
        }

        for spec in &self.specs {
            if spec.watches.is_empty() {
                return Err(BuildError::NoWatches {
                    stage: spec.name.clone(),
                });
            }
            let to = indices[&spec.name];
            for watched in &spec.watches {
                let Some(&from) = indices.get(watched) else {
                    return Err(BuildError::UnknownWatchTarget {
                        stage: spec.name.clone(),
                        target: watched.clone(),
                    });
                };
                graph.add_edge(from, to, ());
            }
        }

        if let Err(cycle) = toposort(&graph, None) {
            return Err(BuildError::CyclicWatchGraph {
                stage: graph[cycle.node_id()].clone(),
            });
        }

        let roles = self
            .specs
            .into_iter()
            .map(|spec| Role::new(spec.name, spec.watches, spec.action))
            .collect();
        Ok(Pipeline {
            roles,
            config: self.config,
            renderer: self.renderer,
            events: self.events,
        })
    }
}

/// A compiled, single-run review pipeline.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use flowlint::config::PipelineConfig;
/// use flowlint::pipeline::Pipeline;
/// use flowlint::utils::testing::ScriptedCompletion;
///
/// # async fn example() -> miette::Result<()> {
/// let service = Arc::new(ScriptedCompletion::new().with_reply("*", "[]"));
/// let pipeline = Pipeline::standard(
///     service,
///     None,
///     PipelineConfig::new(),
///     "orders are reviewed before approval",
/// )?;
/// let report = pipeline.review_svg("<svg>...</svg>").await?;
/// println!("{}", report.diagram_text);
/// # Ok(())
/// # }
/// ```
pub struct Pipeline {
    pub(crate) roles: Vec<Role>,
    pub(crate) config: PipelineConfig,
    pub(crate) renderer: Option<Arc<dyn DiagramRenderer>>,
    pub(crate) events: EventEmitter,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("roles", &self.roles.iter().map(Role::name).collect::<Vec<_>>())
            .field("config", &self.config)
            .field("renderer", &self.renderer.is_some())
            .field("events", &self.events)
            .finish()
    }
}

impl Pipeline {
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// The standard wiring: a structural checker fed by the source, a text
    /// consistency checker ordered after it, and two correctors — thorough
    /// and fast — joining on both reviews.
    ///
    /// `description` is the free-text process description held by the
    /// consistency stage as role-local context.
    ///
    /// # Errors
    ///
    /// Propagates [`BuildError`], although the standard wiring itself always
    /// validates.
    pub fn standard(
        service: Arc<dyn CompletionService>,
        renderer: Option<Arc<dyn DiagramRenderer>>,
        config: PipelineConfig,
        description: impl Into<String>,
    ) -> Result<Pipeline, BuildError> {
        let source = StageName::source();
        let checker = StageName::new(CHECKER);
        let text_checker = StageName::new(TEXT_CHECKER);

        let mut builder = Pipeline::builder()
            .add_stage(StageSpec::new(
                CHECKER,
                [source.clone()],
                Arc::new(StructureCheck::new(
                    service.clone(),
                    config.stage(CHECKER).clone(),
                )),
            ))
            .add_stage(StageSpec::new(
                TEXT_CHECKER,
                [checker.clone()],
                Arc::new(ConsistencyCheck::new(
                    service.clone(),
                    config.stage(TEXT_CHECKER).clone(),
                    description,
                )),
            ))
            .add_stage(StageSpec::new(
                CORRECTOR,
                [checker.clone(), text_checker.clone()],
                Arc::new(Correction::new(
                    service.clone(),
                    config.stage(CORRECTOR).clone(),
                )),
            ))
            .add_stage(StageSpec::new(
                FAST_CORRECTOR,
                [checker, text_checker],
                Arc::new(Correction::new(
                    service,
                    config.stage(FAST_CORRECTOR).clone(),
                )),
            ));
        if let Some(renderer) = renderer {
            builder = builder.with_renderer(renderer);
        }
        builder.with_config(config).build()
    }

    /// Stage names in registration order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&StageName> {
        self.roles.iter().map(Role::name).collect()
    }
}
