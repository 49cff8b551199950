//! # flowlint: agent-orchestrated process-diagram review
//!
//! flowlint reviews a business-process diagram against a free-text
//! description, detects structural and semantic inconsistencies through a
//! set of independent reviewer and corrector stages, and produces a
//! corrected diagram plus a findings report.
//!
//! ## Core Concepts
//!
//! - **Messages**: immutable units on an append-only, totally ordered log
//! - **Stages**: roles bound to one action, woken when every producer they
//!   watch has published (join semantics), taking exactly one turn per run
//! - **Actions**: a single call to an untrusted completion service, with the
//!   reply recovered by a tolerant parser that never fails its caller
//! - **Aggregation**: one scan of the finished log, last write wins per
//!   producing stage
//! - **Diagram boundary**: best-effort SVG-to-graph extraction and
//!   deterministic DOT rendering on the way out
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use flowlint::config::PipelineConfig;
//! use flowlint::pipeline::Pipeline;
//! use flowlint::services::{GraphvizRenderer, HttpCompletionService};
//!
//! # async fn example(svg: &str) -> miette::Result<()> {
//! let service = Arc::new(
//!     HttpCompletionService::new("https://api.deepseek.com", Duration::from_secs(60))?
//!         .with_api_key("sk-..."),
//! );
//! let renderer = Arc::new(GraphvizRenderer::new("reports"));
//!
//! let pipeline = Pipeline::standard(
//!     service,
//!     Some(renderer),
//!     PipelineConfig::from_env(),
//!     "orders are reviewed, then approved or rejected",
//! )?;
//!
//! let report = pipeline.review_svg(svg).await?;
//! for finding in &report.errors {
//!     println!("[{}] {}: {}", finding.source, finding.error_type, finding.description);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Failure Posture
//!
//! A dead backend, a timeout, or an unreadable reply degrades into report
//! data — a fallback record, a sentinel message — and the run completes.
//! The single fatal condition is an artifact from which no graph description
//! can be extracted at all.
//!
//! ## Module Guide
//!
//! - [`message`] - log units and stage naming
//! - [`records`] - payload envelope and derived record types
//! - [`bus`] - append-only log, turn scheduling, memory views
//! - [`role`] / [`actions`] - the per-stage execution contract
//! - [`parser`] - tolerant recovery of records from noisy text
//! - [`aggregator`] - last-write-wins reduction to the final report
//! - [`diagram`] - graph descriptions and boundary conversions
//! - [`pipeline`] - validated assembly and the run driver
//! - [`services`] - completion and renderer collaborators
//! - [`utils::testing`] - scripted doubles for exercising runs offline

pub mod actions;
pub mod aggregator;
pub mod bus;
pub mod config;
pub mod diagram;
pub mod event;
pub mod message;
pub mod parser;
pub mod pipeline;
pub mod records;
pub mod role;
pub mod services;
pub mod telemetry;
pub mod utils;
