mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use flowlint::config::{PipelineConfig, StageConfig};
use flowlint::diagram::GraphDescription;
use flowlint::event::{EventEmitter, PipelineEvent};
use flowlint::message::StageName;
use flowlint::pipeline::{CHECKER, Pipeline, PipelineError, StageSpec};
use flowlint::records::{
    NO_CORRECTIONS_SENTINEL, NO_ISSUES_SENTINEL, PARSE_ERROR_TYPE, SERVICE_ERROR_TYPE,
};
use flowlint::actions::StructureCheck;
use flowlint::utils::testing::{
    CLEAN_REVIEW_REPLY, EchoRenderer, FailingCompletion, FailingRenderer, ORDER_PROCESS_SVG,
    ScriptedCompletion, SlowCompletion,
};
use serde_json::json;

fn seed_graph() -> GraphDescription {
    GraphDescription::from_svg(ORDER_PROCESS_SVG)
        .expect("fixture converts")
        .0
}

#[tokio::test]
async fn consistent_inputs_produce_a_clean_report() {
    let dir = tempfile::tempdir().expect("tempdir");
    let service = Arc::new(
        ScriptedCompletion::new()
            .with_reply(CHECKER_MODEL, CLEAN_REVIEW_REPLY)
            .with_reply(TEXT_CHECKER_MODEL, CLEAN_REVIEW_REPLY),
    );
    let pipeline = Pipeline::standard(
        service,
        Some(Arc::new(EchoRenderer)),
        scripted_config(dir.path()),
        "orders are received, reviewed, approved and shipped",
    )
    .expect("standard wiring validates");

    let report = pipeline
        .review_svg(ORDER_PROCESS_SVG)
        .await
        .expect("run completes");

    assert!(report.is_clean());
    assert_eq!(report.suggestions_json(), json!([NO_ISSUES_SENTINEL]));
    assert_eq!(report.corrections_json(), json!([NO_CORRECTIONS_SENTINEL]));

    // No corrector spoke up: the final diagram is the seed, unchanged.
    let seed_dot = seed_graph().to_dot();
    assert_eq!(report.diagram_text, seed_dot.trim());
    let artifact = report.final_diagram.as_ref().expect("renderer succeeded");
    assert!(artifact.as_str().starts_with("inline:digraph"));

    // The run artifact was persisted with explicit sentinel fields.
    let written = std::fs::read_to_string(dir.path().join("latest_report.json"))
        .expect("artifact written");
    let doc: serde_json::Value = serde_json::from_str(&written).expect("artifact is json");
    assert_eq!(doc["suggestions"], json!([NO_ISSUES_SENTINEL]));
    assert_eq!(doc["corrections"], json!([NO_CORRECTIONS_SENTINEL]));
    assert!(doc["diagram_svg"].is_string());
}

#[tokio::test]
async fn unstructured_checker_prose_degrades_to_one_parse_error_record() {
    let dir = tempfile::tempdir().expect("tempdir");
    let prose = "The flow chart seems to wander; I cannot put my finger on the problem.";
    let service = Arc::new(
        ScriptedCompletion::new()
            .with_reply(CHECKER_MODEL, prose)
            .with_reply(TEXT_CHECKER_MODEL, CLEAN_REVIEW_REPLY)
            .with_reply(CORRECTOR_MODEL, "digraph { a -> b }")
            .with_reply(FAST_CORRECTOR_MODEL, "digraph { a -> b }"),
    );
    let pipeline = Pipeline::standard(
        service,
        None,
        scripted_config(dir.path()),
        "a description",
    )
    .expect("standard wiring validates");

    let report = pipeline
        .review_svg(ORDER_PROCESS_SVG)
        .await
        .expect("run completes despite unusable checker output");

    assert_eq!(report.errors.len(), 1);
    let record = &report.errors[0];
    assert_eq!(record.source, StageName::new(CHECKER));
    assert_eq!(record.error_type, PARSE_ERROR_TYPE);
    assert!(prose.starts_with(&record.description));
    // The fallback record still drove both correctors.
    assert_eq!(report.corrections.len(), 2);
}

#[tokio::test]
async fn latest_corrector_wins_and_summaries_are_structural() {
    let dir = tempfile::tempdir().expect("tempdir");
    let seed_dot = seed_graph().to_dot();
    // Thorough corrector: adds a reject path (one element, two flows).
    let reply_a = seed_dot.replace(
        "}\n",
        "  \"reject\" [label=\"Reject order\", shape=rectangle];\n  \"approved\" -> \"reject\";\n  \"reject\" -> \"end\";\n}\n",
    );
    // Fast corrector: adds a single shortcut flow.
    let reply_b = seed_dot.replace("}\n", "  \"approved\" -> \"end\";\n}\n");

    let findings = r#"[{"element_id": "approved", "error_type": "missing branch",
        "description": "the gateway has no reject path", "suggestion": "add one"}]"#;
    let service = Arc::new(
        ScriptedCompletion::new()
            .with_reply(CHECKER_MODEL, findings)
            .with_reply(TEXT_CHECKER_MODEL, CLEAN_REVIEW_REPLY)
            .with_reply(CORRECTOR_MODEL, &reply_a)
            .with_reply(FAST_CORRECTOR_MODEL, &reply_b),
    );
    let pipeline = Pipeline::standard(
        service,
        None,
        scripted_config(dir.path()),
        "a description",
    )
    .expect("standard wiring validates");

    let report = pipeline
        .review_svg(ORDER_PROCESS_SVG)
        .await
        .expect("run completes");

    assert_eq!(report.corrections.len(), 2);
    let thorough = &report.corrections[0];
    let fast = &report.corrections[1];
    assert_eq!(thorough.source.as_str(), "corrector");
    assert_eq!(thorough.modifications.changed_element_count, 3);
    assert_eq!(fast.source.as_str(), "fast_corrector");
    assert_eq!(fast.modifications.changed_element_count, 1);
    assert!(thorough.produced_at < fast.produced_at);

    // Last write wins: the fast corrector published later.
    assert_eq!(report.diagram_text, reply_b.trim());
    // The reviewed element resolves against the seed graph.
    assert!(!report.errors[0].unresolved);
}

#[tokio::test]
async fn backend_outage_degrades_to_service_error_records() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pipeline = Pipeline::standard(
        Arc::new(FailingCompletion),
        None,
        scripted_config(dir.path()),
        "a description",
    )
    .expect("standard wiring validates");

    let report = pipeline
        .review_svg(ORDER_PROCESS_SVG)
        .await
        .expect("run completes despite a dead backend");

    assert_eq!(report.errors.len(), 2);
    assert!(
        report
            .errors
            .iter()
            .all(|r| r.error_type == SERVICE_ERROR_TYPE)
    );
    // Correctors had findings to act on but no backend; they fall back to
    // their sentinel and the report carries the seed diagram.
    assert!(report.corrections.is_empty());
    assert_eq!(report.diagram_text, seed_graph().to_dot().trim());
}

#[tokio::test]
async fn timeouts_are_indistinguishable_from_failure() {
    let dir = tempfile::tempdir().expect("tempdir");
    // No per-stage overrides: every stage runs under the short default.
    let config = PipelineConfig::new()
        .with_default_stage(StageConfig::default().with_timeout(Duration::from_millis(50)))
        .with_reports_dir(dir.path());
    let service = Arc::new(SlowCompletion {
        delay: Duration::from_secs(30),
        reply: CLEAN_REVIEW_REPLY.to_string(),
    });
    let pipeline = Pipeline::standard(service, None, config, "a description")
        .expect("standard wiring validates");

    let report = pipeline
        .review_svg(ORDER_PROCESS_SVG)
        .await
        .expect("run completes within its timeouts");

    assert_eq!(report.errors.len(), 2);
    assert!(
        report
            .errors
            .iter()
            .all(|r| r.error_type == SERVICE_ERROR_TYPE && r.description.contains("timed out"))
    );
}

#[tokio::test]
async fn renderer_failure_is_absorbed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let service = Arc::new(
        ScriptedCompletion::new()
            .with_reply(CHECKER_MODEL, CLEAN_REVIEW_REPLY)
            .with_reply(TEXT_CHECKER_MODEL, CLEAN_REVIEW_REPLY),
    );
    let pipeline = Pipeline::standard(
        service,
        Some(Arc::new(FailingRenderer)),
        scripted_config(dir.path()),
        "a description",
    )
    .expect("standard wiring validates");

    let report = pipeline
        .review_svg(ORDER_PROCESS_SVG)
        .await
        .expect("run completes despite renderer failure");
    assert!(report.final_diagram.is_none());

    let written = std::fs::read_to_string(dir.path().join("latest_report.json"))
        .expect("artifact written");
    let doc: serde_json::Value = serde_json::from_str(&written).expect("artifact is json");
    assert!(doc["diagram_svg"].is_null());
}

#[tokio::test]
async fn unconvertible_artifact_aborts_the_run() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pipeline = Pipeline::standard(
        Arc::new(FailingCompletion),
        None,
        scripted_config(dir.path()),
        "a description",
    )
    .expect("standard wiring validates");

    let err = pipeline
        .review_svg("<svg></svg>")
        .await
        .expect_err("nothing to review");
    assert!(matches!(err, PipelineError::Conversion(_)));
}

#[tokio::test]
async fn direct_graph_input_bypasses_the_artifact_boundary() {
    let dir = tempfile::tempdir().expect("tempdir");
    let service = Arc::new(
        ScriptedCompletion::new()
            .with_reply(CHECKER_MODEL, CLEAN_REVIEW_REPLY)
            .with_reply(TEXT_CHECKER_MODEL, CLEAN_REVIEW_REPLY),
    );
    let pipeline = Pipeline::standard(
        service,
        None,
        scripted_config(dir.path()),
        "a description",
    )
    .expect("standard wiring validates");

    let report = pipeline.review_graph(seed_graph()).await;
    assert!(report.is_clean());
}

#[tokio::test]
async fn events_expose_turns_and_fallbacks() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (emitter, events) = EventEmitter::channel();
    let config = scripted_config(dir.path());
    let pipeline = Pipeline::builder()
        .with_events(emitter)
        .add_stage(StageSpec::new(
            CHECKER,
            [StageName::source()],
            Arc::new(StructureCheck::new(
                Arc::new(FailingCompletion),
                config.stage(CHECKER).clone(),
            )),
        ))
        .with_config(config)
        .build()
        .expect("wiring validates");

    let _report = pipeline.review_graph(seed_graph()).await;
    let observed: Vec<PipelineEvent> = events.try_iter().collect();

    assert!(observed.iter().any(|e| matches!(
        e,
        PipelineEvent::TurnStarted { stage } if stage.as_str() == CHECKER
    )));
    assert!(observed.iter().any(|e| matches!(
        e,
        PipelineEvent::ServiceFallback { stage, .. } if stage.as_str() == CHECKER
    )));
    assert!(observed.iter().any(|e| matches!(
        e,
        PipelineEvent::MessagePublished { sequence: 1, .. }
    )));
}
