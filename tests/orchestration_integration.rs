//! Compound-command scenarios: planning, sequential execution,
//! continuation-on-failure, and refresh synchronization.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Map};

use sheetpilot::backend::{PlanResponse, QueryResponse};
use sheetpilot::config::PilotConfig;
use sheetpilot::oracle::{Classification, Intent};
use sheetpilot::orchestrator::{ExecutionStep, StepKind};
use sheetpilot::session::CommandSession;
use sheetpilot::signal::SHEET_REFRESH_SIGNAL;
use sheetpilot::testing::{MemoryStore, RecordingEngine, ScriptedBackend, ScriptedOracle};

fn confident_oracle() -> ScriptedOracle {
    ScriptedOracle::with_classification(Classification {
        intent: Intent::TableOperation,
        action: "compound".into(),
        confidence: 0.9,
        target: None,
        parameters: Map::new(),
    })
}

fn step(id: &str, kind: StepKind, command: &str, description: &str) -> ExecutionStep {
    ExecutionStep {
        step_id: id.to_string(),
        kind,
        command: command.to_string(),
        description: description.to_string(),
    }
}

fn session_with(
    engine: Arc<RecordingEngine>,
    backend: Arc<ScriptedBackend>,
) -> CommandSession {
    let mut config = PilotConfig::default();
    config.signal_timeout_ms = 100;
    CommandSession::new(
        engine,
        Arc::new(confident_oracle()),
        backend,
        Arc::new(MemoryStore::new()),
        &config,
    )
}

#[tokio::test]
async fn sort_then_analyze_completes_both_steps() {
    let engine = Arc::new(RecordingEngine::ready().with_data(vec![
        vec![json!("Customer"), json!("Revenue")],
        vec![json!("Acme"), json!(120)],
        vec![json!("Globex"), json!(80)],
    ]));
    let backend = Arc::new(ScriptedBackend::new().with_plan(PlanResponse {
        success: true,
        execution_plan: vec![
            vec![step(
                "1",
                StepKind::Spreadsheet,
                "sort by revenue descending",
                "Sort by revenue",
            )],
            vec![step(
                "2",
                StepKind::Backend,
                "analyze top 10 customers",
                "Analyze top customers",
            )],
        ],
        total_steps: 2,
    }));
    let mut session = session_with(engine.clone(), backend.clone());

    let message = session
        .submit("Sort by revenue descending and then analyze top 10 customers")
        .await
        .unwrap();

    assert!(message.starts_with("Completed 2 of 2 steps"));
    assert_eq!(engine.calls(), vec!["sort_by_column(1,Descending)"]);
    assert_eq!(backend.queries(), vec!["analyze top 10 customers".to_string()]);
    assert!(!session.is_processing());
}

#[tokio::test]
async fn failed_middle_step_does_not_stop_the_plan() {
    let engine = Arc::new(RecordingEngine::ready());
    engine.fail_op("freeze_rows");
    let backend = Arc::new(ScriptedBackend::new().with_plan(PlanResponse {
        success: true,
        execution_plan: vec![vec![
            step("1", StepKind::Spreadsheet, "make A1:C1 bold", "Bold headers"),
            step("2", StepKind::Spreadsheet, "freeze the top row", "Freeze headers"),
            step("3", StepKind::Spreadsheet, "merge A1:C1", "Merge title"),
        ]],
        total_steps: 3,
    }));
    let mut session = session_with(engine.clone(), backend);

    let message = session
        .submit("tidy the headers and then make them stand out")
        .await
        .unwrap();

    assert!(message.starts_with("Completed 2 of 3 steps"));
    // Step 3 ran even though step 2 failed.
    assert_eq!(engine.call_count("merge_cells"), 1);
    assert!(message.contains("1 step(s) failed"));
    assert!(!session.is_processing());
}

#[tokio::test]
async fn mutating_backend_step_waits_for_the_refresh_signal() {
    let engine = Arc::new(RecordingEngine::ready());
    let backend = Arc::new(ScriptedBackend::new().with_plan(PlanResponse {
        success: true,
        execution_plan: vec![
            vec![step(
                "1",
                StepKind::Backend,
                "append the missing rows",
                "Append rows",
            )],
            vec![step("2", StepKind::Spreadsheet, "make A1:C1 bold", "Bold headers")],
        ],
        total_steps: 2,
    }));
    backend.push_response(QueryResponse {
        response: "12 rows appended".into(),
        data_updated: true,
        ..Default::default()
    });
    let mut session = session_with(engine.clone(), backend);

    // The host acknowledges the refresh shortly after the mutation lands.
    let bus = session.bus().clone();
    let emitter = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        bus.emit(SHEET_REFRESH_SIGNAL, json!({"rows": 12}));
    });

    let message = session
        .submit("fill in the gaps and then format the headers")
        .await
        .unwrap();
    emitter.await.unwrap();

    assert!(message.starts_with("Completed 2 of 2 steps"));
    assert_eq!(engine.call_count("set_font_weight"), 1);
}

#[tokio::test]
async fn missing_refresh_signal_is_tolerated() {
    let engine = Arc::new(RecordingEngine::ready());
    let backend = Arc::new(ScriptedBackend::new().with_plan(PlanResponse {
        success: true,
        execution_plan: vec![vec![step(
            "1",
            StepKind::Backend,
            "append the missing rows",
            "Append rows",
        )]],
        total_steps: 1,
    }));
    backend.push_response(QueryResponse {
        response: "12 rows appended".into(),
        data_updated: true,
        ..Default::default()
    });
    let mut session = session_with(engine, backend);

    // Nothing ever acknowledges the refresh; the step still succeeds.
    let message = session
        .submit("fill in the gaps and then carry on")
        .await
        .unwrap();
    assert!(message.starts_with("Completed 1 of 1 steps"));
    assert!(!session.is_processing());
}

#[tokio::test]
async fn planner_failure_is_reported_and_resets_the_guard() {
    let engine = Arc::new(RecordingEngine::ready());
    // No plan configured: the decomposition call fails.
    let backend = Arc::new(ScriptedBackend::new());
    let mut session = session_with(engine.clone(), backend);

    let message = session
        .submit("sort by revenue and then summarize the result")
        .await
        .unwrap();

    assert!(message.contains("analytics service"));
    assert!(engine.calls().is_empty());
    assert!(!session.is_processing());
    assert!(!session.transcript().has_placeholder());
}

#[tokio::test]
async fn mixed_step_kinds_flow_through_their_collaborators() {
    let engine = Arc::new(RecordingEngine::ready());
    let backend = Arc::new(ScriptedBackend::new().with_plan(PlanResponse {
        success: true,
        execution_plan: vec![vec![
            step(
                "1",
                StepKind::ManualHighlight,
                "highlight B2:B6 in green",
                "Highlight winners",
            ),
            step("2", StepKind::Chart, "chart revenue by region", "Build chart"),
            step("3", StepKind::Agent, "audit the totals", "Audit"),
        ]],
        total_steps: 3,
    }));
    backend.push_response(QueryResponse {
        response: "chart spec".into(),
        visualization: Some(json!({"type": "bar"})),
        ..Default::default()
    });
    let mut session = session_with(engine.clone(), backend.clone());

    let message = session
        .submit("mark the winners and then visualize and then audit")
        .await
        .unwrap();

    assert!(message.starts_with("Completed 3 of 3 steps"));
    assert_eq!(engine.calls(), vec!["set_background_color(1,1,5,1,green)"]);
    assert_eq!(
        backend.queries(),
        vec!["chart revenue by region".to_string(), "audit the totals".to_string()]
    );
}
