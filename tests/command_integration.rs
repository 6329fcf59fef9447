//! End-to-end command submission scenarios: fast path, structured dispatch,
//! and the confidence gate, all against scripted collaborators.

use std::sync::Arc;

use serde_json::{json, Map};

use sheetpilot::config::PilotConfig;
use sheetpilot::oracle::{Classification, Intent};
use sheetpilot::session::CommandSession;
use sheetpilot::testing::{MemoryStore, RecordingEngine, ScriptedBackend, ScriptedOracle};
use sheetpilot::transcript::Author;

fn classification(
    intent: Intent,
    action: &str,
    confidence: f32,
    params: Vec<(&str, serde_json::Value)>,
) -> Classification {
    let mut map = Map::new();
    for (k, v) in params {
        map.insert(k.to_string(), v);
    }
    Classification {
        intent,
        action: action.into(),
        confidence,
        target: None,
        parameters: map,
    }
}

struct Fixture {
    engine: Arc<RecordingEngine>,
    oracle: Arc<ScriptedOracle>,
    backend: Arc<ScriptedBackend>,
    store: Arc<MemoryStore>,
    session: CommandSession,
}

fn fixture(oracle: ScriptedOracle) -> Fixture {
    let engine = Arc::new(RecordingEngine::ready());
    let oracle = Arc::new(oracle);
    let backend = Arc::new(ScriptedBackend::new());
    let store = Arc::new(MemoryStore::new());
    let session = CommandSession::new(
        engine.clone(),
        oracle.clone(),
        backend.clone(),
        store.clone(),
        &PilotConfig::default(),
    );
    Fixture {
        engine,
        oracle,
        backend,
        store,
        session,
    }
}

#[tokio::test]
async fn bold_command_resolves_on_the_fast_path() {
    let mut f = fixture(ScriptedOracle::failing("must not be consulted"));

    let message = f.session.submit("make A1:B2 bold").await.unwrap();

    assert_eq!(message, "Bold applied successfully.");
    assert_eq!(f.engine.calls(), vec!["set_font_weight(0,0,2,2,bold)"]);
    assert_eq!(f.engine.call_count("set_font_weight"), 1);
    // The oracle was never invoked.
    assert!(f.oracle.seen().is_empty());

    let entries = f.session.transcript().entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].author, Author::User);
    assert_eq!(entries[1].content, "Bold applied successfully.");
    assert!(!f.session.transcript().has_placeholder());
}

#[tokio::test]
async fn multi_column_delete_applies_in_descending_order() {
    let mut f = fixture(ScriptedOracle::failing("must not be consulted"));

    let message = f.session.submit("delete column D and E").await.unwrap();

    assert_eq!(f.engine.calls(), vec!["delete_column(4)", "delete_column(3)"]);
    assert!(message.contains('D') && message.contains('E'));
}

#[tokio::test]
async fn matched_fast_path_failure_never_falls_through() {
    let mut f = fixture(ScriptedOracle::with_classification(classification(
        Intent::RangeOperation,
        "merge_cells",
        0.99,
        vec![("range", json!("A1:B2"))],
    )));
    f.engine.fail_op("merge_cells");

    let message = f.session.submit("merge A1:B2").await.unwrap();

    // The failure surfaces; neither the oracle nor the backend is consulted.
    assert!(message.contains("Could not merge"));
    assert!(f.oracle.seen().is_empty());
    assert!(f.backend.queries().is_empty());
    assert!(!f.session.is_processing());
}

#[tokio::test]
async fn low_confidence_sends_raw_text_to_analytics() {
    // Even a whitelisted intent is ignored below the gate.
    let mut f = fixture(ScriptedOracle::with_classification(classification(
        Intent::RangeOperation,
        "apply_bold",
        0.55,
        vec![("range", json!("A1"))],
    )));

    let original = "update the quarterly outlook figures";
    f.session.submit(original).await.unwrap();

    assert_eq!(f.backend.queries(), vec![original.to_string()]);
    assert!(f.engine.calls().is_empty());
}

#[tokio::test]
async fn oracle_failure_falls_back_to_backend_delegation() {
    let mut f = fixture(ScriptedOracle::failing("connection refused"));

    let message = f
        .session
        .submit("summon the quarterly report")
        .await
        .unwrap();

    assert_eq!(f.backend.queries(), vec!["summon the quarterly report".to_string()]);
    assert!(message.starts_with("Analyzed:"));
}

#[tokio::test]
async fn high_confidence_unlisted_intent_is_an_explicit_error() {
    let mut f = fixture(ScriptedOracle::with_classification(classification(
        Intent::Unknown,
        "reticulate_splines",
        0.95,
        vec![],
    )));

    let message = f.session.submit("reticulate the splines").await.unwrap();

    assert!(message.contains("unable to process"));
    assert!(f.engine.calls().is_empty());
    assert!(f.backend.queries().is_empty());
    assert!(!f.session.is_processing());
}

#[tokio::test]
async fn router_dispatches_whitelisted_classification_locally() {
    let mut f = fixture(ScriptedOracle::with_classification(classification(
        Intent::ColumnOperation,
        "delete_column",
        0.9,
        vec![("column", json!("C"))],
    )));

    let message = f
        .session
        .submit("get rid of the third field please")
        .await
        .unwrap();

    assert_eq!(message, "Column C deleted.");
    assert_eq!(f.engine.calls(), vec!["delete_column(2)"]);
    assert!(f.backend.queries().is_empty());
}

#[tokio::test]
async fn visualization_responses_are_attached_to_the_transcript() {
    let f_oracle = ScriptedOracle::with_classification(classification(
        Intent::ChartRequest,
        "build_chart",
        0.9,
        vec![],
    ));
    let mut f = fixture(f_oracle);
    f.backend.push_response(sheetpilot::backend::QueryResponse {
        response: "Here is the revenue chart.".into(),
        visualization: Some(json!({"type": "bar"})),
        ..Default::default()
    });

    f.session
        .submit("build a chart of revenue per region")
        .await
        .unwrap();

    let last = f.session.transcript().entries().last().unwrap();
    assert!(last.attachment.is_some());
}

#[tokio::test]
async fn workspace_insight_requests_use_the_insight_endpoint() {
    let mut f = fixture(ScriptedOracle::with_classification(classification(
        Intent::WorkspaceInsight,
        "workspace_overview",
        0.9,
        vec![("type", json!("data_quality"))],
    )));

    let message = f
        .session
        .submit("audit the overall health of this workspace")
        .await
        .unwrap();

    // The plain query endpoint is bypassed.
    assert!(f.backend.queries().is_empty());
    assert!(message.contains("data_quality"));
}

#[tokio::test]
async fn transcript_is_persisted_after_each_submission() {
    let mut f = fixture(ScriptedOracle::failing("unused"));

    f.session.submit("make A1 bold").await.unwrap();
    f.session.submit("freeze the top row").await.unwrap();

    let saves = f.store.saves();
    assert_eq!(saves.len(), 2);
    // Two entries after the first command, four after the second.
    assert_eq!(saves[0].1, 2);
    assert_eq!(saves[1].1, 4);
}
