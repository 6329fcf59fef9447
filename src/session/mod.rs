//! Command session: the single submission entry point
//!
//! `CommandSession::submit` owns the whole lifecycle of one command: the
//! processing guard, the transcript placeholder, fast-path short-circuit,
//! routing, dispatch or orchestration, placeholder resolution, and
//! best-effort persistence.
//!
//! Exactly one command may be in flight. The guard is an atomic flag
//! acquired with a swap and released by a drop guard, so every exit path —
//! success, handled failure, or panic unwind — resets it structurally.
//! Everything except the busy rejection is caught here and turned into a
//! transcript message; nothing propagates to a crash.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use crate::backend::{BackendAnalytics, QueryOptions};
use crate::config::PilotConfig;
use crate::core::error::{PilotError, Result};
use crate::engine::SheetEngine;
use crate::fastpath::FastPathMatcher;
use crate::handlers::HandlerRegistry;
use crate::oracle::context::SheetContext;
use crate::oracle::{Classification, Intent, IntentOracle};
use crate::orchestrator::Orchestrator;
use crate::router::{ProcessorType, QueryRouter};
use crate::signal::SignalBus;
use crate::transcript::{Attachment, Transcript, TranscriptStore};

/// Releases the processing flag on every exit path, including unwind.
struct ProcessingGuard {
    flag: Arc<AtomicBool>,
}

impl ProcessingGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Result<Self> {
        if flag.swap(true, Ordering::SeqCst) {
            return Err(PilotError::Busy);
        }
        Ok(Self { flag: Arc::clone(flag) })
    }
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

struct Reply {
    message: String,
    attachment: Option<Attachment>,
}

pub struct CommandSession {
    engine: Arc<dyn SheetEngine>,
    backend: Arc<dyn BackendAnalytics>,
    store: Arc<dyn TranscriptStore>,
    bus: SignalBus,
    matcher: FastPathMatcher,
    router: QueryRouter,
    registry: HandlerRegistry,
    orchestrator: Orchestrator,
    transcript: Transcript,
    processing: Arc<AtomicBool>,
    workspace_id: String,
    chat_id: String,
}

impl CommandSession {
    pub fn new(
        engine: Arc<dyn SheetEngine>,
        oracle: Arc<dyn IntentOracle>,
        backend: Arc<dyn BackendAnalytics>,
        store: Arc<dyn TranscriptStore>,
        config: &PilotConfig,
    ) -> Self {
        let bus = SignalBus::default();
        let orchestrator = Orchestrator::new(
            Arc::clone(&engine),
            Arc::clone(&backend),
            bus.clone(),
            config.chat_id.clone(),
            config.signal_timeout(),
        );
        Self {
            engine,
            backend,
            store,
            bus,
            matcher: FastPathMatcher::new(),
            router: QueryRouter::new(oracle, config.oracle_timeout()),
            registry: HandlerRegistry::new(),
            orchestrator,
            transcript: Transcript::new(),
            processing: Arc::new(AtomicBool::new(false)),
            workspace_id: config.workspace_id.clone(),
            chat_id: config.chat_id.clone(),
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// The bus the host emits completion signals into (sheet refreshes).
    pub fn bus(&self) -> &SignalBus {
        &self.bus
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::SeqCst)
    }

    /// Best-effort cancellation of the in-flight backend request. Completed
    /// engine mutations are permanent.
    pub fn cancel(&self) {
        self.backend.cancel();
    }

    /// Clear the conversation.
    pub fn reset(&mut self) {
        self.transcript.clear();
    }

    /// Submit one command. Returns the final user-facing message, which is
    /// also appended to the transcript; handled failures are reported as
    /// messages, not errors. The only error is `Busy`, returned before the
    /// transcript is touched when a command is already in flight.
    pub async fn submit(&mut self, text: &str) -> Result<String> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(String::new());
        }

        let _guard = ProcessingGuard::acquire(&self.processing)?;

        info!(command = text, "processing command");
        self.transcript.push_user(text);
        self.transcript.push_placeholder("Analyzing your request…");

        let reply = match self.process(text).await {
            Ok(reply) => reply,
            Err(e) => Reply {
                message: user_message(&e),
                attachment: None,
            },
        };

        self.transcript
            .resolve_placeholder(&reply.message, reply.attachment);

        // Auto-save is best-effort; a storage failure is never user-facing.
        if let Err(e) = self
            .store
            .persist(&self.chat_id, self.transcript.entries())
            .await
        {
            warn!(error = %e, "transcript auto-save failed");
        }

        Ok(reply.message)
    }

    async fn process(&self, text: &str) -> Result<Reply> {
        // Fast path first; a match commits the command to local dispatch.
        if let Some(classification) = self.matcher.matches(text) {
            return self.run_frontend(&classification).await;
        }

        let context = SheetContext::from_engine(self.engine.as_ref()).await;
        let routed = self.router.route(text, &context).await?;

        match routed.decision.processor {
            ProcessorType::DirectFrontend => {
                let Some(classification) = routed.classification else {
                    return Err(PilotError::Validation(
                        "router chose local dispatch without a classification".into(),
                    ));
                };
                self.run_frontend(&classification).await
            }
            ProcessorType::DirectBackend | ProcessorType::FallbackLegacy => {
                // Workspace-level insight requests have a dedicated
                // analytics endpoint; everything else is a plain query.
                if let Some(cls) = routed
                    .classification
                    .as_ref()
                    .filter(|cls| cls.intent == Intent::WorkspaceInsight)
                {
                    let insight = self
                        .backend
                        .analyze_workspace_insights(
                            &self.workspace_id,
                            cls.str_param("type").unwrap_or("general"),
                            cls.str_param("focus_area"),
                        )
                        .await?;
                    return Ok(Reply {
                        message: insight_summary(&insight),
                        attachment: None,
                    });
                }
                let response = self
                    .backend
                    .send_query(text, &self.chat_id, QueryOptions::default())
                    .await?;
                Ok(Reply {
                    message: response.response,
                    attachment: response
                        .visualization
                        .map(|spec| Attachment::Visualization { spec }),
                })
            }
            ProcessorType::Orchestrated => {
                let plan = self.orchestrator.plan(text, &self.workspace_id).await?;
                let result = self.orchestrator.execute(plan).await;
                Ok(Reply {
                    message: result.detailed_message,
                    attachment: None,
                })
            }
        }
    }

    async fn run_frontend(&self, classification: &Classification) -> Result<Reply> {
        if !self.engine.is_ready().await {
            return Err(PilotError::EngineUnavailable("no sheet is loaded".into()));
        }
        let outcome = self
            .registry
            .dispatch(self.engine.as_ref(), classification)
            .await;
        Ok(Reply {
            message: outcome.message,
            attachment: None,
        })
    }
}

/// Render an insight payload for the transcript.
fn insight_summary(insight: &serde_json::Value) -> String {
    insight
        .get("summary")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| insight.to_string())
}

/// Map an error to the message the user sees in the transcript.
fn user_message(error: &PilotError) -> String {
    match error {
        PilotError::EngineUnavailable(_) => {
            "The spreadsheet isn't ready yet. Open or create a sheet, then try this command again."
                .to_string()
        }
        PilotError::UnhandledIntent { intent, action } => format!(
            "I understood this as '{action}' ({intent}), but I'm unable to process that command."
        ),
        PilotError::Backend(detail) => {
            format!("The analytics service couldn't complete this request: {detail}")
        }
        PilotError::Validation(message) | PilotError::Execution(message) => message.clone(),
        _ => "Something went wrong while processing that command.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::Intent;
    use crate::testing::{MemoryStore, RecordingEngine, ScriptedBackend, ScriptedOracle};
    use serde_json::Map;

    fn session_with(
        engine: Arc<RecordingEngine>,
        oracle: Arc<ScriptedOracle>,
        backend: Arc<ScriptedBackend>,
        store: Arc<MemoryStore>,
    ) -> CommandSession {
        let config = PilotConfig::default();
        CommandSession::new(engine, oracle, backend, store, &config)
    }

    fn classification(intent: Intent, action: &str, confidence: f32) -> Classification {
        Classification {
            intent,
            action: action.into(),
            confidence,
            target: None,
            parameters: Map::new(),
        }
    }

    #[test]
    fn test_guard_rejects_second_acquisition() {
        let flag = Arc::new(AtomicBool::new(false));
        let guard = ProcessingGuard::acquire(&flag).unwrap();
        assert!(matches!(
            ProcessingGuard::acquire(&flag),
            Err(PilotError::Busy)
        ));
        drop(guard);
        assert!(!flag.load(Ordering::SeqCst));
        assert!(ProcessingGuard::acquire(&flag).is_ok());
    }

    #[test]
    fn test_guard_releases_on_unwind() {
        let flag = Arc::new(AtomicBool::new(false));
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = ProcessingGuard::acquire(&flag).unwrap();
            panic!("handler exploded");
        }));
        assert!(result.is_err());
        assert!(!flag.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_submit_rejects_while_in_flight() {
        let engine = Arc::new(RecordingEngine::ready());
        let oracle = Arc::new(ScriptedOracle::failing("offline"));
        let backend = Arc::new(ScriptedBackend::new());
        let store = Arc::new(MemoryStore::new());
        let mut session = session_with(engine, oracle, backend, store);

        // Simulate an in-flight command by holding the guard.
        let _guard = ProcessingGuard::acquire(&session.processing).unwrap();
        let result = session.submit("make A1 bold").await;
        assert!(matches!(result, Err(PilotError::Busy)));
        // The rejected submission must not have touched the transcript.
        assert!(session.transcript().is_empty());
    }

    #[tokio::test]
    async fn test_flag_reset_on_every_path() {
        let engine = Arc::new(RecordingEngine::ready());
        let oracle = Arc::new(ScriptedOracle::with_classification(classification(
            Intent::AnalysisQuery,
            "answer_question",
            0.9,
        )));
        let backend = Arc::new(ScriptedBackend::new());
        let store = Arc::new(MemoryStore::new());
        let mut session = session_with(engine.clone(), oracle, backend.clone(), store);

        // Fast-path success.
        session.submit("make A1:B2 bold").await.unwrap();
        assert!(!session.is_processing());

        // Fast-path handler failure (engine refuses).
        engine.fail_op("merge_cells");
        session.submit("merge A1:B2").await.unwrap();
        assert!(!session.is_processing());

        // Routed backend success.
        session.submit("what was our best month").await.unwrap();
        assert!(!session.is_processing());

        // Routed backend failure.
        backend.fail_queries();
        session.submit("what was our worst month").await.unwrap();
        assert!(!session.is_processing());
    }

    #[tokio::test]
    async fn test_engine_unavailable_guidance() {
        let engine = Arc::new(RecordingEngine::not_ready());
        let oracle = Arc::new(ScriptedOracle::failing("unused"));
        let backend = Arc::new(ScriptedBackend::new());
        let store = Arc::new(MemoryStore::new());
        let mut session = session_with(engine, oracle, backend.clone(), store);

        let message = session.submit("make A1:B2 bold").await.unwrap();
        assert!(message.contains("isn't ready"));
        // No backend fallback for an inherently local command.
        assert!(backend.queries().is_empty());
        assert!(!session.transcript().has_placeholder());
    }

    #[tokio::test]
    async fn test_persist_failure_is_swallowed() {
        let engine = Arc::new(RecordingEngine::ready());
        let oracle = Arc::new(ScriptedOracle::failing("unused"));
        let backend = Arc::new(ScriptedBackend::new());
        let store = Arc::new(MemoryStore::failing());
        let mut session = session_with(engine, oracle, backend, store);

        let message = session.submit("make A1:B2 bold").await.unwrap();
        assert_eq!(message, "Bold applied successfully.");
    }

    #[tokio::test]
    async fn test_cancel_reaches_backend() {
        let engine = Arc::new(RecordingEngine::ready());
        let oracle = Arc::new(ScriptedOracle::failing("unused"));
        let backend = Arc::new(ScriptedBackend::new());
        let store = Arc::new(MemoryStore::new());
        let session = session_with(engine, oracle, backend.clone(), store);

        session.cancel();
        assert!(backend.was_cancelled());
    }
}
