//! Compound query orchestration
//!
//! A compound command ("sort by revenue and then analyze the top 10") is
//! decomposed by the backend planning service into waves of steps. A wave
//! is a set of steps with no inter-dependency; waves are ordered. The
//! orchestrator flattens the waves into one sequential list and executes
//! strictly in order, never in parallel, even across independent waves —
//! a deliberate simplification carried over from the system this replaces,
//! not an oversight.
//!
//! Execution is continuation-on-failure: a failed step is recorded and the
//! loop proceeds to the next step. The aggregate result is best-effort
//! partial success: `success` is true whenever at least one step executed,
//! regardless of how many failed.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::backend::{BackendAnalytics, QueryOptions};
use crate::core::error::{PilotError, Result};
use crate::engine::SheetEngine;
use crate::fastpath::{self, FastPathMatcher};
use crate::handlers::HandlerRegistry;
use crate::signal::{SignalBus, SHEET_REFRESH_SIGNAL};

/// Step categories the planner can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Spreadsheet,
    Backend,
    Agent,
    Chart,
    ManualHighlight,
}

/// One unit of work in an execution plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionStep {
    pub step_id: String,
    #[serde(rename = "step_type")]
    pub kind: StepKind,
    pub command: String,
    #[serde(default)]
    pub description: String,
}

/// A set of steps with no inter-dependency.
pub type Wave = Vec<ExecutionStep>;

/// Ordered waves, built once per orchestrated command and consumed once.
#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    pub waves: Vec<Wave>,
}

impl ExecutionPlan {
    pub fn total_steps(&self) -> usize {
        self.waves.iter().map(Vec::len).sum()
    }

    /// Flatten waves into the sequential execution order.
    pub fn flatten(self) -> Vec<ExecutionStep> {
        self.waves.into_iter().flatten().collect()
    }
}

/// Aggregate outcome of one orchestrated command.
#[derive(Debug, Clone)]
pub struct OrchestrationResult {
    pub success: bool,
    pub steps_executed: usize,
    pub steps_failed: usize,
    pub detailed_message: String,
}

/// Readiness retries for spreadsheet steps.
const READINESS_ATTEMPTS: usize = 3;
const READINESS_BACKOFF: Duration = Duration::from_millis(400);

pub struct Orchestrator {
    engine: Arc<dyn SheetEngine>,
    backend: Arc<dyn BackendAnalytics>,
    bus: SignalBus,
    matcher: FastPathMatcher,
    registry: HandlerRegistry,
    chat_id: String,
    signal_timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        engine: Arc<dyn SheetEngine>,
        backend: Arc<dyn BackendAnalytics>,
        bus: SignalBus,
        chat_id: String,
        signal_timeout: Duration,
    ) -> Self {
        Self {
            engine,
            backend,
            bus,
            matcher: FastPathMatcher::new(),
            registry: HandlerRegistry::new(),
            chat_id,
            signal_timeout,
        }
    }

    /// Ask the decomposition service for an execution plan.
    pub async fn plan(&self, text: &str, workspace_id: &str) -> Result<ExecutionPlan> {
        let response = self.backend.orchestrate(text, workspace_id, false).await?;
        if !response.success || response.execution_plan.is_empty() {
            return Err(PilotError::Backend(
                "the planning service produced no execution plan".into(),
            ));
        }
        let plan = ExecutionPlan {
            waves: response.execution_plan,
        };
        info!(
            waves = plan.waves.len(),
            steps = plan.total_steps(),
            "execution plan built"
        );
        Ok(plan)
    }

    /// Run the plan to completion, one step at a time.
    pub async fn execute(&self, plan: ExecutionPlan) -> OrchestrationResult {
        let steps = plan.flatten();
        let total = steps.len();
        let mut executed: Vec<String> = Vec::new();
        let mut failed: Vec<String> = Vec::new();

        for (index, step) in steps.iter().enumerate() {
            let label = if step.description.is_empty() {
                step.command.clone()
            } else {
                step.description.clone()
            };
            info!(step = index + 1, total, kind = ?step.kind, "executing step");

            match self.run_step(step).await {
                Ok(message) => executed.push(format!("• {label}: {message}")),
                Err(e) => {
                    // A failed step never aborts the plan.
                    warn!(step = index + 1, error = %e, "step failed; continuing");
                    failed.push(format!("• {label}: {e}"));
                }
            }
        }

        let mut lines = vec![format!("Completed {} of {} steps", executed.len(), total)];
        lines.extend(executed.iter().cloned());
        if !failed.is_empty() {
            lines.push(format!("{} step(s) failed:", failed.len()));
            lines.extend(failed.iter().cloned());
        }

        OrchestrationResult {
            success: !executed.is_empty(),
            steps_executed: executed.len(),
            steps_failed: failed.len(),
            detailed_message: lines.join("\n"),
        }
    }

    async fn run_step(&self, step: &ExecutionStep) -> Result<String> {
        match step.kind {
            StepKind::Spreadsheet => self.run_spreadsheet_step(step).await,
            StepKind::Backend => self.run_backend_step(step, QueryOptions::default()).await,
            StepKind::Agent => self.run_backend_step(step, QueryOptions::agent()).await,
            StepKind::Chart => self.run_chart_step(step).await,
            StepKind::ManualHighlight => self.run_highlight_step(step).await,
        }
    }

    async fn run_spreadsheet_step(&self, step: &ExecutionStep) -> Result<String> {
        self.ensure_engine_ready().await?;

        let Some(classification) = self.matcher.matches(&step.command) else {
            return Err(PilotError::Validation(format!(
                "'{}' was not recognized as a spreadsheet operation",
                step.command
            )));
        };

        let outcome = self
            .registry
            .dispatch(self.engine.as_ref(), &classification)
            .await;
        if outcome.success {
            Ok(outcome.message)
        } else {
            Err(PilotError::Execution(outcome.message))
        }
    }

    async fn run_backend_step(
        &self,
        step: &ExecutionStep,
        options: QueryOptions,
    ) -> Result<String> {
        let response = self
            .backend
            .send_query(&step.command, &self.chat_id, options)
            .await?;

        if response.data_updated {
            // The next step must not read stale sheet state; wait for the
            // engine to acknowledge the refresh. A timeout is non-fatal:
            // log and proceed optimistically.
            let outcome = self
                .bus
                .await_signal(SHEET_REFRESH_SIGNAL, self.signal_timeout)
                .await;
            if outcome.timed_out() {
                warn!(
                    step = %step.step_id,
                    "no refresh acknowledgement within {:?}; proceeding",
                    self.signal_timeout
                );
            }
        }

        Ok(response.response)
    }

    async fn run_chart_step(&self, step: &ExecutionStep) -> Result<String> {
        let response = self
            .backend
            .send_query(&step.command, &self.chat_id, QueryOptions::chart())
            .await?;
        if response.visualization.is_some() {
            Ok("Chart generated.".to_string())
        } else {
            Ok(response.response)
        }
    }

    /// Apply a background highlight described by the step command.
    async fn run_highlight_step(&self, step: &ExecutionStep) -> Result<String> {
        self.ensure_engine_ready().await?;

        let lower = step.command.to_lowercase();
        let Some(range_text) = fastpath::find_range_text(&lower) else {
            return Err(PilotError::Validation(format!(
                "no cell range found in '{}'",
                step.command
            )));
        };
        let Some(range) = crate::core::refs::parse_range(&range_text) else {
            return Err(PilotError::Validation(format!(
                "'{range_text}' is not a valid range"
            )));
        };
        let color = fastpath::find_color(&lower).unwrap_or_else(|| "yellow".to_string());
        if self.engine.set_background_color(range, &color).await {
            Ok(format!("Highlighted {range_text} in {color}."))
        } else {
            Err(PilotError::Execution(format!(
                "could not highlight {range_text}"
            )))
        }
    }

    /// Spreadsheet steps wait for engine readiness with a short backoff.
    async fn ensure_engine_ready(&self) -> Result<()> {
        for attempt in 1..=READINESS_ATTEMPTS {
            if self.engine.is_ready().await && self.engine.dimensions().await.rows > 0 {
                return Ok(());
            }
            if attempt < READINESS_ATTEMPTS {
                warn!(attempt, "sheet engine not ready; retrying");
                tokio::time::sleep(READINESS_BACKOFF).await;
            }
        }
        Err(PilotError::EngineUnavailable(format!(
            "engine not ready after {READINESS_ATTEMPTS} attempts"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::PlanResponse;
    use crate::testing::{RecordingEngine, ScriptedBackend};
    use serde_json::json;

    fn step(id: &str, kind: StepKind, command: &str) -> ExecutionStep {
        ExecutionStep {
            step_id: id.to_string(),
            kind,
            command: command.to_string(),
            description: format!("step {id}"),
        }
    }

    fn orchestrator(
        engine: Arc<RecordingEngine>,
        backend: Arc<ScriptedBackend>,
    ) -> (Orchestrator, SignalBus) {
        let bus = SignalBus::default();
        let orchestrator = Orchestrator::new(
            engine,
            backend,
            bus.clone(),
            "chat-1".into(),
            Duration::from_millis(50),
        );
        (orchestrator, bus)
    }

    #[tokio::test]
    async fn test_step_failure_does_not_abort_the_plan() {
        let engine = Arc::new(
            RecordingEngine::ready().with_data(vec![vec![json!("Name")], vec![json!("Acme")]]),
        );
        engine.fail_op("freeze_rows");
        let backend = Arc::new(ScriptedBackend::new());
        let (orchestrator, _bus) = orchestrator(engine.clone(), backend);

        let plan = ExecutionPlan {
            waves: vec![vec![
                step("1", StepKind::Spreadsheet, "make A1:B2 bold"),
                step("2", StepKind::Spreadsheet, "freeze the top row"),
                step("3", StepKind::Spreadsheet, "merge A1:B1"),
            ]],
        };
        let result = orchestrator.execute(plan).await;

        assert!(result.success);
        assert_eq!(result.steps_executed, 2);
        assert_eq!(result.steps_failed, 1);
        // Step 3 was still attempted after step 2 failed.
        assert_eq!(engine.call_count("merge_cells"), 1);
        assert!(result.detailed_message.starts_with("Completed 2 of 3 steps"));
    }

    #[tokio::test]
    async fn test_waves_flatten_in_order() {
        let plan = ExecutionPlan {
            waves: vec![
                vec![
                    step("1", StepKind::Spreadsheet, "a"),
                    step("2", StepKind::Backend, "b"),
                ],
                vec![step("3", StepKind::Chart, "c")],
            ],
        };
        assert_eq!(plan.total_steps(), 3);
        let ids: Vec<String> = plan.flatten().into_iter().map(|s| s.step_id).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_mutating_backend_step_waits_for_refresh_signal() {
        let engine = Arc::new(RecordingEngine::ready());
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_response(crate::backend::QueryResponse {
            response: "rows updated".into(),
            data_updated: true,
            ..Default::default()
        });
        let (orchestrator, bus) = orchestrator(engine, backend);

        let emitter = {
            let bus = bus.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                bus.emit(SHEET_REFRESH_SIGNAL, json!({"ok": true}));
            })
        };

        let plan = ExecutionPlan {
            waves: vec![vec![step("1", StepKind::Backend, "append the new rows")]],
        };
        let result = orchestrator.execute(plan).await;
        emitter.await.unwrap();

        assert!(result.success);
        assert_eq!(result.steps_executed, 1);
    }

    #[tokio::test]
    async fn test_refresh_timeout_is_non_fatal() {
        let engine = Arc::new(RecordingEngine::ready());
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_response(crate::backend::QueryResponse {
            response: "rows updated".into(),
            data_updated: true,
            ..Default::default()
        });
        let (orchestrator, _bus) = orchestrator(engine, backend);

        let plan = ExecutionPlan {
            waves: vec![vec![step("1", StepKind::Backend, "append the new rows")]],
        };
        // No refresh signal is ever emitted; the step must still succeed.
        let result = orchestrator.execute(plan).await;
        assert!(result.success);
        assert_eq!(result.steps_failed, 0);
    }

    #[tokio::test]
    async fn test_spreadsheet_step_on_empty_engine_records_failure() {
        let engine = Arc::new(RecordingEngine::not_ready());
        let backend = Arc::new(ScriptedBackend::new());
        let (orchestrator, _bus) = orchestrator(engine, backend);

        let plan = ExecutionPlan {
            waves: vec![vec![step("1", StepKind::Spreadsheet, "make A1 bold")]],
        };
        let result = orchestrator.execute(plan).await;

        assert!(!result.success);
        assert_eq!(result.steps_executed, 0);
        assert_eq!(result.steps_failed, 1);
    }

    #[tokio::test]
    async fn test_plan_requires_planner_success() {
        let engine = Arc::new(RecordingEngine::ready());
        let backend = Arc::new(ScriptedBackend::new().with_plan(PlanResponse {
            success: false,
            execution_plan: Vec::new(),
            total_steps: 0,
        }));
        let (orchestrator, _bus) = orchestrator(engine, backend);

        assert!(orchestrator.plan("do things", "ws-1").await.is_err());
    }

    #[tokio::test]
    async fn test_manual_highlight_step() {
        let engine = Arc::new(RecordingEngine::ready());
        let backend = Arc::new(ScriptedBackend::new());
        let (orchestrator, _bus) = orchestrator(engine.clone(), backend);

        let plan = ExecutionPlan {
            waves: vec![vec![step(
                "1",
                StepKind::ManualHighlight,
                "highlight A2:A5 in red",
            )]],
        };
        let result = orchestrator.execute(plan).await;
        assert!(result.success);
        assert_eq!(engine.calls(), vec!["set_background_color(1,0,4,1,red)"]);
    }
}
