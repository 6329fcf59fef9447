//! Universal query router
//!
//! Combines the oracle's classification with built-in phrasing heuristics
//! to pick a processor type for a command the fast path did not resolve.
//!
//! The confidence gate is the load-bearing rule: below 0.8 the
//! classification is only trusted to mean "structured dispatch is not
//! safe", and the raw text goes to the analytics backend unmodified.
//! Low-confidence intents never drive handlers or orchestration.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::error::{PilotError, Result};
use crate::oracle::context::SheetContext;
use crate::oracle::{Classification, IntentOracle};

/// The execution path chosen for a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorType {
    DirectBackend,
    DirectFrontend,
    Orchestrated,
    FallbackLegacy,
}

/// Coarse query shape, reported alongside the processor choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    Mutation,
    Analytical,
    Compound,
    Conversational,
}

/// Routing output. Derived per command, never persisted.
#[derive(Debug, Clone)]
pub struct RoutingDecision {
    pub processor: ProcessorType,
    pub query_type: QueryType,
    pub confidence: f32,
    pub reasoning: String,
}

/// A routing decision plus the classification backing it.
///
/// `classification` is `None` exactly when the decision must not be driven
/// by structured intent: oracle failure, or confidence below the gate.
#[derive(Debug, Clone)]
pub struct Routed {
    pub decision: RoutingDecision,
    pub classification: Option<Classification>,
}

/// Minimum oracle confidence for structured dispatch.
pub const CONFIDENCE_GATE: f32 = 0.8;

/// Multi-clause conjunctions that mark a compound, multi-step command.
const COMPOUND_MARKERS: &[&str] = &[
    "and then",
    " then ",
    ", then",
    "after that",
    "afterwards",
    "followed by",
    "once that is done",
    "and also",
];

/// Comparative/statistical phrasing that marks an analytical query.
const ANALYTICAL_MARKERS: &[&str] = &[
    "average",
    "mean",
    "median",
    "sum of",
    "total",
    "trend",
    "correlat",
    "compare",
    "comparison",
    " versus ",
    " vs ",
    " top ",
    " bottom ",
    "best",
    "worst",
    "highest",
    "lowest",
    "distribution",
    "forecast",
    "predict",
    "insight",
    "analyz",
    "analys",
    "summarize",
    "summary",
    "why ",
    "how many",
    "how much",
];

/// Does the text read as a multi-step command?
pub fn is_compound(text: &str) -> bool {
    let lower = text.to_lowercase();
    COMPOUND_MARKERS.iter().any(|m| lower.contains(m))
}

/// Does the text read as a data question rather than a mutation?
pub fn is_analytical(text: &str) -> bool {
    let lower = text.to_lowercase();
    ANALYTICAL_MARKERS.iter().any(|m| lower.contains(m))
}

pub struct QueryRouter {
    oracle: Arc<dyn IntentOracle>,
    oracle_timeout: Duration,
}

impl QueryRouter {
    pub fn new(oracle: Arc<dyn IntentOracle>, oracle_timeout: Duration) -> Self {
        Self {
            oracle,
            oracle_timeout,
        }
    }

    /// Route a command that the fast path did not resolve.
    ///
    /// Never fails on oracle trouble (that becomes `FallbackLegacy`); the
    /// only error is `UnhandledIntent` for a high-confidence classification
    /// that is neither frontend-whitelisted nor backend-routable.
    pub async fn route(&self, text: &str, context: &SheetContext) -> Result<Routed> {
        let classified =
            match tokio::time::timeout(self.oracle_timeout, self.oracle.classify(text, context))
                .await
            {
                Err(_) => {
                    warn!("intent oracle timed out; falling back to legacy routing");
                    return Ok(Self::fallback("intent oracle timed out"));
                }
                Ok(Err(e)) => {
                    warn!(error = %e, "intent oracle failed; falling back to legacy routing");
                    return Ok(Self::fallback(&format!("intent oracle failed: {e}")));
                }
                Ok(Ok(classified)) => classified,
            };

        if classified.confidence < CONFIDENCE_GATE {
            let decision = RoutingDecision {
                processor: ProcessorType::DirectBackend,
                query_type: QueryType::Conversational,
                confidence: classified.confidence,
                reasoning: format!(
                    "confidence {:.2} below gate {CONFIDENCE_GATE}; delegating raw text to analytics",
                    classified.confidence
                ),
            };
            info!(processor = ?decision.processor, reasoning = %decision.reasoning, "routed");
            // The classification is deliberately withheld: it must not be
            // used for structured dispatch.
            return Ok(Routed {
                decision,
                classification: None,
            });
        }

        let decision = if is_compound(text) {
            RoutingDecision {
                processor: ProcessorType::Orchestrated,
                query_type: QueryType::Compound,
                confidence: classified.confidence,
                reasoning: "multi-clause phrasing indicates a compound command".into(),
            }
        } else if classified.intent.frontend_whitelisted() {
            RoutingDecision {
                processor: ProcessorType::DirectFrontend,
                query_type: QueryType::Mutation,
                confidence: classified.confidence,
                reasoning: format!(
                    "intent '{}' is a whitelisted spreadsheet mutation",
                    classified.intent.as_str()
                ),
            }
        } else if classified.intent.backend_routable() || is_analytical(text) {
            RoutingDecision {
                processor: ProcessorType::DirectBackend,
                query_type: QueryType::Analytical,
                confidence: classified.confidence,
                reasoning: format!(
                    "intent '{}' is an analytical query",
                    classified.intent.as_str()
                ),
            }
        } else {
            // High confidence in something this engine cannot execute: an
            // explicit error, never a silent best-guess.
            return Err(PilotError::UnhandledIntent {
                intent: classified.intent.as_str().to_string(),
                action: classified.action.clone(),
            });
        };

        info!(processor = ?decision.processor, reasoning = %decision.reasoning, "routed");
        Ok(Routed {
            decision,
            classification: Some(classified),
        })
    }

    fn fallback(reason: &str) -> Routed {
        Routed {
            decision: RoutingDecision {
                processor: ProcessorType::FallbackLegacy,
                query_type: QueryType::Conversational,
                confidence: 0.5,
                reasoning: reason.to_string(),
            },
            classification: None,
        }
    }
}
