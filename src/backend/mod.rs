//! Backend Analytics collaborator contract
//!
//! The analytics service answers data questions, renders visualizations,
//! runs workspace-level helpers, and decomposes compound commands into
//! execution plans. The core depends only on this trait.

pub mod client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::Result;
use crate::orchestrator::Wave;

/// How a delegated query should be handled by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    #[default]
    Standard,
    /// Run as an autonomous agent step.
    Agent,
    /// Produce a chart specification.
    Chart,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct QueryOptions {
    pub mode: QueryMode,
}

impl QueryOptions {
    pub fn agent() -> Self {
        Self {
            mode: QueryMode::Agent,
        }
    }

    pub fn chart() -> Self {
        Self {
            mode: QueryMode::Chart,
        }
    }
}

/// Response to a delegated query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResponse {
    pub response: String,
    #[serde(default)]
    pub visualization: Option<Value>,
    /// True when the service mutated the workspace data; the caller must
    /// wait for the engine refresh before reading sheet state again.
    #[serde(default)]
    pub data_updated: bool,
    #[serde(default)]
    pub updated_data: Option<Value>,
}

/// Response from the compound-command decomposition service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanResponse {
    pub success: bool,
    #[serde(default)]
    pub execution_plan: Vec<Wave>,
    #[serde(default)]
    pub total_steps: usize,
}

/// The analytics collaborator seam.
#[async_trait]
pub trait BackendAnalytics: Send + Sync {
    async fn send_query(
        &self,
        text: &str,
        chat_id: &str,
        options: QueryOptions,
    ) -> Result<QueryResponse>;

    async fn analyze_workspace_insights(
        &self,
        workspace_id: &str,
        insight_type: &str,
        focus_area: Option<&str>,
    ) -> Result<Value>;

    async fn smart_format_workspace(&self, workspace_id: &str, template: &str) -> Result<Value>;

    async fn quick_data_entry(
        &self,
        workspace_id: &str,
        action: &str,
        params: &Value,
    ) -> Result<Value>;

    /// Decompose a compound query into step waves.
    async fn orchestrate(
        &self,
        query: &str,
        workspace_id: &str,
        preview_only: bool,
    ) -> Result<PlanResponse>;

    /// Best-effort cancellation of the in-flight request, if any. Completed
    /// work is not undone.
    fn cancel(&self);
}
