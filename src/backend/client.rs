//! HTTP analytics client
//!
//! Thin reqwest client for the analytics service. Cancellation is
//! best-effort: `cancel()` wakes any in-flight request, which returns a
//! backend error without undoing server-side work already done.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::Notify;

use crate::backend::{BackendAnalytics, PlanResponse, QueryOptions, QueryResponse};
use crate::core::error::{PilotError, Result};

pub struct HttpBackend {
    client: Client,
    base_url: String,
    cancel: Notify,
}

impl HttpBackend {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            cancel: Notify::new(),
        }
    }

    /// Create a client from environment variables.
    ///
    /// Required: SHEETPILOT_BACKEND_URL
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("SHEETPILOT_BACKEND_URL")
            .map_err(|_| PilotError::Backend("SHEETPILOT_BACKEND_URL not set".into()))?;
        Ok(Self::new(base_url))
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, path);
        let request = self.client.post(&url).json(&body).send();

        // A cancel notification wins the race and aborts the request.
        let response = tokio::select! {
            result = request => result.map_err(|e| PilotError::Backend(e.to_string()))?,
            _ = self.cancel.notified() => {
                return Err(PilotError::Backend("request cancelled".into()));
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(PilotError::Backend(format!(
                "{} returned {}: {}",
                path, status, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| PilotError::Backend(e.to_string()))
    }
}

#[async_trait]
impl BackendAnalytics for HttpBackend {
    async fn send_query(
        &self,
        text: &str,
        chat_id: &str,
        options: QueryOptions,
    ) -> Result<QueryResponse> {
        let body = json!({
            "query": text,
            "chat_id": chat_id,
            "mode": options.mode,
        });
        let value = self.post("query", body).await?;
        serde_json::from_value(value).map_err(|e| PilotError::Backend(e.to_string()))
    }

    async fn analyze_workspace_insights(
        &self,
        workspace_id: &str,
        insight_type: &str,
        focus_area: Option<&str>,
    ) -> Result<Value> {
        self.post(
            "insights",
            json!({
                "workspace_id": workspace_id,
                "type": insight_type,
                "focus_area": focus_area,
            }),
        )
        .await
    }

    async fn smart_format_workspace(&self, workspace_id: &str, template: &str) -> Result<Value> {
        self.post(
            "format",
            json!({
                "workspace_id": workspace_id,
                "template": template,
            }),
        )
        .await
    }

    async fn quick_data_entry(
        &self,
        workspace_id: &str,
        action: &str,
        params: &Value,
    ) -> Result<Value> {
        self.post(
            "data-entry",
            json!({
                "workspace_id": workspace_id,
                "action": action,
                "params": params,
            }),
        )
        .await
    }

    async fn orchestrate(
        &self,
        query: &str,
        workspace_id: &str,
        preview_only: bool,
    ) -> Result<PlanResponse> {
        let value = self
            .post(
                "orchestrate",
                json!({
                    "query": query,
                    "workspace_id": workspace_id,
                    "preview_only": preview_only,
                }),
            )
            .await?;
        serde_json::from_value(value).map_err(|e| PilotError::Backend(e.to_string()))
    }

    fn cancel(&self) {
        self.cancel.notify_waiters();
    }
}
