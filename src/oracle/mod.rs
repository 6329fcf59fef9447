//! Intent classification data model and the oracle seam
//!
//! The oracle is an external natural-language classifier. The core treats it
//! as pluggable and possibly unavailable: everything downstream consumes the
//! [`Classification`] it produces, never the oracle itself, and the router
//! decides what a low-confidence or missing classification means.

pub mod client;
pub mod context;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::Result;
use context::SheetContext;

/// Command intent categories the oracle can produce.
///
/// The first eleven are the frontend whitelist: the only intents a
/// high-confidence classification may dispatch locally. Everything else is
/// either backend-routable or unhandled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    FreezeOperation,
    RangeOperation,
    RowOperation,
    ColumnOperation,
    TableOperation,
    ConditionalFormat,
    HyperlinkOperation,
    DataValidation,
    CommentOperation,
    ImageOperation,
    NamedRangeOperation,
    AnalysisQuery,
    ChartRequest,
    WorkspaceInsight,
    GeneralQuery,
    #[serde(other)]
    Unknown,
}

impl Intent {
    /// Whether a handler may execute this intent locally against the engine.
    pub fn frontend_whitelisted(&self) -> bool {
        matches!(
            self,
            Intent::FreezeOperation
                | Intent::RangeOperation
                | Intent::RowOperation
                | Intent::ColumnOperation
                | Intent::TableOperation
                | Intent::ConditionalFormat
                | Intent::HyperlinkOperation
                | Intent::DataValidation
                | Intent::CommentOperation
                | Intent::ImageOperation
                | Intent::NamedRangeOperation
        )
    }

    /// Whether this intent can be answered by the analytics backend.
    pub fn backend_routable(&self) -> bool {
        matches!(
            self,
            Intent::AnalysisQuery
                | Intent::ChartRequest
                | Intent::WorkspaceInsight
                | Intent::GeneralQuery
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::FreezeOperation => "freeze_operation",
            Intent::RangeOperation => "range_operation",
            Intent::RowOperation => "row_operation",
            Intent::ColumnOperation => "column_operation",
            Intent::TableOperation => "table_operation",
            Intent::ConditionalFormat => "conditional_format",
            Intent::HyperlinkOperation => "hyperlink_operation",
            Intent::DataValidation => "data_validation",
            Intent::CommentOperation => "comment_operation",
            Intent::ImageOperation => "image_operation",
            Intent::NamedRangeOperation => "named_range_operation",
            Intent::AnalysisQuery => "analysis_query",
            Intent::ChartRequest => "chart_request",
            Intent::WorkspaceInsight => "workspace_insight",
            Intent::GeneralQuery => "general_query",
            Intent::Unknown => "unknown",
        }
    }
}

/// Optional classification target (a range, column, or named object).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub identifier: String,
}

/// A structured classification of one command.
///
/// Produced once per command by the oracle or synthesized by the fast-path
/// matcher (confidence 1.0). Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub intent: Intent,
    pub action: String,
    pub confidence: f32,
    #[serde(default)]
    pub target: Option<Target>,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl Classification {
    /// Synthesize a classification from a matched fast-path rule.
    pub fn fast_path(intent: Intent, action: &str, parameters: Map<String, Value>) -> Self {
        Self {
            intent,
            action: action.to_string(),
            confidence: 1.0,
            target: None,
            parameters,
        }
    }

    pub fn str_param(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(Value::as_str)
    }

    pub fn f64_param(&self, key: &str) -> Option<f64> {
        let value = self.parameters.get(key)?;
        value
            .as_f64()
            .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
    }

    pub fn usize_param(&self, key: &str) -> Option<usize> {
        let value = self.parameters.get(key)?;
        value
            .as_u64()
            .map(|n| n as usize)
            .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
    }

    /// A list parameter: either a JSON array of strings or a comma-separated
    /// string, as different oracle versions emit both.
    pub fn list_param(&self, key: &str) -> Option<Vec<String>> {
        match self.parameters.get(key)? {
            Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect(),
            ),
            Value::String(s) => Some(
                s.split(',')
                    .map(|part| part.trim().to_string())
                    .filter(|part| !part.is_empty())
                    .collect(),
            ),
            _ => None,
        }
    }
}

/// The pluggable classifier seam.
#[async_trait]
pub trait IntentOracle: Send + Sync {
    /// Classify raw command text. May fail or hang; callers guard with a
    /// timeout and treat failure as a routing signal, not a user error.
    async fn classify(&self, text: &str, context: &SheetContext) -> Result<Classification>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_intent_deserialization() {
        let intent: Intent = serde_json::from_str("\"column_operation\"").unwrap();
        assert_eq!(intent, Intent::ColumnOperation);
    }

    #[test]
    fn test_unknown_intent_falls_through() {
        let intent: Intent = serde_json::from_str("\"pivot_table_wizard\"").unwrap();
        assert_eq!(intent, Intent::Unknown);
        assert!(!intent.frontend_whitelisted());
        assert!(!intent.backend_routable());
    }

    #[test]
    fn test_whitelist_membership() {
        assert!(Intent::FreezeOperation.frontend_whitelisted());
        assert!(Intent::NamedRangeOperation.frontend_whitelisted());
        assert!(!Intent::AnalysisQuery.frontend_whitelisted());
        assert!(Intent::AnalysisQuery.backend_routable());
    }

    #[test]
    fn test_full_classification_deserialization() {
        let json = r#"{
            "intent": "column_operation",
            "action": "delete_columns_multiple",
            "confidence": 0.92,
            "target": {"identifier": "D:E"},
            "parameters": {"columns": ["D", "E"]}
        }"#;
        let cls: Classification = serde_json::from_str(json).unwrap();
        assert_eq!(cls.intent, Intent::ColumnOperation);
        assert_eq!(cls.action, "delete_columns_multiple");
        assert_eq!(cls.list_param("columns").unwrap(), vec!["D", "E"]);
        assert_eq!(cls.target.unwrap().identifier, "D:E");
    }

    #[test]
    fn test_param_accessors() {
        let mut params = Map::new();
        params.insert("count".into(), json!(3));
        params.insert("rate".into(), json!("0.5"));
        params.insert("cols".into(), json!("D, E,"));
        let cls = Classification::fast_path(Intent::RowOperation, "insert_rows", params);
        assert_eq!(cls.usize_param("count"), Some(3));
        assert_eq!(cls.f64_param("rate"), Some(0.5));
        assert_eq!(cls.list_param("cols").unwrap(), vec!["D", "E"]);
        assert!((cls.confidence - 1.0).abs() < f32::EPSILON);
    }
}
