//! Sheet context for classifier prompts
//!
//! The oracle disambiguates better when it can see the shape of the sheet
//! the command targets: how big it is, what the header row says, which
//! named ranges exist. This module builds that summary from the engine.

use serde_json::Value;

use crate::engine::SheetEngine;

/// Workspace state summarized for the classifier prompt.
#[derive(Debug, Clone, Default)]
pub struct SheetContext {
    /// Sheet extent in rows.
    pub rows: usize,
    /// Sheet extent in columns.
    pub cols: usize,
    /// Header row values, if the sheet has any data.
    pub headers: Vec<String>,
    /// Names the command might reference.
    pub named_ranges: Vec<String>,
}

impl SheetContext {
    /// Build a context snapshot from the engine. Headers are capped so the
    /// prompt stays small on wide sheets.
    pub async fn from_engine(engine: &dyn SheetEngine) -> Self {
        if !engine.is_ready().await {
            return Self::default();
        }

        let dims = engine.dimensions().await;
        let data = engine.all_data().await;
        let headers = data
            .first()
            .map(|row| {
                row.iter()
                    .take(26)
                    .map(|cell| match cell {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let named_ranges = engine
            .named_ranges()
            .await
            .into_iter()
            .map(|(name, _)| name)
            .collect();

        Self {
            rows: dims.rows,
            cols: dims.cols,
            headers,
            named_ranges,
        }
    }

    /// Render the context as prompt text.
    pub fn summary(&self) -> String {
        if self.rows == 0 && self.cols == 0 {
            return "The spreadsheet is empty or not loaded.".to_string();
        }

        let mut lines = vec![format!(
            "Sheet dimensions: {} rows x {} columns.",
            self.rows, self.cols
        )];
        if !self.headers.is_empty() {
            lines.push(format!("Header row: {}.", self.headers.join(", ")));
        }
        if !self.named_ranges.is_empty() {
            lines.push(format!("Named ranges: {}.", self.named_ranges.join(", ")));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_context_summary() {
        let context = SheetContext::default();
        assert_eq!(context.summary(), "The spreadsheet is empty or not loaded.");
    }

    #[test]
    fn test_summary_includes_headers_and_names() {
        let context = SheetContext {
            rows: 100,
            cols: 5,
            headers: vec!["Name".into(), "Revenue".into()],
            named_ranges: vec!["sales_q1".into()],
        };
        let summary = context.summary();
        assert!(summary.contains("100 rows x 5 columns"));
        assert!(summary.contains("Name, Revenue"));
        assert!(summary.contains("sales_q1"));
    }
}
