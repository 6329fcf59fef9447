//! Scripted collaborators for tests and offline runs
//!
//! Plain structs, no mocking framework: the engine records every call it
//! receives as a formatted signature, the oracle and backend replay
//! scripted responses, and the store keeps persisted snapshots in memory.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::backend::{BackendAnalytics, PlanResponse, QueryOptions, QueryResponse};
use crate::core::error::{PilotError, Result};
use crate::core::RangeRef;
use crate::engine::{
    ConditionalRule, Dimensions, FilterCriteria, FindReplaceOptions, Grid, SheetEngine, SortOrder,
    ValidationRule,
};
use crate::oracle::context::SheetContext;
use crate::oracle::{Classification, IntentOracle};
use crate::transcript::{TranscriptEntry, TranscriptStore};

/// Sheet engine double: records calls, optionally failing selected ops.
pub struct RecordingEngine {
    ready: AtomicBool,
    dims: Mutex<Dimensions>,
    data: Mutex<Grid>,
    named: Mutex<Vec<(String, RangeRef)>>,
    fail_ops: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
    duplicate_rows: Mutex<usize>,
    match_count: Mutex<usize>,
}

impl RecordingEngine {
    pub fn ready() -> Self {
        Self {
            ready: AtomicBool::new(true),
            dims: Mutex::new(Dimensions { rows: 100, cols: 26 }),
            data: Mutex::new(Vec::new()),
            named: Mutex::new(Vec::new()),
            fail_ops: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
            duplicate_rows: Mutex::new(0),
            match_count: Mutex::new(0),
        }
    }

    pub fn not_ready() -> Self {
        let engine = Self::ready();
        engine.ready.store(false, Ordering::SeqCst);
        engine
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn with_data(self, data: Grid) -> Self {
        {
            let mut dims = self.dims.lock().unwrap();
            dims.rows = data.len();
            dims.cols = data.first().map(Vec::len).unwrap_or(0);
            *self.data.lock().unwrap() = data;
        }
        self
    }

    /// Make every call of the named operation report failure.
    pub fn fail_op(&self, name: &str) {
        self.fail_ops.lock().unwrap().insert(name.to_string());
    }

    pub fn set_duplicate_rows(&self, count: usize) {
        *self.duplicate_rows.lock().unwrap() = count;
    }

    pub fn set_match_count(&self, count: usize) {
        *self.match_count.lock().unwrap() = count;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, op: &str) -> usize {
        let prefix = format!("{op}(");
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.starts_with(&prefix))
            .count()
    }

    fn record(&self, op: &str, args: String) -> bool {
        self.calls.lock().unwrap().push(format!("{op}({args})"));
        !self.fail_ops.lock().unwrap().contains(op)
    }

    fn range_args(range: RangeRef) -> String {
        format!(
            "{},{},{},{}",
            range.start_row, range.start_col, range.num_rows, range.num_cols
        )
    }
}

#[async_trait]
impl SheetEngine for RecordingEngine {
    async fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn dimensions(&self) -> Dimensions {
        *self.dims.lock().unwrap()
    }

    async fn all_data(&self) -> Grid {
        self.data.lock().unwrap().clone()
    }

    async fn set_cell_value(&self, row: usize, col: usize, value: Value) -> bool {
        self.record("set_cell_value", format!("{row},{col},{value}"))
    }

    async fn set_range_values(&self, range: RangeRef, values: Grid) -> bool {
        self.record(
            "set_range_values",
            format!("{},{} rows", Self::range_args(range), values.len()),
        )
    }

    async fn set_font_weight(&self, range: RangeRef, weight: &str) -> bool {
        self.record(
            "set_font_weight",
            format!("{},{weight}", Self::range_args(range)),
        )
    }

    async fn set_font_style(&self, range: RangeRef, style: &str) -> bool {
        self.record(
            "set_font_style",
            format!("{},{style}", Self::range_args(range)),
        )
    }

    async fn set_font_line(&self, range: RangeRef, line: &str) -> bool {
        self.record("set_font_line", format!("{},{line}", Self::range_args(range)))
    }

    async fn set_font_color(&self, range: RangeRef, color: &str) -> bool {
        self.record(
            "set_font_color",
            format!("{},{color}", Self::range_args(range)),
        )
    }

    async fn set_background_color(&self, range: RangeRef, color: &str) -> bool {
        self.record(
            "set_background_color",
            format!("{},{color}", Self::range_args(range)),
        )
    }

    async fn set_number_format(&self, range: RangeRef, format: &str) -> bool {
        self.record(
            "set_number_format",
            format!("{},{format}", Self::range_args(range)),
        )
    }

    async fn clear_range(&self, range: RangeRef) -> bool {
        self.record("clear_range", Self::range_args(range))
    }

    async fn clear_sheet(&self) -> bool {
        self.record("clear_sheet", String::new())
    }

    async fn insert_rows(&self, before_row: usize, count: usize) -> bool {
        self.record("insert_rows", format!("{before_row},{count}"))
    }

    async fn insert_columns(&self, before_col: usize, count: usize) -> bool {
        self.record("insert_columns", format!("{before_col},{count}"))
    }

    async fn delete_row(&self, row: usize) -> bool {
        self.record("delete_row", format!("{row}"))
    }

    async fn delete_column(&self, col: usize) -> bool {
        self.record("delete_column", format!("{col}"))
    }

    async fn hide_rows(&self, start_row: usize, count: usize) -> bool {
        self.record("hide_rows", format!("{start_row},{count}"))
    }

    async fn show_rows(&self, start_row: usize, count: usize) -> bool {
        self.record("show_rows", format!("{start_row},{count}"))
    }

    async fn hide_columns(&self, start_col: usize, count: usize) -> bool {
        self.record("hide_columns", format!("{start_col},{count}"))
    }

    async fn show_columns(&self, start_col: usize, count: usize) -> bool {
        self.record("show_columns", format!("{start_col},{count}"))
    }

    async fn merge_cells(&self, range: RangeRef) -> bool {
        self.record("merge_cells", Self::range_args(range))
    }

    async fn unmerge_cells(&self, range: RangeRef) -> bool {
        self.record("unmerge_cells", Self::range_args(range))
    }

    async fn autofit_columns(&self, start_col: usize, count: usize) -> bool {
        self.record("autofit_columns", format!("{start_col},{count}"))
    }

    async fn autofit_rows(&self, start_row: usize, count: usize) -> bool {
        self.record("autofit_rows", format!("{start_row},{count}"))
    }

    async fn freeze_rows(&self, count: usize) -> bool {
        self.record("freeze_rows", format!("{count}"))
    }

    async fn freeze_columns(&self, count: usize) -> bool {
        self.record("freeze_columns", format!("{count}"))
    }

    async fn unfreeze(&self) -> bool {
        self.record("unfreeze", String::new())
    }

    async fn sort_by_column(&self, col: usize, order: SortOrder) -> bool {
        self.record("sort_by_column", format!("{col},{order:?}"))
    }

    async fn split_text_to_columns(&self, col: usize, delimiter: &str) -> bool {
        self.record("split_text_to_columns", format!("{col},{delimiter}"))
    }

    async fn remove_duplicates(&self, range: Option<RangeRef>) -> usize {
        let args = range.map(Self::range_args).unwrap_or_default();
        self.record("remove_duplicates", args);
        *self.duplicate_rows.lock().unwrap()
    }

    async fn create_filter(&self) -> bool {
        self.record("create_filter", String::new())
    }

    async fn clear_filter(&self) -> bool {
        self.record("clear_filter", String::new())
    }

    async fn has_filter(&self) -> bool {
        false
    }

    async fn set_column_filter_criteria(&self, col: usize, criteria: FilterCriteria) -> bool {
        self.record("set_column_filter_criteria", format!("{col},{criteria:?}"))
    }

    async fn filtered_out_rows(&self) -> Vec<usize> {
        Vec::new()
    }

    async fn add_conditional_format(&self, range: RangeRef, rule: ConditionalRule) -> bool {
        self.record(
            "add_conditional_format",
            format!("{},{rule:?}", Self::range_args(range)),
        )
    }

    async fn add_validation(&self, range: RangeRef, rule: ValidationRule) -> bool {
        self.record(
            "add_validation",
            format!("{},{rule:?}", Self::range_args(range)),
        )
    }

    async fn set_hyperlink(&self, row: usize, col: usize, url: &str, label: Option<&str>) -> bool {
        self.record(
            "set_hyperlink",
            format!("{row},{col},{url},{}", label.unwrap_or("")),
        )
    }

    async fn hyperlink(&self, _row: usize, _col: usize) -> Option<String> {
        None
    }

    async fn remove_hyperlink(&self, row: usize, col: usize) -> bool {
        self.record("remove_hyperlink", format!("{row},{col}"))
    }

    async fn add_note(&self, row: usize, col: usize, note: &str) -> bool {
        self.record("add_note", format!("{row},{col},{note}"))
    }

    async fn note(&self, _row: usize, _col: usize) -> Option<String> {
        None
    }

    async fn remove_note(&self, row: usize, col: usize) -> bool {
        self.record("remove_note", format!("{row},{col}"))
    }

    async fn insert_image(&self, row: usize, col: usize, url: &str) -> bool {
        self.record("insert_image", format!("{row},{col},{url}"))
    }

    async fn create_named_range(&self, name: &str, range: RangeRef) -> bool {
        let ok = self.record(
            "create_named_range",
            format!("{name},{}", Self::range_args(range)),
        );
        if ok {
            self.named.lock().unwrap().push((name.to_string(), range));
        }
        ok
    }

    async fn delete_named_range(&self, name: &str) -> bool {
        let ok = self.record("delete_named_range", name.to_string());
        if ok {
            self.named.lock().unwrap().retain(|(n, _)| n != name);
        }
        ok
    }

    async fn named_ranges(&self) -> Vec<(String, RangeRef)> {
        self.named.lock().unwrap().clone()
    }

    async fn rename_named_range(&self, old_name: &str, new_name: &str) -> bool {
        let ok = self.record("rename_named_range", format!("{old_name},{new_name}"));
        if ok {
            for entry in self.named.lock().unwrap().iter_mut() {
                if entry.0 == old_name {
                    entry.0 = new_name.to_string();
                }
            }
        }
        ok
    }

    async fn update_named_range(&self, name: &str, range: RangeRef) -> bool {
        self.record(
            "update_named_range",
            format!("{name},{}", Self::range_args(range)),
        )
    }

    async fn find_and_replace(
        &self,
        find: &str,
        replace: &str,
        options: FindReplaceOptions,
    ) -> usize {
        self.record(
            "find_and_replace",
            format!("{find},{replace},{},{}", options.match_case, options.entire_cell),
        );
        *self.match_count.lock().unwrap()
    }
}

enum ScriptedResponse {
    Classify(Classification),
    Fail(String),
}

/// Oracle double replaying scripted classifications.
pub struct ScriptedOracle {
    script: Mutex<VecDeque<ScriptedResponse>>,
    fallback: ScriptedResponse,
    delay: Option<Duration>,
    seen: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    pub fn with_classification(classification: Classification) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: ScriptedResponse::Classify(classification),
            delay: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: ScriptedResponse::Fail(message.to_string()),
            delay: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a one-shot classification ahead of the fallback.
    pub fn push(&self, classification: Classification) {
        self.script
            .lock()
            .unwrap()
            .push_back(ScriptedResponse::Classify(classification));
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl IntentOracle for ScriptedOracle {
    async fn classify(&self, text: &str, _context: &SheetContext) -> Result<Classification> {
        self.seen.lock().unwrap().push(text.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let response = self.script.lock().unwrap().pop_front();
        match response.as_ref().unwrap_or(&self.fallback) {
            ScriptedResponse::Classify(cls) => Ok(cls.clone()),
            ScriptedResponse::Fail(message) => Err(PilotError::OracleUnavailable(message.clone())),
        }
    }
}

/// Backend double: records delegated queries and replays canned responses.
pub struct ScriptedBackend {
    queries: Mutex<Vec<(String, QueryOptions)>>,
    responses: Mutex<VecDeque<QueryResponse>>,
    plan: Mutex<Option<PlanResponse>>,
    fail_queries: AtomicBool,
    cancelled: AtomicBool,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            queries: Mutex::new(Vec::new()),
            responses: Mutex::new(VecDeque::new()),
            plan: Mutex::new(None),
            fail_queries: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
        }
    }

    pub fn with_plan(self, plan: PlanResponse) -> Self {
        *self.plan.lock().unwrap() = Some(plan);
        self
    }

    pub fn push_response(&self, response: QueryResponse) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn fail_queries(&self) {
        self.fail_queries.store(true, Ordering::SeqCst);
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries
            .lock()
            .unwrap()
            .iter()
            .map(|(text, _)| text.clone())
            .collect()
    }

    pub fn was_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BackendAnalytics for ScriptedBackend {
    async fn send_query(
        &self,
        text: &str,
        _chat_id: &str,
        options: QueryOptions,
    ) -> Result<QueryResponse> {
        self.queries
            .lock()
            .unwrap()
            .push((text.to_string(), options));
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(PilotError::Backend("analytics offline".into()));
        }
        let scripted = self.responses.lock().unwrap().pop_front();
        Ok(scripted.unwrap_or_else(|| QueryResponse {
            response: format!("Analyzed: {text}"),
            ..Default::default()
        }))
    }

    async fn analyze_workspace_insights(
        &self,
        workspace_id: &str,
        insight_type: &str,
        _focus_area: Option<&str>,
    ) -> Result<Value> {
        Ok(json!({"workspace_id": workspace_id, "type": insight_type}))
    }

    async fn smart_format_workspace(&self, workspace_id: &str, template: &str) -> Result<Value> {
        Ok(json!({"workspace_id": workspace_id, "template": template}))
    }

    async fn quick_data_entry(
        &self,
        workspace_id: &str,
        action: &str,
        _params: &Value,
    ) -> Result<Value> {
        Ok(json!({"workspace_id": workspace_id, "action": action}))
    }

    async fn orchestrate(
        &self,
        _query: &str,
        _workspace_id: &str,
        _preview_only: bool,
    ) -> Result<PlanResponse> {
        self.plan
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| PilotError::Backend("no plan configured".into()))
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

/// In-memory transcript store.
pub struct MemoryStore {
    saved: Mutex<Vec<(String, usize)>>,
    fail: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            saved: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    pub fn failing() -> Self {
        let store = Self::new();
        store.fail.store(true, Ordering::SeqCst);
        store
    }

    /// (chat_id, entry count) per persist call.
    pub fn saves(&self) -> Vec<(String, usize)> {
        self.saved.lock().unwrap().clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranscriptStore for MemoryStore {
    async fn persist(&self, chat_id: &str, entries: &[TranscriptEntry]) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PilotError::Backend("transcript store offline".into()));
        }
        self.saved
            .lock()
            .unwrap()
            .push((chat_id.to_string(), entries.len()));
        Ok(())
    }
}
