//! Sheet Engine Adapter contract
//!
//! The spreadsheet grid itself lives outside this crate; the core only
//! consumes this capability trait. Mutations return a plain `bool` success
//! signal: the adapter never errors across the boundary, and handlers turn
//! a `false` into a user-facing failure message.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::RangeRef;

/// The full sheet contents as rows of JSON values.
pub type Grid = Vec<Vec<Value>>;

/// Sheet extent in rows and columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub rows: usize,
    pub cols: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Options for find-and-replace over the whole sheet.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FindReplaceOptions {
    pub match_case: bool,
    pub entire_cell: bool,
}

/// Conditional-format rule payloads the engine knows how to apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConditionalRule {
    DuplicateValues { color: String },
    UniqueValues { color: String },
    GreaterThan { value: f64, color: String },
    LessThan { value: f64, color: String },
    EqualTo { value: Value, color: String },
    TextContains { text: String, color: String },
}

/// Data-validation rule payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationRule {
    Dropdown { options: Vec<String> },
    NumberRange { min: f64, max: f64 },
    Date,
}

/// Per-column filter criteria.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterCriteria {
    Equals { value: Value },
    Contains { text: String },
    GreaterThan { value: f64 },
    LessThan { value: f64 },
}

/// The spreadsheet capability interface.
///
/// All operations are async: several of them (notes, images, structural
/// edits) complete through the host UI's own event loop.
#[async_trait]
pub trait SheetEngine: Send + Sync {
    async fn is_ready(&self) -> bool;
    async fn dimensions(&self) -> Dimensions;
    async fn all_data(&self) -> Grid;

    // Cell and range values / formatting.
    async fn set_cell_value(&self, row: usize, col: usize, value: Value) -> bool;
    async fn set_range_values(&self, range: RangeRef, values: Grid) -> bool;
    async fn set_font_weight(&self, range: RangeRef, weight: &str) -> bool;
    async fn set_font_style(&self, range: RangeRef, style: &str) -> bool;
    async fn set_font_line(&self, range: RangeRef, line: &str) -> bool;
    async fn set_font_color(&self, range: RangeRef, color: &str) -> bool;
    async fn set_background_color(&self, range: RangeRef, color: &str) -> bool;
    async fn set_number_format(&self, range: RangeRef, format: &str) -> bool;
    async fn clear_range(&self, range: RangeRef) -> bool;
    async fn clear_sheet(&self) -> bool;

    // Structural operations.
    async fn insert_rows(&self, before_row: usize, count: usize) -> bool;
    async fn insert_columns(&self, before_col: usize, count: usize) -> bool;
    async fn delete_row(&self, row: usize) -> bool;
    async fn delete_column(&self, col: usize) -> bool;
    async fn hide_rows(&self, start_row: usize, count: usize) -> bool;
    async fn show_rows(&self, start_row: usize, count: usize) -> bool;
    async fn hide_columns(&self, start_col: usize, count: usize) -> bool;
    async fn show_columns(&self, start_col: usize, count: usize) -> bool;
    async fn merge_cells(&self, range: RangeRef) -> bool;
    async fn unmerge_cells(&self, range: RangeRef) -> bool;
    async fn autofit_columns(&self, start_col: usize, count: usize) -> bool;
    async fn autofit_rows(&self, start_row: usize, count: usize) -> bool;
    async fn freeze_rows(&self, count: usize) -> bool;
    async fn freeze_columns(&self, count: usize) -> bool;
    async fn unfreeze(&self) -> bool;
    async fn sort_by_column(&self, col: usize, order: SortOrder) -> bool;
    async fn split_text_to_columns(&self, col: usize, delimiter: &str) -> bool;

    /// Remove duplicate rows, optionally restricted to a range.
    /// Returns the number of rows removed.
    async fn remove_duplicates(&self, range: Option<RangeRef>) -> usize;

    // Filters.
    async fn create_filter(&self) -> bool;
    async fn clear_filter(&self) -> bool;
    async fn has_filter(&self) -> bool;
    async fn set_column_filter_criteria(&self, col: usize, criteria: FilterCriteria) -> bool;
    async fn filtered_out_rows(&self) -> Vec<usize>;

    // Rules.
    async fn add_conditional_format(&self, range: RangeRef, rule: ConditionalRule) -> bool;
    async fn add_validation(&self, range: RangeRef, rule: ValidationRule) -> bool;

    // Hyperlinks, notes, images.
    async fn set_hyperlink(&self, row: usize, col: usize, url: &str, label: Option<&str>) -> bool;
    async fn hyperlink(&self, row: usize, col: usize) -> Option<String>;
    async fn remove_hyperlink(&self, row: usize, col: usize) -> bool;
    async fn add_note(&self, row: usize, col: usize, note: &str) -> bool;
    async fn note(&self, row: usize, col: usize) -> Option<String>;
    async fn remove_note(&self, row: usize, col: usize) -> bool;
    async fn insert_image(&self, row: usize, col: usize, url: &str) -> bool;

    // Named ranges.
    async fn create_named_range(&self, name: &str, range: RangeRef) -> bool;
    async fn delete_named_range(&self, name: &str) -> bool;
    async fn named_ranges(&self) -> Vec<(String, RangeRef)>;
    async fn rename_named_range(&self, old_name: &str, new_name: &str) -> bool;
    async fn update_named_range(&self, name: &str, range: RangeRef) -> bool;

    /// Returns the number of replaced matches.
    async fn find_and_replace(
        &self,
        find: &str,
        replace: &str,
        options: FindReplaceOptions,
    ) -> usize;
}
