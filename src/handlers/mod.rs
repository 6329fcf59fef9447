//! Handler registry / structured dispatch
//!
//! An explicit `(intent, action) -> handler` table replaces a monolithic
//! intent switch. Each handler validates its parameters, converts human
//! references through `core::refs`, calls the engine, and returns a
//! [`HandlerOutcome`]. Handlers never propagate errors past their own
//! boundary: every failure becomes `{ success: false, message }`.

pub mod annotate;
pub mod format;
pub mod rules;
pub mod structure;
pub mod tables;

use std::future::Future;
use std::pin::Pin;

use ahash::AHashMap;
use tracing::debug;

use crate::core::refs::{self, CellRef, RangeRef};
use crate::engine::SheetEngine;
use crate::oracle::{Classification, Intent};

/// Success or failure plus the user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerOutcome {
    pub success: bool,
    pub message: String,
}

impl HandlerOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = HandlerOutcome> + Send + 'a>>;

/// A registered handler: borrows the engine and classification for the
/// duration of one dispatch.
pub type Handler = for<'a> fn(&'a dyn SheetEngine, &'a Classification) -> HandlerFuture<'a>;

pub struct HandlerRegistry {
    table: AHashMap<Intent, AHashMap<&'static str, Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        use Intent::*;

        let mut registry = Self {
            table: AHashMap::new(),
        };

        // Range formatting.
        registry.register(RangeOperation, "apply_bold", format::apply_bold);
        registry.register(RangeOperation, "apply_italic", format::apply_italic);
        registry.register(RangeOperation, "apply_underline", format::apply_underline);
        registry.register(
            RangeOperation,
            "apply_strikethrough",
            format::apply_strikethrough,
        );
        registry.register(
            RangeOperation,
            "set_background_color",
            format::set_background_color,
        );
        registry.register(RangeOperation, "set_font_color", format::set_font_color);
        registry.register(RangeOperation, "set_number_format", format::set_number_format);
        registry.register(RangeOperation, "clear_range", format::clear_range);
        registry.register(RangeOperation, "merge_cells", structure::merge_cells);
        registry.register(RangeOperation, "unmerge_cells", structure::unmerge_cells);

        // Rows.
        registry.register(RowOperation, "insert_rows", structure::insert_rows);
        registry.register(RowOperation, "delete_row", structure::delete_row);
        registry.register(RowOperation, "hide_rows", structure::hide_rows);
        registry.register(RowOperation, "show_rows", structure::show_rows);
        registry.register(RowOperation, "autofit_rows", structure::autofit_rows);

        // Columns.
        registry.register(ColumnOperation, "insert_columns", structure::insert_columns);
        registry.register(ColumnOperation, "delete_column", structure::delete_column);
        registry.register(
            ColumnOperation,
            "delete_columns_multiple",
            structure::delete_columns_multiple,
        );
        registry.register(ColumnOperation, "hide_columns", structure::hide_columns);
        registry.register(ColumnOperation, "show_columns", structure::show_columns);
        registry.register(ColumnOperation, "autofit_columns", structure::autofit_columns);

        // Freeze panes.
        registry.register(FreezeOperation, "freeze_rows", structure::freeze_rows);
        registry.register(FreezeOperation, "freeze_columns", structure::freeze_columns);
        registry.register(FreezeOperation, "unfreeze", structure::unfreeze);

        // Tables.
        registry.register(TableOperation, "sort", tables::sort);
        registry.register(TableOperation, "create_filter", tables::create_filter);
        registry.register(TableOperation, "clear_filter", tables::clear_filter);
        registry.register(TableOperation, "filter_by_value", tables::filter_by_value);
        registry.register(
            TableOperation,
            "split_text_to_columns",
            tables::split_text_to_columns,
        );
        registry.register(TableOperation, "remove_duplicates", tables::remove_duplicates);
        registry.register(TableOperation, "find_replace", tables::find_replace);
        registry.register(TableOperation, "clear_sheet", tables::clear_sheet);

        // Conditional formatting.
        registry.register(
            ConditionalFormat,
            "highlight_duplicates",
            rules::highlight_duplicates,
        );
        registry.register(ConditionalFormat, "highlight_unique", rules::highlight_unique);
        registry.register(
            ConditionalFormat,
            "highlight_greater_than",
            rules::highlight_greater_than,
        );
        registry.register(
            ConditionalFormat,
            "highlight_less_than",
            rules::highlight_less_than,
        );
        registry.register(
            ConditionalFormat,
            "highlight_equal_to",
            rules::highlight_equal_to,
        );
        registry.register(
            ConditionalFormat,
            "highlight_text_contains",
            rules::highlight_text_contains,
        );

        // Data validation.
        registry.register(DataValidation, "add_dropdown", rules::add_dropdown);
        registry.register(DataValidation, "add_number_range", rules::add_number_range);
        registry.register(DataValidation, "add_date_validation", rules::add_date_validation);

        // Hyperlinks, notes, images, named ranges.
        registry.register(HyperlinkOperation, "set_hyperlink", annotate::set_hyperlink);
        registry.register(
            HyperlinkOperation,
            "remove_hyperlink",
            annotate::remove_hyperlink,
        );
        registry.register(CommentOperation, "add_note", annotate::add_note);
        registry.register(CommentOperation, "remove_note", annotate::remove_note);
        registry.register(ImageOperation, "insert_image", annotate::insert_image);
        registry.register(
            NamedRangeOperation,
            "create_named_range",
            annotate::create_named_range,
        );
        registry.register(
            NamedRangeOperation,
            "delete_named_range",
            annotate::delete_named_range,
        );
        registry.register(
            NamedRangeOperation,
            "rename_named_range",
            annotate::rename_named_range,
        );
        registry.register(
            NamedRangeOperation,
            "list_named_ranges",
            annotate::list_named_ranges,
        );

        registry
    }

    fn register(&mut self, intent: Intent, action: &'static str, handler: Handler) {
        self.table.entry(intent).or_default().insert(action, handler);
    }

    pub fn supports(&self, intent: Intent, action: &str) -> bool {
        self.table
            .get(&intent)
            .is_some_and(|actions| actions.contains_key(action))
    }

    pub fn handler_count(&self) -> usize {
        self.table.values().map(|actions| actions.len()).sum()
    }

    /// Look up and run the handler for a classification.
    pub async fn dispatch(
        &self,
        engine: &dyn SheetEngine,
        classification: &Classification,
    ) -> HandlerOutcome {
        let handler = self
            .table
            .get(&classification.intent)
            .and_then(|actions| actions.get(classification.action.as_str()));

        let Some(handler) = handler else {
            return HandlerOutcome::fail(format!(
                "Unable to process '{}' as a {} command.",
                classification.action,
                classification.intent.as_str()
            ));
        };

        debug!(
            intent = classification.intent.as_str(),
            action = %classification.action,
            "dispatching handler"
        );
        handler(engine, classification).await
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// === Shared parameter extraction ===

pub(crate) fn range_param(cls: &Classification) -> Option<RangeRef> {
    cls.str_param("range")
        .and_then(refs::parse_range)
        .or_else(|| {
            cls.target
                .as_ref()
                .and_then(|t| refs::parse_range(&t.identifier))
        })
}

pub(crate) fn cell_param(cls: &Classification, key: &str) -> Option<CellRef> {
    cls.str_param(key)
        .and_then(refs::parse_cell)
        .or_else(|| {
            cls.target
                .as_ref()
                .and_then(|t| refs::parse_cell(&t.identifier))
        })
}

/// Raw column token from the "column" parameter or the target.
pub(crate) fn column_token(cls: &Classification) -> Option<String> {
    cls.str_param("column")
        .map(str::to_string)
        .or_else(|| cls.target.as_ref().map(|t| t.identifier.clone()))
}

pub(crate) fn column_index_param(cls: &Classification) -> Option<usize> {
    column_token(cls).as_deref().and_then(refs::parse_column)
}

pub(crate) fn color_param(cls: &Classification) -> Option<String> {
    cls.str_param("color").map(str::to_string)
}

/// Display a cell in A1 notation.
pub(crate) fn cell_a1(cell: CellRef) -> String {
    format!("{}{}", refs::column_letters(cell.col), cell.row + 1)
}

/// "D", "D and E", "C, D and E".
pub(crate) fn join_names(names: &[String]) -> String {
    match names {
        [] => String::new(),
        [only] => only.clone(),
        [head @ .., last] => format!("{} and {}", head.join(", "), last),
    }
}

/// Range covering one full column, or the explicit range parameter.
pub(crate) async fn rule_range(
    engine: &dyn SheetEngine,
    cls: &Classification,
) -> Option<RangeRef> {
    if let Some(range) = range_param(cls) {
        return Some(range);
    }
    let col = column_index_param(cls)?;
    let dims = engine.dimensions().await;
    Some(RangeRef {
        start_row: 0,
        start_col: col,
        num_rows: dims.rows.max(1),
        num_cols: 1,
    })
}
