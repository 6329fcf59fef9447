//! Table-level handlers: sorting, filters, duplicates, find-and-replace.

use serde_json::Value;

use crate::core::refs;
use crate::engine::{FilterCriteria, FindReplaceOptions, SheetEngine, SortOrder};
use crate::oracle::Classification;

use super::{column_index_param, column_token, HandlerFuture, HandlerOutcome};

/// Resolve a sort/filter column given either a letter ("D") or a header
/// name ("revenue"). Header names are matched case-insensitively against
/// the first data row.
async fn resolve_column(engine: &dyn SheetEngine, token: &str) -> Option<usize> {
    if let Some(col) = refs::parse_column(token) {
        return Some(col);
    }
    let wanted = token.trim().to_lowercase();
    let data = engine.all_data().await;
    data.first()?.iter().position(|cell| {
        cell.as_str()
            .map(|header| header.to_lowercase() == wanted || header.to_lowercase().contains(&wanted))
            .unwrap_or(false)
    })
}

pub(super) fn sort<'a>(
    engine: &'a dyn SheetEngine,
    cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let Some(token) = column_token(cls) else {
            return HandlerOutcome::fail("No sort column specified.");
        };
        let Some(col) = resolve_column(engine, &token).await else {
            return HandlerOutcome::fail(format!("Could not find a column named '{token}'."));
        };
        let order = match cls.str_param("order") {
            Some("descending") | Some("desc") => SortOrder::Descending,
            _ => SortOrder::Ascending,
        };
        if engine.sort_by_column(col, order).await {
            let direction = match order {
                SortOrder::Ascending => "ascending",
                SortOrder::Descending => "descending",
            };
            HandlerOutcome::ok(format!("Sorted by {token} in {direction} order."))
        } else {
            HandlerOutcome::fail("Could not sort the data.")
        }
    })
}

pub(super) fn create_filter<'a>(
    engine: &'a dyn SheetEngine,
    _cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        if engine.create_filter().await {
            HandlerOutcome::ok("Filter created on the data range.")
        } else {
            HandlerOutcome::fail("Could not create a filter.")
        }
    })
}

pub(super) fn clear_filter<'a>(
    engine: &'a dyn SheetEngine,
    _cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        if engine.clear_filter().await {
            HandlerOutcome::ok("Filter cleared.")
        } else {
            HandlerOutcome::fail("Could not clear the filter.")
        }
    })
}

pub(super) fn filter_by_value<'a>(
    engine: &'a dyn SheetEngine,
    cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let Some(token) = column_token(cls) else {
            return HandlerOutcome::fail("No filter column specified.");
        };
        let Some(col) = resolve_column(engine, &token).await else {
            return HandlerOutcome::fail(format!("Could not find a column named '{token}'."));
        };
        let Some(value) = cls.parameters.get("value").cloned() else {
            return HandlerOutcome::fail("No filter value specified.");
        };
        if !engine.has_filter().await && !engine.create_filter().await {
            return HandlerOutcome::fail("Could not create a filter.");
        }
        let criteria = FilterCriteria::Equals {
            value: value.clone(),
        };
        if engine.set_column_filter_criteria(col, criteria).await {
            HandlerOutcome::ok(format!(
                "Filtered column {} to rows matching {}.",
                token.to_uppercase(),
                value
            ))
        } else {
            HandlerOutcome::fail("Could not apply the filter criteria.")
        }
    })
}

pub(super) fn split_text_to_columns<'a>(
    engine: &'a dyn SheetEngine,
    cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let Some(col) = column_index_param(cls) else {
            return HandlerOutcome::fail("No column specified to split.");
        };
        let delimiter = cls.str_param("delimiter").unwrap_or(",");
        if engine.split_text_to_columns(col, delimiter).await {
            HandlerOutcome::ok(format!(
                "Split column {} on '{delimiter}'.",
                refs::column_letters(col)
            ))
        } else {
            HandlerOutcome::fail("Could not split the column.")
        }
    })
}

pub(super) fn remove_duplicates<'a>(
    engine: &'a dyn SheetEngine,
    cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let range = super::range_param(cls);
        let removed = engine.remove_duplicates(range).await;
        if removed == 0 {
            HandlerOutcome::ok("No duplicate rows found.")
        } else {
            HandlerOutcome::ok(format!("Removed {removed} duplicate row(s)."))
        }
    })
}

pub(super) fn find_replace<'a>(
    engine: &'a dyn SheetEngine,
    cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let Some(find) = cls.str_param("find").filter(|f| !f.is_empty()) else {
            return HandlerOutcome::fail("No search text specified.");
        };
        let replace = cls.str_param("replace").unwrap_or("");
        let options = FindReplaceOptions {
            match_case: cls
                .parameters
                .get("match_case")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            entire_cell: cls
                .parameters
                .get("entire_cell")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        };
        let count = engine.find_and_replace(find, replace, options).await;
        if count == 0 {
            HandlerOutcome::ok(format!("No occurrences of '{find}' found."))
        } else {
            HandlerOutcome::ok(format!(
                "Replaced {count} occurrence(s) of '{find}' with '{replace}'."
            ))
        }
    })
}

pub(super) fn clear_sheet<'a>(
    engine: &'a dyn SheetEngine,
    _cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        if engine.clear_sheet().await {
            HandlerOutcome::ok("Sheet cleared.")
        } else {
            HandlerOutcome::fail("Could not clear the sheet.")
        }
    })
}
