//! Structural handlers: rows, columns, merges, autofit, freeze panes.

use crate::core::refs;
use crate::engine::SheetEngine;
use crate::oracle::Classification;

use super::{column_index_param, column_token, join_names, range_param, HandlerFuture, HandlerOutcome};

fn count_param(cls: &Classification) -> usize {
    cls.usize_param("count").unwrap_or(1).max(1)
}

pub(super) fn insert_rows<'a>(
    engine: &'a dyn SheetEngine,
    cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let count = count_param(cls);
        let before_row = cls
            .usize_param("row")
            .and_then(|row| row.checked_sub(1))
            .unwrap_or(0);
        if engine.insert_rows(before_row, count).await {
            HandlerOutcome::ok(format!("Inserted {count} row(s)."))
        } else {
            HandlerOutcome::fail("Could not insert rows.")
        }
    })
}

pub(super) fn delete_row<'a>(
    engine: &'a dyn SheetEngine,
    cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let Some(row) = cls.usize_param("row").filter(|row| *row > 0) else {
            return HandlerOutcome::fail("No row number specified to delete.");
        };
        if engine.delete_row(row - 1).await {
            HandlerOutcome::ok(format!("Row {row} deleted."))
        } else {
            HandlerOutcome::fail(format!("Could not delete row {row}."))
        }
    })
}

pub(super) fn hide_rows<'a>(
    engine: &'a dyn SheetEngine,
    cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let Some(row) = cls.usize_param("row").filter(|row| *row > 0) else {
            return HandlerOutcome::fail("No row number specified to hide.");
        };
        let count = count_param(cls);
        if engine.hide_rows(row - 1, count).await {
            HandlerOutcome::ok(format!("Hid {count} row(s) starting at row {row}."))
        } else {
            HandlerOutcome::fail("Could not hide the rows.")
        }
    })
}

pub(super) fn show_rows<'a>(
    engine: &'a dyn SheetEngine,
    cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let Some(row) = cls.usize_param("row").filter(|row| *row > 0) else {
            return HandlerOutcome::fail("No row number specified to show.");
        };
        let count = count_param(cls);
        if engine.show_rows(row - 1, count).await {
            HandlerOutcome::ok(format!("Unhid {count} row(s) starting at row {row}."))
        } else {
            HandlerOutcome::fail("Could not show the rows.")
        }
    })
}

pub(super) fn autofit_rows<'a>(
    engine: &'a dyn SheetEngine,
    _cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let dims = engine.dimensions().await;
        if engine.autofit_rows(0, dims.rows.max(1)).await {
            HandlerOutcome::ok("Row heights fitted to content.")
        } else {
            HandlerOutcome::fail("Could not autofit the rows.")
        }
    })
}

pub(super) fn insert_columns<'a>(
    engine: &'a dyn SheetEngine,
    cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let count = count_param(cls);
        let before_col = column_index_param(cls).unwrap_or(0);
        if engine.insert_columns(before_col, count).await {
            HandlerOutcome::ok(format!("Inserted {count} column(s)."))
        } else {
            HandlerOutcome::fail("Could not insert columns.")
        }
    })
}

pub(super) fn delete_column<'a>(
    engine: &'a dyn SheetEngine,
    cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let Some(token) = column_token(cls) else {
            return HandlerOutcome::fail("No column specified to delete.");
        };
        let Some(col) = refs::parse_column(&token) else {
            return HandlerOutcome::fail(format!("'{token}' is not a valid column reference."));
        };
        if engine.delete_column(col).await {
            HandlerOutcome::ok(format!("Column {} deleted.", token.to_uppercase()))
        } else {
            HandlerOutcome::fail(format!("Could not delete column {}.", token.to_uppercase()))
        }
    })
}

pub(super) fn delete_columns_multiple<'a>(
    engine: &'a dyn SheetEngine,
    cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let Some(tokens) = cls.list_param("columns").filter(|t| !t.is_empty()) else {
            return HandlerOutcome::fail("No columns specified to delete.");
        };

        let mut columns: Vec<(String, usize)> = Vec::new();
        for token in &tokens {
            let Some(col) = refs::parse_column(token) else {
                return HandlerOutcome::fail(format!("'{token}' is not a valid column reference."));
            };
            if !columns.iter().any(|(_, existing)| *existing == col) {
                columns.push((token.to_uppercase(), col));
            }
        }

        // Delete right-to-left so earlier deletions do not shift the
        // indices of later ones.
        columns.sort_by(|a, b| b.1.cmp(&a.1));

        let mut failed = Vec::new();
        for (letter, col) in &columns {
            if !engine.delete_column(*col).await {
                failed.push(letter.clone());
            }
        }

        if failed.is_empty() {
            let mut letters: Vec<String> = columns.iter().map(|(l, _)| l.clone()).collect();
            letters.sort();
            HandlerOutcome::ok(format!("Deleted columns {}.", join_names(&letters)))
        } else {
            HandlerOutcome::fail(format!("Could not delete columns {}.", join_names(&failed)))
        }
    })
}

pub(super) fn hide_columns<'a>(
    engine: &'a dyn SheetEngine,
    cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let Some(col) = column_index_param(cls) else {
            return HandlerOutcome::fail("No column specified to hide.");
        };
        let count = count_param(cls);
        if engine.hide_columns(col, count).await {
            HandlerOutcome::ok(format!(
                "Hid {count} column(s) starting at column {}.",
                refs::column_letters(col)
            ))
        } else {
            HandlerOutcome::fail("Could not hide the columns.")
        }
    })
}

pub(super) fn show_columns<'a>(
    engine: &'a dyn SheetEngine,
    cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let Some(col) = column_index_param(cls) else {
            return HandlerOutcome::fail("No column specified to show.");
        };
        let count = count_param(cls);
        if engine.show_columns(col, count).await {
            HandlerOutcome::ok(format!(
                "Unhid {count} column(s) starting at column {}.",
                refs::column_letters(col)
            ))
        } else {
            HandlerOutcome::fail("Could not show the columns.")
        }
    })
}

pub(super) fn autofit_columns<'a>(
    engine: &'a dyn SheetEngine,
    _cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let dims = engine.dimensions().await;
        if engine.autofit_columns(0, dims.cols.max(1)).await {
            HandlerOutcome::ok("Column widths fitted to content.")
        } else {
            HandlerOutcome::fail("Could not autofit the columns.")
        }
    })
}

pub(super) fn merge_cells<'a>(
    engine: &'a dyn SheetEngine,
    cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let Some(range) = range_param(cls) else {
            return HandlerOutcome::fail("No cell range specified to merge.");
        };
        if engine.merge_cells(range).await {
            HandlerOutcome::ok(format!("Merged {}.", range.a1()))
        } else {
            HandlerOutcome::fail("Could not merge the cells.")
        }
    })
}

pub(super) fn unmerge_cells<'a>(
    engine: &'a dyn SheetEngine,
    cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let Some(range) = range_param(cls) else {
            return HandlerOutcome::fail("No cell range specified to unmerge.");
        };
        if engine.unmerge_cells(range).await {
            HandlerOutcome::ok(format!("Unmerged {}.", range.a1()))
        } else {
            HandlerOutcome::fail("Could not unmerge the cells.")
        }
    })
}

pub(super) fn freeze_rows<'a>(
    engine: &'a dyn SheetEngine,
    cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let count = count_param(cls);
        if engine.freeze_rows(count).await {
            HandlerOutcome::ok(format!("Froze {count} row(s)."))
        } else {
            HandlerOutcome::fail("Could not freeze the rows.")
        }
    })
}

pub(super) fn freeze_columns<'a>(
    engine: &'a dyn SheetEngine,
    cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let count = count_param(cls);
        if engine.freeze_columns(count).await {
            HandlerOutcome::ok(format!("Froze {count} column(s)."))
        } else {
            HandlerOutcome::fail("Could not freeze the columns.")
        }
    })
}

pub(super) fn unfreeze<'a>(
    engine: &'a dyn SheetEngine,
    _cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        if engine.unfreeze().await {
            HandlerOutcome::ok("Panes unfrozen.")
        } else {
            HandlerOutcome::fail("Could not unfreeze the panes.")
        }
    })
}
