//! Hyperlink, note, image, and named-range handlers.

use crate::engine::SheetEngine;
use crate::oracle::Classification;

use super::{cell_a1, cell_param, range_param, HandlerFuture, HandlerOutcome};

pub(super) fn set_hyperlink<'a>(
    engine: &'a dyn SheetEngine,
    cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let Some(url) = cls.str_param("url").filter(|u| !u.is_empty()) else {
            return HandlerOutcome::fail("No URL provided for the hyperlink.");
        };
        let Some(cell) = cell_param(cls, "cell") else {
            return HandlerOutcome::fail("No cell specified for the hyperlink.");
        };
        let label = cls.str_param("label");
        if engine.set_hyperlink(cell.row, cell.col, url, label).await {
            HandlerOutcome::ok(format!("Hyperlink added to {}.", cell_a1(cell)))
        } else {
            HandlerOutcome::fail("Could not add the hyperlink.")
        }
    })
}

pub(super) fn remove_hyperlink<'a>(
    engine: &'a dyn SheetEngine,
    cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let Some(cell) = cell_param(cls, "cell") else {
            return HandlerOutcome::fail("No cell specified.");
        };
        if engine.remove_hyperlink(cell.row, cell.col).await {
            HandlerOutcome::ok(format!("Hyperlink removed from {}.", cell_a1(cell)))
        } else {
            HandlerOutcome::fail("Could not remove the hyperlink.")
        }
    })
}

pub(super) fn add_note<'a>(
    engine: &'a dyn SheetEngine,
    cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let Some(cell) = cell_param(cls, "cell") else {
            return HandlerOutcome::fail("No cell specified for the note.");
        };
        let Some(note) = cls.str_param("note").filter(|n| !n.is_empty()) else {
            return HandlerOutcome::fail("No note text provided.");
        };
        if engine.add_note(cell.row, cell.col, note).await {
            HandlerOutcome::ok(format!("Note added to {}.", cell_a1(cell)))
        } else {
            HandlerOutcome::fail("Could not add the note.")
        }
    })
}

pub(super) fn remove_note<'a>(
    engine: &'a dyn SheetEngine,
    cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let Some(cell) = cell_param(cls, "cell") else {
            return HandlerOutcome::fail("No cell specified.");
        };
        if engine.remove_note(cell.row, cell.col).await {
            HandlerOutcome::ok(format!("Note removed from {}.", cell_a1(cell)))
        } else {
            HandlerOutcome::fail("Could not remove the note.")
        }
    })
}

pub(super) fn insert_image<'a>(
    engine: &'a dyn SheetEngine,
    cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let Some(url) = cls.str_param("url").filter(|u| !u.is_empty()) else {
            return HandlerOutcome::fail("No image URL provided.");
        };
        let Some(cell) = cell_param(cls, "cell") else {
            return HandlerOutcome::fail("No cell specified for the image.");
        };
        if engine.insert_image(cell.row, cell.col, url).await {
            HandlerOutcome::ok(format!("Image inserted at {}.", cell_a1(cell)))
        } else {
            HandlerOutcome::fail("Could not insert the image.")
        }
    })
}

pub(super) fn create_named_range<'a>(
    engine: &'a dyn SheetEngine,
    cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let Some(name) = cls.str_param("name").filter(|n| !n.is_empty()) else {
            return HandlerOutcome::fail("No name provided for the named range.");
        };
        let Some(range) = range_param(cls) else {
            return HandlerOutcome::fail("No cell range provided for the named range.");
        };
        if engine.create_named_range(name, range).await {
            HandlerOutcome::ok(format!("Named range '{name}' created for {}.", range.a1()))
        } else {
            HandlerOutcome::fail(format!("Could not create the named range '{name}'."))
        }
    })
}

pub(super) fn delete_named_range<'a>(
    engine: &'a dyn SheetEngine,
    cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let Some(name) = cls.str_param("name").filter(|n| !n.is_empty()) else {
            return HandlerOutcome::fail("No named range specified.");
        };
        if engine.delete_named_range(name).await {
            HandlerOutcome::ok(format!("Named range '{name}' deleted."))
        } else {
            HandlerOutcome::fail(format!("Could not delete the named range '{name}'."))
        }
    })
}

pub(super) fn rename_named_range<'a>(
    engine: &'a dyn SheetEngine,
    cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let old_name = cls.str_param("name").or_else(|| cls.str_param("old_name"));
        let Some(old_name) = old_name.filter(|n| !n.is_empty()) else {
            return HandlerOutcome::fail("No named range specified to rename.");
        };
        let Some(new_name) = cls.str_param("new_name").filter(|n| !n.is_empty()) else {
            return HandlerOutcome::fail("No new name provided.");
        };
        if engine.rename_named_range(old_name, new_name).await {
            HandlerOutcome::ok(format!("Renamed '{old_name}' to '{new_name}'."))
        } else {
            HandlerOutcome::fail(format!("Could not rename '{old_name}'."))
        }
    })
}

pub(super) fn list_named_ranges<'a>(
    engine: &'a dyn SheetEngine,
    _cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let ranges = engine.named_ranges().await;
        if ranges.is_empty() {
            return HandlerOutcome::ok("No named ranges defined.");
        }
        let listing: Vec<String> = ranges
            .iter()
            .map(|(name, range)| format!("{name} ({})", range.a1()))
            .collect();
        HandlerOutcome::ok(format!("Named ranges: {}.", listing.join(", ")))
    })
}
