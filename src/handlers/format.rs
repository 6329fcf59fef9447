//! Range formatting handlers: font styling, colors, number formats, clears.

use super::{color_param, range_param, HandlerFuture, HandlerOutcome};
use crate::engine::SheetEngine;
use crate::oracle::Classification;

pub(super) fn apply_bold<'a>(
    engine: &'a dyn SheetEngine,
    cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let Some(range) = range_param(cls) else {
            return HandlerOutcome::fail("No cell range specified for bold formatting.");
        };
        if engine.set_font_weight(range, "bold").await {
            HandlerOutcome::ok("Bold applied successfully.")
        } else {
            HandlerOutcome::fail("Could not apply bold formatting.")
        }
    })
}

pub(super) fn apply_italic<'a>(
    engine: &'a dyn SheetEngine,
    cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let Some(range) = range_param(cls) else {
            return HandlerOutcome::fail("No cell range specified for italic formatting.");
        };
        if engine.set_font_style(range, "italic").await {
            HandlerOutcome::ok("Italic applied successfully.")
        } else {
            HandlerOutcome::fail("Could not apply italic formatting.")
        }
    })
}

pub(super) fn apply_underline<'a>(
    engine: &'a dyn SheetEngine,
    cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let Some(range) = range_param(cls) else {
            return HandlerOutcome::fail("No cell range specified for underline formatting.");
        };
        if engine.set_font_line(range, "underline").await {
            HandlerOutcome::ok("Underline applied successfully.")
        } else {
            HandlerOutcome::fail("Could not apply underline formatting.")
        }
    })
}

pub(super) fn apply_strikethrough<'a>(
    engine: &'a dyn SheetEngine,
    cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let Some(range) = range_param(cls) else {
            return HandlerOutcome::fail("No cell range specified for strikethrough formatting.");
        };
        if engine.set_font_line(range, "line-through").await {
            HandlerOutcome::ok("Strikethrough applied successfully.")
        } else {
            HandlerOutcome::fail("Could not apply strikethrough formatting.")
        }
    })
}

pub(super) fn set_background_color<'a>(
    engine: &'a dyn SheetEngine,
    cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let Some(range) = range_param(cls) else {
            return HandlerOutcome::fail("No cell range specified for the background color.");
        };
        let Some(color) = color_param(cls) else {
            return HandlerOutcome::fail("No color specified.");
        };
        if engine.set_background_color(range, &color).await {
            HandlerOutcome::ok(format!(
                "Background color {} applied to {}.",
                color,
                range.a1()
            ))
        } else {
            HandlerOutcome::fail("Could not apply the background color.")
        }
    })
}

pub(super) fn set_font_color<'a>(
    engine: &'a dyn SheetEngine,
    cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let Some(range) = range_param(cls) else {
            return HandlerOutcome::fail("No cell range specified for the font color.");
        };
        let Some(color) = color_param(cls) else {
            return HandlerOutcome::fail("No color specified.");
        };
        if engine.set_font_color(range, &color).await {
            HandlerOutcome::ok(format!("Font color {} applied to {}.", color, range.a1()))
        } else {
            HandlerOutcome::fail("Could not apply the font color.")
        }
    })
}

pub(super) fn set_number_format<'a>(
    engine: &'a dyn SheetEngine,
    cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let Some(range) = range_param(cls) else {
            return HandlerOutcome::fail("No cell range specified for the number format.");
        };
        let Some(format) = cls.str_param("format") else {
            return HandlerOutcome::fail("No number format specified.");
        };
        let pattern = match format {
            "currency" => "$#,##0.00",
            "percent" => "0.00%",
            "number" => "#,##0.00",
            other => other,
        };
        if engine.set_number_format(range, pattern).await {
            HandlerOutcome::ok(format!("Number format applied to {}.", range.a1()))
        } else {
            HandlerOutcome::fail("Could not apply the number format.")
        }
    })
}

pub(super) fn clear_range<'a>(
    engine: &'a dyn SheetEngine,
    cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let Some(range) = range_param(cls) else {
            return HandlerOutcome::fail("No cell range specified to clear.");
        };
        if engine.clear_range(range).await {
            HandlerOutcome::ok(format!("Cleared {}.", range.a1()))
        } else {
            HandlerOutcome::fail("Could not clear the range.")
        }
    })
}

#[cfg(test)]
mod tests {
    use super::super::HandlerRegistry;
    use crate::oracle::{Classification, Intent};
    use crate::testing::RecordingEngine;
    use serde_json::{json, Map};

    fn cls(action: &str, range: &str) -> Classification {
        let mut params = Map::new();
        params.insert("range".into(), json!(range));
        params.insert("color".into(), json!("yellow"));
        params.insert("format".into(), json!("currency"));
        Classification::fast_path(Intent::RangeOperation, action, params)
    }

    #[tokio::test]
    async fn test_font_line_variants() {
        let registry = HandlerRegistry::new();
        let engine = RecordingEngine::ready();

        registry
            .dispatch(&engine, &cls("apply_underline", "A1"))
            .await;
        registry
            .dispatch(&engine, &cls("apply_strikethrough", "A1"))
            .await;

        assert_eq!(
            engine.calls(),
            vec![
                "set_font_line(0,0,1,1,underline)",
                "set_font_line(0,0,1,1,line-through)"
            ]
        );
    }

    #[tokio::test]
    async fn test_currency_format_expands_to_pattern() {
        let registry = HandlerRegistry::new();
        let engine = RecordingEngine::ready();
        let outcome = registry
            .dispatch(&engine, &cls("set_number_format", "B1:B10"))
            .await;
        assert!(outcome.success);
        assert_eq!(engine.calls(), vec!["set_number_format(0,1,10,1,$#,##0.00)"]);
    }

    #[tokio::test]
    async fn test_missing_range_is_validation_failure() {
        let registry = HandlerRegistry::new();
        let engine = RecordingEngine::ready();
        let classification =
            Classification::fast_path(Intent::RangeOperation, "apply_bold", Map::new());
        let outcome = registry.dispatch(&engine, &classification).await;
        assert!(!outcome.success);
        assert!(engine.calls().is_empty());
    }
}
