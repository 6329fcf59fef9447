//! Conditional-format and data-validation handlers.

use crate::engine::{ConditionalRule, SheetEngine, ValidationRule};
use crate::oracle::Classification;

use super::{color_param, range_param, rule_range, HandlerFuture, HandlerOutcome};

const DEFAULT_HIGHLIGHT: &str = "yellow";

pub(super) fn highlight_duplicates<'a>(
    engine: &'a dyn SheetEngine,
    cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let Some(range) = rule_range(engine, cls).await else {
            return HandlerOutcome::fail("No range or column specified for the highlight.");
        };
        let color = color_param(cls).unwrap_or_else(|| DEFAULT_HIGHLIGHT.to_string());
        let rule = ConditionalRule::DuplicateValues {
            color: color.clone(),
        };
        if engine.add_conditional_format(range, rule).await {
            HandlerOutcome::ok(format!(
                "Duplicate values in {} will be highlighted in {color}.",
                range.a1()
            ))
        } else {
            HandlerOutcome::fail("Could not add the duplicate highlight rule.")
        }
    })
}

pub(super) fn highlight_unique<'a>(
    engine: &'a dyn SheetEngine,
    cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let Some(range) = rule_range(engine, cls).await else {
            return HandlerOutcome::fail("No range or column specified for the highlight.");
        };
        let color = color_param(cls).unwrap_or_else(|| DEFAULT_HIGHLIGHT.to_string());
        let rule = ConditionalRule::UniqueValues {
            color: color.clone(),
        };
        if engine.add_conditional_format(range, rule).await {
            HandlerOutcome::ok(format!(
                "Unique values in {} will be highlighted in {color}.",
                range.a1()
            ))
        } else {
            HandlerOutcome::fail("Could not add the unique-value highlight rule.")
        }
    })
}

fn threshold(cls: &Classification) -> Option<f64> {
    cls.f64_param("value").or_else(|| cls.f64_param("threshold"))
}

pub(super) fn highlight_greater_than<'a>(
    engine: &'a dyn SheetEngine,
    cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let Some(range) = rule_range(engine, cls).await else {
            return HandlerOutcome::fail("No range or column specified for the highlight.");
        };
        let Some(value) = threshold(cls) else {
            return HandlerOutcome::fail("No threshold value specified.");
        };
        let color = color_param(cls).unwrap_or_else(|| DEFAULT_HIGHLIGHT.to_string());
        let rule = ConditionalRule::GreaterThan { value, color };
        if engine.add_conditional_format(range, rule).await {
            HandlerOutcome::ok(format!(
                "Cells in {} greater than {value} will be highlighted.",
                range.a1()
            ))
        } else {
            HandlerOutcome::fail("Could not add the highlight rule.")
        }
    })
}

pub(super) fn highlight_less_than<'a>(
    engine: &'a dyn SheetEngine,
    cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let Some(range) = rule_range(engine, cls).await else {
            return HandlerOutcome::fail("No range or column specified for the highlight.");
        };
        let Some(value) = threshold(cls) else {
            return HandlerOutcome::fail("No threshold value specified.");
        };
        let color = color_param(cls).unwrap_or_else(|| DEFAULT_HIGHLIGHT.to_string());
        let rule = ConditionalRule::LessThan { value, color };
        if engine.add_conditional_format(range, rule).await {
            HandlerOutcome::ok(format!(
                "Cells in {} less than {value} will be highlighted.",
                range.a1()
            ))
        } else {
            HandlerOutcome::fail("Could not add the highlight rule.")
        }
    })
}

pub(super) fn highlight_equal_to<'a>(
    engine: &'a dyn SheetEngine,
    cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let Some(range) = rule_range(engine, cls).await else {
            return HandlerOutcome::fail("No range or column specified for the highlight.");
        };
        let Some(value) = cls.parameters.get("value").cloned() else {
            return HandlerOutcome::fail("No comparison value specified.");
        };
        let color = color_param(cls).unwrap_or_else(|| DEFAULT_HIGHLIGHT.to_string());
        let rule = ConditionalRule::EqualTo {
            value: value.clone(),
            color,
        };
        if engine.add_conditional_format(range, rule).await {
            HandlerOutcome::ok(format!(
                "Cells in {} equal to {value} will be highlighted.",
                range.a1()
            ))
        } else {
            HandlerOutcome::fail("Could not add the highlight rule.")
        }
    })
}

pub(super) fn highlight_text_contains<'a>(
    engine: &'a dyn SheetEngine,
    cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let Some(range) = rule_range(engine, cls).await else {
            return HandlerOutcome::fail("No range or column specified for the highlight.");
        };
        let Some(text) = cls.str_param("text").filter(|t| !t.is_empty()) else {
            return HandlerOutcome::fail("No search text specified for the highlight.");
        };
        let color = color_param(cls).unwrap_or_else(|| DEFAULT_HIGHLIGHT.to_string());
        let rule = ConditionalRule::TextContains {
            text: text.to_string(),
            color,
        };
        if engine.add_conditional_format(range, rule).await {
            HandlerOutcome::ok(format!(
                "Cells in {} containing '{text}' will be highlighted.",
                range.a1()
            ))
        } else {
            HandlerOutcome::fail("Could not add the highlight rule.")
        }
    })
}

pub(super) fn add_dropdown<'a>(
    engine: &'a dyn SheetEngine,
    cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let Some(range) = range_param(cls) else {
            return HandlerOutcome::fail("No cell range specified for the dropdown.");
        };
        let Some(options) = cls.list_param("options").filter(|o| !o.is_empty()) else {
            return HandlerOutcome::fail("No dropdown options specified.");
        };
        let rule = ValidationRule::Dropdown {
            options: options.clone(),
        };
        if engine.add_validation(range, rule).await {
            HandlerOutcome::ok(format!(
                "Dropdown with {} option(s) applied to {}.",
                options.len(),
                range.a1()
            ))
        } else {
            HandlerOutcome::fail("Could not apply the dropdown validation.")
        }
    })
}

pub(super) fn add_number_range<'a>(
    engine: &'a dyn SheetEngine,
    cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let Some(range) = range_param(cls) else {
            return HandlerOutcome::fail("No cell range specified for the validation.");
        };
        let (Some(min), Some(max)) = (cls.f64_param("min"), cls.f64_param("max")) else {
            return HandlerOutcome::fail("Both a minimum and a maximum are required.");
        };
        if min > max {
            return HandlerOutcome::fail("The minimum must not exceed the maximum.");
        }
        let rule = ValidationRule::NumberRange { min, max };
        if engine.add_validation(range, rule).await {
            HandlerOutcome::ok(format!(
                "Values in {} restricted to {min}..{max}.",
                range.a1()
            ))
        } else {
            HandlerOutcome::fail("Could not apply the number validation.")
        }
    })
}

pub(super) fn add_date_validation<'a>(
    engine: &'a dyn SheetEngine,
    cls: &'a Classification,
) -> HandlerFuture<'a> {
    Box::pin(async move {
        let Some(range) = range_param(cls) else {
            return HandlerOutcome::fail("No cell range specified for the validation.");
        };
        if engine.add_validation(range, ValidationRule::Date).await {
            HandlerOutcome::ok(format!("Date validation applied to {}.", range.a1()))
        } else {
            HandlerOutcome::fail("Could not apply the date validation.")
        }
    })
}
