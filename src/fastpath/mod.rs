//! Fast-path pattern matcher
//!
//! Deterministic resolution of common commands without invoking the intent
//! oracle. The rule table is fixed and priority-ordered: evaluation is
//! top-down and the first match wins, so later, broader rules (the generic
//! "color" rule) are intentionally shadowed by earlier, narrower ones
//! ("background color", "font color"). Reordering this table changes
//! behavior.
//!
//! A matched command is committed to its dispatch path: if the handler for
//! a matched rule fails, the failure surfaces and the matcher never falls
//! through to later rules or to the oracle.
//!
//! The regex crate has no lookaround, so the negative conditions the rules
//! need ("duplicates, but not highlight duplicates") are explicit guard
//! predicates next to the pattern.

use regex::{Captures, Regex};
use serde_json::{Map, Value};
use tracing::debug;

use crate::core::refs;
use crate::oracle::{Classification, Intent};
use crate::router::is_compound;

type Guard = fn(&str) -> bool;
type Extractor = fn(&Captures, &str) -> Classification;

struct Rule {
    name: &'static str,
    pattern: Regex,
    guard: Option<Guard>,
    extract: Extractor,
}

/// Ordered rule table. Construct once per session and reuse.
pub struct FastPathMatcher {
    rules: Vec<Rule>,
}

impl FastPathMatcher {
    pub fn new() -> Self {
        Self {
            rules: build_rules(),
        }
    }

    /// Resolve `text` against the rule table. Returns the synthesized
    /// classification (confidence 1.0) of the first matching rule.
    pub fn matches(&self, text: &str) -> Option<Classification> {
        let lower = text.trim().to_lowercase();
        if lower.is_empty() {
            return None;
        }
        // Multi-step phrasing always goes through the router.
        if is_compound(&lower) {
            return None;
        }

        for rule in &self.rules {
            if let Some(caps) = rule.pattern.captures(&lower) {
                if rule.guard.map_or(true, |guard| guard(&lower)) {
                    debug!(rule = rule.name, "fast-path match");
                    return Some((rule.extract)(&caps, &lower));
                }
            }
        }
        None
    }

    /// Rule names in evaluation order, for diagnostics.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name).collect()
    }
}

impl Default for FastPathMatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("hardcoded pattern compiles")
}

fn build_rules() -> Vec<Rule> {
    vec![
        // Annotation-style operations first: their verbs ("add", "insert")
        // overlap the structural rules below.
        Rule {
            name: "hyperlink",
            pattern: re(r"\b(?:hyperlink|link)\b"),
            guard: Some(|t| !t.contains("unlink") && !t.contains("remove") && !t.contains("delete")),
            extract: extract_hyperlink,
        },
        Rule {
            name: "remove_hyperlink",
            pattern: re(r"\b(?:remove|delete)\b.*\b(?:hyperlink|link)\b"),
            guard: None,
            extract: extract_remove_hyperlink,
        },
        Rule {
            name: "remove_note",
            pattern: re(r"\b(?:remove|delete)\b.*\b(?:note|comment)\b"),
            guard: None,
            extract: extract_remove_note,
        },
        Rule {
            name: "add_note",
            pattern: re(r"\b(?:note|comment)\b"),
            guard: None,
            extract: extract_add_note,
        },
        Rule {
            name: "insert_image",
            pattern: re(r"\b(?:image|picture|photo)\b"),
            guard: None,
            extract: extract_insert_image,
        },
        Rule {
            name: "named_range",
            pattern: re(r"\bnamed?\s+range"),
            guard: None,
            extract: extract_named_range,
        },
        Rule {
            name: "dropdown",
            pattern: re(r"\bdrop\s?-?down\b|\bdata\s+validation\b"),
            guard: None,
            extract: extract_dropdown,
        },
        // Duplicates: the highlight rule is the narrow one and must stay
        // listed before the broader removal rule.
        Rule {
            name: "highlight_duplicates",
            pattern: re(r"\b(?:highlight|mark|flag|color|colour)\b.*\bduplicate"),
            guard: None,
            extract: extract_highlight_duplicates,
        },
        Rule {
            name: "remove_duplicates",
            pattern: re(r"\bduplicates?\b"),
            guard: Some(|t| {
                ["remove", "delete", "drop", "dedupe", "clean", "get rid"]
                    .iter()
                    .any(|verb| t.contains(verb))
            }),
            extract: |_, _| {
                Classification::fast_path(Intent::TableOperation, "remove_duplicates", Map::new())
            },
        },
        // Font styling.
        Rule {
            name: "bold",
            pattern: re(r"\bbold\b"),
            guard: None,
            extract: |_, text| range_rule(Intent::RangeOperation, "apply_bold", text),
        },
        Rule {
            name: "italic",
            pattern: re(r"\bitalici?z?e?d?\b"),
            guard: None,
            extract: |_, text| range_rule(Intent::RangeOperation, "apply_italic", text),
        },
        Rule {
            name: "underline",
            pattern: re(r"\bunderlined?\b"),
            guard: None,
            extract: |_, text| range_rule(Intent::RangeOperation, "apply_underline", text),
        },
        Rule {
            name: "strikethrough",
            pattern: re(r"\bstrike\s?-?through\b|\bstrikethrough\b"),
            guard: None,
            extract: |_, text| range_rule(Intent::RangeOperation, "apply_strikethrough", text),
        },
        // Coloring: background and font rules are narrow; the bare "color"
        // rule at the end of this group is their broad superset and would
        // shadow them if it were listed first.
        Rule {
            name: "background_color",
            pattern: re(r"\b(?:background|fill)\b"),
            guard: Some(|t| t.contains("color") || t.contains("colour") || find_color(t).is_some()),
            extract: |_, text| color_rule("set_background_color", text),
        },
        Rule {
            name: "font_color",
            pattern: re(r"\b(?:font|text)\s+colou?r\b"),
            guard: None,
            extract: |_, text| color_rule("set_font_color", text),
        },
        Rule {
            name: "highlight_range",
            pattern: re(r"\bhighlight\b"),
            guard: Some(|t| find_range_text(t).is_some()),
            extract: |_, text| color_rule("set_background_color", text),
        },
        Rule {
            name: "color",
            pattern: re(r"\bcolou?r\b"),
            guard: None,
            extract: |_, text| color_rule("set_background_color", text),
        },
        Rule {
            name: "number_format",
            pattern: re(r"\b(?:currency|dollar|percent|percentage)\b"),
            guard: Some(|t| t.contains("format") || t.contains(" as ")),
            extract: extract_number_format,
        },
        // Freeze: "unfreeze" must be tested before "freeze".
        Rule {
            name: "unfreeze",
            pattern: re(r"\bunfreeze\b"),
            guard: None,
            extract: |_, _| {
                Classification::fast_path(Intent::FreezeOperation, "unfreeze", Map::new())
            },
        },
        Rule {
            name: "freeze",
            pattern: re(r"\bfreeze\b"),
            guard: None,
            extract: extract_freeze,
        },
        // Merge: "unmerge" before "merge" for the same reason.
        Rule {
            name: "unmerge",
            pattern: re(r"\bunmerge\b"),
            guard: None,
            extract: |_, text| range_rule(Intent::RangeOperation, "unmerge_cells", text),
        },
        Rule {
            name: "merge",
            pattern: re(r"\bmerge\b"),
            guard: None,
            extract: |_, text| range_rule(Intent::RangeOperation, "merge_cells", text),
        },
        // Structural: rows.
        Rule {
            name: "insert_rows",
            pattern: re(r"\b(?:insert|add)\b.*\brows?\b"),
            guard: None,
            extract: extract_insert_rows,
        },
        Rule {
            name: "delete_row",
            pattern: re(r"\b(?:delete|remove)\b.*\brows?\b"),
            guard: None,
            extract: extract_delete_row,
        },
        Rule {
            name: "show_rows",
            pattern: re(r"\b(?:show|unhide)\b.*\brows?\b"),
            guard: None,
            extract: |_, text| row_span_rule("show_rows", text),
        },
        Rule {
            name: "hide_rows",
            pattern: re(r"\bhide\b.*\brows?\b"),
            guard: None,
            extract: |_, text| row_span_rule("hide_rows", text),
        },
        // Structural: columns.
        Rule {
            name: "insert_columns",
            pattern: re(r"\b(?:insert|add)\b.*\bcolumns?\b"),
            guard: None,
            extract: extract_insert_columns,
        },
        Rule {
            name: "delete_columns",
            pattern: re(r"\b(?:delete|remove)\b.*\bcolumns?\b"),
            guard: None,
            extract: extract_delete_columns,
        },
        Rule {
            name: "show_columns",
            pattern: re(r"\b(?:show|unhide)\b.*\bcolumns?\b"),
            guard: None,
            extract: |_, text| column_span_rule("show_columns", text),
        },
        Rule {
            name: "hide_columns",
            pattern: re(r"\bhide\b.*\bcolumns?\b"),
            guard: None,
            extract: |_, text| column_span_rule("hide_columns", text),
        },
        Rule {
            name: "autofit",
            pattern: re(r"\bauto\s?-?fit\b|\bautofit\b"),
            guard: None,
            extract: extract_autofit,
        },
        // Tables.
        Rule {
            name: "clear_filter",
            pattern: re(r"\b(?:clear|remove|delete)\b.*\bfilters?\b"),
            guard: None,
            extract: |_, _| {
                Classification::fast_path(Intent::TableOperation, "clear_filter", Map::new())
            },
        },
        Rule {
            name: "create_filter",
            pattern: re(r"\bfilters?\b"),
            guard: None,
            extract: |_, _| {
                Classification::fast_path(Intent::TableOperation, "create_filter", Map::new())
            },
        },
        Rule {
            name: "sort",
            pattern: re(r"\bsort\b"),
            guard: None,
            extract: extract_sort,
        },
        Rule {
            name: "split_text",
            pattern: re(r"\bsplit\b.*\b(?:text|columns?)\b"),
            guard: None,
            extract: extract_split_text,
        },
        Rule {
            name: "find_replace",
            pattern: re(r#"\breplace\b\s+(?:all\s+)?["']?(.+?)["']?\s+with\s+["']?(.+?)["']?$"#),
            guard: None,
            extract: extract_find_replace,
        },
        Rule {
            name: "clear_range",
            pattern: re(r"\b(?:clear|empty|erase)\b"),
            guard: Some(|t| find_range_text(t).is_some() || t.contains("sheet")),
            extract: extract_clear,
        },
    ]
}

// === Extraction helpers ===

fn params_from(pairs: Vec<(&str, Value)>) -> Map<String, Value> {
    let mut map = Map::new();
    for (key, value) in pairs {
        map.insert(key.to_string(), value);
    }
    map
}

/// First A1 cell or range reference in the text, as written.
pub fn find_range_text(text: &str) -> Option<String> {
    let pattern = re(r"\b([a-z]{1,3}[0-9]{1,7}(?::[a-z]{1,3}[0-9]{1,7})?)\b");
    let caps = pattern.captures(text)?;
    let candidate = caps.get(1)?.as_str();
    // Reject words that merely look like references ("mid2").
    refs::parse_range(candidate)?;
    Some(candidate.to_uppercase())
}

const COLOR_NAMES: &[&str] = &[
    "red", "blue", "green", "yellow", "orange", "purple", "pink", "brown", "black", "white",
    "gray", "grey", "cyan", "magenta", "teal", "gold",
];

/// First color mention: a known name or a hex literal.
pub fn find_color(text: &str) -> Option<String> {
    if let Some(caps) = re(r"#[0-9a-f]{6}\b").captures(text) {
        return Some(caps[0].to_string());
    }
    text.split(|c: char| !c.is_ascii_alphabetic())
        .find(|word| COLOR_NAMES.contains(word))
        .map(|word| word.to_string())
}

fn find_count(text: &str) -> Option<usize> {
    re(r"\b(\d+)\b")
        .captures(text)
        .and_then(|caps| caps[1].parse().ok())
}

fn find_url(text: &str) -> Option<String> {
    re(r"\bhttps?://\S+")
        .captures(text)
        .map(|caps| caps[0].trim_end_matches(['.', ',', ')']).to_string())
}

fn find_quoted(text: &str) -> Option<String> {
    re(r#"["'](.+?)["']"#)
        .captures(text)
        .map(|caps| caps[1].to_string())
}

/// Column letters mentioned after "column"/"columns", e.g. "D and E".
fn find_columns(text: &str) -> Vec<String> {
    let pattern = re(r"columns?\s+([a-z]{1,3}\b(?:\s*(?:,|and|&)\s*[a-z]{1,3}\b)*)");
    let Some(caps) = pattern.captures(text) else {
        return Vec::new();
    };
    caps[1]
        .split(|c: char| !c.is_ascii_alphabetic())
        .filter(|word| !word.is_empty() && *word != "and" && word.len() <= 3)
        .filter(|word| refs::parse_column(word).is_some())
        .map(str::to_uppercase)
        .collect()
}

fn range_rule(intent: Intent, action: &str, text: &str) -> Classification {
    let mut pairs = Vec::new();
    if let Some(range) = find_range_text(text) {
        pairs.push(("range", Value::String(range)));
    }
    Classification::fast_path(intent, action, params_from(pairs))
}

fn color_rule(action: &str, text: &str) -> Classification {
    let mut pairs = Vec::new();
    if let Some(range) = find_range_text(text) {
        pairs.push(("range", Value::String(range)));
    }
    if let Some(color) = find_color(text) {
        pairs.push(("color", Value::String(color)));
    }
    Classification::fast_path(Intent::RangeOperation, action, params_from(pairs))
}

fn row_span_rule(action: &str, text: &str) -> Classification {
    let mut pairs = Vec::new();
    if let Some(row) = find_count(text) {
        pairs.push(("row", Value::from(row)));
    }
    Classification::fast_path(Intent::RowOperation, action, params_from(pairs))
}

fn column_span_rule(action: &str, text: &str) -> Classification {
    let columns = find_columns(text);
    let mut pairs = Vec::new();
    if let Some(first) = columns.first() {
        pairs.push(("column", Value::String(first.clone())));
    }
    Classification::fast_path(Intent::ColumnOperation, action, params_from(pairs))
}

fn extract_hyperlink(_: &Captures, text: &str) -> Classification {
    let mut pairs = Vec::new();
    if let Some(range) = find_range_text(text) {
        pairs.push(("cell", Value::String(range)));
    }
    if let Some(url) = find_url(text) {
        pairs.push(("url", Value::String(url)));
    }
    Classification::fast_path(
        Intent::HyperlinkOperation,
        "set_hyperlink",
        params_from(pairs),
    )
}

fn extract_remove_hyperlink(_: &Captures, text: &str) -> Classification {
    let mut pairs = Vec::new();
    if let Some(range) = find_range_text(text) {
        pairs.push(("cell", Value::String(range)));
    }
    Classification::fast_path(
        Intent::HyperlinkOperation,
        "remove_hyperlink",
        params_from(pairs),
    )
}

fn extract_add_note(_: &Captures, text: &str) -> Classification {
    let mut pairs = Vec::new();
    if let Some(range) = find_range_text(text) {
        pairs.push(("cell", Value::String(range)));
    }
    if let Some(note) = find_quoted(text) {
        pairs.push(("note", Value::String(note)));
    }
    Classification::fast_path(Intent::CommentOperation, "add_note", params_from(pairs))
}

fn extract_remove_note(_: &Captures, text: &str) -> Classification {
    let mut pairs = Vec::new();
    if let Some(range) = find_range_text(text) {
        pairs.push(("cell", Value::String(range)));
    }
    Classification::fast_path(Intent::CommentOperation, "remove_note", params_from(pairs))
}

fn extract_insert_image(_: &Captures, text: &str) -> Classification {
    let mut pairs = Vec::new();
    if let Some(range) = find_range_text(text) {
        pairs.push(("cell", Value::String(range)));
    }
    if let Some(url) = find_url(text) {
        pairs.push(("url", Value::String(url)));
    }
    Classification::fast_path(Intent::ImageOperation, "insert_image", params_from(pairs))
}

fn extract_named_range(_: &Captures, text: &str) -> Classification {
    let action = if text.contains("delete") || text.contains("remove") {
        "delete_named_range"
    } else if text.contains("rename") {
        "rename_named_range"
    } else if text.contains("list") || text.contains("show") || text.contains("what") {
        "list_named_ranges"
    } else {
        "create_named_range"
    };
    let mut pairs = Vec::new();
    if let Some(range) = find_range_text(text) {
        pairs.push(("range", Value::String(range)));
    }
    if let Some(name) = find_quoted(text) {
        pairs.push(("name", Value::String(name)));
    }
    Classification::fast_path(Intent::NamedRangeOperation, action, params_from(pairs))
}

fn extract_dropdown(_: &Captures, text: &str) -> Classification {
    let mut pairs = Vec::new();
    if let Some(range) = find_range_text(text) {
        pairs.push(("range", Value::String(range)));
    }
    if let Some(options) = find_quoted(text) {
        pairs.push(("options", Value::String(options)));
    }
    Classification::fast_path(Intent::DataValidation, "add_dropdown", params_from(pairs))
}

fn extract_highlight_duplicates(_: &Captures, text: &str) -> Classification {
    let mut pairs = Vec::new();
    if let Some(column) = find_columns(text).into_iter().next() {
        pairs.push(("column", Value::String(column)));
    } else if let Some(range) = find_range_text(text) {
        pairs.push(("range", Value::String(range)));
    }
    if let Some(color) = find_color(text) {
        pairs.push(("color", Value::String(color)));
    }
    Classification::fast_path(
        Intent::ConditionalFormat,
        "highlight_duplicates",
        params_from(pairs),
    )
}

fn extract_number_format(_: &Captures, text: &str) -> Classification {
    let format = if text.contains("percent") {
        "percent"
    } else {
        "currency"
    };
    let mut pairs = vec![("format", Value::String(format.into()))];
    if let Some(range) = find_range_text(text) {
        pairs.push(("range", Value::String(range)));
    }
    Classification::fast_path(
        Intent::RangeOperation,
        "set_number_format",
        params_from(pairs),
    )
}

fn extract_freeze(_: &Captures, text: &str) -> Classification {
    let action = if text.contains("column") {
        "freeze_columns"
    } else {
        "freeze_rows"
    };
    let mut pairs = Vec::new();
    if let Some(count) = find_count(text) {
        pairs.push(("count", Value::from(count)));
    }
    Classification::fast_path(Intent::FreezeOperation, action, params_from(pairs))
}

fn extract_insert_rows(_: &Captures, text: &str) -> Classification {
    let mut pairs = Vec::new();
    if let Some(count) = find_count(text) {
        pairs.push(("count", Value::from(count)));
    }
    Classification::fast_path(Intent::RowOperation, "insert_rows", params_from(pairs))
}

fn extract_delete_row(_: &Captures, text: &str) -> Classification {
    let mut pairs = Vec::new();
    if let Some(row) = find_count(text) {
        pairs.push(("row", Value::from(row)));
    }
    Classification::fast_path(Intent::RowOperation, "delete_row", params_from(pairs))
}

fn extract_insert_columns(_: &Captures, text: &str) -> Classification {
    let mut pairs = Vec::new();
    if let Some(count) = find_count(text) {
        pairs.push(("count", Value::from(count)));
    }
    if let Some(column) = find_columns(text).into_iter().next() {
        pairs.push(("column", Value::String(column)));
    }
    Classification::fast_path(Intent::ColumnOperation, "insert_columns", params_from(pairs))
}

fn extract_delete_columns(_: &Captures, text: &str) -> Classification {
    let columns = find_columns(text);
    if columns.len() > 1 {
        let values = columns.into_iter().map(Value::String).collect();
        return Classification::fast_path(
            Intent::ColumnOperation,
            "delete_columns_multiple",
            params_from(vec![("columns", Value::Array(values))]),
        );
    }
    let mut pairs = Vec::new();
    if let Some(column) = columns.into_iter().next() {
        pairs.push(("column", Value::String(column)));
    }
    Classification::fast_path(Intent::ColumnOperation, "delete_column", params_from(pairs))
}

fn extract_autofit(_: &Captures, text: &str) -> Classification {
    if text.contains("row") {
        Classification::fast_path(Intent::RowOperation, "autofit_rows", Map::new())
    } else {
        Classification::fast_path(Intent::ColumnOperation, "autofit_columns", Map::new())
    }
}

fn extract_sort(_: &Captures, text: &str) -> Classification {
    let order = if text.contains("desc") || text.contains("largest") || text.contains("highest") {
        "descending"
    } else {
        "ascending"
    };
    let mut pairs = vec![("order", Value::String(order.into()))];
    if let Some(caps) = re(r"\bby\s+([a-z][a-z0-9_ ]*?)(?:\s+(?:asc|desc|ascending|descending|order)|\s*$)")
        .captures(text)
    {
        pairs.push(("column", Value::String(caps[1].trim().to_string())));
    } else if let Some(column) = find_columns(text).into_iter().next() {
        pairs.push(("column", Value::String(column)));
    }
    Classification::fast_path(Intent::TableOperation, "sort", params_from(pairs))
}

fn extract_split_text(_: &Captures, text: &str) -> Classification {
    let delimiter = if text.contains("comma") {
        Some(",")
    } else if text.contains("space") {
        Some(" ")
    } else if text.contains("semicolon") {
        Some(";")
    } else {
        None
    };
    let mut pairs = Vec::new();
    if let Some(column) = find_columns(text).into_iter().next() {
        pairs.push(("column", Value::String(column)));
    }
    if let Some(delimiter) = delimiter {
        pairs.push(("delimiter", Value::String(delimiter.into())));
    }
    Classification::fast_path(
        Intent::TableOperation,
        "split_text_to_columns",
        params_from(pairs),
    )
}

fn extract_find_replace(caps: &Captures, _: &str) -> Classification {
    let pairs = vec![
        ("find", Value::String(caps[1].trim().to_string())),
        ("replace", Value::String(caps[2].trim().to_string())),
    ];
    Classification::fast_path(Intent::TableOperation, "find_replace", params_from(pairs))
}

fn extract_clear(_: &Captures, text: &str) -> Classification {
    if let Some(range) = find_range_text(text) {
        return Classification::fast_path(
            Intent::RangeOperation,
            "clear_range",
            params_from(vec![("range", Value::String(range))]),
        );
    }
    Classification::fast_path(Intent::TableOperation, "clear_sheet", Map::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> FastPathMatcher {
        FastPathMatcher::new()
    }

    #[test]
    fn test_bold_extracts_range() {
        let cls = matcher().matches("make A1:B2 bold").unwrap();
        assert_eq!(cls.intent, Intent::RangeOperation);
        assert_eq!(cls.action, "apply_bold");
        assert_eq!(cls.str_param("range"), Some("A1:B2"));
        assert!((cls.confidence - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_background_color_shadows_generic_color() {
        let cls = matcher()
            .matches("set the background color of A1:C3 to yellow")
            .unwrap();
        assert_eq!(cls.action, "set_background_color");
        assert_eq!(cls.str_param("color"), Some("yellow"));

        let cls = matcher().matches("font color of B2 should be red").unwrap();
        assert_eq!(cls.action, "set_font_color");
    }

    #[test]
    fn test_highlight_duplicates_wins_over_removal() {
        let cls = matcher()
            .matches("highlight duplicates in column C in red")
            .unwrap();
        assert_eq!(cls.intent, Intent::ConditionalFormat);
        assert_eq!(cls.action, "highlight_duplicates");
        assert_eq!(cls.str_param("column"), Some("C"));
    }

    #[test]
    fn test_remove_duplicates_requires_removal_verb() {
        let cls = matcher().matches("remove duplicate rows").unwrap();
        assert_eq!(cls.intent, Intent::TableOperation);
        assert_eq!(cls.action, "remove_duplicates");

        // A bare mention without a removal verb is not committed.
        assert!(matcher().matches("are there duplicates here").is_none());
    }

    #[test]
    fn test_unfreeze_before_freeze() {
        let cls = matcher().matches("unfreeze the panes").unwrap();
        assert_eq!(cls.action, "unfreeze");

        let cls = matcher().matches("freeze the first 2 rows").unwrap();
        assert_eq!(cls.action, "freeze_rows");
        assert_eq!(cls.usize_param("count"), Some(2));
    }

    #[test]
    fn test_delete_columns_multiple() {
        let cls = matcher().matches("delete column D and E").unwrap();
        assert_eq!(cls.intent, Intent::ColumnOperation);
        assert_eq!(cls.action, "delete_columns_multiple");
        assert_eq!(cls.list_param("columns").unwrap(), vec!["D", "E"]);
    }

    #[test]
    fn test_delete_single_column() {
        let cls = matcher().matches("delete column D").unwrap();
        assert_eq!(cls.action, "delete_column");
        assert_eq!(cls.str_param("column"), Some("D"));
    }

    #[test]
    fn test_compound_commands_are_not_matched() {
        assert!(matcher()
            .matches("Sort by revenue descending and then analyze top 10 customers")
            .is_none());
    }

    #[test]
    fn test_sort_extracts_column_and_order() {
        let cls = matcher().matches("sort by revenue descending").unwrap();
        assert_eq!(cls.action, "sort");
        assert_eq!(cls.str_param("column"), Some("revenue"));
        assert_eq!(cls.str_param("order"), Some("descending"));
    }

    #[test]
    fn test_find_replace_captures_terms() {
        let cls = matcher().matches("replace 'N/A' with '0'").unwrap();
        assert_eq!(cls.action, "find_replace");
        assert_eq!(cls.str_param("find"), Some("n/a"));
        assert_eq!(cls.str_param("replace"), Some("0"));
    }

    #[test]
    fn test_hyperlink_extracts_url_and_cell() {
        let cls = matcher()
            .matches("add a link to https://example.com in B2")
            .unwrap();
        assert_eq!(cls.intent, Intent::HyperlinkOperation);
        assert_eq!(cls.str_param("url"), Some("https://example.com"));
        assert_eq!(cls.str_param("cell"), Some("B2"));
    }

    #[test]
    fn test_unrelated_text_is_unmatched() {
        assert!(matcher().matches("what was our best month").is_none());
        assert!(matcher().matches("").is_none());
    }

    #[test]
    fn test_priority_order_is_stable() {
        let names = matcher().rule_names();
        let narrow = names
            .iter()
            .position(|n| *n == "highlight_duplicates")
            .unwrap();
        let broad = names.iter().position(|n| *n == "remove_duplicates").unwrap();
        assert!(narrow < broad);

        let background = names.iter().position(|n| *n == "background_color").unwrap();
        let color = names.iter().position(|n| *n == "color").unwrap();
        assert!(background < color);
    }
}
