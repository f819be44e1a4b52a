//! Chart suggestion model and the tolerant response extractor.
//!
//! The oracle's output format is not contractually guaranteed: it may be a
//! clean suggestion container, a bare list, JSON wrapped in prose, or
//! garbage. `extract` recovers whatever signal it can and always returns a
//! concrete (possibly empty) suggestion list — callers never see a parse
//! error.

use serde_json::Value;

/// One proposed visualization. Fields arrive from the oracle and may be
/// missing or reference columns that do not exist; validation happens at
/// materialization time, not here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartSuggestion {
    pub title: Option<String>,
    pub kind: Option<String>,
    pub x: Option<String>,
    pub y: Option<String>,
    pub hue: Option<String>,
    pub description: Option<String>,
}

pub type SuggestionSet = Vec<ChartSuggestion>;

/// What the raw text resolved to, before coercion into a suggestion list.
enum Parsed {
    Object(serde_json::Map<String, Value>),
    List(Vec<Value>),
    Unparseable,
}

fn parse_loose(raw: &str) -> Parsed {
    // Strict parse first, then retry on the outermost brace window to
    // handle responses wrapped in explanatory prose.
    let direct = serde_json::from_str::<Value>(raw).ok().or_else(|| {
        let start = raw.find('{')?;
        let end = raw.rfind('}')?;
        if end <= start {
            return None;
        }
        serde_json::from_str::<Value>(&raw[start..=end]).ok()
    });

    match direct {
        Some(Value::Object(map)) => Parsed::Object(map),
        Some(Value::Array(items)) => Parsed::List(items),
        _ => Parsed::Unparseable,
    }
}

/// Total function: any input text yields a valid, possibly empty set.
pub fn extract(raw: &str) -> SuggestionSet {
    let graphs = match parse_loose(raw) {
        Parsed::Object(mut map) => match map.remove("graphs") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        Parsed::List(items) => items,
        Parsed::Unparseable => Vec::new(),
    };

    // Non-object entries stay in the set as empty suggestions so ordinal
    // artifact indices line up with the oracle's list.
    graphs.into_iter().map(suggestion_from_value).collect()
}

fn suggestion_from_value(value: Value) -> ChartSuggestion {
    let Value::Object(map) = value else {
        return ChartSuggestion::default();
    };
    let field = |key: &str| -> Option<String> {
        map.get(key).and_then(|v| v.as_str()).map(|s| s.to_string())
    };
    ChartSuggestion {
        title: field("title"),
        kind: field("type"),
        x: field("x"),
        y: field("y"),
        hue: field("hue"),
        description: field("description"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_clean_container() {
        let raw = r#"{"graphs": [{"title": "T", "type": "bar", "x": "a", "y": "b"}]}"#;
        let set = extract(raw);
        assert_eq!(set.len(), 1);
        assert_eq!(set[0].kind.as_deref(), Some("bar"));
        assert_eq!(set[0].x.as_deref(), Some("a"));
        assert_eq!(set[0].y.as_deref(), Some("b"));
    }

    #[test]
    fn extracts_json_wrapped_in_prose() {
        let raw = "Here is the result: {\"graphs\": [{\"title\":\"T\",\"type\":\"bar\",\"x\":\"a\",\"y\":\"b\"}]} Thanks";
        let set = extract(raw);
        assert_eq!(set.len(), 1);
        assert_eq!(set[0].kind.as_deref(), Some("bar"));
        assert_eq!(set[0].x.as_deref(), Some("a"));
        assert_eq!(set[0].y.as_deref(), Some("b"));
    }

    #[test]
    fn bare_list_is_coerced_to_container() {
        let raw = r#"[{"type": "line", "x": "t", "y": "v"}, {"type": "scatter"}]"#;
        let set = extract(raw);
        assert_eq!(set.len(), 2);
        assert_eq!(set[0].kind.as_deref(), Some("line"));
        assert_eq!(set[1].kind.as_deref(), Some("scatter"));
    }

    #[test]
    fn object_without_graphs_field_is_empty() {
        assert!(extract(r#"{"charts": []}"#).is_empty());
        assert!(extract(r#"{"graphs": "not a list"}"#).is_empty());
    }

    #[test]
    fn garbage_inputs_yield_empty_set() {
        for raw in ["", "no json here", "{broken", "}{", "42", "\"string\"", "null", "true"] {
            assert!(extract(raw).is_empty(), "input {:?} should yield empty", raw);
        }
    }

    #[test]
    fn non_object_entries_become_empty_suggestions() {
        let raw = r#"{"graphs": [7, {"type": "bar", "x": "a", "y": "b"}, "x"]}"#;
        let set = extract(raw);
        assert_eq!(set.len(), 3);
        assert_eq!(set[0], ChartSuggestion::default());
        assert_eq!(set[1].kind.as_deref(), Some("bar"));
        assert_eq!(set[2], ChartSuggestion::default());
    }

    #[test]
    fn non_string_fields_are_dropped_not_fatal() {
        let raw = r#"{"graphs": [{"title": 3, "type": "bar", "x": "a", "y": ["b"]}]}"#;
        let set = extract(raw);
        assert_eq!(set.len(), 1);
        assert_eq!(set[0].title, None);
        assert_eq!(set[0].kind.as_deref(), Some("bar"));
        assert_eq!(set[0].y, None);
    }

    #[test]
    fn prose_with_nested_braces_uses_outermost_window() {
        let raw = "intro {\"graphs\": [{\"type\": \"heatmap\", \"x\": \"a\", \"y\": \"b\"}]} trailing";
        let set = extract(raw);
        assert_eq!(set.len(), 1);
        assert_eq!(set[0].kind.as_deref(), Some("heatmap"));
    }
}
