//! Permissive extraction of JSON literals from free-form model output.
//!
//! Language models asked to "return ONLY a JSON list" routinely wrap
//! the literal in prose, code fences, or trailing commentary. Rather
//! than strict-parse the whole response, this module runs a two-stage
//! parse: locate the first balanced bracketed (or braced) region while
//! respecting string and escape state, then strict-parse that region
//! with serde. Only the first candidate region is considered — if it
//! fails to parse, the extraction fails rather than hunting for a
//! "better" match later in the text.

use serde_json::Value;

/// Extract the first JSON array literal from `text`.
///
/// Returns `None` when no balanced `[...]` region exists or the region
/// is not valid JSON.
pub fn first_json_array(text: &str) -> Option<Vec<Value>> {
    let region = first_balanced_region(text, '[', ']')?;
    match serde_json::from_str(region) {
        Ok(Value::Array(items)) => Some(items),
        _ => None,
    }
}

/// Extract the first JSON object literal from `text`.
pub fn first_json_object(text: &str) -> Option<Value> {
    let region = first_balanced_region(text, '{', '}')?;
    match serde_json::from_str(region) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

/// Find the first balanced `open`..`close` region in `text`.
///
/// Tracks nesting depth and JSON string/escape state so delimiters
/// inside string literals don't unbalance the scan. Returns the region
/// including its delimiters, or `None` if the text never balances.
fn first_balanced_region(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            c if c == open && !in_string => depth += 1,
            c if c == close && !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bare_array() {
        let items = first_json_array(r#"["github_repos"]"#).unwrap();
        assert_eq!(items, vec![json!("github_repos")]);
    }

    #[test]
    fn array_embedded_in_prose() {
        let text = "Sure! Based on the question, I'd pick [\"github_repos\", \"github_issues\"] for you.";
        let items = first_json_array(text).unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn not_json_at_all() {
        assert!(first_json_array("not json at all").is_none());
    }

    #[test]
    fn empty_array() {
        let items = first_json_array("The answer is []").unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn unbalanced_brackets() {
        assert!(first_json_array("[\"github_repos\"").is_none());
    }

    #[test]
    fn first_match_wins() {
        let text = r#"Options: ["a"] or ["b", "c"]"#;
        let items = first_json_array(text).unwrap();
        assert_eq!(items, vec![json!("a")]);
    }

    #[test]
    fn first_region_invalid_does_not_fall_through() {
        // The first balanced region is not valid JSON; the later valid
        // array must not be considered.
        let text = r#"[oops] then ["fine"]"#;
        assert!(first_json_array(text).is_none());
    }

    #[test]
    fn brackets_inside_strings_do_not_unbalance() {
        let text = r#"["a ] tricky", "b"]"#;
        let items = first_json_array(text).unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn nested_arrays_balance() {
        let items = first_json_array(r#"[["x"], ["y"]]"#).unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn object_extraction() {
        let text = "Here you go:\n{\"people\": [\"Ada\"], \"summary\": \"ok\"}\nDone.";
        let value = first_json_object(text).unwrap();
        assert_eq!(value["people"][0], json!("Ada"));
    }

    #[test]
    fn object_with_escaped_quotes() {
        let text = r#"{"summary": "she said \"hi\" {verbatim}"}"#;
        let value = first_json_object(text).unwrap();
        assert!(value["summary"].as_str().unwrap().contains("{verbatim}"));
    }
}
