//! Parsing of model-produced tool-call arguments.
//!
//! Models occasionally wrap the argument object in prose or emit trailing
//! garbage. Parsing is done in two stages: a strict parse of the whole
//! string, then a parse of the last brace-balanced substring.

use serde_json::Value;

use crate::error::ArgumentError;

/// Parse a raw argument string, salvaging an embedded object if needed.
///
/// # Errors
///
/// Returns [`ArgumentError::Strict`] with the original parse error when the
/// string holds no brace-balanced object, and [`ArgumentError::Salvage`]
/// when the embedded object is itself invalid.
pub fn parse_arguments(raw: &str) -> Result<Value, ArgumentError> {
    let strict = match serde_json::from_str(raw) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    let Some(candidate) = last_balanced_object(raw) else {
        return Err(ArgumentError::Strict(strict));
    };

    tracing::debug!(%strict, candidate, "salvaging tool arguments");
    serde_json::from_str(candidate).map_err(ArgumentError::Salvage)
}

/// The last `{...}` span whose braces balance, ignoring braces inside
/// string literals that start within an open object.
pub fn last_balanced_object(raw: &str) -> Option<&str> {
    let mut opens: Vec<usize> = Vec::new();
    let mut last: Option<(usize, usize)> = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in raw.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' if !opens.is_empty() => in_string = true,
            '{' => opens.push(i),
            '}' => {
                if let Some(start) = opens.pop() {
                    last = Some((start, i));
                }
            }
            _ => {}
        }
    }

    last.map(|(start, end)| &raw[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn well_formed_json_parses_strictly() {
        let value = parse_arguments(r#"{"city": "Paris", "days": 3}"#).unwrap();
        assert_eq!(value, json!({"city": "Paris", "days": 3}));
    }

    #[test]
    fn object_in_noise_matches_clean_parse() {
        let clean = r#"{"city": "Paris", "days": 3}"#;
        let noisy = format!("Sure! Here are the arguments: {clean} Let me know.");
        assert_eq!(parse_arguments(&noisy).unwrap(), parse_arguments(clean).unwrap());
    }

    #[test]
    fn trailing_garbage_is_dropped() {
        let value = parse_arguments(r#"{"q": "rust"}}}"#).unwrap();
        assert_eq!(value, json!({"q": "rust"}));
    }

    #[test]
    fn nested_object_is_kept_whole() {
        let value = parse_arguments(r#"args -> {"a": {"b": [1, 2]}} <-"#).unwrap();
        assert_eq!(value, json!({"a": {"b": [1, 2]}}));
    }

    #[test]
    fn braces_inside_strings_do_not_split_the_object() {
        let value = parse_arguments(r#"call with {"pattern": "a}b{c"} please"#).unwrap();
        assert_eq!(value, json!({"pattern": "a}b{c"}));
    }

    #[test]
    fn last_object_wins() {
        let value = parse_arguments(r#"first {"a": 1} then {"b": 2}"#).unwrap();
        assert_eq!(value, json!({"b": 2}));
    }

    #[test]
    fn no_embedded_object_propagates_strict_error() {
        let strict = serde_json::from_str::<Value>("not json at all").unwrap_err();
        let err = parse_arguments("not json at all").unwrap_err();
        match err {
            ArgumentError::Strict(e) => assert_eq!(e.to_string(), strict.to_string()),
            ArgumentError::Salvage(e) => panic!("expected strict failure, got salvage: {e}"),
        }
    }

    #[test]
    fn empty_string_is_a_strict_failure() {
        assert!(matches!(parse_arguments(""), Err(ArgumentError::Strict(_))));
    }

    #[test]
    fn invalid_embedded_object_is_a_salvage_failure() {
        let err = parse_arguments("noise {not: json} noise").unwrap_err();
        assert!(matches!(err, ArgumentError::Salvage(_)));
    }

    #[test]
    fn unbalanced_braces_yield_nothing() {
        assert_eq!(last_balanced_object("{{{"), None);
        assert_eq!(last_balanced_object("}}}"), None);
        assert_eq!(last_balanced_object("x { y } z"), Some("{ y }"));
    }
}
