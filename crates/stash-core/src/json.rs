//! JSON framing helpers
//!
//! Malformed input is not an error here: it reads as "absent", exactly like a
//! missing key.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::Result;

/// Text written for an undefined value. Not valid JSON, so it reads back as absent.
pub const UNDEFINED_TEXT: &str = "undefined";

/// Decode `text`, or `None` if it is not valid JSON
pub fn parse_json(text: &str) -> Option<Value> {
    match serde_json::from_str(text) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::trace!(error = %e, "Discarding malformed JSON");
            None
        }
    }
}

/// Decode `text` into `T`, or `None` if it is malformed or has the wrong shape
pub fn parse_json_as<T: DeserializeOwned>(text: &str) -> Option<T> {
    serde_json::from_str(text).ok()
}

/// Encode a value for the host store; `None` becomes [`UNDEFINED_TEXT`]
pub fn to_json_text(value: Option<&Value>) -> Result<String> {
    match value {
        Some(value) => Ok(serde_json::to_string(value)?),
        None => Ok(UNDEFINED_TEXT.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn test_parse_json() {
        let cases = [
            (r#"{"foo": 1}"#, Some(json!({"foo": 1}))),
            ("undefined", None),
            ("null", Some(Value::Null)),
            (r#""some string""#, Some(json!("some string"))),
            (
                r#"{"complex": true, "fields": [{"foo": 1}, {"bar": 2}]}"#,
                Some(json!({"complex": true, "fields": [{"foo": 1}, {"bar": 2}]})),
            ),
        ];

        for (input, expected) in cases {
            assert_eq!(parse_json(input), expected, "input: {}", input);
        }
    }

    #[test]
    fn test_parse_json_malformed() {
        assert_eq!(parse_json("{not json"), None);
        assert_eq!(parse_json(""), None);
    }

    #[test]
    fn test_parse_json_as() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Point {
            x: i32,
            y: i32,
        }

        assert_eq!(
            parse_json_as::<Point>(r#"{"x": 1, "y": 2}"#),
            Some(Point { x: 1, y: 2 })
        );
        assert_eq!(parse_json_as::<Point>(r#"{"x": 1}"#), None);
        assert_eq!(parse_json_as::<Point>("undefined"), None);
    }

    #[test]
    fn test_to_json_text() {
        assert_eq!(to_json_text(None).unwrap(), "undefined");
        assert_eq!(to_json_text(Some(&json!({"a": 1}))).unwrap(), r#"{"a":1}"#);
        assert_eq!(to_json_text(Some(&Value::Null)).unwrap(), "null");
    }
}
