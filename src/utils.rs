//! Shared string helpers
//!
//! The frame forwards loosely typed JSON property values to the ad library,
//! which expects browser-style strings. These helpers reproduce the two browser
//! primitives involved: `String(value)` and `encodeURIComponent`, plus the
//! fragment encoding Firefox applies to `location.href`.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde_json::Value;

/// Characters `encodeURIComponent` leaves untouched: `A-Z a-z 0-9 - _ . ! ~ * ' ( )`
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Characters a browser escapes when it serializes a URL fragment
const FRAGMENT: &AsciiSet = &percent_encoding::CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`');

/// Percent-encodes `input` like `encodeURIComponent`.
pub fn encode_uri_component(input: &str) -> String {
    utf8_percent_encode(input, URI_COMPONENT).to_string()
}

/// Percent-encodes a fragment the way Firefox reports it through `location.href`.
pub fn encode_fragment(input: &str) -> String {
    utf8_percent_encode(input, FRAGMENT).to_string()
}

/// Decodes one level of percent-encoding. Invalid UTF-8 is replaced, not rejected.
pub fn decode_percent(input: &str) -> String {
    percent_decode_str(input).decode_utf8_lossy().into_owned()
}

/// Stringifies a JSON value the way JavaScript's `String(value)` would.
pub fn js_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                // Array.prototype.join renders null/undefined members as empty
                Value::Null => String::new(),
                other => js_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// JavaScript truthiness of a JSON value.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("plain", "plain")]
    #[case("a b", "a%20b")]
    #[case("t3_abc,t5_def", "t3_abc%2Ct5_def")]
    #[case("it's (ok)!*~", "it's%20(ok)!*~")]
    #[case("a/b?c=d&e", "a%2Fb%3Fc%3Dd%26e")]
    #[case("ü", "%C3%BC")]
    fn encodes_like_encode_uri_component(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(encode_uri_component(input), expected);
    }

    #[test]
    fn fragment_encoding_only_touches_quotes_and_spaces() {
        let encoded = encode_fragment(r#"{"keywords":["a b"]}"#);
        assert_eq!(encoded, "{%22keywords%22:[%22a%20b%22]}");
        assert_eq!(decode_percent(&encoded), r#"{"keywords":["a b"]}"#);
    }

    #[rstest]
    #[case(json!(null), "null")]
    #[case(json!(true), "true")]
    #[case(json!(42), "42")]
    #[case(json!(1.5), "1.5")]
    #[case(json!("text"), "text")]
    #[case(json!(["gaming", "pics", null]), "gaming,pics,")]
    #[case(json!({"k": 1}), "[object Object]")]
    fn stringifies_like_javascript(#[case] value: Value, #[case] expected: &str) {
        assert_eq!(js_string(&value), expected);
    }

    #[rstest]
    #[case(json!(true), true)]
    #[case(json!(false), false)]
    #[case(json!(0), false)]
    #[case(json!(1), true)]
    #[case(json!(""), false)]
    #[case(json!("false"), true)]
    #[case(json!(null), false)]
    #[case(json!([]), true)]
    fn truthiness(#[case] value: Value, #[case] expected: bool) {
        assert_eq!(is_truthy(&value), expected);
    }
}
