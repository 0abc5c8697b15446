//! Embedded-JSON extraction from free-form model output.
//!
//! The language model is asked for a single JSON object but replies in free
//! text: sometimes fenced, sometimes bare, sometimes wrapped in prose. This
//! module is the one place that digs the object out; extraction failure is a
//! named error, never a partial default.

use serde::de::DeserializeOwned;

use crate::error::{GenError, GenResult};

/// Locate the JSON object embedded in `text`.
///
/// Prefers a ```json fenced block; otherwise takes the span from the first
/// `{` to the last `}`.
pub fn extract_json_object(text: &str) -> GenResult<&str> {
    let text = text.trim();

    if let Some(fence) = text.find("```json") {
        let body = &text[fence + 7..];
        if let Some(end) = body.find("```") {
            return Ok(body[..end].trim());
        }
    }

    let start = text.find('{').ok_or(GenError::MissingPayload)?;
    let end = text.rfind('}').ok_or(GenError::MissingPayload)?;
    if end < start {
        return Err(GenError::MissingPayload);
    }

    Ok(text[start..=end].trim())
}

/// Extract and deserialize the embedded JSON object.
pub fn parse_embedded<T: DeserializeOwned>(text: &str) -> GenResult<T> {
    let json = extract_json_object(text)?;
    serde_json::from_str(json).map_err(|e| GenError::malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Payload {
        title: String,
        count: u32,
    }

    #[test]
    fn test_bare_object() {
        let parsed: Payload = parse_embedded(r#"{"title": "hi", "count": 3}"#).unwrap();
        assert_eq!(parsed.count, 3);
    }

    #[test]
    fn test_fenced_object() {
        let text = "Sure! Here you go:\n```json\n{\"title\": \"hi\", \"count\": 1}\n```\nEnjoy.";
        let parsed: Payload = parse_embedded(text).unwrap();
        assert_eq!(parsed.title, "hi");
    }

    #[test]
    fn test_object_with_surrounding_prose() {
        let text = "The answer is {\"title\": \"x\", \"count\": 2} as requested.";
        let parsed: Payload = parse_embedded(text).unwrap();
        assert_eq!(parsed.count, 2);
    }

    #[test]
    fn test_no_object() {
        let err = parse_embedded::<Payload>("no json here at all").unwrap_err();
        assert!(matches!(err, GenError::MissingPayload));
    }

    #[test]
    fn test_malformed_object() {
        let err = parse_embedded::<Payload>("{\"title\": \"hi\", \"count\":}").unwrap_err();
        assert!(matches!(err, GenError::MalformedPayload(_)));
    }

    #[test]
    fn test_unterminated_fence_falls_back() {
        let text = "```json {\"title\": \"hi\", \"count\": 5}";
        let parsed: Payload = parse_embedded(text).unwrap();
        assert_eq!(parsed.count, 5);
    }

    #[test]
    fn test_nested_braces() {
        #[derive(Deserialize)]
        struct Outer {
            inner: Payload,
        }
        let text = "prefix {\"inner\": {\"title\": \"n\", \"count\": 9}} suffix";
        let parsed: Outer = parse_embedded(text).unwrap();
        assert_eq!(parsed.inner.count, 9);
    }
}
