use crate::llm::error::GatewayError;
use serde::de::DeserializeOwned;

/// Removes a single leading Markdown fence (with an optional language tag)
/// and a single trailing fence, tolerating surrounding whitespace. Exactly
/// one fence pair is honored; any fence text further inside the payload is
/// passed through verbatim.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // The opening fence may carry a language tag ("```json").
    let mut inner = match rest.split_once('\n') {
        Some((_tag, body)) => body,
        None => rest,
    };
    if let Some(end) = inner.rfind("```") {
        inner = &inner[..end];
    }
    inner.trim()
}

/// Decodes a model text payload as JSON after fence stripping.
pub fn decode_payload<T: DeserializeOwned>(text: &str) -> Result<T, GatewayError> {
    let inner = strip_code_fence(text);
    serde_json::from_str(inner).map_err(|err| GatewayError::Decode {
        detail: format!("{err}; payload={}", excerpt(inner)),
    })
}

fn excerpt(payload: &str) -> String {
    const MAX_CHARS: usize = 200;
    if payload.chars().count() <= MAX_CHARS {
        payload.to_string()
    } else {
        let head: String = payload.chars().take(MAX_CHARS).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn fenced_payload_decodes_like_the_bare_payload() {
        let body = r#"{"a":1,"b":"x"}"#;
        let fenced = format!("```json\n{body}\n```");
        let direct: Value = serde_json::from_str(body).unwrap();
        let stripped: Value = decode_payload(&fenced).unwrap();
        assert_eq!(stripped, direct);
    }

    #[test]
    fn tolerates_surrounding_whitespace_and_missing_tag() {
        let fenced = "  \n```\n[1, 2, 3]\n```  \n";
        assert_eq!(strip_code_fence(fenced), "[1, 2, 3]");
    }

    #[test]
    fn unfenced_text_passes_through_trimmed() {
        assert_eq!(strip_code_fence("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn missing_trailing_fence_is_tolerated() {
        let fenced = "```json\n{\"a\":1}";
        assert_eq!(strip_code_fence(fenced), "{\"a\":1}");
    }

    #[test]
    fn only_the_outermost_fence_pair_is_stripped() {
        let fenced = "```json\n{\"code\":\"```rust\"}\n```";
        let value: Value = decode_payload(fenced).unwrap();
        assert_eq!(value, json!({"code": "```rust"}));
    }

    #[test]
    fn decode_failure_is_the_decode_variant() {
        let err = decode_payload::<Value>("```json\nnot json\n```").unwrap_err();
        assert!(matches!(err, GatewayError::Decode { .. }));
    }
}
