//! The opaque completion record.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One generated completion as returned by the upstream backend.
///
/// The cache treats a completion as an immutable opaque record: it is
/// stored, journaled, and returned byte-for-byte as the upstream
/// produced it. Only the dialect adapter peeks inside, to pull out the
/// generated text and finish reason when re-shaping a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Completion(Value);

impl Completion {
    pub fn new(value: Value) -> Self {
        Completion(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// The generated text, or the empty string if the upstream used an
    /// unexpected shape.
    pub fn text(&self) -> &str {
        self.0.get("text").and_then(Value::as_str).unwrap_or("")
    }

    /// The finish reason, defaulting to "stop".
    ///
    /// Checks the backend's nested `meta_info.finish_reason.type` first,
    /// then a flat `finish_reason` string.
    pub fn finish_reason(&self) -> &str {
        self.0
            .get("meta_info")
            .and_then(|meta| meta.get("finish_reason"))
            .and_then(|fr| fr.get("type"))
            .and_then(Value::as_str)
            .or_else(|| self.0.get("finish_reason").and_then(Value::as_str))
            .unwrap_or("stop")
    }
}

impl From<Value> for Completion {
    fn from(value: Value) -> Self {
        Completion(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_reads_the_text_field() {
        let completion = Completion::new(json!({"text": " Paris.", "meta_info": {}}));
        assert_eq!(completion.text(), " Paris.");
    }

    #[test]
    fn text_defaults_to_empty() {
        let completion = Completion::new(json!({"tokens": [1, 2, 3]}));
        assert_eq!(completion.text(), "");
    }

    #[test]
    fn finish_reason_prefers_nested_meta_info() {
        let completion = Completion::new(json!({
            "text": "x",
            "finish_reason": "length",
            "meta_info": {"finish_reason": {"type": "stop", "matched": null}}
        }));
        assert_eq!(completion.finish_reason(), "stop");
    }

    #[test]
    fn finish_reason_falls_back_to_flat_field_then_stop() {
        let flat = Completion::new(json!({"text": "x", "finish_reason": "length"}));
        assert_eq!(flat.finish_reason(), "length");

        let bare = Completion::new(json!({"text": "x"}));
        assert_eq!(bare.finish_reason(), "stop");
    }

    #[test]
    fn serializes_transparently() {
        let value = json!({"text": "hi", "meta_info": {"completion_tokens": 2}});
        let completion = Completion::new(value.clone());
        assert_eq!(serde_json::to_value(&completion).unwrap(), value);

        let back: Completion = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(back.as_value(), &value);
    }
}
