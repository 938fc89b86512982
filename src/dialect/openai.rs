//! OpenAI-dialect request and response translation.
//!
//! Inbound, known fields are lifted into a native [`GenerateRequest`]:
//! `messages` land verbatim in the native prompt field, a `prompt`
//! string lands in `text`, `max_tokens` renames to `max_new_tokens`,
//! and the sampling parameters pass through under their own names.
//! Unknown fields are dropped; fingerprinting over fields the backend
//! ignores would split the cache into pointless misses.
//!
//! Outbound envelopes (`id`, `created`, `model`, choice indices) are
//! minted fresh on every response, cache hits included. The cache
//! stores the underlying completion, never the dialect wrapper.

use serde::Deserialize;
use serde_json::{Map, Value, json};
use uuid::Uuid;

use crate::types::{ChatMessage, Completion, GenerateRequest, Prompt};
use crate::{GencacheError, Result};

/// Model name echoed when the client didn't send one.
const DEFAULT_MODEL: &str = "unknown";

/// Sampling parameters that pass through under the same name.
///
/// Paired with the matching field extractor; order here is the order
/// they are copied, which does not affect the fingerprint (keys sort
/// during canonicalization).
const PASSTHROUGH_PARAMS: &[&str] = &[
    "n",
    "temperature",
    "top_p",
    "stop",
    "presence_penalty",
    "frequency_penalty",
    "seed",
];

/// An OpenAI-style `/v1/completions` request body.
///
/// Parameter values stay as raw JSON so the exact number forms the
/// client sent survive into the fingerprint (`0` and `0.0` are
/// different preimages).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompletionRequest {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<Value>,
    #[serde(default)]
    pub n: Option<Value>,
    #[serde(default)]
    pub temperature: Option<Value>,
    #[serde(default)]
    pub top_p: Option<Value>,
    #[serde(default)]
    pub stop: Option<Value>,
    #[serde(default)]
    pub presence_penalty: Option<Value>,
    #[serde(default)]
    pub frequency_penalty: Option<Value>,
    #[serde(default)]
    pub seed: Option<Value>,
}

impl CompletionRequest {
    /// Decode from an already-parsed JSON body.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| GencacheError::Malformed(e.to_string()))
    }

    /// Translate into the native dialect.
    pub fn to_native(&self) -> GenerateRequest {
        GenerateRequest {
            text: self.prompt.clone(),
            model: self.model.clone(),
            sampling_params: self.sampling_params(),
            ..Default::default()
        }
    }

    fn sampling_params(&self) -> Map<String, Value> {
        collect_params(
            &self.max_tokens,
            [
                &self.n,
                &self.temperature,
                &self.top_p,
                &self.stop,
                &self.presence_penalty,
                &self.frequency_penalty,
                &self.seed,
            ],
        )
    }
}

/// An OpenAI-style `/v1/chat/completions` request body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatCompletionRequest {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub messages: Option<Vec<ChatMessage>>,
    #[serde(default)]
    pub max_tokens: Option<Value>,
    #[serde(default)]
    pub n: Option<Value>,
    #[serde(default)]
    pub temperature: Option<Value>,
    #[serde(default)]
    pub top_p: Option<Value>,
    #[serde(default)]
    pub stop: Option<Value>,
    #[serde(default)]
    pub presence_penalty: Option<Value>,
    #[serde(default)]
    pub frequency_penalty: Option<Value>,
    #[serde(default)]
    pub seed: Option<Value>,
}

impl ChatCompletionRequest {
    /// Decode from an already-parsed JSON body.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| GencacheError::Malformed(e.to_string()))
    }

    /// Translate into the native dialect.
    ///
    /// The message array is carried verbatim in the native prompt
    /// field, which admits either a string or a message sequence.
    pub fn to_native(&self) -> GenerateRequest {
        GenerateRequest {
            prompt: self.messages.clone().map(Prompt::Messages),
            model: self.model.clone(),
            sampling_params: collect_params(
                &self.max_tokens,
                [
                    &self.n,
                    &self.temperature,
                    &self.top_p,
                    &self.stop,
                    &self.presence_penalty,
                    &self.frequency_penalty,
                    &self.seed,
                ],
            ),
            ..Default::default()
        }
    }
}

fn collect_params(max_tokens: &Option<Value>, passthrough: [&Option<Value>; 7]) -> Map<String, Value> {
    let mut params = Map::new();
    if let Some(value) = max_tokens {
        params.insert("max_new_tokens".to_string(), value.clone());
    }
    for (name, value) in PASSTHROUGH_PARAMS.iter().zip(passthrough) {
        if let Some(value) = value {
            params.insert((*name).to_string(), value.clone());
        }
    }
    params
}

/// Wrap completions in a `text_completion` envelope.
pub fn completion_response(completions: &[Completion], model: Option<&str>) -> Value {
    json!({
        "id": format!("cmpl-{}", Uuid::new_v4().simple()),
        "object": "text_completion",
        "created": unix_now(),
        "model": model.unwrap_or(DEFAULT_MODEL),
        "choices": completions
            .iter()
            .enumerate()
            .map(|(index, completion)| {
                json!({
                    "index": index,
                    "text": completion.text(),
                    "finish_reason": completion.finish_reason(),
                })
            })
            .collect::<Vec<_>>(),
    })
}

/// Wrap completions in a `chat.completion` envelope.
pub fn chat_completion_response(completions: &[Completion], model: Option<&str>) -> Value {
    json!({
        "id": format!("chatcmpl-{}", Uuid::new_v4().simple()),
        "object": "chat.completion",
        "created": unix_now(),
        "model": model.unwrap_or(DEFAULT_MODEL),
        "choices": completions
            .iter()
            .enumerate()
            .map(|(index, completion)| {
                json!({
                    "index": index,
                    "message": {
                        "role": "assistant",
                        "content": completion.text(),
                    },
                    "finish_reason": completion.finish_reason(),
                })
            })
            .collect::<Vec<_>>(),
    })
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
