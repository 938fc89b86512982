//! Native-dialect request types.
//!
//! [`GenerateRequest`] mirrors the upstream backend's own `/generate`
//! body. Chat-dialect requests are translated into this shape by the
//! [`dialect`](crate::dialect) module before they reach the cache, so
//! fingerprinting only ever sees one dialect.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{GencacheError, Result};

/// Role of a message participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    /// Parse a wire-format role string.
    ///
    /// Returns `None` for roles outside the admitted set; the caller
    /// maps that to a validation error rather than a parse error.
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "system" => Some(Role::System),
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            "tool" => Some(Role::Tool),
            _ => None,
        }
    }
}

/// One message in a chat-shaped prompt.
///
/// The role is kept as the raw wire string so an unknown role surfaces
/// as a 422 validation failure instead of a 400 decode failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// A prompt is either a bare text string or an ordered message sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Prompt {
    Text(String),
    Messages(Vec<ChatMessage>),
}

/// A native-dialect generation request.
///
/// The prompt may arrive in any of three fields (`text`, `prompt`,
/// `messages`); all three are admitted and the fingerprinter picks them
/// up in that priority order. `sampling_params` is an open map: unknown
/// parameters are carried through to the fingerprint and the upstream
/// unchanged. `model` is echoed into dialect responses but never
/// participates in the fingerprint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<Prompt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<ChatMessage>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub sampling_params: Map<String, Value>,
}

impl GenerateRequest {
    /// Decode a request from an already-parsed JSON body.
    ///
    /// Shape errors (wrong field types, malformed messages) map to
    /// [`GencacheError::Malformed`].
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| GencacheError::Malformed(e.to_string()))
    }

    /// Validate the request against the client-error taxonomy.
    ///
    /// Missing prompt → malformed (400). Non-positive or non-integer
    /// `n`, or an unknown message role → validation (422).
    pub fn validate(&self) -> Result<()> {
        if self.text.is_none() && self.prompt.is_none() && self.messages.is_none() {
            return Err(GencacheError::Malformed(
                "request has no text, prompt, or messages field".to_string(),
            ));
        }

        for message in self.prompt_messages() {
            if Role::parse(&message.role).is_none() {
                return Err(GencacheError::Validation(format!(
                    "unknown role '{}'",
                    message.role
                )));
            }
        }

        if let Some(n) = self.sampling_params.get("n") {
            match n.as_u64() {
                Some(n) if n > 0 => {}
                _ => {
                    return Err(GencacheError::Validation(
                        "n must be a positive integer".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }

    /// The number of completions the client asked for (default 1).
    ///
    /// [`validate()`](Self::validate) has already rejected non-positive
    /// values, so this only needs the default.
    pub fn requested_n(&self) -> usize {
        self.sampling_params
            .get("n")
            .and_then(Value::as_u64)
            .unwrap_or(1) as usize
    }

    /// Clone the request with `n` replaced.
    ///
    /// Used by the proxy pipeline to ask the upstream for exactly the
    /// completions the cache couldn't supply.
    pub fn with_n(&self, n: usize) -> GenerateRequest {
        let mut request = self.clone();
        request
            .sampling_params
            .insert("n".to_string(), Value::from(n as u64));
        request
    }

    /// Messages carried in whichever prompt field holds them.
    fn prompt_messages(&self) -> &[ChatMessage] {
        if let Some(Prompt::Messages(messages)) = &self.prompt {
            return messages;
        }
        if let Some(messages) = &self.messages {
            return messages;
        }
        &[]
    }
}
