//! Dialect translation.
//!
//! The proxy accepts two request dialects: the backend's native
//! `/generate` shape and the OpenAI-style completion/chat shapes. The
//! [`openai`] module translates the latter into native requests on the
//! way in and wraps native completions back into OpenAI response
//! envelopes on the way out, so a single cache serves both dialects.

pub mod openai;

pub use openai::{ChatCompletionRequest, CompletionRequest};
