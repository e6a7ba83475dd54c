use serde::{Deserialize, Serialize};

use crate::types::{Model, RequestMessage};

/// Sampling temperature used when the caller does not choose one.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Parameters for one completion round trip.
///
/// Serializes to the body of a Messages API call, minus the `stream` flag
/// which the client adds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionRequest {
    /// The model that will complete the prompt.
    pub model: Model,

    /// The maximum number of tokens to generate before stopping.
    pub max_tokens: u32,

    /// Amount of randomness injected into the response, in `[0, 1]`.
    pub temperature: f32,

    /// Conversation so far, ending with the new user turn.
    pub messages: Vec<RequestMessage>,

    /// System prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

impl CompletionRequest {
    /// Create a new request with the default temperature and no system prompt.
    pub fn new(model: impl Into<Model>, max_tokens: u32, messages: Vec<RequestMessage>) -> Self {
        Self {
            model: model.into(),
            max_tokens,
            temperature: DEFAULT_TEMPERATURE,
            messages,
            system: None,
        }
    }

    /// Set the temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set or clear the system prompt. Empty prompts are treated as absent.
    pub fn with_system(mut self, system: Option<String>) -> Self {
        self.system = system.filter(|s| !s.trim().is_empty());
        self
    }
}
