use serde::{Deserialize, Serialize};

/// Metadata carried by a `message_start` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageStart {
    /// Unique object identifier.
    pub id: String,
    /// The model that handled the request.
    pub model: String,
}

/// Top-level changes carried by a `message_delta` event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDelta {
    /// Why the model stopped, once known.
    #[serde(default)]
    pub stop_reason: Option<String>,
}

/// Cumulative token usage reported by a `message_delta` event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaUsage {
    /// Output tokens generated so far.
    #[serde(default)]
    pub output_tokens: u32,
}

/// An incremental update to one content block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentDelta {
    /// A piece of response text.
    #[serde(rename = "text_delta")]
    Text {
        /// The text fragment.
        text: String,
    },

    /// Any other delta kind (tool input, thinking, citations); not rendered.
    #[serde(other)]
    Other,
}

/// Error payload of an `error` event or an error response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorObject {
    /// The API error type, e.g. "overloaded_error".
    #[serde(rename = "type")]
    pub error_type: String,
    /// Human-readable description.
    #[serde(default)]
    pub message: String,
}

/// An event in a message stream.
///
/// Events arrive in a fixed order: `message_start`, then for each content
/// block a start, any number of deltas and a stop, then `message_delta` and
/// finally `message_stop`. `ping` may appear anywhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StreamEvent {
    /// Keep-alive with no payload.
    #[serde(rename = "ping")]
    Ping,

    /// Start of the response message.
    #[serde(rename = "message_start")]
    MessageStart {
        /// Initial message metadata.
        message: MessageStart,
    },

    /// Start of a content block.
    #[serde(rename = "content_block_start")]
    ContentBlockStart {
        /// Index of the block within the message.
        index: usize,
    },

    /// Incremental content for a block.
    #[serde(rename = "content_block_delta")]
    ContentBlockDelta {
        /// Index of the block within the message.
        index: usize,
        /// The update.
        delta: ContentDelta,
    },

    /// End of a content block.
    #[serde(rename = "content_block_stop")]
    ContentBlockStop {
        /// Index of the block within the message.
        index: usize,
    },

    /// Top-level message changes such as the stop reason.
    #[serde(rename = "message_delta")]
    MessageDelta {
        /// The changes.
        delta: MessageDelta,
        /// Usage so far.
        #[serde(default)]
        usage: DeltaUsage,
    },

    /// The provider finished the response.
    #[serde(rename = "message_stop")]
    MessageStop,

    /// The provider failed mid-stream.
    #[serde(rename = "error")]
    Error {
        /// What went wrong.
        error: ErrorObject,
    },
}

impl StreamEvent {
    /// Returns the text carried by a text delta, if this is one.
    pub fn text_delta(&self) -> Option<&str> {
        match self {
            StreamEvent::ContentBlockDelta {
                delta: ContentDelta::Text { text },
                ..
            } => Some(text),
            _ => None,
        }
    }
}
