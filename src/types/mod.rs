// Public modules
pub mod base64_image_source;
pub mod content_block;
pub mod message;
pub mod model;
pub mod request;
pub mod stream_event;

// Re-exports
pub use base64_image_source::Base64ImageSource;
pub use content_block::{ContentBlock, ImageBlock, TextBlock};
pub use message::{Message, MessageContent, RequestMessage, Role};
pub use model::{KnownModel, Model, ModelCatalog, ModelInfo};
pub use request::{CompletionRequest, DEFAULT_TEMPERATURE};
pub use stream_event::{
    ContentDelta, DeltaUsage, ErrorObject, MessageDelta, MessageStart, StreamEvent,
};
