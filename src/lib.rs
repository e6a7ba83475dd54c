// Public modules
pub mod assembler;
pub mod attachment;
pub mod chat;
pub mod client;
pub mod completion;
pub mod conversation;
pub mod credentials;
pub mod error;
pub mod observability;
pub mod segments;
pub mod sse;
pub mod types;

// Re-exports
pub use assembler::{Assembler, Assembly, SkippedAttachment, html_escape};
pub use attachment::{Attachment, AttachmentKind, AttachmentProcessor, PdfTextExtractor};
pub use client::Anthropic;
pub use completion::{CompletionClient, FragmentStream, Provider};
pub use conversation::ConversationStore;
pub use credentials::{CredentialChain, SecretSource};
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use segments::{Segment, split_segments};
pub use types::*;
