//! Builds the message list for a completion request.

use tracing::warn;

use crate::attachment::{Attachment, AttachmentProcessor};
use crate::observability::ATTACHMENTS_SKIPPED;
use crate::types::{ContentBlock, RequestMessage};

/// Escape the characters HTML treats specially.
pub fn html_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// An attachment that contributed no content, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedAttachment {
    pub name: String,
    pub reason: String,
}

/// The result of assembling one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct Assembly {
    /// History followed by the new user message.
    pub messages: Vec<RequestMessage>,
    /// Attachments left out of the new message.
    pub skipped: Vec<SkippedAttachment>,
}

/// Combines a prompt, its attachments and prior turns into request messages.
#[derive(Clone, Default)]
pub struct Assembler {
    processor: AttachmentProcessor,
}

impl Assembler {
    pub fn new(processor: AttachmentProcessor) -> Self {
        Self { processor }
    }

    pub fn processor(&self) -> &AttachmentProcessor {
        &self.processor
    }

    /// The escaped prompt comes first, then one block per attachment in
    /// order.  Attachments that are unsupported or fail to process are
    /// skipped and reported; they never fail the turn.
    pub fn assemble(
        &self,
        prompt: &str,
        attachments: &[Attachment],
        history: &[RequestMessage],
    ) -> Assembly {
        let mut blocks = vec![ContentBlock::text(html_escape(prompt))];
        let mut skipped = Vec::new();
        for attachment in attachments {
            let reason = match self.processor.process(attachment) {
                Ok(Some(block)) => {
                    blocks.push(block);
                    continue;
                }
                Ok(None) => "unsupported file type".to_string(),
                Err(err) => err.to_string(),
            };
            warn!(name = %attachment.name, reason = %reason, "skipping attachment");
            ATTACHMENTS_SKIPPED.click();
            skipped.push(SkippedAttachment {
                name: attachment.name.clone(),
                reason,
            });
        }

        let mut messages = history.to_vec();
        messages.push(RequestMessage::user_blocks(blocks));
        Assembly { messages, skipped }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Message, Role};

    #[test]
    fn escape_all_specials() {
        assert_eq!(
            html_escape(r#"<a href="x">Tom & Jerry's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#x27;s&lt;/a&gt;"
        );
        assert_eq!(html_escape("2+2="), "2+2=");
    }

    #[test]
    fn prompt_only() {
        let assembly = Assembler::default().assemble("2+2=", &[], &[]);
        assert_eq!(assembly.messages.len(), 1);
        assert_eq!(assembly.messages[0].role, Role::User);
        assert_eq!(
            assembly.messages[0].blocks().unwrap(),
            &[ContentBlock::text("2+2=")]
        );
        assert!(assembly.skipped.is_empty());
    }

    #[test]
    fn prompt_then_attachments_in_order() {
        let attachments = vec![
            Attachment::new("a.py", None, b"x = 1".to_vec()),
            Attachment::new("blob.bin", None, vec![0, 1]),
            Attachment::new("b.png", Some("image/png".to_string()), vec![7]),
        ];
        let assembly = Assembler::default().assemble("look", &attachments, &[]);
        let blocks = assembly.messages[0].blocks().unwrap();
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].as_text(), Some("look"));
        assert!(blocks[1].as_text().unwrap().contains("```python"));
        assert!(blocks[2].is_image());
        assert_eq!(assembly.skipped.len(), 1);
        assert_eq!(assembly.skipped[0].name, "blob.bin");
    }

    #[test]
    fn oversized_attachment_skipped_not_fatal() {
        let assembler = Assembler::new(AttachmentProcessor::new().with_max_bytes(1));
        let attachments = vec![Attachment::new("big.txt", None, b"too big".to_vec())];
        let assembly = assembler.assemble("hi", &attachments, &[]);
        assert_eq!(assembly.messages[0].blocks().unwrap().len(), 1);
        assert_eq!(assembly.skipped.len(), 1);
    }

    #[test]
    fn history_is_preserved_and_extended() {
        let history: Vec<RequestMessage> = vec![
            RequestMessage::from(&Message::user("hello")),
            RequestMessage::from(&Message::assistant("hi there")),
        ];
        let before = history.clone();
        let assembly = Assembler::default().assemble("again", &[], &history);
        assert_eq!(history, before);
        assert_eq!(assembly.messages.len(), 3);
        assert_eq!(&assembly.messages[..2], &history[..]);
        assert_eq!(assembly.messages[2].role, Role::User);
    }
}
