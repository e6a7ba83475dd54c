//! End-to-end chat turns over a scripted provider.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream;

use colloquy::chat::{ChatConfig, ChatSession, PlainTextRenderer};
use colloquy::{
    Attachment, CompletionRequest, ContentBlock, Error, FragmentStream, Message, Provider, Result,
};

/// Answers arithmetic it knows and records every request.
#[derive(Clone, Default)]
struct Echo {
    seen: Arc<Mutex<Vec<CompletionRequest>>>,
}

#[async_trait]
impl Provider for Echo {
    async fn stream(&self, request: &CompletionRequest) -> Result<FragmentStream> {
        self.seen.lock().unwrap().push(request.clone());
        let last = request
            .messages
            .last()
            .and_then(|m| m.blocks())
            .and_then(|b| b.first())
            .and_then(|b| b.as_text())
            .unwrap_or_default()
            .to_string();
        let reply = match last.as_str() {
            "2+2=" => "4",
            "fail" => return Err(Error::authentication("invalid x-api-key")),
            _ => "I don't know",
        };
        Ok(Box::pin(stream::iter(vec![Ok(reply.to_string())])))
    }
}

fn renderer() -> PlainTextRenderer<Vec<u8>> {
    PlainTextRenderer::with_writer(Vec::new(), false)
}

#[tokio::test]
async fn arithmetic_turn() {
    let echo = Echo::default();
    let mut session = ChatSession::new(echo.clone(), ChatConfig::new());
    let mut out = renderer();

    let response = session.send_streaming("2+2=", &[], &mut out).await.unwrap();
    assert_eq!(response, "4");

    let seen = echo.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].messages.len(), 1);
    assert_eq!(
        seen[0].messages[0].blocks().unwrap(),
        &[ContentBlock::text("2+2=")]
    );
    assert_eq!(
        session.store().all(),
        &[Message::user("2+2="), Message::assistant("4")]
    );
    assert_eq!(String::from_utf8(out.into_inner()).unwrap(), "4\n");
}

#[tokio::test]
async fn authentication_failure_is_reported_and_not_stored() {
    let mut session = ChatSession::new(Echo::default(), ChatConfig::new());
    let err = session
        .send_streaming("fail", &[], &mut renderer())
        .await
        .unwrap_err();
    assert_eq!(
        err.user_message(),
        "❌ Authentication failed. Check your API key."
    );
    assert_eq!(session.message_count(), 0);
}

#[tokio::test]
async fn unsupported_attachment_is_skipped_not_fatal() {
    let echo = Echo::default();
    let mut session = ChatSession::new(echo.clone(), ChatConfig::new());
    let mut out = renderer();
    let attachments = [
        Attachment::new("archive.zip", None, b"PK".to_vec()),
        Attachment::new("main.rs", None, b"fn main() {}".to_vec()),
    ];

    session
        .send_streaming("2+2=", &attachments, &mut out)
        .await
        .unwrap();

    let seen = echo.seen.lock().unwrap();
    let blocks = seen[0].messages[0].blocks().unwrap();
    assert_eq!(blocks.len(), 2);
    assert_eq!(
        blocks[1].as_text(),
        Some("File content (main.rs):\n```rust\nfn main() {}\n```")
    );
    let rendered = String::from_utf8(out.into_inner()).unwrap();
    assert!(rendered.contains("Skipped archive.zip"));
}
