//! Core chat session management.
//!
//! [`ChatSession`] owns everything one conversation needs: the completion
//! client, the conversation store, the assembler, the settings and any files
//! queued for the next message.

use futures::StreamExt;
use tracing::{debug, info};

use crate::assembler::Assembler;
use crate::attachment::Attachment;
use crate::chat::config::ChatConfig;
use crate::chat::render::Renderer;
use crate::completion::{CompletionClient, Provider};
use crate::conversation::ConversationStore;
use crate::observability::{CHAT_TURNS, CHAT_TURN_ERRORS};
use crate::segments::{Segment, split_segments};
use crate::types::{CompletionRequest, Message, Model, ModelCatalog, ModelInfo};
use crate::{Error, Result};

/// A chat session that manages conversation state and API interactions.
pub struct ChatSession<P: Provider> {
    client: CompletionClient<P>,
    assembler: Assembler,
    store: ConversationStore,
    config: ChatConfig,
    pending: Vec<Attachment>,
}

impl<P: Provider> ChatSession<P> {
    /// Creates a new chat session over the built-in model catalog.
    pub fn new(provider: P, config: ChatConfig) -> Self {
        Self::with_parts(CompletionClient::new(provider), Assembler::default(), config)
    }

    /// Creates a session from explicit parts.
    pub fn with_parts(client: CompletionClient<P>, assembler: Assembler, config: ChatConfig) -> Self {
        Self {
            client,
            assembler,
            store: ConversationStore::new(),
            config,
            pending: Vec::new(),
        }
    }

    /// Sends one user turn and streams the response.
    ///
    /// Fragments are rendered as they arrive.  When the response completes,
    /// the raw prompt and the full response are appended to the conversation,
    /// any Mermaid diagrams in the response are handed to the renderer, and
    /// the full response is returned.  On failure the conversation is left
    /// exactly as it was.
    pub async fn send_streaming(
        &mut self,
        prompt: &str,
        attachments: &[Attachment],
        renderer: &mut dyn Renderer,
    ) -> Result<String> {
        let assembly = self
            .assembler
            .assemble(prompt, attachments, &self.store.history());
        for skipped in &assembly.skipped {
            renderer.print_info(&format!("⚠️ Skipped {}: {}", skipped.name, skipped.reason));
        }

        let request = CompletionRequest::new(
            self.config.model.clone(),
            self.config.max_tokens,
            assembly.messages,
        )
        .with_temperature(self.config.temperature)
        .with_system(self.config.system_prompt.clone());

        let mut fragments = match self.client.complete(request).await {
            Ok(fragments) => fragments,
            Err(err) => {
                CHAT_TURN_ERRORS.click();
                return Err(err);
            }
        };

        let mut response = String::new();
        while let Some(fragment) = fragments.next().await {
            match fragment {
                Ok(text) => {
                    renderer.print_text(&text);
                    response.push_str(&text);
                }
                Err(err) => {
                    CHAT_TURN_ERRORS.click();
                    if !response.is_empty() {
                        renderer.finish_response();
                    }
                    return Err(err);
                }
            }
        }

        self.store.append(Message::user(prompt));
        self.store.append(Message::assistant(response.clone()));
        for segment in split_segments(&response) {
            if let Segment::Mermaid(source) = segment {
                renderer.print_diagram(&source);
            }
        }
        renderer.finish_response();

        CHAT_TURNS.click();
        info!(
            model = %self.config.model,
            response_bytes = response.len(),
            messages = self.store.len(),
            "turn complete"
        );
        Ok(response)
    }

    /// Sends a turn with the queued attachments.  The queue is emptied once
    /// the turn succeeds.
    pub async fn send_with_pending(
        &mut self,
        prompt: &str,
        renderer: &mut dyn Renderer,
    ) -> Result<String> {
        let attachments = std::mem::take(&mut self.pending);
        let result = self.send_streaming(prompt, &attachments, renderer).await;
        if result.is_err() {
            self.pending = attachments;
        }
        result
    }

    /// Queues a file for the next message.
    pub fn attach(&mut self, attachment: Attachment) {
        debug!(name = %attachment.name, "attachment queued");
        self.pending.push(attachment);
    }

    /// Reads a file from disk and queues it.  Files over the processor's
    /// size ceiling are rejected without being read.
    pub fn attach_path(&mut self, path: impl AsRef<std::path::Path>) -> Result<&Attachment> {
        let max_bytes = self.assembler.processor().max_bytes();
        let attachment = Attachment::from_path_with_limit(path, max_bytes)?;
        self.attach(attachment);
        Ok(&self.pending[self.pending.len() - 1])
    }

    /// Drops all queued files, returning how many there were.
    pub fn detach(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        count
    }

    /// Files queued for the next message.
    pub fn pending(&self) -> &[Attachment] {
        &self.pending
    }

    /// Clears the conversation history.
    pub fn clear(&mut self) {
        self.store.clear();
    }

    /// The conversation so far.
    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Returns the number of messages in the conversation.
    pub fn message_count(&self) -> usize {
        self.store.len()
    }

    /// The active settings.
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// The models this session may use.
    pub fn catalog(&self) -> &ModelCatalog {
        self.client.catalog()
    }

    /// Changes the model used for responses.  The model must be in the catalog.
    pub fn set_model(&mut self, model: impl Into<Model>) -> Result<()> {
        let model = model.into();
        if self.client.catalog().get(&model).is_none() {
            return Err(Error::validation(
                format!("model {model} is not in the catalog; see /models"),
                Some("model".to_string()),
            ));
        }
        self.config.model = model;
        Ok(())
    }

    /// Returns the current model.
    pub fn model(&self) -> &Model {
        &self.config.model
    }

    /// Sets the sampling temperature, which must lie in `[0, 1]`.
    pub fn set_temperature(&mut self, temperature: f32) -> Result<()> {
        if !(0.0..=1.0).contains(&temperature) {
            return Err(Error::validation(
                format!("temperature {temperature} is outside [0, 1]"),
                Some("temperature".to_string()),
            ));
        }
        self.config.temperature = temperature;
        Ok(())
    }

    /// Sets the maximum tokens per response.  Values above the model
    /// ceiling are clamped when the request is sent.
    pub fn set_max_tokens(&mut self, max_tokens: u32) -> Result<()> {
        if max_tokens == 0 {
            return Err(Error::validation(
                "max_tokens must be at least 1",
                Some("max_tokens".to_string()),
            ));
        }
        self.config.max_tokens = max_tokens;
        Ok(())
    }

    /// Sets or clears the system prompt.
    pub fn set_system_prompt(&mut self, prompt: Option<String>) {
        self.config.system_prompt = prompt.filter(|p| !p.trim().is_empty());
    }

    /// Returns the current system prompt, if any.
    pub fn system_prompt(&self) -> Option<&str> {
        self.config.system_prompt.as_deref()
    }

    /// Checks which catalog models answer with the current credentials.
    pub async fn probe_models(&self) -> Vec<(ModelInfo, bool)> {
        self.client.probe_models().await
    }
}
