//! The completion client: validates a request against the model catalog and
//! hands it to a [`Provider`].

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tracing::{debug, warn};

use crate::types::{
    ContentBlock, CompletionRequest, ModelCatalog, ModelInfo, RequestMessage,
};
use crate::{Error, Result};

/// A lazy, finite sequence of response text fragments.
///
/// The stream ends normally when the provider signals completion.  A failure
/// is reported as a single `Err` item, after which the stream ends.  The
/// stream cannot be restarted.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Something that turns a completion request into text fragments.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Transmit the request and return the response as it arrives.
    async fn stream(&self, request: &CompletionRequest) -> Result<FragmentStream>;
}

#[async_trait]
impl<P: Provider + ?Sized> Provider for std::sync::Arc<P> {
    async fn stream(&self, request: &CompletionRequest) -> Result<FragmentStream> {
        (**self).stream(request).await
    }
}

/// Validates requests against a [`ModelCatalog`] and forwards them to a provider.
pub struct CompletionClient<P> {
    provider: P,
    catalog: ModelCatalog,
}

impl<P: Provider> CompletionClient<P> {
    /// Create a client over the built-in catalog.
    pub fn new(provider: P) -> Self {
        Self::with_catalog(provider, ModelCatalog::builtin())
    }

    /// Create a client over a custom catalog.
    pub fn with_catalog(provider: P, catalog: ModelCatalog) -> Self {
        Self { provider, catalog }
    }

    /// The catalog requests are checked against.
    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    /// The underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Check a request and clamp `max_tokens` to the model's ceiling.
    pub fn prepare(&self, mut request: CompletionRequest) -> Result<CompletionRequest> {
        let info = self.catalog.get(&request.model).ok_or_else(|| {
            Error::validation(
                format!("model {} is not in the catalog", request.model),
                Some("model".to_string()),
            )
        })?;
        if !(0.0..=1.0).contains(&request.temperature) {
            return Err(Error::validation(
                format!("temperature {} is outside [0, 1]", request.temperature),
                Some("temperature".to_string()),
            ));
        }
        if request.max_tokens == 0 {
            return Err(Error::validation(
                "max_tokens must be at least 1",
                Some("max_tokens".to_string()),
            ));
        }
        if request.messages.is_empty() {
            return Err(Error::validation(
                "a request needs at least one message",
                Some("messages".to_string()),
            ));
        }
        if request.max_tokens > info.max_output_tokens {
            debug!(
                model = %request.model,
                requested = request.max_tokens,
                ceiling = info.max_output_tokens,
                "clamping max_tokens"
            );
            request.max_tokens = info.max_output_tokens;
        }
        Ok(request)
    }

    /// Prepare the request and stream the response.
    pub async fn complete(&self, request: CompletionRequest) -> Result<FragmentStream> {
        let request = self.prepare(request)?;
        debug!(
            model = %request.model,
            max_tokens = request.max_tokens,
            temperature = request.temperature,
            messages = request.messages.len(),
            "sending completion request"
        );
        self.provider.stream(&request).await
    }

    /// Prepare the request and return the whole response at once.
    ///
    /// This drains the same stream [`complete`](Self::complete) returns, so the
    /// result always equals the concatenation of the streamed fragments.
    ///
    /// # Examples
    ///
    /// ```
    /// # use async_trait::async_trait;
    /// # use futures::stream;
    /// # use colloquy::{
    /// #     CompletionClient, CompletionRequest, ContentBlock, FragmentStream, KnownModel,
    /// #     Provider, RequestMessage, Result,
    /// # };
    /// struct Fixed;
    ///
    /// #[async_trait]
    /// impl Provider for Fixed {
    ///     async fn stream(&self, _: &CompletionRequest) -> Result<FragmentStream> {
    ///         let fragments = vec![Ok("Hel".to_string()), Ok("lo".to_string())];
    ///         Ok(Box::pin(stream::iter(fragments)))
    ///     }
    /// }
    ///
    /// # tokio_test::block_on(async {
    /// let client = CompletionClient::new(Fixed);
    /// let request = CompletionRequest::new(
    ///     KnownModel::Claude3Haiku20240307,
    ///     100,
    ///     vec![RequestMessage::user_blocks(vec![ContentBlock::text("Hi")])],
    /// );
    /// assert_eq!(client.complete_sync(request).await.unwrap(), "Hello");
    /// # });
    /// ```
    pub async fn complete_sync(&self, request: CompletionRequest) -> Result<String> {
        let mut fragments = self.complete(request).await?;
        let mut response = String::new();
        while let Some(fragment) = fragments.next().await {
            response.push_str(&fragment?);
        }
        Ok(response)
    }

    /// Send a tiny prompt to every catalog model and report which ones answer.
    pub async fn probe_models(&self) -> Vec<(ModelInfo, bool)> {
        let mut results = Vec::with_capacity(self.catalog.entries().len());
        for info in self.catalog.entries() {
            let request = CompletionRequest::new(
                info.model.clone(),
                10,
                vec![RequestMessage::user_blocks(vec![ContentBlock::text("Hi")])],
            );
            let ok = match self.complete_sync(request).await {
                Ok(_) => true,
                Err(err) => {
                    warn!(model = %info.model, error = %err, "model probe failed");
                    false
                }
            };
            results.push((info.clone(), ok));
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{KnownModel, Model};
    use futures::stream;
    use std::sync::Mutex;

    /// Replies with fixed fragments and remembers what it was sent.
    struct Canned {
        fragments: Vec<&'static str>,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl Canned {
        fn new(fragments: Vec<&'static str>) -> Self {
            Self {
                fragments,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Provider for Canned {
        async fn stream(&self, request: &CompletionRequest) -> Result<FragmentStream> {
            self.seen.lock().unwrap().push(request.clone());
            if request.model == Model::Known(KnownModel::Claude3Opus20240229) {
                return Err(Error::permission("no access"));
            }
            let items: Vec<Result<String>> =
                self.fragments.iter().map(|f| Ok(f.to_string())).collect();
            Ok(Box::pin(stream::iter(items)))
        }
    }

    fn hi(model: impl Into<Model>, max_tokens: u32) -> CompletionRequest {
        CompletionRequest::new(
            model,
            max_tokens,
            vec![RequestMessage::user_blocks(vec![ContentBlock::text("Hi")])],
        )
    }

    #[tokio::test]
    async fn max_tokens_clamped_before_transmission() {
        let client = CompletionClient::new(Canned::new(vec!["ok"]));
        client
            .complete_sync(hi(KnownModel::Claude3Haiku20240307, 100_000))
            .await
            .unwrap();
        let seen = client.provider().seen.lock().unwrap();
        assert_eq!(seen[0].max_tokens, 4096);
    }

    #[test]
    fn max_tokens_under_ceiling_unchanged() {
        let client = CompletionClient::new(Canned::new(vec![]));
        let prepared = client.prepare(hi(KnownModel::ClaudeSonnet4, 2000)).unwrap();
        assert_eq!(prepared.max_tokens, 2000);
    }

    #[test]
    fn unknown_model_rejected() {
        let client = CompletionClient::new(Canned::new(vec![]));
        let err = client.prepare(hi("gpt-4", 100)).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn temperature_out_of_range_rejected() {
        let client = CompletionClient::new(Canned::new(vec![]));
        let err = client
            .prepare(hi(KnownModel::ClaudeSonnet4, 100).with_temperature(1.5))
            .unwrap_err();
        assert!(err.is_validation());
        let err = client
            .prepare(hi(KnownModel::ClaudeSonnet4, 100).with_temperature(f32::NAN))
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn zero_max_tokens_rejected() {
        let client = CompletionClient::new(Canned::new(vec![]));
        assert!(client.prepare(hi(KnownModel::ClaudeSonnet4, 0)).is_err());
    }

    #[tokio::test]
    async fn streamed_and_sync_agree() {
        let client = CompletionClient::new(Canned::new(vec!["The ", "answer ", "is 4."]));
        let streamed: Vec<String> = client
            .complete(hi(KnownModel::ClaudeSonnet4, 100))
            .await
            .unwrap()
            .map(|f| f.unwrap())
            .collect()
            .await;
        let whole = client
            .complete_sync(hi(KnownModel::ClaudeSonnet4, 100))
            .await
            .unwrap();
        assert_eq!(streamed.concat(), whole);
        assert_eq!(whole, "The answer is 4.");
    }

    #[tokio::test]
    async fn sync_surfaces_stream_error() {
        struct Broken;

        #[async_trait]
        impl Provider for Broken {
            async fn stream(&self, _: &CompletionRequest) -> Result<FragmentStream> {
                let items: Vec<Result<String>> = vec![
                    Ok("partial".to_string()),
                    Err(Error::streaming("connection reset", None)),
                ];
                Ok(Box::pin(stream::iter(items)))
            }
        }

        let client = CompletionClient::new(Broken);
        let err = client
            .complete_sync(hi(KnownModel::ClaudeSonnet4, 100))
            .await
            .unwrap_err();
        assert!(err.is_provider());
    }

    #[tokio::test]
    async fn probe_reports_each_model() {
        let client = CompletionClient::new(Canned::new(vec!["Hello"]));
        let results = client.probe_models().await;
        assert_eq!(results.len(), KnownModel::ALL.len());
        for (info, ok) in &results {
            let expected = info.model != Model::Known(KnownModel::Claude3Opus20240229);
            assert_eq!(*ok, expected, "{}", info.model);
        }
        let seen = client.provider().seen.lock().unwrap();
        assert!(seen.iter().all(|r| r.max_tokens == 10));
    }
}
