use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use domain::provider::{
    AnswerProvider, EmbeddingError, EmbeddingProvider, GenerationError, ProviderError,
};
use futures::stream::{self, TryStreamExt};
use tokio::time::sleep;

use crate::rate_limiter::RateLimiter;

pub const DEFAULT_MAX_TRIES: u32 = 3;

const TRANSIENT_RETRY_DELAY: Duration = Duration::from_secs(1);
// Keeps the pipeline full during batch embedding; the rate limiter still
// paces the actual calls.
const EMBED_CONCURRENCY: usize = 8;

/// Retry loop shared by the embedding and generation clients. Every
/// attempt first satisfies the rate limiter. Rate-limited failures back
/// off exponentially (1s, 2s, 4s, ...), other transient failures wait a
/// fixed second, fatal failures and the last permitted attempt give up
/// with the attempt count and last cause.
async fn call_with_retries<T, F, Fut>(
    limiter: &RateLimiter,
    max_tries: u32,
    mut call: F,
) -> Result<T, (u32, ProviderError)>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let max_tries = max_tries.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        limiter.acquire().await;
        let err = match call().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if err.is_fatal() || attempt >= max_tries {
            return Err((attempt, err));
        }
        let delay = if err.is_rate_limited() {
            // Shift capped so a huge retry budget cannot overflow.
            Duration::from_secs(1u64 << (attempt - 1).min(16))
        } else {
            TRANSIENT_RETRY_DELAY
        };
        sleep(delay).await;
    }
}

/// Rate-limited, retrying wrapper around an embedding provider.
pub struct EmbeddingClient<P> {
    provider: P,
    limiter: Arc<RateLimiter>,
    max_tries: u32,
}

impl<P: EmbeddingProvider> EmbeddingClient<P> {
    pub fn new(provider: P, limiter: Arc<RateLimiter>, max_tries: u32) -> Self {
        Self {
            provider,
            limiter,
            max_tries,
        }
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        call_with_retries(&self.limiter, self.max_tries, || self.provider.embed(text))
            .await
            .map_err(|(attempts, source)| EmbeddingError { attempts, source })
    }

    /// Embed many chunks with bounded, order-preserving concurrency.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        stream::iter(texts.iter().map(|text| self.embed(text)).map(Ok::<_, EmbeddingError>))
            .try_buffered(EMBED_CONCURRENCY)
            .try_collect()
            .await
    }
}

/// Same policy applied to the answer-generation call.
pub struct GenerationClient<P> {
    provider: P,
    limiter: Arc<RateLimiter>,
    max_tries: u32,
}

impl<P: AnswerProvider> GenerationClient<P> {
    pub fn new(provider: P, limiter: Arc<RateLimiter>, max_tries: u32) -> Self {
        Self {
            provider,
            limiter,
            max_tries,
        }
    }

    pub async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        call_with_retries(&self.limiter, self.max_tries, || {
            self.provider.generate(prompt)
        })
        .await
        .map_err(|(attempts, source)| GenerationError { attempts, source })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::time::Instant;

    use super::*;

    struct ScriptedProvider {
        script: Mutex<VecDeque<Result<Vec<f32>, ProviderError>>>,
        calls: AtomicU32,
    }

    impl ScriptedProvider {
        fn new(script: Vec<Result<Vec<f32>, ProviderError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EmbeddingProvider for ScriptedProvider {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ProviderError::Transient("script exhausted".into())))
        }
    }

    fn client(provider: ScriptedProvider) -> EmbeddingClient<ScriptedProvider> {
        let limiter = Arc::new(RateLimiter::new(1000, 100_000));
        EmbeddingClient::new(provider, limiter, 3)
    }

    fn rate_limited() -> Result<Vec<f32>, ProviderError> {
        Err(ProviderError::RateLimited("429".into()))
    }

    #[tokio::test(start_paused = true)]
    async fn two_rate_limit_failures_then_success_takes_three_attempts() {
        let client = client(ScriptedProvider::new(vec![
            rate_limited(),
            rate_limited(),
            Ok(vec![0.5, 0.5]),
        ]));
        let start = Instant::now();
        let vector = client.embed("hello").await.unwrap();
        assert_eq!(vector, vec![0.5, 0.5]);
        assert_eq!(client.provider.calls(), 3);
        // Backoff grows: 1s after the first failure, 2s after the second.
        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failure_waits_one_second() {
        let client = client(ScriptedProvider::new(vec![
            Err(ProviderError::Transient("503".into())),
            Ok(vec![1.0]),
        ]));
        let start = Instant::now();
        client.embed("hello").await.unwrap();
        assert_eq!(client.provider.calls(), 2);
        assert!(start.elapsed() >= Duration::from_secs(1));
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_failure_short_circuits() {
        let client = client(ScriptedProvider::new(vec![Err(ProviderError::Fatal(
            "bad key".into(),
        ))]));
        let err = client.embed("hello").await.unwrap_err();
        assert_eq!(client.provider.calls(), 1);
        assert_eq!(err.attempts, 1);
        assert!(err.source.is_fatal());
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_reports_attempts_and_last_cause() {
        let client = client(ScriptedProvider::new(vec![
            rate_limited(),
            rate_limited(),
            rate_limited(),
        ]));
        let err = client.embed("hello").await.unwrap_err();
        assert_eq!(err.attempts, 3);
        assert!(err.source.is_rate_limited());
        assert_eq!(client.provider.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn batch_preserves_input_order() {
        struct EchoLength;

        #[async_trait]
        impl EmbeddingProvider for EchoLength {
            async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
                Ok(vec![text.len() as f32])
            }
        }

        let limiter = Arc::new(RateLimiter::new(1000, 100_000));
        let client = EmbeddingClient::new(EchoLength, limiter, 1);
        let texts = vec!["a".to_string(), "bbb".to_string(), "cc".to_string()];
        let vectors = client.embed_batch(&texts).await.unwrap();
        assert_eq!(vectors, vec![vec![1.0], vec![3.0], vec![2.0]]);
    }
}
