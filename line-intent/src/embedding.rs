//! Embedding-similarity matching over a local Ollama endpoint.
//!
//! The input and the natural-language description of every valid action are
//! embedded; the closest action wins if its cosine similarity clears the
//! threshold. Fixed commands are tried first, so a dead or slow service only
//! ever costs free-text inputs.
//!
//! Action phrases are embedded ahead of time by [`IntentResolver::prepare`]
//! while the player types. Whatever is still missing at resolve time is
//! embedded concurrently with the input.

use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use line_core::Action;
use line_core::config::IntentConfig;
use futures_util::future::join_all;
use lru::LruCache;
use ordered_float::OrderedFloat;
use parking_lot::Mutex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{IntentError, Result};
use crate::fixed::FixedCommandResolver;
use crate::{IntentResolver, Resolution};

// ---------------------------------------------------------------------------
// Embedding sources
// ---------------------------------------------------------------------------

/// Anything that turns text into a vector.
pub trait EmbeddingSource {
    /// Embed one string.
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>>> + Send;
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Client for Ollama's `/api/embeddings`.
#[derive(Debug, Clone)]
pub struct OllamaEmbeddingClient {
    http: Client,
    url: String,
    model: String,
    timeout_ms: u64,
}

impl OllamaEmbeddingClient {
    /// Build a client from `[intent]` settings.
    ///
    /// # Errors
    /// [`IntentError::Config`] if the HTTP client cannot be built.
    pub fn new(config: &IntentConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| IntentError::Config(e.to_string()))?;
        Ok(Self {
            http,
            url: format!("{}/api/embeddings", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            timeout_ms: config.timeout_ms,
        })
    }
}

impl EmbeddingSource for OllamaEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let body = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };
        let resp = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| match IntentError::from(e) {
                IntentError::Timeout(_) => IntentError::Timeout(self.timeout_ms),
                other => other,
            })?
            .error_for_status()?;
        let parsed: EmbeddingResponse = resp.json().await?;
        if parsed.embedding.is_empty() {
            return Err(IntentError::Malformed("empty embedding".into()));
        }
        debug!(
            dims = parsed.embedding.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "Embedded text"
        );
        Ok(parsed.embedding)
    }
}

// ---------------------------------------------------------------------------
// Similarity
// ---------------------------------------------------------------------------

/// Cosine similarity; zero for mismatched or zero-length vectors.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na * nb)
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Fixed matching first, then nearest action by embedding similarity.
pub struct EmbeddingResolver<S> {
    source: S,
    fixed: FixedCommandResolver,
    threshold: f32,
    budget: Duration,
    warmup: Duration,
    cache: Mutex<LruCache<String, Arc<Vec<f32>>>>,
}

impl<S> std::fmt::Debug for EmbeddingResolver<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingResolver")
            .field("threshold", &self.threshold)
            .field("budget", &self.budget)
            .field("warmup", &self.warmup)
            .field("cached", &self.cache.lock().len())
            .finish_non_exhaustive()
    }
}

impl<S: EmbeddingSource + Sync> EmbeddingResolver<S> {
    /// Wrap `source` with the thresholds, budgets and cache size from `config`.
    #[must_use]
    pub fn new(source: S, config: &IntentConfig) -> Self {
        let capacity = NonZeroUsize::new(config.cache_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            source,
            fixed: FixedCommandResolver,
            threshold: config.similarity_threshold,
            budget: Duration::from_millis(config.timeout_ms),
            warmup: Duration::from_millis(config.warmup_timeout_ms),
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// The wrapped embedding source.
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    fn cached(&self, text: &str) -> Option<Arc<Vec<f32>>> {
        self.cache.lock().get(text).cloned()
    }

    /// Embed with the LRU cache in front.
    async fn cached_embed(&self, text: &str) -> Result<Arc<Vec<f32>>> {
        if let Some(hit) = self.cached(text) {
            return Ok(hit);
        }
        let v = Arc::new(self.source.embed(text).await?);
        self.cache.lock().put(text.to_string(), Arc::clone(&v));
        Ok(v)
    }

    /// Embed all `texts` concurrently. Each result is cached as it arrives.
    async fn embed_all(&self, texts: &[String]) -> Result<Vec<Arc<Vec<f32>>>> {
        join_all(texts.iter().map(|t| self.cached_embed(t)))
            .await
            .into_iter()
            .collect()
    }

    /// Embed the phrases of `valid` that are not cached yet, bounded by the
    /// warm-up budget. Failures are logged and otherwise ignored.
    pub async fn warm_up(&self, valid: &[Action]) {
        let missing: Vec<String> = {
            let cache = self.cache.lock();
            valid
                .iter()
                .map(Action::describe)
                .filter(|d| !cache.contains(d.as_str()))
                .collect()
        };
        if missing.is_empty() {
            return;
        }
        let start = Instant::now();
        match tokio::time::timeout(self.warmup, self.embed_all(&missing)).await {
            Ok(Ok(_)) => debug!(
                phrases = missing.len(),
                elapsed_ms = start.elapsed().as_millis(),
                "Action phrases embedded"
            ),
            Ok(Err(e)) => debug!(error = %e, "Action phrase warm-up failed"),
            Err(_) => debug!(phrases = missing.len(), "Action phrase warm-up timed out"),
        }
    }

    /// Best-scoring valid action and its similarity. The input and any
    /// phrase missing from the cache are embedded together.
    async fn nearest(&self, input: &str, valid: &[Action]) -> Result<Option<(Action, f32)>> {
        let mut texts = Vec::with_capacity(valid.len() + 1);
        texts.push(input.to_string());
        texts.extend(valid.iter().map(Action::describe));
        let vectors = self.embed_all(&texts).await?;
        let Some((query, anchors)) = vectors.split_first() else {
            return Ok(None);
        };
        Ok(valid
            .iter()
            .zip(anchors)
            .map(|(action, anchor)| (action, cosine_similarity(query, anchor)))
            .max_by_key(|(_, s)| OrderedFloat(*s))
            .map(|(a, s)| (a.clone(), s)))
    }
}

impl<S: EmbeddingSource + Sync> IntentResolver for EmbeddingResolver<S> {
    async fn resolve(&self, input: &str, valid: &[Action]) -> Resolution {
        let fixed = self.fixed.resolve_now(input, valid);
        if fixed != Resolution::NoMatch || input.trim().is_empty() || valid.is_empty() {
            return fixed;
        }

        let outcome = match tokio::time::timeout(self.budget, self.nearest(input, valid)).await {
            Ok(r) => r,
            Err(_) => Err(IntentError::Timeout(u64::try_from(self.budget.as_millis()).unwrap_or(u64::MAX))),
        };
        match outcome {
            Ok(Some((action, score))) if score >= self.threshold => {
                debug!(input, action = %action, score, "Embedding match");
                Resolution::Matched(action)
            }
            Ok(best) => {
                debug!(input, best = ?best.map(|(_, s)| s), threshold = self.threshold, "No embedding match");
                Resolution::NoMatch
            }
            Err(e) => {
                warn!(input, error = %e, "Embedding resolver failed; using fixed commands");
                fixed
            }
        }
    }

    async fn prepare(&self, valid: &[Action]) {
        self.warm_up(valid).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 1.0], &[-1.0, -1.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn client_url_is_normalised() {
        let config = IntentConfig {
            base_url: "http://localhost:11434/".into(),
            ..IntentConfig::default()
        };
        let client = OllamaEmbeddingClient::new(&config).expect("client");
        assert_eq!(client.url, "http://localhost:11434/api/embeddings");
    }
}
