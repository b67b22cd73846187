//! # line-intent
//!
//! Turns what the player typed into a [`line_core::Action`].
//!
//! Two resolvers implement [`IntentResolver`]:
//!
//! - [`FixedCommandResolver`]: a fixed command vocabulary with aliases.
//! - [`EmbeddingResolver`]: fixed commands first, then nearest valid action
//!   by embedding similarity, served by a local Ollama endpoint.
//!
//! The embedding path is bounded by a timeout and falls back to the fixed
//! result on any failure, so the game never depends on the network.

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod embedding;
pub mod error;
pub mod fixed;

use std::future::Future;

use line_core::Action;
use line_core::config::{IntentConfig, IntentProvider};
use tracing::info;

pub use embedding::{EmbeddingResolver, EmbeddingSource, OllamaEmbeddingClient};
pub use error::IntentError;
pub use fixed::FixedCommandResolver;

/// What a resolver made of the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The input names this action. It may still be invalid right now; the
    /// engine explains the rejection.
    Matched(Action),
    /// Nothing recognisable.
    NoMatch,
}

/// Maps raw player input to an action, given the actions valid right now.
pub trait IntentResolver {
    /// Resolve `input`.
    fn resolve(&self, input: &str, valid: &[Action]) -> impl Future<Output = Resolution> + Send;

    /// Get ready for the actions valid on the next turn. Called while
    /// waiting for input and dropped as soon as the input arrives.
    fn prepare(&self, valid: &[Action]) -> impl Future<Output = ()> + Send {
        let _ = valid;
        std::future::ready(())
    }
}

impl IntentResolver for FixedCommandResolver {
    async fn resolve(&self, input: &str, valid: &[Action]) -> Resolution {
        self.resolve_now(input, valid)
    }
}

/// The resolver chosen by `[intent] provider`.
#[derive(Debug)]
pub enum AnyResolver {
    /// Fixed commands only.
    Fixed(FixedCommandResolver),
    /// Fixed commands plus embedding similarity.
    Embedding(EmbeddingResolver<OllamaEmbeddingClient>),
}

impl AnyResolver {
    /// Build the configured resolver.
    ///
    /// # Errors
    /// [`IntentError::Config`] if the HTTP client cannot be built.
    pub fn from_config(config: &IntentConfig) -> Result<Self, IntentError> {
        let resolver = match config.provider {
            IntentProvider::Fixed => Self::Fixed(FixedCommandResolver),
            IntentProvider::Ollama => {
                let client = OllamaEmbeddingClient::new(config)?;
                Self::Embedding(EmbeddingResolver::new(client, config))
            }
        };
        info!(
            provider = ?config.provider,
            base_url = %config.base_url,
            model = %config.model,
            "Intent resolver ready"
        );
        Ok(resolver)
    }
}

impl IntentResolver for AnyResolver {
    async fn resolve(&self, input: &str, valid: &[Action]) -> Resolution {
        match self {
            Self::Fixed(r) => r.resolve(input, valid).await,
            Self::Embedding(r) => r.resolve(input, valid).await,
        }
    }

    async fn prepare(&self, valid: &[Action]) {
        if let Self::Embedding(r) = self {
            r.prepare(valid).await;
        }
    }
}
