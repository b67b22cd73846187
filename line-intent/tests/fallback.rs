//! Resolver fallback and embedding-path tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use line_core::config::{IntentConfig, IntentProvider};
use line_core::{Action, Direction, ItemId};
use line_intent::error::Result;
use line_intent::{
    AnyResolver, EmbeddingResolver, EmbeddingSource, FixedCommandResolver, IntentResolver,
    Resolution,
};

fn valid() -> Vec<Action> {
    vec![
        Action::Move(Direction::North),
        Action::Take(ItemId::from("water_bottle")),
        Action::Rest,
        Action::Look,
        Action::Status,
        Action::Help,
        Action::Quit,
    ]
}

const INPUTS: &[&str] = &[
    "n",
    "go north",
    "take water",
    "rest",
    "look",
    "inventory",
    "quit",
    "cross ladder",
    "2",
    "drink something please",
    "",
];

/// Keyword embedder: one dimension per theme.
#[derive(Default)]
struct KeywordSource {
    calls: AtomicUsize,
}

impl EmbeddingSource for KeywordSource {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let has = |words: &[&str]| {
            if words.iter().any(|w| text.contains(w)) {
                1.0
            } else {
                0.0
            }
        };
        Ok(vec![
            has(&["sleep", "nap", "rest"]),
            has(&["look", "surroundings", "glance"]),
            has(&["north"]),
        ])
    }
}

/// Keyword embedder behind a fixed per-call delay.
struct SlowSource {
    inner: KeywordSource,
    delay: Duration,
}

impl SlowSource {
    fn new(delay: Duration) -> Self {
        Self {
            inner: KeywordSource::default(),
            delay,
        }
    }
}

impl EmbeddingSource for SlowSource {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        tokio::time::sleep(self.delay).await;
        self.inner.embed(text).await
    }
}

fn budget_config(timeout_ms: u64) -> IntentConfig {
    IntentConfig {
        timeout_ms,
        ..IntentConfig::default()
    }
}

fn unreachable_config() -> IntentConfig {
    IntentConfig {
        provider: IntentProvider::Ollama,
        // Discard port: nothing listens, connections are refused quickly.
        base_url: "http://127.0.0.1:9".into(),
        timeout_ms: 300,
        ..IntentConfig::default()
    }
}

#[tokio::test]
async fn unreachable_endpoint_matches_fixed_only() {
    let fixed = FixedCommandResolver;
    let embedding = AnyResolver::from_config(&unreachable_config()).expect("resolver");
    let valid = valid();
    for input in INPUTS {
        assert_eq!(
            embedding.resolve(input, &valid).await,
            fixed.resolve(input, &valid).await,
            "input {input:?}"
        );
    }
}

#[tokio::test]
async fn embedding_path_picks_nearest_action() {
    let resolver = EmbeddingResolver::new(KeywordSource::default(), &IntentConfig::default());
    let valid = valid();
    assert_eq!(
        resolver.resolve("i need to sleep for a bit", &valid).await,
        Resolution::Matched(Action::Rest)
    );
    assert_eq!(
        resolver.resolve("glance at my surroundings", &valid).await,
        Resolution::Matched(Action::Look)
    );
    assert_eq!(resolver.resolve("sing a song", &valid).await, Resolution::NoMatch);
}

#[tokio::test]
async fn fixed_commands_skip_the_embedder() {
    let resolver = EmbeddingResolver::new(KeywordSource::default(), &IntentConfig::default());
    let valid = valid();
    assert_eq!(
        resolver.resolve("go north", &valid).await,
        Resolution::Matched(Action::Move(Direction::North))
    );
    assert_eq!(resolver.source_calls(), 0);
}

#[tokio::test]
async fn embeddings_are_cached() {
    let resolver = EmbeddingResolver::new(KeywordSource::default(), &IntentConfig::default());
    let valid = valid();
    resolver.resolve("time for a nap", &valid).await;
    let after_first = resolver.source_calls();
    assert_eq!(after_first, valid.len() + 1);
    resolver.resolve("time for a nap", &valid).await;
    assert_eq!(resolver.source_calls(), after_first);
}

#[tokio::test(start_paused = true)]
async fn slow_service_matches_on_first_input() {
    // Eight sequential calls would need 320ms; concurrently they need 40.
    let resolver = EmbeddingResolver::new(SlowSource::new(Duration::from_millis(40)), &budget_config(200));
    let valid = valid();
    assert_eq!(
        resolver.resolve("i need to sleep for a bit", &valid).await,
        Resolution::Matched(Action::Rest)
    );
}

#[tokio::test(start_paused = true)]
async fn hung_service_falls_back_within_budget() {
    let resolver = EmbeddingResolver::new(SlowSource::new(Duration::from_secs(60)), &budget_config(300));
    let fixed = FixedCommandResolver;
    let valid = valid();

    let start = tokio::time::Instant::now();
    let got = resolver.resolve("drink something please", &valid).await;
    let elapsed = start.elapsed();
    assert_eq!(got, fixed.resolve("drink something please", &valid).await);
    assert!(elapsed >= Duration::from_millis(300), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(400), "{elapsed:?}");

    // Fixed commands never wait on the service.
    let start = tokio::time::Instant::now();
    assert_eq!(
        resolver.resolve("rest", &valid).await,
        Resolution::Matched(Action::Rest)
    );
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test]
async fn prepare_embeds_action_phrases_ahead() {
    let resolver = EmbeddingResolver::new(KeywordSource::default(), &IntentConfig::default());
    let valid = valid();
    resolver.prepare(&valid).await;
    assert_eq!(resolver.source_calls(), valid.len());
    resolver.prepare(&valid).await;
    assert_eq!(resolver.source_calls(), valid.len());

    // Only the input itself is left to embed.
    assert_eq!(
        resolver.resolve("time for a nap", &valid).await,
        Resolution::Matched(Action::Rest)
    );
    assert_eq!(resolver.source_calls(), valid.len() + 1);
}

#[tokio::test(start_paused = true)]
async fn warm_up_gives_up_on_a_hung_service() {
    let config = IntentConfig {
        warmup_timeout_ms: 500,
        ..IntentConfig::default()
    };
    let resolver = EmbeddingResolver::new(SlowSource::new(Duration::from_secs(60)), &config);
    let start = tokio::time::Instant::now();
    resolver.prepare(&valid()).await;
    assert!(start.elapsed() < Duration::from_secs(1));
}

/// Access to the stub's call counter through the resolver.
trait SourceCalls {
    fn source_calls(&self) -> usize;
}

impl SourceCalls for EmbeddingResolver<KeywordSource> {
    fn source_calls(&self) -> usize {
        self.source().calls.load(Ordering::SeqCst)
    }
}
