//! The Line: terminal launcher.
//!
//! Builds the engine, the configured intent resolver and the save store,
//! then runs the stdin loop until the journey ends.

mod cli;
mod game;
mod render;

use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use clap::Parser;
use line_core::persistence::SaveStore;
use line_core::{Engine, GameConfig};
use line_intent::AnyResolver;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::CliArgs;
use crate::game::{Game, prompt_perspective};
use crate::render::TextBank;

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs() ^ u64::from(d.subsec_nanos()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    let config = match &args.config {
        Some(path) => {
            GameConfig::from_file(path).with_context(|| format!("loading config from {}", path.display()))?
        }
        None => GameConfig::default(),
    };

    let default_level = if args.debug {
        "debug".to_string()
    } else {
        config.general.log_level.clone()
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let text = TextBank::builtin()?;
    let engine = Engine::load(config.clone()).context("loading world and event data")?;
    let resolver = AnyResolver::from_config(&config.intent).context("building intent resolver")?;
    let store = match SaveStore::open(&config.persistence.path, &config.persistence) {
        Ok(store) => Some(store),
        Err(e) => {
            warn!(path = %config.persistence.path, error = %e, "Save database unavailable");
            None
        }
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut out = tokio::io::stdout();

    let session = match (&args.load, &store) {
        (Some(slot), Some(store)) => {
            let snapshot = store
                .load_snapshot(slot)?
                .with_context(|| format!("no saved journey in slot '{slot}'"))?;
            engine.restore(snapshot)?
        }
        (Some(_), None) => anyhow::bail!("--load needs the save database at {}", config.persistence.path),
        (None, _) => {
            let perspective = match args.perspective {
                Some(p) => p,
                None => match prompt_perspective(&mut lines, &mut out, &text).await? {
                    Some(p) => p,
                    None => return Ok(()),
                },
            };
            engine.new_session(perspective, args.seed.unwrap_or_else(clock_seed))
        }
    };
    info!(session = %session.id, seed = session.seed, "Starting journey");

    let skip_intro = args.skip_intro || config.general.skip_intro || args.load.is_some();
    let mut game = Game::new(engine, resolver, text, store, session);
    game.run(&mut lines, &mut out, skip_intro).await?;
    info!(turn = game.session().turn, state = ?game.session().state, "Journey over");
    Ok(())
}
