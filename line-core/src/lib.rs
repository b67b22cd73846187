//! # The Line: Core Library
//!
//! Narrative state engine for *The Line: A Border Journey*, a text game told
//! from two perspectives: a migrant crossing the Sonoran desert and a Border
//! Patrol agent working the same stretch of line.
//!
//! The engine knows nothing about presentation. It consumes a resolved
//! [`Action`] and produces a [`TurnOutcome`] made of resource deltas and
//! narrative text keys; rendering prose and understanding free text live in
//! other crates.
//!
//! - **Resources**: bounded attributes with per-turn decay ([`resource`])
//! - **World**: location graph with jurisdiction-gated transitions ([`world`])
//! - **Catalog**: narrative event templates with eligibility predicates ([`catalog`])
//! - **Selector**: reproducible, weighted event selection ([`selector`])
//! - **Engine**: the per-turn state machine ([`engine`])
//! - **Journey**: distance, choices and key moments, summarised at the end ([`journey`])
//!
//! ## Determinism Contract
//!
//! Every random draw comes from an RNG derived from the session seed and the
//! turn number, so a session replayed with the same actions (or restored from
//! a snapshot) produces identical outcomes.

#![deny(clippy::unwrap_used)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod action;
pub mod catalog;
pub mod character;
pub mod config;
pub mod engine;
pub mod error;
pub mod journey;
pub mod persistence;
pub mod resource;
pub mod selector;
pub mod session;
pub mod types;
pub mod world;

pub use action::{Action, Direction};
pub use catalog::EventCatalog;
pub use character::Character;
pub use config::GameConfig;
pub use engine::{Engine, NarrativeLine, Rejection, TurnOutcome};
pub use error::LineError;
pub use journey::JourneyStats;
pub use session::{GameState, Session, SessionSnapshot};
pub use types::*;
pub use world::World;
