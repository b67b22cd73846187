//! Explicit game sessions and their snapshots.
//!
//! A [`Session`] owns everything that changes during a game. The world and
//! catalog are shared read-only through the [`Engine`](crate::Engine), so any
//! number of sessions can run side by side.
//!
//! Randomness is not stored. Each turn draws from
//! `StdRng::seed_from_u64(mix(seed, turn))`, so a restored snapshot replays
//! exactly what the original session would have.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::character::Character;
use crate::error::{LineError, Result};
use crate::journey::JourneyStats;
use crate::types::{EventId, ItemId, LocationId};
use crate::world::World;

/// Snapshot schema version written by this build.
pub const SNAPSHOT_VERSION: u32 = 2;

// ---------------------------------------------------------------------------
// Game state
// ---------------------------------------------------------------------------

/// How a journey ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ending {
    /// The migrant reached the destination.
    ReachedDestination,
    /// The agent resolved enough encounters.
    ServiceComplete,
    /// Health or water ran out.
    Death,
    /// The migrant was taken into custody.
    Detained,
    /// The agent's stress hit the ceiling.
    Burnout,
    /// The turn limit passed.
    Timeout,
}

impl Ending {
    /// Narrative text key.
    #[must_use]
    pub fn text_key(self) -> &'static str {
        match self {
            Self::ReachedDestination => "ending.reached_destination",
            Self::ServiceComplete => "ending.service_complete",
            Self::Death => "ending.death",
            Self::Detained => "ending.detained",
            Self::Burnout => "ending.burnout",
            Self::Timeout => "ending.timeout",
        }
    }
}

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GameState {
    /// Accepting turns.
    #[default]
    Active,
    /// Won.
    TerminalSuccess {
        /// How.
        ending: Ending,
    },
    /// Lost.
    TerminalFailure {
        /// How.
        ending: Ending,
    },
    /// The player quit.
    TerminalAbandoned,
}

impl GameState {
    /// Whether the session accepts no more turns.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }

    /// The ending, for success and failure states.
    #[must_use]
    pub fn ending(self) -> Option<Ending> {
        match self {
            Self::TerminalSuccess { ending } | Self::TerminalFailure { ending } => Some(ending),
            Self::Active | Self::TerminalAbandoned => None,
        }
    }
}

/// A choice the player owes the engine before play continues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingChoice {
    /// Event that raised the choice.
    pub event: EventId,
    /// Number of options (`choose 1..=options`).
    pub options: usize,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One playthrough.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Unique id.
    pub id: Uuid,
    /// Root of every random draw.
    pub seed: u64,
    /// Turns taken (free actions excluded).
    pub turn: u32,
    /// Lifecycle state.
    pub state: GameState,
    /// The player character.
    pub character: Character,
    /// Items already taken from each location.
    pub looted: BTreeSet<(LocationId, ItemId)>,
    /// One-shot events already fired.
    pub fired: BTreeSet<EventId>,
    /// Outstanding choice, if any.
    pub pending: Option<PendingChoice>,
    /// Running record for the closing summary.
    pub journey: JourneyStats,
}

/// SplitMix64 finaliser over the seed and turn.
fn mix(seed: u64, turn: u32) -> u64 {
    let mut z = seed ^ u64::from(turn).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

impl Session {
    /// New active session for `character`.
    #[must_use]
    pub fn new(character: Character, seed: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            seed,
            turn: 0,
            state: GameState::Active,
            character,
            looted: BTreeSet::new(),
            fired: BTreeSet::new(),
            pending: None,
            journey: JourneyStats::default(),
        }
    }

    /// RNG for the current turn.
    #[must_use]
    pub fn turn_rng(&self) -> StdRng {
        StdRng::seed_from_u64(mix(self.seed, self.turn))
    }

    /// Items still lying at the character's location.
    #[must_use]
    pub fn items_here<'w>(&self, world: &'w World) -> Vec<&'w ItemId> {
        let here = &self.character.location;
        world.location(here).map_or_else(Vec::new, |loc| {
            loc.items
                .iter()
                .filter(|i| !self.looted.contains(&(here.clone(), (*i).clone())))
                .collect()
        })
    }

    /// Capture the session for saving.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            version: SNAPSHOT_VERSION,
            id: self.id,
            seed: self.seed,
            turn: self.turn,
            state: self.state,
            character: self.character.clone(),
            looted: self.looted.clone(),
            fired: self.fired.clone(),
            pending: self.pending.clone(),
            journey: self.journey.clone(),
            saved_at: Utc::now(),
        }
    }

    /// Rebuild a session from a snapshot, checking it against `world`.
    ///
    /// # Errors
    /// [`LineError::SnapshotVersion`] for snapshots from another schema, or
    /// [`LineError::UnknownLocation`] if the character stands somewhere the
    /// world does not define.
    pub fn restore(snapshot: SessionSnapshot, world: &World) -> Result<Self> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(LineError::SnapshotVersion {
                found: snapshot.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        world.require_location(&snapshot.character.location)?;
        Ok(Self {
            id: snapshot.id,
            seed: snapshot.seed,
            turn: snapshot.turn,
            state: snapshot.state,
            character: snapshot.character,
            looted: snapshot.looted,
            fired: snapshot.fired,
            pending: snapshot.pending,
            journey: snapshot.journey,
        })
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Serialisable copy of a [`Session`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Schema version.
    pub version: u32,
    /// Session id.
    pub id: Uuid,
    /// RNG seed.
    pub seed: u64,
    /// Turns taken.
    pub turn: u32,
    /// Lifecycle state.
    pub state: GameState,
    /// The player character.
    pub character: Character,
    /// Looted overlay.
    pub looted: BTreeSet<(LocationId, ItemId)>,
    /// Fired one-shot events.
    pub fired: BTreeSet<EventId>,
    /// Outstanding choice.
    pub pending: Option<PendingChoice>,
    /// Journey record.
    #[serde(default)]
    pub journey: JourneyStats,
    /// When the snapshot was taken.
    pub saved_at: DateTime<Utc>,
}

impl SessionSnapshot {
    /// Encode as JSON.
    ///
    /// # Errors
    /// [`LineError::Serialization`] if encoding fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| LineError::Serialization(e.to_string()))
    }

    /// Decode from JSON.
    ///
    /// # Errors
    /// [`LineError::Serialization`] on malformed input.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| LineError::Serialization(e.to_string()))
    }
}
