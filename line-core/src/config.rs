//! Configuration for The Line.
//!
//! Maps directly to `the_line.toml`. Every field has a default, so an empty
//! file (or no file at all) yields a playable normal-difficulty game.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::resource::Deltas;
use crate::types::Perspective;

/// Top-level game configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Difficulty preset.
    #[serde(default)]
    pub difficulty: DifficultyConfig,
    /// Passive per-turn resource drain.
    #[serde(default)]
    pub decay: DecayRates,
    /// Event selection tuning.
    #[serde(default)]
    pub events: EventConfig,
    /// Border crossing tuning.
    #[serde(default)]
    pub crossing: CrossingConfig,
    /// Starting attribute values per perspective.
    #[serde(default)]
    pub starting: StartingConfig,
    /// Effects of everyday actions.
    #[serde(default)]
    pub actions: ActionConfig,
    /// Natural-language intent resolution.
    #[serde(default)]
    pub intent: IntentConfig,
    /// Save-slot persistence.
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl GameConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `LineError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        toml::from_str(toml_str).map_err(|e| crate::LineError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Multipliers of the configured difficulty preset.
    #[must_use]
    pub fn multipliers(&self) -> DifficultyMultipliers {
        self.difficulty.preset.multipliers()
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Journey length before the game ends in a timeout.
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
    /// Skip the introduction text in the launcher.
    #[serde(default)]
    pub skip_intro: bool,
    /// World TOML to load instead of the shipped map.
    #[serde(default)]
    pub world_path: Option<PathBuf>,
    /// Event catalog TOML to load instead of the shipped events.
    #[serde(default)]
    pub events_path: Option<PathBuf>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            max_turns: default_max_turns(),
            skip_intro: false,
            world_path: None,
            events_path: None,
        }
    }
}

/// Difficulty presets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    /// Gentler drain, more supplies, fewer events.
    Easy,
    /// The reference balance.
    #[default]
    Normal,
    /// Harsher drain, fewer supplies, more events and patrols.
    Hard,
}

impl Difficulty {
    /// Scaling factors for this preset.
    #[must_use]
    pub fn multipliers(self) -> DifficultyMultipliers {
        match self {
            Self::Easy => DifficultyMultipliers {
                resource_consumption: 0.7,
                starting_resources: 1.3,
                event_chance: 0.7,
                patrol_intensity: 0.7,
            },
            Self::Normal => DifficultyMultipliers::default(),
            Self::Hard => DifficultyMultipliers {
                resource_consumption: 1.3,
                starting_resources: 0.7,
                event_chance: 1.3,
                patrol_intensity: 1.3,
            },
        }
    }
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "normal" => Ok(Self::Normal),
            "hard" => Ok(Self::Hard),
            other => Err(format!("unknown difficulty '{other}'")),
        }
    }
}

/// Scaling factors applied by a difficulty preset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyMultipliers {
    /// Multiplies passive water/food drain.
    pub resource_consumption: f32,
    /// Multiplies starting water, food and money.
    pub starting_resources: f32,
    /// Multiplies the chance that *some* event fires (shrinks the quiet slot).
    pub event_chance: f32,
    /// Multiplies capture chance on failed crossings and patrol sightings.
    pub patrol_intensity: f32,
}

impl Default for DifficultyMultipliers {
    fn default() -> Self {
        Self {
            resource_consumption: 1.0,
            starting_resources: 1.0,
            event_chance: 1.0,
            patrol_intensity: 1.0,
        }
    }
}

/// The `[difficulty]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DifficultyConfig {
    /// easy, normal or hard.
    #[serde(default)]
    pub preset: Difficulty,
}

/// Passive drain table for one perspective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerspectiveDecay {
    /// Water lost every turn.
    pub water: i32,
    /// Food lost every turn.
    pub food: i32,
    /// Extra water lost in the desert is `water_scarcity / desert_water_divisor`.
    pub desert_water_divisor: i32,
    /// Extra food lost in the desert.
    pub desert_food: i32,
    /// Food drain reduction in a settlement that offers a food service.
    pub food_service_relief: i32,
    /// Health lost when water is empty.
    pub thirst_empty: i32,
    /// Health lost when water is low.
    pub thirst_low: i32,
    /// Health lost when food is empty.
    pub hunger_empty: i32,
    /// Health lost when food is low.
    pub hunger_low: i32,
    /// Health lost while hope is below [`DecayRates::despair_below`].
    pub despair: i32,
    /// Health lost while stress is above [`DecayRates::strain_above`].
    pub strain: i32,
}

impl PerspectiveDecay {
    /// Reference migrant table.
    #[must_use]
    pub fn migrant() -> Self {
        Self {
            water: 5,
            food: 5,
            desert_water_divisor: 2,
            desert_food: 2,
            food_service_relief: 3,
            thirst_empty: 20,
            thirst_low: 5,
            hunger_empty: 8,
            hunger_low: 3,
            despair: 2,
            strain: 0,
        }
    }

    /// Reference patrol table. Agents carry more and drive more.
    #[must_use]
    pub fn patrol() -> Self {
        Self {
            water: 3,
            food: 3,
            desert_water_divisor: 3,
            desert_food: 1,
            food_service_relief: 0,
            thirst_empty: 5,
            thirst_low: 2,
            hunger_empty: 4,
            hunger_low: 1,
            despair: 0,
            strain: 2,
        }
    }
}

/// The `[decay]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecayRates {
    /// Below this, water and food count as "low".
    #[serde(default = "default_low_threshold")]
    pub low_threshold: i32,
    /// Hope below this causes despair.
    #[serde(default = "default_despair_below")]
    pub despair_below: i32,
    /// Stress above this causes strain.
    #[serde(default = "default_strain_above")]
    pub strain_above: i32,
    /// Migrant table.
    #[serde(default = "PerspectiveDecay::migrant")]
    pub migrant: PerspectiveDecay,
    /// Patrol table.
    #[serde(default = "PerspectiveDecay::patrol")]
    pub patrol: PerspectiveDecay,
}

impl DecayRates {
    /// Table for the given perspective.
    #[must_use]
    pub fn for_perspective(&self, perspective: Perspective) -> &PerspectiveDecay {
        match perspective {
            Perspective::Migrant => &self.migrant,
            Perspective::Patrol => &self.patrol,
        }
    }
}

impl Default for DecayRates {
    fn default() -> Self {
        Self {
            low_threshold: default_low_threshold(),
            despair_below: default_despair_below(),
            strain_above: default_strain_above(),
            migrant: PerspectiveDecay::migrant(),
            patrol: PerspectiveDecay::patrol(),
        }
    }
}

/// The `[events]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventConfig {
    /// Weight of the "nothing happens" slot in the ambient draw before
    /// difficulty scaling.
    #[serde(default = "default_quiet_weight")]
    pub quiet_weight: u32,
    /// Chance (percent) that a patrol sweep spots a group.
    #[serde(default = "default_spot_chance")]
    pub patrol_spot_chance_pct: u32,
    /// Resolved encounters that complete an agent's service arc.
    #[serde(default = "default_arc_encounters")]
    pub patrol_arc_encounters: u32,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            quiet_weight: default_quiet_weight(),
            patrol_spot_chance_pct: default_spot_chance(),
            patrol_arc_encounters: default_arc_encounters(),
        }
    }
}

impl EventConfig {
    /// Quiet-slot weight after applying the event-chance multiplier.
    ///
    /// A higher event chance shrinks the quiet slot.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn effective_quiet_weight(&self, multipliers: &DifficultyMultipliers) -> u32 {
        if multipliers.event_chance <= 0.0 {
            return self.quiet_weight;
        }
        (f64::from(self.quiet_weight) / f64::from(multipliers.event_chance)).round() as u32
    }
}

/// The `[crossing]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossingConfig {
    /// Capture chance (percent) per point of patrol intensity on a failed
    /// crossing.
    #[serde(default = "default_capture_pct")]
    pub capture_pct_per_intensity: u32,
    /// Health risk multiplier applied on failure.
    #[serde(default = "default_failure_multiplier")]
    pub failure_risk_multiplier: f32,
    /// Hope gained on success.
    #[serde(default = "default_success_hope")]
    pub success_hope: i32,
    /// Trauma gained on success.
    #[serde(default = "default_success_trauma")]
    pub success_trauma: i32,
    /// Hope lost on failure.
    #[serde(default = "default_failure_hope")]
    pub failure_hope: i32,
    /// Trauma gained on failure.
    #[serde(default = "default_failure_trauma")]
    pub failure_trauma: i32,
}

impl Default for CrossingConfig {
    fn default() -> Self {
        Self {
            capture_pct_per_intensity: default_capture_pct(),
            failure_risk_multiplier: default_failure_multiplier(),
            success_hope: default_success_hope(),
            success_trauma: default_success_trauma(),
            failure_hope: default_failure_hope(),
            failure_trauma: default_failure_trauma(),
        }
    }
}

/// Starting attribute values for one perspective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartingValues {
    /// Starting water.
    pub water: i32,
    /// Starting food.
    pub food: i32,
    /// Starting health.
    pub health: i32,
    /// Starting hope.
    pub hope: i32,
    /// Starting trauma.
    pub trauma: i32,
    /// Starting stress.
    pub stress: i32,
    /// Starting money.
    pub money: i32,
    /// Starting conscience.
    #[serde(default = "default_midpoint")]
    pub conscience: i32,
    /// Starting department standing.
    #[serde(default = "default_midpoint")]
    pub standing: i32,
}

impl StartingValues {
    /// Reference migrant start.
    #[must_use]
    pub fn migrant() -> Self {
        Self {
            water: 100,
            food: 100,
            health: 100,
            hope: 100,
            trauma: 0,
            stress: 0,
            money: 100,
            conscience: 50,
            standing: 50,
        }
    }

    /// Reference patrol start.
    #[must_use]
    pub fn patrol() -> Self {
        Self {
            water: 100,
            food: 100,
            health: 100,
            hope: 80,
            trauma: 0,
            stress: 0,
            money: 200,
            conscience: 50,
            standing: 50,
        }
    }
}

/// The `[starting]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartingConfig {
    /// Migrant start.
    #[serde(default = "StartingValues::migrant")]
    pub migrant: StartingValues,
    /// Patrol start.
    #[serde(default = "StartingValues::patrol")]
    pub patrol: StartingValues,
}

impl StartingConfig {
    /// Values for the given perspective.
    #[must_use]
    pub fn for_perspective(&self, perspective: Perspective) -> &StartingValues {
        match perspective {
            Perspective::Migrant => &self.migrant,
            Perspective::Patrol => &self.patrol,
        }
    }
}

impl Default for StartingConfig {
    fn default() -> Self {
        Self {
            migrant: StartingValues::migrant(),
            patrol: StartingValues::patrol(),
        }
    }
}

/// The `[actions]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionConfig {
    /// What resting does for a migrant.
    #[serde(default = "default_migrant_rest")]
    pub migrant_rest: Deltas,
    /// What resting does for an agent.
    #[serde(default = "default_patrol_rest")]
    pub patrol_rest: Deltas,
    /// An apprehension adds `1..=apprehend_stress_max` stress.
    #[serde(default = "default_apprehend_stress")]
    pub apprehend_stress_max: i32,
    /// Fixed effect of an apprehension by protocol.
    #[serde(default = "default_apprehend")]
    pub apprehend: Deltas,
}

impl ActionConfig {
    /// Rest effect for the given perspective.
    #[must_use]
    pub fn rest(&self, perspective: Perspective) -> &Deltas {
        match perspective {
            Perspective::Migrant => &self.migrant_rest,
            Perspective::Patrol => &self.patrol_rest,
        }
    }
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            migrant_rest: default_migrant_rest(),
            patrol_rest: default_patrol_rest(),
            apprehend_stress_max: default_apprehend_stress(),
            apprehend: default_apprehend(),
        }
    }
}

/// Which resolver the launcher builds at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentProvider {
    /// Fixed text commands only.
    #[default]
    Fixed,
    /// Fixed commands first, then embedding similarity via Ollama.
    Ollama,
}

/// The `[intent]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentConfig {
    /// Resolver implementation.
    #[serde(default)]
    pub provider: IntentProvider,
    /// Base URL of the embedding service.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Embedding model name.
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Budget for matching one free-text input, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Budget for embedding the current action phrases while the player
    /// is typing, in milliseconds.
    #[serde(default = "default_warmup_timeout_ms")]
    pub warmup_timeout_ms: u64,
    /// Minimum cosine similarity for an embedding match.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
    /// Input embeddings kept in the LRU cache.
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
}

impl Default for IntentConfig {
    fn default() -> Self {
        Self {
            provider: IntentProvider::default(),
            base_url: default_base_url(),
            model: default_embedding_model(),
            timeout_ms: default_timeout_ms(),
            warmup_timeout_ms: default_warmup_timeout_ms(),
            similarity_threshold: default_similarity_threshold(),
            cache_size: default_cache_size(),
        }
    }
}

/// The `[persistence]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Save database path.
    #[serde(default = "default_save_path")]
    pub path: String,
    /// Store and verify a CRC-32 of every save.
    #[serde(default = "default_true")]
    pub checksum_enabled: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            path: default_save_path(),
            checksum_enabled: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions for serde
// ---------------------------------------------------------------------------

fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_max_turns() -> u32 {
    30
}
fn default_low_threshold() -> i32 {
    20
}
fn default_despair_below() -> i32 {
    30
}
fn default_strain_above() -> i32 {
    70
}
fn default_quiet_weight() -> u32 {
    20
}
fn default_spot_chance() -> u32 {
    50
}
fn default_arc_encounters() -> u32 {
    3
}
fn default_capture_pct() -> u32 {
    5
}
fn default_failure_multiplier() -> f32 {
    1.5
}
fn default_success_hope() -> i32 {
    15
}
fn default_success_trauma() -> i32 {
    5
}
fn default_failure_hope() -> i32 {
    10
}
fn default_failure_trauma() -> i32 {
    10
}
fn default_migrant_rest() -> Deltas {
    Deltas {
        health: 5,
        hope: 3,
        ..Deltas::default()
    }
}
fn default_patrol_rest() -> Deltas {
    Deltas {
        health: 5,
        stress: -10,
        ..Deltas::default()
    }
}
fn default_midpoint() -> i32 {
    50
}
fn default_apprehend() -> Deltas {
    Deltas {
        standing: 5,
        ..Deltas::default()
    }
}
fn default_apprehend_stress() -> i32 {
    10
}
fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_embedding_model() -> String {
    "mxbai-embed-large".to_string()
}
fn default_timeout_ms() -> u64 {
    1500
}
fn default_warmup_timeout_ms() -> u64 {
    10_000
}
fn default_similarity_threshold() -> f32 {
    0.7
}
fn default_cache_size() -> usize {
    256
}
fn default_save_path() -> String {
    "the_line_saves.db".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let cfg = GameConfig::from_toml("").expect("empty config parses");
        assert_eq!(cfg.general.max_turns, 30);
        assert_eq!(cfg.difficulty.preset, Difficulty::Normal);
        assert_eq!(cfg.decay, DecayRates::default());
        assert_eq!(cfg.intent.timeout_ms, 1500);
        assert_eq!(cfg.intent.warmup_timeout_ms, 10_000);
        assert!((cfg.intent.similarity_threshold - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = GameConfig::from_toml(
            r#"
            [difficulty]
            preset = "hard"

            [decay.migrant]
            water = 7
            food = 5
            desert_water_divisor = 2
            desert_food = 2
            food_service_relief = 3
            thirst_empty = 20
            thirst_low = 5
            hunger_empty = 8
            hunger_low = 3
            despair = 2
            strain = 0

            [intent]
            provider = "ollama"
            "#,
        )
        .expect("valid config");

        assert_eq!(cfg.difficulty.preset, Difficulty::Hard);
        assert_eq!(cfg.decay.migrant.water, 7);
        assert_eq!(cfg.decay.patrol, PerspectiveDecay::patrol());
        assert_eq!(cfg.intent.provider, IntentProvider::Ollama);
        assert_eq!(cfg.intent.model, "mxbai-embed-large");
    }

    #[test]
    fn data_paths_are_optional() {
        assert_eq!(GameConfig::default().general.world_path, None);
        let cfg = GameConfig::from_toml(
            r#"
            [general]
            world_path = "mods/world.toml"
            "#,
        )
        .expect("parse");
        assert_eq!(cfg.general.world_path, Some(PathBuf::from("mods/world.toml")));
        assert_eq!(cfg.general.events_path, None);
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let err = GameConfig::from_toml("[general\nmax_turns = ").unwrap_err();
        assert!(matches!(err, crate::LineError::Config(_)));
    }

    #[test]
    fn harder_presets_shrink_the_quiet_slot() {
        let events = EventConfig::default();
        let easy = events.effective_quiet_weight(&Difficulty::Easy.multipliers());
        let normal = events.effective_quiet_weight(&Difficulty::Normal.multipliers());
        let hard = events.effective_quiet_weight(&Difficulty::Hard.multipliers());
        assert!(easy > normal);
        assert!(normal > hard);
        assert_eq!(normal, 20);
    }
}
