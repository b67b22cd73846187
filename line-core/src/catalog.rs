//! The event catalog.
//!
//! Narrative beats are data: each [`Event`] carries an eligibility
//! [`Predicate`], a weight and priority for the selector, an immediate
//! [`Effect`], and optionally a set of [`Choice`]s the player must pick from
//! on the following turn.
//!
//! Text is never stored here. An event's prose lives under the key
//! `event.<id>`, its options under `event.<id>.choice.<n>` and their outcomes
//! under `event.<id>.outcome.<n>` (1-based) in the presentation layer.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::character::Character;
use crate::error::{LineError, Result};
use crate::resource::{Deltas, ResourceDelta};
use crate::types::{Attribute, EventId, ItemId, Jurisdiction, LocationId, Perspective};
use crate::world::{Location, TerrainKind, World};

const BUILTIN_EVENTS: &str = include_str!("../data/events.toml");

/// Most options a single choice may offer.
pub const MAX_CHOICES: usize = 9;

// ---------------------------------------------------------------------------
// Predicate
// ---------------------------------------------------------------------------

/// An inclusive bound on one attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Threshold {
    /// Attribute tested.
    pub attribute: Attribute,
    /// Lowest value that passes.
    #[serde(default)]
    pub min: Option<i32>,
    /// Highest value that passes.
    #[serde(default)]
    pub max: Option<i32>,
}

impl Threshold {
    /// Whether `value` lies within the bounds.
    #[must_use]
    pub fn holds(&self, value: i32) -> bool {
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }
}

/// When an event may fire. Empty lists place no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Predicate {
    /// Specific locations.
    pub locations: Vec<LocationId>,
    /// Terrain kinds.
    pub terrains: Vec<TerrainKind>,
    /// Jurisdictions.
    pub jurisdictions: Vec<Jurisdiction>,
    /// Perspectives.
    pub perspectives: Vec<Perspective>,
    /// Attribute bounds, all of which must hold.
    pub thresholds: Vec<Threshold>,
    /// Flags that must be set.
    pub requires_flags: Vec<String>,
    /// Flags that must not be set.
    pub excludes_flags: Vec<String>,
    /// Items that must be carried.
    pub requires_items: Vec<ItemId>,
}

impl Predicate {
    /// Evaluate against a character standing at `location`.
    #[must_use]
    pub fn matches(&self, character: &Character, location: &Location) -> bool {
        (self.locations.is_empty() || self.locations.contains(&location.id))
            && (self.terrains.is_empty() || self.terrains.contains(&location.terrain.kind()))
            && (self.jurisdictions.is_empty() || self.jurisdictions.contains(&location.jurisdiction))
            && (self.perspectives.is_empty() || self.perspectives.contains(&character.perspective))
            && self
                .thresholds
                .iter()
                .all(|t| t.holds(character.get(t.attribute)))
            && self.requires_flags.iter().all(|f| character.has_flag(f))
            && !self.excludes_flags.iter().any(|f| character.has_flag(f))
            && self.requires_items.iter().all(|i| character.has_item(i))
    }
}

// ---------------------------------------------------------------------------
// Effect
// ---------------------------------------------------------------------------

/// State changes caused by an event or a choice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Effect {
    /// Attribute changes.
    pub deltas: Deltas,
    /// Flags to set.
    pub set_flags: Vec<String>,
    /// Flags to clear.
    pub clear_flags: Vec<String>,
    /// Items gained.
    pub add_items: Vec<ItemId>,
    /// Items lost (one each, if carried).
    pub remove_items: Vec<ItemId>,
    /// Relocate the character. Applied by the engine, which checks it
    /// against jurisdiction rules first.
    pub move_to: Option<LocationId>,
    /// Encounters resolved.
    pub encounters: u32,
    /// People this outcome touches, for the journey record.
    pub lives: u32,
}

/// What [`Effect::apply`] changed, excluding relocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppliedEffect {
    /// Attribute changes.
    pub deltas: Vec<ResourceDelta>,
    /// Items actually gained.
    pub gained: Vec<ItemId>,
    /// Items actually lost.
    pub lost: Vec<ItemId>,
}

impl Effect {
    /// Apply everything except `move_to` to `character`.
    pub fn apply(&self, character: &mut Character) -> AppliedEffect {
        let deltas = character.resources.apply_deltas(&self.deltas);
        for f in &self.set_flags {
            character.set_flag(f.clone());
        }
        for f in &self.clear_flags {
            character.clear_flag(f);
        }
        let lost = self
            .remove_items
            .iter()
            .filter(|i| character.remove_item(i))
            .cloned()
            .collect();
        for item in &self.add_items {
            character.add_item(item.clone());
        }
        character.encounters = character.encounters.saturating_add(self.encounters);
        AppliedEffect {
            deltas,
            gained: self.add_items.clone(),
            lost,
        }
    }
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// How the selector treats an eligible event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Competes in the weighted draw.
    #[default]
    Ambient,
    /// Fires whenever eligible, ahead of any draw.
    Forced,
}

/// One option of a choice event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Choice {
    /// What picking this option does.
    pub effect: Effect,
}

fn default_weight() -> u32 {
    1
}

/// A narrative event template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Event {
    /// Unique id, also the text key suffix.
    pub id: EventId,
    /// Relative draw weight (and tie-break among forced events).
    #[serde(default = "default_weight")]
    pub weight: u32,
    /// Ambient or forced.
    #[serde(default)]
    pub priority: Priority,
    /// Fires at most once per session.
    #[serde(default)]
    pub once: bool,
    /// Eligibility.
    #[serde(default)]
    pub when: Predicate,
    /// Immediate effect.
    #[serde(default)]
    pub effect: Effect,
    /// Options offered on the next turn.
    #[serde(default)]
    pub choices: Vec<Choice>,
}

impl Event {
    /// Text key of the event itself.
    #[must_use]
    pub fn text_key(&self) -> String {
        format!("event.{}", self.id)
    }

    /// Text key of option `n` (1-based).
    #[must_use]
    pub fn choice_key(&self, n: usize) -> String {
        format!("event.{}.choice.{n}", self.id)
    }

    /// Text key of the outcome of option `n` (1-based).
    #[must_use]
    pub fn outcome_key(&self, n: usize) -> String {
        format!("event.{}.outcome.{n}", self.id)
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    events: Vec<Event>,
}

/// The immutable set of events, in file order.
#[derive(Debug, Clone, Default)]
pub struct EventCatalog {
    events: Vec<Event>,
    by_id: BTreeMap<EventId, usize>,
}

impl EventCatalog {
    /// Parse a catalog and validate it against `world`.
    ///
    /// # Errors
    /// [`LineError::Catalog`] on malformed TOML, duplicate ids or references
    /// to locations and items the world does not define.
    pub fn from_toml(toml_str: &str, world: &World) -> Result<Self> {
        let file: CatalogFile =
            toml::from_str(toml_str).map_err(|e| LineError::Catalog(format!("events: {e}")))?;

        let mut by_id = BTreeMap::new();
        for (idx, event) in file.events.iter().enumerate() {
            if by_id.insert(event.id.clone(), idx).is_some() {
                return Err(LineError::Catalog(format!("duplicate event id '{}'", event.id)));
            }
            validate_event(event, world)?;
        }

        let forced = file
            .events
            .iter()
            .filter(|e| e.priority == Priority::Forced)
            .count();
        info!(events = file.events.len(), forced, "Event catalog loaded");

        Ok(Self {
            events: file.events,
            by_id,
        })
    }

    /// Load and validate a catalog file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is invalid.
    pub fn from_file(path: &std::path::Path, world: &World) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content, world)
    }

    /// The catalog shipped with the game.
    ///
    /// # Errors
    /// Only if the embedded data file is broken or disagrees with `world`.
    pub fn builtin(world: &World) -> Result<Self> {
        Self::from_toml(BUILTIN_EVENTS, world)
    }

    /// Events in catalog order.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Event by id.
    #[must_use]
    pub fn get(&self, id: &EventId) -> Option<&Event> {
        self.by_id.get(id).map(|&idx| &self.events[idx])
    }

    /// Number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

fn validate_event(event: &Event, world: &World) -> Result<()> {
    let bad = |msg: String| Err(LineError::Catalog(format!("event '{}': {msg}", event.id)));

    if event.weight == 0 {
        return bad("weight must be positive".into());
    }
    if event.choices.len() > MAX_CHOICES {
        return bad(format!("more than {MAX_CHOICES} choices"));
    }
    if let Some(t) = event
        .when
        .thresholds
        .iter()
        .find(|t| matches!((t.min, t.max), (Some(lo), Some(hi)) if lo > hi))
    {
        return bad(format!("empty threshold on {}", t.attribute));
    }

    let locations: BTreeSet<&LocationId> = event
        .when
        .locations
        .iter()
        .chain(event.effect.move_to.iter())
        .chain(event.choices.iter().filter_map(|c| c.effect.move_to.as_ref()))
        .collect();
    if let Some(loc) = locations.into_iter().find(|l| world.location(l).is_none()) {
        return bad(format!("unknown location '{loc}'"));
    }

    let effects = std::iter::once(&event.effect).chain(event.choices.iter().map(|c| &c.effect));
    let mut items = event.when.requires_items.iter().collect::<Vec<_>>();
    for e in effects {
        items.extend(e.add_items.iter().chain(e.remove_items.iter()));
    }
    if let Some(item) = items.into_iter().find(|i| !world.has_item(i)) {
        return bad(format!("unknown item '{item}'"));
    }
    Ok(())
}
