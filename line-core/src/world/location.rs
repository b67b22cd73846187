//! Static world data: locations, NPCs, items, services and crossing methods.
//!
//! Everything here is immutable after load and shared between sessions.

use serde::{Deserialize, Serialize};

use crate::action::Direction;
use crate::resource::Deltas;
use crate::types::{ItemId, Jurisdiction, LocationId, Perspective};

/// Terrain of a location, carrying the parameters that matter for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Terrain {
    /// A town with purchasable services.
    Settlement {
        /// Service ids offered here.
        #[serde(default)]
        services: Vec<String>,
    },
    /// Open desert; scarcity 0–10 drives extra water drain.
    Desert {
        /// How hard water is to find.
        water_scarcity: i32,
    },
    /// The line itself; intensity 0–10 drives capture odds.
    Border {
        /// How heavily the stretch is watched.
        patrol_intensity: i32,
    },
    /// A processing facility.
    Facility,
}

/// Payload-free terrain discriminant, used by event predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerrainKind {
    /// See [`Terrain::Settlement`].
    Settlement,
    /// See [`Terrain::Desert`].
    Desert,
    /// See [`Terrain::Border`].
    Border,
    /// See [`Terrain::Facility`].
    Facility,
}

impl Terrain {
    /// Discriminant of this terrain.
    #[must_use]
    pub fn kind(&self) -> TerrainKind {
        match self {
            Self::Settlement { .. } => TerrainKind::Settlement,
            Self::Desert { .. } => TerrainKind::Desert,
            Self::Border { .. } => TerrainKind::Border,
            Self::Facility => TerrainKind::Facility,
        }
    }

    /// Services offered (empty outside settlements).
    #[must_use]
    pub fn services(&self) -> &[String] {
        match self {
            Self::Settlement { services } => services,
            _ => &[],
        }
    }

    /// Water scarcity if this is desert.
    #[must_use]
    pub fn water_scarcity(&self) -> Option<i32> {
        match self {
            Self::Desert { water_scarcity } => Some(*water_scarcity),
            _ => None,
        }
    }

    /// Patrol intensity if this is a border stretch.
    #[must_use]
    pub fn patrol_intensity(&self) -> Option<i32> {
        match self {
            Self::Border { patrol_intensity } => Some(*patrol_intensity),
            _ => None,
        }
    }
}

/// A person the player can talk to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Npc {
    /// Id used by `talk <id>`.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Number of dialogue lines (`npc.<id>.<n>`, 1-based).
    #[serde(default = "default_lines")]
    pub lines: u32,
    /// Who will talk to you. Empty means anyone.
    #[serde(default)]
    pub perspectives: Vec<Perspective>,
    /// Effect of a conversation.
    #[serde(default)]
    pub deltas: Deltas,
}

fn default_lines() -> u32 {
    1
}

/// An outgoing edge of the location graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// Direction the player types.
    pub direction: Direction,
    /// Destination location.
    pub target: LocationId,
    /// Who may use this edge. Empty means anyone.
    #[serde(default)]
    pub perspectives: Vec<Perspective>,
    /// Items that must be carried.
    #[serde(default)]
    pub requires_items: Vec<ItemId>,
    /// Flags that must be set.
    #[serde(default)]
    pub requires_flags: Vec<String>,
    /// Whether this edge is a border crossing needing a crossing method.
    #[serde(default)]
    pub crossing: bool,
}

impl Transition {
    /// Whether `perspective` may use this edge at all.
    #[must_use]
    pub fn permits(&self, perspective: Perspective) -> bool {
        self.perspectives.is_empty() || self.perspectives.contains(&perspective)
    }
}

/// A location in the world graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Unique id.
    pub id: LocationId,
    /// Display name.
    pub name: String,
    /// Legal territory.
    pub jurisdiction: Jurisdiction,
    /// 1–10, shown to the player and used by some event predicates.
    #[serde(default)]
    pub danger_level: u8,
    /// Terrain and its parameters.
    pub terrain: Terrain,
    /// Items lying here at the start of a game.
    #[serde(default)]
    pub items: Vec<ItemId>,
    /// People present.
    #[serde(default)]
    pub npcs: Vec<Npc>,
    /// Outgoing edges.
    #[serde(default)]
    pub transitions: Vec<Transition>,
}

impl Location {
    /// Whether a service is offered here.
    #[must_use]
    pub fn offers(&self, service: &str) -> bool {
        self.terrain.services().iter().any(|s| s == service)
    }

    /// Find an NPC by id.
    #[must_use]
    pub fn npc(&self, id: &str) -> Option<&Npc> {
        self.npcs.iter().find(|n| n.id == id)
    }

    /// Outgoing edge in `direction`.
    #[must_use]
    pub fn transition(&self, direction: Direction) -> Option<&Transition> {
        self.transitions.iter().find(|t| t.direction == direction)
    }

    /// The crossing edge out of this location, if any.
    #[must_use]
    pub fn crossing(&self) -> Option<&Transition> {
        self.transitions.iter().find(|t| t.crossing)
    }
}

/// A way of getting over, under or through the line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossingMethod {
    /// Id used by `cross <id>`.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Chance of success, percent.
    pub success_pct: u32,
    /// Health lost on success; failure costs more.
    pub health_risk: i32,
    /// Money paid up front, win or lose.
    #[serde(default)]
    pub cost: i32,
    /// Item that must be carried.
    #[serde(default)]
    pub requires_item: Option<ItemId>,
}

/// Definition of an item kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDef {
    /// Unique id.
    pub id: ItemId,
    /// Display name.
    pub name: String,
    /// Attribute changes when used.
    #[serde(default)]
    pub deltas: Deltas,
    /// Flags set when used.
    #[serde(default)]
    pub set_flags: Vec<String>,
    /// Whether using the item removes it.
    #[serde(default)]
    pub consumed: bool,
}

/// A paid service offered in settlements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDef {
    /// `food`, `shelter`, `medical`, ...
    pub id: String,
    /// Price in dollars.
    #[serde(default)]
    pub cost: i32,
    /// Attribute changes once paid.
    #[serde(default)]
    pub deltas: Deltas,
}

/// Where a perspective starts and what it carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartDef {
    /// Starting location.
    pub location: LocationId,
    /// Starting inventory.
    #[serde(default)]
    pub items: Vec<ItemId>,
}

/// Per-perspective starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Starts {
    /// Migrant start.
    pub migrant: StartDef,
    /// Patrol start.
    pub patrol: StartDef,
}

impl Starts {
    /// Start for the given perspective.
    #[must_use]
    pub fn for_perspective(&self, perspective: Perspective) -> &StartDef {
        match perspective {
            Perspective::Migrant => &self.migrant,
            Perspective::Patrol => &self.patrol,
        }
    }
}
