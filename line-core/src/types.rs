//! Core type definitions shared by every engine module.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create an id from anything string-like.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the raw id.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(
    /// Identifier of a location in the world graph (e.g. `"nogales_mx"`).
    LocationId
);
string_id!(
    /// Identifier of a narrative event template (e.g. `"water_cache"`).
    EventId
);
string_id!(
    /// Identifier of an item kind (e.g. `"water_bottle"`).
    ItemId
);

// ---------------------------------------------------------------------------
// Perspective & Jurisdiction
// ---------------------------------------------------------------------------

/// The role the player chose at the start of the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Perspective {
    /// Someone trying to reach Tucson from Nogales, Sonora.
    Migrant,
    /// A Border Patrol agent working the Nogales sector.
    Patrol,
}

impl Perspective {
    /// Both perspectives, in display order.
    pub const ALL: [Perspective; 2] = [Perspective::Migrant, Perspective::Patrol];

    /// Stable lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Migrant => "migrant",
            Self::Patrol => "patrol",
        }
    }

    /// Whether a character of this perspective may ever occupy a location
    /// with the given jurisdiction.
    ///
    /// Agents have no authority south of the line. Migrants may be anywhere,
    /// but entering US soil is further gated by a successful crossing (see
    /// [`crate::world::World::check_transition`]).
    #[must_use]
    pub fn may_occupy(self, jurisdiction: Jurisdiction) -> bool {
        match self {
            Self::Migrant => true,
            Self::Patrol => jurisdiction != Jurisdiction::Mexico,
        }
    }

    /// Whether enforcement actions (apprehension) are legal in a location.
    #[must_use]
    pub fn may_enforce(self, jurisdiction: Jurisdiction) -> bool {
        matches!(self, Self::Patrol)
            && matches!(jurisdiction, Jurisdiction::Us | Jurisdiction::Neutral)
    }
}

impl fmt::Display for Perspective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Perspective {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "migrant" | "m" | "1" => Ok(Self::Migrant),
            "patrol" | "agent" | "border_patrol" | "p" | "2" => Ok(Self::Patrol),
            other => Err(format!("unknown perspective '{other}'")),
        }
    }
}

/// Legal-territory tag of a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Jurisdiction {
    /// Mexican territory.
    Mexico,
    /// United States territory.
    Us,
    /// The wall itself and the strip around it.
    Neutral,
}

impl Jurisdiction {
    /// Stable lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mexico => "mexico",
            Self::Us => "us",
            Self::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Jurisdiction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Attributes
// ---------------------------------------------------------------------------

/// A bounded numeric attribute of a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    /// Hydration, 0–100.
    Water,
    /// Nourishment, 0–100.
    Food,
    /// Physical condition, 0–100.
    Health,
    /// Morale, 0–100.
    Hope,
    /// Accumulated psychological harm, 0–100.
    Trauma,
    /// Job strain (mostly relevant to agents), 0–100.
    Stress,
    /// Cash on hand in dollars.
    Money,
    /// An agent's moral compass: 0 is callous, 100 is principled.
    Conscience,
    /// An agent's standing within the department, 0–100.
    Standing,
}

impl Attribute {
    /// Every attribute, in display order.
    pub const ALL: [Attribute; 9] = [
        Attribute::Water,
        Attribute::Food,
        Attribute::Health,
        Attribute::Hope,
        Attribute::Trauma,
        Attribute::Stress,
        Attribute::Money,
        Attribute::Conscience,
        Attribute::Standing,
    ];

    /// Stable lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Water => "water",
            Self::Food => "food",
            Self::Health => "health",
            Self::Hope => "hope",
            Self::Trauma => "trauma",
            Self::Stress => "stress",
            Self::Money => "money",
            Self::Conscience => "conscience",
            Self::Standing => "standing",
        }
    }

    /// Vital attributes trigger a critical side effect when they reach zero.
    #[must_use]
    pub fn is_vital(self) -> bool {
        matches!(self, Self::Water | Self::Food | Self::Health)
    }

    /// Upper bound of the attribute.
    #[must_use]
    pub fn max(self) -> i32 {
        match self {
            Self::Money => 10_000,
            _ => 100,
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Attribute {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| format!("unknown attribute '{s}'"))
    }
}

// ---------------------------------------------------------------------------
// Narrative flags
// ---------------------------------------------------------------------------

/// Well-known narrative flags the engine itself reads or writes.
///
/// Catalog data may use any other flag name freely.
pub mod flags {
    /// Set when a migrant completes a border crossing.
    pub const HAS_CROSSED: &str = "has_crossed";
    /// Set when a migrant is taken into custody.
    pub const WAS_DETAINED: &str = "was_detained";
    /// Set on an agent when a group has been sighted and can be apprehended.
    pub const MIGRANTS_SPOTTED: &str = "migrants_spotted";
    /// Maintained by the engine while water is below the low threshold.
    pub const WATER_CRITICAL: &str = "water_critical";
    /// Maintained by the engine while food is at zero.
    pub const STARVING: &str = "starving";
}
