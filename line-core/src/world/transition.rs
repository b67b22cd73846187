//! Movement rules: plain moves and border crossings.
//!
//! Jurisdiction is enforced here and nowhere else. A move that would put an
//! agent in Mexico, or a migrant on US soil without having crossed, is
//! rejected outright.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::World;
use super::location::{CrossingMethod, Transition};
use crate::action::Direction;
use crate::character::Character;
use crate::config::{CrossingConfig, DifficultyMultipliers};
use crate::resource::ResourceDelta;
use crate::types::{Attribute, ItemId, Jurisdiction, LocationId, Perspective, flags};

/// Why a move or crossing was refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    /// Nothing lies in that direction.
    NoPath {
        /// Requested direction.
        direction: Direction,
    },
    /// The edge exists but not for this perspective.
    PerspectiveForbidden,
    /// A required item is not carried.
    MissingItem {
        /// The item.
        item: ItemId,
    },
    /// A required flag is not set.
    MissingFlag {
        /// The flag.
        flag: String,
    },
    /// The destination's jurisdiction is off limits.
    JurisdictionForbidden {
        /// Destination jurisdiction.
        jurisdiction: Jurisdiction,
    },
    /// The edge is a crossing; a method must be chosen.
    CrossingRequired,
    /// There is no crossing edge here.
    NoCrossingHere,
    /// The named method does not exist.
    UnknownMethod {
        /// Requested method.
        method: String,
    },
    /// The method needs an item that is not carried.
    MethodUnavailable {
        /// The method.
        method: String,
        /// The missing item.
        item: ItemId,
    },
    /// Not enough money for the method.
    CannotAfford {
        /// Price.
        cost: i32,
    },
}

impl RejectReason {
    /// Narrative text key.
    #[must_use]
    pub fn text_key(&self) -> &'static str {
        match self {
            Self::NoPath { .. } => "reject.no_path",
            Self::PerspectiveForbidden => "reject.perspective_forbidden",
            Self::MissingItem { .. } => "reject.missing_item",
            Self::MissingFlag { .. } => "reject.missing_flag",
            Self::JurisdictionForbidden { .. } => "reject.jurisdiction",
            Self::CrossingRequired => "reject.crossing_required",
            Self::NoCrossingHere => "reject.no_crossing",
            Self::UnknownMethod { .. } => "reject.unknown_method",
            Self::MethodUnavailable { .. } => "reject.method_unavailable",
            Self::CannotAfford { .. } => "reject.cannot_afford",
        }
    }
}

/// Result of [`World::attempt_transition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The character moved.
    Moved {
        /// Previous location.
        from: LocationId,
        /// New location.
        to: LocationId,
        /// Crossing method used, when this was a crossing.
        crossed_with: Option<String>,
        /// Attribute changes (crossing cost and toll).
        deltas: Vec<ResourceDelta>,
    },
    /// A crossing was attempted and failed.
    CrossingFailed {
        /// Method used.
        method: String,
        /// Whether the character was caught and taken to detention.
        captured: bool,
        /// Attribute changes.
        deltas: Vec<ResourceDelta>,
    },
    /// Nothing happened.
    Rejected(RejectReason),
}

/// Crossing tuning bundled for a single attempt.
#[derive(Debug, Clone, Copy)]
pub struct CrossingRules<'a> {
    /// `[crossing]` config.
    pub config: &'a CrossingConfig,
    /// Difficulty multipliers.
    pub multipliers: &'a DifficultyMultipliers,
}

impl World {
    /// Validate a move without side effects.
    ///
    /// `method` is required for crossing edges and must be `None` for plain
    /// edges reached by [`Direction`] alone.
    ///
    /// # Errors
    /// Returns the first rule the move breaks.
    pub fn check_transition(
        &self,
        character: &Character,
        direction: Direction,
        method: Option<&str>,
    ) -> Result<&Transition, RejectReason> {
        let here = self
            .location(&character.location)
            .ok_or(RejectReason::NoPath { direction })?;
        let edge = here
            .transition(direction)
            .ok_or(RejectReason::NoPath { direction })?;
        if !edge.permits(character.perspective) {
            return Err(RejectReason::PerspectiveForbidden);
        }
        let target = self
            .location(&edge.target)
            .ok_or(RejectReason::NoPath { direction })?;

        if !character.perspective.may_occupy(target.jurisdiction) {
            return Err(RejectReason::JurisdictionForbidden {
                jurisdiction: target.jurisdiction,
            });
        }
        if character.perspective == Perspective::Migrant
            && target.jurisdiction == Jurisdiction::Us
            && !edge.crossing
            && !character.has_flag(flags::HAS_CROSSED)
        {
            return Err(RejectReason::JurisdictionForbidden {
                jurisdiction: target.jurisdiction,
            });
        }

        if let Some(item) = edge.requires_items.iter().find(|i| !character.has_item(i)) {
            return Err(RejectReason::MissingItem { item: item.clone() });
        }
        if let Some(flag) = edge.requires_flags.iter().find(|f| !character.has_flag(f)) {
            return Err(RejectReason::MissingFlag { flag: flag.clone() });
        }

        match (edge.crossing, method) {
            (true, None) => Err(RejectReason::CrossingRequired),
            (true, Some(_)) if character.perspective != Perspective::Migrant => {
                Err(RejectReason::PerspectiveForbidden)
            }
            (true, Some(m)) => {
                self.check_method(character, m)?;
                Ok(edge)
            }
            (false, Some(_)) => Err(RejectReason::NoCrossingHere),
            (false, None) => Ok(edge),
        }
    }

    /// Validate a crossing method for a character.
    fn check_method(&self, character: &Character, method: &str) -> Result<&CrossingMethod, RejectReason> {
        let m = self
            .crossing_method(method)
            .ok_or_else(|| RejectReason::UnknownMethod {
                method: method.to_string(),
            })?;
        if let Some(item) = &m.requires_item {
            if !character.has_item(item) {
                return Err(RejectReason::MethodUnavailable {
                    method: m.id.clone(),
                    item: item.clone(),
                });
            }
        }
        if character.get(Attribute::Money) < m.cost {
            return Err(RejectReason::CannotAfford { cost: m.cost });
        }
        Ok(m)
    }

    /// Direction of the crossing edge out of `location`, if any.
    #[must_use]
    pub fn crossing_direction(&self, location: &LocationId) -> Option<Direction> {
        self.location(location)?.crossing().map(|t| t.direction)
    }

    /// Move `character` in `direction`, crossing with `method` if the edge is
    /// a crossing.
    ///
    /// Crossings pay the method's cost up front, then roll against its
    /// success chance. Success moves the character, costs `health_risk`, and
    /// sets `has_crossed`. Failure costs more health, leaves the character in
    /// place, and may end in capture (moved to detention, `was_detained` set)
    /// with a chance that scales with the stretch's patrol intensity.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn attempt_transition<R: Rng + ?Sized>(
        &self,
        character: &mut Character,
        direction: Direction,
        method: Option<&str>,
        rules: CrossingRules<'_>,
        rng: &mut R,
    ) -> TransitionOutcome {
        let edge = match self.check_transition(character, direction, method) {
            Ok(edge) => edge.clone(),
            Err(reason) => return TransitionOutcome::Rejected(reason),
        };
        let from = character.location.clone();

        let Some(method_id) = method.filter(|_| edge.crossing) else {
            character.location = edge.target.clone();
            debug!(from = %from, to = %edge.target, "Moved");
            return TransitionOutcome::Moved {
                from,
                to: edge.target,
                crossed_with: None,
                deltas: Vec::new(),
            };
        };

        let m = match self.check_method(character, method_id) {
            Ok(m) => m.clone(),
            Err(reason) => return TransitionOutcome::Rejected(reason),
        };
        let mut deltas = Vec::new();
        let mut change = |c: &mut Character, attribute: Attribute, amount: i32| {
            let before = c.get(attribute);
            let after = c.resources.apply_delta(attribute, amount);
            if before != after {
                deltas.push(ResourceDelta {
                    attribute,
                    before,
                    after,
                });
            }
        };
        if m.cost > 0 {
            change(character, Attribute::Money, -m.cost);
        }

        let roll: u32 = rng.gen_range(0..100);
        if roll < m.success_pct {
            change(character, Attribute::Health, -m.health_risk);
            change(character, Attribute::Hope, rules.config.success_hope);
            change(character, Attribute::Trauma, rules.config.success_trauma);
            character.set_flag(flags::HAS_CROSSED);
            character.location = edge.target.clone();
            debug!(from = %from, to = %edge.target, method = %m.id, roll, "Crossing succeeded");
            return TransitionOutcome::Moved {
                from,
                to: edge.target,
                crossed_with: Some(m.id),
                deltas,
            };
        }

        let failure_cost = (m.health_risk as f32 * rules.config.failure_risk_multiplier).round() as i32;
        change(character, Attribute::Health, -failure_cost);
        change(character, Attribute::Hope, -rules.config.failure_hope);
        change(character, Attribute::Trauma, rules.config.failure_trauma);

        let intensity = self
            .location(&from)
            .and_then(|l| l.terrain.patrol_intensity())
            .unwrap_or(0)
            .max(0) as u32;
        let capture_pct = ((intensity * rules.config.capture_pct_per_intensity) as f32
            * rules.multipliers.patrol_intensity)
            .round()
            .clamp(0.0, 100.0) as u32;
        let captured = rng.gen_range(0..100) < capture_pct;
        if captured {
            character.set_flag(flags::WAS_DETAINED);
            character.location = self.detention.clone();
        }
        debug!(method = %m.id, roll, capture_pct, captured, "Crossing failed");

        TransitionOutcome::CrossingFailed {
            method: m.id,
            captured,
            deltas,
        }
    }
}
