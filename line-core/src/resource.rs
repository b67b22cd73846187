//! Bounded character attributes and passive per-turn decay.
//!
//! Every public mutator clamps to `[0, max]` with saturating arithmetic, so no
//! sequence of deltas (however large) can push a value out of bounds.

use serde::{Deserialize, Serialize};

use crate::config::DecayRates;
use crate::types::{Attribute, Perspective};

// ---------------------------------------------------------------------------
// Meter
// ---------------------------------------------------------------------------

/// A single bounded value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meter {
    value: i32,
    max: i32,
}

impl Meter {
    /// New meter, with `value` clamped into `[0, max]`.
    #[must_use]
    pub fn new(value: i32, max: i32) -> Self {
        let max = max.max(0);
        Self {
            value: value.clamp(0, max),
            max,
        }
    }

    /// Current value.
    #[must_use]
    pub fn value(self) -> i32 {
        self.value
    }

    /// Upper bound.
    #[must_use]
    pub fn max(self) -> i32 {
        self.max
    }

    /// Add `amount` (may be negative), clamp, and return the new value.
    pub fn apply(&mut self, amount: i32) -> i32 {
        self.value = self.value.saturating_add(amount).clamp(0, self.max);
        self.value
    }

    /// Raw setter. Out-of-range input is a caller bug.
    pub fn set(&mut self, value: i32) {
        debug_assert!(
            (0..=self.max).contains(&value),
            "meter value {value} outside [0, {}]",
            self.max
        );
        self.value = value.clamp(0, self.max);
    }
}

// ---------------------------------------------------------------------------
// Deltas
// ---------------------------------------------------------------------------

/// A bundle of signed attribute changes, as written in data files.
///
/// Missing fields default to zero, so `{ water = 30 }` is a valid bundle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Deltas {
    /// Water change.
    pub water: i32,
    /// Food change.
    pub food: i32,
    /// Health change.
    pub health: i32,
    /// Hope change.
    pub hope: i32,
    /// Trauma change.
    pub trauma: i32,
    /// Stress change.
    pub stress: i32,
    /// Money change.
    pub money: i32,
    /// Conscience change.
    pub conscience: i32,
    /// Standing change.
    pub standing: i32,
}

impl Deltas {
    /// Change for a single attribute.
    #[must_use]
    pub fn get(&self, attribute: Attribute) -> i32 {
        match attribute {
            Attribute::Water => self.water,
            Attribute::Food => self.food,
            Attribute::Health => self.health,
            Attribute::Hope => self.hope,
            Attribute::Trauma => self.trauma,
            Attribute::Stress => self.stress,
            Attribute::Money => self.money,
            Attribute::Conscience => self.conscience,
            Attribute::Standing => self.standing,
        }
    }

    /// Builder-style single attribute change.
    #[must_use]
    pub fn with(mut self, attribute: Attribute, amount: i32) -> Self {
        let slot = match attribute {
            Attribute::Water => &mut self.water,
            Attribute::Food => &mut self.food,
            Attribute::Health => &mut self.health,
            Attribute::Hope => &mut self.hope,
            Attribute::Trauma => &mut self.trauma,
            Attribute::Stress => &mut self.stress,
            Attribute::Money => &mut self.money,
            Attribute::Conscience => &mut self.conscience,
            Attribute::Standing => &mut self.standing,
        };
        *slot = amount;
        self
    }

    /// Non-zero entries in display order.
    pub fn iter(&self) -> impl Iterator<Item = (Attribute, i32)> + '_ {
        Attribute::ALL
            .into_iter()
            .map(|a| (a, self.get(a)))
            .filter(|&(_, amount)| amount != 0)
    }

    /// Whether every entry is zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

/// One observed attribute change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDelta {
    /// The attribute that changed.
    pub attribute: Attribute,
    /// Value before the change.
    pub before: i32,
    /// Value after clamping.
    pub after: i32,
}

// ---------------------------------------------------------------------------
// Decay
// ---------------------------------------------------------------------------

/// Physical consequence reported by a decay pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ailment {
    /// Water is low.
    Dehydration,
    /// Water is empty.
    SevereDehydration,
    /// Food is low.
    Hunger,
    /// Food is empty.
    Starvation,
    /// Hope is low.
    Despair,
    /// Stress is high.
    Strain,
}

impl Ailment {
    /// Narrative text key for this ailment.
    #[must_use]
    pub fn text_key(self) -> &'static str {
        match self {
            Self::Dehydration => "decay.dehydration",
            Self::SevereDehydration => "decay.severe_dehydration",
            Self::Hunger => "decay.hunger",
            Self::Starvation => "decay.starvation",
            Self::Despair => "decay.despair",
            Self::Strain => "decay.strain",
        }
    }
}

/// Where the character is standing, as far as decay is concerned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayContext {
    /// Whose drain table applies.
    pub perspective: Perspective,
    /// `Some(scarcity)` when the location is desert.
    pub water_scarcity: Option<i32>,
    /// Whether the location offers a food service.
    pub food_service: bool,
    /// Difficulty `resource_consumption` multiplier.
    pub consumption: f32,
}

/// Result of one decay pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecayReport {
    /// The turn the pass ran for.
    pub turn: u32,
    /// Every attribute that moved.
    pub deltas: Vec<ResourceDelta>,
    /// Conditions that cost health this turn.
    pub ailments: Vec<Ailment>,
    /// Vital attributes now at zero.
    pub critical: Vec<Attribute>,
}

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// The full attribute block of a character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    water: Meter,
    food: Meter,
    health: Meter,
    hope: Meter,
    trauma: Meter,
    stress: Meter,
    money: Meter,
    conscience: Meter,
    standing: Meter,
    /// Last turn decay ran for; guards idempotency.
    last_decay_turn: Option<u32>,
}

impl Resources {
    /// Build from starting values, each clamped to its attribute's bounds.
    #[must_use]
    pub fn new(values: &crate::config::StartingValues) -> Self {
        Self {
            water: Meter::new(values.water, Attribute::Water.max()),
            food: Meter::new(values.food, Attribute::Food.max()),
            health: Meter::new(values.health, Attribute::Health.max()),
            hope: Meter::new(values.hope, Attribute::Hope.max()),
            trauma: Meter::new(values.trauma, Attribute::Trauma.max()),
            stress: Meter::new(values.stress, Attribute::Stress.max()),
            money: Meter::new(values.money, Attribute::Money.max()),
            conscience: Meter::new(values.conscience, Attribute::Conscience.max()),
            standing: Meter::new(values.standing, Attribute::Standing.max()),
            last_decay_turn: None,
        }
    }

    fn meter(&self, attribute: Attribute) -> &Meter {
        match attribute {
            Attribute::Water => &self.water,
            Attribute::Food => &self.food,
            Attribute::Health => &self.health,
            Attribute::Hope => &self.hope,
            Attribute::Trauma => &self.trauma,
            Attribute::Stress => &self.stress,
            Attribute::Money => &self.money,
            Attribute::Conscience => &self.conscience,
            Attribute::Standing => &self.standing,
        }
    }

    fn meter_mut(&mut self, attribute: Attribute) -> &mut Meter {
        match attribute {
            Attribute::Water => &mut self.water,
            Attribute::Food => &mut self.food,
            Attribute::Health => &mut self.health,
            Attribute::Hope => &mut self.hope,
            Attribute::Trauma => &mut self.trauma,
            Attribute::Stress => &mut self.stress,
            Attribute::Money => &mut self.money,
            Attribute::Conscience => &mut self.conscience,
            Attribute::Standing => &mut self.standing,
        }
    }

    /// Current value of an attribute.
    #[must_use]
    pub fn get(&self, attribute: Attribute) -> i32 {
        self.meter(attribute).value()
    }

    /// Upper bound of an attribute.
    #[must_use]
    pub fn max(&self, attribute: Attribute) -> i32 {
        self.meter(attribute).max()
    }

    /// Add `amount` to `attribute`, clamp to bounds, return the new value.
    pub fn apply_delta(&mut self, attribute: Attribute, amount: i32) -> i32 {
        self.meter_mut(attribute).apply(amount)
    }

    /// Apply a bundle, returning the attributes that actually moved.
    pub fn apply_deltas(&mut self, deltas: &Deltas) -> Vec<ResourceDelta> {
        deltas
            .iter()
            .filter_map(|(attribute, amount)| {
                let before = self.get(attribute);
                let after = self.apply_delta(attribute, amount);
                (before != after).then_some(ResourceDelta {
                    attribute,
                    before,
                    after,
                })
            })
            .collect()
    }

    /// Raw setter. See [`Meter::set`].
    pub fn set(&mut self, attribute: Attribute, value: i32) {
        self.meter_mut(attribute).set(value);
    }

    /// Vital attributes currently at zero.
    #[must_use]
    pub fn critical_attributes(&self) -> Vec<Attribute> {
        Attribute::ALL
            .into_iter()
            .filter(|a| a.is_vital() && self.get(*a) == 0)
            .collect()
    }

    /// Turn decay last ran for.
    #[must_use]
    pub fn last_decay_turn(&self) -> Option<u32> {
        self.last_decay_turn
    }

    /// Passive drain for `turn`.
    ///
    /// Water and food drain first (scaled by difficulty); knock-on health
    /// loss is then computed from the drained values. Returns `None` if decay
    /// already ran for this turn.
    #[allow(clippy::cast_possible_truncation)]
    pub fn decay(&mut self, turn: u32, rates: &DecayRates, ctx: DecayContext) -> Option<DecayReport> {
        if self.last_decay_turn.is_some_and(|last| last >= turn) {
            return None;
        }
        self.last_decay_turn = Some(turn);

        let table = rates.for_perspective(ctx.perspective);
        let mut water = table.water;
        let mut food = table.food;
        if let Some(scarcity) = ctx.water_scarcity {
            if table.desert_water_divisor > 0 {
                water += scarcity / table.desert_water_divisor;
            }
            food += table.desert_food;
        }
        if ctx.food_service {
            food = (food - table.food_service_relief).max(0);
        }
        let scale = |amount: i32| -> i32 {
            if amount <= 0 {
                return 0;
            }
            ((amount as f32 * ctx.consumption).round() as i32).max(1)
        };

        let mut deltas = Vec::new();
        let mut record = |res: &mut Self, attribute: Attribute, amount: i32| {
            let before = res.get(attribute);
            let after = res.apply_delta(attribute, amount);
            if before != after {
                deltas.push(ResourceDelta {
                    attribute,
                    before,
                    after,
                });
            }
        };
        record(self, Attribute::Water, -scale(water));
        record(self, Attribute::Food, -scale(food));

        let mut ailments = Vec::new();
        let mut health_loss = 0;
        let w = self.get(Attribute::Water);
        if w == 0 {
            health_loss += table.thirst_empty;
            ailments.push(Ailment::SevereDehydration);
        } else if w < rates.low_threshold {
            health_loss += table.thirst_low;
            ailments.push(Ailment::Dehydration);
        }
        let f = self.get(Attribute::Food);
        if f == 0 {
            health_loss += table.hunger_empty;
            ailments.push(Ailment::Starvation);
        } else if f < rates.low_threshold {
            health_loss += table.hunger_low;
            ailments.push(Ailment::Hunger);
        }
        if table.despair > 0 && self.get(Attribute::Hope) < rates.despair_below {
            health_loss += table.despair;
            ailments.push(Ailment::Despair);
        }
        if table.strain > 0 && self.get(Attribute::Stress) > rates.strain_above {
            health_loss += table.strain;
            ailments.push(Ailment::Strain);
        }
        if health_loss > 0 {
            record(self, Attribute::Health, -health_loss);
        }

        Some(DecayReport {
            turn,
            deltas,
            ailments,
            critical: self.critical_attributes(),
        })
    }
}
