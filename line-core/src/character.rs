//! The player character.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::config::{DifficultyMultipliers, StartingValues};
use crate::resource::Resources;
use crate::types::{Attribute, ItemId, LocationId, Perspective};

/// A player character: role, position, attributes, belongings and history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    /// Migrant or agent.
    pub perspective: Perspective,
    /// Current location. Always a key of the loaded world.
    pub location: LocationId,
    /// Bounded attributes.
    pub resources: Resources,
    /// Carried items; duplicates allowed.
    pub inventory: Vec<ItemId>,
    /// Narrative markers.
    pub flags: BTreeSet<String>,
    /// Resolved encounters (drives the agent's service arc).
    pub encounters: u32,
}

impl Character {
    /// Create a character at `location` with starting values scaled by the
    /// difficulty `starting_resources` multiplier (water, food, money only).
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(
        perspective: Perspective,
        location: LocationId,
        starting: &StartingValues,
        multipliers: &DifficultyMultipliers,
        inventory: Vec<ItemId>,
    ) -> Self {
        let scale = |v: i32| (v as f32 * multipliers.starting_resources).round() as i32;
        let values = StartingValues {
            water: scale(starting.water),
            food: scale(starting.food),
            money: scale(starting.money),
            ..starting.clone()
        };
        Self {
            perspective,
            location,
            resources: Resources::new(&values),
            inventory,
            flags: BTreeSet::new(),
            encounters: 0,
        }
    }

    /// Shorthand for reading an attribute.
    #[must_use]
    pub fn get(&self, attribute: Attribute) -> i32 {
        self.resources.get(attribute)
    }

    // -- flags ---------------------------------------------------------------

    /// Whether a flag is set.
    #[must_use]
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }

    /// Set a flag. Returns `true` if it was newly set.
    pub fn set_flag(&mut self, flag: impl Into<String>) -> bool {
        self.flags.insert(flag.into())
    }

    /// Clear a flag. Returns `true` if it was set.
    pub fn clear_flag(&mut self, flag: &str) -> bool {
        self.flags.remove(flag)
    }

    // -- inventory -----------------------------------------------------------

    /// Whether at least one of `item` is carried.
    #[must_use]
    pub fn has_item(&self, item: &ItemId) -> bool {
        self.inventory.contains(item)
    }

    /// Add one of `item`.
    pub fn add_item(&mut self, item: ItemId) {
        self.inventory.push(item);
    }

    /// Remove one of `item`. Returns `false` if none was carried.
    pub fn remove_item(&mut self, item: &ItemId) -> bool {
        match self.inventory.iter().position(|i| i == item) {
            Some(idx) => {
                self.inventory.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Distinct carried items, in first-acquired order.
    #[must_use]
    pub fn distinct_items(&self) -> Vec<&ItemId> {
        let mut seen = BTreeSet::new();
        self.inventory
            .iter()
            .filter(|i| seen.insert(i.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Character {
        Character::new(
            Perspective::Migrant,
            LocationId::from("nogales_mx"),
            &StartingValues::migrant(),
            &DifficultyMultipliers::default(),
            vec![ItemId::from("water_bottle"), ItemId::from("water_bottle")],
        )
    }

    #[test]
    fn starting_values_scale_with_difficulty() {
        let easy = DifficultyMultipliers {
            starting_resources: 1.3,
            ..DifficultyMultipliers::default()
        };
        let c = Character::new(
            Perspective::Migrant,
            LocationId::from("nogales_mx"),
            &StartingValues::migrant(),
            &easy,
            Vec::new(),
        );
        // clamped at max
        assert_eq!(c.get(Attribute::Water), 100);
        assert_eq!(c.get(Attribute::Money), 130);
        assert_eq!(c.get(Attribute::Health), 100);
    }

    #[test]
    fn inventory_is_a_multiset() {
        let mut c = sample();
        let bottle = ItemId::from("water_bottle");
        assert_eq!(c.distinct_items().len(), 1);
        assert!(c.remove_item(&bottle));
        assert!(c.has_item(&bottle));
        assert!(c.remove_item(&bottle));
        assert!(!c.has_item(&bottle));
        assert!(!c.remove_item(&bottle));
    }

    #[test]
    fn flags_set_and_clear() {
        let mut c = sample();
        assert!(c.set_flag("has_crossed"));
        assert!(!c.set_flag("has_crossed"));
        assert!(c.has_flag("has_crossed"));
        assert!(c.clear_flag("has_crossed"));
        assert!(!c.has_flag("has_crossed"));
    }
}
