//! The location graph.
//!
//! A [`World`] is loaded once from TOML, validated, and then shared
//! read-only (behind an `Arc`) by every session. Dangling references in the
//! data file are fatal: a world that loads is a world whose ids all resolve.

pub mod location;
pub mod transition;

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use tracing::info;

use crate::error::{LineError, Result};
use crate::types::{ItemId, LocationId, Perspective};

pub use location::{
    CrossingMethod, ItemDef, Location, Npc, ServiceDef, StartDef, Starts, Terrain, TerrainKind,
    Transition,
};
pub use transition::{CrossingRules, RejectReason, TransitionOutcome};

const BUILTIN_WORLD: &str = include_str!("../../data/world.toml");

/// On-disk shape of a world file.
#[derive(Debug, Deserialize)]
struct WorldFile {
    destination: LocationId,
    detention: LocationId,
    start: Starts,
    #[serde(default)]
    locations: Vec<Location>,
    #[serde(default)]
    crossing_methods: Vec<CrossingMethod>,
    #[serde(default)]
    items: Vec<ItemDef>,
    #[serde(default)]
    services: Vec<ServiceDef>,
}

/// The validated, immutable world.
#[derive(Debug, Clone)]
pub struct World {
    locations: BTreeMap<LocationId, Location>,
    crossing_methods: BTreeMap<String, CrossingMethod>,
    items: BTreeMap<ItemId, ItemDef>,
    services: BTreeMap<String, ServiceDef>,
    /// Per-perspective start.
    pub starts: Starts,
    /// Where a migrant's journey succeeds.
    pub destination: LocationId,
    /// Where captured migrants are taken.
    pub detention: LocationId,
}

fn index<K: Ord + Clone + std::fmt::Display, V>(
    what: &str,
    values: Vec<V>,
    key: impl Fn(&V) -> K,
) -> Result<BTreeMap<K, V>> {
    let mut map = BTreeMap::new();
    for v in values {
        let k = key(&v);
        if map.contains_key(&k) {
            return Err(LineError::Catalog(format!("duplicate {what} id '{k}'")));
        }
        map.insert(k, v);
    }
    Ok(map)
}

impl World {
    /// Parse and validate a world from TOML.
    ///
    /// # Errors
    /// Returns [`LineError::Catalog`] on malformed data or dangling ids.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let file: WorldFile =
            toml::from_str(toml_str).map_err(|e| LineError::Catalog(format!("world: {e}")))?;

        let world = Self {
            locations: index("location", file.locations, |l| l.id.clone())?,
            crossing_methods: index("crossing method", file.crossing_methods, |m| m.id.clone())?,
            items: index("item", file.items, |i| i.id.clone())?,
            services: index("service", file.services, |s| s.id.clone())?,
            starts: file.start,
            destination: file.destination,
            detention: file.detention,
        };
        world.validate()?;

        info!(
            locations = world.locations.len(),
            items = world.items.len(),
            crossing_methods = world.crossing_methods.len(),
            "World loaded"
        );
        Ok(world)
    }

    /// Load and validate a world file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is invalid.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// The world shipped with the game.
    ///
    /// # Errors
    /// Only if the embedded data file is broken.
    pub fn builtin() -> Result<Self> {
        Self::from_toml(BUILTIN_WORLD)
    }

    fn validate(&self) -> Result<()> {
        let bad = |msg: String| Err(LineError::Catalog(msg));

        for id in [&self.destination, &self.detention] {
            if !self.locations.contains_key(id) {
                return bad(format!("unknown location '{id}'"));
            }
        }
        for perspective in Perspective::ALL {
            let start = self.starts.for_perspective(perspective);
            let Some(loc) = self.locations.get(&start.location) else {
                return bad(format!("{perspective} start '{}' is not a location", start.location));
            };
            if !perspective.may_occupy(loc.jurisdiction) {
                return bad(format!("{perspective} cannot start in {}", loc.jurisdiction));
            }
            self.check_items(&start.items, &format!("{perspective} start"))?;
        }

        for loc in self.locations.values() {
            self.check_items(&loc.items, &format!("location '{}'", loc.id))?;
            for svc in loc.terrain.services() {
                if !self.services.contains_key(svc) {
                    return bad(format!("location '{}' offers unknown service '{svc}'", loc.id));
                }
            }
            let mut seen = BTreeSet::new();
            for t in &loc.transitions {
                if !seen.insert(t.direction) {
                    return bad(format!("location '{}' has two exits {}", loc.id, t.direction));
                }
                if !self.locations.contains_key(&t.target) {
                    return bad(format!("location '{}' leads to unknown '{}'", loc.id, t.target));
                }
                self.check_items(&t.requires_items, &format!("exit {} of '{}'", t.direction, loc.id))?;
                if t.crossing && loc.terrain.patrol_intensity().is_none() {
                    return bad(format!("crossing out of '{}' which is not a border", loc.id));
                }
            }
        }

        for m in self.crossing_methods.values() {
            if m.success_pct > 100 {
                return bad(format!("crossing method '{}' success over 100%", m.id));
            }
            if let Some(item) = &m.requires_item {
                self.check_items(std::slice::from_ref(item), &format!("crossing method '{}'", m.id))?;
            }
        }
        Ok(())
    }

    fn check_items(&self, items: &[ItemId], context: &str) -> Result<()> {
        match items.iter().find(|i| !self.items.contains_key(*i)) {
            Some(item) => Err(LineError::Catalog(format!("{context} references unknown item '{item}'"))),
            None => Ok(()),
        }
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    /// Location by id.
    #[must_use]
    pub fn location(&self, id: &LocationId) -> Option<&Location> {
        self.locations.get(id)
    }

    /// Location by id, as an error when missing.
    ///
    /// # Errors
    /// [`LineError::UnknownLocation`].
    pub fn require_location(&self, id: &LocationId) -> Result<&Location> {
        self.locations
            .get(id)
            .ok_or_else(|| LineError::UnknownLocation(id.clone()))
    }

    /// Every location, in id order.
    pub fn locations(&self) -> impl Iterator<Item = &Location> {
        self.locations.values()
    }

    /// Crossing method by id.
    #[must_use]
    pub fn crossing_method(&self, id: &str) -> Option<&CrossingMethod> {
        self.crossing_methods.get(id)
    }

    /// Every crossing method, in id order.
    pub fn crossing_methods(&self) -> impl Iterator<Item = &CrossingMethod> {
        self.crossing_methods.values()
    }

    /// Item definition by id.
    #[must_use]
    pub fn item(&self, id: &ItemId) -> Option<&ItemDef> {
        self.items.get(id)
    }

    /// Every item definition, in id order.
    pub fn items(&self) -> impl Iterator<Item = &ItemDef> {
        self.items.values()
    }

    /// Every service definition, in id order.
    pub fn services(&self) -> impl Iterator<Item = &ServiceDef> {
        self.services.values()
    }

    /// Whether an item id is defined.
    #[must_use]
    pub fn has_item(&self, id: &ItemId) -> bool {
        self.items.contains_key(id)
    }

    /// Service definition by id.
    #[must_use]
    pub fn service(&self, id: &str) -> Option<&ServiceDef> {
        self.services.get(id)
    }

    /// Outgoing edges a perspective can see from `location`.
    ///
    /// Edges closed to the perspective, and edges into jurisdictions the
    /// perspective may never occupy, are filtered out.
    #[must_use]
    pub fn transitions_from(&self, location: &LocationId, perspective: Perspective) -> Vec<&Transition> {
        let Some(here) = self.locations.get(location) else {
            return Vec::new();
        };
        here.transitions
            .iter()
            .filter(|t| t.permits(perspective))
            .filter(|t| {
                self.locations
                    .get(&t.target)
                    .is_some_and(|target| perspective.may_occupy(target.jurisdiction))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Direction;
    use crate::types::Jurisdiction;

    #[test]
    fn builtin_world_loads() {
        let world = World::builtin().expect("builtin world is valid");
        assert_eq!(world.destination, LocationId::from("tucson"));
        assert_eq!(world.detention, LocationId::from("detention_center"));
        assert!(world.location(&LocationId::from("sonoran_desert")).is_some());
        assert_eq!(world.crossing_methods().count(), 5);
    }

    #[test]
    fn patrol_never_sees_exits_into_mexico() {
        let world = World::builtin().expect("builtin world");
        for loc in world.locations() {
            for t in world.transitions_from(&loc.id, Perspective::Patrol) {
                let target = world.location(&t.target).expect("validated target");
                assert_ne!(target.jurisdiction, Jurisdiction::Mexico, "{} -> {}", loc.id, t.target);
            }
        }
    }

    #[test]
    fn border_fence_offers_the_crossing_to_migrants() {
        let world = World::builtin().expect("builtin world");
        let fence = LocationId::from("border_fence");
        assert_eq!(world.crossing_direction(&fence), Some(Direction::North));
        let exits = world.transitions_from(&fence, Perspective::Migrant);
        assert!(exits.iter().any(|t| t.crossing));
    }

    #[test]
    fn dangling_target_is_fatal() {
        let toml = r#"
            destination = "a"
            detention = "a"
            [start.migrant]
            location = "a"
            [start.patrol]
            location = "a"

            [[locations]]
            id = "a"
            name = "A"
            jurisdiction = "us"
            terrain = { kind = "facility" }
            [[locations.transitions]]
            direction = "north"
            target = "nowhere"
        "#;
        let err = World::from_toml(toml).unwrap_err();
        assert!(matches!(err, LineError::Catalog(msg) if msg.contains("nowhere")));
    }

    #[test]
    fn unknown_start_item_is_fatal() {
        let toml = r#"
            destination = "a"
            detention = "a"
            [start.migrant]
            location = "a"
            items = ["unicorn"]
            [start.patrol]
            location = "a"

            [[locations]]
            id = "a"
            name = "A"
            jurisdiction = "us"
            terrain = { kind = "facility" }
        "#;
        assert!(matches!(World::from_toml(toml), Err(LineError::Catalog(_))));
    }

    #[test]
    fn patrol_start_in_mexico_is_fatal() {
        let toml = r#"
            destination = "a"
            detention = "a"
            [start.migrant]
            location = "a"
            [start.patrol]
            location = "a"

            [[locations]]
            id = "a"
            name = "A"
            jurisdiction = "mexico"
            terrain = { kind = "facility" }
        "#;
        assert!(matches!(World::from_toml(toml), Err(LineError::Catalog(_))));
    }
}
