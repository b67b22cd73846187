//! Per-action validation, free-action reports and action effects.

use rand::Rng;
use tracing::debug;

use super::{Engine, NarrativeLine, Rejection, TurnLog};
use crate::action::{Action, Direction};
use crate::session::Session;
use crate::types::{Attribute, ItemId, Perspective, flags};
use crate::world::{CrossingRules, RejectReason, TransitionOutcome};

impl Engine {
    /// Display name of an item, falling back to its id.
    pub(super) fn item_name(&self, item: &ItemId) -> String {
        self.world
            .item(item)
            .map_or_else(|| item.to_string(), |d| d.name.clone())
    }

    /// Every action worth checking in the current state.
    pub(super) fn candidate_actions(&self, session: &Session) -> Vec<Action> {
        let c = &session.character;
        let mut out = Vec::new();

        if let Some(pending) = &session.pending {
            out.extend((1..=pending.options).map(Action::Choose));
        }
        out.extend(Direction::ALL.into_iter().map(Action::Move));
        if c.perspective == Perspective::Migrant && self.world.crossing_direction(&c.location).is_some() {
            out.extend(self.world.crossing_methods().map(|m| Action::Cross(m.id.clone())));
        }
        let mut here = session.items_here(&self.world);
        here.dedup();
        out.extend(here.into_iter().cloned().map(Action::Take));
        out.extend(c.distinct_items().into_iter().cloned().map(Action::Use));
        if let Some(loc) = self.world.location(&c.location) {
            out.extend(loc.terrain.services().iter().cloned().map(Action::UseService));
            out.extend(loc.npcs.iter().map(|n| Action::Talk(n.id.clone())));
        }
        out.push(Action::Rest);
        out.push(Action::Patrol);
        out.push(Action::Apprehend);
        out.extend([Action::Look, Action::Status, Action::Help, Action::Quit]);
        out
    }

    /// Whether `action` may be taken now, and if not, why.
    pub(super) fn check(&self, session: &Session, action: &Action) -> Result<(), Rejection> {
        if session.state.is_terminal() {
            return Err(Rejection::GameOver);
        }
        if action.is_free() || *action == Action::Quit {
            return Ok(());
        }
        match (&session.pending, action) {
            (Some(p), Action::Choose(n)) => {
                return if (1..=p.options).contains(n) {
                    Ok(())
                } else {
                    Err(Rejection::InvalidChoice {
                        choice: *n,
                        options: p.options,
                    })
                };
            }
            (Some(p), _) => return Err(Rejection::ChoicePending { options: p.options }),
            (None, Action::Choose(_)) => return Err(Rejection::NoChoicePending),
            (None, _) => {}
        }

        let c = &session.character;
        let movement = |reason: RejectReason| Rejection::Movement { reason };
        match action {
            Action::Move(d) => self.world.check_transition(c, *d, None).map(|_| ()).map_err(movement),
            Action::Cross(method) => {
                if c.perspective != Perspective::Migrant {
                    return Err(Rejection::WrongPerspective);
                }
                let dir = self
                    .world
                    .crossing_direction(&c.location)
                    .ok_or(movement(RejectReason::NoCrossingHere))?;
                self.world
                    .check_transition(c, dir, Some(method.as_str()))
                    .map(|_| ())
                    .map_err(movement)
            }
            Action::Take(item) => {
                if session.items_here(&self.world).contains(&item) {
                    Ok(())
                } else {
                    Err(Rejection::ItemNotHere { item: item.clone() })
                }
            }
            Action::Use(item) => {
                if c.has_item(item) && self.world.has_item(item) {
                    Ok(())
                } else {
                    Err(Rejection::ItemNotCarried { item: item.clone() })
                }
            }
            Action::UseService(service) => {
                let offered = self.world.location(&c.location).is_some_and(|l| l.offers(service));
                let def = self
                    .world
                    .service(service)
                    .filter(|_| offered)
                    .ok_or_else(|| Rejection::ServiceUnavailable {
                        service: service.clone(),
                    })?;
                if c.get(Attribute::Money) < def.cost {
                    return Err(Rejection::CannotAfford { cost: def.cost });
                }
                Ok(())
            }
            Action::Talk(npc) => {
                let present = self
                    .world
                    .location(&c.location)
                    .and_then(|l| l.npc(npc))
                    .is_some_and(|n| n.perspectives.is_empty() || n.perspectives.contains(&c.perspective));
                if present {
                    Ok(())
                } else {
                    Err(Rejection::NobodyHere { npc: npc.clone() })
                }
            }
            Action::Patrol => {
                if c.perspective == Perspective::Patrol {
                    Ok(())
                } else {
                    Err(Rejection::WrongPerspective)
                }
            }
            Action::Apprehend => {
                if c.perspective != Perspective::Patrol {
                    return Err(Rejection::WrongPerspective);
                }
                let jurisdiction = self
                    .world
                    .location(&c.location)
                    .map(|l| l.jurisdiction);
                if !jurisdiction.is_some_and(|j| c.perspective.may_enforce(j)) {
                    return Err(Rejection::OutsideJurisdiction);
                }
                if !c.has_flag(flags::MIGRANTS_SPOTTED) {
                    return Err(Rejection::NothingSpotted);
                }
                Ok(())
            }
            Action::Rest | Action::Choose(_) | Action::Look | Action::Status | Action::Help | Action::Quit => Ok(()),
        }
    }

    // ------------------------------------------------------------------
    // Free actions
    // ------------------------------------------------------------------

    /// Narrative for `look`, `status` and `help`.
    pub(super) fn describe(&self, session: &Session, action: &Action) -> TurnLog {
        let mut log = TurnLog::default();
        let c = &session.character;
        match action {
            Action::Look => {
                let Some(loc) = self.world.location(&c.location) else {
                    return log;
                };
                log.line(
                    NarrativeLine::new(format!("location.{}", loc.id))
                        .arg("name", &loc.name)
                        .arg("danger", loc.danger_level)
                        .arg("jurisdiction", loc.jurisdiction),
                );
                for item in session.items_here(&self.world) {
                    log.line(NarrativeLine::new("look.item").arg("item", self.item_name(item)));
                }
                for npc in &loc.npcs {
                    log.line(NarrativeLine::new("look.npc").arg("npc", &npc.name).arg("id", &npc.id));
                }
                for t in self.world.transitions_from(&loc.id, c.perspective) {
                    let name = self
                        .world
                        .location(&t.target)
                        .map_or_else(|| t.target.to_string(), |l| l.name.clone());
                    let key = if t.crossing { "look.crossing" } else { "look.exit" };
                    log.line(NarrativeLine::new(key).arg("direction", t.direction).arg("location", name));
                }
                if c.perspective == Perspective::Migrant && loc.crossing().is_some() {
                    for m in self.world.crossing_methods() {
                        log.line(
                            NarrativeLine::new("look.method")
                                .arg("method", &m.id)
                                .arg("name", &m.name)
                                .arg("success", m.success_pct)
                                .arg("cost", m.cost),
                        );
                    }
                }
                for service in loc.terrain.services() {
                    let cost = self.world.service(service).map_or(0, |s| s.cost);
                    log.line(NarrativeLine::new("look.service").arg("service", service).arg("cost", cost));
                }
            }
            Action::Status => {
                let mut line = NarrativeLine::new(format!("status.{}", c.perspective))
                    .arg("turn", session.turn)
                    .arg("max_turns", self.config.general.max_turns)
                    .arg("encounters", c.encounters);
                for attribute in Attribute::ALL {
                    line = line.arg(attribute.as_str(), c.get(attribute));
                }
                log.line(line);
                let items: Vec<String> = c.inventory.iter().map(|i| self.item_name(i)).collect();
                if items.is_empty() {
                    log.line(NarrativeLine::new("status.empty"));
                } else {
                    log.line(NarrativeLine::new("status.inventory").arg("items", items.join(", ")));
                }
                if let Some(p) = &session.pending {
                    log.line(NarrativeLine::new("status.pending").arg("options", p.options));
                }
            }
            Action::Help => {
                let actions: Vec<String> = self
                    .valid_actions(session)
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                log.line(NarrativeLine::new(format!("help.{}", c.perspective)));
                log.line(NarrativeLine::new("help.actions").arg("actions", actions.join(", ")));
            }
            _ => {}
        }
        log
    }

    // ------------------------------------------------------------------
    // Turn-consuming actions
    // ------------------------------------------------------------------

    /// Apply an already-validated action.
    #[allow(
        clippy::too_many_lines,
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    pub(super) fn apply_action<R: Rng + ?Sized>(
        &self,
        session: &mut Session,
        action: &Action,
        rng: &mut R,
        log: &mut TurnLog,
    ) {
        let multipliers = self.config.multipliers();
        match action {
            Action::Move(direction) => self.traverse(session, *direction, None, rng, log),
            Action::Cross(method) => {
                if let Some(direction) = self.world.crossing_direction(&session.character.location) {
                    self.traverse(session, direction, Some(method.as_str()), rng, log);
                }
            }
            Action::Rest => {
                let c = &mut session.character;
                log.deltas(c.resources.apply_deltas(self.config.actions.rest(c.perspective)));
                log.line(NarrativeLine::new(format!("rest.{}", c.perspective)));
            }
            Action::Take(item) => {
                session
                    .looted
                    .insert((session.character.location.clone(), item.clone()));
                session.character.add_item(item.clone());
                log.line(NarrativeLine::new("take.item").arg("item", self.item_name(item)));
            }
            Action::Use(item) => {
                let Some(def) = self.world.item(item) else {
                    return;
                };
                let c = &mut session.character;
                log.deltas(c.resources.apply_deltas(&def.deltas));
                for f in &def.set_flags {
                    c.set_flag(f.clone());
                }
                if def.consumed {
                    c.remove_item(item);
                }
                log.line(NarrativeLine::new(format!("item.{item}.use")).arg("item", &def.name));
            }
            Action::UseService(service) => {
                let Some(def) = self.world.service(service) else {
                    return;
                };
                let c = &mut session.character;
                log.deltas(
                    c.resources
                        .apply_deltas(&def.deltas.clone().with(Attribute::Money, -def.cost)),
                );
                log.line(NarrativeLine::new(format!("service.{service}")).arg("cost", def.cost));
            }
            Action::Talk(id) => {
                let Some(npc) = self
                    .world
                    .location(&session.character.location)
                    .and_then(|l| l.npc(id))
                else {
                    return;
                };
                let n = rng.gen_range(1..=npc.lines.max(1));
                log.deltas(session.character.resources.apply_deltas(&npc.deltas));
                log.line(NarrativeLine::new(format!("npc.{id}.{n}")).arg("name", &npc.name));
            }
            Action::Patrol => {
                let chance = (self.config.events.patrol_spot_chance_pct as f32 * multipliers.patrol_intensity)
                    .round()
                    .clamp(0.0, 100.0) as u32;
                let c = &mut session.character;
                if rng.gen_range(0..100) < chance {
                    c.set_flag(flags::MIGRANTS_SPOTTED);
                    log.line(NarrativeLine::new("patrol.spotted"));
                } else {
                    log.line(NarrativeLine::new("patrol.quiet"));
                }
                debug!(chance, spotted = c.has_flag(flags::MIGRANTS_SPOTTED), "Patrol sweep");
            }
            Action::Apprehend => {
                let stress = rng.gen_range(1..=self.config.actions.apprehend_stress_max.max(1));
                let effect = self.config.actions.apprehend.with(
                    Attribute::Stress,
                    self.config.actions.apprehend.stress.saturating_add(stress),
                );
                let c = &mut session.character;
                c.encounters = c.encounters.saturating_add(1);
                c.clear_flag(flags::MIGRANTS_SPOTTED);
                log.deltas(c.resources.apply_deltas(&effect));
                session.journey.record_lives(1);
                log.line(NarrativeLine::new("patrol.apprehended").arg("encounters", c.encounters));
            }
            Action::Choose(n) => {
                let Some(pending) = session.pending.take() else {
                    return;
                };
                let Some(event) = self.catalog.get(&pending.event) else {
                    return;
                };
                log.event = Some(event.id.clone());
                session.journey.record_choice();
                log.line(NarrativeLine::new(event.outcome_key(*n)));
                if let Some(choice) = event.choices.get(n - 1) {
                    self.apply_effect(session, &choice.effect, log);
                }
            }
            Action::Look | Action::Status | Action::Help | Action::Quit => {}
        }
    }

    /// Shared body of `move` and `cross`.
    fn traverse<R: Rng + ?Sized>(
        &self,
        session: &mut Session,
        direction: Direction,
        method: Option<&str>,
        rng: &mut R,
        log: &mut TurnLog,
    ) {
        let multipliers = self.config.multipliers();
        let rules = CrossingRules {
            config: &self.config.crossing,
            multipliers: &multipliers,
        };
        match self
            .world
            .attempt_transition(&mut session.character, direction, method, rules, rng)
        {
            TransitionOutcome::Moved {
                to,
                crossed_with,
                deltas,
                ..
            } => {
                log.moved = true;
                log.deltas(deltas);
                session.journey.record_move();
                let name = self
                    .world
                    .location(&to)
                    .map_or_else(|| to.to_string(), |l| l.name.clone());
                if let Some(m) = crossed_with {
                    log.line(NarrativeLine::new("cross.success").arg("method", m));
                }
                log.line(NarrativeLine::new("move.arrive").arg("location", name));
            }
            TransitionOutcome::CrossingFailed {
                method,
                captured,
                deltas,
            } => {
                log.deltas(deltas);
                log.line(NarrativeLine::new("cross.failure").arg("method", method));
                if captured {
                    log.moved = true;
                    log.interrupted = true;
                    log.line(NarrativeLine::new("cross.captured"));
                }
            }
            TransitionOutcome::Rejected(reason) => {
                // Already validated; only reachable if the world changed underneath.
                log.line(Rejection::Movement { reason }.narrative());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::action::{Action, Direction};
    use crate::catalog::EventCatalog;
    use crate::config::GameConfig;
    use crate::engine::{Engine, Rejection};
    use crate::types::{Attribute, ItemId, Perspective, flags};
    use crate::world::World;

    /// Builtin world with no events, so only the action under test acts.
    fn engine() -> Engine {
        let world = World::builtin().expect("builtin world");
        let catalog = EventCatalog::from_toml("", &world).expect("empty catalog");
        Engine::new(Arc::new(world), Arc::new(catalog), Arc::new(GameConfig::default()))
    }

    #[test]
    fn services_charge_and_heal() {
        let engine = engine();
        let mut s = engine.new_session(Perspective::Migrant, 3);
        s.character.resources.set(Attribute::Health, 50);
        let out = engine.take_turn(&mut s, Action::UseService("shelter".into()));
        assert!(!out.is_rejected());
        assert_eq!(s.character.get(Attribute::Money), 70);
        assert_eq!(s.character.get(Attribute::Health), 70);

        s.character.resources.set(Attribute::Money, 5);
        let out = engine.take_turn(&mut s, Action::UseService("food".into()));
        assert_eq!(out.rejected, Some(Rejection::CannotAfford { cost: 20 }));
        let out = engine.take_turn(&mut s, Action::UseService("medical".into()));
        assert!(matches!(out.rejected, Some(Rejection::ServiceUnavailable { .. })));
    }

    #[test]
    fn consumed_items_are_removed() {
        let engine = engine();
        let mut s = engine.new_session(Perspective::Migrant, 3);
        s.character.resources.set(Attribute::Water, 40);
        let bottle = ItemId::from("water_bottle");
        let out = engine.take_turn(&mut s, Action::Use(bottle.clone()));
        assert!(!out.is_rejected());
        assert!(!s.character.has_item(&bottle));
        assert!(out.narrative.iter().any(|l| l.key == "item.water_bottle.use"));
    }

    #[test]
    fn cross_is_migrant_only_and_needs_a_crossing() {
        let engine = engine();
        let mut s = engine.new_session(Perspective::Migrant, 3);
        let out = engine.take_turn(&mut s, Action::Cross("ladder".into()));
        assert!(matches!(
            out.rejected,
            Some(Rejection::Movement { .. })
        ));

        let mut agent = engine.new_session(Perspective::Patrol, 3);
        let out = engine.take_turn(&mut agent, Action::Cross("ladder".into()));
        assert_eq!(out.rejected, Some(Rejection::WrongPerspective));
    }

    #[test]
    fn apprehension_needs_a_sighting() {
        let engine = engine();
        let mut s = engine.new_session(Perspective::Patrol, 3);
        let out = engine.take_turn(&mut s, Action::Apprehend);
        assert_eq!(out.rejected, Some(Rejection::NothingSpotted));

        s.character.set_flag(flags::MIGRANTS_SPOTTED);
        let out = engine.take_turn(&mut s, Action::Apprehend);
        assert!(!out.is_rejected());
        assert_eq!(s.character.encounters, 1);
        assert!(!s.character.has_flag(flags::MIGRANTS_SPOTTED));
        assert_eq!(s.character.get(Attribute::Standing), 55);
        assert_eq!(s.journey.lives_impacted, 1);
    }

    #[test]
    fn pending_choice_blocks_other_actions() {
        let engine = Engine::builtin(GameConfig::default()).expect("engine");
        let mut s = engine.new_session(Perspective::Migrant, 3);
        s.pending = Some(crate::session::PendingChoice {
            event: "rattlesnake".into(),
            options: 3,
        });
        let out = engine.take_turn(&mut s, Action::Move(Direction::North));
        assert_eq!(out.rejected, Some(Rejection::ChoicePending { options: 3 }));
        let out = engine.take_turn(&mut s, Action::Choose(4));
        assert_eq!(
            out.rejected,
            Some(Rejection::InvalidChoice { choice: 4, options: 3 })
        );
        assert_eq!(
            engine.valid_actions(&s)[..3],
            [Action::Choose(1), Action::Choose(2), Action::Choose(3)]
        );
        let out = engine.take_turn(&mut s, Action::Choose(2));
        assert!(!out.is_rejected());
        assert_eq!(out.turn, 1);
        assert!(out.narrative.iter().any(|l| l.key == "event.rattlesnake.outcome.2"));
        assert!(s.pending.is_none());
    }

    #[test]
    fn look_lists_exits_and_methods_at_the_fence() {
        let engine = engine();
        let mut s = engine.new_session(Perspective::Migrant, 3);
        s.character.location = "border_fence".into();
        let out = engine.take_turn(&mut s, Action::Look);
        assert!(out.narrative.iter().any(|l| l.key == "look.crossing"));
        assert_eq!(
            out.narrative.iter().filter(|l| l.key == "look.method").count(),
            engine.world().crossing_methods().count()
        );
    }
}
