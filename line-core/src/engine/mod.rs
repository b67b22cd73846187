//! The narrative state engine.
//!
//! One call to [`Engine::take_turn`] runs the whole pipeline for a session:
//!
//! 1. refuse the action if the session is over or the action is not valid
//!    right now (nothing changes);
//! 2. answer free actions (`look`, `status`, `help`) without advancing time;
//! 3. advance the turn and apply passive decay;
//! 4. apply the action;
//! 5. select and apply an event;
//! 6. maintain critical flags and evaluate terminal conditions.
//!
//! The engine itself is immutable and cheap to clone. All mutable state lives
//! in the [`Session`] passed in.

mod actions;
mod outcome;

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::action::Action;
use crate::catalog::{Effect, EventCatalog};
use crate::character::Character;
use crate::config::GameConfig;
use crate::error::Result;
use crate::resource::{DecayContext, ResourceDelta};
use crate::selector;
use crate::session::{Ending, GameState, PendingChoice, Session, SessionSnapshot};
use crate::types::{Attribute, EventId, Jurisdiction, LocationId, Perspective, flags};
use crate::world::World;

pub use outcome::{NarrativeLine, Rejection, TurnOutcome};

/// Accumulates what happens during one turn.
#[derive(Debug, Default)]
struct TurnLog {
    deltas: Vec<ResourceDelta>,
    narrative: Vec<NarrativeLine>,
    moved: bool,
    event: Option<EventId>,
    /// Set when the action ended the turn's story early (capture).
    interrupted: bool,
}

impl TurnLog {
    fn line(&mut self, line: NarrativeLine) {
        self.narrative.push(line);
    }

    fn deltas(&mut self, deltas: impl IntoIterator<Item = ResourceDelta>) {
        self.deltas.extend(deltas);
    }
}

/// Shared, read-only game rules.
#[derive(Debug, Clone)]
pub struct Engine {
    world: Arc<World>,
    catalog: Arc<EventCatalog>,
    config: Arc<GameConfig>,
}

impl Engine {
    /// Build an engine over already-loaded data.
    #[must_use]
    pub fn new(world: Arc<World>, catalog: Arc<EventCatalog>, config: Arc<GameConfig>) -> Self {
        Self {
            world,
            catalog,
            config,
        }
    }

    /// Engine over the shipped world and catalog.
    ///
    /// # Errors
    /// Only if the embedded data files are broken.
    pub fn builtin(config: GameConfig) -> Result<Self> {
        let world = World::builtin()?;
        let catalog = EventCatalog::builtin(&world)?;
        Ok(Self::new(Arc::new(world), Arc::new(catalog), Arc::new(config)))
    }

    /// Engine over the data files named in `[general]`, falling back to the
    /// shipped data for whichever is unset.
    ///
    /// # Errors
    /// If a configured file cannot be read or does not validate.
    pub fn load(config: GameConfig) -> Result<Self> {
        let world = match &config.general.world_path {
            Some(path) => World::from_file(path)?,
            None => World::builtin()?,
        };
        let catalog = match &config.general.events_path {
            Some(path) => EventCatalog::from_file(path, &world)?,
            None => EventCatalog::builtin(&world)?,
        };
        info!(
            locations = world.locations().count(),
            events = catalog.events().len(),
            "Game data loaded"
        );
        Ok(Self::new(Arc::new(world), Arc::new(catalog), Arc::new(config)))
    }

    /// The world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// The event catalog.
    #[must_use]
    pub fn catalog(&self) -> &EventCatalog {
        &self.catalog
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    /// Start a new game.
    #[must_use]
    pub fn new_session(&self, perspective: Perspective, seed: u64) -> Session {
        let start = self.world.starts.for_perspective(perspective);
        let character = Character::new(
            perspective,
            start.location.clone(),
            self.config.starting.for_perspective(perspective),
            &self.config.multipliers(),
            start.items.clone(),
        );
        let session = Session::new(character, seed);
        info!(
            session = %session.id,
            perspective = %perspective,
            seed,
            difficulty = ?self.config.difficulty.preset,
            "Session started"
        );
        session
    }

    /// Resume a saved game.
    ///
    /// # Errors
    /// See [`Session::restore`].
    pub fn restore(&self, snapshot: SessionSnapshot) -> Result<Session> {
        let session = Session::restore(snapshot, &self.world)?;
        info!(session = %session.id, turn = session.turn, "Session restored");
        Ok(session)
    }

    /// Every action the engine would accept right now.
    #[must_use]
    pub fn valid_actions(&self, session: &Session) -> Vec<Action> {
        self.candidate_actions(session)
            .into_iter()
            .filter(|a| self.check(session, a).is_ok())
            .collect()
    }

    // ------------------------------------------------------------------
    // Turn pipeline
    // ------------------------------------------------------------------

    /// Run one turn.
    pub fn take_turn(&self, session: &mut Session, action: Action) -> TurnOutcome {
        if let Err(rejection) = self.check(session, &action) {
            debug!(session = %session.id, action = %action, ?rejection, "Action rejected");
            let mut log = TurnLog::default();
            log.line(rejection.narrative());
            return self.outcome(session, action, log, Some(rejection));
        }

        if action.is_free() {
            let log = self.describe(session, &action);
            return self.outcome(session, action, log, None);
        }

        if action == Action::Quit {
            session.state = GameState::TerminalAbandoned;
            session.pending = None;
            info!(session = %session.id, turn = session.turn, "Session abandoned");
            let mut log = TurnLog::default();
            log.line(NarrativeLine::new("ending.abandoned"));
            log.narrative.extend(session.journey.summary(&session.character, session.turn));
            return self.outcome(session, action, log, None);
        }

        session.turn += 1;
        let mut rng = session.turn_rng();
        let mut log = TurnLog::default();

        self.decay(session, &mut log);
        self.apply_action(session, &action, &mut rng, &mut log);

        if !matches!(action, Action::Choose(_)) && !log.interrupted {
            self.run_event(session, &mut rng, &mut log);
        }

        if log
            .deltas
            .iter()
            .any(|d| d.attribute == Attribute::Trauma && d.after > d.before)
        {
            session.journey.record_trauma();
        }
        self.update_critical_flags(&mut session.character);
        self.evaluate_terminal(session, &mut log);

        debug!(
            session = %session.id,
            turn = session.turn,
            action = %action,
            location = %session.character.location,
            event = ?log.event,
            deltas = log.deltas.len(),
            state = ?session.state,
            "Turn complete"
        );
        self.outcome(session, action, log, None)
    }

    fn outcome(
        &self,
        session: &Session,
        action: Action,
        log: TurnLog,
        rejected: Option<Rejection>,
    ) -> TurnOutcome {
        TurnOutcome {
            turn: session.turn,
            action,
            deltas: log.deltas,
            event: log.event,
            narrative: log.narrative,
            location: session.character.location.clone(),
            moved: log.moved,
            state: session.state,
            rejected,
            pending_choice: session.pending.clone(),
        }
    }

    fn decay(&self, session: &mut Session, log: &mut TurnLog) {
        let character = &mut session.character;
        let (water_scarcity, food_service) = self
            .world
            .location(&character.location)
            .map_or((None, false), |loc| {
                (loc.terrain.water_scarcity(), loc.offers("food"))
            });
        let ctx = DecayContext {
            perspective: character.perspective,
            water_scarcity,
            food_service,
            consumption: self.config.multipliers().resource_consumption,
        };
        if let Some(report) = character
            .resources
            .decay(session.turn, &self.config.decay, ctx)
        {
            log.deltas(report.deltas);
            for ailment in report.ailments {
                log.line(NarrativeLine::new(ailment.text_key()));
            }
            for attribute in report.critical {
                debug!(session = %session.id, %attribute, "Vital attribute exhausted");
                log.line(NarrativeLine::new(format!("critical.{attribute}")));
            }
        }
    }

    fn run_event<R: rand::Rng + ?Sized>(&self, session: &mut Session, rng: &mut R, log: &mut TurnLog) {
        let Some(location) = self.world.location(&session.character.location) else {
            return;
        };
        let quiet = self
            .config
            .events
            .effective_quiet_weight(&self.config.multipliers());
        let Some(event) = selector::select(
            &self.catalog,
            &session.character,
            location,
            &session.fired,
            quiet,
            rng,
        ) else {
            return;
        };

        debug!(session = %session.id, event = %event.id, "Event fired");
        if event.once {
            session.fired.insert(event.id.clone());
        }
        session.journey.record_event(&event.id);
        log.event = Some(event.id.clone());
        log.line(NarrativeLine::new(event.text_key()).arg("location", &location.name));
        self.apply_effect(session, &event.effect, log);

        if !event.choices.is_empty() {
            for n in 1..=event.choices.len() {
                log.line(NarrativeLine::new(event.choice_key(n)).arg("n", n));
            }
            session.pending = Some(PendingChoice {
                event: event.id.clone(),
                options: event.choices.len(),
            });
        }
    }

    /// Apply an event or choice effect, including a checked relocation.
    fn apply_effect(&self, session: &mut Session, effect: &Effect, log: &mut TurnLog) {
        let applied = effect.apply(&mut session.character);
        session.journey.record_lives(effect.lives);
        log.deltas(applied.deltas);
        for item in &applied.gained {
            log.line(NarrativeLine::new("effect.gained").arg("item", self.item_name(item)));
        }
        for item in &applied.lost {
            log.line(NarrativeLine::new("effect.lost").arg("item", self.item_name(item)));
        }
        if let Some(target) = &effect.move_to {
            self.relocate(&mut session.character, target, log);
        }
    }

    /// Move a character by event fiat, honouring jurisdiction rules.
    fn relocate(&self, character: &mut Character, target: &LocationId, log: &mut TurnLog) {
        let Some(dest) = self.world.location(target) else {
            warn!(target = %target, "Event relocation to unknown location skipped");
            return;
        };
        let allowed = match character.perspective {
            Perspective::Patrol => character.perspective.may_occupy(dest.jurisdiction),
            Perspective::Migrant => {
                dest.jurisdiction != Jurisdiction::Us
                    || character.has_flag(flags::HAS_CROSSED)
                    || character.has_flag(flags::WAS_DETAINED)
            }
        };
        if !allowed {
            warn!(
                perspective = %character.perspective,
                target = %target,
                jurisdiction = %dest.jurisdiction,
                "Event relocation would break jurisdiction rules; skipped"
            );
            return;
        }
        if character.location != *target {
            character.location = target.clone();
            log.moved = true;
            log.line(NarrativeLine::new("move.taken").arg("location", &dest.name));
        }
    }

    fn update_critical_flags(&self, character: &mut Character) {
        if character.get(Attribute::Water) < self.config.decay.low_threshold {
            character.set_flag(flags::WATER_CRITICAL);
        } else {
            character.clear_flag(flags::WATER_CRITICAL);
        }
        if character.resources.critical_attributes().contains(&Attribute::Food) {
            character.set_flag(flags::STARVING);
        } else {
            character.clear_flag(flags::STARVING);
        }
    }

    fn evaluate_terminal(&self, session: &mut Session, log: &mut TurnLog) {
        let c = &session.character;
        let failure = |ending| GameState::TerminalFailure { ending };
        let success = |ending| GameState::TerminalSuccess { ending };
        let critical = c.resources.critical_attributes();

        let state = if critical.contains(&Attribute::Health) || critical.contains(&Attribute::Water) {
            failure(Ending::Death)
        } else if c.perspective == Perspective::Migrant
            && (c.has_flag(flags::WAS_DETAINED) || c.location == self.world.detention)
        {
            failure(Ending::Detained)
        } else if c.perspective == Perspective::Migrant && c.location == self.world.destination {
            success(Ending::ReachedDestination)
        } else if c.perspective == Perspective::Patrol
            && c.encounters >= self.config.events.patrol_arc_encounters
        {
            success(Ending::ServiceComplete)
        } else if c.perspective == Perspective::Patrol
            && c.get(Attribute::Stress) >= c.resources.max(Attribute::Stress)
        {
            failure(Ending::Burnout)
        } else if session.turn >= self.config.general.max_turns {
            failure(Ending::Timeout)
        } else {
            GameState::Active
        };

        if let Some(ending) = state.ending() {
            session.state = state;
            session.pending = None;
            log.line(NarrativeLine::new(ending.text_key()).arg("turn", session.turn));
            log.narrative.extend(session.journey.summary(&session.character, session.turn));
            info!(
                session = %session.id,
                turn = session.turn,
                ?ending,
                distance = session.journey.distance,
                choices = session.journey.choices_made,
                "Session ended"
            );
        }
    }
}
