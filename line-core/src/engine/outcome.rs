//! What a turn hands back to the presentation layer.

use std::collections::BTreeMap;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::resource::ResourceDelta;
use crate::session::{GameState, PendingChoice};
use crate::types::{EventId, ItemId, LocationId};
use crate::world::RejectReason;

/// A text key plus named arguments for its template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeLine {
    /// Template key, e.g. `"event.water_cache"`.
    pub key: String,
    /// Values for `{name}` placeholders.
    #[serde(default)]
    pub args: BTreeMap<String, String>,
}

impl NarrativeLine {
    /// Line with no arguments.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            args: BTreeMap::new(),
        }
    }

    /// Builder-style argument.
    #[must_use]
    pub fn arg(mut self, name: &str, value: impl Display) -> Self {
        self.args.insert(name.to_string(), value.to_string());
        self
    }
}

/// Why an action was refused. The session is untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rejection", rename_all = "snake_case")]
pub enum Rejection {
    /// The session is already over.
    GameOver,
    /// A choice must be answered first.
    ChoicePending {
        /// Options on offer.
        options: usize,
    },
    /// `choose` with nothing to choose.
    NoChoicePending,
    /// `choose n` out of range.
    InvalidChoice {
        /// Requested option.
        choice: usize,
        /// Options on offer.
        options: usize,
    },
    /// A move or crossing broke a world rule.
    Movement {
        /// The broken rule.
        reason: RejectReason,
    },
    /// The item is not lying here.
    ItemNotHere {
        /// Item.
        item: ItemId,
    },
    /// The item is not carried.
    ItemNotCarried {
        /// Item.
        item: ItemId,
    },
    /// No such service here.
    ServiceUnavailable {
        /// Service.
        service: String,
    },
    /// Not enough money.
    CannotAfford {
        /// Price.
        cost: i32,
    },
    /// Nobody by that name here, or they won't talk to you.
    NobodyHere {
        /// Requested NPC.
        npc: String,
    },
    /// The action belongs to the other perspective.
    WrongPerspective,
    /// Apprehension outside US or neutral ground.
    OutsideJurisdiction,
    /// Apprehension with nobody spotted.
    NothingSpotted,
}

impl Rejection {
    /// Narrative text key.
    #[must_use]
    pub fn text_key(&self) -> &'static str {
        match self {
            Self::GameOver => "reject.game_over",
            Self::ChoicePending { .. } => "reject.choice_pending",
            Self::NoChoicePending => "reject.no_choice",
            Self::InvalidChoice { .. } => "reject.invalid_choice",
            Self::Movement { reason } => reason.text_key(),
            Self::ItemNotHere { .. } => "reject.item_not_here",
            Self::ItemNotCarried { .. } => "reject.item_not_carried",
            Self::ServiceUnavailable { .. } => "reject.service_unavailable",
            Self::CannotAfford { .. } => "reject.cannot_afford",
            Self::NobodyHere { .. } => "reject.nobody_here",
            Self::WrongPerspective => "reject.wrong_perspective",
            Self::OutsideJurisdiction => "reject.outside_jurisdiction",
            Self::NothingSpotted => "reject.nothing_spotted",
        }
    }

    /// The rejection as a renderable line.
    #[must_use]
    pub fn narrative(&self) -> NarrativeLine {
        let line = NarrativeLine::new(self.text_key());
        match self {
            Self::ChoicePending { options } => line.arg("options", options),
            Self::InvalidChoice { choice, options } => line.arg("choice", choice).arg("options", options),
            Self::Movement { reason } => match reason {
                RejectReason::NoPath { direction } => line.arg("direction", direction),
                RejectReason::MissingItem { item } => line.arg("item", item),
                RejectReason::MissingFlag { flag } => line.arg("flag", flag),
                RejectReason::JurisdictionForbidden { jurisdiction } => line.arg("jurisdiction", jurisdiction),
                RejectReason::UnknownMethod { method } => line.arg("method", method),
                RejectReason::MethodUnavailable { method, item } => line.arg("method", method).arg("item", item),
                RejectReason::CannotAfford { cost } => line.arg("cost", cost),
                RejectReason::PerspectiveForbidden
                | RejectReason::CrossingRequired
                | RejectReason::NoCrossingHere => line,
            },
            Self::ItemNotHere { item } | Self::ItemNotCarried { item } => line.arg("item", item),
            Self::ServiceUnavailable { service } => line.arg("service", service),
            Self::CannotAfford { cost } => line.arg("cost", cost),
            Self::NobodyHere { npc } => line.arg("npc", npc),
            Self::GameOver
            | Self::NoChoicePending
            | Self::WrongPerspective
            | Self::OutsideJurisdiction
            | Self::NothingSpotted => line,
        }
    }
}

/// Everything that happened in one call to
/// [`Engine::take_turn`](super::Engine::take_turn).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOutcome {
    /// Session turn after the action (unchanged for free actions and
    /// rejections).
    pub turn: u32,
    /// The action that was applied or refused.
    pub action: Action,
    /// Attribute changes, in the order they happened.
    pub deltas: Vec<ResourceDelta>,
    /// Event that fired this turn.
    pub event: Option<EventId>,
    /// Lines to render, in order.
    pub narrative: Vec<NarrativeLine>,
    /// Where the character is now.
    pub location: LocationId,
    /// Whether the character changed location this turn.
    pub moved: bool,
    /// Session state after the turn.
    pub state: GameState,
    /// Set when the action was refused.
    pub rejected: Option<Rejection>,
    /// A choice the next action must answer.
    pub pending_choice: Option<PendingChoice>,
}

impl TurnOutcome {
    /// Whether the action was refused.
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        self.rejected.is_some()
    }
}
