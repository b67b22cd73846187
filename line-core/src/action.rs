//! Resolved player actions.
//!
//! An [`Action`] is what the intent resolver hands to the engine. Each action
//! has a canonical text form (`"move north"`, `"cross ladder"`, `"choose 2"`)
//! used for logging, fixed-command matching and save files.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::ItemId;

/// Compass direction of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// North.
    North,
    /// South.
    South,
    /// East.
    East,
    /// West.
    West,
}

impl Direction {
    /// All four directions.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// Stable lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::North => "north",
            Self::South => "south",
            Self::East => "east",
            Self::West => "west",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "north" | "n" => Ok(Self::North),
            "south" | "s" => Ok(Self::South),
            "east" | "e" => Ok(Self::East),
            "west" | "w" => Ok(Self::West),
            other => Err(format!("unknown direction '{other}'")),
        }
    }
}

/// A fully resolved player action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Action {
    /// Walk or drive along a plain transition.
    Move(Direction),
    /// Attempt the border crossing with the named method.
    Cross(String),
    /// Spend the turn resting.
    Rest,
    /// Pick up an item lying at the current location.
    Take(ItemId),
    /// Use a carried item.
    Use(ItemId),
    /// Pay for a settlement service (`food`, `shelter`, `medical`).
    UseService(String),
    /// Talk to an NPC present here.
    Talk(String),
    /// Agent sweep of the area.
    Patrol,
    /// Agent apprehension of a spotted group.
    Apprehend,
    /// Pick option `n` (1-based) of the pending choice.
    Choose(usize),
    /// Describe the surroundings. Free.
    Look,
    /// Show attributes and inventory. Free.
    Status,
    /// List commands. Free.
    Help,
    /// Abandon the journey.
    Quit,
}

impl Action {
    /// Free actions report without consuming a turn.
    #[must_use]
    pub fn is_free(&self) -> bool {
        matches!(self, Self::Look | Self::Status | Self::Help)
    }

    /// Short verb naming the action kind, for logs and help text.
    #[must_use]
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Move(_) => "move",
            Self::Cross(_) => "cross",
            Self::Rest => "rest",
            Self::Take(_) => "take",
            Self::Use(_) => "use",
            Self::UseService(_) => "service",
            Self::Talk(_) => "talk",
            Self::Patrol => "patrol",
            Self::Apprehend => "apprehend",
            Self::Choose(_) => "choose",
            Self::Look => "look",
            Self::Status => "status",
            Self::Help => "help",
            Self::Quit => "quit",
        }
    }

    /// A natural-language phrase describing the action, used as the anchor
    /// text for embedding similarity.
    #[must_use]
    pub fn describe(&self) -> String {
        let human = |s: &str| s.replace('_', " ");
        match self {
            Self::Move(d) => format!("walk {d}, head {d}, go to the {d}"),
            Self::Cross(m) => format!("cross the border using the {}", human(m)),
            Self::Rest => "rest for a while, sit down and wait, sleep".to_string(),
            Self::Take(i) => format!("pick up the {}, grab the {}", human(i.as_str()), human(i.as_str())),
            Self::Use(i) => format!("use the {}, drink or eat or apply the {}", human(i.as_str()), human(i.as_str())),
            Self::UseService(s) => format!("pay for {} service, buy {}", human(s), human(s)),
            Self::Talk(n) => format!("talk to {}, speak with {}", human(n), human(n)),
            Self::Patrol => "patrol the area, search for people crossing".to_string(),
            Self::Apprehend => "apprehend the group, arrest them, detain the migrants".to_string(),
            Self::Choose(n) => format!("choose option {n}"),
            Self::Look => "look around, examine the surroundings".to_string(),
            Self::Status => "check my status, show my inventory and health".to_string(),
            Self::Help => "show help, list the commands".to_string(),
            Self::Quit => "quit the game, give up, exit".to_string(),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Move(d) => write!(f, "move {d}"),
            Self::Cross(m) => write!(f, "cross {m}"),
            Self::Take(i) => write!(f, "take {i}"),
            Self::Use(i) => write!(f, "use {i}"),
            Self::UseService(s) => write!(f, "use service {s}"),
            Self::Talk(n) => write!(f, "talk {n}"),
            Self::Choose(n) => write!(f, "choose {n}"),
            other => f.write_str(other.verb()),
        }
    }
}

impl FromStr for Action {
    type Err = String;

    /// Parse the canonical form produced by [`Display`](fmt::Display).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (head, rest) = match s.split_once(' ') {
            Some((h, r)) => (h, r.trim()),
            None => (s, ""),
        };
        let need_arg = |what: &str| -> Result<String, String> {
            if rest.is_empty() {
                Err(format!("'{head}' needs {what}"))
            } else {
                Ok(rest.to_string())
            }
        };
        match head {
            "move" => Ok(Self::Move(rest.parse()?)),
            "cross" => Ok(Self::Cross(need_arg("a method")?)),
            "take" => Ok(Self::Take(ItemId(need_arg("an item")?))),
            "use" => match rest.strip_prefix("service ") {
                Some(svc) => Ok(Self::UseService(svc.trim().to_string())),
                None => Ok(Self::Use(ItemId(need_arg("an item")?))),
            },
            "talk" => Ok(Self::Talk(need_arg("someone")?)),
            "choose" => rest
                .parse()
                .map(Self::Choose)
                .map_err(|_| format!("bad choice '{rest}'")),
            "rest" if rest.is_empty() => Ok(Self::Rest),
            "patrol" if rest.is_empty() => Ok(Self::Patrol),
            "apprehend" if rest.is_empty() => Ok(Self::Apprehend),
            "look" if rest.is_empty() => Ok(Self::Look),
            "status" if rest.is_empty() => Ok(Self::Status),
            "help" if rest.is_empty() => Ok(Self::Help),
            "quit" if rest.is_empty() => Ok(Self::Quit),
            _ => Err(format!("unknown action '{s}'")),
        }
    }
}

impl From<Action> for String {
    fn from(action: Action) -> Self {
        action.to_string()
    }
}

impl TryFrom<String> for Action {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_form_parses_back() {
        let actions = [
            Action::Move(Direction::West),
            Action::Cross("fence_gap".into()),
            Action::Take(ItemId::from("water_bottle")),
            Action::Use(ItemId::from("first_aid_kit")),
            Action::UseService("medical".into()),
            Action::Talk("manuel".into()),
            Action::Choose(2),
            Action::Apprehend,
            Action::Quit,
        ];
        for action in actions {
            assert_eq!(action.to_string().parse::<Action>(), Ok(action.clone()));
        }
    }

    #[test]
    fn only_look_status_help_are_free() {
        assert!(Action::Look.is_free());
        assert!(Action::Status.is_free());
        assert!(Action::Help.is_free());
        assert!(!Action::Rest.is_free());
        assert!(!Action::Quit.is_free());
    }

    #[test]
    fn malformed_actions_are_rejected() {
        assert!("move up".parse::<Action>().is_err());
        assert!("take".parse::<Action>().is_err());
        assert!("choose two".parse::<Action>().is_err());
        assert!("rest now".parse::<Action>().is_err());
        assert!("dance".parse::<Action>().is_err());
    }

    #[test]
    fn serde_uses_canonical_text() {
        let json = serde_json::to_string(&Action::Cross("ladder".into())).expect("serialise");
        assert_eq!(json, "\"cross ladder\"");
        let back: Action = serde_json::from_str(&json).expect("deserialise");
        assert_eq!(back, Action::Cross("ladder".into()));
    }
}
