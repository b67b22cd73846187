//! Fixed-command matching.
//!
//! Understands a small command vocabulary with aliases. Arguments are
//! normalised to ids (`"water bottle"` becomes `water_bottle`) and may be
//! abbreviated when exactly one valid action fits.

use line_core::{Action, Direction, ItemId};
use tracing::trace;

use crate::Resolution;

/// Stateless matcher for typed commands.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedCommandResolver;

fn to_id(words: &[&str]) -> String {
    words.join("_")
}

/// Drop leading filler words such as `to` in `talk to manuel`.
fn skip_filler<'a>(mut words: &'a [&'a str], fillers: &[&str]) -> &'a [&'a str] {
    while let Some((first, rest)) = words.split_first() {
        if !fillers.contains(first) {
            break;
        }
        words = rest;
    }
    words
}

impl FixedCommandResolver {
    /// Parse `input` into an action without looking at what is valid.
    #[must_use]
    pub fn parse(input: &str) -> Option<Action> {
        let lowered = input.trim().to_lowercase();
        let words: Vec<&str> = lowered.split_whitespace().collect();
        let (&verb, rest) = words.split_first()?;

        if let Ok(n) = verb.parse::<usize>() {
            return rest.is_empty().then_some(Action::Choose(n));
        }
        if rest.is_empty() {
            if let Ok(d) = verb.parse::<Direction>() {
                return Some(Action::Move(d));
            }
        }

        let arg = |fillers: &[&str]| {
            let words = skip_filler(rest, fillers);
            (!words.is_empty()).then(|| to_id(words))
        };

        match verb {
            "move" | "go" | "walk" | "head" => {
                let dir = skip_filler(rest, &["to", "the"]);
                match dir {
                    [d] => d.parse().ok().map(Action::Move),
                    _ => None,
                }
            }
            "cross" => arg(&["with", "using", "by"]).map(Action::Cross),
            "take" | "get" | "grab" => arg(&["the", "a"]).map(|i| Action::Take(ItemId::new(i))),
            "pick" => arg(&["up", "the", "a"]).map(|i| Action::Take(ItemId::new(i))),
            "use" => match rest {
                ["service", svc @ ..] if !svc.is_empty() => Some(Action::UseService(to_id(svc))),
                _ => arg(&["the", "a"]).map(|i| Action::Use(ItemId::new(i))),
            },
            "buy" => arg(&["some", "a"]).map(Action::UseService),
            "talk" | "speak" => arg(&["to", "with"]).map(Action::Talk),
            "look" | "examine" | "l" if rest.is_empty() || rest == ["around"] => Some(Action::Look),
            "status" | "inventory" | "inv" | "i" if rest.is_empty() => Some(Action::Status),
            "help" | "?" if rest.is_empty() => Some(Action::Help),
            "rest" | "wait" | "sleep" if rest.is_empty() => Some(Action::Rest),
            "patrol" | "search" if rest.is_empty() => Some(Action::Patrol),
            "apprehend" | "arrest" | "detain" if rest.is_empty() || rest == ["them"] => Some(Action::Apprehend),
            "choose" | "option" => match rest {
                [n] => n.parse().ok().map(Action::Choose),
                _ => None,
            },
            "quit" | "exit" if rest.is_empty() => Some(Action::Quit),
            _ => None,
        }
    }

    /// Resolve `input` against the actions valid right now.
    ///
    /// An exact hit wins. Otherwise an abbreviated argument (`take water`)
    /// resolves when exactly one valid action of the same verb starts with
    /// it. A parseable command that matches nothing valid is still returned,
    /// so the engine can explain why it is refused.
    #[must_use]
    pub fn resolve_now(&self, input: &str, valid: &[Action]) -> Resolution {
        let Some(parsed) = Self::parse(input) else {
            trace!(input, "No fixed command");
            return Resolution::NoMatch;
        };
        if valid.contains(&parsed) {
            return Resolution::Matched(parsed);
        }
        if let Some(arg) = argument(&parsed) {
            let mut candidates = valid
                .iter()
                .filter(|a| a.verb() == parsed.verb())
                .filter(|a| argument(a).is_some_and(|id| id.starts_with(arg) || id.ends_with(arg)));
            if let (Some(only), None) = (candidates.next(), candidates.next()) {
                trace!(input, action = %only, "Abbreviation resolved");
                return Resolution::Matched(only.clone());
            }
        }
        Resolution::Matched(parsed)
    }
}

/// The free-text argument of an action, if it has one.
fn argument(action: &Action) -> Option<&str> {
    match action {
        Action::Cross(s) | Action::UseService(s) | Action::Talk(s) => Some(s),
        Action::Take(i) | Action::Use(i) => Some(i.as_str()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Option<Action> {
        FixedCommandResolver::parse(s)
    }

    #[test]
    fn vocabulary() {
        assert_eq!(parse("n"), Some(Action::Move(Direction::North)));
        assert_eq!(parse("Go West"), Some(Action::Move(Direction::West)));
        assert_eq!(parse("move to the east"), Some(Action::Move(Direction::East)));
        assert_eq!(parse("cross tunnel"), Some(Action::Cross("tunnel".into())));
        assert_eq!(parse("cross using fence gap"), Some(Action::Cross("fence_gap".into())));
        assert_eq!(parse("get the water bottle"), Some(Action::Take(ItemId::from("water_bottle"))));
        assert_eq!(parse("pick up map"), Some(Action::Take(ItemId::from("map"))));
        assert_eq!(parse("use first aid kit"), Some(Action::Use(ItemId::from("first_aid_kit"))));
        assert_eq!(parse("use service food"), Some(Action::UseService("food".into())));
        assert_eq!(parse("speak with manuel"), Some(Action::Talk("manuel".into())));
        assert_eq!(parse("examine"), Some(Action::Look));
        assert_eq!(parse("inventory"), Some(Action::Status));
        assert_eq!(parse("help"), Some(Action::Help));
        assert_eq!(parse("wait"), Some(Action::Rest));
        assert_eq!(parse("search"), Some(Action::Patrol));
        assert_eq!(parse("apprehend"), Some(Action::Apprehend));
        assert_eq!(parse("choose 2"), Some(Action::Choose(2)));
        assert_eq!(parse("3"), Some(Action::Choose(3)));
        assert_eq!(parse("exit"), Some(Action::Quit));
    }

    #[test]
    fn nonsense_is_no_match() {
        assert_eq!(parse(""), None);
        assert_eq!(parse("   "), None);
        assert_eq!(parse("dance wildly"), None);
        assert_eq!(parse("go sideways"), None);
        assert_eq!(parse("rest for a bit"), None);
        assert_eq!(parse("choose many"), None);
    }

    #[test]
    fn abbreviations_resolve_against_valid_actions() {
        let valid = vec![
            Action::Take(ItemId::from("water_bottle")),
            Action::Take(ItemId::from("wire_cutters")),
            Action::Use(ItemId::from("canned_food")),
            Action::Rest,
        ];
        let r = FixedCommandResolver;
        assert_eq!(
            r.resolve_now("take water", &valid),
            Resolution::Matched(Action::Take(ItemId::from("water_bottle")))
        );
        assert_eq!(
            r.resolve_now("use food", &valid),
            Resolution::Matched(Action::Use(ItemId::from("canned_food")))
        );
        // Ambiguous or unknown abbreviations pass through for the engine to refuse.
        assert_eq!(
            r.resolve_now("take w", &valid),
            Resolution::Matched(Action::Take(ItemId::from("w")))
        );
        assert_eq!(r.resolve_now("juggle", &valid), Resolution::NoMatch);
    }
}
