//! Text templates and rendering of engine output.
//!
//! The engine speaks in [`NarrativeLine`]s: a key and named arguments. The
//! [`TextBank`] maps keys to English templates with `{name}` placeholders.

use std::collections::{BTreeMap, HashMap};

use anyhow::Context;
use line_core::NarrativeLine;
use serde::Deserialize;
use tracing::warn;

const BUILTIN_TEXT: &str = include_str!("../data/text.toml");

#[derive(Debug, Deserialize)]
struct TextFile {
    #[serde(default)]
    text: HashMap<String, String>,
}

/// Key to template lookup.
#[derive(Debug, Clone)]
pub struct TextBank {
    templates: HashMap<String, String>,
}

impl TextBank {
    /// The shipped English text.
    ///
    /// # Errors
    /// Only if the embedded file is broken.
    pub fn builtin() -> anyhow::Result<Self> {
        Self::from_toml(BUILTIN_TEXT).context("built-in text bank")
    }

    /// Parse a `[text]` table.
    ///
    /// # Errors
    /// If the TOML is malformed.
    pub fn from_toml(toml_str: &str) -> anyhow::Result<Self> {
        let file: TextFile = toml::from_str(toml_str).context("parsing text templates")?;
        Ok(Self {
            templates: file.text,
        })
    }

    /// Render one engine line. Unknown keys render as the key itself.
    #[must_use]
    pub fn render(&self, line: &NarrativeLine) -> String {
        self.format(&line.key, &line.args)
    }

    /// Render a launcher message with ad-hoc arguments.
    #[must_use]
    pub fn ui(&self, key: &str, args: &[(&str, &str)]) -> String {
        let args: BTreeMap<String, String> = args
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        self.format(key, &args)
    }

    fn format(&self, key: &str, args: &BTreeMap<String, String>) -> String {
        let Some(template) = self.templates.get(key) else {
            warn!(key, "Missing text template");
            return key.to_string();
        };
        fill(template, args)
    }
}

/// Substitute `{name}` placeholders. Unknown names are left as written.
fn fill(template: &str, args: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let name = &after[..close];
                match args.get(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use line_core::resource::Ailment;
    use line_core::session::Ending;
    use line_core::{Engine, GameConfig, Perspective};

    use super::*;

    #[test]
    fn placeholders_are_filled() {
        let bank = TextBank::from_toml(
            r#"
            [text]
            "a" = "Hello {who}, you have {n} {thing}."
            "#,
        )
        .expect("parse");
        let line = NarrativeLine::new("a").arg("who", "Elena").arg("n", 3);
        assert_eq!(bank.render(&line), "Hello Elena, you have 3 {thing}.");
    }

    #[test]
    fn missing_key_renders_as_key() {
        let bank = TextBank::from_toml("").expect("parse");
        assert_eq!(bank.render(&NarrativeLine::new("event.nowhere")), "event.nowhere");
    }

    #[test]
    fn unclosed_brace_is_kept() {
        let args = BTreeMap::new();
        assert_eq!(fill("cost {money", &args), "cost {money");
    }

    #[test]
    fn every_engine_key_has_text() {
        let bank = TextBank::builtin().expect("builtin");
        let engine = Engine::builtin(GameConfig::default()).expect("engine");
        let world = engine.world();

        let mut keys: Vec<String> = Vec::new();
        for event in engine.catalog().events() {
            keys.push(event.text_key());
            for n in 1..=event.choices.len() {
                keys.push(event.choice_key(n));
                keys.push(event.outcome_key(n));
            }
        }
        for loc in world.locations() {
            keys.push(format!("location.{}", loc.id));
            for npc in &loc.npcs {
                for n in 1..=npc.lines {
                    keys.push(format!("npc.{}.{n}", npc.id));
                }
            }
        }
        keys.extend(world.items().map(|i| format!("item.{}.use", i.id)));
        keys.extend(world.services().map(|s| format!("service.{}", s.id)));
        for p in Perspective::ALL {
            keys.push(format!("status.{p}"));
            keys.push(format!("help.{p}"));
            keys.push(format!("rest.{p}"));
            keys.push(format!("intro.{p}"));
        }
        for ailment in [
            Ailment::Dehydration,
            Ailment::SevereDehydration,
            Ailment::Hunger,
            Ailment::Starvation,
            Ailment::Despair,
            Ailment::Strain,
        ] {
            keys.push(ailment.text_key().to_string());
        }
        for ending in [
            Ending::ReachedDestination,
            Ending::ServiceComplete,
            Ending::Death,
            Ending::Detained,
            Ending::Burnout,
            Ending::Timeout,
        ] {
            keys.push(ending.text_key().to_string());
        }
        keys.extend(
            [
                "ending.abandoned",
                "reject.game_over",
                "reject.choice_pending",
                "reject.no_choice",
                "reject.invalid_choice",
                "reject.no_path",
                "reject.perspective_forbidden",
                "reject.missing_item",
                "reject.missing_flag",
                "reject.jurisdiction",
                "reject.crossing_required",
                "reject.no_crossing",
                "reject.unknown_method",
                "reject.method_unavailable",
                "reject.cannot_afford",
                "reject.item_not_here",
                "reject.item_not_carried",
                "reject.service_unavailable",
                "reject.nobody_here",
                "reject.wrong_perspective",
                "reject.outside_jurisdiction",
                "reject.nothing_spotted",
                "move.arrive",
                "move.taken",
                "cross.success",
                "cross.failure",
                "cross.captured",
                "look.item",
                "look.npc",
                "look.exit",
                "look.crossing",
                "look.method",
                "look.service",
                "status.inventory",
                "status.empty",
                "status.pending",
                "help.actions",
                "take.item",
                "effect.gained",
                "effect.lost",
                "patrol.spotted",
                "patrol.quiet",
                "patrol.apprehended",
                "critical.water",
                "critical.food",
                "critical.health",
                "summary.header",
                "summary.stats",
                "summary.moments",
                "summary.moment",
                "summary.migrant",
                "summary.patrol",
            ]
            .map(String::from),
        );

        for standing in [100, 70, 50, 30, 0] {
            keys.push(line_core::journey::standing_key(standing).to_string());
        }

        let missing: Vec<&String> = keys.iter().filter(|k| !bank.templates.contains_key(k.as_str())).collect();
        assert!(missing.is_empty(), "missing text for {missing:?}");
    }
}
