//! The running record of a journey, summarised when it ends.

use serde::{Deserialize, Serialize};

use crate::character::Character;
use crate::engine::NarrativeLine;
use crate::types::{Attribute, EventId, Perspective};

/// Miles credited for every completed move.
pub const MILES_PER_MOVE: u32 = 10;

/// How many of the latest key events the summary recalls.
pub const MOMENTS_SHOWN: usize = 7;

/// What happened along the way.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JourneyStats {
    /// Miles walked, driven or crawled.
    pub distance: u32,
    /// Choices answered.
    pub choices_made: u32,
    /// People whose fate the character touched.
    pub lives_impacted: u32,
    /// Turns on which trauma rose.
    pub trauma_events: u32,
    /// Events that fired, oldest first. Consecutive repeats collapse.
    pub key_events: Vec<EventId>,
}

impl JourneyStats {
    /// Credit one move.
    pub fn record_move(&mut self) {
        self.distance = self.distance.saturating_add(MILES_PER_MOVE);
    }

    /// Remember a fired event.
    pub fn record_event(&mut self, event: &EventId) {
        if self.key_events.last() != Some(event) {
            self.key_events.push(event.clone());
        }
    }

    /// Count an answered choice.
    pub fn record_choice(&mut self) {
        self.choices_made = self.choices_made.saturating_add(1);
    }

    /// Count people whose fate the character touched.
    pub fn record_lives(&mut self, lives: u32) {
        self.lives_impacted = self.lives_impacted.saturating_add(lives);
    }

    /// Count a turn on which trauma rose.
    pub fn record_trauma(&mut self) {
        self.trauma_events = self.trauma_events.saturating_add(1);
    }

    /// The closing summary, one line per paragraph.
    #[must_use]
    pub fn summary(&self, character: &Character, turns: u32) -> Vec<NarrativeLine> {
        let mut out = vec![
            NarrativeLine::new("summary.header"),
            NarrativeLine::new("summary.stats")
                .arg("distance", self.distance)
                .arg("turns", turns)
                .arg("lives", self.lives_impacted)
                .arg("choices", self.choices_made)
                .arg("trauma", self.trauma_events),
        ];

        let skip = self.key_events.len().saturating_sub(MOMENTS_SHOWN);
        if skip < self.key_events.len() {
            out.push(NarrativeLine::new("summary.moments"));
            out.extend(
                self.key_events[skip..]
                    .iter()
                    .map(|e| NarrativeLine::new("summary.moment").arg("event", e.as_str().replace('_', " "))),
            );
        }

        match character.perspective {
            Perspective::Migrant => out.push(
                NarrativeLine::new("summary.migrant")
                    .arg("hope", character.get(Attribute::Hope))
                    .arg("trauma", character.get(Attribute::Trauma)),
            ),
            Perspective::Patrol => {
                out.push(
                    NarrativeLine::new("summary.patrol")
                        .arg("encounters", character.encounters)
                        .arg("conscience", character.get(Attribute::Conscience))
                        .arg("standing", character.get(Attribute::Standing)),
                );
                out.push(NarrativeLine::new(standing_key(character.get(Attribute::Standing))));
            }
        }
        out
    }
}

/// Narrative key describing a department standing.
#[must_use]
pub fn standing_key(standing: i32) -> &'static str {
    match standing {
        80.. => "summary.standing.respected",
        60..=79 => "summary.standing.good",
        40..=59 => "summary.standing.average",
        20..=39 => "summary.standing.questioned",
        _ => "summary.standing.damaged",
    }
}
