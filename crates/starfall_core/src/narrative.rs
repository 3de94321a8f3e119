//! Emergent story events.
//!
//! Events are plain data tagged by [`NarrativeKind`]. Their effect on the
//! world lives in a dispatch table of handlers keyed by the kind's tag,
//! so new event kinds register a handler instead of carrying closures.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entities::{EntityId, Player};
use crate::factions::{FactionId, FactionRegistry};
use crate::rng::{choose, RandomSource};

/// Reputation a faction gains when a member makes a breakthrough.
pub const BREAKTHROUGH_REPUTATION: i32 = 5;
/// A player roll above this triggers a breakthrough.
pub const BREAKTHROUGH_THRESHOLD: i64 = 95;
/// A faction roll above this triggers a war declaration.
pub const WAR_THRESHOLD: i64 = 98;
/// Applied events kept in [`NarrativeEngine::historical_events`].
pub const HISTORY_LIMIT: usize = 32;

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NarrativeKind {
    /// A mysterious artifact surfaced.
    ArtifactDiscovered,
    /// A player advanced their faction's technology.
    TechnologicalBreakthrough {
        /// Player responsible.
        player: EntityId,
        /// Player name at the time.
        name: String,
    },
    /// A faction went to war.
    WarDeclared {
        /// Aggressor.
        faction: FactionId,
        /// Faction name at the time.
        name: String,
    },
}

impl NarrativeKind {
    /// Dispatch tag for this kind.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::ArtifactDiscovered => "artifact",
            Self::TechnologicalBreakthrough { .. } => "breakthrough",
            Self::WarDeclared { .. } => "war",
        }
    }
}

/// A story event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeEvent {
    /// Sequential identifier.
    pub id: u32,
    /// What happened.
    pub kind: NarrativeKind,
    /// Text shown to players.
    pub description: String,
}

/// Applies an event to the world and describes the impact.
pub type EventHandler =
    fn(&NarrativeEvent, &mut FactionRegistry, &mut dyn RandomSource) -> Option<String>;

fn artifact_impact(
    _event: &NarrativeEvent,
    _factions: &mut FactionRegistry,
    _rng: &mut dyn RandomSource,
) -> Option<String> {
    Some("Artifact discovered! Factions are now competing to claim it.".to_string())
}

fn breakthrough_impact(
    event: &NarrativeEvent,
    factions: &mut FactionRegistry,
    _rng: &mut dyn RandomSource,
) -> Option<String> {
    let NarrativeKind::TechnologicalBreakthrough { player, name } = &event.kind else {
        return None;
    };
    let faction = factions.faction_of(*player)?.id;
    factions
        .update_reputation(faction, BREAKTHROUGH_REPUTATION)
        .ok()?;
    Some(format!("{name} has advanced their faction's technology."))
}

fn war_impact(
    event: &NarrativeEvent,
    factions: &mut FactionRegistry,
    rng: &mut dyn RandomSource,
) -> Option<String> {
    let NarrativeKind::WarDeclared { faction, name } = &event.kind else {
        return None;
    };
    let rivals: Vec<FactionId> = factions
        .ids()
        .into_iter()
        .filter(|id| id != faction)
        .collect();
    let target = *choose(rng, &rivals)?;
    factions.declare_enmity(*faction, target).ok()?;
    Some(format!("{name} has declared war on faction {target}!"))
}

/// Generates, applies and archives story events.
#[derive(Debug, Clone)]
pub struct NarrativeEngine {
    opening: Vec<NarrativeEvent>,
    history: Vec<NarrativeEvent>,
    applied: u64,
    next_id: u32,
    handlers: BTreeMap<&'static str, EventHandler>,
}

impl Default for NarrativeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl NarrativeEngine {
    /// Create an engine with the built-in handlers.
    #[must_use]
    pub fn new() -> Self {
        let mut handlers: BTreeMap<&'static str, EventHandler> = BTreeMap::new();
        handlers.insert(NarrativeKind::ArtifactDiscovered.tag(), artifact_impact);
        handlers.insert("breakthrough", breakthrough_impact);
        handlers.insert("war", war_impact);
        Self {
            opening: Vec::new(),
            history: Vec::new(),
            applied: 0,
            next_id: 1,
            handlers,
        }
    }

    /// Register or replace the handler for a kind tag.
    pub fn set_handler(&mut self, tag: &'static str, handler: EventHandler) {
        self.handlers.insert(tag, handler);
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    /// Seed the opening storyline. Opening events are not yet applied.
    pub fn generate_initial_events(&mut self) {
        let id = self.next_id();
        self.opening.push(NarrativeEvent {
            id,
            kind: NarrativeKind::ArtifactDiscovered,
            description:
                "A mysterious artifact is discovered by a player, sparking interest and conflict."
                    .to_string(),
        });
    }

    /// Apply an event and archive it.
    ///
    /// Only the latest [`HISTORY_LIMIT`] events are archived. Returns the impact line from the event's handler, if any.
    pub fn register_event(
        &mut self,
        event: NarrativeEvent,
        factions: &mut FactionRegistry,
        rng: &mut dyn RandomSource,
    ) -> Option<String> {
        let impact = self
            .handlers
            .get(event.kind.tag())
            .and_then(|handler| handler(&event, factions, rng));

        tracing::info!(event = event.id, kind = event.kind.tag(), impact = ?impact, "Narrative event");
        self.applied += 1;
        self.history.push(event);
        if self.history.len() > HISTORY_LIMIT {
            let excess = self.history.len() - HISTORY_LIMIT;
            self.history.drain(..excess);
        }
        impact
    }

    /// Roll for new events based on the current players and factions.
    ///
    /// Returns the events registered this pass.
    pub fn evolve(
        &mut self,
        players: &[Player],
        factions: &mut FactionRegistry,
        rng: &mut dyn RandomSource,
    ) -> Vec<NarrativeEvent> {
        let mut registered = Vec::new();

        for player in players {
            if rng.next_in_range(1, 100) > BREAKTHROUGH_THRESHOLD {
                let event = NarrativeEvent {
                    id: self.next_id(),
                    kind: NarrativeKind::TechnologicalBreakthrough {
                        player: player.id,
                        name: player.name.clone(),
                    },
                    description: "A player has made a significant technological breakthrough."
                        .to_string(),
                };
                registered.push(event.clone());
                self.register_event(event, factions, rng);
            }
        }

        let roster: Vec<(FactionId, String)> =
            factions.iter().map(|f| (f.id, f.name.clone())).collect();
        for (faction, name) in roster {
            if rng.next_in_range(1, 100) > WAR_THRESHOLD {
                let event = NarrativeEvent {
                    id: self.next_id(),
                    kind: NarrativeKind::WarDeclared { faction, name },
                    description: "A faction declares war on another faction.".to_string(),
                };
                registered.push(event.clone());
                self.register_event(event, factions, rng);
            }
        }

        registered
    }

    /// Opening storyline events. These are never applied.
    #[must_use]
    pub fn opening_events(&self) -> &[NarrativeEvent] {
        &self.opening
    }

    /// The most recently applied events, oldest first.
    #[must_use]
    pub fn historical_events(&self) -> &[NarrativeEvent] {
        &self.history
    }

    /// Events applied since the engine was created.
    #[must_use]
    pub fn applied_count(&self) -> u64 {
        self.applied
    }
}
