//! Serializable view of the whole world, and its state hash.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::entities::{Player, Structure};
use crate::economy::Market;
use crate::exploration::Spacecraft;
use crate::factions::{Faction, FactionId};
use crate::fleet::Fleet;
use crate::hazards::EnvironmentalHazard;
use crate::narrative::NarrativeEvent;
use crate::technology::ResearchProject;
use crate::world::Planet;

/// Everything a client needs to render the world after a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Ticks completed.
    pub tick: u64,
    /// Players in roster order.
    pub players: Vec<Player>,
    /// Factions in ID order.
    pub factions: Vec<Faction>,
    /// Shared structures.
    pub structures: Vec<Structure>,
    /// Every known planet.
    pub planets: Vec<Planet>,
    /// Active hazards per planet.
    pub hazards: Vec<(String, Vec<EnvironmentalHazard>)>,
    /// Spacecraft not assigned to a fleet.
    pub spacecraft: Vec<Spacecraft>,
    /// Fleets in ID order.
    pub fleets: Vec<Fleet>,
    /// Open markets.
    pub markets: Vec<(FactionId, Market)>,
    /// Research in progress.
    pub research: Vec<ResearchProject>,
    /// Most recent applied narrative events, capped at [`crate::narrative::HISTORY_LIMIT`].
    pub history: Vec<NarrativeEvent>,
}

impl WorldSnapshot {
    /// Hash of the snapshot's binary encoding.
    ///
    /// Two simulations fed the same seed and commands produce the same
    /// hash after the same number of ticks.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let bytes = match bincode::serialize(self) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(error = %e, "Snapshot encoding failed");
                Vec::new()
            }
        };
        let mut hasher = DefaultHasher::new();
        bytes.hash(&mut hasher);
        hasher.finish()
    }
}
