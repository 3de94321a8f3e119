//! Spacecraft launch, travel and planet surveys.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entities::{EntityId, Position};
use crate::error::{GameError, Result};
use crate::factions::FactionId;
use crate::world::Planet;

/// Fuel a newly launched spacecraft carries.
pub const LAUNCH_FUEL: u32 = 100;
/// Cargo slots a newly launched spacecraft carries.
pub const LAUNCH_CAPACITY: u32 = 500;
/// Fuel burned per move.
pub const MOVE_FUEL_COST: u32 = 10;

/// A faction-owned spacecraft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spacecraft {
    /// Unique identifier.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Owning faction.
    pub faction_id: FactionId,
    /// Location in space.
    pub position: Position,
    /// Remaining fuel. Also drives fleet combat power.
    pub fuel_level: u32,
    /// Free cargo slots for gathered resources.
    pub resource_capacity: u32,
}

impl Spacecraft {
    /// Create a fully fuelled spacecraft at the origin.
    #[must_use]
    pub fn new(id: EntityId, name: impl Into<String>, faction_id: FactionId) -> Self {
        Self {
            id,
            name: name.into(),
            faction_id,
            position: Position::ORIGIN,
            fuel_level: LAUNCH_FUEL,
            resource_capacity: LAUNCH_CAPACITY,
        }
    }

    /// Builder method to set the fuel level.
    #[must_use]
    pub const fn with_fuel(mut self, fuel_level: u32) -> Self {
        self.fuel_level = fuel_level;
        self
    }
}

/// Owns every spacecraft not assigned to a fleet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceExploration {
    spacecraft: BTreeMap<EntityId, Spacecraft>,
    next_id: EntityId,
}

impl Default for SpaceExploration {
    fn default() -> Self {
        Self::new()
    }
}

impl SpaceExploration {
    /// Create an empty hangar.
    #[must_use]
    pub fn new() -> Self {
        Self {
            spacecraft: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Launch a new spacecraft for a faction.
    pub fn launch_spacecraft(&mut self, faction: FactionId, name: impl Into<String>) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;

        let craft = Spacecraft::new(id, name, faction);
        tracing::info!(spacecraft = id, name = %craft.name, faction = %faction, "Spacecraft launched");
        self.spacecraft.insert(id, craft);
        id
    }

    /// Move a spacecraft, burning fuel. Returns the remaining fuel.
    pub fn move_spacecraft(&mut self, id: EntityId, destination: Position) -> Result<u32> {
        let craft = self.get_mut(id)?;
        if craft.fuel_level == 0 {
            return Err(GameError::InsufficientFuel(id));
        }

        craft.position = destination;
        craft.fuel_level = craft.fuel_level.saturating_sub(MOVE_FUEL_COST);
        tracing::debug!(
            spacecraft = id,
            x = destination.x,
            y = destination.y,
            z = destination.z,
            fuel = craft.fuel_level,
            "Spacecraft moved"
        );
        Ok(craft.fuel_level)
    }

    /// Gather resources from a planet, up to the free cargo capacity.
    pub fn explore_planet(&mut self, id: EntityId, planet: &Planet) -> Result<Vec<String>> {
        let craft = self.get_mut(id)?;
        if craft.resource_capacity == 0 {
            return Err(GameError::NoCargoCapacity(id));
        }

        let take = usize::try_from(craft.resource_capacity).unwrap_or(usize::MAX);
        let found: Vec<String> = planet.resources.iter().take(take).cloned().collect();
        craft.resource_capacity = craft
            .resource_capacity
            .saturating_sub(u32::try_from(found.len()).unwrap_or(u32::MAX));

        tracing::debug!(spacecraft = id, planet = %planet.name, found = found.len(), "Planet explored");
        Ok(found)
    }

    /// Remove spacecraft for fleet formation.
    ///
    /// Every ID must exist and belong to `faction`; otherwise nothing is
    /// removed.
    pub fn take_ships(&mut self, faction: FactionId, ids: &[EntityId]) -> Result<Vec<Spacecraft>> {
        for id in ids {
            self.owned_by(*id, faction)?;
        }
        Ok(ids
            .iter()
            .filter_map(|id| self.spacecraft.remove(id))
            .collect())
    }

    /// Look up a spacecraft and check its owner.
    pub fn owned_by(&self, id: EntityId, faction: FactionId) -> Result<&Spacecraft> {
        let craft = self.get(id)?;
        if craft.faction_id != faction {
            return Err(GameError::InvalidTarget(format!(
                "spacecraft {id} does not belong to faction {faction}"
            )));
        }
        Ok(craft)
    }

    /// Look up a spacecraft.
    pub fn get(&self, id: EntityId) -> Result<&Spacecraft> {
        self.spacecraft
            .get(&id)
            .ok_or(GameError::SpacecraftNotFound(id))
    }

    fn get_mut(&mut self, id: EntityId) -> Result<&mut Spacecraft> {
        self.spacecraft
            .get_mut(&id)
            .ok_or(GameError::SpacecraftNotFound(id))
    }

    /// Iterate over spacecraft in ID order.
    pub fn iter(&self) -> impl Iterator<Item = &Spacecraft> {
        self.spacecraft.values()
    }

    /// Number of spacecraft in the hangar.
    #[must_use]
    pub fn len(&self) -> usize {
        self.spacecraft.len()
    }

    /// Check if the hangar is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spacecraft.is_empty()
    }
}
