//! Faction registry: membership, diplomacy and reputation.
//!
//! Alliances and enmities are symmetric and stored as sets of faction IDs,
//! so relations never hold references to other factions.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entities::{EntityId, Inventory, Player};
use crate::error::{GameError, Result};
use crate::resources::{ENERGY, FOOD};
use crate::technology::TechId;

/// First ID handed out by [`FactionRegistry::create_faction`].
pub const FIRST_FACTION_ID: u32 = 1000;

/// Unique identifier for a faction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FactionId(pub u32);

impl fmt::Display for FactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bonuses a faction has unlocked through research.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FactionModifiers {
    /// Percentage bonus to food production.
    pub food_production_percent: u32,
    /// Percentage bonus to energy production.
    pub energy_efficiency_percent: u32,
    /// Whether the faction can survey for new planets.
    pub interstellar_travel: bool,
}

impl FactionModifiers {
    /// Scale a production amount by the bonus matching the resource.
    ///
    /// Rounds down. Resources without a matching bonus are unchanged.
    #[must_use]
    pub fn boost_production(&self, resource: &str, amount: u32) -> u32 {
        let percent = match resource {
            FOOD => self.food_production_percent,
            ENERGY => self.energy_efficiency_percent,
            _ => 0,
        };
        let boosted = u64::from(amount) * (100 + u64::from(percent)) / 100;
        u32::try_from(boosted).unwrap_or(u32::MAX)
    }
}

/// A group of players acting together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faction {
    /// Unique identifier.
    pub id: FactionId,
    /// Display name.
    pub name: String,
    /// Member player IDs.
    pub members: BTreeSet<EntityId>,
    /// Standing with the wider galaxy.
    pub reputation: i32,
    /// Allied factions.
    pub alliances: BTreeSet<FactionId>,
    /// Hostile factions.
    pub enemies: BTreeSet<FactionId>,
    /// Technologies in the order they were completed.
    pub researched_technologies: Vec<TechId>,
    /// Spendable credits.
    pub credits: u64,
    /// Shared goods bought on the market.
    pub stockpile: Inventory,
    /// Research bonuses.
    pub modifiers: FactionModifiers,
}

impl Faction {
    /// Create a faction with no relations.
    #[must_use]
    pub fn new(id: FactionId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            members: BTreeSet::new(),
            reputation: 0,
            alliances: BTreeSet::new(),
            enemies: BTreeSet::new(),
            researched_technologies: Vec::new(),
            credits: 0,
            stockpile: Inventory::new(),
            modifiers: FactionModifiers::default(),
        }
    }

    /// Check if the faction has completed a technology.
    #[must_use]
    pub fn has_researched(&self, technology: TechId) -> bool {
        self.researched_technologies.contains(&technology)
    }

    /// Check if a player belongs to the faction.
    #[must_use]
    pub fn is_member(&self, player: EntityId) -> bool {
        self.members.contains(&player)
    }
}

/// Owns every faction and hands out IDs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactionRegistry {
    factions: BTreeMap<FactionId, Faction>,
    next_id: u32,
    starting_credits: u64,
}

impl Default for FactionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FactionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            factions: BTreeMap::new(),
            next_id: FIRST_FACTION_ID,
            starting_credits: 0,
        }
    }

    /// Builder method to set the credits new factions start with.
    #[must_use]
    pub const fn with_starting_credits(mut self, credits: u64) -> Self {
        self.starting_credits = credits;
        self
    }

    /// Create a faction with initial members.
    ///
    /// Callers are responsible for pointing the members' `faction` field at
    /// the new ID; [`Self::manage`] otherwise drops them again.
    pub fn create_faction(
        &mut self,
        name: impl Into<String>,
        members: impl IntoIterator<Item = EntityId>,
    ) -> FactionId {
        let id = FactionId(self.next_id);
        self.next_id += 1;

        let mut faction = Faction::new(id, name);
        faction.members.extend(members);
        faction.credits = self.starting_credits;

        tracing::info!(faction = %id, name = %faction.name, members = faction.members.len(), "Faction created");
        self.factions.insert(id, faction);
        id
    }

    /// Remove a faction and every relation pointing at it.
    pub fn disband_faction(&mut self, id: FactionId) -> Result<Faction> {
        let faction = self
            .factions
            .remove(&id)
            .ok_or(GameError::FactionNotFound(id))?;

        for other in self.factions.values_mut() {
            other.alliances.remove(&id);
            other.enemies.remove(&id);
        }

        tracing::info!(faction = %id, name = %faction.name, "Faction disbanded");
        Ok(faction)
    }

    /// Add a player to a faction.
    pub fn add_member(&mut self, id: FactionId, player: EntityId) -> Result<()> {
        self.get_mut(id)?.members.insert(player);
        Ok(())
    }

    /// Remove a player from a faction.
    pub fn remove_member(&mut self, id: FactionId, player: EntityId) -> Result<()> {
        self.get_mut(id)?.members.remove(&player);
        Ok(())
    }

    /// Ally two factions. Idempotent.
    pub fn form_alliance(&mut self, a: FactionId, b: FactionId) -> Result<()> {
        let (first, second) = self.pair_mut(a, b)?;
        first.alliances.insert(b);
        second.alliances.insert(a);
        Ok(())
    }

    /// Make two factions enemies. Idempotent.
    pub fn declare_enmity(&mut self, a: FactionId, b: FactionId) -> Result<()> {
        let (first, second) = self.pair_mut(a, b)?;
        first.enemies.insert(b);
        second.enemies.insert(a);
        tracing::debug!(%a, %b, "Enmity declared");
        Ok(())
    }

    /// Shift a faction's reputation, returning the new value.
    pub fn update_reputation(&mut self, id: FactionId, change: i32) -> Result<i32> {
        let faction = self.get_mut(id)?;
        faction.reputation = faction.reputation.saturating_add(change);
        Ok(faction.reputation)
    }

    /// Look up a faction.
    pub fn get(&self, id: FactionId) -> Result<&Faction> {
        self.factions.get(&id).ok_or(GameError::FactionNotFound(id))
    }

    /// Look up a faction mutably.
    pub fn get_mut(&mut self, id: FactionId) -> Result<&mut Faction> {
        self.factions
            .get_mut(&id)
            .ok_or(GameError::FactionNotFound(id))
    }

    /// Borrow two distinct factions mutably at once.
    pub fn pair_mut(&mut self, a: FactionId, b: FactionId) -> Result<(&mut Faction, &mut Faction)> {
        if a == b {
            return Err(GameError::InvalidTarget(format!(
                "faction {a} cannot relate to itself"
            )));
        }

        let mut first = None;
        let mut second = None;
        for (id, faction) in &mut self.factions {
            if *id == a {
                first = Some(faction);
            } else if *id == b {
                second = Some(faction);
            }
        }

        match (first, second) {
            (Some(first), Some(second)) => Ok((first, second)),
            (None, _) => Err(GameError::FactionNotFound(a)),
            (_, None) => Err(GameError::FactionNotFound(b)),
        }
    }

    /// The faction a player belongs to, if any.
    #[must_use]
    pub fn faction_of(&self, player: EntityId) -> Option<&Faction> {
        self.factions.values().find(|f| f.is_member(player))
    }

    /// Iterate over factions in ID order.
    pub fn iter(&self) -> impl Iterator<Item = &Faction> {
        self.factions.values()
    }

    /// Iterate mutably over factions in ID order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Faction> {
        self.factions.values_mut()
    }

    /// All faction IDs in order.
    #[must_use]
    pub fn ids(&self) -> Vec<FactionId> {
        self.factions.keys().copied().collect()
    }

    /// Number of factions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factions.len()
    }

    /// Check if there are no factions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factions.is_empty()
    }

    /// Reconcile memberships with player records.
    ///
    /// A player's `faction` field is authoritative. Players pointing at a
    /// faction that no longer exists are cleared. Factions left without
    /// members are disbanded; their IDs are returned.
    pub fn manage(&mut self, players: &mut [Player]) -> Vec<FactionId> {
        for faction in self.factions.values_mut() {
            faction.members.clear();
        }

        for player in players.iter_mut() {
            let Some(id) = player.faction else {
                continue;
            };
            match self.factions.get_mut(&id) {
                Some(faction) => {
                    faction.members.insert(player.id);
                }
                None => {
                    tracing::debug!(player = player.id, faction = %id, "Clearing stale faction membership");
                    player.faction = None;
                }
            }
        }

        let empty: Vec<FactionId> = self
            .factions
            .values()
            .filter(|f| f.members.is_empty())
            .map(|f| f.id)
            .collect();

        for id in &empty {
            // Present: collected from the map above
            let _ = self.disband_faction(*id);
        }
        empty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Position;

    #[test]
    fn test_faction_ids_are_sequential() {
        let mut registry = FactionRegistry::new();
        let a = registry.create_faction("Union", [1]);
        let b = registry.create_faction("Syndicate", [2]);
        assert_eq!(a, FactionId(FIRST_FACTION_ID));
        assert_eq!(b, FactionId(FIRST_FACTION_ID + 1));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_alliance_is_symmetric_and_idempotent() {
        let mut registry = FactionRegistry::new();
        let a = registry.create_faction("Union", [1]);
        let b = registry.create_faction("Syndicate", [2]);

        registry.form_alliance(a, b).unwrap();
        registry.form_alliance(b, a).unwrap();

        assert_eq!(registry.get(a).unwrap().alliances.len(), 1);
        assert!(registry.get(b).unwrap().alliances.contains(&a));
    }

    #[test]
    fn test_self_relation_rejected() {
        let mut registry = FactionRegistry::new();
        let a = registry.create_faction("Union", [1]);
        let err = registry.declare_enmity(a, a).unwrap_err();
        assert!(matches!(err, GameError::InvalidTarget(_)));
    }

    #[test]
    fn test_unknown_faction() {
        let mut registry = FactionRegistry::new();
        let a = registry.create_faction("Union", [1]);
        assert_eq!(
            registry.form_alliance(a, FactionId(9)).unwrap_err(),
            GameError::FactionNotFound(FactionId(9))
        );
        assert_eq!(
            registry.update_reputation(FactionId(9), 5).unwrap_err(),
            GameError::FactionNotFound(FactionId(9))
        );
    }

    #[test]
    fn test_disband_clears_relations() {
        let mut registry = FactionRegistry::new();
        let a = registry.create_faction("Union", [1]);
        let b = registry.create_faction("Syndicate", [2]);
        registry.declare_enmity(a, b).unwrap();

        registry.disband_faction(b).unwrap();
        assert!(registry.get(a).unwrap().enemies.is_empty());
        assert!(registry.get(b).is_err());
    }

    #[test]
    fn test_manage_reconciles_and_disbands() {
        let mut registry = FactionRegistry::new();
        let a = registry.create_faction("Union", [1]);
        let b = registry.create_faction("Syndicate", [2]);

        let mut players = vec![
            Player::new(1, "Ana", Position::ORIGIN, 100),
            Player::new(2, "Bo", Position::ORIGIN, 100),
            Player::new(3, "Cy", Position::ORIGIN, 100),
        ];
        players[0].faction = Some(a);
        players[1].faction = None;
        players[2].faction = Some(FactionId(42));

        let disbanded = registry.manage(&mut players);

        assert_eq!(disbanded, vec![b]);
        assert!(registry.get(a).unwrap().is_member(1));
        assert_eq!(players[2].faction, None);
    }

    #[test]
    fn test_reputation_saturates() {
        let mut registry = FactionRegistry::new();
        let a = registry.create_faction("Union", [1]);
        registry.update_reputation(a, i32::MAX).unwrap();
        assert_eq!(registry.update_reputation(a, 10).unwrap(), i32::MAX);
    }

    #[test]
    fn test_boost_production() {
        let modifiers = FactionModifiers {
            food_production_percent: 20,
            energy_efficiency_percent: 25,
            interstellar_travel: false,
        };
        assert_eq!(modifiers.boost_production(FOOD, 10), 12);
        assert_eq!(modifiers.boost_production(ENERGY, 10), 12);
        assert_eq!(modifiers.boost_production("water", 10), 10);
    }
}
