//! Fleet combat and fleet operations.
//!
//! A fleet's combat power is derived from its ships. Damage removes ships
//! from the end of the roster; fleets left with no ships are disbanded at
//! the end of [`FleetOperations::conduct_operations`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entities::EntityId;
use crate::error::{GameError, Result};
use crate::exploration::Spacecraft;
use crate::factions::FactionId;
use crate::rng::{roll_d20, RandomSource};

/// Unique identifier for a fleet.
pub type FleetId = EntityId;

/// A named group of spacecraft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fleet {
    /// Unique identifier.
    pub id: FleetId,
    /// Display name.
    pub name: String,
    /// Owning faction.
    pub faction_id: FactionId,
    /// Ships in the fleet.
    pub ships: Vec<Spacecraft>,
    /// Cached result of [`calculate_fleet_power`].
    pub combat_power: u64,
}

impl Fleet {
    /// Create a fleet and derive its combat power.
    #[must_use]
    pub fn new(id: FleetId, name: impl Into<String>, faction_id: FactionId, ships: Vec<Spacecraft>) -> Self {
        let mut fleet = Self {
            id,
            name: name.into(),
            faction_id,
            ships,
            combat_power: 0,
        };
        fleet.update_combat_power();
        fleet
    }

    /// Recompute the cached combat power.
    pub fn update_combat_power(&mut self) {
        self.combat_power = calculate_fleet_power(self);
    }

    /// Check if the fleet has no ships left.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.ships.is_empty()
    }
}

/// Sum of every ship's fuel level.
#[must_use]
pub fn calculate_fleet_power(fleet: &Fleet) -> u64 {
    fleet.ships.iter().map(|s| u64::from(s.fuel_level)).sum()
}

/// How a fleet engagement ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FleetOutcome {
    /// The defender lost ships but survived.
    Damaged {
        /// Ships removed from the defender.
        ships_destroyed: u32,
    },
    /// The defender lost every ship.
    Destroyed,
    /// The defender held without losses.
    Repelled,
}

/// Result of one fleet engagement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetCombatResult {
    /// Fleet that won.
    pub winner: FleetId,
    /// Fleet that lost.
    pub loser: FleetId,
    /// How the engagement ended.
    pub outcome: FleetOutcome,
    /// Human-readable log line.
    pub detail: String,
}

/// Resolve an engagement between two fleets.
///
/// Uses the cached combat power; call [`Fleet::update_combat_power`]
/// first if the ships changed. Only the defender can lose ships.
pub fn simulate_fleet_combat(
    attacker: &Fleet,
    defender: &mut Fleet,
    rng: &mut dyn RandomSource,
) -> FleetCombatResult {
    let attack = i128::from(attacker.combat_power) + i128::from(roll_d20(rng));
    let defense = i128::from(defender.combat_power) + i128::from(roll_d20(rng));

    if attack <= defense {
        return FleetCombatResult {
            winner: defender.id,
            loser: attacker.id,
            outcome: FleetOutcome::Repelled,
            detail: format!(
                "{} successfully defends against {}.",
                defender.name, attacker.name
            ),
        };
    }

    let damage = usize::try_from(attack - defense).unwrap_or(usize::MAX);
    let before = defender.ships.len();
    defender.ships.truncate(before.saturating_sub(damage));

    let (outcome, detail) = if defender.ships.is_empty() {
        (
            FleetOutcome::Destroyed,
            format!("{} destroys {} completely!", attacker.name, defender.name),
        )
    } else {
        let ships_destroyed = u32::try_from(damage).unwrap_or(u32::MAX);
        (
            FleetOutcome::Damaged { ships_destroyed },
            format!(
                "{} damages {}, destroying {} ships.",
                attacker.name, defender.name, damage
            ),
        )
    };

    FleetCombatResult {
        winner: attacker.id,
        loser: defender.id,
        outcome,
        detail,
    }
}

/// A queued engagement and how it resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetEngagementReport {
    /// Attacking fleet.
    pub attacker: FleetId,
    /// Defending fleet.
    pub defender: FleetId,
    /// Resolution.
    pub result: FleetCombatResult,
}

/// Owns every fleet and the queue of pending engagements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetOperations {
    fleets: BTreeMap<FleetId, Fleet>,
    queued: Vec<(FleetId, FleetId)>,
    next_id: FleetId,
}

impl Default for FleetOperations {
    fn default() -> Self {
        Self::new()
    }
}

impl FleetOperations {
    /// Create an empty fleet registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            fleets: BTreeMap::new(),
            queued: Vec::new(),
            next_id: 1,
        }
    }

    /// Form a fleet from ships.
    pub fn form_fleet(
        &mut self,
        name: impl Into<String>,
        faction: FactionId,
        ships: Vec<Spacecraft>,
    ) -> FleetId {
        let id = self.next_id;
        self.next_id += 1;

        let fleet = Fleet::new(id, name, faction, ships);
        tracing::info!(fleet = id, name = %fleet.name, ships = fleet.ships.len(), power = fleet.combat_power, "Fleet formed");
        self.fleets.insert(id, fleet);
        id
    }

    /// Queue an engagement for the next operations pass.
    pub fn queue_engagement(&mut self, attacker: FleetId, defender: FleetId) -> Result<()> {
        if attacker == defender {
            return Err(GameError::InvalidTarget(format!(
                "fleet {attacker} cannot engage itself"
            )));
        }
        self.get(attacker)?;
        self.get(defender)?;
        self.queued.push((attacker, defender));
        Ok(())
    }

    /// Resolve every queued engagement.
    ///
    /// Combat power is recomputed for all fleets first. Engagements whose
    /// fleets were destroyed earlier in the pass are skipped. Destroyed
    /// fleets are removed afterwards.
    pub fn conduct_operations(&mut self, rng: &mut dyn RandomSource) -> Vec<FleetEngagementReport> {
        for fleet in self.fleets.values_mut() {
            fleet.update_combat_power();
        }

        let mut reports = Vec::new();
        for (attacker_id, defender_id) in std::mem::take(&mut self.queued) {
            let Some(attacker) = self.fleets.get(&attacker_id).filter(|f| !f.is_destroyed()).cloned()
            else {
                continue;
            };
            let Some(defender) = self
                .fleets
                .get_mut(&defender_id)
                .filter(|f| !f.is_destroyed())
            else {
                continue;
            };

            let result = simulate_fleet_combat(&attacker, defender, rng);
            defender.update_combat_power();
            tracing::debug!(attacker = attacker_id, defender = defender_id, detail = %result.detail, "Fleet engagement");

            reports.push(FleetEngagementReport {
                attacker: attacker_id,
                defender: defender_id,
                result,
            });
        }

        self.fleets.retain(|id, fleet| {
            if fleet.is_destroyed() {
                tracing::info!(fleet = *id, name = %fleet.name, "Fleet destroyed");
                false
            } else {
                true
            }
        });

        reports
    }

    /// Look up a fleet.
    pub fn get(&self, id: FleetId) -> Result<&Fleet> {
        self.fleets.get(&id).ok_or(GameError::FleetNotFound(id))
    }

    /// Iterate over fleets in ID order.
    pub fn iter(&self) -> impl Iterator<Item = &Fleet> {
        self.fleets.values()
    }

    /// Number of fleets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fleets.len()
    }

    /// Check if there are no fleets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fleets.is_empty()
    }

    /// Engagements waiting for the next pass.
    #[must_use]
    pub fn queued(&self) -> &[(FleetId, FleetId)] {
        &self.queued
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{ScriptedRandom, SeededRandom};

    const UNION: FactionId = FactionId(1000);
    const SYNDICATE: FactionId = FactionId(1001);

    fn ships(count: u64, fuel: u32) -> Vec<Spacecraft> {
        (0..count)
            .map(|i| Spacecraft::new(i + 1, format!("Ship {i}"), UNION).with_fuel(fuel))
            .collect()
    }

    #[test]
    fn test_fleet_power_is_fuel_sum() {
        let mut fleet = Fleet::new(1, "Home Guard", UNION, ships(3, 40));
        assert_eq!(fleet.combat_power, 120);
        fleet.update_combat_power();
        fleet.update_combat_power();
        assert_eq!(fleet.combat_power, 120);
    }

    #[test]
    fn test_zero_power_defender_wins() {
        let attacker = Fleet::new(1, "Raiders", UNION, ships(1, 0));
        let mut defender = Fleet::new(2, "Pickets", SYNDICATE, ships(1, 0));
        let mut rng = ScriptedRandom::new([5, 10]);

        let result = simulate_fleet_combat(&attacker, &mut defender, &mut rng);

        assert_eq!(result.outcome, FleetOutcome::Repelled);
        assert_eq!(result.winner, 2);
        assert_eq!(defender.ships.len(), 1);
        assert_eq!(result.detail, "Pickets successfully defends against Raiders.");
    }

    #[test]
    fn test_damage_truncates_ships() {
        let attacker = Fleet::new(1, "Raiders", UNION, ships(1, 0));
        let mut defender = Fleet::new(2, "Pickets", SYNDICATE, ships(5, 0));
        let mut rng = ScriptedRandom::new([10, 7]);

        let result = simulate_fleet_combat(&attacker, &mut defender, &mut rng);

        assert_eq!(result.outcome, FleetOutcome::Damaged { ships_destroyed: 3 });
        assert_eq!(defender.ships.len(), 2);
        assert_eq!(defender.ships[0].id, 1);
        assert_eq!(result.detail, "Raiders damages Pickets, destroying 3 ships.");
    }

    #[test]
    fn test_overwhelming_damage_destroys() {
        let attacker = Fleet::new(1, "Armada", UNION, ships(2, 100));
        let mut defender = Fleet::new(2, "Pickets", SYNDICATE, ships(3, 0));
        let mut rng = ScriptedRandom::new([1, 20]);

        let result = simulate_fleet_combat(&attacker, &mut defender, &mut rng);

        assert_eq!(result.outcome, FleetOutcome::Destroyed);
        assert!(defender.is_destroyed());
        assert_eq!(result.detail, "Armada destroys Pickets completely!");
    }

    #[test]
    fn test_operations_remove_destroyed_fleets() {
        let mut ops = FleetOperations::new();
        let armada = ops.form_fleet("Armada", UNION, ships(3, 100));
        let pickets = ops.form_fleet("Pickets", SYNDICATE, ships(2, 0));

        ops.queue_engagement(armada, pickets).unwrap();
        ops.queue_engagement(armada, pickets).unwrap();
        let mut rng = SeededRandom::new(4);
        let reports = ops.conduct_operations(&mut rng);

        // Second order skipped: the pickets were already gone
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].result.outcome, FleetOutcome::Destroyed);
        assert!(ops.get(pickets).is_err());
        assert_eq!(ops.len(), 1);
        assert!(ops.queued().is_empty());
    }

    #[test]
    fn test_queue_rejects_bad_orders() {
        let mut ops = FleetOperations::new();
        let armada = ops.form_fleet("Armada", UNION, ships(1, 10));
        assert!(matches!(
            ops.queue_engagement(armada, armada),
            Err(GameError::InvalidTarget(_))
        ));
        assert_eq!(
            ops.queue_engagement(armada, 99),
            Err(GameError::FleetNotFound(99))
        );
    }
}
