//! Autonomous non-player entities.
//!
//! Behaviour is a plain enum dispatched in [`AiSystem::update`]; each
//! entity takes one action per tick against the shared structures.

use serde::{Deserialize, Serialize};

use crate::entities::{EntityId, Position, Structure};
use crate::rng::{pick_index, RandomSource};

/// Smallest sabotage damage.
pub const SABOTAGE_MIN: u32 = 5;
/// Largest sabotage damage.
pub const SABOTAGE_MAX: u32 = 15;
/// Durability restored per repair.
pub const REPAIR_AMOUNT: u32 = 10;
/// Largest wander step per axis.
pub const WANDER_STEP: i32 = 10;

/// How an AI entity behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AiBehaviour {
    /// Sabotages structures.
    Hostile,
    /// Wanders around.
    Neutral,
    /// Repairs structures.
    Friendly,
}

/// A non-player entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiEntity {
    /// Unique identifier.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// World position.
    pub position: Position,
    /// Behaviour driving its actions.
    pub behaviour: AiBehaviour,
}

impl AiEntity {
    /// Create an AI entity.
    #[must_use]
    pub fn new(id: EntityId, name: impl Into<String>, position: Position, behaviour: AiBehaviour) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            behaviour,
        }
    }
}

/// An action an AI entity took during a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AiAction {
    /// Damaged a structure.
    Sabotage {
        /// Acting entity.
        ai: EntityId,
        /// Damaged structure.
        structure: EntityId,
        /// Durability removed.
        damage: u32,
    },
    /// Moved to a new position.
    Wander {
        /// Acting entity.
        ai: EntityId,
        /// New position.
        to: Position,
    },
    /// Repaired a structure.
    Repair {
        /// Acting entity.
        ai: EntityId,
        /// Repaired structure.
        structure: EntityId,
        /// Durability restored.
        amount: u32,
    },
    /// Found nothing to do.
    Idle {
        /// Acting entity.
        ai: EntityId,
    },
}

/// Owns every AI entity.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AiSystem {
    entities: Vec<AiEntity>,
}

impl AiSystem {
    /// Create an empty AI system.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an AI entity.
    pub fn add_entity(&mut self, entity: AiEntity) {
        self.entities.push(entity);
    }

    /// Registered entities.
    #[must_use]
    pub fn entities(&self) -> &[AiEntity] {
        &self.entities
    }

    /// Let every entity act once, in registration order.
    pub fn update(&mut self, structures: &mut [Structure], rng: &mut dyn RandomSource) -> Vec<AiAction> {
        let mut actions = Vec::with_capacity(self.entities.len());
        for entity in &mut self.entities {
            let action = match entity.behaviour {
                AiBehaviour::Hostile => sabotage(entity, structures, rng),
                AiBehaviour::Neutral => wander(entity, rng),
                AiBehaviour::Friendly => repair(entity, structures),
            };
            tracing::trace!(ai = entity.id, ?action, "AI acted");
            actions.push(action);
        }
        actions
    }
}

fn sabotage(entity: &AiEntity, structures: &mut [Structure], rng: &mut dyn RandomSource) -> AiAction {
    let Some(index) = pick_index(rng, structures.len()) else {
        return AiAction::Idle { ai: entity.id };
    };
    let roll = rng.next_in_range(i64::from(SABOTAGE_MIN), i64::from(SABOTAGE_MAX) + 1);
    let damage = u32::try_from(roll).unwrap_or(SABOTAGE_MIN);

    let target = &mut structures[index];
    target.damage(damage);
    AiAction::Sabotage {
        ai: entity.id,
        structure: target.id,
        damage,
    }
}

fn wander(entity: &mut AiEntity, rng: &mut dyn RandomSource) -> AiAction {
    let mut step = || {
        let roll = rng.next_in_range(-i64::from(WANDER_STEP), i64::from(WANDER_STEP) + 1);
        i32::try_from(roll).unwrap_or(0)
    };
    let dx = step();
    let dy = step();
    entity.position = entity.position.offset(dx, dy, 0);
    AiAction::Wander {
        ai: entity.id,
        to: entity.position,
    }
}

fn repair(entity: &AiEntity, structures: &mut [Structure]) -> AiAction {
    let target = structures
        .iter_mut()
        .filter(|s| s.missing_durability() > 0)
        .reduce(|most, s| {
            if s.missing_durability() > most.missing_durability() {
                s
            } else {
                most
            }
        });

    match target {
        Some(structure) => {
            let before = structure.durability;
            structure.repair(REPAIR_AMOUNT);
            AiAction::Repair {
                ai: entity.id,
                structure: structure.id,
                amount: structure.durability - before,
            }
        }
        None => AiAction::Idle { ai: entity.id },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{ScriptedRandom, SeededRandom};

    fn structures() -> Vec<Structure> {
        let mut hull = Structure::new(1, "Hull", Position::ORIGIN, 100);
        let mut dome = Structure::new(2, "Dome", Position::ORIGIN, 100);
        hull.damage(5);
        dome.damage(30);
        vec![hull, dome]
    }

    #[test]
    fn test_friendly_repairs_most_damaged() {
        let mut ai = AiSystem::new();
        ai.add_entity(AiEntity::new(1, "Medic", Position::ORIGIN, AiBehaviour::Friendly));
        let mut structures = structures();
        let mut rng = SeededRandom::new(1);

        let actions = ai.update(&mut structures, &mut rng);

        assert_eq!(
            actions,
            vec![AiAction::Repair {
                ai: 1,
                structure: 2,
                amount: REPAIR_AMOUNT
            }]
        );
        assert_eq!(structures[1].durability, 80);
    }

    #[test]
    fn test_hostile_sabotages() {
        let mut ai = AiSystem::new();
        ai.add_entity(AiEntity::new(1, "Saboteur", Position::ORIGIN, AiBehaviour::Hostile));
        let mut structures = structures();
        // Structure index 0, then damage 12
        let mut rng = ScriptedRandom::new([0, 12]);

        let actions = ai.update(&mut structures, &mut rng);

        assert_eq!(
            actions,
            vec![AiAction::Sabotage {
                ai: 1,
                structure: 1,
                damage: 12
            }]
        );
        assert_eq!(structures[0].durability, 83);
    }

    #[test]
    fn test_neutral_wanders_within_step() {
        let mut ai = AiSystem::new();
        ai.add_entity(AiEntity::new(1, "Drifter", Position::ORIGIN, AiBehaviour::Neutral));
        let mut rng = SeededRandom::new(12);

        for _ in 0..20 {
            let before = ai.entities()[0].position;
            ai.update(&mut [], &mut rng);
            let after = ai.entities()[0].position;
            assert!((after.x - before.x).abs() <= WANDER_STEP);
            assert!((after.y - before.y).abs() <= WANDER_STEP);
            assert_eq!(after.z, before.z);
        }
    }

    #[test]
    fn test_idle_without_targets() {
        let mut ai = AiSystem::new();
        ai.add_entity(AiEntity::new(1, "Saboteur", Position::ORIGIN, AiBehaviour::Hostile));
        ai.add_entity(AiEntity::new(2, "Medic", Position::ORIGIN, AiBehaviour::Friendly));
        let mut rng = SeededRandom::new(1);

        let actions = ai.update(&mut [], &mut rng);
        assert_eq!(actions, vec![AiAction::Idle { ai: 1 }, AiAction::Idle { ai: 2 }]);
    }
}
