//! d20 combat: single engagements and the army battle loop.
//!
//! An engagement pits `d20 + attack_power` against `d20 + defense`. Only
//! the defender can take damage, and damage is clamped so health never
//! drops below zero. A battle repeats engagements between randomly
//! chosen members of two rosters until one roster is empty.

use serde::{Deserialize, Serialize};

use crate::entities::{EntityId, Player};
use crate::error::{GameError, Result};
use crate::math::clamp;
use crate::rng::{pick_index, roll_d20, RandomSource};

/// Default cap on engagements per battle.
pub const DEFAULT_MAX_ENGAGEMENTS: u32 = 10_000;

/// A participant in single-exchange combat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combatant {
    /// Unique identifier.
    pub id: EntityId,
    /// Display name used in battle logs.
    pub name: String,
    /// Remaining health.
    pub health: u32,
    /// Added to attack rolls.
    pub attack_power: i32,
    /// Added to defense rolls.
    pub defense: i32,
}

impl Combatant {
    /// Create a combatant.
    #[must_use]
    pub fn new(
        id: EntityId,
        name: impl Into<String>,
        health: u32,
        attack_power: i32,
        defense: i32,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            health,
            attack_power,
            defense,
        }
    }

    /// Build a combatant from a player with combat stats.
    #[must_use]
    pub fn from_player(player: &Player) -> Option<Self> {
        player.combat.map(|stats| {
            Self::new(
                player.id,
                player.name.clone(),
                player.health,
                stats.attack_power,
                stats.defense,
            )
        })
    }

    /// Check if the combatant can still fight.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.health > 0
    }
}

/// Which side of an engagement a combatant was on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// The side that rolled attack.
    Attacker,
    /// The side that rolled defense.
    Defender,
}

/// How an engagement ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngagementOutcome {
    /// The attacker hit and the defender survived.
    Hit,
    /// The attacker hit and brought the defender to zero health.
    FinishingBlow,
    /// The defender held.
    Defended,
}

/// Result of one engagement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementResult {
    /// Side that won the exchange.
    pub winner: Side,
    /// Side that lost the exchange.
    pub loser: Side,
    /// ID of the winning combatant.
    pub winner_id: EntityId,
    /// ID of the losing combatant.
    pub loser_id: EntityId,
    /// How the exchange ended.
    pub outcome: EngagementOutcome,
    /// Damage dealt to the defender.
    pub damage: u32,
    /// Human-readable log line.
    pub detail: String,
}

/// Resolve a single exchange. Only the defender's health changes.
pub fn resolve_engagement(
    attacker: &Combatant,
    defender: &mut Combatant,
    rng: &mut dyn RandomSource,
) -> EngagementResult {
    let attack_roll = roll_d20(rng) + i64::from(attacker.attack_power);
    let defense_roll = roll_d20(rng) + i64::from(defender.defense);

    tracing::trace!(
        attacker = attacker.id,
        defender = defender.id,
        attack_roll,
        defense_roll,
        "Engagement rolls"
    );

    if attack_roll <= defense_roll {
        return EngagementResult {
            winner: Side::Defender,
            loser: Side::Attacker,
            winner_id: defender.id,
            loser_id: attacker.id,
            outcome: EngagementOutcome::Defended,
            damage: 0,
            detail: format!(
                "{} defends successfully against {}.",
                defender.name, attacker.name
            ),
        };
    }

    let damage = clamp(
        attack_roll - defense_roll,
        1,
        i64::from(defender.health),
    );
    let damage = u32::try_from(damage).unwrap_or(1);
    defender.health = defender.health.saturating_sub(damage);

    let (outcome, detail) = if defender.health == 0 {
        (
            EngagementOutcome::FinishingBlow,
            format!(
                "{} defeats {} with a final blow of {} damage!",
                attacker.name, defender.name, damage
            ),
        )
    } else {
        (
            EngagementOutcome::Hit,
            format!("{} hits {} for {} damage.", attacker.name, defender.name, damage),
        )
    };

    EngagementResult {
        winner: Side::Attacker,
        loser: Side::Defender,
        winner_id: attacker.id,
        loser_id: defender.id,
        outcome,
        damage,
        detail,
    }
}

/// Tuning for [`simulate_battle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleConfig {
    /// Stop after this many engagements. `None` runs until a roster is empty.
    pub max_engagements: Option<u32>,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            max_engagements: Some(DEFAULT_MAX_ENGAGEMENTS),
        }
    }
}

impl BattleConfig {
    /// Config with no engagement cap.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            max_engagements: None,
        }
    }
}

/// Tally of a battle.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BattleReport {
    /// Attackers removed from their roster.
    pub attackers_losses: u32,
    /// Defenders removed from their roster.
    pub defenders_losses: u32,
    /// One line per engagement.
    pub battle_log: Vec<String>,
    /// Engagements resolved.
    pub engagements: u32,
    /// Set when the engagement cap stopped the battle early.
    pub truncated: bool,
}

/// Fight until one roster is empty.
///
/// Each iteration picks a random member of each current roster and
/// resolves one engagement. A loser at zero health is removed from its
/// roster. Empty rosters end the battle immediately with no losses.
pub fn simulate_battle(
    attackers: &mut Vec<Combatant>,
    defenders: &mut Vec<Combatant>,
    rng: &mut dyn RandomSource,
    config: &BattleConfig,
) -> BattleReport {
    let mut report = BattleReport::default();

    while !attackers.is_empty() && !defenders.is_empty() {
        if config
            .max_engagements
            .is_some_and(|cap| report.engagements >= cap)
        {
            tracing::warn!(
                engagements = report.engagements,
                attackers_left = attackers.len(),
                defenders_left = defenders.len(),
                "Battle truncated at engagement cap"
            );
            report.truncated = true;
            break;
        }

        let (Some(a), Some(d)) = (
            pick_index(rng, attackers.len()),
            pick_index(rng, defenders.len()),
        ) else {
            break;
        };

        let result = resolve_engagement(&attackers[a], &mut defenders[d], rng);
        report.engagements += 1;

        match result.loser {
            Side::Defender if !defenders[d].is_alive() => {
                defenders.remove(d);
                report.defenders_losses += 1;
            }
            Side::Attacker if !attackers[a].is_alive() => {
                attackers.remove(a);
                report.attackers_losses += 1;
            }
            _ => {}
        }

        report.battle_log.push(result.detail);
    }

    tracing::debug!(
        engagements = report.engagements,
        attackers_losses = report.attackers_losses,
        defenders_losses = report.defenders_losses,
        "Battle resolved"
    );
    report
}

/// One player attacks another.
///
/// Both players need combat stats, must be distinct and the target must
/// still be alive. The target's health is written back.
pub fn attack_player(
    attacker: &Player,
    target: &mut Player,
    rng: &mut dyn RandomSource,
) -> Result<EngagementResult> {
    if attacker.id == target.id {
        return Err(GameError::InvalidTarget(format!(
            "player {} cannot attack itself",
            attacker.id
        )));
    }
    if !attacker.is_alive() || !target.is_alive() {
        return Err(GameError::InvalidTarget(format!(
            "player {} or {} is already down",
            attacker.id, target.id
        )));
    }

    let attacking = Combatant::from_player(attacker).ok_or_else(|| {
        GameError::InvalidTarget(format!("player {} cannot fight", attacker.id))
    })?;
    let mut defending = Combatant::from_player(target).ok_or_else(|| {
        GameError::InvalidTarget(format!("player {} cannot fight", target.id))
    })?;

    let result = resolve_engagement(&attacking, &mut defending, rng);
    target.health = defending.health;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{CombatStats, Position};
    use crate::rng::{ScriptedRandom, SeededRandom};

    fn soldier(id: EntityId, health: u32) -> Combatant {
        Combatant::new(id, format!("Soldier {id}"), health, 3, 2)
    }

    #[test]
    fn test_finishing_blow() {
        let attacker = Combatant::new(1, "Raider", 20, 10, 0);
        let mut defender = Combatant::new(2, "Guard", 15, 0, 5);
        let mut rng = ScriptedRandom::new([15, 3]);

        let result = resolve_engagement(&attacker, &mut defender, &mut rng);

        assert_eq!(result.outcome, EngagementOutcome::FinishingBlow);
        assert_eq!(result.winner, Side::Attacker);
        assert_eq!(result.damage, 15);
        assert_eq!(defender.health, 0);
        assert_eq!(result.detail, "Raider defeats Guard with a final blow of 15 damage!");
    }

    #[test]
    fn test_hit_is_clamped_to_at_least_one() {
        let attacker = Combatant::new(1, "Raider", 20, 0, 0);
        let mut defender = Combatant::new(2, "Guard", 15, 0, 0);
        let mut rng = ScriptedRandom::new([11, 10]);

        let result = resolve_engagement(&attacker, &mut defender, &mut rng);

        assert_eq!(result.outcome, EngagementOutcome::Hit);
        assert_eq!(result.damage, 1);
        assert_eq!(defender.health, 14);
        assert_eq!(result.detail, "Raider hits Guard for 1 damage.");
    }

    #[test]
    fn test_tie_goes_to_defender() {
        let attacker = Combatant::new(1, "Raider", 20, 5, 0);
        let mut defender = Combatant::new(2, "Guard", 15, 0, 5);
        let mut rng = ScriptedRandom::new([10, 10]);

        let result = resolve_engagement(&attacker, &mut defender, &mut rng);

        assert_eq!(result.outcome, EngagementOutcome::Defended);
        assert_eq!(result.winner_id, 2);
        assert_eq!(defender.health, 15);
        assert_eq!(result.detail, "Guard defends successfully against Raider.");
    }

    #[test]
    fn test_empty_army() {
        let mut attackers = Vec::new();
        let mut defenders = vec![soldier(1, 10)];
        let mut rng = SeededRandom::new(3);

        let report = simulate_battle(&mut attackers, &mut defenders, &mut rng, &BattleConfig::default());

        assert_eq!(report.attackers_losses, 0);
        assert_eq!(report.defenders_losses, 0);
        assert!(report.battle_log.is_empty());
        assert_eq!(defenders.len(), 1);
    }

    #[test]
    fn test_battle_runs_until_one_side_is_empty() {
        let mut attackers: Vec<_> = (1..=4).map(|id| soldier(id, 12)).collect();
        let mut defenders: Vec<_> = (10..=13).map(|id| soldier(id, 12)).collect();
        let mut rng = SeededRandom::new(2024);

        let report = simulate_battle(&mut attackers, &mut defenders, &mut rng, &BattleConfig::unbounded());

        assert!(attackers.is_empty() || defenders.is_empty());
        assert_eq!(report.attackers_losses as usize + attackers.len(), 4);
        assert_eq!(report.defenders_losses as usize + defenders.len(), 4);
        assert_eq!(report.battle_log.len() as u32, report.engagements);
        assert!(!report.truncated);
    }

    #[test]
    fn test_battle_cap_truncates() {
        // Nobody can ever land a hit
        let mut attackers = vec![Combatant::new(1, "Pacifist", 10, -100, 100)];
        let mut defenders = vec![Combatant::new(2, "Wall", 10, -100, 100)];
        let mut rng = SeededRandom::new(5);
        let config = BattleConfig {
            max_engagements: Some(25),
        };

        let report = simulate_battle(&mut attackers, &mut defenders, &mut rng, &config);

        assert!(report.truncated);
        assert_eq!(report.engagements, 25);
        assert_eq!(attackers.len(), 1);
        assert_eq!(defenders.len(), 1);
    }

    #[test]
    fn test_attack_player() {
        let attacker = Player::new(1, "Ana", Position::ORIGIN, 50).with_combat(CombatStats::new(10, 0));
        let mut target = Player::new(2, "Bo", Position::ORIGIN, 15).with_combat(CombatStats::new(0, 5));
        let mut rng = ScriptedRandom::new([15, 3]);

        let result = attack_player(&attacker, &mut target, &mut rng).unwrap();
        assert_eq!(result.outcome, EngagementOutcome::FinishingBlow);
        assert_eq!(target.health, 0);

        assert!(matches!(
            attack_player(&attacker, &mut target, &mut rng),
            Err(GameError::InvalidTarget(_))
        ));
    }

    #[test]
    fn test_attack_player_without_stats() {
        let attacker = Player::new(1, "Ana", Position::ORIGIN, 50);
        let mut target = Player::new(2, "Bo", Position::ORIGIN, 15).with_combat(CombatStats::new(0, 5));
        let mut rng = SeededRandom::new(1);

        assert!(attack_player(&attacker, &mut target, &mut rng).is_err());
        assert_eq!(target.health, 15);
    }
}
