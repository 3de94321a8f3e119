//! Balance testing utilities.
//!
//! Runs the same matchup across many seeds to check how combat stats
//! translate into outcomes.

use std::ops::Range;

use starfall_core::combat::{simulate_battle, BattleConfig, Combatant};
use starfall_core::fleet::{simulate_fleet_combat, Fleet, FleetOutcome};
use starfall_core::rng::SeededRandom;

/// Statistics for a set of battles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BattleStats {
    /// Total battles run.
    pub total_battles: u32,
    /// Battles where the defenders were wiped out.
    pub attacker_wins: u32,
    /// Battles where the attackers were wiped out.
    pub defender_wins: u32,
    /// Battles stopped by the engagement cap.
    pub stalemates: u32,
    /// Engagements across every battle.
    pub total_engagements: u64,
}

impl BattleStats {
    /// Attacker win rate (0.0 to 1.0).
    #[must_use]
    pub fn attacker_win_rate(&self) -> f64 {
        if self.total_battles == 0 {
            return 0.5;
        }
        f64::from(self.attacker_wins) / f64::from(self.total_battles)
    }

    /// Average engagements per battle.
    #[must_use]
    pub fn avg_engagements(&self) -> f64 {
        if self.total_battles == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let total = self.total_engagements as f64;
        total / f64::from(self.total_battles)
    }

    /// Check if the attacker win rate falls within a range.
    #[must_use]
    pub fn is_balanced(&self, min_rate: f64, max_rate: f64) -> bool {
        let rate = self.attacker_win_rate();
        rate >= min_rate && rate <= max_rate
    }
}

/// Fight the same two rosters once per seed.
#[must_use]
pub fn run_battles(
    attackers: &[Combatant],
    defenders: &[Combatant],
    seeds: Range<u64>,
    config: &BattleConfig,
) -> BattleStats {
    let mut stats = BattleStats::default();

    for seed in seeds {
        let mut rng = SeededRandom::new(seed);
        let mut a = attackers.to_vec();
        let mut d = defenders.to_vec();
        let report = simulate_battle(&mut a, &mut d, &mut rng, config);

        stats.total_battles += 1;
        stats.total_engagements += u64::from(report.engagements);
        if report.truncated {
            stats.stalemates += 1;
        } else if d.is_empty() {
            stats.attacker_wins += 1;
        } else if a.is_empty() {
            stats.defender_wins += 1;
        }
    }

    tracing::debug!(?stats, "Balance run complete");
    stats
}

/// Fight the same fleet matchup once per seed.
///
/// A win for the attacker is any result other than [`FleetOutcome::Repelled`].
#[must_use]
pub fn run_fleet_duels(attacker: &Fleet, defender: &Fleet, seeds: Range<u64>) -> BattleStats {
    let mut stats = BattleStats::default();

    for seed in seeds {
        let mut rng = SeededRandom::new(seed);
        let mut target = defender.clone();
        let result = simulate_fleet_combat(attacker, &mut target, &mut rng);

        stats.total_battles += 1;
        stats.total_engagements += 1;
        if result.outcome == FleetOutcome::Repelled {
            stats.defender_wins += 1;
        } else {
            stats.attacker_wins += 1;
        }
    }

    stats
}
