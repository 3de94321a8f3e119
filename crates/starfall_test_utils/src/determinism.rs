//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the simulation produces
//! identical results given identical seeds and commands.
//!
//! # Testing Strategy
//!
//! Servers, replays and tests all rely on a game being reproducible.
//! Sources of non-determinism include:
//!
//! - **Floating-point math**: prices and distances use fixed-point
//!   arithmetic via [`starfall_core::math::Fixed`].
//!
//! - **HashMap iteration order**: registries are `BTreeMap`s or `Vec`s,
//!   iterated in ID or insertion order.
//!
//! - **System randomness**: every roll goes through a
//!   [`starfall_core::rng::RandomSource`] owned by the game loop.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use starfall_core::game_loop::GameLoop;
use starfall_core::snapshot::WorldSnapshot;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial simulation state
/// * `step` - Function to advance simulation by one tick
/// * `hash` - Function to compute state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run a game twice from the same setup and compare final hashes.
pub fn verify_game_determinism<F>(setup_fn: F, num_ticks: u64) -> DeterminismResult
where
    F: Fn() -> GameLoop,
{
    verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |game| {
            game.tick();
        },
        GameLoop::state_hash,
    )
}

/// Run N games on scoped threads and collect final hashes.
///
/// # Panics
///
/// Panics if a simulation thread panics.
pub fn run_parallel_games<F>(setup_fn: F, num_games: usize, num_ticks: u64) -> DeterminismResult
where
    F: Fn() -> GameLoop + Sync,
{
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_games)
            .map(|_| {
                s.spawn(|| {
                    let mut game = setup_fn();
                    for _ in 0..num_ticks {
                        game.tick();
                    }
                    game.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("simulation thread panicked"))
            .collect()
    });

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        ticks: num_ticks,
    }
}

/// Compare two runs tick-by-tick, finding the first divergence.
///
/// Returns `None` if the runs match, `Some(tick)` if they diverge at
/// that tick. Tick 0 is the freshly built world.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> GameLoop,
{
    let mut first = setup_fn();
    let mut second = setup_fn();

    if first.state_hash() != second.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        first.tick();
        second.tick();

        if first.state_hash() != second.state_hash() {
            return Some(tick);
        }
    }

    None
}

/// Check that a snapshot survives a binary round trip unchanged.
#[must_use]
pub fn verify_snapshot_round_trip(snapshot: &WorldSnapshot) -> bool {
    let Ok(bytes) = bincode::serialize(snapshot) else {
        return false;
    };
    match bincode::deserialize::<WorldSnapshot>(&bytes) {
        Ok(restored) => restored == *snapshot && restored.state_hash() == snapshot.state_hash(),
        Err(_) => false,
    }
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for simulation inputs.
pub mod strategies {
    use proptest::prelude::*;
    use starfall_core::combat::Combatant;
    use starfall_core::entities::{EntityId, Position};
    use starfall_core::factions::FactionId;
    use starfall_core::game_loop::PlayerCommand;
    use starfall_core::technology::TechId;

    /// A position within a typical sector.
    pub fn arb_position() -> impl Strategy<Value = Position> {
        (-10_000i32..10_000, -10_000i32..10_000, -100i32..100)
            .prop_map(|(x, y, z)| Position::new(x, y, z))
    }

    /// A combatant with modest stats.
    pub fn arb_combatant(id: EntityId) -> impl Strategy<Value = Combatant> {
        (1u32..200, 0i32..40, 0i32..40).prop_map(move |(health, attack, defense)| {
            Combatant::new(id, format!("Fighter {id}"), health, attack, defense)
        })
    }

    /// A roster of one to `max` combatants, IDs from `first_id`.
    pub fn arb_squad(first_id: EntityId, max: usize) -> impl Strategy<Value = Vec<Combatant>> {
        prop::collection::vec((1u32..200, 0i32..40, 0i32..40), 1..=max).prop_map(move |stats| {
            stats
                .into_iter()
                .zip(first_id..)
                .map(|((health, attack, defense), id)| {
                    Combatant::new(id, format!("Fighter {id}"), health, attack, defense)
                })
                .collect()
        })
    }

    /// Any command a player might queue, with plausible arguments.
    ///
    /// Faction IDs start at 1000 and player IDs at 1, so small ranges hit
    /// real targets often enough to exercise success paths.
    pub fn arb_command() -> impl Strategy<Value = PlayerCommand> {
        let faction = (1000u32..1004).prop_map(FactionId);
        prop_oneof![
            arb_position().prop_map(|to| PlayerCommand::Move { to }),
            prop::sample::select(vec!["Stone Axe", "Fire Starter", "Water Filter", "Rocket"])
                .prop_map(|r| PlayerCommand::Craft { recipe: r.to_string() }),
            "[A-Z][a-z]{2,8}".prop_map(|name| PlayerCommand::CreateFaction { name }),
            faction.clone().prop_map(|faction| PlayerCommand::JoinFaction { faction }),
            Just(PlayerCommand::LeaveFaction),
            faction.clone().prop_map(|with| PlayerCommand::FormAlliance { with }),
            faction.clone().prop_map(|against| PlayerCommand::DeclareEnmity { against }),
            (1u32..5).prop_map(|id| PlayerCommand::Research { technology: TechId(id) }),
            "[A-Z][a-z]{2,8}".prop_map(|name| PlayerCommand::LaunchSpacecraft { name }),
            (1u64..5, arb_position())
                .prop_map(|(spacecraft, to)| PlayerCommand::MoveSpacecraft { spacecraft, to }),
            Just(PlayerCommand::SurveySector),
            (1u64..5).prop_map(|target| PlayerCommand::Attack { target }),
            (1u32..10, 1u32..20).prop_map(|(quantity, price_per_unit)| PlayerCommand::ListOffer {
                item: "Stone".to_string(),
                quantity,
                price_per_unit,
            }),
            (faction, 1u32..10).prop_map(|(seller, quantity)| PlayerCommand::Trade {
                seller,
                item: "Stone".to_string(),
                quantity,
            }),
        ]
    }
}
