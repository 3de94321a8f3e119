//! Simulation benchmarks for starfall_core.
//!
//! Run with: `cargo bench -p starfall_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use starfall_core::prelude::*;
use starfall_test_utils::fixtures::{rival_factions, squad};

pub fn battle_benchmark(c: &mut Criterion) {
    let attackers = squad("Raider", 1, 20, 60, 8, 4);
    let defenders = squad("Guard", 100, 20, 60, 6, 6);

    c.bench_function("battle_20v20", |b| {
        b.iter_batched(
            || (attackers.clone(), defenders.clone(), SeededRandom::new(7)),
            |(mut a, mut d, mut rng)| {
                black_box(simulate_battle(&mut a, &mut d, &mut rng, &BattleConfig::default()))
            },
            BatchSize::SmallInput,
        );
    });
}

pub fn tick_benchmark(c: &mut Criterion) {
    c.bench_function("game_tick_100", |b| {
        b.iter_batched(
            || {
                let (mut game, _) = rival_factions(11);
                for n in 0..20 {
                    game.add_player(format!("Settler {n}"));
                }
                game.add_structure(Structure::new(1, "Shelter", Position::ORIGIN, 500));
                game.add_ai_entity(AiEntity::new(900, "Raider", Position::ORIGIN, AiBehaviour::Hostile));
                game
            },
            |mut game| {
                for _ in 0..100 {
                    black_box(game.tick());
                }
                game.state_hash()
            },
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(benches, battle_benchmark, tick_benchmark);
criterion_main!(benches);
