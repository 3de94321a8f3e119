//! Reproducibility of whole games.

use starfall_core::prelude::*;
use starfall_test_utils::determinism::{
    find_first_divergence, run_parallel_games, verify_game_determinism, verify_snapshot_round_trip,
};
use starfall_test_utils::fixtures::{rival_factions, seeded_game};

/// Two factions, a hostile raider, ships and a trade on the books.
fn busy_game() -> GameLoop {
    let (mut game, rivals) = rival_factions(77);
    game.add_structure(Structure::new(1, "Shelter", Position::ORIGIN, 100));
    game.add_ai_entity(AiEntity::new(500, "Raider", Position::ORIGIN, AiBehaviour::Hostile));
    game.add_ai_entity(AiEntity::new(501, "Drifter", Position::ORIGIN, AiBehaviour::Neutral));
    game.add_ai_entity(AiEntity::new(502, "Medic", Position::ORIGIN, AiBehaviour::Friendly));

    let commands = [
        (rivals.ana, PlayerCommand::LaunchSpacecraft { name: "Lance".into() }),
        (rivals.bo, PlayerCommand::LaunchSpacecraft { name: "Shield".into() }),
        (rivals.ana, PlayerCommand::Research { technology: TechId(1) }),
        (rivals.bo, PlayerCommand::Attack { target: rivals.ana }),
        (rivals.ana, PlayerCommand::DeclareEnmity { against: rivals.syndicate }),
    ];
    for (player, command) in commands {
        game.queue_command(player, command).unwrap();
    }
    game
}

#[test]
fn test_busy_game_is_deterministic() {
    verify_game_determinism(busy_game, 60).assert_deterministic();
}

#[test]
fn test_no_divergence_tick_by_tick() {
    assert_eq!(find_first_divergence(busy_game, 40), None);
}

#[test]
fn test_parallel_runs_agree() {
    run_parallel_games(busy_game, 4, 30).assert_deterministic();
}

#[test]
fn test_seed_changes_the_world() {
    assert_ne!(seeded_game(1).state_hash(), seeded_game(2).state_hash());
}

#[test]
fn test_snapshot_survives_binary_round_trip() {
    let mut game = busy_game();
    for _ in 0..10 {
        game.tick();
    }
    let snapshot = game.snapshot();
    assert_eq!(snapshot.tick, 11);
    assert_eq!(snapshot.players.len(), 2);
    assert!(verify_snapshot_round_trip(&snapshot));
}
