//! Test fixtures and helpers.
//!
//! Pre-built games, players and squads for consistent testing.

use starfall_core::combat::Combatant;
use starfall_core::data::DataTables;
use starfall_core::entities::{EntityId, Item, Player, Position};
use starfall_core::factions::FactionId;
use starfall_core::game_loop::{GameConfig, GameLoop, PlayerCommand};

/// Config with a small world and no hazard flare-ups.
#[must_use]
pub fn quiet_config() -> GameConfig {
    GameConfig {
        initial_planets: 3,
        hazard_flare_chance_percent: 0,
        ..GameConfig::default()
    }
}

/// Seeded game on the built-in tables with [`quiet_config`].
#[must_use]
pub fn seeded_game(seed: u64) -> GameLoop {
    GameLoop::seeded(quiet_config(), DataTables::builtin(), seed)
}

/// A player carrying the given items.
#[must_use]
pub fn player_with_items(id: EntityId, name: &str, items: &[(&str, u32)]) -> Player {
    let mut player = Player::new(id, name, Position::ORIGIN, 100);
    for (item, quantity) in items {
        player.add_item(Item::new(*item, *quantity));
    }
    player
}

/// `count` identical combatants named `<prefix> <n>`, IDs from `first_id`.
#[must_use]
pub fn squad(
    prefix: &str,
    first_id: EntityId,
    count: u32,
    health: u32,
    attack_power: i32,
    defense: i32,
) -> Vec<Combatant> {
    (0..count)
        .map(|n| {
            Combatant::new(
                first_id + EntityId::from(n),
                format!("{prefix} {}", n + 1),
                health,
                attack_power,
                defense,
            )
        })
        .collect()
}

/// Two players who each founded a faction on the first tick.
#[derive(Debug, Clone, Copy)]
pub struct Rivals {
    /// First player.
    pub ana: EntityId,
    /// Second player.
    pub bo: EntityId,
    /// Faction founded by `ana`.
    pub union: FactionId,
    /// Faction founded by `bo`.
    pub syndicate: FactionId,
}

/// A seeded game with two players in two fresh factions, one tick in.
///
/// # Panics
///
/// Panics if the factions could not be founded.
#[must_use]
pub fn rival_factions(seed: u64) -> (GameLoop, Rivals) {
    let mut game = seeded_game(seed);
    let ana = game.add_player("Ana");
    let bo = game.add_player("Bo");
    game.queue_command(ana, PlayerCommand::CreateFaction { name: "Union".into() })
        .expect("Ana is on the roster");
    game.queue_command(bo, PlayerCommand::CreateFaction { name: "Syndicate".into() })
        .expect("Bo is on the roster");
    game.tick();

    let faction_of = |id| {
        game.player(id)
            .ok()
            .and_then(|p| p.faction)
            .expect("founder belongs to their faction")
    };
    let rivals = Rivals {
        ana,
        bo,
        union: faction_of(ana),
        syndicate: faction_of(bo),
    };
    (game, rivals)
}
