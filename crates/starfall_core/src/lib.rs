//! # Starfall Core
//!
//! Deterministic simulation core for Starfall, a survival-to-interstellar
//! strategy game.
//!
//! This crate contains **only** simulation logic:
//! - No networking
//! - No IO (data tables are parsed from text handed in by the caller)
//! - No hidden randomness (every roll goes through [`rng::RandomSource`])
//!
//! Feeding the same seed and the same commands always produces the same
//! world, which keeps servers, replays and tests reproducible.
//!
//! ## Crate Structure
//!
//! - [`game_loop`] - The five-phase tick and player commands
//! - [`entities`] - Players, inventories and structures
//! - [`resources`] - Resource stockpiles and per-tick rates
//! - [`factions`] - Factions, membership and diplomacy
//! - [`technology`] - Technology tree and research
//! - [`combat`] - d20 engagements and battles
//! - [`fleet`] - Fleets and fleet operations
//! - [`crafting`] - Recipes
//! - [`economy`] - Faction markets and trades
//! - [`hazards`] - Environmental hazards
//! - [`world`] - Planet generation
//! - [`exploration`] - Spacecraft
//! - [`ai`] - Autonomous entities
//! - [`narrative`] - Story events
//! - [`data`] - Static data tables
//! - [`math`] - Fixed-point helpers

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod ai;
pub mod combat;
pub mod crafting;
pub mod data;
pub mod economy;
pub mod entities;
pub mod error;
pub mod exploration;
pub mod factions;
pub mod fleet;
pub mod game_loop;
pub mod hazards;
pub mod math;
pub mod narrative;
pub mod resources;
pub mod rng;
pub mod snapshot;
pub mod technology;
pub mod world;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::ai::{AiAction, AiBehaviour, AiEntity, AiSystem};
    pub use crate::combat::{
        attack_player, resolve_engagement, simulate_battle, BattleConfig, BattleReport, Combatant,
        EngagementResult, Side,
    };
    pub use crate::crafting::{Recipe, RecipeBook};
    pub use crate::data::DataTables;
    pub use crate::economy::{EconomySystem, Market, TradeOffer, TradeReceipt};
    pub use crate::entities::{CombatStats, EntityId, Inventory, Item, Player, Position, Structure};
    pub use crate::error::{ErrorKind, GameError, Result};
    pub use crate::exploration::{SpaceExploration, Spacecraft};
    pub use crate::factions::{Faction, FactionId, FactionModifiers, FactionRegistry};
    pub use crate::fleet::{Fleet, FleetId, FleetOperations};
    pub use crate::game_loop::{
        CommandFailure, GameConfig, GameEvent, GameLoop, LoopHandle, Phase, PlayerCommand,
        TickEvents,
    };
    pub use crate::hazards::{EnvironmentalChallenges, EnvironmentalHazard, HazardKind};
    pub use crate::math::Fixed;
    pub use crate::narrative::{NarrativeEngine, NarrativeEvent, NarrativeKind};
    pub use crate::resources::{Resource, ResourceManager, ResourceRates};
    pub use crate::rng::{RandomSource, ScriptedRandom, SeededRandom};
    pub use crate::snapshot::WorldSnapshot;
    pub use crate::technology::{TechBenefit, TechId, TechTree, Technology};
    pub use crate::world::{Planet, PlanetType, WorldGenerator};
}
