//! Phase-sequenced game loop.
//!
//! Every tick runs five phases in a fixed order:
//! 1. Survival - resource ticks, crafting and movement, hazard decay
//! 2. Community - faction commands, membership reconciliation, resource ticks
//! 3. Technology - research orders and progress, world update
//! 4. Exploration - spacecraft, surveys and fleet formation
//! 5. Conflict - fleet operations, player combat, AI, narrative, economy
//!
//! Player commands are queued between ticks and drained in the phase they
//! belong to. A failing command is recorded in [`TickEvents::failures`]
//! and never aborts the tick.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ai::{AiAction, AiEntity, AiSystem};
use crate::combat::{attack_player, EngagementResult};
use crate::crafting::RecipeBook;
use crate::data::DataTables;
use crate::economy::{EconomySystem, TradeReceipt};
use crate::entities::{CombatStats, EntityId, Item, Player, Position, Structure};
use crate::error::{ErrorKind, GameError, Result};
use crate::exploration::SpaceExploration;
use crate::factions::{FactionId, FactionModifiers, FactionRegistry};
use crate::fleet::{FleetEngagementReport, FleetId, FleetOperations};
use crate::hazards::{EnvironmentalChallenges, HazardKind};
use crate::math::Fixed;
use crate::narrative::{NarrativeEngine, NarrativeEvent};
use crate::resources::{Resource, ResourceRates};
use crate::rng::{RandomSource, SeededRandom};
use crate::snapshot::WorldSnapshot;
use crate::technology::{TechId, TechTree};
use crate::world::{PlanetGenerator, WorldGenerator};

/// One of the five ordered stages of a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Scavenging and survival.
    Survival,
    /// Community building.
    Community,
    /// Technological advancement.
    Technology,
    /// Stellar exploration.
    Exploration,
    /// Interstellar conflict.
    Conflict,
}

impl Phase {
    /// Phases in execution order.
    pub const ALL: [Self; 5] = [
        Self::Survival,
        Self::Community,
        Self::Technology,
        Self::Exploration,
        Self::Conflict,
    ];

    /// Human-readable name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Survival => "survival",
            Self::Community => "community",
            Self::Technology => "technology",
            Self::Exploration => "exploration",
            Self::Conflict => "conflict",
        }
    }
}

/// An order a player queues for the next tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PlayerCommand {
    /// Walk to a position.
    Move {
        /// Destination.
        to: Position,
    },
    /// Craft a recipe from the player's inventory.
    Craft {
        /// Recipe name.
        recipe: String,
    },
    /// Found a faction and join it.
    CreateFaction {
        /// Faction name.
        name: String,
    },
    /// Join an existing faction.
    JoinFaction {
        /// Faction to join.
        faction: FactionId,
    },
    /// Leave the current faction.
    LeaveFaction,
    /// Ally the player's faction with another.
    FormAlliance {
        /// Faction to ally with.
        with: FactionId,
    },
    /// Make the player's faction an enemy of another.
    DeclareEnmity {
        /// Faction to oppose.
        against: FactionId,
    },
    /// Start researching a technology for the player's faction.
    Research {
        /// Technology to research.
        technology: TechId,
    },
    /// Launch a spacecraft for the player's faction.
    LaunchSpacecraft {
        /// Spacecraft name.
        name: String,
    },
    /// Fly one of the faction's spacecraft.
    MoveSpacecraft {
        /// Spacecraft to move.
        spacecraft: EntityId,
        /// Destination.
        to: Position,
    },
    /// Gather resources from a planet.
    ExplorePlanet {
        /// Spacecraft doing the gathering.
        spacecraft: EntityId,
        /// Planet name.
        planet: String,
    },
    /// Search deep space for a new planet.
    SurveySector,
    /// Group spacecraft into a fleet.
    FormFleet {
        /// Fleet name.
        name: String,
        /// Spacecraft to assign.
        ships: Vec<EntityId>,
    },
    /// Send one of the faction's fleets against another fleet.
    EngageFleet {
        /// Attacking fleet, owned by the player's faction.
        attacker: FleetId,
        /// Defending fleet.
        defender: FleetId,
    },
    /// Attack another player.
    Attack {
        /// Target player.
        target: EntityId,
    },
    /// Put inventory items up for sale on the faction market.
    ListOffer {
        /// Item to sell.
        item: String,
        /// Units to sell.
        quantity: u32,
        /// Whole credits per unit.
        price_per_unit: u32,
    },
    /// Buy from another faction's market.
    Trade {
        /// Selling faction.
        seller: FactionId,
        /// Item to buy.
        item: String,
        /// Units to buy.
        quantity: u32,
    },
}

impl PlayerCommand {
    /// Phase in which this command is executed.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        match self {
            Self::Move { .. } | Self::Craft { .. } => Phase::Survival,
            Self::CreateFaction { .. }
            | Self::JoinFaction { .. }
            | Self::LeaveFaction
            | Self::FormAlliance { .. }
            | Self::DeclareEnmity { .. } => Phase::Community,
            Self::Research { .. } => Phase::Technology,
            Self::LaunchSpacecraft { .. }
            | Self::MoveSpacecraft { .. }
            | Self::ExplorePlanet { .. }
            | Self::SurveySector
            | Self::FormFleet { .. } => Phase::Exploration,
            Self::EngageFleet { .. }
            | Self::Attack { .. }
            | Self::ListOffer { .. }
            | Self::Trade { .. } => Phase::Conflict,
        }
    }
}

/// Something that happened during a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GameEvent {
    /// A player walked somewhere.
    PlayerMoved {
        /// Player.
        player: EntityId,
        /// New position.
        to: Position,
    },
    /// A player crafted an item.
    ItemCrafted {
        /// Player.
        player: EntityId,
        /// Produced stack.
        item: Item,
    },
    /// A hazard subsided.
    HazardExpired {
        /// Planet name.
        planet: String,
        /// Hazard kind.
        hazard: HazardKind,
    },
    /// A quiet planet's hazards flared up.
    HazardsFlared {
        /// Planet name.
        planet: String,
    },
    /// A faction was founded.
    FactionCreated {
        /// New faction.
        faction: FactionId,
        /// Founding player.
        founder: EntityId,
    },
    /// A player joined a faction.
    FactionJoined {
        /// Faction.
        faction: FactionId,
        /// Player.
        player: EntityId,
    },
    /// A player left a faction.
    FactionLeft {
        /// Faction.
        faction: FactionId,
        /// Player.
        player: EntityId,
    },
    /// A faction without members was disbanded.
    FactionDisbanded {
        /// Faction.
        faction: FactionId,
    },
    /// Two factions allied.
    AllianceFormed {
        /// First faction.
        a: FactionId,
        /// Second faction.
        b: FactionId,
    },
    /// Two factions became enemies.
    EnmityDeclared {
        /// First faction.
        a: FactionId,
        /// Second faction.
        b: FactionId,
    },
    /// A faction queued research.
    ResearchStarted {
        /// Faction.
        faction: FactionId,
        /// Technology.
        technology: TechId,
    },
    /// A faction completed research.
    ResearchCompleted {
        /// Faction.
        faction: FactionId,
        /// Technology.
        technology: TechId,
    },
    /// A spacecraft was launched.
    SpacecraftLaunched {
        /// Owning faction.
        faction: FactionId,
        /// New spacecraft.
        spacecraft: EntityId,
    },
    /// A spacecraft moved.
    SpacecraftMoved {
        /// Spacecraft.
        spacecraft: EntityId,
        /// Fuel left.
        fuel_left: u32,
    },
    /// A spacecraft gathered resources.
    PlanetExplored {
        /// Spacecraft.
        spacecraft: EntityId,
        /// Planet name.
        planet: String,
        /// Resources found.
        resources: Vec<String>,
    },
    /// A survey found a new planet.
    PlanetDiscovered {
        /// Surveying faction.
        faction: FactionId,
        /// Planet name.
        planet: String,
    },
    /// Spacecraft were grouped into a fleet.
    FleetFormed {
        /// Owning faction.
        faction: FactionId,
        /// New fleet.
        fleet: FleetId,
    },
    /// A queued fleet engagement resolved.
    FleetEngagement(FleetEngagementReport),
    /// A player attacked another.
    PlayerAttacked {
        /// Attacking player.
        attacker: EntityId,
        /// Target player.
        target: EntityId,
        /// Engagement result.
        result: EngagementResult,
    },
    /// An AI entity acted.
    AiActed(AiAction),
    /// A narrative event was applied.
    Narrative(NarrativeEvent),
    /// Items were listed for sale.
    OfferListed {
        /// Selling faction.
        faction: FactionId,
        /// Item listed.
        item: String,
        /// Units listed.
        quantity: u32,
    },
    /// A trade completed.
    TradeExecuted(TradeReceipt),
}

/// A command that could not be carried out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandFailure {
    /// Player who queued the command.
    pub player: EntityId,
    /// Phase it ran in.
    pub phase: Phase,
    /// The failed command.
    pub command: PlayerCommand,
    /// Error classification.
    pub kind: ErrorKind,
    /// Error message.
    pub message: String,
}

/// Everything that happened during one tick.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TickEvents {
    /// Tick number, starting at 1.
    pub tick: u64,
    /// Phases in the order they ran.
    pub phases: Vec<Phase>,
    /// Events in the order they happened.
    pub events: Vec<GameEvent>,
    /// Commands that failed.
    pub failures: Vec<CommandFailure>,
}

/// Simulation tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Planets generated when the loop is built.
    pub initial_planets: usize,
    /// Health new players start with.
    pub starting_health: u32,
    /// Credits new factions start with.
    pub starting_credits: u64,
    /// Combat stats new players start with.
    pub player_combat: CombatStats,
    /// Research points each member contributes per tick.
    pub research_points_per_member: u32,
    /// Chance out of 100 that a quiet planet's hazards flare each tick.
    pub hazard_flare_chance_percent: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            initial_planets: 5,
            starting_health: 100,
            starting_credits: 1_000,
            player_combat: CombatStats::new(5, 5),
            research_points_per_member: 1,
            hazard_flare_chance_percent: 5,
        }
    }
}

impl GameConfig {
    /// Parse a config from RON text. Missing fields take their defaults.
    pub fn from_ron_str(source_name: &str, text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| GameError::DataParseError {
            source_name: source_name.to_string(),
            message: e.to_string(),
        })
    }
}

/// Cloneable handle that can stop a running loop from elsewhere.
#[derive(Debug, Clone)]
pub struct LoopHandle {
    active: Arc<AtomicBool>,
}

impl LoopHandle {
    /// Stop the loop after the tick in progress.
    pub fn end(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    /// Check if the loop is still running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

type CommandFilter = fn(&PlayerCommand) -> bool;

/// The simulation: world state, every subsystem and the phase sequence.
pub struct GameLoop {
    config: GameConfig,
    tick: u64,
    active: Arc<AtomicBool>,
    rng: Box<dyn RandomSource + Send>,

    players: Vec<Player>,
    structures: Vec<Structure>,
    pending: BTreeMap<EntityId, Vec<PlayerCommand>>,
    next_player_id: EntityId,
    starting_resources: Vec<Resource>,
    starting_rates: ResourceRates,

    factions: FactionRegistry,
    recipes: RecipeBook,
    tech: TechTree,
    economy: EconomySystem,
    hazards: EnvironmentalChallenges,
    world: WorldGenerator,
    surveyor: PlanetGenerator,
    exploration: SpaceExploration,
    fleets: FleetOperations,
    ai: AiSystem,
    narrative: NarrativeEngine,
}

impl GameLoop {
    /// Build a loop and generate the starting world.
    #[must_use]
    pub fn new(config: GameConfig, tables: DataTables, mut rng: Box<dyn RandomSource + Send>) -> Self {
        let mut world = WorldGenerator::new(tables.planet_templates);
        let mut hazards = EnvironmentalChallenges::new();
        for _ in 0..config.initial_planets {
            let planet = world.generate_planet(&mut *rng).clone();
            hazards.generate_hazards_for_planet(&planet, &mut *rng);
        }

        let mut narrative = NarrativeEngine::new();
        narrative.generate_initial_events();

        tracing::info!(
            planets = world.planets().len(),
            recipes = tables.recipes.len(),
            technologies = tables.technologies.len(),
            "Game world generated"
        );

        Self {
            tick: 0,
            active: Arc::new(AtomicBool::new(true)),
            rng,
            players: Vec::new(),
            structures: Vec::new(),
            pending: BTreeMap::new(),
            next_player_id: 1,
            starting_resources: tables.starting_resources,
            starting_rates: tables.starting_rates,
            factions: FactionRegistry::new().with_starting_credits(config.starting_credits),
            recipes: RecipeBook::new(tables.recipes),
            tech: TechTree::new(tables.technologies),
            economy: EconomySystem::new(),
            hazards,
            world,
            surveyor: PlanetGenerator::new(tables.planet_names),
            exploration: SpaceExploration::new(),
            fleets: FleetOperations::new(),
            ai: AiSystem::new(),
            narrative,
            config,
        }
    }

    /// Build a loop driven by a seeded generator.
    #[must_use]
    pub fn seeded(config: GameConfig, tables: DataTables, seed: u64) -> Self {
        Self::new(config, tables, Box::new(SeededRandom::new(seed)))
    }

    // ---- roster ----------------------------------------------------------

    /// Add a new player with the starting loadout. Returns its ID.
    pub fn add_player(&mut self, name: impl Into<String>) -> EntityId {
        let id = self.next_player_id;
        let mut player = Player::new(id, name, Position::ORIGIN, self.config.starting_health)
            .with_combat(self.config.player_combat)
            .with_rates(self.starting_rates.clone());
        player
            .resources
            .initialize_resources(self.starting_resources.iter().cloned());

        tracing::info!(player = id, name = %player.name, "Player joined");
        self.next_player_id += 1;
        self.players.push(player);
        id
    }

    /// Add a fully built player.
    pub fn insert_player(&mut self, player: Player) -> Result<EntityId> {
        if self.player(player.id).is_ok() {
            return Err(GameError::InvalidTarget(format!(
                "player {} already exists",
                player.id
            )));
        }
        let id = player.id;
        self.next_player_id = self.next_player_id.max(id + 1);
        self.players.push(player);
        Ok(id)
    }

    /// Remove a player and drop their pending commands.
    pub fn remove_player(&mut self, id: EntityId) -> Result<Player> {
        let index = self.player_index(id)?;
        self.pending.remove(&id);
        tracing::info!(player = id, "Player left");
        Ok(self.players.remove(index))
    }

    /// Queue a command for the next tick.
    pub fn queue_command(&mut self, player: EntityId, command: PlayerCommand) -> Result<()> {
        self.player_index(player)?;
        self.pending.entry(player).or_default().push(command);
        Ok(())
    }

    /// Add a shared structure.
    pub fn add_structure(&mut self, structure: Structure) {
        self.structures.push(structure);
    }

    /// Add an AI entity.
    pub fn add_ai_entity(&mut self, entity: AiEntity) {
        self.ai.add_entity(entity);
    }

    // ---- lifecycle -------------------------------------------------------

    /// Handle for stopping the loop from elsewhere.
    #[must_use]
    pub fn handle(&self) -> LoopHandle {
        LoopHandle {
            active: Arc::clone(&self.active),
        }
    }

    /// Stop the loop after the tick in progress.
    pub fn end(&self) {
        self.active.store(false, Ordering::SeqCst);
        tracing::info!(tick = self.tick, "Game loop ending");
    }

    /// Check if the loop is still running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Tick until ended. Returns the number of ticks run.
    pub fn run(&mut self) -> u64 {
        self.run_with(|_| {})
    }

    /// Tick until ended, handing each tick's events to `on_tick`.
    ///
    /// The active flag is only checked before each tick, so a tick that
    /// has started always completes.
    pub fn run_with(&mut self, mut on_tick: impl FnMut(&TickEvents)) -> u64 {
        let mut ticks = 0;
        while self.is_active() {
            let events = self.tick();
            on_tick(&events);
            ticks += 1;
        }
        ticks
    }

    /// Run all five phases once.
    pub fn tick(&mut self) -> TickEvents {
        self.tick += 1;
        let mut out = TickEvents {
            tick: self.tick,
            ..TickEvents::default()
        };

        for phase in Phase::ALL {
            let span = tracing::debug_span!("phase", tick = self.tick, phase = phase.display_name());
            let _guard = span.enter();
            match phase {
                Phase::Survival => self.survival_phase(&mut out),
                Phase::Community => self.community_phase(&mut out),
                Phase::Technology => self.technology_phase(&mut out),
                Phase::Exploration => self.exploration_phase(&mut out),
                Phase::Conflict => self.conflict_phase(&mut out),
            }
            out.phases.push(phase);
        }

        tracing::debug!(
            tick = self.tick,
            events = out.events.len(),
            failures = out.failures.len(),
            "Tick complete"
        );
        out
    }

    // ---- phases ----------------------------------------------------------

    fn survival_phase(&mut self, out: &mut TickEvents) {
        for index in 0..self.players.len() {
            self.update_resources(index);
            self.run_commands(index, Phase::Survival, |c| c.phase() == Phase::Survival, out);
        }

        for (planet, hazard) in self.hazards.update_hazards() {
            out.events.push(GameEvent::HazardExpired {
                planet,
                hazard: hazard.kind,
            });
        }
    }

    fn community_phase(&mut self, out: &mut TickEvents) {
        for index in 0..self.players.len() {
            self.run_commands(index, Phase::Community, |c| c.phase() == Phase::Community, out);
        }

        for faction in self.factions.manage(&mut self.players) {
            self.economy.close_market(faction);
            self.tech.cancel_projects(faction);
            out.events.push(GameEvent::FactionDisbanded { faction });
        }

        for index in 0..self.players.len() {
            self.update_resources(index);
        }
    }

    fn technology_phase(&mut self, out: &mut TickEvents) {
        let points = self.config.research_points_per_member;
        for index in 0..self.players.len() {
            self.run_commands(index, Phase::Technology, |c| c.phase() == Phase::Technology, out);

            let Some(own) = self.players[index].faction else {
                continue;
            };
            let Ok(faction) = self.factions.get_mut(own) else {
                continue;
            };
            for technology in self.tech.advance(faction, points) {
                out.events.push(GameEvent::ResearchCompleted {
                    faction: own,
                    technology,
                });
            }
        }

        let flared = self.world.update_world(
            &mut self.hazards,
            &mut *self.rng,
            self.config.hazard_flare_chance_percent,
        );
        for planet in flared {
            out.events.push(GameEvent::HazardsFlared { planet });
        }
    }

    fn exploration_phase(&mut self, out: &mut TickEvents) {
        for index in 0..self.players.len() {
            self.run_commands(index, Phase::Exploration, |c| c.phase() == Phase::Exploration, out);
        }
    }

    fn conflict_phase(&mut self, out: &mut TickEvents) {
        for index in 0..self.players.len() {
            self.run_commands(index, Phase::Conflict, |c| matches!(c, PlayerCommand::EngageFleet { .. }), out);
        }
        for report in self.fleets.conduct_operations(&mut *self.rng) {
            out.events.push(GameEvent::FleetEngagement(report));
        }

        for index in 0..self.players.len() {
            self.run_commands(index, Phase::Conflict, |c| matches!(c, PlayerCommand::Attack { .. }), out);
        }

        for action in self.ai.update(&mut self.structures, &mut *self.rng) {
            out.events.push(GameEvent::AiActed(action));
        }

        for event in self
            .narrative
            .evolve(&self.players, &mut self.factions, &mut *self.rng)
        {
            out.events.push(GameEvent::Narrative(event));
        }

        for index in 0..self.players.len() {
            self.run_commands(
                index,
                Phase::Conflict,
                |c| matches!(c, PlayerCommand::ListOffer { .. } | PlayerCommand::Trade { .. }),
                out,
            );
        }
        self.economy.simulate_market_fluctuations(&mut *self.rng);
    }

    // ---- commands --------------------------------------------------------

    fn take_commands(&mut self, player: EntityId, filter: CommandFilter) -> Vec<PlayerCommand> {
        let Some(queue) = self.pending.get_mut(&player) else {
            return Vec::new();
        };
        let (taken, kept): (Vec<_>, Vec<_>) = std::mem::take(queue).into_iter().partition(filter);
        *queue = kept;
        taken
    }

    fn run_commands(&mut self, index: usize, phase: Phase, filter: CommandFilter, out: &mut TickEvents) {
        let player = self.players[index].id;
        for command in self.take_commands(player, filter) {
            if let Err(error) = self.execute(index, &command, &mut out.events) {
                tracing::warn!(
                    player,
                    phase = phase.display_name(),
                    ?command,
                    %error,
                    "Command failed"
                );
                out.failures.push(CommandFailure {
                    player,
                    phase,
                    command,
                    kind: error.kind(),
                    message: error.to_string(),
                });
            }
        }
    }

    fn execute(&mut self, index: usize, command: &PlayerCommand, events: &mut Vec<GameEvent>) -> Result<()> {
        let player = self.players[index].id;
        match command {
            PlayerCommand::Move { to } => {
                self.players[index].move_to(*to);
                events.push(GameEvent::PlayerMoved { player, to: *to });
            }
            PlayerCommand::Craft { recipe } => {
                let item = self
                    .recipes
                    .craft_item(&mut self.players[index].inventory, recipe)?;
                events.push(GameEvent::ItemCrafted { player, item });
            }
            PlayerCommand::CreateFaction { name } => {
                self.leave_faction(index);
                let faction = self.factions.create_faction(name.clone(), [player]);
                self.economy.open_market(faction);
                self.players[index].faction = Some(faction);
                events.push(GameEvent::FactionCreated {
                    faction,
                    founder: player,
                });
            }
            PlayerCommand::JoinFaction { faction } => {
                self.factions.get(*faction)?;
                if self.players[index].faction != Some(*faction) {
                    self.leave_faction(index);
                    self.factions.add_member(*faction, player)?;
                    self.players[index].faction = Some(*faction);
                    events.push(GameEvent::FactionJoined {
                        faction: *faction,
                        player,
                    });
                }
            }
            PlayerCommand::LeaveFaction => {
                let faction = self.own_faction(index)?;
                self.leave_faction(index);
                events.push(GameEvent::FactionLeft { faction, player });
            }
            PlayerCommand::FormAlliance { with } => {
                let own = self.own_faction(index)?;
                self.factions.form_alliance(own, *with)?;
                events.push(GameEvent::AllianceFormed { a: own, b: *with });
            }
            PlayerCommand::DeclareEnmity { against } => {
                let own = self.own_faction(index)?;
                self.factions.declare_enmity(own, *against)?;
                events.push(GameEvent::EnmityDeclared { a: own, b: *against });
            }
            PlayerCommand::Research { technology } => {
                let own = self.own_faction(index)?;
                let faction = self.factions.get_mut(own)?;
                self.tech.start_research(faction, *technology)?;
                events.push(GameEvent::ResearchStarted {
                    faction: own,
                    technology: *technology,
                });
            }
            PlayerCommand::LaunchSpacecraft { name } => {
                let own = self.own_faction(index)?;
                let spacecraft = self.exploration.launch_spacecraft(own, name.clone());
                events.push(GameEvent::SpacecraftLaunched {
                    faction: own,
                    spacecraft,
                });
            }
            PlayerCommand::MoveSpacecraft { spacecraft, to } => {
                let own = self.own_faction(index)?;
                self.exploration.owned_by(*spacecraft, own)?;
                let fuel_left = self.exploration.move_spacecraft(*spacecraft, *to)?;
                events.push(GameEvent::SpacecraftMoved {
                    spacecraft: *spacecraft,
                    fuel_left,
                });
            }
            PlayerCommand::ExplorePlanet { spacecraft, planet } => {
                let own = self.own_faction(index)?;
                self.exploration.owned_by(*spacecraft, own)?;
                let target = self.world.planet(planet)?;
                let resources = self.exploration.explore_planet(*spacecraft, target)?;
                for resource in &resources {
                    self.players[index].add_item(Item::new(resource.clone(), 1));
                }
                events.push(GameEvent::PlanetExplored {
                    spacecraft: *spacecraft,
                    planet: planet.clone(),
                    resources,
                });
            }
            PlayerCommand::SurveySector => {
                let own = self.own_faction(index)?;
                if !self.factions.get(own)?.modifiers.interstellar_travel {
                    return Err(GameError::InvalidTarget(format!(
                        "faction {own} has not unlocked interstellar travel"
                    )));
                }
                let surveyed = self.surveyor.generate_planet(&mut *self.rng);
                let planet = self.world.add_planet(surveyed).clone();
                self.hazards
                    .generate_hazards_for_planet(&planet, &mut *self.rng);
                events.push(GameEvent::PlanetDiscovered {
                    faction: own,
                    planet: planet.name,
                });
            }
            PlayerCommand::FormFleet { name, ships } => {
                let own = self.own_faction(index)?;
                if ships.is_empty() {
                    return Err(GameError::InvalidTarget(
                        "a fleet needs at least one ship".to_string(),
                    ));
                }
                let taken = self.exploration.take_ships(own, ships)?;
                let fleet = self.fleets.form_fleet(name.clone(), own, taken);
                events.push(GameEvent::FleetFormed {
                    faction: own,
                    fleet,
                });
            }
            PlayerCommand::EngageFleet { attacker, defender } => {
                let own = self.own_faction(index)?;
                if self.fleets.get(*attacker)?.faction_id != own {
                    return Err(GameError::InvalidTarget(format!(
                        "fleet {attacker} does not belong to faction {own}"
                    )));
                }
                self.fleets.queue_engagement(*attacker, *defender)?;
            }
            PlayerCommand::Attack { target } => {
                let target_index = self.player_index(*target)?;
                let attacker = self.players[index].clone();
                let result = attack_player(&attacker, &mut self.players[target_index], &mut *self.rng)?;
                events.push(GameEvent::PlayerAttacked {
                    attacker: player,
                    target: *target,
                    result,
                });
            }
            PlayerCommand::ListOffer {
                item,
                quantity,
                price_per_unit,
            } => {
                let own = self.own_faction(index)?;
                self.economy.market(own)?;
                if *quantity == 0 {
                    return Err(GameError::InvalidTarget(format!(
                        "cannot list zero {item}"
                    )));
                }
                self.players[index].remove_item(item, *quantity)?;
                self.economy.update_market(
                    own,
                    item,
                    *quantity,
                    Fixed::saturating_from_num(*price_per_unit),
                )?;
                events.push(GameEvent::OfferListed {
                    faction: own,
                    item: item.clone(),
                    quantity: *quantity,
                });
            }
            PlayerCommand::Trade {
                seller,
                item,
                quantity,
            } => {
                let own = self.own_faction(index)?;
                let (buyer, seller) = self.factions.pair_mut(own, *seller)?;
                let receipt = self.economy.execute_trade(buyer, seller, item, *quantity)?;
                events.push(GameEvent::TradeExecuted(receipt));
            }
        }
        Ok(())
    }

    fn own_faction(&self, index: usize) -> Result<FactionId> {
        let player = &self.players[index];
        player.faction.ok_or(GameError::NotInFaction(player.id))
    }

    fn leave_faction(&mut self, index: usize) {
        let player = self.players[index].id;
        if let Some(old) = self.players[index].faction.take() {
            if self.factions.remove_member(old, player).is_err() {
                tracing::debug!(player, faction = %old, "Left a faction that no longer exists");
            }
        }
    }

    fn update_resources(&mut self, index: usize) {
        let player = &mut self.players[index];
        let Some(rates) = player.rates.as_ref() else {
            return;
        };
        let modifiers = player
            .faction
            .and_then(|id| self.factions.get(id).ok())
            .map_or_else(FactionModifiers::default, |f| f.modifiers);
        player.resources.process_tick(rates, &modifiers);
    }

    fn player_index(&self, id: EntityId) -> Result<usize> {
        self.players
            .iter()
            .position(|p| p.id == id)
            .ok_or(GameError::PlayerNotFound(id))
    }

    // ---- queries ---------------------------------------------------------

    /// Ticks completed.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Simulation tuning in use.
    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Players in roster order.
    #[must_use]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Look up a player.
    pub fn player(&self, id: EntityId) -> Result<&Player> {
        self.players
            .iter()
            .find(|p| p.id == id)
            .ok_or(GameError::PlayerNotFound(id))
    }

    /// Commands waiting for a player's next tick.
    #[must_use]
    pub fn pending_commands(&self, player: EntityId) -> &[PlayerCommand] {
        self.pending.get(&player).map_or(&[], Vec::as_slice)
    }

    /// Shared structures.
    #[must_use]
    pub fn structures(&self) -> &[Structure] {
        &self.structures
    }

    /// Faction registry.
    #[must_use]
    pub const fn factions(&self) -> &FactionRegistry {
        &self.factions
    }

    /// Faction registry, mutably.
    pub fn factions_mut(&mut self) -> &mut FactionRegistry {
        &mut self.factions
    }

    /// Technology tree and research queue.
    #[must_use]
    pub const fn tech_tree(&self) -> &TechTree {
        &self.tech
    }

    /// Faction markets.
    #[must_use]
    pub const fn economy(&self) -> &EconomySystem {
        &self.economy
    }

    /// Active hazards.
    #[must_use]
    pub const fn hazards(&self) -> &EnvironmentalChallenges {
        &self.hazards
    }

    /// Known planets.
    #[must_use]
    pub const fn world(&self) -> &WorldGenerator {
        &self.world
    }

    /// Spacecraft not assigned to a fleet.
    #[must_use]
    pub const fn exploration(&self) -> &SpaceExploration {
        &self.exploration
    }

    /// Fleets.
    #[must_use]
    pub const fn fleets(&self) -> &FleetOperations {
        &self.fleets
    }

    /// AI entities.
    #[must_use]
    pub const fn ai(&self) -> &AiSystem {
        &self.ai
    }

    /// Narrative history.
    #[must_use]
    pub const fn narrative(&self) -> &NarrativeEngine {
        &self.narrative
    }

    /// Serializable copy of the current world.
    #[must_use]
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            tick: self.tick,
            players: self.players.clone(),
            factions: self.factions.iter().cloned().collect(),
            structures: self.structures.clone(),
            planets: self.world.planets().to_vec(),
            hazards: self
                .hazards
                .iter()
                .map(|(planet, hazards)| (planet.clone(), hazards.clone()))
                .collect(),
            spacecraft: self.exploration.iter().cloned().collect(),
            fleets: self.fleets.iter().cloned().collect(),
            markets: self
                .economy
                .markets()
                .map(|(id, market)| (*id, market.clone()))
                .collect(),
            research: self.tech.projects().to_vec(),
            history: self.narrative.historical_events().to_vec(),
        }
    }

    /// Hash of the current world state.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        self.snapshot().state_hash()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::ScriptedRandom;

    fn quiet_loop() -> GameLoop {
        let config = GameConfig {
            initial_planets: 2,
            hazard_flare_chance_percent: 0,
            ..GameConfig::default()
        };
        GameLoop::seeded(config, DataTables::builtin(), 7)
    }

    #[test]
    fn test_new_generates_world() {
        let game = quiet_loop();
        assert_eq!(game.world().planets().len(), 2);
        assert_eq!(game.hazards().affected_planets(), 2);
        assert_eq!(game.narrative().opening_events().len(), 1);
        assert_eq!(game.tick_count(), 0);
    }

    #[test]
    fn test_phases_run_in_order() {
        let mut game = quiet_loop();
        for tick in 1..=3 {
            let events = game.tick();
            assert_eq!(events.tick, tick);
            assert_eq!(events.phases, Phase::ALL.to_vec());
        }
    }

    #[test]
    fn test_command_phases() {
        assert_eq!(PlayerCommand::LeaveFaction.phase(), Phase::Community);
        assert_eq!(PlayerCommand::SurveySector.phase(), Phase::Exploration);
        assert_eq!(
            PlayerCommand::Research {
                technology: TechId(1)
            }
            .phase(),
            Phase::Technology
        );
        assert_eq!(PlayerCommand::Attack { target: 1 }.phase(), Phase::Conflict);
    }

    #[test]
    fn test_queue_for_unknown_player() {
        let mut game = quiet_loop();
        assert_eq!(
            game.queue_command(42, PlayerCommand::LeaveFaction),
            Err(GameError::PlayerNotFound(42))
        );
    }

    #[test]
    fn test_failing_command_does_not_block_others() {
        let mut game = quiet_loop();
        let ana = game.add_player("Ana");
        let bo = game.add_player("Bo");

        game.queue_command(ana, PlayerCommand::Craft { recipe: "Stone Axe".into() }).unwrap();
        game.queue_command(bo, PlayerCommand::Move { to: Position::new(4, 2, 0) }).unwrap();

        let events = game.tick();

        assert_eq!(events.failures.len(), 1);
        assert_eq!(events.failures[0].player, ana);
        assert_eq!(events.failures[0].kind, ErrorKind::PreconditionUnmet);
        assert_eq!(game.player(bo).unwrap().position, Position::new(4, 2, 0));
        assert!(game.pending_commands(ana).is_empty());
    }

    #[test]
    fn test_create_faction_opens_market() {
        let mut game = quiet_loop();
        let ana = game.add_player("Ana");
        game.queue_command(ana, PlayerCommand::CreateFaction { name: "Union".into() }).unwrap();

        let events = game.tick();

        let faction = game.player(ana).unwrap().faction.unwrap();
        assert!(game.economy().market(faction).is_ok());
        assert_eq!(game.factions().get(faction).unwrap().credits, 1_000);
        assert!(events.events.contains(&GameEvent::FactionCreated { faction, founder: ana }));
    }

    #[test]
    fn test_leaving_disbands_empty_faction() {
        let mut game = quiet_loop();
        let ana = game.add_player("Ana");
        game.queue_command(ana, PlayerCommand::CreateFaction { name: "Union".into() }).unwrap();
        game.tick();
        let faction = game.player(ana).unwrap().faction.unwrap();

        game.queue_command(ana, PlayerCommand::LeaveFaction).unwrap();
        let events = game.tick();

        assert!(events.events.contains(&GameEvent::FactionDisbanded { faction }));
        assert!(game.factions().get(faction).is_err());
        assert!(game.economy().market(faction).is_err());
    }

    #[test]
    fn test_research_without_faction_fails() {
        let mut game = quiet_loop();
        let ana = game.add_player("Ana");
        game.queue_command(ana, PlayerCommand::Research { technology: TechId(1) }).unwrap();

        let events = game.tick();
        assert_eq!(events.failures[0].phase, Phase::Technology);
        assert_eq!(events.failures[0].message, format!("Player {ana} is not a member of any faction"));
    }

    #[test]
    fn test_end_stops_run_after_current_tick() {
        let mut game = quiet_loop();
        let handle = game.handle();
        let ticks = game.run_with(|events| {
            if events.tick == 3 {
                handle.end();
            }
        });
        assert_eq!(ticks, 3);
        assert_eq!(game.tick_count(), 3);
        assert!(!game.is_active());
    }

    #[test]
    fn test_ended_loop_runs_nothing() {
        let mut game = quiet_loop();
        game.end();
        assert_eq!(game.run(), 0);
    }

    #[test]
    fn test_same_seed_same_hash() {
        let run = || {
            let mut game = quiet_loop();
            let ana = game.add_player("Ana");
            game.queue_command(ana, PlayerCommand::CreateFaction { name: "Union".into() }).unwrap();
            for _ in 0..10 {
                game.tick();
            }
            game.state_hash()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_scripted_rng_loop() {
        let config = GameConfig {
            initial_planets: 0,
            ..GameConfig::default()
        };
        let mut game = GameLoop::new(config, DataTables::builtin(), Box::new(ScriptedRandom::new([1])));
        game.add_player("Ana");
        let events = game.tick();
        assert!(events.failures.is_empty());
        assert!(game.world().planets().is_empty());
    }
}
