//! Error types for the game simulation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entities::EntityId;
use crate::factions::FactionId;
use crate::technology::TechId;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Coarse classification of a [`GameError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// A keyed lookup (recipe, technology, faction, ...) found nothing.
    NotFound,
    /// The operation was well-formed but its preconditions do not hold.
    PreconditionUnmet,
    /// Static data failed to parse or validate.
    InvalidData,
}

/// Top-level error type for all game simulation errors.
///
/// Every variant leaves the state it was raised from unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// No recipe with this name.
    #[error("Recipe not found: {0}")]
    RecipeNotFound(String),

    /// No technology with this ID.
    #[error("Technology not found: {0}")]
    TechnologyNotFound(TechId),

    /// No faction with this ID.
    #[error("Faction not found: {0}")]
    FactionNotFound(FactionId),

    /// No resource with this name.
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// The faction has no market open.
    #[error("No market open for faction {0}")]
    MarketNotFound(FactionId),

    /// No player with this ID.
    #[error("Player not found: {0}")]
    PlayerNotFound(EntityId),

    /// No spacecraft with this ID.
    #[error("Spacecraft not found: {0}")]
    SpacecraftNotFound(EntityId),

    /// No fleet with this ID.
    #[error("Fleet not found: {0}")]
    FleetNotFound(EntityId),

    /// No planet with this name.
    #[error("Planet not found: {0}")]
    PlanetNotFound(String),

    /// Inventory lacks a crafting component.
    #[error("Insufficient materials for '{recipe}': need {required} {item}, have {available}")]
    InsufficientMaterials {
        /// Recipe being crafted.
        recipe: String,
        /// Missing component.
        item: String,
        /// Quantity the recipe needs.
        required: u32,
        /// Quantity in the inventory.
        available: u32,
    },

    /// Inventory lacks an item that is being removed.
    #[error("Insufficient items: need {required} {item}, have {available}")]
    InsufficientItems {
        /// Item name.
        item: String,
        /// Quantity requested.
        required: u32,
        /// Quantity held.
        available: u32,
    },

    /// A prerequisite technology has not been researched.
    #[error("Technology {technology} requires {missing}")]
    TechRequirementNotMet {
        /// Technology being started.
        technology: TechId,
        /// First missing prerequisite.
        missing: TechId,
    },

    /// The faction already has this technology queued.
    #[error("Research of technology {technology} already in progress for faction {faction}")]
    ResearchAlreadyQueued {
        /// Researching faction.
        faction: FactionId,
        /// Queued technology.
        technology: TechId,
    },

    /// The faction already owns this technology.
    #[error("Faction {faction} already researched technology {technology}")]
    AlreadyResearched {
        /// Researching faction.
        faction: FactionId,
        /// Owned technology.
        technology: TechId,
    },

    /// Not enough credits for a purchase or research.
    #[error("Insufficient credits: need {required}, have {available}")]
    InsufficientCredits {
        /// Credits required.
        required: u64,
        /// Credits available.
        available: u64,
    },

    /// Spacecraft has no fuel left to move.
    #[error("Spacecraft {0} has insufficient fuel")]
    InsufficientFuel(EntityId),

    /// Spacecraft cargo hold is full.
    #[error("Spacecraft {0} has no capacity to gather more resources")]
    NoCargoCapacity(EntityId),

    /// The seller has no offer covering the requested trade.
    #[error("No offer for {quantity} {item} available")]
    OfferUnavailable {
        /// Item requested.
        item: String,
        /// Quantity requested.
        quantity: u32,
    },

    /// The player must belong to a faction for this action.
    #[error("Player {0} is not a member of any faction")]
    NotInFaction(EntityId),

    /// The requested target is not valid for the action.
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// Data file parsing error.
    #[error("Failed to parse data '{source_name}': {message}")]
    DataParseError {
        /// Name of the data source that failed to parse.
        source_name: String,
        /// Error message.
        message: String,
    },

    /// Data tables failed validation.
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl GameError {
    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::RecipeNotFound(_)
            | Self::TechnologyNotFound(_)
            | Self::FactionNotFound(_)
            | Self::ResourceNotFound(_)
            | Self::MarketNotFound(_)
            | Self::PlayerNotFound(_)
            | Self::SpacecraftNotFound(_)
            | Self::FleetNotFound(_)
            | Self::PlanetNotFound(_) => ErrorKind::NotFound,
            Self::DataParseError { .. } | Self::InvalidData(_) => ErrorKind::InvalidData,
            _ => ErrorKind::PreconditionUnmet,
        }
    }
}
