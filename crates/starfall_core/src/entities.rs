//! Passive records for players, items and structures.
//!
//! Entities are plain data composed from optional capability fields
//! (combat stats, resource rates, faction membership) rather than a
//! type hierarchy. Mutators clamp instead of letting counters go
//! negative.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::factions::FactionId;
use crate::resources::{ResourceManager, ResourceRates};

/// Unique identifier for entities.
pub type EntityId = u64;

/// Integer position in world space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    /// X coordinate.
    pub x: i32,
    /// Y coordinate.
    pub y: i32,
    /// Z coordinate.
    pub z: i32,
}

impl Position {
    /// Create a new position.
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The world origin.
    pub const ORIGIN: Self = Self::new(0, 0, 0);

    /// Offset this position, saturating at the coordinate limits.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
            z: self.z.saturating_add(dz),
        }
    }
}

/// A stack of identical items.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Item {
    /// Item name, used as the stacking key.
    pub name: String,
    /// Number of items in the stack.
    pub quantity: u32,
}

impl Item {
    /// Create a new item stack.
    #[must_use]
    pub fn new(name: impl Into<String>, quantity: u32) -> Self {
        Self {
            name: name.into(),
            quantity,
        }
    }
}

/// Item stacks keyed by name.
///
/// Adding an item merges it into an existing stack of the same name.
/// Stacks that reach zero are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Inventory {
    items: Vec<Item>,
}

impl Inventory {
    /// Create an empty inventory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item stack.
    pub fn add(&mut self, item: Item) {
        if item.quantity == 0 {
            return;
        }
        match self.items.iter_mut().find(|i| i.name == item.name) {
            Some(stack) => stack.quantity = stack.quantity.saturating_add(item.quantity),
            None => self.items.push(item),
        }
    }

    /// Quantity held of the named item.
    #[must_use]
    pub fn quantity_of(&self, name: &str) -> u32 {
        self.items
            .iter()
            .find(|i| i.name == name)
            .map_or(0, |i| i.quantity)
    }

    /// Check if at least `quantity` of the named item is held.
    #[must_use]
    pub fn has(&self, name: &str, quantity: u32) -> bool {
        self.quantity_of(name) >= quantity
    }

    /// Remove `quantity` of the named item.
    ///
    /// Leaves the inventory unchanged when not enough is held.
    pub fn remove(&mut self, name: &str, quantity: u32) -> Result<()> {
        let available = self.quantity_of(name);
        if available < quantity {
            return Err(GameError::InsufficientItems {
                item: name.to_string(),
                required: quantity,
                available,
            });
        }
        if let Some(stack) = self.items.iter_mut().find(|i| i.name == name) {
            stack.quantity -= quantity;
        }
        self.items.retain(|i| i.quantity > 0);
        Ok(())
    }

    /// Iterate over the held stacks.
    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    /// Number of distinct stacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the inventory holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Attack and defense ratings for entities that can fight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CombatStats {
    /// Added to the attack roll.
    pub attack_power: i32,
    /// Added to the defense roll.
    pub defense: i32,
}

impl CombatStats {
    /// Create combat stats.
    #[must_use]
    pub const fn new(attack_power: i32, defense: i32) -> Self {
        Self {
            attack_power,
            defense,
        }
    }
}

/// A player in the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Unique identifier.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// World position.
    pub position: Position,
    /// Current health, never below zero.
    pub health: u32,
    /// Carried items.
    pub inventory: Inventory,
    /// Faction membership, if any.
    pub faction: Option<FactionId>,
    /// Combat ratings for players that can fight.
    pub combat: Option<CombatStats>,
    /// Personal resource stockpile.
    pub resources: ResourceManager,
    /// Production and consumption rates applied every resource tick.
    pub rates: Option<ResourceRates>,
}

impl Player {
    /// Create a player at a position with the given health.
    #[must_use]
    pub fn new(id: EntityId, name: impl Into<String>, position: Position, health: u32) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            health,
            inventory: Inventory::new(),
            faction: None,
            combat: None,
            resources: ResourceManager::new(),
            rates: None,
        }
    }

    /// Builder method to attach combat stats.
    #[must_use]
    pub const fn with_combat(mut self, stats: CombatStats) -> Self {
        self.combat = Some(stats);
        self
    }

    /// Builder method to attach resource rates.
    #[must_use]
    pub fn with_rates(mut self, rates: ResourceRates) -> Self {
        self.rates = Some(rates);
        self
    }

    /// Move the player to a new position.
    pub fn move_to(&mut self, position: Position) {
        self.position = position;
    }

    /// Add an item to the inventory.
    pub fn add_item(&mut self, item: Item) {
        self.inventory.add(item);
    }

    /// Remove items from the inventory.
    pub fn remove_item(&mut self, name: &str, quantity: u32) -> Result<()> {
        self.inventory.remove(name, quantity)
    }

    /// Check if the player still has health left.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.health > 0
    }
}

/// A building or structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Structure {
    /// Unique identifier.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// World position.
    pub position: Position,
    /// Remaining durability.
    pub durability: u32,
    /// Durability when fully repaired.
    pub max_durability: u32,
}

impl Structure {
    /// Create an undamaged structure.
    #[must_use]
    pub fn new(id: EntityId, name: impl Into<String>, position: Position, durability: u32) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            durability,
            max_durability: durability,
        }
    }

    /// Reduce durability, saturating at zero.
    pub fn damage(&mut self, amount: u32) {
        self.durability = self.durability.saturating_sub(amount);
    }

    /// Restore durability, saturating at the maximum.
    pub fn repair(&mut self, amount: u32) {
        self.durability = self
            .durability
            .saturating_add(amount)
            .min(self.max_durability);
    }

    /// Durability missing from the maximum.
    #[must_use]
    pub const fn missing_durability(&self) -> u32 {
        self.max_durability.saturating_sub(self.durability)
    }

    /// Check if the structure is destroyed.
    #[must_use]
    pub const fn is_destroyed(&self) -> bool {
        self.durability == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inventory_stacks_by_name() {
        let mut inv = Inventory::new();
        inv.add(Item::new("Stone", 1));
        inv.add(Item::new("Stone", 2));
        inv.add(Item::new("Flint", 1));
        inv.add(Item::new("Nothing", 0));

        assert_eq!(inv.len(), 2);
        assert_eq!(inv.quantity_of("Stone"), 3);
        assert_eq!(inv.quantity_of("Nothing"), 0);
    }

    #[test]
    fn test_inventory_remove() {
        let mut inv = Inventory::new();
        inv.add(Item::new("Tinder", 2));

        assert!(inv.remove("Tinder", 3).is_err());
        assert_eq!(inv.quantity_of("Tinder"), 2);

        inv.remove("Tinder", 2).unwrap();
        assert!(inv.is_empty());
    }

    #[test]
    fn test_structure_damage_saturates() {
        let mut wall = Structure::new(1, "Wall", Position::ORIGIN, 50);
        wall.damage(80);
        assert_eq!(wall.durability, 0);
        assert!(wall.is_destroyed());

        wall.repair(500);
        assert_eq!(wall.durability, 50);
        assert_eq!(wall.missing_durability(), 0);
    }

    #[test]
    fn test_player_move_and_items() {
        let mut player = Player::new(7, "Nova", Position::ORIGIN, 100);
        player.move_to(Position::new(3, 4, 5));
        assert_eq!(player.position, Position::new(3, 4, 5));

        player.add_item(Item::new("Axe", 1));
        assert!(player.remove_item("Axe", 1).is_ok());
        assert!(player.remove_item("Axe", 1).is_err());
        assert!(player.is_alive());
    }

    #[test]
    fn test_position_offset_saturates() {
        let p = Position::new(i32::MAX, 0, 0).offset(10, -5, 0);
        assert_eq!(p, Position::new(i32::MAX, -5, 0));
    }
}
