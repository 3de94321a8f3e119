//! Recipe-based crafting.

use serde::{Deserialize, Serialize};

use crate::entities::{Inventory, Item};
use crate::error::{GameError, Result};

/// A component a recipe consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeComponent {
    /// Item name.
    pub item: String,
    /// Quantity consumed.
    pub quantity: u32,
}

/// A crafting recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    /// Recipe name, used for lookup.
    pub name: String,
    /// Components consumed.
    pub required_items: Vec<RecipeComponent>,
    /// Item produced.
    pub result_item: String,
    /// Quantity produced.
    pub result_quantity: u32,
}

impl Recipe {
    /// Create a recipe from `(item, quantity)` pairs.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        required: &[(&str, u32)],
        result_item: impl Into<String>,
        result_quantity: u32,
    ) -> Self {
        Self {
            name: name.into(),
            required_items: required
                .iter()
                .map(|(item, quantity)| RecipeComponent {
                    item: (*item).to_string(),
                    quantity: *quantity,
                })
                .collect(),
            result_item: result_item.into(),
            result_quantity,
        }
    }
}

/// Built-in recipes.
#[must_use]
pub fn builtin_recipes() -> Vec<Recipe> {
    vec![
        Recipe::new("Water Filter", &[("Charcoal", 2), ("Plastic Bottle", 1)], "Clean Water", 3),
        Recipe::new("Stone Axe", &[("Stone", 1), ("Wood Stick", 2)], "Axe", 1),
        Recipe::new("Fire Starter", &[("Flint", 1), ("Tinder", 1)], "Fire", 1),
    ]
}

/// Known recipes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeBook {
    recipes: Vec<Recipe>,
}

impl Default for RecipeBook {
    fn default() -> Self {
        Self::new(builtin_recipes())
    }
}

impl RecipeBook {
    /// Create a book over the given recipes.
    #[must_use]
    pub fn new(recipes: Vec<Recipe>) -> Self {
        Self { recipes }
    }

    /// Look up a recipe.
    pub fn get(&self, name: &str) -> Result<&Recipe> {
        self.recipes
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| GameError::RecipeNotFound(name.to_string()))
    }

    /// Every recipe.
    #[must_use]
    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    /// Craft a recipe from an inventory.
    ///
    /// Either every component is deducted and the result added, or the
    /// inventory is left untouched. Returns the produced stack.
    pub fn craft_item(&self, inventory: &mut Inventory, recipe_name: &str) -> Result<Item> {
        let recipe = self.get(recipe_name)?;

        // Sum per item so a recipe listing the same component twice is checked as a whole
        let mut needed: Vec<(&str, u32)> = Vec::new();
        for component in &recipe.required_items {
            match needed.iter_mut().find(|(item, _)| *item == component.item) {
                Some((_, quantity)) => *quantity = quantity.saturating_add(component.quantity),
                None => needed.push((component.item.as_str(), component.quantity)),
            }
        }

        if let Some((item, required)) = needed.iter().find(|(item, q)| !inventory.has(item, *q)) {
            return Err(GameError::InsufficientMaterials {
                recipe: recipe.name.clone(),
                item: (*item).to_string(),
                required: *required,
                available: inventory.quantity_of(item),
            });
        }

        for (item, quantity) in &needed {
            inventory.remove(item, *quantity)?;
        }

        let crafted = Item::new(recipe.result_item.clone(), recipe.result_quantity);
        inventory.add(crafted.clone());
        tracing::debug!(recipe = %recipe.name, item = %crafted.name, quantity = crafted.quantity, "Item crafted");
        Ok(crafted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_craft_deducts_exactly() {
        let book = RecipeBook::default();
        let mut inv = Inventory::new();
        inv.add(Item::new("Charcoal", 5));
        inv.add(Item::new("Plastic Bottle", 1));

        let crafted = book.craft_item(&mut inv, "Water Filter").unwrap();

        assert_eq!(crafted, Item::new("Clean Water", 3));
        assert_eq!(inv.quantity_of("Charcoal"), 3);
        assert_eq!(inv.quantity_of("Plastic Bottle"), 0);
        assert_eq!(inv.quantity_of("Clean Water"), 3);
    }

    #[test]
    fn test_insufficient_materials_leaves_inventory() {
        let book = RecipeBook::default();
        let mut inv = Inventory::new();
        inv.add(Item::new("Stone", 1));
        inv.add(Item::new("Wood Stick", 1));
        let before = inv.clone();

        let err = book.craft_item(&mut inv, "Stone Axe").unwrap_err();

        assert_eq!(
            err,
            GameError::InsufficientMaterials {
                recipe: "Stone Axe".into(),
                item: "Wood Stick".into(),
                required: 2,
                available: 1,
            }
        );
        assert_eq!(inv, before);
    }

    #[test]
    fn test_unknown_recipe() {
        let book = RecipeBook::default();
        let mut inv = Inventory::new();
        assert_eq!(
            book.craft_item(&mut inv, "Laser Sword").unwrap_err(),
            GameError::RecipeNotFound("Laser Sword".into())
        );
    }

    #[test]
    fn test_duplicate_components_are_summed() {
        let book = RecipeBook::new(vec![Recipe::new(
            "Bundle",
            &[("Twig", 1), ("Twig", 1)],
            "Kindling",
            1,
        )]);
        let mut inv = Inventory::new();
        inv.add(Item::new("Twig", 1));

        assert!(book.craft_item(&mut inv, "Bundle").is_err());
        assert_eq!(inv.quantity_of("Twig"), 1);
    }
}
