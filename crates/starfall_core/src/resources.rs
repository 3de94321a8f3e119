//! Named resource stockpiles with capacity limits.
//!
//! Quantities are always clamped into `[0, max_capacity]`. Producers and
//! consumers are expressed as [`ResourceRates`] attached to a player
//! rather than as entity subtypes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::factions::FactionModifiers;

/// Resource boosted by the food-production modifier.
pub const FOOD: &str = "food";

/// Resource boosted by the energy-efficiency modifier.
pub const ENERGY: &str = "energy";

/// A tracked resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Resource name.
    pub name: String,
    /// Current quantity.
    pub quantity: u32,
    /// Quantity cap.
    pub max_capacity: u32,
}

impl Resource {
    /// Create a resource, clamping the quantity to its capacity.
    #[must_use]
    pub fn new(name: impl Into<String>, quantity: u32, max_capacity: u32) -> Self {
        Self {
            name: name.into(),
            quantity: quantity.min(max_capacity),
            max_capacity,
        }
    }
}

/// Per-tick production and consumption amounts keyed by resource name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceRates {
    /// Amount produced each tick.
    #[serde(default)]
    pub production: BTreeMap<String, u32>,
    /// Amount consumed each tick.
    #[serde(default)]
    pub consumption: BTreeMap<String, u32>,
}

impl ResourceRates {
    /// Builder method to add a production rate.
    #[must_use]
    pub fn producing(mut self, resource: impl Into<String>, amount: u32) -> Self {
        self.production.insert(resource.into(), amount);
        self
    }

    /// Builder method to add a consumption rate.
    #[must_use]
    pub fn consuming(mut self, resource: impl Into<String>, amount: u32) -> Self {
        self.consumption.insert(resource.into(), amount);
        self
    }
}

/// Resource stockpile keyed by name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceManager {
    resources: BTreeMap<String, Resource>,
}

impl ResourceManager {
    /// Create an empty stockpile.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register resources, replacing any with the same name.
    pub fn initialize_resources(&mut self, initial: impl IntoIterator<Item = Resource>) {
        for resource in initial {
            let resource = Resource::new(resource.name, resource.quantity, resource.max_capacity);
            self.resources.insert(resource.name.clone(), resource);
        }
    }

    /// Add or subtract from a resource, clamping into `[0, max_capacity]`.
    ///
    /// Returns the new quantity.
    pub fn update_resource(&mut self, name: &str, amount: i64) -> Result<u32> {
        let resource = self
            .resources
            .get_mut(name)
            .ok_or_else(|| GameError::ResourceNotFound(name.to_string()))?;

        let updated = (i64::from(resource.quantity) + amount).clamp(0, i64::from(resource.max_capacity));
        resource.quantity = u32::try_from(updated).unwrap_or(resource.max_capacity);
        Ok(resource.quantity)
    }

    /// Look up a resource.
    #[must_use]
    pub fn get_resource(&self, name: &str) -> Option<&Resource> {
        self.resources.get(name)
    }

    /// Quantity of a resource, zero when untracked.
    #[must_use]
    pub fn quantity(&self, name: &str) -> u32 {
        self.resources.get(name).map_or(0, |r| r.quantity)
    }

    /// Iterate over tracked resources in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    /// Apply one tick of production and consumption.
    ///
    /// Production of [`FOOD`] and [`ENERGY`] is boosted by the matching
    /// faction modifier. Resources the stockpile does not track are skipped.
    pub fn process_tick(&mut self, rates: &ResourceRates, modifiers: &FactionModifiers) {
        for (name, amount) in &rates.production {
            let boosted = modifiers.boost_production(name, *amount);
            if self.update_resource(name, i64::from(boosted)).is_err() {
                tracing::trace!(resource = %name, "production skipped for untracked resource");
            }
        }
        for (name, amount) in &rates.consumption {
            if self.update_resource(name, -i64::from(*amount)).is_err() {
                tracing::trace!(resource = %name, "consumption skipped for untracked resource");
            }
        }
    }
}
