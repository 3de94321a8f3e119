//! Static data tables.
//!
//! Recipes, technologies, the planet catalog and starting resources are
//! plain data deserialized from RON. This module does no IO: callers read
//! the file and hand the text to [`DataTables::from_ron_str`].

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::crafting::{builtin_recipes, Recipe};
use crate::error::{GameError, Result};
use crate::resources::{Resource, ResourceRates, ENERGY, FOOD};
use crate::technology::{builtin_technologies, TechId, Technology};
use crate::world::{builtin_templates, PlanetTemplate};

/// Names drawn on by deep space surveys.
pub const PLANET_CATALOG: [&str; 26] = [
    "Aterra", "Borealis", "Cryon", "Dusara", "Ecliptor", "Fornax", "Gelara", "Hydrus", "Icarus",
    "Jovion", "Kryptos", "Luminar", "Mystara", "Nebulon", "Orionis", "Polarix", "Quasar",
    "Ragnarok", "Stellaris", "Triton", "Umbra", "Vortex", "Wraith", "Xanadu", "Ymir", "Zephyr",
];

/// Every static table the simulation reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataTables {
    /// Crafting recipes.
    pub recipes: Vec<Recipe>,
    /// Researchable technologies.
    pub technologies: Vec<Technology>,
    /// Names for surveyed planets.
    pub planet_names: Vec<String>,
    /// Templates for the starting world.
    pub planet_templates: Vec<PlanetTemplate>,
    /// Resources every new player starts with.
    #[serde(default)]
    pub starting_resources: Vec<Resource>,
    /// Production and consumption every new player starts with.
    #[serde(default)]
    pub starting_rates: ResourceRates,
}

impl Default for DataTables {
    fn default() -> Self {
        Self::builtin()
    }
}

impl DataTables {
    /// Tables compiled into the binary.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            recipes: builtin_recipes(),
            technologies: builtin_technologies(),
            planet_names: PLANET_CATALOG.iter().map(|n| (*n).to_string()).collect(),
            planet_templates: builtin_templates(),
            starting_resources: vec![
                Resource::new(FOOD, 50, 200),
                Resource::new("water", 50, 200),
                Resource::new(ENERGY, 20, 100),
                Resource::new("oxygen", 100, 100),
            ],
            starting_rates: ResourceRates::default()
                .producing(FOOD, 4)
                .producing(ENERGY, 2)
                .consuming(FOOD, 3)
                .consuming("water", 2)
                .consuming("oxygen", 1)
                .producing("oxygen", 1),
        }
    }

    /// Parse tables from RON text.
    ///
    /// `source_name` is only used in error messages.
    pub fn from_ron_str(source_name: &str, text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| GameError::DataParseError {
            source_name: source_name.to_string(),
            message: e.to_string(),
        })
    }

    /// Render tables as pretty RON.
    pub fn to_ron_string(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| GameError::InvalidData(e.to_string()))
    }

    /// Look up a technology.
    #[must_use]
    pub fn technology(&self, id: TechId) -> Option<&Technology> {
        self.technologies.iter().find(|t| t.id == id)
    }

    /// Check cross references and value ranges.
    ///
    /// Returns every problem found; an empty list means the tables are
    /// usable.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        let mut recipe_names = BTreeSet::new();
        for recipe in &self.recipes {
            if !recipe_names.insert(recipe.name.as_str()) {
                errors.push(format!("Duplicate recipe '{}'", recipe.name));
            }
            if recipe.required_items.is_empty() {
                errors.push(format!("Recipe '{}' consumes nothing", recipe.name));
            }
            if recipe.result_quantity == 0 {
                errors.push(format!("Recipe '{}' produces nothing", recipe.name));
            }
        }

        let mut tech_ids = BTreeSet::new();
        for tech in &self.technologies {
            if !tech_ids.insert(tech.id) {
                errors.push(format!("Duplicate technology id {}", tech.id));
            }
            if tech.duration == 0 {
                errors.push(format!("Technology '{}' has zero duration", tech.name));
            }
            for prereq in &tech.required_technologies {
                if *prereq == tech.id {
                    errors.push(format!("Technology '{}' requires itself", tech.name));
                } else if self.technology(*prereq).is_none() {
                    errors.push(format!(
                        "Technology '{}' has unknown prerequisite {}",
                        tech.name, prereq
                    ));
                }
            }
        }
        if let Some(id) = self.find_prerequisite_cycle() {
            errors.push(format!("Technology {id} is part of a prerequisite cycle"));
        }

        if self.planet_names.is_empty() {
            errors.push("Planet catalog is empty".to_string());
        }
        if self.planet_templates.is_empty() {
            errors.push("No planet templates".to_string());
        }
        for template in &self.planet_templates {
            if template.resources.is_empty() {
                errors.push(format!(
                    "Planet template '{}' has no resources",
                    template.planet_type.display_name()
                ));
            }
        }

        let mut resource_names = BTreeSet::new();
        for resource in &self.starting_resources {
            if !resource_names.insert(resource.name.as_str()) {
                errors.push(format!("Duplicate starting resource '{}'", resource.name));
            }
            if resource.quantity > resource.max_capacity {
                errors.push(format!(
                    "Starting resource '{}' exceeds its capacity",
                    resource.name
                ));
            }
        }
        for name in self
            .starting_rates
            .production
            .keys()
            .chain(self.starting_rates.consumption.keys())
        {
            if !resource_names.contains(name.as_str()) {
                errors.push(format!("Starting rate references unknown resource '{name}'"));
            }
        }

        errors
    }

    /// Validate, turning any problem into [`GameError::InvalidData`].
    pub fn validated(self) -> Result<Self> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(GameError::InvalidData(errors.join("; ")))
        }
    }

    fn find_prerequisite_cycle(&self) -> Option<TechId> {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Mark {
            Visiting,
            Done,
        }

        fn visit(
            tables: &DataTables,
            id: TechId,
            marks: &mut BTreeMap<TechId, Mark>,
        ) -> Option<TechId> {
            match marks.get(&id) {
                Some(Mark::Done) => return None,
                Some(Mark::Visiting) => return Some(id),
                None => {}
            }
            marks.insert(id, Mark::Visiting);
            if let Some(tech) = tables.technology(id) {
                for prereq in &tech.required_technologies {
                    if *prereq != id {
                        if let Some(cycle) = visit(tables, *prereq, marks) {
                            return Some(cycle);
                        }
                    }
                }
            }
            marks.insert(id, Mark::Done);
            None
        }

        let mut marks = BTreeMap::new();
        self.technologies
            .iter()
            .find_map(|tech| visit(self, tech.id, &mut marks))
    }
}
