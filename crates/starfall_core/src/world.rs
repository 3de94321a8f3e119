//! Planet and world generation.
//!
//! [`PlanetGenerator`] draws names from a catalog and is used for deep
//! space surveys. [`WorldGenerator`] builds the starting world from
//! planet templates and keeps every planet that exists.

use serde::{Deserialize, Serialize};

use crate::entities::Position;
use crate::error::{GameError, Result};
use crate::hazards::{EnvironmentalChallenges, HazardKind};
use crate::rng::{choose, shuffle, RandomSource};

/// Planet classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlanetType {
    /// Temperate with liquid water.
    EarthLike,
    /// No solid surface.
    GasGiant,
    /// Ice world.
    Frozen,
    /// Arid world.
    Desert,
    /// Covered in water.
    Oceanic,
    /// Active volcanism.
    Volcanic,
}

impl PlanetType {
    /// Every planet type.
    pub const ALL: [Self; 6] = [
        Self::EarthLike,
        Self::GasGiant,
        Self::Frozen,
        Self::Desert,
        Self::Oceanic,
        Self::Volcanic,
    ];

    /// Human-readable name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::EarthLike => "Earth-like",
            Self::GasGiant => "Gas giant",
            Self::Frozen => "Frozen",
            Self::Desert => "Desert",
            Self::Oceanic => "Oceanic",
            Self::Volcanic => "Volcanic",
        }
    }
}

/// A planet in the world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Planet {
    /// Unique name.
    pub name: String,
    /// Classification.
    pub planet_type: PlanetType,
    /// Resources that can be gathered.
    pub resources: Vec<String>,
    /// Hazards the planet is prone to.
    pub hazards: Vec<HazardKind>,
    /// Location in space.
    pub position: Position,
}

/// Native resources for a planet type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanetTemplate {
    /// Planet type this template produces.
    pub planet_type: PlanetType,
    /// Resources every planet of this type carries.
    pub resources: Vec<String>,
}

/// Built-in templates for the starting world.
#[must_use]
pub fn builtin_templates() -> Vec<PlanetTemplate> {
    let template = |planet_type, resources: &[&str]| PlanetTemplate {
        planet_type,
        resources: resources.iter().map(|r| (*r).to_string()).collect(),
    };
    vec![
        template(PlanetType::EarthLike, &["water", "food", "basic minerals"]),
        template(PlanetType::GasGiant, &["hydrogen", "helium"]),
        template(PlanetType::Frozen, &["ice", "rare minerals"]),
        template(PlanetType::Desert, &["silicon", "precious metals"]),
        template(PlanetType::Oceanic, &["water", "organic compounds"]),
    ]
}

/// Resource pool for surveyed planets.
pub const SURVEY_RESOURCES: [&str; 5] = [
    "water",
    "minerals",
    "rare metals",
    "organic compounds",
    "energy sources",
];

/// Hazards surveyed planets can carry.
pub const SURVEY_HAZARDS: [HazardKind; 5] = [
    HazardKind::RadiationStorms,
    HazardKind::MeteorShowers,
    HazardKind::ToxicAtmospheres,
    HazardKind::ExtremeTemperatures,
    HazardKind::SeismicActivity,
];

/// Hazards starting-world planets can carry.
pub const WORLD_HAZARDS: [HazardKind; 5] = [
    HazardKind::RadiationStorms,
    HazardKind::ToxicAtmospheres,
    HazardKind::ExtremeBiomes,
    HazardKind::MeteorShowers,
    HazardKind::TectonicInstability,
];

fn random_coordinate(rng: &mut dyn RandomSource, extent: i32) -> i32 {
    let value = rng.next_in_range(-i64::from(extent), i64::from(extent) + 1);
    i32::try_from(value).unwrap_or(0)
}

fn random_position(rng: &mut dyn RandomSource, extent: i32) -> Position {
    Position::new(
        random_coordinate(rng, extent),
        random_coordinate(rng, extent),
        random_coordinate(rng, extent),
    )
}

/// Shuffle a pool and keep a random prefix of `min..=max_len` entries.
fn random_subset<T: Clone>(rng: &mut dyn RandomSource, pool: &[T], max_len: usize) -> Vec<T> {
    let mut items = pool.to_vec();
    shuffle(rng, &mut items);
    let upper = max_len.min(items.len());
    let count = rng.next_in_range(1, i64::try_from(upper).unwrap_or(1) + 1);
    items.truncate(usize::try_from(count).unwrap_or(1));
    items
}

/// Generates planets for deep space surveys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanetGenerator {
    names: Vec<String>,
}

impl PlanetGenerator {
    /// Coordinate extent for surveyed planets.
    pub const EXTENT: i32 = 10_000;

    /// Create a generator drawing names from the catalog.
    #[must_use]
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Generate a random planet.
    pub fn generate_planet(&self, rng: &mut dyn RandomSource) -> Planet {
        let name = choose(rng, &self.names)
            .cloned()
            .unwrap_or_else(|| "Uncharted".to_string());
        let planet_type = *choose(rng, &PlanetType::ALL).unwrap_or(&PlanetType::Desert);
        let resources = random_subset(rng, &SURVEY_RESOURCES, SURVEY_RESOURCES.len())
            .into_iter()
            .map(str::to_string)
            .collect();
        let hazards = random_subset(rng, &SURVEY_HAZARDS, SURVEY_HAZARDS.len());
        let position = random_position(rng, Self::EXTENT);

        Planet {
            name,
            planet_type,
            resources,
            hazards,
            position,
        }
    }
}

/// Builds and owns the world's planets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldGenerator {
    templates: Vec<PlanetTemplate>,
    planets: Vec<Planet>,
}

impl Default for WorldGenerator {
    fn default() -> Self {
        Self::new(builtin_templates())
    }
}

impl WorldGenerator {
    /// Coordinate extent for starting-world planets.
    pub const EXTENT: i32 = 5_000;

    /// Most hazards a starting-world planet can carry.
    pub const MAX_HAZARDS: usize = 3;

    /// Create a generator over the given templates.
    #[must_use]
    pub fn new(templates: Vec<PlanetTemplate>) -> Self {
        Self {
            templates,
            planets: Vec::new(),
        }
    }

    /// Generate a planet and add it to the world.
    pub fn generate_planet(&mut self, rng: &mut dyn RandomSource) -> &Planet {
        let mut name = format!("Planet-{:04}", rng.next_in_range(1000, 9999));
        if self.planet(&name).is_ok() {
            name = format!("{name}-{}", self.planets.len());
        }

        let (planet_type, resources) = match choose(rng, &self.templates) {
            Some(template) => (template.planet_type, template.resources.clone()),
            None => (PlanetType::Desert, vec!["unknown".to_string()]),
        };
        let hazards = random_subset(rng, &WORLD_HAZARDS, Self::MAX_HAZARDS);
        let position = random_position(rng, Self::EXTENT);

        self.add_planet(Planet {
            name,
            planet_type,
            resources,
            hazards,
            position,
        })
    }

    /// Add an externally generated planet, renaming it if the name is taken.
    pub fn add_planet(&mut self, mut planet: Planet) -> &Planet {
        if self.planet(&planet.name).is_ok() {
            planet.name = format!("{} {}", planet.name, self.planets.len());
        }
        tracing::debug!(planet = %planet.name, kind = planet.planet_type.display_name(), "Planet added");
        let index = self.planets.len();
        self.planets.push(planet);
        &self.planets[index]
    }

    /// Every planet in the world.
    #[must_use]
    pub fn planets(&self) -> &[Planet] {
        &self.planets
    }

    /// Look up a planet by name.
    pub fn planet(&self, name: &str) -> Result<&Planet> {
        self.planets
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| GameError::PlanetNotFound(name.to_string()))
    }

    /// Give each quiet planet a chance for its hazards to flare up.
    ///
    /// `flare_chance_percent` is the chance, out of 100, that a planet with
    /// no active hazards regenerates them. Returns the names of planets
    /// that flared.
    pub fn update_world(
        &self,
        hazards: &mut EnvironmentalChallenges,
        rng: &mut dyn RandomSource,
        flare_chance_percent: u32,
    ) -> Vec<String> {
        let mut flared = Vec::new();
        for planet in &self.planets {
            if hazards.has_active(&planet.name) || planet.hazards.is_empty() {
                continue;
            }
            if rng.next_in_range(0, 100) < i64::from(flare_chance_percent) {
                hazards.generate_hazards_for_planet(planet, rng);
                flared.push(planet.name.clone());
            }
        }
        flared
    }
}
