//! Environmental hazards active on planets.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::rng::RandomSource;
use crate::world::Planet;

/// Lowest hazard severity.
pub const MIN_SEVERITY: u8 = 1;
/// Highest hazard severity.
pub const MAX_SEVERITY: u8 = 5;
/// Shortest hazard duration in ticks.
pub const MIN_DURATION: u32 = 10;
/// Longest hazard duration in ticks.
pub const MAX_DURATION: u32 = 100;

/// Kinds of environmental hazard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HazardKind {
    /// Charged particle storms.
    RadiationStorms,
    /// Unbreathable air.
    ToxicAtmospheres,
    /// Hostile climate zones.
    ExtremeBiomes,
    /// Falling debris.
    MeteorShowers,
    /// Quakes and eruptions.
    TectonicInstability,
    /// Scorching or freezing surface.
    ExtremeTemperatures,
    /// Ground tremors.
    SeismicActivity,
}

impl HazardKind {
    /// Every hazard kind.
    pub const ALL: [Self; 7] = [
        Self::RadiationStorms,
        Self::ToxicAtmospheres,
        Self::ExtremeBiomes,
        Self::MeteorShowers,
        Self::TectonicInstability,
        Self::ExtremeTemperatures,
        Self::SeismicActivity,
    ];

    /// Human-readable name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::RadiationStorms => "radiation storms",
            Self::ToxicAtmospheres => "toxic atmospheres",
            Self::ExtremeBiomes => "extreme biomes",
            Self::MeteorShowers => "meteor showers",
            Self::TectonicInstability => "tectonic instability",
            Self::ExtremeTemperatures => "extreme temperatures",
            Self::SeismicActivity => "seismic activity",
        }
    }

    /// Base description shown to players.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::RadiationStorms => "Causes damage to unprotected electronics and health.",
            Self::ToxicAtmospheres => "Can cause severe respiratory issues without proper gear.",
            Self::ExtremeBiomes => {
                "Extreme temperatures requiring specialized equipment for survival."
            }
            Self::MeteorShowers => {
                "Potential damage to structures and vehicles from high-speed impacts."
            }
            Self::TectonicInstability => {
                "Risk of earthquakes and volcanic activity that can alter terrain."
            }
            Self::ExtremeTemperatures => "Surface temperatures swing beyond what bare skin survives.",
            Self::SeismicActivity => "Frequent tremors threaten foundations and excavations.",
        }
    }
}

/// A hazard active on a planet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentalHazard {
    /// Hazard kind.
    pub kind: HazardKind,
    /// Description including the severity.
    pub description: String,
    /// Severity from 1 to 5.
    pub severity: u8,
    /// Ticks left before the hazard subsides.
    pub duration: u32,
}

/// Active hazards keyed by planet name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EnvironmentalChallenges {
    active: BTreeMap<String, Vec<EnvironmentalHazard>>,
}

impl EnvironmentalChallenges {
    /// Create an empty hazard tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Roll one hazard per hazard kind the planet is prone to.
    ///
    /// Replaces whatever was active on that planet.
    pub fn generate_hazards_for_planet(
        &mut self,
        planet: &Planet,
        rng: &mut dyn RandomSource,
    ) -> Vec<EnvironmentalHazard> {
        let hazards: Vec<EnvironmentalHazard> = planet
            .hazards
            .iter()
            .map(|kind| {
                let severity = rng.next_in_range(i64::from(MIN_SEVERITY), i64::from(MAX_SEVERITY) + 1);
                let severity = u8::try_from(severity).unwrap_or(MIN_SEVERITY);
                let duration = rng.next_in_range(i64::from(MIN_DURATION), i64::from(MAX_DURATION) + 1);
                let duration = u32::try_from(duration).unwrap_or(MIN_DURATION);
                EnvironmentalHazard {
                    kind: *kind,
                    description: format!("{} Severity level: {severity}", kind.description()),
                    severity,
                    duration,
                }
            })
            .collect();

        if hazards.is_empty() {
            self.active.remove(&planet.name);
        } else {
            tracing::debug!(planet = %planet.name, count = hazards.len(), "Hazards generated");
            self.active.insert(planet.name.clone(), hazards.clone());
        }
        hazards
    }

    /// Advance every hazard by one tick.
    ///
    /// Returns the hazards that expired, paired with their planet name.
    pub fn update_hazards(&mut self) -> Vec<(String, EnvironmentalHazard)> {
        let mut expired = Vec::new();

        self.active.retain(|planet, hazards| {
            hazards.retain_mut(|hazard| {
                hazard.duration = hazard.duration.saturating_sub(1);
                if hazard.duration == 0 {
                    expired.push((planet.clone(), hazard.clone()));
                    false
                } else {
                    true
                }
            });
            !hazards.is_empty()
        });

        expired
    }

    /// Hazards active on a planet.
    #[must_use]
    pub fn active_for(&self, planet: &str) -> &[EnvironmentalHazard] {
        self.active.get(planet).map_or(&[], Vec::as_slice)
    }

    /// Check if a planet has any active hazard.
    #[must_use]
    pub fn has_active(&self, planet: &str) -> bool {
        self.active.contains_key(planet)
    }

    /// Iterate over planets with active hazards.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<EnvironmentalHazard>)> {
        self.active.iter()
    }

    /// Number of planets with active hazards.
    #[must_use]
    pub fn affected_planets(&self) -> usize {
        self.active.len()
    }
}
