//! Technology tree and per-faction research queue.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::factions::{Faction, FactionId, FactionModifiers};

/// Unique identifier for a technology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TechId(pub u32);

impl fmt::Display for TechId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Effect granted when a technology completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TechBenefit {
    /// Percentage bonus to food production.
    FoodProduction {
        /// Bonus in percent.
        percent: u32,
    },
    /// Percentage bonus to energy production.
    EnergyEfficiency {
        /// Bonus in percent.
        percent: u32,
    },
    /// Unlocks surveying for new planets.
    InterstellarTravel,
}

impl TechBenefit {
    /// Apply this benefit to a faction's modifiers. Bonuses stack.
    pub fn apply(self, modifiers: &mut FactionModifiers) {
        match self {
            Self::FoodProduction { percent } => {
                modifiers.food_production_percent =
                    modifiers.food_production_percent.saturating_add(percent);
            }
            Self::EnergyEfficiency { percent } => {
                modifiers.energy_efficiency_percent =
                    modifiers.energy_efficiency_percent.saturating_add(percent);
            }
            Self::InterstellarTravel => modifiers.interstellar_travel = true,
        }
    }
}

/// A researchable technology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Technology {
    /// Unique identifier.
    pub id: TechId,
    /// Display name.
    pub name: String,
    /// Flavour text.
    pub description: String,
    /// Technologies that must be researched first.
    #[serde(default)]
    pub required_technologies: Vec<TechId>,
    /// Credits charged when research starts.
    pub cost: u64,
    /// Progress points needed to complete.
    pub duration: u32,
    /// Effects applied on completion.
    #[serde(default)]
    pub benefits: Vec<TechBenefit>,
}

/// Built-in technologies.
#[must_use]
pub fn builtin_technologies() -> Vec<Technology> {
    vec![
        Technology {
            id: TechId(1),
            name: "Advanced Agriculture".into(),
            description: "Enhances food production efficiency.".into(),
            required_technologies: Vec::new(),
            cost: 500,
            duration: 120,
            benefits: vec![TechBenefit::FoodProduction { percent: 20 }],
        },
        Technology {
            id: TechId(2),
            name: "Renewable Energy Systems".into(),
            description: "Develops sustainable energy sources reducing dependency on fossil fuels."
                .into(),
            required_technologies: vec![TechId(1)],
            cost: 800,
            duration: 150,
            benefits: vec![TechBenefit::EnergyEfficiency { percent: 25 }],
        },
        Technology {
            id: TechId(3),
            name: "Space Exploration".into(),
            description: "Enables interplanetary travel and colonization.".into(),
            required_technologies: vec![TechId(2)],
            cost: 1200,
            duration: 300,
            benefits: vec![TechBenefit::InterstellarTravel],
        },
    ]
}

/// Research in progress for one faction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchProject {
    /// Researching faction.
    pub faction: FactionId,
    /// Technology being researched.
    pub technology: TechId,
    /// Progress points accumulated.
    pub progress: u32,
}

/// Known technologies plus the research queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechTree {
    technologies: Vec<Technology>,
    projects: Vec<ResearchProject>,
}

impl Default for TechTree {
    fn default() -> Self {
        Self::new(builtin_technologies())
    }
}

impl TechTree {
    /// Create a tree over the given technologies with an empty queue.
    #[must_use]
    pub fn new(technologies: Vec<Technology>) -> Self {
        Self {
            technologies,
            projects: Vec::new(),
        }
    }

    /// Look up a technology.
    pub fn get(&self, id: TechId) -> Result<&Technology> {
        self.technologies
            .iter()
            .find(|t| t.id == id)
            .ok_or(GameError::TechnologyNotFound(id))
    }

    /// All known technologies.
    #[must_use]
    pub fn technologies(&self) -> &[Technology] {
        &self.technologies
    }

    /// Research currently queued.
    #[must_use]
    pub fn projects(&self) -> &[ResearchProject] {
        &self.projects
    }

    /// Queue research of a technology for a faction.
    ///
    /// All checks run before anything is mutated. On success the cost is
    /// deducted from the faction's credits.
    pub fn start_research(&mut self, faction: &mut Faction, technology: TechId) -> Result<()> {
        let tech = self.get(technology)?;

        if let Some(missing) = tech
            .required_technologies
            .iter()
            .find(|required| !faction.has_researched(**required))
        {
            return Err(GameError::TechRequirementNotMet {
                technology,
                missing: *missing,
            });
        }

        if self
            .projects
            .iter()
            .any(|p| p.faction == faction.id && p.technology == technology)
        {
            return Err(GameError::ResearchAlreadyQueued {
                faction: faction.id,
                technology,
            });
        }

        if faction.has_researched(technology) {
            return Err(GameError::AlreadyResearched {
                faction: faction.id,
                technology,
            });
        }

        if faction.credits < tech.cost {
            return Err(GameError::InsufficientCredits {
                required: tech.cost,
                available: faction.credits,
            });
        }

        faction.credits -= tech.cost;
        self.projects.push(ResearchProject {
            faction: faction.id,
            technology,
            progress: 0,
        });

        tracing::info!(faction = %faction.id, technology = %technology, "Research started");
        Ok(())
    }

    /// Add progress to every project of a faction.
    ///
    /// Completed projects leave the queue, are recorded on the faction and
    /// have their benefits applied. Returns the completed technologies.
    pub fn advance(&mut self, faction: &mut Faction, points: u32) -> Vec<TechId> {
        let mut completed = Vec::new();
        let technologies = &self.technologies;

        self.projects.retain_mut(|project| {
            if project.faction != faction.id {
                return true;
            }
            project.progress = project.progress.saturating_add(points);

            let Some(tech) = technologies.iter().find(|t| t.id == project.technology) else {
                return false;
            };
            if project.progress < tech.duration {
                return true;
            }

            faction.researched_technologies.push(tech.id);
            for benefit in &tech.benefits {
                benefit.apply(&mut faction.modifiers);
            }
            completed.push(tech.id);
            false
        });

        for technology in &completed {
            tracing::info!(faction = %faction.id, technology = %technology, "Research completed");
        }
        completed
    }

    /// Drop every project belonging to a faction.
    pub fn cancel_projects(&mut self, faction: FactionId) {
        self.projects.retain(|p| p.faction != faction);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn faction_with_credits(credits: u64) -> Faction {
        let mut faction = Faction::new(FactionId(1000), "Union");
        faction.credits = credits;
        faction
    }

    #[test]
    fn test_start_research_charges_cost() {
        let mut tree = TechTree::default();
        let mut faction = faction_with_credits(600);

        tree.start_research(&mut faction, TechId(1)).unwrap();
        assert_eq!(faction.credits, 100);
        assert_eq!(tree.projects().len(), 1);
    }

    #[test]
    fn test_missing_prerequisite() {
        let mut tree = TechTree::default();
        let mut faction = faction_with_credits(5000);

        let err = tree.start_research(&mut faction, TechId(2)).unwrap_err();
        assert_eq!(
            err,
            GameError::TechRequirementNotMet {
                technology: TechId(2),
                missing: TechId(1),
            }
        );
        assert_eq!(faction.credits, 5000);
    }

    #[test]
    fn test_duplicate_and_unknown() {
        let mut tree = TechTree::default();
        let mut faction = faction_with_credits(5000);

        tree.start_research(&mut faction, TechId(1)).unwrap();
        assert!(matches!(
            tree.start_research(&mut faction, TechId(1)),
            Err(GameError::ResearchAlreadyQueued { .. })
        ));
        assert_eq!(
            tree.start_research(&mut faction, TechId(77)),
            Err(GameError::TechnologyNotFound(TechId(77)))
        );
    }

    #[test]
    fn test_insufficient_credits_leaves_queue_empty() {
        let mut tree = TechTree::default();
        let mut faction = faction_with_credits(10);

        assert!(matches!(
            tree.start_research(&mut faction, TechId(1)),
            Err(GameError::InsufficientCredits { required: 500, available: 10 })
        ));
        assert!(tree.projects().is_empty());
    }

    #[test]
    fn test_advance_completes_and_applies_benefits() {
        let mut tree = TechTree::default();
        let mut faction = faction_with_credits(500);
        tree.start_research(&mut faction, TechId(1)).unwrap();

        assert!(tree.advance(&mut faction, 119).is_empty());
        assert_eq!(tree.advance(&mut faction, 1), vec![TechId(1)]);

        assert!(faction.has_researched(TechId(1)));
        assert_eq!(faction.modifiers.food_production_percent, 20);
        assert!(tree.projects().is_empty());
        assert!(matches!(
            tree.start_research(&mut faction, TechId(1)),
            Err(GameError::AlreadyResearched { .. })
        ));
    }

    #[test]
    fn test_advance_ignores_other_factions() {
        let mut tree = TechTree::default();
        let mut union = faction_with_credits(500);
        let mut other = Faction::new(FactionId(1001), "Syndicate");
        tree.start_research(&mut union, TechId(1)).unwrap();

        tree.advance(&mut other, 500);
        assert_eq!(tree.projects()[0].progress, 0);

        tree.cancel_projects(union.id);
        assert!(tree.projects().is_empty());
    }
}
