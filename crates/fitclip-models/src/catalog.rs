//! The exercise catalog: category -> difficulty tier -> exercises.
//!
//! The catalog is loaded once at process start and shared read-only across
//! the run. Lookup failures for a category or tier that the structure is
//! expected to carry are structural errors, fatal to the whole match; an
//! empty exercise list is a per-segment condition handled by the caller.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use url::Url;

use crate::difficulty::DifficultyTier;

/// Exercise categories, one per structural segment role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Warmup,
    Core,
    Cooldown,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Category::Warmup => "warmup",
            Category::Core => "core",
            Category::Cooldown => "cooldown",
        };
        write!(f, "{}", s)
    }
}

/// One catalog exercise record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub name: String,
    /// Remote location of the exercise media clip.
    pub media_url: String,
    /// Guidance text read alongside the exercise.
    #[serde(default)]
    pub narration_text: String,
}

/// Errors raised by catalog loading and lookup.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog file unreadable: {0}")]
    Unreadable(#[from] std::io::Error),

    #[error("catalog is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("catalog has no '{0}' category")]
    MissingCategory(Category),

    #[error("catalog category '{category}' has no '{tier}' tier")]
    MissingTier {
        category: Category,
        tier: DifficultyTier,
    },

    #[error("exercise '{name}' has an invalid media url: {reason}")]
    InvalidMediaUrl { name: String, reason: String },
}

/// Read-only mapping from category to tier to an ordered exercise list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    entries: HashMap<Category, HashMap<DifficultyTier, Vec<Exercise>>>,
}

impl Catalog {
    /// Parse a catalog from its JSON representation:
    /// `{ "<category>": { "<tier>": [ {name, media_url, narration_text} ] } }`.
    pub fn from_json_str(raw: &str) -> Result<Self, CatalogError> {
        let catalog: Catalog = serde_json::from_str(raw)?;
        catalog.validate_urls()?;
        Ok(catalog)
    }

    /// Look up the exercise list for a category and tier.
    ///
    /// A missing category or tier is a structural error: it signals a
    /// malformed or incomplete catalog, not a per-item condition.
    pub fn exercises(
        &self,
        category: Category,
        tier: DifficultyTier,
    ) -> Result<&[Exercise], CatalogError> {
        let tiers = self
            .entries
            .get(&category)
            .ok_or(CatalogError::MissingCategory(category))?;
        let list = tiers
            .get(&tier)
            .ok_or(CatalogError::MissingTier { category, tier })?;
        Ok(list)
    }

    /// Add an exercise list for a category/tier pair, replacing any
    /// existing list.
    pub fn insert(&mut self, category: Category, tier: DifficultyTier, list: Vec<Exercise>) {
        self.entries.entry(category).or_default().insert(tier, list);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of exercise records across all categories and tiers.
    pub fn len(&self) -> usize {
        self.entries
            .values()
            .flat_map(|tiers| tiers.values())
            .map(|list| list.len())
            .sum()
    }

    fn validate_urls(&self) -> Result<(), CatalogError> {
        for list in self.entries.values().flat_map(|tiers| tiers.values()) {
            for exercise in list {
                Url::parse(&exercise.media_url).map_err(|e| CatalogError::InvalidMediaUrl {
                    name: exercise.name.clone(),
                    reason: e.to_string(),
                })?;
            }
        }
        Ok(())
    }
}
