//! Workout difficulty tiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Difficulty tier governing which catalog exercises are eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyTier {
    Low,
    Medium,
    High,
}

impl DifficultyTier {
    /// Parse a user-supplied difficulty, falling back to [`DifficultyTier::Low`]
    /// on anything unrecognized. Case- and whitespace-insensitive.
    pub fn parse_lenient(value: &str) -> Self {
        value.parse().unwrap_or(DifficultyTier::Low)
    }
}

impl Default for DifficultyTier {
    fn default() -> Self {
        DifficultyTier::Low
    }
}

impl fmt::Display for DifficultyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DifficultyTier::Low => "low",
            DifficultyTier::Medium => "medium",
            DifficultyTier::High => "high",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("unknown difficulty tier: {0}")]
pub struct ParseDifficultyError(String);

impl FromStr for DifficultyTier {
    type Err = ParseDifficultyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(DifficultyTier::Low),
            "medium" => Ok(DifficultyTier::Medium),
            "high" => Ok(DifficultyTier::High),
            other => Err(ParseDifficultyError(other.to_string())),
        }
    }
}
