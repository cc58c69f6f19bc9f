use std::{fmt::Display, str::FromStr};

use region_synth_macros::config;
use serde::{Deserialize, Serialize};

use crate::logger::LogLevel;

pub trait GeneralConfig {
    fn logger(&self) -> &LoggerConfig;
}

config! {
    pub struct LoggerConfig {
        enabled: bool = false,
        log_file: bool = false,
        log_level: LogLevel = LogLevel::Warn,
    }
}

/// Selects how separating regions are searched for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SeparationStrategyKind {
    /// Integer feasibility over backward/forward weights and the initial
    /// marking, solved with z3. Supports every property.
    Ilp,
    /// Bounded enumeration of integer combinations of the region basis. Only
    /// produces pure regions.
    PureBasis,
}

impl FromStr for SeparationStrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ilp" | "z3" => Ok(SeparationStrategyKind::Ilp),
            "pure-basis" | "basis" => Ok(SeparationStrategyKind::PureBasis),
            _ => Err(format!("Invalid separation strategy: {}", s)),
        }
    }
}

impl Display for SeparationStrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeparationStrategyKind::Ilp => write!(f, "ilp"),
            SeparationStrategyKind::PureBasis => write!(f, "pure-basis"),
        }
    }
}

config! {
    /// Limits of the basis enumeration strategy.
    pub struct BasisConfig {
        /// Largest absolute coefficient tried per basis vector.
        max_coefficient: u32 = 2,
        /// Upper bound on the number of combinations looked at per problem.
        max_combinations: u64 = 200_000,
    }
}

config! {
    /// Everything a synthesis run needs besides the transition system and the
    /// requested properties.
    pub struct SynthesisConfig {
        strategy: SeparationStrategyKind = SeparationStrategyKind::Ilp,
        /// Stop at the first unsolvable separation problem.
        quick_fail: bool = false,
        /// Run the irredundancy pass after the greedy region set cover.
        minimize: bool = false,
        /// Re-check every region and the built net. Violations panic.
        verify: bool = cfg!(debug_assertions),
        timeout: Option<std::time::Duration> = None,
        /// Upper bound on the states created by the language transform.
        max_unfolding_states: usize = 100_000,
        nested basis: BasisConfig,
        nested logger: LoggerConfig,
    }
}

impl GeneralConfig for SynthesisConfig {
    fn logger(&self) -> &LoggerConfig {
        &self.logger
    }
}
