use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{net::PetriNet, properties::PropertySet, synthesis::SynthesisMode};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisStatistics {
    pub event_problems: u64,
    pub state_problems: u64,
    pub strategy_calls: u64,
    /// Problems solved by a region that was already known.
    pub reused_regions: u64,
    pub new_regions: u64,
    pub regions_before_minimization: usize,
    pub regions_after_minimization: usize,
    pub guard_regions: usize,
    pub time: std::time::Duration,
}

/// Everything a caller may want to know about a synthesis run, with states and
/// events replaced by their names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisReport {
    pub name: String,
    pub mode: SynthesisMode,
    pub properties: PropertySet,
    pub success: bool,
    /// Event label to the states in which it could not be disabled.
    pub failed_event_separation: BTreeMap<String, Vec<String>>,
    /// Groups of states that could not be told apart.
    pub failed_state_separation: Vec<Vec<String>>,
    pub regions: Vec<String>,
    pub statistics: SynthesisStatistics,
    pub net: Option<PetriNet>,
}

impl SynthesisReport {
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
