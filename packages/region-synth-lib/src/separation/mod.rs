use std::{fmt::Display, sync::Arc};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    config::{SeparationStrategyKind, SynthesisConfig},
    properties::PropertySet,
    region::{Region, RegionSpace},
    ts::{EventId, StateId},
};

pub mod basis;
pub mod ilp;

pub use basis::BasisSeparation;
pub use ilp::IlpSeparation;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeparationError {
    #[error("the distributed property needs a location on every event, '{0}' has none")]
    MissingLocation(String),
    #[error("the {strategy} strategy cannot produce regions that are {properties}")]
    UnsupportedProperties {
        strategy: SeparationStrategyKind,
        properties: String,
    },
}

/// One instance of the event/state or the state separation problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SeparationProblem {
    /// `event` has to be disabled in `state`.
    EventState { state: StateId, event: EventId },
    /// The two states need different markings.
    StateState { first: StateId, second: StateId },
}

impl SeparationProblem {
    /// Whether `region` solves this problem. States outside the reachable part
    /// are never separated.
    pub fn is_solved_by(&self, region: &Region) -> bool {
        match *self {
            SeparationProblem::EventState { state, event } => is_event_separating(region, state, event),
            SeparationProblem::StateState { first, second } => {
                is_state_separating(region, first, second)
            }
        }
    }
}

impl Display for SeparationProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeparationProblem::EventState { state, event } => {
                write!(f, "ESSP(s{}, e{})", state.index(), event)
            }
            SeparationProblem::StateState { first, second } => {
                write!(f, "SSP(s{}, s{})", first.index(), second.index())
            }
        }
    }
}

pub fn is_event_separating(region: &Region, state: StateId, event: EventId) -> bool {
    region.solves_event(state, event).unwrap_or(false)
}

pub fn is_state_separating(region: &Region, first: StateId, second: StateId) -> bool {
    region.solves_states(first, second).unwrap_or(false)
}

/// A way to search for separating regions.
///
/// `None` means the strategy found no region for the problem. This is a
/// definitive answer for the strategy, another strategy may still succeed.
/// Every returned region is consistent, satisfies the properties the strategy
/// was built with and solves the problem it was asked for.
pub trait Separation {
    fn kind(&self) -> SeparationStrategyKind;

    fn separate_event(&self, state: StateId, event: EventId) -> Option<Region>;

    fn separate_states(&self, first: StateId, second: StateId) -> Option<Region>;

    fn separate(&self, problem: SeparationProblem) -> Option<Region> {
        match problem {
            SeparationProblem::EventState { state, event } => self.separate_event(state, event),
            SeparationProblem::StateState { first, second } => self.separate_states(first, second),
        }
    }
}

/// Events have to either all carry a location or none may. Without any
/// locations every event counts as being in the same place.
pub fn check_locations(space: &RegionSpace, properties: &PropertySet) -> Result<(), SeparationError> {
    if !properties.is_distributed() {
        return Ok(());
    }

    let located = (0..space.event_count())
        .filter(|e| space.event_location(*e).is_some())
        .count();
    if located == 0 || located == space.event_count() {
        return Ok(());
    }

    let missing = (0..space.event_count())
        .find(|e| space.event_location(*e).is_none())
        .map(|e| space.event_label(e).to_string())
        .unwrap_or_default();

    Err(SeparationError::MissingLocation(missing))
}

/// Builds the strategy selected in `config`. Fails right away if the strategy
/// cannot honor `properties`.
pub fn create_separation(
    space: Arc<RegionSpace>,
    properties: PropertySet,
    config: &SynthesisConfig,
) -> Result<Box<dyn Separation>, SeparationError> {
    check_locations(&space, &properties)?;

    Ok(match config.get_strategy() {
        SeparationStrategyKind::Ilp => Box::new(IlpSeparation::new(space, properties)?),
        SeparationStrategyKind::PureBasis => Box::new(BasisSeparation::new(
            space,
            properties,
            config.get_basis().clone(),
        )?),
    })
}
