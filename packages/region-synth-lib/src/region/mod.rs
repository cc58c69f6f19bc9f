use std::{
    collections::BTreeSet,
    fmt::Display,
    hash::{Hash, Hasher},
    sync::Arc,
};

use itertools::Itertools;
use num::{BigInt, Signed, Zero};
use thiserror::Error;

use crate::{
    properties::PropertySet,
    ts::{EventId, StateId},
};

pub mod space;

pub use space::RegionSpace;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegionError {
    #[error("the transition system has no initial state")]
    MissingInitialState,
    #[error("expected a weight vector with {expected} entries, found {found}")]
    WrongLength { expected: usize, found: usize },
    #[error("weight of event {0} is negative")]
    NegativeWeight(EventId),
    #[error("the initial marking is negative")]
    NegativeMarking,
    #[error("state {0} is not reachable from the initial state")]
    UnreachableState(usize),
    #[error("region is inconsistent: {0}")]
    Inconsistent(String),
}

/// A candidate place: a backward and a forward weight per event plus an
/// initial marking.
///
/// Markings of states are derived from the Parikh vectors of the owning
/// [RegionSpace]. Equality and hashing ignore the space.
#[derive(Debug, Clone)]
pub struct Region {
    space: Arc<RegionSpace>,
    backward: Vec<BigInt>,
    forward: Vec<BigInt>,
    initial_marking: BigInt,
}

impl Region {
    pub fn new(
        space: Arc<RegionSpace>,
        backward: Vec<BigInt>,
        forward: Vec<BigInt>,
        initial_marking: BigInt,
    ) -> Result<Self, RegionError> {
        let expected = space.event_count();
        for weights in [&backward, &forward] {
            if weights.len() != expected {
                return Err(RegionError::WrongLength {
                    expected,
                    found: weights.len(),
                });
            }
            if let Some(event) = weights.iter().position(|w| w.is_negative()) {
                return Err(RegionError::NegativeWeight(event));
            }
        }
        if initial_marking.is_negative() {
            return Err(RegionError::NegativeMarking);
        }

        Ok(Region {
            space,
            backward,
            forward,
            initial_marking,
        })
    }

    /// Builds a pure region from its effect vector. Positive effects become
    /// forward weights, negative ones backward weights. Without an explicit
    /// marking the smallest marking that keeps the region consistent is used.
    pub fn pure(
        space: Arc<RegionSpace>,
        effects: Vec<BigInt>,
        initial_marking: Option<BigInt>,
    ) -> Result<Self, RegionError> {
        if effects.len() != space.event_count() {
            return Err(RegionError::WrongLength {
                expected: space.event_count(),
                found: effects.len(),
            });
        }

        let forward: Vec<BigInt> = effects
            .iter()
            .map(|x| if x.is_positive() { x.clone() } else { BigInt::zero() })
            .collect();
        let backward: Vec<BigInt> = effects
            .iter()
            .map(|x| if x.is_negative() { -x } else { BigInt::zero() })
            .collect();

        let initial_marking = match initial_marking {
            Some(marking) => marking,
            None => minimal_initial_marking(&space, &backward, &effects)?,
        };

        Region::new(space, backward, forward, initial_marking)
    }

    /// Builds the pure region whose effect is the linear combination of the
    /// basis of `space` with the given coefficients.
    pub fn from_basis_combination(
        space: Arc<RegionSpace>,
        coefficients: &[BigInt],
    ) -> Result<Self, RegionError> {
        let basis = space.basis();
        if coefficients.len() != basis.len() {
            return Err(RegionError::WrongLength {
                expected: basis.len(),
                found: coefficients.len(),
            });
        }

        let mut effects = vec![BigInt::zero(); space.event_count()];
        for (coefficient, vector) in coefficients.iter().zip(basis) {
            if coefficient.is_zero() {
                continue;
            }
            for (effect, x) in effects.iter_mut().zip(vector) {
                *effect += coefficient * x;
            }
        }

        Region::pure(space, effects, None)
    }

    /// The same weights and marking, owned by another space over the same
    /// alphabet.
    pub fn rebase(&self, space: Arc<RegionSpace>) -> Result<Self, RegionError> {
        Region::new(
            space,
            self.backward.clone(),
            self.forward.clone(),
            self.initial_marking.clone(),
        )
    }

    pub fn space(&self) -> &Arc<RegionSpace> {
        &self.space
    }

    pub fn backward_weight(&self, event: EventId) -> &BigInt {
        &self.backward[event]
    }

    pub fn forward_weight(&self, event: EventId) -> &BigInt {
        &self.forward[event]
    }

    pub fn backward_weights(&self) -> &[BigInt] {
        &self.backward
    }

    pub fn forward_weights(&self) -> &[BigInt] {
        &self.forward
    }

    pub fn effect(&self, event: EventId) -> BigInt {
        &self.forward[event] - &self.backward[event]
    }

    pub fn effects(&self) -> Vec<BigInt> {
        (0..self.forward.len()).map(|e| self.effect(e)).collect()
    }

    pub fn initial_marking(&self) -> &BigInt {
        &self.initial_marking
    }

    /// Events with a positive backward weight.
    pub fn postset(&self) -> BTreeSet<EventId> {
        positive(&self.backward)
    }

    /// Events with a positive forward weight.
    pub fn preset(&self) -> BTreeSet<EventId> {
        positive(&self.forward)
    }

    pub fn marking_for_state(&self, state: StateId) -> Result<BigInt, RegionError> {
        let delta = self.space.delta(state, &self.effects())?;
        Ok(&self.initial_marking + delta)
    }

    /// Whether the region disables `event` in `state`.
    pub fn solves_event(&self, state: StateId, event: EventId) -> Result<bool, RegionError> {
        Ok(self.marking_for_state(state)? < self.backward[event])
    }

    /// Whether the region assigns different markings to the two states.
    pub fn solves_states(&self, first: StateId, second: StateId) -> Result<bool, RegionError> {
        Ok(self.marking_for_state(first)? != self.marking_for_state(second)?)
    }

    /// Highest marking of a reachable state.
    pub fn max_marking(&self) -> BigInt {
        let effects = self.effects();
        self.space
            .reachable_states()
            .iter()
            .filter_map(|s| self.space.delta(*s, &effects).ok())
            .map(|delta| &self.initial_marking + delta)
            .max()
            .unwrap_or_else(|| self.initial_marking.clone())
    }

    /// Checks that every reachable marking is non-negative, that every arc is
    /// enabled by the marking of its source and that markings agree along
    /// every arc, not only along the spanning tree.
    pub fn check_consistency(&self) -> Result<(), RegionError> {
        for &(source, event, target) in self.space.arcs() {
            let before = self.marking_for_state(source)?;
            let after = self.marking_for_state(target)?;

            if before.is_negative() {
                return Err(RegionError::Inconsistent(format!(
                    "negative marking {} in state {}",
                    before,
                    source.index()
                )));
            }
            if before < self.backward[event] {
                return Err(RegionError::Inconsistent(format!(
                    "event {} is disabled in state {}",
                    self.space.event_label(event),
                    source.index()
                )));
            }
            if after != &before + self.effect(event) {
                return Err(RegionError::Inconsistent(format!(
                    "arc {} --{}--> {} breaks path independence",
                    source.index(),
                    self.space.event_label(event),
                    target.index()
                )));
            }
        }

        Ok(())
    }

    /// Whether the place described by this region meets every per-place
    /// requirement of `properties`.
    pub fn satisfies(&self, properties: &PropertySet) -> bool {
        let postset = self.postset();
        let preset = self.preset();

        if properties.is_pure() && !postset.is_disjoint(&preset) {
            return false;
        }
        if properties.is_plain()
            && self
                .backward
                .iter()
                .chain(&self.forward)
                .any(|w| *w > BigInt::from(1))
        {
            return false;
        }
        if properties.is_marked_graph() && (postset.len() != 1 || preset.len() != 1) {
            return false;
        }
        if properties.is_tnet() && (postset.len() > 1 || preset.len() > 1) {
            return false;
        }
        if properties.is_output_nonbranching() && postset.len() > 1 {
            return false;
        }
        if properties.is_conflict_free()
            && postset.len() > 1
            && !postset.is_subset(&preset)
        {
            return false;
        }
        if properties.is_homogeneous()
            && !postset.iter().map(|e| &self.backward[*e]).all_equal()
        {
            return false;
        }
        if properties.is_distributed()
            && !postset
                .iter()
                .map(|e| self.space.event_location(*e))
                .all_equal()
        {
            return false;
        }
        if let Some(k) = properties.bound()
            && self.max_marking() > BigInt::from(k)
        {
            return false;
        }

        true
    }
}

fn positive(weights: &[BigInt]) -> BTreeSet<EventId> {
    weights
        .iter()
        .enumerate()
        .filter(|(_, w)| w.is_positive())
        .map(|(e, _)| e)
        .collect()
}

/// The smallest non-negative initial marking under which every reachable
/// marking is non-negative and every arc is enabled.
fn minimal_initial_marking(
    space: &RegionSpace,
    backward: &[BigInt],
    effects: &[BigInt],
) -> Result<BigInt, RegionError> {
    let mut marking = BigInt::zero();

    for &state in space.reachable_states() {
        let needed = -space.delta(state, effects)?;
        if needed > marking {
            marking = needed;
        }
    }

    for &(source, event, _) in space.arcs() {
        let needed = &backward[event] - space.delta(source, effects)?;
        if needed > marking {
            marking = needed;
        }
    }

    Ok(marking)
}

impl PartialEq for Region {
    fn eq(&self, other: &Self) -> bool {
        self.backward == other.backward
            && self.forward == other.forward
            && self.initial_marking == other.initial_marking
    }
}

impl Eq for Region {}

impl Hash for Region {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.backward.hash(state);
        self.forward.hash(state);
        self.initial_marking.hash(state);
    }
}

impl Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let weights = (0..self.backward.len())
            .filter(|e| !self.backward[*e].is_zero() || !self.forward[*e].is_zero())
            .map(|e| {
                format!(
                    "{}:{}/{}",
                    self.space.event_label(e),
                    self.backward[e],
                    self.forward[e]
                )
            })
            .join(", ");

        write!(f, "Region(m0={}, [{}])", self.initial_marking, weights)
    }
}
