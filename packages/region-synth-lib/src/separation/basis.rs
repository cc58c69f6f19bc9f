use std::sync::Arc;

use num::BigInt;

use crate::{
    config::{BasisConfig, SeparationStrategyKind},
    properties::PropertySet,
    region::{Region, RegionSpace},
    separation::{Separation, SeparationError, is_event_separating, is_state_separating},
    ts::{EventId, StateId},
    utils::is_cancellation_requested,
};

/// Searches separating regions among small integer combinations of the region
/// basis.
///
/// Every combination is turned into a pure region with the smallest consistent
/// initial marking. Coefficients are tried in the order `0, 1, -1, 2, -2, ...`
/// with the first basis vector changing fastest, so regions built from few
/// small coefficients are found first. Only pure regions can be produced,
/// therefore the only supported properties are `pure` and bounds.
pub struct BasisSeparation {
    space: Arc<RegionSpace>,
    properties: PropertySet,
    config: BasisConfig,
}

impl BasisSeparation {
    pub fn new(
        space: Arc<RegionSpace>,
        properties: PropertySet,
        config: BasisConfig,
    ) -> Result<Self, SeparationError> {
        let unsupported = properties
            .set_pure(false)
            .names()
            .into_iter()
            .filter(|name| name != "safe" && !name.ends_with("-bounded"))
            .collect::<Vec<_>>();

        if !unsupported.is_empty() {
            return Err(SeparationError::UnsupportedProperties {
                strategy: SeparationStrategyKind::PureBasis,
                properties: unsupported.join(", "),
            });
        }

        Ok(BasisSeparation {
            space,
            properties,
            config,
        })
    }

    /// Coefficient values in the order they are tried.
    fn coefficient_values(&self) -> Vec<i64> {
        let max = *self.config.get_max_coefficient() as i64;
        let mut values = vec![0];
        for x in 1..=max {
            values.push(x);
            values.push(-x);
        }
        values
    }

    fn search(&self, solves: impl Fn(&Region) -> bool) -> Option<Region> {
        let dimension = self.space.basis().len();
        if dimension == 0 {
            return None;
        }

        let values = self.coefficient_values();
        let mut digits = vec![0usize; dimension];
        let mut tried = 0u64;

        // the all-zero combination comes first and is skipped
        while advance(&mut digits, values.len()) {
            if tried >= *self.config.get_max_combinations() || is_cancellation_requested() {
                tracing::debug!("Stopped basis enumeration after {} combinations", tried);
                return None;
            }
            tried += 1;

            let coefficients: Vec<BigInt> = digits.iter().map(|d| BigInt::from(values[*d])).collect();
            let Ok(region) = Region::from_basis_combination(self.space.clone(), &coefficients) else {
                continue;
            };

            if solves(&region) && self.within_bound(&region) {
                tracing::debug!("Found {} after {} combinations", region, tried);
                return Some(region);
            }
        }

        None
    }

    fn within_bound(&self, region: &Region) -> bool {
        match self.properties.bound() {
            Some(k) => region.max_marking() <= BigInt::from(k),
            None => true,
        }
    }
}

/// Advances the odometer `digits` in base `base`. Returns `false` once every
/// combination was visited.
fn advance(digits: &mut [usize], base: usize) -> bool {
    for digit in digits.iter_mut() {
        *digit += 1;
        if *digit < base {
            return true;
        }
        *digit = 0;
    }

    false
}

impl Separation for BasisSeparation {
    fn kind(&self) -> SeparationStrategyKind {
        SeparationStrategyKind::PureBasis
    }

    fn separate_event(&self, state: StateId, event: EventId) -> Option<Region> {
        if !self.space.is_reachable(state) || event >= self.space.event_count() {
            return None;
        }

        self.search(|region| is_event_separating(region, state, event))
    }

    fn separate_states(&self, first: StateId, second: StateId) -> Option<Region> {
        if first == second || !self.space.is_reachable(first) || !self.space.is_reachable(second)
        {
            return None;
        }

        self.search(|region| is_state_separating(region, first, second))
    }
}

#[test]
fn test_advance_visits_every_combination() {
    let mut digits = vec![0, 0];
    let mut seen = vec![digits.clone()];
    while advance(&mut digits, 3) {
        seen.push(digits.clone());
    }

    assert_eq!(seen.len(), 9);
    assert_eq!(seen[1], vec![1, 0]);
    assert_eq!(seen[3], vec![0, 1]);
    assert_eq!(digits, vec![0, 0]);
}
