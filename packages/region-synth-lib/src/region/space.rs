use std::collections::VecDeque;

use num::{BigInt, BigRational, Integer, One, Signed, Zero};

use crate::{
    region::RegionError,
    ts::{EventId, StateId, TransitionSystem},
};

/// Everything about a transition system that regions need to compute markings.
///
/// A spanning tree is built breadth-first from the initial state. The Parikh
/// vector of a reachable state counts the events on its tree path, so the
/// marking of a state under a region only depends on the region's effect and
/// this vector. Every arc `s --e--> t` of the reachable part gives the cycle
/// equation `(P(s) + unit(e) - P(t)) * effect = 0`. The integer solutions of
/// these equations are exactly the effect vectors of pure regions, and the
/// basis spans their rational kernel.
#[derive(Debug, Clone)]
pub struct RegionSpace {
    labels: Vec<String>,
    locations: Vec<Option<String>>,
    state_count: usize,
    initial: StateId,
    reachable: Vec<StateId>,
    parikh: Vec<Option<Vec<i64>>>,
    arcs: Vec<(StateId, EventId, StateId)>,
    basis: Vec<Vec<BigInt>>,
}

impl RegionSpace {
    pub fn new(ts: &TransitionSystem) -> Result<Self, RegionError> {
        let initial = ts.initial().ok_or(RegionError::MissingInitialState)?;
        let event_count = ts.event_count();

        let mut parikh: Vec<Option<Vec<i64>>> = vec![None; ts.state_count()];
        let mut reachable = vec![];
        let mut queue = VecDeque::from([initial]);
        parikh[initial.index()] = Some(vec![0; event_count]);

        while let Some(state) = queue.pop_front() {
            reachable.push(state);
            for (event, target) in ts.postset(state) {
                if parikh[target.index()].is_none() {
                    let mut vector = parikh[state.index()].clone().unwrap_or_default();
                    vector[event] += 1;
                    parikh[target.index()] = Some(vector);
                    queue.push_back(target);
                }
            }
        }

        let arcs: Vec<_> = ts
            .arcs()
            .filter(|(source, _, _)| parikh[source.index()].is_some())
            .collect();

        let mut space = RegionSpace {
            labels: ts.events().iter().map(|e| e.label.clone()).collect(),
            locations: ts.events().iter().map(|e| e.location.clone()).collect(),
            state_count: ts.state_count(),
            initial,
            reachable,
            parikh,
            arcs,
            basis: vec![],
        };
        space.basis = space.compute_basis();

        tracing::debug!(
            "Region space with {} events, {} reachable states and a basis of size {}",
            space.event_count(),
            space.reachable.len(),
            space.basis.len()
        );

        Ok(space)
    }

    pub fn event_count(&self) -> usize {
        self.labels.len()
    }

    pub fn state_count(&self) -> usize {
        self.state_count
    }

    pub fn event_label(&self, event: EventId) -> &str {
        &self.labels[event]
    }

    pub fn event_index(&self, label: &str) -> Option<EventId> {
        self.labels.iter().position(|l| l == label)
    }

    pub fn event_location(&self, event: EventId) -> Option<&str> {
        self.locations[event].as_deref()
    }

    pub fn initial_state(&self) -> StateId {
        self.initial
    }

    /// Reachable states in breadth-first order from the initial state.
    pub fn reachable_states(&self) -> &[StateId] {
        &self.reachable
    }

    pub fn is_reachable(&self, state: StateId) -> bool {
        self.parikh_vector(state).is_some()
    }

    pub fn parikh_vector(&self, state: StateId) -> Option<&[i64]> {
        self.parikh.get(state.index())?.as_deref()
    }

    /// Arcs leaving reachable states.
    pub fn arcs(&self) -> &[(StateId, EventId, StateId)] {
        &self.arcs
    }

    /// Primitive integer effect vectors spanning the pure regions.
    pub fn basis(&self) -> &[Vec<BigInt>] {
        &self.basis
    }

    /// The change of the marking along the tree path to `state` for the given
    /// effect vector.
    pub fn delta(&self, state: StateId, effects: &[BigInt]) -> Result<BigInt, RegionError> {
        let parikh = self
            .parikh_vector(state)
            .ok_or(RegionError::UnreachableState(state.index()))?;

        Ok(parikh
            .iter()
            .zip(effects)
            .filter(|(count, _)| **count != 0)
            .map(|(count, effect)| effect * BigInt::from(*count))
            .sum())
    }

    fn cycle_rows(&self) -> Vec<Vec<BigRational>> {
        let mut rows = vec![];

        for (source, event, target) in &self.arcs {
            let (Some(p_source), Some(p_target)) =
                (self.parikh_vector(*source), self.parikh_vector(*target))
            else {
                continue;
            };

            let mut row: Vec<i64> = p_source
                .iter()
                .zip(p_target)
                .map(|(s, t)| s - t)
                .collect();
            row[*event] += 1;

            // tree arcs give the zero row
            if row.iter().any(|x| *x != 0) {
                rows.push(
                    row.into_iter()
                        .map(|x| BigRational::from_integer(BigInt::from(x)))
                        .collect(),
                );
            }
        }

        rows
    }

    fn compute_basis(&self) -> Vec<Vec<BigInt>> {
        let n = self.event_count();
        let mut rows = self.cycle_rows();
        let pivots = reduce_to_echelon_form(&mut rows, n);

        // one kernel vector per free column
        let mut basis = vec![];
        for free in (0..n).filter(|c| !pivots.contains(c)) {
            let mut vector = vec![BigRational::zero(); n];
            vector[free] = BigRational::one();
            for (row, &pivot) in rows.iter().zip(&pivots) {
                vector[pivot] = -row[free].clone();
            }
            basis.push(to_primitive_integers(&vector));
        }

        basis
    }
}

/// Brings `rows` into reduced row echelon form in place and returns the pivot
/// column of every remaining row. Zero rows are dropped.
fn reduce_to_echelon_form(rows: &mut Vec<Vec<BigRational>>, columns: usize) -> Vec<usize> {
    let mut pivots = vec![];
    let mut next_row = 0;

    for column in 0..columns {
        let Some(found) = (next_row..rows.len()).find(|&r| !rows[r][column].is_zero()) else {
            continue;
        };
        rows.swap(next_row, found);

        let factor = rows[next_row][column].clone();
        for x in rows[next_row].iter_mut() {
            *x = &*x / &factor;
        }

        for r in 0..rows.len() {
            if r == next_row || rows[r][column].is_zero() {
                continue;
            }
            let factor = rows[r][column].clone();
            for c in 0..columns {
                let delta = &rows[next_row][c] * &factor;
                rows[r][c] = &rows[r][c] - delta;
            }
        }

        pivots.push(column);
        next_row += 1;
    }

    rows.truncate(next_row);
    pivots
}

/// Scales a rational vector to the integer vector with coprime entries that
/// points in the same direction.
fn to_primitive_integers(vector: &[BigRational]) -> Vec<BigInt> {
    let lcm = vector
        .iter()
        .fold(BigInt::one(), |acc, x| acc.lcm(x.denom()));

    let integers: Vec<BigInt> = vector
        .iter()
        .map(|x| (x * BigRational::from_integer(lcm.clone())).to_integer())
        .collect();

    let gcd = integers
        .iter()
        .fold(BigInt::zero(), |acc, x| acc.gcd(x));
    if gcd.is_zero() {
        return integers;
    }

    integers.into_iter().map(|x| x / gcd.abs()).collect()
}

#[test]
fn test_primitive_integers() {
    let vector = vec![
        BigRational::new(BigInt::from(1), BigInt::from(2)),
        BigRational::new(BigInt::from(-3), BigInt::from(4)),
        BigRational::zero(),
    ];

    assert_eq!(
        to_primitive_integers(&vector),
        vec![BigInt::from(2), BigInt::from(-3), BigInt::from(0)]
    );
}

#[test]
fn test_echelon_form() {
    let int = |x: i64| BigRational::from_integer(BigInt::from(x));
    let mut rows = vec![
        vec![int(1), int(1), int(0)],
        vec![int(2), int(2), int(0)],
        vec![int(0), int(1), int(-1)],
    ];

    let pivots = reduce_to_echelon_form(&mut rows, 3);
    assert_eq!(pivots, vec![0, 1]);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], vec![int(1), int(0), int(1)]);
    assert_eq!(rows[1], vec![int(0), int(1), int(-1)]);
}
