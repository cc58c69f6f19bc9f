use std::sync::Arc;

use num::BigInt;
use z3::{
    Config, Model, SatResult, Solver,
    ast::{Bool, Int},
    with_z3_config,
};

use crate::{
    config::SeparationStrategyKind,
    properties::PropertySet,
    region::{Region, RegionSpace},
    separation::{Separation, SeparationError, check_locations},
    ts::{EventId, StateId},
};

enum Target {
    Event(StateId, EventId),
    States(StateId, StateId),
}

/// Searches separating regions as solutions of an integer feasibility problem.
///
/// There is one variable per backward weight, one per forward weight and one
/// for the initial marking. The marking of a reachable state is the linear
/// expression `m0 + P(s) * (f - b)` over its Parikh vector. The region axioms
/// are added for every arc of the reachable part:
///
/// > `m(s) >= b(e)` and `m(t) = m(s) + f(e) - b(e)` for `s --e--> t`
///
/// together with `m(s) >= 0` for every reachable state. The requested
/// properties become additional constraints on the weights and markings and the
/// separation problem itself becomes the last constraint. A model of the
/// system is a region.
pub struct IlpSeparation {
    space: Arc<RegionSpace>,
    properties: PropertySet,
}

impl IlpSeparation {
    pub fn new(space: Arc<RegionSpace>, properties: PropertySet) -> Result<Self, SeparationError> {
        check_locations(&space, &properties)?;

        Ok(IlpSeparation { space, properties })
    }

    fn solve(&self, target: Target) -> Option<Region> {
        let mut config = Config::new();
        config.set_model_generation(true);
        with_z3_config(&config, || {
            let solver = Solver::new();

            self.solve_inner(&solver, target)
        })
    }

    fn solve_inner(&self, solver: &Solver, target: Target) -> Option<Region> {
        let variables = RegionVariables::declare(&self.space);

        self.assert_region_axioms(solver, &variables);
        self.assert_properties(solver, &variables);

        // CONSTRAINT: the problem itself
        match target {
            Target::Event(state, event) => {
                let marking = variables.marking(state)?;
                solver.assert(marking.lt(variables.backward[event].clone()));
            }
            Target::States(first, second) => {
                let first = variables.marking(first)?;
                let second = variables.marking(second)?;
                solver.assert(first.eq(second.clone()).not());
            }
        }

        match solver.check() {
            SatResult::Sat => {
                let model = solver.get_model()?;
                variables.extract(&model, &self.space)
            }
            SatResult::Unsat => None,
            SatResult::Unknown => {
                tracing::warn!("Solver returned unknown for a separation problem");
                None
            }
        }
    }

    fn assert_region_axioms(&self, solver: &Solver, variables: &RegionVariables) {
        let zero = Int::from_i64(0);

        // CONSTRAINT: weights and the initial marking are natural numbers
        for (b, f) in variables.backward.iter().zip(&variables.forward) {
            solver.assert(b.ge(zero.clone()));
            solver.assert(f.ge(zero.clone()));
        }
        solver.assert(variables.initial.ge(zero.clone()));

        // CONSTRAINT: no reachable marking is negative
        for state in self.space.reachable_states() {
            if let Some(marking) = variables.marking(*state) {
                solver.assert(marking.ge(zero.clone()));
            }
        }

        // CONSTRAINT: every arc is enabled and consistent with the markings
        for &(source, event, target) in self.space.arcs() {
            let (Some(before), Some(after)) = (variables.marking(source), variables.marking(target))
            else {
                continue;
            };

            let b = &variables.backward[event];
            let f = &variables.forward[event];
            solver.assert(before.ge(b.clone()));
            solver.assert(after.eq(&(before + f) - b));
        }
    }

    fn assert_properties(&self, solver: &Solver, variables: &RegionVariables) {
        let properties = &self.properties;
        let zero = Int::from_i64(0);
        let one = Int::from_i64(1);
        let event_count = self.space.event_count();

        let consumes: Vec<Bool> = variables
            .backward
            .iter()
            .map(|b| b.gt(zero.clone()))
            .collect();
        let produces: Vec<Bool> = variables
            .forward
            .iter()
            .map(|f| f.gt(zero.clone()))
            .collect();

        if properties.is_pure() {
            for e in 0..event_count {
                solver.assert(Bool::and(&[consumes[e].clone(), produces[e].clone()][..]).not());
            }
        }

        if properties.is_plain() {
            for (b, f) in variables.backward.iter().zip(&variables.forward) {
                solver.assert(b.le(one.clone()));
                solver.assert(f.le(one.clone()));
            }
        }

        if let Some(k) = properties.bound() {
            let k = Int::from_u64(k);
            for state in self.space.reachable_states() {
                if let Some(marking) = variables.marking(*state) {
                    solver.assert(marking.le(k.clone()));
                }
            }
        }

        if properties.is_marked_graph() {
            solver.assert(exactly_one(&consumes));
            solver.assert(exactly_one(&produces));
        } else if properties.is_tnet() {
            solver.assert(at_most_one(&consumes));
            solver.assert(at_most_one(&produces));
        } else if properties.is_output_nonbranching() {
            solver.assert(at_most_one(&consumes));
        } else if properties.is_conflict_free() {
            // either at most one consumer, or every consumer puts tokens back
            let refilled: Vec<Bool> = (0..event_count)
                .map(|e| implies(&consumes[e], &produces[e]))
                .collect();
            solver.assert(Bool::or(
                &[at_most_one(&consumes), Bool::and(&refilled[..])][..],
            ));
        }

        if properties.is_homogeneous() {
            let weight = Int::new_const("homogeneous_weight");
            for e in 0..event_count {
                let same = variables.backward[e].eq(weight.clone());
                solver.assert(implies(&consumes[e], &same));
            }
        }

        if properties.is_distributed() {
            for e1 in 0..event_count {
                for e2 in (e1 + 1)..event_count {
                    if self.space.event_location(e1) != self.space.event_location(e2) {
                        solver.assert(
                            Bool::and(&[consumes[e1].clone(), consumes[e2].clone()][..]).not(),
                        );
                    }
                }
            }
        }
    }
}

impl Separation for IlpSeparation {
    fn kind(&self) -> SeparationStrategyKind {
        SeparationStrategyKind::Ilp
    }

    fn separate_event(&self, state: StateId, event: EventId) -> Option<Region> {
        if !self.space.is_reachable(state) || event >= self.space.event_count() {
            return None;
        }

        self.solve(Target::Event(state, event))
    }

    fn separate_states(&self, first: StateId, second: StateId) -> Option<Region> {
        if first == second || !self.space.is_reachable(first) || !self.space.is_reachable(second)
        {
            return None;
        }

        self.solve(Target::States(first, second))
    }
}

/// The solver variables of one region and the marking expression of every
/// reachable state.
struct RegionVariables {
    backward: Vec<Int>,
    forward: Vec<Int>,
    initial: Int,
    markings: Vec<Option<Int>>,
}

impl RegionVariables {
    fn declare(space: &RegionSpace) -> Self {
        let backward: Vec<Int> = (0..space.event_count())
            .map(|e| Int::new_const(format!("backward_{}", e)))
            .collect();
        let forward: Vec<Int> = (0..space.event_count())
            .map(|e| Int::new_const(format!("forward_{}", e)))
            .collect();
        let initial = Int::new_const("initial_marking");

        let effects: Vec<Int> = forward.iter().zip(&backward).map(|(f, b)| f - b).collect();

        let mut markings = vec![None; space.state_count()];
        for state in space.reachable_states() {
            let Some(parikh) = space.parikh_vector(*state) else {
                continue;
            };

            let mut marking = initial.clone();
            for (count, effect) in parikh.iter().zip(&effects) {
                if *count != 0 {
                    marking = &marking + effect * *count;
                }
            }
            markings[state.index()] = Some(marking);
        }

        RegionVariables {
            backward,
            forward,
            initial,
            markings,
        }
    }

    fn marking(&self, state: StateId) -> Option<&Int> {
        self.markings.get(state.index())?.as_ref()
    }

    fn extract(&self, model: &Model, space: &Arc<RegionSpace>) -> Option<Region> {
        let backward = self
            .backward
            .iter()
            .map(|b| value(model, b))
            .collect::<Option<Vec<_>>>()?;
        let forward = self
            .forward
            .iter()
            .map(|f| value(model, f))
            .collect::<Option<Vec<_>>>()?;
        let initial = value(model, &self.initial)?;

        Region::new(space.clone(), backward, forward, initial).ok()
    }
}

fn value(model: &Model, variable: &Int) -> Option<BigInt> {
    let value = model.eval(variable, true)?;
    match value.as_i64() {
        Some(x) => Some(BigInt::from(x)),
        None => value.to_string().parse().ok(),
    }
}

fn implies(premise: &Bool, conclusion: &Bool) -> Bool {
    Bool::or(&[premise.not(), conclusion.clone()][..])
}

fn at_most_one(conditions: &[Bool]) -> Bool {
    let mut pairs = vec![Bool::from_bool(true)];
    for i in 0..conditions.len() {
        for j in (i + 1)..conditions.len() {
            pairs.push(Bool::and(&[conditions[i].clone(), conditions[j].clone()][..]).not());
        }
    }

    Bool::and(&pairs[..])
}

fn exactly_one(conditions: &[Bool]) -> Bool {
    let mut any = vec![Bool::from_bool(false)];
    any.extend(conditions.iter().cloned());

    Bool::and(&[Bool::or(&any[..]), at_most_one(conditions)][..])
}
