use std::collections::VecDeque;

use hashbrown::HashMap;
use itertools::Itertools;

use crate::{
    net::{Marking, NetError, PetriNet},
    ts::{StateId, TransitionSystem},
};

/// The reachability graph of a net together with the marking of every state.
#[derive(Debug, Clone)]
pub struct ReachabilityGraph {
    pub ts: TransitionSystem,
    markings: Vec<Marking>,
}

impl ReachabilityGraph {
    pub fn marking(&self, state: StateId) -> &Marking {
        &self.markings[state.index()]
    }

    pub fn markings(&self) -> &[Marking] {
        &self.markings
    }

    /// Highest token count of `place` over all reachable markings.
    pub fn max_tokens(&self, place: usize) -> u64 {
        self.markings.iter().map(|m| m[place]).max().unwrap_or(0)
    }
}

impl PetriNet {
    /// Explores the reachable markings breadth-first. Every transition is an
    /// event of the result, named by its label, so the alphabet matches the
    /// one the net was built from.
    pub fn reachability_graph(&self, max_states: usize) -> Result<ReachabilityGraph, NetError> {
        let mut ts = TransitionSystem::named(self.name());
        for transition in self.transitions() {
            ts.add_event(transition.label());
        }

        let initial = self.initial_marking();
        let mut markings = vec![initial.clone()];
        let mut index: HashMap<Marking, StateId> = HashMap::new();
        let first = ts.add_state(state_name(&initial));
        ts.set_initial(first);
        index.insert(initial.clone(), first);

        let mut queue = VecDeque::from([(first, initial)]);
        while let Some((state, marking)) = queue.pop_front() {
            for transition in self.transitions() {
                let Some(next) = transition.fire(&marking)? else {
                    continue;
                };

                let target = match index.get(&next) {
                    Some(&target) => target,
                    None => {
                        if markings.len() >= max_states {
                            return Err(NetError::StateLimitExceeded(max_states));
                        }
                        let target = ts.add_state(state_name(&next));
                        markings.push(next.clone());
                        index.insert(next.clone(), target);
                        queue.push_back((target, next));
                        target
                    }
                };

                ts.add_arc_labeled(state, transition.label(), target);
            }
        }

        Ok(ReachabilityGraph { ts, markings })
    }
}

fn state_name(marking: &Marking) -> String {
    format!("[{}]", marking.iter().join(","))
}
