use std::collections::BTreeSet;

use hashbrown::HashMap;
use itertools::Itertools;

use crate::{
    equivalence::DomainEquivalenceRelation,
    ts::{EventId, StateId, TransitionSystem, TsError},
};

/// Turns a transition system into a deterministic one with the same language
/// and no two language-equivalent states.
///
/// The reachable part is unfolded with a subset construction, bounded by
/// `max_states`. Afterwards states that enable the same words are merged: a
/// pair is distinguishable if the enabled events differ, or if some event leads
/// both states into a distinguishable pair. All remaining pairs are joined in a
/// [DomainEquivalenceRelation] and each class becomes one state.
pub fn language_transform(
    ts: &TransitionSystem,
    max_states: usize,
) -> Result<TransitionSystem, TsError> {
    let initial = ts.initial().ok_or(TsError::MissingInitialState)?;
    let (subsets, transitions) = determinize(ts, initial, max_states)?;

    let classes = merge_equivalent(ts.event_count(), &transitions);

    let mut result = TransitionSystem::named(ts.name());
    for event in ts.events() {
        match &event.location {
            Some(location) => result.add_event_with_location(&event.label, location),
            None => result.add_event(&event.label),
        };
    }

    // one state per class, named after the subset of its leader
    let mut class_states: HashMap<usize, StateId> = HashMap::new();
    for index in 0..subsets.len() {
        let leader = classes.leader(&index).unwrap_or(index);
        class_states.entry(leader).or_insert_with(|| {
            let name = subsets[leader]
                .iter()
                .map(|s| ts.state_name(*s))
                .join("_");
            result.add_state(format!("{{{}}}", name))
        });
    }

    let mut added = BTreeSet::new();
    for (from, row) in transitions.iter().enumerate() {
        for (event, target) in row.iter().enumerate() {
            let Some(target) = target else {
                continue;
            };
            let from_state = class_states[&classes.leader(&from).unwrap_or(from)];
            let to_state = class_states[&classes.leader(target).unwrap_or(*target)];
            if added.insert((from_state, event, to_state)) {
                result.add_arc(from_state, event, to_state);
            }
        }
    }

    result.set_initial(class_states[&classes.leader(&0).unwrap_or(0)]);

    Ok(result)
}

type TransitionTable = Vec<Vec<Option<usize>>>;

/// Subset construction over the reachable part. Index 0 is the initial subset.
fn determinize(
    ts: &TransitionSystem,
    initial: StateId,
    max_states: usize,
) -> Result<(Vec<BTreeSet<StateId>>, TransitionTable), TsError> {
    let mut subsets = vec![BTreeSet::from([initial])];
    let mut index: HashMap<BTreeSet<StateId>, usize> = HashMap::new();
    index.insert(subsets[0].clone(), 0);

    let mut transitions: TransitionTable = vec![];
    let mut next = 0;

    while next < subsets.len() {
        let mut row = vec![None; ts.event_count()];

        for event in 0..ts.event_count() {
            let target: BTreeSet<StateId> = subsets[next]
                .iter()
                .flat_map(|s| ts.postset_by_event(*s, event))
                .collect();

            if target.is_empty() {
                continue;
            }

            let target_index = match index.get(&target) {
                Some(&i) => i,
                None => {
                    if subsets.len() >= max_states {
                        return Err(TsError::UnfoldingLimitExceeded(max_states));
                    }
                    subsets.push(target.clone());
                    index.insert(target, subsets.len() - 1);
                    subsets.len() - 1
                }
            };
            row[event] = Some(target_index);
        }

        transitions.push(row);
        next += 1;
    }

    Ok((subsets, transitions))
}

fn merge_equivalent(
    event_count: usize,
    transitions: &TransitionTable,
) -> DomainEquivalenceRelation<usize> {
    let n = transitions.len();
    let mut distinguishable = vec![vec![false; n]; n];

    for i in 0..n {
        for j in (i + 1)..n {
            let enabled_differs = (0..event_count)
                .any(|e| transitions[i][e].is_some() != transitions[j][e].is_some());
            distinguishable[i][j] = enabled_differs;
        }
    }

    let mut changed = true;
    while changed {
        changed = false;

        for i in 0..n {
            for j in (i + 1)..n {
                if distinguishable[i][j] {
                    continue;
                }

                let split = (0..event_count).any(|e: EventId| {
                    match (transitions[i][e], transitions[j][e]) {
                        (Some(a), Some(b)) if a != b => distinguishable[a.min(b)][a.max(b)],
                        _ => false,
                    }
                });

                if split {
                    distinguishable[i][j] = true;
                    changed = true;
                }
            }
        }
    }

    let mut classes = DomainEquivalenceRelation::new(0..n);
    for i in 0..n {
        for j in (i + 1)..n {
            if !distinguishable[i][j] {
                // both indices come from the domain
                let _ = classes.join_classes(&i, &j);
            }
        }
    }

    classes
}
