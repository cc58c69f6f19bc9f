use std::collections::{BTreeSet, VecDeque};

use hashbrown::HashMap;

use crate::ts::{StateId, TransitionSystem, language::language_transform};

/// Whether the reachable parts of two deterministic transition systems are
/// isomorphic. Events are matched by label. Nondeterministic systems are
/// never considered isomorphic.
pub fn isomorphic(a: &TransitionSystem, b: &TransitionSystem) -> bool {
    let (Some(initial_a), Some(initial_b)) = (a.initial(), b.initial()) else {
        return false;
    };
    if !a.is_deterministic() || !b.is_deterministic() {
        return false;
    }

    let mut forward: HashMap<StateId, StateId> = HashMap::new();
    let mut backward: HashMap<StateId, StateId> = HashMap::new();
    let mut queue = VecDeque::from([(initial_a, initial_b)]);
    forward.insert(initial_a, initial_b);
    backward.insert(initial_b, initial_a);

    while let Some((state_a, state_b)) = queue.pop_front() {
        if enabled_labels(a, state_a) != enabled_labels(b, state_b) {
            return false;
        }

        for (event, target_a) in a.postset(state_a) {
            let Some(target_b) = b
                .event_id(a.event_label(event))
                .and_then(|e| b.successor(state_b, e))
            else {
                return false;
            };

            match (forward.get(&target_a), backward.get(&target_b)) {
                (None, None) => {
                    forward.insert(target_a, target_b);
                    backward.insert(target_b, target_a);
                    queue.push_back((target_a, target_b));
                }
                (Some(&mapped_b), Some(&mapped_a)) if mapped_b == target_b && mapped_a == target_a => {}
                _ => return false,
            }
        }
    }

    true
}

/// Whether two transition systems accept the same words, all states being
/// accepting. Both are reduced to their minimal deterministic form first,
/// which is unique up to isomorphism. Systems that cannot be unfolded within
/// `max_states` are reported as different.
pub fn same_language(a: &TransitionSystem, b: &TransitionSystem, max_states: usize) -> bool {
    match (
        language_transform(a, max_states),
        language_transform(b, max_states),
    ) {
        (Ok(a), Ok(b)) => isomorphic(&a, &b),
        _ => false,
    }
}

pub fn assert_isomorphic(a: &TransitionSystem, b: &TransitionSystem) {
    assert!(
        isomorphic(a, b),
        "Transition systems '{}' and '{}' are not isomorphic",
        a.name(),
        b.name()
    );
}

pub fn assert_same_language(a: &TransitionSystem, b: &TransitionSystem, max_states: usize) {
    assert!(
        same_language(a, b, max_states),
        "Transition systems '{}' and '{}' have different languages",
        a.name(),
        b.name()
    );
}

fn enabled_labels(ts: &TransitionSystem, state: StateId) -> BTreeSet<&str> {
    ts.postset(state).map(|(e, _)| ts.event_label(e)).collect()
}
