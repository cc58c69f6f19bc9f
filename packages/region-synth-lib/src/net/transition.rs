use serde::{Deserialize, Serialize};

use crate::net::{Marking, NetError, PlaceId};

/// A labeled Petri net transition. Flows are stored as `(weight, place)`
/// pairs, at most one per place and direction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PetriNetTransition {
    label: String,
    input: Vec<(u64, PlaceId)>,
    output: Vec<(u64, PlaceId)>,
}

impl PetriNetTransition {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            input: vec![],
            output: vec![],
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn input(&self) -> &[(u64, PlaceId)] {
        &self.input
    }

    pub fn output(&self) -> &[(u64, PlaceId)] {
        &self.output
    }

    /// Adds to the weight of the flow from `place` into this transition.
    pub fn add_input(&mut self, place: PlaceId, weight: u64) {
        add_flow(&mut self.input, place, weight);
    }

    /// Adds to the weight of the flow from this transition into `place`.
    pub fn add_output(&mut self, place: PlaceId, weight: u64) {
        add_flow(&mut self.output, place, weight);
    }

    pub fn input_weight(&self, place: PlaceId) -> u64 {
        weight_of(&self.input, place)
    }

    pub fn output_weight(&self, place: PlaceId) -> u64 {
        weight_of(&self.output, place)
    }

    pub fn is_enabled(&self, marking: &Marking) -> bool {
        self.input
            .iter()
            .all(|(weight, place)| marking[*place] >= *weight)
    }

    /// The marking after firing, `None` if the transition is not enabled.
    pub fn fire(&self, marking: &Marking) -> Result<Option<Marking>, NetError> {
        if !self.is_enabled(marking) {
            return Ok(None);
        }

        let mut next = marking.clone();
        for (weight, place) in &self.input {
            next[*place] -= weight;
        }
        for (weight, place) in &self.output {
            next[*place] = next[*place]
                .checked_add(*weight)
                .ok_or_else(|| NetError::Overflow {
                    what: format!("marking of place {}", place),
                    value: format!("{} + {}", next[*place], weight),
                })?;
        }

        Ok(Some(next))
    }
}

fn add_flow(flows: &mut Vec<(u64, PlaceId)>, place: PlaceId, weight: u64) {
    match flows.iter_mut().find(|(_, p)| *p == place) {
        Some((w, _)) => *w += weight,
        None => flows.push((weight, place)),
    }
}

fn weight_of(flows: &[(u64, PlaceId)], place: PlaceId) -> u64 {
    flows
        .iter()
        .find(|(_, p)| *p == place)
        .map(|(w, _)| *w)
        .unwrap_or(0)
}

#[test]
fn test_fire() {
    let mut transition = PetriNetTransition::new("t");
    transition.add_input(0, 2);
    transition.add_output(1, 1);
    transition.add_output(1, 1);

    assert_eq!(transition.output_weight(1), 2);
    assert_eq!(transition.fire(&vec![1, 0]).unwrap(), None);
    assert_eq!(transition.fire(&vec![3, 0]).unwrap(), Some(vec![1, 2]));
}
