use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    region::{Region, RegionSpace},
    utils::narrow_to_u64,
};

pub mod format;
pub mod reachability;
pub mod transition;

pub use transition::PetriNetTransition;

/// Position of a place in a [PetriNet].
pub type PlaceId = usize;
/// Position of a transition in a [PetriNet].
pub type TransitionId = usize;
/// Token count per place.
pub type Marking = Vec<u64>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetError {
    #[error("{what} of {value} does not fit into a 64 bit token count")]
    Overflow { what: String, value: String },
    #[error("the reachability graph has more than {0} states")]
    StateLimitExceeded(usize),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    pub initial_marking: u64,
}

/// A place/transition net with weighted flows and an initial marking.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PetriNet {
    name: String,
    places: Vec<Place>,
    transitions: Vec<PetriNetTransition>,
}

impl PetriNet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// One place per region and one transition per event of the region space.
    /// Every positive backward weight becomes a flow into the transition,
    /// every positive forward weight a flow into the place.
    pub fn from_regions(
        name: impl Into<String>,
        space: &RegionSpace,
        regions: &[Region],
    ) -> Result<Self, NetError> {
        let mut net = PetriNet::new(name);

        for event in 0..space.event_count() {
            net.create_transition(space.event_label(event));
        }

        for (i, region) in regions.iter().enumerate() {
            let place = net.create_place(format!("p{}", i));

            let marking = narrow(region.initial_marking(), "initial marking")?;
            net.set_initial_marking(place, marking);

            for event in 0..space.event_count() {
                let backward = narrow(region.backward_weight(event), "backward weight")?;
                if backward > 0 {
                    net.create_flow_to_transition(place, event, backward);
                }

                let forward = narrow(region.forward_weight(event), "forward weight")?;
                if forward > 0 {
                    net.create_flow_to_place(event, place, forward);
                }
            }
        }

        Ok(net)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn create_place(&mut self, name: impl Into<String>) -> PlaceId {
        self.places.push(Place {
            name: name.into(),
            initial_marking: 0,
        });
        self.places.len() - 1
    }

    pub fn create_transition(&mut self, label: impl Into<String>) -> TransitionId {
        self.transitions.push(PetriNetTransition::new(label));
        self.transitions.len() - 1
    }

    pub fn create_flow_to_transition(&mut self, place: PlaceId, transition: TransitionId, weight: u64) {
        assert!(place < self.places.len(), "Place {} does not exist", place);
        self.transitions[transition].add_input(place, weight);
    }

    pub fn create_flow_to_place(&mut self, transition: TransitionId, place: PlaceId, weight: u64) {
        assert!(place < self.places.len(), "Place {} does not exist", place);
        self.transitions[transition].add_output(place, weight);
    }

    pub fn set_initial_marking(&mut self, place: PlaceId, tokens: u64) {
        self.places[place].initial_marking = tokens;
    }

    pub fn place_count(&self) -> usize {
        self.places.len()
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }

    pub fn places(&self) -> &[Place] {
        &self.places
    }

    pub fn place(&self, place: PlaceId) -> &Place {
        &self.places[place]
    }

    pub fn transitions(&self) -> &[PetriNetTransition] {
        &self.transitions
    }

    pub fn transition(&self, transition: TransitionId) -> &PetriNetTransition {
        &self.transitions[transition]
    }

    pub fn transition_by_label(&self, label: &str) -> Option<TransitionId> {
        self.transitions.iter().position(|t| t.label() == label)
    }

    pub fn initial_marking(&self) -> Marking {
        self.places.iter().map(|p| p.initial_marking).collect()
    }

    /// Transitions consuming from `place`.
    pub fn postset(&self, place: PlaceId) -> Vec<TransitionId> {
        (0..self.transitions.len())
            .filter(|t| self.transitions[*t].input_weight(place) > 0)
            .collect()
    }

    /// Transitions producing into `place`.
    pub fn preset(&self, place: PlaceId) -> Vec<TransitionId> {
        (0..self.transitions.len())
            .filter(|t| self.transitions[*t].output_weight(place) > 0)
            .collect()
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_file(&self, path: &str) -> anyhow::Result<()> {
        Ok(std::fs::write(path, self.to_json()?)?)
    }

    pub fn to_pn_file(&self, path: &str) -> anyhow::Result<()> {
        Ok(std::fs::write(path, format::to_pn_format(self))?)
    }
}

fn narrow(value: &num::BigInt, what: &str) -> Result<u64, NetError> {
    narrow_to_u64(value).ok_or_else(|| NetError::Overflow {
        what: what.to_string(),
        value: value.to_string(),
    })
}
