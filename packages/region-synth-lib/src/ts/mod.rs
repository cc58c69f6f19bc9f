use std::collections::{BTreeSet, VecDeque};

use petgraph::{
    Direction,
    graph::{DiGraph, EdgeIndex, NodeIndex},
    visit::EdgeRef,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod language;
pub mod parser;

pub type StateId = NodeIndex;
/// Position of an event in the alphabet of a [TransitionSystem].
pub type EventId = usize;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TsError {
    #[error("the transition system has no initial state")]
    MissingInitialState,
    #[error("the language transform exceeded {0} states")]
    UnfoldingLimitExceeded(usize),
}

#[derive(Debug, Error)]
#[error("state '{0}' is not part of the transition system")]
pub struct UnknownStateError(pub String);

/// An event of the alphabet. The optional location is used by the
/// `distributed` property.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Event {
    pub label: String,
    pub location: Option<String>,
}

impl Event {
    pub fn new(label: impl Into<String>) -> Self {
        Event {
            label: label.into(),
            location: None,
        }
    }

    pub fn with_location(label: impl Into<String>, location: impl Into<String>) -> Self {
        Event {
            label: label.into(),
            location: Some(location.into()),
        }
    }
}

/// A finite labeled transition system. States carry their name, arcs carry the
/// index of their event in the alphabet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransitionSystem {
    name: String,
    pub graph: DiGraph<String, EventId>,
    alphabet: Vec<Event>,
    initial: Option<StateId>,
}

impl TransitionSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        TransitionSystem {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds an event with the given label, or returns the existing one.
    pub fn add_event(&mut self, label: &str) -> EventId {
        match self.event_id(label) {
            Some(id) => id,
            None => {
                self.alphabet.push(Event::new(label));
                self.alphabet.len() - 1
            }
        }
    }

    /// Adds an event with a location. An existing event with the same label
    /// gets its location overwritten.
    pub fn add_event_with_location(&mut self, label: &str, location: &str) -> EventId {
        let id = self.add_event(label);
        self.alphabet[id].location = Some(location.to_string());
        id
    }

    pub fn add_state(&mut self, name: impl Into<String>) -> StateId {
        self.graph.add_node(name.into())
    }

    pub fn add_arc(&mut self, from: StateId, event: EventId, to: StateId) -> EdgeIndex {
        assert!(event < self.alphabet.len(), "Event {} is not part of the alphabet", event);
        self.graph.add_edge(from, to, event)
    }

    /// Adds an arc, creating the event if needed.
    pub fn add_arc_labeled(&mut self, from: StateId, label: &str, to: StateId) -> EdgeIndex {
        let event = self.add_event(label);
        self.add_arc(from, event, to)
    }

    pub fn set_initial(&mut self, state: StateId) {
        self.initial = Some(state);
    }

    pub fn initial(&self) -> Option<StateId> {
        self.initial
    }

    pub fn state_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn event_count(&self) -> usize {
        self.alphabet.len()
    }

    pub fn arc_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn states(&self) -> impl Iterator<Item = StateId> + '_ {
        self.graph.node_indices()
    }

    pub fn events(&self) -> &[Event] {
        &self.alphabet
    }

    pub fn event(&self, event: EventId) -> &Event {
        &self.alphabet[event]
    }

    pub fn event_label(&self, event: EventId) -> &str {
        &self.alphabet[event].label
    }

    pub fn event_id(&self, label: &str) -> Option<EventId> {
        self.alphabet.iter().position(|e| e.label == label)
    }

    pub fn state_name(&self, state: StateId) -> &str {
        &self.graph[state]
    }

    pub fn state_by_name(&self, name: &str) -> Option<StateId> {
        self.graph.node_indices().find(|&s| self.graph[s] == name)
    }

    pub fn require_state(&self, name: &str) -> Result<StateId, UnknownStateError> {
        self.state_by_name(name)
            .ok_or_else(|| UnknownStateError(name.to_string()))
    }

    /// Iterates over all arcs as `(source, event, target)`.
    pub fn arcs(&self) -> impl Iterator<Item = (StateId, EventId, StateId)> + '_ {
        self.graph
            .edge_references()
            .map(|e| (e.source(), *e.weight(), e.target()))
    }

    /// Outgoing arcs of a state as `(event, target)`.
    pub fn postset(&self, state: StateId) -> impl Iterator<Item = (EventId, StateId)> + '_ {
        self.graph
            .edges_directed(state, Direction::Outgoing)
            .map(|e| (*e.weight(), e.target()))
    }

    pub fn postset_by_event(
        &self,
        state: StateId,
        event: EventId,
    ) -> impl Iterator<Item = StateId> + '_ {
        self.graph
            .edges_directed(state, Direction::Outgoing)
            .filter(move |e| *e.weight() == event)
            .map(|e| e.target())
    }

    pub fn preset_by_event(
        &self,
        state: StateId,
        event: EventId,
    ) -> impl Iterator<Item = StateId> + '_ {
        self.graph
            .edges_directed(state, Direction::Incoming)
            .filter(move |e| *e.weight() == event)
            .map(|e| e.source())
    }

    pub fn is_enabled(&self, state: StateId, event: EventId) -> bool {
        self.postset_by_event(state, event).next().is_some()
    }

    pub fn enabled_events(&self, state: StateId) -> BTreeSet<EventId> {
        self.postset(state).map(|(e, _)| e).collect()
    }

    pub fn successor(&self, state: StateId, event: EventId) -> Option<StateId> {
        self.postset_by_event(state, event).next()
    }

    /// A transition system is deterministic if no state has arcs with the same
    /// event to two different states.
    pub fn is_deterministic(&self) -> bool {
        self.states().all(|s| {
            let mut targets: Vec<Option<StateId>> = vec![None; self.event_count()];
            self.postset(s).all(|(e, t)| *targets[e].get_or_insert(t) == t)
        })
    }

    /// All states reachable from the initial state in breadth-first order.
    pub fn reachable_states(&self) -> Vec<StateId> {
        let Some(initial) = self.initial else {
            return vec![];
        };

        let mut visited = vec![false; self.state_count()];
        let mut order = vec![];
        let mut queue = VecDeque::from([initial]);
        visited[initial.index()] = true;

        while let Some(state) = queue.pop_front() {
            order.push(state);
            for (_, target) in self.postset(state) {
                if !visited[target.index()] {
                    visited[target.index()] = true;
                    queue.push_back(target);
                }
            }
        }

        order
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let ts: Self = serde_json::from_str(json)?;

        if let Some(initial) = ts.initial.filter(|i| i.index() >= ts.state_count()) {
            anyhow::bail!(
                "initial state {} is outside of the {} states",
                initial.index(),
                ts.state_count()
            );
        }
        if let Some(edge) = ts
            .graph
            .edge_references()
            .find(|edge| *edge.weight() >= ts.alphabet.len())
        {
            anyhow::bail!(
                "arc {} -> {} uses event {}, but the alphabet has {} events",
                edge.source().index(),
                edge.target().index(),
                edge.weight(),
                ts.alphabet.len()
            );
        }

        Ok(ts)
    }

    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let path = std::path::Path::new(path);
        let content = std::fs::read_to_string(path)?;
        match path.extension() {
            Some(ext) if ext == "json" => Self::from_json(&content),
            Some(ext) if ext == "lts" || ext == "apt" => parser::parse_lts(&content),
            _ => Err(anyhow::anyhow!(
                "Unsupported file extension: {:?}",
                path.extension()
            )),
        }
    }
}
