use std::{fmt::Debug, hash::Hash};

use hashbrown::{HashMap, HashSet};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EquivalenceError {
    #[error("element {0} is not part of the domain of the relation")]
    NotInDomain(String),
}

/// A partition of elements into disjoint classes (union-find).
///
/// Elements are stored in an arena, classes are trees of parent indices that
/// are merged by size. Indices never leave this type, classes are only exposed
/// through leader and class queries. Elements that were never joined with
/// anything are not tracked and form implicit singleton classes.
#[derive(Debug, Clone)]
pub struct EquivalenceRelation<E: Clone + Eq + Hash> {
    index: HashMap<E, usize>,
    elements: Vec<E>,
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl<E: Clone + Eq + Hash> Default for EquivalenceRelation<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Clone + Eq + Hash> EquivalenceRelation<E> {
    pub fn new() -> Self {
        EquivalenceRelation {
            index: HashMap::new(),
            elements: vec![],
            parent: vec![],
            size: vec![],
        }
    }

    /// Number of tracked elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn contains(&self, element: &E) -> bool {
        self.index.contains_key(element)
    }

    /// Starts tracking an element in its own class.
    fn track(&mut self, element: &E) -> usize {
        if let Some(&i) = self.index.get(element) {
            return i;
        }

        let i = self.elements.len();
        self.elements.push(element.clone());
        self.parent.push(i);
        self.size.push(1);
        self.index.insert(element.clone(), i);
        i
    }

    fn root(&self, mut i: usize) -> usize {
        while self.parent[i] != i {
            i = self.parent[i];
        }
        i
    }

    fn root_compressing(&mut self, i: usize) -> usize {
        let root = self.root(i);

        let mut current = i;
        while self.parent[current] != root {
            let next = self.parent[current];
            self.parent[current] = root;
            current = next;
        }

        root
    }

    /// Merges the classes of `a` and `b`. Returns `false` if they already were
    /// in the same class.
    pub fn join_classes(&mut self, a: &E, b: &E) -> bool {
        let a = self.track(a);
        let b = self.track(b);
        let root_a = self.root_compressing(a);
        let root_b = self.root_compressing(b);

        if root_a == root_b {
            return false;
        }

        let (big, small) = if self.size[root_a] >= self.size[root_b] {
            (root_a, root_b)
        } else {
            (root_b, root_a)
        };

        self.parent[small] = big;
        self.size[big] += self.size[small];

        true
    }

    pub fn is_equivalent(&self, a: &E, b: &E) -> bool {
        if a == b {
            return true;
        }

        match (self.index.get(a), self.index.get(b)) {
            (Some(&a), Some(&b)) => self.root(a) == self.root(b),
            _ => false,
        }
    }

    /// The canonical representative of the class of `element`.
    pub fn leader(&self, element: &E) -> E {
        match self.index.get(element) {
            Some(&i) => self.elements[self.root(i)].clone(),
            None => element.clone(),
        }
    }

    pub fn class_of(&self, element: &E) -> HashSet<E> {
        let Some(&i) = self.index.get(element) else {
            return HashSet::from([element.clone()]);
        };

        let root = self.root(i);
        (0..self.elements.len())
            .filter(|&j| self.root(j) == root)
            .map(|j| self.elements[j].clone())
            .collect()
    }

    /// All classes of tracked elements, ordered by the first insertion of one
    /// of their members. Members keep their insertion order.
    pub fn classes(&self) -> Vec<Vec<E>> {
        let mut class_index: HashMap<usize, usize> = HashMap::new();
        let mut classes: Vec<Vec<E>> = vec![];

        for (i, element) in self.elements.iter().enumerate() {
            let root = self.root(i);
            let class = *class_index.entry(root).or_insert_with(|| {
                classes.push(vec![]);
                classes.len() - 1
            });
            classes[class].push(element.clone());
        }

        classes
    }

    pub fn class_count(&self) -> usize {
        (0..self.elements.len())
            .filter(|&i| self.parent[i] == i)
            .count()
    }
}

/// An [EquivalenceRelation] over a fixed domain. Every element of the domain
/// has a class from construction on, queries outside the domain are rejected.
#[derive(Debug, Clone)]
pub struct DomainEquivalenceRelation<E: Clone + Eq + Hash + Debug> {
    relation: EquivalenceRelation<E>,
}

impl<E: Clone + Eq + Hash + Debug> DomainEquivalenceRelation<E> {
    pub fn new(domain: impl IntoIterator<Item = E>) -> Self {
        let mut relation = EquivalenceRelation::new();
        for element in domain {
            relation.track(&element);
        }

        DomainEquivalenceRelation { relation }
    }

    fn check(&self, element: &E) -> Result<(), EquivalenceError> {
        if self.relation.contains(element) {
            Ok(())
        } else {
            Err(EquivalenceError::NotInDomain(format!("{:?}", element)))
        }
    }

    pub fn domain_size(&self) -> usize {
        self.relation.len()
    }

    pub fn join_classes(&mut self, a: &E, b: &E) -> Result<bool, EquivalenceError> {
        self.check(a)?;
        self.check(b)?;
        Ok(self.relation.join_classes(a, b))
    }

    pub fn is_equivalent(&self, a: &E, b: &E) -> Result<bool, EquivalenceError> {
        self.check(a)?;
        self.check(b)?;
        Ok(self.relation.is_equivalent(a, b))
    }

    pub fn leader(&self, element: &E) -> Result<E, EquivalenceError> {
        self.check(element)?;
        Ok(self.relation.leader(element))
    }

    pub fn class_of(&self, element: &E) -> Result<HashSet<E>, EquivalenceError> {
        self.check(element)?;
        Ok(self.relation.class_of(element))
    }

    /// All classes, singletons included.
    pub fn classes(&self) -> Vec<Vec<E>> {
        self.relation.classes()
    }

    pub fn class_count(&self) -> usize {
        self.relation.class_count()
    }
}
