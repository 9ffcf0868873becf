//! Discrete Bayesian network model consumed by the adaptive engine.
//!
//! Variables are identified by [`VarId`]. Each [`Node`] holds a conditional
//! probability table laid out with parents in declared order followed by the
//! node itself, row-major, so the node's own state varies fastest.
//!
//! The engine only reads models through the [`Model`] trait. Besides the
//! owned [`BayesianNetwork`], an [`Overlay`] exposes a snapshot network plus
//! selected nodes borrowed from a reference network without copying either.

pub mod inference;
pub mod uai;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

pub use inference::{ExactInference, Inference};

/// Index of a variable in a model.
pub type VarId = usize;

/// Probability distribution over the states of one variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Distribution(Vec<f64>);

impl Distribution {
    /// Create a distribution from raw probabilities.
    #[must_use]
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    /// All mass on `state`.
    #[must_use]
    pub fn degenerate(size: usize, state: usize) -> Self {
        let mut values = vec![0.0; size];
        if let Some(slot) = values.get_mut(state) {
            *slot = 1.0;
        }
        Self(values)
    }

    /// Equal mass on every state.
    #[must_use]
    pub fn uniform(size: usize) -> Self {
        Self(vec![1.0 / size as f64; size])
    }

    /// Probability of `state`; zero when out of range.
    #[must_use]
    pub fn value_at(&self, state: usize) -> f64 {
        self.0.get(state).copied().unwrap_or(0.0)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// State with the highest probability (first on ties).
    #[must_use]
    pub fn mode(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (state, &p) in self.0.iter().enumerate() {
            if best.is_none_or(|(_, b)| p > b) {
                best = Some((state, p));
            }
        }
        best.map(|(state, _)| state)
    }
}

/// Observed variable states accumulated during a session.
///
/// A variable keeps the first state observed for it: later observations of
/// the same variable are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Observations(BTreeMap<VarId, usize>);

impl Observations {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `variable = state`. Returns `false` if the variable was already observed.
    pub fn observe(&mut self, variable: VarId, state: usize) -> bool {
        if self.0.contains_key(&variable) {
            return false;
        }
        self.0.insert(variable, state);
        true
    }

    #[must_use]
    pub fn get(&self, variable: VarId) -> Option<usize> {
        self.0.get(&variable).copied()
    }

    #[must_use]
    pub fn contains(&self, variable: VarId) -> bool {
        self.0.contains_key(&variable)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (VarId, usize)> + '_ {
        self.0.iter().map(|(&v, &s)| (v, s))
    }

    /// Keep only the observations matching `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(VarId) -> bool) {
        self.0.retain(|&v, _| keep(v));
    }
}

impl FromIterator<(VarId, usize)> for Observations {
    fn from_iter<I: IntoIterator<Item = (VarId, usize)>>(iter: I) -> Self {
        let mut observations = Self::new();
        for (variable, state) in iter {
            observations.observe(variable, state);
        }
        observations
    }
}

/// Conditional probability table of one variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    size: usize,
    parents: Vec<VarId>,
    parent_sizes: Vec<usize>,
    table: Vec<f64>,
}

impl Node {
    /// Create a node for `variable`, checking the table length against the declared sizes.
    pub fn new(
        variable: VarId,
        size: usize,
        parents: Vec<(VarId, usize)>,
        table: Vec<f64>,
    ) -> Result<Self, ModelError> {
        let (parents, parent_sizes): (Vec<_>, Vec<_>) = parents.into_iter().unzip();
        let expected = size * parent_sizes.iter().product::<usize>();
        if size == 0 || table.len() != expected {
            return Err(ModelError::InvalidTable {
                variable,
                expected,
                actual: table.len(),
            });
        }
        Ok(Self {
            size,
            parents,
            parent_sizes,
            table,
        })
    }

    /// Parentless node with the given marginal.
    #[must_use]
    pub fn root(distribution: &Distribution) -> Self {
        Self {
            size: distribution.len(),
            parents: Vec::new(),
            parent_sizes: Vec::new(),
            table: distribution.as_slice().to_vec(),
        }
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    #[must_use]
    pub fn parents(&self) -> &[VarId] {
        &self.parents
    }

    #[must_use]
    pub fn parent_sizes(&self) -> &[usize] {
        &self.parent_sizes
    }

    #[must_use]
    pub fn table(&self) -> &[f64] {
        &self.table
    }

    /// `P(self = state | parents)`, reading parent states from a dense assignment.
    #[must_use]
    pub fn probability(&self, state: usize, assignment: &[usize]) -> f64 {
        let mut row = 0;
        for (parent, size) in self.parents.iter().zip(&self.parent_sizes) {
            row = row * size + assignment[*parent];
        }
        self.table[row * self.size + state]
    }
}

/// Read access to a discrete Bayesian network.
pub trait Model: Send + Sync {
    /// Node of `variable`, if the model contains it.
    fn node(&self, variable: VarId) -> Option<&Node>;

    /// All variables, ascending.
    fn variables(&self) -> Vec<VarId>;

    fn contains(&self, variable: VarId) -> bool {
        self.node(variable).is_some()
    }

    fn size(&self, variable: VarId) -> Option<usize> {
        self.node(variable).map(Node::size)
    }

    fn parents(&self, variable: VarId) -> &[VarId] {
        self.node(variable).map(Node::parents).unwrap_or(&[])
    }

    fn children(&self, variable: VarId) -> Vec<VarId> {
        self.variables()
            .into_iter()
            .filter(|&v| self.parents(v).contains(&variable))
            .collect()
    }
}

/// Owned Bayesian network.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BayesianNetwork {
    nodes: BTreeMap<VarId, Node>,
}

impl BayesianNetwork {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the node of `variable`.
    pub fn insert(&mut self, variable: VarId, node: Node) {
        self.nodes.insert(variable, node);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Check parent references, parent cardinalities, and acyclicity.
    pub fn validate(&self) -> Result<(), ModelError> {
        for (&variable, node) in &self.nodes {
            for (&parent, &expected) in node.parents.iter().zip(&node.parent_sizes) {
                let actual = self
                    .nodes
                    .get(&parent)
                    .ok_or(ModelError::UnknownVariable(parent))?
                    .size;
                if actual != expected {
                    return Err(ModelError::ParentMismatch {
                        variable,
                        parent,
                        expected,
                        actual,
                    });
                }
            }
        }

        // Kahn's algorithm over parent counts
        let mut pending: BTreeMap<VarId, usize> = self
            .nodes
            .iter()
            .map(|(&v, n)| (v, n.parents.len()))
            .collect();
        let mut ready: Vec<VarId> = pending
            .iter()
            .filter(|&(_, &c)| c == 0)
            .map(|(&v, _)| v)
            .collect();
        while let Some(variable) = ready.pop() {
            pending.remove(&variable);
            for child in self.children(variable) {
                if let Some(count) = pending.get_mut(&child) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push(child);
                    }
                }
            }
        }
        match pending.keys().next() {
            Some(&variable) => Err(ModelError::Cycle(variable)),
            None => Ok(()),
        }
    }
}

impl Model for BayesianNetwork {
    fn node(&self, variable: VarId) -> Option<&Node> {
        self.nodes.get(&variable)
    }

    fn variables(&self) -> Vec<VarId> {
        self.nodes.keys().copied().collect()
    }
}

/// A snapshot network extended with nodes borrowed from a reference network.
///
/// Neither network is modified: attaching a variable only widens the view.
#[derive(Debug, Clone)]
pub struct Overlay<'a> {
    base: &'a BayesianNetwork,
    reference: &'a BayesianNetwork,
    extra: BTreeSet<VarId>,
}

impl<'a> Overlay<'a> {
    #[must_use]
    pub fn new(base: &'a BayesianNetwork, reference: &'a BayesianNetwork) -> Self {
        Self {
            base,
            reference,
            extra: BTreeSet::new(),
        }
    }

    /// Make `variable` of the reference network visible.
    ///
    /// Its parents must already be visible. Variables present in the base are left alone.
    pub fn attach(&mut self, variable: VarId) -> Result<(), ModelError> {
        if self.base.node(variable).is_some() {
            return Ok(());
        }
        let node = self
            .reference
            .node(variable)
            .ok_or(ModelError::UnknownVariable(variable))?;
        if let Some(missing) = node.parents().iter().find(|&&p| !self.contains(p)) {
            return Err(ModelError::UnsupportedStructure(format!(
                "variable {variable} depends on {missing}, which is not in the working graph"
            )));
        }
        self.extra.insert(variable);
        Ok(())
    }
}

impl Model for Overlay<'_> {
    fn node(&self, variable: VarId) -> Option<&Node> {
        self.base.node(variable).or_else(|| {
            if self.extra.contains(&variable) {
                self.reference.node(variable)
            } else {
                None
            }
        })
    }

    fn variables(&self) -> Vec<VarId> {
        let mut variables: BTreeSet<VarId> = self.base.nodes.keys().copied().collect();
        variables.extend(self.extra.iter().copied());
        variables.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skill_and_question() -> BayesianNetwork {
        let mut network = BayesianNetwork::new();
        network.insert(0, Node::new(0, 2, vec![], vec![0.5, 0.5]).unwrap());
        network.insert(
            1,
            Node::new(1, 2, vec![(0, 2)], vec![0.9, 0.1, 0.2, 0.8]).unwrap(),
        );
        network
    }

    #[test]
    fn distribution_value_at_out_of_range_is_zero() {
        let distribution = Distribution::new(vec![0.25, 0.75]);
        assert_eq!(distribution.value_at(1), 0.75);
        assert_eq!(distribution.value_at(5), 0.0);
    }

    #[test]
    fn distribution_mode_prefers_first_on_ties() {
        assert_eq!(Distribution::uniform(3).mode(), Some(0));
        assert_eq!(Distribution::new(vec![0.1, 0.6, 0.3]).mode(), Some(1));
        assert_eq!(Distribution::new(vec![]).mode(), None);
    }

    #[test]
    fn degenerate_puts_all_mass_on_one_state() {
        assert_eq!(Distribution::degenerate(3, 2).as_slice(), &[0.0, 0.0, 1.0]);
    }

    #[test]
    fn observations_keep_first_state() {
        let mut observations = Observations::new();
        assert!(observations.observe(4, 1));
        assert!(!observations.observe(4, 0));
        assert_eq!(observations.get(4), Some(1));
        assert_eq!(observations.len(), 1);
    }

    #[test]
    fn node_rejects_wrong_table_length() {
        let result = Node::new(1, 2, vec![(0, 3)], vec![0.5; 4]);
        assert_eq!(
            result,
            Err(ModelError::InvalidTable {
                variable: 1,
                expected: 6,
                actual: 4
            })
        );
    }

    #[test]
    fn node_probability_uses_child_fastest_layout() {
        let network = skill_and_question();
        let node = network.node(1).unwrap();
        assert_eq!(node.probability(1, &[0, 0]), 0.1);
        assert_eq!(node.probability(1, &[1, 0]), 0.8);
    }

    #[test]
    fn validate_detects_cycles() {
        let mut network = BayesianNetwork::new();
        network.insert(0, Node::new(0, 2, vec![(1, 2)], vec![0.5; 4]).unwrap());
        network.insert(1, Node::new(1, 2, vec![(0, 2)], vec![0.5; 4]).unwrap());
        assert!(matches!(network.validate(), Err(ModelError::Cycle(_))));
    }

    #[test]
    fn validate_detects_parent_size_mismatch() {
        let mut network = BayesianNetwork::new();
        network.insert(0, Node::new(0, 3, vec![], vec![0.2, 0.3, 0.5]).unwrap());
        network.insert(1, Node::new(1, 2, vec![(0, 2)], vec![0.5; 4]).unwrap());
        assert!(matches!(
            network.validate(),
            Err(ModelError::ParentMismatch { parent: 0, .. })
        ));
    }

    #[test]
    fn children_lists_dependents() {
        let network = skill_and_question();
        assert_eq!(network.children(0), vec![1]);
        assert!(network.children(1).is_empty());
    }

    #[test]
    fn overlay_exposes_attached_reference_nodes() {
        let reference = skill_and_question();
        let mut base = BayesianNetwork::new();
        base.insert(0, Node::root(&Distribution::new(vec![0.3, 0.7])));

        let mut overlay = Overlay::new(&base, &reference);
        assert!(!overlay.contains(1));

        overlay.attach(1).unwrap();
        assert_eq!(overlay.variables(), vec![0, 1]);
        assert_eq!(overlay.node(0).unwrap().table(), &[0.3, 0.7]);
        assert_eq!(overlay.parents(1), &[0]);
        assert!(!base.contains(1));
    }

    #[test]
    fn overlay_refuses_node_with_hidden_parent() {
        let reference = skill_and_question();
        let base = BayesianNetwork::new();
        let mut overlay = Overlay::new(&base, &reference);
        assert!(matches!(
            overlay.attach(1),
            Err(ModelError::UnsupportedStructure(_))
        ));
    }
}
