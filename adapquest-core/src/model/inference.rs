//! Inference port and the exact enumeration backend.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use tracing::trace;

use super::{Distribution, Model, Node, Observations, VarId};
use crate::error::ModelError;

/// Default cap on the number of joint states a single query may enumerate.
pub const DEFAULT_MAX_JOINT_STATES: usize = 1 << 22;

/// Posterior queries against a model.
///
/// Implementations must be deterministic: the same model, evidence, and
/// target always yield the same distribution.
pub trait Inference: Send + Sync + fmt::Debug {
    /// Posterior distribution of `target` given `evidence`.
    ///
    /// Evidence on variables the model does not contain is ignored.
    fn query(
        &self,
        model: &dyn Model,
        evidence: &Observations,
        target: VarId,
    ) -> Result<Distribution, ModelError>;
}

/// Exact inference by enumeration over the ancestral closure of the query.
///
/// Variables that are neither ancestors of the target nor of an observed
/// variable sum out to one and are skipped entirely.
#[derive(Debug, Clone)]
pub struct ExactInference {
    max_joint_states: u128,
}

impl Default for ExactInference {
    fn default() -> Self {
        Self::with_limit(DEFAULT_MAX_JOINT_STATES)
    }
}

impl ExactInference {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse queries that would enumerate more than `max_joint_states` assignments.
    #[must_use]
    pub fn with_limit(max_joint_states: usize) -> Self {
        Self {
            max_joint_states: max_joint_states as u128,
        }
    }
}

impl Inference for ExactInference {
    fn query(
        &self,
        model: &dyn Model,
        evidence: &Observations,
        target: VarId,
    ) -> Result<Distribution, ModelError> {
        let size = model
            .size(target)
            .ok_or(ModelError::UnknownVariable(target))?;

        let mut observed = BTreeMap::new();
        for (variable, state) in evidence.iter() {
            let Some(variable_size) = model.size(variable) else {
                continue;
            };
            if state >= variable_size {
                return Err(ModelError::InvalidState {
                    variable,
                    state,
                    size: variable_size,
                });
            }
            observed.insert(variable, state);
        }

        if let Some(&state) = observed.get(&target) {
            return Ok(Distribution::degenerate(size, state));
        }

        let closure = ancestral_closure(model, observed.keys().copied().chain([target]))?;
        let nodes: Vec<(VarId, &Node)> = closure
            .iter()
            .map(|&v| {
                model
                    .node(v)
                    .map(|n| (v, n))
                    .ok_or(ModelError::UnknownVariable(v))
            })
            .collect::<Result<_, _>>()?;

        let free: Vec<(VarId, usize)> = nodes
            .iter()
            .filter(|(v, _)| !observed.contains_key(v))
            .map(|(v, n)| (*v, n.size()))
            .collect();
        let states = free
            .iter()
            .try_fold(1u128, |acc, (_, s)| acc.checked_mul(*s as u128))
            .unwrap_or(u128::MAX);
        if states > self.max_joint_states {
            return Err(ModelError::Intractable {
                states,
                limit: self.max_joint_states,
            });
        }
        trace!(variable = target, evidence = observed.len(), states, "exact query");

        let width = closure.last().map_or(0, |&v| v + 1);
        let mut assignment = vec![0usize; width];
        for (&variable, &state) in &observed {
            assignment[variable] = state;
        }

        let mut posterior = vec![0.0; size];
        'enumerate: loop {
            let weight: f64 = nodes
                .iter()
                .map(|(v, n)| n.probability(assignment[*v], &assignment))
                .product();
            posterior[assignment[target]] += weight;

            for &(variable, variable_size) in &free {
                assignment[variable] += 1;
                if assignment[variable] < variable_size {
                    continue 'enumerate;
                }
                assignment[variable] = 0;
            }
            break;
        }

        let total: f64 = posterior.iter().sum();
        if total.is_nan() || total <= 0.0 {
            return Err(ModelError::ImpossibleEvidence);
        }
        posterior.iter_mut().for_each(|p| *p /= total);
        Ok(Distribution::new(posterior))
    }
}

/// The seeds plus all their ancestors, ascending.
fn ancestral_closure(
    model: &dyn Model,
    seeds: impl IntoIterator<Item = VarId>,
) -> Result<Vec<VarId>, ModelError> {
    let mut closure = BTreeSet::new();
    let mut stack: Vec<VarId> = seeds.into_iter().collect();
    while let Some(variable) = stack.pop() {
        if !closure.insert(variable) {
            continue;
        }
        let node = model
            .node(variable)
            .ok_or(ModelError::UnknownVariable(variable))?;
        stack.extend(node.parents().iter().copied());
    }
    Ok(closure.into_iter().collect())
}
