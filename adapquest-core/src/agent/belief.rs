//! Where an agent's posteriors come from.
//!
//! ```text
//!   Full:     reference model ──────────────► queries
//!
//!   Working:  snapshot(gen N) + attached ───► queries
//!                   │  answer accepted
//!                   ▼
//!             pending fold ── next read ──► snapshot(gen N+1), attached = []
//! ```
//!
//! The working graph holds only skill nodes. Question nodes are borrowed from
//! the reference model through an [`Overlay`] while they are asked or scored,
//! and answers are folded into the skill tables before the next read.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use crate::error::ModelError;
use crate::model::{BayesianNetwork, Distribution, Inference, Model, Node, Observations, Overlay, VarId};
use crate::survey::Survey;

#[derive(Debug, Clone)]
pub(crate) enum Beliefs {
    Full(Arc<BayesianNetwork>),
    Working(WorkingGraph),
}

#[derive(Debug, Clone)]
pub(crate) struct WorkingGraph {
    reference: Arc<BayesianNetwork>,
    skills: Vec<VarId>,
    snapshot: Arc<BayesianNetwork>,
    generation: u64,
    attached: Vec<VarId>,
    pending: bool,
}

impl Beliefs {
    pub fn full(model: Arc<BayesianNetwork>) -> Self {
        Self::Full(model)
    }

    /// Working graph seeded with the skill nodes of `survey`.
    ///
    /// Every parent of a skill must itself be a skill.
    pub fn working(survey: &Survey) -> Result<Self, ModelError> {
        let reference = Arc::clone(survey.model());
        let skills: Vec<VarId> = survey.skills().iter().map(|s| s.variable).collect();

        let mut snapshot = BayesianNetwork::new();
        for &skill in &skills {
            let node = reference
                .node(skill)
                .ok_or(ModelError::UnknownVariable(skill))?;
            if let Some(parent) = node.parents().iter().find(|p| !skills.contains(p)) {
                return Err(ModelError::UnsupportedStructure(format!(
                    "skill variable {skill} depends on non-skill variable {parent}"
                )));
            }
            snapshot.insert(skill, node.clone());
        }

        Ok(Self::Working(WorkingGraph {
            reference,
            skills,
            snapshot: Arc::new(snapshot),
            generation: 0,
            attached: Vec::new(),
            pending: false,
        }))
    }

    /// Model view with `extra` question variables made visible.
    pub fn view(&self, extra: &[VarId]) -> Result<Overlay<'_>, ModelError> {
        match self {
            Self::Full(model) => Ok(Overlay::new(model, model)),
            Self::Working(graph) => {
                let mut overlay = Overlay::new(&graph.snapshot, &graph.reference);
                for &variable in graph.attached.iter().chain(extra) {
                    overlay.attach(variable)?;
                }
                Ok(overlay)
            }
        }
    }

    /// Keep `variables` visible until the next fold.
    pub fn attach(&mut self, variables: &[VarId]) -> Result<(), ModelError> {
        self.view(variables)?;
        if let Self::Working(graph) = self {
            for &variable in variables {
                if !graph.attached.contains(&variable) {
                    graph.attached.push(variable);
                }
            }
        }
        Ok(())
    }

    /// Record that observations changed since the last fold.
    pub fn mark_pending(&mut self) {
        if let Self::Working(graph) = self {
            graph.pending = true;
        }
    }

    pub fn generation(&self) -> u64 {
        match self {
            Self::Full(_) => 0,
            Self::Working(graph) => graph.generation,
        }
    }

    /// Fold pending observations into a new snapshot.
    ///
    /// Observed skills become degenerate roots. Skills with an observed
    /// descendant keep their parents and take `P(skill | parents, observations)`
    /// as their table. Other skills keep their node. Afterwards only skill
    /// observations remain.
    pub fn sync(
        &mut self,
        observations: &mut Observations,
        inference: &dyn Inference,
    ) -> Result<(), ModelError> {
        let Self::Working(graph) = self else {
            return Ok(());
        };
        if !graph.pending {
            return Ok(());
        }

        let mut next = BayesianNetwork::new();
        let mut refreshed = 0usize;
        {
            let mut view = Overlay::new(&graph.snapshot, &graph.reference);
            for &variable in &graph.attached {
                view.attach(variable)?;
            }
            let informed = ancestors(
                &view,
                observations.iter().map(|(v, _)| v).filter(|&v| view.contains(v)),
            );
            for &skill in &graph.skills {
                let current = view.node(skill).ok_or(ModelError::UnknownVariable(skill))?;
                let node = if let Some(state) = observations.get(skill) {
                    Node::root(&Distribution::degenerate(current.size(), state))
                } else if informed.contains(&skill) {
                    refreshed += 1;
                    conditioned(&view, current, skill, observations, inference)?
                } else {
                    current.clone()
                };
                next.insert(skill, node);
            }
        }

        graph.snapshot = Arc::new(next);
        graph.generation += 1;
        graph.attached.clear();
        graph.pending = false;
        let skills = &graph.skills;
        observations.retain(|v| skills.contains(&v));
        debug!(
            generation = graph.generation,
            refreshed, "folded answers into working graph"
        );
        Ok(())
    }
}

/// Strict ancestors of `seeds`.
fn ancestors(model: &dyn Model, seeds: impl IntoIterator<Item = VarId>) -> BTreeSet<VarId> {
    let mut found = BTreeSet::new();
    let mut stack: Vec<VarId> = seeds
        .into_iter()
        .flat_map(|v| model.parents(v).to_vec())
        .collect();
    while let Some(variable) = stack.pop() {
        if found.insert(variable) {
            stack.extend_from_slice(model.parents(variable));
        }
    }
    found
}

/// `current` re-estimated under `observations`, one posterior per parent row.
fn conditioned(
    model: &dyn Model,
    current: &Node,
    skill: VarId,
    observations: &Observations,
    inference: &dyn Inference,
) -> Result<Node, ModelError> {
    if current.parents().is_empty() {
        return Ok(Node::root(&inference.query(model, observations, skill)?));
    }

    let size = current.size();
    let rows: usize = current.parent_sizes().iter().product();
    let mut table = Vec::with_capacity(rows * size);
    for row in 0..rows {
        let mut evidence = observations.clone();
        let mut consistent = true;
        let mut rest = row;
        for (&parent, &parent_size) in current
            .parents()
            .iter()
            .zip(current.parent_sizes())
            .rev()
        {
            let state = rest % parent_size;
            rest /= parent_size;
            if !evidence.observe(parent, state) && evidence.get(parent) != Some(state) {
                consistent = false;
            }
        }

        let posterior = if consistent {
            match inference.query(model, &evidence, skill) {
                Ok(posterior) => Some(posterior),
                // a parent row the evidence rules out never carries weight
                Err(ModelError::ImpossibleEvidence) => None,
                Err(e) => return Err(e),
            }
        } else {
            None
        };
        match posterior {
            Some(posterior) => table.extend_from_slice(posterior.as_slice()),
            None => table.extend_from_slice(&current.table()[row * size..(row + 1) * size]),
        }
    }

    let parents = current
        .parents()
        .iter()
        .copied()
        .zip(current.parent_sizes().iter().copied())
        .collect();
    Node::new(skill, size, parents, table)
}
