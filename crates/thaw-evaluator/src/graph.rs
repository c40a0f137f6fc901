//! Dependency graph validation and evaluation ordering.
//!
//! [`validate_graph`] runs once during setup, before any field is computed,
//! to check the evaluator set for structural errors and build an
//! [`EvaluationOrder`] in which every field follows its dependencies.

use indexmap::{IndexMap, IndexSet};
use thaw_core::{FieldKey, ThawError};

use crate::evaluator::Evaluator;

use std::error::Error;
use std::fmt;

// ── Order ──────────────────────────────────────────────────────────

/// Topological order of an evaluator set: dependencies first.
///
/// Built once by [`validate_graph`]. Ties are broken by registration
/// order, so the order is deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct EvaluationOrder {
    order: Vec<FieldKey>,
}

impl EvaluationOrder {
    /// Keys in evaluation order.
    pub fn keys(&self) -> &[FieldKey] {
        &self.order
    }

    /// Position of `key` in the order.
    pub fn position(&self, key: &FieldKey) -> Option<usize> {
        self.order.iter().position(|k| k == key)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

// ── Errors ─────────────────────────────────────────────────────────

/// Errors from graph validation (setup-time, before any evaluation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Two evaluators produce the same key.
    DuplicateOwner {
        /// The contested key.
        key: FieldKey,
        /// Name of the first evaluator (earlier in registration order).
        first: String,
        /// Name of the second evaluator.
        second: String,
    },
    /// An evaluator lists its own output among its dependencies.
    SelfDependency {
        /// The offending key.
        key: FieldKey,
    },
    /// An evaluator depends on a key no evaluator produces.
    UndefinedDependency {
        /// The dependent evaluator's key.
        evaluator: FieldKey,
        /// The unresolved dependency.
        dependency: FieldKey,
    },
    /// The dependency graph contains a cycle.
    CyclicDependency {
        /// Keys along the cycle; the first key is repeated at the end.
        cycle: Vec<FieldKey>,
    },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateOwner { key, first, second } => {
                write!(f, "field '{key}' produced by both '{first}' and '{second}'")
            }
            Self::SelfDependency { key } => write!(f, "evaluator '{key}' depends on itself"),
            Self::UndefinedDependency {
                evaluator,
                dependency,
            } => write!(
                f,
                "evaluator '{evaluator}' depends on '{dependency}', which no evaluator provides"
            ),
            Self::CyclicDependency { cycle } => {
                write!(f, "dependency cycle: ")?;
                for (i, k) in cycle.iter().enumerate() {
                    if i > 0 {
                        write!(f, " -> ")?;
                    }
                    write!(f, "{k}")?;
                }
                Ok(())
            }
        }
    }
}

impl Error for GraphError {}

impl From<GraphError> for ThawError {
    fn from(e: GraphError) -> Self {
        match e {
            GraphError::DuplicateOwner { key, first, second } => {
                Self::DuplicateOwner { key, first, second }
            }
            GraphError::SelfDependency { key } => Self::CyclicDependency {
                cycle: vec![key.clone(), key],
            },
            GraphError::UndefinedDependency {
                evaluator,
                dependency,
            } => Self::NotFound {
                key: format!("'{dependency}' (required by '{evaluator}')"),
            },
            GraphError::CyclicDependency { cycle } => Self::CyclicDependency { cycle },
        }
    }
}

// ── Validation ─────────────────────────────────────────────────────

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Validate a set of evaluators and build their [`EvaluationOrder`].
///
/// Checks performed, in order:
///
/// 1. No two evaluators produce the same key.
/// 2. No evaluator depends on its own output.
/// 3. Every dependency is produced by some evaluator.
/// 4. The graph is acyclic (depth-first search; a node reached again while
///    still in progress closes a cycle, reported with its full path).
pub fn validate_graph<'a, I>(evaluators: I) -> Result<EvaluationOrder, GraphError>
where
    I: IntoIterator<Item = &'a dyn Evaluator>,
{
    // 1. Unique producers
    let mut nodes: IndexMap<&FieldKey, &dyn Evaluator> = IndexMap::new();
    for ev in evaluators {
        if let Some(first) = nodes.get(ev.key()) {
            return Err(GraphError::DuplicateOwner {
                key: ev.key().clone(),
                first: first.name().to_string(),
                second: ev.name().to_string(),
            });
        }
        nodes.insert(ev.key(), ev);
    }

    // 2-3. Edge validity
    for (key, ev) in &nodes {
        for dep in ev.dependencies() {
            if dep == *key {
                return Err(GraphError::SelfDependency { key: dep.clone() });
            }
            if !nodes.contains_key(dep) {
                return Err(GraphError::UndefinedDependency {
                    evaluator: (*key).clone(),
                    dependency: dep.clone(),
                });
            }
        }
    }

    // 4. Iterative DFS with explicit path stack
    let mut marks = vec![Mark::Unvisited; nodes.len()];
    let mut order: IndexSet<FieldKey> = IndexSet::with_capacity(nodes.len());
    for root in 0..nodes.len() {
        if marks[root] != Mark::Unvisited {
            continue;
        }
        // (node index, next dependency to visit)
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        marks[root] = Mark::InProgress;
        while let Some(&mut (node, ref mut next)) = stack.last_mut() {
            let deps = nodes[node].dependencies();
            if *next < deps.len() {
                let dep = &deps[*next];
                *next += 1;
                let Some(child) = nodes.get_index_of(dep) else {
                    continue;
                };
                match marks[child] {
                    Mark::Done => {}
                    Mark::InProgress => {
                        let start = stack
                            .iter()
                            .position(|&(n, _)| n == child)
                            .unwrap_or(0);
                        let mut cycle: Vec<FieldKey> = stack[start..]
                            .iter()
                            .map(|&(n, _)| nodes[n].key().clone())
                            .collect();
                        cycle.push(nodes[child].key().clone());
                        return Err(GraphError::CyclicDependency { cycle });
                    }
                    Mark::Unvisited => {
                        marks[child] = Mark::InProgress;
                        stack.push((child, 0));
                    }
                }
            } else {
                marks[node] = Mark::Done;
                order.insert(nodes[node].key().clone());
                stack.pop();
            }
        }
    }

    Ok(EvaluationOrder {
        order: order.into_iter().collect(),
    })
}
