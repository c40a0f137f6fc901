//! The [`State`] context object and its depth-first recomputation engine.

use std::time::Instant;

use indexmap::IndexMap;
use smallvec::SmallVec;
use thaw_core::{ConfigError, Epoch, FieldKey, IoFlags, ThawError, DERIVATIVE_TAG_PREFIX};
use thaw_evaluator::{validate_graph, EvalContext, EvaluationOrder, Evaluator, EvaluatorKind};
use thaw_mesh::MeshSet;
use thaw_store::{Claim, CompositeVector, FieldStore};
use tracing::{debug, debug_span, trace};

use crate::derivative::DerivativeCache;
use crate::metrics::EvalMetrics;

// ── Status ─────────────────────────────────────────────────────────

/// Freshness of a field relative to the primary data it depends on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldStatus {
    /// Computed from the current upstream epochs; reads hit the cache.
    Fresh,
    /// Some upstream primary changed (or the field was never computed).
    Stale,
    /// Currently being recomputed.
    Computing,
}

// ── Node ───────────────────────────────────────────────────────────

pub(crate) struct Node {
    pub(crate) evaluator: Box<dyn Evaluator>,
    /// Node indices of the distinct dependencies, in declaration order.
    pub(crate) deps: SmallVec<[usize; 4]>,
    /// Upstream epoch the stored value was computed from.
    pub(crate) computed: Option<Epoch>,
    pub(crate) computing: bool,
    /// Read generation in which this node was last confirmed fresh.
    visited: u64,
    force_pending: bool,
    requests: IndexMap<String, Epoch>,
    pub(crate) derivatives: IndexMap<usize, DerivativeCache>,
    pub(crate) derivative_requests: IndexMap<(usize, String), Epoch>,
    pub(crate) metrics: EvalMetrics,
}

impl Node {
    fn new(evaluator: Box<dyn Evaluator>) -> Self {
        let force_pending = evaluator.forces_initial_update();
        Self {
            evaluator,
            deps: SmallVec::new(),
            computed: None,
            computing: false,
            visited: 0,
            force_pending,
            requests: IndexMap::new(),
            derivatives: IndexMap::new(),
            derivative_requests: IndexMap::new(),
            metrics: EvalMetrics::default(),
        }
    }

    pub(crate) fn key(&self) -> &FieldKey {
        self.evaluator.key()
    }

    pub(crate) fn is_primary(&self) -> bool {
        self.evaluator.kind() == EvaluatorKind::Primary
    }
}

// ── State ──────────────────────────────────────────────────────────

/// One simulation's fields, evaluators and change epochs.
///
/// # Examples
///
/// ```
/// use thaw_core::FieldKey;
/// use thaw_engine::State;
/// use thaw_evaluator::PrimaryVariable;
/// use thaw_mesh::{ColumnMesh, MeshSet};
///
/// let meshes = MeshSet::new().with(ColumnMesh::uniform("domain", 4, 0.5).unwrap()).unwrap();
/// let mut state = State::new(meshes);
/// state.register(Box::new(PrimaryVariable::new("pressure"))).unwrap();
/// state.setup().unwrap();
///
/// let p = FieldKey::new("pressure");
/// state.primary_mut(&p).unwrap().put_scalar(101325.0);
/// assert_eq!(state.field(&p).unwrap().norm_inf(), 101325.0);
/// ```
pub struct State {
    pub(crate) meshes: MeshSet,
    pub(crate) store: FieldStore,
    pub(crate) nodes: IndexMap<FieldKey, Node>,
    epoch: Epoch,
    order: Option<EvaluationOrder>,
    stack: Vec<usize>,
    visit: u64,
}

impl State {
    /// Empty state over `meshes`.
    pub fn new(meshes: MeshSet) -> Self {
        Self {
            meshes,
            store: FieldStore::new(),
            nodes: IndexMap::new(),
            epoch: Epoch::ZERO,
            order: None,
            stack: Vec::new(),
            visit: 0,
        }
    }

    /// The meshes fields live on.
    pub fn meshes(&self) -> &MeshSet {
        &self.meshes
    }

    /// Raw field storage, for IO and inspection. Values read here may be
    /// stale; use [`field`](Self::field) to read through the engine.
    pub fn store(&self) -> &FieldStore {
        &self.store
    }

    /// Add an evaluator.
    ///
    /// Fails with [`ThawError::DuplicateOwner`] if another evaluator
    /// already produces the same key, and with a configuration error if
    /// the key carries the tag reserved for derivative fields
    /// ([`DERIVATIVE_TAG_PREFIX`]). Registering invalidates a previous
    /// [`setup`](Self::setup).
    pub fn register(&mut self, evaluator: Box<dyn Evaluator>) -> Result<(), ThawError> {
        let key = evaluator.key().clone();
        if key.is_derivative() {
            return Err(ConfigError::InvalidValue {
                context: evaluator.name().to_string(),
                key: key.to_string(),
                reason: format!(
                    "tags starting with '{DERIVATIVE_TAG_PREFIX}' are reserved for derivative fields"
                ),
            }
            .into());
        }
        if let Some(existing) = self.nodes.get(&key) {
            return Err(ThawError::DuplicateOwner {
                key,
                first: existing.evaluator.name().to_string(),
                second: evaluator.name().to_string(),
            });
        }
        self.nodes.insert(key, Node::new(evaluator));
        self.order = None;
        Ok(())
    }

    /// Run the declaration phase.
    ///
    /// Validates the dependency graph, then declares every output with its
    /// shape, owner and IO flags and checks every dependency against the
    /// shape its reader requires. Errors here are structural: nothing has
    /// been computed and the configuration must be fixed.
    pub fn setup(&mut self) -> Result<(), ThawError> {
        let order = validate_graph(self.nodes.values().map(|n| n.evaluator.as_ref()))?;

        for key in order.keys() {
            let ev = self.nodes[key].evaluator.as_ref();
            let space = ev.output_space(&self.meshes)?;
            self.store.require(key, &space, Claim::Owner(key.to_string()))?;
            self.store.set_io_flags(key, ev.io_flags())?;
            for (dep, dep_space) in ev.dependency_spaces(&self.meshes)? {
                self.store.require(&dep, &dep_space, Claim::Reader)?;
            }
        }

        for i in 0..self.nodes.len() {
            let mut deps: SmallVec<[usize; 4]> = SmallVec::new();
            for dep in self.nodes[i].evaluator.dependencies() {
                let j = self.index_of(dep)?;
                if !deps.contains(&j) {
                    deps.push(j);
                }
            }
            let node = &mut self.nodes[i];
            node.deps = deps;
            node.computed = None;
            node.derivatives.clear();
        }

        debug!(fields = order.len(), "state setup complete");
        self.order = Some(order);
        Ok(())
    }

    /// Whether [`setup`](Self::setup) has run since the last registration.
    pub fn is_setup(&self) -> bool {
        self.order.is_some()
    }

    /// Topological order fixed by [`setup`](Self::setup).
    pub fn evaluation_order(&self) -> Option<&EvaluationOrder> {
        self.order.as_ref()
    }

    /// Keys of all registered evaluators, in registration order.
    pub fn keys(&self) -> impl Iterator<Item = &FieldKey> {
        self.nodes.keys()
    }

    /// Whether an evaluator produces `key`.
    pub fn contains(&self, key: &FieldKey) -> bool {
        self.nodes.contains_key(key)
    }

    /// The evaluator producing `key`.
    pub fn evaluator(&self, key: &FieldKey) -> Result<&dyn Evaluator, ThawError> {
        Ok(self.nodes[self.index_of(key)?].evaluator.as_ref())
    }

    /// Most recent epoch drawn by a primary write.
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Epoch stamped on the stored value of `key`.
    pub fn field_epoch(&self, key: &FieldKey) -> Result<Epoch, ThawError> {
        Ok(self.store.epoch(key)?)
    }

    pub(crate) fn index_of(&self, key: &FieldKey) -> Result<usize, ThawError> {
        self.nodes
            .get_index_of(key)
            .ok_or_else(|| ThawError::NotFound {
                key: format!("field '{key}'"),
            })
    }

    pub(crate) fn require_ready(&self) -> Result<(), ThawError> {
        if self.order.is_some() {
            Ok(())
        } else {
            Err(ThawError::NotReady {
                what: "state (setup has not run since the last registration)".into(),
            })
        }
    }

    // ── Primary writes ─────────────────────────────────────────────

    /// Mutable access to a primary field's data.
    ///
    /// Draws a new epoch immediately, so every field depending on `key`
    /// is stale from this call on. Fails with
    /// [`ThawError::DuplicateOwner`] for a secondary field: only its
    /// evaluator may write it.
    pub fn primary_mut(&mut self, key: &FieldKey) -> Result<&mut CompositeVector, ThawError> {
        self.require_ready()?;
        let node = &self.nodes[self.index_of(key)?];
        if !node.is_primary() {
            return Err(ThawError::DuplicateOwner {
                key: key.clone(),
                first: node.evaluator.name().to_string(),
                second: "external writer".into(),
            });
        }
        self.epoch = self.epoch.next();
        self.store.set_epoch(key, self.epoch)?;
        trace!(key = %key, epoch = %self.epoch, "primary write");
        Ok(self.store.get_mut(key, &key.to_string())?)
    }

    /// Overwrite a primary field with `value`.
    pub fn set_primary(&mut self, key: &FieldKey, value: &CompositeVector) -> Result<(), ThawError> {
        self.primary_mut(key)?.copy_from(value)?;
        Ok(())
    }

    /// Fill every entry of a primary field with `value`.
    pub fn fill_primary(&mut self, key: &FieldKey, value: f64) -> Result<(), ThawError> {
        self.primary_mut(key)?.put_scalar(value);
        Ok(())
    }

    // ── Reads ──────────────────────────────────────────────────────

    /// Bring `key` up to date, returning the epoch stamped on its value.
    pub fn update(&mut self, key: &FieldKey) -> Result<Epoch, ThawError> {
        self.require_ready()?;
        let idx = self.index_of(key)?;
        self.read(idx)
    }

    /// Current value of `key`, recomputing it (and anything it depends
    /// on) if stale.
    pub fn field(&mut self, key: &FieldKey) -> Result<&CompositeVector, ThawError> {
        self.update(key)?;
        Ok(self.store.get(key)?)
    }

    /// Whether `key` has changed since `requester` last asked.
    ///
    /// Brings `key` up to date first. The first request of every
    /// requester reports `true`. For an evaluator that
    /// [forces an initial update](Evaluator::forces_initial_update), the
    /// very first request from anyone also recomputes the field even if
    /// the engine considers it fresh.
    pub fn has_changed(&mut self, key: &FieldKey, requester: &str) -> Result<bool, ThawError> {
        self.require_ready()?;
        let idx = self.index_of(key)?;
        let forced = std::mem::take(&mut self.nodes[idx].force_pending);
        if forced {
            self.nodes[idx].computed = None;
        }
        let stamp = match self.read(idx) {
            Ok(stamp) => stamp,
            Err(e) => {
                self.nodes[idx].force_pending = forced;
                return Err(e);
            }
        };
        let previous = self.nodes[idx].requests.insert(requester.to_string(), stamp);
        Ok(forced || previous != Some(stamp))
    }

    /// Freshness of `key`, without computing anything.
    pub fn status(&self, key: &FieldKey) -> Result<FieldStatus, ThawError> {
        self.require_ready()?;
        let idx = self.index_of(key)?;
        let node = &self.nodes[idx];
        if node.computing {
            return Ok(FieldStatus::Computing);
        }
        if node.is_primary() {
            return Ok(FieldStatus::Fresh);
        }
        let upstream = self.upstream_epoch(idx)?;
        Ok(if node.computed == Some(upstream) {
            FieldStatus::Fresh
        } else {
            FieldStatus::Stale
        })
    }

    fn upstream_epoch(&self, idx: usize) -> Result<Epoch, ThawError> {
        let node = &self.nodes[idx];
        if node.is_primary() {
            return Ok(self.store.epoch(node.key())?);
        }
        node.deps
            .iter()
            .try_fold(Epoch::ZERO, |acc, &dep| Ok(acc.max(self.upstream_epoch(dep)?)))
    }

    /// Top-level read: one new visit generation, then refresh.
    pub(crate) fn read(&mut self, idx: usize) -> Result<Epoch, ThawError> {
        self.visit += 1;
        self.refresh(idx)
    }

    fn refresh(&mut self, idx: usize) -> Result<Epoch, ThawError> {
        let node = &self.nodes[idx];
        if node.computing {
            let start = self.stack.iter().position(|&i| i == idx).unwrap_or(0);
            let mut cycle: Vec<FieldKey> = self.stack[start..]
                .iter()
                .map(|&i| self.nodes[i].key().clone())
                .collect();
            cycle.push(node.key().clone());
            return Err(ThawError::CyclicDependency { cycle });
        }
        if node.is_primary() || node.visited == self.visit {
            return Ok(self.store.epoch(node.key())?);
        }

        self.nodes[idx].computing = true;
        self.stack.push(idx);
        let result = self.refresh_secondary(idx);
        self.stack.pop();
        let node = &mut self.nodes[idx];
        node.computing = false;
        if result.is_ok() {
            node.visited = self.visit;
        }
        result
    }

    fn refresh_secondary(&mut self, idx: usize) -> Result<Epoch, ThawError> {
        let mut upstream = Epoch::ZERO;
        for n in 0..self.nodes[idx].deps.len() {
            let dep = self.nodes[idx].deps[n];
            upstream = upstream.max(self.refresh(dep)?);
        }

        let node = &mut self.nodes[idx];
        if node.computed == Some(upstream) {
            node.metrics.cache_hits += 1;
            trace!(key = %node.key(), epoch = %upstream, "cache hit");
            return Ok(upstream);
        }
        self.recompute(idx, upstream)?;
        Ok(upstream)
    }

    fn recompute(&mut self, idx: usize, upstream: Epoch) -> Result<(), ThawError> {
        let Self {
            nodes,
            store,
            meshes,
            ..
        } = self;
        let ev = nodes[idx].evaluator.as_ref();
        let key = ev.key();
        let _span = debug_span!("evaluate", key = %key, evaluator = ev.name()).entered();

        let mut out = store.checkout(key, &key.to_string())?;
        let started = Instant::now();
        let result = {
            let mut ctx = EvalContext::new(key, ev.dependencies(), store, meshes, &mut out);
            ev.evaluate(&mut ctx)
        }
        .map_err(|e| ThawError::from_eval(key, e));
        let elapsed = started.elapsed().as_micros() as u64;
        store.restore(key, out)?;
        if result.is_ok() {
            store.set_epoch(key, upstream)?;
        }

        let node = &mut nodes[idx];
        node.metrics.evaluations += 1;
        node.metrics.evaluate_us += elapsed;
        match result {
            Ok(()) => {
                node.computed = Some(upstream);
                debug!(epoch = %upstream, elapsed_us = elapsed, "recomputed");
                Ok(())
            }
            Err(e) => {
                node.computed = None;
                debug!(error = %e, "evaluation failed");
                Err(e)
            }
        }
    }

    // ── IO and metrics ─────────────────────────────────────────────

    /// Keys flagged for visualisation, in declaration order.
    pub fn visualized(&self) -> impl Iterator<Item = &FieldKey> {
        self.store.visualized()
    }

    /// Keys flagged for checkpointing, in declaration order.
    pub fn checkpointed(&self) -> impl Iterator<Item = &FieldKey> {
        self.store.checkpointed()
    }

    /// Override the IO flags of a declared field.
    pub fn set_io_flags(&mut self, key: &FieldKey, io: IoFlags) -> Result<(), ThawError> {
        Ok(self.store.set_io_flags(key, io)?)
    }

    /// Counters of the evaluator producing `key`.
    pub fn metrics(&self, key: &FieldKey) -> Result<&EvalMetrics, ThawError> {
        Ok(&self.nodes[self.index_of(key)?].metrics)
    }

    /// Counters summed over every evaluator.
    pub fn total_metrics(&self) -> EvalMetrics {
        let mut total = EvalMetrics::default();
        for node in self.nodes.values() {
            total += &node.metrics;
        }
        total
    }
}

impl std::fmt::Debug for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("State")
            .field("meshes", &self.meshes)
            .field("fields", &self.nodes.keys().collect::<Vec<_>>())
            .field("epoch", &self.epoch)
            .field("ready", &self.order.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thaw_evaluator::PrimaryVariable;
    use thaw_test_utils::fixtures::{Failing, Opaque, Polynomial, WeightedSum};
    use thaw_test_utils::{cells, domain_column};

    fn key(s: &str) -> FieldKey {
        FieldKey::new(s)
    }

    /// `b = a²`, `c = 2b + a`.
    fn chain_state() -> (State, thaw_test_utils::fixtures::CallCounter, thaw_test_utils::fixtures::CallCounter) {
        let mut state = State::new(domain_column(3));
        let b = Polynomial::new("b", "a", &[0.0, 0.0, 1.0]);
        let c = WeightedSum::new("c", ["b", "a"], &[2.0, 1.0]);
        let (bc, cc) = (b.counter(), c.counter());
        state.register(Box::new(PrimaryVariable::new("a"))).unwrap();
        state.register(Box::new(b)).unwrap();
        state.register(Box::new(c)).unwrap();
        state.setup().unwrap();
        (state, bc, cc)
    }

    #[test]
    fn reads_before_setup_are_not_ready() {
        let mut state = State::new(domain_column(1));
        state.register(Box::new(PrimaryVariable::new("a"))).unwrap();
        assert!(matches!(state.field(&key("a")), Err(ThawError::NotReady { .. })));
        state.setup().unwrap();
        assert!(state.field(&key("a")).is_ok());
        state.register(Box::new(Opaque::new("b", ["a"]))).unwrap();
        assert!(matches!(state.update(&key("b")), Err(ThawError::NotReady { .. })));
    }

    #[test]
    fn evaluates_through_the_chain() {
        let (mut state, _, _) = chain_state();
        state.fill_primary(&key("a"), 3.0).unwrap();
        assert_eq!(cells(state.field(&key("c")).unwrap()), &[21.0, 21.0, 21.0]);
    }

    #[test]
    fn at_most_once_per_epoch() {
        let (mut state, b_calls, c_calls) = chain_state();
        state.fill_primary(&key("a"), 1.0).unwrap();
        for _ in 0..5 {
            state.field(&key("c")).unwrap();
            state.field(&key("b")).unwrap();
        }
        assert_eq!(b_calls.evals(), 1);
        assert_eq!(c_calls.evals(), 1);

        state.fill_primary(&key("a"), 2.0).unwrap();
        state.field(&key("c")).unwrap();
        state.field(&key("c")).unwrap();
        assert_eq!(b_calls.evals(), 2);
        assert_eq!(c_calls.evals(), 2);
        assert!(state.metrics(&key("c")).unwrap().cache_hits >= 1);
    }

    #[test]
    fn primary_write_marks_dependents_stale() {
        let (mut state, _, c_calls) = chain_state();
        state.update(&key("c")).unwrap();
        assert_eq!(state.status(&key("b")).unwrap(), FieldStatus::Fresh);
        assert_eq!(state.status(&key("c")).unwrap(), FieldStatus::Fresh);

        state.fill_primary(&key("a"), 4.0).unwrap();
        assert_eq!(state.status(&key("b")).unwrap(), FieldStatus::Stale);
        assert_eq!(state.status(&key("c")).unwrap(), FieldStatus::Stale);
        assert_eq!(state.status(&key("a")).unwrap(), FieldStatus::Fresh);

        state.update(&key("c")).unwrap();
        assert_eq!(c_calls.evals(), 2);
        assert_eq!(state.status(&key("b")).unwrap(), FieldStatus::Fresh);
        assert_eq!(state.field_epoch(&key("c")).unwrap(), state.epoch());
    }

    #[test]
    fn stamp_is_max_of_dependency_epochs() {
        let mut state = State::new(domain_column(1));
        state.register(Box::new(PrimaryVariable::new("x"))).unwrap();
        state.register(Box::new(PrimaryVariable::new("y"))).unwrap();
        state
            .register(Box::new(WeightedSum::new("s", ["x", "y"], &[1.0, 1.0])))
            .unwrap();
        state.setup().unwrap();
        state.fill_primary(&key("x"), 1.0).unwrap();
        state.fill_primary(&key("y"), 1.0).unwrap();
        state.fill_primary(&key("x"), 2.0).unwrap();
        assert_eq!(state.update(&key("s")).unwrap(), Epoch(3));
    }

    #[test]
    fn unknown_key_is_not_found() {
        let (mut state, _, _) = chain_state();
        assert!(matches!(state.field(&key("nope")), Err(ThawError::NotFound { .. })));
        assert!(matches!(state.status(&key("nope")), Err(ThawError::NotFound { .. })));
    }

    #[test]
    fn duplicate_registration_rejected() {
        let mut state = State::new(domain_column(1));
        state.register(Box::new(PrimaryVariable::new("a"))).unwrap();
        match state.register(Box::new(Opaque::new("a", ["b"]))) {
            Err(ThawError::DuplicateOwner { key, first, second }) => {
                assert_eq!(key.name(), "a");
                assert_eq!(first, "primary variable");
                assert_eq!(second, "opaque");
            }
            other => panic!("expected DuplicateOwner, got {other:?}"),
        }
    }

    #[test]
    fn cycle_rejected_before_any_computation() {
        let mut state = State::new(domain_column(1));
        let a = Opaque::new("a", ["b"]);
        let b = Opaque::new("b", ["a"]);
        let (ac, bc) = (a.counter(), b.counter());
        state.register(Box::new(a)).unwrap();
        state.register(Box::new(b)).unwrap();
        match state.setup() {
            Err(ThawError::CyclicDependency { cycle }) => {
                assert_eq!(cycle.first(), cycle.last());
                assert_eq!(cycle.len(), 3);
            }
            other => panic!("expected CyclicDependency, got {other:?}"),
        }
        assert_eq!(ac.evals() + bc.evals(), 0);
        assert!(state.store().is_empty());
    }

    #[test]
    fn secondary_field_is_not_externally_writable() {
        let (mut state, _, _) = chain_state();
        assert!(matches!(
            state.primary_mut(&key("b")),
            Err(ThawError::DuplicateOwner { .. })
        ));
    }

    #[test]
    fn shape_mismatch_detected_at_setup() {
        use thaw_core::EntityKind;
        let meshes = thaw_mesh::MeshSet::new()
            .with(thaw_mesh::ColumnMesh::uniform("domain", 3, 1.0).unwrap())
            .unwrap();
        let mut state = State::new(meshes);
        state
            .register(Box::new(
                PrimaryVariable::new("a").with_components(&[EntityKind::Cell, EntityKind::Face]),
            ))
            .unwrap();
        state.register(Box::new(Opaque::new("b", ["a"]))).unwrap();
        assert!(matches!(state.setup(), Err(ThawError::ShapeMismatch { .. })));
    }

    #[test]
    fn domain_error_leaves_field_stale_and_recoverable() {
        let mut state = State::new(domain_column(2));
        state.register(Box::new(PrimaryVariable::new("x"))).unwrap();
        state.register(Box::new(Failing::new("y", "x", 1.0))).unwrap();
        state.setup().unwrap();
        state.fill_primary(&key("x"), 5.0).unwrap();
        let err = state.field(&key("y")).unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(state.status(&key("y")).unwrap(), FieldStatus::Stale);

        state.fill_primary(&key("x"), 0.5).unwrap();
        assert_eq!(cells(state.field(&key("y")).unwrap()), &[0.5, 0.5]);
    }

    #[test]
    fn per_requester_change_tracking() {
        let (mut state, _, c_calls) = chain_state();
        assert!(state.has_changed(&key("c"), "pc").unwrap());
        assert!(!state.has_changed(&key("c"), "pc").unwrap());
        assert!(state.has_changed(&key("c"), "solver").unwrap());

        state.fill_primary(&key("a"), 1.0).unwrap();
        assert!(state.has_changed(&key("c"), "pc").unwrap());
        assert!(state.has_changed(&key("c"), "solver").unwrap());
        assert!(!state.has_changed(&key("c"), "solver").unwrap());
        assert_eq!(c_calls.evals(), 2);
    }

    #[test]
    fn forced_initial_update_recomputes_once() {
        struct Forced(Opaque);
        impl Evaluator for Forced {
            fn name(&self) -> &str {
                "forced"
            }
            fn key(&self) -> &FieldKey {
                self.0.key()
            }
            fn dependencies(&self) -> &[FieldKey] {
                self.0.dependencies()
            }
            fn forces_initial_update(&self) -> bool {
                true
            }
            fn evaluate(&self, ctx: &mut EvalContext<'_>) -> Result<(), thaw_core::EvalError> {
                self.0.evaluate(ctx)
            }
        }
        let inner = Opaque::new("f", ["a"]);
        let calls = inner.counter();
        let mut state = State::new(domain_column(1));
        state.register(Box::new(PrimaryVariable::new("a"))).unwrap();
        state.register(Box::new(Forced(inner))).unwrap();
        state.setup().unwrap();

        state.update(&key("f")).unwrap();
        assert_eq!(calls.evals(), 1);
        assert!(state.has_changed(&key("f"), "first").unwrap());
        assert_eq!(calls.evals(), 2);
        state.has_changed(&key("f"), "second").unwrap();
        assert!(!state.has_changed(&key("f"), "first").unwrap());
        assert_eq!(calls.evals(), 2);
    }

    #[test]
    fn io_flags_recorded_at_setup() {
        let mut state = State::new(domain_column(1));
        state
            .register(Box::new(PrimaryVariable::new("a").with_io_flags(IoFlags {
                visualize: false,
                checkpoint: true,
            })))
            .unwrap();
        state.register(Box::new(Opaque::new("b", ["a"]))).unwrap();
        state.setup().unwrap();
        assert_eq!(state.visualized().collect::<Vec<_>>(), vec![&key("b")]);
        assert_eq!(state.checkpointed().collect::<Vec<_>>(), vec![&key("a")]);
    }
}
