//! Chain-rule derivative propagation over the evaluator graph.
//!
//! `d(of)/d(wrt)` is the sum over the distinct dependencies `x` of `of`
//! of `∂(of)/∂x ⊙ d(x)/d(wrt)`, entity by entity. Dependencies with no
//! path to `wrt` contribute nothing and are never asked for a local
//! partial, so an evaluator that cannot differentiate only fails a
//! request that actually runs through it.
//!
//! Results are cached per `(of, wrt)` against the epoch stamped on `of`
//! and stored in the field store under [`FieldKey::derivative`].

use std::time::Instant;

use thaw_core::{Epoch, FieldKey, IoFlags, ThawError};
use thaw_evaluator::EvalContext;
use thaw_store::{Claim, CompositeVector};
use tracing::{debug_span, trace};

use crate::state::State;

/// What is known about a derivative's structure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DerivativeStructure {
    /// `d(x)/d(x)`: one everywhere.
    Identity,
    /// No dependency path exists: zero everywhere.
    Zero,
    /// Computed by the chain rule.
    Computed,
}

/// Handle to a derivative field held in the state's store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DerivativeRef {
    key: FieldKey,
    of: FieldKey,
    wrt: FieldKey,
    structure: DerivativeStructure,
    epoch: Epoch,
}

impl DerivativeRef {
    /// Store key of the derivative field.
    pub fn key(&self) -> &FieldKey {
        &self.key
    }

    /// The differentiated field.
    pub fn of(&self) -> &FieldKey {
        &self.of
    }

    /// The variable differentiated against.
    pub fn wrt(&self) -> &FieldKey {
        &self.wrt
    }

    /// Structure of the stored values.
    pub fn structure(&self) -> DerivativeStructure {
        self.structure
    }

    /// Epoch of the values the derivative was taken at.
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Whether the derivative is structurally zero.
    pub fn is_zero(&self) -> bool {
        self.structure == DerivativeStructure::Zero
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct DerivativeCache {
    epoch: Epoch,
    structure: DerivativeStructure,
}

const DERIVATIVE_IO: IoFlags = IoFlags {
    visualize: false,
    checkpoint: false,
};

impl State {
    /// Compute (or fetch from cache) `d(of)/d(wrt)` at the current state.
    ///
    /// Brings `of` up to date first. The result always has `of`'s shape.
    /// With no dependency path from `of` to `wrt` the result is a
    /// zero-filled field with [`DerivativeStructure::Zero`], not an error.
    ///
    /// # Errors
    ///
    /// - [`ThawError::NotFound`] if either key is unknown.
    /// - [`ThawError::DerivativeNotImplemented`] if an evaluator on a path
    ///   from `of` to `wrt` cannot differentiate.
    /// - [`ThawError::ShapeMismatch`] if a chain step links fields of
    ///   different shapes.
    pub fn derivative(&mut self, of: &FieldKey, wrt: &FieldKey) -> Result<DerivativeRef, ThawError> {
        self.require_ready()?;
        let i = self.index_of(of)?;
        let w = self.index_of(wrt)?;
        let epoch = self.read(i)?;
        let structure = self.propagate(i, w)?;
        let key = FieldKey::derivative(of, wrt);
        match structure {
            DerivativeStructure::Identity => self.write_constant(i, &key, 1.0, epoch)?,
            DerivativeStructure::Zero => self.write_constant(i, &key, 0.0, epoch)?,
            DerivativeStructure::Computed => {}
        }
        Ok(DerivativeRef {
            key,
            of: of.clone(),
            wrt: wrt.clone(),
            structure,
            epoch,
        })
    }

    /// Values of `d(of)/d(wrt)`; see [`derivative`](Self::derivative).
    pub fn derivative_field(
        &mut self,
        of: &FieldKey,
        wrt: &FieldKey,
    ) -> Result<&CompositeVector, ThawError> {
        let r = self.derivative(of, wrt)?;
        Ok(self.store.get(r.key())?)
    }

    /// Whether `d(of)/d(wrt)` changed since `requester` last asked.
    ///
    /// The first request of every requester reports `true`.
    pub fn has_derivative_changed(
        &mut self,
        of: &FieldKey,
        wrt: &FieldKey,
        requester: &str,
    ) -> Result<bool, ThawError> {
        let r = self.derivative(of, wrt)?;
        let i = self.index_of(of)?;
        let w = self.index_of(wrt)?;
        let previous = self.nodes[i]
            .derivative_requests
            .insert((w, requester.to_string()), r.epoch);
        Ok(previous != Some(r.epoch))
    }

    /// Structure of `d(nodes[i])/d(nodes[w])`. Every node below `i` must
    /// already be fresh.
    fn propagate(&mut self, i: usize, w: usize) -> Result<DerivativeStructure, ThawError> {
        if i == w {
            return Ok(DerivativeStructure::Identity);
        }
        let epoch = self.store.epoch(self.nodes[i].key())?;
        let node = &mut self.nodes[i];
        if let Some(cached) = node.derivatives.get(&w) {
            if cached.epoch == epoch {
                let structure = cached.structure;
                node.metrics.derivative_cache_hits += 1;
                trace!(key = %node.key(), wrt = w, "derivative cache hit");
                return Ok(structure);
            }
        }

        let structure = if node.is_primary() {
            DerivativeStructure::Zero
        } else {
            self.chain(i, w, epoch)?
        };
        self.nodes[i]
            .derivatives
            .insert(w, DerivativeCache { epoch, structure });
        Ok(structure)
    }

    fn chain(&mut self, i: usize, w: usize, epoch: Epoch) -> Result<DerivativeStructure, ThawError> {
        let of = self.nodes[i].key().clone();
        let wrt = self.nodes[w].key().clone();
        let mut total: Option<CompositeVector> = None;

        for n in 0..self.nodes[i].deps.len() {
            let j = self.nodes[i].deps[n];
            let inner = self.propagate(j, w)?;
            if inner == DerivativeStructure::Zero {
                continue;
            }

            // A refused partial takes precedence over a shape mismatch.
            let partial = self.local_partial(i, j)?;
            let dep = self.nodes[j].key().clone();
            let dep_space = self.store.space(&dep)?;
            if partial.space() != dep_space {
                return Err(ThawError::ShapeMismatch {
                    key: dep.to_string(),
                    expected: partial.space().to_string(),
                    found: dep_space.to_string(),
                });
            }
            let sum = total.get_or_insert_with(|| CompositeVector::new(partial.space().clone()));
            match inner {
                DerivativeStructure::Identity => sum.axpy(1.0, &partial)?,
                _ => {
                    let inner_value = self.store.get(&FieldKey::derivative(&dep, &wrt))?;
                    sum.add_product(&partial, inner_value)?;
                }
            }
        }

        let Some(value) = total else {
            return Ok(DerivativeStructure::Zero);
        };
        let key = FieldKey::derivative(&of, &wrt);
        let owner = of.to_string();
        self.store
            .require(&key, value.space(), Claim::Owner(owner.clone()))?;
        self.store.set_io_flags(&key, DERIVATIVE_IO)?;
        self.store.get_mut(&key, &owner)?.copy_from(&value)?;
        self.store.set_epoch(&key, epoch)?;
        Ok(DerivativeStructure::Computed)
    }

    /// `∂(nodes[i])/∂(nodes[j])` from the evaluator's analytic partial.
    fn local_partial(&mut self, i: usize, j: usize) -> Result<CompositeVector, ThawError> {
        let State {
            nodes,
            store,
            meshes,
            ..
        } = self;
        let ev = nodes[i].evaluator.as_ref();
        let key = ev.key();
        let wrt = nodes[j].key();
        let _span = debug_span!("partial_derivative", key = %key, wrt = %wrt).entered();

        let mut out = CompositeVector::new(store.space(key)?.clone());
        let started = Instant::now();
        let result = {
            let mut ctx = EvalContext::new(key, ev.dependencies(), store, meshes, &mut out);
            ev.partial_derivative(&mut ctx, wrt)
        }
        .map_err(|e| ThawError::from_eval(key, e));
        let elapsed = started.elapsed().as_micros() as u64;

        let metrics = &mut nodes[i].metrics;
        metrics.derivative_evaluations += 1;
        metrics.derivative_us += elapsed;
        result.map(|()| out)
    }

    fn write_constant(
        &mut self,
        i: usize,
        key: &FieldKey,
        value: f64,
        epoch: Epoch,
    ) -> Result<(), ThawError> {
        let of = self.nodes[i].key();
        let owner = of.to_string();
        let space = self.store.space(of)?.clone();
        self.store.require(key, &space, Claim::Owner(owner.clone()))?;
        self.store.set_io_flags(key, DERIVATIVE_IO)?;
        self.store.get_mut(key, &owner)?.put_scalar(value);
        self.store.set_epoch(key, epoch)?;
        Ok(())
    }
}
