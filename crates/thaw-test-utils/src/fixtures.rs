//! Reusable evaluator fixtures.
//!
//! Standard evaluators for engine and preconditioner testing:
//!
//! - [`Polynomial`]: `Σ a_k x^k` of one dependency, analytic derivative.
//! - [`WeightedSum`]: `Σ w_i x_i`, analytic derivatives.
//! - [`Product`]: `Π x_i`, analytic derivatives.
//! - [`Opaque`]: sums its inputs but refuses to differentiate.
//! - [`Failing`]: reports a domain error above a threshold.
//!
//! Every fixture counts its `evaluate` and `partial_derivative` calls in
//! a shared [`CallCounter`] so tests can keep a handle after boxing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use thaw_core::{EvalError, FieldKey};
use thaw_evaluator::{EvalContext, Evaluator};

/// Shared evaluation and derivative call counters.
#[derive(Clone, Debug, Default)]
pub struct CallCounter {
    evals: Arc<AtomicUsize>,
    derivs: Arc<AtomicUsize>,
}

impl CallCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `evaluate` calls so far.
    pub fn evals(&self) -> usize {
        self.evals.load(Ordering::SeqCst)
    }

    /// Number of `partial_derivative` calls so far.
    pub fn derivs(&self) -> usize {
        self.derivs.load(Ordering::SeqCst)
    }

    fn eval(&self) {
        self.evals.fetch_add(1, Ordering::SeqCst);
    }

    fn deriv(&self) {
        self.derivs.fetch_add(1, Ordering::SeqCst);
    }
}

fn keys<I, K>(deps: I) -> Vec<FieldKey>
where
    I: IntoIterator<Item = K>,
    K: Into<FieldKey>,
{
    deps.into_iter().map(Into::into).collect()
}

/// `y = Σ_k a_k x^k` of a single dependency `x`.
pub struct Polynomial {
    key: FieldKey,
    deps: Vec<FieldKey>,
    coeffs: Vec<f64>,
    calls: CallCounter,
}

impl Polynomial {
    /// `coeffs[k]` multiplies `x^k`.
    pub fn new(key: impl Into<FieldKey>, x: impl Into<FieldKey>, coeffs: &[f64]) -> Self {
        Self {
            key: key.into(),
            deps: vec![x.into()],
            coeffs: coeffs.to_vec(),
            calls: CallCounter::new(),
        }
    }

    pub fn counter(&self) -> CallCounter {
        self.calls.clone()
    }

    fn value(&self, x: f64) -> f64 {
        self.coeffs.iter().rev().fold(0.0, |acc, a| acc * x + a)
    }

    fn slope(&self, x: f64) -> f64 {
        self.coeffs
            .iter()
            .enumerate()
            .skip(1)
            .rev()
            .fold(0.0, |acc, (k, a)| acc * x + k as f64 * a)
    }
}

impl Evaluator for Polynomial {
    fn name(&self) -> &str {
        "polynomial"
    }

    fn key(&self) -> &FieldKey {
        &self.key
    }

    fn dependencies(&self) -> &[FieldKey] {
        &self.deps
    }

    fn evaluate(&self, ctx: &mut EvalContext<'_>) -> Result<(), EvalError> {
        self.calls.eval();
        ctx.map_pointwise(&self.deps, |_, x| Ok(self.value(x[0])))
    }

    fn partial_derivative(
        &self,
        ctx: &mut EvalContext<'_>,
        _wrt: &FieldKey,
    ) -> Result<(), EvalError> {
        self.calls.deriv();
        ctx.map_pointwise(&self.deps, |_, x| Ok(self.slope(x[0])))
    }
}

/// `y = Σ_i w_i x_i`.
pub struct WeightedSum {
    key: FieldKey,
    deps: Vec<FieldKey>,
    weights: Vec<f64>,
    calls: CallCounter,
}

impl WeightedSum {
    pub fn new<I, K>(key: impl Into<FieldKey>, deps: I, weights: &[f64]) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<FieldKey>,
    {
        let deps = keys(deps);
        assert_eq!(deps.len(), weights.len(), "one weight per dependency");
        Self {
            key: key.into(),
            deps,
            weights: weights.to_vec(),
            calls: CallCounter::new(),
        }
    }

    pub fn counter(&self) -> CallCounter {
        self.calls.clone()
    }
}

impl Evaluator for WeightedSum {
    fn name(&self) -> &str {
        "weighted sum"
    }

    fn key(&self) -> &FieldKey {
        &self.key
    }

    fn dependencies(&self) -> &[FieldKey] {
        &self.deps
    }

    fn evaluate(&self, ctx: &mut EvalContext<'_>) -> Result<(), EvalError> {
        self.calls.eval();
        ctx.map_pointwise(&self.deps, |_, x| {
            Ok(x.iter().zip(&self.weights).map(|(x, w)| x * w).sum())
        })
    }

    fn partial_derivative(
        &self,
        ctx: &mut EvalContext<'_>,
        wrt: &FieldKey,
    ) -> Result<(), EvalError> {
        self.calls.deriv();
        let w: f64 = self
            .deps
            .iter()
            .zip(&self.weights)
            .filter(|(d, _)| *d == wrt)
            .map(|(_, w)| w)
            .sum();
        ctx.output().put_scalar(w);
        Ok(())
    }
}

/// `y = Π_i x_i`.
pub struct Product {
    key: FieldKey,
    deps: Vec<FieldKey>,
    calls: CallCounter,
}

impl Product {
    pub fn new<I, K>(key: impl Into<FieldKey>, deps: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<FieldKey>,
    {
        Self {
            key: key.into(),
            deps: keys(deps),
            calls: CallCounter::new(),
        }
    }

    pub fn counter(&self) -> CallCounter {
        self.calls.clone()
    }
}

impl Evaluator for Product {
    fn name(&self) -> &str {
        "product"
    }

    fn key(&self) -> &FieldKey {
        &self.key
    }

    fn dependencies(&self) -> &[FieldKey] {
        &self.deps
    }

    fn evaluate(&self, ctx: &mut EvalContext<'_>) -> Result<(), EvalError> {
        self.calls.eval();
        ctx.map_pointwise(&self.deps, |_, x| Ok(x.iter().product()))
    }

    fn partial_derivative(
        &self,
        ctx: &mut EvalContext<'_>,
        wrt: &FieldKey,
    ) -> Result<(), EvalError> {
        self.calls.deriv();
        ctx.map_pointwise(&self.deps, |_, x| {
            let mut total = 0.0;
            for (k, d) in self.deps.iter().enumerate() {
                if d == wrt {
                    total += x
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| *i != k)
                        .map(|(_, v)| v)
                        .product::<f64>();
                }
            }
            Ok(total)
        })
    }
}

/// Sums its inputs and refuses every derivative request.
pub struct Opaque {
    key: FieldKey,
    deps: Vec<FieldKey>,
    calls: CallCounter,
}

impl Opaque {
    pub fn new<I, K>(key: impl Into<FieldKey>, deps: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<FieldKey>,
    {
        Self {
            key: key.into(),
            deps: keys(deps),
            calls: CallCounter::new(),
        }
    }

    pub fn counter(&self) -> CallCounter {
        self.calls.clone()
    }
}

impl Evaluator for Opaque {
    fn name(&self) -> &str {
        "opaque"
    }

    fn key(&self) -> &FieldKey {
        &self.key
    }

    fn dependencies(&self) -> &[FieldKey] {
        &self.deps
    }

    fn evaluate(&self, ctx: &mut EvalContext<'_>) -> Result<(), EvalError> {
        self.calls.eval();
        ctx.map_pointwise(&self.deps, |_, x| Ok(x.iter().sum()))
    }
}

/// Copies its input, failing with a domain error on any entry above
/// `threshold`.
pub struct Failing {
    key: FieldKey,
    deps: Vec<FieldKey>,
    threshold: f64,
    calls: CallCounter,
}

impl Failing {
    pub fn new(key: impl Into<FieldKey>, x: impl Into<FieldKey>, threshold: f64) -> Self {
        Self {
            key: key.into(),
            deps: vec![x.into()],
            threshold,
            calls: CallCounter::new(),
        }
    }

    pub fn counter(&self) -> CallCounter {
        self.calls.clone()
    }
}

impl Evaluator for Failing {
    fn name(&self) -> &str {
        "failing"
    }

    fn key(&self) -> &FieldKey {
        &self.key
    }

    fn dependencies(&self) -> &[FieldKey] {
        &self.deps
    }

    fn evaluate(&self, ctx: &mut EvalContext<'_>) -> Result<(), EvalError> {
        self.calls.eval();
        let threshold = self.threshold;
        ctx.map_pointwise(&self.deps, |i, x| {
            if x[0] > threshold {
                Err(EvalError::Domain {
                    entity: Some(i),
                    reason: format!("{} exceeds {threshold}", x[0]),
                })
            } else {
                Ok(x[0])
            }
        })
    }
}
