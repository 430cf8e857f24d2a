//! Forward-backward (BCJR) decoder in the log domain.
//!
//! For a block of `K` steps the decoder computes
//!
//! ```text
//! alpha[k][s]   = C_{(s', i) -> s} ( alpha[k-1][s'] + G[k-1][OS(s', i)] )
//! beta[k][s]    = C_{i}            ( beta[k+1][NS(s, i)] + G[k][OS(s, i)] )
//! app[k][s][i]  = alpha[k][s] + G[k][OS(s, i)] + beta[k+1][NS(s, i)]
//! ```
//!
//! where `C` is `max*` for exact log-MAP decoding and `max` for the max-log
//! approximation. Branch metrics `G` are log-likelihoods: larger means more
//! likely. The posteriors equal the branch log a-posteriori probabilities up
//! to an additive constant per step.

use crate::max_star::{Combine, MaxLog, MaxStar};
use crate::metrics::BranchMetrics;
use crate::trellis::Trellis;
use crate::{DecodeError, Result};
use core::fmt;
use core::marker::PhantomData;
use log::{debug, trace};

/// Selects the combine operation of a BCJR run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BcjrMode {
    /// Exact log-MAP recursion using `max*`.
    Exact,
    /// Max-log approximation using plain `max`.
    MaxLog,
}

impl BcjrMode {
    /// Reduces log-domain values with this mode's combine operation.
    ///
    /// Used by the LLR layer so that posteriors are marginalized with the
    /// same operation that produced them.
    pub fn combine_all(self, values: &[f64]) -> f64 {
        match self {
            BcjrMode::Exact => MaxStar::combine_all(values),
            BcjrMode::MaxLog => MaxLog::combine_all(values),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BcjrMode::Exact => MaxStar::NAME,
            BcjrMode::MaxLog => MaxLog::NAME,
        }
    }
}

impl fmt::Display for BcjrMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Rescaling applied to each freshly computed alpha/beta row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Normalization {
    /// Subtract the combine of the row from every entry, so the row combines
    /// to zero. Prevents drift to very large or very small values on long
    /// blocks.
    #[default]
    PerStep,
    /// Keep raw accumulated values.
    None,
}

/// `(K + 1) x S` table of log-domain state metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct StateMetrics {
    rows: usize,
    states: usize,
    values: Vec<f64>,
}

impl StateMetrics {
    fn filled(rows: usize, states: usize, value: f64) -> Self {
        Self {
            rows,
            states,
            values: vec![value; rows * states],
        }
    }

    /// Number of rows (`K + 1`).
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn states(&self) -> usize {
        self.states
    }

    /// Metrics of every state at time index `k`.
    #[inline(always)]
    pub fn row(&self, k: usize) -> &[f64] {
        &self.values[k * self.states..(k + 1) * self.states]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }
}

/// `K x S x I` branch log a-posteriori values.
///
/// Value `(k, s, i)` lives at `(k * S + s) * I + i` in the flat layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Posteriors {
    steps: usize,
    states: usize,
    inputs: usize,
    values: Vec<f64>,
}

impl Posteriors {
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn states(&self) -> usize {
        self.states
    }

    pub fn inputs(&self) -> usize {
        self.inputs
    }

    /// Posterior of the branch leaving `state` on `input` at step `k`.
    #[inline(always)]
    pub fn get(&self, k: usize, state: usize, input: usize) -> f64 {
        self.values[(k * self.states + state) * self.inputs + input]
    }

    /// All `S x I` posteriors of step `k`, state-major.
    pub fn step(&self, k: usize) -> &[f64] {
        let width = self.states * self.inputs;
        &self.values[k * width..(k + 1) * width]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.values
    }
}

/// Log-domain forward-backward engine.
///
/// The combine operation is fixed by the type parameter, so the forward
/// recursion, the backward recursion and any normalization of one decoder
/// always use the same operation. Use [`bcjr_decode`] to select it at
/// runtime.
#[derive(Debug, Clone, Copy)]
pub struct BcjrDecoder<C: Combine> {
    normalization: Normalization,
    _combine: PhantomData<C>,
}

impl<C: Combine> Default for BcjrDecoder<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Combine> BcjrDecoder<C> {
    /// Creates a decoder with per-step normalization.
    pub fn new() -> Self {
        Self::with_normalization(Normalization::PerStep)
    }

    pub fn with_normalization(normalization: Normalization) -> Self {
        Self {
            normalization,
            _combine: PhantomData,
        }
    }

    /// Computes the forward metrics `alpha`.
    ///
    /// # Arguments
    ///
    /// * `trellis` - Trellis description
    /// * `a0` - Log initial state distribution (length S)
    /// * `metrics` - `K * O` branch log-likelihoods
    ///
    /// # Returns
    ///
    /// The `(K + 1) x S` forward table, or `InvalidInput` on a length mismatch.
    pub fn forward_metrics(
        &self,
        trellis: &Trellis,
        a0: &[f64],
        metrics: &[f64],
    ) -> Result<StateMetrics> {
        check_distribution("A0", a0, trellis.states())?;
        let bm = BranchMetrics::new(metrics, trellis.outputs())?;
        Ok(self.forward(trellis, a0, &bm))
    }

    /// Computes the backward metrics `beta`.
    ///
    /// # Arguments
    ///
    /// * `trellis` - Trellis description
    /// * `bk` - Log final state distribution (length S)
    /// * `metrics` - `K * O` branch log-likelihoods
    ///
    /// # Returns
    ///
    /// The `(K + 1) x S` backward table, or `InvalidInput` on a length mismatch.
    pub fn backward_metrics(
        &self,
        trellis: &Trellis,
        bk: &[f64],
        metrics: &[f64],
    ) -> Result<StateMetrics> {
        check_distribution("BK", bk, trellis.states())?;
        let bm = BranchMetrics::new(metrics, trellis.outputs())?;
        Ok(self.backward(trellis, bk, &bm))
    }

    /// Combines forward and backward tables into branch posteriors.
    ///
    /// Fails with `InvalidInput` if the tables do not cover `K + 1` rows of
    /// `S` states for the given metric block.
    pub fn posteriors(
        &self,
        trellis: &Trellis,
        alpha: &StateMetrics,
        beta: &StateMetrics,
        metrics: &[f64],
    ) -> Result<Posteriors> {
        let bm = BranchMetrics::new(metrics, trellis.outputs())?;
        for (name, table) in [("alpha", alpha), ("beta", beta)] {
            if table.rows() != bm.steps() + 1 || table.states() != trellis.states() {
                return Err(DecodeError::InvalidInput(format!(
                    "{name} table is {}x{}, expected {}x{}",
                    table.rows(),
                    table.states(),
                    bm.steps() + 1,
                    trellis.states()
                )));
            }
        }
        Ok(combine_app(trellis, alpha, beta, &bm))
    }

    /// Runs the full forward-backward pass on one block.
    ///
    /// # Arguments
    ///
    /// * `trellis` - Trellis description
    /// * `a0` - Log initial state distribution (length S)
    /// * `bk` - Log final state distribution (length S)
    /// * `metrics` - `K * O` branch log-likelihoods
    ///
    /// # Returns
    ///
    /// The `K x S x I` posteriors. An empty block yields empty posteriors.
    pub fn decode(
        &self,
        trellis: &Trellis,
        a0: &[f64],
        bk: &[f64],
        metrics: &[f64],
    ) -> Result<Posteriors> {
        check_distribution("A0", a0, trellis.states())?;
        check_distribution("BK", bk, trellis.states())?;
        let bm = BranchMetrics::new(metrics, trellis.outputs())?;

        let alpha = self.forward(trellis, a0, &bm);
        let beta = self.backward(trellis, bk, &bm);
        trace!("{}: {} steps decoded", C::NAME, bm.steps());

        Ok(combine_app(trellis, &alpha, &beta, &bm))
    }

    fn forward(&self, trellis: &Trellis, a0: &[f64], bm: &BranchMetrics<'_>) -> StateMetrics {
        let num_states = trellis.states();
        let mut alpha = StateMetrics::filled(bm.steps() + 1, num_states, C::IDENTITY);
        alpha.values[..num_states].copy_from_slice(a0);

        for (k, row) in bm.rows().enumerate() {
            let (done, rest) = alpha.values.split_at_mut((k + 1) * num_states);
            let prev = &done[k * num_states..];
            let curr = &mut rest[..num_states];

            for (s, slot) in curr.iter_mut().enumerate() {
                *slot = trellis.predecessors(s).iter().fold(C::IDENTITY, |acc, b| {
                    C::combine(acc, prev[b.state] + row[trellis.output_label(b.state, b.input)])
                });
            }
            self.normalize(curr, "alpha", k + 1);
        }
        alpha
    }

    fn backward(&self, trellis: &Trellis, bk: &[f64], bm: &BranchMetrics<'_>) -> StateMetrics {
        let num_states = trellis.states();
        let num_inputs = trellis.inputs();
        let steps = bm.steps();
        let mut beta = StateMetrics::filled(steps + 1, num_states, C::IDENTITY);
        beta.values[steps * num_states..].copy_from_slice(bk);

        for k in (0..steps).rev() {
            let row = bm.row(k);
            let (head, tail) = beta.values.split_at_mut((k + 1) * num_states);
            let next = &tail[..num_states];
            let curr = &mut head[k * num_states..];

            for (s, slot) in curr.iter_mut().enumerate() {
                *slot = (0..num_inputs).fold(C::IDENTITY, |acc, i| {
                    C::combine(
                        acc,
                        next[trellis.next_state(s, i)] + row[trellis.output_label(s, i)],
                    )
                });
            }
            self.normalize(curr, "beta", k);
        }
        beta
    }

    fn normalize(&self, row: &mut [f64], which: &str, k: usize) {
        let norm = C::combine_all(row);
        if norm == f64::NEG_INFINITY {
            debug!("{}: {which}[{k}] is degenerate (every state impossible)", C::NAME);
            return;
        }
        if self.normalization == Normalization::PerStep && norm.is_finite() {
            row.iter_mut().for_each(|v| *v -= norm);
        }
    }
}

fn combine_app(
    trellis: &Trellis,
    alpha: &StateMetrics,
    beta: &StateMetrics,
    bm: &BranchMetrics<'_>,
) -> Posteriors {
    let num_states = trellis.states();
    let num_inputs = trellis.inputs();
    let mut values = Vec::with_capacity(bm.steps() * num_states * num_inputs);

    for (k, row) in bm.rows().enumerate() {
        let a = alpha.row(k);
        let b = beta.row(k + 1);
        for (s, &a_s) in a.iter().enumerate() {
            for i in 0..num_inputs {
                values.push(a_s + row[trellis.output_label(s, i)] + b[trellis.next_state(s, i)]);
            }
        }
    }

    Posteriors {
        steps: bm.steps(),
        states: num_states,
        inputs: num_inputs,
        values,
    }
}

/// Runs a BCJR decode with the combine operation selected by `mode`.
///
/// # Arguments
///
/// * `trellis` - Trellis description
/// * `mode` - `Exact` (max*) or `MaxLog` (max)
/// * `a0` - Log initial state distribution (length S)
/// * `bk` - Log final state distribution (length S)
/// * `metrics` - `K * O` branch log-likelihoods, larger is more likely
///
/// # Returns
///
/// `K x S x I` branch posteriors, or `InvalidInput` if the metric length is
/// not a multiple of O or a distribution does not have S entries.
pub fn bcjr_decode(
    trellis: &Trellis,
    mode: BcjrMode,
    a0: &[f64],
    bk: &[f64],
    metrics: &[f64],
) -> Result<Posteriors> {
    match mode {
        BcjrMode::Exact => BcjrDecoder::<MaxStar>::new().decode(trellis, a0, bk, metrics),
        BcjrMode::MaxLog => BcjrDecoder::<MaxLog>::new().decode(trellis, a0, bk, metrics),
    }
}

/// Builds a log state distribution for `A0` or `BK`.
///
/// With `known = None` every state gets `ln(1 / S)`; otherwise the known
/// state gets `0` and every other state `-inf`.
pub fn state_prior(states: usize, known: Option<usize>) -> Result<Vec<f64>> {
    if states == 0 {
        return Err(DecodeError::InvalidInput("state count is zero".into()));
    }
    match known {
        None => Ok(vec![-(states as f64).ln(); states]),
        Some(s) if s < states => {
            let mut prior = vec![f64::NEG_INFINITY; states];
            prior[s] = 0.0;
            Ok(prior)
        }
        Some(s) => Err(DecodeError::InvalidInput(format!(
            "known state {s} is outside [0, {states})"
        ))),
    }
}

fn check_distribution(name: &str, values: &[f64], states: usize) -> Result<()> {
    if values.len() != states {
        return Err(DecodeError::InvalidInput(format!(
            "{name} has {} entries, expected S = {}",
            values.len(),
            states
        )));
    }
    Ok(())
}
