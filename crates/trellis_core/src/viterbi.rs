//! Viterbi maximum-likelihood sequence decoder.
//!
//! Classical add-compare-select recursion over the trellis followed by a
//! traceback, as described by Forney (1973). Branch metrics are costs: the
//! decoder returns the input sequence whose path accumulates the smallest
//! total metric, which is the maximum-likelihood sequence when the metrics
//! are squared Euclidean distances on an AWGN channel.

use crate::metrics::BranchMetrics;
use crate::trellis::Trellis;
use crate::{DecodeError, Result};
use log::{debug, trace};

/// Reusable Viterbi engine.
///
/// Owns the rolling path-metric rows and the `K x S` traceback table so
/// that repeated calls from the same owner (e.g. one decoder per worker
/// thread) do not reallocate. The buffers are fully reset on every call, so
/// no information flows from one block to the next.
#[derive(Debug, Default)]
pub struct ViterbiDecoder {
    /// Path metrics after the previous step, one per state.
    prev: Vec<f64>,

    /// Path metrics being computed for the current step.
    curr: Vec<f64>,

    /// Winning predecessor of each state at each step.
    ///
    /// Stored as an index into `Trellis::predecessors(state)`, row-major by
    /// time step: `trace[k * S + s]`.
    trace: Vec<usize>,
}

impl ViterbiDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes one block into `out`.
    ///
    /// Runs the forward add-compare-select pass over `steps` rows of branch
    /// metrics, selects the terminal state, and traces back the surviving
    /// path. Ties are resolved in favour of the first predecessor in
    /// `Trellis::predecessors` order, and of the lowest-numbered state when
    /// choosing an unconstrained terminal state.
    ///
    /// # Arguments
    ///
    /// * `trellis` - Trellis shared by all blocks
    /// * `steps` - Block length K
    /// * `start` - Known initial state, or `None` if every state is equally likely
    /// * `end` - Known final state, or `None` to pick the best terminal state
    /// * `metrics` - `K * O` branch costs, row-major by time step
    /// * `out` - Receives the K decoded input symbols (cleared first)
    ///
    /// # Returns
    ///
    /// Ok(()) on success, or `InvalidInput` if the metric length is not
    /// `K * O`, a forced state is out of range, or the forced end state
    /// cannot be entered.
    pub fn decode_into(
        &mut self,
        trellis: &Trellis,
        steps: usize,
        start: Option<usize>,
        end: Option<usize>,
        metrics: &[f64],
        out: &mut Vec<usize>,
    ) -> Result<()> {
        out.clear();

        let num_states = trellis.states();
        check_state("start", start, num_states)?;
        check_state("end", end, num_states)?;
        let bm = BranchMetrics::with_steps(metrics, trellis.outputs(), steps)?;

        self.prev.clear();
        if steps == 0 {
            return Ok(());
        }

        match start {
            Some(s0) => {
                self.prev.resize(num_states, f64::INFINITY);
                self.prev[s0] = 0.0;
            }
            None => self.prev.resize(num_states, 0.0),
        }
        self.curr.clear();
        self.curr.resize(num_states, f64::INFINITY);
        self.trace.clear();
        self.trace.resize(steps * num_states, 0);

        for (k, row) in bm.rows().enumerate() {
            let trace_k = &mut self.trace[k * num_states..(k + 1) * num_states];

            for (s, (metric, slot)) in self.curr.iter_mut().zip(trace_k.iter_mut()).enumerate() {
                let mut best = f64::INFINITY;
                let mut best_idx = 0;

                for (idx, branch) in trellis.predecessors(s).iter().enumerate() {
                    let candidate =
                        self.prev[branch.state] + row[trellis.output_label(branch.state, branch.input)];
                    if idx == 0 || candidate < best {
                        best = candidate;
                        best_idx = idx;
                    }
                }

                *metric = best;
                *slot = best_idx;
            }

            // Keep path metrics bounded on long blocks.
            let min_metric = self.curr.iter().copied().fold(f64::INFINITY, f64::min);
            if min_metric.is_finite() {
                self.curr.iter_mut().for_each(|m| *m -= min_metric);
            }

            core::mem::swap(&mut self.prev, &mut self.curr);
        }

        let mut state = match end {
            Some(sk) => sk,
            None => argmin(&self.prev),
        };
        if !self.prev[state].is_finite() {
            debug!("viterbi: terminal state {state} has a non-finite path metric");
        }
        trace!("viterbi: {} steps, traceback from state {}", steps, state);

        out.resize(steps, 0);
        for k in (0..steps).rev() {
            let idx = self.trace[k * num_states + state];
            let branch = trellis.predecessors(state).get(idx).ok_or_else(|| {
                DecodeError::InvalidInput(format!(
                    "state {state} has no incoming transitions and cannot terminate step {}",
                    k + 1
                ))
            })?;
            out[k] = branch.input;
            state = branch.state;
        }

        Ok(())
    }

    /// Normalized path metrics of every state after the last decoded step.
    ///
    /// The smallest finite metric is zero. Empty before the first decode and
    /// after decoding an empty block.
    pub fn final_metrics(&self) -> &[f64] {
        &self.prev
    }
}

/// Decodes one block with a fresh engine.
///
/// Convenience wrapper around [`ViterbiDecoder::decode_into`] for callers
/// that decode a single block.
///
/// A forced end state that has incoming branches but cannot be reached from
/// the forced start state within `steps` steps is not an error: its path
/// metric is `+inf` and the traceback still follows the recorded first
/// predecessors, so the returned sequence does not start from `start`. Check
/// [`ViterbiDecoder::final_metrics`] for a finite metric at the end state when
/// that distinction matters.
///
/// # Arguments
///
/// * `trellis` - Trellis description
/// * `steps` - Block length K
/// * `start` - Known initial state, or `None` when unconstrained
/// * `end` - Known final state, or `None` when unconstrained
/// * `metrics` - `K * O` branch costs
///
/// # Returns
///
/// The K decoded input symbols.
pub fn viterbi_decode(
    trellis: &Trellis,
    steps: usize,
    start: Option<usize>,
    end: Option<usize>,
    metrics: &[f64],
) -> Result<Vec<usize>> {
    let mut decoder = ViterbiDecoder::new();
    let mut out = Vec::with_capacity(steps);
    decoder.decode_into(trellis, steps, start, end, metrics, &mut out)?;
    Ok(out)
}

fn check_state(which: &str, state: Option<usize>, num_states: usize) -> Result<()> {
    match state {
        Some(s) if s >= num_states => Err(DecodeError::InvalidInput(format!(
            "forced {which} state {s} is outside [0, {num_states})"
        ))),
        _ => Ok(()),
    }
}

/// Index of the first minimum.
fn argmin(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v < values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_common::presets;

    /// Squared distance between the 2-bit codewords of every label and `sent`.
    fn row_for(sent: usize) -> [f64; 4] {
        let mut row = [0.0; 4];
        for (o, m) in row.iter_mut().enumerate() {
            *m = ((o ^ sent) as u32).count_ones() as f64;
        }
        row
    }

    fn encode(t: &Trellis, start: usize, msg: &[usize]) -> Vec<usize> {
        let mut s = start;
        msg.iter()
            .map(|&u| {
                let label = t.output_label(s, u);
                s = t.next_state(s, u);
                label
            })
            .collect()
    }

    fn metrics_for(labels: &[usize]) -> Vec<f64> {
        labels.iter().flat_map(|&l| row_for(l)).collect()
    }

    #[test]
    fn cc75_reference_message() {
        let t = Trellis::from_preset(&presets::CC75).unwrap();
        let labels = encode(&t, 0, &[1, 0, 1, 1]);
        assert_eq!(labels, vec![3, 1, 0, 2]);

        let bm = metrics_for(&labels);
        assert_eq!(viterbi_decode(&t, 4, Some(0), None, &bm).unwrap(), vec![1, 0, 1, 1]);
        assert_eq!(viterbi_decode(&t, 4, None, None, &bm).unwrap(), vec![1, 0, 1, 1]);
        assert_eq!(viterbi_decode(&t, 4, Some(0), Some(3), &bm).unwrap(), vec![1, 0, 1, 1]);
    }

    #[test]
    fn corrects_a_single_channel_error() {
        let t = Trellis::from_preset(&presets::CC75).unwrap();
        let msg = [1, 1, 0, 1, 0, 0, 1, 0, 0, 0];
        let mut labels = encode(&t, 0, &msg);
        labels[3] ^= 0b01;
        let bm = metrics_for(&labels);
        assert_eq!(viterbi_decode(&t, msg.len(), Some(0), Some(0), &bm).unwrap(), msg);
    }

    #[test]
    fn empty_block_decodes_to_nothing() {
        let t = Trellis::from_preset(&presets::CC75).unwrap();
        assert!(viterbi_decode(&t, 0, None, None, &[]).unwrap().is_empty());
        assert!(viterbi_decode(&t, 0, Some(1), Some(2), &[]).unwrap().is_empty());
    }

    #[test]
    fn metric_length_must_match_block() {
        let t = Trellis::from_preset(&presets::CC75).unwrap();
        let err = viterbi_decode(&t, 2, None, None, &[0.0; 7]).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidInput(_)));
        let err = viterbi_decode(&t, 1, None, None, &[0.0; 8]).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidInput(_)));
        let err = viterbi_decode(&t, 0, None, None, &[0.0; 4]).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidInput(_)));
    }

    #[test]
    fn forced_states_must_be_in_range() {
        let t = Trellis::from_preset(&presets::CC75).unwrap();
        let bm = [0.0; 4];
        assert!(viterbi_decode(&t, 1, Some(4), None, &bm).is_err());
        assert!(viterbi_decode(&t, 1, None, Some(9), &bm).is_err());
    }

    #[test]
    fn unenterable_end_state_is_rejected() {
        let t = Trellis::new(1, 2, 1, vec![0, 0], vec![0, 0]).unwrap();
        let err = viterbi_decode(&t, 1, None, Some(1), &[0.0]).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidInput(_)));
    }

    #[test]
    fn engine_is_reusable_across_blocks() {
        let t = Trellis::from_preset(&presets::CC75).unwrap();
        let mut dec = ViterbiDecoder::new();
        let mut out = Vec::new();

        for msg in [vec![0, 1, 1], vec![1, 1, 1, 1, 0, 1], vec![]] {
            let bm = metrics_for(&encode(&t, 0, &msg));
            dec.decode_into(&t, msg.len(), Some(0), None, &bm, &mut out).unwrap();
            assert_eq!(out, msg);
        }
    }

    #[test]
    fn empty_block_clears_final_metrics() {
        let t = Trellis::from_preset(&presets::CC75).unwrap();
        let mut dec = ViterbiDecoder::new();
        let mut out = Vec::new();
        let bm = metrics_for(&encode(&t, 0, &[1, 1, 0]));
        dec.decode_into(&t, 3, Some(0), None, &bm, &mut out).unwrap();
        assert_eq!(dec.final_metrics().len(), 4);

        dec.decode_into(&t, 0, Some(0), None, &[], &mut out).unwrap();
        assert!(out.is_empty());
        assert!(dec.final_metrics().is_empty());
    }

    #[test]
    fn unreachable_end_state_still_traces_back() {
        // From state 0 the (7,5) code cannot reach state 3 in one step.
        let t = Trellis::from_preset(&presets::CC75).unwrap();
        let mut dec = ViterbiDecoder::new();
        let mut out = Vec::new();
        dec.decode_into(&t, 1, Some(0), Some(3), &row_for(0), &mut out)
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(dec.final_metrics()[3], f64::INFINITY);
    }

    #[test]
    fn final_metrics_are_normalized() {
        let t = Trellis::from_preset(&presets::CC75).unwrap();
        let bm = metrics_for(&encode(&t, 0, &[1, 0, 0, 1, 1]));
        let mut dec = ViterbiDecoder::new();
        let mut out = Vec::new();
        dec.decode_into(&t, 5, Some(0), None, &bm, &mut out).unwrap();
        let min = dec.final_metrics().iter().copied().fold(f64::INFINITY, f64::min);
        assert_eq!(min, 0.0);
    }
}
