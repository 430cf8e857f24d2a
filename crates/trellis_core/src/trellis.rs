//! Trellis representation of a finite-state encoder.
//!
//! A trellis is described by three alphabet sizes and two flat lookup tables
//! indexed by `(state, input)`. Although the trellis is logically a cyclic
//! graph, no pointer structure is needed: the decoders walk the tables
//! forward (next state) and backward (predecessor lists) directly.

use crate::{DecodeError, Result};
use log::debug;
use trellis_common::presets::Preset;

/// Immutable description of a finite-state machine unrolled over time.
///
/// Every `(state, input)` pair maps to exactly one next state and one output
/// label. The predecessor lists are derived once at construction so that the
/// forward recursions can iterate over incoming branches without scanning
/// the whole table at every step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trellis {
    inputs: usize,
    states: usize,
    outputs: usize,

    /// Next state of branch `(s, i)` at index `s * inputs + i`.
    next_state: Vec<usize>,

    /// Output label of branch `(s, i)` at index `s * inputs + i`.
    output_label: Vec<usize>,

    /// Incoming branches of each state, ascending by `(prev_state, input)`.
    ///
    /// A state may list the same predecessor more than once when several
    /// inputs lead to it (parallel transitions), and may list none at all.
    predecessors: Vec<Vec<Branch>>,
}

/// One incoming branch of a state: where it comes from and on which input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Branch {
    /// State the branch leaves from.
    pub state: usize,
    /// Input symbol that selects the branch.
    pub input: usize,
}

impl Trellis {
    /// Builds a trellis from caller-supplied tables.
    ///
    /// Validates that both tables hold exactly `states * inputs` entries,
    /// that every next state lies in `[0, states)` and every output label in
    /// `[0, outputs)`, then derives the predecessor lists.
    ///
    /// # Arguments
    ///
    /// * `inputs` - Number of input symbols per step (I)
    /// * `states` - Number of trellis states (S)
    /// * `outputs` - Number of output labels (O)
    /// * `next_state` - Flat next-state table, `next_state[s * I + i]`
    /// * `output_label` - Flat output-label table, `output_label[s * I + i]`
    ///
    /// # Returns
    ///
    /// The trellis, or `DecodeError::InvalidTrellis` describing the first
    /// violated constraint.
    pub fn new(
        inputs: usize,
        states: usize,
        outputs: usize,
        next_state: Vec<usize>,
        output_label: Vec<usize>,
    ) -> Result<Self> {
        if inputs == 0 || states == 0 || outputs == 0 {
            return Err(DecodeError::InvalidTrellis(format!(
                "alphabet sizes must be non-zero (I={inputs}, S={states}, O={outputs})"
            )));
        }

        let branches = states
            .checked_mul(inputs)
            .ok_or_else(|| DecodeError::InvalidTrellis("S*I overflows".into()))?;

        if next_state.len() != branches {
            return Err(DecodeError::InvalidTrellis(format!(
                "next-state table has {} entries, expected S*I = {}",
                next_state.len(),
                branches
            )));
        }
        if output_label.len() != branches {
            return Err(DecodeError::InvalidTrellis(format!(
                "output-label table has {} entries, expected S*I = {}",
                output_label.len(),
                branches
            )));
        }

        if let Some((idx, &ns)) = next_state.iter().enumerate().find(|(_, ns)| **ns >= states) {
            return Err(DecodeError::InvalidTrellis(format!(
                "next state {ns} of branch (state {}, input {}) is outside [0, {states})",
                idx / inputs,
                idx % inputs
            )));
        }
        if let Some((idx, &os)) = output_label
            .iter()
            .enumerate()
            .find(|(_, os)| **os >= outputs)
        {
            return Err(DecodeError::InvalidTrellis(format!(
                "output label {os} of branch (state {}, input {}) is outside [0, {outputs})",
                idx / inputs,
                idx % inputs
            )));
        }

        let mut predecessors = vec![Vec::with_capacity(inputs); states];
        for s in 0..states {
            for i in 0..inputs {
                predecessors[next_state[s * inputs + i]].push(Branch { state: s, input: i });
            }
        }

        let unreachable = predecessors.iter().filter(|p| p.is_empty()).count();
        debug!(
            "trellis built: I={inputs} S={states} O={outputs}, {unreachable} state(s) without incoming branches"
        );

        Ok(Self {
            inputs,
            states,
            outputs,
            next_state,
            output_label,
            predecessors,
        })
    }

    /// Builds a trellis from one of the static presets.
    ///
    /// # Arguments
    ///
    /// * `preset` - Table description from `trellis_common::presets`
    pub fn from_preset(preset: &Preset) -> Result<Self> {
        Self::new(
            preset.inputs,
            preset.states,
            preset.outputs,
            preset.next_state.to_vec(),
            preset.output_label.to_vec(),
        )
    }

    /// Number of input symbols per step (I).
    #[inline(always)]
    pub fn inputs(&self) -> usize {
        self.inputs
    }

    /// Number of states (S).
    #[inline(always)]
    pub fn states(&self) -> usize {
        self.states
    }

    /// Number of output labels, i.e. the width of one branch metric row (O).
    #[inline(always)]
    pub fn outputs(&self) -> usize {
        self.outputs
    }

    /// State reached from `state` on `input`.
    #[inline(always)]
    pub fn next_state(&self, state: usize, input: usize) -> usize {
        self.next_state[state * self.inputs + input]
    }

    /// Branch metric index of the transition leaving `state` on `input`.
    #[inline(always)]
    pub fn output_label(&self, state: usize, input: usize) -> usize {
        self.output_label[state * self.inputs + input]
    }

    /// Incoming branches of `state`, ascending by `(prev_state, input)`.
    #[inline(always)]
    pub fn predecessors(&self, state: usize) -> &[Branch] {
        &self.predecessors[state]
    }

    /// Flat next-state table, `s * I + i` indexed.
    pub fn next_state_table(&self) -> &[usize] {
        &self.next_state
    }

    /// Flat output-label table, `s * I + i` indexed.
    pub fn output_label_table(&self) -> &[usize] {
        &self.output_label
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_common::presets;

    #[test]
    fn cc75_tables_and_predecessors() {
        let t = Trellis::from_preset(&presets::CC75).unwrap();
        assert_eq!((t.inputs(), t.states(), t.outputs()), (2, 4, 4));
        assert_eq!(t.next_state(0, 1), 2);
        assert_eq!(t.output_label(1, 0), 3);

        let p: Vec<(usize, usize)> = t.predecessors(2).iter().map(|b| (b.state, b.input)).collect();
        assert_eq!(p, vec![(0, 1), (1, 1)]);

        for s in 0..t.states() {
            assert_eq!(t.predecessors(s).len(), 2);
        }
    }

    #[test]
    fn rejects_wrong_table_sizes() {
        let err = Trellis::new(2, 4, 4, vec![0; 7], vec![0; 8]).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidTrellis(_)));
        let err = Trellis::new(2, 4, 4, vec![0; 8], vec![0; 9]).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidTrellis(_)));
    }

    #[test]
    fn rejects_out_of_range_entries() {
        let err = Trellis::new(2, 2, 2, vec![0, 1, 2, 0], vec![0, 1, 1, 0]).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidTrellis(_)));

        let err = Trellis::new(2, 2, 2, vec![0, 1, 1, 0], vec![0, 1, 2, 0]).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidTrellis(_)));
    }

    #[test]
    fn rejects_empty_alphabets() {
        assert!(Trellis::new(0, 1, 1, vec![], vec![]).is_err());
        assert!(Trellis::new(1, 0, 1, vec![], vec![]).is_err());
        assert!(Trellis::new(1, 1, 0, vec![0], vec![0]).is_err());
    }

    #[test]
    fn unreachable_states_have_no_predecessors() {
        // State 1 is only ever left, never entered.
        let t = Trellis::new(1, 2, 1, vec![0, 0], vec![0, 0]).unwrap();
        assert!(t.predecessors(1).is_empty());
        assert_eq!(t.predecessors(0).len(), 2);
    }
}
