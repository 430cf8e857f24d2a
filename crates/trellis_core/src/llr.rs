//! Reduction of branch posteriors to log-likelihood ratios and decisions.
//!
//! The BCJR decoder returns one value per `(step, state, input)` branch.
//! Marginalizing over states with the decoder's own combine operation gives
//! the log a-posteriori value of each input symbol; for binary inputs the
//! difference of the two is the bit LLR. The sign convention is
//! `llr = L(u = 0) - L(u = 1)`, so a negative LLR decides for `1`.

use crate::bcjr::{BcjrMode, Posteriors};
use crate::{DecodeError, Result};

/// Per-step bit LLRs from binary-input posteriors.
///
/// # Arguments
///
/// * `posteriors` - Output of a BCJR run with `I == 2`
/// * `mode` - Combine mode that produced the posteriors
///
/// # Returns
///
/// One LLR per step, or `InvalidInput` if the trellis is not binary-input.
pub fn bit_llrs(posteriors: &Posteriors, mode: BcjrMode) -> Result<Vec<f64>> {
    if posteriors.inputs() != 2 {
        return Err(DecodeError::InvalidInput(format!(
            "bit LLRs need a binary-input trellis, got I = {}",
            posteriors.inputs()
        )));
    }

    let mut zeros = Vec::with_capacity(posteriors.states());
    let mut ones = Vec::with_capacity(posteriors.states());
    let llrs = (0..posteriors.steps())
        .map(|k| {
            zeros.clear();
            ones.clear();
            for pair in posteriors.step(k).chunks_exact(2) {
                zeros.push(pair[0]);
                ones.push(pair[1]);
            }
            llr_of(mode.combine_all(&zeros), mode.combine_all(&ones))
        })
        .collect();
    Ok(llrs)
}

/// Difference of two log values without `inf - inf` turning into NaN.
///
/// When both hypotheses are impossible the step carries no information and
/// the LLR is zero.
fn llr_of(l0: f64, l1: f64) -> f64 {
    if l0 == l1 { 0.0 } else { l0 - l1 }
}

/// Hard bit decisions: `1` where the LLR is negative, `0` otherwise.
pub fn hard_decisions(llrs: &[f64]) -> Vec<u8> {
    llrs.iter().map(|&l| u8::from(l < 0.0)).collect()
}

/// Per-step most likely input symbol, for any input alphabet size.
///
/// Marginalizes each input over all states with the mode's combine and
/// returns the arg-max; ties go to the lowest symbol.
pub fn symbol_decisions(posteriors: &Posteriors, mode: BcjrMode) -> Vec<usize> {
    let num_inputs = posteriors.inputs();
    let mut column = Vec::with_capacity(posteriors.states());
    (0..posteriors.steps())
        .map(|k| {
            let step = posteriors.step(k);
            let mut best = 0;
            let mut best_value = f64::NEG_INFINITY;
            for i in 0..num_inputs {
                column.clear();
                column.extend(step.iter().skip(i).step_by(num_inputs));
                let value = mode.combine_all(&column);
                if value > best_value {
                    best = i;
                    best_value = value;
                }
            }
            best
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bcjr::{bcjr_decode, state_prior};
    use crate::trellis::Trellis;
    use trellis_common::presets;

    fn loglik(labels: &[usize], scale: f64) -> Vec<f64> {
        labels
            .iter()
            .flat_map(|&l| (0..4).map(move |o| -scale * ((o ^ l) as u32).count_ones() as f64))
            .collect()
    }

    #[test]
    fn decisions_follow_llr_sign() {
        assert_eq!(hard_decisions(&[-0.5, 0.0, 3.0, -1e-9]), vec![1, 0, 0, 1]);
    }

    #[test]
    fn both_impossible_gives_zero_llr() {
        assert_eq!(llr_of(f64::NEG_INFINITY, f64::NEG_INFINITY), 0.0);
        assert_eq!(llr_of(f64::NEG_INFINITY, 0.0), f64::NEG_INFINITY);
        assert_eq!(llr_of(0.0, f64::NEG_INFINITY), f64::INFINITY);
    }

    #[test]
    fn cc75_reference_message_through_llrs() {
        let t = Trellis::from_preset(&presets::CC75).unwrap();
        let a0 = state_prior(4, Some(0)).unwrap();
        let bk = state_prior(4, None).unwrap();
        let bm = loglik(&[3, 1, 0, 2], 4.0);

        for mode in [BcjrMode::Exact, BcjrMode::MaxLog] {
            let app = bcjr_decode(&t, mode, &a0, &bk, &bm).unwrap();
            let llrs = bit_llrs(&app, mode).unwrap();
            assert_eq!(hard_decisions(&llrs), vec![1, 0, 1, 1]);
            assert_eq!(symbol_decisions(&app, mode), vec![1, 0, 1, 1]);
        }
    }

    #[test]
    fn non_binary_trellis_rejected_for_bit_llrs() {
        // Three inputs, one state: every step is an independent ternary symbol.
        let t = Trellis::new(3, 1, 3, vec![0, 0, 0], vec![0, 1, 2]).unwrap();
        let prior = state_prior(1, None).unwrap();
        let bm = [-2.0, -0.1, -3.0, 0.0, -1.0, -1.0];
        let app = bcjr_decode(&t, BcjrMode::Exact, &prior, &prior, &bm).unwrap();
        assert!(bit_llrs(&app, BcjrMode::Exact).is_err());
        assert_eq!(symbol_decisions(&app, BcjrMode::Exact), vec![1, 0]);
    }
}
