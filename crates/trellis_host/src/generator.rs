//! Test data generator for decoder benchmarks.
//!
//! Encodes random messages through a trellis, maps every output label to
//! antipodal symbols and adds white Gaussian noise. Writes the resulting
//! branch costs (.f32) and the transmitted message bits (.b8) so that the
//! `decode` and `bench` commands can measure bit error rates.

use crate::job;
use anyhow::{Context, Result, bail};
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use trellis_core::Trellis;
use trellis_io::writer;

pub struct GenParams {
    pub block_len: usize,
    pub blocks: usize,
    pub noise_var: f64,
    pub seed: u64,
}

/// Generates AWGN test data for a trellis.
///
/// Every block starts in state 0 and is left unterminated. Output label `o`
/// is sent as `log2(O)` antipodal symbols, most significant bit first, with
/// bit `b` mapped to `1 - 2b`. The branch cost of label `c` at a step is the
/// squared Euclidean distance between the received samples and the symbols
/// of `c`.
///
/// # Arguments
///
/// * `trellis` - Code to encode with; `O` must be a power of two
/// * `metrics_path` - Output path for the branch costs (.f32 file)
/// * `reference_path` - Output path for the message bits (.b8 file)
/// * `params` - Block shape, noise variance and RNG seed
///
/// # Returns
///
/// Ok(()) on success, or an error if the trellis cannot be modulated or file
/// I/O fails.
pub fn generate_awgn_data(
    trellis: &Trellis,
    metrics_path: &str,
    reference_path: &str,
    params: &GenParams,
) -> Result<()> {
    let num_outputs = trellis.outputs();
    if !num_outputs.is_power_of_two() || num_outputs < 2 {
        bail!("cannot modulate {} output labels onto bits", num_outputs);
    }
    if !(params.noise_var >= 0.0 && params.noise_var.is_finite()) {
        bail!("noise variance must be non-negative, got {}", params.noise_var);
    }

    info!(
        "Generating {} blocks of {} steps (noise variance {})...",
        params.blocks, params.block_len, params.noise_var
    );

    let mut rng = StdRng::seed_from_u64(params.seed);
    let label_bits = num_outputs.trailing_zeros() as usize;
    let noise = Normal::new(0.0, params.noise_var.sqrt())
        .context("invalid noise standard deviation")?;
    let steps = params.blocks * params.block_len;

    let mut message = Vec::with_capacity(steps);
    let mut costs = Vec::with_capacity(steps * num_outputs);
    let mut received = vec![0.0; label_bits];

    for _ in 0..params.blocks {
        let mut state = 0;
        for _ in 0..params.block_len {
            let u = rng.gen_range(0..trellis.inputs());
            let label = trellis.output_label(state, u);
            state = trellis.next_state(state, u);
            message.push(u);

            for (j, r) in received.iter_mut().enumerate() {
                *r = antipodal(label, j, label_bits) + noise.sample(&mut rng);
            }
            for c in 0..num_outputs {
                let d: f64 = received
                    .iter()
                    .enumerate()
                    .map(|(j, r)| (r - antipodal(c, j, label_bits)).powi(2))
                    .sum();
                costs.push(d);
            }
        }
    }

    writer::write_metrics_file(metrics_path, &costs)?;
    writer::write_b8_file(
        reference_path,
        &job::symbols_to_bits(&message, trellis.inputs()),
    )?;
    info!("Wrote {} and {}", metrics_path, reference_path);
    Ok(())
}

/// Symbol carrying bit `j` (MSB first) of `label`.
fn antipodal(label: usize, j: usize, label_bits: usize) -> f64 {
    if (label >> (label_bits - 1 - j)) & 1 == 0 {
        1.0
    } else {
        -1.0
    }
}
