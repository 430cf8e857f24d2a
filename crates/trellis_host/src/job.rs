//! Decoding jobs shared by the `decode` and `bench` commands.
//!
//! A job bundles the trellis, the selected algorithm and the boundary
//! conditions. Metric files always hold branch costs: the squared Euclidean
//! distance `d` between the received samples and the antipodal symbols of a
//! label. On a real AWGN channel with per-sample noise variance `σ²`, every
//! sample has density proportional to `exp(-(r - x)² / (2σ²))`, so the branch
//! log-likelihood is `-d / (2σ²)` up to a constant shared by all labels. BCJR
//! runs apply that conversion before decoding; Viterbi uses the costs as is.

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, ValueEnum};
use log::info;
use trellis_common::presets;
use trellis_core::bcjr::state_prior;
use trellis_core::llr::{bit_llrs, hard_decisions, symbol_decisions};
use trellis_core::{BcjrMode, Trellis, ViterbiDecoder, bcjr_decode};
use trellis_io::{loader, parser};

/// Where the trellis comes from.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct CodeArgs {
    /// FSM description file
    #[arg(long)]
    pub fsm: Option<String>,

    /// Built-in trellis (cc75, rsc75, acc)
    #[arg(long)]
    pub preset: Option<String>,
}

impl CodeArgs {
    pub fn load(&self) -> Result<Trellis> {
        if let Some(path) = &self.fsm {
            return parser::load_fsm_file(path);
        }
        let name = self.preset.as_deref().unwrap_or_default();
        let preset = presets::by_name(name).ok_or_else(|| {
            let known: Vec<&str> = presets::ALL.iter().map(|p| p.name).collect();
            anyhow!("unknown preset '{}' (known: {})", name, known.join(", "))
        })?;
        info!("Using preset {}: {}", preset.name, preset.description);
        Ok(Trellis::from_preset(preset)?)
    }
}

/// Per-sample noise variance shared by `gen`, `decode` and `bench`.
pub const DEFAULT_NOISE_VAR: f64 = 0.5;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Algo {
    Viterbi,
    LogBcjr,
    MaxLogBcjr,
}

#[derive(Args, Debug, Clone)]
pub struct JobArgs {
    #[command(flatten)]
    pub code: CodeArgs,

    /// Branch cost file (little-endian f32, K x O per block)
    #[arg(short, long)]
    pub metrics: String,

    /// Trellis steps per block
    #[arg(short = 'k', long)]
    pub block_len: usize,

    #[arg(short, long, value_enum, default_value_t = Algo::Viterbi)]
    pub algo: Algo,

    /// Known initial state of every block
    #[arg(long)]
    pub start: Option<usize>,

    /// Known final state of every block
    #[arg(long)]
    pub end: Option<usize>,

    /// Per-sample noise variance used to scale costs into log-likelihoods (BCJR only)
    #[arg(long, default_value_t = DEFAULT_NOISE_VAR)]
    pub noise_var: f64,

    /// Reference message bits (.b8) for error counting
    #[arg(short, long)]
    pub reference: Option<String>,
}

/// A validated decoding job.
pub struct Job {
    pub trellis: Trellis,
    pub algo: Algo,
    pub block_len: usize,
    start: Option<usize>,
    end: Option<usize>,
    noise_var: f64,
    a0: Vec<f64>,
    bk: Vec<f64>,
}

impl Job {
    pub fn from_args(args: &JobArgs) -> Result<Self> {
        let trellis = args.code.load()?;
        Self::new(trellis, args.algo, args.block_len, args.start, args.end, args.noise_var)
    }

    pub fn new(
        trellis: Trellis,
        algo: Algo,
        block_len: usize,
        start: Option<usize>,
        end: Option<usize>,
        noise_var: f64,
    ) -> Result<Self> {
        if block_len == 0 {
            bail!("block length must be positive");
        }
        if algo != Algo::Viterbi && !(noise_var > 0.0 && noise_var.is_finite()) {
            bail!("noise variance must be a positive number, got {}", noise_var);
        }
        let a0 = state_prior(trellis.states(), start)?;
        let bk = state_prior(trellis.states(), end)?;
        Ok(Self {
            trellis,
            algo,
            block_len,
            start,
            end,
            noise_var,
            a0,
            bk,
        })
    }

    /// Metric values consumed by one block.
    pub fn block_values(&self) -> usize {
        self.block_len * self.trellis.outputs()
    }

    /// Decodes one block of branch costs into input symbols.
    pub fn decode_block(
        &self,
        viterbi: &mut ViterbiDecoder,
        costs: &[f64],
        out: &mut Vec<usize>,
    ) -> Result<()> {
        let mode = match self.algo {
            Algo::Viterbi => {
                viterbi.decode_into(
                    &self.trellis,
                    self.block_len,
                    self.start,
                    self.end,
                    costs,
                    out,
                )?;
                return Ok(());
            }
            Algo::LogBcjr => BcjrMode::Exact,
            Algo::MaxLogBcjr => BcjrMode::MaxLog,
        };

        let loglik = self.log_likelihoods(costs);
        let app = bcjr_decode(&self.trellis, mode, &self.a0, &self.bk, &loglik)?;

        out.clear();
        if self.trellis.inputs() == 2 {
            let llrs = bit_llrs(&app, mode)?;
            out.extend(hard_decisions(&llrs).into_iter().map(usize::from));
        } else {
            out.extend(symbol_decisions(&app, mode));
        }
        Ok(())
    }

    /// Branch log-likelihoods `-cost / (2 * noise_var)` of one block.
    pub fn log_likelihoods(&self, costs: &[f64]) -> Vec<f64> {
        let scale = 2.0 * self.noise_var;
        costs.iter().map(|c| -c / scale).collect()
    }

    pub fn load_blocks(&self, path: &str) -> Result<Vec<f64>> {
        let metrics = loader::load_metrics_file(path)?;
        if metrics.len() < self.block_values() {
            bail!(
                "{} holds {} values, fewer than one block of {} x {}",
                path,
                metrics.len(),
                self.block_len,
                self.trellis.outputs()
            );
        }
        Ok(metrics)
    }
}

/// Bits needed to write one input symbol.
pub fn bits_per_symbol(inputs: usize) -> usize {
    (usize::BITS - (inputs.max(2) - 1).leading_zeros()) as usize
}

/// Expands symbols into bits, most significant bit first.
pub fn symbols_to_bits(symbols: &[usize], inputs: usize) -> Vec<u8> {
    let width = bits_per_symbol(inputs);
    symbols
        .iter()
        .flat_map(|&u| (0..width).rev().map(move |b| ((u >> b) & 1) as u8))
        .collect()
}

/// Compares decoded bits against a reference .b8 file.
///
/// # Returns
///
/// The number of differing bits. Fails if the reference holds fewer bits
/// than were decoded.
pub fn count_bit_errors(path: &str, decoded: &[u8]) -> Result<usize> {
    let raw = loader::load_b8_file(path)?;
    let reference = loader::unpack_bits(&raw, decoded.len())
        .with_context(|| format!("reference {} is shorter than the decoded output", path))?;
    Ok(decoded
        .iter()
        .zip(&reference)
        .filter(|(a, b)| a != b)
        .count())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cc75_job(algo: Algo) -> Job {
        let t = Trellis::from_preset(&presets::CC75).unwrap();
        Job::new(t, algo, 4, Some(0), None, 0.5).unwrap()
    }

    fn costs(labels: &[usize]) -> Vec<f64> {
        labels
            .iter()
            .flat_map(|&l| (0..4).map(move |o| ((o ^ l) as u32).count_ones() as f64))
            .collect()
    }

    #[test]
    fn every_algorithm_decodes_the_reference_block() {
        let bm = costs(&[3, 1, 0, 2]);
        let mut viterbi = ViterbiDecoder::new();
        let mut out = Vec::new();
        for algo in [Algo::Viterbi, Algo::LogBcjr, Algo::MaxLogBcjr] {
            cc75_job(algo).decode_block(&mut viterbi, &bm, &mut out).unwrap();
            assert_eq!(out, vec![1, 0, 1, 1], "{algo:?}");
        }
    }

    #[test]
    fn rejects_bad_parameters() {
        let t = Trellis::from_preset(&presets::CC75).unwrap();
        assert!(Job::new(t.clone(), Algo::Viterbi, 0, None, None, 1.0).is_err());
        assert!(Job::new(t.clone(), Algo::LogBcjr, 8, None, None, 0.0).is_err());
        assert!(Job::new(t.clone(), Algo::Viterbi, 8, Some(4), None, 1.0).is_err());
        assert!(Job::new(t, Algo::Viterbi, 8, None, None, 0.0).is_ok());
    }

    #[test]
    fn log_likelihoods_give_the_awgn_bit_llr() {
        // One accumulator step from state 0: input u is sent as 1 - 2u.
        let t = Trellis::from_preset(&presets::ACCUMULATOR).unwrap();
        let sigma2 = 0.3;
        let job = Job::new(t, Algo::LogBcjr, 1, Some(0), None, sigma2).unwrap();
        let a0 = state_prior(2, Some(0)).unwrap();
        let bk = state_prior(2, None).unwrap();

        for r in [-1.7, -0.2, 0.0, 0.45, 1.3] {
            let costs = [(r - 1.0) * (r - 1.0), (r + 1.0) * (r + 1.0)];
            let ll = job.log_likelihoods(&costs);
            let app = bcjr_decode(&job.trellis, BcjrMode::Exact, &a0, &bk, &ll).unwrap();
            let llr = bit_llrs(&app, BcjrMode::Exact).unwrap()[0];
            let expected = 2.0 * r / sigma2;
            assert!((llr - expected).abs() < 1e-12, "r={r}: {llr} vs {expected}");
        }
    }

    #[test]
    fn symbol_bits_are_msb_first() {
        assert_eq!(bits_per_symbol(2), 1);
        assert_eq!(bits_per_symbol(3), 2);
        assert_eq!(bits_per_symbol(4), 2);
        assert_eq!(bits_per_symbol(5), 3);
        assert_eq!(symbols_to_bits(&[1, 0], 2), vec![1, 0]);
        assert_eq!(symbols_to_bits(&[2, 1], 4), vec![1, 0, 0, 1]);
    }
}
