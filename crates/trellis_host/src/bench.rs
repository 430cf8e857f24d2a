use crate::job::{self, Job, JobArgs};
use crate::stats::BlockStats;
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::time::Instant;
use trellis_core::ViterbiDecoder;
use trellis_io::loader;

/// Decodes all blocks of a metric file in parallel and reports throughput.
pub fn run_benchmark(args: &JobArgs) -> Result<()> {
    println!("Loading trellis...");
    let job = Job::from_args(args)?;
    println!(
        "Trellis: I={} S={} O={}, algorithm {:?}",
        job.trellis.inputs(),
        job.trellis.states(),
        job.trellis.outputs(),
        job.algo
    );

    println!("Loading metrics from {}...", args.metrics);
    let metrics = job.load_blocks(&args.metrics)?;
    let blocks = loader::slice_blocks(&metrics, job.block_values())?;
    println!("Loaded {} blocks of {} steps.", blocks.len(), job.block_len);

    let reference = match &args.reference {
        Some(path) => {
            let raw = loader::load_b8_file(path)?;
            let bits = loader::unpack_bits(&raw, blocks.len() * bits_per_block(&job))
                .with_context(|| format!("reference {} does not cover every block", path))?;
            Some(bits)
        }
        None => None,
    };

    println!("Starting Benchmark (Parallel - Rayon)...");
    let start_bench = Instant::now();
    let stats = bench_blocks(&job, &blocks, reference.as_deref())?;
    let duration = start_bench.elapsed();

    let seconds = duration.as_secs_f64();
    let throughput = (blocks.len() * job.block_len) as f64 / seconds;

    println!("Results");
    println!("Time: {:.4} s", seconds);
    println!("Throughput: {:.2} steps/s", throughput);
    stats.print_report();

    Ok(())
}

fn bits_per_block(job: &Job) -> usize {
    job.block_len * job::bits_per_symbol(job.trellis.inputs())
}

/// Decodes `blocks` on the rayon pool and collects per-block statistics.
///
/// Each worker owns one `ViterbiDecoder` and reuses it across the blocks it
/// is handed. Blocks are independent, so the decoded output does not depend
/// on scheduling. When `reference` is given it must hold the message bits of
/// every block back to back.
pub fn bench_blocks(job: &Job, blocks: &[&[f64]], reference: Option<&[u8]>) -> Result<BlockStats> {
    let block_bits = bits_per_block(job);

    blocks
        .par_iter()
        .enumerate()
        .map_init(
            || (ViterbiDecoder::new(), Vec::with_capacity(job.block_len)),
            |(viterbi, symbols), (b, block)| -> Result<BlockStats> {
                let mut local = BlockStats::new();
                let t0 = Instant::now();
                job.decode_block(viterbi, block, symbols)
                    .with_context(|| format!("block {}", b))?;
                local.record_latency(t0.elapsed().as_nanos() as u64);

                if let Some(reference) = reference {
                    let bits = job::symbols_to_bits(symbols, job.trellis.inputs());
                    let expected = &reference[b * block_bits..(b + 1) * block_bits];
                    let errors = bits.iter().zip(expected).filter(|(a, e)| a != e).count();
                    local.record_errors(bits.len(), errors);
                }
                Ok(local)
            },
        )
        .try_reduce(BlockStats::new, |a, b| Ok(a.merge(b)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::run_decode;
    use crate::generator::{GenParams, generate_awgn_data};
    use crate::job::{Algo, CodeArgs};
    use trellis_common::presets;
    use trellis_core::Trellis;

    #[test]
    fn noiseless_generated_data_benches_without_errors() {
        let dir = std::env::temp_dir().join(format!("trellis-bench-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = |name: &str| dir.join(name).to_str().unwrap().to_string();
        let (metrics, reference, decoded) = (path("g.f32"), path("g.b8"), path("out.b8"));

        let t = Trellis::from_preset(&presets::RSC75).unwrap();
        let params = GenParams {
            block_len: 32,
            blocks: 5,
            noise_var: 0.0,
            seed: 21,
        };
        generate_awgn_data(&t, &metrics, &reference, &params).unwrap();

        for algo in [Algo::Viterbi, Algo::LogBcjr, Algo::MaxLogBcjr] {
            let args = JobArgs {
                code: CodeArgs {
                    fsm: None,
                    preset: Some("rsc75".to_string()),
                },
                metrics: metrics.clone(),
                block_len: 32,
                algo,
                start: Some(0),
                end: None,
                noise_var: 0.5,
                reference: Some(reference.clone()),
            };
            run_benchmark(&args).unwrap();

            let job = Job::from_args(&args).unwrap();
            let values = job.load_blocks(&metrics).unwrap();
            let blocks = loader::slice_blocks(&values, job.block_values()).unwrap();
            let raw = loader::load_b8_file(&reference).unwrap();
            let bits = loader::unpack_bits(&raw, 5 * 32).unwrap();
            let stats = bench_blocks(&job, &blocks, Some(&bits)).unwrap();
            assert_eq!(stats.count, 5, "{algo:?}");
            assert_eq!(stats.bits, 160, "{algo:?}");
            assert_eq!(stats.bit_errors, 0, "{algo:?}");

            run_decode(&args, Some(decoded.as_str())).unwrap();
            assert_eq!(
                std::fs::read(&decoded).unwrap(),
                std::fs::read(&reference).unwrap(),
                "{algo:?}"
            );
        }

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn blocks_without_reference_report_no_error_rate() {
        let t = Trellis::from_preset(&presets::CC75).unwrap();
        let job = Job::new(t, Algo::Viterbi, 2, Some(0), None, 0.5).unwrap();
        let costs = [0.0; 8];
        let blocks = vec![&costs[..]];
        let stats = bench_blocks(&job, &blocks, None).unwrap();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.bit_error_rate(), None);
    }
}
