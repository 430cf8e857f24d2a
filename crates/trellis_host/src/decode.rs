use crate::job::{self, Job, JobArgs};
use anyhow::{Context, Result};
use log::info;
use std::time::Instant;
use trellis_core::ViterbiDecoder;
use trellis_io::{loader, writer};

/// Decodes every block of a metric file on the calling thread.
///
/// # Arguments
///
/// * `args` - Trellis, metric file and decoding options
/// * `out` - Optional .b8 path receiving the decoded bits
///
/// # Returns
///
/// Ok(()) on success, or an error if a file cannot be read or written or a
/// block fails to decode.
pub fn run_decode(args: &JobArgs, out: Option<&str>) -> Result<()> {
    let job = Job::from_args(args)?;
    let metrics = job.load_blocks(&args.metrics)?;
    let blocks = loader::slice_blocks(&metrics, job.block_values())?;
    info!(
        "Decoding {} blocks of {} steps with {:?}",
        blocks.len(),
        job.block_len,
        job.algo
    );

    let start = Instant::now();
    let mut viterbi = ViterbiDecoder::new();
    let mut symbols = Vec::with_capacity(job.block_len);
    let mut decoded = Vec::with_capacity(blocks.len() * job.block_len);
    for (b, block) in blocks.iter().enumerate() {
        job.decode_block(&mut viterbi, block, &mut symbols)
            .with_context(|| format!("block {}", b))?;
        decoded.extend_from_slice(&symbols);
    }
    let elapsed = start.elapsed();

    let bits = job::symbols_to_bits(&decoded, job.trellis.inputs());
    println!("Decoded {} symbols ({} bits) in {:?}", decoded.len(), bits.len(), elapsed);

    if let Some(path) = out {
        writer::write_b8_file(path, &bits)?;
        println!("Wrote {}", path);
    }

    if let Some(path) = &args.reference {
        let errors = job::count_bit_errors(path, &bits)?;
        println!(
            "Bit errors: {}/{} (BER {:.3e})",
            errors,
            bits.len(),
            errors as f64 / bits.len().max(1) as f64
        );
    }

    Ok(())
}
