//! Writers for decoder outputs and fixtures.
//!
//! Hard decisions are stored as packed .b8 files so they can be compared
//! bit-for-bit with the reference message files read by the loader.

use anyhow::{Context, Result, bail};
use bitvec::prelude::*;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use trellis_core::Trellis;

/// Packs 0/1 values into LSB-first bytes; the last byte is zero padded.
pub fn pack_bits(bits: &[u8]) -> Result<Vec<u8>> {
    let mut packed = BitVec::<u8, Lsb0>::with_capacity(bits.len());
    for (i, &b) in bits.iter().enumerate() {
        match b {
            0 => packed.push(false),
            1 => packed.push(true),
            other => bail!("value {other} at position {i} is not a bit"),
        }
    }
    Ok(packed.into_vec())
}

/// Writes 0/1 values to a .b8 file.
pub fn write_b8_file<P: AsRef<Path>>(path: P, bits: &[u8]) -> Result<()> {
    let bytes = pack_bits(bits)?;
    let mut file = BufWriter::new(File::create(path).context("Failed to create .b8 file")?);
    file.write_all(&bytes)?;
    file.flush()?;
    Ok(())
}

/// Writes metrics to a little-endian f32 file.
pub fn write_metrics_file<P: AsRef<Path>>(path: P, metrics: &[f64]) -> Result<()> {
    let mut file = BufWriter::new(File::create(path).context("Failed to create .f32 file")?);
    for &m in metrics {
        file.write_all(&(m as f32).to_le_bytes())?;
    }
    file.flush()?;
    Ok(())
}

/// Renders a trellis in FSM text format, one state per matrix row.
pub fn format_fsm(trellis: &Trellis) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {} {}",
        trellis.inputs(),
        trellis.states(),
        trellis.outputs()
    );
    for table in [trellis.next_state_table(), trellis.output_label_table()] {
        out.push('\n');
        for row in table.chunks_exact(trellis.inputs()) {
            let line: Vec<String> = row.iter().map(ToString::to_string).collect();
            let _ = writeln!(out, "{}", line.join(" "));
        }
    }
    out
}
