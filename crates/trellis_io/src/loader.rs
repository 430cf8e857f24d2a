use anyhow::{Context, Result, bail};
use bitvec::prelude::*;
use log::warn;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Loads a branch metric file (little-endian f32 values), widened to f64.
pub fn load_metrics_file<P: AsRef<Path>>(path: P) -> Result<Vec<f64>> {
    let mut file = File::open(path).context("Failed to open .f32 metrics file")?;
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)?;
    decode_f32_le(&buffer)
}

/// Decodes a little-endian f32 byte stream.
pub fn decode_f32_le(bytes: &[u8]) -> Result<Vec<f64>> {
    if bytes.len() % 4 != 0 {
        bail!(
            "metric stream is {} bytes long, not a whole number of f32 values",
            bytes.len()
        );
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f64)
        .collect())
}

/// Splits a metric stream into blocks of `block_len` values.
///
/// A trailing partial block cannot be decoded without silently truncating
/// it, so it is dropped and reported.
pub fn slice_blocks(metrics: &[f64], block_len: usize) -> Result<Vec<&[f64]>> {
    if block_len == 0 {
        bail!("block length must be positive");
    }
    let chunks = metrics.chunks_exact(block_len);
    let leftover = chunks.remainder().len();
    if leftover != 0 {
        warn!(
            "dropping {} trailing metric values that do not fill a block of {}",
            leftover, block_len
        );
    }
    Ok(chunks.collect())
}

/// Loads a .b8 file (packed bits, least significant bit first).
pub fn load_b8_file<P: AsRef<Path>>(path: P) -> Result<BitVec<u8, Lsb0>> {
    let mut file = File::open(path).context("Failed to open .b8 file")?;
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)?;

    let bits = BitVec::<u8, Lsb0>::from_vec(buffer);
    Ok(bits)
}

/// Returns the first `n` bits as 0/1 bytes.
pub fn unpack_bits(raw_bits: &BitVec<u8, Lsb0>, n: usize) -> Result<Vec<u8>> {
    if n > raw_bits.len() {
        bail!("requested {} bits but only {} are available", n, raw_bits.len());
    }
    Ok(raw_bits[..n].iter().map(|b| u8::from(*b)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_little_endian_floats() {
        let mut bytes = Vec::new();
        for v in [1.5f32, -0.25, 0.0] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        assert_eq!(decode_f32_le(&bytes).unwrap(), vec![1.5, -0.25, 0.0]);
        assert!(decode_f32_le(&bytes[..5]).is_err());
    }

    #[test]
    fn blocks_drop_partial_tail() {
        let m: Vec<f64> = (0..10).map(f64::from).collect();
        let blocks = slice_blocks(&m, 4).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1], &[4.0, 5.0, 6.0, 7.0]);
        assert!(slice_blocks(&m, 0).is_err());
    }

    #[test]
    fn bits_are_lsb_first() {
        let bits = BitVec::<u8, Lsb0>::from_vec(vec![0b0000_0101, 0b1000_0000]);
        assert_eq!(unpack_bits(&bits, 4).unwrap(), vec![1, 0, 1, 0]);
        assert_eq!(unpack_bits(&bits, 16).unwrap()[15], 1);
        assert!(unpack_bits(&bits, 17).is_err());
    }
}
