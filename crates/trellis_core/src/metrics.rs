//! Read-only view over a block of branch metrics.
//!
//! A branch metric block is a flat `K x O` slice produced by an external
//! stage (demodulator, channel model, soft-output equalizer). The decoders
//! never own it; they only borrow it for the duration of one call.

use crate::{DecodeError, Result};

/// Borrowed `K x O` branch metric block.
///
/// Construction guarantees that the slice holds a whole number of rows, so
/// row access can never read past the end or silently truncate a block.
#[derive(Debug, Clone, Copy)]
pub struct BranchMetrics<'a> {
    data: &'a [f64],
    width: usize,
    steps: usize,
}

impl<'a> BranchMetrics<'a> {
    /// Wraps a flat metric slice whose row width is `width` (the trellis `O`).
    ///
    /// Fails with `InvalidInput` if the length is not a multiple of `width`.
    pub fn new(data: &'a [f64], width: usize) -> Result<Self> {
        if width == 0 {
            return Err(DecodeError::InvalidInput("branch metric width is zero".into()));
        }
        if data.len() % width != 0 {
            return Err(DecodeError::InvalidInput(format!(
                "branch metric length {} is not a multiple of O = {}",
                data.len(),
                width
            )));
        }
        Ok(Self {
            data,
            width,
            steps: data.len() / width,
        })
    }

    /// Wraps a flat metric slice that must hold exactly `steps` rows.
    ///
    /// Fails with `InvalidInput` unless `data.len() == steps * width`.
    pub fn with_steps(data: &'a [f64], width: usize, steps: usize) -> Result<Self> {
        let expected = steps.checked_mul(width).ok_or_else(|| {
            DecodeError::InvalidInput(format!("block length {steps} x {width} overflows"))
        })?;
        if data.len() != expected {
            return Err(DecodeError::InvalidInput(format!(
                "branch metric length {} does not match K*O = {} x {} = {}",
                data.len(),
                steps,
                width,
                expected
            )));
        }
        Self::new(data, width)
    }

    /// Number of time steps (K).
    #[inline(always)]
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Metrics of time step `k`, one per output label.
    #[inline(always)]
    pub fn row(&self, k: usize) -> &'a [f64] {
        &self.data[k * self.width..(k + 1) * self.width]
    }

    /// Iterates over the rows in time order.
    pub fn rows(&self) -> core::slice::ChunksExact<'a, f64> {
        self.data.chunks_exact(self.width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_follow_time_order() {
        let data = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let bm = BranchMetrics::new(&data, 3).unwrap();
        assert_eq!(bm.steps(), 2);
        assert_eq!(bm.row(1), &[3.0, 4.0, 5.0]);
        assert_eq!(bm.rows().count(), 2);
    }

    #[test]
    fn partial_rows_are_rejected() {
        let data = [0.0; 5];
        assert!(BranchMetrics::new(&data, 2).is_err());
        assert!(BranchMetrics::with_steps(&data, 5, 2).is_err());
        assert!(BranchMetrics::with_steps(&data, 5, 1).is_ok());
    }

    #[test]
    fn empty_block_has_no_steps() {
        let bm = BranchMetrics::with_steps(&[], 4, 0).unwrap();
        assert_eq!(bm.steps(), 0);
    }
}
