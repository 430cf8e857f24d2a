//! Core trellis decoding algorithms and data structures.
//!
//! This crate provides the fundamental components for decoding finite-state
//! encoders: the trellis description, the numerically stable max-star
//! primitive, the Viterbi sequence estimator, and the forward-backward
//! (BCJR) a-posteriori estimator in its exact and max-log forms. Every
//! decoding entry point is a bounded, synchronous computation over borrowed
//! inputs, so a single trellis can be shared by any number of threads.

/// Forward-backward (BCJR) decoder in the log domain.
///
/// Computes forward and backward state metrics and combines them into
/// per-branch log a-posteriori values. The combine operation is a type
/// parameter, so the exact log-MAP and the max-log approximation share one
/// recursion.
pub mod bcjr;

/// Reduction of branch posteriors to bit log-likelihood ratios.
///
/// Turns the `K x S x I` posterior array into one LLR per binary input step,
/// and LLRs into hard decisions.
pub mod llr;

/// Log-sum-exp primitive and the combine strategies built on it.
///
/// Provides the stable `max*` reduction used by exact BCJR and the plain
/// `max` used by the max-log approximation, behind a common trait.
pub mod max_star;

/// Read-only view over a block of branch metrics.
///
/// Validates that a flat metric slice reshapes into whole rows of one value
/// per output label and provides row access by time step.
pub mod metrics;

/// Trellis representation of a finite-state encoder.
///
/// Stores the next-state and output-label tables together with the derived
/// predecessor lists. Constructed once and shared read-only by all decoders.
pub mod trellis;

/// Viterbi maximum-likelihood sequence decoder.
///
/// Implements the add-compare-select recursion with traceback over the
/// trellis, using a cost (smaller is better) branch metric convention.
pub mod viterbi;

pub use bcjr::{BcjrDecoder, BcjrMode, Normalization, Posteriors, StateMetrics, bcjr_decode};
pub use trellis::Trellis;
pub use viterbi::{ViterbiDecoder, viterbi_decode};

/// Error types returned by trellis construction and decoding.
///
/// Both variants describe caller configuration errors. Decoding is
/// deterministic, so there is nothing to retry: the caller must fix the
/// tables or the inputs. Degenerate numeric results (rows of `-inf`) are
/// not errors and never surface here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The next-state or output-label tables are malformed.
    ///
    /// Raised at construction when a table has the wrong number of entries,
    /// references a state or label outside its alphabet, or when one of the
    /// alphabet sizes is zero. No partially built trellis is returned.
    #[error("invalid trellis: {0}")]
    InvalidTrellis(String),

    /// A decode call received inputs that do not match the trellis.
    ///
    /// Covers branch metric blocks whose length is not a whole number of
    /// rows, initial/final state distributions of the wrong size, and forced
    /// start or end states outside the state range.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Result alias used throughout the decoder core.
pub type Result<T> = core::result::Result<T, DecodeError>;
