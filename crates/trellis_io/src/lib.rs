//! I/O utilities for loading trellis descriptions and decoder data files.
//!
//! Provides functions for reading and writing the files consumed and
//! produced by the decoding tools: trellis descriptions (.fsm text files),
//! branch metric blocks (.f32 binary files), and packed bit streams (.b8
//! files). Everything here is host-side plumbing; the decoder core never
//! touches the filesystem.

/// File loading utilities for binary decoder inputs.
///
/// Reads little-endian f32 branch metric files and LSB-first packed bit
/// files, and slices metric streams into fixed-length decoding blocks.
pub mod loader;

/// Parser for trellis descriptions in FSM format.
///
/// Parses the whitespace-separated `I S O` header followed by the
/// next-state and output-label matrices, and builds a validated Trellis.
pub mod parser;

/// Writers for decoder outputs and test fixtures.
///
/// Serializes hard decisions as packed .b8 files, metric blocks as .f32
/// files, and trellises back into FSM text.
pub mod writer;
