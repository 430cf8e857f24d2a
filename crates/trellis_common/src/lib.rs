//! Common definitions shared across the trellis decoding workspace.
//!
//! This crate carries the catalog of well-known trellis tables used by the
//! decoder core, the file loaders, and the host tools. Everything here is
//! plain constant data so it can be linked into any environment, including
//! `no_std` targets.

#![no_std]

/// Catalog of trellis tables for common finite-state encoders.
///
/// Each preset describes an encoder by its input alphabet size, state count,
/// output alphabet size, and the flat next-state / output-label tables indexed
/// as `state * inputs + input`. The tables are exactly what the decoder core
/// expects when building a trellis, so presets can be passed straight through
/// without any reshaping.
pub mod presets {
    /// Static description of a trellis encoder.
    ///
    /// Mirrors the constructor arguments of the decoder core's trellis type.
    /// The slices are borrowed from static storage, so a preset is `Copy` and
    /// can be shared freely between threads.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Preset {
        /// Short identifier used on the command line (e.g. `"cc75"`).
        pub name: &'static str,

        /// Human readable description printed by the host tools.
        pub description: &'static str,

        /// Number of distinct input symbols per trellis step.
        pub inputs: usize,

        /// Number of encoder states.
        pub states: usize,

        /// Number of distinct output labels (branch metric vector width).
        pub outputs: usize,

        /// Next state of the branch leaving `s` with input `i`, at `s * inputs + i`.
        pub next_state: &'static [usize],

        /// Output label of the branch leaving `s` with input `i`, at `s * inputs + i`.
        ///
        /// Labels index into the per-step branch metric vector. For binary
        /// rate-1/n codes the label is the codeword read as an integer with
        /// the first coded bit as the most significant bit.
        pub output_label: &'static [usize],
    }

    /// Rate-1/2 feedforward convolutional code with generators (7, 5) octal.
    ///
    /// Memory 2, four states. The state index is `2 * r0 + r1` where `r0` is
    /// the most recent input bit. Output label `2 * c0 + c1` with
    /// `c0 = u ^ r1` and `c1 = u ^ r0 ^ r1`.
    pub const CC75: Preset = Preset {
        name: "cc75",
        description: "rate-1/2 (7,5) feedforward convolutional code, 4 states",
        inputs: 2,
        states: 4,
        outputs: 4,
        next_state: &[0, 2, 0, 2, 1, 3, 1, 3],
        output_label: &[0, 3, 3, 0, 1, 2, 2, 1],
    };

    /// Rate-1/2 recursive systematic code, feedback 7 and feedforward 5 octal.
    ///
    /// Same state numbering as [`CC75`]. The output label is
    /// `2 * systematic + parity`.
    pub const RSC75: Preset = Preset {
        name: "rsc75",
        description: "rate-1/2 (1, 5/7) recursive systematic code, 4 states",
        inputs: 2,
        states: 4,
        outputs: 4,
        next_state: &[0, 2, 2, 0, 3, 1, 1, 3],
        output_label: &[0, 3, 0, 3, 1, 2, 1, 2],
    };

    /// Rate-1 accumulator `1 / (1 + D)`.
    ///
    /// Two states holding the last output bit; the output label is the
    /// output bit itself.
    pub const ACCUMULATOR: Preset = Preset {
        name: "acc",
        description: "rate-1 accumulator 1/(1+D), 2 states",
        inputs: 2,
        states: 2,
        outputs: 2,
        next_state: &[0, 1, 1, 0],
        output_label: &[0, 1, 1, 0],
    };

    /// Every preset known to the workspace, in display order.
    pub const ALL: &[Preset] = &[CC75, RSC75, ACCUMULATOR];

    /// Looks up a preset by its command-line name.
    ///
    /// # Arguments
    ///
    /// * `name` - Identifier such as `"cc75"`; matched case-sensitively
    ///
    /// # Returns
    ///
    /// The matching preset, or `None` if the name is unknown.
    pub fn by_name(name: &str) -> Option<&'static Preset> {
        ALL.iter().find(|p| p.name == name)
    }
}
