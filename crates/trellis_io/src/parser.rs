//! Parser for trellis description files.
//!
//! Reads finite-state machine descriptions in the FSM text format used by
//! trellis coding toolkits: a header with the input, state and output
//! alphabet sizes, followed by the `S x I` next-state matrix and the `S x I`
//! output-label matrix. Numbers are separated by arbitrary whitespace and
//! `#` starts a comment that runs to the end of the line.
//!
//! ```text
//! # (7,5) convolutional code
//! 2 4 4
//!
//! 0 2
//! 0 2
//! 1 3
//! 1 3
//!
//! 0 3
//! 3 0
//! 1 2
//! 2 1
//! ```

use anyhow::{Context, Result, anyhow};
use log::debug;
use nom::IResult;
use nom::branch::alt;
use nom::character::complete::{char, digit1, multispace1, not_line_ending};
use nom::combinator::{eof, map_res, value};
use nom::multi::{count, many0_count};
use nom::sequence::{preceded, terminated, tuple};
use std::fs;
use std::path::Path;
use trellis_core::Trellis;

/// Raw tables read from an FSM description, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsmTables {
    pub inputs: usize,
    pub states: usize,
    pub outputs: usize,
    pub next_state: Vec<usize>,
    pub output_label: Vec<usize>,
}

/// Skips whitespace and `#` comments.
fn filler(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0_count(alt((
            value((), multispace1),
            value((), preceded(char('#'), not_line_ending)),
        ))),
    )(input)
}

fn number(input: &str) -> IResult<&str, usize> {
    preceded(filler, map_res(digit1, |s: &str| s.parse::<usize>()))(input)
}

fn header(input: &str) -> IResult<&str, (usize, usize, usize)> {
    tuple((number, number, number))(input)
}

/// Parses FSM text into raw tables.
///
/// Only the shape is enforced here (three header values followed by exactly
/// `2 * S * I` entries and nothing else); range checks are left to
/// `Trellis::new`.
pub fn parse_fsm_tables(text: &str) -> Result<FsmTables> {
    let (rest, (inputs, states, outputs)) =
        header(text).map_err(|e| anyhow!("malformed FSM header: {e}"))?;

    let branches = inputs
        .checked_mul(states)
        .ok_or_else(|| anyhow!("FSM header {inputs} x {states} overflows"))?;

    let (rest, next_state) = count(number, branches)(rest)
        .map_err(|e| anyhow!("expected {branches} next-state entries: {e}"))?;
    let (_, output_label) = terminated(count(number, branches), preceded(filler, eof))(rest)
        .map_err(|e| anyhow!("expected exactly {branches} output-label entries: {e}"))?;

    Ok(FsmTables {
        inputs,
        states,
        outputs,
        next_state,
        output_label,
    })
}

/// Parses FSM text and builds a validated trellis.
pub fn parse_fsm(text: &str) -> Result<Trellis> {
    let t = parse_fsm_tables(text)?;
    let trellis = Trellis::new(t.inputs, t.states, t.outputs, t.next_state, t.output_label)?;
    Ok(trellis)
}

/// Loads an FSM file and constructs a Trellis.
///
/// # Arguments
///
/// * `path` - Path to the .fsm file
///
/// # Returns
///
/// The validated trellis, or an error if the file cannot be read, does not
/// follow the FSM layout, or describes an invalid trellis.
pub fn load_fsm_file<P: AsRef<Path>>(path: P) -> Result<Trellis> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).context("Failed to open .fsm file")?;
    let trellis = parse_fsm(&text).with_context(|| format!("in {}", path.display()))?;
    debug!(
        "loaded {}: I={} S={} O={}",
        path.display(),
        trellis.inputs(),
        trellis.states(),
        trellis.outputs()
    );
    Ok(trellis)
}
