//! A compiler from arithmetic circuit descriptions to [MP-SPDZ](https://github.com/data61/MP-SPDZ)
//! programs.
//!
//! A circuit front end describes a computation as a graph of wires connected by two-operand
//! arithmetic gates. This crate orders that graph into a canonical, topologically sorted form,
//! serializes it in a [Bristol fashion](https://nigelsmart.github.io/MPC-Circuits/) variant,
//! extracts which wire carries which named input, constant and output, and generates the program
//! and per-party input files that an MPC engine runs.
//!
//! ## Main Components
//!
//! * [`description`]: The circuit description as produced by the front end.
//! * [`circuit`]: The validated circuit graph.
//! * [`linearize`]: The topological ordering of the graph into linear wire indices.
//! * [`bristol`]: The canonical circuit text.
//! * [`metadata`]: Names of inputs, constants and outputs mapped to linear indices.
//! * [`program`]: The generated MP-SPDZ program and the party routing it is based on.
//! * [`inputs`]: Per-party input files in the order the program reads them.
//! * [`eval`]: Plaintext evaluation of a compiled circuit.
//! * [`artifacts`]: Reading and writing all of the above.
//!
//! ## Example
//!
//! ```
//! use arithc::{
//!     compile,
//!     description::CircuitDescription,
//!     program::{MpcSettings, generate_program},
//! };
//!
//! # fn main() -> Result<(), arithc::Error> {
//! let description = CircuitDescription::from_json_str(r#"{
//!     "nodes": [
//!         {"id": 10, "names": ["0.a"]},
//!         {"id": 11, "names": ["0.b"]},
//!         {"id": 20, "names": ["0.c"]}
//!     ],
//!     "gates": [{"id": 1, "gate_type": "AAdd", "lh_input": 10, "rh_input": 11, "output": 20}]
//! }"#)?;
//! let compiled = compile(&description)?;
//! assert_eq!(compiled.circuit.gates.len(), 1);
//!
//! let settings =
//!     MpcSettings::from_json_str(r#"{"inputs_from": {"a": 0, "b": 1}, "num_parties": 2}"#)?;
//! let program = generate_program(&compiled.circuit, &compiled.info, &settings)?;
//! assert!(program.contains("print_ln('outputs[0]: c=%s', wires[2].reveal())"));
//! # Ok(())
//! # }
//! ```
#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use tracing::{debug, instrument};

pub mod artifacts;
pub mod bristol;
pub mod circuit;
pub mod description;
pub mod eval;
pub mod inputs;
pub mod linearize;
pub mod metadata;
pub mod op;
pub mod program;
mod utils;

use crate::{
    bristol::{BristolCircuit, ParseError},
    circuit::{CircuitError, CircuitGraph},
    description::CircuitDescription,
    eval::EvalError,
    inputs::InputError,
    metadata::CircuitInfo,
    program::ProgramError,
};

/// The value carried by a wire.
pub type Value = i64;

/// Errors raised by any stage of the compiler.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The circuit graph is invalid.
    #[error(transparent)]
    Circuit(#[from] CircuitError),
    /// The canonical circuit text is malformed.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// The program could not be generated.
    #[error(transparent)]
    Program(#[from] ProgramError),
    /// A party's inputs could not be laid out.
    #[error(transparent)]
    Input(#[from] InputError),
    /// The circuit could not be evaluated.
    #[error(transparent)]
    Eval(#[from] EvalError),
    /// Reading or writing a file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A JSON document is malformed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A circuit in canonical form together with its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compiled {
    /// The canonical circuit.
    pub circuit: BristolCircuit,
    /// Names of its inputs, constants and outputs.
    pub info: CircuitInfo,
}

/// Validates, linearizes and serializes a circuit description and extracts its metadata.
#[instrument(level = "debug", skip_all, err)]
pub fn compile(description: &CircuitDescription) -> Result<Compiled, CircuitError> {
    let linear = CircuitGraph::from_description(description)?.linearize()?;
    let circuit = BristolCircuit::from_linear(&linear);
    let info = CircuitInfo::extract(&linear);
    debug!(
        wires = circuit.wires,
        gates = circuit.gates.len(),
        "compiled circuit"
    );
    Ok(Compiled { circuit, info })
}
