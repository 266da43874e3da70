//! Translates a canonical circuit into an [MP-SPDZ](https://github.com/data61/MP-SPDZ) program.
//!
//! The generated program keeps one list entry per wire. Leaf wires are initialized either with a
//! public constant (`cint`) or with a private value read from the owning party
//! (`sint.get_input_from`), then every gate becomes one assignment and every output is revealed to
//! all parties and printed:
//!
//! ```text
//! wires = [sint.get_input_from(1), sint.get_input_from(0), cint(50), None]
//! wires[3] = wires[1] + wires[0]
//! # Print outputs
//! print_ln('outputs[0]: c=%s', wires[3].reveal())
//! ```
//!
//! Each party's private inputs are read sequentially in ascending wire order, which is the order
//! in which [`crate::inputs`] lays out the input files.

use std::{collections::BTreeMap, fs, path::Path};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    Value,
    bristol::{BristolCircuit, ParseError},
    metadata::CircuitInfo,
};

/// Which party supplies which input, and which inputs are public constants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MpcSettings {
    /// Input name to the index of the party supplying it.
    pub inputs_from: BTreeMap<String, usize>,
    /// Input name to a public value that is compiled into the program.
    #[serde(default)]
    pub constants: BTreeMap<String, Value>,
    /// The number of parties taking part in the computation.
    pub num_parties: usize,
}

impl MpcSettings {
    /// Parses the settings from their JSON representation.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Reads and parses a JSON settings file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, crate::Error> {
        let json = fs::read_to_string(path)?;
        Ok(Self::from_json_str(&json)?)
    }
}

/// How a leaf wire obtains its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireSource {
    /// A public constant.
    Constant(Value),
    /// A private value supplied by the party with this index.
    Party(usize),
}

/// Errors raised while resolving where each wire's value comes from.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProgramError {
    /// The circuit is not in canonical form.
    #[error(transparent)]
    InvalidCircuit(#[from] ParseError),
    /// A leaf wire is neither a constant nor supplied by a party.
    #[error("input wire {wire_index} ({}) is neither a constant nor supplied by a party", .name.as_deref().unwrap_or("unnamed"))]
    UnresolvedInput {
        /// The linear index of the wire.
        wire_index: usize,
        /// The input name of the wire, if it has one.
        name: Option<String>,
    },
    /// The settings route an input that the circuit does not have.
    #[error("the circuit has no input named '{0}'")]
    UnknownInput(String),
    /// The settings assign an input to a party that does not exist.
    #[error("input '{name}' is assigned to party {party}, but there are only {num_parties} parties")]
    UnknownParty {
        /// The input name.
        name: String,
        /// The assigned party.
        party: usize,
        /// The number of parties.
        num_parties: usize,
    },
    /// Two initializers were given for the same wire.
    #[error("wire {wire_index} is initialized twice, the second time by '{name}'")]
    WireAssignedTwice {
        /// The linear index of the wire.
        wire_index: usize,
        /// The name of the second initializer.
        name: String,
    },
    /// The metadata references a wire outside of the circuit.
    #[error("'{name}' refers to wire {wire_index}, but the circuit only has {wires} wires")]
    WireOutOfRange {
        /// The name of the input, constant or output.
        name: String,
        /// The referenced index.
        wire_index: usize,
        /// The number of wires in the circuit.
        wires: usize,
    },
    /// The metadata marks a wire that is computed by a gate as an input or constant.
    #[error("'{name}' refers to wire {wire_index}, which is computed by a gate")]
    NotAnInput {
        /// The name of the input or constant.
        name: String,
        /// The referenced index.
        wire_index: usize,
    },
}

/// Resolves the source of every leaf wire; gate outputs are left as `None`.
///
/// Circuit constants come from the metadata, the settings may additionally route named inputs to
/// public constants or to parties. Fails if the circuit is not canonical or any leaf wire stays
/// unresolved.
#[instrument(level = "debug", skip_all, err)]
pub fn wire_sources(
    circuit: &BristolCircuit,
    info: &CircuitInfo,
    settings: &MpcSettings,
) -> Result<Vec<Option<WireSource>>, ProgramError> {
    circuit.validate()?;
    let leaves = circuit.leaf_indices();
    let mut sources = vec![None; circuit.wires];
    let mut assign = |name: &str, wire_index: usize, source: WireSource| {
        let Some(slot) = sources.get_mut(wire_index) else {
            return Err(ProgramError::WireOutOfRange {
                name: name.to_string(),
                wire_index,
                wires: circuit.wires,
            });
        };
        if leaves.binary_search(&wire_index).is_err() {
            return Err(ProgramError::NotAnInput {
                name: name.to_string(),
                wire_index,
            });
        }
        if slot.replace(source).is_some() {
            return Err(ProgramError::WireAssignedTwice {
                wire_index,
                name: name.to_string(),
            });
        }
        Ok(())
    };
    let input_index = |name: &str| {
        info.input_name_to_wire_index
            .get(name)
            .copied()
            .ok_or_else(|| ProgramError::UnknownInput(name.to_string()))
    };

    for (name, constant) in &info.constants {
        assign(name, constant.wire_index, WireSource::Constant(constant.value))?;
    }
    for (name, value) in &settings.constants {
        assign(name, input_index(name)?, WireSource::Constant(*value))?;
    }
    for (name, party) in &settings.inputs_from {
        if *party >= settings.num_parties {
            return Err(ProgramError::UnknownParty {
                name: name.clone(),
                party: *party,
                num_parties: settings.num_parties,
            });
        }
        assign(name, input_index(name)?, WireSource::Party(*party))?;
    }

    if let Some(&wire_index) = leaves.iter().find(|w| sources[**w].is_none()) {
        let name = info
            .input_name_to_wire_index
            .iter()
            .find(|(_, i)| **i == wire_index)
            .map(|(n, _)| n.clone());
        return Err(ProgramError::UnresolvedInput { wire_index, name });
    }
    for (name, wire_index) in &info.output_name_to_wire_index {
        if *wire_index >= circuit.wires {
            return Err(ProgramError::WireOutOfRange {
                name: name.clone(),
                wire_index: *wire_index,
                wires: circuit.wires,
            });
        }
    }
    Ok(sources)
}

/// Escapes a name for use inside a single-quoted `print_ln` format string.
fn escape(name: &str) -> String {
    name.replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('%', "%%")
}

/// Generates the MP-SPDZ program evaluating the circuit.
///
/// The output is deterministic: wire initializers in index order, one assignment per gate in
/// ascending output order, then one reveal per output in declaration order.
#[instrument(level = "debug", skip_all, err)]
pub fn generate_program(
    circuit: &BristolCircuit,
    info: &CircuitInfo,
    settings: &MpcSettings,
) -> Result<String, ProgramError> {
    let sources = wire_sources(circuit, info, settings)?;
    let inits: Vec<String> = sources
        .iter()
        .map(|source| match source {
            Some(WireSource::Constant(value)) => format!("cint({value})"),
            Some(WireSource::Party(party)) => format!("sint.get_input_from({party})"),
            None => "None".to_string(),
        })
        .collect();

    let outputs = &info.output_name_to_wire_index;
    let mut lines = Vec::with_capacity(circuit.gates.len() + outputs.len() + 2);
    lines.push(format!("wires = [{}]", inits.join(", ")));
    for gate in &circuit.gates {
        lines.push(format!(
            "wires[{}] = wires[{}] {} wires[{}]",
            gate.out,
            gate.lhs,
            gate.op.infix(),
            gate.rhs
        ));
    }
    lines.push("# Print outputs".to_string());
    for (i, (name, wire_index)) in outputs.iter().enumerate() {
        lines.push(format!(
            "print_ln('outputs[{i}]: {}=%s', wires[{wire_index}].reveal())",
            escape(name)
        ));
    }
    debug!(lines = lines.len(), "generated program");
    Ok(lines.join("\n") + "\n")
}
