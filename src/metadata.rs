//! Resolves the user-facing names of inputs, outputs and constants to linear wire indices.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::{
    Value,
    circuit::{Wire, WireKind},
    linearize::LinearCircuit,
};

/// A constant together with the wire carrying it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstantInfo {
    /// The constant.
    pub value: Value,
    /// The linear index of the wire carrying it.
    pub wire_index: usize,
}

/// The named inputs, outputs and constants of a linearized circuit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitInfo {
    /// Inputs that have to be supplied by a party or routed to a constant.
    pub input_name_to_wire_index: BTreeMap<String, usize>,
    /// Constants used by the circuit.
    pub constants: BTreeMap<String, ConstantInfo>,
    /// Outputs in declaration order.
    #[serde(with = "crate::utils::serde")]
    pub output_name_to_wire_index: Vec<(String, usize)>,
}

fn input_name(wire: &Wire) -> Option<&str> {
    wire.top_level_names().next()
}

fn constant_name(wire: &Wire) -> String {
    match wire.top_level_names().next().or(wire.names.first().map(String::as_str)) {
        Some(name) => name.to_string(),
        None => format!("const_{}", wire.id),
    }
}

fn output_name(wire: &Wire) -> String {
    match wire.top_level_names().next_back().or(wire.names.last().map(String::as_str)) {
        Some(name) => name.to_string(),
        None => format!("wire_{}", wire.id),
    }
}

impl CircuitInfo {
    /// Extracts the metadata of a linearized circuit.
    ///
    /// Wires are visited in declaration order. An input is a non-constant leaf with a top-level
    /// name (the first one if there are several), an output is any root (named after its last
    /// top-level name), and a constant is a constant leaf. Constants that no gate reads are not
    /// part of the linear order and are left out.
    #[instrument(level = "debug", skip_all)]
    pub fn extract(circuit: &LinearCircuit) -> Self {
        let graph = circuit.graph();
        let mut info = CircuitInfo::default();
        for wire in graph.declared_wires() {
            let (Some(wire_index), Some(kind)) = (circuit.index_of(wire.id), graph.kind_of(wire.id))
            else {
                if wire.is_const() {
                    warn!(wire = %wire.id, "constant is not read by any gate and is dropped");
                }
                continue;
            };
            match (kind, wire.constant) {
                (WireKind::Leaf, Some(value)) => {
                    let name = constant_name(wire);
                    let constant = ConstantInfo { value, wire_index };
                    if info.constants.insert(name.clone(), constant).is_some() {
                        warn!(%name, "constant name is declared on several wires");
                    }
                }
                (WireKind::Leaf, None) => {
                    let Some(name) = input_name(wire) else {
                        debug!(wire = %wire.id, "leaf wire has no top-level name");
                        continue;
                    };
                    if info
                        .input_name_to_wire_index
                        .insert(name.to_string(), wire_index)
                        .is_some()
                    {
                        warn!(%name, "input name is declared on several wires");
                    }
                }
                (WireKind::Root, _) => {
                    let name = output_name(wire);
                    let outputs = &mut info.output_name_to_wire_index;
                    if let Some(pos) = outputs.iter().position(|(n, _)| *n == name) {
                        warn!(%name, "output name is declared on several wires");
                        outputs.remove(pos);
                    }
                    outputs.push((name, wire_index));
                }
                (WireKind::Internal, _) => {}
            }
        }
        debug!(
            inputs = info.input_name_to_wire_index.len(),
            constants = info.constants.len(),
            outputs = info.output_name_to_wire_index.len(),
            "extracted circuit metadata"
        );
        info
    }

    /// The linear index of a named output.
    pub fn output_index(&self, name: &str) -> Option<usize> {
        self.output_name_to_wire_index
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, i)| *i)
    }

    /// The named inputs in ascending wire index order.
    pub fn inputs_by_index(&self) -> Vec<(usize, &str)> {
        let mut inputs: Vec<_> = self
            .input_name_to_wire_index
            .iter()
            .map(|(name, index)| (*index, name.as_str()))
            .collect();
        inputs.sort();
        inputs
    }

    /// Parses the metadata from its JSON representation.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serializes the metadata as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
