//! The circuit description as emitted by the front end, deserialized as-is.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    Value,
    circuit::{GateId, WireId},
    op::Op,
};

/// A set of wire records and gate records describing an arithmetic circuit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitDescription {
    /// The declared wires.
    pub nodes: Vec<NodeRecord>,
    /// The declared gates.
    pub gates: Vec<GateRecord>,
}

/// A declared wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// The identifier assigned by the front end.
    pub id: WireId,
    /// Front end signal ids merged into this wire. Not used by the compiler.
    #[serde(default)]
    pub signals: Vec<u32>,
    /// Names attached to the wire, in declaration order.
    #[serde(default)]
    pub names: Vec<String>,
    /// Whether the wire carries a constant.
    #[serde(default)]
    pub is_const: bool,
    /// The constant, only meaningful if `is_const` is set.
    #[serde(default)]
    pub const_value: Value,
}

/// A declared gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateRecord {
    /// The identifier assigned by the front end.
    pub id: GateId,
    /// The operator applied by the gate.
    pub gate_type: Op,
    /// The left operand.
    pub lh_input: WireId,
    /// The right operand.
    pub rh_input: WireId,
    /// The wire produced by the gate.
    pub output: WireId,
}

impl NodeRecord {
    /// A wire with the given names.
    pub fn named(id: usize, names: &[&str]) -> Self {
        Self {
            id: WireId(id),
            signals: vec![],
            names: names.iter().map(|n| n.to_string()).collect(),
            is_const: false,
            const_value: 0,
        }
    }

    /// A constant wire with the given names.
    pub fn constant(id: usize, value: Value, names: &[&str]) -> Self {
        Self {
            is_const: true,
            const_value: value,
            ..Self::named(id, names)
        }
    }
}

impl GateRecord {
    /// A gate computing `output = lh_input <op> rh_input`.
    pub fn new(id: usize, gate_type: Op, lh_input: usize, rh_input: usize, output: usize) -> Self {
        Self {
            id: GateId(id),
            gate_type,
            lh_input: WireId(lh_input),
            rh_input: WireId(rh_input),
            output: WireId(output),
        }
    }
}

impl CircuitDescription {
    /// Parses a description from its JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Reads and parses a JSON description file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, crate::Error> {
        let json = fs::read_to_string(path)?;
        Ok(Self::from_json_str(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_front_end_json() {
        let json = r#"{
            "nodes": [
                {"id": 10, "signals": [1], "names": ["0.a"], "is_const": false, "const_value": 0},
                {"id": 11, "signals": [2], "names": ["0.b"], "is_const": false, "const_value": 0},
                {"id": 12, "signals": [], "names": [], "is_const": true, "const_value": 50},
                {"id": 20, "names": ["0.c"]}
            ],
            "gates": [
                {"id": 1, "gate_type": "AAdd", "lh_input": 10, "rh_input": 11, "output": 20}
            ]
        }"#;
        let desc = CircuitDescription::from_json_str(json).unwrap();
        assert_eq!(desc.nodes.len(), 4);
        assert_eq!(desc.nodes[2], NodeRecord::constant(12, 50, &[]));
        assert_eq!(desc.nodes[3], NodeRecord::named(20, &["0.c"]));
        assert_eq!(desc.gates, vec![GateRecord::new(1, Op::Add, 10, 11, 20)]);
    }
}
