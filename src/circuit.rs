//! The circuit graph: wires connected by two-operand gates.
//!
//! Wires live in an arena indexed by the order in which gates first reference them (for each
//! gate: output, left operand, right operand). Every lookup by external [`WireId`] goes through
//! a single id-to-slot map, so traversal state never has to be stored on the wires themselves.

use std::{
    collections::{HashMap, HashSet},
    fmt,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    Value,
    description::{CircuitDescription, GateRecord, NodeRecord},
    op::Op,
};

/// Names declared on the main component start with this prefix.
pub const TOP_LEVEL_PREFIX: &str = "0.";

/// The identifier of a wire, as assigned by the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WireId(pub usize);

/// The identifier of a gate, as assigned by the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GateId(pub usize);

impl fmt::Display for WireId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for GateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors raised while building or linearizing a circuit graph.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CircuitError {
    /// Two gates produce the same wire.
    #[error("wire {wire} is produced by both gate {first} and gate {second}")]
    DuplicateProducer {
        /// The wire with two producers.
        wire: WireId,
        /// The gate that was seen first.
        first: GateId,
        /// The gate that was seen second.
        second: GateId,
    },
    /// A gate references a wire that was never declared.
    #[error("gate {gate} references undeclared wire {wire}")]
    DanglingOperand {
        /// The offending gate.
        gate: GateId,
        /// The undeclared wire.
        wire: WireId,
    },
    /// The same wire id was declared twice.
    #[error("wire {0} is declared more than once")]
    DuplicateWire(WireId),
    /// The same gate id was declared twice.
    #[error("gate {0} is declared more than once")]
    DuplicateGate(GateId),
    /// The graph contains a cycle or its consumer counts do not add up.
    #[error("inconsistent circuit graph at wire {wire}: {reason}")]
    GraphInconsistency {
        /// The wire at which the inconsistency was detected.
        wire: WireId,
        /// What went wrong.
        reason: &'static str,
    },
}

/// A wire of the circuit together with the metadata declared for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wire {
    /// The identifier assigned by the front end.
    pub id: WireId,
    /// Names attached to the wire, in declaration order.
    pub names: Vec<String>,
    /// The constant carried by the wire, if any.
    pub constant: Option<Value>,
}

impl Wire {
    fn from_record(node: &NodeRecord) -> Self {
        Self {
            id: node.id,
            names: node.names.clone(),
            constant: node.is_const.then_some(node.const_value),
        }
    }

    /// The names declared on the main component, with the [`TOP_LEVEL_PREFIX`] stripped.
    pub fn top_level_names(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.names
            .iter()
            .filter_map(|n| n.strip_prefix(TOP_LEVEL_PREFIX))
    }

    /// Whether the wire carries a constant.
    pub fn is_const(&self) -> bool {
        self.constant.is_some()
    }
}

/// A two-operand gate: `out = lhs <op> rhs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gate {
    /// The identifier assigned by the front end.
    pub id: GateId,
    /// The operator.
    pub op: Op,
    /// The left operand.
    pub lhs: WireId,
    /// The right operand.
    pub rhs: WireId,
    /// The produced wire.
    pub out: WireId,
}

impl Gate {
    fn from_record(gate: &GateRecord) -> Self {
        Self {
            id: gate.id,
            op: gate.gate_type,
            lhs: gate.lh_input,
            rhs: gate.rh_input,
            out: gate.output,
        }
    }

    /// The two operands, left first.
    pub fn operands(&self) -> [WireId; 2] {
        [self.lhs, self.rhs]
    }
}

/// The role a wire plays in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireKind {
    /// Not produced by any gate: a circuit input or a constant.
    Leaf,
    /// Not consumed by any gate: a circuit output.
    Root,
    /// Produced by one gate and consumed by at least one other.
    Internal,
}

/// The wires and gates of an arithmetic circuit.
#[derive(Debug, Clone)]
pub struct CircuitGraph {
    /// Wires referenced by at least one gate, in first-reference order.
    wires: Vec<Wire>,
    slots: HashMap<WireId, usize>,
    gates: Vec<Gate>,
    /// For each wire slot, the index of its producing gate.
    producers: Vec<Option<usize>>,
    /// For each wire slot, the indices of the gates reading it (each gate once).
    consumers: Vec<Vec<usize>>,
    /// Every declared wire, including those no gate references, in declaration order.
    declared: Vec<Wire>,
}

impl CircuitGraph {
    /// Builds the graph from the declared nodes and gates.
    #[instrument(level = "debug", skip_all, err)]
    pub fn new(nodes: &[NodeRecord], gates: &[GateRecord]) -> Result<Self, CircuitError> {
        let mut declared = Vec::with_capacity(nodes.len());
        let mut declared_slots = HashMap::with_capacity(nodes.len());
        for node in nodes {
            if declared_slots.insert(node.id, declared.len()).is_some() {
                return Err(CircuitError::DuplicateWire(node.id));
            }
            declared.push(Wire::from_record(node));
        }

        let mut graph = Self {
            wires: vec![],
            slots: HashMap::new(),
            gates: Vec::with_capacity(gates.len()),
            producers: vec![],
            consumers: vec![],
            declared,
        };
        let mut gate_ids = HashSet::with_capacity(gates.len());
        for record in gates {
            let gate = Gate::from_record(record);
            if !gate_ids.insert(gate.id) {
                return Err(CircuitError::DuplicateGate(gate.id));
            }
            let g = graph.gates.len();
            let [out, lhs, rhs] = [gate.out, gate.lhs, gate.rhs].map(|wire| {
                let Some(&d) = declared_slots.get(&wire) else {
                    return Err(CircuitError::DanglingOperand {
                        gate: gate.id,
                        wire,
                    });
                };
                Ok(graph.slot_or_insert(d))
            });
            let (out, lhs, rhs) = (out?, lhs?, rhs?);
            if let Some(first) = graph.producers[out] {
                return Err(CircuitError::DuplicateProducer {
                    wire: gate.out,
                    first: graph.gates[first].id,
                    second: gate.id,
                });
            }
            graph.producers[out] = Some(g);
            graph.consumers[lhs].push(g);
            if rhs != lhs {
                graph.consumers[rhs].push(g);
            }
            graph.gates.push(gate);
        }
        debug!(
            wires = graph.wires.len(),
            gates = graph.gates.len(),
            "circuit graph built"
        );
        Ok(graph)
    }

    /// Builds the graph from a deserialized description.
    pub fn from_description(desc: &CircuitDescription) -> Result<Self, CircuitError> {
        Self::new(&desc.nodes, &desc.gates)
    }

    fn slot_or_insert(&mut self, declared: usize) -> usize {
        let wire = &self.declared[declared];
        if let Some(&slot) = self.slots.get(&wire.id) {
            return slot;
        }
        let slot = self.wires.len();
        self.slots.insert(wire.id, slot);
        self.wires.push(wire.clone());
        self.producers.push(None);
        self.consumers.push(vec![]);
        slot
    }

    pub(crate) fn slot(&self, id: WireId) -> Option<usize> {
        self.slots.get(&id).copied()
    }

    /// The wires referenced by the gates, in first-reference order.
    pub fn wires(&self) -> &[Wire] {
        &self.wires
    }

    /// The gates, in declaration order.
    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    /// Every declared wire, including those no gate references.
    pub fn declared_wires(&self) -> &[Wire] {
        &self.declared
    }

    /// Looks up a wire that is referenced by at least one gate.
    pub fn wire(&self, id: WireId) -> Option<&Wire> {
        self.slot(id).map(|s| &self.wires[s])
    }

    /// Wires that no gate produces.
    pub fn leaves(&self) -> impl Iterator<Item = &Wire> {
        self.wires
            .iter()
            .zip(&self.producers)
            .filter(|(_, p)| p.is_none())
            .map(|(w, _)| w)
    }

    /// Wires that no gate consumes.
    pub fn roots(&self) -> impl Iterator<Item = &Wire> {
        self.wires
            .iter()
            .zip(&self.consumers)
            .filter(|(_, c)| c.is_empty())
            .map(|(w, _)| w)
    }

    /// The gate producing the wire, if any.
    pub fn producer_of(&self, id: WireId) -> Option<&Gate> {
        let slot = self.slot(id)?;
        self.producers[slot].map(|g| &self.gates[g])
    }

    /// The gates reading the wire as an operand, in declaration order.
    pub fn consumers_of(&self, id: WireId) -> impl Iterator<Item = &Gate> {
        let consumers = match self.slot(id) {
            Some(slot) => self.consumers[slot].as_slice(),
            None => &[],
        };
        consumers.iter().map(|g| &self.gates[*g])
    }

    /// Classifies a wire, `None` if no gate references it.
    ///
    /// A wire that is neither produced nor consumed cannot be referenced by a gate, so every
    /// referenced wire has exactly one kind.
    pub fn kind_of(&self, id: WireId) -> Option<WireKind> {
        let slot = self.slot(id)?;
        Some(if self.producers[slot].is_none() {
            WireKind::Leaf
        } else if self.consumers[slot].is_empty() {
            WireKind::Root
        } else {
            WireKind::Internal
        })
    }

    pub(crate) fn producer_index(&self, slot: usize) -> Option<usize> {
        self.producers[slot]
    }
}
