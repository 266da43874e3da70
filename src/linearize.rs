//! Assigns every wire a position consistent with evaluation order.
//!
//! The traversal starts at the outputs and walks towards the inputs, releasing an operand only
//! once every gate reading it has been scheduled. Reversing the resulting sequence places each
//! operand strictly before the gates consuming it, so that every gate's output index exceeds both
//! of its operand indices.

use std::collections::{HashMap, VecDeque};

use tracing::{debug, instrument};

use crate::circuit::{CircuitError, CircuitGraph, Gate, Wire, WireId};

/// A bijection from the wires of a graph to `0..wire_count`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearOrder {
    wires: Vec<WireId>,
    indices: HashMap<WireId, usize>,
}

impl LinearOrder {
    /// The linear index of a wire, `None` if the wire is not part of the graph.
    pub fn index_of(&self, id: WireId) -> Option<usize> {
        self.indices.get(&id).copied()
    }

    /// The wire at a linear index.
    pub fn wire_at(&self, index: usize) -> Option<WireId> {
        self.wires.get(index).copied()
    }

    /// The wires in ascending index order.
    pub fn wires(&self) -> &[WireId] {
        &self.wires
    }

    /// The number of ordered wires.
    pub fn len(&self) -> usize {
        self.wires.len()
    }

    /// Whether the order is empty.
    pub fn is_empty(&self) -> bool {
        self.wires.is_empty()
    }
}

/// Computes the linear order of a graph.
///
/// Wires released at the same time are scheduled first in, first out, with the outputs seeded in
/// the order the gates first reference them, so the result is reproducible for a given
/// description.
#[instrument(level = "debug", skip_all, err)]
pub fn linear_order(graph: &CircuitGraph) -> Result<LinearOrder, CircuitError> {
    let wires = graph.wires();
    let gates = graph.gates();

    // number of operand uses per wire slot; `None` once the wire has been released
    let mut consumers: Vec<Option<usize>> = vec![Some(0); wires.len()];
    for gate in gates {
        for operand in gate.operands() {
            let slot = slot_of(graph, operand)?;
            if let Some(n) = consumers[slot].as_mut() {
                *n += 1;
            }
        }
    }

    let mut queue = VecDeque::new();
    for (slot, count) in consumers.iter_mut().enumerate() {
        if *count == Some(0) {
            *count = None;
            queue.push_back(slot);
        }
    }
    debug!(roots = queue.len(), "seeded linearization");

    let mut sequence = Vec::with_capacity(wires.len());
    while let Some(slot) = queue.pop_front() {
        sequence.push(slot);
        let Some(g) = graph.producer_index(slot) else {
            continue;
        };
        for operand in gates[g].operands() {
            let operand_slot = slot_of(graph, operand)?;
            let Some(count) = consumers[operand_slot].as_mut() else {
                return Err(CircuitError::GraphInconsistency {
                    wire: operand,
                    reason: "operand consumed after all of its consumers were scheduled",
                });
            };
            *count -= 1;
            if *count == 0 {
                consumers[operand_slot] = None;
                queue.push_back(operand_slot);
            }
        }
    }

    if sequence.len() != wires.len() {
        let stuck = consumers
            .iter()
            .position(Option::is_some)
            .map(|slot| wires[slot].id);
        return Err(CircuitError::GraphInconsistency {
            wire: stuck.unwrap_or(wires[0].id),
            reason: "wire is not reachable from any output, the circuit contains a cycle",
        });
    }

    let wires: Vec<WireId> = sequence.into_iter().rev().map(|s| wires[s].id).collect();
    let indices = wires.iter().enumerate().map(|(i, w)| (*w, i)).collect();
    debug!(wires = wires.len(), "linearized circuit");
    Ok(LinearOrder { wires, indices })
}

fn slot_of(graph: &CircuitGraph, id: WireId) -> Result<usize, CircuitError> {
    graph.slot(id).ok_or(CircuitError::GraphInconsistency {
        wire: id,
        reason: "gate references a wire outside of the graph",
    })
}

/// A circuit graph together with its linear order.
#[derive(Debug, Clone)]
pub struct LinearCircuit {
    graph: CircuitGraph,
    order: LinearOrder,
}

impl CircuitGraph {
    /// Linearizes the graph, see [`linear_order`].
    pub fn linearize(self) -> Result<LinearCircuit, CircuitError> {
        let order = linear_order(&self)?;
        Ok(LinearCircuit { graph: self, order })
    }
}

impl LinearCircuit {
    /// The underlying graph.
    pub fn graph(&self) -> &CircuitGraph {
        &self.graph
    }

    /// The linear order of the graph's wires.
    pub fn order(&self) -> &LinearOrder {
        &self.order
    }

    /// The linear index of a wire.
    pub fn index_of(&self, id: WireId) -> Option<usize> {
        self.order.index_of(id)
    }

    /// The wires in ascending index order.
    pub fn wires(&self) -> impl Iterator<Item = (usize, &Wire)> {
        self.order
            .wires()
            .iter()
            .enumerate()
            .filter_map(|(i, id)| self.graph.wire(*id).map(|w| (i, w)))
    }

    /// The gates in ascending order of their output index.
    pub fn gates(&self) -> impl Iterator<Item = &Gate> {
        self.order
            .wires()
            .iter()
            .filter_map(|id| self.graph.producer_of(*id))
    }
}
