//! Evaluates a canonical circuit in the clear.
//!
//! Mirrors the generated program: leaf wires are initialized from the same constants and party
//! routing, every party's inputs are consumed in ascending wire order, and the gates are applied
//! in the order they appear. Useful to check a compiled circuit before running it under MPC.

use tracing::{debug, instrument};

use crate::{
    Value,
    bristol::BristolCircuit,
    metadata::CircuitInfo,
    op::Op,
    program::{MpcSettings, ProgramError, WireSource, wire_sources},
};

/// Errors raised during plaintext evaluation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    /// The wire sources could not be resolved.
    #[error(transparent)]
    Program(#[from] ProgramError),
    /// A party supplied fewer values than the circuit reads from it.
    #[error("party {party} supplied no value for wire {wire_index}")]
    MissingPartyInput {
        /// The party.
        party: usize,
        /// The wire that should have received the value.
        wire_index: usize,
    },
    /// A gate divides by zero.
    #[error("division by zero computing wire {wire_index}")]
    DivisionByZero {
        /// The wire computed by the gate.
        wire_index: usize,
    },
    /// A gate overflows a 64-bit signed integer.
    #[error("overflow computing wire {wire_index}")]
    Overflow {
        /// The wire computed by the gate.
        wire_index: usize,
    },
    /// A gate or output refers to a wire that has not been computed yet or does not exist.
    #[error("wire {wire_index} is read before it is computed")]
    Uninitialized {
        /// The wire that is read.
        wire_index: usize,
    },
}

fn apply(op: Op, lhs: Value, rhs: Value, wire_index: usize) -> Result<Value, EvalError> {
    let overflow = EvalError::Overflow { wire_index };
    Ok(match op {
        Op::Add => lhs.checked_add(rhs).ok_or(overflow)?,
        Op::Sub => lhs.checked_sub(rhs).ok_or(overflow)?,
        Op::Mul => lhs.checked_mul(rhs).ok_or(overflow)?,
        Op::Div if rhs == 0 => return Err(EvalError::DivisionByZero { wire_index }),
        Op::Div => lhs.checked_div(rhs).ok_or(overflow)?,
        Op::Eq => (lhs == rhs).into(),
        Op::Neq => (lhs != rhs).into(),
        Op::Lt => (lhs < rhs).into(),
        Op::Leq => (lhs <= rhs).into(),
        Op::Gt => (lhs > rhs).into(),
        Op::Geq => (lhs >= rhs).into(),
    })
}

/// Evaluates the circuit on the given party inputs and returns the outputs in declaration order.
///
/// `party_inputs[p]` holds the values of party `p` in the layout produced by
/// [`crate::inputs::party_inputs`]. Comparisons yield `1` or `0`, division truncates toward zero.
#[instrument(level = "debug", skip_all, err)]
pub fn simulate(
    circuit: &BristolCircuit,
    info: &CircuitInfo,
    settings: &MpcSettings,
    party_inputs: &[Vec<Value>],
) -> Result<Vec<(String, Value)>, EvalError> {
    let sources = wire_sources(circuit, info, settings)?;
    let mut next_input = vec![0; settings.num_parties];
    let mut values: Vec<Option<Value>> = Vec::with_capacity(circuit.wires);
    for (wire_index, source) in sources.iter().enumerate() {
        let value = match *source {
            Some(WireSource::Constant(value)) => Some(value),
            Some(WireSource::Party(party)) => {
                let value = party_inputs
                    .get(party)
                    .and_then(|inputs| inputs.get(next_input[party]))
                    .ok_or(EvalError::MissingPartyInput { party, wire_index })?;
                next_input[party] += 1;
                Some(*value)
            }
            None => None,
        };
        values.push(value);
    }

    let read = |values: &[Option<Value>], wire_index: usize| {
        values
            .get(wire_index)
            .copied()
            .flatten()
            .ok_or(EvalError::Uninitialized { wire_index })
    };
    for gate in &circuit.gates {
        let lhs = read(&values, gate.lhs)?;
        let rhs = read(&values, gate.rhs)?;
        let value = apply(gate.op, lhs, rhs, gate.out)?;
        let slot = values.get_mut(gate.out).ok_or(EvalError::Uninitialized {
            wire_index: gate.out,
        })?;
        *slot = Some(value);
    }
    debug!(gates = circuit.gates.len(), "evaluated circuit");

    info.output_name_to_wire_index
        .iter()
        .map(|(name, wire_index)| Ok((name.clone(), read(&values, *wire_index)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crate::{bristol::BristolGate, metadata::ConstantInfo};

    use super::*;

    // out = (a - b) / d, flag = a < b
    fn circuit() -> (BristolCircuit, CircuitInfo, MpcSettings) {
        let gate = |lhs, rhs, out, op| BristolGate { lhs, rhs, out, op };
        let circuit = BristolCircuit {
            wires: 6,
            inputs: 3,
            outputs: 2,
            gates: vec![
                gate(0, 1, 3, Op::Sub),
                gate(0, 1, 4, Op::Lt),
                gate(3, 2, 5, Op::Div),
            ],
        };
        let info = CircuitInfo {
            input_name_to_wire_index: [("a".to_string(), 0), ("b".to_string(), 1)].into(),
            constants: [(
                "d".to_string(),
                ConstantInfo {
                    value: 4,
                    wire_index: 2,
                },
            )]
            .into(),
            output_name_to_wire_index: vec![("out".to_string(), 5), ("flag".to_string(), 4)],
        };
        let settings = MpcSettings {
            inputs_from: [("a".to_string(), 0), ("b".to_string(), 0)].into(),
            constants: BTreeMap::new(),
            num_parties: 2,
        };
        (circuit, info, settings)
    }

    #[test]
    fn evaluate_outputs_in_order() {
        let (circuit, info, settings) = circuit();
        assert_eq!(
            simulate(&circuit, &info, &settings, &[vec![3, 10], vec![]]),
            Ok(vec![("out".to_string(), -1), ("flag".to_string(), 1)])
        );
        assert_eq!(
            simulate(&circuit, &info, &settings, &[vec![20, 10]]),
            Ok(vec![("out".to_string(), 2), ("flag".to_string(), 0)])
        );
    }

    #[test]
    fn missing_input_is_reported() {
        let (circuit, info, settings) = circuit();
        assert_eq!(
            simulate(&circuit, &info, &settings, &[vec![3]]),
            Err(EvalError::MissingPartyInput {
                party: 0,
                wire_index: 1
            })
        );
    }

    #[test]
    fn arithmetic_errors() {
        let (circuit, mut info, settings) = circuit();
        assert_eq!(
            simulate(&circuit, &info, &settings, &[vec![Value::MIN, 1]]),
            Err(EvalError::Overflow { wire_index: 3 })
        );
        info.constants.get_mut("d").unwrap().value = 0;
        assert_eq!(
            simulate(&circuit, &info, &settings, &[vec![1, 1]]),
            Err(EvalError::DivisionByZero { wire_index: 5 })
        );
    }

    #[test]
    fn unresolved_input_fails_before_evaluation() {
        let (circuit, info, mut settings) = circuit();
        settings.inputs_from.remove("b");
        assert!(matches!(
            simulate(&circuit, &info, &settings, &[vec![1, 2]]),
            Err(EvalError::Program(ProgramError::UnresolvedInput {
                wire_index: 1,
                ..
            }))
        ));
    }
}
