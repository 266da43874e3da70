//! The canonical text format of a linearized circuit, a variant of
//! [Bristol fashion](https://nigelsmart.github.io/MPC-Circuits/) where every input and output is a
//! single field element.
//!
//! ```text
//! 1 3
//! 2 1 1
//! 1 1
//!
//! 2 1 0 1 2 add
//! ```
//!
//! The first line holds the number of gates and wires, the next two the number of inputs and
//! outputs followed by their arity (always `1`), then after a blank line one line per gate in
//! ascending output order: `2 1 <lhs> <rhs> <out> <op>`.

use std::{fmt, io, str::FromStr};

use tracing::{debug, instrument};

use crate::{circuit::Gate, linearize::LinearCircuit, op::Op};

/// A gate of a canonical circuit, referencing wires by their linear index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BristolGate {
    /// Index of the left operand.
    pub lhs: usize,
    /// Index of the right operand.
    pub rhs: usize,
    /// Index of the produced wire.
    pub out: usize,
    /// The operator.
    pub op: Op,
}

/// A linearized circuit in canonical form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BristolCircuit {
    /// The total number of wires.
    pub wires: usize,
    /// The number of leaf wires (inputs and constants).
    pub inputs: usize,
    /// The number of root wires (outputs).
    pub outputs: usize,
    /// The gates, in ascending output order.
    pub gates: Vec<BristolGate>,
}

/// Errors raised while parsing canonical circuit text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The text ended before the header was complete.
    #[error("missing {0} line")]
    MissingHeader(&'static str),
    /// A token that should be a number is not.
    #[error("line {line}: '{token}' is not a number")]
    InvalidNumber {
        /// 1-based line number.
        line: usize,
        /// The offending token.
        token: String,
    },
    /// A line has the wrong number of tokens.
    #[error("line {line}: expected {expected} entries, found {actual}")]
    WrongLength {
        /// 1-based line number.
        line: usize,
        /// The number of entries implied by the line.
        expected: usize,
        /// The number of entries found.
        actual: usize,
    },
    /// An arity line contains an entry other than `1`.
    #[error("line {line}: only single-element inputs and outputs are supported, found {arity}")]
    UnsupportedWidth {
        /// 1-based line number.
        line: usize,
        /// The offending arity.
        arity: usize,
    },
    /// A gate line is not a two-input, one-output gate.
    #[error("line {line}: only gates with 2 inputs and 1 output are supported, found {inputs} {outputs}")]
    UnsupportedArity {
        /// 1-based line number.
        line: usize,
        /// Number of inputs declared by the gate.
        inputs: usize,
        /// Number of outputs declared by the gate.
        outputs: usize,
    },
    /// A gate line names an unknown operator.
    #[error("line {line}: unknown operator '{op}'")]
    UnknownOp {
        /// 1-based line number.
        line: usize,
        /// The unknown operator.
        op: String,
    },
    /// A gate references a wire index outside of `0..wires`.
    #[error("line {line}: wire {wire} is out of range for {wires} wires")]
    WireOutOfRange {
        /// 1-based line number.
        line: usize,
        /// The offending index.
        wire: usize,
        /// The number of wires in the header.
        wires: usize,
    },
    /// The number of gate lines does not match the header.
    #[error("expected {expected} gates, found {actual}")]
    GateCountMismatch {
        /// The number of gates in the header.
        expected: usize,
        /// The number of gate lines.
        actual: usize,
    },
    /// A gate writes a wire index outside of `0..wires`.
    #[error("gate writes wire {out}, but the circuit only has {wires} wires")]
    OutputOutOfRange {
        /// The output of the gate.
        out: usize,
        /// The number of wires in the header.
        wires: usize,
    },
    /// Two gates write the same wire.
    #[error("wire {0} is written by more than one gate")]
    DuplicateOutput(usize),
    /// A gate is listed after a gate with a higher output index.
    #[error("gate writing wire {out} is listed after the gate writing wire {previous}")]
    GatesOutOfOrder {
        /// The output of the misplaced gate.
        out: usize,
        /// The output of the gate listed before it.
        previous: usize,
    },
    /// The header input count does not match the wires no gate writes.
    #[error("header declares {declared} inputs, but {leaves} wires are not written by any gate")]
    InputCountMismatch {
        /// The input count of the header.
        declared: usize,
        /// The number of wires not written by any gate.
        leaves: usize,
    },
    /// The header output count does not match the wires no gate reads.
    #[error("header declares {declared} outputs, but {roots} wires are not read by any gate")]
    OutputCountMismatch {
        /// The output count of the header.
        declared: usize,
        /// The number of wires not read by any gate.
        roots: usize,
    },
    /// A gate reads a wire that is not computed before it.
    #[error("gate writing wire {out} reads wire {operand} which is not computed before it")]
    OperandAfterOutput {
        /// The output of the gate.
        out: usize,
        /// The operand that does not precede it.
        operand: usize,
    },
}

impl BristolCircuit {
    /// Converts a linearized circuit into canonical form.
    pub fn from_linear(circuit: &LinearCircuit) -> Self {
        let graph = circuit.graph();
        let gate = |g: &Gate| {
            Some(BristolGate {
                lhs: circuit.index_of(g.lhs)?,
                rhs: circuit.index_of(g.rhs)?,
                out: circuit.index_of(g.out)?,
                op: g.op,
            })
        };
        let gates: Vec<BristolGate> = circuit.gates().filter_map(gate).collect();
        debug_assert_eq!(gates.len(), graph.gates().len());
        Self {
            wires: circuit.order().len(),
            inputs: graph.leaves().count(),
            outputs: graph.roots().count(),
            gates,
        }
    }

    /// Indices of the wires that no gate produces, ascending.
    pub fn leaf_indices(&self) -> Vec<usize> {
        let mut produced: Vec<usize> = self.gates.iter().map(|g| g.out).collect();
        produced.sort_unstable();
        (0..self.wires)
            .filter(|w| produced.binary_search(w).is_err())
            .collect()
    }

    /// Checks that the gates form a canonical circuit consistent with the header.
    ///
    /// Gates must write distinct wires in ascending order and only read wires with a lower index
    /// than their output. The unwritten wires must match the input count and the unread wires
    /// the output count. Nothing is allocated per wire until the input count has been checked.
    pub fn validate(&self) -> Result<(), ParseError> {
        let mut previous = None;
        for gate in &self.gates {
            if gate.out >= self.wires {
                return Err(ParseError::OutputOutOfRange {
                    out: gate.out,
                    wires: self.wires,
                });
            }
            match previous {
                Some(p) if p == gate.out => return Err(ParseError::DuplicateOutput(gate.out)),
                Some(p) if p > gate.out => {
                    return Err(ParseError::GatesOutOfOrder {
                        out: gate.out,
                        previous: p,
                    });
                }
                _ => {}
            }
            previous = Some(gate.out);
            for operand in [gate.lhs, gate.rhs] {
                if operand >= gate.out {
                    return Err(ParseError::OperandAfterOutput {
                        out: gate.out,
                        operand,
                    });
                }
            }
        }
        // outputs are distinct and in range, so every other wire is a leaf
        let leaves = self.wires - self.gates.len();
        if leaves != self.inputs {
            return Err(ParseError::InputCountMismatch {
                declared: self.inputs,
                leaves,
            });
        }
        let mut read = vec![false; self.wires];
        for gate in &self.gates {
            read[gate.lhs] = true;
            read[gate.rhs] = true;
        }
        let roots = read.iter().filter(|r| !**r).count();
        if roots != self.outputs {
            return Err(ParseError::OutputCountMismatch {
                declared: self.outputs,
                roots,
            });
        }
        Ok(())
    }

    /// Writes the canonical text to a sink.
    #[instrument(level = "debug", skip_all, err)]
    pub fn write_to(&self, mut w: impl io::Write) -> io::Result<()> {
        write!(w, "{self}")?;
        debug!(gates = self.gates.len(), "wrote bristol circuit");
        Ok(())
    }
}

fn write_arity_line(f: &mut fmt::Formatter<'_>, n: usize) -> fmt::Result {
    write!(f, "{n}")?;
    for _ in 0..n {
        f.write_str(" 1")?;
    }
    writeln!(f)
}

impl fmt::Display for BristolCircuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", self.gates.len(), self.wires)?;
        write_arity_line(f, self.inputs)?;
        write_arity_line(f, self.outputs)?;
        writeln!(f)?;
        for BristolGate { lhs, rhs, out, op } in &self.gates {
            writeln!(f, "2 1 {lhs} {rhs} {out} {op}")?;
        }
        Ok(())
    }
}

fn number(line: usize, token: &str) -> Result<usize, ParseError> {
    token.parse().map_err(|_| ParseError::InvalidNumber {
        line,
        token: token.to_string(),
    })
}

fn arity_line(line: usize, text: Option<&str>, what: &'static str) -> Result<usize, ParseError> {
    let text = text.ok_or(ParseError::MissingHeader(what))?;
    let mut tokens = text.split_whitespace();
    let n = number(line, tokens.next().ok_or(ParseError::MissingHeader(what))?)?;
    let widths = tokens
        .map(|t| number(line, t))
        .collect::<Result<Vec<_>, _>>()?;
    if widths.len() != n {
        return Err(ParseError::WrongLength {
            line,
            expected: n + 1,
            actual: widths.len() + 1,
        });
    }
    if let Some(&arity) = widths.iter().find(|w| **w != 1) {
        return Err(ParseError::UnsupportedWidth { line, arity });
    }
    Ok(n)
}

impl FromStr for BristolCircuit {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lines = s.lines().enumerate().map(|(i, l)| (i + 1, l));

        let (line, header) = lines.next().ok_or(ParseError::MissingHeader("size"))?;
        let header: Vec<&str> = header.split_whitespace().collect();
        let [num_gates, wires] = header[..] else {
            return Err(ParseError::WrongLength {
                line,
                expected: 2,
                actual: header.len(),
            });
        };
        let num_gates = number(line, num_gates)?;
        let wires = number(line, wires)?;
        let inputs = arity_line(2, lines.next().map(|(_, l)| l), "input")?;
        let outputs = arity_line(3, lines.next().map(|(_, l)| l), "output")?;

        let mut gates = vec![];
        for (line, text) in lines {
            let tokens: Vec<&str> = text.split_whitespace().collect();
            if tokens.is_empty() {
                continue;
            }
            let [n_in, n_out, lhs, rhs, out, op] = tokens[..] else {
                return Err(ParseError::WrongLength {
                    line,
                    expected: 6,
                    actual: tokens.len(),
                });
            };
            let (n_in, n_out) = (number(line, n_in)?, number(line, n_out)?);
            if (n_in, n_out) != (2, 1) {
                return Err(ParseError::UnsupportedArity {
                    line,
                    inputs: n_in,
                    outputs: n_out,
                });
            }
            let op = Op::from_name(op).ok_or_else(|| ParseError::UnknownOp {
                line,
                op: op.to_string(),
            })?;
            let [lhs, rhs, out] = [lhs, rhs, out].map(|t| number(line, t));
            let (lhs, rhs, out) = (lhs?, rhs?, out?);
            if let Some(&wire) = [lhs, rhs, out].iter().find(|w| **w >= wires) {
                return Err(ParseError::WireOutOfRange { line, wire, wires });
            }
            gates.push(BristolGate { lhs, rhs, out, op });
        }
        if gates.len() != num_gates {
            return Err(ParseError::GateCountMismatch {
                expected: num_gates,
                actual: gates.len(),
            });
        }
        Ok(Self {
            wires,
            inputs,
            outputs,
            gates,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        circuit::CircuitGraph,
        description::{GateRecord, NodeRecord},
    };

    use super::*;

    #[test]
    fn serialize_single_gate() {
        let nodes = [
            NodeRecord::named(10, &["0.a"]),
            NodeRecord::named(11, &["0.b"]),
            NodeRecord::named(20, &["0.c"]),
        ];
        let graph = CircuitGraph::new(&nodes, &[GateRecord::new(1, Op::Add, 10, 11, 20)]).unwrap();
        let circuit = BristolCircuit::from_linear(&graph.linearize().unwrap());
        let text = circuit.to_string();
        assert!(
            text == "1 3\n2 1 1\n1 1\n\n2 1 0 1 2 add\n"
                || text == "1 3\n2 1 1\n1 1\n\n2 1 1 0 2 add\n",
            "{text}"
        );
        let mut buf = vec![];
        circuit.write_to(&mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), text);
    }

    #[test]
    fn parse_canonical_and_legacy_names() {
        let text = "2 5\n3 1 1 1\n1 1\n\n2 1 0 1 3 mul\n2 1 3 2 4 AAdd\n";
        let circuit: BristolCircuit = text.parse().unwrap();
        assert_eq!(circuit.wires, 5);
        assert_eq!(circuit.inputs, 3);
        assert_eq!(circuit.outputs, 1);
        assert_eq!(
            circuit.gates,
            vec![
                BristolGate {
                    lhs: 0,
                    rhs: 1,
                    out: 3,
                    op: Op::Mul
                },
                BristolGate {
                    lhs: 3,
                    rhs: 2,
                    out: 4,
                    op: Op::Add
                },
            ]
        );
        assert_eq!(circuit.leaf_indices(), vec![0, 1, 2]);
        circuit.validate().unwrap();
        assert_eq!(
            circuit.to_string(),
            "2 5\n3 1 1 1\n1 1\n\n2 1 0 1 3 mul\n2 1 3 2 4 add\n"
        );
    }

    #[test]
    fn reject_malformed_text() {
        assert_eq!(
            "".parse::<BristolCircuit>(),
            Err(ParseError::MissingHeader("size"))
        );
        assert_eq!(
            "1 3\n2 1\n1 1\n\n2 1 0 1 2 add\n".parse::<BristolCircuit>(),
            Err(ParseError::WrongLength {
                line: 2,
                expected: 3,
                actual: 2
            })
        );
        assert_eq!(
            "1 3\n2 1 64\n1 1\n\n2 1 0 1 2 add\n".parse::<BristolCircuit>(),
            Err(ParseError::UnsupportedWidth { line: 2, arity: 64 })
        );
        assert_eq!(
            "1 3\n2 1 1\n1 1\n\n1 1 0 2 INV\n".parse::<BristolCircuit>(),
            Err(ParseError::WrongLength {
                line: 5,
                expected: 6,
                actual: 5
            })
        );
        assert_eq!(
            "1 3\n2 1 1\n1 1\n\n3 1 0 1 2 add\n".parse::<BristolCircuit>(),
            Err(ParseError::UnsupportedArity {
                line: 5,
                inputs: 3,
                outputs: 1
            })
        );
        assert_eq!(
            "1 3\n2 1 1\n1 1\n\n2 1 0 1 2 xor\n".parse::<BristolCircuit>(),
            Err(ParseError::UnknownOp {
                line: 5,
                op: "xor".into()
            })
        );
        assert_eq!(
            "1 3\n2 1 1\n1 1\n\n2 1 0 1 3 add\n".parse::<BristolCircuit>(),
            Err(ParseError::WireOutOfRange {
                line: 5,
                wire: 3,
                wires: 3
            })
        );
        assert_eq!(
            "2 3\n2 1 1\n1 1\n\n2 1 0 1 2 add\n".parse::<BristolCircuit>(),
            Err(ParseError::GateCountMismatch {
                expected: 2,
                actual: 1
            })
        );
        assert_eq!(
            "1 x\n".parse::<BristolCircuit>(),
            Err(ParseError::InvalidNumber {
                line: 1,
                token: "x".into()
            })
        );
    }

    #[test]
    fn validate_rejects_forward_reads() {
        let circuit: BristolCircuit = "1 3\n2 1 1\n1 1\n\n2 1 0 2 1 sub\n".parse().unwrap();
        assert_eq!(
            circuit.validate(),
            Err(ParseError::OperandAfterOutput { out: 1, operand: 2 })
        );
    }

    #[test]
    fn huge_header_counts_are_errors() {
        assert_eq!(
            "1000000000000000000 3\n2 1 1\n1 1\n\n".parse::<BristolCircuit>(),
            Err(ParseError::GateCountMismatch {
                expected: 1_000_000_000_000_000_000,
                actual: 0
            })
        );
        let circuit: BristolCircuit = "1 1000000000000000000\n2 1 1\n1 1\n\n2 1 0 1 2 add\n"
            .parse()
            .unwrap();
        assert_eq!(
            circuit.validate(),
            Err(ParseError::InputCountMismatch {
                declared: 2,
                leaves: 999_999_999_999_999_999
            })
        );
    }

    #[test]
    fn validate_rejects_inconsistent_gates() {
        let invalid = |text: &str| text.parse::<BristolCircuit>().unwrap().validate();
        assert_eq!(
            invalid("2 3\n5 1 1 1 1 1\n1 1\n\n2 1 0 1 2 add\n2 1 0 1 2 mul\n"),
            Err(ParseError::DuplicateOutput(2))
        );
        assert_eq!(
            invalid("2 4\n2 1 1\n1 1\n\n2 1 0 1 3 add\n2 1 0 1 2 mul\n"),
            Err(ParseError::GatesOutOfOrder {
                out: 2,
                previous: 3
            })
        );
        assert_eq!(
            invalid("1 3\n5 1 1 1 1 1\n1 1\n\n2 1 0 1 2 add\n"),
            Err(ParseError::InputCountMismatch {
                declared: 5,
                leaves: 2
            })
        );
        assert_eq!(
            invalid("1 4\n2 1 1\n1 1\n\n2 1 0 1 3 add\n"),
            Err(ParseError::InputCountMismatch {
                declared: 2,
                leaves: 3
            })
        );
        assert_eq!(
            invalid("1 3\n2 1 1\n2 1 1\n\n2 1 0 1 2 add\n"),
            Err(ParseError::OutputCountMismatch {
                declared: 2,
                roots: 1
            })
        );
        let circuit = BristolCircuit {
            wires: 2,
            inputs: 1,
            outputs: 1,
            gates: vec![BristolGate {
                lhs: 0,
                rhs: 0,
                out: 5,
                op: Op::Add,
            }],
        };
        assert_eq!(
            circuit.validate(),
            Err(ParseError::OutputOutOfRange { out: 5, wires: 2 })
        );
    }
}
