//! Lays out each party's private inputs in the order the generated program reads them.
//!
//! The program reads a party's inputs one after another in ascending wire order, so a party's
//! named values have to be sorted by the linear index of their wire, not by name.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use tracing::{debug, instrument};

use crate::{Value, metadata::CircuitInfo, program::MpcSettings};

/// Errors raised while building a party's input sequence.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    /// A value for an input assigned to the party was not supplied.
    #[error("party {party} did not supply a value for input '{name}'")]
    MissingInputValue {
        /// The party.
        party: usize,
        /// The missing input.
        name: String,
    },
    /// The party index is not below the number of parties.
    #[error("party {party} does not exist, there are only {num_parties} parties")]
    UnknownParty {
        /// The party.
        party: usize,
        /// The number of parties.
        num_parties: usize,
    },
}

/// Orders the values supplied by `party` by the wire index of their input.
///
/// Only inputs that the settings assign to `party` are included; values for other names are
/// ignored. The result does not depend on the iteration order of `values`.
#[instrument(level = "debug", skip(info, settings, values), err)]
pub fn party_inputs(
    party: usize,
    info: &CircuitInfo,
    settings: &MpcSettings,
    values: &HashMap<String, Value>,
) -> Result<Vec<Value>, InputError> {
    if party >= settings.num_parties {
        return Err(InputError::UnknownParty {
            party,
            num_parties: settings.num_parties,
        });
    }
    let mut ordered = vec![];
    for (_, name) in info.inputs_by_index() {
        if settings.inputs_from.get(name) != Some(&party) {
            continue;
        }
        let Some(value) = values.get(name) else {
            return Err(InputError::MissingInputValue {
                party,
                name: name.to_string(),
            });
        };
        ordered.push(*value);
    }
    debug!(inputs = ordered.len(), "ordered party inputs");
    Ok(ordered)
}

/// Orders the inputs of every party, indexed by party.
pub fn all_party_inputs(
    info: &CircuitInfo,
    settings: &MpcSettings,
    values: &[HashMap<String, Value>],
) -> Result<Vec<Vec<Value>>, InputError> {
    let empty = HashMap::new();
    (0..settings.num_parties)
        .map(|p| party_inputs(p, info, settings, values.get(p).unwrap_or(&empty)))
        .collect()
}

/// Parses a party's `{"name": value}` JSON input file.
pub fn values_from_json_str(json: &str) -> Result<HashMap<String, Value>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Formats an input sequence as read by the engine: values separated by single spaces.
pub fn format_input_file(values: &[Value]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// The path of a party's input file below the engine's player data directory.
pub fn input_file_path(player_data: impl AsRef<Path>, party: usize) -> PathBuf {
    player_data.as_ref().join(format!("Input-P{party}-0"))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn info() -> CircuitInfo {
        CircuitInfo {
            input_name_to_wire_index: [
                ("a".to_string(), 4),
                ("b".to_string(), 0),
                ("c".to_string(), 2),
                ("d".to_string(), 1),
            ]
            .into(),
            constants: BTreeMap::new(),
            output_name_to_wire_index: vec![("out".to_string(), 6)],
        }
    }

    fn settings() -> MpcSettings {
        MpcSettings {
            inputs_from: [
                ("a".to_string(), 0),
                ("b".to_string(), 1),
                ("c".to_string(), 0),
                ("d".to_string(), 0),
            ]
            .into(),
            constants: BTreeMap::new(),
            num_parties: 2,
        }
    }

    fn values(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs.iter().map(|(n, v)| (n.to_string(), *v)).collect()
    }

    #[test]
    fn order_by_wire_index() {
        let p0 = values(&[("a", 10), ("c", 30), ("d", 40), ("b", 99)]);
        assert_eq!(party_inputs(0, &info(), &settings(), &p0), Ok(vec![40, 30, 10]));
        let p1 = values(&[("b", 20)]);
        assert_eq!(party_inputs(1, &info(), &settings(), &p1), Ok(vec![20]));
        assert_eq!(
            all_party_inputs(&info(), &settings(), &[p0, p1]),
            Ok(vec![vec![40, 30, 10], vec![20]])
        );
    }

    #[test]
    fn missing_value_is_reported() {
        let p0 = values(&[("a", 10), ("d", 40)]);
        assert_eq!(
            party_inputs(0, &info(), &settings(), &p0),
            Err(InputError::MissingInputValue {
                party: 0,
                name: "c".to_string()
            })
        );
        assert_eq!(
            party_inputs(2, &info(), &settings(), &p0),
            Err(InputError::UnknownParty {
                party: 2,
                num_parties: 2
            })
        );
    }

    #[test]
    fn input_file_format() {
        assert_eq!(format_input_file(&[40, -30, 10]), "40 -30 10");
        assert_eq!(format_input_file(&[]), "");
        assert_eq!(
            input_file_path("Player-Data", 1),
            PathBuf::from("Player-Data/Input-P1-0")
        );
        let json = values_from_json_str(r#"{"a": 1, "b": -2}"#).unwrap();
        assert_eq!(json, values(&[("a", 1), ("b", -2)]));
    }
}
