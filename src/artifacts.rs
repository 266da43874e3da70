//! Reads and writes the files exchanged with the MPC engine.
//!
//! A compiled circuit `name` is stored as `<name>.txt` (canonical circuit text) next to
//! `<name>.circuit_info.json` (its metadata); the generated program is stored as `<name>.mpc`.
//! Party inputs go to `Input-P<party>-0` below the engine's player data directory.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, instrument};

use crate::{Compiled, Error, Value, bristol::BristolCircuit, inputs, metadata::CircuitInfo};

/// The paths of a stored circuit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitPaths {
    /// The canonical circuit text.
    pub circuit: PathBuf,
    /// The circuit metadata.
    pub info: PathBuf,
}

impl CircuitPaths {
    /// The paths of circuit `name` below `dir`.
    pub fn new(dir: impl AsRef<Path>, name: &str) -> Self {
        let dir = dir.as_ref();
        Self {
            circuit: dir.join(format!("{name}.txt")),
            info: dir.join(format!("{name}.circuit_info.json")),
        }
    }
}

/// Stores a compiled circuit and its metadata below `dir`, creating `dir` if needed.
#[instrument(level = "debug", skip(dir, compiled), err)]
pub fn write_circuit_artifacts(
    dir: impl AsRef<Path>,
    name: &str,
    compiled: &Compiled,
) -> Result<CircuitPaths, Error> {
    fs::create_dir_all(dir.as_ref())?;
    let paths = CircuitPaths::new(dir, name);
    fs::write(&paths.circuit, compiled.circuit.to_string())?;
    fs::write(&paths.info, compiled.info.to_json()?)?;
    debug!(circuit = %paths.circuit.display(), info = %paths.info.display(), "wrote circuit");
    Ok(paths)
}

/// Loads a circuit and its metadata stored by [`write_circuit_artifacts`].
#[instrument(level = "debug", skip(dir), err)]
pub fn read_circuit_artifacts(dir: impl AsRef<Path>, name: &str) -> Result<Compiled, Error> {
    let paths = CircuitPaths::new(dir, name);
    let circuit: BristolCircuit = fs::read_to_string(&paths.circuit)?.parse()?;
    circuit.validate()?;
    let info = CircuitInfo::from_json_str(&fs::read_to_string(&paths.info)?)?;
    Ok(Compiled { circuit, info })
}

/// Stores a generated program as `<name>.mpc` below `dir`.
#[instrument(level = "debug", skip(dir, program), err)]
pub fn write_program(dir: impl AsRef<Path>, name: &str, program: &str) -> Result<PathBuf, Error> {
    fs::create_dir_all(dir.as_ref())?;
    let path = dir.as_ref().join(format!("{name}.mpc"));
    fs::write(&path, program)?;
    debug!(path = %path.display(), "wrote program");
    Ok(path)
}

/// Stores the ordered inputs of `party` below the player data directory.
#[instrument(level = "debug", skip(player_data, values), err)]
pub fn write_input_file(
    player_data: impl AsRef<Path>,
    party: usize,
    values: &[Value],
) -> Result<PathBuf, Error> {
    fs::create_dir_all(player_data.as_ref())?;
    let path = inputs::input_file_path(player_data, party);
    fs::write(&path, inputs::format_input_file(values))?;
    debug!(path = %path.display(), values = values.len(), "wrote input file");
    Ok(path)
}

/// Reads a party's `{"name": value}` JSON file.
pub fn read_input_values(path: impl AsRef<Path>) -> Result<HashMap<String, Value>, Error> {
    let json = fs::read_to_string(path)?;
    Ok(inputs::values_from_json_str(&json)?)
}

#[cfg(test)]
mod tests {
    use crate::{description::CircuitDescription, program::MpcSettings};

    use super::*;

    const DESCRIPTION: &str = r#"{
        "nodes": [
            {"id": 10, "names": ["0.a"]},
            {"id": 11, "names": ["0.b"]},
            {"id": 20, "names": ["0.c"]}
        ],
        "gates": [
            {"id": 1, "gate_type": "AAdd", "lh_input": 10, "rh_input": 11, "output": 20}
        ]
    }"#;

    #[test]
    fn store_and_load_circuit() {
        let dir = tempfile::tempdir().unwrap();
        let compiled = crate::compile(&CircuitDescription::from_json_str(DESCRIPTION).unwrap())
            .unwrap();
        let paths = write_circuit_artifacts(dir.path().join("circuits"), "add", &compiled).unwrap();
        assert!(paths.circuit.ends_with("circuits/add.txt"));
        assert_eq!(
            fs::read_to_string(&paths.circuit).unwrap(),
            compiled.circuit.to_string()
        );
        let loaded = read_circuit_artifacts(dir.path().join("circuits"), "add").unwrap();
        assert_eq!(loaded, compiled);

        let settings = MpcSettings::from_json_str(
            r#"{"inputs_from": {"a": 0, "b": 1}, "num_parties": 2}"#,
        )
        .unwrap();
        let program =
            crate::program::generate_program(&loaded.circuit, &loaded.info, &settings).unwrap();
        let path = write_program(dir.path(), "add", &program).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), program);
    }

    #[test]
    fn store_input_file() {
        let dir = tempfile::tempdir().unwrap();
        let player_data = dir.path().join("Player-Data");
        let path = write_input_file(&player_data, 1, &[5, -6]).unwrap();
        assert_eq!(path, player_data.join("Input-P1-0"));
        assert_eq!(fs::read_to_string(path).unwrap(), "5 -6");

        let values = dir.path().join("p1.json");
        fs::write(&values, r#"{"b": 11}"#).unwrap();
        assert_eq!(read_input_values(&values).unwrap()["b"], 11);
    }

    #[test]
    fn missing_files_are_io_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_circuit_artifacts(dir.path(), "missing"),
            Err(Error::Io(_))
        ));
    }
}
