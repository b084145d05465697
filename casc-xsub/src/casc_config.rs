use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use crate::error::CascError;

/// Represents a CASC build configuration, containing variables parsed from `key = value` lines.
#[derive(Debug, Default)]
pub struct CascConfig {
    variables: HashMap<String, Variable>,
}

/// Represents a variable in the CASC configuration, with a name and a list of values.
#[derive(Debug, Eq, PartialEq, Hash)]
pub struct Variable {
    /// The name of the variable.
    pub name: String,
    /// The whitespace separated values associated with the variable.
    pub values: Vec<String>,
}

impl CascConfig {
    /// Loads configuration variables from a file.
    pub fn from_file<P: AsRef<Path>>(file_name: P) -> Result<Self, CascError> {
        let mut config = CascConfig::default();
        config.load(File::open(file_name)?)?;
        Ok(config)
    }

    /// Retrieves a variable by name, if it exists.
    pub fn get(&self, var_name: &str) -> Option<&Variable> {
        self.variables.get(var_name)
    }

    /// Returns the ASCII VFS root key: the second token of `vfs-root`.
    pub fn vfs_root_key(&self) -> Option<&str> {
        self.get("vfs-root")?.values.get(1).map(String::as_str)
    }

    /// Loads configuration variables from a reader.
    pub fn load<R: Read>(&mut self, reader: R) -> Result<(), CascError> {
        let reader = BufReader::new(reader);

        for line in reader.lines() {
            let line = line?;
            let line = line.trim();

            // Ignore empty lines and comments
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((name, value)) = line.split_once('=') {
                let name = name.trim().to_string();
                let values: Vec<String> = value.split_whitespace().map(|v| v.to_string()).collect();
                self.variables
                    .insert(name.clone(), Variable { name, values });
            }
        }

        Ok(())
    }
}
