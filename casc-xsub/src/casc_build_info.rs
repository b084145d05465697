use std::collections::HashMap;
use std::path::Path;

use crate::error::CascError;
use crate::utility::dsv_file::DSVFile;

/// Header label of the build key column in `.build.info`.
pub(crate) const BUILD_KEY_LABEL: &str = "Build Key!HEX:16";

/// Represents build information loaded from a CASC `.build.info` file.
///
/// The file is a pipe-delimited table: the first row holds `Name!TYPE:size` headers and the
/// second row the values for the active build.
#[derive(Debug, Default)]
pub struct CascBuildInfo {
    variables: HashMap<String, Variable>,
}

/// Represents a variable entry in the build info.
#[derive(Debug)]
pub struct Variable {
    pub label: String,
    pub name: String,
    pub var_type: String,
    pub value: String,
}

impl CascBuildInfo {
    /// Loads build info from the specified file.
    ///
    /// # Arguments
    ///
    /// * `file_name` - The path to the `.build.info` file.
    pub fn from_file<P: AsRef<Path>>(file_name: P) -> Result<Self, CascError> {
        let dsv = DSVFile::from_file(file_name, "|", Some("#"))?;
        Self::from_dsv(dsv)
    }

    fn from_dsv(dsv: DSVFile) -> Result<Self, CascError> {
        let (Some(header), Some(data)) = (dsv.header(), dsv.rows.get(1)) else {
            return Err(CascError::InvalidData("Build info has no data row".into()));
        };

        let mut variables = HashMap::new();
        for (label, value) in header.iter().zip(data.iter()) {
            let (name, var_type) = label.split_once('!').unwrap_or((label.as_str(), ""));
            variables.insert(
                name.to_string(),
                Variable {
                    label: label.clone(),
                    name: name.to_string(),
                    var_type: var_type.to_string(),
                    value: value.clone(),
                },
            );
        }
        Ok(Self { variables })
    }

    /// Retrieves a variable by name (the part of the header before `!`).
    pub fn get(&self, var_name: &str) -> Option<&Variable> {
        self.variables.get(var_name)
    }

    /// Returns the build key, taken from the column labelled exactly `Build Key!HEX:16`.
    pub fn build_key(&self) -> Option<&str> {
        self.variables
            .values()
            .find(|v| v.label == BUILD_KEY_LABEL)
            .map(|v| v.value.as_str())
            .filter(|v| !v.is_empty())
    }
}
