use crate::error::CascError;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// A Delimiter Separated Value file, such as `.build.info`.
#[derive(Debug)]
pub(crate) struct DSVFile {
    /// The delimiter string
    delimiter: String,
    /// The comment indicator string
    comment: Option<String>,
    /// The rows within the DSV file
    pub(crate) rows: Vec<Vec<String>>,
}

impl DSVFile {
    /// Initializes a new instance with a given delimiter and optional comment string
    pub(crate) fn with_delimiter(delimiter: &str, comment: Option<&str>) -> Self {
        Self {
            delimiter: delimiter.to_string(),
            comment: comment.map(|s| s.to_string()),
            rows: Vec::new(),
        }
    }

    /// Loads a file with the given delimiter and optional comment string
    pub(crate) fn from_file<P: AsRef<Path>>(
        file: P,
        delimiter: &str,
        comment: Option<&str>,
    ) -> Result<Self, CascError> {
        let file = File::open(file)?;
        let mut dsv = Self::with_delimiter(delimiter, comment);
        dsv.load(file)?;
        Ok(dsv)
    }

    /// Loads DSV data from a reader (e.g., File, BufReader, etc.)
    pub(crate) fn load<R: Read>(&mut self, reader: R) -> Result<(), CascError> {
        let buffered = BufReader::new(reader);
        let comment = self.comment.as_deref().filter(|c| !c.is_empty());

        for line in buffered.lines() {
            let line = line?;
            let line = line.trim_end_matches(['\r', '\n']);
            if line.trim().is_empty() {
                continue;
            }
            if comment.is_some_and(|c| line.starts_with(c)) {
                continue;
            }
            let row: Vec<String> = line.split(&self.delimiter).map(|s| s.to_string()).collect();
            self.rows.push(row);
        }
        Ok(())
    }

    /// Gets the header row, if any (first row)
    pub(crate) fn header(&self) -> Option<&Vec<String>> {
        self.rows.first()
    }
}
