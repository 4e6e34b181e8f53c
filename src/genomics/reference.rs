use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use thiserror::Error;

/// Errors raised by the reference store.
#[derive(Debug, Error)]
pub enum ReferenceError {
    /// Underlying I/O failure.
    #[error("failed to read reference: {0}")]
    Io(#[from] std::io::Error),

    /// Sequence data appeared before any `>` header.
    #[error("line {line}: sequence data before the first FASTA header")]
    MissingHeader {
        /// 1-based line number.
        line: usize,
    },

    /// The same name was declared twice.
    #[error("duplicate reference sequence '{0}'")]
    Duplicate(String),

    /// A required sequence is absent.
    #[error("reference sequence '{0}' not found")]
    Missing(String),
}

/// In-memory reference sequences keyed by name.
///
/// Names are the first whitespace-delimited word of each FASTA header and
/// bases are stored uppercase.
#[derive(Debug, Clone, Default)]
pub struct ReferenceStore {
    sequences: HashMap<String, Vec<u8>>,
}

impl ReferenceStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every record of a FASTA file.
    pub fn from_fasta<P: AsRef<Path>>(path: P) -> Result<Self, ReferenceError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Parse FASTA records from a reader.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, ReferenceError> {
        let mut store = Self::new();
        let mut current: Option<(String, Vec<u8>)> = None;

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim_end();
            if let Some(header) = line.strip_prefix('>') {
                if let Some((name, bases)) = current.take() {
                    store.insert(name, bases)?;
                }
                let name = header.split_whitespace().next().unwrap_or_default();
                current = Some((name.to_string(), Vec::new()));
            } else if !line.is_empty() {
                let Some((_, bases)) = current.as_mut() else {
                    return Err(ReferenceError::MissingHeader { line: idx + 1 });
                };
                bases.extend(line.bytes().map(|b| b.to_ascii_uppercase()));
            }
        }
        if let Some((name, bases)) = current {
            store.insert(name, bases)?;
        }
        Ok(store)
    }

    /// Add one sequence.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        bases: Vec<u8>,
    ) -> Result<(), ReferenceError> {
        let name = name.into();
        if self.sequences.contains_key(&name) {
            return Err(ReferenceError::Duplicate(name));
        }
        self.sequences.insert(name, bases);
        Ok(())
    }

    /// Bases of `name`; absence is an error.
    pub fn get(&self, name: &str) -> Result<&[u8], ReferenceError> {
        self.sequences
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| ReferenceError::Missing(name.to_string()))
    }

    /// Length of `name`, if present.
    pub fn length(&self, name: &str) -> Option<usize> {
        self.sequences.get(name).map(Vec::len)
    }

    /// Number of sequences.
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    /// `true` if no sequences are loaded.
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_multi_record_fasta() {
        let fasta = ">scaf1 assembled\nacgt\nNNAC\n\n>scaf2\nGG\n";
        let store = ReferenceStore::from_reader(fasta.as_bytes()).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("scaf1").unwrap(), b"ACGTNNAC");
        assert_eq!(store.length("scaf2"), Some(2));
    }

    #[test]
    fn missing_sequence_is_a_lookup_error() {
        let store = ReferenceStore::from_reader(">a\nA\n".as_bytes()).unwrap();
        assert!(matches!(store.get("b"), Err(ReferenceError::Missing(name)) if name == "b"));
    }

    #[test]
    fn malformed_input_is_rejected() {
        assert!(matches!(
            ReferenceStore::from_reader("ACGT\n".as_bytes()),
            Err(ReferenceError::MissingHeader { line: 1 })
        ));
        assert!(matches!(
            ReferenceStore::from_reader(">a\nA\n>a\nC\n".as_bytes()),
            Err(ReferenceError::Duplicate(_))
        ));
    }
}
