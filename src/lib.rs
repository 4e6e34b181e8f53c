//! # Scaffold QC
//!
//! Streaming quality checks for genome assemblies driven by read-pair
//! alignments sorted by reference position.
//!
//! ## Analyses
//!
//! 1. **Insert anomalies**: per-base counts of out-of-range, discontiguous
//!    and in-range mate pairs over each sequence's interior
//! 2. **Fragment coverage**: per-base coverage by reads plus the unsequenced
//!    gap between acceptable mates
//! 3. **Bad joins**: windowed counts of mates landing on other sequences
//! 4. **Scoring**: banded PSSM alignment scores written back as an aux tag
//!
//! Every analysis holds counters for one reference sequence at a time, so
//! memory is bounded by the longest sequence rather than the assembly.
//!
//! ## Usage Example
//!
//! ```ignore
//! use scaffold_qc::config::AnalysisConfig;
//! use scaffold_qc::genomics::{AlignmentReader, InsertAnomalyAnalysis, StreamingDriver};
//!
//! let mut reader = AlignmentReader::from_path("pairs.bam")?;
//! let targets = reader.targets().clone();
//! let analysis = InsertAnomalyAnalysis::new(&AnalysisConfig::default());
//! let stats = StreamingDriver::new(analysis, &targets, std::io::stdout())
//!     .run(reader.records())?;
//! ```

#![warn(missing_docs, missing_debug_implementations)]
#![allow(clippy::new_without_default)]

pub mod config;   // Thresholds and validation
pub mod genomics; // Projection, counters, analyses and I/O

pub use config::{AnalysisConfig, ConfigError, ScoringConfig};
pub use genomics::{
    AlignmentRecord, AlignmentScorer, DriverStats, ScoringMatrix, SequenceAnalysis,
    StreamingDriver, TargetDictionary,
};

use thiserror::Error;

/// Errors that can occur while running an analysis.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Invalid thresholds
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Scoring matrix could not be loaded
    #[error(transparent)]
    Matrix(#[from] genomics::MatrixError),

    /// Reference sequences could not be loaded or looked up
    #[error(transparent)]
    Reference(#[from] genomics::ReferenceError),

    /// A record could not be scored
    #[error(transparent)]
    Scoring(#[from] genomics::ScoringError),

    /// Flagged positions could not be merged
    #[error(transparent)]
    Region(#[from] genomics::RegionError),

    /// Alignment file could not be read or written
    #[error("alignment I/O failed: {0}")]
    Alignment(#[from] rust_htslib::errors::Error),

    /// A record names a reference id absent from the header
    #[error("record references unknown sequence id {0}")]
    UnknownTarget(u32),

    /// Records for a sequence reappeared after it was flushed
    #[error("alignments are not sorted by reference: '{name}' appeared again after being flushed")]
    UnsortedInput {
        /// Sequence seen twice
        name: String,
    },

    /// Output could not be written
    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),
}
