//! Alignment-stream primitives and per-sequence analyses for scaffold QC.
//!
//! This module exposes the CIGAR projector, banded scoring matrices, capped
//! counters and the streaming driver that the command-line tool composes.

mod analysis;
mod cigar;
mod classifier;
pub mod counters;
mod driver;
mod io;
pub mod pssm;
mod reference;
mod regions;
mod scoring;
mod types;

pub use analysis::{
    BadJoinWindowAnalysis, FragmentCoverageAnalysis, InsertAnomalyAnalysis, InsertTracks,
    SequenceAnalysis, WindowTracks,
};
pub use cigar::{
    covered_positions, project, read_span, reference_span, walk, AlignedPair, CigarStep,
    Projection,
};
pub use classifier::{InsertClassifier, PairClass};
pub use counters::{CappedIdSet, IdInsert, SaturatingCounts, WindowLayout};
pub use driver::{DriverStats, StreamingDriver, Target, TargetDictionary};
pub use io::{
    annotate_alignments, create_annotated_writer, record_from_bam, AlignmentReader,
    AnnotationStats,
};
pub use pssm::{depth_index, BandPosition, Base, MatrixError, ScoringMatrix};
pub use reference::{ReferenceError, ReferenceStore};
pub use regions::{
    merge_flagged_positions, merge_flagged_rows, write_regions, FlaggedRegion, RegionError,
    RegionMerger, DEFAULT_MAX_GAP,
};
pub use scoring::{AlignmentScorer, ScoringError};
pub use types::{
    parse_cigar, AlignmentFlags, AlignmentRecord, CigarOp, CigarOpKind, Consumption,
};
