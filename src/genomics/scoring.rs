//! PSSM alignment scores for already-aligned reads.
//!
//! A record's score is the sum of the substitution scores of its aligned
//! bases, looked up on the matrix row for each base's distance from the
//! read ends, minus an affine penalty for every insertion and deletion.
//! Reverse-strand reads are scored with the reverse-complement matrix so
//! that the banded rows follow the read's original orientation.

use thiserror::Error;

use crate::config::ScoringConfig;
use crate::genomics::{
    project, read_span, AlignmentRecord, CigarOpKind, ReferenceStore, ScoringMatrix,
    TargetDictionary,
};
use crate::AnalysisError;

/// Errors raised while scoring a record.
#[derive(Debug, Error)]
pub enum ScoringError {
    /// The alignment runs past the end of its reference sequence.
    #[error(
        "read {read}: aligned position {pos} lies beyond the end of '{sequence}' ({length} bases)"
    )]
    BeyondReference {
        /// Read name.
        read: String,
        /// Reference sequence name.
        sequence: String,
        /// Offending 0-based position.
        pos: u64,
        /// Reference length.
        length: usize,
    },
}

/// Scores records against a reference with a forward/reverse matrix pair.
#[derive(Debug, Clone)]
pub struct AlignmentScorer {
    forward: ScoringMatrix,
    reverse: ScoringMatrix,
    gap_open: i32,
    gap_extend: i32,
}

impl AlignmentScorer {
    /// Build from a forward-strand matrix.
    pub fn new(matrix: ScoringMatrix, config: &ScoringConfig) -> Self {
        let reverse = matrix.reverse_complement();
        Self {
            forward: matrix,
            reverse,
            gap_open: config.gap_open,
            gap_extend: config.gap_extend,
        }
    }

    /// Matrix used for a read on the given strand.
    pub fn matrix_for(&self, reverse_strand: bool) -> &ScoringMatrix {
        if reverse_strand {
            &self.reverse
        } else {
            &self.forward
        }
    }

    /// Affine penalty for a gap of `len` bases.
    pub fn gap_penalty(&self, len: u32) -> i64 {
        if len == 0 {
            return 0;
        }
        self.gap_open as i64 + self.gap_extend as i64 * (len as i64 - 1)
    }

    /// Score `record` against the bases of `sequence`.
    pub fn score(
        &self,
        record: &AlignmentRecord,
        sequence: &str,
        reference: &[u8],
    ) -> Result<i32, ScoringError> {
        let matrix = self.matrix_for(record.flags.reverse);
        let read_len = if record.is_empty() {
            read_span(&record.cigar)
        } else {
            record.len()
        };

        let mut total: i64 = 0;
        for pair in project(record.pos, &record.cigar) {
            let ref_base = *reference.get(pair.ref_pos as usize).ok_or_else(|| {
                ScoringError::BeyondReference {
                    read: record.name.to_string(),
                    sequence: sequence.to_string(),
                    pos: pair.ref_pos,
                    length: reference.len(),
                }
            })?;
            let read_base = record.base_at(pair.read_offset).unwrap_or(b'N');
            total += matrix.score_at(pair.read_offset, read_len, ref_base, read_base) as i64;
        }

        total -= record
            .cigar
            .iter()
            .filter(|op| matches!(op.kind, CigarOpKind::Insertion | CigarOpKind::Deletion))
            .map(|op| self.gap_penalty(op.len))
            .sum::<i64>();

        Ok(total.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
    }

    /// Score a record, resolving its reference through the header and store.
    ///
    /// Unmapped or unplaced records yield `None`. A sequence named in the
    /// header but absent from the store is a lookup error.
    pub fn score_record(
        &self,
        record: &AlignmentRecord,
        targets: &TargetDictionary,
        references: &ReferenceStore,
    ) -> Result<Option<i32>, AnalysisError> {
        let Some(tid) = record.tid.filter(|_| !record.flags.unmapped) else {
            return Ok(None);
        };
        let name = targets.name(tid).ok_or(AnalysisError::UnknownTarget(tid))?;
        let bases = references.get(name)?;
        Ok(Some(self.score(record, name, bases)?))
    }
}
