//! Projection of read bases onto reference coordinates by walking CIGAR
//! operations.
//!
//! The projector trusts its input: operation lengths that overrun the read
//! are not detected here.

use std::iter::FusedIterator;

use crate::genomics::{CigarOp, CigarOpKind, Consumption};

/// A read base aligned to a reference base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignedPair {
    /// Offset into the stored read sequence (soft clips included).
    pub read_offset: usize,
    /// 0-based reference coordinate.
    pub ref_pos: u64,
}

/// One CIGAR operation positioned on both cursors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CigarStep {
    /// Operation being applied.
    pub op: CigarOp,
    /// Read offset before the operation.
    pub read_offset: usize,
    /// Reference coordinate before the operation.
    pub ref_pos: u64,
}

/// Walk the operations, yielding each one with its starting cursors.
pub fn walk(ref_start: u64, ops: &[CigarOp]) -> impl Iterator<Item = CigarStep> + '_ {
    let mut read_offset = 0usize;
    let mut ref_pos = ref_start;
    ops.iter().map(move |&op| {
        let step = CigarStep {
            op,
            read_offset,
            ref_pos,
        };
        let len = op.len as usize;
        match op.kind.consumption() {
            Consumption::Both => {
                read_offset += len;
                ref_pos += op.len as u64;
            }
            Consumption::ReferenceOnly => ref_pos += op.len as u64,
            Consumption::ReadOnly => read_offset += len,
            Consumption::Neither => {}
        }
        step
    })
}

/// Lazy sequence of aligned pairs for match-class operations.
#[derive(Debug, Clone)]
pub struct Projection<'a> {
    ops: std::slice::Iter<'a, CigarOp>,
    read_offset: usize,
    ref_pos: u64,
    remaining: u32,
}

/// Project the read described by `ops` from `ref_start`.
pub fn project(ref_start: u64, ops: &[CigarOp]) -> Projection<'_> {
    Projection {
        ops: ops.iter(),
        read_offset: 0,
        ref_pos: ref_start,
        remaining: 0,
    }
}

impl Iterator for Projection<'_> {
    type Item = AlignedPair;

    fn next(&mut self) -> Option<AlignedPair> {
        while self.remaining == 0 {
            let op = self.ops.next()?;
            match op.kind.consumption() {
                Consumption::Both => self.remaining = op.len,
                Consumption::ReferenceOnly => self.ref_pos += op.len as u64,
                Consumption::ReadOnly => self.read_offset += op.len as usize,
                Consumption::Neither => {}
            }
        }

        let pair = AlignedPair {
            read_offset: self.read_offset,
            ref_pos: self.ref_pos,
        };
        self.read_offset += 1;
        self.ref_pos += 1;
        self.remaining -= 1;
        Some(pair)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let pending: usize = self
            .ops
            .clone()
            .filter(|op| op.kind.is_match())
            .map(|op| op.len as usize)
            .sum();
        let total = pending + self.remaining as usize;
        (total, Some(total))
    }
}

impl ExactSizeIterator for Projection<'_> {}
impl FusedIterator for Projection<'_> {}

/// Total reference length consumed by the operations.
pub fn reference_span(ops: &[CigarOp]) -> u64 {
    ops.iter()
        .filter(|op| op.kind.consumes_reference())
        .map(|op| op.len as u64)
        .sum()
}

/// Total read length consumed by the operations.
pub fn read_span(ops: &[CigarOp]) -> usize {
    ops.iter()
        .filter(|op| op.kind.consumes_read())
        .map(|op| op.len as usize)
        .sum()
}

/// Reference positions that count towards coverage.
///
/// Match-class bases and deletions are covered; skipped reference regions
/// are not.
pub fn covered_positions(ref_start: u64, ops: &[CigarOp]) -> impl Iterator<Item = u64> + '_ {
    walk(ref_start, ops).flat_map(|step| {
        let covered = match step.op.kind {
            CigarOpKind::Deletion => true,
            kind => kind.is_match(),
        };
        let len = if covered { step.op.len as u64 } else { 0 };
        step.ref_pos..step.ref_pos + len
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::parse_cigar;

    fn pairs(start: u64, cigar: &str) -> Vec<(usize, u64)> {
        let ops = parse_cigar(cigar).unwrap();
        project(start, &ops)
            .map(|p| (p.read_offset, p.ref_pos))
            .collect()
    }

    #[test]
    fn soft_clip_shifts_read_offset_only() {
        assert_eq!(pairs(100, "2S3M"), vec![(2, 100), (3, 101), (4, 102)]);
    }

    #[test]
    fn insertion_and_deletion_move_one_cursor() {
        assert_eq!(
            pairs(10, "2M1I2M2D1M"),
            vec![(0, 10), (1, 11), (3, 12), (4, 13), (5, 16)]
        );
    }

    #[test]
    fn hard_clip_and_pad() {
        assert_eq!(pairs(0, "5H1M1P1M5H"), vec![(0, 0), (2, 1)]);
    }

    #[test]
    fn spans() {
        let ops = parse_cigar("3S4M2D1N3I2=1X4S").unwrap();
        assert_eq!(reference_span(&ops), 4 + 2 + 1 + 2 + 1);
        assert_eq!(read_span(&ops), 3 + 4 + 3 + 2 + 1 + 4);
        assert_eq!(project(0, &ops).len(), 7);
    }

    #[test]
    fn deletions_cover_but_skips_do_not() {
        let ops = parse_cigar("2M2D1M3N1M").unwrap();
        let covered: Vec<u64> = covered_positions(50, &ops).collect();
        assert_eq!(covered, vec![50, 51, 52, 53, 54, 58]);
    }

    #[test]
    fn walk_reports_starting_cursors() {
        let ops = parse_cigar("2S3M1D").unwrap();
        let steps: Vec<_> = walk(7, &ops).map(|s| (s.read_offset, s.ref_pos)).collect();
        assert_eq!(steps, vec![(0, 7), (2, 7), (5, 10)]);
    }
}
