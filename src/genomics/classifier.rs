use std::ops::Range;

use crate::config::AnalysisConfig;
use crate::genomics::{reference_span, AlignmentRecord};

/// Counter bucket chosen for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairClass {
    /// Below the quality threshold or unmapped; nothing is counted.
    Filtered,
    /// Mate unmapped or on another sequence; the read's own span is marked.
    Discontiguous(Range<u64>),
    /// Same-sequence pair with an insert inside the accepted range.
    InRange(Range<u64>),
    /// Same-sequence pair with an insert outside the accepted range.
    OutOfRange(Range<u64>),
    /// Read-2 of a same-sequence pair, or a mate placed nowhere; counted by
    /// the other mate if at all.
    Deferred,
}

/// Insert-size classifier for mate-pair records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertClassifier {
    min_mapq: u8,
    min_insert: u64,
    max_insert: u64,
}

impl InsertClassifier {
    /// Construct with explicit thresholds.
    pub fn new(min_mapq: u8, min_insert: u64, max_insert: u64) -> Self {
        Self {
            min_mapq,
            min_insert,
            max_insert,
        }
    }

    /// Take thresholds from an analysis configuration.
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.min_mapq, config.min_insert, config.max_insert)
    }

    /// `true` when `insert` lies in `[min_insert, max_insert]`.
    #[inline]
    pub fn insert_in_range(&self, insert: u64) -> bool {
        (self.min_insert..=self.max_insert).contains(&insert)
    }

    /// `true` if the record passes the quality and mapping filter.
    #[inline]
    pub fn accepts(&self, record: &AlignmentRecord) -> bool {
        record.mapq >= self.min_mapq && record.is_placed()
    }

    /// Decide which bucket the record contributes to.
    pub fn classify(&self, record: &AlignmentRecord) -> PairClass {
        if !self.accepts(record) {
            return PairClass::Filtered;
        }

        if record.flags.mate_unmapped || record.mate_on_other_reference() {
            let end = record.pos + reference_span(&record.cigar);
            return PairClass::Discontiguous(record.pos..end);
        }

        if record.mate_on_same_reference() && record.flags.first_in_pair {
            let insert = record.insert_size.unsigned_abs();
            let span = record.pos.min(record.mate_pos)..record.pos.max(record.mate_pos);
            return if self.insert_in_range(insert) {
                PairClass::InRange(span)
            } else {
                PairClass::OutOfRange(span)
            };
        }

        PairClass::Deferred
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::{AlignmentFlags, CigarOp, CigarOpKind};
    use test_case::test_case;

    fn read1(pos: u64, mate_pos: u64, insert: i64) -> AlignmentRecord {
        let flags = AlignmentFlags {
            paired: true,
            first_in_pair: true,
            ..AlignmentFlags::default()
        };
        AlignmentRecord::new(
            "pair",
            0,
            pos,
            60,
            vec![CigarOp::new(CigarOpKind::Match, 50)],
            vec![b'A'; 50],
        )
        .with_mate(Some(0), mate_pos, insert)
        .with_flags(flags)
    }

    #[test_case(100, true ; "minimum is inclusive")]
    #[test_case(99, false ; "below minimum")]
    #[test_case(1000, true ; "maximum is inclusive")]
    #[test_case(1001, false ; "above maximum")]
    #[test_case(-1000, true ; "negative template length uses magnitude")]
    fn insert_boundaries(insert: i64, in_range: bool) {
        let classifier = InsertClassifier::new(30, 100, 1000);
        let class = classifier.classify(&read1(200, 500, insert));
        if in_range {
            assert_eq!(class, PairClass::InRange(200..500));
        } else {
            assert_eq!(class, PairClass::OutOfRange(200..500));
        }
    }

    #[test]
    fn span_is_ordered_when_mate_is_upstream() {
        let classifier = InsertClassifier::new(30, 10, 5000);
        assert_eq!(
            classifier.classify(&read1(900, 300, -650)),
            PairClass::InRange(300..900)
        );
    }

    #[test]
    fn low_quality_and_unmapped_are_filtered() {
        let classifier = InsertClassifier::new(30, 10, 5000);
        let mut low = read1(0, 10, 60);
        low.mapq = 29;
        assert_eq!(classifier.classify(&low), PairClass::Filtered);

        let mut unmapped = read1(0, 10, 60);
        unmapped.flags.unmapped = true;
        assert_eq!(classifier.classify(&unmapped), PairClass::Filtered);
    }

    #[test]
    fn mate_elsewhere_marks_own_span() {
        let classifier = InsertClassifier::new(30, 10, 5000);
        let other = read1(40, 7, 0).with_mate(Some(3), 7, 0);
        assert_eq!(classifier.classify(&other), PairClass::Discontiguous(40..90));

        let mut orphan = read1(40, 0, 0);
        orphan.flags.mate_unmapped = true;
        assert_eq!(classifier.classify(&orphan), PairClass::Discontiguous(40..90));
    }

    #[test]
    fn second_mate_is_deferred() {
        let classifier = InsertClassifier::new(30, 10, 5000);
        let mut second = read1(500, 200, -350);
        second.flags.first_in_pair = false;
        second.flags.second_in_pair = true;
        assert_eq!(classifier.classify(&second), PairClass::Deferred);

        let nowhere = read1(500, 0, 0).with_mate(None, 0, 0);
        assert_eq!(classifier.classify(&nowhere), PairClass::Deferred);
    }
}
