//! Per-sequence analyses driven by [`StreamingDriver`](crate::genomics::StreamingDriver).
//!
//! Each analysis owns its thresholds and describes how to allocate,
//! update and serialize the counters of one reference sequence.

use std::io::{self, Write};
use std::ops::Range;

use crate::config::AnalysisConfig;
use crate::genomics::counters::{CappedIdSet, SaturatingCounts, WindowLayout};
use crate::genomics::{
    covered_positions, reference_span, AlignmentRecord, InsertClassifier, PairClass,
};

/// Analysis applied to the records of one reference sequence at a time.
pub trait SequenceAnalysis {
    /// Counters for one open sequence.
    type Accumulator;

    /// Short name used in log messages.
    fn name(&self) -> &'static str;

    /// Allocate counters for a sequence of `length` bases, or `None` if the
    /// sequence is too short to analyse.
    fn open(&self, length: u64) -> Option<Self::Accumulator>;

    /// Fold one record into the open counters.
    fn observe(&self, accumulator: &mut Self::Accumulator, record: &AlignmentRecord);

    /// Serialize the counters of `sequence`, returning the number of rows.
    fn flush<W: Write>(
        &self,
        accumulator: &Self::Accumulator,
        sequence: &str,
        out: &mut W,
    ) -> io::Result<usize>;

    /// Written once before any rows.
    fn write_header<W: Write>(&self, _out: &mut W) -> io::Result<()> {
        Ok(())
    }
}

fn to_index_range(range: Range<u64>) -> Range<usize> {
    range.start as usize..range.end as usize
}

/// Per-base insert classification tracks.
#[derive(Debug, Clone)]
pub struct InsertTracks {
    length: u64,
    /// Same-sequence pairs whose insert is outside the accepted range.
    pub out_of_range: SaturatingCounts,
    /// Reads whose mate is unmapped or on another sequence.
    pub discontiguous: SaturatingCounts,
    /// Same-sequence pairs whose insert is inside the accepted range.
    pub in_range: SaturatingCounts,
}

/// Per-base mate-pair insert anomalies over sequence interiors.
///
/// Rows: `name, position, out_of_range, discontiguous, in_range` for every
/// position in `[edge_margin, length - edge_margin)`.
#[derive(Debug, Clone)]
pub struct InsertAnomalyAnalysis {
    classifier: InsertClassifier,
    edge_margin: u64,
    max_count: u16,
}

impl InsertAnomalyAnalysis {
    /// Build from the shared configuration.
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            classifier: InsertClassifier::from_config(config),
            edge_margin: config.edge_margin,
            max_count: config.max_count,
        }
    }
}

impl SequenceAnalysis for InsertAnomalyAnalysis {
    type Accumulator = InsertTracks;

    fn name(&self) -> &'static str {
        "insert-anomalies"
    }

    fn open(&self, length: u64) -> Option<InsertTracks> {
        if length <= 2 * self.edge_margin {
            return None;
        }
        let len = length as usize;
        Some(InsertTracks {
            length,
            out_of_range: SaturatingCounts::new(len, self.max_count),
            discontiguous: SaturatingCounts::new(len, self.max_count),
            in_range: SaturatingCounts::new(len, self.max_count),
        })
    }

    fn observe(&self, tracks: &mut InsertTracks, record: &AlignmentRecord) {
        match self.classifier.classify(record) {
            PairClass::Discontiguous(span) => {
                tracks.discontiguous.increment_range(to_index_range(span))
            }
            PairClass::InRange(span) => tracks.in_range.increment_range(to_index_range(span)),
            PairClass::OutOfRange(span) => {
                tracks.out_of_range.increment_range(to_index_range(span))
            }
            PairClass::Filtered | PairClass::Deferred => {}
        }
    }

    fn flush<W: Write>(
        &self,
        tracks: &InsertTracks,
        sequence: &str,
        out: &mut W,
    ) -> io::Result<usize> {
        let interior = self.edge_margin as usize..(tracks.length - self.edge_margin) as usize;
        let rows = interior.len();
        for pos in interior {
            writeln!(
                out,
                "{}\t{}\t{}\t{}\t{}",
                sequence,
                pos,
                tracks.out_of_range.get(pos),
                tracks.discontiguous.get(pos),
                tracks.in_range.get(pos)
            )?;
        }
        Ok(rows)
    }
}

/// Per-base fragment coverage.
///
/// Each accepted read covers its match-class and deleted bases; when the
/// mate lies downstream on the same sequence and the unsequenced gap is an
/// acceptable insert, the gap is covered as well.
#[derive(Debug, Clone)]
pub struct FragmentCoverageAnalysis {
    classifier: InsertClassifier,
    max_count: u16,
}

impl FragmentCoverageAnalysis {
    /// Build from the shared configuration.
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            classifier: InsertClassifier::from_config(config),
            max_count: config.max_count,
        }
    }
}

impl SequenceAnalysis for FragmentCoverageAnalysis {
    type Accumulator = SaturatingCounts;

    fn name(&self) -> &'static str {
        "fragment-coverage"
    }

    fn open(&self, length: u64) -> Option<SaturatingCounts> {
        Some(SaturatingCounts::new(length as usize, self.max_count))
    }

    fn observe(&self, coverage: &mut SaturatingCounts, record: &AlignmentRecord) {
        if !self.classifier.accepts(record) {
            return;
        }
        for pos in covered_positions(record.pos, &record.cigar) {
            coverage.increment(pos as usize);
        }

        if record.flags.mate_unmapped || !record.mate_on_same_reference() {
            return;
        }
        let end = record.pos + reference_span(&record.cigar);
        if record.mate_pos > end && self.classifier.insert_in_range(record.mate_pos - end) {
            coverage.increment_range(to_index_range(end..record.mate_pos));
        }
    }

    fn flush<W: Write>(
        &self,
        coverage: &SaturatingCounts,
        sequence: &str,
        out: &mut W,
    ) -> io::Result<usize> {
        for (pos, count) in coverage.as_slice().iter().enumerate() {
            writeln!(out, "{sequence}\t{pos}\t{count}")?;
        }
        Ok(coverage.len())
    }

    fn write_header<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "#seq_name\tposition(0-based)\tfragment_coverage")
    }
}

/// Windowed counters for the bad-join scan.
#[derive(Debug, Clone)]
pub struct WindowTracks {
    layout: WindowLayout,
    /// Reads whose mate maps to a different sequence.
    pub to_other: SaturatingCounts,
    /// Reads whose mate maps to this sequence.
    pub within: SaturatingCounts,
    /// Distinct other-sequence ids seen per window.
    pub other_ids: Vec<CappedIdSet>,
}

impl WindowTracks {
    /// Window geometry.
    pub fn layout(&self) -> &WindowLayout {
        &self.layout
    }
}

/// Scaffold interiors whose mates point at other sequences.
///
/// Rows: `name, window_start, to_other, within, distinct_others`, one per
/// window.
#[derive(Debug, Clone)]
pub struct BadJoinWindowAnalysis {
    min_mapq: u8,
    edge_margin: u64,
    window_size: u64,
    max_count: u16,
    max_distinct_ids: usize,
}

impl BadJoinWindowAnalysis {
    /// Build from the shared configuration.
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            min_mapq: config.min_mapq,
            edge_margin: config.edge_margin,
            window_size: config.window_size,
            max_count: config.max_count,
            max_distinct_ids: config.max_distinct_ids,
        }
    }
}

impl SequenceAnalysis for BadJoinWindowAnalysis {
    type Accumulator = WindowTracks;

    fn name(&self) -> &'static str {
        "bad-joins"
    }

    fn open(&self, length: u64) -> Option<WindowTracks> {
        let layout = WindowLayout::new(length, self.edge_margin, self.window_size)?;
        let windows = layout.num_windows();
        Some(WindowTracks {
            layout,
            to_other: SaturatingCounts::new(windows, self.max_count),
            within: SaturatingCounts::new(windows, self.max_count),
            other_ids: vec![CappedIdSet::new(self.max_distinct_ids); windows],
        })
    }

    fn observe(&self, tracks: &mut WindowTracks, record: &AlignmentRecord) {
        if record.mapq < self.min_mapq || !record.is_placed() || record.flags.mate_unmapped {
            return;
        }
        let Some(mate_tid) = record.mate_tid else {
            return;
        };
        let Some(window) = tracks.layout.window_of(record.pos) else {
            return;
        };

        if record.mate_on_other_reference() {
            tracks.to_other.increment(window);
            tracks.other_ids[window].insert(mate_tid);
        } else {
            tracks.within.increment(window);
        }
    }

    fn flush<W: Write>(
        &self,
        tracks: &WindowTracks,
        sequence: &str,
        out: &mut W,
    ) -> io::Result<usize> {
        let windows = tracks.layout.num_windows();
        for window in 0..windows {
            writeln!(
                out,
                "{}\t{}\t{}\t{}\t{}",
                sequence,
                tracks.layout.window_start(window),
                tracks.to_other.get(window),
                tracks.within.get(window),
                tracks.other_ids[window].len()
            )?;
        }
        Ok(windows)
    }
}
