//! Single-pass streaming over reference-sorted alignments.
//!
//! The driver owns at most one accumulator at a time. A sequence's counters
//! are allocated on its first record, flushed when the stream moves on to
//! another reference id (or ends) and dropped immediately after.

use std::io::Write;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::genomics::{AlignmentRecord, SequenceAnalysis};
use crate::AnalysisError;

/// A reference sequence declared in the alignment header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Sequence name.
    pub name: Arc<str>,
    /// Declared length in bases.
    pub length: u64,
}

/// Reference id to name/length lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetDictionary {
    targets: Arc<[Target]>,
}

impl TargetDictionary {
    /// Build from `(name, length)` pairs in reference-id order.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<Arc<str>>,
    {
        let targets: Vec<Target> = pairs
            .into_iter()
            .map(|(name, length)| Target {
                name: name.into(),
                length,
            })
            .collect();
        Self {
            targets: targets.into(),
        }
    }

    /// Number of declared sequences.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// `true` when no sequences are declared.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Entry for `tid`.
    pub fn get(&self, tid: u32) -> Option<&Target> {
        self.targets.get(tid as usize)
    }

    /// Name of `tid`.
    pub fn name(&self, tid: u32) -> Option<&str> {
        self.get(tid).map(|target| target.name.as_ref())
    }

    /// Declared length of `tid`.
    pub fn length(&self, tid: u32) -> Option<u64> {
        self.get(tid).map(|target| target.length)
    }

    /// Reference id of `name`.
    pub fn tid_of(&self, name: &str) -> Option<u32> {
        self.targets
            .iter()
            .position(|target| target.name.as_ref() == name)
            .map(|idx| idx as u32)
    }

    /// Declared sequences in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Target> {
        self.targets.iter()
    }
}

/// Counters describing one driver run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverStats {
    /// Records consumed.
    pub records: u64,
    /// Records without a reference id.
    pub unplaced: u64,
    /// Records dropped because their sequence was too short.
    pub skipped_records: u64,
    /// Sequences whose counters were flushed.
    pub sequences_flushed: u64,
    /// Sequences skipped as too short.
    pub sequences_skipped: u64,
    /// Output rows written.
    pub rows_written: u64,
}

#[derive(Debug)]
enum DriverState<A> {
    NoSequenceOpen,
    SequenceOpen { tid: u32, length: u64, accumulator: A },
    Skipping { tid: u32 },
}

impl<A> DriverState<A> {
    fn current_tid(&self) -> Option<u32> {
        match self {
            DriverState::NoSequenceOpen => None,
            DriverState::SequenceOpen { tid, .. } | DriverState::Skipping { tid } => Some(*tid),
        }
    }
}

/// Streams sorted records through a [`SequenceAnalysis`].
pub struct StreamingDriver<'a, A: SequenceAnalysis, W: Write> {
    analysis: A,
    targets: &'a TargetDictionary,
    out: W,
    state: DriverState<A::Accumulator>,
    visited: Vec<bool>,
    header_written: bool,
    stats: DriverStats,
}

impl<A: SequenceAnalysis, W: Write> std::fmt::Debug for StreamingDriver<'_, A, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingDriver")
            .field("analysis", &self.analysis.name())
            .field("current_tid", &self.state.current_tid())
            .field("stats", &self.stats)
            .finish()
    }
}

impl<'a, A: SequenceAnalysis, W: Write> StreamingDriver<'a, A, W> {
    /// Create a driver writing rows to `out`.
    pub fn new(analysis: A, targets: &'a TargetDictionary, out: W) -> Self {
        Self {
            analysis,
            targets,
            out,
            state: DriverState::NoSequenceOpen,
            visited: vec![false; targets.len()],
            header_written: false,
            stats: DriverStats::default(),
        }
    }

    /// Statistics so far.
    pub fn stats(&self) -> DriverStats {
        self.stats
    }

    /// Consume every record, then flush the final sequence.
    pub fn run<I, E>(mut self, records: I) -> Result<DriverStats, AnalysisError>
    where
        I: IntoIterator<Item = Result<AlignmentRecord, E>>,
        AnalysisError: From<E>,
    {
        for record in records {
            self.push(&record?)?;
        }
        self.finish()
    }

    /// Feed one record.
    pub fn push(&mut self, record: &AlignmentRecord) -> Result<(), AnalysisError> {
        self.ensure_header()?;
        self.stats.records += 1;

        let Some(tid) = record.tid else {
            self.stats.unplaced += 1;
            return Ok(());
        };
        if self.state.current_tid() != Some(tid) {
            self.enter(tid)?;
        }

        match &mut self.state {
            DriverState::SequenceOpen {
                length,
                accumulator,
                ..
            } => {
                if record.pos >= *length {
                    warn!(
                        read = %record.name,
                        pos = record.pos,
                        length = *length,
                        "alignment starts beyond the declared sequence length"
                    );
                }
                self.analysis.observe(accumulator, record);
            }
            DriverState::Skipping { .. } => self.stats.skipped_records += 1,
            DriverState::NoSequenceOpen => {}
        }
        Ok(())
    }

    /// Flush the open sequence, if any, and the output writer.
    pub fn finish(mut self) -> Result<DriverStats, AnalysisError> {
        self.ensure_header()?;
        self.close()?;
        self.out.flush()?;
        info!(
            analysis = self.analysis.name(),
            records = self.stats.records,
            flushed = self.stats.sequences_flushed,
            skipped = self.stats.sequences_skipped,
            rows = self.stats.rows_written,
            "analysis complete"
        );
        Ok(self.stats)
    }

    fn ensure_header(&mut self) -> Result<(), AnalysisError> {
        if !self.header_written {
            self.analysis.write_header(&mut self.out)?;
            self.header_written = true;
        }
        Ok(())
    }

    fn enter(&mut self, tid: u32) -> Result<(), AnalysisError> {
        self.close()?;

        let targets = self.targets;
        let target = targets.get(tid).ok_or(AnalysisError::UnknownTarget(tid))?;
        let visited = &mut self.visited[tid as usize];
        if *visited {
            return Err(AnalysisError::UnsortedInput {
                name: target.name.to_string(),
            });
        }
        *visited = true;

        self.state = match self.analysis.open(target.length) {
            Some(accumulator) => {
                debug!(sequence = %target.name, length = target.length, "opened sequence");
                DriverState::SequenceOpen {
                    tid,
                    length: target.length,
                    accumulator,
                }
            }
            None => {
                debug!(
                    sequence = %target.name,
                    length = target.length,
                    "sequence too short, skipping"
                );
                self.stats.sequences_skipped += 1;
                DriverState::Skipping { tid }
            }
        };
        Ok(())
    }

    fn close(&mut self) -> Result<(), AnalysisError> {
        let DriverState::SequenceOpen {
            tid, accumulator, ..
        } = std::mem::replace(&mut self.state, DriverState::NoSequenceOpen)
        else {
            return Ok(());
        };

        let targets = self.targets;
        let name = targets.name(tid).ok_or(AnalysisError::UnknownTarget(tid))?;
        let rows = self.analysis.flush(&accumulator, name, &mut self.out)?;
        self.stats.rows_written += rows as u64;
        self.stats.sequences_flushed += 1;
        debug!(sequence = name, rows, "flushed sequence");
        Ok(())
    }
}
