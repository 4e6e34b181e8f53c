//! Collapse per-position anomaly rows into regions.
//!
//! Input rows start with `name<TAB>position`; any further columns are
//! ignored, as are blank and `#` lines. Consecutive positions on the same
//! sequence join one region while they lie within `max_gap` of each other.

use std::io::{BufRead, Write};

use thiserror::Error;

/// Default largest distance between positions of one region.
pub const DEFAULT_MAX_GAP: u64 = 1000;

/// Errors raised while reading flagged positions.
#[derive(Debug, Error)]
pub enum RegionError {
    /// Underlying I/O failure.
    #[error("failed to read flagged positions: {0}")]
    Io(#[from] std::io::Error),

    /// A row did not start with a name and a position.
    #[error("line {line}: expected '<name>\\t<position>', found '{text}'")]
    MalformedLine {
        /// 1-based line number.
        line: usize,
        /// Offending text.
        text: String,
    },
}

/// Half-open region `[start, end)` on one sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlaggedRegion {
    /// Sequence name.
    pub sequence: String,
    /// First flagged position.
    pub start: u64,
    /// One past the last flagged position.
    pub end: u64,
}

/// Incremental region builder.
#[derive(Debug, Clone)]
pub struct RegionMerger {
    max_gap: u64,
    open: Option<(String, u64, u64)>,
    regions: Vec<FlaggedRegion>,
}

impl RegionMerger {
    /// New merger joining positions at most `max_gap` apart.
    pub fn new(max_gap: u64) -> Self {
        Self {
            max_gap,
            open: None,
            regions: Vec::new(),
        }
    }

    /// Add one flagged position.
    pub fn push(&mut self, sequence: &str, pos: u64) {
        match self.open.as_mut() {
            Some((name, _, last)) if name == sequence && pos.abs_diff(*last) <= self.max_gap => {
                *last = pos;
            }
            _ => {
                self.close();
                self.open = Some((sequence.to_string(), pos, pos));
            }
        }
    }

    /// Close the last region and return every region in input order.
    pub fn finish(mut self) -> Vec<FlaggedRegion> {
        self.close();
        self.regions
    }

    fn close(&mut self) {
        if let Some((sequence, start, last)) = self.open.take() {
            self.regions.push(FlaggedRegion {
                sequence,
                start,
                end: last + 1,
            });
        }
    }
}

/// Merge `(sequence, position)` pairs into regions.
pub fn merge_flagged_positions<'a, I>(positions: I, max_gap: u64) -> Vec<FlaggedRegion>
where
    I: IntoIterator<Item = (&'a str, u64)>,
{
    let mut merger = RegionMerger::new(max_gap);
    for (sequence, pos) in positions {
        merger.push(sequence, pos);
    }
    merger.finish()
}

/// Read flagged rows and merge them in one pass.
pub fn merge_flagged_rows<R: BufRead>(
    reader: R,
    max_gap: u64,
) -> Result<Vec<FlaggedRegion>, RegionError> {
    let mut merger = RegionMerger::new(max_gap);
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut fields = trimmed.split_whitespace();
        let parsed = fields
            .next()
            .zip(fields.next().and_then(|pos| pos.parse::<u64>().ok()));
        let Some((sequence, pos)) = parsed else {
            return Err(RegionError::MalformedLine {
                line: idx + 1,
                text: line.clone(),
            });
        };
        merger.push(sequence, pos);
    }
    Ok(merger.finish())
}

/// Write regions as `name<TAB>start<TAB>end` rows.
pub fn write_regions<W: Write>(out: &mut W, regions: &[FlaggedRegion]) -> std::io::Result<()> {
    for region in regions {
        writeln!(out, "{}\t{}\t{}", region.sequence, region.start, region.end)?;
    }
    out.flush()
}
