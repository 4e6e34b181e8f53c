//! Analysis and scoring parameters.
//!
//! Defaults: mapping quality 30, inserts accepted between 10 and 5000
//! bases, 4 kb scaffold edges and 500 bp windows.

use thiserror::Error;

use crate::genomics::counters::{DEFAULT_MAX_COUNT, DEFAULT_MAX_DISTINCT_IDS};
use crate::genomics::pssm::DEFAULT_BAND_RADIUS;

/// Default minimum mapping quality.
pub const DEFAULT_MIN_MAPQ: u8 = 30;
/// Default smallest acceptable insert.
pub const DEFAULT_MIN_INSERT: u64 = 10;
/// Default largest acceptable insert.
pub const DEFAULT_MAX_INSERT: u64 = 5000;
/// Default number of bases ignored at each scaffold end.
pub const DEFAULT_EDGE_MARGIN: u64 = 4000;
/// Default window width for the bad-join scan.
pub const DEFAULT_WINDOW_SIZE: u64 = 500;
/// Counter cap used by the fragment coverage tracks.
pub const FRAGMENT_COVERAGE_MAX_COUNT: u16 = 1000;
/// Default gap open penalty.
pub const DEFAULT_GAP_OPEN: i32 = 1000;
/// Default gap extension penalty.
pub const DEFAULT_GAP_EXTEND: i32 = 200;
/// Default aux tag carrying the alignment score.
pub const DEFAULT_SCORE_TAG: [u8; 2] = *b"ZM";

/// Invalid parameter combinations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A parameter is outside its valid range.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name as exposed on the command line.
        name: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

impl ConfigError {
    fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Parameters shared by the streaming analyses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Records below this mapping quality are ignored.
    pub min_mapq: u8,
    /// Smallest in-range insert (inclusive).
    pub min_insert: u64,
    /// Largest in-range insert (inclusive).
    pub max_insert: u64,
    /// Bases excluded at each end of a sequence.
    pub edge_margin: u64,
    /// Window width for windowed scans.
    pub window_size: u64,
    /// Saturation cap for every counter.
    pub max_count: u16,
    /// Cap for the distinct other-sequence ids kept per window.
    pub max_distinct_ids: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_mapq: DEFAULT_MIN_MAPQ,
            min_insert: DEFAULT_MIN_INSERT,
            max_insert: DEFAULT_MAX_INSERT,
            edge_margin: DEFAULT_EDGE_MARGIN,
            window_size: DEFAULT_WINDOW_SIZE,
            max_count: DEFAULT_MAX_COUNT,
            max_distinct_ids: DEFAULT_MAX_DISTINCT_IDS,
        }
    }
}

impl AnalysisConfig {
    /// Override the mapping quality threshold.
    pub fn with_min_mapq(mut self, min_mapq: u8) -> Self {
        self.min_mapq = min_mapq;
        self
    }

    /// Override the accepted insert range.
    pub fn with_insert_range(mut self, min_insert: u64, max_insert: u64) -> Self {
        self.min_insert = min_insert;
        self.max_insert = max_insert;
        self
    }

    /// Override the edge margin.
    pub fn with_edge_margin(mut self, edge_margin: u64) -> Self {
        self.edge_margin = edge_margin;
        self
    }

    /// Override the window size.
    pub fn with_window_size(mut self, window_size: u64) -> Self {
        self.window_size = window_size;
        self
    }

    /// Override the counter cap.
    pub fn with_max_count(mut self, max_count: u16) -> Self {
        self.max_count = max_count;
        self
    }

    /// Override the distinct id cap.
    pub fn with_max_distinct_ids(mut self, max_distinct_ids: usize) -> Self {
        self.max_distinct_ids = max_distinct_ids;
        self
    }

    /// Reject unusable combinations.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_insert > self.max_insert {
            return Err(ConfigError::invalid(
                "min-insert",
                format!(
                    "{} is greater than max-insert {}",
                    self.min_insert, self.max_insert
                ),
            ));
        }
        if self.window_size == 0 {
            return Err(ConfigError::invalid("window", "must be greater than zero"));
        }
        if self.max_count == 0 {
            return Err(ConfigError::invalid("max-count", "must be greater than zero"));
        }
        if self.max_distinct_ids == 0 {
            return Err(ConfigError::invalid(
                "max-distinct-ids",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Parameters for PSSM alignment scoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringConfig {
    /// Band radius of the substitution matrix.
    pub band_radius: usize,
    /// Penalty charged for opening a gap.
    pub gap_open: i32,
    /// Penalty charged for each further gap base.
    pub gap_extend: i32,
    /// Aux tag written on scored records.
    pub tag: [u8; 2],
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            band_radius: DEFAULT_BAND_RADIUS,
            gap_open: DEFAULT_GAP_OPEN,
            gap_extend: DEFAULT_GAP_EXTEND,
            tag: DEFAULT_SCORE_TAG,
        }
    }
}

impl ScoringConfig {
    /// Override the gap penalties.
    pub fn with_gap_penalties(mut self, gap_open: i32, gap_extend: i32) -> Self {
        self.gap_open = gap_open;
        self.gap_extend = gap_extend;
        self
    }

    /// Override the band radius.
    pub fn with_band_radius(mut self, band_radius: usize) -> Self {
        self.band_radius = band_radius;
        self
    }

    /// Override the output tag from its textual form.
    pub fn with_tag(mut self, tag: &str) -> Result<Self, ConfigError> {
        self.tag = parse_tag(tag)?;
        Ok(self)
    }

    /// Reject unusable combinations.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.band_radius == 0 {
            return Err(ConfigError::invalid("band-radius", "must be greater than zero"));
        }
        if self.gap_open < 0 || self.gap_extend < 0 {
            return Err(ConfigError::invalid(
                "gap penalties",
                "must not be negative",
            ));
        }
        Ok(())
    }
}

/// Parse a two-character SAM aux tag (`[A-Za-z][A-Za-z0-9]`).
pub fn parse_tag(tag: &str) -> Result<[u8; 2], ConfigError> {
    match tag.as_bytes() {
        &[first, second] if first.is_ascii_alphabetic() && second.is_ascii_alphanumeric() => {
            Ok([first, second])
        }
        _ => Err(ConfigError::invalid(
            "tag",
            format!("'{tag}' is not a two-character SAM tag"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(AnalysisConfig::default().validate().is_ok());
        assert!(ScoringConfig::default().validate().is_ok());
        assert_eq!(AnalysisConfig::default().max_distinct_ids, 300);
    }

    #[test]
    fn inverted_insert_range_is_rejected() {
        let err = AnalysisConfig::default()
            .with_insert_range(600, 500)
            .validate()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidParameter {
                name: "min-insert",
                ..
            }
        ));
    }

    #[test]
    fn zero_window_is_rejected() {
        assert!(AnalysisConfig::default()
            .with_window_size(0)
            .validate()
            .is_err());
    }

    #[test]
    fn tags_are_checked() {
        assert_eq!(parse_tag("XS").unwrap(), *b"XS");
        assert_eq!(parse_tag("z9").unwrap(), *b"z9");
        assert!(parse_tag("9Z").is_err());
        assert!(parse_tag("ABC").is_err());
        assert!(ScoringConfig::default().with_tag("").is_err());
    }
}
