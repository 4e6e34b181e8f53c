//! Position-specific substitution matrices.
//!
//! A matrix holds `2 * radius + 1` rows of 5x5 scores indexed by
//! `[row][reference base][read base]`. Rows `0..radius` score the first
//! bases of a read, row `radius` scores everything far from both ends and
//! rows `radius + 1..=2 * radius` score the last bases, with the final base
//! on row `2 * radius`.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use thiserror::Error;

/// Default band radius.
pub const DEFAULT_BAND_RADIUS: usize = 15;
/// Score for an ambiguous read base.
pub const N_SCORE: i32 = -100;
/// Score for an ambiguous reference base.
pub const NR_SCORE: i32 = -10;
/// Diagonal score of the flat matrix.
pub const FLAT_MATCH: i32 = 200;
/// Off-diagonal score of the flat matrix.
pub const FLAT_MISMATCH: i32 = -600;

/// Number of base symbols per axis (A, C, G, T, other).
pub const BASE_SYMBOLS: usize = 5;

const POSITION_HEADER: &str = "# Matrix for position";
const MIDDLE_HEADER: &str = "# Matrix for position: MIDDLE";

/// One 5x5 substitution table.
pub type SubstitutionTable = [[i32; BASE_SYMBOLS]; BASE_SYMBOLS];

/// Base alphabet used to index the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Base {
    /// Adenine.
    A = 0,
    /// Cytosine.
    C = 1,
    /// Guanine.
    G = 2,
    /// Thymine/Uracil.
    T = 3,
    /// Anything else (`N`, IUPAC codes, gaps).
    Other = 4,
}

impl Base {
    /// All symbols in index order.
    pub const ALL: [Base; BASE_SYMBOLS] = [Base::A, Base::C, Base::G, Base::T, Base::Other];

    /// Map an ASCII base; anything outside ACGTU is [`Base::Other`].
    pub fn from_ascii(base: u8) -> Self {
        match base {
            b'A' | b'a' => Base::A,
            b'C' | b'c' => Base::C,
            b'G' | b'g' => Base::G,
            b'T' | b't' | b'U' | b'u' => Base::T,
            _ => Base::Other,
        }
    }

    /// Watson-Crick complement; `Other` maps to itself.
    pub fn complement(self) -> Self {
        match self {
            Base::A => Base::T,
            Base::C => Base::G,
            Base::G => Base::C,
            Base::T => Base::A,
            Base::Other => Base::Other,
        }
    }

    /// Index into the matrix axes.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Where a read offset falls within the band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandPosition {
    /// `n` bases from the start of the read (`n < radius`).
    Head(usize),
    /// At least `radius` bases from both ends.
    Middle,
    /// `n` bases from the end of the read (`n < radius`).
    Tail(usize),
}

impl BandPosition {
    /// Classify offset `offset` of a read with length `len`.
    pub fn of(offset: usize, len: usize, radius: usize) -> Self {
        if offset < radius {
            return BandPosition::Head(offset);
        }
        let from_end = len.saturating_sub(offset + 1);
        if from_end < radius {
            BandPosition::Tail(from_end)
        } else {
            BandPosition::Middle
        }
    }

    /// Matrix row for this band position.
    pub fn row(self, radius: usize) -> usize {
        match self {
            BandPosition::Head(n) => n,
            BandPosition::Middle => radius,
            BandPosition::Tail(n) => 2 * radius - n,
        }
    }
}

/// Matrix row used for offset `offset` in a read of length `len`.
pub fn depth_index(offset: usize, len: usize, radius: usize) -> usize {
    BandPosition::of(offset, len, radius).row(radius)
}

/// Errors raised while loading or building a scoring matrix.
#[derive(Debug, Error)]
pub enum MatrixError {
    /// Underlying I/O failure.
    #[error("failed to read substitution matrix: {0}")]
    Io(#[from] std::io::Error),

    /// A section header was missing or out of order.
    #[error("line {line}: expected '{expected}' header, found '{found}'")]
    MissingHeader {
        /// 1-based line number.
        line: usize,
        /// Header that was expected at this point.
        expected: &'static str,
        /// Text actually found.
        found: String,
    },

    /// A score row did not hold four integers.
    #[error("line {line}: malformed score row '{text}'")]
    MalformedRow {
        /// 1-based line number.
        line: usize,
        /// Offending text.
        text: String,
    },

    /// The file ended before all sections were read.
    #[error("substitution matrix ended early: expected {expected} sections, read {read}")]
    Truncated {
        /// Sections required for the radius.
        expected: usize,
        /// Sections fully read.
        read: usize,
    },

    /// Row count does not match `2 * radius + 1`.
    #[error("matrix with radius {radius} needs {expected} rows, got {actual}")]
    RowCount {
        /// Band radius.
        radius: usize,
        /// Rows required.
        expected: usize,
        /// Rows supplied.
        actual: usize,
    },

    /// Radius must be positive.
    #[error("band radius must be greater than zero")]
    ZeroRadius,
}

/// Banded position-specific scoring matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringMatrix {
    radius: usize,
    rows: Vec<SubstitutionTable>,
}

impl ScoringMatrix {
    /// Build from explicit rows.
    pub fn from_rows(radius: usize, rows: Vec<SubstitutionTable>) -> Result<Self, MatrixError> {
        if radius == 0 {
            return Err(MatrixError::ZeroRadius);
        }
        let expected = 2 * radius + 1;
        if rows.len() != expected {
            return Err(MatrixError::RowCount {
                radius,
                expected,
                actual: rows.len(),
            });
        }
        Ok(Self { radius, rows })
    }

    /// Flat matrix: identical rows with a fixed match/mismatch score.
    pub fn flat(radius: usize) -> Result<Self, MatrixError> {
        let mut table = [[0i32; BASE_SYMBOLS]; BASE_SYMBOLS];
        for (ref_idx, row) in table.iter_mut().enumerate().take(4) {
            for (read_idx, cell) in row.iter_mut().enumerate().take(4) {
                *cell = if ref_idx == read_idx {
                    FLAT_MATCH
                } else {
                    FLAT_MISMATCH
                };
            }
        }
        fill_ambiguous(&mut table);
        Self::from_rows(radius, vec![table; 2 * radius + 1])
    }

    /// Load a matrix file with the default band radius.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, MatrixError> {
        Self::load_with_radius(path, DEFAULT_BAND_RADIUS)
    }

    /// Load a matrix file with an explicit band radius.
    pub fn load_with_radius<P: AsRef<Path>>(path: P, radius: usize) -> Result<Self, MatrixError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), radius)
    }

    /// Parse the banded matrix format.
    ///
    /// Expects `radius` position sections, one `MIDDLE` section and `radius`
    /// further position sections, each made of a header line followed by
    /// four rows of four integers. Blank lines are ignored.
    pub fn from_reader<R: BufRead>(reader: R, radius: usize) -> Result<Self, MatrixError> {
        if radius == 0 {
            return Err(MatrixError::ZeroRadius);
        }
        let expected_sections = 2 * radius + 1;

        let mut lines = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if !line.trim().is_empty() {
                lines.push((idx + 1, line));
            }
        }
        let mut lines = lines.into_iter();

        let mut rows = Vec::with_capacity(expected_sections);
        for section in 0..expected_sections {
            let Some((line_no, header)) = lines.next() else {
                return Err(MatrixError::Truncated {
                    expected: expected_sections,
                    read: section,
                });
            };
            check_header(line_no, &header, section == radius)?;

            let mut table = [[0i32; BASE_SYMBOLS]; BASE_SYMBOLS];
            for ref_row in table.iter_mut().take(4) {
                let Some((line_no, text)) = lines.next() else {
                    return Err(MatrixError::Truncated {
                        expected: expected_sections,
                        read: section,
                    });
                };
                *ref_row = parse_score_row(line_no, &text)?;
            }
            fill_ambiguous(&mut table);
            rows.push(table);
        }

        Self::from_rows(radius, rows)
    }

    /// Band radius.
    pub fn radius(&self) -> usize {
        self.radius
    }

    /// Number of rows (`2 * radius + 1`).
    pub fn depth(&self) -> usize {
        self.rows.len()
    }

    /// Raw table for one row.
    pub fn table(&self, row: usize) -> Option<&SubstitutionTable> {
        self.rows.get(row)
    }

    /// Reverse-complement matrix for scoring reverse-strand reads.
    ///
    /// Row `2 * radius - d` of the output is row `d` of the input with both
    /// base axes complemented.
    pub fn reverse_complement(&self) -> Self {
        let last = 2 * self.radius;
        let mut rows = vec![[[0i32; BASE_SYMBOLS]; BASE_SYMBOLS]; self.rows.len()];
        for (d, table) in self.rows.iter().enumerate() {
            let target = &mut rows[last - d];
            for ref_base in Base::ALL {
                for read_base in Base::ALL {
                    target[ref_base.index()][read_base.index()] =
                        table[ref_base.complement().index()][read_base.complement().index()];
                }
            }
        }
        Self {
            radius: self.radius,
            rows,
        }
    }

    /// Direct lookup.
    ///
    /// # Panics
    /// Panics if `row` is not below [`ScoringMatrix::depth`].
    #[inline]
    pub fn score(&self, row: usize, ref_base: Base, read_base: Base) -> i32 {
        self.rows[row][ref_base.index()][read_base.index()]
    }

    /// Score read offset `offset` of a read with length `read_len`.
    #[inline]
    pub fn score_at(&self, offset: usize, read_len: usize, ref_base: u8, read_base: u8) -> i32 {
        let row = depth_index(offset, read_len, self.radius);
        self.score(row, Base::from_ascii(ref_base), Base::from_ascii(read_base))
    }
}

fn fill_ambiguous(table: &mut SubstitutionTable) {
    for row in table.iter_mut().take(4) {
        row[Base::Other.index()] = N_SCORE;
    }
    table[Base::Other.index()] = [NR_SCORE; BASE_SYMBOLS];
}

fn check_header(line_no: usize, text: &str, middle: bool) -> Result<(), MatrixError> {
    let is_middle = text.contains(MIDDLE_HEADER);
    let ok = if middle {
        is_middle
    } else {
        text.contains(POSITION_HEADER) && !is_middle
    };
    if ok {
        Ok(())
    } else {
        Err(MatrixError::MissingHeader {
            line: line_no,
            expected: if middle { MIDDLE_HEADER } else { POSITION_HEADER },
            found: text.to_string(),
        })
    }
}

fn parse_score_row(line_no: usize, text: &str) -> Result<[i32; BASE_SYMBOLS], MatrixError> {
    let malformed = || MatrixError::MalformedRow {
        line: line_no,
        text: text.to_string(),
    };
    let mut row = [0i32; BASE_SYMBOLS];
    let mut fields = text.split_whitespace();
    for cell in row.iter_mut().take(4) {
        *cell = fields
            .next()
            .ok_or_else(malformed)?
            .parse()
            .map_err(|_| malformed())?;
    }
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(radius: usize) -> String {
        let mut text = String::new();
        for section in 0..=2 * radius {
            if section == radius {
                text.push_str("# Matrix for position: MIDDLE\n");
            } else {
                text.push_str(&format!("# Matrix for position: {section}\n"));
            }
            for r in 0..4 {
                let cells: Vec<String> = (0..4)
                    .map(|c| (section * 100 + r * 10 + c).to_string())
                    .collect();
                text.push_str(&cells.join("\t"));
                text.push('\n');
            }
            text.push('\n');
        }
        text
    }

    #[test]
    fn parses_banded_sections_in_order() {
        let matrix = ScoringMatrix::from_reader(render(2).as_bytes(), 2).unwrap();
        assert_eq!(matrix.depth(), 5);
        assert_eq!(matrix.score(0, Base::A, Base::C), 1);
        assert_eq!(matrix.score(2, Base::G, Base::T), 223);
        assert_eq!(matrix.score(4, Base::T, Base::A), 430);
        assert_eq!(matrix.score(3, Base::C, Base::Other), N_SCORE);
        assert_eq!(matrix.score(3, Base::Other, Base::C), NR_SCORE);
        assert_eq!(matrix.score(3, Base::Other, Base::Other), NR_SCORE);
    }

    #[test]
    fn middle_header_out_of_place_is_rejected() {
        let text = render(2).replacen(
            "# Matrix for position: 1",
            "# Matrix for position: MIDDLE",
            1,
        );
        let err = ScoringMatrix::from_reader(text.as_bytes(), 2).unwrap_err();
        assert!(matches!(err, MatrixError::MissingHeader { line: 7, .. }));
    }

    #[test]
    fn missing_middle_is_rejected() {
        let text = render(2).replace("MIDDLE", "2");
        let err = ScoringMatrix::from_reader(text.as_bytes(), 2).unwrap_err();
        assert!(matches!(
            err,
            MatrixError::MissingHeader {
                expected: MIDDLE_HEADER,
                ..
            }
        ));
    }

    #[test]
    fn truncated_and_malformed_files_fail() {
        let text = render(2);
        let cut: String = text.lines().take(12).collect::<Vec<_>>().join("\n");
        assert!(matches!(
            ScoringMatrix::from_reader(cut.as_bytes(), 2),
            Err(MatrixError::Truncated { read: 2, .. })
        ));

        let bad = text.replacen("0\t1\t2\t3", "0\t1\tx\t3", 1);
        assert!(matches!(
            ScoringMatrix::from_reader(bad.as_bytes(), 2),
            Err(MatrixError::MalformedRow { line: 2, .. })
        ));
    }

    #[test]
    fn reverse_complement_mirrors_rows_and_bases() {
        let matrix = ScoringMatrix::from_reader(render(2).as_bytes(), 2).unwrap();
        let rc = matrix.reverse_complement();
        // rc[4][A][C] == m[0][T][G]
        assert_eq!(rc.score(4, Base::A, Base::C), matrix.score(0, Base::T, Base::G));
        assert_eq!(rc.score(2, Base::C, Base::Other), N_SCORE);
        assert_eq!(rc.reverse_complement(), matrix);
    }

    #[test]
    fn flat_matrix_scores() {
        let flat = ScoringMatrix::flat(DEFAULT_BAND_RADIUS).unwrap();
        assert_eq!(flat.depth(), 31);
        assert_eq!(flat.score(0, Base::G, Base::G), FLAT_MATCH);
        assert_eq!(flat.score(30, Base::G, Base::A), FLAT_MISMATCH);
        assert_eq!(flat.score(15, Base::G, Base::Other), N_SCORE);
        assert_eq!(flat.score(15, Base::Other, Base::G), NR_SCORE);
        assert_eq!(flat.reverse_complement(), flat);
    }

    #[test]
    fn row_count_is_validated() {
        let table = [[0; BASE_SYMBOLS]; BASE_SYMBOLS];
        assert!(matches!(
            ScoringMatrix::from_rows(2, vec![table; 4]),
            Err(MatrixError::RowCount { expected: 5, actual: 4, .. })
        ));
        assert!(matches!(ScoringMatrix::flat(0), Err(MatrixError::ZeroRadius)));
    }
}
