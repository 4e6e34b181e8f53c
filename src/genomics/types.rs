use std::sync::Arc;

/// CIGAR operation kinds describing how a read aligns to the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CigarOpKind {
    /// Alignment match (may be a sequence match or mismatch).
    Match,
    /// Insertion relative to the reference.
    Insertion,
    /// Deletion relative to the reference.
    Deletion,
    /// Skipped reference region (spliced-out or otherwise not covered).
    RefSkip,
    /// Soft clipping (sequence present in read only).
    SoftClip,
    /// Hard clipping (trimmed sequence not present in read).
    HardClip,
    /// Silent padding.
    Pad,
    /// Sequence match.
    Equal,
    /// Sequence mismatch.
    Diff,
}

/// Which cursors an operation advances during a CIGAR walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consumption {
    /// Advances read offset and reference position in lockstep.
    Both,
    /// Advances the reference position only.
    ReferenceOnly,
    /// Advances the read offset only.
    ReadOnly,
    /// Advances neither cursor.
    Neither,
}

impl CigarOpKind {
    /// Cursor behaviour of the operation.
    pub fn consumption(self) -> Consumption {
        match self {
            CigarOpKind::Match | CigarOpKind::Equal | CigarOpKind::Diff => Consumption::Both,
            CigarOpKind::Deletion | CigarOpKind::RefSkip => Consumption::ReferenceOnly,
            // pad advances the read offset only
            CigarOpKind::Insertion | CigarOpKind::SoftClip | CigarOpKind::Pad => {
                Consumption::ReadOnly
            }
            CigarOpKind::HardClip => Consumption::Neither,
        }
    }

    /// `true` for the match class (`M`, `=`, `X`).
    #[inline]
    pub fn is_match(self) -> bool {
        self.consumption() == Consumption::Both
    }

    /// `true` if the operation moves the reference cursor.
    #[inline]
    pub fn consumes_reference(self) -> bool {
        matches!(
            self.consumption(),
            Consumption::Both | Consumption::ReferenceOnly
        )
    }

    /// `true` if the operation moves the read cursor.
    #[inline]
    pub fn consumes_read(self) -> bool {
        matches!(self.consumption(), Consumption::Both | Consumption::ReadOnly)
    }

    /// SAM character for the operation.
    pub fn symbol(self) -> char {
        match self {
            CigarOpKind::Match => 'M',
            CigarOpKind::Insertion => 'I',
            CigarOpKind::Deletion => 'D',
            CigarOpKind::RefSkip => 'N',
            CigarOpKind::SoftClip => 'S',
            CigarOpKind::HardClip => 'H',
            CigarOpKind::Pad => 'P',
            CigarOpKind::Equal => '=',
            CigarOpKind::Diff => 'X',
        }
    }

    /// Parse a SAM CIGAR character.
    pub fn from_symbol(symbol: char) -> Option<Self> {
        Some(match symbol {
            'M' => CigarOpKind::Match,
            'I' => CigarOpKind::Insertion,
            'D' => CigarOpKind::Deletion,
            'N' => CigarOpKind::RefSkip,
            'S' => CigarOpKind::SoftClip,
            'H' => CigarOpKind::HardClip,
            'P' => CigarOpKind::Pad,
            '=' => CigarOpKind::Equal,
            'X' => CigarOpKind::Diff,
            _ => return None,
        })
    }
}

/// CIGAR operation with length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CigarOp {
    /// Operation kind.
    pub kind: CigarOpKind,
    /// Number of bases affected by the operation.
    pub len: u32,
}

impl CigarOp {
    /// Construct a new CIGAR operation.
    pub fn new(kind: CigarOpKind, len: u32) -> Self {
        Self { kind, len }
    }
}

/// Parse a textual CIGAR string such as `5S40M2D55M`.
///
/// `*` and the empty string both yield an empty operation list.
pub fn parse_cigar(text: &str) -> Option<Vec<CigarOp>> {
    if text == "*" {
        return Some(Vec::new());
    }
    let mut ops = Vec::new();
    let mut len: u32 = 0;
    let mut saw_digit = false;
    for ch in text.chars() {
        if let Some(digit) = ch.to_digit(10) {
            len = len.checked_mul(10)?.checked_add(digit)?;
            saw_digit = true;
        } else {
            if !saw_digit {
                return None;
            }
            ops.push(CigarOp::new(CigarOpKind::from_symbol(ch)?, len));
            len = 0;
            saw_digit = false;
        }
    }
    if saw_digit {
        return None;
    }
    Some(ops)
}

/// Alignment flag bits decoded once at ingestion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlignmentFlags {
    /// Template has multiple segments.
    pub paired: bool,
    /// Each segment properly aligned according to the aligner.
    pub proper_pair: bool,
    /// Segment unmapped.
    pub unmapped: bool,
    /// Next segment in the template unmapped.
    pub mate_unmapped: bool,
    /// Sequence stored reverse complemented.
    pub reverse: bool,
    /// Mate sequence stored reverse complemented.
    pub mate_reverse: bool,
    /// First segment in the template.
    pub first_in_pair: bool,
    /// Last segment in the template.
    pub second_in_pair: bool,
    /// Secondary alignment.
    pub secondary: bool,
    /// Failed platform/vendor checks.
    pub qc_fail: bool,
    /// PCR or optical duplicate.
    pub duplicate: bool,
    /// Supplementary alignment.
    pub supplementary: bool,
}

impl AlignmentFlags {
    /// Decode a SAM flag word.
    pub fn from_bits(bits: u16) -> Self {
        let set = |mask: u16| bits & mask != 0;
        Self {
            paired: set(0x1),
            proper_pair: set(0x2),
            unmapped: set(0x4),
            mate_unmapped: set(0x8),
            reverse: set(0x10),
            mate_reverse: set(0x20),
            first_in_pair: set(0x40),
            second_in_pair: set(0x80),
            secondary: set(0x100),
            qc_fail: set(0x200),
            duplicate: set(0x400),
            supplementary: set(0x800),
        }
    }

    /// Re-encode as a SAM flag word.
    pub fn bits(&self) -> u16 {
        [
            (self.paired, 0x1),
            (self.proper_pair, 0x2),
            (self.unmapped, 0x4),
            (self.mate_unmapped, 0x8),
            (self.reverse, 0x10),
            (self.mate_reverse, 0x20),
            (self.first_in_pair, 0x40),
            (self.second_in_pair, 0x80),
            (self.secondary, 0x100),
            (self.qc_fail, 0x200),
            (self.duplicate, 0x400),
            (self.supplementary, 0x800),
        ]
        .iter()
        .filter(|(set, _)| *set)
        .fold(0u16, |acc, (_, mask)| acc | mask)
    }
}

/// Aligned record as consumed by the analyses.
#[derive(Debug, Clone)]
pub struct AlignmentRecord {
    /// Read name.
    pub name: Arc<str>,
    /// Reference id, `None` for unplaced records.
    pub tid: Option<u32>,
    /// 0-based leftmost reference coordinate.
    pub pos: u64,
    /// Mapping quality (Phred-scaled).
    pub mapq: u8,
    /// Decoded flags.
    pub flags: AlignmentFlags,
    /// Observed template length (signed).
    pub insert_size: i64,
    /// Mate reference id, `None` if unknown.
    pub mate_tid: Option<u32>,
    /// 0-based mate position.
    pub mate_pos: u64,
    /// CIGAR describing the alignment.
    pub cigar: Vec<CigarOp>,
    /// Read sequence stored as uppercase ASCII.
    pub sequence: Arc<[u8]>,
}

impl AlignmentRecord {
    /// Construct a mapped, unpaired record.
    pub fn new(
        name: impl Into<Arc<str>>,
        tid: u32,
        pos: u64,
        mapq: u8,
        cigar: Vec<CigarOp>,
        sequence: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            name: name.into(),
            tid: Some(tid),
            pos,
            mapq,
            flags: AlignmentFlags::default(),
            insert_size: 0,
            mate_tid: None,
            mate_pos: 0,
            cigar,
            sequence: sequence.into(),
        }
    }

    /// Attach mate information, marking the record as paired.
    pub fn with_mate(mut self, mate_tid: Option<u32>, mate_pos: u64, insert_size: i64) -> Self {
        self.flags.paired = true;
        self.mate_tid = mate_tid;
        self.mate_pos = mate_pos;
        self.insert_size = insert_size;
        self
    }

    /// Replace the decoded flags.
    pub fn with_flags(mut self, flags: AlignmentFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Read length inferred from the sequence.
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    /// `true` when the record carries no bases.
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Base at the provided read offset.
    pub fn base_at(&self, offset: usize) -> Option<u8> {
        self.sequence.get(offset).copied()
    }

    /// `true` when both the record and its position are usable.
    pub fn is_placed(&self) -> bool {
        self.tid.is_some() && !self.flags.unmapped
    }

    /// `true` if the mate is placed on a reference other than this record's.
    pub fn mate_on_other_reference(&self) -> bool {
        matches!((self.tid, self.mate_tid), (Some(own), Some(mate)) if own != mate)
    }

    /// `true` if the mate is placed on this record's reference.
    pub fn mate_on_same_reference(&self) -> bool {
        matches!((self.tid, self.mate_tid), (Some(own), Some(mate)) if own == mate)
    }
}
