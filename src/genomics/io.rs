//! SAM/BAM/CRAM plumbing on top of rust-htslib.

use std::path::Path;

use rust_htslib::bam::{
    self,
    header::{Header, HeaderRecord},
    record::{Aux, Cigar},
    Read as BamRead, Writer,
};
use tracing::debug;

use crate::genomics::{
    AlignmentFlags, AlignmentRecord, AlignmentScorer, CigarOp, CigarOpKind, ReferenceStore,
    TargetDictionary,
};
use crate::AnalysisError;

impl TargetDictionary {
    /// Reference ids, names and lengths declared by an alignment header.
    pub fn from_header(header: &bam::HeaderView) -> Self {
        Self::from_pairs((0..header.target_count()).map(|tid| {
            let name = String::from_utf8_lossy(header.tid2name(tid)).into_owned();
            (name, header.target_len(tid).unwrap_or(0))
        }))
    }
}

fn reference_id(tid: i32) -> Option<u32> {
    u32::try_from(tid).ok()
}

fn cigar_op(op: &Cigar) -> CigarOp {
    let (kind, len) = match *op {
        Cigar::Match(len) => (CigarOpKind::Match, len),
        Cigar::Ins(len) => (CigarOpKind::Insertion, len),
        Cigar::Del(len) => (CigarOpKind::Deletion, len),
        Cigar::RefSkip(len) => (CigarOpKind::RefSkip, len),
        Cigar::SoftClip(len) => (CigarOpKind::SoftClip, len),
        Cigar::HardClip(len) => (CigarOpKind::HardClip, len),
        Cigar::Pad(len) => (CigarOpKind::Pad, len),
        Cigar::Equal(len) => (CigarOpKind::Equal, len),
        Cigar::Diff(len) => (CigarOpKind::Diff, len),
    };
    CigarOp::new(kind, len)
}

/// Convert an htslib record into the crate's alignment view.
///
/// A reference id of `-1` becomes `None`; negative positions clamp to 0.
pub fn record_from_bam(record: &bam::Record) -> AlignmentRecord {
    let cigar: Vec<CigarOp> = record.cigar().iter().map(cigar_op).collect();
    let name = String::from_utf8_lossy(record.qname()).into_owned();
    let mut converted = AlignmentRecord::new(
        name,
        0,
        record.pos().max(0) as u64,
        record.mapq(),
        cigar,
        record.seq().as_bytes(),
    )
    .with_mate(
        reference_id(record.mtid()),
        record.mpos().max(0) as u64,
        record.insert_size(),
    )
    .with_flags(AlignmentFlags::from_bits(record.flags()));
    converted.tid = reference_id(record.tid());
    converted
}

/// Streaming reader over an alignment file.
pub struct AlignmentReader {
    reader: bam::Reader,
    targets: TargetDictionary,
}

impl std::fmt::Debug for AlignmentReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignmentReader")
            .field("targets", &self.targets.len())
            .finish()
    }
}

impl AlignmentReader {
    /// Open a SAM, BAM or CRAM file; `-` reads standard input.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, AnalysisError> {
        let path = path.as_ref();
        let reader = if path == Path::new("-") {
            bam::Reader::from_stdin()?
        } else {
            bam::Reader::from_path(path)?
        };
        let targets = TargetDictionary::from_header(reader.header());
        debug!(path = %path.display(), targets = targets.len(), "opened alignment file");
        Ok(Self { reader, targets })
    }

    /// Sequences declared in the header.
    pub fn targets(&self) -> &TargetDictionary {
        &self.targets
    }

    /// Raw header, used as a template for derived outputs.
    pub fn header(&self) -> &bam::HeaderView {
        self.reader.header()
    }

    /// Records in file order.
    pub fn records(&mut self) -> impl Iterator<Item = Result<AlignmentRecord, AnalysisError>> + '_ {
        self.reader
            .records()
            .map(|record| record.map(|r| record_from_bam(&r)).map_err(AnalysisError::from))
    }

    /// Raw htslib records in file order.
    pub fn raw_records(&mut self) -> bam::Records<'_, bam::Reader> {
        self.reader.records()
    }
}

/// Open an alignment writer copying `template`'s header plus a `@PG` line.
///
/// `None` writes to standard output.
pub fn create_annotated_writer(
    path: Option<&Path>,
    template: &bam::HeaderView,
    format: bam::Format,
) -> Result<Writer, AnalysisError> {
    let mut header = Header::from_template(template);

    let mut pg = HeaderRecord::new(b"PG");
    pg.push_tag(b"ID", &"scaffold-qc");
    pg.push_tag(b"PN", &"scaffold-qc");
    pg.push_tag(b"VN", &env!("CARGO_PKG_VERSION"));
    header.push_record(&pg);

    let writer = match path {
        Some(path) => Writer::from_path(path, &header, format)?,
        None => Writer::from_stdout(&header, format)?,
    };
    Ok(writer)
}

/// Summary of an annotation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnnotationStats {
    /// Records read.
    pub records: u64,
    /// Records that received a score tag.
    pub scored: u64,
}

/// Score every record of `reader` and copy it to `writer`.
///
/// Mapped records carry their score as an integer aux field named `tag`,
/// replacing any existing value. Unmapped records pass through untouched.
pub fn annotate_alignments(
    reader: &mut AlignmentReader,
    writer: &mut Writer,
    scorer: &AlignmentScorer,
    references: &ReferenceStore,
    tag: [u8; 2],
) -> Result<AnnotationStats, AnalysisError> {
    let targets = reader.targets().clone();
    let mut stats = AnnotationStats::default();

    for record in reader.raw_records() {
        let mut record = record?;
        stats.records += 1;

        let view = record_from_bam(&record);
        if let Some(score) = scorer.score_record(&view, &targets, references)? {
            if record.aux(&tag).is_ok() {
                record.remove_aux(&tag)?;
            }
            record.push_aux(&tag, Aux::I32(score))?;
            stats.scored += 1;
        }
        writer.write(&record)?;
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoringConfig;
    use crate::genomics::{pssm::FLAT_MATCH, ScoringMatrix};
    use std::path::PathBuf;

    const SAM: &str = "@HD\tVN:1.6\tSO:coordinate\n\
@SQ\tSN:scaf1\tLN:8\n\
@SQ\tSN:scaf2\tLN:4\n\
r1\t99\tscaf1\t2\t60\t2S3M\t=\t6\t7\tTTCGT\t*\n\
r2\t0\tscaf2\t1\t40\t4M\t*\t0\t0\tACGT\t*\tZM:i:7\n\
r3\t4\t*\t0\t0\t*\t*\t0\t0\tAAAA\t*\n";

    fn write_sam(label: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "scaffold_qc_{label}_{}.sam",
            std::process::id()
        ));
        std::fs::write(&path, SAM).unwrap();
        path
    }

    #[test]
    fn converts_header_and_records() {
        let path = write_sam("convert");
        let mut reader = AlignmentReader::from_path(&path).unwrap();
        assert_eq!(reader.targets().name(1), Some("scaf2"));
        assert_eq!(reader.targets().length(0), Some(8));

        let records: Vec<_> = reader.records().collect::<Result<_, _>>().unwrap();
        assert_eq!(records.len(), 3);

        let first = &records[0];
        assert_eq!(first.name.as_ref(), "r1");
        assert_eq!(first.tid, Some(0));
        assert_eq!(first.pos, 1);
        assert_eq!(first.mate_tid, Some(0));
        assert_eq!(first.mate_pos, 5);
        assert_eq!(first.insert_size, 7);
        assert!(first.flags.paired && first.flags.proper_pair && first.flags.mate_reverse);
        assert_eq!(
            first.cigar,
            vec![
                CigarOp::new(CigarOpKind::SoftClip, 2),
                CigarOp::new(CigarOpKind::Match, 3)
            ]
        );
        assert_eq!(first.sequence.as_ref(), b"TTCGT");

        assert_eq!(records[2].tid, None);
        assert!(records[2].flags.unmapped);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn annotation_replaces_existing_tag() {
        let input = write_sam("annotate_in");
        let output = std::env::temp_dir().join(format!(
            "scaffold_qc_annotate_out_{}.sam",
            std::process::id()
        ));

        let mut references = ReferenceStore::new();
        references.insert("scaf1", b"ACGTACGT".to_vec()).unwrap();
        references.insert("scaf2", b"ACGT".to_vec()).unwrap();
        let config = ScoringConfig::default().with_band_radius(2);
        let scorer = AlignmentScorer::new(ScoringMatrix::flat(2).unwrap(), &config);

        let mut reader = AlignmentReader::from_path(&input).unwrap();
        let mut writer =
            create_annotated_writer(Some(&output), reader.header(), bam::Format::Sam).unwrap();
        let stats =
            annotate_alignments(&mut reader, &mut writer, &scorer, &references, *b"ZM").unwrap();
        drop(writer);
        assert_eq!(stats, AnnotationStats { records: 3, scored: 2 });

        let mut check = bam::Reader::from_path(&output).unwrap();
        let scores: Vec<Option<i64>> = check
            .records()
            .map(|r| {
                let r = r.unwrap();
                match r.aux(b"ZM") {
                    Ok(Aux::I8(v)) => Some(v as i64),
                    Ok(Aux::U8(v)) => Some(v as i64),
                    Ok(Aux::I16(v)) => Some(v as i64),
                    Ok(Aux::U16(v)) => Some(v as i64),
                    Ok(Aux::I32(v)) => Some(v as i64),
                    Ok(Aux::U32(v)) => Some(v as i64),
                    _ => None,
                }
            })
            .collect();
        let header_text = String::from_utf8_lossy(check.header().as_bytes()).into_owned();
        assert!(header_text.contains("@PG\tID:scaffold-qc"));
        assert_eq!(
            scores,
            vec![
                Some(3 * FLAT_MATCH as i64),
                Some(4 * FLAT_MATCH as i64),
                None
            ]
        );

        std::fs::remove_file(input).ok();
        std::fs::remove_file(output).ok();
    }
}
