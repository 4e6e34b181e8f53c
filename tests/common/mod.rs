#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use scaffold_qc::genomics::{parse_cigar, AlignmentFlags, AlignmentRecord};

fn snapshot_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("snapshots")
}

pub fn assert_snapshot(name: &str, actual: &str) {
    let path = snapshot_root().join(name);
    if std::env::var("SCAFFOLD_QC_UPDATE_SNAPSHOTS").is_ok() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create snapshot directory");
        }
        fs::write(&path, actual).expect("write snapshot");
        return;
    }

    let expected =
        fs::read_to_string(&path).unwrap_or_else(|_| panic!("snapshot {:?} not found", path));
    if normalize(&expected) != normalize(actual) {
        panic!(
            "Snapshot mismatch for {:?}. Set SCAFFOLD_QC_UPDATE_SNAPSHOTS=1 to regenerate.\nExpected:\n{}\nActual:\n{}",
            path,
            expected,
            actual
        );
    }
}

fn normalize(input: &str) -> String {
    input.replace("\r\n", "\n")
}

/// Mapped read-1 with a mate, MAPQ 60.
pub fn first_mate(
    tid: u32,
    pos: u64,
    cigar: &str,
    mate_tid: Option<u32>,
    mate_pos: u64,
    insert: i64,
) -> AlignmentRecord {
    let cigar = parse_cigar(cigar).expect("valid cigar");
    let len: usize = cigar
        .iter()
        .filter(|op| op.kind.consumes_read())
        .map(|op| op.len as usize)
        .sum();
    AlignmentRecord::new(format!("pair_{tid}_{pos}"), tid, pos, 60, cigar, vec![b'A'; len])
        .with_mate(mate_tid, mate_pos, insert)
        .with_flags(AlignmentFlags {
            paired: true,
            first_in_pair: true,
            ..AlignmentFlags::default()
        })
}

/// Same as [`first_mate`] but flagged as read-2.
pub fn second_mate(
    tid: u32,
    pos: u64,
    cigar: &str,
    mate_tid: Option<u32>,
    mate_pos: u64,
    insert: i64,
) -> AlignmentRecord {
    let mut record = first_mate(tid, pos, cigar, mate_tid, mate_pos, insert);
    record.flags.first_in_pair = false;
    record.flags.second_in_pair = true;
    record
}

pub fn run_to_string<A, I>(
    analysis: A,
    targets: &scaffold_qc::TargetDictionary,
    records: I,
) -> String
where
    A: scaffold_qc::SequenceAnalysis,
    I: IntoIterator<Item = AlignmentRecord>,
{
    let mut out = Vec::new();
    scaffold_qc::StreamingDriver::new(analysis, targets, &mut out)
        .run(records.into_iter().map(Ok::<_, scaffold_qc::AnalysisError>))
        .expect("driver run succeeds");
    String::from_utf8(out).expect("utf8 output")
}
