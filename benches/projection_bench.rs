//! Throughput of the per-record hot paths.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use scaffold_qc::config::{AnalysisConfig, ScoringConfig};
use scaffold_qc::genomics::{
    parse_cigar, project, AlignmentRecord, AlignmentScorer, InsertAnomalyAnalysis,
    ScoringMatrix, SequenceAnalysis,
};

fn benchmark_projection(c: &mut Criterion) {
    let ops = parse_cigar("5S40M2I30M3D23M").expect("valid cigar");
    c.bench_function("project_100bp", |b| {
        b.iter(|| project(black_box(1_000), black_box(&ops)).count());
    });
}

fn benchmark_scoring(c: &mut Criterion) {
    let reference: Vec<u8> = b"ACGT".iter().copied().cycle().take(10_000).collect();
    let record = AlignmentRecord::new(
        "bench",
        0,
        2_000,
        60,
        parse_cigar("100M").expect("valid cigar"),
        reference[2_000..2_100].to_vec(),
    );
    let config = ScoringConfig::default();
    let scorer = AlignmentScorer::new(
        ScoringMatrix::flat(config.band_radius).expect("flat matrix"),
        &config,
    );
    c.bench_function("score_100bp", |b| {
        b.iter(|| scorer.score(black_box(&record), "bench", &reference));
    });
}

fn benchmark_insert_tracks(c: &mut Criterion) {
    let analysis = InsertAnomalyAnalysis::new(&AnalysisConfig::default());
    let mut record = AlignmentRecord::new(
        "pair",
        0,
        10_000,
        60,
        parse_cigar("100M").expect("valid cigar"),
        vec![b'A'; 100],
    )
    .with_mate(Some(0), 13_000, 3_100);
    record.flags.first_in_pair = true;

    c.bench_function("observe_in_range_pair", |b| {
        let mut tracks = analysis.open(100_000).expect("long enough");
        b.iter(|| analysis.observe(&mut tracks, black_box(&record)));
    });
}

criterion_group!(benches, benchmark_projection, benchmark_scoring, benchmark_insert_tracks);
criterion_main!(benches);
