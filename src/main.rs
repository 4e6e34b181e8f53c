use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rust_htslib::bam;
use tracing::info;
use tracing_subscriber::EnvFilter;

use scaffold_qc::config::{AnalysisConfig, ScoringConfig, FRAGMENT_COVERAGE_MAX_COUNT};
use scaffold_qc::genomics::{
    annotate_alignments, create_annotated_writer, merge_flagged_rows, write_regions,
    AlignmentReader, AlignmentScorer, BadJoinWindowAnalysis, FragmentCoverageAnalysis,
    InsertAnomalyAnalysis, ReferenceStore, ScoringMatrix, SequenceAnalysis, StreamingDriver,
    DEFAULT_MAX_GAP,
};

#[derive(Parser, Debug)]
#[command(
    name = "scaffold-qc",
    version,
    about = "Mate-pair anomaly scans, fragment coverage and PSSM scoring for assembly QC"
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct PairFilters {
    /// Minimum mapping quality.
    #[arg(long, default_value_t = scaffold_qc::config::DEFAULT_MIN_MAPQ)]
    min_mapq: u8,
    /// Smallest acceptable insert (inclusive).
    #[arg(long, default_value_t = scaffold_qc::config::DEFAULT_MIN_INSERT)]
    min_insert: u64,
    /// Largest acceptable insert (inclusive).
    #[arg(long, default_value_t = scaffold_qc::config::DEFAULT_MAX_INSERT)]
    max_insert: u64,
    /// Saturation cap for per-position counters.
    #[arg(long)]
    max_count: Option<u16>,
}

#[derive(Args, Debug)]
struct StreamArgs {
    /// Coordinate-sorted SAM/BAM/CRAM file (`-` for stdin).
    alignments: PathBuf,
    /// Output file (default: stdout).
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Per-base out-of-range, discontiguous and in-range pair counts.
    InsertAnomalies {
        #[command(flatten)]
        stream: StreamArgs,
        #[command(flatten)]
        filters: PairFilters,
        /// Bases skipped at each sequence end.
        #[arg(long, default_value_t = scaffold_qc::config::DEFAULT_EDGE_MARGIN)]
        edge_margin: u64,
    },
    /// Per-base fragment coverage.
    FragmentCoverage {
        #[command(flatten)]
        stream: StreamArgs,
        #[command(flatten)]
        filters: PairFilters,
    },
    /// Windowed counts of mates placed on other sequences.
    BadJoins {
        #[command(flatten)]
        stream: StreamArgs,
        /// Minimum mapping quality.
        #[arg(long, default_value_t = scaffold_qc::config::DEFAULT_MIN_MAPQ)]
        min_mapq: u8,
        /// Bases skipped at each sequence end.
        #[arg(long, default_value_t = scaffold_qc::config::DEFAULT_EDGE_MARGIN)]
        edge_margin: u64,
        /// Window width.
        #[arg(long, default_value_t = scaffold_qc::config::DEFAULT_WINDOW_SIZE)]
        window: u64,
        /// Distinct other-sequence ids remembered per window.
        #[arg(long, default_value_t = scaffold_qc::genomics::counters::DEFAULT_MAX_DISTINCT_IDS)]
        max_distinct_ids: usize,
    },
    /// Score alignments with a banded PSSM and write them back with a score tag.
    Score {
        /// SAM/BAM/CRAM file (`-` for stdin).
        alignments: PathBuf,
        /// FASTA reference the alignments were made against.
        #[arg(short, long)]
        reference: PathBuf,
        /// Banded substitution matrix (default: flat match/mismatch scores).
        #[arg(short, long)]
        matrix: Option<PathBuf>,
        /// Band radius of the matrix.
        #[arg(long, default_value_t = scaffold_qc::genomics::pssm::DEFAULT_BAND_RADIUS)]
        band_radius: usize,
        /// Gap open penalty.
        #[arg(long, default_value_t = scaffold_qc::config::DEFAULT_GAP_OPEN)]
        gap_open: i32,
        /// Gap extension penalty.
        #[arg(long, default_value_t = scaffold_qc::config::DEFAULT_GAP_EXTEND)]
        gap_extend: i32,
        /// Aux tag receiving the score.
        #[arg(long, default_value = "ZM")]
        tag: String,
        /// Output file (default: stdout).
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Output format.
        #[arg(long, value_enum, default_value_t = Format::Bam)]
        format: Format,
    },
    /// Merge flagged per-position rows into `name start end` regions.
    MergeRegions {
        /// Rows starting with `name<TAB>position` (`-` for stdin).
        input: PathBuf,
        /// Largest gap between positions of one region.
        #[arg(long, default_value_t = DEFAULT_MAX_GAP)]
        max_gap: u64,
        /// Output file (default: stdout).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Sam,
    Bam,
    Cram,
}

impl From<Format> for bam::Format {
    fn from(format: Format) -> Self {
        match format {
            Format::Sam => bam::Format::Sam,
            Format::Bam => bam::Format::Bam,
            Format::Cram => bam::Format::Cram,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::InsertAnomalies {
            stream,
            filters,
            edge_margin,
        } => {
            let config = filters.config(None).with_edge_margin(edge_margin);
            config.validate()?;
            run_stream(InsertAnomalyAnalysis::new(&config), &stream)?;
        }
        Commands::FragmentCoverage { stream, filters } => {
            let config = filters.config(Some(FRAGMENT_COVERAGE_MAX_COUNT));
            config.validate()?;
            run_stream(FragmentCoverageAnalysis::new(&config), &stream)?;
        }
        Commands::BadJoins {
            stream,
            min_mapq,
            edge_margin,
            window,
            max_distinct_ids,
        } => {
            let config = AnalysisConfig::default()
                .with_min_mapq(min_mapq)
                .with_edge_margin(edge_margin)
                .with_window_size(window)
                .with_max_distinct_ids(max_distinct_ids);
            config.validate()?;
            run_stream(BadJoinWindowAnalysis::new(&config), &stream)?;
        }
        Commands::Score {
            alignments,
            reference,
            matrix,
            band_radius,
            gap_open,
            gap_extend,
            tag,
            output,
            format,
        } => {
            let config = ScoringConfig::default()
                .with_band_radius(band_radius)
                .with_gap_penalties(gap_open, gap_extend)
                .with_tag(&tag)?;
            config.validate()?;
            run_score(
                &alignments,
                &reference,
                matrix.as_deref(),
                &config,
                output.as_deref(),
                format,
            )?;
        }
        Commands::MergeRegions {
            input,
            max_gap,
            output,
        } => run_merge(&input, max_gap, output.as_deref())?,
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("scaffold_qc={default_level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

impl PairFilters {
    fn config(&self, default_max_count: Option<u16>) -> AnalysisConfig {
        let config = AnalysisConfig::default()
            .with_min_mapq(self.min_mapq)
            .with_insert_range(self.min_insert, self.max_insert);
        match self.max_count.or(default_max_count) {
            Some(max_count) => config.with_max_count(max_count),
            None => config,
        }
    }
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(
            File::create(path)
                .with_context(|| format!("failed to create output {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    })
}

fn open_input(path: &Path) -> Result<Box<dyn BufRead>> {
    Ok(if path == Path::new("-") {
        Box::new(BufReader::new(io::stdin().lock()))
    } else {
        Box::new(BufReader::new(
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?,
        ))
    })
}

fn run_stream<A: SequenceAnalysis>(analysis: A, stream: &StreamArgs) -> Result<()> {
    let name = analysis.name();
    let mut reader = AlignmentReader::from_path(&stream.alignments)
        .with_context(|| format!("failed to open alignments {}", stream.alignments.display()))?;
    let targets = reader.targets().clone();
    let out = open_output(stream.output.as_deref())?;

    let stats = StreamingDriver::new(analysis, &targets, out)
        .run(reader.records())
        .with_context(|| format!("{name} failed on {}", stream.alignments.display()))?;
    info!(
        records = stats.records,
        unplaced = stats.unplaced,
        rows = stats.rows_written,
        "done"
    );
    Ok(())
}

fn run_score(
    alignments: &Path,
    reference: &Path,
    matrix: Option<&Path>,
    config: &ScoringConfig,
    output: Option<&Path>,
    format: Format,
) -> Result<()> {
    let matrix = match matrix {
        Some(path) => ScoringMatrix::load_with_radius(path, config.band_radius)
            .with_context(|| format!("failed to load matrix {}", path.display()))?,
        None => ScoringMatrix::flat(config.band_radius)?,
    };
    let references = ReferenceStore::from_fasta(reference)
        .with_context(|| format!("failed to load reference {}", reference.display()))?;
    info!(sequences = references.len(), "loaded reference");

    let scorer = AlignmentScorer::new(matrix, config);
    let mut reader = AlignmentReader::from_path(alignments)
        .with_context(|| format!("failed to open alignments {}", alignments.display()))?;
    let mut writer = create_annotated_writer(output, reader.header(), format.into())?;

    let stats = annotate_alignments(&mut reader, &mut writer, &scorer, &references, config.tag)?;
    info!(records = stats.records, scored = stats.scored, "scoring complete");
    Ok(())
}

fn run_merge(input: &Path, max_gap: u64, output: Option<&Path>) -> Result<()> {
    let regions = merge_flagged_rows(open_input(input)?, max_gap)
        .with_context(|| format!("failed to read flagged rows from {}", input.display()))?;
    let mut out = open_output(output)?;
    write_regions(&mut out, &regions)?;
    info!(regions = regions.len(), "merged flagged positions");
    Ok(())
}
