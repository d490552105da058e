use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

use humdum::align::{self, AlignOpt};
use humdum::index::builder::{self, IndexOpt};
use humdum::index::sa::SaAlgorithm;
use humdum::qc::{self, QcOpt};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(
    name = "humdum",
    author,
    version,
    about = "Paired-end short-read aligner with SAM output and QC plots",
    arg_required_else_help = true
)]
struct Cli {
    /// 日志级别：默认 warn，-v info，-vv debug，-vvv trace；RUST_LOG 优先
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct IndexArgs {
    /// 每隔多少个参考位置保存一个后缀数组值
    #[arg(long, default_value_t = IndexOpt::default().sa_sample)]
    sa_sample: u32,
    /// Occ 检查点间隔
    #[arg(long, default_value_t = IndexOpt::default().occ_block)]
    occ_block: usize,
    /// 后缀数组构建算法
    #[arg(long, value_enum, default_value_t = SaAlgorithm::default())]
    sa_algo: SaAlgorithm,
}

impl From<&IndexArgs> for IndexOpt {
    fn from(a: &IndexArgs) -> Self {
        IndexOpt { sa_sample: a.sa_sample, occ_block: a.occ_block, sa_algo: a.sa_algo }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build an FM-index of a reference FASTA (written to PREFIX.fm)
    Index {
        /// Reference FASTA file
        reference: PathBuf,
        /// Output prefix, defaults to the reference path
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        index: IndexArgs,
    },
    /// Align paired FASTQ files and write SAM
    Align {
        /// Reference FASTA (indexed in memory unless GENOME.fm exists) or a .fm index
        genome: PathBuf,
        /// Mate 1 FASTQ
        reads1: PathBuf,
        /// Mate 2 FASTQ
        reads2: PathBuf,
        /// Output SAM path (stdout if omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,
        #[arg(long = "match", default_value_t = AlignOpt::default().match_score)]
        match_score: i32,
        #[arg(long = "mismatch", default_value_t = AlignOpt::default().mismatch_penalty)]
        mismatch_penalty: i32,
        #[arg(long = "gap-open", default_value_t = AlignOpt::default().gap_open)]
        gap_open: i32,
        #[arg(long = "gap-ext", default_value_t = AlignOpt::default().gap_extend)]
        gap_extend: i32,
        #[arg(long = "band-width", default_value_t = AlignOpt::default().band_width)]
        band_width: usize,
        /// Minimum seed length
        #[arg(short = 'k', long, default_value_t = AlignOpt::default().min_seed_len)]
        min_seed_len: usize,
        /// Seeds occurring more often than this are skipped
        #[arg(long, default_value_t = AlignOpt::default().max_occ)]
        max_occ: usize,
        /// Minimum alignment score to report
        #[arg(short = 'T', long, default_value_t = AlignOpt::default().min_score)]
        min_score: i32,
        #[arg(long, default_value_t = AlignOpt::default().unpaired_penalty)]
        unpaired_penalty: i32,
        /// Insert size upper bound used until the distribution is estimated
        #[arg(long, default_value_t = AlignOpt::default().max_insert)]
        max_insert: u32,
        /// Read pairs per batch
        #[arg(long, default_value_t = AlignOpt::default().batch_size)]
        batch_size: usize,
        /// Worker threads (0 = all cores)
        #[arg(short = 't', long, default_value_t = AlignOpt::default().threads)]
        threads: usize,
        /// Write M instead of =/X in CIGAR strings
        #[arg(long)]
        classic_cigar: bool,
        #[command(flatten)]
        index: IndexArgs,
    },
    /// Coverage, template length and MAPQ report for a SAM file
    Qc {
        /// Input SAM (- for stdin)
        sam: PathBuf,
        /// Output directory for plots and summary.json
        #[arg(short, long, default_value = "qc")]
        outdir: PathBuf,
        #[arg(long, default_value_t = QcOpt::default().tlen_bin)]
        tlen_bin: u32,
        #[arg(long, default_value_t = QcOpt::default().tlen_max)]
        tlen_max: u32,
        /// Points in the coverage plot
        #[arg(long, default_value_t = QcOpt::default().coverage_bins)]
        coverage_bins: usize,
    },
}

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_secs()
        .format_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    match cli.command {
        Commands::Index { reference, output, index } => {
            builder::index_reference(&reference, output.as_deref(), (&index).into())?;
            Ok(())
        }
        Commands::Align {
            genome,
            reads1,
            reads2,
            out,
            match_score,
            mismatch_penalty,
            gap_open,
            gap_extend,
            band_width,
            min_seed_len,
            max_occ,
            min_score,
            unpaired_penalty,
            max_insert,
            batch_size,
            threads,
            classic_cigar,
            index,
        } => {
            let opt = AlignOpt {
                match_score,
                mismatch_penalty,
                gap_open,
                gap_extend,
                band_width,
                min_seed_len,
                max_occ,
                min_score,
                unpaired_penalty,
                max_insert,
                batch_size,
                threads,
                classic_cigar,
                ..AlignOpt::default()
            };
            align::align_paired_fastq(&genome, &reads1, &reads2, out.as_deref(), &opt, (&index).into())?;
            Ok(())
        }
        Commands::Qc { sam, outdir, tlen_bin, tlen_max, coverage_bins } => {
            let opt = QcOpt { tlen_bin, tlen_max, coverage_bins, ..QcOpt::default() };
            qc::run_qc(&sam, &outdir, &opt)?;
            Ok(())
        }
    }
}
