use anyhow::{Context, Result};
use rayon::prelude::*;
use std::io::{BufRead, Write};
use std::path::Path;
use std::time::Instant;

use crate::index::builder::{load_or_build, IndexOpt};
use crate::index::fm::FMIndex;
use crate::io::fastq::PairedFastqReader;
use crate::io::sam::{flags, write_header, ProgramInfo, SamRecord};
use crate::io::{open_input, open_output};
use crate::util::dna;

use super::insert::InsertSizeModel;
use super::pair::{build_records, choose_pair, chosen_rescues, fr_insert, rescue_mates};
use super::sw::SwBuffer;
use super::{AlignOpt, Aligner, Hit};

/// 比对汇总
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlignStats {
    pub pairs: u64,
    pub mapped_reads: u64,
    pub proper_pairs: u64,
    pub rescued: u64,
}

impl AlignStats {
    fn add(&mut self, records: &[SamRecord; 2], rescued: usize) {
        self.pairs += 1;
        self.mapped_reads += records.iter().filter(|r| r.is_mapped()).count() as u64;
        if records[0].has(flags::PROPER_PAIR) {
            self.proper_pairs += 1;
        }
        self.rescued += rescued as u64;
    }
}

struct MappedPair {
    codes: [Vec<u8>; 2],
    hits: [Vec<Hit>; 2],
}

/// 两端都只有一个候选比对的 FR 配对，用于估计插入长度
fn estimate_insert_model(batch: &[MappedPair], max_insert: u32) -> InsertSizeModel {
    let inserts: Vec<u32> = batch
        .iter()
        .filter(|m| m.hits[0].len() == 1 && m.hits[1].len() == 1)
        .filter_map(|m| fr_insert(&m.hits[0][0], &m.hits[1][0]))
        .collect();
    InsertSizeModel::estimate(&inserts, max_insert)
}

/// `humdum align` 的入口：加载（或现场构建）索引，读入两个 FASTQ，写出 SAM
pub fn align_paired_fastq(
    genome: &Path,
    reads1: &Path,
    reads2: &Path,
    out: Option<&Path>,
    opt: &AlignOpt,
    index_opt: IndexOpt,
) -> Result<AlignStats> {
    let fm = load_or_build(genome, index_opt)?;
    let mut reader = PairedFastqReader::new(
        open_input(reads1).with_context(|| format!("cannot read mate 1 reads '{}'", reads1.display()))?,
        open_input(reads2).with_context(|| format!("cannot read mate 2 reads '{}'", reads2.display()))?,
    );
    let mut writer = open_output(out)?;
    align_pairs(&fm, &mut reader, &mut writer, opt)
}

/// 按批读入 read 对：并行做单端比对，用首批估计插入长度，再并行配对，最后按输入顺序写出
pub fn align_pairs<R1: BufRead, R2: BufRead, W: Write>(
    fm: &FMIndex,
    reader: &mut PairedFastqReader<R1, R2>,
    out: &mut W,
    opt: &AlignOpt,
) -> Result<AlignStats> {
    let program = ProgramInfo {
        id: "humdum".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        command_line: std::env::args().collect::<Vec<_>>().join(" "),
    };
    write_header(out, &fm.contigs, &program)?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opt.threads)
        .build()
        .context("cannot start worker threads")?;
    log::info!("aligning with {} threads, batches of {} pairs", pool.current_num_threads(), opt.batch_size);

    let aligner = Aligner::new(fm, opt);
    let mut model: Option<InsertSizeModel> = None;
    let mut stats = AlignStats::default();
    let start = Instant::now();

    loop {
        let batch = reader.next_batch(opt.batch_size.max(1))?;
        if batch.is_empty() {
            break;
        }

        let mapped: Vec<MappedPair> = pool.install(|| {
            batch
                .par_iter()
                .map_init(SwBuffer::new, |buf, (r1, r2)| {
                    let codes = [dna::encode_seq(&r1.seq), dna::encode_seq(&r2.seq)];
                    let hits = [aligner.align_read(&codes[0], buf), aligner.align_read(&codes[1], buf)];
                    MappedPair { codes, hits }
                })
                .collect()
        });

        let insert_model = &*model.get_or_insert_with(|| estimate_insert_model(&mapped, opt.max_insert));

        let results: Vec<([SamRecord; 2], usize)> = pool.install(|| {
            mapped
                .into_par_iter()
                .zip(batch.par_iter())
                .map_init(SwBuffer::new, |buf, (pair, (r1, r2))| {
                    let MappedPair { codes, hits: [mut h1, mut h2] } = pair;
                    let rescued2 = rescue_mates(&aligner, &h1, &codes[1], &mut h2, insert_model, buf);
                    let rescued1 = rescue_mates(&aligner, &h2, &codes[0], &mut h1, insert_model, buf);
                    let choice = choose_pair(&h1, &h2, insert_model, opt);
                    let rescued = chosen_rescues(&choice, [rescued1.as_slice(), rescued2.as_slice()]);
                    (build_records([r1, r2], &choice, &fm.contigs, opt.classic_cigar), rescued)
                })
                .collect()
        });

        for (records, rescued) in &results {
            for rec in records {
                writeln!(out, "{}", rec)?;
            }
            stats.add(records, *rescued);
        }
        log::info!("processed {} read pairs in {:.2} s", stats.pairs, start.elapsed().as_secs_f64());
    }
    out.flush()?;

    let reads = (stats.pairs * 2).max(1) as f64;
    log::info!(
        "{} pairs: {} reads mapped ({:.2}%), {} proper pairs, {} mates rescued",
        stats.pairs,
        stats.mapped_reads,
        100.0 * stats.mapped_reads as f64 / reads,
        stats.proper_pairs,
        stats.rescued
    );
    Ok(stats)
}
