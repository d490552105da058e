//! Paired-end read mapping: seeds, chains, banded Smith-Waterman, pairing.

pub mod chain;
pub mod insert;
pub mod mapq;
pub mod pair;
pub mod pipeline;
pub mod seed;
pub mod sw;

use crate::index::fm::FMIndex;
use crate::util::cigar::Cigar;
use crate::util::dna;

use chain::{build_chains, filter_chains, Chain};
use insert::InsertSizeModel;
use seed::find_seeds;
use sw::{banded_sw_at, SwBuffer, SwParams};

pub use pipeline::{align_paired_fastq, AlignStats};

/// 比对参数
#[derive(Debug, Clone)]
pub struct AlignOpt {
    pub match_score: i32,
    pub mismatch_penalty: i32,
    pub gap_open: i32,
    pub gap_extend: i32,
    pub band_width: usize,
    /// 最短种子长度
    pub min_seed_len: usize,
    /// 出现次数超过该值的种子视为重复序列而丢弃
    pub max_occ: usize,
    pub max_chain_gap: usize,
    pub chain_drop_ratio: f64,
    pub max_chains: usize,
    /// 低于该得分的比对被丢弃
    pub min_score: i32,
    /// 每条 read 保留的候选比对数
    pub max_hits: usize,
    pub unpaired_penalty: i32,
    /// 插入长度估计失败时的上限
    pub max_insert: u32,
    /// 每个锚点最多尝试救援多少次
    pub max_rescue: usize,
    pub batch_size: usize,
    /// 0 表示使用全部核心
    pub threads: usize,
    /// 输出 `M` 而不是 `=`/`X`
    pub classic_cigar: bool,
}

impl Default for AlignOpt {
    fn default() -> Self {
        Self {
            match_score: 1,
            mismatch_penalty: 4,
            gap_open: 6,
            gap_extend: 1,
            band_width: 32,
            min_seed_len: 19,
            max_occ: 500,
            max_chain_gap: 100,
            chain_drop_ratio: 0.5,
            max_chains: 8,
            min_score: 30,
            max_hits: 5,
            unpaired_penalty: 17,
            max_insert: 1000,
            max_rescue: 2,
            batch_size: 10_000,
            threads: 1,
            classic_cigar: false,
        }
    }
}

impl AlignOpt {
    pub fn sw_params(&self) -> SwParams {
        SwParams {
            match_score: self.match_score,
            mismatch_penalty: self.mismatch_penalty,
            gap_open: self.gap_open,
            gap_extend: self.gap_extend,
            band_width: self.band_width,
        }
    }
}

/// 一条 read 在参考上的一个局部比对
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub contig: usize,
    /// read 的反向互补与参考正链对齐
    pub rev: bool,
    /// contig 内 0-based 半开区间
    pub ref_start: u32,
    pub ref_end: u32,
    /// 在比对方向的 read 上的区间
    pub query_start: usize,
    pub query_end: usize,
    pub score: i32,
    pub nm: u32,
    /// 含两端 soft clip
    pub cigar: Cigar,
}

impl Hit {
    /// 同一 contig 同一方向且参考区间重叠超过较短者的一半
    pub fn is_redundant_with(&self, other: &Hit) -> bool {
        if self.contig != other.contig || self.rev != other.rev {
            return false;
        }
        let b = self.ref_start.max(other.ref_start);
        let e = self.ref_end.min(other.ref_end);
        if e <= b {
            return false;
        }
        let shorter = (self.ref_end - self.ref_start).min(other.ref_end - other.ref_start);
        (e - b) * 2 > shorter
    }
}

/// 按得分降序排序，去重，截断到 `max_hits`
pub(crate) fn finalize_hits(mut hits: Vec<Hit>, max_hits: usize) -> Vec<Hit> {
    hits.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then(a.contig.cmp(&b.contig))
            .then(a.ref_start.cmp(&b.ref_start))
            .then(a.rev.cmp(&b.rev))
    });
    let mut kept: Vec<Hit> = Vec::with_capacity(hits.len().min(max_hits));
    for h in hits {
        if kept.len() >= max_hits {
            break;
        }
        if kept.iter().all(|k| !h.is_redundant_with(k)) {
            kept.push(h);
        }
    }
    kept
}

/// 单条 read 的比对器，持有索引与参数的引用，可在线程间共享
pub struct Aligner<'a> {
    fm: &'a FMIndex,
    opt: &'a AlignOpt,
}

impl<'a> Aligner<'a> {
    pub fn new(fm: &'a FMIndex, opt: &'a AlignOpt) -> Self {
        Self { fm, opt }
    }

    pub fn opt(&self) -> &AlignOpt {
        self.opt
    }

    /// 两条链方向上的所有候选比对，`seq` 为编码后的正向 read
    pub fn align_read(&self, seq: &[u8], buf: &mut SwBuffer) -> Vec<Hit> {
        let opt = self.opt;
        if seq.len() < opt.min_seed_len {
            return Vec::new();
        }
        let rc = dna::revcomp_codes(seq);

        let mut seeds = find_seeds(self.fm, seq, false, opt.min_seed_len, opt.max_occ);
        seeds.extend(find_seeds(self.fm, &rc, true, opt.min_seed_len, opt.max_occ));
        if seeds.is_empty() {
            return Vec::new();
        }

        let mut chains = build_chains(&seeds, opt.max_chain_gap);
        filter_chains(&mut chains, opt.chain_drop_ratio, opt.max_chains);

        let mut hits: Vec<Hit> = Vec::with_capacity(chains.len());
        for chain in &chains {
            let query = if chain.rev { &rc[..] } else { seq };
            if let Some(hit) = self.extend_chain(chain, query, buf) {
                if hits.iter().all(|h| !hit.is_redundant_with(h)) {
                    hits.push(hit);
                }
            }
        }
        finalize_hits(hits, opt.max_hits)
    }

    /// 以链的锚定对角线为中心，在参考窗口内做带状 SW
    fn extend_chain(&self, chain: &Chain, query: &[u8], buf: &mut SwBuffer) -> Option<Hit> {
        let contig_len = i64::from(self.fm.contigs[chain.contig].len);
        let diag = chain.anchor_diag();
        let pad = self.opt.band_width as i64;
        let win_start = (diag - pad).clamp(0, contig_len);
        let win_end = (diag + query.len() as i64 + pad).clamp(win_start, contig_len);
        let window = self.fm.contig_slice(chain.contig, win_start as u32, win_end as u32);
        let sw_diag = (diag - win_start) as isize;
        self.align_in_window(query, chain.rev, chain.contig, win_start as u32, window, sw_diag, self.opt.sw_params(), buf)
    }

    fn align_in_window(
        &self,
        query: &[u8],
        rev: bool,
        contig: usize,
        win_start: u32,
        window: &[u8],
        diag: isize,
        params: SwParams,
        buf: &mut SwBuffer,
    ) -> Option<Hit> {
        let res = banded_sw_at(query, window, diag, params, buf);
        if res.score < self.opt.min_score {
            return None;
        }
        let clip_left = res.query_start as u32;
        let clip_right = (query.len() - res.query_end) as u32;
        let cigar = res.cigar.with_soft_clips(clip_left, clip_right);
        debug_assert_eq!(cigar.query_len() as usize, query.len());
        debug_assert_eq!(cigar.ref_len() as usize, res.ref_end - res.ref_start);
        Some(Hit {
            contig,
            rev,
            ref_start: win_start + res.ref_start as u32,
            ref_end: win_start + res.ref_end as u32,
            query_start: res.query_start,
            query_end: res.query_end,
            score: res.score,
            nm: res.nm,
            cigar,
        })
    }

    /// 在锚点 mate 按插入长度模型预测的窗口内做全宽 SW，找回另一端。
    ///
    /// FR 方向：正链锚点在左，mate 为反向互补且位于其右侧；反之亦然。
    pub fn rescue_mate(
        &self,
        anchor: &Hit,
        mate: &[u8],
        model: &InsertSizeModel,
        buf: &mut SwBuffer,
    ) -> Option<Hit> {
        if mate.is_empty() {
            return None;
        }
        let contig_len = i64::from(self.fm.contigs[anchor.contig].len);
        let mlen = mate.len() as i64;
        let (lo, hi) = if anchor.rev {
            let end = i64::from(anchor.ref_end);
            (end - i64::from(model.high), end - i64::from(model.low) + mlen)
        } else {
            let start = i64::from(anchor.ref_start);
            (start + i64::from(model.low) - mlen, start + i64::from(model.high))
        };
        let lo = lo.clamp(0, contig_len);
        let hi = hi.clamp(lo, contig_len);
        if hi - lo < self.opt.min_seed_len as i64 {
            return None;
        }

        let rev = !anchor.rev;
        let query = if rev { dna::revcomp_codes(mate) } else { mate.to_vec() };
        let window = self.fm.contig_slice(anchor.contig, lo as u32, hi as u32);
        let mut params = self.opt.sw_params();
        params.band_width = window.len() + query.len();
        let hit = self.align_in_window(&query, rev, anchor.contig, lo as u32, window, 0, params, buf)?;
        log::trace!(
            "rescued mate at contig {} pos {} score {}",
            anchor.contig,
            hit.ref_start,
            hit.score
        );
        Some(hit)
    }
}
