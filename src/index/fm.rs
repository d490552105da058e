use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use super::bwt::build_bwt;
use super::rank::RankBitVec;
use crate::util::dna::{SENTINEL, SIGMA};

/// 索引文件格式版本，结构体字段变化时递增
pub const FORMAT_VERSION: u32 = 3;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Contig {
    pub name: String,
    pub len: u32,
    /// 在拼接文本中的起始偏移
    pub offset: u32,
}

#[derive(Debug, Default, Serialize, Deserialize, Clone)]
pub struct IndexMeta {
    pub reference_file: Option<String>,
    pub build_args: Option<String>,
    pub build_timestamp: Option<String>,
}

/// FM 索引：
/// - BWT 按字节存放，Occ 每 `occ_block` 行一个检查点，块内顺扫补偿；
/// - SA 按文本位置采样（pos % sa_sample == 0，以及每个 contig 的起点），
///   未采样的行通过 LF 回溯到最近的采样行；
/// - 同时保存编码后的拼接参考序列，供 Smith-Waterman 取窗口。
#[derive(Debug, Serialize, Deserialize)]
pub struct FMIndex {
    pub version: u32,
    pub occ_block: u32,
    pub sa_sample: u32,
    /// C[a] = 文本中字母 < a 的累计数量
    pub c: Vec<u32>,
    pub bwt: Vec<u8>,
    /// occ_samples[block_id * SIGMA + a] = bwt[0..block_id*occ_block) 中 a 的个数
    pub occ_samples: Vec<u32>,
    /// 采样行对应的文本位置，按行号顺序
    pub sa_samples: Vec<u32>,
    pub sampled_rows: RankBitVec,
    /// 编码后的拼接文本（contig 之间以 0 分隔，末尾以 0 结束）
    pub text: Vec<u8>,
    pub contigs: Vec<Contig>,
    pub meta: IndexMeta,
}

impl FMIndex {
    pub fn build(text: Vec<u8>, sa: &[u32], contigs: Vec<Contig>, sa_sample: u32, occ_block: usize) -> Self {
        let n = text.len();
        let sa_sample = sa_sample.max(1);
        let block = occ_block.max(1);
        let bwt = build_bwt(&text, sa);

        let mut freq = [0u32; SIGMA];
        for &ch in &text {
            freq[ch as usize] += 1;
        }
        let mut c = vec![0u32; SIGMA];
        let mut acc = 0u32;
        for a in 0..SIGMA {
            c[a] = acc;
            acc += freq[a];
        }

        // 检查点个数取 n / block + 1，使得 occ(a, n) 也能落在某个块内
        let num_blocks = n / block + 1;
        let mut occ_samples = vec![0u32; num_blocks * SIGMA];
        let mut running = [0u32; SIGMA];
        for bi in 0..num_blocks {
            occ_samples[bi * SIGMA..(bi + 1) * SIGMA].copy_from_slice(&running);
            let start = bi * block;
            let end = ((bi + 1) * block).min(n);
            if start < end {
                for &ch in &bwt[start..end] {
                    running[ch as usize] += 1;
                }
            }
        }

        let is_sampled = |p: u32| p % sa_sample == 0 || text[p as usize - 1] == SENTINEL;
        let sampled_rows = RankBitVec::from_bits(sa.iter().map(|&p| is_sampled(p)));
        let sa_samples: Vec<u32> = sa.iter().copied().filter(|&p| is_sampled(p)).collect();

        Self {
            version: FORMAT_VERSION,
            occ_block: block as u32,
            sa_sample,
            c,
            bwt,
            occ_samples,
            sa_samples,
            sampled_rows,
            text,
            contigs,
            meta: IndexMeta::default(),
        }
    }

    pub fn set_meta(&mut self, meta: IndexMeta) {
        self.meta = meta;
    }

    /// BWT 行数（= 文本长度）
    #[inline]
    pub fn len(&self) -> usize {
        self.bwt.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bwt.is_empty()
    }

    /// 返回 BWT[0..pos) 中 a 的出现次数
    #[inline]
    pub fn occ(&self, a: u8, pos: usize) -> u32 {
        let block = self.occ_block as usize;
        let bi = pos / block;
        let base = self.occ_samples[bi * SIGMA + a as usize];
        let start = bi * block;
        let add = self.bwt[start..pos].iter().filter(|&&ch| ch == a).count() as u32;
        base + add
    }

    /// 在 SA 区间 [l, r) 左侧扩展字符 a，返回新区间（可能为空）
    #[inline]
    pub fn extend_left(&self, a: u8, l: usize, r: usize) -> (usize, usize) {
        let c0 = self.c[a as usize] as usize;
        (c0 + self.occ(a, l) as usize, c0 + self.occ(a, r) as usize)
    }

    /// 反向搜索精确匹配；pat 为编码后的字母表，不应含 0
    pub fn backward_search(&self, pat: &[u8]) -> Option<(usize, usize)> {
        if self.bwt.is_empty() {
            return None;
        }
        let (mut l, mut r) = (0usize, self.bwt.len());
        for &a in pat.iter().rev() {
            if a == SENTINEL {
                return None;
            }
            let (nl, nr) = self.extend_left(a, l, r);
            if nl >= nr {
                return None;
            }
            l = nl;
            r = nr;
        }
        Some((l, r))
    }

    #[inline]
    fn lf(&self, row: usize) -> usize {
        let a = self.bwt[row];
        self.c[a as usize] as usize + self.occ(a, row) as usize
    }

    /// SA[row]：沿 LF 回溯到采样行。contig 起点都被采样，所以不会跨越分隔符回溯。
    pub fn locate(&self, row: usize) -> u32 {
        let mut row = row;
        let mut steps = 0u32;
        while !self.sampled_rows.get(row) {
            row = self.lf(row);
            steps += 1;
        }
        self.sa_samples[self.sampled_rows.rank1(row)] + steps
    }

    /// 只用 BWT 和 Occ 沿 LF 倒推出整个拼接文本（含分隔符）
    pub fn recover_text(&self) -> Vec<u8> {
        let n = self.len();
        let mut out = vec![SENTINEL; n];
        // 第 0 行是末尾单独一个 `$` 的后缀
        let mut row = 0usize;
        for i in (0..n.saturating_sub(1)).rev() {
            out[i] = self.bwt[row];
            row = self.lf(row);
        }
        out
    }

    /// 区间内最多 `limit` 个文本位置
    pub fn locate_interval(&self, l: usize, r: usize, limit: usize) -> Vec<u32> {
        (l..r).take(limit).map(|row| self.locate(row)).collect()
    }

    /// 将文本位置映射到 (contig_index, contig_offset)。落在分隔符上返回 None。
    pub fn map_text_pos(&self, pos: u32) -> Option<(usize, u32)> {
        let idx = self.contigs.partition_point(|c| c.offset + c.len <= pos);
        let contig = self.contigs.get(idx)?;
        if pos >= contig.offset && pos < contig.offset + contig.len {
            Some((idx, pos - contig.offset))
        } else {
            None
        }
    }

    /// 编码后的 contig 子序列 [start, end)，越界部分被截断
    pub fn contig_slice(&self, contig: usize, start: u32, end: u32) -> &[u8] {
        let c = &self.contigs[contig];
        let end = end.min(c.len);
        let start = start.min(end);
        &self.text[(c.offset + start) as usize..(c.offset + end) as usize]
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let f = std::fs::File::create(path)
            .with_context(|| format!("cannot create index file '{}'", path.display()))?;
        let mut w = BufWriter::new(f);
        bincode::serialize_into(&mut w, self)?;
        w.flush()?;
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let f = std::fs::File::open(path)
            .with_context(|| format!("cannot open index file '{}'", path.display()))?;
        let idx: Self = bincode::deserialize_from(BufReader::new(f))
            .with_context(|| format!("'{}' is not a readable index", path.display()))?;
        if idx.version != FORMAT_VERSION {
            bail!(
                "index '{}' has format version {}, expected {}; rebuild it with `humdum index`",
                path.display(),
                idx.version,
                FORMAT_VERSION
            );
        }
        Ok(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::sa::{build_sa, SaAlgorithm};
    use crate::util::dna;

    fn build(contigs: &[&[u8]], sa_sample: u32, block: usize) -> (FMIndex, Vec<u32>) {
        let mut text = Vec::new();
        let mut table = Vec::new();
        for (i, seq) in contigs.iter().enumerate() {
            let offset = text.len() as u32;
            text.extend(dna::encode_seq(seq));
            table.push(Contig { name: format!("c{}", i), len: seq.len() as u32, offset });
            text.push(SENTINEL);
        }
        let sa = build_sa(&text, SaAlgorithm::Ks);
        (FMIndex::build(text, &sa, table, sa_sample, block), sa)
    }

    fn occurrences(hay: &[u8], needle: &[u8]) -> usize {
        hay.windows(needle.len()).filter(|w| *w == needle).count()
    }

    #[test]
    fn text_is_recovered_from_bwt_alone() {
        let (fm, _) = build(&[&b"GATTACA"[..], b"ACGTNACGT", b"T"], 4, 3);
        assert_eq!(fm.recover_text(), fm.text);
        let (one, _) = build(&[&b"A"[..]], 1, 1);
        assert_eq!(one.recover_text(), vec![1, SENTINEL]);
    }

    #[test]
    fn backward_search_counts_all_occurrences() {
        let seq = b"ACGTACGTTTACGAACGT";
        let (fm, _) = build(&[seq], 4, 3);
        for pat in [&b"ACG"[..], b"CGT", b"TTT", b"GAAC", b"A"] {
            let (l, r) = fm.backward_search(&dna::encode_seq(pat)).unwrap();
            assert_eq!(r - l, occurrences(seq, pat), "pattern {:?}", pat);
        }
        assert!(fm.backward_search(&dna::encode_seq(b"GGGG")).is_none());
    }

    #[test]
    fn locate_agrees_with_full_sa_for_any_sampling() {
        let contigs: [&[u8]; 3] = [b"ACGTTGCANNACGT", b"TTGACCA", b"GATTACAGATTACA"];
        for rate in [1u32, 2, 3, 5, 32] {
            let (fm, sa) = build(&contigs, rate, 4);
            for (row, &pos) in sa.iter().enumerate() {
                assert_eq!(fm.locate(row), pos, "rate={} row={}", rate, row);
            }
        }
    }

    #[test]
    fn map_text_pos_skips_separators() {
        let (fm, _) = build(&[b"ACGT", b"GG"], 8, 4);
        assert_eq!(fm.map_text_pos(0), Some((0, 0)));
        assert_eq!(fm.map_text_pos(3), Some((0, 3)));
        assert_eq!(fm.map_text_pos(4), None);
        assert_eq!(fm.map_text_pos(5), Some((1, 0)));
        assert_eq!(fm.map_text_pos(7), None);
        assert_eq!(fm.contig_slice(1, 0, 10), &dna::encode_seq(b"GG")[..]);
    }

    #[test]
    fn save_and_load_round_trip() {
        let (fm, _) = build(&[b"ACGTACGTGGCA"], 2, 4);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.fm");
        fm.save_to_file(&path).unwrap();
        let back = FMIndex::load_from_file(&path).unwrap();
        assert_eq!(back.contigs, fm.contigs);
        assert_eq!(
            back.backward_search(&dna::encode_seq(b"ACGT")),
            fm.backward_search(&dna::encode_seq(b"ACGT"))
        );
    }

    #[test]
    fn load_rejects_other_versions() {
        let (mut fm, _) = build(&[b"ACGT"], 2, 4);
        fm.version = FORMAT_VERSION + 1;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.fm");
        fm.save_to_file(&path).unwrap();
        let err = FMIndex::load_from_file(&path).unwrap_err();
        assert!(err.to_string().contains("format version"));
    }
}
