use rust_htslib::bam::{self, record::Cigar};

use crate::io::sam::is_primary;

#[derive(Debug, Clone)]
pub struct ContigDepth {
    pub name: String,
    pub depth: Vec<u32>,
}

impl ContigDepth {
    pub fn len(&self) -> usize {
        self.depth.len()
    }

    pub fn is_empty(&self) -> bool {
        self.depth.is_empty()
    }
}

/// 逐碱基覆盖深度，contig 顺序与头部一致（下标即 tid）
#[derive(Debug, Clone, Default)]
pub struct Coverage {
    contigs: Vec<ContigDepth>,
}

impl Coverage {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按 @SQ 顺序登记 contig 并分配深度数组
    pub fn declare(&mut self, references: &[(String, u32)]) {
        for (name, len) in references {
            self.contigs.push(ContigDepth { name: name.clone(), depth: vec![0; *len as usize] });
        }
    }

    /// 只有 M 与 = 加深度；X/D/N 推进参考坐标但不计深度；I/S/H/P 不消耗参考。
    /// 超出声明长度的部分数组自动增长。
    pub fn add_record(&mut self, rec: &bam::Record) {
        if rec.is_unmapped() || !is_primary(rec) || rec.tid() < 0 || rec.pos() < 0 {
            return;
        }
        let depth = match self.contigs.get_mut(rec.tid() as usize) {
            Some(c) => &mut c.depth,
            None => return,
        };
        let mut pos = rec.pos() as usize;
        for op in &rec.cigar() {
            match *op {
                Cigar::Match(len) | Cigar::Equal(len) => {
                    let end = pos + len as usize;
                    if depth.len() < end {
                        depth.resize(end, 0);
                    }
                    for d in &mut depth[pos..end] {
                        *d += 1;
                    }
                    pos = end;
                }
                Cigar::Diff(len) | Cigar::Del(len) | Cigar::RefSkip(len) => pos += len as usize,
                Cigar::Ins(_) | Cigar::SoftClip(_) | Cigar::HardClip(_) | Cigar::Pad(_) => {}
            }
        }
    }

    pub fn contigs(&self) -> &[ContigDepth] {
        &self.contigs
    }

    pub fn genome_len(&self) -> u64 {
        self.contigs.iter().map(|c| c.len() as u64).sum()
    }

    pub fn total_depth(&self) -> u64 {
        self.contigs.iter().flat_map(|c| c.depth.iter()).map(|&d| u64::from(d)).sum()
    }

    pub fn mean_depth(&self) -> f64 {
        match self.genome_len() {
            0 => 0.0,
            n => self.total_depth() as f64 / n as f64,
        }
    }

    /// 深度 >= 1 的位置比例
    pub fn breadth(&self) -> f64 {
        let covered = self
            .contigs
            .iter()
            .flat_map(|c| c.depth.iter())
            .filter(|&&d| d > 0)
            .count();
        match self.genome_len() {
            0 => 0.0,
            n => covered as f64 / n as f64,
        }
    }

    pub fn max_depth(&self) -> u32 {
        self.contigs.iter().flat_map(|c| c.depth.iter()).copied().max().unwrap_or(0)
    }

    /// 把所有 contig 首尾相接后切成至多 `bins` 段，返回每段平均深度
    /// 以及每个 contig 起点所在的段号
    pub fn binned(&self, bins: usize) -> (Vec<f64>, Vec<(usize, String)>) {
        let total = self.genome_len() as usize;
        let bins = bins.max(1).min(total.max(1));
        let mut sums = vec![0u64; bins];
        let mut counts = vec![0u64; bins];
        let mut starts = Vec::with_capacity(self.contigs.len());
        let bin_of = |g: usize| (g * bins / total.max(1)).min(bins - 1);

        let mut offset = 0usize;
        for c in &self.contigs {
            if c.is_empty() {
                continue;
            }
            starts.push((bin_of(offset), c.name.clone()));
            for (i, &d) in c.depth.iter().enumerate() {
                let b = bin_of(offset + i);
                sums[b] += u64::from(d);
                counts[b] += 1;
            }
            offset += c.len();
        }

        let means = sums
            .iter()
            .zip(&counts)
            .map(|(&s, &n)| if n == 0 { 0.0 } else { s as f64 / n as f64 })
            .collect();
        (means, starts)
    }
}
