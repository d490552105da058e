use rust_htslib::bam;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::align::mapq::MAX_MAPQ;
use crate::io::sam::{is_primary, MAPQ_UNAVAILABLE};

/// 模板长度分布。保留每个值的计数以便求精确中位数。
#[derive(Debug, Clone)]
pub struct TlenHistogram {
    bin_width: u32,
    max: u32,
    /// per_value[v] = TLEN 为 v 的模板数，v < max
    per_value: Vec<u64>,
    /// >= max 的值 -> 计数
    overflow: BTreeMap<u64, u64>,
}

impl TlenHistogram {
    pub fn new(bin_width: u32, max: u32) -> Self {
        Self { bin_width: bin_width.max(1), max, per_value: vec![0; max as usize], overflow: BTreeMap::new() }
    }

    /// 每个模板只计一次：取主比对、两端都比对上、TLEN > 0 的那一条
    pub fn add_record(&mut self, rec: &bam::Record) {
        if !is_primary(rec) || rec.is_unmapped() || !rec.is_paired() || rec.is_mate_unmapped() {
            return;
        }
        if rec.insert_size() > 0 {
            self.add(rec.insert_size() as u64);
        }
    }

    pub fn add(&mut self, tlen: u64) {
        if tlen < u64::from(self.max) {
            self.per_value[tlen as usize] += 1;
        } else {
            *self.overflow.entry(tlen).or_insert(0) += 1;
        }
    }

    pub fn bin_width(&self) -> u32 {
        self.bin_width
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    /// 第 i 个桶覆盖 [i * bin_width, (i + 1) * bin_width)，最后一个桶截止于 max
    pub fn bins(&self) -> Vec<u64> {
        self.per_value
            .chunks(self.bin_width as usize)
            .map(|c| c.iter().sum())
            .collect()
    }

    pub fn overflow(&self) -> u64 {
        self.overflow.values().sum()
    }

    pub fn count(&self) -> u64 {
        self.per_value.iter().sum::<u64>() + self.overflow()
    }

    pub fn mean(&self) -> Option<f64> {
        let n = self.count();
        if n == 0 {
            return None;
        }
        let sum: u64 = self
            .per_value
            .iter()
            .enumerate()
            .map(|(v, &c)| v as u64 * c)
            .sum::<u64>()
            + self.overflow.iter().map(|(&v, &c)| v * c).sum::<u64>();
        Some(sum as f64 / n as f64)
    }

    pub fn median(&self) -> Option<f64> {
        let n = self.count();
        if n == 0 {
            return None;
        }
        let kth = |k: u64| -> u64 {
            let below = self.per_value.iter().enumerate().map(|(v, &c)| (v as u64, c));
            let mut seen = 0u64;
            for (v, c) in below.chain(self.overflow.iter().map(|(&v, &c)| (v, c))) {
                seen += c;
                if seen > k {
                    return v;
                }
            }
            0
        };
        Some(if n % 2 == 1 {
            kth(n / 2) as f64
        } else {
            (kth(n / 2 - 1) + kth(n / 2)) as f64 / 2.0
        })
    }
}

/// MAPQ 分布：0..=60 每个值一个桶，其余归入 other，255 单独计数
#[derive(Debug, Clone, Serialize)]
pub struct MapqHistogram {
    pub counts: Vec<u64>,
    pub other: u64,
    pub unavailable: u64,
}

impl Default for MapqHistogram {
    fn default() -> Self {
        Self { counts: vec![0; MAX_MAPQ as usize + 1], other: 0, unavailable: 0 }
    }
}

impl MapqHistogram {
    pub fn add_record(&mut self, rec: &bam::Record) {
        if !is_primary(rec) || rec.is_unmapped() {
            return;
        }
        match rec.mapq() {
            MAPQ_UNAVAILABLE => self.unavailable += 1,
            q if q <= MAX_MAPQ => self.counts[q as usize] += 1,
            _ => self.other += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum::<u64>() + self.other + self.unavailable
    }

    /// MAPQ 可用记录的平均值（不含 255）
    pub fn mean(&self) -> Option<f64> {
        let n = self.total() - self.unavailable - self.other;
        if n == 0 {
            return None;
        }
        let sum: u64 = self.counts.iter().enumerate().map(|(q, &c)| q as u64 * c).sum();
        Some(sum as f64 / n as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(flag: u16, mapq: u8, tlen: i64) -> bam::Record {
        let mut r = bam::Record::new();
        r.set(b"t", None, b"ACGT", b"IIII");
        r.set_tid(0);
        r.set_pos(99);
        r.set_flags(flag);
        r.set_mapq(mapq);
        r.set_insert_size(tlen);
        r
    }

    #[test]
    fn tlen_bins_and_overflow() {
        let mut h = TlenHistogram::new(10, 50);
        for v in [0, 9, 10, 25, 49, 50, 300] {
            h.add(v);
        }
        assert_eq!(h.bins(), vec![2, 1, 1, 0, 1]);
        assert_eq!(h.overflow(), 2);
        assert_eq!(h.count(), 7);
        assert_eq!(h.median(), Some(25.0));
        let mean = h.mean().unwrap();
        assert!((mean - 443.0 / 7.0).abs() < 1e-9);
    }

    #[test]
    fn tlen_even_count_median_uses_overflow() {
        let mut h = TlenHistogram::new(100, 200);
        for v in [150, 250, 260, 1000] {
            h.add(v);
        }
        assert_eq!(h.median(), Some(255.0));
        assert!(TlenHistogram::new(10, 100).median().is_none());
    }

    #[test]
    fn tlen_counts_one_mate_per_template() {
        let mut h = TlenHistogram::new(10, 1000);
        for (flag, tlen) in [(99u16, 250i64), (147, -250), (73, 0), (353, 250), (105, 180)] {
            h.add_record(&rec(flag, 60, tlen));
        }
        // 105 = paired, mate unmapped
        assert_eq!(h.count(), 1);
        assert_eq!(h.bins()[25], 1);
    }

    #[test]
    fn overflow_keeps_exact_values() {
        let mut h = TlenHistogram::new(10, 100);
        for v in [5000, 120, 5000, 120, 120] {
            h.add(v);
        }
        assert_eq!(h.overflow(), 5);
        assert_eq!(h.median(), Some(120.0));
        assert_eq!(h.mean(), Some(10360.0 / 5.0));
        assert!(h.bins().iter().all(|&c| c == 0));
    }

    #[test]
    fn mapq_buckets() {
        let mut h = MapqHistogram::default();
        for (flag, q) in [(0u16, 0u8), (0, 60), (0, 60), (0, 70), (0, 255), (4, 0), (256, 3)] {
            h.add_record(&rec(flag, q, 0));
        }
        assert_eq!(h.counts.len(), 61);
        assert_eq!(h.counts[60], 2);
        assert_eq!(h.counts[0], 1);
        assert_eq!(h.other, 1);
        assert_eq!(h.unavailable, 1);
        assert_eq!(h.total(), 5);
        assert_eq!(h.mean(), Some(40.0));
    }
}
