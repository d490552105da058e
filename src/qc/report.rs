use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::histogram::MapqHistogram;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReadCounts {
    pub records: u64,
    pub primary: u64,
    pub secondary: u64,
    pub supplementary: u64,
    /// 以下均只统计主比对记录
    pub mapped: u64,
    pub unmapped: u64,
    pub paired: u64,
    pub proper_pairs: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoverageSummary {
    pub contigs: usize,
    pub genome_length: u64,
    pub mean_depth: f64,
    pub max_depth: u32,
    /// 至少被一条 read 覆盖的位置比例
    pub breadth: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TlenSummary {
    pub templates: u64,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub bin_width: u32,
    pub max: u32,
    pub bins: Vec<u64>,
    pub overflow: u64,
}

/// 写入 summary.json 的全部内容
#[derive(Debug, Clone, Serialize)]
pub struct QcSummary {
    pub input: String,
    pub reads: ReadCounts,
    pub coverage: CoverageSummary,
    pub tlen: TlenSummary,
    pub mapq: MapqHistogram,
    pub mapq_mean: Option<f64>,
}

impl QcSummary {
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let f = std::fs::File::create(path)
            .with_context(|| format!("cannot create summary '{}'", path.display()))?;
        let mut w = BufWriter::new(f);
        serde_json::to_writer_pretty(&mut w, self)?;
        writeln!(w)?;
        w.flush()?;
        Ok(())
    }
}

fn pct(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * part as f64 / total as f64
    }
}

fn opt_f64(v: Option<f64>) -> String {
    v.map_or_else(|| "n/a".to_string(), |x| format!("{:.1}", x))
}

impl fmt::Display for QcSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = &self.reads;
        writeln!(f, "records:        {} ({} primary)", r.records, r.primary)?;
        writeln!(f, "mapped:         {} ({:.2}%)", r.mapped, pct(r.mapped, r.primary))?;
        writeln!(f, "properly paired: {} ({:.2}%)", r.proper_pairs, pct(r.proper_pairs, r.paired))?;
        writeln!(
            f,
            "coverage:       mean {:.2}x, max {}x, breadth {:.2}% of {} bp",
            self.coverage.mean_depth,
            self.coverage.max_depth,
            100.0 * self.coverage.breadth,
            self.coverage.genome_length
        )?;
        writeln!(
            f,
            "template length: {} templates, mean {}, median {}, {} >= {}",
            self.tlen.templates,
            opt_f64(self.tlen.mean),
            opt_f64(self.tlen.median),
            self.tlen.overflow,
            self.tlen.max
        )?;
        write!(
            f,
            "MAPQ:           mean {}, {} at 0, {} unavailable",
            opt_f64(self.mapq_mean),
            self.mapq.counts.first().copied().unwrap_or(0),
            self.mapq.unavailable
        )
    }
}
