//! SAM/BAM 的 QC 报告：覆盖深度、模板长度与 MAPQ 分布。

pub mod coverage;
pub mod histogram;
pub mod plot;
pub mod report;

use anyhow::{Context, Result};
use rust_htslib::bam::{self, Read};
use std::path::Path;

use crate::io::sam::{is_primary, open_sam, reference_lengths};
use coverage::Coverage;
use histogram::{MapqHistogram, TlenHistogram};
use plot::{bar_plot, line_plot, PlotStyle};
use report::{CoverageSummary, QcSummary, ReadCounts, TlenSummary};

pub const COVERAGE_PLOT: &str = "coverage.svg";
pub const TLEN_PLOT: &str = "tlen.svg";
pub const MAPQ_PLOT: &str = "mapq.svg";
pub const SUMMARY_JSON: &str = "summary.json";

#[derive(Debug, Clone)]
pub struct QcOpt {
    /// TLEN 直方图桶宽
    pub tlen_bin: u32,
    /// 不小于该值的 TLEN 计入溢出桶
    pub tlen_max: u32,
    /// 覆盖度折线的点数上限
    pub coverage_bins: usize,
    pub style: PlotStyle,
}

impl Default for QcOpt {
    fn default() -> Self {
        Self { tlen_bin: 10, tlen_max: 1000, coverage_bins: 1000, style: PlotStyle::default() }
    }
}

/// 一次扫描 SAM 得到的全部统计量
#[derive(Debug, Clone)]
pub struct QcData {
    pub counts: ReadCounts,
    pub coverage: Coverage,
    pub tlen: TlenHistogram,
    pub mapq: MapqHistogram,
}

pub fn collect<R: Read>(reader: &mut R, opt: &QcOpt) -> Result<QcData> {
    let mut data = QcData {
        counts: ReadCounts::default(),
        coverage: Coverage::new(),
        tlen: TlenHistogram::new(opt.tlen_bin, opt.tlen_max),
        mapq: MapqHistogram::default(),
    };
    data.coverage.declare(&reference_lengths(reader.header()));

    let mut rec = bam::Record::new();
    while let Some(r) = reader.read(&mut rec) {
        r.with_context(|| format!("malformed record after {} records", data.counts.records))?;
        let c = &mut data.counts;
        c.records += 1;
        if rec.is_secondary() {
            c.secondary += 1;
        }
        if rec.is_supplementary() {
            c.supplementary += 1;
        }
        if !is_primary(&rec) {
            continue;
        }
        c.primary += 1;
        if rec.is_unmapped() {
            c.unmapped += 1;
        } else {
            c.mapped += 1;
        }
        if rec.is_paired() {
            c.paired += 1;
            if rec.is_proper_pair() {
                c.proper_pairs += 1;
            }
        }

        data.coverage.add_record(&rec);
        data.tlen.add_record(&rec);
        data.mapq.add_record(&rec);
    }
    Ok(data)
}

impl QcData {
    pub fn summary(&self, input: &str) -> QcSummary {
        QcSummary {
            input: input.to_string(),
            reads: self.counts.clone(),
            coverage: CoverageSummary {
                contigs: self.coverage.contigs().len(),
                genome_length: self.coverage.genome_len(),
                mean_depth: self.coverage.mean_depth(),
                max_depth: self.coverage.max_depth(),
                breadth: self.coverage.breadth(),
            },
            tlen: TlenSummary {
                templates: self.tlen.count(),
                mean: self.tlen.mean(),
                median: self.tlen.median(),
                bin_width: self.tlen.bin_width(),
                max: self.tlen.max(),
                bins: self.tlen.bins(),
                overflow: self.tlen.overflow(),
            },
            mapq: self.mapq.clone(),
            mapq_mean: self.mapq.mean(),
        }
    }

    /// 三张 SVG 图
    pub fn write_plots(&self, outdir: &Path, opt: &QcOpt) -> Result<()> {
        let (depth, starts) = self.coverage.binned(opt.coverage_bins);
        line_plot(
            &outdir.join(COVERAGE_PLOT),
            "Depth of coverage",
            &depth,
            &starts,
            ("genome position", "mean depth"),
            &opt.style,
        )?;

        let bin = self.tlen.bin_width();
        let mut labels: Vec<String> = (0..self.tlen.bins().len()).map(|i| (i as u32 * bin).to_string()).collect();
        let mut counts = self.tlen.bins();
        labels.push(format!(">={}", self.tlen.max()));
        counts.push(self.tlen.overflow());
        bar_plot(
            &outdir.join(TLEN_PLOT),
            "Template length",
            &labels,
            &counts,
            ("TLEN", "templates"),
            &opt.style,
        )?;

        let mut labels: Vec<String> = (0..self.mapq.counts.len()).map(|q| q.to_string()).collect();
        let mut counts = self.mapq.counts.clone();
        labels.push("other".to_string());
        counts.push(self.mapq.other);
        bar_plot(&outdir.join(MAPQ_PLOT), "Mapping quality", &labels, &counts, ("MAPQ", "reads"), &opt.style)
    }
}

/// `humdum qc` 的入口：统计、出图、写 summary.json 并打印摘要
pub fn run_qc(sam: &Path, outdir: &Path, opt: &QcOpt) -> Result<QcSummary> {
    let mut reader = open_sam(sam)?;
    let data = collect(&mut reader, opt).with_context(|| format!("cannot read SAM '{}'", sam.display()))?;

    std::fs::create_dir_all(outdir)
        .with_context(|| format!("cannot create output directory '{}'", outdir.display()))?;
    data.write_plots(outdir, opt)?;

    let summary = data.summary(&sam.display().to_string());
    summary.write_json(&outdir.join(SUMMARY_JSON))?;
    for line in summary.to_string().lines() {
        log::info!("{}", line);
    }
    log::info!("QC report written to {}", outdir.display());
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAM: &str = "@HD\tVN:1.6\n@SQ\tSN:chr1\tLN:100\n\
p1\t99\tchr1\t11\t60\t10=\t=\t41\t40\tAAAAAAAAAA\t*\n\
p1\t147\tchr1\t41\t60\t10=\t=\t11\t-40\tAAAAAAAAAA\t*\n\
p2\t73\tchr1\t21\t255\t5=\t=\t21\t0\tAAAAA\t*\n\
p2\t133\tchr1\t21\t0\t*\t=\t21\t0\tAAAAA\t*\n\
p3\t329\tchr1\t11\t0\t10=\t=\t11\t0\tAAAAAAAAAA\t*\n";

    fn collect_text(text: &str) -> Result<QcData> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("in.sam");
        std::fs::write(&path, text)?;
        collect(&mut open_sam(&path)?, &QcOpt::default())
    }

    #[test]
    fn collect_counts_primary_records() {
        let data = collect_text(SAM).unwrap();
        let c = &data.counts;
        assert_eq!((c.records, c.primary, c.secondary), (5, 4, 1));
        assert_eq!((c.mapped, c.unmapped, c.proper_pairs), (3, 1, 2));
        assert_eq!(data.coverage.total_depth(), 25);
        assert_eq!(data.tlen.count(), 1);
        assert_eq!(data.mapq.counts[60], 2);
        assert_eq!(data.mapq.unavailable, 1);

        let s = data.summary("mem");
        assert!((s.coverage.breadth - 0.25).abs() < 1e-9);
        assert_eq!(s.tlen.median, Some(40.0));
        assert!(s.to_string().contains("properly paired: 2"));
    }

    #[test]
    fn header_only_input() {
        let data = collect_text("@SQ\tSN:c\tLN:7\n").unwrap();
        assert_eq!(data.coverage.genome_len(), 7);
        assert_eq!(data.counts.records, 0);
    }

    #[test]
    fn malformed_record_is_an_error() {
        assert!(collect_text("@SQ\tSN:c\tLN:7\nr\t0\tc\tx\t60\t4M\t*\t0\t0\tACGT\t*\n").is_err());
    }
}
