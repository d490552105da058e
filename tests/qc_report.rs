use std::fs;

use humdum::align::{align_paired_fastq, AlignOpt};
use humdum::index::builder::{build_from_fasta, index_path, IndexOpt};
use humdum::qc::{run_qc, QcOpt, COVERAGE_PLOT, MAPQ_PLOT, SUMMARY_JSON, TLEN_PLOT};
use humdum::util::dna;

const HAND_WRITTEN: &str = "\
@HD\tVN:1.6\tSO:unsorted
@SQ\tSN:chrA\tLN:60
@SQ\tSN:chrB\tLN:40
t1\t99\tchrA\t1\t60\t20=\t=\t31\t50\tAAAAAAAAAAAAAAAAAAAA\t*
t1\t147\tchrA\t31\t60\t10=5D10=\t=\t1\t-50\tAAAAAAAAAAAAAAAAAAAA\t*
t2\t97\tchrA\t11\t12\t5S15M\tchrB\t1\t0\tAAAAAAAAAAAAAAAAAAAA\t*
t2\t145\tchrB\t1\t255\t20M\tchrA\t11\t0\tAAAAAAAAAAAAAAAAAAAA\t*
t3\t99\tchrB\t5\t60\t10=\t=\t25\t1500\tAAAAAAAAAA\t*
t3\t147\tchrB\t25\t60\t10=\t=\t5\t-1500\tAAAAAAAAAA\t*
";

#[test]
fn hand_written_sam_report() {
    let dir = tempfile::tempdir().unwrap();
    let sam = dir.path().join("in.sam");
    fs::write(&sam, HAND_WRITTEN).unwrap();
    let outdir = dir.path().join("report");

    let summary = run_qc(&sam, &outdir, &QcOpt::default()).unwrap();

    assert_eq!(summary.reads.records, 6);
    assert_eq!(summary.reads.mapped, 6);
    assert_eq!(summary.reads.proper_pairs, 4);
    assert_eq!(summary.coverage.genome_length, 100);
    // 20 + 20 (deletion adds none) + 15 + 20 + 10 + 10
    assert_eq!(summary.coverage.max_depth, 2);
    assert!((summary.coverage.mean_depth - 0.95).abs() < 1e-9);

    assert_eq!(summary.tlen.templates, 2);
    assert_eq!(summary.tlen.bins[5], 1);
    assert_eq!(summary.tlen.overflow, 1);
    assert_eq!(summary.tlen.bins.len(), 100);

    assert_eq!(summary.mapq.counts[60], 4);
    assert_eq!(summary.mapq.counts[12], 1);
    assert_eq!(summary.mapq.unavailable, 1);

    for f in [COVERAGE_PLOT, TLEN_PLOT, MAPQ_PLOT] {
        let svg = fs::read_to_string(outdir.join(f)).unwrap();
        assert!(svg.starts_with("<svg"), "{}", f);
    }
    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(outdir.join(SUMMARY_JSON)).unwrap()).unwrap();
    assert_eq!(json["reads"]["proper_pairs"], 4);
    assert_eq!(json["tlen"]["overflow"], 1);
    assert_eq!(json["mapq"]["unavailable"], 1);
}

#[test]
fn index_align_qc_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let mut state = 99u64;
    let genome: Vec<u8> = (0..6_000)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            b"ACGT"[(state >> 62) as usize]
        })
        .collect();
    let fasta = dir.path().join("ref.fa");
    let mut fa = String::from(">chrQ test contig\n");
    for line in genome.chunks(60) {
        fa.push_str(std::str::from_utf8(line).unwrap());
        fa.push('\n');
    }
    fs::write(&fasta, fa).unwrap();

    let fm = build_from_fasta(&fasta, IndexOpt::default()).unwrap();
    fm.save_to_file(index_path(&fasta)).unwrap();

    let (mut fq1, mut fq2) = (String::new(), String::new());
    let qual = "F".repeat(80);
    for i in 0..40 {
        let start = 50 + i * 130;
        let insert = 280 + (i % 7) * 5;
        let left = &genome[start..start + 80];
        let right = dna::revcomp(&genome[start + insert - 80..start + insert]);
        fq1.push_str(&format!("@t{}/1\n{}\n+\n{}\n", i, std::str::from_utf8(left).unwrap(), qual));
        fq2.push_str(&format!("@t{}/2\n{}\n+\n{}\n", i, String::from_utf8(right).unwrap(), qual));
    }
    let (r1, r2) = (dir.path().join("r1.fq"), dir.path().join("r2.fq"));
    fs::write(&r1, fq1).unwrap();
    fs::write(&r2, fq2).unwrap();

    let out = dir.path().join("out.sam");
    let stats =
        align_paired_fastq(&fasta, &r1, &r2, Some(&out), &AlignOpt::default(), IndexOpt::default()).unwrap();
    assert_eq!(stats.pairs, 40);
    assert_eq!(stats.proper_pairs, 40);

    let summary = run_qc(&out, &dir.path().join("qc"), &QcOpt { tlen_bin: 5, ..QcOpt::default() }).unwrap();
    assert_eq!(summary.reads.mapped, 80);
    assert_eq!(summary.coverage.genome_length, 6_000);
    assert_eq!(summary.tlen.templates, 40);
    let mean = summary.tlen.mean.unwrap();
    assert!((280.0..=310.0).contains(&mean), "mean tlen {}", mean);
}
