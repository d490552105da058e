use criterion::{black_box, criterion_group, criterion_main, Criterion};

use humdum::align::seed::find_seeds;
use humdum::align::sw::{banded_sw, SwBuffer};
use humdum::align::{AlignOpt, Aligner};
use humdum::index::builder::{build_from_records, IndexOpt};
use humdum::index::{fm, sa};
use humdum::io::fasta::FastaRecord;
use humdum::util::dna;

fn make_reference(len: usize) -> Vec<u8> {
    let bases = [b'A', b'C', b'G', b'T'];
    let mut seq = Vec::with_capacity(len);
    let mut x: u32 = 42;
    for _ in 0..len {
        x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        seq.push(bases[(x >> 16) as usize % 4]);
    }
    seq
}

fn build_fm_index(seq: &[u8]) -> fm::FMIndex {
    let rec = FastaRecord { id: "bench".to_string(), desc: None, seq: seq.to_vec() };
    build_from_records(&[rec], IndexOpt::default()).expect("index")
}

fn bench_backward_search(c: &mut Criterion) {
    let reference = make_reference(100_000);
    let fm_idx = build_fm_index(&reference);
    let pattern = dna::encode_seq(&reference[100..120]);

    c.bench_function("backward_search_20bp", |b| {
        b.iter(|| {
            black_box(fm_idx.backward_search(black_box(&pattern)));
        })
    });
}

fn bench_seeds(c: &mut Criterion) {
    let reference = make_reference(100_000);
    let fm_idx = build_fm_index(&reference);
    let read = dna::encode_seq(&reference[500..600]);

    c.bench_function("seeds_100bp", |b| {
        b.iter(|| {
            black_box(find_seeds(black_box(&fm_idx), black_box(&read), false, 19, 500));
        })
    });
}

fn bench_banded_sw(c: &mut Criterion) {
    let query = dna::encode_seq(&make_reference(150));
    let mut ref_seq = query.clone();
    ref_seq[75] = dna::CODE_N;
    let params = AlignOpt::default().sw_params();

    c.bench_function("banded_sw_150bp", |b| {
        b.iter(|| {
            black_box(banded_sw(black_box(&query), black_box(&ref_seq), params));
        })
    });
}

fn bench_align_read(c: &mut Criterion) {
    let reference = make_reference(100_000);
    let fm_idx = build_fm_index(&reference);
    let opt = AlignOpt::default();
    let aligner = Aligner::new(&fm_idx, &opt);
    let mut read = reference[40_000..40_150].to_vec();
    read[60] = if read[60] == b'A' { b'C' } else { b'A' };
    let read = dna::encode_seq(&dna::revcomp(&read));
    let mut buf = SwBuffer::new();

    c.bench_function("align_read_150bp", |b| {
        b.iter(|| {
            black_box(aligner.align_read(black_box(&read), &mut buf));
        })
    });
}

fn bench_build_sa(c: &mut Criterion) {
    let mut text = dna::encode_seq(&make_reference(10_000));
    text.push(dna::SENTINEL);

    c.bench_function("build_sa_ks_10k", |b| {
        b.iter(|| {
            black_box(sa::build_sa(black_box(&text), sa::SaAlgorithm::Ks));
        })
    });
    c.bench_function("build_sa_doubling_10k", |b| {
        b.iter(|| {
            black_box(sa::build_sa(black_box(&text), sa::SaAlgorithm::ManberMyers));
        })
    });
}

criterion_group!(benches, bench_backward_search, bench_seeds, bench_banded_sw, bench_align_read, bench_build_sa);
criterion_main!(benches);
