use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use super::fm::{Contig, FMIndex, IndexMeta};
use super::sa::{self, SaAlgorithm};
use crate::io::fasta::{FastaReader, FastaRecord};
use crate::util::dna;

pub const INDEX_EXT: &str = "fm";

#[derive(Debug, Clone, Copy)]
pub struct IndexOpt {
    /// 每隔多少个文本位置保存一个 SA 值
    pub sa_sample: u32,
    /// Occ 检查点间隔
    pub occ_block: usize,
    pub sa_algo: SaAlgorithm,
}

impl Default for IndexOpt {
    fn default() -> Self {
        Self { sa_sample: 32, occ_block: 64, sa_algo: SaAlgorithm::default() }
    }
}

/// Concatenate contigs into the `$`-separated index text and build the FM-index.
pub fn build_from_records(records: &[FastaRecord], opt: IndexOpt) -> Result<FMIndex> {
    if records.is_empty() {
        bail!("reference contains no sequences");
    }
    let total: usize = records.iter().map(|r| r.seq.len()).sum();
    if total == 0 {
        bail!("reference contains only empty sequences");
    }
    if total + records.len() > u32::MAX as usize {
        bail!("reference of {} bp is too large for 32-bit positions", total);
    }

    let mut text: Vec<u8> = Vec::with_capacity(total + records.len());
    let mut contigs: Vec<Contig> = Vec::with_capacity(records.len());
    for rec in records {
        if rec.seq.is_empty() {
            log::warn!("skipping empty contig '{}'", rec.id);
            continue;
        }
        let offset = text.len() as u32;
        // a literal '$' in the input must not turn into a separator
        text.extend(rec.seq.iter().map(|&b| match dna::encode(b) {
            dna::SENTINEL => dna::CODE_N,
            a => a,
        }));
        contigs.push(Contig { name: rec.id.clone(), len: rec.seq.len() as u32, offset });
        text.push(dna::SENTINEL);
    }

    log::info!(
        "building suffix array over {} symbols ({} contigs, {:?})",
        text.len(),
        contigs.len(),
        opt.sa_algo
    );
    let sa_arr = sa::build_sa(&text, opt.sa_algo);
    let fm = FMIndex::build(text, &sa_arr, contigs, opt.sa_sample, opt.occ_block);
    log::debug!(
        "FM-index: {} rows, {} SA samples (1/{}), occ block {}",
        fm.len(),
        fm.sa_samples.len(),
        fm.sa_sample,
        fm.occ_block
    );
    Ok(fm)
}

pub fn read_fasta<P: AsRef<Path>>(path: P) -> Result<Vec<FastaRecord>> {
    let path = path.as_ref();
    let fh = std::fs::File::open(path)
        .with_context(|| format!("cannot open reference FASTA '{}'", path.display()))?;
    let mut reader = FastaReader::new(std::io::BufReader::new(fh));
    let mut records = Vec::new();
    while let Some(rec) = reader
        .next_record()
        .with_context(|| format!("malformed FASTA '{}'", path.display()))?
    {
        records.push(rec);
    }
    Ok(records)
}

pub fn build_from_fasta<P: AsRef<Path>>(path: P, opt: IndexOpt) -> Result<FMIndex> {
    let path = path.as_ref();
    let records = read_fasta(path)?;
    let mut fm = build_from_records(&records, opt)
        .with_context(|| format!("cannot index '{}'", path.display()))?;
    fm.set_meta(IndexMeta {
        reference_file: Some(path.display().to_string()),
        build_args: Some(std::env::args().collect::<Vec<_>>().join(" ")),
        build_timestamp: Some(chrono::Utc::now().to_rfc3339()),
    });
    Ok(fm)
}

/// `PREFIX.fm`
pub fn index_path(prefix: &Path) -> PathBuf {
    let mut s = prefix.as_os_str().to_owned();
    s.push(".");
    s.push(INDEX_EXT);
    PathBuf::from(s)
}

/// `humdum index`：读入 FASTA，建索引，写到 `PREFIX.fm`（PREFIX 默认为参考路径），返回索引路径
pub fn index_reference(reference: &Path, prefix: Option<&Path>, opt: IndexOpt) -> Result<PathBuf> {
    let fm = build_from_fasta(reference, opt)?;
    let total: u64 = fm.contigs.iter().map(|c| u64::from(c.len)).sum();
    log::info!("reference: {}", reference.display());
    log::info!("sequences: {}, total length: {} bp", fm.contigs.len(), total);

    let out_path = index_path(prefix.unwrap_or(reference));
    fm.save_to_file(&out_path)
        .with_context(|| format!("cannot write index to '{}'", out_path.display()))?;
    log::info!("FM index saved: {}", out_path.display());
    Ok(out_path)
}

/// Resolve the `genome` argument of `align`: an index file, a FASTA with a
/// prebuilt sibling index, or a FASTA indexed in memory.
pub fn load_or_build(genome: &Path, opt: IndexOpt) -> Result<FMIndex> {
    if genome.extension().map_or(false, |e| e == INDEX_EXT) {
        log::info!("loading index {}", genome.display());
        return FMIndex::load_from_file(genome);
    }
    let sibling = index_path(genome);
    if sibling.exists() {
        log::info!("loading index {}", sibling.display());
        return FMIndex::load_from_file(&sibling);
    }
    log::info!("no index found next to {}, indexing in memory", genome.display());
    build_from_fasta(genome, opt)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, seq: &[u8]) -> FastaRecord {
        FastaRecord { id: id.to_string(), desc: None, seq: seq.to_vec() }
    }

    #[test]
    fn contigs_get_offsets_and_separators() {
        let fm = build_from_records(&[rec("a", b"ACGT"), rec("b", b"TTGCA")], IndexOpt::default()).unwrap();
        assert_eq!(fm.contigs.len(), 2);
        assert_eq!(fm.contigs[1].offset, 5);
        assert_eq!(fm.text.len(), 11);
        assert_eq!(fm.text[4], dna::SENTINEL);
        assert_eq!(fm.text[10], dna::SENTINEL);
    }

    #[test]
    fn empty_reference_is_an_error() {
        assert!(build_from_records(&[], IndexOpt::default()).is_err());
        assert!(build_from_records(&[rec("a", b"")], IndexOpt::default()).is_err());
    }

    #[test]
    fn empty_contigs_are_skipped() {
        let fm = build_from_records(&[rec("a", b""), rec("b", b"ACGT")], IndexOpt::default()).unwrap();
        assert_eq!(fm.contigs.len(), 1);
        assert_eq!(fm.contigs[0].name, "b");
    }

    #[test]
    fn load_or_build_prefers_sibling_index() {
        let dir = tempfile::tempdir().unwrap();
        let fasta = dir.path().join("ref.fa");
        std::fs::write(&fasta, ">chr1\nACGTACGTTT\n").unwrap();
        let built = load_or_build(&fasta, IndexOpt::default()).unwrap();
        assert_eq!(built.contigs[0].len, 10);

        built.save_to_file(index_path(&fasta)).unwrap();
        std::fs::write(&fasta, ">other\nAC\n").unwrap();
        let loaded = load_or_build(&fasta, IndexOpt::default()).unwrap();
        assert_eq!(loaded.contigs[0].name, "chr1");
    }

    #[test]
    fn index_reference_writes_loadable_index() {
        let dir = tempfile::tempdir().unwrap();
        let fasta = dir.path().join("genome.fa");
        std::fs::write(&fasta, ">c1 first\nACGTTGCAAC\n>c2\nGGGATTACA\n").unwrap();

        let opt = IndexOpt { sa_algo: SaAlgorithm::ManberMyers, ..IndexOpt::default() };
        let path = index_reference(&fasta, None, opt).unwrap();
        assert_eq!(path, dir.path().join("genome.fa.fm"));
        let fm = FMIndex::load_from_file(&path).unwrap();
        assert_eq!(fm.contigs.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(), ["c1", "c2"]);
        assert_eq!(fm.meta.reference_file.as_deref(), Some(fasta.display().to_string().as_str()));
        let (l, r) = fm.backward_search(&dna::encode_seq(b"GATTACA")).unwrap();
        assert_eq!(fm.locate_interval(l, r, 10), vec![fm.contigs[1].offset + 2]);

        let prefix = dir.path().join("idx/custom");
        std::fs::create_dir_all(prefix.parent().unwrap()).unwrap();
        let path = index_reference(&fasta, Some(&prefix), IndexOpt::default()).unwrap();
        assert_eq!(path, dir.path().join("idx/custom.fm"));
        assert!(load_or_build(&path, IndexOpt::default()).is_ok());
    }

    #[test]
    fn index_reference_reports_missing_fasta() {
        let dir = tempfile::tempdir().unwrap();
        let err = index_reference(&dir.path().join("absent.fa"), None, IndexOpt::default()).unwrap_err();
        assert!(format!("{:#}", err).contains("absent.fa"));
    }
}
