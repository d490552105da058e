//! SAM 输出与读取：比对结果按文本行写出，QC 通过 htslib 读回 SAM/BAM。

use anyhow::{Context, Result};
use rust_htslib::bam;
use std::fmt;
use std::io::Write;
use std::path::Path;

use crate::index::fm::Contig;
use crate::util::cigar::Cigar;

/// SAM FLAG 位（SAM v1.6）
pub mod flags {
    pub const PAIRED: u16 = 0x1;
    pub const PROPER_PAIR: u16 = 0x2;
    pub const UNMAPPED: u16 = 0x4;
    pub const MATE_UNMAPPED: u16 = 0x8;
    pub const REVERSE: u16 = 0x10;
    pub const MATE_REVERSE: u16 = 0x20;
    pub const FIRST_IN_PAIR: u16 = 0x40;
    pub const SECOND_IN_PAIR: u16 = 0x80;
    pub const SECONDARY: u16 = 0x100;
    pub const SUPPLEMENTARY: u16 = 0x800;
}

pub const MAPQ_UNAVAILABLE: u8 = 255;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamRecord {
    pub qname: String,
    pub flag: u16,
    /// 未定位时为 `*`
    pub rname: String,
    /// 1-based，未定位时为 0
    pub pos: u32,
    pub mapq: u8,
    pub cigar: Cigar,
    pub rnext: String,
    pub pnext: u32,
    pub tlen: i64,
    pub seq: Vec<u8>,
    pub qual: Vec<u8>,
    /// 可选字段，已格式化为 `TAG:TYPE:VALUE`
    pub tags: Vec<String>,
}

impl SamRecord {
    pub fn unmapped(qname: &str, seq: &[u8], qual: &[u8]) -> Self {
        Self {
            qname: qname.to_string(),
            flag: flags::UNMAPPED,
            rname: "*".to_string(),
            pos: 0,
            mapq: 0,
            cigar: Cigar::new(),
            rnext: "*".to_string(),
            pnext: 0,
            tlen: 0,
            seq: seq.to_vec(),
            qual: qual.to_vec(),
            tags: Vec::new(),
        }
    }

    #[inline]
    pub fn has(&self, bits: u16) -> bool {
        self.flag & bits == bits
    }

    pub fn is_mapped(&self) -> bool {
        !self.has(flags::UNMAPPED)
    }
}

fn bytes_or_star(b: &[u8]) -> std::borrow::Cow<'_, str> {
    if b.is_empty() {
        std::borrow::Cow::Borrowed("*")
    } else {
        String::from_utf8_lossy(b)
    }
}

impl fmt::Display for SamRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.qname,
            self.flag,
            self.rname,
            self.pos,
            self.mapq,
            self.cigar,
            self.rnext,
            self.pnext,
            self.tlen,
            bytes_or_star(&self.seq),
            bytes_or_star(&self.qual),
        )?;
        for tag in &self.tags {
            write!(f, "\t{}", tag)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ProgramInfo {
    pub id: String,
    pub version: String,
    pub command_line: String,
}

pub fn write_header<W: Write>(w: &mut W, contigs: &[Contig], program: &ProgramInfo) -> Result<()> {
    writeln!(w, "@HD\tVN:1.6\tSO:unsorted")?;
    for c in contigs {
        writeln!(w, "@SQ\tSN:{}\tLN:{}", c.name, c.len)?;
    }
    writeln!(
        w,
        "@PG\tID:{id}\tPN:{id}\tVN:{}\tCL:{}",
        program.version,
        program.command_line,
        id = program.id
    )?;
    Ok(())
}

/// 打开待统计的 SAM/BAM，`-` 表示标准输入
pub fn open_sam(path: &Path) -> Result<bam::Reader> {
    let reader = if path.as_os_str() == "-" {
        bam::Reader::from_stdin()
    } else {
        bam::Reader::from_path(path)
    };
    reader.with_context(|| format!("cannot open SAM '{}'", path.display()))
}

/// `@SQ` 声明的 (名字, 长度)，下标即 tid
pub fn reference_lengths(header: &bam::HeaderView) -> Vec<(String, u32)> {
    header
        .target_names()
        .into_iter()
        .enumerate()
        .map(|(tid, name)| {
            let len = header.target_len(tid as u32).unwrap_or(0);
            (String::from_utf8_lossy(name).into_owned(), len as u32)
        })
        .collect()
}

/// 既不是 secondary 也不是 supplementary
pub fn is_primary(rec: &bam::Record) -> bool {
    rec.flags() & (flags::SECONDARY | flags::SUPPLEMENTARY) == 0
}
