//! CIGAR 的内部表示，SW 回溯产生，SAM 输出时格式化。

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CigarKind {
    Match,
    Equal,
    Diff,
    Ins,
    Del,
    Skip,
    SoftClip,
    HardClip,
    Pad,
}

impl CigarKind {
    pub fn symbol(self) -> char {
        match self {
            CigarKind::Match => 'M',
            CigarKind::Equal => '=',
            CigarKind::Diff => 'X',
            CigarKind::Ins => 'I',
            CigarKind::Del => 'D',
            CigarKind::Skip => 'N',
            CigarKind::SoftClip => 'S',
            CigarKind::HardClip => 'H',
            CigarKind::Pad => 'P',
        }
    }

    #[inline]
    pub fn consumes_ref(self) -> bool {
        matches!(
            self,
            CigarKind::Match | CigarKind::Equal | CigarKind::Diff | CigarKind::Del | CigarKind::Skip
        )
    }

    #[inline]
    pub fn consumes_query(self) -> bool {
        matches!(
            self,
            CigarKind::Match | CigarKind::Equal | CigarKind::Diff | CigarKind::Ins | CigarKind::SoftClip
        )
    }

    /// read 碱基落在参考碱基上（M/=/X）
    #[inline]
    pub fn is_aligned(self) -> bool {
        matches!(self, CigarKind::Match | CigarKind::Equal | CigarKind::Diff)
    }
}

/// 游程编码的 CIGAR，相邻同类操作总是合并
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cigar {
    ops: Vec<(CigarKind, u32)>,
}

impl Cigar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: CigarKind, len: u32) {
        if len == 0 {
            return;
        }
        match self.ops.last_mut() {
            Some((last, n)) if *last == kind => *n += len,
            _ => self.ops.push((kind, len)),
        }
    }

    /// 由逐列操作构造，例如 SW 回溯的结果
    pub fn from_ops(ops: &[CigarKind]) -> Self {
        let mut cigar = Self::new();
        for &op in ops {
            cigar.push(op, 1);
        }
        cigar
    }

    pub fn ref_len(&self) -> u32 {
        self.ops.iter().filter(|(k, _)| k.consumes_ref()).map(|(_, n)| n).sum()
    }

    pub fn query_len(&self) -> u32 {
        self.ops.iter().filter(|(k, _)| k.consumes_query()).map(|(_, n)| n).sum()
    }

    /// 比对区间以外的 read 碱基补成软剪切
    pub fn with_soft_clips(self, left: u32, right: u32) -> Self {
        let mut out = Self::new();
        out.push(CigarKind::SoftClip, left);
        for (k, n) in self.ops {
            out.push(k, n);
        }
        out.push(CigarKind::SoftClip, right);
        out
    }

    /// `=`/`X` 合并为 `M`，兼容 SAM 1.4 之前的下游工具
    pub fn to_classic(&self) -> Self {
        let mut out = Self::new();
        for &(k, n) in &self.ops {
            let k = if k.is_aligned() { CigarKind::Match } else { k };
            out.push(k, n);
        }
        out
    }
}

impl fmt::Display for Cigar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ops.is_empty() {
            return f.write_str("*");
        }
        for (k, n) in &self.ops {
            write!(f, "{}{}", n, k.symbol())?;
        }
        Ok(())
    }
}
