//! 核苷酸编码工具。
//!
//! 索引和比对都在数值字母表上工作：`$`=0（contig 分隔符），A=1，C=2，G=3，T=4，N=5。

pub const SIGMA: usize = 6; // {0:$, 1:A, 2:C, 3:G, 4:T, 5:N}

pub const SENTINEL: u8 = 0;
pub const CODE_N: u8 = 5;

#[inline]
pub fn encode(b: u8) -> u8 {
    match b.to_ascii_uppercase() {
        b'$' => SENTINEL,
        b'A' => 1,
        b'C' => 2,
        b'G' => 3,
        b'T' | b'U' => 4,
        _ => CODE_N,
    }
}

#[inline]
pub fn decode(code: u8) -> u8 {
    match code {
        SENTINEL => b'$',
        1 => b'A',
        2 => b'C',
        3 => b'G',
        4 => b'T',
        _ => b'N',
    }
}

pub fn encode_seq(seq: &[u8]) -> Vec<u8> {
    seq.iter().map(|&b| encode(b)).collect()
}

/// 编码后的反向互补（N 保持为 N，$ 保持为 $）
pub fn revcomp_codes(codes: &[u8]) -> Vec<u8> {
    codes
        .iter()
        .rev()
        .map(|&c| match c {
            1..=4 => 5 - c,
            other => other,
        })
        .collect()
}

#[inline]
pub fn complement(base: u8) -> u8 {
    match base.to_ascii_uppercase() {
        b'A' => b'T',
        b'C' => b'G',
        b'G' => b'C',
        b'T' | b'U' => b'A',
        _ => b'N',
    }
}

pub fn revcomp(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().map(|&b| complement(b)).collect()
}
