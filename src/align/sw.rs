use crate::util::cigar::{Cigar, CigarKind};
use crate::util::dna::CODE_N;

const NEG_INF: i32 = i32::MIN / 4;

// trace byte layout: bits 0-1 = source of H, bit 2 = E extended, bit 3 = F extended
const FROM_ZERO: u8 = 0;
const FROM_DIAG: u8 = 1;
const FROM_E: u8 = 2;
const FROM_F: u8 = 3;
const E_EXT: u8 = 1 << 2;
const F_EXT: u8 = 1 << 3;

#[derive(Clone, Copy, Debug)]
pub struct SwParams {
    pub match_score: i32,
    pub mismatch_penalty: i32,
    /// 长度为 k 的 gap 罚分为 gap_open + k * gap_extend
    pub gap_open: i32,
    pub gap_extend: i32,
    pub band_width: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SwResult {
    pub score: i32,
    pub query_start: usize,
    pub query_end: usize,
    pub ref_start: usize,
    pub ref_end: usize,
    /// 仅覆盖对齐部分（不含 soft clip），`=`/`X`/`I`/`D`
    pub cigar: Cigar,
    pub nm: u32,
}

/// DP 工作缓冲区，可跨调用复用
#[derive(Default)]
pub struct SwBuffer {
    h: Vec<i32>,
    e: Vec<i32>,
    f: Vec<i32>,
    trace: Vec<u8>,
}

impl SwBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn reset(&mut self, size: usize) {
        self.h.clear();
        self.h.resize(size, 0);
        self.e.clear();
        self.e.resize(size, NEG_INF);
        self.f.clear();
        self.f.resize(size, NEG_INF);
        self.trace.clear();
        self.trace.resize(size, FROM_ZERO);
    }
}

#[inline]
fn substitution(q: u8, r: u8, p: &SwParams) -> i32 {
    if q == r && q != CODE_N {
        p.match_score
    } else {
        -p.mismatch_penalty
    }
}

/// 带状仿射间隙 Smith-Waterman 局部对齐，带宽以主对角线 (j == i) 为中心
pub fn banded_sw(query: &[u8], reference: &[u8], p: SwParams) -> SwResult {
    banded_sw_at(query, reference, 0, p, &mut SwBuffer::new())
}

/// 同上，但带宽以 `j - i == diag` 为中心；`query` / `reference` 为编码后的序列，N 永远不匹配。
pub fn banded_sw_at(query: &[u8], reference: &[u8], diag: isize, p: SwParams, buf: &mut SwBuffer) -> SwResult {
    let m = query.len();
    let n = reference.len();
    if m == 0 || n == 0 {
        return SwResult::default();
    }

    let cols = n + 1;
    buf.reset((m + 1) * cols);
    let SwBuffer { h, e, f, trace } = buf;

    let band = p.band_width.min(m + n) as isize;
    let open = p.gap_open + p.gap_extend;

    let mut best_score = 0i32;
    let mut best_i = 0usize;
    let mut best_j = 0usize;

    for i in 1..=m {
        let center = i as isize + diag;
        let j_start = (center - band).max(1);
        let j_end = (center + band).min(n as isize);
        if j_start > j_end {
            continue;
        }

        for j in j_start as usize..=j_end as usize {
            let idx = i * cols + j;
            let up = idx - cols;
            let left = idx - 1;
            let mut t = 0u8;

            let e_open = h[up] - open;
            let e_ext = e[up] - p.gap_extend;
            e[idx] = if e_ext > e_open {
                t |= E_EXT;
                e_ext
            } else {
                e_open
            };

            let f_open = h[left] - open;
            let f_ext = f[left] - p.gap_extend;
            f[idx] = if f_ext > f_open {
                t |= F_EXT;
                f_ext
            } else {
                f_open
            };

            let mut val = h[up - 1] + substitution(query[i - 1], reference[j - 1], &p);
            let mut src = FROM_DIAG;
            if e[idx] > val {
                val = e[idx];
                src = FROM_E;
            }
            if f[idx] > val {
                val = f[idx];
                src = FROM_F;
            }
            if val <= 0 {
                val = 0;
                src = FROM_ZERO;
            }
            h[idx] = val;
            trace[idx] = t | src;

            if val > best_score {
                best_score = val;
                best_i = i;
                best_j = j;
            }
        }
    }

    if best_score <= 0 {
        return SwResult::default();
    }

    // 三状态回溯
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        H,
        E,
        F,
    }
    let mut ops: Vec<CigarKind> = Vec::with_capacity(m + 8);
    let mut nm = 0u32;
    let (mut i, mut j) = (best_i, best_j);
    let mut state = State::H;
    while i > 0 && j > 0 {
        let tr = trace[i * cols + j];
        match state {
            State::H => match tr & 3 {
                FROM_DIAG => {
                    let (q, r) = (query[i - 1], reference[j - 1]);
                    if q == r && q != CODE_N {
                        ops.push(CigarKind::Equal);
                    } else {
                        ops.push(CigarKind::Diff);
                        nm += 1;
                    }
                    i -= 1;
                    j -= 1;
                }
                FROM_E => state = State::E,
                FROM_F => state = State::F,
                _ => break,
            },
            State::E => {
                ops.push(CigarKind::Ins);
                nm += 1;
                i -= 1;
                if tr & E_EXT == 0 {
                    state = State::H;
                }
            }
            State::F => {
                ops.push(CigarKind::Del);
                nm += 1;
                j -= 1;
                if tr & F_EXT == 0 {
                    state = State::H;
                }
            }
        }
    }
    ops.reverse();

    SwResult {
        score: best_score,
        query_start: i,
        query_end: best_i,
        ref_start: j,
        ref_end: best_j,
        cigar: Cigar::from_ops(&ops),
        nm,
    }
}
