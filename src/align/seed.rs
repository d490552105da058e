use crate::index::fm::FMIndex;
use crate::util::dna::{CODE_N, SENTINEL};

/// 精确匹配种子：read[qb, qe) == contig[rb, rb + len)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seed {
    /// read 以反向互补形式比对
    pub rev: bool,
    pub contig: usize,
    pub qb: usize,
    pub qe: usize,
    pub rb: u32,
}

impl Seed {
    #[inline]
    pub fn len(&self) -> usize {
        self.qe - self.qb
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.qe == self.qb
    }

    /// 参考坐标减去 read 坐标，同一对角线上的种子属于同一比对
    #[inline]
    pub fn diag(&self) -> i64 {
        self.rb as i64 - self.qb as i64
    }

    #[inline]
    pub fn re(&self) -> u32 {
        self.rb + self.len() as u32
    }
}

/// 贪心反向最大精确匹配：从 read 末端开始，用 FM 索引向左扩展直到 SA 区间为空，
/// 得到以当前位置结尾的最长匹配；随后跳过失配碱基继续向左。
///
/// 长度不足 `min_len` 或出现次数超过 `max_occ` 的匹配被丢弃。
pub fn find_seeds(fm: &FMIndex, query: &[u8], rev: bool, min_len: usize, max_occ: usize) -> Vec<Seed> {
    let n = query.len();
    let mut seeds = Vec::new();
    if min_len == 0 || n < min_len || fm.is_empty() {
        return seeds;
    }

    let mut end = n;
    while end >= min_len {
        let (mut l, mut r) = (0usize, fm.len());
        let mut start = end;
        while start > 0 {
            let a = query[start - 1];
            if a == CODE_N || a == SENTINEL {
                break;
            }
            let (nl, nr) = fm.extend_left(a, l, r);
            if nl >= nr {
                break;
            }
            l = nl;
            r = nr;
            start -= 1;
        }

        let len = end - start;
        if len >= min_len && r - l <= max_occ {
            // 模式中不含分隔符，匹配不会跨越 contig 边界
            for pos in fm.locate_interval(l, r, max_occ) {
                if let Some((contig, off)) = fm.map_text_pos(pos) {
                    seeds.push(Seed { rev, contig, qb: start, qe: end, rb: off });
                }
            }
        }

        if start == 0 {
            break;
        }
        end = start - 1;
    }

    seeds.sort_by_key(|s| (s.contig, s.qb, s.rb));
    seeds
}
