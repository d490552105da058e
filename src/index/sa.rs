//! 后缀数组构建。
//!
//! 输入为数值化文本（0:$, 1:A, 2:C, 3:G, 4:T, 5:N），允许多个 0 作为 contig 分隔符；
//! 结果是完整后缀的字典序（较短的后缀在相同前缀时排在前面）。三种算法结果完全一致。

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum SaAlgorithm {
    /// Kärkkäinen-Sanders（DC3），线性时间
    #[default]
    Ks,
    /// Manber-Myers 前缀倍增，O(n log^2 n)
    ManberMyers,
    /// 直接比较后缀排序，只适合很短的文本
    Simple,
}

pub fn build_sa(text: &[u8], algo: SaAlgorithm) -> Vec<u32> {
    match algo {
        SaAlgorithm::Ks => ks(text),
        SaAlgorithm::ManberMyers => prefix_doubling(text),
        SaAlgorithm::Simple => simple(text),
    }
}

fn simple(text: &[u8]) -> Vec<u32> {
    let mut sa: Vec<u32> = (0..text.len() as u32).collect();
    sa.sort_unstable_by(|&a, &b| text[a as usize..].cmp(&text[b as usize..]));
    sa
}

fn prefix_doubling(text: &[u8]) -> Vec<u32> {
    let n = text.len();
    if n == 0 {
        return Vec::new();
    }
    let mut sa: Vec<u32> = (0..n as u32).collect();
    let mut rank: Vec<u32> = text.iter().map(|&b| b as u32 + 1).collect();
    let mut next_rank = vec![0u32; n];

    // 0 stands for "past the end", below every real rank
    let key = |rank: &[u32], i: usize, k: usize| -> (u32, u32) {
        (rank[i], if i + k < n { rank[i + k] } else { 0 })
    };

    let mut k = 1usize;
    loop {
        sa.sort_unstable_by_key(|&i| key(&rank, i as usize, k));

        next_rank[sa[0] as usize] = 1;
        for w in 1..n {
            let prev = key(&rank, sa[w - 1] as usize, k);
            let curr = key(&rank, sa[w] as usize, k);
            let bump = u32::from(curr != prev);
            next_rank[sa[w] as usize] = next_rank[sa[w - 1] as usize] + bump;
        }
        std::mem::swap(&mut rank, &mut next_rank);

        if rank[sa[n - 1] as usize] as usize == n || k >= n {
            break;
        }
        k <<= 1;
    }
    sa
}

fn ks(text: &[u8]) -> Vec<u32> {
    let n = text.len();
    // 符号整体 +1，0 留给末尾的三个填充位
    let mut s: Vec<usize> = text.iter().map(|&b| b as usize + 1).collect();
    let k = s.iter().copied().max().unwrap_or(0);
    s.extend_from_slice(&[0, 0, 0]);
    let mut sa = vec![0usize; n];
    dc3(&s, &mut sa, n, k);
    sa.into_iter().map(|p| p as u32).collect()
}

#[inline]
fn leq2(a1: usize, a2: usize, b1: usize, b2: usize) -> bool {
    a1 < b1 || (a1 == b1 && a2 <= b2)
}

#[inline]
fn leq3(a1: usize, a2: usize, a3: usize, b1: usize, b2: usize, b3: usize) -> bool {
    a1 < b1 || (a1 == b1 && leq2(a2, a3, b2, b3))
}

/// 按 r[a[i] + offset] 稳定计数排序 a[..n] 到 b，键取值 0..=k
fn radix_pass(a: &[usize], b: &mut [usize], r: &[usize], offset: usize, n: usize, k: usize) {
    let mut count = vec![0usize; k + 1];
    for &x in &a[..n] {
        count[r[x + offset]] += 1;
    }
    let mut sum = 0;
    for c in count.iter_mut() {
        let t = *c;
        *c = sum;
        sum += t;
    }
    for &x in &a[..n] {
        let key = r[x + offset];
        b[count[key]] = x;
        count[key] += 1;
    }
}

/// `s` 长度 n + 3，末尾三个 0，其余取值 1..=k
fn dc3(s: &[usize], sa: &mut [usize], n: usize, k: usize) {
    if n <= 3 {
        let mut idx: Vec<usize> = (0..n).collect();
        idx.sort_unstable_by(|&a, &b| s[a..n].cmp(&s[b..n]));
        sa[..n].copy_from_slice(&idx);
        return;
    }

    let n0 = (n + 2) / 3;
    let n1 = (n + 1) / 3;
    let n2 = n / 3;
    let n02 = n0 + n2;

    let mut s12 = vec![0usize; n02 + 3];
    let mut sa12 = vec![0usize; n02 + 3];
    let mut s0 = vec![0usize; n0];
    let mut sa0 = vec![0usize; n0];

    // n % 3 == 1 时多放一个虚拟的 mod 1 后缀
    let mut j = 0;
    for i in 0..n + (n0 - n1) {
        if i % 3 != 0 {
            s12[j] = i;
            j += 1;
        }
    }

    radix_pass(&s12, &mut sa12, s, 2, n02, k);
    radix_pass(&sa12, &mut s12, s, 1, n02, k);
    radix_pass(&s12, &mut sa12, s, 0, n02, k);

    let mut name = 0usize;
    let mut last: Option<(usize, usize, usize)> = None;
    for &p in &sa12[..n02] {
        let tri = (s[p], s[p + 1], s[p + 2]);
        if last != Some(tri) {
            name += 1;
            last = Some(tri);
        }
        if p % 3 == 1 {
            s12[p / 3] = name;
        } else {
            s12[p / 3 + n0] = name;
        }
    }

    if name < n02 {
        // 名字不唯一，递归排序 mod 1/2 后缀
        dc3(&s12, &mut sa12, n02, name);
        for (i, &p) in sa12[..n02].iter().enumerate() {
            s12[p] = i + 1;
        }
    } else {
        for i in 0..n02 {
            sa12[s12[i] - 1] = i;
        }
    }

    let mut j = 0;
    for &p in &sa12[..n02] {
        if p < n0 {
            s0[j] = 3 * p;
            j += 1;
        }
    }
    radix_pass(&s0, &mut sa0, s, 0, n0, k);

    let pos12 = |t: usize| if sa12[t] < n0 { sa12[t] * 3 + 1 } else { (sa12[t] - n0) * 3 + 2 };
    let mut p = 0usize;
    let mut t = n0 - n1;
    let mut out = 0usize;
    while out < n {
        let i = pos12(t);
        let j = sa0[p];
        let take12 = if sa12[t] < n0 {
            leq2(s[i], s12[sa12[t] + n0], s[j], s12[j / 3])
        } else {
            leq3(s[i], s[i + 1], s12[sa12[t] - n0 + 1], s[j], s[j + 1], s12[j / 3 + n0])
        };
        if take12 {
            sa[out] = i;
            out += 1;
            t += 1;
            if t == n02 {
                for &q in &sa0[p..] {
                    sa[out] = q;
                    out += 1;
                }
                break;
            }
        } else {
            sa[out] = j;
            out += 1;
            p += 1;
            if p == n0 {
                while t < n02 {
                    sa[out] = pos12(t);
                    out += 1;
                    t += 1;
                }
                break;
            }
        }
    }
}
