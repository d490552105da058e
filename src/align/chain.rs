use std::collections::BTreeMap;

use super::seed::Seed;

/// 同一 contig、同一链方向上共线的种子
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    pub rev: bool,
    pub contig: usize,
    pub seeds: Vec<Seed>,
    /// 种子覆盖的 read 碱基数
    pub score: u32,
}

impl Chain {
    pub fn query_span(&self) -> (usize, usize) {
        let qb = self.seeds.iter().map(|s| s.qb).min().unwrap_or(0);
        let qe = self.seeds.iter().map(|s| s.qe).max().unwrap_or(0);
        (qb, qe)
    }

    pub fn ref_span(&self) -> (u32, u32) {
        let rb = self.seeds.iter().map(|s| s.rb).min().unwrap_or(0);
        let re = self.seeds.iter().map(|s| s.re()).max().unwrap_or(0);
        (rb, re)
    }

    /// 得分最高的种子所在对角线，用作 SW 带宽中心
    pub fn anchor_diag(&self) -> i64 {
        self.seeds
            .iter()
            .max_by_key(|s| s.len())
            .map_or(0, Seed::diag)
    }
}

/// 单组种子（同 contig 同方向）上的最佳共线链，O(n^2) DP
fn best_chain(seeds: &[Seed], max_gap: usize) -> Option<(Vec<usize>, u32)> {
    if seeds.is_empty() {
        return None;
    }
    let n = seeds.len();
    let mut dp = vec![0u32; n];
    let mut prev: Vec<Option<usize>> = vec![None; n];
    let mut best = 0usize;

    for i in 0..n {
        let si = &seeds[i];
        let len_i = si.len() as u32;
        dp[i] = len_i;
        for j in 0..i {
            let sj = &seeds[j];
            if sj.qe > si.qb || sj.re() > si.rb {
                continue;
            }
            let gap_q = si.qb - sj.qe;
            let gap_r = (si.rb - sj.re()) as usize;
            if gap_q > max_gap || gap_r > max_gap {
                continue;
            }
            if dp[j] + len_i > dp[i] {
                dp[i] = dp[j] + len_i;
                prev[i] = Some(j);
            }
        }
        if dp[i] > dp[best] {
            best = i;
        }
    }

    let mut members = Vec::new();
    let mut cur = Some(best);
    while let Some(i) = cur {
        members.push(i);
        cur = prev[i];
    }
    members.reverse();
    Some((members, dp[best]))
}

/// 按 (方向, contig) 分组后反复剥离最佳链，直到种子用完。结果按得分降序。
pub fn build_chains(seeds: &[Seed], max_gap: usize) -> Vec<Chain> {
    let mut groups: BTreeMap<(bool, usize), Vec<Seed>> = BTreeMap::new();
    for s in seeds {
        groups.entry((s.rev, s.contig)).or_default().push(s.clone());
    }

    let mut chains = Vec::new();
    for ((rev, contig), mut remaining) in groups {
        remaining.sort_by_key(|s| (s.qb, s.rb));
        while let Some((members, score)) = best_chain(&remaining, max_gap) {
            let mut taken = Vec::with_capacity(members.len());
            // members 升序，倒序移除保证下标有效
            for &i in members.iter().rev() {
                taken.push(remaining.remove(i));
            }
            taken.reverse();
            chains.push(Chain { rev, contig, seeds: taken, score });
        }
    }

    chains.sort_by(|a, b| b.score.cmp(&a.score).then(a.contig.cmp(&b.contig)));
    chains
}

/// 丢弃得分低于 `drop_ratio * best` 的链，最多保留 `max_chains` 条
pub fn filter_chains(chains: &mut Vec<Chain>, drop_ratio: f64, max_chains: usize) {
    let Some(best) = chains.first().map(|c| c.score) else {
        return;
    };
    let threshold = (f64::from(best) * drop_ratio) as u32;
    chains.retain(|c| c.score >= threshold);
    chains.truncate(max_chains.max(1));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(contig: usize, qb: usize, qe: usize, rb: u32) -> Seed {
        Seed { rev: false, contig, qb, qe, rb }
    }

    #[test]
    fn colinear_seeds_form_one_chain() {
        let chains = build_chains(&[seed(0, 0, 20, 100), seed(0, 25, 50, 125)], 10);
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].score, 45);
        assert_eq!(chains[0].query_span(), (0, 50));
        assert_eq!(chains[0].ref_span(), (100, 150));
        assert_eq!(chains[0].anchor_diag(), 100);
    }

    #[test]
    fn overlapping_and_distant_seeds_are_split() {
        let seeds = vec![
            seed(0, 0, 20, 0),
            seed(0, 10, 30, 10), // overlaps the first on the read
            seed(0, 30, 40, 500), // too far on the reference
        ];
        let chains = build_chains(&seeds, 50);
        assert_eq!(chains.len(), 3);
        assert!(chains.iter().all(|c| c.seeds.len() == 1));
        assert_eq!(chains[0].score, 20);
    }

    #[test]
    fn strands_and_contigs_never_mix() {
        let mut rc = seed(0, 20, 40, 20);
        rc.rev = true;
        let chains = build_chains(&[seed(0, 0, 20, 0), rc, seed(1, 20, 40, 20)], 10);
        assert_eq!(chains.len(), 3);
    }

    #[test]
    fn repeat_copies_survive_filtering() {
        let seeds = vec![seed(0, 0, 50, 0), seed(0, 0, 50, 1000), seed(0, 0, 10, 5000)];
        let mut chains = build_chains(&seeds, 20);
        filter_chains(&mut chains, 0.5, 8);
        assert_eq!(chains.len(), 2);
        assert_eq!(chains[0].score, chains[1].score);

        let mut chains = build_chains(&seeds, 20);
        filter_chains(&mut chains, 0.0, 1);
        assert_eq!(chains.len(), 1);
    }
}
