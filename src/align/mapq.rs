/// 唯一定位 read 的 MAPQ 上限（Phred 标度）
pub const MAX_MAPQ: u8 = 60;

/// 由单条 read 的最优、次优比对得分计算 MAPQ。
///
/// 两者相等为 0，没有次优为 60，中间线性插值。
pub fn mapq_from_scores(best: i32, second: i32) -> u8 {
    if best <= 0 {
        return 0;
    }
    let second = second.max(0);
    if second >= best {
        return 0;
    }
    let q = f64::from(MAX_MAPQ) * f64::from(best - second) / f64::from(best);
    q.round().clamp(0.0, f64::from(MAX_MAPQ)) as u8
}

/// 配对层面的 MAPQ：最优与次优配对的得分差，每个匹配分约 6
pub fn pair_mapq(best: i32, second: Option<i32>, match_score: i32) -> u8 {
    let Some(second) = second else {
        return MAX_MAPQ;
    };
    let diff = f64::from((best - second).max(0));
    let q = 6.02 * diff / f64::from(match_score.max(1));
    q.round().min(f64::from(MAX_MAPQ)) as u8
}

/// proper pair 为每个 mate 加分，但不超过 `se + 40`
pub fn combine_pair_mapq(se: u8, pair: u8) -> u8 {
    se.max(pair.min(se.saturating_add(40))).min(MAX_MAPQ)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_hit_gets_max() {
        assert_eq!(mapq_from_scores(100, 0), 60);
        assert_eq!(mapq_from_scores(100, -5), 60);
    }

    #[test]
    fn tie_gets_zero() {
        assert_eq!(mapq_from_scores(80, 80), 0);
        assert_eq!(mapq_from_scores(0, 0), 0);
    }

    #[test]
    fn partial_confidence_is_linear() {
        assert_eq!(mapq_from_scores(100, 50), 30);
        assert_eq!(mapq_from_scores(100, 90), 6);
    }

    #[test]
    fn pair_mapq_scales_with_gap() {
        assert_eq!(pair_mapq(200, None, 1), 60);
        assert_eq!(pair_mapq(200, Some(200), 1), 0);
        assert_eq!(pair_mapq(200, Some(195), 1), 30);
        assert_eq!(pair_mapq(200, Some(183), 1), 60);
    }

    #[test]
    fn pair_boost_is_capped() {
        assert_eq!(combine_pair_mapq(0, 60), 40);
        assert_eq!(combine_pair_mapq(30, 60), 60);
        assert_eq!(combine_pair_mapq(50, 10), 50);
    }
}
