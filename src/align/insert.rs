//! FR insert-size distribution, estimated once from confidently paired reads.

/// 低于此数目的唯一配对不足以估计分布
pub const MIN_PAIRS: usize = 10;
const OUTLIER_BOUND: f64 = 2.0;
const MAPPING_BOUND: f64 = 3.0;
const MAX_STDDEV: f64 = 4.0;

#[derive(Debug, Clone, PartialEq)]
pub struct InsertSizeModel {
    pub mean: f64,
    pub std: f64,
    /// proper pair 的插入长度范围 [low, high]
    pub low: u32,
    pub high: u32,
    /// false 表示使用的是回退值
    pub estimated: bool,
}

impl InsertSizeModel {
    /// `[1, max_insert]`，均值取中点
    pub fn fallback(max_insert: u32) -> Self {
        let max_insert = max_insert.max(1);
        let mean = f64::from(max_insert) / 2.0;
        Self { mean, std: mean / 2.0, low: 1, high: max_insert, estimated: false }
    }

    /// 分位数 + IQR 剔除离群值后求均值/标准差，proper 范围取 3·IQR 与 4σ 中较宽者
    pub fn estimate(inserts: &[u32], max_insert: u32) -> Self {
        let mut sizes: Vec<u32> = inserts.iter().copied().filter(|&s| s > 0 && s <= max_insert).collect();
        if sizes.len() < MIN_PAIRS {
            log::info!(
                "only {} unique FR pairs, using fallback insert range [1, {}]",
                sizes.len(),
                max_insert
            );
            return Self::fallback(max_insert);
        }
        sizes.sort_unstable();

        let pct = |p: f64| f64::from(sizes[((p * sizes.len() as f64 + 0.499) as usize).min(sizes.len() - 1)]);
        let (p25, p50, p75) = (pct(0.25), pct(0.50), pct(0.75));
        let iqr = p75 - p25;
        log::debug!("insert size (25, 50, 75) percentile: ({}, {}, {})", p25, p50, p75);

        let lo = (p25 - OUTLIER_BOUND * iqr).max(1.0);
        let hi = p75 + OUTLIER_BOUND * iqr;
        let kept: Vec<f64> = sizes
            .iter()
            .map(|&s| f64::from(s))
            .filter(|&s| s >= lo && s <= hi)
            .collect();
        let n = kept.len().max(1) as f64;
        let mean = kept.iter().sum::<f64>() / n;
        let std = (kept.iter().map(|s| (s - mean) * (s - mean)).sum::<f64>() / n).sqrt();

        let low = (p25 - MAPPING_BOUND * iqr).min(mean - MAX_STDDEV * std).max(1.0);
        let high = (p75 + MAPPING_BOUND * iqr).max(mean + MAX_STDDEV * std);

        let model = Self {
            mean,
            std,
            low: (low + 0.499) as u32,
            high: (high + 0.499) as u32,
            estimated: true,
        };
        log::info!(
            "insert size from {} pairs: mean {:.1}, std {:.1}, proper range [{}, {}]",
            sizes.len(),
            model.mean,
            model.std,
            model.low,
            model.high
        );
        model
    }

    #[inline]
    pub fn is_proper(&self, insert: u32) -> bool {
        insert >= self.low && insert <= self.high
    }

    /// 插入长度的对数似然加分（<= 0），按匹配得分缩放
    pub fn log_likelihood(&self, insert: u32, match_score: i32) -> i32 {
        if self.std <= 0.0 {
            return 0;
        }
        let z = (f64::from(insert) - self.mean) / self.std;
        let p = (2.0 * erfc(z.abs() / std::f64::consts::SQRT_2)).max(1e-300);
        let ll = 0.721 * p.ln() * f64::from(match_score);
        (ll + 0.499).floor() as i32
    }
}

/// 互补误差函数（Numerical Recipes 近似，相对误差 < 1.2e-7）
fn erfc(x: f64) -> f64 {
    let t = 1.0 / (1.0 + 0.5 * x.abs());
    let tau = t
        * (-x * x - 1.26551223
            + t * (1.00002368
                + t * (0.37409196
                    + t * (0.09678418
                        + t * (-0.18628806
                            + t * (0.27886807
                                + t * (-1.13520398 + t * (1.48851587 + t * (-0.82215223 + t * 0.17087277)))))))))
            .exp();
    if x >= 0.0 {
        tau
    } else {
        2.0 - tau
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn few_pairs_fall_back() {
        let m = InsertSizeModel::estimate(&[300, 310, 290], 1000);
        assert!(!m.estimated);
        assert_eq!((m.low, m.high), (1, 1000));
        assert_eq!(m.mean, 500.0);
    }

    #[test]
    fn estimate_ignores_outliers() {
        let mut inserts: Vec<u32> = (0..100).map(|i| 290 + (i % 21)).collect();
        inserts.push(950);
        inserts.push(5000); // above max_insert, dropped outright
        let m = InsertSizeModel::estimate(&inserts, 1000);
        assert!(m.estimated);
        assert!((m.mean - 300.0).abs() < 2.0, "mean {}", m.mean);
        assert!(m.std > 3.0 && m.std < 10.0, "std {}", m.std);
        assert!(m.is_proper(300));
        assert!(!m.is_proper(950));
        assert!(m.low >= 1);
    }

    #[test]
    fn likelihood_penalises_distance_from_mean() {
        let m = InsertSizeModel { mean: 300.0, std: 20.0, low: 200, high: 400, estimated: true };
        let near = m.log_likelihood(300, 1);
        let far = m.log_likelihood(380, 1);
        assert_eq!(near, 0);
        assert!(far < near);
    }

    #[test]
    fn erfc_matches_known_values() {
        assert!((erfc(0.0) - 1.0).abs() < 1e-6);
        assert!((erfc(1.0) - 0.157_299_2).abs() < 1e-6);
        assert!((erfc(-1.0) - 1.842_700_8).abs() < 1e-6);
    }
}
