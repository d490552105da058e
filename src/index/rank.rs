use serde::{Deserialize, Serialize};

/// 常数时间 rank 的位向量：每个 64 位字存一个累计 popcount
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RankBitVec {
    len: usize,
    words: Vec<u64>,
    /// words[..w] 中 1 的个数
    cumulative: Vec<u32>,
}

impl RankBitVec {
    pub fn from_bits<I: IntoIterator<Item = bool>>(bits: I) -> Self {
        let mut words = Vec::new();
        let mut len = 0usize;
        for bit in bits {
            if len % 64 == 0 {
                words.push(0u64);
            }
            if bit {
                let last = words.len() - 1;
                words[last] |= 1u64 << (len % 64);
            }
            len += 1;
        }
        let mut cumulative = Vec::with_capacity(words.len());
        let mut acc = 0u32;
        for w in &words {
            cumulative.push(acc);
            acc += w.count_ones();
        }
        Self { len, words, cumulative }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn get(&self, i: usize) -> bool {
        debug_assert!(i < self.len);
        (self.words[i / 64] >> (i % 64)) & 1 == 1
    }

    /// `[0, i)` 内置位的个数
    #[inline]
    pub fn rank1(&self, i: usize) -> usize {
        if i == 0 {
            return 0;
        }
        let w = i / 64;
        let r = i % 64;
        if w == self.words.len() {
            let last = self.words.len() - 1;
            return (self.cumulative[last] + self.words[last].count_ones()) as usize;
        }
        let mask = if r == 0 { 0 } else { u64::MAX >> (64 - r) };
        (self.cumulative[w] + (self.words[w] & mask).count_ones()) as usize
    }

    pub fn count_ones(&self) -> usize {
        self.rank1(self.len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_matches_prefix_count() {
        let bits: Vec<bool> = (0..200).map(|i| i % 3 == 0 || i % 7 == 0).collect();
        let bv = RankBitVec::from_bits(bits.iter().copied());
        assert_eq!(bv.len(), 200);
        for i in 0..=200 {
            let expected = bits[..i].iter().filter(|&&b| b).count();
            assert_eq!(bv.rank1(i), expected, "i={}", i);
        }
        for (i, &b) in bits.iter().enumerate() {
            assert_eq!(bv.get(i), b);
        }
    }

    #[test]
    fn exact_word_boundary() {
        let bv = RankBitVec::from_bits(std::iter::repeat(true).take(128));
        assert_eq!(bv.rank1(64), 64);
        assert_eq!(bv.rank1(128), 128);
        assert_eq!(bv.count_ones(), 128);
    }
}
