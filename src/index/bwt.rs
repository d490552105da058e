/// 根据后缀数组构建 BWT：bwt[i] = text[sa[i] - 1]，sa[i] == 0 时循环取末尾字符。
pub fn build_bwt(text: &[u8], sa: &[u32]) -> Vec<u8> {
    let n = text.len();
    sa.iter()
        .map(|&p| match p as usize {
            0 => text[n - 1],
            i => text[i - 1],
        })
        .collect()
}
