//! # humdum
//!
//! 双端短 read 比对器：FM 索引 + 带状仿射间隙 Smith-Waterman，输出 SAM，并附带 QC 报告。
//!
//! 三个部分：
//!
//! - **索引构建**：FASTA 参考序列拼接为 `$` 分隔的文本，构建后缀数组、BWT 与 FM 索引
//! - **比对**：反向最大精确匹配种子 → 共线链 → 窗口内带状 SW；插入长度模型、mate 救援与配对打分
//! - **QC**：从 SAM 统计覆盖深度、TLEN 与 MAPQ 分布，输出 SVG 图和 summary.json
//!
//! ## 快速示例
//!
//! ```rust,no_run
//! use humdum::index::builder::{build_from_records, IndexOpt};
//! use humdum::io::fasta::FastaRecord;
//! use humdum::util::dna;
//!
//! let rec = FastaRecord { id: "ref".to_string(), desc: None, seq: b"ACGTACGTAGCTGATCGTAG".to_vec() };
//! let fm = build_from_records(&[rec], IndexOpt::default()).unwrap();
//!
//! // 精确匹配搜索
//! let pattern = dna::encode_seq(b"GCTGATC");
//! if let Some((l, r)) = fm.backward_search(&pattern) {
//!     let positions = fm.locate_interval(l, r, 10);
//!     println!("Found {} occurrences", positions.len());
//! }
//! ```
//!
//! ## 模块说明
//!
//! - [`io`]：FASTA / FASTQ / SAM 读写
//! - [`index`]：FM 索引构建（后缀数组、BWT、rank 位向量、FM 索引）
//! - [`align`]：种子、链、Smith-Waterman、插入长度、配对与批处理流水线
//! - [`qc`]：覆盖度、TLEN、MAPQ 统计与作图
//! - [`util`]：DNA 编码与 CIGAR

pub mod align;
pub mod index;
pub mod io;
pub mod qc;
pub mod util;
