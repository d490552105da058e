//! Mate pairing: rescue, candidate scoring and SAM record assembly.

use crate::index::fm::Contig;
use crate::io::fastq::FastqRecord;
use crate::io::sam::{flags, SamRecord};
use crate::util::dna;

use super::insert::InsertSizeModel;
use super::mapq::{combine_pair_mapq, mapq_from_scores, pair_mapq};
use super::sw::SwBuffer;
use super::{finalize_hits, Aligner, AlignOpt, Hit};

/// FR 插入长度：同一 contig、方向相反、正链 mate 不在反链 mate 右侧
pub fn fr_insert(a: &Hit, b: &Hit) -> Option<u32> {
    if a.contig != b.contig || a.rev == b.rev {
        return None;
    }
    let (fwd, rev) = if a.rev { (b, a) } else { (a, b) };
    if fwd.ref_start > rev.ref_start || rev.ref_end <= fwd.ref_start {
        return None;
    }
    Some(rev.ref_end - fwd.ref_start)
}

/// 每个 mate 最终选中的比对
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairChoice {
    pub hits: [Option<Hit>; 2],
    pub mapq: [u8; 2],
    /// 次优比对得分，输出为 XS
    pub sub_scores: [Option<i32>; 2],
    pub proper: bool,
}

fn single_end(hits: &[Hit], chosen: usize) -> (u8, Option<i32>) {
    let sub = hits
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != chosen)
        .map(|(_, h)| h.score)
        .max();
    (mapq_from_scores(hits[chosen].score, sub.unwrap_or(0)), sub)
}

/// 枚举两端候选比对的所有组合：proper 组合加插入长度似然，其余扣 `unpaired_penalty`
pub fn choose_pair(h1: &[Hit], h2: &[Hit], model: &InsertSizeModel, opt: &AlignOpt) -> PairChoice {
    let mut choice = PairChoice::default();
    if h1.is_empty() || h2.is_empty() {
        for (slot, hits) in [h1, h2].into_iter().enumerate() {
            if !hits.is_empty() {
                let (q, sub) = single_end(hits, 0);
                choice.hits[slot] = Some(hits[0].clone());
                choice.mapq[slot] = q;
                choice.sub_scores[slot] = sub;
            }
        }
        return choice;
    }

    let mut best: Option<(i32, usize, usize, bool)> = None;
    let mut second: Option<i32> = None;
    for (i, a) in h1.iter().enumerate() {
        for (j, b) in h2.iter().enumerate() {
            let (score, proper) = match fr_insert(a, b) {
                Some(ins) if model.is_proper(ins) => {
                    (a.score + b.score + model.log_likelihood(ins, opt.match_score), true)
                }
                _ => (a.score + b.score - opt.unpaired_penalty, false),
            };
            match best {
                Some((bs, ..)) if score <= bs => {
                    second = Some(second.map_or(score, |s| s.max(score)));
                }
                prev => {
                    if let Some((bs, ..)) = prev {
                        second = Some(second.map_or(bs, |s| s.max(bs)));
                    }
                    best = Some((score, i, j, proper));
                }
            }
        }
    }

    // 两个列表都非空，best 必然存在
    let Some((score, i, j, proper)) = best else {
        return choice;
    };
    let (mut q1, sub1) = single_end(h1, i);
    let (mut q2, sub2) = single_end(h2, j);
    if proper {
        let pq = pair_mapq(score, second, opt.match_score);
        q1 = combine_pair_mapq(q1, pq);
        q2 = combine_pair_mapq(q2, pq);
    }
    PairChoice {
        hits: [Some(h1[i].clone()), Some(h2[j].clone())],
        mapq: [q1, q2],
        sub_scores: [sub1, sub2],
        proper,
    }
}

/// 对前 `max_rescue` 个锚点，若另一端没有与之成对的比对，则在预测窗口内救援。
/// 返回救援得到并加入 `mate_hits` 的比对。
pub fn rescue_mates(
    aligner: &Aligner<'_>,
    anchors: &[Hit],
    mate_seq: &[u8],
    mate_hits: &mut Vec<Hit>,
    model: &InsertSizeModel,
    buf: &mut SwBuffer,
) -> Vec<Hit> {
    let opt = aligner.opt();
    let mut rescued = Vec::new();
    for anchor in anchors.iter().take(opt.max_rescue) {
        let paired = mate_hits
            .iter()
            .any(|m| fr_insert(anchor, m).map_or(false, |ins| model.is_proper(ins)));
        if paired {
            continue;
        }
        if let Some(hit) = aligner.rescue_mate(anchor, mate_seq, model, buf) {
            if mate_hits.iter().all(|m| !hit.is_redundant_with(m)) {
                mate_hits.push(hit.clone());
                rescued.push(hit);
            }
        }
    }
    if !rescued.is_empty() {
        let hits = std::mem::take(mate_hits);
        *mate_hits = finalize_hits(hits, opt.max_hits.max(1) + rescued.len());
    }
    rescued
}

/// 最终配对里有几个 mate 来自救援
pub fn chosen_rescues(choice: &PairChoice, rescued: [&[Hit]; 2]) -> usize {
    choice
        .hits
        .iter()
        .zip(rescued)
        .filter(|&(h, r)| matches!(h, Some(h) if r.contains(h)))
        .count()
}

fn signed_tlen(own: &Hit, mate: &Hit, first: bool) -> i64 {
    if own.contig != mate.contig {
        return 0;
    }
    let left = own.ref_start.min(mate.ref_start);
    let right = own.ref_end.max(mate.ref_end);
    let len = i64::from(right - left);
    let leftmost = own.ref_start < mate.ref_start || (own.ref_start == mate.ref_start && first);
    if leftmost {
        len
    } else {
        -len
    }
}

/// 生成两条 SAM 记录，顺序为 read1、read2
pub fn build_records(
    reads: [&FastqRecord; 2],
    choice: &PairChoice,
    contigs: &[Contig],
    classic_cigar: bool,
) -> [SamRecord; 2] {
    let mut out: [SamRecord; 2] = [0usize, 1].map(|slot| {
        let read = reads[slot];
        let mut rec = SamRecord::unmapped(read.template_name(), &read.seq, &read.qual);
        rec.flag = flags::PAIRED | if slot == 0 { flags::FIRST_IN_PAIR } else { flags::SECOND_IN_PAIR };
        rec
    });

    for slot in 0..2 {
        let own = choice.hits[slot].as_ref();
        let mate = choice.hits[1 - slot].as_ref();
        let rec = &mut out[slot];

        match own {
            Some(h) => {
                rec.rname = contigs[h.contig].name.clone();
                rec.pos = h.ref_start + 1;
                rec.mapq = choice.mapq[slot];
                rec.cigar = if classic_cigar { h.cigar.to_classic() } else { h.cigar.clone() };
                if h.rev {
                    rec.flag |= flags::REVERSE;
                    rec.seq = dna::revcomp(&rec.seq);
                    rec.qual.reverse();
                }
                rec.tags.push(format!("NM:i:{}", h.nm));
                rec.tags.push(format!("AS:i:{}", h.score));
                if let Some(xs) = choice.sub_scores[slot] {
                    rec.tags.push(format!("XS:i:{}", xs));
                }
            }
            None => {
                rec.flag |= flags::UNMAPPED;
                // 未比对的一端放在 mate 的位置上
                if let Some(m) = mate {
                    rec.rname = contigs[m.contig].name.clone();
                    rec.pos = m.ref_start + 1;
                }
            }
        }

        match (own, mate) {
            (_, Some(m)) => {
                if m.rev {
                    rec.flag |= flags::MATE_REVERSE;
                }
                let mate_name = &contigs[m.contig].name;
                rec.rnext = if *mate_name == rec.rname { "=".to_string() } else { mate_name.clone() };
                rec.pnext = m.ref_start + 1;
                if let Some(h) = own {
                    rec.tlen = signed_tlen(h, m, slot == 0);
                }
            }
            (Some(h), None) => {
                rec.flag |= flags::MATE_UNMAPPED;
                rec.rnext = "=".to_string();
                rec.pnext = h.ref_start + 1;
            }
            (None, None) => rec.flag |= flags::MATE_UNMAPPED,
        }

        if choice.proper && own.is_some() && mate.is_some() {
            rec.flag |= flags::PROPER_PAIR;
        }
    }
    out
}
