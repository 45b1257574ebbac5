//! Read-only views of a fitted state: topic proportions, weight
//! matrices, and top-gene summaries.

use crate::corpus::{Corpus, Vocabulary};
use crate::priors::PamPriors;
use crate::sufficient_stats::PamStats;
use matrix_util::common_io::write_lines;
use matrix_util::traits::IoOps;
use ndarray::prelude::*;

/// D x S: `superCounts[d][s] / N_d`; rows of empty documents are zero
pub fn super_topic_proportions(corpus: &Corpus, stats: &PamStats) -> Array2<f64> {
    let mut ret = Array2::<f64>::zeros((corpus.num_docs(), stats.num_super_topics));
    for (d, mut row) in ret.axis_iter_mut(Axis(0)).enumerate() {
        let len = corpus.doc_len(d);
        if len == 0 {
            continue;
        }
        for (x, &n) in row.iter_mut().zip(stats.super_counts(d)) {
            *x = n as f64 / len as f64;
        }
    }
    ret
}

/// D x K: sub-topic counts summed over super-topics, divided by `N_d`
pub fn sub_topic_proportions(corpus: &Corpus, stats: &PamStats) -> Array2<f64> {
    let mut ret = Array2::<f64>::zeros((corpus.num_docs(), stats.num_sub_topics));
    for (d, mut row) in ret.axis_iter_mut(Axis(0)).enumerate() {
        let len = corpus.doc_len(d);
        if len == 0 {
            continue;
        }
        for (k, x) in row.iter_mut().enumerate() {
            *x = stats.doc_sub_count(d, k) as f64 / len as f64;
        }
    }
    ret
}

/// S x K: the unnormalized conditional weights `joint_weights` (row-major)
/// left by the sampler's last token step; all zero before any sweep
pub fn super_sub_weights(
    joint_weights: &[f64],
    num_super_topics: usize,
    num_sub_topics: usize,
) -> Array2<f64> {
    let kk = num_sub_topics;
    Array2::from_shape_fn((num_super_topics, kk), |(s, k)| {
        joint_weights.get(s * kk + k).copied().unwrap_or(0.0)
    })
}

/// S x K: corpus-level `tokensPerSuperSub[s][k] + subAlphas[s][k]`
pub fn super_sub_mass(stats: &PamStats, priors: &PamPriors) -> Array2<f64> {
    let ss = stats.num_super_topics;
    let kk = stats.num_sub_topics;
    Array2::from_shape_fn((ss, kk), |(s, k)| {
        stats.tokens_per_super_sub(s)[k] as f64 + priors.sub_alphas(s)[k]
    })
}

/// V x K: `typeSubTopicCounts` as is
pub fn word_sub_topic_counts(stats: &PamStats) -> Array2<usize> {
    Array2::from_shape_fn((stats.num_types, stats.num_sub_topics), |(w, k)| {
        stats.type_sub_counts(w)[k]
    })
}

/// Matrices exported at every checkpoint
pub struct PamExport {
    pub super_topics: Array2<f64>,
    pub sub_topics: Array2<f64>,
    /// last token step's conditional weights
    pub super_sub: Array2<f64>,
    pub super_sub_mass: Array2<f64>,
    pub words: Array2<usize>,
}

impl PamExport {
    /// * `joint_weights` - S x K weights from the sampler's last `fill_conditional`
    pub fn new(
        corpus: &Corpus,
        stats: &PamStats,
        priors: &PamPriors,
        joint_weights: &[f64],
    ) -> Self {
        PamExport {
            super_topics: super_topic_proportions(corpus, stats),
            sub_topics: sub_topic_proportions(corpus, stats),
            super_sub: super_sub_weights(
                joint_weights,
                stats.num_super_topics,
                stats.num_sub_topics,
            ),
            super_sub_mass: super_sub_mass(stats, priors),
            words: word_sub_topic_counts(stats),
        }
    }

    /// Write `{prefix}.super.csv`, `{prefix}.sub.csv`,
    /// `{prefix}.super_sub.csv`, `{prefix}.super_sub_mass.csv` and
    /// `{prefix}.words.csv` (with `.gz` appended if `gzip`)
    pub fn write(&self, prefix: &str, gzip: bool) -> anyhow::Result<()> {
        self.super_topics
            .to_csv(&output_file(prefix, "super.csv", gzip))?;
        self.sub_topics
            .to_csv(&output_file(prefix, "sub.csv", gzip))?;
        self.super_sub
            .to_csv(&output_file(prefix, "super_sub.csv", gzip))?;
        self.super_sub_mass
            .to_csv(&output_file(prefix, "super_sub_mass.csv", gzip))?;
        self.words.to_csv(&output_file(prefix, "words.csv", gzip))?;
        Ok(())
    }
}

/// `{prefix}.{name}`, plus `.gz` if `gzip`
pub fn output_file(prefix: &str, name: &str, gzip: bool) -> String {
    if gzip {
        format!("{}.{}.gz", prefix, name)
    } else {
        format!("{}.{}", prefix, name)
    }
}

/// Genes carrying the most tokens of one sub-topic
#[derive(Debug, Clone)]
pub struct SubTopicGenes {
    pub sub_topic: usize,
    pub total: usize,
    /// (gene name, token count), largest count first
    pub genes: Vec<(Box<str>, usize)>,
}

/// For each sub-topic, the `n` genes with the largest counts.
/// Ties keep vocabulary order; genes with zero count are skipped.
pub fn top_genes(stats: &PamStats, vocab: &Vocabulary, n: usize) -> Vec<SubTopicGenes> {
    (0..stats.num_sub_topics)
        .map(|k| {
            let mut counts: Vec<(usize, usize)> = (0..stats.num_types)
                .map(|w| (w, stats.type_sub_counts(w)[k]))
                .filter(|&(_, c)| c > 0)
                .collect();
            counts.sort_by(|a, b| b.1.cmp(&a.1));
            SubTopicGenes {
                sub_topic: k,
                total: stats.tokens_per_sub()[k],
                genes: counts
                    .into_iter()
                    .take(n)
                    .map(|(w, c)| (vocab.name(w).into(), c))
                    .collect(),
            }
        })
        .collect()
}

/// Human-readable topic summary: per super-topic, its sub-topics
/// ordered by prior weight; then per sub-topic, its top genes.
pub fn topic_summary_lines(
    stats: &PamStats,
    priors: &PamPriors,
    vocab: &Vocabulary,
    n: usize,
) -> Vec<Box<str>> {
    let mut lines: Vec<Box<str>> = vec![];

    for s in 0..priors.num_super_topics {
        let sub_alphas = priors.sub_alphas(s);
        let mut order: Vec<usize> = (0..priors.num_sub_topics).collect();
        order.sort_by(|&a, &b| sub_alphas[b].total_cmp(&sub_alphas[a]));

        let subs = order
            .iter()
            .map(|&k| format!("{}:{:.4}", k, sub_alphas[k]))
            .collect::<Vec<_>>()
            .join(" ");
        lines.push(
            format!(
                "super-topic {}\talpha={:.4}\ttokens={}\t{}",
                s,
                priors.alpha[s],
                stats.tokens_per_super()[s],
                subs
            )
            .into_boxed_str(),
        );
    }

    for topic in top_genes(stats, vocab, n) {
        let genes = topic
            .genes
            .iter()
            .map(|(g, c)| format!("{}({})", g, c))
            .collect::<Vec<_>>()
            .join(" ");
        lines.push(
            format!(
                "sub-topic {}\ttokens={}\t{}",
                topic.sub_topic, topic.total, genes
            )
            .into_boxed_str(),
        );
    }
    lines
}

/// Write `topic_summary_lines` to `file`
pub fn write_topic_summary(
    file: &str,
    stats: &PamStats,
    priors: &PamPriors,
    vocab: &Vocabulary,
    n: usize,
) -> anyhow::Result<()> {
    matrix_util::common_io::mkdir(file)?;
    write_lines(&topic_summary_lines(stats, priors, vocab, n), file)
}
