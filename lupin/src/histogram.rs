//! Per-sweep count histograms feeding the sub-topic prior update.
//!
//! `super_hist[s][n]` counts documents holding exactly `n` tokens under
//! super-topic s; `sub_hist[s][k][n]` counts documents holding exactly
//! `n` tokens under the pair (s, k). Buckets run over `0..=max_doc_len`.

use crate::sufficient_stats::PamStats;

#[derive(Debug, Clone)]
pub struct TopicHistograms {
    num_super_topics: usize,
    num_sub_topics: usize,
    num_buckets: usize,
    /// S x B: `super_hist[s * B + n]`
    super_hist: Vec<usize>,
    /// S x K x B: `sub_hist[(s * K + k) * B + n]`
    sub_hist: Vec<usize>,
}

impl TopicHistograms {
    /// * `max_doc_len` - length of the longest document in the corpus
    pub fn new(num_super_topics: usize, num_sub_topics: usize, max_doc_len: usize) -> Self {
        let num_buckets = max_doc_len + 1;
        TopicHistograms {
            num_super_topics,
            num_sub_topics,
            num_buckets,
            super_hist: vec![0; num_super_topics * num_buckets],
            sub_hist: vec![0; num_super_topics * num_sub_topics * num_buckets],
        }
    }

    pub fn reset(&mut self) {
        self.super_hist.fill(0);
        self.sub_hist.fill(0);
    }

    /// Reset, then tally every document of the state just produced
    pub fn collect(&mut self, stats: &PamStats) {
        self.reset();
        for d in 0..stats.num_docs {
            self.add_document(stats, d);
        }
    }

    /// Tally the counts of one document
    pub fn add_document(&mut self, stats: &PamStats, doc: usize) {
        let bb = self.num_buckets;
        let kk = self.num_sub_topics;
        let super_counts = stats.super_counts(doc);
        for s in 0..self.num_super_topics {
            self.super_hist[s * bb + super_counts[s]] += 1;
            for (k, &n) in stats.super_sub_counts(doc, s).iter().enumerate() {
                self.sub_hist[(s * kk + k) * bb + n] += 1;
            }
        }
    }

    pub fn num_buckets(&self) -> usize {
        self.num_buckets
    }

    /// Document-length histogram under super-topic `s`
    pub fn super_histogram(&self, s: usize) -> &[usize] {
        let bb = self.num_buckets;
        &self.super_hist[s * bb..(s + 1) * bb]
    }

    /// Count histogram of the pair (`s`, `k`)
    pub fn sub_histogram(&self, s: usize, k: usize) -> &[usize] {
        let bb = self.num_buckets;
        let start = (s * self.num_sub_topics + k) * bb;
        &self.sub_hist[start..start + bb]
    }

    /// All sub-topic histograms under super-topic `s`
    pub fn sub_histograms(&self, s: usize) -> Vec<&[usize]> {
        (0..self.num_sub_topics)
            .map(|k| self.sub_histogram(s, k))
            .collect()
    }
}
