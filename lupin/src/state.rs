//! Token assignments together with the statistics derived from them.

use crate::corpus::Corpus;
use crate::sufficient_stats::PamStats;
use rand::Rng;

/// Assignment state: a (super-topic, sub-topic) pair for every token,
/// stored flat in the corpus token order, plus the counts it implies.
///
/// Outside a single `remove_token` -> `add_token` transaction the
/// statistics always equal a recount of the assignments.
#[derive(Debug, Clone)]
pub struct PamState {
    super_topics: Vec<usize>,
    sub_topics: Vec<usize>,
    stats: PamStats,
}

impl PamState {
    /// Assign every token a uniformly random (super, sub) pair, drawing
    /// the super-topic then the sub-topic for each token in corpus order.
    pub fn random_init<R: Rng>(
        corpus: &Corpus,
        num_super_topics: usize,
        num_sub_topics: usize,
        rng: &mut R,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(
            num_super_topics > 0 && num_sub_topics > 0,
            "need at least one super-topic and one sub-topic, got {} and {}",
            num_super_topics,
            num_sub_topics
        );
        let n = corpus.num_tokens();
        let mut super_topics = Vec::with_capacity(n);
        let mut sub_topics = Vec::with_capacity(n);
        for _ in 0..n {
            super_topics.push(rng.random_range(0..num_super_topics));
            sub_topics.push(rng.random_range(0..num_sub_topics));
        }
        let stats = Self::count(
            corpus,
            num_super_topics,
            num_sub_topics,
            &super_topics,
            &sub_topics,
        );
        Ok(PamState {
            super_topics,
            sub_topics,
            stats,
        })
    }

    /// Start from given assignments (flat, in corpus token order)
    pub fn from_assignments(
        corpus: &Corpus,
        num_super_topics: usize,
        num_sub_topics: usize,
        super_topics: Vec<usize>,
        sub_topics: Vec<usize>,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(
            super_topics.len() == corpus.num_tokens() && sub_topics.len() == corpus.num_tokens(),
            "expected {} assignments, got {} super and {} sub",
            corpus.num_tokens(),
            super_topics.len(),
            sub_topics.len()
        );
        anyhow::ensure!(
            super_topics.iter().all(|&s| s < num_super_topics)
                && sub_topics.iter().all(|&k| k < num_sub_topics),
            "assignment out of range"
        );
        let stats = Self::count(
            corpus,
            num_super_topics,
            num_sub_topics,
            &super_topics,
            &sub_topics,
        );
        Ok(PamState {
            super_topics,
            sub_topics,
            stats,
        })
    }

    fn count(
        corpus: &Corpus,
        num_super_topics: usize,
        num_sub_topics: usize,
        super_topics: &[usize],
        sub_topics: &[usize],
    ) -> PamStats {
        let mut stats = PamStats::new(
            corpus.num_docs(),
            num_super_topics,
            num_sub_topics,
            corpus.vocab_size(),
        );
        for d in 0..corpus.num_docs() {
            let offset = corpus.doc_offset(d);
            for (i, &w) in corpus.doc(d).iter().enumerate() {
                stats.increment(d, w, super_topics[offset + i], sub_topics[offset + i]);
            }
        }
        stats
    }

    /// Take the token at (`doc`, `pos`) out of the statistics and
    /// return its current (super, sub) assignment.
    #[inline]
    pub fn remove_token(
        &mut self,
        corpus: &Corpus,
        doc: usize,
        pos: usize,
    ) -> anyhow::Result<(usize, usize)> {
        let t = corpus.doc_offset(doc) + pos;
        let (s, k) = (self.super_topics[t], self.sub_topics[t]);
        self.stats.decrement(doc, corpus.word_type(doc, pos), s, k)?;
        Ok((s, k))
    }

    /// Assign the token at (`doc`, `pos`) to (`s`, `k`) and count it.
    /// Must follow `remove_token` on the same token.
    #[inline]
    pub fn add_token(&mut self, corpus: &Corpus, doc: usize, pos: usize, s: usize, k: usize) {
        let t = corpus.doc_offset(doc) + pos;
        self.super_topics[t] = s;
        self.sub_topics[t] = k;
        self.stats.increment(doc, corpus.word_type(doc, pos), s, k);
    }

    /// Current (super, sub) assignment of the token at (`doc`, `pos`)
    #[inline]
    pub fn assignment(&self, corpus: &Corpus, doc: usize, pos: usize) -> (usize, usize) {
        let t = corpus.doc_offset(doc) + pos;
        (self.super_topics[t], self.sub_topics[t])
    }

    pub fn stats(&self) -> &PamStats {
        &self.stats
    }

    pub fn super_topics(&self) -> &[usize] {
        &self.super_topics
    }

    pub fn sub_topics(&self) -> &[usize] {
        &self.sub_topics
    }

    /// Verify that the statistics equal a recount of the assignments
    /// and that all marginals agree.
    pub fn check_consistency(&self, corpus: &Corpus) -> anyhow::Result<()> {
        let fresh = Self::count(
            corpus,
            self.stats.num_super_topics,
            self.stats.num_sub_topics,
            &self.super_topics,
            &self.sub_topics,
        );
        if let Some(name) = self.stats.first_mismatch(&fresh) {
            anyhow::bail!("{} out of sync with token assignments", name);
        }
        let lengths: Vec<usize> = (0..corpus.num_docs()).map(|d| corpus.doc_len(d)).collect();
        self.stats.check_marginals(&lengths)
    }
}
