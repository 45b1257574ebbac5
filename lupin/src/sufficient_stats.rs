//! Count statistics for the Pachinko allocation sampler.
//!
//! Tracks per-document super/sub counts, the word-type x sub-topic
//! counts, and the corpus-wide marginals. Every array is a flat buffer
//! indexed by computed offsets and is derivable by summation from the
//! token assignments.
//!
//! Supports O(1) incremental updates when a single token is removed or
//! re-inserted (Gibbs step), plus full recomputation for verification.

/// Sufficient statistics for the two-level model.
///
/// Super-topic indices are in `0..num_super_topics` (S), sub-topic
/// indices in `0..num_sub_topics` (K), word types in `0..num_types` (V).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PamStats {
    pub num_docs: usize,
    pub num_super_topics: usize,
    pub num_sub_topics: usize,
    pub num_types: usize,
    /// D x S x K: `super_sub_counts[(d * S + s) * K + k]`
    super_sub_counts: Vec<usize>,
    /// D x S: `super_counts[d * S + s]`
    super_counts: Vec<usize>,
    /// V x K: `type_sub_counts[w * K + k]`
    type_sub_counts: Vec<usize>,
    tokens_per_sub: Vec<usize>,
    tokens_per_super: Vec<usize>,
    /// S x K: `tokens_per_super_sub[s * K + k]`
    tokens_per_super_sub: Vec<usize>,
}

#[inline]
fn decrement(count: &mut usize, name: &str) -> anyhow::Result<()> {
    *count = count
        .checked_sub(1)
        .ok_or_else(|| anyhow::anyhow!("{} would go negative", name))?;
    Ok(())
}

impl PamStats {
    /// All-zero statistics
    pub fn new(
        num_docs: usize,
        num_super_topics: usize,
        num_sub_topics: usize,
        num_types: usize,
    ) -> Self {
        let ss = num_super_topics;
        let kk = num_sub_topics;
        PamStats {
            num_docs,
            num_super_topics,
            num_sub_topics,
            num_types,
            super_sub_counts: vec![0; num_docs * ss * kk],
            super_counts: vec![0; num_docs * ss],
            type_sub_counts: vec![0; num_types * kk],
            tokens_per_sub: vec![0; kk],
            tokens_per_super: vec![0; ss],
            tokens_per_super_sub: vec![0; ss * kk],
        }
    }

    /// Count one token of `word_type` in `doc` at (`s`, `k`)
    #[inline]
    pub fn increment(&mut self, doc: usize, word_type: usize, s: usize, k: usize) {
        let ss = self.num_super_topics;
        let kk = self.num_sub_topics;
        self.super_sub_counts[(doc * ss + s) * kk + k] += 1;
        self.super_counts[doc * ss + s] += 1;
        self.type_sub_counts[word_type * kk + k] += 1;
        self.tokens_per_sub[k] += 1;
        self.tokens_per_super[s] += 1;
        self.tokens_per_super_sub[s * kk + k] += 1;
    }

    /// Discount one token of `word_type` in `doc` at (`s`, `k`).
    ///
    /// The token must currently be counted there. A count that would
    /// go below zero means the statistics are out of sync with the
    /// assignments; that is an error and the statistics are left
    /// partly updated.
    #[inline]
    pub fn decrement(
        &mut self,
        doc: usize,
        word_type: usize,
        s: usize,
        k: usize,
    ) -> anyhow::Result<()> {
        let ss = self.num_super_topics;
        let kk = self.num_sub_topics;
        decrement(&mut self.super_sub_counts[(doc * ss + s) * kk + k], "super_sub_counts")?;
        decrement(&mut self.super_counts[doc * ss + s], "super_counts")?;
        decrement(&mut self.type_sub_counts[word_type * kk + k], "type_sub_counts")?;
        decrement(&mut self.tokens_per_sub[k], "tokens_per_sub")?;
        decrement(&mut self.tokens_per_super[s], "tokens_per_super")?;
        decrement(&mut self.tokens_per_super_sub[s * kk + k], "tokens_per_super_sub")?;
        Ok(())
    }

    /// Tokens of `doc` under each super-topic (length S)
    #[inline]
    pub fn super_counts(&self, doc: usize) -> &[usize] {
        let ss = self.num_super_topics;
        &self.super_counts[doc * ss..(doc + 1) * ss]
    }

    /// Tokens of `doc` under super-topic `s`, split by sub-topic (length K)
    #[inline]
    pub fn super_sub_counts(&self, doc: usize, s: usize) -> &[usize] {
        let kk = self.num_sub_topics;
        let start = (doc * self.num_super_topics + s) * kk;
        &self.super_sub_counts[start..start + kk]
    }

    /// Tokens of `doc` under all (super, sub) pairs (length S * K)
    #[inline]
    pub fn doc_super_sub_counts(&self, doc: usize) -> &[usize] {
        let n = self.num_super_topics * self.num_sub_topics;
        &self.super_sub_counts[doc * n..(doc + 1) * n]
    }

    /// Corpus-wide sub-topic counts of `word_type` (length K)
    #[inline]
    pub fn type_sub_counts(&self, word_type: usize) -> &[usize] {
        let kk = self.num_sub_topics;
        &self.type_sub_counts[word_type * kk..(word_type + 1) * kk]
    }

    #[inline]
    pub fn tokens_per_sub(&self) -> &[usize] {
        &self.tokens_per_sub
    }

    #[inline]
    pub fn tokens_per_super(&self) -> &[usize] {
        &self.tokens_per_super
    }

    /// Corpus-wide sub-topic counts under super-topic `s` (length K)
    #[inline]
    pub fn tokens_per_super_sub(&self, s: usize) -> &[usize] {
        let kk = self.num_sub_topics;
        &self.tokens_per_super_sub[s * kk..(s + 1) * kk]
    }

    /// Tokens of `doc` with sub-topic `k`, summed over super-topics
    pub fn doc_sub_count(&self, doc: usize, k: usize) -> usize {
        (0..self.num_super_topics)
            .map(|s| self.super_sub_counts(doc, s)[k])
            .sum()
    }

    /// Total number of tokens counted
    pub fn total_tokens(&self) -> usize {
        self.tokens_per_sub.iter().sum()
    }

    /// Verify that every marginal equals the sum of the finer counts it
    /// summarizes, and that each document holds `doc_lengths[d]` tokens.
    pub fn check_marginals(&self, doc_lengths: &[usize]) -> anyhow::Result<()> {
        let ss = self.num_super_topics;
        let kk = self.num_sub_topics;
        anyhow::ensure!(
            doc_lengths.len() == self.num_docs,
            "{} document lengths for {} documents",
            doc_lengths.len(),
            self.num_docs
        );

        for (d, &len) in doc_lengths.iter().enumerate() {
            for s in 0..ss {
                let sum: usize = self.super_sub_counts(d, s).iter().sum();
                anyhow::ensure!(
                    sum == self.super_counts(d)[s],
                    "document {}, super-topic {}: sub-topic counts sum to {} but super count is {}",
                    d,
                    s,
                    sum,
                    self.super_counts(d)[s]
                );
            }
            let sum: usize = self.super_counts(d).iter().sum();
            anyhow::ensure!(
                sum == len,
                "document {}: super counts sum to {} but it has {} tokens",
                d,
                sum,
                len
            );
        }

        for k in 0..kk {
            let by_type: usize = (0..self.num_types)
                .map(|w| self.type_sub_counts(w)[k])
                .sum();
            let by_super: usize = (0..ss).map(|s| self.tokens_per_super_sub(s)[k]).sum();
            anyhow::ensure!(
                by_type == self.tokens_per_sub[k] && by_super == self.tokens_per_sub[k],
                "sub-topic {}: {} tokens by type, {} by super-topic, {} recorded",
                k,
                by_type,
                by_super,
                self.tokens_per_sub[k]
            );
        }

        for s in 0..ss {
            let by_doc: usize = (0..self.num_docs).map(|d| self.super_counts(d)[s]).sum();
            let by_sub: usize = self.tokens_per_super_sub(s).iter().sum();
            anyhow::ensure!(
                by_doc == self.tokens_per_super[s] && by_sub == self.tokens_per_super[s],
                "super-topic {}: {} tokens by document, {} by sub-topic, {} recorded",
                s,
                by_doc,
                by_sub,
                self.tokens_per_super[s]
            );
        }

        Ok(())
    }

    /// Name the first count array that differs from `other`
    pub fn first_mismatch(&self, other: &PamStats) -> Option<&'static str> {
        if self.super_sub_counts != other.super_sub_counts {
            Some("super_sub_counts")
        } else if self.super_counts != other.super_counts {
            Some("super_counts")
        } else if self.type_sub_counts != other.type_sub_counts {
            Some("type_sub_counts")
        } else if self.tokens_per_sub != other.tokens_per_sub {
            Some("tokens_per_sub")
        } else if self.tokens_per_super != other.tokens_per_super {
            Some("tokens_per_super")
        } else if self.tokens_per_super_sub != other.tokens_per_super_sub {
            Some("tokens_per_super_sub")
        } else {
            None
        }
    }
}
