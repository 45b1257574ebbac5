//! Collapsed Gibbs sampler for the two-level Pachinko allocation model.
//!
//! For each token, removes it from the statistics, builds the
//! conditional weight of every (super-topic, sub-topic) pair, draws a
//! pair, and puts the token back:
//!
//! ```text
//! super(s)   = (n_ds + alpha_s) / (n_ds + sum_k subalpha_sk)
//! sub(k)     = (n_wk + beta) / (n_k + V * beta)
//! joint(s,k) = super(s) * sub(k) * (n_dsk + subalpha_sk)
//! ```
//!
//! Documents and tokens are visited strictly in order; every draw sees
//! the statistics left by all earlier draws in the sweep.

use crate::corpus::Corpus;
use crate::priors::PamPriors;
use crate::state::PamState;
use crate::sufficient_stats::PamStats;
use rand::Rng;

/// Collapsed Gibbs sampler with scratch space sized for S x K pairs.
pub struct PamGibbsSampler {
    num_super_topics: usize,
    num_sub_topics: usize,
    /// Word-dependent factor per sub-topic
    sub_weights: Vec<f64>,
    /// S x K unnormalized conditional weights, row-major
    joint_weights: Vec<f64>,
    /// Cumulative row sums of `joint_weights`
    cum_super: Vec<f64>,
}

impl PamGibbsSampler {
    pub fn new(num_super_topics: usize, num_sub_topics: usize) -> Self {
        PamGibbsSampler {
            num_super_topics,
            num_sub_topics,
            sub_weights: vec![0.0; num_sub_topics],
            joint_weights: vec![0.0; num_super_topics * num_sub_topics],
            cum_super: vec![0.0; num_super_topics],
        }
    }

    /// Resample every token of every document once.
    ///
    /// Returns the number of tokens whose (super, sub) pair changed.
    ///
    /// * `corpus` - tokenized documents
    /// * `state` - assignments and statistics (modified in place)
    /// * `priors` - hyperparameters, read-only for the whole sweep
    /// * `rng` - the run's single random source
    pub fn sweep<R: Rng>(
        &mut self,
        corpus: &Corpus,
        state: &mut PamState,
        priors: &PamPriors,
        rng: &mut R,
    ) -> anyhow::Result<usize> {
        let mut moves = 0;
        for doc in 0..corpus.num_docs() {
            for pos in 0..corpus.doc_len(doc) {
                if self.resample_token(corpus, state, priors, doc, pos, rng)? {
                    moves += 1;
                }
            }
        }
        Ok(moves)
    }

    /// Remove the token at (`doc`, `pos`), draw a new (super, sub)
    /// pair from its conditional, and add it back. Returns whether the
    /// pair changed.
    pub fn resample_token<R: Rng>(
        &mut self,
        corpus: &Corpus,
        state: &mut PamState,
        priors: &PamPriors,
        doc: usize,
        pos: usize,
        rng: &mut R,
    ) -> anyhow::Result<bool> {
        let old = state.remove_token(corpus, doc, pos)?;
        let word_type = corpus.word_type(doc, pos);

        let total = self.fill_conditional(state.stats(), priors, doc, word_type);
        if !(total.is_finite() && total > 0.0) {
            anyhow::bail!(
                "invalid conditional weight total {} at document {}, token {}",
                total,
                doc,
                pos
            );
        }

        let u = rng.random::<f64>() * total;
        let (s, k) = select_super_sub(&self.joint_weights, &self.cum_super, self.num_sub_topics, u);

        state.add_token(corpus, doc, pos, s, k);
        Ok((s, k) != old)
    }

    /// Fill the joint weights of every (super, sub) pair for one token
    /// of `word_type` in `doc`, with that token already removed from
    /// `stats`. Returns the total weight.
    pub fn fill_conditional(
        &mut self,
        stats: &PamStats,
        priors: &PamPriors,
        doc: usize,
        word_type: usize,
    ) -> f64 {
        let kk = self.num_sub_topics;

        let type_counts = stats.type_sub_counts(word_type);
        let tokens_per_sub = stats.tokens_per_sub();
        for k in 0..kk {
            self.sub_weights[k] =
                (type_counts[k] as f64 + priors.beta) / (tokens_per_sub[k] as f64 + priors.v_beta);
        }

        let super_counts = stats.super_counts(doc);
        let mut cumulative = 0.0;
        for s in 0..self.num_super_topics {
            let n_ds = super_counts[s] as f64;
            let super_weight = (n_ds + priors.alpha[s]) / (n_ds + priors.sub_alpha_sums[s]);

            let sub_counts = stats.super_sub_counts(doc, s);
            let sub_alphas = priors.sub_alphas(s);
            let row = &mut self.joint_weights[s * kk..(s + 1) * kk];

            let mut row_sum = 0.0;
            for k in 0..kk {
                row[k] = super_weight * self.sub_weights[k] * (sub_counts[k] as f64 + sub_alphas[k]);
                row_sum += row[k];
            }
            cumulative += row_sum;
            self.cum_super[s] = cumulative;
        }
        cumulative
    }

    /// S x K weights from the last `fill_conditional`
    pub fn joint_weights(&self) -> &[f64] {
        &self.joint_weights
    }

    /// Cumulative super-topic weights from the last `fill_conditional`
    pub fn cum_super(&self) -> &[f64] {
        &self.cum_super
    }
}

/// Pick a (super, sub) pair for a uniform draw `u` in `[0, total)`.
///
/// The super-topic is the first index whose cumulative weight reaches
/// `u`. Within it, sub-topic weights are peeled off the cumulative
/// total starting from sub-topic 0; the first sub-topic whose removal
/// drops the running total to `u` or below is chosen. Sub-topic k of
/// super-topic s therefore owns the interval
/// `(cum[s] - w[s][0..=k], cum[s] - w[s][0..k]]`, of width `w[s][k]`.
///
/// * `joint` - S x K weights, row-major
/// * `cum_super` - cumulative row sums of `joint`
/// * `num_sub` - K
/// * `u` - uniform draw scaled by the total weight
pub fn select_super_sub(joint: &[f64], cum_super: &[f64], num_sub: usize, u: f64) -> (usize, usize) {
    let last = cum_super.len() - 1;
    let s = cum_super
        .iter()
        .position(|&c| c >= u && c > 0.0)
        .unwrap_or(last);

    let row = &joint[s * num_sub..(s + 1) * num_sub];
    let mut running = cum_super[s];
    let mut last_positive = num_sub - 1;
    for (k, &w) in row.iter().enumerate() {
        if w <= 0.0 {
            continue;
        }
        running -= w;
        if running <= u {
            return (s, k);
        }
        last_positive = k;
    }
    // rounding left the running total a hair above u
    (s, last_positive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Vocabulary;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn cumsum(weights: &[f64], num_sub: usize) -> Vec<f64> {
        let mut acc = 0.0;
        weights
            .chunks(num_sub)
            .map(|row| {
                acc += row.iter().sum::<f64>();
                acc
            })
            .collect()
    }

    #[test]
    fn test_select_boundaries() {
        // S = 2, K = 3
        let joint = vec![1.0, 2.0, 1.0, 0.5, 0.0, 1.5];
        let cum = cumsum(&joint, 3);
        assert_eq!(cum, vec![4.0, 6.0]);

        // super 0 spans [0, 4]: sub 0 owns (3, 4], sub 1 owns (1, 3], sub 2 owns [0, 1]
        assert_eq!(select_super_sub(&joint, &cum, 3, 0.0), (0, 2));
        assert_eq!(select_super_sub(&joint, &cum, 3, 0.5), (0, 2));
        assert_eq!(select_super_sub(&joint, &cum, 3, 1.5), (0, 1));
        assert_eq!(select_super_sub(&joint, &cum, 3, 3.5), (0, 0));
        assert_eq!(select_super_sub(&joint, &cum, 3, 4.0), (0, 0));

        // super 1 spans (4, 6]: sub 0 owns (5.5, 6], sub 1 is empty, sub 2 owns (4, 5.5]
        assert_eq!(select_super_sub(&joint, &cum, 3, 4.2), (1, 2));
        assert_eq!(select_super_sub(&joint, &cum, 3, 5.9), (1, 0));

        // past the end falls back to the last super-topic
        assert_eq!(select_super_sub(&joint, &cum, 3, 6.5), (1, 0));
    }

    #[test]
    fn test_zero_rows_never_selected() {
        let joint = vec![0.0, 0.0, 2.0, 1.0];
        let cum = cumsum(&joint, 2);
        assert_eq!(select_super_sub(&joint, &cum, 2, 0.0), (1, 1));
        assert_eq!(select_super_sub(&joint, &cum, 2, 2.5), (1, 0));
    }

    #[test]
    fn test_selection_frequencies_match_weights() {
        let joint = vec![0.3, 1.2, 0.5, 2.0, 0.25, 0.75];
        let num_sub = 2;
        let cum = cumsum(&joint, num_sub);
        let total = *cum.last().unwrap();

        let mut rng = SmallRng::seed_from_u64(42);
        let n = 200_000;
        let mut freq = vec![0usize; joint.len()];
        for _ in 0..n {
            let u = rng.random::<f64>() * total;
            let (s, k) = select_super_sub(&joint, &cum, num_sub, u);
            freq[s * num_sub + k] += 1;
        }

        for (i, &w) in joint.iter().enumerate() {
            let expected = w / total;
            let observed = freq[i] as f64 / n as f64;
            assert!(
                (observed - expected).abs() < 0.01,
                "pair {}: observed {} expected {}",
                i,
                observed,
                expected
            );
        }
    }

    #[test]
    fn test_conditional_weights_by_hand() {
        // one document [0, 1, 1], V = 2, S = 2, K = 2
        let corpus =
            Corpus::from_documents(&[vec![0, 1, 1]], Vocabulary::anonymous(2).unwrap()).unwrap();
        let mut state =
            PamState::from_assignments(&corpus, 2, 2, vec![0, 1, 1], vec![0, 1, 0]).unwrap();
        let priors = PamPriors::new(2, 2, 2.0, 0.5, 0.1, 2);

        let mut sampler = PamGibbsSampler::new(2, 2);
        state.remove_token(&corpus, 0, 2).unwrap();
        let total = sampler.fill_conditional(state.stats(), &priors, 0, 1);

        // remaining: token 0 (type 0) at (0, 0), token 1 (type 1) at (1, 1)
        let sub = [(0.0 + 0.1) / (1.0 + 0.2), (1.0 + 0.1) / (1.0 + 0.2)];
        let sup = [(1.0 + 1.0) / (1.0 + 1.0), (1.0 + 1.0) / (1.0 + 1.0)];
        let expected = [
            sup[0] * sub[0] * (1.0 + 0.5),
            sup[0] * sub[1] * (0.0 + 0.5),
            sup[1] * sub[0] * (0.0 + 0.5),
            sup[1] * sub[1] * (1.0 + 0.5),
        ];

        for (a, b) in sampler.joint_weights().iter().zip(expected.iter()) {
            approx::assert_abs_diff_eq!(*a, *b, epsilon = 1e-12);
        }
        approx::assert_abs_diff_eq!(total, expected.iter().sum::<f64>(), epsilon = 1e-12);
        approx::assert_abs_diff_eq!(
            sampler.cum_super()[0],
            expected[0] + expected[1],
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_sweep_keeps_statistics_consistent() {
        let docs = vec![vec![0, 1, 2, 2, 3], vec![3, 3, 1], vec![0, 0, 0, 4, 4, 2]];
        let corpus = Corpus::from_documents(&docs, Vocabulary::anonymous(5).unwrap()).unwrap();
        let priors = PamPriors::new(3, 4, 5.0, 1.0, 0.01, corpus.vocab_size());

        let mut rng = SmallRng::seed_from_u64(1);
        let mut state = PamState::random_init(&corpus, 3, 4, &mut rng).unwrap();
        let mut sampler = PamGibbsSampler::new(3, 4);

        for _ in 0..20 {
            sampler.sweep(&corpus, &mut state, &priors, &mut rng).unwrap();
            state.check_consistency(&corpus).unwrap();
            assert_eq!(state.stats().total_tokens(), corpus.num_tokens());
        }
    }
}
