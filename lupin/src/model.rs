//! Collapsed log joint probability of the two-level model.
//!
//! ```text
//! ln p(w, z | alpha, subalpha, beta) =
//!   sum_k [ lgamma(V beta) - lgamma(n_k + V beta)
//!           + sum_v (lgamma(n_vk + beta) - lgamma(beta)) ]
//! + sum_d [ lgamma(A) - lgamma(N_d + A)
//!           + sum_s (lgamma(n_ds + alpha_s) - lgamma(alpha_s))
//!           + sum_s (lgamma(B_s) - lgamma(n_ds + B_s)
//!                    + sum_k (lgamma(n_dsk + subalpha_sk) - lgamma(subalpha_sk))) ]
//! ```
//!
//! with `A = sum_s alpha_s` and `B_s = sum_k subalpha_sk`.

use crate::corpus::Corpus;
use crate::priors::PamPriors;
use crate::sufficient_stats::PamStats;
use special::Gamma as SpecialGamma;

#[inline]
fn ln_gamma(x: f64) -> f64 {
    SpecialGamma::ln_gamma(x).0
}

/// Word part: sub-topic x vocabulary Dirichlet-multinomial
pub fn log_word_likelihood(stats: &PamStats, priors: &PamPriors) -> f64 {
    let ln_gamma_beta = ln_gamma(priors.beta);
    let ln_gamma_vbeta = ln_gamma(priors.v_beta);

    let mut score = 0.0;
    for (k, &n_k) in stats.tokens_per_sub().iter().enumerate() {
        score += ln_gamma_vbeta - ln_gamma(n_k as f64 + priors.v_beta);
        for w in 0..stats.num_types {
            let n_wk = stats.type_sub_counts(w)[k];
            if n_wk > 0 {
                score += ln_gamma(n_wk as f64 + priors.beta) - ln_gamma_beta;
            }
        }
    }
    score
}

/// Document part: super-topic and per-super sub-topic Dirichlet-multinomials
pub fn log_topic_likelihood(corpus: &Corpus, stats: &PamStats, priors: &PamPriors) -> f64 {
    let ln_gamma_alpha: Vec<f64> = priors.alpha.iter().map(|&a| ln_gamma(a)).collect();
    let ln_gamma_sub_alpha: Vec<f64> = priors.sub_alphas.iter().map(|&a| ln_gamma(a)).collect();
    let ln_gamma_alpha_sum = ln_gamma(priors.alpha_sum);
    let kk = priors.num_sub_topics;

    let mut score = 0.0;
    for d in 0..corpus.num_docs() {
        score += ln_gamma_alpha_sum - ln_gamma(corpus.doc_len(d) as f64 + priors.alpha_sum);

        for (s, &n_ds) in stats.super_counts(d).iter().enumerate() {
            let n_ds = n_ds as f64;
            let sub_sum = priors.sub_alpha_sums[s];
            score += ln_gamma(n_ds + priors.alpha[s]) - ln_gamma_alpha[s];
            score += ln_gamma(sub_sum) - ln_gamma(n_ds + sub_sum);

            let sub_alphas = priors.sub_alphas(s);
            for (k, &n_dsk) in stats.super_sub_counts(d, s).iter().enumerate() {
                if n_dsk > 0 {
                    score += ln_gamma(n_dsk as f64 + sub_alphas[k]) - ln_gamma_sub_alpha[s * kk + k];
                }
            }
        }
    }
    score
}

/// Collapsed log joint of words and (super, sub) assignments
pub fn log_joint(corpus: &Corpus, stats: &PamStats, priors: &PamPriors) -> f64 {
    log_word_likelihood(stats, priors) + log_topic_likelihood(corpus, stats, priors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Vocabulary;
    use crate::gibbs::PamGibbsSampler;
    use crate::state::PamState;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_log_joint_ratio_matches_conditional() {
        let docs = vec![vec![0, 1, 1, 2], vec![2, 2, 0]];
        let corpus = Corpus::from_documents(&docs, Vocabulary::anonymous(3).unwrap()).unwrap();
        let mut priors = PamPriors::new(2, 3, 4.0, 0.7, 0.05, 3);
        priors.sub_alphas_mut(1).copy_from_slice(&[0.2, 1.5, 0.9]);
        priors.refresh_sub_alpha_sum(1);

        let supers = vec![0, 1, 1, 0, 1, 0, 0];
        let subs = vec![2, 0, 1, 1, 0, 2, 1];
        let mut state = PamState::from_assignments(&corpus, 2, 3, supers, subs).unwrap();

        // resample token (0, 2), type 1
        let (doc, pos) = (0, 2);
        state.remove_token(&corpus, doc, pos).unwrap();
        let mut sampler = PamGibbsSampler::new(2, 3);
        sampler.fill_conditional(state.stats(), &priors, doc, corpus.word_type(doc, pos));
        let weights = sampler.joint_weights().to_vec();

        let mut log_joint_at = |s: usize, k: usize| {
            state.add_token(&corpus, doc, pos, s, k);
            let lj = log_joint(&corpus, state.stats(), &priors);
            state.remove_token(&corpus, doc, pos).unwrap();
            lj
        };

        let reference = log_joint_at(0, 0);
        for s in 0..2 {
            for k in 0..3 {
                let diff = log_joint_at(s, k) - reference;
                let expected = (weights[s * 3 + k] / weights[0]).ln();
                assert_abs_diff_eq!(diff, expected, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_single_token_value() {
        // one token, S = K = V = 1: every factor is a one-step ratio
        let corpus = Corpus::from_documents(&[vec![0]], Vocabulary::anonymous(1).unwrap()).unwrap();
        let priors = PamPriors::new(1, 1, 2.0, 0.5, 0.1, 1);
        let state = PamState::from_assignments(&corpus, 1, 1, vec![0], vec![0]).unwrap();

        // words: beta / vbeta = 1; super: alpha / A = 1; sub: subalpha / B = 1
        let lj = log_joint(&corpus, state.stats(), &priors);
        assert_abs_diff_eq!(lj, 0.0, epsilon = 1e-12);
    }
}
