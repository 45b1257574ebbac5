//! Dirichlet hyperparameters of the two-level model.
//!
//! The super-topic prior `alpha` and the word prior `beta` stay fixed
//! for a run. The sub-topic priors `sub_alphas` are re-estimated between
//! sweeps; the sampler only ever sees them through `&PamPriors`.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct PamPriors {
    pub num_super_topics: usize,
    pub num_sub_topics: usize,
    /// Prior mass of each super-topic, summing to `alpha_sum`
    pub alpha: Vec<f64>,
    pub alpha_sum: f64,
    /// S x K sub-topic priors, flattened row-major: `sub_alphas[s * K + k]`
    pub sub_alphas: Vec<f64>,
    /// Row sums of `sub_alphas`
    pub sub_alpha_sums: Vec<f64>,
    /// Prior mass per word type per sub-topic
    pub beta: f64,
    /// `beta * vocabulary size`
    pub v_beta: f64,
}

impl PamPriors {
    /// Symmetric priors: `alpha[s] = alpha_sum / S` and `sub_alphas[s][k] = init_sub_alpha`.
    pub fn new(
        num_super_topics: usize,
        num_sub_topics: usize,
        alpha_sum: f64,
        init_sub_alpha: f64,
        beta: f64,
        vocab_size: usize,
    ) -> Self {
        let alpha = vec![alpha_sum / num_super_topics as f64; num_super_topics];
        let sub_alphas = vec![init_sub_alpha; num_super_topics * num_sub_topics];
        let sub_alpha_sums = vec![init_sub_alpha * num_sub_topics as f64; num_super_topics];
        PamPriors {
            num_super_topics,
            num_sub_topics,
            alpha,
            alpha_sum,
            sub_alphas,
            sub_alpha_sums,
            beta,
            v_beta: beta * vocab_size as f64,
        }
    }

    /// Sub-topic priors under super-topic `s`
    #[inline]
    pub fn sub_alphas(&self, s: usize) -> &[f64] {
        let kk = self.num_sub_topics;
        &self.sub_alphas[s * kk..(s + 1) * kk]
    }

    #[inline]
    pub fn sub_alphas_mut(&mut self, s: usize) -> &mut [f64] {
        let kk = self.num_sub_topics;
        &mut self.sub_alphas[s * kk..(s + 1) * kk]
    }

    /// Recompute `sub_alpha_sums[s]` after `sub_alphas[s][*]` changed
    pub fn refresh_sub_alpha_sum(&mut self, s: usize) {
        self.sub_alpha_sums[s] = self.sub_alphas(s).iter().sum();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symmetric_init() {
        let priors = PamPriors::new(4, 3, 50.0, 1.0, 0.001, 2000);
        assert_eq!(priors.alpha, vec![12.5; 4]);
        assert_eq!(priors.sub_alpha_sums, vec![3.0; 4]);
        assert!((priors.v_beta - 2.0).abs() < 1e-12);
        assert_eq!(priors.sub_alphas(2).len(), 3);
    }

    #[test]
    fn test_refresh_sum() {
        let mut priors = PamPriors::new(2, 3, 10.0, 1.0, 0.01, 10);
        priors.sub_alphas_mut(1).copy_from_slice(&[0.5, 0.25, 2.0]);
        priors.refresh_sub_alpha_sum(1);
        assert!((priors.sub_alpha_sums[1] - 2.75).abs() < 1e-12);
        assert!((priors.sub_alpha_sums[0] - 3.0).abs() < 1e-12);
    }
}
