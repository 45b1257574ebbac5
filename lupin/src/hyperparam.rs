//! Fixed-point re-estimation of Dirichlet sub-topic priors.
//!
//! Minka's fixed-point update for a Dirichlet-multinomial, written over
//! count histograms so each iteration costs O(K * max count) rather
//! than O(documents):
//!
//! ```text
//! a_k <- a_k * sum_n h_k[n] (psi(a_k + n) - psi(a_k))
//!            / sum_n L[n] (psi(A + n) - psi(A))
//! ```
//!
//! where `h_k` is the histogram of per-document counts of sub-topic k,
//! `L` the histogram of per-document totals, and `A = sum_k a_k`. The
//! digamma differences are accumulated as `sum_{i < n} 1 / (a + i)`.

use crate::histogram::TopicHistograms;
use crate::priors::PamPriors;
use log::{debug, error};

/// Inner fixed-point iterations per update
pub const FIXED_POINT_ITERATIONS: usize = 200;

/// Prior pinned to sub-topics no document uses
pub const UNUSED_SUB_TOPIC_ALPHA: f64 = 1e-6;

/// Re-estimate `params` in place from count histograms.
///
/// * `params` - Dirichlet parameters, one per component (K)
/// * `observations` - `observations[k][n]`: number of documents with `n` tokens in component k
/// * `observation_lengths` - `observation_lengths[n]`: number of documents with `n` tokens in total
/// * `num_iter` - fixed-point iterations
pub fn learn_dirichlet_fixed_point(
    params: &mut [f64],
    observations: &[&[usize]],
    observation_lengths: &[usize],
    num_iter: usize,
) -> anyhow::Result<()> {
    anyhow::ensure!(
        params.len() == observations.len(),
        "{} parameters for {} histograms",
        params.len(),
        observations.len()
    );

    // largest populated bucket above zero; None if the component was never used
    let non_zero_limits: Vec<Option<usize>> = observations
        .iter()
        .map(|hist| hist.iter().rposition(|&c| c > 0).filter(|&n| n > 0))
        .collect();

    let mut params_sum: f64 = params.iter().sum();

    for _iter in 0..num_iter {
        let mut denominator = 0.0;
        let mut current_digamma = 0.0;
        for (n, &num_docs) in observation_lengths.iter().enumerate().skip(1) {
            current_digamma += 1.0 / (params_sum + n as f64 - 1.0);
            denominator += num_docs as f64 * current_digamma;
        }

        params_sum = 0.0;
        for (k, param) in params.iter_mut().enumerate() {
            let limit = match non_zero_limits[k] {
                Some(limit) if denominator > 0.0 => limit,
                _ => {
                    *param = UNUSED_SUB_TOPIC_ALPHA;
                    params_sum += UNUSED_SUB_TOPIC_ALPHA;
                    continue;
                }
            };

            let old = *param;
            let hist = observations[k];
            let mut numerator = 0.0;
            let mut current_digamma = 0.0;
            for n in 1..=limit {
                current_digamma += 1.0 / (old + n as f64 - 1.0);
                numerator += hist[n] as f64 * current_digamma;
            }

            let new = numerator * old / denominator;
            if new.is_nan() {
                error!(
                    "component {}: numerator {}, old value {}, denominator {}",
                    k, numerator, old, denominator
                );
                anyhow::bail!("fixed-point update produced NaN for component {}", k);
            }
            *param = new;
            params_sum += new;
        }
    }

    Ok(())
}

/// Re-estimate every super-topic's sub-topic priors from the last
/// sweep's histograms and refresh their sums.
pub fn optimize_sub_alphas(priors: &mut PamPriors, hist: &TopicHistograms) -> anyhow::Result<()> {
    for s in 0..priors.num_super_topics {
        let observations = hist.sub_histograms(s);
        learn_dirichlet_fixed_point(
            priors.sub_alphas_mut(s),
            &observations,
            hist.super_histogram(s),
            FIXED_POINT_ITERATIONS,
        )?;
        priors.refresh_sub_alpha_sum(s);
        debug!(
            "super-topic {}: sub-topic prior sum {:.4}",
            s, priors.sub_alpha_sums[s]
        );
    }
    Ok(())
}
