//! Synthetic cell x gene counts from a planted two-level topic model.
//!
//! ```text
//! phi_k        ~ Dir(eta_k)       eta_kj = 1 on gene block k, `noise` elsewhere
//! theta_d      ~ Dir(alpha_sum / S)
//! psi_ds       ~ Dir(subalpha_s)  subalpha_sk = `sub_alpha` if k % S == s, else `noise`
//! per token:  s ~ theta_d,  k ~ psi_ds,  gene ~ phi_k
//! ```

use log::info;
use matrix_util::common_io::write_lines;
use matrix_util::traits::IoOps;
use ndarray::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{weighted::WeightedIndex, Distribution, Gamma};
use rayon::prelude::*;

pub struct SimArgs {
    pub docs: usize,
    pub genes: usize,
    pub num_super_topics: usize,
    pub num_sub_topics: usize,
    /// tokens per document
    pub depth: usize,
    pub alpha_sum: f64,
    pub sub_alpha: f64,
    /// Dirichlet mass off the planted structure
    pub noise: f64,
    pub rseed: u64,
}

impl Default for SimArgs {
    fn default() -> Self {
        SimArgs {
            docs: 500,
            genes: 200,
            num_super_topics: 2,
            num_sub_topics: 4,
            depth: 500,
            alpha_sum: 1.0,
            sub_alpha: 1.0,
            noise: 0.01,
            rseed: 42,
        }
    }
}

pub struct SimOut {
    /// D x V counts
    pub counts: Vec<Vec<usize>>,
    pub gene_names: Vec<Box<str>>,
    /// D x S true super-topic proportions
    pub theta_ds: Array2<f64>,
    /// K x V true gene distributions
    pub phi_kv: Array2<f64>,
}

/// Draw from Dir(`alpha`) by normalizing independent Gamma draws
fn sample_dirichlet<R: rand::Rng>(alpha: &[f64], rng: &mut R) -> anyhow::Result<Vec<f64>> {
    let mut x = alpha
        .iter()
        .map(|&a| -> anyhow::Result<f64> { Ok(Gamma::new(a, 1.0)?.sample(&mut *rng)) })
        .collect::<anyhow::Result<Vec<f64>>>()?;
    let total: f64 = x.iter().sum();
    if total > 0.0 {
        x.iter_mut().for_each(|v| *v /= total);
    } else {
        // every draw underflowed; fall back to the largest prior
        let best = alpha
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap_or(0);
        x.iter_mut().for_each(|v| *v = 0.0);
        x[best] = 1.0;
    }
    Ok(x)
}

/// Sub-topic `k` owns genes `block_start(k)..block_start(k + 1)`
fn block_start(k: usize, genes: usize, num_sub_topics: usize) -> usize {
    k * genes / num_sub_topics
}

pub fn simulate_pam_counts(args: &SimArgs) -> anyhow::Result<SimOut> {
    let dd = args.docs;
    let vv = args.genes;
    let ss = args.num_super_topics;
    let kk = args.num_sub_topics;

    anyhow::ensure!(dd > 0 && ss > 0 && kk > 0, "need documents and topics");
    anyhow::ensure!(
        vv >= kk,
        "need at least as many genes ({}) as sub-topics ({})",
        vv,
        kk
    );
    anyhow::ensure!(
        args.alpha_sum > 0.0 && args.sub_alpha > 0.0 && args.noise > 0.0,
        "Dirichlet parameters must be positive"
    );

    let mut rng = StdRng::seed_from_u64(args.rseed);

    let mut phi_kv = Array2::<f64>::zeros((kk, vv));
    for k in 0..kk {
        let eta: Vec<f64> = (0..vv)
            .map(|j| {
                if j >= block_start(k, vv, kk) && j < block_start(k + 1, vv, kk) {
                    1.0
                } else {
                    args.noise
                }
            })
            .collect();
        let phi = sample_dirichlet(&eta, &mut rng)?;
        phi_kv.row_mut(k).assign(&Array1::from(phi));
    }

    let sub_alphas: Vec<Vec<f64>> = (0..ss)
        .map(|s| {
            (0..kk)
                .map(|k| if k % ss == s { args.sub_alpha } else { args.noise })
                .collect()
        })
        .collect();

    let gene_samplers = phi_kv
        .rows()
        .into_iter()
        .map(|row| -> anyhow::Result<WeightedIndex<f64>> { Ok(WeightedIndex::new(row.to_vec())?) })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let alpha = vec![args.alpha_sum / ss as f64; ss];

    info!(
        "simulating {} documents x {} genes, S={}, K={}, depth={}",
        dd, vv, ss, kk, args.depth
    );

    let docs = (0..dd)
        .into_par_iter()
        .map(|d| -> anyhow::Result<(Vec<usize>, Vec<f64>)> {
            let mut rng = StdRng::seed_from_u64(args.rseed.wrapping_add(d as u64 + 1));
            let theta = sample_dirichlet(&alpha, &mut rng)?;
            let psi = sub_alphas
                .iter()
                .map(|a| -> anyhow::Result<WeightedIndex<f64>> {
                    Ok(WeightedIndex::new(sample_dirichlet(a, &mut rng)?)?)
                })
                .collect::<anyhow::Result<Vec<_>>>()?;
            let super_sampler = WeightedIndex::new(&theta)?;

            let mut counts = vec![0usize; vv];
            for _ in 0..args.depth {
                let s = super_sampler.sample(&mut rng);
                let k = psi[s].sample(&mut rng);
                counts[gene_samplers[k].sample(&mut rng)] += 1;
            }
            Ok((counts, theta))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let mut theta_ds = Array2::<f64>::zeros((dd, ss));
    let mut counts = Vec::with_capacity(dd);
    for (d, (row, theta)) in docs.into_iter().enumerate() {
        theta_ds.row_mut(d).assign(&Array1::from(theta));
        counts.push(row);
    }

    let gene_names = (0..vv)
        .map(|j| format!("g{}", j).into_boxed_str())
        .collect();

    Ok(SimOut {
        counts,
        gene_names,
        theta_ds,
        phi_kv,
    })
}

/// Simulate and write `{out}.data.csv`, `{out}.genes.csv`,
/// `{out}.true_super.csv` and `{out}.true_phi.csv`
pub fn write_simulated_data(args: &SimArgs, out: &str) -> anyhow::Result<()> {
    let sim = simulate_pam_counts(args)?;

    let data_file = format!("{}.data.csv", out);
    let genes_file = format!("{}.genes.csv", out);
    let super_file = format!("{}.true_super.csv", out);
    let phi_file = format!("{}.true_phi.csv", out);

    matrix_util::common_io::mkdir(&data_file)?;

    let lines: Vec<Box<str>> = sim
        .counts
        .iter()
        .map(|row| {
            row.iter()
                .map(|x| x.to_string())
                .collect::<Vec<_>>()
                .join(",")
                .into_boxed_str()
        })
        .collect();
    write_lines(&lines, &data_file)?;
    write_lines(&[sim.gene_names.join(",")], &genes_file)?;
    sim.theta_ds.to_csv(&super_file)?;
    sim.phi_kv.to_csv(&phi_file)?;

    info!(
        "wrote {}, {}, {}, {}",
        data_file, genes_file, super_file, phi_file
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::read_count_corpus;
    use matrix_util::common_io::create_temp_dir_file;
    use ndarray::s;

    #[test]
    fn test_simulated_counts() -> anyhow::Result<()> {
        let args = SimArgs {
            docs: 20,
            genes: 30,
            num_super_topics: 2,
            num_sub_topics: 3,
            depth: 50,
            ..Default::default()
        };
        let sim = simulate_pam_counts(&args)?;

        assert_eq!(sim.counts.len(), 20);
        assert!(sim.counts.iter().all(|row| row.len() == 30));
        assert!(sim.counts.iter().all(|row| row.iter().sum::<usize>() == 50));
        for row in sim.theta_ds.rows() {
            approx::assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-9);
        }

        // same seed, same data
        let again = simulate_pam_counts(&args)?;
        assert_eq!(sim.counts, again.counts);
        Ok(())
    }

    #[test]
    fn test_planted_blocks_dominate() -> anyhow::Result<()> {
        let args = SimArgs {
            genes: 40,
            num_sub_topics: 4,
            noise: 0.001,
            ..Default::default()
        };
        let sim = simulate_pam_counts(&args)?;
        for k in 0..4 {
            let own: f64 = sim.phi_kv.row(k).slice(s![k * 10..(k + 1) * 10]).sum();
            assert!(own > 0.8, "sub-topic {} keeps {} on its block", k, own);
        }
        Ok(())
    }

    #[test]
    fn test_written_data_reads_back() -> anyhow::Result<()> {
        let args = SimArgs {
            docs: 5,
            genes: 8,
            depth: 10,
            ..Default::default()
        };
        let out = create_temp_dir_file("")?;
        let out = out.to_str().unwrap();
        write_simulated_data(&args, out)?;

        let corpus = read_count_corpus(&format!("{}.data.csv", out), &format!("{}.genes.csv", out))?;
        assert_eq!(corpus.num_docs(), 5);
        assert_eq!(corpus.num_tokens(), 50);
        assert_eq!(corpus.vocab().name(7), "g7");
        Ok(())
    }
}
