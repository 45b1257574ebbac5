//! Outer estimation loop: sweeps, periodic prior updates, checkpoints.

use crate::corpus::Corpus;
use crate::export::PamExport;
use crate::gibbs::PamGibbsSampler;
use crate::histogram::TopicHistograms;
use crate::hyperparam::optimize_sub_alphas;
use crate::model::log_joint;
use crate::priors::PamPriors;
use crate::state::PamState;
use crate::sufficient_stats::PamStats;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use rand::Rng;
use serde::Serialize;

/// Options for Pachinko allocation estimation.
#[derive(Debug, Clone, Serialize)]
pub struct PamOptions {
    /// Number of super-topics (S)
    pub num_super_topics: usize,
    /// Number of sub-topics (K), shared by all super-topics
    pub num_sub_topics: usize,
    /// Number of Gibbs sweeps. Default: 1000
    pub num_iterations: usize,
    /// Re-estimate sub-topic priors every this many sweeps (0 = never). Default: 1
    pub optimize_interval: usize,
    /// Checkpoint every this many sweeps (0 = final only). Default: 100
    pub output_interval: usize,
    /// Total super-topic prior mass. Default: 50
    pub alpha_sum: f64,
    /// Word prior per sub-topic. Default: 0.001
    pub beta: f64,
    /// Initial sub-topic prior. Default: 1.0
    pub init_sub_alpha: f64,
    /// Recount and verify statistics after every sweep. Default: false
    pub check_stats: bool,
}

impl Default for PamOptions {
    fn default() -> Self {
        PamOptions {
            num_super_topics: 10,
            num_sub_topics: 20,
            num_iterations: 1000,
            optimize_interval: 1,
            output_interval: 100,
            alpha_sum: 50.0,
            beta: 0.001,
            init_sub_alpha: 1.0,
            check_stats: false,
        }
    }
}

impl PamOptions {
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.num_super_topics > 0,
            "need at least one super-topic"
        );
        anyhow::ensure!(self.num_sub_topics > 0, "need at least one sub-topic");
        anyhow::ensure!(
            self.alpha_sum.is_finite() && self.alpha_sum > 0.0,
            "alpha sum must be positive: {}",
            self.alpha_sum
        );
        anyhow::ensure!(
            self.beta.is_finite() && self.beta > 0.0,
            "beta must be positive: {}",
            self.beta
        );
        anyhow::ensure!(
            self.init_sub_alpha.is_finite() && self.init_sub_alpha > 0.0,
            "initial sub-topic prior must be positive: {}",
            self.init_sub_alpha
        );
        Ok(())
    }
}

/// When a checkpoint callback fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    /// After sweep `iter`, on the output interval
    Periodic(usize),
    /// After the last sweep
    Final,
}

/// Serializable record of a finished run
#[derive(Debug, Clone, Serialize)]
pub struct PamSummary {
    pub num_docs: usize,
    pub num_tokens: usize,
    pub vocab_size: usize,
    pub options: PamOptions,
    pub alpha: Vec<f64>,
    /// S rows of K sub-topic priors
    pub sub_alphas: Vec<Vec<f64>>,
    pub beta: f64,
    /// (sweep, log joint)
    pub log_likelihood: Vec<(usize, f64)>,
}

fn new_progress_bar(len: u64, template: &str) -> ProgressBar {
    let style = ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
    ProgressBar::new(len).with_style(style)
}

/// Pachinko allocation model bound to one corpus.
///
/// # Usage
///
/// ```ignore
/// let mut rng = SmallRng::seed_from_u64(42);
/// let mut pam = PachinkoAllocation::new(&corpus, PamOptions::default(), &mut rng)?;
/// pam.estimate(&mut rng, |pam, _| pam.export().write("out", false))?;
/// ```
pub struct PachinkoAllocation<'a> {
    corpus: &'a Corpus,
    options: PamOptions,
    priors: PamPriors,
    state: PamState,
    histograms: TopicHistograms,
    sampler: PamGibbsSampler,
    log_likelihood: Vec<(usize, f64)>,
}

impl<'a> PachinkoAllocation<'a> {
    /// Validate options, set symmetric priors, and draw a random
    /// initial assignment for every token.
    pub fn new<R: Rng>(corpus: &'a Corpus, options: PamOptions, rng: &mut R) -> anyhow::Result<Self> {
        options.validate()?;

        let ss = options.num_super_topics;
        let kk = options.num_sub_topics;

        let priors = PamPriors::new(
            ss,
            kk,
            options.alpha_sum,
            options.init_sub_alpha,
            options.beta,
            corpus.vocab_size(),
        );
        let state = PamState::random_init(corpus, ss, kk, rng)?;
        let histograms = TopicHistograms::new(ss, kk, corpus.max_doc_len());
        let sampler = PamGibbsSampler::new(ss, kk);

        info!(
            "PAM: D={}, N={}, V={}, S={}, K={}, iter={}",
            corpus.num_docs(),
            corpus.num_tokens(),
            corpus.vocab_size(),
            ss,
            kk,
            options.num_iterations
        );

        Ok(PachinkoAllocation {
            corpus,
            options,
            priors,
            state,
            histograms,
            sampler,
            log_likelihood: vec![],
        })
    }

    /// One Gibbs sweep over every token, followed by histogram
    /// collection. Returns the number of tokens that moved.
    pub fn run_sweep<R: Rng>(&mut self, rng: &mut R) -> anyhow::Result<usize> {
        let moves = self
            .sampler
            .sweep(self.corpus, &mut self.state, &self.priors, rng)?;
        self.histograms.collect(self.state.stats());
        if self.options.check_stats {
            self.state.check_consistency(self.corpus)?;
        }
        Ok(moves)
    }

    /// Re-estimate sub-topic priors from the last sweep's histograms
    pub fn optimize(&mut self) -> anyhow::Result<()> {
        optimize_sub_alphas(&mut self.priors, &self.histograms)
    }

    /// Run all sweeps.
    ///
    /// After sweep `i > 0`, on the output interval, `checkpoint` is
    /// called with `Checkpoint::Periodic(i)`; a failure there is logged
    /// and the run goes on. Then, on the optimize interval, the
    /// sub-topic priors are re-estimated. After the last sweep
    /// `checkpoint` is called with `Checkpoint::Final` and its error,
    /// if any, is returned.
    pub fn estimate<R, F>(&mut self, rng: &mut R, mut checkpoint: F) -> anyhow::Result<()>
    where
        R: Rng,
        F: FnMut(&Self, Checkpoint) -> anyhow::Result<()>,
    {
        let num_iter = self.options.num_iterations;
        let output_interval = self.options.output_interval;
        let optimize_interval = self.options.optimize_interval;

        let pb = new_progress_bar(num_iter as u64, "Gibbs {bar:40} {pos}/{len} sweeps ({eta})");

        for iter in 0..num_iter {
            let moves = self.run_sweep(rng)?;
            pb.inc(1);

            if iter == 0 {
                continue;
            }

            if output_interval > 0 && iter % output_interval == 0 {
                let llik = self.record_log_likelihood(iter);
                info!("sweep {}: log-likelihood {:.4}, moves {}", iter, llik, moves);
                if let Err(e) = checkpoint(self, Checkpoint::Periodic(iter)) {
                    warn!("checkpoint at sweep {} failed: {}", iter, e);
                }
            }

            if optimize_interval > 0 && iter % optimize_interval == 0 {
                self.optimize()?;
            }
        }
        pb.finish_and_clear();

        let llik = self.record_log_likelihood(num_iter);
        info!("finished {} sweeps: log-likelihood {:.4}", num_iter, llik);
        for s in 0..self.priors.num_super_topics {
            info!(
                "super-topic {}: sub-topic prior sum {:.4}",
                s, self.priors.sub_alpha_sums[s]
            );
        }

        checkpoint(self, Checkpoint::Final)
    }

    fn record_log_likelihood(&mut self, iter: usize) -> f64 {
        let llik = self.log_joint();
        self.log_likelihood.push((iter, llik));
        llik
    }

    pub fn log_joint(&self) -> f64 {
        log_joint(self.corpus, self.state.stats(), &self.priors)
    }

    /// Proportions and counts of the current state; `super_sub` is
    /// the conditional built for the last token resampled
    pub fn export(&self) -> PamExport {
        PamExport::new(
            self.corpus,
            self.state.stats(),
            &self.priors,
            self.sampler.joint_weights(),
        )
    }

    pub fn summary(&self) -> PamSummary {
        PamSummary {
            num_docs: self.corpus.num_docs(),
            num_tokens: self.corpus.num_tokens(),
            vocab_size: self.corpus.vocab_size(),
            options: self.options.clone(),
            alpha: self.priors.alpha.clone(),
            sub_alphas: (0..self.priors.num_super_topics)
                .map(|s| self.priors.sub_alphas(s).to_vec())
                .collect(),
            beta: self.priors.beta,
            log_likelihood: self.log_likelihood.clone(),
        }
    }

    pub fn corpus(&self) -> &Corpus {
        self.corpus
    }

    pub fn priors(&self) -> &PamPriors {
        &self.priors
    }

    pub fn state(&self) -> &PamState {
        &self.state
    }

    pub fn stats(&self) -> &PamStats {
        self.state.stats()
    }

    /// (sweep, log joint) at every checkpoint so far
    pub fn log_likelihood_trace(&self) -> &[(usize, f64)] {
        &self.log_likelihood
    }
}
