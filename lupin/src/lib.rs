//! Pachinko allocation for single-cell count data.
//!
//! Cells are documents and each count of a gene is one token of that
//! gene's type. Every token carries a super-topic and a sub-topic; the
//! super-topics mix sub-topics with their own Dirichlet priors, and the
//! sub-topics are distributions over genes shared by all super-topics.
//!
//! # Inference
//!
//! Collapsed Gibbs sampling over (super, sub) pairs, with periodic
//! fixed-point re-estimation of the per-super-topic sub-topic priors
//! (Minka, 2000) from count histograms.
//!
//! # References
//!
//! Li & McCallum (2006). "Pachinko allocation: DAG-structured mixture
//! models of topic correlations." ICML.

/// Documents as flat token arrays over a gene vocabulary
pub mod corpus;

/// Dirichlet hyperparameters
pub mod priors;

/// Count arrays derived from the token assignments
pub mod sufficient_stats;

/// Token assignments with their statistics
pub mod state;

/// Collapsed Gibbs sweep
pub mod gibbs;

/// Per-document count histograms for prior re-estimation
pub mod histogram;

/// Fixed-point Dirichlet optimizer
pub mod hyperparam;

/// Collapsed log joint probability
pub mod model;

/// Topic proportions, weight matrices, and gene summaries
pub mod export;

/// Estimation loop and run options
pub mod pam;

/// Synthetic data from a planted model
pub mod simulate;

#[cfg(test)]
mod test;

pub use corpus::{read_count_corpus, Corpus, Vocabulary};
pub use pam::{Checkpoint, PachinkoAllocation, PamOptions, PamSummary};
