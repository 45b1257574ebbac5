//! Scenario tests across sampler, optimizer, and export.

use crate::corpus::{Corpus, Vocabulary};
use crate::export::PamExport;
use crate::gibbs::PamGibbsSampler;
use crate::pam::{Checkpoint, PachinkoAllocation, PamOptions};
use crate::priors::PamPriors;
use crate::simulate::{simulate_pam_counts, SimArgs};
use crate::state::PamState;
use rand::rngs::SmallRng;
use rand::SeedableRng;

fn simulated_corpus(docs: usize, genes: usize, depth: usize, seed: u64) -> Corpus {
    let sim = simulate_pam_counts(&SimArgs {
        docs,
        genes,
        depth,
        num_super_topics: 2,
        num_sub_topics: 4,
        rseed: seed,
        ..Default::default()
    })
    .unwrap();
    Corpus::from_count_rows(&sim.counts, Vocabulary::new(sim.gene_names).unwrap()).unwrap()
}

/// Two groups of documents over disjoint gene blocks
fn two_block_corpus(docs_per_block: usize, genes_per_block: usize, count: usize) -> Corpus {
    let mut docs = vec![];
    for b in 0..2 {
        for _ in 0..docs_per_block {
            let doc: Vec<usize> = (0..genes_per_block)
                .flat_map(|j| std::iter::repeat_n(b * genes_per_block + j, count))
                .collect();
            docs.push(doc);
        }
    }
    Corpus::from_documents(&docs, Vocabulary::anonymous(2 * genes_per_block).unwrap()).unwrap()
}

#[test]
fn test_invariants_hold_after_every_sweep() {
    let corpus = simulated_corpus(30, 40, 60, 11);
    let mut rng = SmallRng::seed_from_u64(11);
    let options = PamOptions {
        num_super_topics: 3,
        num_sub_topics: 5,
        ..Default::default()
    };
    let mut pam = PachinkoAllocation::new(&corpus, options, &mut rng).unwrap();

    for iter in 0..30 {
        pam.run_sweep(&mut rng).unwrap();
        pam.state().check_consistency(&corpus).unwrap();
        assert_eq!(pam.stats().total_tokens(), corpus.num_tokens());
        if iter > 0 {
            pam.optimize().unwrap();
        }
    }
}

#[test]
fn test_invariants_hold_after_every_token() {
    let corpus = simulated_corpus(8, 20, 15, 4);
    let priors = PamPriors::new(2, 3, 2.0, 1.0, 0.01, corpus.vocab_size());
    let mut rng = SmallRng::seed_from_u64(4);
    let mut state = PamState::random_init(&corpus, 2, 3, &mut rng).unwrap();
    let mut sampler = PamGibbsSampler::new(2, 3);

    for _ in 0..3 {
        for doc in 0..corpus.num_docs() {
            for pos in 0..corpus.doc_len(doc) {
                sampler
                    .resample_token(&corpus, &mut state, &priors, doc, pos, &mut rng)
                    .unwrap();
                state.check_consistency(&corpus).unwrap();
                assert_eq!(state.stats().total_tokens(), corpus.num_tokens());
            }
        }
    }
}

#[test]
fn test_same_seed_same_state() {
    let corpus = simulated_corpus(20, 30, 40, 3);
    let options = PamOptions {
        num_super_topics: 2,
        num_sub_topics: 4,
        num_iterations: 25,
        output_interval: 10,
        ..Default::default()
    };

    let run = |seed: u64| {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut pam = PachinkoAllocation::new(&corpus, options.clone(), &mut rng).unwrap();
        pam.estimate(&mut rng, |_, _| Ok(())).unwrap();
        (
            pam.state().super_topics().to_vec(),
            pam.state().sub_topics().to_vec(),
            pam.priors().sub_alphas.clone(),
        )
    };

    let first = run(77);
    let second = run(77);
    assert_eq!(first, second);

    let other = run(78);
    assert_ne!(first.0, other.0);
}

#[test]
fn test_cooccurring_word_follows_seed_topic() {
    // doc 0: twenty copies of word 0 and three of word 2; doc 1: twenty of word 1
    let mut doc0 = vec![0; 20];
    doc0.extend([2, 2, 2]);
    let docs = vec![doc0, vec![1; 20]];
    let corpus = Corpus::from_documents(&docs, Vocabulary::anonymous(3).unwrap()).unwrap();

    let options = PamOptions {
        num_super_topics: 1,
        num_sub_topics: 2,
        beta: 0.1,
        optimize_interval: 0,
        ..Default::default()
    };

    let burn_in = 50;
    let num_sweeps = 250;
    let mut agree = 0;
    let mut total = 0;

    for seed in 0..5 {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut pam = PachinkoAllocation::new(&corpus, options.clone(), &mut rng).unwrap();
        for iter in 0..num_sweeps {
            pam.run_sweep(&mut rng).unwrap();
            if iter < burn_in {
                continue;
            }
            let counts = pam.stats().type_sub_counts(0);
            let seed_topic = if counts[0] >= counts[1] { 0 } else { 1 };
            for pos in 20..23 {
                let (_, k) = pam.state().assignment(&corpus, 0, pos);
                if k == seed_topic {
                    agree += 1;
                }
                total += 1;
            }
        }
    }

    let frac = agree as f64 / total as f64;
    assert!(frac > 0.8, "word 2 agreed with word 0 in {} of draws", frac);
}

#[test]
fn test_separated_blocks_are_recovered() {
    let corpus = two_block_corpus(10, 5, 6);
    let mut rng = SmallRng::seed_from_u64(2024);
    let options = PamOptions {
        num_super_topics: 1,
        num_sub_topics: 2,
        num_iterations: 200,
        optimize_interval: 10,
        output_interval: 0,
        beta: 0.01,
        ..Default::default()
    };
    let mut pam = PachinkoAllocation::new(&corpus, options, &mut rng).unwrap();
    pam.estimate(&mut rng, |_, _| Ok(())).unwrap();

    let export = pam.export();
    let argmax = |d: usize| {
        let row = export.sub_topics.row(d);
        if row[0] >= row[1] {
            0
        } else {
            1
        }
    };

    for d in 0..20 {
        let row = export.sub_topics.row(d);
        assert!(row[0].max(row[1]) > 0.9, "document {} row {:?}", d, row);
    }
    assert!((0..10).all(|d| argmax(d) == argmax(0)));
    assert!((10..20).all(|d| argmax(d) == argmax(10)));
    assert_ne!(argmax(0), argmax(10));
}

#[test]
fn test_log_likelihood_improves() {
    let corpus = simulated_corpus(40, 40, 80, 5);
    let mut rng = SmallRng::seed_from_u64(5);
    let options = PamOptions {
        num_super_topics: 2,
        num_sub_topics: 4,
        beta: 0.01,
        ..Default::default()
    };
    let mut pam = PachinkoAllocation::new(&corpus, options, &mut rng).unwrap();

    let initial = pam.log_joint();
    for iter in 0..60 {
        pam.run_sweep(&mut rng).unwrap();
        if iter > 0 {
            pam.optimize().unwrap();
        }
    }
    let fitted = pam.log_joint();
    assert!(fitted.is_finite());
    assert!(fitted > initial, "{} <= {}", fitted, initial);
}

#[test]
fn test_optimizer_keeps_priors_valid() {
    // more sub-topics than the data needs
    let corpus = two_block_corpus(6, 4, 5);
    let mut rng = SmallRng::seed_from_u64(8);
    let options = PamOptions {
        num_super_topics: 2,
        num_sub_topics: 6,
        num_iterations: 80,
        output_interval: 20,
        ..Default::default()
    };
    let mut pam = PachinkoAllocation::new(&corpus, options, &mut rng).unwrap();

    let mut finals = 0;
    pam.estimate(&mut rng, |pam, at| {
        let priors = pam.priors();
        for s in 0..priors.num_super_topics {
            let sub = priors.sub_alphas(s);
            assert!(sub.iter().all(|a| a.is_finite() && *a > 0.0));
            let sum: f64 = sub.iter().sum();
            approx::assert_relative_eq!(priors.sub_alpha_sums[s], sum, max_relative = 1e-12);
        }
        if at == Checkpoint::Final {
            finals += 1;
        }
        Ok(())
    })
    .unwrap();
    assert_eq!(finals, 1);

    let summary = pam.summary();
    assert_eq!(summary.log_likelihood.len(), 4);
    assert!(summary.log_likelihood.iter().all(|(_, x)| x.is_finite()));
}

#[test]
fn test_export_rows() {
    let corpus = simulated_corpus(15, 20, 30, 1);
    let mut rng = SmallRng::seed_from_u64(1);
    let options = PamOptions {
        num_super_topics: 2,
        num_sub_topics: 3,
        num_iterations: 10,
        ..Default::default()
    };
    let mut pam = PachinkoAllocation::new(&corpus, options, &mut rng).unwrap();
    pam.estimate(&mut rng, |_, _| Ok(())).unwrap();

    let export: PamExport = pam.export();
    assert_eq!(export.super_topics.dim(), (15, 2));
    assert_eq!(export.sub_topics.dim(), (15, 3));
    assert_eq!(export.super_sub.dim(), (2, 3));
    assert_eq!(export.words.dim(), (20, 3));

    for d in 0..15 {
        approx::assert_abs_diff_eq!(export.super_topics.row(d).sum(), 1.0, epsilon = 1e-9);
        approx::assert_abs_diff_eq!(export.sub_topics.row(d).sum(), 1.0, epsilon = 1e-9);
    }
    assert_eq!(export.words.sum(), corpus.num_tokens());
}
