use lupin::corpus::read_count_corpus;
use lupin::export::{output_file, write_topic_summary};
use lupin::pam::{Checkpoint, PachinkoAllocation, PamOptions};

use clap::Args;
use log::info;
use matrix_util::common_io::{mkdir, write_lines};
use rand::rngs::SmallRng;
use rand::SeedableRng;

#[derive(Args, Debug)]
pub struct PamArgs {
    /// cell x gene count matrix: one comma-separated row of counts
    /// per cell (`.gz` ok)
    #[arg(required = true)]
    data_file: Box<str>,

    /// gene names, comma-separated, in column order
    #[arg(long, short = 'g', required = true)]
    genes: Box<str>,

    #[arg(
        long,
        short,
        required = true,
        help = "Output header",
        long_help = "Output header for results:\n\
		     - {out}.super.csv: cell x super-topic proportions\n\
		     - {out}.sub.csv: cell x sub-topic proportions\n\
		     - {out}.super_sub.csv: super x sub-topic conditional weights of the last token step\n\
		     - {out}.super_sub_mass.csv: super x sub-topic token counts plus priors\n\
		     - {out}.words.csv: gene x sub-topic counts\n\
		     - {out}.top_genes.txt: topic summary\n\
		     - {out}.summary.json: priors and log-likelihood trace\n\
		     Periodic checkpoints go to {out}.iter{N}.*.csv"
    )]
    out: Box<str>,

    /// number of super-topics
    #[arg(long, short = 's', default_value_t = 10)]
    num_super_topics: usize,

    /// number of sub-topics
    #[arg(long, short = 'k', default_value_t = 20)]
    num_sub_topics: usize,

    /// number of Gibbs sweeps
    #[arg(long, default_value_t = 1000)]
    iter: usize,

    /// re-estimate sub-topic priors every this many sweeps (0: never)
    #[arg(long, default_value_t = 1)]
    optimize_interval: usize,

    /// write a checkpoint every this many sweeps (0: final only)
    #[arg(long, default_value_t = 100)]
    output_interval: usize,

    /// total Dirichlet mass of super-topic proportions
    #[arg(long, default_value_t = 50.0)]
    alpha_sum: f64,

    /// Dirichlet mass per gene in each sub-topic
    #[arg(long, default_value_t = 0.001)]
    beta: f64,

    /// random seed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// number of genes listed per sub-topic in {out}.top_genes.txt
    #[arg(long, default_value_t = 20)]
    top_genes: usize,

    /// recount and verify all statistics after every sweep (slow)
    #[arg(long, default_value_t = false)]
    check_stats: bool,

    /// gzip the output matrices
    #[arg(long, default_value_t = false)]
    gzip: bool,

    /// verbosity
    #[arg(long, short)]
    verbose: bool,
}

pub fn fit_pam(args: &PamArgs) -> anyhow::Result<()> {
    if args.verbose {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let options = PamOptions {
        num_super_topics: args.num_super_topics,
        num_sub_topics: args.num_sub_topics,
        num_iterations: args.iter,
        optimize_interval: args.optimize_interval,
        output_interval: args.output_interval,
        alpha_sum: args.alpha_sum,
        beta: args.beta,
        check_stats: args.check_stats,
        ..Default::default()
    };
    options.validate()?;

    let corpus = read_count_corpus(&args.data_file, &args.genes)?;

    let out = args.out.as_ref();
    mkdir(out)?;

    let mut rng = SmallRng::seed_from_u64(args.seed);
    let mut pam = PachinkoAllocation::new(&corpus, options, &mut rng)?;

    pam.estimate(&mut rng, |pam, at| match at {
        Checkpoint::Periodic(iter) => {
            let prefix = format!("{}.iter{}", out, iter);
            pam.export().write(&prefix, args.gzip)?;
            info!("checkpoint: {}.*", prefix);
            Ok(())
        }
        Checkpoint::Final => {
            pam.export().write(out, args.gzip)?;

            let summary_file = output_file(out, "top_genes.txt", false);
            write_topic_summary(
                &summary_file,
                pam.stats(),
                pam.priors(),
                pam.corpus().vocab(),
                args.top_genes,
            )?;

            let json_file = output_file(out, "summary.json", false);
            let json = serde_json::to_string_pretty(&pam.summary())?;
            write_lines(&[json], &json_file)?;

            info!("wrote results: {}.*", out);
            Ok(())
        }
    })?;

    info!("done");
    Ok(())
}
