use lupin::simulate::{write_simulated_data, SimArgs};

use clap::Args;

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// output prefix: writes {out}.data.csv, {out}.genes.csv,
    /// {out}.true_super.csv and {out}.true_phi.csv
    #[arg(long, short, required = true)]
    out: Box<str>,

    /// number of cells (documents)
    #[arg(long, default_value_t = 500)]
    docs: usize,

    /// number of genes (vocabulary size)
    #[arg(long, default_value_t = 200)]
    genes: usize,

    /// number of super-topics
    #[arg(long, short = 's', default_value_t = 2)]
    num_super_topics: usize,

    /// number of sub-topics; each owns a block of genes
    #[arg(long, short = 'k', default_value_t = 4)]
    num_sub_topics: usize,

    /// tokens (total counts) per cell
    #[arg(long, default_value_t = 500)]
    depth: usize,

    /// Dirichlet mass of cell-level super-topic proportions
    #[arg(long, default_value_t = 1.0)]
    alpha_sum: f64,

    /// Dirichlet mass outside the planted structure
    #[arg(long, default_value_t = 0.01)]
    noise: f64,

    /// random seed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// verbosity
    #[arg(long, short)]
    verbose: bool,
}

pub fn run_simulate(args: &SimulateArgs) -> anyhow::Result<()> {
    if args.verbose {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let sim_args = SimArgs {
        docs: args.docs,
        genes: args.genes,
        num_super_topics: args.num_super_topics,
        num_sub_topics: args.num_sub_topics,
        depth: args.depth,
        alpha_sum: args.alpha_sum,
        noise: args.noise,
        rseed: args.seed,
        ..Default::default()
    };

    write_simulated_data(&sim_args, &args.out)
}
