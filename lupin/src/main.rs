mod fit_pam;
mod run_simulate;

use crate::fit_pam::*;
use crate::run_simulate::*;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "LUPIN",
    long_about = "Hierarchical topic discovery in single-cell count data\n\
		  by Pachinko allocation and collapsed Gibbs sampling.\n\
		  Input: a cell x gene count matrix (`.csv` or `.csv.gz`)\n\
		  and a comma-separated list of gene names."
)]
struct Cli {
    #[command(subcommand)]
    commands: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Fit a two-level Pachinko allocation model",
        long_about = "Fit super-topics over sub-topics over genes:\n\
		      (1) Assign every gene count token a random (super, sub) pair\n\
		      (2) Resample all tokens by collapsed Gibbs sweeps\n\
		      (3) Re-estimate sub-topic priors between sweeps\n\
		      (4) Write topic proportions and gene loadings.\n"
    )]
    Pam(PamArgs),

    /// Simulate count data from a planted Pachinko allocation model
    Simulate(SimulateArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.commands {
        Commands::Pam(args) => {
            fit_pam(args)?;
        }
        Commands::Simulate(args) => {
            run_simulate(args)?;
        }
    }

    Ok(())
}
