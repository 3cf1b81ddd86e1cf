mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::benchmark::BenchmarkArgs;
use commands::prefill::PrefillArgs;
use commands::reverse_dcf::ReverseDcfArgs;
use commands::value::ValueArgs;

/// Falsifiable DCF equity valuations
#[derive(Parser)]
#[command(
    name = "dcfv",
    version,
    about = "DCF equity valuations with structural audits and Monte Carlo",
    long_about = "Computes discounted-cash-flow equity valuations surrounded by the \
                  cross-checks that make them falsifiable: a structural audit of the \
                  assumption set, a reverse-DCF of the market price, and a correlated \
                  Monte Carlo over the key drivers, each under three terminal-value \
                  mechanisms."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full three-method valuation with audits and Monte Carlo
    Value(ValueArgs),
    /// Show the prefilled DCF inputs and the WACC decomposition
    Prefill(PrefillArgs),
    /// Reverse-solve the long-run assumptions the market price implies
    ReverseDcf(ReverseDcfArgs),
    /// Look up an industry benchmark and its warning thresholds
    Benchmark(BenchmarkArgs),
    /// Print version information
    Version,
}

#[derive(Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Minimal,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Value(args) => commands::value::run_value(args),
        Commands::Prefill(args) => commands::prefill::run_prefill(args),
        Commands::ReverseDcf(args) => commands::reverse_dcf::run_reverse_dcf(args),
        Commands::Benchmark(args) => commands::benchmark::run_benchmark(args),
        Commands::Version => {
            println!("dcfv {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
