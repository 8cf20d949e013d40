//! Binary entry point for the rolegraph feature extractor.
#![forbid(unsafe_code)]

use std::error::Error;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use rolegraph::cli::extract::{run_extract, EdgeListConfig, ExtractConfig, ExtractSummary};
use rolegraph::RoleOptions;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "rolegraph",
    version,
    about = "Recursive structural role features for directed graphs",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for the run summary"
    )]
    format: OutputFormat,

    #[arg(
        long,
        global = true,
        env = "ROLEGRAPH_LOG",
        help = "Log filter used when RUST_LOG is unset"
    )]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract and prune role features from a CSV edge list.
    Extract(ExtractCmd),
}

#[derive(Args, Debug)]
struct ExtractCmd {
    #[arg(long, value_name = "FILE", help = "CSV file containing edges")]
    edges: PathBuf,

    #[arg(long, default_value = "src", help = "Source node id column")]
    src_column: String,

    #[arg(long, default_value = "dst", help = "Destination node id column")]
    dst_column: String,

    #[arg(long, default_value = "wgt", help = "Edge weight column")]
    weight_column: String,

    #[arg(long, value_name = "FILE", help = "TOML file with extraction options")]
    config: Option<PathBuf>,

    #[arg(long, help = "Maximum recursive rounds after the first")]
    rounds: Option<usize>,

    #[arg(long, help = "Minimum share of remaining nodes per bin, in (0, 1]")]
    bin_fraction: Option<f64>,

    #[arg(long, help = "Bin distance under which features count as duplicates")]
    max_dist: Option<u32>,

    #[arg(long, value_name = "FILE", help = "Write the feature table to this CSV")]
    out: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing(level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.unwrap_or("info")));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    match cli.command {
        Command::Extract(cmd) => {
            let mut options = match &cmd.config {
                Some(path) => RoleOptions::load(path)?,
                None => RoleOptions::default(),
            };
            if let Some(rounds) = cmd.rounds {
                options.max_rounds = rounds;
            }
            if let Some(fraction) = cmd.bin_fraction {
                options.bin_fraction = fraction;
            }
            if let Some(dist) = cmd.max_dist {
                options.max_dist = dist;
            }
            let cfg = ExtractConfig {
                edges: EdgeListConfig {
                    path: cmd.edges,
                    src_column: cmd.src_column,
                    dst_column: cmd.dst_column,
                    weight_column: cmd.weight_column,
                },
                options,
                out: cmd.out,
            };
            let summary = run_extract(&cfg)?;
            emit(cli.format, &summary, print_extract_text)?;
        }
    }
    Ok(())
}

fn emit<T, F>(format: OutputFormat, value: &T, printer: F) -> Result<(), Box<dyn Error>>
where
    T: serde::Serialize,
    F: Fn(&T),
{
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{json}");
        }
        OutputFormat::Text => printer(value),
    }
    Ok(())
}

fn print_extract_text(summary: &ExtractSummary) {
    println!(
        "Graph: nodes={} links={} weighted={}",
        summary.graph.nodes, summary.graph.links, summary.graph.weighted
    );
    for round in &summary.rounds {
        println!(
            "  round {}: generated={} kept={}",
            round.round, round.generated, round.kept
        );
    }
    println!(
        "Kept {} features in {:.2} ms",
        summary.features.len(),
        summary.duration_ms
    );
    if let Some(path) = &summary.out {
        println!("Feature table written to {}", path.display());
    }
}
