//! GridSweep CLI - distribution network energization sweep from the command line.

use clap::{Args, Parser, Subcommand, ValueEnum};
use gridsweep::{
    report, GridSweepCore, GridSweepError, LoaderOptions, NetworkDataset, SweepOptions, SweepResult,
};
use std::path::{Path, PathBuf};
use std::process;
use tracing::Level;

#[derive(Parser)]
#[command(name = "gridsweep")]
#[command(about = "Energization sweep and ring-closure analysis for distribution networks", long_about = None)]
#[command(version)]
struct Cli {
    /// Show debug logging on stderr
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sweep every circuit of a dataset directory
    Sweep {
        /// Directory holding circuits.csv, switching_elements.csv, lines.csv and transformers.csv
        #[arg(value_name = "DIR", default_value = ".")]
        dir: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,

        /// Write the CSV result tables into this directory
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Write one Graphviz DOT hierarchy per circuit into this directory
        #[arg(long, value_name = "DIR")]
        graphs: Option<PathBuf>,

        /// Exit with error code if any open tie has no ring closure
        #[arg(long)]
        fail_on_unresolved: bool,

        #[command(flatten)]
        sweep: SweepArgs,

        #[command(flatten)]
        input: InputArgs,
    },

    /// List the circuits of a dataset and whether each has a breaker
    Circuits {
        /// Dataset directory
        #[arg(value_name = "DIR", default_value = ".")]
        dir: PathBuf,

        #[command(flatten)]
        input: InputArgs,
    },
}

#[derive(Args)]
struct SweepArgs {
    /// JSON file with sweep options
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Maximum nodes expanded per ring search
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    max_ring_steps: Option<u64>,

    /// Skip the ring-closure search
    #[arg(long)]
    no_ring_search: bool,

    /// Keep duplicate result rows
    #[arg(long)]
    no_dedupe: bool,
}

#[derive(Args)]
struct InputArgs {
    /// Field delimiter of the input and exported CSV files
    #[arg(short, long, default_value_t = ';')]
    delimiter: char,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
    /// Switching-element table as CSV
    Csv,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let exit_code = match cli.command {
        Commands::Sweep {
            dir,
            format,
            output,
            graphs,
            fail_on_unresolved,
            sweep,
            input,
        } => handle_sweep(
            &dir,
            format,
            output.as_deref(),
            graphs.as_deref(),
            fail_on_unresolved,
            &sweep,
            &input,
        ),
        Commands::Circuits { dir, input } => handle_circuits(&dir, &input),
    };

    process::exit(exit_code);
}

fn init_tracing(verbose: bool, quiet: bool) {
    let level = if verbose {
        Level::DEBUG
    } else if quiet {
        Level::ERROR
    } else {
        Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn loader_options(input: &InputArgs) -> Result<LoaderOptions, GridSweepError> {
    if !input.delimiter.is_ascii() {
        return Err(GridSweepError::Config(format!(
            "delimiter must be a single ASCII character, got '{}'",
            input.delimiter
        )));
    }
    Ok(LoaderOptions {
        delimiter: input.delimiter as u8,
        ..Default::default()
    })
}

/// Options file first, then command-line overrides
fn sweep_options(args: &SweepArgs) -> Result<SweepOptions, GridSweepError> {
    let mut options = match &args.config {
        Some(path) => SweepOptions::from_json_file(path)?,
        None => SweepOptions::default(),
    };
    if let Some(steps) = args.max_ring_steps {
        options.max_ring_steps = usize::try_from(steps)
            .map_err(|_| GridSweepError::Config(format!("max-ring-steps out of range: {}", steps)))?;
    }
    if args.no_ring_search {
        options.ring_search = false;
    }
    if args.no_dedupe {
        options.deduplicate = false;
    }
    Ok(options)
}

fn handle_sweep(
    dir: &Path,
    format: OutputFormat,
    output: Option<&Path>,
    graphs: Option<&Path>,
    fail_on_unresolved: bool,
    sweep: &SweepArgs,
    input: &InputArgs,
) -> i32 {
    let run = || -> Result<SweepResult, GridSweepError> {
        let loader = loader_options(input)?;
        let options = sweep_options(sweep)?;
        let (_, result) = GridSweepCore::sweep_directory(dir, &loader, &options)?;

        output_result(&result, &format, loader.delimiter)?;
        if let Some(out) = output {
            let written = report::write_csv_tables(&result, out, loader.delimiter)?;
            tracing::info!("Wrote {} tables to {}", written.len(), out.display());
        }
        if let Some(graph_dir) = graphs {
            let written = report::write_hierarchy_graphs(&result, graph_dir)?;
            tracing::info!("Wrote {} hierarchy graphs to {}", written.len(), graph_dir.display());
        }
        Ok(result)
    };

    match run() {
        Ok(result) => {
            if fail_on_unresolved && result.unresolved_ties() > 0 {
                eprintln!("{} open ties without ring closure", result.unresolved_ties());
                return 1;
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn output_result(result: &SweepResult, format: &OutputFormat, delimiter: u8) -> Result<(), GridSweepError> {
    match format {
        OutputFormat::Human => {
            output_human(result);
            Ok(())
        }
        OutputFormat::Json => {
            println!("{}", report::to_json(result)?);
            Ok(())
        }
        OutputFormat::Csv => report::write_switching_elements(result, std::io::stdout().lock(), delimiter),
    }
}

fn output_human(result: &SweepResult) {
    for summary in &result.summaries {
        println!("\nCircuit: {}", summary.circuit);
        println!("{}", "─".repeat(60));

        if !summary.breaker_found {
            println!("  Breaker not found, circuit not swept");
            continue;
        }

        for row in result.switching_elements_for(&summary.circuit) {
            let depth = row.upstream_path.len().saturating_sub(1);
            let marker = if row.is_root() {
                "breaker".to_string()
            } else {
                row.effective_state.as_str().to_lowercase()
            };
            println!(
                "  {}{} [{}] ({})",
                "  ".repeat(depth),
                row.element.operational_code,
                row.element.id,
                marker
            );
            if let Some(node) = &row.unexplored_ring_node {
                match &row.ring_closure {
                    Some(closure) => println!(
                        "  {}  {} ring via {} -> {} [{}] of {}",
                        "  ".repeat(depth),
                        closure.kind.as_str(),
                        node,
                        closure.equipment_code,
                        closure.equipment_id,
                        closure.circuit
                    ),
                    None => println!("  {}  no closure behind {}", "  ".repeat(depth), node),
                }
            }
        }
    }

    println!("\n{}", report::summary_table(result));
}

fn handle_circuits(dir: &Path, input: &InputArgs) -> i32 {
    let dataset = match loader_options(input).and_then(|loader| gridsweep::load_dataset(dir, &loader)) {
        Ok(dataset) => dataset,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    print_circuits(&dataset);
    0
}

fn print_circuits(dataset: &NetworkDataset) {
    println!("Circuits:\n");
    for circuit in &dataset.circuits {
        match dataset.breaker_for(&circuit.name) {
            Some((_, breaker)) => println!("  {}  breaker {} ({})", circuit.name, breaker.id, breaker.element_type),
            None => println!("  {}  no breaker", circuit.name),
        }
    }
}
