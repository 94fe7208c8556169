// gridplot CLI - load a CSV through the ingestion pipeline, then plot or export it

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use gridplot::data::{Extraction, IngestOptions, IngestSource, JobState, is_csv_file};
use gridplot::perf::{format_row_count, measure};
use gridplot::{AxisMode, AxisSpec, PlotKind, PlotSource, Selection, Settings, Workbench};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gridplot")]
#[command(about = "Load delimited text into a grid and extract plottable series")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract series and print them as JSON
    #[command(after_help = "\
Examples:
  gridplot plot sales.csv --column 2
  gridplot plot sales.csv --column 2 --x 0 --kind scatter
  gridplot plot sales.csv --row 4 --kind bar
  gridplot plot sales.csv --select 0:9:1:3 --kind bar")]
    Plot {
        #[command(flatten)]
        load: LoadArgs,

        /// Plot family (defaults to the configured one)
        #[arg(long, short = 'k')]
        kind: Option<KindArg>,

        /// Y column for a column plot
        #[arg(long, conflicts_with_all = ["row", "select"])]
        column: Option<usize>,

        /// X column for a column plot
        #[arg(long, default_value_t = 0, requires = "column")]
        x: usize,

        /// Row for a row plot
        #[arg(long, conflicts_with = "select")]
        row: Option<usize>,

        /// Selection as top:bottom:left:right (inclusive)
        #[arg(long, value_parser = parse_selection)]
        select: Option<Selection>,
    },

    /// Print the loaded grid as CSV
    Export {
        #[command(flatten)]
        load: LoadArgs,

        /// Output file (omit for stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// List index picker entries
    Choices {
        #[command(flatten)]
        load: LoadArgs,

        #[arg(long, value_enum, default_value = "column")]
        mode: ModeArg,
    },
}

#[derive(Args)]
struct LoadArgs {
    /// CSV file to load
    input: PathBuf,

    /// Treat the first row as data and synthesize "Col N" headers
    #[arg(long)]
    no_header: bool,

    /// Source encoding label (e.g. utf-8, latin1)
    #[arg(long)]
    encoding: Option<String>,

    /// Rows per ingestion chunk
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Settings file (defaults to the user config directory)
    #[arg(long)]
    settings: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Line,
    Scatter,
    Bar,
}

impl From<KindArg> for PlotKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Line => PlotKind::Line,
            KindArg::Scatter => PlotKind::Scatter,
            KindArg::Bar => PlotKind::Bar,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Column,
    Row,
}

fn parse_selection(s: &str) -> Result<Selection, String> {
    let parts: Vec<usize> = s
        .split(':')
        .map(|p| p.trim().parse::<usize>().map_err(|e| format!("'{}': {}", p, e)))
        .collect::<Result<_, _>>()?;
    match parts.as_slice() {
        [top, bottom, left, right] => Ok(Selection::new(*top, *bottom, *left, *right)),
        _ => Err("expected top:bottom:left:right".to_string()),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gridplot=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Settings from file, with command-line overrides applied
fn resolve_settings(load: &LoadArgs) -> Result<Settings> {
    let mut settings = match &load.settings {
        Some(path) => Settings::load_from(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?,
        None => Settings::load(),
    };
    if load.no_header {
        settings.ingest.has_header = false;
    }
    if let Some(encoding) = &load.encoding {
        settings.ingest.encoding = encoding.clone();
    }
    if let Some(chunk_size) = load.chunk_size {
        settings.ingest.chunk_size = chunk_size;
    }
    Ok(settings)
}

fn load_workbench(load: &LoadArgs) -> Result<Workbench> {
    let settings = resolve_settings(load)?;
    if !is_csv_file(&load.input) {
        warn!(path = %load.input.display(), "Input does not look like a CSV file");
    }

    let options: IngestOptions = settings.ingest.clone();
    let mut bench = Workbench::new(settings);
    bench
        .load_with(IngestSource::Path(load.input.clone()), &options)
        .with_context(|| format!("Failed to start loading {}", load.input.display()))?;

    let (state, elapsed_ms) = measure(|| bench.finish_load());
    match state {
        JobState::Completed => {
            info!(
                rows = %format_row_count(bench.store().row_count()),
                columns = bench.store().column_count(),
                elapsed_ms = format!("{:.1}", elapsed_ms),
                "Loaded {}",
                load.input.display()
            );
            Ok(bench)
        }
        JobState::Failed(reason) => bail!("Failed to load {}: {}", load.input.display(), reason),
        other => bail!("Load of {} ended as {}", load.input.display(), other.label()),
    }
}

fn cmd_plot(
    load: LoadArgs,
    kind: Option<KindArg>,
    column: Option<usize>,
    x: usize,
    row: Option<usize>,
    select: Option<Selection>,
) -> Result<()> {
    let bench = load_workbench(&load)?;
    let kind = kind.map(PlotKind::from).unwrap_or(bench.settings().plot.default_kind);

    let source = match (column, row, select) {
        (Some(y_column), _, _) => PlotSource::Axis(AxisSpec::Column { x_column: x, y_column }),
        (_, Some(row), _) => PlotSource::Axis(AxisSpec::Row { row }),
        (_, _, selection) => PlotSource::Selection(selection),
    };

    let extraction = bench.plot(kind, source).context("Series extraction failed")?;
    let output = match &extraction {
        Extraction::Series(set) if kind == PlotKind::Bar => serde_json::json!({
            "extraction": extraction,
            "value_range": set.value_range(),
            "bar_layout": bench.bar_layout(set),
        }),
        Extraction::Series(set) => serde_json::json!({
            "extraction": extraction,
            "value_range": set.value_range(),
        }),
        _ => serde_json::json!({ "extraction": extraction }),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn cmd_export(load: LoadArgs, output: Option<PathBuf>) -> Result<()> {
    let bench = load_workbench(&load)?;
    match output {
        Some(path) => bench
            .export_csv_file(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => print!("{}", bench.export_csv()?),
    }
    Ok(())
}

fn cmd_choices(load: LoadArgs, mode: ModeArg) -> Result<()> {
    let bench = load_workbench(&load)?;
    let mode = match mode {
        ModeArg::Column => AxisMode::Column,
        ModeArg::Row => AxisMode::Row,
    };
    for (i, choice) in bench.index_choices(mode, None).iter().enumerate() {
        println!("{}\t{}", i, choice);
    }
    Ok(())
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Plot {
            load,
            kind,
            column,
            x,
            row,
            select,
        } => cmd_plot(load, kind, column, x, row, select),
        Commands::Export { load, output } => cmd_export(load, output),
        Commands::Choices { load, mode } => cmd_choices(load, mode),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
