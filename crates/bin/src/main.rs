//! Hanover CLI binary.
//!
//! Provides command-line interface for Fama-French portfolio sorts and factors.

mod integration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use hanover::{CachePolicy, Engine, EngineConfig};
use hanover_characteristics::available_characteristics;
use hanover_data::reference::KenFrenchLibrary;
use hanover_data::{CsvDirectorySource, DateRange, Frequency, TimeSeriesTable};
use hanover_factors::{FactorName, available_factors};
use hanover_output::{DEFAULT_PERCENTILES, ExportFormat, Exporter, SummaryTable, compare_tables};
use hanover_portfolios::Weighting;
use indicatif::{ProgressBar, ProgressStyle};
use integration::args::{parse_factors, parse_range, parse_sort};
use integration::cache_manager::{default_cache_path, open_cache};
use serde_json::json;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

type CliResult<T = ()> = Result<T, Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "hanover")]
#[command(about = "Hanover: Fama-French portfolio sorts and factors", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory holding the feed CSV files
    #[arg(long, global = true, default_value = "data")]
    data_dir: PathBuf,

    /// Engine configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Panel cache database (defaults to the platform cache directory)
    #[arg(long, global = true)]
    cache_path: Option<PathBuf>,

    /// Disable the panel cache
    #[arg(long, global = true)]
    no_cache: bool,

    /// Reload panels from the data source
    #[arg(long, global = true)]
    refresh: bool,

    /// Recompute rolling regressions and sorts
    #[arg(long, global = true)]
    reestimate: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Date range and output frequency of a request.
#[derive(Args)]
struct Window {
    /// First date (YYYY-MM-DD)
    #[arg(long)]
    start: String,

    /// Last date (YYYY-MM-DD)
    #[arg(long)]
    end: String,

    /// Output frequency: D, W, M, Q or A
    #[arg(long, default_value = "M")]
    frequency: String,
}

/// Where results go.
#[derive(Args)]
struct Output {
    /// Write to a file; the format follows the extension
    #[arg(long)]
    output: Option<PathBuf>,

    /// Format for standard output: csv, json or pretty
    #[arg(long, default_value = "csv")]
    format: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum Measure {
    /// Portfolio returns
    Returns,
    /// Number of firms
    Counts,
    /// Average sort characteristics
    Characteristics,
}

#[derive(Subcommand)]
enum Commands {
    /// Sort firms into portfolios
    Portfolios {
        #[command(flatten)]
        window: Window,

        /// Sort dimensions, e.g. ME:2,BM:3
        #[arg(long)]
        sort: String,

        /// Weighting: vw or ew
        #[arg(long, default_value = "vw")]
        weighting: String,

        /// What to report per portfolio
        #[arg(long, value_enum, default_value_t = Measure::Returns)]
        measure: Measure,

        #[command(flatten)]
        output: Output,
    },

    /// Build factor returns
    Factors {
        #[command(flatten)]
        window: Window,

        /// Factor codes
        #[arg(long, default_value = "MKT-RF,SMB,HML")]
        factors: String,

        #[command(flatten)]
        output: Output,
    },

    /// Show breakpoints of a sort
    Breakpoints {
        /// First date (YYYY-MM-DD)
        #[arg(long)]
        start: String,

        /// Last date (YYYY-MM-DD)
        #[arg(long)]
        end: String,

        /// Sort dimensions, e.g. ME:2,BM:3
        #[arg(long)]
        sort: String,

        #[command(flatten)]
        output: Output,
    },

    /// Summary statistics of factor returns
    Stats {
        #[command(flatten)]
        window: Window,

        /// Factor codes
        #[arg(long, default_value = "MKT-RF,SMB,HML")]
        factors: String,

        /// Render as Markdown
        #[arg(long)]
        markdown: bool,
    },

    /// Compare factors with a published reference dataset
    Compare {
        #[command(flatten)]
        window: Window,

        /// Factor codes
        #[arg(long, default_value = "MKT-RF,SMB,HML")]
        factors: String,

        /// Directory of unzipped reference CSV files
        #[arg(long)]
        reference_dir: PathBuf,

        /// Reference dataset name
        #[arg(long, default_value = "F-F_Research_Data_Factors")]
        dataset: String,
    },

    /// List factors and characteristics
    List {
        /// Output format (json or text)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Manage the panel cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show cached entries per feed
    Info,
    /// Remove every cached panel
    Clear,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> CliResult {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Portfolios {
            window,
            sort,
            weighting,
            measure,
            output,
        } => portfolios(&cli, window, sort, weighting, *measure, output),
        Commands::Factors {
            window,
            factors,
            output,
        } => {
            let (table, _) = compute_factors(&cli, window, factors)?;
            emit(&table, output)
        }
        Commands::Breakpoints {
            start,
            end,
            sort,
            output,
        } => breakpoints(&cli, start, end, sort, output),
        Commands::Stats {
            window,
            factors,
            markdown,
        } => {
            let (table, _) = compute_factors(&cli, window, factors)?;
            let summary = SummaryTable::from_table(&table, &DEFAULT_PERCENTILES);
            if *markdown {
                println!("{}", summary.to_markdown());
            } else {
                println!("{}", summary.to_ascii_table());
            }
            Ok(())
        }
        Commands::Compare {
            window,
            factors,
            reference_dir,
            dataset,
        } => compare(&cli, window, factors, reference_dir, dataset),
        Commands::List { format } => {
            list(format);
            Ok(())
        }
        Commands::Cache { action } => cache(&cli, action),
    }
}

fn open_engine(cli: &Cli) -> CliResult<Engine<CsvDirectorySource>> {
    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    let engine = Engine::new(CsvDirectorySource::new(&cli.data_dir), config);
    if cli.no_cache {
        return Ok(engine);
    }
    Ok(engine.with_cache(open_cache(cli.cache_path.as_deref())?))
}

const fn policy(cli: &Cli) -> CachePolicy {
    CachePolicy {
        requery: cli.refresh,
        reestimate: cli.reestimate,
    }
}

fn spinner(message: &str) -> CliResult<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(message.to_string());
    Ok(pb)
}

fn window_args(window: &Window) -> CliResult<(DateRange, Frequency)> {
    let range = parse_range(&window.start, &window.end)?;
    let frequency = window.frequency.parse::<Frequency>()?;
    Ok((range, frequency))
}

fn emit<T: Exporter>(value: &T, output: &Output) -> CliResult {
    match &output.output {
        Some(path) => {
            value.export_to_file(path, ExportFormat::from_path(path))?;
            println!("Wrote {}", path.display());
        }
        None => {
            let format = output.format.parse::<ExportFormat>()?;
            print!("{}", value.export_to_string(format)?);
        }
    }
    Ok(())
}

/// `results.csv` becomes `results_BM.csv`.
fn suffixed(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}_{suffix}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{suffix}"),
    };
    path.with_file_name(name)
}

fn portfolios(
    cli: &Cli,
    window: &Window,
    sort: &str,
    weighting: &str,
    measure: Measure,
    output: &Output,
) -> CliResult {
    let (range, frequency) = window_args(window)?;
    let sort = parse_sort(sort)?;
    let weighting = weighting.parse::<Weighting>()?;
    let mut engine = open_engine(cli)?;

    let pb = spinner(&format!("Sorting {sort} ({weighting}) over {range}..."))?;
    match measure {
        Measure::Returns => {
            let table = engine.portfolio_returns(&sort, weighting, frequency, &range, policy(cli))?;
            pb.finish_with_message(format!("{} periods", table.len()));
            emit(&table, output)?;
        }
        Measure::Counts => {
            let table = engine.firm_counts(&sort, frequency, &range, policy(cli))?;
            pb.finish_with_message(format!("{} periods", table.len()));
            emit(&table, output)?;
        }
        Measure::Characteristics => {
            let tables = engine.characteristics(&sort, weighting, frequency, &range, policy(cli))?;
            pb.finish_with_message(format!("{} characteristics", tables.len()));
            for (characteristic, table) in &tables {
                match &output.output {
                    Some(path) => {
                        let path = suffixed(path, &characteristic.to_string());
                        table.export_to_file(&path, ExportFormat::from_path(&path))?;
                        println!("Wrote {}", path.display());
                    }
                    None => {
                        println!("# {characteristic}");
                        emit(table, output)?;
                    }
                }
            }
        }
    }
    engine.close();
    Ok(())
}

fn compute_factors(
    cli: &Cli,
    window: &Window,
    factors: &str,
) -> CliResult<(TimeSeriesTable, Engine<CsvDirectorySource>)> {
    let (range, frequency) = window_args(window)?;
    let names = parse_factors(factors)?;
    let mut engine = open_engine(cli)?;

    let codes: Vec<&str> = names.iter().map(FactorName::code).collect();
    let pb = spinner(&format!("Building {} over {range}...", codes.join(", ")))?;
    match engine.factors(&names, frequency, &range, policy(cli)) {
        Ok(table) => {
            pb.finish_with_message(format!("{} periods", table.len()));
            Ok((table, engine))
        }
        Err(e) => {
            pb.finish_with_message("Failed!");
            Err(e.into())
        }
    }
}

fn breakpoints(cli: &Cli, start: &str, end: &str, sort: &str, output: &Output) -> CliResult {
    let range = parse_range(start, end)?;
    let sort = parse_sort(sort)?;
    let mut engine = open_engine(cli)?;

    let pb = spinner(&format!("Computing breakpoints of {sort}..."))?;
    let sets = engine.breakpoints(&sort, &range, policy(cli))?;
    pb.finish_with_message(format!("{} breakpoint sets", sets.len()));
    emit(&sets, output)
}

fn compare(
    cli: &Cli,
    window: &Window,
    factors: &str,
    reference_dir: &Path,
    dataset: &str,
) -> CliResult {
    let (ours, engine) = compute_factors(cli, window, factors)?;
    let (range, frequency) = window_args(window)?;

    let library = KenFrenchLibrary::new(reference_dir);
    let reference = engine.reference_table(&library, dataset, frequency, &range)?;
    // published headers such as "Mkt-RF" map onto factor codes
    let columns = reference
        .columns()
        .iter()
        .map(|c| {
            c.parse::<FactorName>()
                .map_or_else(|_| c.clone(), |f| f.code().to_string())
        })
        .collect();
    let reference = reference.with_columns(columns)?;

    let report = compare_tables(&ours, &reference)?;
    println!("{report}");
    Ok(())
}

fn list(format: &str) {
    let factors = available_factors();
    let characteristics = available_characteristics();

    if format == "json" {
        let output = json!({
            "factors": factors.iter().map(|f| json!({
                "code": f.name.code(),
                "category": format!("{:?}", f.category),
                "sort": f.sort.map(|c| c.to_string()),
                "description": f.description,
            })).collect::<Vec<_>>(),
            "characteristics": characteristics.iter().map(|c| json!({
                "code": c.characteristic.code(),
                "refresh": format!("{:?}", c.refresh),
                "description": c.description,
                "inputs": c.required_inputs,
            })).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
        return;
    }

    println!("Factors:");
    println!("========\n");
    for f in &factors {
        let category = format!("{:?}", f.category);
        println!("  {:8} {category:14} {}", f.name.code(), f.description);
    }
    println!("\nCharacteristics:");
    println!("================\n");
    for c in &characteristics {
        let refresh = format!("{:?}", c.refresh);
        println!("  {:12} {refresh:9} {}", c.characteristic.code(), c.description);
        println!("  {:12} {:9} inputs: {}", "", "", c.required_inputs.join(", "));
    }
}

fn cache(cli: &Cli, action: &CacheAction) -> CliResult {
    let path = cli.cache_path.clone().unwrap_or_else(default_cache_path);
    let cache = open_cache(Some(path.as_path()))?;
    match action {
        CacheAction::Info => {
            let stats = cache.get_stats()?;
            println!("Cache: {}", path.display());
            for feed in &stats.feeds {
                println!("  {:20} {:5} entries {:10} bytes", feed.feed, feed.entries, feed.bytes);
            }
            println!(
                "  {:20} {:5} entries {:10} bytes",
                "total",
                stats.total_entries(),
                stats.total_bytes()
            );
        }
        CacheAction::Clear => {
            cache.clear_all()?;
            println!("Cleared {}", path.display());
        }
    }
    Ok(())
}
