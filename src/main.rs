use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use shelfmark::models::EntityKind;
use shelfmark::normalize::{self, DomainPlan, DomainReport};
use shelfmark::pipeline::{self, ExtractConfig};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "shelfmark")]
#[command(about = "Flatten bibliographic dumps into loadable tables and dictionary-encode repeated values")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract scalar and relation tables from a dump
    Extract(ExtractArgs),
    /// Dictionary-encode relation files for every configured value domain
    Normalize(NormalizeArgs),
    /// Build one dictionary from explicit relation files and rewrite them
    Dictionary(DictionaryArgs),
}

#[derive(Args)]
struct ExtractArgs {
    /// Path to the dump (.txt or .bz2, `-` for stdin)
    #[arg(short, long)]
    input: String,

    /// Output directory for generated files
    #[arg(short, long)]
    output: PathBuf,

    /// Entity kinds to extract
    #[arg(long, value_delimiter = ',', default_value = "edition,author,work")]
    kinds: Vec<EntityKind>,

    /// Limit number of input lines to process (for testing)
    #[arg(long)]
    limit: Option<u64>,

    /// Treat the input as bzip2-compressed regardless of its extension
    #[arg(long)]
    bz2: bool,
}

#[derive(Args)]
struct NormalizeArgs {
    /// Directory holding the extracted relation files
    #[arg(short, long)]
    output: PathBuf,

    /// JSON file with domain plans, replacing the built-in domains
    #[arg(long)]
    plan: Option<PathBuf>,

    /// Only normalize the named domains
    #[arg(long = "domain")]
    domains: Vec<String>,

    /// Number of domains to normalize concurrently
    #[arg(long, default_value_t = 1)]
    jobs: usize,
}

#[derive(Args)]
struct DictionaryArgs {
    /// Key table to write
    #[arg(long)]
    key_table: PathBuf,

    /// Two-column relation files sharing one value domain, scanned in the given order
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

fn run_extract(args: ExtractArgs) -> Result<()> {
    let config = ExtractConfig {
        input: args.input,
        output_dir: args.output,
        kinds: args.kinds,
        limit: args.limit,
        bz2: args.bz2,
    };

    let start = Instant::now();
    let summary = pipeline::run_extraction(&config)?;
    let duration = start.elapsed();
    let stats = &summary.stats;

    println!();
    println!("=== Summary ===");
    println!("Extraction time:    {:.2}s", duration.as_secs_f64());
    println!("Lines read:         {}", stats.lines_read);
    println!("Editions:           {}", stats.editions);
    println!("Authors:            {}", stats.authors);
    println!("Works:              {}", stats.works);
    println!("Relation rows:      {}", stats.relation_rows);
    println!("Field errors:       {}", stats.field_errors);
    println!("Unresolved values:  {}", stats.unresolved_elements);
    println!("Lines skipped:      {}", stats.skipped());
    println!("  malformed:        {}", stats.malformed());
    println!("  invalid JSON:     {}", stats.skipped_invalid_json);
    println!("  invalid id:       {}", stats.skipped_invalid_id);
    println!("Lossy UTF-8 lines:  {}", stats.lossy_lines);
    println!("Files written:      {}", summary.files.len());

    Ok(())
}

fn select_plans(plans: Vec<DomainPlan>, names: &[String]) -> Result<Vec<DomainPlan>> {
    if names.is_empty() {
        return Ok(plans);
    }
    for name in names {
        if !plans.iter().any(|p| &p.name == name) {
            bail!("Unknown normalization domain: {}", name);
        }
    }
    Ok(plans
        .into_iter()
        .filter(|p| names.contains(&p.name))
        .collect())
}

fn print_reports(reports: &[DomainReport]) {
    println!();
    println!("=== Summary ===");
    for report in reports {
        println!(
            "{:<20} {:>10} values {:>12} rows {:>8} missing",
            report.domain,
            report.distinct_values,
            report.rows_written(),
            report.missing()
        );
    }
}

fn run_normalize(args: NormalizeArgs) -> Result<()> {
    let plans = match &args.plan {
        Some(path) => normalize::load_plans(path)?,
        None => normalize::default_plans(),
    };
    let plans = select_plans(plans, &args.domains)?;

    let start = Instant::now();
    let reports = normalize::normalize_all(&plans, &args.output, args.jobs)?;
    info!(
        domains = reports.len(),
        duration_secs = start.elapsed().as_secs_f64(),
        "Normalization complete"
    );

    print_reports(&reports);
    Ok(())
}

fn run_dictionary(args: DictionaryArgs) -> Result<()> {
    let name = args
        .key_table
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .context("Key table path has no file name")?;
    let plan = DomainPlan {
        name,
        key_table: args.key_table,
        inputs: args.files,
    };

    let report = normalize::normalize_listed(&plan, Path::new("."))?;
    print_reports(&[report]);
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    let result = match cli.command {
        Commands::Extract(args) => run_extract(args),
        Commands::Normalize(args) => run_normalize(args),
        Commands::Dictionary(args) => run_dictionary(args),
    };

    match result {
        Ok(()) => {
            info!("Completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Error: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
