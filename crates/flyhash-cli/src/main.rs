//! flyhash-search CLI: Bayesian hyperparameter search for fly hashing.

mod error;

use clap::Parser;
use colored::Colorize;
use error::{CliError, Result};
use flyhash::automl::{SearchController, SearchReport};
use flyhash::classification::SoftmaxRegression;
use flyhash::config::{run_timestamp, SearchConfig};
use flyhash::data::{Dataset, DatasetSplits};
use flyhash::encode::FlyHashEncoder;
use flyhash::projection::ProjectionStrategy;
use flyhash::trial::TrialEvaluator;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "flyhash-search")]
#[command(about = "Search fruit-fly hashing hyperparameters for a text classifier")]
#[command(version)]
struct Cli {
    /// Dataset to run on (wiki, 20news, wos, reuters)
    #[arg(short, long)]
    dataset: Dataset,

    /// Observation log of a previous run to resume from
    #[arg(long)]
    continue_log: Option<PathBuf>,

    /// TOML search configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the prepared corpora
    #[arg(long)]
    data_root: Option<PathBuf>,

    /// Directory holding the sentencepiece vocabularies
    #[arg(long)]
    spm_root: Option<PathBuf>,

    /// Directory for result and observation logs
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Directory for best-model artifacts
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Random exploration points
    #[arg(long)]
    init_points: Option<usize>,

    /// Optimizer-guided points
    #[arg(long)]
    n_iter: Option<usize>,

    /// Projection strategy (0-3)
    #[arg(long)]
    strategy: Option<u8>,

    /// Trial worker threads (default: 20% of the CPUs)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", "Error:".red().bold());
            e.exit_code()
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// File config (or defaults) with command-line overrides applied.
fn load_config(cli: &Cli) -> Result<SearchConfig> {
    let mut config = match &cli.config {
        Some(path) if !path.exists() => return Err(CliError::FileNotFound(path.clone())),
        Some(path) => SearchConfig::from_file(path)?,
        None => SearchConfig::default(),
    };

    if let Some(dir) = &cli.data_root {
        config.data_root.clone_from(dir);
    }
    if let Some(dir) = &cli.spm_root {
        config.spm_root.clone_from(dir);
    }
    if let Some(dir) = &cli.log_dir {
        config.log_dir.clone_from(dir);
    }
    if let Some(dir) = &cli.model_dir {
        config.model_dir.clone_from(dir);
    }
    if let Some(n) = cli.init_points {
        config.init_points = n;
    }
    if let Some(n) = cli.n_iter {
        config.n_iter = n;
    }
    if let Some(selector) = cli.strategy {
        config.projection_strategy = ProjectionStrategy::from_index(selector)?;
    }
    if cli.workers.is_some() {
        config.workers = cli.workers;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    config.validate()?;
    Ok(config)
}

fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    if let Some(prior) = &cli.continue_log {
        if !prior.exists() {
            return Err(CliError::FileNotFound(prior.clone()));
        }
    }

    let timestamp = run_timestamp();
    let paths = config.run_paths(cli.dataset.name(), &timestamp);

    println!("{}", "Fly Hash Search".bold());
    println!("===============");
    println!("Dataset:      {}", cli.dataset.name());
    println!("Strategy:     {}", config.projection_strategy.index());
    println!(
        "Budget:       {} random + {} guided",
        config.init_points, config.n_iter
    );
    println!("Workers:      {}", config.worker_count());
    println!();

    let started = Instant::now();
    let splits = DatasetSplits::load(cli.dataset, &config.data_root, &config.spm_root)?;
    println!(
        "  Loaded: {} train / {} val documents, {} classes, PN_SIZE {}",
        splits.train.labels.len(),
        splits.val.labels.len(),
        splits.classes.len(),
        splits.pn_size
    );

    let mut evaluator = TrialEvaluator::from_config(
        &config,
        &paths,
        splits,
        FlyHashEncoder,
        SoftmaxRegression::new(),
    )?;
    let mut controller = SearchController::from_config(&config, &paths)?;
    if let Some(prior) = &cli.continue_log {
        let loaded = controller.load_prior(prior)?;
        println!("  Resumed: {loaded} prior observations");
    }

    info!(run_log = %paths.temp_log.display(), "starting search");
    let report = controller.run(&mut evaluator)?;
    print_report(&report, started.elapsed().as_secs_f64());
    Ok(())
}

fn print_report(report: &SearchReport, secs: f64) {
    println!();
    println!("{}", "Search Complete".green().bold());
    println!("===============");
    println!("Evaluated:    {}", report.evaluated);
    if report.prior_observations > 0 {
        println!("Prior:        {}", report.prior_observations);
    }
    match &report.best {
        Some(best) => {
            println!("Best score:   {:.4}", best.target);
            println!(
                "Best point:   KC_size={} proj_size={} topword={} C={:.4}",
                best.point.kc_size, best.point.proj_size, best.point.top_word, best.point.c
            );
        }
        None => println!("Best score:   {}", "none".yellow()),
    }
    if let Some(artifact) = &report.best_artifact {
        println!("Best model:   {}", artifact.display());
    }
    println!("Master log:   {}", report.master_log.display());
    println!("Elapsed:      {secs:.1}s");
}
