use anyhow::{bail, Context};
use carbonmatch::{
    build_index_from_csv, evaluate, open_matcher, BatchOptions, CatalogColumns, HashingEmbedder,
    LexicalMetric, MatcherConfig,
};
use carbonmatch_similarity::DEFAULT_EMBEDDING_DIM;
use carbonmatch_storage::{load_product_names, load_results, save_results};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Match free-text product names to a catalog and its carbon ratings
#[derive(Parser, Debug)]
#[command(name = "carbonmatch")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clean, embed and index a catalog CSV
    Build(BuildArgs),
    /// Match every product name in an input CSV
    Match(MatchArgs),
    /// Compare a results CSV against ground truth
    Evaluate(EvaluateArgs),
}

#[derive(Args, Debug)]
struct BuildArgs {
    /// Catalog CSV with name, text and rating columns
    #[arg(long)]
    catalog: PathBuf,

    /// Directory the index artifacts are written to
    #[arg(long)]
    index_dir: PathBuf,

    #[arg(long, default_value = "name")]
    name_column: String,

    #[arg(long, default_value = "clean name")]
    text_column: String,

    #[arg(long, default_value = "carbon_rating")]
    rating_column: String,

    /// Embedding dimension
    #[arg(long, default_value_t = DEFAULT_EMBEDDING_DIM)]
    dim: usize,

    /// Strings per embedding call
    #[arg(long, default_value_t = 64)]
    batch_size: usize,
}

#[derive(Args, Debug)]
struct MatchArgs {
    /// CSV with the product names to match
    #[arg(long)]
    input: PathBuf,

    /// Directory written by `build`
    #[arg(long)]
    index_dir: PathBuf,

    /// Results CSV
    #[arg(long)]
    output: PathBuf,

    #[arg(long, default_value = "product_name")]
    input_column: String,

    /// Candidates retrieved before reranking
    #[arg(long, default_value_t = 10)]
    top_k: usize,

    /// Semantic weight in [0, 1]; 1.0 disables lexical reranking
    #[arg(long, default_value_t = 0.6)]
    alpha: f32,

    /// Lexical metric: token_sort or trigram
    #[arg(long, default_value = "token_sort")]
    lexical: LexicalMetric,

    /// Per-item time budget in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
}

#[derive(Args, Debug)]
struct EvaluateArgs {
    #[arg(long)]
    ground_truth: PathBuf,

    /// Results CSV written by `match`
    #[arg(long)]
    output: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Command::Build(args) => run_build(args),
        Command::Match(args) => run_match(args),
        Command::Evaluate(args) => run_evaluate(args),
    }
}

fn run_build(args: BuildArgs) -> anyhow::Result<()> {
    require_file(&args.catalog, "catalog")?;

    let columns = CatalogColumns {
        name: args.name_column,
        text: args.text_column,
        rating: args.rating_column,
    };
    let provider = HashingEmbedder::new(args.dim).context("invalid embedding dimension")?;
    let config = MatcherConfig {
        batch_size: args.batch_size,
        ..MatcherConfig::default()
    };

    let started = Instant::now();
    let (_, manifest) =
        build_index_from_csv(&args.catalog, &columns, provider, config, &args.index_dir)
            .with_context(|| format!("failed to build index from {}", args.catalog.display()))?;

    println!(
        "Indexed {} catalog rows ({} dims) into {} in {:.2}s",
        manifest.rows,
        manifest.dim,
        args.index_dir.display(),
        started.elapsed().as_secs_f64()
    );
    Ok(())
}

fn run_match(args: MatchArgs) -> anyhow::Result<()> {
    require_file(&args.input, "input")?;
    if !args.index_dir.is_dir() {
        bail!("index directory {} does not exist; run `build` first", args.index_dir.display());
    }

    let total = Instant::now();
    let config = MatcherConfig {
        top_k: args.top_k,
        alpha: args.alpha,
        lexical: args.lexical,
        ..MatcherConfig::default()
    };

    let started = Instant::now();
    let manifest = carbonmatch::ArtifactStore::new(&args.index_dir)
        .manifest()
        .with_context(|| format!("failed to read index in {}", args.index_dir.display()))?;
    let provider = HashingEmbedder::new(manifest.dim).context("invalid index dimension")?;
    let matcher = open_matcher(&args.index_dir, provider, config)
        .with_context(|| format!("failed to load index from {}", args.index_dir.display()))?;
    let load_time = started.elapsed();

    let started = Instant::now();
    let inputs = load_product_names(&args.input, &args.input_column)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let input_time = started.elapsed();
    info!(inputs = inputs.len(), "matching");

    let options = BatchOptions {
        item_timeout: args.timeout_ms.map(Duration::from_millis),
    };
    let report = matcher.match_batch(&inputs, options);
    let results: Vec<_> = report.matched().cloned().collect();

    let started = Instant::now();
    save_results(&args.output, &results)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    let write_time = started.elapsed();

    println!("Matched {}/{} products", report.success_count(), report.items.len());
    if report.failure_count() > 0 {
        println!("Skipped {} products (see log)", report.failure_count());
    }
    println!("Time taken to load index: {:.4}s", load_time.as_secs_f64());
    println!("Time taken to read input: {:.4}s", input_time.as_secs_f64());
    println!("Time taken to match: {:.4}s", report.elapsed.as_secs_f64());
    println!("Time taken to write output: {:.4}s", write_time.as_secs_f64());
    println!(
        "Average time per product: {:.4}s",
        report.mean_latency().as_secs_f64()
    );
    println!("Total time: {:.4}s", total.elapsed().as_secs_f64());
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> anyhow::Result<()> {
    require_file(&args.ground_truth, "ground truth")?;
    require_file(&args.output, "output")?;

    let truth = load_results(&args.ground_truth)
        .with_context(|| format!("failed to read {}", args.ground_truth.display()))?;
    let output = load_results(&args.output)
        .with_context(|| format!("failed to read {}", args.output.display()))?;

    let evaluation = evaluate(&truth, &output).context("evaluation failed")?;
    if evaluation.missing > 0 {
        info!(missing = evaluation.missing, "ground-truth inputs absent from output");
    }
    println!("Accuracy: {:.2}%", evaluation.accuracy());
    Ok(())
}

fn require_file(path: &Path, what: &str) -> anyhow::Result<()> {
    if !path.is_file() {
        bail!("{} file {} does not exist", what, path.display());
    }
    Ok(())
}
