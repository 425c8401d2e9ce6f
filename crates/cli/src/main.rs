mod jsonl_source;
mod logging;

use clap::{Parser, Subcommand, ValueEnum};
use jsonl_source::JsonlSource;
use logging::{init_logging, LogArgs};
use posindex_extractors::{
    BigramExtractor, DateExtractor, DependencyExtractor, Extractor, HypernymExtractor, NerExtractor, PosExtractor,
    StitchExtractor, StopwordSet, TrigramExtractor, UnigramExtractor,
};
use posindex_pipeline::{CancelToken, Config, IndexDirPolicy, Run};
use posindex_store::{RocksStore, StoreOptions};
use posindex_synonyms::SynonymTables;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Flavor {
    Unigram,
    Bigram,
    Trigram,
    Pos,
    Ner,
    Date,
    Dependency,
    Hypernym,
    Stitch,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Builds one flavor's positional inverted index.
    Build(BuildArgs),
}

#[derive(Debug, clap::Args)]
struct BuildArgs {
    /// Which extraction flavor to build.
    #[arg(long, value_enum)]
    flavor: Flavor,

    /// Output store directory for this flavor.
    #[arg(long)]
    out: PathBuf,

    /// Newline-delimited JSON file of annotation rows.
    #[arg(long)]
    annotations: PathBuf,

    /// Newline-delimited JSON file of dependency rows, required for the
    /// dependency/hypernym/stitch flavors.
    #[arg(long)]
    dependencies: Option<PathBuf>,

    /// One stopword per line, lowercased. Required for every run, either
    /// here or via `stopwords_path` in `--config`.
    #[arg(long)]
    stopwords: Option<PathBuf>,

    /// Directory holding the shared synonym tables. Required for the
    /// date and stitch flavors.
    #[arg(long)]
    synonyms_dir: Option<PathBuf>,

    /// JSON-encoded Config overrides.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    batch: Option<usize>,

    #[arg(long)]
    threads: Option<usize>,

    /// Keep the prior output directory's contents instead of replacing them.
    #[arg(long)]
    preserve: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Builds positional inverted indexes over annotated text corpora")]
struct Args {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    log_args: LogArgs,
}

fn main() {
    let args = Args::parse();
    init_logging(&args.log_args);

    let result = match args.command {
        Command::Build(build_args) => run_build(build_args),
    };

    if let Err(err) = result {
        tracing::error!(error = %err, "posindex build failed");
        std::process::exit(exit_code_for(&err));
    }
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<posindex_pipeline::Error>().map(|e| e.exit_code()).unwrap_or(1)
}

fn run_build(args: BuildArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => Config::from_json_str(&std::fs::read_to_string(path)?)?,
        None => Config::default(),
    };
    if let Some(batch) = args.batch {
        config.batch_size = batch;
    }
    if let Some(threads) = args.threads {
        config.threads = threads;
    }
    config.validate()?;

    let stopwords_path = args
        .stopwords
        .clone()
        .or_else(|| config.stopwords_path.clone())
        .ok_or_else(|| posindex_pipeline::Error::Config("stopwords_path is required: pass --stopwords or set it in --config".into()))?;
    let stopwords = StopwordSet::load(&stopwords_path)?;

    let synonyms_dir = args.synonyms_dir.clone().unwrap_or_else(|| args.out.join("_synonyms"));
    let synonyms = Arc::new(SynonymTables::open(&synonyms_dir)?);

    let extractor: Box<dyn Extractor> = match args.flavor {
        Flavor::Unigram => Box::new(UnigramExtractor::new(stopwords.clone())),
        Flavor::Bigram => Box::new(BigramExtractor),
        Flavor::Trigram => Box::new(TrigramExtractor),
        Flavor::Pos => Box::new(PosExtractor),
        Flavor::Ner => Box::new(NerExtractor),
        Flavor::Date => Box::new(DateExtractor::new(synonyms.clone())),
        Flavor::Dependency => Box::new(DependencyExtractor::new(stopwords.clone())),
        Flavor::Hypernym => Box::new(HypernymExtractor::new(stopwords)),
        Flavor::Stitch => Box::new(StitchExtractor::new(synonyms.clone())),
    };

    let source = JsonlSource::open(&args.annotations, args.dependencies.as_deref())?;
    let store_opts = StoreOptions {
        write_buffer_mb: config.write_buffer_mb,
        cache_mb: config.cache_mb,
        compression: config.compression.clone(),
    };
    let store = RocksStore::open(&args.out, store_opts)?;

    let dir_policy = IndexDirPolicy {
        preserve_existing: args.preserve,
        size_threshold_bytes: config.size_threshold_bytes,
        ..Default::default()
    };
    let work_dir = std::env::temp_dir().join(format!("posindex-{}", std::process::id()));
    let run = Run::new(extractor.as_ref(), config, work_dir.as_path(), CancelToken::new());
    let progress = run.execute(source, &store, &args.out, dir_policy)?;

    tracing::info!(
        keys_written = progress.unique_keys_written,
        tuples = progress.tuples_processed,
        "build complete"
    );

    match Arc::try_unwrap(synonyms) {
        Ok(tables) => tables.close()?,
        Err(_) => tracing::warn!("synonym tables still shared; skipping close"),
    }

    Ok(())
}
