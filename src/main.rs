use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use kmx::index::planner::{KPlanner, QueryLengthDistribution};
use kmx::index::{IndexConfig, MultiKIndex, RemainderStrategy, StorePolicy, SuffixArray};
use kmx::output::{self, HitFormat};
use kmx::utils::progress;
use kmx::utils::{Alphabet, SequenceGenerator, load_sequence};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kmx")]
#[command(about = "Exact-match k-mer substring index")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON config file (KMX_* environment variables override it)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log progress to stderr (-vv for debug output)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Options shared by every command that builds an index
#[derive(Args)]
struct BuildArgs {
    /// k values to build, comma separated
    #[arg(short, long, value_delimiter = ',', default_value = "4,8,12")]
    k: Vec<usize>,

    /// Alphabet name (dna, protein) or literal symbol list
    #[arg(short, long, default_value = "dna")]
    alphabet: String,

    /// Backing store: auto, direct or hashed
    #[arg(long)]
    store: Option<StorePolicy>,

    /// Tiling remainder strategy: sub_k or overlapping_tile
    #[arg(long)]
    remainder: Option<RemainderStrategy>,

    /// Build threads (0 = all cores)
    #[arg(short = 'j', long)]
    threads: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search a sequence file for one or more queries
    Search {
        /// Raw or FASTA sequence file
        file: PathBuf,

        /// Queries to look up
        #[arg(required = true)]
        queries: Vec<String>,

        #[command(flatten)]
        build: BuildArgs,

        /// Only print the number of hits per query
        #[arg(long)]
        count: bool,

        /// Symbols of context printed around each hit
        #[arg(short = 'C', long, default_value_t = 10)]
        context: usize,

        /// Print at most this many hits per query
        #[arg(short, long)]
        limit: Option<usize>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },
    /// Build the index and print per-k statistics
    Stats {
        file: PathBuf,

        #[command(flatten)]
        build: BuildArgs,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Suggest k values for an expected query length distribution
    Plan {
        /// Observed query lengths, comma separated
        #[arg(short, long, value_delimiter = ',')]
        lengths: Vec<usize>,

        /// Shortest query length of a uniform distribution
        #[arg(long, default_value_t = 4)]
        min: usize,

        /// Longest query length of a uniform distribution
        #[arg(long, default_value_t = 32)]
        max: usize,

        /// Number of k values to choose
        #[arg(short = 'n', long, default_value_t = 3)]
        count: usize,

        /// Largest candidate k
        #[arg(long, default_value_t = 16)]
        max_k: usize,
    },
    /// Write a random sequence
    Generate {
        /// Number of symbols
        #[arg(short = 'n', long)]
        length: usize,

        #[arg(short, long, default_value_t = 42)]
        seed: u64,

        #[arg(short, long, default_value = "dna")]
        alphabet: String,

        /// Wrap the output as a FASTA record
        #[arg(long)]
        fasta: bool,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Cross-check the index against a suffix array on random data
    Verify {
        /// Text length
        #[arg(short = 'n', long, default_value_t = 100_000)]
        length: usize,

        /// Number of queries
        #[arg(short, long, default_value_t = 2_000)]
        queries: usize,

        /// Longest query length
        #[arg(long, default_value_t = 24)]
        max_len: usize,

        #[arg(short, long, default_value_t = 42)]
        seed: u64,

        #[command(flatten)]
        build: BuildArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = IndexConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    let show_progress = cli.verbose == 0;

    match cli.command {
        Commands::Search {
            file,
            queries,
            build,
            count,
            context,
            limit,
            no_color,
        } => {
            let text = read_text(&file)?;
            let index = build_index(&text, &build, &config, show_progress)?;
            let format = HitFormat { context, limit };
            for query in &queries {
                let view = match index.search(query.as_bytes()) {
                    Ok(view) => view,
                    Err(e) if e.is_domain() => {
                        warn!(query = %query, error = %e, "query skipped");
                        eprintln!("kmx: {}: {}", query, e);
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                };
                if count {
                    output::print_count(query.as_bytes(), view.size(), !no_color)?;
                } else {
                    let hits = view.to_vector(true);
                    output::print_hits(&text, query.len(), &hits, format, !no_color)?;
                }
            }
        }
        Commands::Stats { file, build, json } => {
            let text = read_text(&file)?;
            let index = build_index(&text, &build, &config, show_progress)?;
            let stats = index.stats();
            if json {
                println!("{}", stats.to_json()?);
            } else {
                stats.write_human(&mut io::stdout().lock())?;
            }
        }
        Commands::Plan {
            lengths,
            min,
            max,
            count,
            max_k,
        } => {
            let dist = if lengths.is_empty() {
                QueryLengthDistribution::uniform(min, max)
            } else {
                QueryLengthDistribution::from_lengths(lengths)
            };
            if dist.is_empty() {
                bail!("empty query length distribution");
            }
            let planner = KPlanner::new(config.planner);
            let candidates: Vec<usize> = (2..=max_k).collect();
            let ks = planner.plan(&dist, count, &candidates);
            let list: Vec<String> = ks.iter().map(|k| k.to_string()).collect();
            println!("k values:  {}", list.join(","));
            println!("score:     {:.4}", planner.score_set(&ks, &dist));
            println!("mean len:  {:.2}", dist.mean());
        }
        Commands::Generate {
            length,
            seed,
            alphabet,
            fasta,
            output: out_path,
        } => {
            let alphabet = Arc::new(Alphabet::from_name(&alphabet)?);
            let mut generator = SequenceGenerator::new(alphabet, seed);
            let seq = generator.sequence(length);
            let mut out: Box<dyn Write> = match &out_path {
                Some(path) => Box::new(io::BufWriter::new(
                    fs::File::create(path)
                        .with_context(|| format!("Failed to create {}", path.display()))?,
                )),
                None => Box::new(io::BufWriter::new(io::stdout().lock())),
            };
            if fasta {
                writeln!(out, ">kmx-generated seed={} length={}", seed, length)?;
                for line in seq.chunks(80) {
                    out.write_all(line)?;
                    writeln!(out)?;
                }
            } else {
                out.write_all(&seq)?;
                writeln!(out)?;
            }
            out.flush()?;
        }
        Commands::Verify {
            length,
            queries,
            max_len,
            seed,
            build,
        } => {
            verify(length, queries, max_len, seed, &build, &config, show_progress)?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "kmx=info",
        _ => "kmx=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn read_text(path: &Path) -> Result<Vec<u8>> {
    load_sequence(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Apply command line overrides on top of the loaded config
fn effective_config(build: &BuildArgs, config: &IndexConfig) -> IndexConfig {
    let mut config = config.clone();
    if let Some(store) = build.store {
        config.store = store;
    }
    if let Some(remainder) = build.remainder {
        config.remainder = remainder;
    }
    if let Some(threads) = build.threads {
        config.threads = threads;
    }
    config
}

fn build_index(
    text: &[u8],
    build: &BuildArgs,
    config: &IndexConfig,
    show_progress: bool,
) -> Result<MultiKIndex> {
    let alphabet = Arc::new(Alphabet::from_name(&build.alphabet)?);
    let config = effective_config(build, config);
    let spinner = progress::spinner("Building index...", show_progress);
    let index = MultiKIndex::build(text, &build.k, alphabet, &config);
    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }
    Ok(index?)
}

fn verify(
    length: usize,
    queries: usize,
    max_len: usize,
    seed: u64,
    build: &BuildArgs,
    config: &IndexConfig,
    show_progress: bool,
) -> Result<()> {
    if max_len == 0 {
        bail!("--max-len must be at least 1");
    }
    let alphabet = Arc::new(Alphabet::from_name(&build.alphabet)?);
    let mut generator = SequenceGenerator::new(alphabet, seed);
    let text = generator.sequence(length);
    let lens: Vec<usize> = (1..=max_len).collect();
    let queries = generator.queries(&text, queries, &lens);

    let index = build_index(&text, build, config, show_progress)?;
    let baseline = SuffixArray::build(&text);

    let results = index.search_batch(&queries);
    let mut mismatches = 0usize;
    for (query, result) in queries.iter().zip(results) {
        let expected = baseline.search_positions(query);
        let actual = match result {
            Ok(view) => view.to_vector(true),
            Err(e) if e.is_domain() => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        if actual != expected {
            mismatches += 1;
            warn!(
                query = %String::from_utf8_lossy(query),
                expected = expected.len(),
                actual = actual.len(),
                "result mismatch"
            );
        }
    }

    info!(queries = queries.len(), mismatches, "verification finished");
    println!(
        "verified {} queries against a {}-symbol text: {} mismatches",
        queries.len(),
        text.len(),
        mismatches
    );
    if mismatches > 0 {
        bail!("{} queries disagreed with the suffix array", mismatches);
    }
    Ok(())
}
