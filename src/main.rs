//! lexigraph - bulk-load an RDF file into a FalkorDB property graph
//!
//! Usage:
//!   lexigraph data/english-wordnet.ttl --graph wordnet
//!   lexigraph data/english-wordnet.nt --sample 100000 --index-strategy rebuild-before-edges
//!   lexigraph data/english-wordnet.ttl --dry-run --json

use anyhow::Context;
use clap::Parser;
use lexigraph::ingest::{
    BatchingPolicy, IndexStrategy, LoadReport, LoadRequest, LoadStatistics, Loader, LoaderConfig,
    ProgressPolicy,
};
use lexigraph::parsing::SourceFormat;
use lexigraph::storage::{Endpoint, FalkorConnector, MemoryConnector, StoreConnector};
use lexigraph::Error;
use std::path::PathBuf;
use std::str::FromStr;

/// Exit status after Ctrl+C, 128 + SIGINT.
const INTERRUPTED_EXIT_CODE: i32 = 130;

#[derive(Parser, Debug)]
#[command(name = "lexigraph")]
#[command(about = "Load an RDF triple file into a FalkorDB property graph")]
struct Args {
    /// RDF file to load
    file: PathBuf,

    /// Graph name (defaults to the file name without extension)
    #[arg(short, long)]
    graph: Option<String>,

    /// FalkorDB host
    #[arg(short = 'H', long, default_value = "localhost")]
    host: String,

    /// FalkorDB port
    #[arg(short, long, default_value = "6379")]
    port: u16,

    /// FalkorDB username
    #[arg(long)]
    username: Option<String>,

    /// FalkorDB password
    #[arg(long)]
    password: Option<String>,

    /// Input format: turtle, n3, nt, xml, json-ld, nquads or trig (defaults to the file extension)
    #[arg(short, long)]
    format: Option<String>,

    /// Load only the first N triples
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    sample: Option<u64>,

    /// Nodes per write batch
    #[arg(long, default_value = "5000")]
    node_batch_size: usize,

    /// Edges per write batch
    #[arg(long, default_value = "500")]
    edge_batch_size: usize,

    /// Relationship types written at the same time
    #[arg(long, default_value = "1")]
    edge_concurrency: usize,

    /// When the uri index is dropped and rebuilt
    #[arg(long, value_enum, default_value_t = IndexStrategy::Bracket)]
    index_strategy: IndexStrategy,

    /// Triples between progress lines while collecting (0 = off)
    #[arg(long, default_value = "10000")]
    progress_interval: usize,

    /// Load into an in-memory graph instead of FalkorDB
    #[arg(long)]
    dry_run: bool,

    /// Print the result record as JSON
    #[arg(long)]
    json: bool,
}

impl Args {
    fn loader_config(&self) -> LoaderConfig {
        LoaderConfig {
            endpoint: Endpoint {
                host: self.host.clone(),
                port: self.port,
                username: self.username.clone(),
                password: self.password.clone(),
            },
            policy: BatchingPolicy {
                node_batch_size: self.node_batch_size,
                edge_batch_size: self.edge_batch_size,
                index_strategy: self.index_strategy,
                edge_concurrency: self.edge_concurrency,
            },
            progress: ProgressPolicy {
                collect_interval: self.progress_interval,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn load_request(&self) -> lexigraph::Result<LoadRequest> {
        let format = match &self.format {
            Some(token) => Some(SourceFormat::from_str(token).map_err(Error::Parse)?),
            None => None,
        };
        Ok(LoadRequest {
            path: self.file.clone(),
            graph_name: self.graph.clone(),
            format,
            sample_size: self.sample.map(|n| n as usize),
        })
    }
}

async fn run<C: StoreConnector>(connector: C, args: &Args) -> lexigraph::Result<LoadStatistics> {
    let request = args.load_request()?;
    let loader = Loader::new(connector, args.loader_config())?;
    loader.load(&request).await
}

fn print_report(report: &LoadReport) {
    match report {
        LoadReport::Failed(err) => eprintln!("Error: {}", err),
        LoadReport::Loaded(stats) => {
            println!("\nLoad Complete!");
            println!("==============");
            println!("Graph:          {}", stats.graph_name);
            if let Some(format) = stats.format {
                println!("Format:         {}", format);
            }
            println!("Triples:        {} of {}", stats.triples_loaded, stats.total_triples_in_file);
            println!("Nodes:          {} created, {} failed", stats.nodes_created, stats.nodes_failed);
            println!("Edges:          {} created, {} failed", stats.edges_created, stats.edges_failed);
            println!("Types:          {}", stats.relationship_types.len());
            println!("Index failures: {}", stats.index_failures);
            println!("Elapsed time:   {:.2}s", stats.timings.total_secs);
            println!("Throughput:     {:.1} triples/sec", stats.triples_per_sec);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    ctrlc::set_handler(|| {
        log::warn!("Interrupted: the graph is only partially loaded, re-run the full load");
        std::process::exit(INTERRUPTED_EXIT_CODE);
    })
    .context("failed to install Ctrl+C handler")?;

    let report = if args.dry_run {
        log::info!("Dry run: loading into an in-memory graph");
        LoadReport::from(run(MemoryConnector::new(), &args).await)
    } else {
        LoadReport::from(run(FalkorConnector, &args).await)
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report).context("failed to encode report")?);
    } else {
        print_report(&report);
    }

    if report.is_error() {
        std::process::exit(1);
    }
    Ok(())
}
