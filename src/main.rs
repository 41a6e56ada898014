use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chainfetch::{
    chains::{ChainProviderRegistry, FailoverExecutor},
    config::Settings,
    fetcher::{EventListener, FetchOptions, InteractionFetcher},
    models::{Chain, EventRecord},
};

#[derive(Parser)]
#[clap(name = "chainfetch")]
#[clap(about = "Fetch smart-contract interactions across chains", long_about = None)]
struct Cli {
    /// Settings file; defaults plus config/default and environment otherwise
    #[clap(short, long)]
    config: Option<String>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch historical interactions for a contract
    Fetch {
        /// Contract address
        #[clap(short, long)]
        address: String,

        /// Chain (ethereum, lisk, starknet, optimism, base)
        #[clap(short = 'n', long)]
        chain: String,

        #[clap(long)]
        from_block: u64,

        #[clap(long)]
        to_block: u64,

        /// Override the configured maximum sub-range size
        #[clap(long)]
        chunk_size: Option<u64>,

        /// Topic filter, repeatable for positional topics
        #[clap(long)]
        topic: Vec<String>,

        /// Resolve full transaction records for every distinct hash
        #[clap(long)]
        hydrate: bool,

        /// Fill record timestamps from block headers
        #[clap(long)]
        timestamps: bool,
    },

    /// Watch a contract for new events until interrupted
    Watch {
        /// Contract address
        #[clap(short, long)]
        address: String,

        /// Chain (ethereum, lisk, starknet, optimism, base)
        #[clap(short = 'n', long)]
        chain: String,

        /// Topic filter, repeatable
        #[clap(long)]
        topic: Vec<String>,

        #[clap(long)]
        poll_interval_secs: Option<u64>,
    },

    /// Show configured providers and their health counters
    Providers {
        #[clap(short = 'n', long)]
        chain: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let settings = match &cli.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::new()?,
    };
    settings.rpc.validate().map_err(anyhow::Error::msg)?;

    let registry = Arc::new(ChainProviderRegistry::from_config(&settings.rpc)?);
    let executor = Arc::new(FailoverExecutor::new(
        Arc::clone(&registry),
        Duration::from_millis(settings.rpc.failover_timeout_ms),
    ));

    match cli.command {
        Commands::Fetch {
            address,
            chain,
            from_block,
            to_block,
            chunk_size,
            topic,
            hydrate,
            timestamps,
        } => {
            let chain = parse_chain(&chain)?;
            let options = FetchOptions {
                max_chunk_size: chunk_size.unwrap_or(settings.rpc.max_chunk_size),
                max_concurrent_ranges: settings.rpc.max_concurrent_ranges,
                topics: topic,
                hydrate_transactions: hydrate,
                fill_timestamps: timestamps,
            };
            let fetcher = InteractionFetcher::new(executor).with_options(options);

            let result = fetcher
                .fetch_interactions(&address, chain, from_block, to_block)
                .await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Commands::Watch {
            address,
            chain,
            topic,
            poll_interval_secs,
        } => {
            let chain = parse_chain(&chain)?;
            let poll_interval = match poll_interval_secs {
                Some(secs) => Duration::from_secs(secs.max(1)),
                None => Duration::from_millis(settings.rpc.poll_interval_ms),
            };
            let fetcher = Arc::new(InteractionFetcher::new(executor).with_options(FetchOptions {
                max_chunk_size: settings.rpc.max_chunk_size,
                max_concurrent_ranges: settings.rpc.max_concurrent_ranges,
                ..FetchOptions::default()
            }));

            info!(
                "Watching {} on {} every {:?}",
                address,
                chain.as_str(),
                poll_interval
            );
            let handle = EventListener::spawn(
                fetcher,
                address,
                chain,
                topic,
                poll_interval,
                Arc::new(|event: &EventRecord| {
                    if let Ok(line) = serde_json::to_string(event) {
                        println!("{}", line);
                    }
                }),
            );

            tokio::signal::ctrl_c().await?;
            info!("Stopping listener");
            handle.stop();
            handle.stopped().await;
        }

        Commands::Providers { chain } => {
            let only = chain.map(|c| parse_chain(&c)).transpose()?;
            for target in registry.chains() {
                if let Some(only) = only {
                    if only != target {
                        continue;
                    }
                }
                println!("{}", target.as_str());
                for provider in registry.providers_for(target)? {
                    let last_error = provider
                        .last_error()
                        .map(|e| format!(" last_error={}", e))
                        .unwrap_or_default();
                    println!(
                        "  {} {} requests={} successes={} failures={} healthy={}{}",
                        provider.name(),
                        provider.url(),
                        provider.request_count(),
                        provider.success_count(),
                        provider.failure_count(),
                        provider.is_healthy(),
                        last_error
                    );
                }
            }
        }
    }

    Ok(())
}

fn parse_chain(value: &str) -> anyhow::Result<Chain> {
    Chain::from_str(value).ok_or_else(|| anyhow::anyhow!("Unsupported chain: {}", value))
}
