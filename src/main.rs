use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use memscan::config::{validate_config, ConfigLoader, DEFAULT_CONFIG_FILE};
use memscan::process::{ProcessRegions, RegionKind};
use memscan::repl::{self, Command};
use memscan::{ProcMemory, ScanOptions, ScanSession, SnapshotStore};

const USAGE: &str = "Usage: memscan [--config <path>] <pid>";

struct Args {
    config: String,
    pid: u32,
}

fn parse_args() -> Result<Args> {
    let mut config = DEFAULT_CONFIG_FILE.to_string();
    let mut pid = None;
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                config = args.next().context("--config needs a path")?;
            }
            "--help" | "-h" => {
                println!("{}", USAGE);
                std::process::exit(0);
            }
            other if pid.is_none() => {
                pid = Some(other.parse::<u32>().with_context(|| format!("Invalid pid '{}'", other))?);
            }
            other => bail!("Unexpected argument '{}'\n{}", other, USAGE),
        }
    }

    let pid = pid.context(USAGE)?;
    Ok(Args { config, pid })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args()?;

    let config = ConfigLoader::new(&args.config)
        .load_or_default()
        .with_context(|| format!("Failed to load {}", args.config))?
        .apply_env();
    validate_config(&config)?;

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!("Starting memscan v{}", env!("CARGO_PKG_VERSION"));

    rayon::ThreadPoolBuilder::new()
        .num_threads(config.scanner.search_threads)
        .build_global()
        .context("Failed to start search threads")?;

    let regions = ProcessRegions::discover(args.pid).await?;
    let stack = regions.get(RegionKind::Stack)?;
    let memory = ProcMemory::attach(args.pid)
        .await?
        .with_chunk_size(config.scanner.chunk_size);

    let store = SnapshotStore::new(&config.storage.directory);
    info!("Saving snapshots to {}", store.directory().display());

    let mut session = ScanSession::new(memory, store, stack)
        .with_options(ScanOptions::from(&config.scanner))
        .with_regions(regions);

    println!("Opening command prompt, enter '?' to see available commands");
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        match repl::dispatch(&mut session, command).await {
            Ok(reply) => {
                for line in &reply.lines {
                    println!("{}", line);
                }
                if reply.quit {
                    break;
                }
            }
            Err(e) => warn!("Command failed: {}", e),
        }
    }

    info!("Detached from process {}", args.pid);
    Ok(())
}
