mod demo;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use arbor_config::RuntimeConfig;
use arbor_runtime::{TracingNotifier, WorkflowRunner};
use arbor_workflow::TreeSnapshot;

use crate::demo::{Counter, Ticker, TreeRoot};

/// Arbor - a reconciling workflow tree engine
#[derive(Parser)]
#[command(name = "arbor")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.arbor)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  /// Path to a runtime config file (default: <data dir>/config.json)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run one of the bundled demonstration trees
  Demo {
    #[command(subcommand)]
    target: DemoTarget,
  },
}

#[derive(Subcommand)]
enum DemoTarget {
  /// Render a root with two keyed leaves and print the rendering
  Tree {
    /// Input string pushed into the root
    #[arg(long, default_value = "X")]
    input: String,
  },

  /// Count worker ticks and print every output, then the final snapshot
  Counter {
    /// Number of ticks the worker emits
    #[arg(long, default_value_t = 3)]
    ticks: u32,

    /// Milliseconds between ticks
    #[arg(long, default_value_t = 100)]
    interval_ms: u64,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".arbor"),
  };
  let config = load_config(cli.config.as_deref(), &data_dir)?;
  init_tracing(&config);
  info!(
    data_dir = %data_dir.display(),
    log_filter = %config.log_filter,
    "config_loaded"
  );

  match cli.command {
    Some(Commands::Demo { target }) => {
      let rt = tokio::runtime::Runtime::new()?;
      match target {
        DemoTarget::Tree { input } => rt.block_on(run_tree(input, config)),
        DemoTarget::Counter { ticks, interval_ms } => {
          rt.block_on(run_counter(ticks, Duration::from_millis(interval_ms), config))
        }
      }?;
    }
    None => {
      println!("arbor - use --help to see available commands");
    }
  }

  Ok(())
}

fn load_config(path: Option<&Path>, data_dir: &Path) -> Result<RuntimeConfig> {
  match path {
    Some(path) => RuntimeConfig::load(path)
      .with_context(|| format!("failed to load config file: {}", path.display())),
    None => {
      let default_path = data_dir.join("config.json");
      RuntimeConfig::load_or_default(&default_path)
        .with_context(|| format!("failed to load config file: {}", default_path.display()))
    }
  }
}

fn init_tracing(config: &RuntimeConfig) {
  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter)))
    .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
    .init();
}

async fn run_tree(input: String, config: RuntimeConfig) -> Result<()> {
  let mut handle = WorkflowRunner::new(TreeRoot { input }, config)
    .with_notifier(Arc::new(TracingNotifier))
    .start(futures::stream::pending());

  let rendering = handle
    .renderings()
    .next()
    .await
    .context("runner stopped before rendering")?;
  println!("{}", serde_json::to_string_pretty(&rendering)?);

  if let Some(snapshot) = handle.debug_snapshot() {
    eprintln!("Tree nodes: {}", snapshot.node_count());
  }

  handle.cancel();
  handle.join().await.context("runner failed")?;
  Ok(())
}

async fn run_counter(ticks: u32, interval: Duration, config: RuntimeConfig) -> Result<()> {
  let root = Counter {
    ticker: Ticker { ticks, interval },
  };
  let mut handle = WorkflowRunner::new(root, config)
    .with_notifier(Arc::new(TracingNotifier))
    .start(futures::stream::pending());
  let mut outputs = handle.outputs();
  info!(runner_id = %handle.runner_id(), ticks, "counter_demo_started");

  tokio::spawn(cancel_on_ctrl_c(handle.cancellation_token()));

  for _ in 0..ticks {
    let Some(output) = outputs.next().await else {
      break;
    };
    println!("{}", serde_json::json!({ "output": output }));
  }

  let snapshot = TreeSnapshot::from_bytes(&handle.snapshot()).context("invalid tree snapshot")?;
  println!("{}", serde_json::to_string_pretty(&snapshot)?);

  handle.cancel();
  handle.join().await.context("runner failed")?;
  Ok(())
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
  if tokio::signal::ctrl_c().await.is_ok() {
    cancel.cancel();
  }
}
