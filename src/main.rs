use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use uuid::Uuid;

use arbor::config::{Config, MAX_DEMO_COUNTERS};
use arbor::counters::{CounterIntent, CountersModel, CountersState, NumberFactClient};
use arbor::remote::{self, LocalBrowser, RemoteHandle, RemoteIdentifier, RemoteList};
use arbor::store::Store;
use arbor::telemetry::init_tracing;

const STEP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "arbor")]
#[command(about = "State store with identity-stable child models and time travel", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the counters scenario with time-travel recording and print every diff
    Demo {
        /// Number of counters to add (overrides the config file)
        #[arg(short = 'n', long)]
        counters: Option<usize>,

        /// Config file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the default config file path
    ConfigPath,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::ConfigPath => {
            println!("{}", Config::config_path().display());
            Ok(())
        }
        Commands::Demo { counters, config } => {
            let path = config.unwrap_or_else(Config::config_path);
            let config = Config::load_from(&path)
                .with_context(|| format!("loading {}", path.display()))?;
            init_tracing(&config.logging.level);
            run_demo(&config, counters.unwrap_or(config.demo.counters)).await
        }
    }
}

async fn run_demo(config: &Config, counters: usize) -> anyhow::Result<()> {
    if counters > MAX_DEMO_COUNTERS {
        bail!("at most {} counters supported, got {}", MAX_DEMO_COUNTERS, counters);
    }

    let store = Store::with_history(CountersState::default(), config.history.policy());
    let (handle, server) = remote::connect(&store);
    let server_task = tokio::spawn(server.run(store.clone()));
    let mut reports = handle.diff_reports();

    let identifier = RemoteIdentifier::new()
        .with("process", "arbor-demo")
        .with("pid", std::process::id().to_string());
    let browser = LocalBrowser::new();
    browser.publish(identifier.clone(), Arc::new(handle.clone()));
    let remotes = Arc::new(RemoteList::new());
    let watcher = remotes.watch(&browser);

    let facts = Arc::new(NumberFactClient::new(Duration::from_millis(
        config.demo.fact_delay_ms,
    )));
    let model = CountersModel::new(store.clone(), facts);

    for n in 0..counters {
        let id = if n == 0 { Uuid::nil() } else { Uuid::new_v4() };
        let counter = model
            .add_counter(id)
            .context("counter model missing after add")?;
        counter.send(CounterIntent::Increment);

        let mut prompts = counter.prompts();
        counter.send(CounterIntent::FactButtonTapped);
        let prompt = tokio::time::timeout(STEP_TIMEOUT, prompts.next())
            .await
            .context("fact request timed out")?
            .context("prompt stream closed")?;
        println!("{}: {}", id, prompt.fact);

        counter.send(CounterIntent::DismissPrompt);
        model.remove_counter(id);
    }

    let range = store.history_range();
    println!("Recorded {} state(s), retained {:?}", store.history_count(), range);
    for index in range {
        handle.print_diff(index);
        let report = tokio::time::timeout(STEP_TIMEOUT, reports.recv())
            .await
            .context("diff report timed out")??;
        print!("{}", report);
    }

    for listed in remotes.remotes() {
        if let Some(state) = listed.override_state() {
            println!(
                "{}: {} entries, {}",
                listed.display_name(),
                state.count,
                if state.is_live() { "live" } else { "paused" }
            );
        }
    }

    drop(model);
    watcher.abort();
    remotes.clear();
    server_task.abort();
    Ok(())
}
