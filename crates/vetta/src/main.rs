mod session;

use clap::{Parser, Subcommand};
use session::Session;
use std::path::PathBuf;
use tokio::sync::{mpsc, oneshot};
use tracing_subscriber::EnvFilter;
use vetta_engine::agent::{Agent, AgentSettings};
use vetta_engine::client::JobServerClient;
use vetta_engine::config::ConfigLoader;
use vetta_engine::page::HostPage;
use vetta_engine::store::JsonFileStore;
use vetta_h::HeadlessPage;

#[derive(Parser)]
#[command(name = "vetta", version, about = "Applicant review page automation")]
struct Args {
    #[command(subcommand)]
    mode: Mode,

    /// Config file (defaults to ./vetta.yaml, then ~/.vetta/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Job server URL override
    #[arg(long)]
    server: Option<String>,
}

#[derive(Subcommand)]
enum Mode {
    /// Drive a headless Chromium session
    Headless {
        /// Navigate here before the session starts
        #[arg(long)]
        url: Option<String>,
    },
    /// Drive a visible Chromium session
    Visible {
        /// Navigate here before the session starts
        #[arg(long)]
        url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Log to stderr so stdout stays clean for the session UI.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ConfigLoader::load_from(path).await?,
        None => ConfigLoader::load_default().await?,
    };
    if let Some(server) = args.server {
        config.job_server_url = server;
    }

    let (visible, start_url) = match args.mode {
        Mode::Headless { url } => (false, url),
        Mode::Visible { url } => (true, url),
    };

    let mut page = HeadlessPage::new_with_visibility(visible);
    if let Err(e) = page.launch().await {
        eprintln!("Failed to launch browser: {}", e);
        return Err(e.into());
    }
    if let Some(url) = &start_url {
        page.navigate(url).await?;
    }

    let store = JsonFileStore::new(config.state_path());
    let client = JobServerClient::new(&config.job_server_url)?;

    let (cmd_tx, cmd_rx) = mpsc::channel(16);
    let (status_tx, status_rx) = mpsc::channel(64);
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let agent = Agent::new(
        page,
        store.clone(),
        client.clone(),
        cmd_rx,
        status_tx,
        AgentSettings::from(&config),
    );
    let agent_task = tokio::spawn(agent.run(shutdown_rx));

    let session = Session::new(client, store, cmd_tx, status_rx);
    if let Err(e) = session.run().await {
        eprintln!("Error during session: {}", e);
    }

    // Persisted state is deliberately left as-is on exit so a later session
    // can resume or stop an in-flight run.
    let _ = shutdown_tx.send(());
    agent_task.await??;
    Ok(())
}
