use anyhow::{bail, Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use switchboard::cli::output::{self, OutputMode};
use switchboard::cli::shell;
use switchboard::cli::{self, Cli, Commands};
use switchboard::config::{AppConfig, LoggingConfig};
use switchboard::coordination::{install_signal_handlers, GracefulShutdown};
use switchboard::error::ConfigError;
use switchboard::orchestrator::{run_poll_loop, Orchestrator};
use switchboard::process::{InstallLayout, ProcessControl, ProcessSupervisor};
use switchboard::registry::Lifecycle;
use switchboard::rpc::{NodeRpc, RpcClient};
use switchboard::services::StatusServer;
use switchboard::Catalog;

/// How long a startup sidechain launch waits for the mainchain to answer
const MAINCHAIN_READY_TIMEOUT: Duration = Duration::from_secs(120);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_from(&cli.config_dir)
        .with_context(|| format!("failed to load config from {}", cli.config_dir.display()))?;
    cli.apply_overrides(&mut config);
    if let Err(errors) = config.validate() {
        bail!("invalid configuration:\n  {}", errors.join("\n  "));
    }

    let catalog = match &config.paths.catalog {
        Some(path) => Catalog::from_path(path)?,
        None => Catalog::bundled()?,
    };

    match &cli.command {
        Commands::Run {
            launch, no_shell, ..
        } => {
            init_logging(&config.logging);
            run_supervisor(config, catalog, launch, *no_shell).await?;
        }
        Commands::Chains { json } => {
            init_logging_simple();
            output::print_items(&output::catalog_rows(&catalog), OutputMode::from_json_flag(*json))?;
        }
        Commands::Rpc {
            chain,
            method,
            params,
        } => {
            init_logging_simple();
            let result = cli::rpc::call(&config.rpc, &catalog, chain, method, params).await?;
            output::print_json_value(&result)?;
        }
    }

    Ok(())
}

fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .init();
    }
}

fn init_logging_simple() {
    // Minimal logging for one-shot commands
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run_supervisor(
    config: AppConfig,
    catalog: Catalog,
    launch: &[String],
    no_shell: bool,
) -> Result<()> {
    let home = config.home_dir().ok_or(ConfigError::NoHomeDir)?;
    let layout = InstallLayout::new(&home);
    layout
        .ensure()
        .with_context(|| format!("cannot create managed directory {}", home.display()))?;
    info!(home = %home.display(), chains = catalog.len(), "starting supervisor");

    let rpc = RpcClient::new(&config.rpc)?;
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(catalog),
        layout.clone(),
        ProcessSupervisor::new(layout),
        rpc,
        config.protocol.clone(),
    ));

    let shutdown = Arc::new(GracefulShutdown::with_defaults());
    install_signal_handlers(shutdown.clone());

    let poller = tokio::spawn(run_poll_loop(
        orchestrator.clone(),
        Duration::from_millis(config.poll.interval_ms),
        shutdown.subscribe(),
    ));

    output::print_snapshot(&orchestrator.published());
    let sink = tokio::spawn(output::run_terminal_sink(
        orchestrator.subscribe(),
        shutdown.subscribe(),
    ));

    if let Some(addr) = config.status_addr() {
        let server = StatusServer::new(orchestrator.subscribe(), addr);
        let server_signals = shutdown.subscribe();
        tokio::spawn(async move {
            if let Err(e) = server.run(server_signals).await {
                error!(error = %e, "status server stopped");
            }
        });
    }

    launch_at_startup(&orchestrator, launch, &shutdown).await;

    let commands = if no_shell {
        info!("running headless, send SIGINT or SIGTERM to stop");
        None
    } else {
        let (command_tx, commands) = mpsc::channel(16);
        shell::spawn_reader(command_tx, Some(home.join("history.txt")));
        Some(commands)
    };

    let end = shell::dispatch(&orchestrator, commands, &shutdown).await;
    debug!(?end, "command dispatch finished");

    let terminator = orchestrator.clone();
    let result = shutdown
        .execute(
            move || async move {
                if let Err(e) = poller.await {
                    warn!(error = %e, "poll loop task failed");
                }
            },
            move || async move { terminator.shutdown().await },
        )
        .await;
    sink.abort();

    if let Err(e) = result {
        warn!(error = %e, "shutdown did not finish cleanly");
    }
    Ok(())
}

/// Launch `chains` in order. Sidechains wait for the mainchain to answer.
async fn launch_at_startup<P, R>(
    orchestrator: &Orchestrator<P, R>,
    chains: &[String],
    shutdown: &GracefulShutdown,
) where
    P: ProcessControl,
    R: NodeRpc,
{
    let mut snapshots = orchestrator.subscribe();

    for id in chains {
        let index = match orchestrator.index_of(id) {
            Ok(index) => index,
            Err(e) => {
                output::print_error(&e.to_string());
                continue;
            }
        };

        if orchestrator.chain(index).is_ok_and(|chain| chain.is_sidechain()) {
            let ready = snapshots.wait_for(|snapshot| {
                snapshot.mainchain().and_then(|view| view.lifecycle()) == Some(Lifecycle::Running)
            });
            let mainchain_running = tokio::select! {
                result = tokio::time::timeout(MAINCHAIN_READY_TIMEOUT, ready) => matches!(result, Ok(Ok(_))),
                _ = shutdown.wait_for_request() => return,
            };
            if !mainchain_running {
                warn!(chain = %id, "mainchain is not running, skipping startup launch");
                continue;
            }
        }

        if let Err(e) = orchestrator.launch_chain(index).await {
            error!(chain = %id, error = %e, "startup launch failed");
        }
    }
}
