//! Interactive command source for `switchboard run`.
//!
//! A dedicated thread owns the line editor and forwards parsed commands to
//! the async dispatcher over a channel.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;

use super::output;
use crate::coordination::{GracefulShutdown, ShutdownSignal};
use crate::orchestrator::Orchestrator;
use crate::process::ProcessControl;
use crate::rpc::NodeRpc;

/// Internal CLI struct for shell parsing.
#[derive(Parser, Debug)]
#[command(name = "switchboard", no_binary_name = true, disable_help_subcommand = true)]
pub struct ShellCli {
    #[command(subcommand)]
    pub command: ShellCommand,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum ShellCommand {
    /// Start a chain's node
    Launch { chain: String },
    /// Stop a chain's node
    Stop { chain: String },
    /// Deposit coins from the mainchain into a sidechain
    Deposit { chain: String, amount: f64 },
    /// Mine one mainchain block
    Mine,
    /// Toggle merged-mining refresh for a sidechain
    AutoMine { chain: String },
    /// Print the status table
    Status,
    /// List available commands
    #[command(alias = "?")]
    Help,
    /// Stop every node and quit
    #[command(aliases = ["quit", "q"])]
    Exit,
}

/// Whether the dispatcher keeps reading commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Why the dispatcher stopped reading commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchEnd {
    /// The user asked to exit
    Exit,
    /// The command reader went away without an `exit`
    Hangup,
    /// Shutdown was requested from elsewhere, usually an OS signal
    Signal,
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Result<Option<ShellCommand>, clap::Error> {
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.is_empty() {
        return Ok(None);
    }
    ShellCli::try_parse_from(words).map(|parsed| Some(parsed.command))
}

/// Read lines on a dedicated thread until EOF, `exit`, or the receiver is
/// dropped. EOF and Ctrl+C are forwarded as `exit`.
pub fn spawn_reader(
    commands: mpsc::Sender<ShellCommand>,
    history_path: Option<PathBuf>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        use rustyline::error::ReadlineError;
        use rustyline::DefaultEditor;

        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                output::print_error(&format!("cannot start shell: {e}"));
                let _ = commands.blocking_send(ShellCommand::Exit);
                return;
            }
        };
        if let Some(ref path) = history_path {
            let _ = rl.load_history(path);
        }

        println!("Type 'help' for available commands, 'exit' to quit.");

        loop {
            let command = match rl.readline("\x1b[36mswitchboard>\x1b[0m ") {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        let _ = rl.add_history_entry(line);
                    }
                    match parse_line(line) {
                        Ok(Some(command)) => command,
                        Ok(None) => continue,
                        Err(e) => {
                            eprintln!("{e}");
                            continue;
                        }
                    }
                }
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => ShellCommand::Exit,
                Err(e) => {
                    output::print_error(&format!("readline error: {e}"));
                    ShellCommand::Exit
                }
            };

            let exiting = command == ShellCommand::Exit;
            if commands.blocking_send(command).is_err() || exiting {
                break;
            }
        }

        if let Some(ref path) = history_path {
            let _ = rl.save_history(path);
        }
    })
}

/// Run one command against the orchestrator and print its outcome
pub async fn execute<P, R>(
    orchestrator: &Orchestrator<P, R>,
    command: ShellCommand,
) -> anyhow::Result<Flow>
where
    P: ProcessControl,
    R: NodeRpc,
{
    match command {
        ShellCommand::Launch { chain } => {
            let index = orchestrator.index_of(&chain)?;
            orchestrator.launch_chain(index).await?;
            output::print_success(&format!("{chain} launched, waiting for RPC"));
        }
        ShellCommand::Stop { chain } => {
            let index = orchestrator.index_of(&chain)?;
            if orchestrator.stop_chain(index).await? {
                output::print_success(&format!("{chain} stopped"));
            } else {
                output::print_warn(&format!("{chain} is not launched"));
            }
        }
        ShellCommand::Deposit { chain, amount } => {
            let index = orchestrator.index_of(&chain)?;
            let receipt = orchestrator.deposit(index, amount).await?;
            output::print_success(&format!(
                "deposited {} into {} at {}",
                receipt.amount, receipt.chain_id, receipt.address
            ));
            output::print_json_value(&receipt.result)?;
        }
        ShellCommand::Mine => {
            let result = orchestrator.mainchain_mine().await?;
            output::print_json_value(&result)?;
        }
        ShellCommand::AutoMine { chain } => {
            orchestrator.index_of(&chain)?;
            match orchestrator.toggle_auto_mine(&chain).await {
                Some(true) => output::print_success(&format!("auto-mine on for {chain}")),
                Some(false) => output::print_success(&format!("auto-mine off for {chain}")),
                None => output::print_warn(&format!("{chain} is not launched")),
            }
        }
        ShellCommand::Status => output::print_snapshot(&orchestrator.snapshot().await),
        ShellCommand::Help => print_shell_help(),
        ShellCommand::Exit => return Ok(Flow::Exit),
    }
    Ok(Flow::Continue)
}

/// Execute commands from `commands` until the user exits, the reader hangs
/// up or shutdown is requested elsewhere. Without a command source this only
/// waits for shutdown. Each ending requests shutdown at most once.
pub async fn dispatch<P, R>(
    orchestrator: &Orchestrator<P, R>,
    mut commands: Option<mpsc::Receiver<ShellCommand>>,
    shutdown: &GracefulShutdown,
) -> DispatchEnd
where
    P: ProcessControl,
    R: NodeRpc,
{
    let mut signals = shutdown.subscribe();
    if shutdown.is_shutdown_requested() {
        return DispatchEnd::Signal;
    }

    loop {
        tokio::select! {
            command = async {
                match commands.as_mut() {
                    Some(rx) => rx.recv().await,
                    None => std::future::pending::<Option<ShellCommand>>().await,
                }
            } => match command {
                Some(command) => match execute(orchestrator, command).await {
                    Ok(Flow::Exit) => {
                        shutdown.request_shutdown(ShutdownSignal::Graceful);
                        return DispatchEnd::Exit;
                    }
                    Ok(Flow::Continue) => {}
                    Err(e) => output::print_error(&e.to_string()),
                },
                None => {
                    shutdown.request_shutdown(ShutdownSignal::Graceful);
                    return DispatchEnd::Hangup;
                }
            },
            _ = signals.recv() => return DispatchEnd::Signal,
        }
    }
}

fn print_shell_help() {
    println!("Available commands:");
    println!("  launch <chain>            start a node");
    println!("  stop <chain>              stop a node");
    println!("  deposit <chain> <amount>  mainchain -> sidechain deposit");
    println!("  mine                      mine one mainchain block");
    println!("  auto-mine <chain>         toggle refreshbmm for a sidechain");
    println!("  status                    print the status table");
    println!("  help                      (this message)");
    println!("  exit                      stop every node and quit");
}
