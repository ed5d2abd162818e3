//! Output formatting and the terminal display sink.
//!
//! Supports two modes: human-readable tables (default) and JSON (--json).

use serde::Serialize;
use tabled::{Table, Tabled};
use tokio::sync::{broadcast, watch};

use crate::catalog::Catalog;
use crate::coordination::ShutdownSignal;
use crate::orchestrator::OrchestratorSnapshot;

/// Output mode for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Table,
    Json,
}

impl OutputMode {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputMode::Json
        } else {
            OutputMode::Table
        }
    }
}

/// One row of the live status table
#[derive(Debug, Clone, Tabled)]
pub struct ChainRow {
    #[tabled(rename = "#")]
    pub index: usize,
    #[tabled(rename = "Chain")]
    pub id: String,
    #[tabled(rename = "Role")]
    pub role: String,
    #[tabled(rename = "Port")]
    pub port: u16,
    #[tabled(rename = "State")]
    pub state: String,
    #[tabled(rename = "Blocks")]
    pub blocks: String,
    #[tabled(rename = "Auto-mine")]
    pub auto_mine: String,
    #[tabled(rename = "PID")]
    pub pid: String,
}

/// One row of `switchboard chains`
#[derive(Debug, Clone, Tabled, Serialize)]
pub struct CatalogRow {
    #[tabled(rename = "#")]
    pub index: usize,
    #[tabled(rename = "Chain")]
    pub id: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Role")]
    pub role: String,
    #[tabled(rename = "Binary")]
    pub bin: String,
    #[tabled(rename = "Port")]
    pub port: u16,
    #[tabled(rename = "Slot")]
    pub slot: u32,
    #[tabled(rename = "Version")]
    pub version: String,
}

fn dash() -> String {
    "-".to_string()
}

pub fn snapshot_rows(snapshot: &OrchestratorSnapshot) -> Vec<ChainRow> {
    snapshot
        .chains
        .iter()
        .map(|view| {
            let runtime = view.runtime;
            ChainRow {
                index: view.index,
                id: view.descriptor.id.clone(),
                role: view.descriptor.role.to_string(),
                port: view.descriptor.port,
                state: runtime
                    .map(|r| r.lifecycle.to_string())
                    .unwrap_or_else(|| "stopped".to_string()),
                blocks: runtime
                    .and_then(|r| r.block_count)
                    .map(|count| count.to_string())
                    .unwrap_or_else(dash),
                auto_mine: match runtime {
                    Some(r) if r.auto_mine => "on".to_string(),
                    Some(_) => "off".to_string(),
                    None => dash(),
                },
                pid: runtime
                    .and_then(|r| r.pid)
                    .map(|pid| pid.to_string())
                    .unwrap_or_else(dash),
            }
        })
        .collect()
}

pub fn catalog_rows(catalog: &Catalog) -> Vec<CatalogRow> {
    catalog
        .iter()
        .enumerate()
        .map(|(index, chain)| CatalogRow {
            index,
            id: chain.id.clone(),
            name: chain.name.clone(),
            role: chain.role.to_string(),
            bin: chain.bin.clone(),
            port: chain.port,
            slot: chain.slot,
            version: chain.version.clone(),
        })
        .collect()
}

pub fn render_snapshot(snapshot: &OrchestratorSnapshot) -> String {
    Table::new(snapshot_rows(snapshot)).to_string()
}

pub fn print_snapshot(snapshot: &OrchestratorSnapshot) {
    println!("{}", render_snapshot(snapshot));
}

/// Print a vec of Tabled + Serialize items in the chosen mode.
pub fn print_items<T: Tabled + Serialize>(items: &[T], mode: OutputMode) -> anyhow::Result<()> {
    match mode {
        OutputMode::Table => {
            if items.is_empty() {
                println!("(no results)");
            } else {
                println!("{}", Table::new(items));
            }
        }
        OutputMode::Json => {
            println!("{}", serde_json::to_string_pretty(items)?);
        }
    }
    Ok(())
}

/// Print raw JSON value.
pub fn print_json_value(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message.
pub fn print_success(msg: &str) {
    println!("\x1b[32m{msg}\x1b[0m");
}

/// Print a warning message.
pub fn print_warn(msg: &str) {
    println!("\x1b[33m{msg}\x1b[0m");
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("\x1b[31m{msg}\x1b[0m");
}

/// Redraw the status table on every published refresh until shutdown
pub async fn run_terminal_sink(
    mut snapshots: watch::Receiver<OrchestratorSnapshot>,
    mut shutdown: broadcast::Receiver<ShutdownSignal>,
) {
    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                print_snapshot(&snapshot);
            }
            _ = shutdown.recv() => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::{ChainView, RuntimeView};
    use crate::registry::Lifecycle;
    use chrono::Utc;

    fn snapshot() -> OrchestratorSnapshot {
        let catalog = Catalog::bundled().unwrap();
        let chains = catalog
            .iter()
            .enumerate()
            .map(|(index, descriptor)| ChainView {
                index,
                descriptor: descriptor.clone(),
                runtime: (index == 1).then_some(RuntimeView {
                    lifecycle: Lifecycle::Running,
                    auto_mine: true,
                    pid: Some(4242),
                    block_count: Some(150),
                }),
            })
            .collect();
        OrchestratorSnapshot {
            seq: 1,
            taken_at: Utc::now(),
            chains,
        }
    }

    #[test]
    fn test_snapshot_rows() {
        let rows = snapshot_rows(&snapshot());
        assert_eq!(rows.len(), 4);

        assert_eq!(rows[1].id, "drivechain");
        assert_eq!(rows[1].state, "running");
        assert_eq!(rows[1].blocks, "150");
        assert_eq!(rows[1].pid, "4242");
        assert_eq!(rows[1].auto_mine, "on");

        assert_eq!(rows[2].state, "stopped");
        assert_eq!(rows[2].pid, "-");
    }

    #[test]
    fn test_render_contains_headers() {
        let table = render_snapshot(&snapshot());
        assert!(table.contains("Chain"));
        assert!(table.contains("drivechain"));
        assert!(table.contains("running"));
    }

    #[test]
    fn test_catalog_rows_follow_catalog_order() {
        let catalog = Catalog::bundled().unwrap();
        let rows = catalog_rows(&catalog);
        assert_eq!(rows[0].role, "overview");
        assert_eq!(rows[1].role, "mainchain");
        assert_eq!(rows[3].id, "bitassets");
        assert_eq!(rows[3].slot, 4);
    }
}
