//! Node orchestration supervisor
//!
//! [`Orchestrator`] is the explicit context every component works through:
//! catalog, managed directory, process control, RPC channel and the chain
//! state registry. Two executors drive it concurrently:
//!
//! - the poll loop ([`run_poll_loop`]), ticking once per period
//! - the command source, calling the command methods on user intent
//!
//! Display sinks subscribe to [`OrchestratorSnapshot`]s published on each
//! refresh request.

mod commands;
#[allow(clippy::module_inception)]
mod orchestrator;
mod poll;
mod snapshot;

pub use commands::DepositReceipt;
pub use orchestrator::Orchestrator;
pub use poll::{run_poll_loop, TickReport};
pub use snapshot::{ChainView, OrchestratorSnapshot, RuntimeView};
