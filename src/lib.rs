pub mod catalog;
pub mod cli;
pub mod config;
pub mod coordination;
pub mod error;
pub mod orchestrator;
pub mod process;
pub mod registry;
pub mod rpc;
pub mod services;

pub use catalog::{Catalog, ChainDescriptor, ChainRole};
pub use config::AppConfig;
pub use coordination::{GracefulShutdown, ShutdownSignal};
pub use error::{
    ConfigError, LaunchError, Result, RpcError, SwitchboardError, TerminateError,
};
pub use orchestrator::{
    run_poll_loop, ChainView, DepositReceipt, Orchestrator, OrchestratorSnapshot, RuntimeView,
    TickReport,
};
pub use process::{InstallLayout, NodeProcess, ProcessControl, ProcessSupervisor};
pub use registry::{ChainRuntimeState, ChainStateRegistry, Lifecycle};
pub use rpc::{NodeRpc, RpcClient};
