use std::ffi::OsString;
use std::fs::OpenOptions;
use std::path::Path;
use std::process::{ExitStatus, Stdio};

use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use super::layout::{InstallLayout, NODE_LOG_FILE};
use super::proc_table::{self, ProcessFingerprint};
use super::ProcessControl;
use crate::catalog::ChainDescriptor;
use crate::error::{LaunchError, TerminateError};

/// Argument vector every node is started with. The data directory is passed
/// through as raw OS bytes.
pub fn launch_args(chain: &ChainDescriptor, data_dir: &Path) -> Vec<OsString> {
    let mut datadir = OsString::from("-datadir=");
    datadir.push(data_dir);

    vec![
        format!("-regtest={}", if chain.regtest { 1 } else { 0 }).into(),
        datadir,
        format!("-rpcport={}", chain.port).into(),
        format!("-rpcuser={}", chain.rpc_user).into(),
        format!("-rpcpassword={}", chain.rpc_password).into(),
        "-server=1".into(),
    ]
}

/// A launched node. Dropping it does not kill the process.
#[derive(Debug)]
pub struct NodeProcess {
    chain_id: String,
    pid: u32,
    child: Child,
    fingerprint: Option<ProcessFingerprint>,
    exit_status: Option<ExitStatus>,
}

impl NodeProcess {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.exit_status
    }

    /// Collect the exit status if the child has exited. Returns true once reaped.
    fn reap(&mut self) -> bool {
        if self.exit_status.is_some() {
            return true;
        }
        match self.child.try_wait() {
            Ok(Some(status)) => {
                debug!(chain = %self.chain_id, pid = self.pid, %status, "node exited");
                self.exit_status = Some(status);
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!(chain = %self.chain_id, pid = self.pid, error = %e, "failed to poll node exit status");
                false
            }
        }
    }
}

/// Starts node executables from the managed directory
#[derive(Debug, Clone)]
pub struct ProcessSupervisor {
    layout: InstallLayout,
}

impl ProcessSupervisor {
    pub fn new(layout: InstallLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &InstallLayout {
        &self.layout
    }
}

impl ProcessControl for ProcessSupervisor {
    type Handle = NodeProcess;

    fn launch(&self, chain: &ChainDescriptor, data_dir: &Path) -> Result<NodeProcess, LaunchError> {
        std::fs::create_dir_all(data_dir).map_err(|source| LaunchError::DataDir {
            path: data_dir.to_path_buf(),
            source,
        })?;

        let bin = self.layout.bin_path(chain);
        if !bin.is_file() {
            return Err(LaunchError::MissingExecutable(bin));
        }

        let log_path = data_dir.join(NODE_LOG_FILE);
        let log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .map_err(|source| LaunchError::DataDir {
                path: log_path.clone(),
                source,
            })?;
        let log_err = log.try_clone().map_err(|source| LaunchError::DataDir {
            path: log_path.clone(),
            source,
        })?;

        let mut cmd = Command::new(&bin);
        cmd.args(launch_args(chain, data_dir))
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err))
            .kill_on_drop(false);

        let child = cmd.spawn().map_err(|source| LaunchError::Spawn {
            path: bin.clone(),
            source,
        })?;
        let pid = child.id().ok_or_else(|| LaunchError::Spawn {
            path: bin.clone(),
            source: std::io::Error::new(
                std::io::ErrorKind::Other,
                "process exited before its pid was read",
            ),
        })?;

        info!(chain = %chain.id, pid, bin = %bin.display(), "node launched");

        Ok(NodeProcess {
            chain_id: chain.id.clone(),
            pid,
            child,
            fingerprint: ProcessFingerprint::capture(pid),
            exit_status: None,
        })
    }

    fn terminate(&self, handle: &mut NodeProcess) -> Result<(), TerminateError> {
        let pid = handle.pid;
        // Never signal a pid that may have been recycled
        if !self.is_alive(handle) {
            return Err(TerminateError::NotRunning { pid });
        }

        #[cfg(unix)]
        {
            use nix::errno::Errno;
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            match kill(Pid::from_raw(pid as i32), Signal::SIGKILL) {
                Ok(()) => {}
                Err(Errno::ESRCH) => return Err(TerminateError::NotRunning { pid }),
                Err(e) => {
                    return Err(TerminateError::Signal {
                        pid,
                        reason: e.to_string(),
                    })
                }
            }
        }

        #[cfg(not(unix))]
        {
            handle
                .child
                .start_kill()
                .map_err(|e| TerminateError::Signal {
                    pid,
                    reason: e.to_string(),
                })?;
        }

        let _ = handle.reap();
        info!(chain = %handle.chain_id, pid, "node killed");
        Ok(())
    }

    fn is_alive(&self, handle: &mut NodeProcess) -> bool {
        if handle.reap() {
            return false;
        }
        proc_table::is_running(handle.pid, handle.fingerprint.as_ref())
    }

    fn pid(&self, handle: &NodeProcess) -> Option<u32> {
        Some(handle.pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use std::path::PathBuf;

    #[test]
    fn test_launch_args() {
        let catalog = Catalog::bundled().unwrap();
        let main = catalog.mainchain();
        let args = launch_args(main, &PathBuf::from("/tmp/sb/data/drivechain"));

        assert_eq!(
            args,
            vec![
                "-regtest=1",
                "-datadir=/tmp/sb/data/drivechain",
                "-rpcport=18443",
                "-rpcuser=user",
                "-rpcpassword=password",
                "-server=1",
            ]
        );
    }

    #[test]
    fn test_launch_args_mainnet_mode() {
        let mut chain = Catalog::bundled().unwrap().mainchain().clone();
        chain.regtest = false;
        let args = launch_args(&chain, Path::new("/d"));
        assert_eq!(args[0], "-regtest=0");
    }

    #[cfg(unix)]
    #[test]
    fn test_launch_args_keep_non_utf8_data_dir() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let catalog = Catalog::bundled().unwrap();
        let data_dir = Path::new(OsStr::from_bytes(b"/tmp/sb/\xffdata/drivechain"));
        let args = launch_args(catalog.mainchain(), data_dir);

        assert_eq!(
            args[1].as_os_str(),
            OsStr::from_bytes(b"-datadir=/tmp/sb/\xffdata/drivechain")
        );
    }
}
