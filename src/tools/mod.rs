//! Benchmark tool adapters.
//!
//! Every benchmark binary this crate drives (fio, cassandra-stress,
//! diskplorer, scylla-bench) is wrapped in the same four-step lifecycle:
//! install dependencies, prepare (best-effort cleanup of a previous run),
//! run, download artifacts. The adapters differ only in their remote
//! command templates and artifact glob patterns; everything else — fan-out,
//! retrying connections, per-host destination directories — is shared.
//!
//! An adapter is selected explicitly via [`ToolKind`], not by structural
//! typing: scenario drivers read the tool name from configuration and call
//! [`create`].

mod cassandra_stress;
mod disk_explorer;
mod fio;
mod scylla_bench;

pub use cassandra_stress::CassandraStress;
pub use disk_explorer::DiskExplorer;
pub use fio::Fio;
pub use scylla_bench::ScyllaBench;

use async_trait::async_trait;
use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::Properties;
use crate::connection::{Fleet, Host, SshConnection};
use crate::error::{Error, Result};
use crate::executor::TaskOutcome;
use crate::process::CommandInvoker;

/// The uniform lifecycle every benchmark tool implements.
///
/// `download()` for a run must never be invoked before `run()`'s fan-out
/// has joined; the executor's barrier gives callers that ordering for
/// free as long as they await each phase in turn.
#[async_trait]
pub trait BenchTool: Send + Sync {
    /// Tool name, used as the log phase label and run-directory prefix.
    fn name(&self) -> &'static str;

    /// The fleet this adapter targets.
    fn fleet(&self) -> &Fleet;

    /// Installs the tool and its dependencies on every host.
    async fn install(&self) -> Vec<TaskOutcome<()>>;

    /// Best-effort idempotent cleanup: removes stale artifacts from a
    /// previous run and kills stray processes. Failures are logged and
    /// ignored — the goal is repeatability, not strict correctness.
    async fn prepare(&self) -> Vec<TaskOutcome<()>>;

    /// Runs the benchmark with the caller-supplied argument string. The
    /// tools write their own output files remotely; nothing beyond exit
    /// status is captured here.
    async fn run(&self, args: &str) -> Vec<TaskOutcome<()>>;

    /// Retrieves the run's artifacts into `dest/<host-address>/`.
    async fn download(&self, dest: &Path) -> Vec<TaskOutcome<()>>;
}

/// Shared state and helpers for the concrete adapters.
pub(crate) struct ToolBase {
    pub(crate) fleet: Fleet,
    /// Remote working-directory name, time-stamped at adapter construction
    /// and shared across hosts so one run correlates across the fleet.
    pub(crate) run_dir: String,
    pub(crate) capture_lsblk: bool,
    pub(crate) invoker: Arc<dyn CommandInvoker>,
}

impl ToolBase {
    pub(crate) fn new(tool: &str, fleet: Fleet, invoker: Arc<dyn CommandInvoker>) -> Self {
        let run_dir = format!("{}-{}", tool, Local::now().format("%d-%m-%Y_%H-%M-%S"));
        Self {
            fleet,
            run_dir,
            capture_lsblk: true,
            invoker,
        }
    }

    pub(crate) fn connect(&self, host: Host) -> SshConnection {
        SshConnection::new(host, self.invoker.clone())
    }
}

/// Captures the host's block-device layout next to the run artifacts.
pub(crate) async fn capture_disk_layout(conn: &mut SshConnection) -> Result<()> {
    conn.run("lsblk > lsblk.out").await?;
    Ok(())
}

/// Creates `dest/<host-address>/` and pulls each remote glob into it.
pub(crate) async fn download_artifacts(
    conn: &mut SshConnection,
    dest: &Path,
    patterns: &[String],
    capture_lsblk: bool,
) -> Result<()> {
    let dest_dir = host_dir(dest, &conn.host().address);
    std::fs::create_dir_all(&dest_dir)?;
    debug!(host = %conn.host().address, dest = %dest_dir.display(), "Downloading artifacts");

    for pattern in patterns {
        conn.download(pattern, &dest_dir).await?;
    }
    if capture_lsblk {
        conn.download("lsblk.out", &dest_dir).await?;
    }
    Ok(())
}

/// The per-host subdirectory of a destination root.
pub(crate) fn host_dir(dest: &Path, address: &str) -> PathBuf {
    dest.join(address)
}

/// Logs the start of a lifecycle phase.
pub(crate) fn phase_started(tool: &str, phase: &str) {
    info!(tool, phase, "started");
}

/// Benchmark tool selection, driven by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    Fio,
    CassandraStress,
    DiskExplorer,
    ScyllaBench,
}

impl ToolKind {
    /// Parses a configuration value into a tool kind.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "fio" => Ok(ToolKind::Fio),
            "cassandra-stress" => Ok(ToolKind::CassandraStress),
            "disk-explorer" | "diskplorer" => Ok(ToolKind::DiskExplorer),
            "scylla-bench" => Ok(ToolKind::ScyllaBench),
            other => Err(Error::InvalidConfig {
                key: "tool".to_string(),
                message: format!("unknown benchmark tool '{other}'"),
            }),
        }
    }
}

/// Builds the adapter for a tool kind against a fleet.
pub fn create(
    kind: ToolKind,
    fleet: Fleet,
    properties: &Properties,
    invoker: Arc<dyn CommandInvoker>,
) -> Box<dyn BenchTool> {
    match kind {
        ToolKind::Fio => Box::new(Fio::new(fleet, invoker)),
        ToolKind::CassandraStress => Box::new(CassandraStress::new(
            fleet,
            &properties.cassandra_version,
            invoker,
        )),
        ToolKind::DiskExplorer => Box::new(DiskExplorer::new(fleet, invoker)),
        ToolKind::ScyllaBench => Box::new(ScyllaBench::new(
            fleet,
            &properties.scylla_bench_version,
            invoker,
        )),
    }
}
