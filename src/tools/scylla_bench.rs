//! scylla-bench adapter.
//!
//! scylla-bench is a Go binary installed per host with `go install` at a
//! pinned version. It writes HDR histogram logs into the run directory;
//! those logs are what the aggregation pipeline merges fleet-wide.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

use super::{download_artifacts, phase_started, BenchTool, ToolBase};
use crate::connection::Fleet;
use crate::executor::{log_outcomes, run_all, TaskOutcome};
use crate::process::CommandInvoker;

const GOLANG_CANDIDATES: [&str; 2] = ["golang-go", "golang"];
const MODULE_PATH: &str = "github.com/scylladb/scylla-bench";

/// Adapter for the scylla-bench load generator.
pub struct ScyllaBench {
    base: ToolBase,
    version: String,
}

impl ScyllaBench {
    /// Creates the adapter for a pinned scylla-bench version (`latest`
    /// works too, at the cost of reproducibility).
    pub fn new(fleet: Fleet, version: &str, invoker: Arc<dyn CommandInvoker>) -> Self {
        Self {
            base: ToolBase::new("scylla-bench", fleet, invoker),
            version: version.to_string(),
        }
    }

    /// Populates the test table: a sequential write pass over `rows`
    /// partitions against the given comma-joined node list.
    pub async fn insert(&self, rows: u64, nodes: &str) -> Vec<TaskOutcome<()>> {
        self.run(&format!(
            "-workload sequential -mode write -partition-count {rows} -nodes {nodes}"
        ))
        .await
    }
}

#[async_trait]
impl BenchTool for ScyllaBench {
    fn name(&self) -> &'static str {
        "scylla-bench"
    }

    fn fleet(&self) -> &Fleet {
        &self.base.fleet
    }

    async fn install(&self) -> Vec<TaskOutcome<()>> {
        phase_started(self.name(), "install");
        let version = self.version.clone();
        let outcomes = run_all(&self.base.fleet, |host| {
            let mut conn = self.base.connect(host);
            let version = version.clone();
            async move {
                conn.update_package_cache().await?;
                conn.install_package_from_candidates(&GOLANG_CANDIDATES).await?;
                conn.run(&format!("go install {MODULE_PATH}@{version}")).await?;
                Ok(())
            }
        })
        .await;
        log_outcomes("scylla-bench install", &outcomes);
        outcomes
    }

    async fn prepare(&self) -> Vec<TaskOutcome<()>> {
        phase_started(self.name(), "prepare");
        let run_dir = self.base.run_dir.clone();
        let outcomes = run_all(&self.base.fleet, |host| {
            let mut conn = self.base.connect(host);
            let run_dir = run_dir.clone();
            async move {
                for cleanup in [
                    "killall -q -9 scylla-bench".to_string(),
                    format!("rm -fr *.hdr {run_dir}"),
                ] {
                    if let Err(e) = conn.run(&cleanup).await {
                        warn!(host = %conn.host().address, error = %e, "cleanup skipped");
                    }
                }
                Ok(())
            }
        })
        .await;
        log_outcomes("scylla-bench prepare", &outcomes);
        outcomes
    }

    async fn run(&self, args: &str) -> Vec<TaskOutcome<()>> {
        phase_started(self.name(), "run");
        let run_dir = self.base.run_dir.clone();
        let args = args.to_string();
        let outcomes = run_all(&self.base.fleet, |host| {
            let mut conn = self.base.connect(host);
            let run_dir = run_dir.clone();
            let args = args.clone();
            async move {
                conn.run(&format!("mkdir -p {run_dir}")).await?;
                conn.run(&format!("cd {run_dir} && $HOME/go/bin/scylla-bench {args}"))
                    .await?;
                Ok(())
            }
        })
        .await;
        log_outcomes("scylla-bench run", &outcomes);
        outcomes
    }

    async fn download(&self, dest: &Path) -> Vec<TaskOutcome<()>> {
        phase_started(self.name(), "download");
        let patterns = vec![format!("{}/*.hdr", self.base.run_dir)];
        let dest = dest.to_path_buf();
        let outcomes = run_all(&self.base.fleet, |host| {
            let mut conn = self.base.connect(host);
            let patterns = patterns.clone();
            let dest = dest.clone();
            async move { download_artifacts(&mut conn, &dest, &patterns, false).await }
        })
        .await;
        log_outcomes("scylla-bench download", &outcomes);
        outcomes
    }
}
