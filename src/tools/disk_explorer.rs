//! diskplorer adapter.
//!
//! diskplorer is a fio frontend cloned from git onto every host; it runs
//! out of its clone directory and leaves SVG/CSV plots there. Its probe
//! file (`fiotest.tmp`) is 100 GB, so it is removed both before and after
//! a run.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

use super::{
    capture_disk_layout, download_artifacts, phase_started, BenchTool, ToolBase,
};
use crate::connection::Fleet;
use crate::executor::{log_outcomes, run_all, TaskOutcome};
use crate::process::CommandInvoker;

const REPO_URL: &str = "https://github.com/scylladb/diskplorer.git";

/// Adapter for the diskplorer disk-throughput probe.
pub struct DiskExplorer {
    base: ToolBase,
}

impl DiskExplorer {
    /// Creates the adapter.
    pub fn new(fleet: Fleet, invoker: Arc<dyn CommandInvoker>) -> Self {
        Self {
            base: ToolBase::new("disk-explorer", fleet, invoker),
        }
    }

    /// Disables the `lsblk` disk-layout snapshot.
    pub fn without_lsblk(mut self) -> Self {
        self.base.capture_lsblk = false;
        self
    }
}

#[async_trait]
impl BenchTool for DiskExplorer {
    fn name(&self) -> &'static str {
        "disk-explorer"
    }

    fn fleet(&self) -> &Fleet {
        &self.base.fleet
    }

    async fn install(&self) -> Vec<TaskOutcome<()>> {
        phase_started(self.name(), "install");
        let outcomes = run_all(&self.base.fleet, |host| {
            let mut conn = self.base.connect(host);
            async move {
                conn.update_package_cache().await?;
                for package in ["git", "fio", "python3", "python3-pip"] {
                    conn.install_package(package).await?;
                }
                conn.run("sudo pip3 install -qqq matplotlib").await?;
                conn.run("rm -fr diskplorer").await?;
                conn.run(&format!("git clone -q {REPO_URL}")).await?;
                Ok(())
            }
        })
        .await;
        log_outcomes("disk-explorer install", &outcomes);
        outcomes
    }

    async fn prepare(&self) -> Vec<TaskOutcome<()>> {
        phase_started(self.name(), "prepare");
        let outcomes = run_all(&self.base.fleet, |host| {
            let mut conn = self.base.connect(host);
            async move {
                for cleanup in [
                    "rm -fr diskplorer/*.svg",
                    "rm -fr diskplorer/fiotest.tmp",
                    "sudo killall -q -9 fio",
                ] {
                    if let Err(e) = conn.run(cleanup).await {
                        warn!(host = %conn.host().address, error = %e, "cleanup skipped");
                    }
                }
                Ok(())
            }
        })
        .await;
        log_outcomes("disk-explorer prepare", &outcomes);
        outcomes
    }

    async fn run(&self, args: &str) -> Vec<TaskOutcome<()>> {
        phase_started(self.name(), "run");
        let args = args.to_string();
        let capture_lsblk = self.base.capture_lsblk;
        let outcomes = run_all(&self.base.fleet, |host| {
            let mut conn = self.base.connect(host);
            let args = args.clone();
            async move {
                if capture_lsblk {
                    capture_disk_layout(&mut conn).await?;
                }
                conn.run(&format!("cd diskplorer && python3 diskplorer.py {args}"))
                    .await?;
                // the probe file is 100 GB; do not leave it on the host
                conn.run("rm -fr diskplorer/fiotest.tmp").await?;
                Ok(())
            }
        })
        .await;
        log_outcomes("disk-explorer run", &outcomes);
        outcomes
    }

    async fn download(&self, dest: &Path) -> Vec<TaskOutcome<()>> {
        phase_started(self.name(), "download");
        let patterns = vec![
            "diskplorer/*.svg".to_string(),
            "diskplorer/*.csv".to_string(),
        ];
        let capture_lsblk = self.base.capture_lsblk;
        let dest = dest.to_path_buf();
        let outcomes = run_all(&self.base.fleet, |host| {
            let mut conn = self.base.connect(host);
            let patterns = patterns.clone();
            let dest = dest.clone();
            async move { download_artifacts(&mut conn, &dest, &patterns, capture_lsblk).await }
        })
        .await;
        log_outcomes("disk-explorer download", &outcomes);
        outcomes
    }
}
