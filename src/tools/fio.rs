//! fio adapter.
//!
//! The simplest tool: install the `fio` package, run it inside the
//! time-stamped run directory, pull everything that directory contains.
//! fio writes its own output files (json, logs, hdr) next to where it
//! runs, so the run command changes into the run directory first.

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

/// Adapter for the fio storage benchmark.
pub struct Fio {
    base: ToolBase,
}

impl Fio {
    /// Creates the adapter; the remote run directory is fixed here.
    pub fn new(fleet: Fleet, invoker: Arc<dyn CommandInvoker>) -> Self {
        Self {
            base: ToolBase::new("fio", fleet, invoker),
        }
    }

    /// Disables the `lsblk` disk-layout snapshot.
    pub fn without_lsblk(mut self) -> Self {
        self.base.capture_lsblk = false;
        self
    }

    /// Pushes a local job file into the run directory on every host, so a
    /// subsequent `run("jobfile.fio")` can reference it by name.
    pub async fn upload(&self, file: &Path) -> Vec<TaskOutcome<()>> {
        phase_started(self.name(), "upload");
        let run_dir = self.base.run_dir.clone();
        let file = file.to_path_buf();
        let outcomes = run_all(&self.base.fleet, |host| {
            let mut conn = self.base.connect(host);
            let run_dir = run_dir.clone();
            let file = file.clone();
            async move {
                conn.run(&format!("mkdir -p {run_dir}")).await?;
                conn.upload(&file, &run_dir).await
            }
        })
        .await;
        log_outcomes("fio upload", &outcomes);
        outcomes
    }
}

#[async_trait]
impl BenchTool for Fio {
    fn name(&self) -> &'static str {
        "fio"
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
                conn.install_package("fio").await
            }
        })
        .await;
        log_outcomes("fio install", &outcomes);
        outcomes
    }

    async fn prepare(&self) -> Vec<TaskOutcome<()>> {
        phase_started(self.name(), "prepare");
        let outcomes = run_all(&self.base.fleet, |host| {
            let mut conn = self.base.connect(host);
            async move {
                // killall exits 1 when nothing was running; the 0/1 quirk
                // covers that.
                if let Err(e) = conn.run("sudo killall -q -9 fio").await {
                    warn!(host = %conn.host().address, error = %e, "fio cleanup skipped");
                }
                if let Err(e) = conn.run("rm -f lsblk.out").await {
                    warn!(host = %conn.host().address, error = %e, "fio cleanup skipped");
                }
                Ok(())
            }
        })
        .await;
        log_outcomes("fio prepare", &outcomes);
        outcomes
    }

    async fn run(&self, args: &str) -> Vec<TaskOutcome<()>> {
        phase_started(self.name(), "run");
        let run_dir = self.base.run_dir.clone();
        let args = args.to_string();
        let capture_lsblk = self.base.capture_lsblk;
        let outcomes = run_all(&self.base.fleet, |host| {
            let mut conn = self.base.connect(host);
            let run_dir = run_dir.clone();
            let args = args.clone();
            async move {
                if capture_lsblk {
                    capture_disk_layout(&mut conn).await?;
                }
                conn.run(&format!("mkdir -p {run_dir}")).await?;
                conn.run(&format!("cd {run_dir} && sudo fio {args}")).await?;
                Ok(())
            }
        })
        .await;
        log_outcomes("fio run", &outcomes);
        outcomes
    }

    async fn download(&self, dest: &Path) -> Vec<TaskOutcome<()>> {
        phase_started(self.name(), "download");
        let patterns = vec![format!("{}/*", self.base.run_dir)];
        let capture_lsblk = self.base.capture_lsblk;
        let dest = dest.to_path_buf();
        let outcomes = run_all(&self.base.fleet, |host| {
            let mut conn = self.base.connect(host);
            let patterns = patterns.clone();
            let dest = dest.clone();
            async move { download_artifacts(&mut conn, &dest, &patterns, capture_lsblk).await }
        })
        .await;
        log_outcomes("fio download", &outcomes);
        outcomes
    }
}
