//! cassandra-stress adapter.
//!
//! cassandra-stress ships inside the Apache Cassandra tarball, so install
//! means: a JDK 8 (package name differs between apt and yum worlds, hence
//! the candidate list), wget, then fetch and unpack the pinned Cassandra
//! version. The stress tool itself is a long-running JVM, which is why
//! prepare kills stray `java` processes left over from an aborted run.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

use super::{download_artifacts, phase_started, BenchTool, ToolBase};
use crate::connection::Fleet;
use crate::executor::{log_outcomes, run_all, TaskOutcome};
use crate::process::CommandInvoker;

const JDK_CANDIDATES: [&str; 2] = ["openjdk-8-jdk", "java-1.8.0-openjdk"];
const TARBALL_MIRROR: &str = "https://mirrors.netix.net/apache/cassandra";

/// Adapter for the cassandra-stress load generator.
pub struct CassandraStress {
    base: ToolBase,
    cassandra_version: String,
}

impl CassandraStress {
    /// Creates the adapter for a pinned Apache Cassandra version.
    pub fn new(fleet: Fleet, cassandra_version: &str, invoker: Arc<dyn CommandInvoker>) -> Self {
        Self {
            base: ToolBase::new("cassandra-stress", fleet, invoker),
            cassandra_version: cassandra_version.to_string(),
        }
    }

    fn stress_binary(&self) -> String {
        format!(
            "$HOME/apache-cassandra-{}/tools/bin/cassandra-stress",
            self.cassandra_version
        )
    }

    /// Pushes a local file (profile yaml, for instance) to every host's
    /// home directory.
    pub async fn upload(&self, file: &Path) -> Vec<TaskOutcome<()>> {
        phase_started(self.name(), "upload");
        let file = file.to_path_buf();
        let outcomes = run_all(&self.base.fleet, |host| {
            let mut conn = self.base.connect(host);
            let file = file.clone();
            async move { conn.upload(&file, "").await }
        })
        .await;
        log_outcomes("cassandra-stress upload", &outcomes);
        outcomes
    }
}

#[async_trait]
impl BenchTool for CassandraStress {
    fn name(&self) -> &'static str {
        "cassandra-stress"
    }

    fn fleet(&self) -> &Fleet {
        &self.base.fleet
    }

    async fn install(&self) -> Vec<TaskOutcome<()>> {
        phase_started(self.name(), "install");
        let version = self.cassandra_version.clone();
        let outcomes = run_all(&self.base.fleet, |host| {
            let mut conn = self.base.connect(host);
            let version = version.clone();
            async move {
                conn.update_package_cache().await?;
                conn.install_package_from_candidates(&JDK_CANDIDATES).await?;
                conn.install_package("wget").await?;
                conn.run(&format!(
                    "wget -q -N {TARBALL_MIRROR}/{version}/apache-cassandra-{version}-bin.tar.gz"
                ))
                .await?;
                conn.run(&format!("tar -xzf apache-cassandra-{version}-bin.tar.gz"))
                    .await?;
                Ok(())
            }
        })
        .await;
        log_outcomes("cassandra-stress install", &outcomes);
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
                    format!("rm -fr *.html *.hdr {run_dir}"),
                    // no old load generator may survive into this run
                    "killall -q -9 java".to_string(),
                ] {
                    if let Err(e) = conn.run(&cleanup).await {
                        warn!(host = %conn.host().address, error = %e, "cleanup skipped");
                    }
                }
                Ok(())
            }
        })
        .await;
        log_outcomes("cassandra-stress prepare", &outcomes);
        outcomes
    }

    async fn run(&self, args: &str) -> Vec<TaskOutcome<()>> {
        phase_started(self.name(), "run");
        let run_dir = self.base.run_dir.clone();
        let command = format!("{} {}", self.stress_binary(), args);
        let outcomes = run_all(&self.base.fleet, |host| {
            let mut conn = self.base.connect(host);
            let run_dir = run_dir.clone();
            let command = command.clone();
            async move {
                conn.run(&format!("mkdir -p {run_dir}")).await?;
                conn.run(&format!("cd {run_dir} && {command}")).await?;
                Ok(())
            }
        })
        .await;
        log_outcomes("cassandra-stress run", &outcomes);
        outcomes
    }

    async fn download(&self, dest: &Path) -> Vec<TaskOutcome<()>> {
        phase_started(self.name(), "download");
        let patterns = vec![
            format!("{}/*.html", self.base.run_dir),
            format!("{}/*.hdr", self.base.run_dir),
        ];
        let dest = dest.to_path_buf();
        let outcomes = run_all(&self.base.fleet, |host| {
            let mut conn = self.base.connect(host);
            let patterns = patterns.clone();
            let dest = dest.clone();
            async move { download_artifacts(&mut conn, &dest, &patterns, false).await }
        })
        .await;
        log_outcomes("cassandra-stress download", &outcomes);
        outcomes
    }
}
