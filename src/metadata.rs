//! Fleet instance metadata capture.
//!
//! Pulls each host's EC2 instance-identity document into
//! `<dest>/<host-address>/metadata.txt`, so a result tree records exactly
//! what hardware produced it.

use std::path::Path;

use crate::connection::Fleet;
use crate::executor::{log_outcomes, run_all, TaskOutcome};
use crate::process::CommandInvoker;
use std::sync::Arc;

const IDENTITY_URL: &str = "http://169.254.169.254/latest/dynamic/instance-identity/document";

/// Captures the instance-identity document of every host in the fleet.
pub async fn collect_instance_metadata(
    fleet: &Fleet,
    dest: &Path,
    invoker: Arc<dyn CommandInvoker>,
) -> Vec<TaskOutcome<()>> {
    let dest = dest.to_path_buf();
    let outcomes = run_all(fleet, |host| {
        let invoker = invoker.clone();
        let dest = dest.clone();
        async move {
            let mut conn = crate::connection::SshConnection::new(host, invoker);
            conn.install_package("curl").await?;
            conn.run(&format!("curl -s {IDENTITY_URL} > metadata.txt")).await?;

            let host_dir = dest.join(&conn.host().address);
            std::fs::create_dir_all(&host_dir)?;
            conn.download("metadata.txt", &host_dir).await
        }
    })
    .await;
    log_outcomes("metadata", &outcomes);
    outcomes
}
