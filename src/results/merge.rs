//! Merge phase: union per-host histogram logs by metric name.
//!
//! The scan deliberately walks only the *host subdirectories* of the
//! destination root. Merged outputs land in the root itself, so a merged
//! log can never be picked up as an input to a later merge — feeding a
//! union its own prior output would double-count every sample.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use super::HistogramTools;
use crate::error::{Error, Result};
use crate::process::{CommandInvoker, InvocationSpec};

/// A fleet-wide merged histogram log, one per distinct metric name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedLog {
    /// Metric name (filename stem shared by the per-host inputs).
    pub metric: String,
    /// Path of the merged log, `<dest>/<metric>.hdr`.
    pub path: PathBuf,
}

/// Scans the host subdirectories for `*.hdr` files, grouped by metric
/// name. Files directly in `dest` (previous merge outputs) are excluded
/// by construction.
pub(super) fn collect_host_logs(dest: &Path) -> Result<BTreeMap<String, Vec<PathBuf>>> {
    let mut groups: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();

    for entry in WalkDir::new(dest).min_depth(2) {
        let entry = entry.map_err(|e| Error::Internal(format!("scan of {dest:?} failed: {e}")))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("hdr") {
            continue;
        }
        let Some(metric) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        debug!(file = %path.display(), metric, "Found histogram log");
        groups.entry(metric.to_string()).or_default().push(path.to_path_buf());
    }

    Ok(groups)
}

/// Merges every metric group, returning the merged logs and the
/// per-metric failures. A failing metric never stops the others.
pub(super) async fn merge_all(
    tools: &HistogramTools,
    invoker: &dyn CommandInvoker,
    dest: &Path,
) -> Result<(Vec<MergedLog>, Vec<Error>)> {
    let groups = collect_host_logs(dest)?;
    info!(metrics = groups.len(), dest = %dest.display(), "Merging histogram logs");

    let mut merged = Vec::new();
    let mut failures = Vec::new();

    for (metric, files) in groups {
        let output = dest.join(format!("{metric}.hdr"));
        match union(tools, invoker, &metric, &files, &output).await {
            Ok(()) => merged.push(MergedLog {
                metric,
                path: output,
            }),
            Err(e) => failures.push(e),
        }
    }

    Ok((merged, failures))
}

/// Invokes the external histogram union over one metric group. The union
/// is commutative, so the order of `files` does not affect the result.
async fn union(
    tools: &HistogramTools,
    invoker: &dyn CommandInvoker,
    metric: &str,
    files: &[PathBuf],
    output: &Path,
) -> Result<()> {
    let mut args = vec![
        "-cp".to_string(),
        tools.processor_jar(),
        "CommandDispatcherMain".to_string(),
        "union".to_string(),
    ];
    for file in files {
        args.push("-ifp".to_string());
        args.push(file.display().to_string());
    }
    args.push("-of".to_string());
    args.push(output.display().to_string());

    let spec = InvocationSpec::new(tools.java(), args);
    debug!(metric, inputs = files.len(), "Union");
    let out = invoker.invoke(&spec).await?;
    if out.success() {
        Ok(())
    } else {
        Err(Error::aggregation(
            metric,
            format!(
                "union exited with code {}: {}",
                out.exit_code,
                out.stderr.trim()
            ),
        ))
    }
}
