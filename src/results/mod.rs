//! Post-processing of downloaded histogram logs.
//!
//! After a download phase the destination root looks like
//! `<dest>/<host-address>/*.hdr`. Aggregation has two sequential phases:
//!
//! 1. **Merge** — group the per-host logs by metric name (filename stem)
//!    and union each group into `<dest>/<metric>.hdr`.
//! 2. **Process** — for each merged log, extract the distinct tag set,
//!    produce a per-tag CSV, and write a textual summary.
//!
//! Both phases invoke the external JVM histogram tools as black boxes; a
//! failed invocation surfaces as an [`Error::Aggregation`] for that metric
//! and never aborts the remaining metrics.

mod merge;
mod process;

pub use merge::MergedLog;
pub use process::{extract_tags, SummaryReport};

use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Properties;
use crate::error::{Error, Result};
use crate::process::CommandInvoker;

/// Locations of the external JVM histogram tools.
#[derive(Debug, Clone)]
pub struct HistogramTools {
    jvm_path: String,
    lib_dir: String,
}

impl HistogramTools {
    /// Creates tool locations from explicit paths.
    pub fn new(jvm_path: impl Into<String>, lib_dir: impl Into<String>) -> Self {
        Self {
            jvm_path: jvm_path.into(),
            lib_dir: lib_dir.into(),
        }
    }

    /// Reads the tool locations from the property set.
    pub fn from_properties(properties: &Properties) -> Self {
        Self::new(&properties.jvm_path, &properties.lib_dir)
    }

    fn java(&self) -> String {
        format!("{}/bin/java", self.jvm_path)
    }

    fn processor_jar(&self) -> String {
        format!("{}/processor.jar", self.lib_dir)
    }

    fn hdr_jar(&self) -> String {
        format!("{}/HdrHistogram-2.1.9.jar", self.lib_dir)
    }
}

/// Everything one aggregation run produced, successes and failures side
/// by side.
#[derive(Debug, Default)]
pub struct AggregateReport {
    /// Fleet-wide merged logs, one per metric name.
    pub merged: Vec<MergedLog>,
    /// Text summaries, one per successfully processed merged log.
    pub summaries: Vec<SummaryReport>,
    /// Per-metric failures; the corresponding metric has no summary.
    pub failures: Vec<Error>,
}

/// Merges and summarizes the histogram logs under a downloaded directory
/// tree.
pub struct Aggregator {
    tools: HistogramTools,
    invoker: Arc<dyn CommandInvoker>,
}

impl Aggregator {
    /// Creates an aggregator from the property set.
    pub fn new(properties: &Properties, invoker: Arc<dyn CommandInvoker>) -> Self {
        Self {
            tools: HistogramTools::from_properties(properties),
            invoker,
        }
    }

    /// Creates an aggregator with explicit tool locations.
    pub fn with_tools(tools: HistogramTools, invoker: Arc<dyn CommandInvoker>) -> Self {
        Self { tools, invoker }
    }

    /// Runs merge then process over `dest`. An `Err` is returned only for
    /// failures of the scan itself; per-metric tool failures are collected
    /// in the report.
    pub async fn aggregate(&self, dest: &Path) -> Result<AggregateReport> {
        info!(dest = %dest.display(), "Aggregating histogram logs");
        let mut report = AggregateReport::default();

        let (merged, merge_failures) =
            merge::merge_all(&self.tools, self.invoker.as_ref(), dest).await?;
        report.failures = merge_failures;

        for log in &merged {
            match process::process_log(&self.tools, self.invoker.as_ref(), log).await {
                Ok(summary) => report.summaries.push(summary),
                Err(e) => {
                    warn!(metric = %log.metric, error = %e, "Processing failed");
                    report.failures.push(e);
                }
            }
        }

        report.merged = merged;
        info!(
            merged = report.merged.len(),
            summaries = report.summaries.len(),
            failures = report.failures.len(),
            "Aggregation finished"
        );
        Ok(report)
    }
}
