//! Process phase: tag extraction, per-tag CSV export, and summarization.
//!
//! A histogram log is a CSV file whose first five lines are metadata and
//! header rows; each data row's first field is the tag name behind a fixed
//! four-character prefix (`Tag=`). The distinct tag set drives one
//! external per-tag extraction each, followed by a summary of the whole
//! log.
//!
//! Every external invocation receives the merged log's containing
//! directory as its working directory, carried in the invocation spec
//! itself. The orchestrator's own working directory is never touched, so
//! there is nothing to restore when an invocation fails.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{HistogramTools, MergedLog};
use crate::error::{Error, Result};
use crate::process::{CommandInvoker, InvocationSpec};

/// Metadata/header rows at the top of a histogram log.
const HEADER_LINES: usize = 5;

/// Width of the tag prefix in a data row's first field.
const TAG_PREFIX_LEN: usize = 4;

/// The text summary produced for one merged log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryReport {
    /// Metric name of the summarized log.
    pub metric: String,
    /// Path of the summary text file, `<metric>-summary.txt`.
    pub path: PathBuf,
}

/// Reads the distinct tag set of a histogram log: skip the header rows,
/// then strip the fixed prefix from each row's first field.
pub fn extract_tags(path: &Path) -> Result<BTreeSet<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| {
            Error::Internal(format!("cannot read histogram log {}: {e}", path.display()))
        })?;

    let mut tags = BTreeSet::new();
    for record in reader.records().skip(HEADER_LINES) {
        let record = record.map_err(|e| {
            Error::Internal(format!("malformed histogram log {}: {e}", path.display()))
        })?;
        let Some(first) = record.get(0) else {
            continue;
        };
        if let Some(tag) = first.get(TAG_PREFIX_LEN..) {
            tags.insert(tag.to_string());
        }
    }
    Ok(tags)
}

/// Runs the per-tag extraction and the summarizer for one merged log.
pub(super) async fn process_log(
    tools: &HistogramTools,
    invoker: &dyn CommandInvoker,
    log: &MergedLog,
) -> Result<SummaryReport> {
    let dir = log
        .path
        .parent()
        .ok_or_else(|| Error::aggregation(&log.metric, "merged log has no parent directory"))?
        .to_path_buf();
    let file_name = log
        .path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::aggregation(&log.metric, "merged log has no file name"))?
        .to_string();

    let tags = extract_tags(&log.path)
        .map_err(|e| Error::aggregation(&log.metric, format!("tag extraction failed: {e}")))?;
    debug!(metric = %log.metric, ?tags, "Extracted tags");

    for tag in &tags {
        let spec = InvocationSpec::new(
            tools.java(),
            vec![
                "-cp".to_string(),
                tools.hdr_jar(),
                "org.HdrHistogram.HistogramLogProcessor".to_string(),
                "-i".to_string(),
                file_name.clone(),
                "-o".to_string(),
                format!("{}_{}", log.metric, tag),
                "-csv".to_string(),
                "-tag".to_string(),
                tag.clone(),
            ],
        )
        .with_cwd(&dir);

        let out = invoker.invoke(&spec).await?;
        if !out.success() {
            return Err(Error::aggregation(
                &log.metric,
                format!(
                    "tag extraction for '{tag}' exited with code {}: {}",
                    out.exit_code,
                    out.stderr.trim()
                ),
            ));
        }
    }

    summarize(tools, invoker, log, &dir, &file_name).await
}

/// Invokes the summarizer and writes its standard output next to the
/// merged log.
async fn summarize(
    tools: &HistogramTools,
    invoker: &dyn CommandInvoker,
    log: &MergedLog,
    dir: &Path,
    file_name: &str,
) -> Result<SummaryReport> {
    let spec = InvocationSpec::new(
        tools.java(),
        vec![
            "-cp".to_string(),
            tools.processor_jar(),
            "CommandDispatcherMain".to_string(),
            "summarize".to_string(),
            "-if".to_string(),
            file_name.to_string(),
        ],
    )
    .with_cwd(dir);

    let out = invoker.invoke(&spec).await?;
    if !out.success() {
        return Err(Error::aggregation(
            &log.metric,
            format!(
                "summarize exited with code {}: {}",
                out.exit_code,
                out.stderr.trim()
            ),
        ));
    }

    let summary_path = dir.join(format!("{}-summary.txt", log.metric));
    std::fs::write(&summary_path, out.stdout)
        .map_err(|e| Error::aggregation(&log.metric, format!("writing summary failed: {e}")))?;

    Ok(SummaryReport {
        metric: log.metric.clone(),
        path: summary_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const HEADER: &str = "\
#[Logged with cassandra-stress]
#[Histogram log format version 1.3]
#[StartTime: 1614843512.306]
\"StartTimestamp\",\"Interval_Length\",\"Interval_Max\",\"Interval_Compressed_Histogram\"
#[BaseTime: 0.0]
";

    fn write_log(rows: &[&str]) -> tempfile::NamedTempFile {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{HEADER}").unwrap();
        for row in rows {
            writeln!(file, "{row}").unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn tags_are_distinct_and_order_independent() {
        let interleaved = write_log(&[
            "Tag=read,0.0,1.0,HISTexample1",
            "Tag=write,0.0,1.0,HISTexample2",
            "Tag=read,1.0,2.0,HISTexample3",
            "Tag=write,1.0,2.0,HISTexample4",
        ]);
        let reversed = write_log(&[
            "Tag=write,1.0,2.0,HISTexample4",
            "Tag=read,1.0,2.0,HISTexample3",
            "Tag=write,0.0,1.0,HISTexample2",
            "Tag=read,0.0,1.0,HISTexample1",
        ]);

        let expected: BTreeSet<String> =
            ["read".to_string(), "write".to_string()].into_iter().collect();
        assert_eq!(extract_tags(interleaved.path()).unwrap(), expected);
        assert_eq!(extract_tags(reversed.path()).unwrap(), expected);
    }

    #[test]
    fn header_rows_never_become_tags() {
        let log = write_log(&["Tag=read,0.0,1.0,HISTexample1"]);
        let tags = extract_tags(log.path()).unwrap();
        assert_eq!(tags.len(), 1);
        assert!(tags.contains("read"));
    }

    #[test]
    fn empty_log_yields_empty_tag_set() {
        let log = write_log(&[]);
        assert!(extract_tags(log.path()).unwrap().is_empty());
    }

    #[test]
    fn unreadable_log_is_an_error_not_a_panic() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("latency.hdr");
        let err = extract_tags(&missing).unwrap_err();
        match err {
            Error::Internal(message) => assert!(message.contains("latency.hdr")),
            other => panic!("expected Internal, got {other:?}"),
        }
    }
}
