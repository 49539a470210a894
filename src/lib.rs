//! # Fleetbench - Distributed Benchmark Orchestration
//!
//! Fleetbench drives storage and load benchmarks (fio, cassandra-stress,
//! diskplorer, scylla-bench) across a fleet of remote hosts reached over
//! `ssh`/`scp`, then merges the per-host HDR histogram logs into
//! fleet-wide results.
//!
//! ## Core Concepts
//!
//! - **Fleet**: the ordered, address-unique set of hosts one orchestration
//!   operation targets
//! - **Connection**: a retrying ssh/scp wrapper bound to one host
//! - **Tool adapter**: the uniform install/prepare/run/download lifecycle
//!   around one benchmark binary
//! - **Fan-out / fan-in**: one concurrent task per fleet member, joined on
//!   a hard barrier before the next phase starts
//! - **Aggregation**: merging per-host histogram logs by metric name and
//!   summarizing them via the external JVM histogram tools
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                   Scenario driver (external)                │
//! └────────────────────────────────────────────────────────────┘
//!          │ install → prepare → run → download      │ aggregate
//!          ▼                                         ▼
//! ┌─────────────────────┐                  ┌─────────────────────┐
//! │    Tool adapters    │                  │     Aggregator      │
//! │ (fio, c-stress, ...)│                  │  (merge + process)  │
//! └─────────────────────┘                  └─────────────────────┘
//!          │ per-host fan-out                        │
//!          ▼                                         ▼
//! ┌─────────────────────┐                  ┌─────────────────────┐
//! │  executor::run_all  │                  │  JVM histogram      │
//! │  (barrier join)     │                  │  tools (black box)  │
//! └─────────────────────┘                  └─────────────────────┘
//!          │
//!          ▼
//! ┌─────────────────────┐
//! │   SshConnection     │──── ssh / scp ───▶  Target hosts
//! └─────────────────────┘
//! ```
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use fleetbench::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let props: Properties = load_yaml("properties.yml")?;
//!     let env: Environment = load_yaml("environment.yml")?;
//!     let invoker: Arc<dyn CommandInvoker> = Arc::new(LocalInvoker::new());
//!
//!     let fleet = Fleet::from_addresses(
//!         &env.loadgenerator_public_ips,
//!         &props.load_generator_user,
//!         &props.ssh_options,
//!     );
//!
//!     let bench = ScyllaBench::new(fleet, &props.scylla_bench_version, invoker.clone());
//!     bench.install().await;
//!     bench.prepare().await;
//!     require_all("run", bench.run("-workload sequential -mode write").await)?;
//!     bench.download("trials/latest".as_ref()).await;
//!
//!     let report = Aggregator::new(&props, invoker)
//!         .aggregate("trials/latest".as_ref())
//!         .await?;
//!     println!("{} metrics merged", report.merged.len());
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod metadata;
pub mod process;
pub mod results;
pub mod telemetry;
pub mod tools;

pub use error::{Error, Result};

/// Convenient re-exports of the commonly used types and traits.
pub mod prelude {
    pub use crate::config::{load_yaml, Environment, Properties};
    pub use crate::connection::{
        ConnectionState, Fleet, Host, PackageManager, SshConnection,
    };
    pub use crate::error::{Error, Result};
    pub use crate::executor::{log_outcomes, require_all, run_all, TaskOutcome};
    pub use crate::metadata::collect_instance_metadata;
    pub use crate::process::{CommandInvoker, InvocationOutput, InvocationSpec, LocalInvoker};
    pub use crate::results::{Aggregator, HistogramTools, MergedLog, SummaryReport};
    pub use crate::telemetry::{init_logging, LogFormat};
    pub use crate::tools::{
        create, BenchTool, CassandraStress, DiskExplorer, Fio, ScyllaBench, ToolKind,
    };
}
