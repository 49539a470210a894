//! Shared test doubles.
//!
//! `FakeInvoker` stands in for the real process boundary: every invocation
//! is recorded, and a scripted handler decides the response. Handlers can
//! also touch the local filesystem to simulate what scp or the histogram
//! tools would have produced.
#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Mutex;

use fleetbench::process::{CommandInvoker, InvocationOutput, InvocationSpec};
use fleetbench::Result;

type Handler = Box<dyn Fn(&InvocationSpec) -> InvocationOutput + Send + Sync>;

pub struct FakeInvoker {
    handler: Handler,
    calls: Mutex<Vec<InvocationSpec>>,
}

impl FakeInvoker {
    pub fn new(handler: impl Fn(&InvocationSpec) -> InvocationOutput + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Responds with exit 0 to everything.
    pub fn permissive() -> Self {
        Self::new(|_| InvocationOutput::default())
    }

    pub fn calls(&self) -> Vec<InvocationSpec> {
        self.calls.lock().unwrap().clone()
    }

    /// The remote command strings of all `ssh` invocations seen so far.
    pub fn remote_commands(&self) -> Vec<String> {
        self.calls()
            .iter()
            .filter(|spec| spec.program == "ssh")
            .filter_map(|spec| spec.args.last().cloned())
            .collect()
    }
}

#[async_trait]
impl CommandInvoker for FakeInvoker {
    async fn invoke(&self, spec: &InvocationSpec) -> Result<InvocationOutput> {
        self.calls.lock().unwrap().push(spec.clone());
        Ok((self.handler)(spec))
    }
}

/// Response with a given exit code and empty output.
pub fn exit(code: i32) -> InvocationOutput {
    InvocationOutput {
        exit_code: code,
        ..Default::default()
    }
}

/// The `user@host` login target of an ssh/scp invocation, if present.
pub fn login_of(spec: &InvocationSpec) -> Option<&String> {
    spec.args.iter().find(|a| a.contains('@'))
}
