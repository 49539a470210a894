//! Remote package installation.
//!
//! Package managers are detected on the remote host by strict `command -v`
//! probes, in the fixed priority apt → yum → dnf. The first manager found
//! is used exclusively for that call; if the install itself then fails
//! there is no fallback to the next manager. All install/update commands
//! use the manager's non-interactive quiet flags.

use tracing::{debug, info};

use super::SshConnection;
use crate::error::{Error, Result};

/// Supported remote package managers, in detection priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Apt,
    Yum,
    Dnf,
}

impl PackageManager {
    /// Detection priority: apt first, then yum, then dnf.
    pub const PRIORITY: [PackageManager; 3] =
        [PackageManager::Apt, PackageManager::Yum, PackageManager::Dnf];

    /// The binary probed for with `command -v`.
    pub fn probe_binary(&self) -> &'static str {
        match self {
            PackageManager::Apt => "apt-get",
            PackageManager::Yum => "yum",
            PackageManager::Dnf => "dnf",
        }
    }

    /// Remote install command for one package.
    pub fn install_command(&self, package: &str) -> String {
        match self {
            PackageManager::Apt => format!("sudo apt-get install -y -qq {package}"),
            PackageManager::Yum => format!("sudo yum -y -q install {package}"),
            PackageManager::Dnf => format!("sudo dnf -y -q install {package}"),
        }
    }

    /// Remote package-cache refresh command.
    pub fn update_command(&self) -> &'static str {
        match self {
            PackageManager::Apt => "sudo apt-get -y -qq update",
            PackageManager::Yum => "sudo yum -y -q makecache",
            PackageManager::Dnf => "sudo dnf -y -q makecache",
        }
    }

    /// Remote availability query for a package name, or `None` when the
    /// manager has no usable query (candidate installs are apt/yum only).
    pub fn query_command(&self, package: &str) -> Option<String> {
        match self {
            PackageManager::Apt => Some(format!("sudo apt-cache show {package}")),
            PackageManager::Yum => Some(format!("sudo yum list --available {package}")),
            PackageManager::Dnf => None,
        }
    }
}

impl SshConnection {
    /// Detects the remote package manager by probing in fixed priority
    /// order. The probes are strict (exit 0 only); the 0/1 quirk would
    /// otherwise make every manager look present.
    pub async fn detect_package_manager(&mut self) -> Result<Option<PackageManager>> {
        for manager in PackageManager::PRIORITY {
            let probe = format!("command -v {}", manager.probe_binary());
            if self.execute(&probe).await?.success() {
                debug!(host = %self.host().address, manager = ?manager, "Detected package manager");
                return Ok(Some(manager));
            }
        }
        Ok(None)
    }

    /// Refreshes the package cache with the detected manager.
    pub async fn update_package_cache(&mut self) -> Result<()> {
        let manager = self.require_package_manager("(cache update)").await?;
        debug!(host = %self.host().address, "Updating package cache");
        self.run(manager.update_command()).await?;
        Ok(())
    }

    /// Installs a package with the first detected manager. No fallback to
    /// a second manager if the install fails.
    pub async fn install_package(&mut self, package: &str) -> Result<()> {
        let manager = self.require_package_manager(package).await?;
        info!(host = %self.host().address, package, manager = ?manager, "Installing package");
        self.run(&manager.install_command(package)).await?;
        Ok(())
    }

    /// Tries each candidate name in order, querying availability before
    /// installing, and stops at the first installable one. Apt/yum-capable
    /// hosts only.
    pub async fn install_package_from_candidates(&mut self, candidates: &[&str]) -> Result<()> {
        let joined = candidates.join(",");
        let manager = self.require_package_manager(&joined).await?;

        for candidate in candidates {
            let query = match manager.query_command(candidate) {
                Some(query) => query,
                None => {
                    return Err(Error::package_not_found(
                        &self.host().address,
                        joined,
                        format!("candidate install is not supported with {manager:?}"),
                    ))
                }
            };
            if !self.execute(&query).await?.success() {
                debug!(host = %self.host().address, candidate, "Candidate not available");
                continue;
            }
            info!(host = %self.host().address, candidate, "Installing candidate package");
            self.run(&manager.install_command(candidate)).await?;
            return Ok(());
        }

        Err(Error::package_not_found(
            &self.host().address,
            joined,
            "no candidate package is available",
        ))
    }

    async fn require_package_manager(&mut self, package: &str) -> Result<PackageManager> {
        self.detect_package_manager().await?.ok_or_else(|| {
            Error::package_not_found(
                &self.host().address,
                package,
                "no supported package manager (apt/yum/dnf) present",
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Host;
    use crate::process::{CommandInvoker, InvocationOutput, InvocationSpec};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Invoker that answers by matching on the remote command (the last
    /// argv entry of the ssh invocation).
    struct RemoteShellFake {
        handler: Box<dyn Fn(&str) -> i32 + Send + Sync>,
        commands: Mutex<Vec<String>>,
    }

    impl RemoteShellFake {
        fn new(handler: impl Fn(&str) -> i32 + Send + Sync + 'static) -> Self {
            Self {
                handler: Box::new(handler),
                commands: Mutex::new(Vec::new()),
            }
        }

        fn commands(&self) -> Vec<String> {
            self.commands.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommandInvoker for RemoteShellFake {
        async fn invoke(&self, spec: &InvocationSpec) -> crate::error::Result<InvocationOutput> {
            let command = spec.args.last().cloned().unwrap_or_default();
            let exit_code = (self.handler)(&command);
            self.commands.lock().unwrap().push(command);
            Ok(InvocationOutput {
                exit_code,
                ..Default::default()
            })
        }
    }

    fn connection(invoker: Arc<RemoteShellFake>) -> SshConnection {
        SshConnection::new(Host::new("10.0.0.9", "fedora", ""), invoker)
    }

    #[tokio::test]
    async fn apt_host_uses_apt_and_never_probes_yum() {
        let invoker = Arc::new(RemoteShellFake::new(|cmd| {
            if cmd == "command -v apt-get" || cmd.starts_with("sudo apt-get install") || cmd == "ls"
            {
                0
            } else {
                127
            }
        }));
        let mut conn = connection(invoker.clone());

        conn.install_package("fio").await.unwrap();

        let commands = invoker.commands();
        assert!(commands.contains(&"sudo apt-get install -y -qq fio".to_string()));
        assert!(!commands.iter().any(|c| c.contains("yum")));
        assert!(!commands.iter().any(|c| c.contains("dnf")));
    }

    #[tokio::test]
    async fn yum_host_is_detected_after_apt_probe_fails() {
        let invoker = Arc::new(RemoteShellFake::new(|cmd| match cmd {
            "ls" | "command -v yum" => 0,
            cmd if cmd.starts_with("sudo yum") => 0,
            _ => 127,
        }));
        let mut conn = connection(invoker.clone());

        conn.install_package("fio").await.unwrap();

        let commands = invoker.commands();
        assert!(commands.contains(&"command -v apt-get".to_string()));
        assert!(commands.contains(&"sudo yum -y -q install fio".to_string()));
    }

    #[tokio::test]
    async fn missing_manager_is_package_not_found() {
        let invoker = Arc::new(RemoteShellFake::new(|cmd| if cmd == "ls" { 0 } else { 127 }));
        let mut conn = connection(invoker);

        let err = conn.install_package("fio").await.unwrap_err();
        assert!(matches!(err, Error::PackageNotFound { .. }));
    }

    #[tokio::test]
    async fn candidates_stop_at_first_available() {
        let invoker = Arc::new(RemoteShellFake::new(|cmd| match cmd {
            "ls" | "command -v apt-get" => 0,
            "sudo apt-cache show openjdk-8-jdk" => 100,
            "sudo apt-cache show java-1.8.0-openjdk" => 0,
            "sudo apt-get install -y -qq java-1.8.0-openjdk" => 0,
            _ => 127,
        }));
        let mut conn = connection(invoker.clone());

        conn.install_package_from_candidates(&["openjdk-8-jdk", "java-1.8.0-openjdk"])
            .await
            .unwrap();

        let commands = invoker.commands();
        assert!(commands.contains(&"sudo apt-get install -y -qq java-1.8.0-openjdk".to_string()));
        assert!(!commands
            .iter()
            .any(|c| c == "sudo apt-get install -y -qq openjdk-8-jdk"));
    }

    #[tokio::test]
    async fn no_available_candidate_is_package_not_found() {
        let invoker = Arc::new(RemoteShellFake::new(|cmd| match cmd {
            "ls" | "command -v apt-get" => 0,
            _ => 100,
        }));
        let mut conn = connection(invoker);

        let err = conn
            .install_package_from_candidates(&["a", "b"])
            .await
            .unwrap_err();
        match err {
            Error::PackageNotFound { package, .. } => assert_eq!(package, "a,b"),
            other => panic!("expected PackageNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn dnf_host_rejects_candidate_install() {
        let invoker = Arc::new(RemoteShellFake::new(|cmd| match cmd {
            "ls" | "command -v dnf" => 0,
            _ => 127,
        }));
        let mut conn = connection(invoker);

        let err = conn
            .install_package_from_candidates(&["golang"])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PackageNotFound { .. }));
    }
}
