//! Configuration inputs.
//!
//! Scenario drivers hand us two read-only documents produced elsewhere: a
//! property set (`properties.yml`) with tool locations and login users, and
//! an environment set (`environment.yml`) with the fleet address lists
//! written out by provisioning. Both are treated as opaque validated input;
//! unrecognized keys are preserved but ignored.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;

/// Loads a YAML document into a deserializable type.
pub fn load_yaml<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    Ok(serde_yaml::from_str(&contents)?)
}

/// The property set: tool locations, versions and login users.
#[derive(Debug, Clone, Deserialize)]
pub struct Properties {
    /// Opaque ssh/scp option string, passed through verbatim (identity
    /// file, strict host-key checking, ...).
    #[serde(default)]
    pub ssh_options: String,
    /// JVM installation used to run the histogram tools.
    #[serde(default = "default_jvm_path")]
    pub jvm_path: String,
    /// Directory holding `processor.jar` and the HdrHistogram jar.
    #[serde(default)]
    pub lib_dir: String,
    /// Apache Cassandra version for the cassandra-stress tarball.
    #[serde(default)]
    pub cassandra_version: String,
    /// Pinned scylla-bench version for `go install`.
    #[serde(default = "default_scylla_bench_version")]
    pub scylla_bench_version: String,
    /// Login user on the load-generator hosts.
    #[serde(default = "default_user")]
    pub load_generator_user: String,
    /// Login user on the cluster hosts.
    #[serde(default = "default_user")]
    pub cluster_user: String,
    /// Unrecognized keys, kept for forward compatibility.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

fn default_jvm_path() -> String {
    "/usr".to_string()
}

fn default_scylla_bench_version() -> String {
    "latest".to_string()
}

fn default_user() -> String {
    "ubuntu".to_string()
}

/// The environment set: address lists written by provisioning.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Environment {
    /// Public addresses of the cluster under test.
    #[serde(default)]
    pub cluster_public_ips: Vec<String>,
    /// Private addresses the load generators point their traffic at.
    #[serde(default)]
    pub cluster_private_ips: Vec<String>,
    /// Public addresses of the load-generator hosts.
    #[serde(default)]
    pub loadgenerator_public_ips: Vec<String>,
    /// Unrecognized keys, kept for forward compatibility.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn properties_parse_with_defaults_and_extra_keys() {
        let yaml = r#"
ssh_options: "-i key.pem -o StrictHostKeyChecking=no"
lib_dir: "/opt/sso/lib"
cassandra_version: "3.11.10"
terraform_plan: "ec2-cluster"
"#;
        let props: Properties = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(props.ssh_options, "-i key.pem -o StrictHostKeyChecking=no");
        assert_eq!(props.cassandra_version, "3.11.10");
        assert_eq!(props.jvm_path, "/usr");
        assert_eq!(props.load_generator_user, "ubuntu");
        assert!(props.extra.contains_key("terraform_plan"));
    }

    #[test]
    fn environment_parses_address_lists() {
        let yaml = r#"
cluster_public_ips: ["10.0.0.1", "10.0.0.2"]
cluster_private_ips: ["172.16.0.1", "172.16.0.2"]
loadgenerator_public_ips: ["10.0.1.1"]
"#;
        let env: Environment = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(env.cluster_public_ips.len(), 2);
        assert_eq!(env.loadgenerator_public_ips, vec!["10.0.1.1"]);
    }
}
