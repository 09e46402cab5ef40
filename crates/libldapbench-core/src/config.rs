//! Run configuration and connection profiles

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::directory::SearchScope;
use crate::error::{BenchError, Result};
use crate::template::IdRange;

pub const DEFAULT_BIND_DN: &str = "cn=Manager,dc=example,dc=com";
pub const DEFAULT_BIND_PASSWORD: &str = "secret";
pub const DEFAULT_BASE_DN: &str = "dc=example,dc=com";

/// Operation kinds that can be benchmarked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Noop,
    Add,
    Bind,
    Delete,
    Modify,
    Search,
    Passmod,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Noop => "noop",
            OperationKind::Add => "add",
            OperationKind::Bind => "bind",
            OperationKind::Delete => "delete",
            OperationKind::Modify => "modify",
            OperationKind::Search => "search",
            OperationKind::Passmod => "passmod",
        }
    }

    /// Display label used in the run banner
    pub fn label(&self) -> &'static str {
        match self {
            OperationKind::Noop => "Test",
            OperationKind::Add => "Add",
            OperationKind::Bind => "Bind",
            OperationKind::Delete => "Delete",
            OperationKind::Modify => "Modify",
            OperationKind::Search => "Search",
            OperationKind::Passmod => "Passmod",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters for the no-op smoke test
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoopParams {
    /// Sleep per request in milliseconds
    pub delay_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddParams {
    /// Use a fresh UUID for each cn instead of `{worker}-{sequence}`
    pub uuid: bool,
}

/// Bind parameters; the bind DN itself comes from [`RunConfig::bind_dn`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindParams {
    pub first: u64,
    pub last: u64,
}

impl Default for BindParams {
    fn default() -> Self {
        Self { first: 1, last: 0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModifyParams {
    pub attr: String,
    pub value: String,
}

impl Default for ModifyParams {
    fn default() -> Self {
        Self {
            attr: "sn".to_string(),
            value: "modified".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchParams {
    pub scope: SearchScope,
    pub filter: String,
    pub attributes: Vec<String>,
    pub first: u64,
    pub last: u64,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            scope: SearchScope::Sub,
            filter: "(objectClass=*)".to_string(),
            attributes: vec!["dn".to_string()],
            first: 1,
            last: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassmodParams {
    pub new_password: String,
    /// Falls back to the bind password when unset
    pub old_password: Option<String>,
}

impl Default for PassmodParams {
    fn default() -> Self {
        Self {
            new_password: "newsecret".to_string(),
            old_password: None,
        }
    }
}

/// Per-operation parameters; the variant selects the workload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "lowercase")]
pub enum WorkloadParams {
    Noop(NoopParams),
    Add(AddParams),
    Bind(BindParams),
    Delete,
    Modify(ModifyParams),
    Search(SearchParams),
    Passmod(PassmodParams),
}

impl WorkloadParams {
    pub fn kind(&self) -> OperationKind {
        match self {
            WorkloadParams::Noop(_) => OperationKind::Noop,
            WorkloadParams::Add(_) => OperationKind::Add,
            WorkloadParams::Bind(_) => OperationKind::Bind,
            WorkloadParams::Delete => OperationKind::Delete,
            WorkloadParams::Modify(_) => OperationKind::Modify,
            WorkloadParams::Search(_) => OperationKind::Search,
            WorkloadParams::Passmod(_) => OperationKind::Passmod,
        }
    }
}

/// Configuration for one benchmark run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub url: String,
    /// Total requests requested by the user
    pub requests: u64,
    /// Number of concurrent workers
    pub concurrency: usize,
    pub bind_dn: String,
    pub bind_password: String,
    pub base_dn: String,
    pub starttls: bool,
    pub params: WorkloadParams,
}

impl RunConfig {
    /// A config with the built-in defaults for everything but the target and workload
    pub fn new(url: impl Into<String>, params: WorkloadParams) -> Self {
        Self {
            url: url.into(),
            requests: 1,
            concurrency: 1,
            bind_dn: DEFAULT_BIND_DN.to_string(),
            bind_password: DEFAULT_BIND_PASSWORD.to_string(),
            base_dn: DEFAULT_BASE_DN.to_string(),
            starttls: false,
            params,
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.params.kind()
    }

    /// Requests each worker issues: `ceil(requests / concurrency)`.
    ///
    /// The realized total may exceed `requests` when it does not divide
    /// evenly; that overshoot is kept.
    pub fn iterations_per_worker(&self) -> u64 {
        iterations_per_worker(self.requests, self.concurrency)
    }

    /// Check values that would otherwise fail deep inside a worker
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(BenchError::InvalidConfig("server URL is empty".to_string()));
        }
        if let WorkloadParams::Modify(p) = &self.params {
            if p.attr.trim().is_empty() {
                return Err(BenchError::InvalidConfig(
                    "modify attribute name is empty".to_string(),
                ));
            }
        }
        if let WorkloadParams::Search(p) = &self.params {
            if p.filter.trim().is_empty() {
                return Err(BenchError::InvalidConfig("search filter is empty".to_string()));
            }
        }
        Ok(())
    }

    /// Identifier range for templated bind DNs or search filters
    pub fn id_range(&self) -> Option<IdRange> {
        match &self.params {
            WorkloadParams::Bind(p) => IdRange::new(p.first, p.last),
            WorkloadParams::Search(p) => IdRange::new(p.first, p.last),
            _ => None,
        }
    }
}

/// `ceil(requests / concurrency)`, or 0 when there are no workers
pub fn iterations_per_worker(requests: u64, concurrency: usize) -> u64 {
    if concurrency == 0 {
        return 0;
    }
    requests.div_ceil(concurrency as u64)
}

/// Connection defaults loaded from a TOML profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_dn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_dn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starttls: Option<bool>,
}

impl ConnectionProfile {
    pub fn bind_dn_or_default(&self) -> String {
        self.bind_dn.clone().unwrap_or_else(|| DEFAULT_BIND_DN.to_string())
    }

    pub fn bind_password_or_default(&self) -> String {
        self.bind_password
            .clone()
            .unwrap_or_else(|| DEFAULT_BIND_PASSWORD.to_string())
    }

    pub fn base_dn_or_default(&self) -> String {
        self.base_dn.clone().unwrap_or_else(|| DEFAULT_BASE_DN.to_string())
    }
}

/// Load a connection profile from a TOML file
pub fn load_profile(path: &Path) -> Result<ConnectionProfile> {
    if !path.exists() {
        return Err(BenchError::InvalidConfig(format!(
            "profile not found: {}",
            path.display()
        )));
    }
    let content = std::fs::read_to_string(path)?;
    let profile: ConnectionProfile = toml::from_str(&content)?;
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_iterations_use_ceiling_division() {
        assert_eq!(iterations_per_worker(10, 4), 3);
        assert_eq!(iterations_per_worker(12, 4), 3);
        assert_eq!(iterations_per_worker(0, 4), 0);
        assert_eq!(iterations_per_worker(1, 8), 1);
        assert_eq!(iterations_per_worker(10, 0), 0);
    }

    #[test]
    fn test_realized_total_covers_request() {
        for c in 1..=16usize {
            for n in 0..=100u64 {
                let realized = c as u64 * iterations_per_worker(n, c);
                assert!(realized >= n);
                assert!(realized < n + c as u64);
            }
        }
    }

    #[test]
    fn test_kind_from_params() {
        let config = RunConfig::new("ldap://localhost", WorkloadParams::Delete);
        assert_eq!(config.kind(), OperationKind::Delete);
        assert_eq!(config.bind_dn, DEFAULT_BIND_DN);
        assert!(config.id_range().is_none());
    }

    #[test]
    fn test_validate_rejects_empty_url() {
        let config = RunConfig::new(" ", WorkloadParams::Delete);
        assert!(matches!(config.validate(), Err(BenchError::InvalidConfig(_))));
    }

    #[test]
    fn test_load_profile() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ldapbench.toml");
        std::fs::write(
            &path,
            "url = \"ldap://ldap.example.com\"\nbind_dn = \"cn=admin,dc=example,dc=com\"\nstarttls = true\n",
        )
        .unwrap();

        let profile = load_profile(&path).unwrap();
        assert_eq!(profile.url.as_deref(), Some("ldap://ldap.example.com"));
        assert_eq!(profile.bind_dn_or_default(), "cn=admin,dc=example,dc=com");
        assert_eq!(profile.bind_password_or_default(), DEFAULT_BIND_PASSWORD);
        assert_eq!(profile.starttls, Some(true));
    }

    #[test]
    fn test_load_profile_missing_file() {
        let dir = tempdir().unwrap();
        let result = load_profile(&dir.path().join("missing.toml"));
        assert!(matches!(result, Err(BenchError::InvalidConfig(_))));
    }
}
