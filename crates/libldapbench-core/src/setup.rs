//! Directory population for benchmark runs
//!
//! `setup base` creates the suffix entry and `setup person` creates
//! `cn=<prefix><id>` person entries under it, so that bind, search, modify
//! and delete runs have something to act on.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::directory::{Attribute, DirectoryClient, DirectoryConnector};
use crate::error::{BenchError, Result};
use crate::template::Template;

/// Where and as whom setup entries are written
#[derive(Debug, Clone)]
pub struct SetupTarget {
    pub url: String,
    pub starttls: bool,
    pub bind_dn: String,
    pub bind_password: String,
    pub base_dn: String,
}

/// Person entries to create
#[derive(Debug, Clone)]
pub struct PersonSpec {
    /// cn prefix, or a template when it contains `%`
    pub cn: String,
    /// Defaults to the cn
    pub sn: Option<String>,
    pub password: String,
    pub first: u64,
    /// 0 creates a single entry named by `cn` alone
    pub last: u64,
}

impl Default for PersonSpec {
    fn default() -> Self {
        Self {
            cn: "user".to_string(),
            sn: None,
            password: "secret".to_string(),
            first: 1,
            last: 0,
        }
    }
}

impl PersonSpec {
    /// Common names in creation order
    pub fn common_names(&self) -> Result<Vec<String>> {
        if self.last == 0 {
            return Ok(vec![self.cn.clone()]);
        }
        if self.cn.contains('%') {
            let template = Template::parse(&self.cn)?;
            Ok((self.first..=self.last).map(|id| template.render(id)).collect())
        } else {
            Ok((self.first..=self.last)
                .map(|id| format!("{}{}", self.cn, id))
                .collect())
        }
    }

    fn attributes(&self, cn: &str) -> Vec<Attribute> {
        let sn = self.sn.as_deref().unwrap_or(cn);
        vec![
            Attribute::new("objectClass", &["person"]),
            Attribute::new("cn", &[cn]),
            Attribute::new("sn", &[sn]),
            Attribute::new("userPassword", &[self.password.as_str()]),
        ]
    }
}

/// Entries written by one setup command
#[derive(Debug, Clone, Default, Serialize)]
pub struct SetupOutcome {
    pub added: Vec<String>,
    pub failed: Vec<SetupFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetupFailure {
    pub dn: String,
    pub error: String,
}

impl SetupOutcome {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Attributes of the suffix entry: `dcObject`/`organization` with `o: lb`
/// and `dc` taken from the first RDN
pub fn base_attributes(base_dn: &str) -> Vec<Attribute> {
    let dc = base_dn
        .split(',')
        .next()
        .and_then(|rdn| rdn.split_once('='))
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
        .unwrap_or("example");
    vec![
        Attribute::new("objectClass", &["dcObject", "organization"]),
        Attribute::new("o", &["lb"]),
        Attribute::new("dc", &[dc]),
    ]
}

/// Create the base entry
pub async fn setup_base(
    connector: Arc<dyn DirectoryConnector>,
    target: &SetupTarget,
) -> Result<SetupOutcome> {
    let mut client = open(connector.as_ref(), target).await?;
    let mut outcome = SetupOutcome::default();
    add_entry(
        client.as_mut(),
        &target.base_dn,
        base_attributes(&target.base_dn),
        &mut outcome,
    )
    .await;
    close(client).await;
    Ok(outcome)
}

/// Create the person entries described by `spec` under the base DN
pub async fn setup_person(
    connector: Arc<dyn DirectoryConnector>,
    target: &SetupTarget,
    spec: &PersonSpec,
) -> Result<SetupOutcome> {
    let names = spec.common_names()?;
    let mut client = open(connector.as_ref(), target).await?;
    let mut outcome = SetupOutcome::default();
    for cn in &names {
        let dn = format!("cn={},{}", cn, target.base_dn);
        add_entry(client.as_mut(), &dn, spec.attributes(cn), &mut outcome).await;
    }
    info!(
        added = outcome.added.len(),
        failed = outcome.failed.len(),
        "person setup finished"
    );
    close(client).await;
    Ok(outcome)
}

async fn open(
    connector: &dyn DirectoryConnector,
    target: &SetupTarget,
) -> Result<Box<dyn DirectoryClient>> {
    let mut client = connector
        .connect(&target.url, target.starttls)
        .await
        .map_err(|e| BenchError::Setup(format!("failed to connect to {}: {}", target.url, e)))?;
    if let Err(e) = client.bind(&target.bind_dn, &target.bind_password).await {
        close(client).await;
        return Err(BenchError::Setup(format!(
            "bind as '{}' failed: {}",
            target.bind_dn, e
        )));
    }
    Ok(client)
}

async fn add_entry(
    client: &mut dyn DirectoryClient,
    dn: &str,
    attrs: Vec<Attribute>,
    outcome: &mut SetupOutcome,
) {
    debug!(%dn, "adding entry");
    match client.add(dn, attrs).await {
        Ok(()) => outcome.added.push(dn.to_string()),
        Err(e) => {
            warn!(%dn, error = %e, "add failed");
            outcome.failed.push(SetupFailure {
                dn: dn.to_string(),
                error: e.to_string(),
            });
        }
    }
}

async fn close(mut client: Box<dyn DirectoryClient>) {
    if let Err(e) = client.close().await {
        warn!(error = %e, "close failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDirectory;

    const ROOT_DN: &str = "cn=Manager,dc=example,dc=com";

    fn target() -> SetupTarget {
        SetupTarget {
            url: "ldap://memory".to_string(),
            starttls: false,
            bind_dn: ROOT_DN.to_string(),
            bind_password: "secret".to_string(),
            base_dn: "dc=example,dc=com".to_string(),
        }
    }

    #[test]
    fn test_common_names() {
        let single = PersonSpec::default();
        assert_eq!(single.common_names().unwrap(), vec!["user"]);

        let prefixed = PersonSpec {
            last: 3,
            ..Default::default()
        };
        assert_eq!(prefixed.common_names().unwrap(), vec!["user1", "user2", "user3"]);

        let templated = PersonSpec {
            cn: "u%04d".to_string(),
            first: 9,
            last: 10,
            ..Default::default()
        };
        assert_eq!(templated.common_names().unwrap(), vec!["u0009", "u0010"]);

        let bad = PersonSpec {
            cn: "u%s".to_string(),
            last: 2,
            ..Default::default()
        };
        assert!(matches!(bad.common_names(), Err(BenchError::InvalidTemplate { .. })));
    }

    #[test]
    fn test_base_attributes_take_first_rdn() {
        let attrs = base_attributes("dc=acme,dc=org");
        let dc = attrs.iter().find(|a| a.name == "dc").unwrap();
        assert_eq!(dc.values, vec!["acme".to_string()]);
        let oc = attrs.iter().find(|a| a.name == "objectClass").unwrap();
        assert_eq!(oc.values.len(), 2);
    }

    #[tokio::test]
    async fn test_setup_base_and_person() {
        let dir = MemoryDirectory::new().with_root(ROOT_DN, "secret");
        let outcome = setup_base(Arc::new(dir.clone()), &target()).await.unwrap();
        assert!(outcome.is_success());
        assert!(dir.contains("dc=example,dc=com"));

        let spec = PersonSpec {
            last: 5,
            ..Default::default()
        };
        let outcome = setup_person(Arc::new(dir.clone()), &target(), &spec)
            .await
            .unwrap();
        assert_eq!(outcome.added.len(), 5);
        let entry = dir.get("cn=user3,dc=example,dc=com").unwrap();
        assert_eq!(entry.attrs["sn"], vec!["user3".to_string()]);
        assert_eq!(entry.attrs["userpassword"], vec!["secret".to_string()]);
    }

    #[tokio::test]
    async fn test_existing_entries_are_reported_as_failures() {
        let dir = MemoryDirectory::new().with_root(ROOT_DN, "secret");
        let spec = PersonSpec {
            last: 2,
            ..Default::default()
        };
        setup_person(Arc::new(dir.clone()), &target(), &spec)
            .await
            .unwrap();
        let again = setup_person(Arc::new(dir.clone()), &target(), &spec)
            .await
            .unwrap();
        assert!(again.added.is_empty());
        assert_eq!(again.failed.len(), 2);
        assert!(!again.is_success());
    }

    #[tokio::test]
    async fn test_setup_bind_failure() {
        let dir = MemoryDirectory::new().with_root(ROOT_DN, "secret");
        let mut target = target();
        target.bind_password = "wrong".to_string();
        let err = setup_base(Arc::new(dir.clone()), &target).await.unwrap_err();
        assert!(matches!(err, BenchError::Setup(_)));
        assert!(dir.is_empty());
    }
}
