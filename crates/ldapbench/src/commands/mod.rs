pub mod bench;
pub mod setup;

use std::sync::Arc;

use libldapbench_core::{load_profile, BenchError, ConnectionProfile, DirectoryConnector, MemoryDirectory};
use libldapbench_ldap::LdapConnector;
use tracing::debug;

use crate::cli::{Cli, ConnectionArgs};

/// URL scheme served by the in-process directory
const MEMORY_SCHEME: &str = "memory:";

/// Connection settings after applying flags over the profile over defaults
#[derive(Debug, Clone)]
pub struct Connection {
    pub url: String,
    pub bind_dn: String,
    pub bind_password: String,
    pub base_dn: String,
    pub starttls: bool,
}

impl Connection {
    pub fn resolve(cli: &Cli, args: &ConnectionArgs) -> Result<Self, BenchError> {
        let profile = match &cli.config {
            Some(path) => load_profile(path)?,
            None => ConnectionProfile::default(),
        };

        let url = args
            .url
            .clone()
            .or_else(|| profile.url.clone())
            .ok_or_else(|| {
                BenchError::InvalidConfig(
                    "no server URL given; pass it as an argument or set `url` in the profile"
                        .to_string(),
                )
            })?;

        Ok(Self {
            url,
            bind_dn: args
                .bind_dn
                .clone()
                .unwrap_or_else(|| profile.bind_dn_or_default()),
            bind_password: args
                .bind_password
                .clone()
                .unwrap_or_else(|| profile.bind_password_or_default()),
            base_dn: args
                .base_dn
                .clone()
                .unwrap_or_else(|| profile.base_dn_or_default()),
            starttls: args.starttls || profile.starttls.unwrap_or(false),
        })
    }

    /// The directory backend serving this URL
    pub fn connector(&self) -> Arc<dyn DirectoryConnector> {
        if self.url.starts_with(MEMORY_SCHEME) {
            debug!(url = %self.url, "using in-process directory");
            Arc::new(MemoryDirectory::new().with_root(&self.bind_dn, &self.bind_password))
        } else {
            Arc::new(LdapConnector::new())
        }
    }
}
