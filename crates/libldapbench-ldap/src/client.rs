use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use ldap3::exop::PasswordModify;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Mod, Scope, SearchEntry};
use tracing::debug;

use libldapbench_core::directory::{Attribute, DirectoryClient, DirectoryConnector, Entry};
use libldapbench_core::{DirectoryError, SearchScope};

use crate::error::{connect_error, to_directory_error};

/// Opens ldap3 connections
#[derive(Debug, Clone, Default)]
pub struct LdapConnector {
    /// Certificates are accepted unchecked unless this is set
    verify_tls: bool,
}

impl LdapConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Verify server certificates instead of accepting any
    pub fn with_tls_verification(mut self, verify: bool) -> Self {
        self.verify_tls = verify;
        self
    }
}

#[async_trait]
impl DirectoryConnector for LdapConnector {
    async fn connect(
        &self,
        url: &str,
        starttls: bool,
    ) -> Result<Box<dyn DirectoryClient>, DirectoryError> {
        let settings = LdapConnSettings::new()
            .set_starttls(starttls)
            .set_no_tls_verify(!self.verify_tls);
        let (conn, ldap) = LdapConnAsync::with_settings(settings, url)
            .await
            .map_err(|e| connect_error(e, starttls))?;
        ldap3::drive!(conn);
        debug!(%url, starttls, "connection open");
        Ok(Box::new(LdapClient { ldap }))
    }
}

/// One open LDAP connection
pub struct LdapClient {
    ldap: Ldap,
}

fn to_scope(scope: SearchScope) -> Scope {
    match scope {
        SearchScope::Base => Scope::Base,
        SearchScope::One => Scope::OneLevel,
        // ldap3 has no children scope; see `without_base`
        SearchScope::Sub | SearchScope::Children => Scope::Subtree,
    }
}

/// Children-scope results: the subtree minus the base entry itself
fn without_base(entries: Vec<Entry>, base_dn: &str) -> Vec<Entry> {
    entries
        .into_iter()
        .filter(|e| !e.dn.eq_ignore_ascii_case(base_dn))
        .collect()
}

fn to_entry(entry: SearchEntry) -> Entry {
    Entry {
        dn: entry.dn,
        attrs: entry
            .attrs
            .into_iter()
            .map(|(name, values)| (name.to_lowercase(), values))
            .collect::<BTreeMap<_, _>>(),
    }
}

#[async_trait]
impl DirectoryClient for LdapClient {
    async fn bind(&mut self, dn: &str, password: &str) -> Result<(), DirectoryError> {
        self.ldap
            .simple_bind(dn, password)
            .await
            .and_then(|r| r.success())
            .map_err(to_directory_error)?;
        Ok(())
    }

    async fn add(&mut self, dn: &str, attrs: Vec<Attribute>) -> Result<(), DirectoryError> {
        let attrs: Vec<(String, HashSet<String>)> = attrs
            .into_iter()
            .map(|a| (a.name, a.values.into_iter().collect()))
            .collect();
        self.ldap
            .add(dn, attrs)
            .await
            .and_then(|r| r.success())
            .map_err(to_directory_error)?;
        Ok(())
    }

    async fn delete(&mut self, dn: &str) -> Result<(), DirectoryError> {
        self.ldap
            .delete(dn)
            .await
            .and_then(|r| r.success())
            .map_err(to_directory_error)?;
        Ok(())
    }

    async fn modify(&mut self, dn: &str, attr: &str, value: &str) -> Result<(), DirectoryError> {
        let mods = vec![Mod::Replace(attr, HashSet::from([value]))];
        self.ldap
            .modify(dn, mods)
            .await
            .and_then(|r| r.success())
            .map_err(to_directory_error)?;
        Ok(())
    }

    async fn search(
        &mut self,
        base_dn: &str,
        scope: SearchScope,
        filter: &str,
        attrs: &[String],
    ) -> Result<Vec<Entry>, DirectoryError> {
        let (entries, _) = self
            .ldap
            .search(base_dn, to_scope(scope), filter, attrs.to_vec())
            .await
            .and_then(|r| r.success())
            .map_err(to_directory_error)?;
        let entries: Vec<Entry> = entries
            .into_iter()
            .map(|e| to_entry(SearchEntry::construct(e)))
            .collect();
        Ok(match scope {
            SearchScope::Children => without_base(entries, base_dn),
            _ => entries,
        })
    }

    async fn password_modify(
        &mut self,
        user_dn: &str,
        old_password: Option<&str>,
        new_password: &str,
    ) -> Result<(), DirectoryError> {
        let exop = PasswordModify {
            user_id: Some(user_dn),
            old_pass: old_password,
            new_pass: Some(new_password),
        };
        self.ldap
            .extended(exop)
            .await
            .and_then(|r| r.success())
            .map_err(to_directory_error)?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DirectoryError> {
        self.ldap.unbind().await.map_err(to_directory_error)
    }
}
