//! Directory client capability
//!
//! The engine never speaks the wire protocol itself. Workloads talk to a
//! [`DirectoryClient`] obtained from a [`DirectoryConnector`]; the LDAP
//! backend and the in-memory directory both implement these traits.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by a directory client
#[derive(Debug, Clone, Error)]
pub enum DirectoryError {
    /// Transport could not be established
    #[error("connection failed: {0}")]
    Connect(String),

    /// StartTLS negotiation failed
    #[error("TLS error: {0}")]
    Tls(String),

    /// Server answered with a non-zero result code
    #[error("result code {code}: {message}")]
    Result { code: u32, message: String },

    /// Malformed exchange or broken connection
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Operation issued without an open connection
    #[error("not connected")]
    NotConnected,
}

/// Well-known result codes
pub mod codes {
    pub const SUCCESS: u32 = 0;
    pub const PROTOCOL_ERROR: u32 = 2;
    pub const NO_SUCH_OBJECT: u32 = 32;
    pub const INVALID_CREDENTIALS: u32 = 49;
    pub const UNWILLING_TO_PERFORM: u32 = 53;
    pub const ENTRY_ALREADY_EXISTS: u32 = 68;
}

/// Search scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchScope {
    Base,
    One,
    #[default]
    Sub,
    Children,
}

impl SearchScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchScope::Base => "base",
            SearchScope::One => "one",
            SearchScope::Sub => "sub",
            SearchScope::Children => "children",
        }
    }
}

impl fmt::Display for SearchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "base" => Ok(SearchScope::Base),
            "one" | "onelevel" => Ok(SearchScope::One),
            "sub" | "subtree" => Ok(SearchScope::Sub),
            "children" => Ok(SearchScope::Children),
            other => Err(format!(
                "unknown scope '{}'. Use: base, one, sub, or children",
                other
            )),
        }
    }
}

/// A named attribute with its values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub values: Vec<String>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, values: &[&str]) -> Self {
        Self {
            name: name.into(),
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }
}

/// An entry returned by a search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entry {
    pub dn: String,
    pub attrs: BTreeMap<String, Vec<String>>,
}

/// Opens connections to a directory server
#[async_trait]
pub trait DirectoryConnector: Send + Sync {
    /// Connect to `url`, optionally upgrading with StartTLS
    async fn connect(
        &self,
        url: &str,
        starttls: bool,
    ) -> Result<Box<dyn DirectoryClient>, DirectoryError>;
}

/// One open directory connection
#[async_trait]
pub trait DirectoryClient: Send {
    async fn bind(&mut self, dn: &str, password: &str) -> Result<(), DirectoryError>;

    async fn add(&mut self, dn: &str, attrs: Vec<Attribute>) -> Result<(), DirectoryError>;

    async fn delete(&mut self, dn: &str) -> Result<(), DirectoryError>;

    /// Replace all values of `attr` with `value`
    async fn modify(&mut self, dn: &str, attr: &str, value: &str) -> Result<(), DirectoryError>;

    async fn search(
        &mut self,
        base_dn: &str,
        scope: SearchScope,
        filter: &str,
        attrs: &[String],
    ) -> Result<Vec<Entry>, DirectoryError>;

    /// Password modify extended operation
    async fn password_modify(
        &mut self,
        user_dn: &str,
        old_password: Option<&str>,
        new_password: &str,
    ) -> Result<(), DirectoryError>;

    async fn close(&mut self) -> Result<(), DirectoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_parse() {
        assert_eq!("base".parse::<SearchScope>().unwrap(), SearchScope::Base);
        assert_eq!("ONE".parse::<SearchScope>().unwrap(), SearchScope::One);
        assert_eq!("sub".parse::<SearchScope>().unwrap(), SearchScope::Sub);
        assert_eq!("children".parse::<SearchScope>().unwrap(), SearchScope::Children);
        assert!("everything".parse::<SearchScope>().is_err());
    }
}
