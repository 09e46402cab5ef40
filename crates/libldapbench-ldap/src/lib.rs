//! LDAP backend for ldapbench
//!
//! Implements the engine's directory capability on top of `ldap3`:
//! - connections over `ldap://`, `ldaps://` or `ldapi://` URLs, with optional StartTLS
//! - simple bind, add, delete, replace-modify and search
//! - the password modify extended operation

mod client;
mod error;

pub use client::{LdapClient, LdapConnector};
pub use error::{connect_error, to_directory_error};
