//! In-process directory
//!
//! A small directory held in memory behind the same traits as the LDAP
//! backend. It understands simple bind against `userPassword` (plus one
//! configured root DN), add, delete, replace-modify, password modify, and
//! search with presence (`(attr=*)`) and equality (`(attr=value)`) filters.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::directory::{
    codes, Attribute, DirectoryClient, DirectoryConnector, DirectoryError, Entry, SearchScope,
};

#[derive(Debug, Default)]
struct MemoryState {
    entries: BTreeMap<String, Entry>,
    root_dn: Option<(String, String)>,
    /// Number of connections opened so far
    connections: usize,
    /// When set, every operation after connect fails with a protocol error
    unreachable: bool,
    /// When set, connect itself fails
    refuse_connections: bool,
}

/// Shared in-memory directory; clones see the same data
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept simple binds for `dn`/`password` without a backing entry
    pub fn with_root(self, dn: &str, password: &str) -> Self {
        self.lock().root_dn = Some((normalize(dn), password.to_string()));
        self
    }

    /// Connections succeed but every later operation fails
    pub fn unreachable_after_connect(self) -> Self {
        self.lock().unreachable = true;
        self
    }

    /// Connections are refused outright
    pub fn refusing_connections(self) -> Self {
        self.lock().refuse_connections = true;
        self
    }

    /// Insert an entry directly, bypassing any connection
    pub fn insert(&self, dn: &str, attrs: Vec<Attribute>) {
        let entry = make_entry(dn, attrs);
        self.lock().entries.insert(normalize(dn), entry);
    }

    pub fn get(&self, dn: &str) -> Option<Entry> {
        self.lock().entries.get(&normalize(dn)).cloned()
    }

    pub fn contains(&self, dn: &str) -> bool {
        self.lock().entries.contains_key(&normalize(dn))
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn connection_count(&self) -> usize {
        self.lock().connections
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A panic while holding the lock leaves plain data behind; keep serving it.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl DirectoryConnector for MemoryDirectory {
    async fn connect(
        &self,
        _url: &str,
        _starttls: bool,
    ) -> Result<Box<dyn DirectoryClient>, DirectoryError> {
        let mut state = self.lock();
        if state.refuse_connections {
            return Err(DirectoryError::Connect("connection refused".to_string()));
        }
        state.connections += 1;
        Ok(Box::new(MemoryClient {
            directory: self.clone(),
            open: true,
        }))
    }
}

/// A connection to a [`MemoryDirectory`]
pub struct MemoryClient {
    directory: MemoryDirectory,
    open: bool,
}

impl MemoryClient {
    fn state(&self) -> Result<MutexGuard<'_, MemoryState>, DirectoryError> {
        if !self.open {
            return Err(DirectoryError::NotConnected);
        }
        let state = self.directory.lock();
        if state.unreachable {
            return Err(DirectoryError::Protocol("connection reset by peer".to_string()));
        }
        Ok(state)
    }
}

#[async_trait]
impl DirectoryClient for MemoryClient {
    async fn bind(&mut self, dn: &str, password: &str) -> Result<(), DirectoryError> {
        let state = self.state()?;
        let key = normalize(dn);

        if let Some((root, root_pw)) = &state.root_dn {
            if *root == key && root_pw == password {
                return Ok(());
            }
        }

        let matches = state
            .entries
            .get(&key)
            .and_then(|e| e.attrs.get("userpassword"))
            .map(|values| values.iter().any(|v| v == password))
            .unwrap_or(false);

        if matches {
            Ok(())
        } else {
            Err(result_error(codes::INVALID_CREDENTIALS, "invalid credentials"))
        }
    }

    async fn add(&mut self, dn: &str, attrs: Vec<Attribute>) -> Result<(), DirectoryError> {
        let mut state = self.state()?;
        let key = normalize(dn);
        if state.entries.contains_key(&key) {
            return Err(result_error(codes::ENTRY_ALREADY_EXISTS, "already exists"));
        }
        state.entries.insert(key, make_entry(dn, attrs));
        Ok(())
    }

    async fn delete(&mut self, dn: &str) -> Result<(), DirectoryError> {
        let mut state = self.state()?;
        match state.entries.remove(&normalize(dn)) {
            Some(_) => Ok(()),
            None => Err(result_error(codes::NO_SUCH_OBJECT, "no such object")),
        }
    }

    async fn modify(&mut self, dn: &str, attr: &str, value: &str) -> Result<(), DirectoryError> {
        let mut state = self.state()?;
        match state.entries.get_mut(&normalize(dn)) {
            Some(entry) => {
                entry
                    .attrs
                    .insert(attr.to_lowercase(), vec![value.to_string()]);
                Ok(())
            }
            None => Err(result_error(codes::NO_SUCH_OBJECT, "no such object")),
        }
    }

    async fn search(
        &mut self,
        base_dn: &str,
        scope: SearchScope,
        filter: &str,
        attrs: &[String],
    ) -> Result<Vec<Entry>, DirectoryError> {
        let state = self.state()?;
        let base = normalize(base_dn);
        let filter = SimpleFilter::parse(filter)?;

        let found = state
            .entries
            .iter()
            .filter(|(dn, _)| in_scope(dn, &base, scope))
            .filter(|(_, entry)| filter.matches(entry))
            .map(|(_, entry)| project(entry, attrs))
            .collect();
        Ok(found)
    }

    async fn password_modify(
        &mut self,
        user_dn: &str,
        old_password: Option<&str>,
        new_password: &str,
    ) -> Result<(), DirectoryError> {
        let mut state = self.state()?;
        let entry = state
            .entries
            .get_mut(&normalize(user_dn))
            .ok_or_else(|| result_error(codes::NO_SUCH_OBJECT, "no such object"))?;

        if let Some(old) = old_password {
            let current = entry.attrs.get("userpassword");
            if !current.map(|v| v.iter().any(|p| p == old)).unwrap_or(false) {
                return Err(result_error(
                    codes::UNWILLING_TO_PERFORM,
                    "old password does not match",
                ));
            }
        }
        entry
            .attrs
            .insert("userpassword".to_string(), vec![new_password.to_string()]);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DirectoryError> {
        self.open = false;
        Ok(())
    }
}

fn result_error(code: u32, message: &str) -> DirectoryError {
    DirectoryError::Result {
        code,
        message: message.to_string(),
    }
}

fn normalize(dn: &str) -> String {
    dn.split(',')
        .map(|rdn| rdn.trim().to_lowercase())
        .collect::<Vec<_>>()
        .join(",")
}

fn make_entry(dn: &str, attrs: Vec<Attribute>) -> Entry {
    let mut entry = Entry {
        dn: dn.to_string(),
        attrs: BTreeMap::new(),
    };
    for attr in attrs {
        entry
            .attrs
            .entry(attr.name.to_lowercase())
            .or_default()
            .extend(attr.values);
    }
    entry
}

fn parent_of(dn: &str) -> Option<&str> {
    dn.split_once(',').map(|(_, parent)| parent)
}

fn in_scope(dn: &str, base: &str, scope: SearchScope) -> bool {
    match scope {
        SearchScope::Base => dn == base,
        SearchScope::One => parent_of(dn) == Some(base),
        SearchScope::Sub => dn == base || dn.ends_with(&format!(",{}", base)),
        SearchScope::Children => dn.ends_with(&format!(",{}", base)),
    }
}

fn project(entry: &Entry, attrs: &[String]) -> Entry {
    let wanted: Vec<String> = attrs
        .iter()
        .map(|a| a.to_lowercase())
        .filter(|a| a != "dn")
        .collect();
    let all = wanted.iter().any(|a| a == "*");

    Entry {
        dn: entry.dn.clone(),
        attrs: entry
            .attrs
            .iter()
            .filter(|(name, _)| all || wanted.contains(name))
            .map(|(name, values)| (name.clone(), values.clone()))
            .collect(),
    }
}

/// `(attr=*)` or `(attr=value)`
enum SimpleFilter {
    Present(String),
    Equal(String, String),
}

impl SimpleFilter {
    fn parse(filter: &str) -> Result<Self, DirectoryError> {
        let inner = filter
            .trim()
            .strip_prefix('(')
            .and_then(|f| f.strip_suffix(')'))
            .ok_or_else(|| DirectoryError::Protocol(format!("bad search filter: {}", filter)))?;
        let (attr, value) = inner
            .split_once('=')
            .ok_or_else(|| DirectoryError::Protocol(format!("bad search filter: {}", filter)))?;

        let attr = attr.trim().to_lowercase();
        if value == "*" {
            Ok(SimpleFilter::Present(attr))
        } else {
            Ok(SimpleFilter::Equal(attr, value.to_lowercase()))
        }
    }

    fn matches(&self, entry: &Entry) -> bool {
        match self {
            SimpleFilter::Present(attr) => entry.attrs.contains_key(attr),
            SimpleFilter::Equal(attr, value) => entry
                .attrs
                .get(attr)
                .map(|values| values.iter().any(|v| v.to_lowercase() == *value))
                .unwrap_or(false),
        }
    }
}
