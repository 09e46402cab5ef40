use thiserror::Error;

use crate::directory::DirectoryError;

/// Main error type for benchmark runs
#[derive(Debug, Error)]
pub enum BenchError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid template '{template}': {reason}")]
    InvalidTemplate { template: String, reason: String },

    #[error("worker[{worker_id}]: failed to connect: {source}")]
    Connect {
        worker_id: usize,
        #[source]
        source: DirectoryError,
    },

    #[error("worker[{worker_id}]: bind error for '{dn}': {source}")]
    Bind {
        worker_id: usize,
        dn: String,
        #[source]
        source: DirectoryError,
    },

    #[error("worker lost: {0}")]
    WorkerLost(String),

    #[error("duplicate result from worker[{0}]")]
    DuplicateResult(usize),

    #[error("setup error: {0}")]
    Setup(String),

    #[error("directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl BenchError {
    /// Get the error code for JSON output
    pub fn error_code(&self) -> &'static str {
        match self {
            BenchError::InvalidConfig(_) => "invalid_config",
            BenchError::InvalidTemplate { .. } => "invalid_config",
            BenchError::Connect { .. } => "connect_failed",
            BenchError::Bind { .. } => "bind_failed",
            BenchError::WorkerLost(_) => "internal_error",
            BenchError::DuplicateResult(_) => "internal_error",
            BenchError::Setup(_) => "setup_failed",
            BenchError::Directory(_) => "directory_error",
            BenchError::Io(_) => "io_error",
            BenchError::Json(_) => "internal_error",
            BenchError::TomlParse(_) => "invalid_config",
        }
    }

    /// Get the exit code for the CLI
    pub fn exit_code(&self) -> i32 {
        match self {
            BenchError::InvalidConfig(_) => 2,
            BenchError::InvalidTemplate { .. } => 2,
            BenchError::TomlParse(_) => 2,
            BenchError::Connect { .. } => 3,
            BenchError::Bind { .. } => 3,
            BenchError::Setup(_) => 4,
            BenchError::Directory(_) => 4,
            BenchError::Io(_) => 5,
            _ => 1,
        }
    }

    /// Get actionable suggestions for fixing the error
    pub fn suggestions(&self) -> Vec<&'static str> {
        match self {
            BenchError::Connect { .. } => vec![
                "Check that the server URL is reachable (e.g. ldap://localhost:389)",
                "Drop -Z if the server does not offer StartTLS",
            ],
            BenchError::Bind { .. } => vec![
                "Check the bind DN (-D) and password (-w)",
                "Run 'ldapbench setup base' and 'ldapbench setup person' to populate the directory",
            ],
            BenchError::InvalidTemplate { .. } => vec![
                "Templates accept a single %d, %Nd or %0Nd placeholder",
            ],
            BenchError::TomlParse(_) => vec![
                "Check the profile passed with --config",
            ],
            _ => vec![],
        }
    }
}

pub type Result<T> = std::result::Result<T, BenchError>;
