use ldap3::LdapError;
use libldapbench_core::DirectoryError;

/// Map an error from an operation on an open connection
pub fn to_directory_error(err: LdapError) -> DirectoryError {
    match err {
        LdapError::LdapResult { result } => DirectoryError::Result {
            code: result.rc,
            message: result.text,
        },
        other => DirectoryError::Protocol(other.to_string()),
    }
}

/// Map an error raised while opening a connection.
///
/// With StartTLS requested, anything that is neither a transport failure nor
/// a server result is a failed TLS upgrade.
pub fn connect_error(err: LdapError, starttls: bool) -> DirectoryError {
    match err {
        LdapError::LdapResult { result } => DirectoryError::Result {
            code: result.rc,
            message: result.text,
        },
        io @ LdapError::Io { .. } => DirectoryError::Connect(io.to_string()),
        other if starttls => DirectoryError::Tls(other.to_string()),
        other => DirectoryError::Connect(other.to_string()),
    }
}
