//! SSH connection configuration shared by every host an executor talks to.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::inventory::HostRecord;

/// Host key verification mode, analogous to OpenSSH's `StrictHostKeyChecking`.
#[derive(Debug, Clone, Default)]
pub enum HostKeyVerification {
    /// Reject unknown and changed keys. Connection fails if the host
    /// is not already in known_hosts.
    Strict,

    /// Accept and auto-learn unknown keys, but reject changed keys.
    #[default]
    AcceptNew,

    /// Accept all keys without checking. For testing and lab use only.
    Disabled,
}

/// Authentication method for SSH connections.
#[derive(Debug)]
pub enum AuthMethod {
    /// No authentication (for testing only).
    None,

    /// Password authentication.
    Password(SecretString),

    /// Private key authentication.
    PrivateKey {
        /// Path to the private key file.
        path: PathBuf,
        /// Optional passphrase for encrypted keys.
        passphrase: Option<SecretString>,
    },
}

/// Fleet-wide SSH defaults. Per-host [`SshOverrides`](crate::inventory::SshOverrides)
/// take precedence.
#[derive(Debug)]
pub struct SshConfig {
    /// Default SSH port (default: 22).
    pub port: u16,

    /// Default username for authentication.
    pub username: String,

    /// Authentication method.
    pub auth: AuthMethod,

    /// TCP connect and handshake timeout.
    pub connect_timeout: Duration,

    /// Host key verification mode.
    pub host_key_verification: HostKeyVerification,

    /// Path to known_hosts file; the user's default when `None`.
    pub known_hosts_path: Option<PathBuf>,
}

/// Connection parameters for one host after overrides are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Target {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub identity_file: Option<PathBuf>,
}

impl SshConfig {
    pub(crate) fn target_for(&self, host: &HostRecord) -> Target {
        Target {
            host: host.connect_host().to_string(),
            port: host.ssh.port.unwrap_or(self.port),
            username: host
                .ssh
                .user
                .clone()
                .unwrap_or_else(|| self.username.clone()),
            identity_file: host.ssh.identity_file.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::SshOverrides;

    fn config() -> SshConfig {
        SshConfig {
            port: 22,
            username: "netops".to_string(),
            auth: AuthMethod::Password(SecretString::from("secret".to_string())),
            connect_timeout: Duration::from_secs(5),
            host_key_verification: HostKeyVerification::AcceptNew,
            known_hosts_path: None,
        }
    }

    #[test]
    fn test_target_defaults() {
        let target = config().target_for(&HostRecord::new("leaf01"));
        assert_eq!(target.host, "leaf01");
        assert_eq!(target.port, 22);
        assert_eq!(target.username, "netops");
        assert_eq!(target.identity_file, None);
    }

    #[test]
    fn test_target_overrides() {
        let host = HostRecord::new("leaf01").with_ssh(SshOverrides {
            hostname: Some("192.0.2.11".to_string()),
            user: Some("admin".to_string()),
            port: Some(2222),
            identity_file: Some(PathBuf::from("/keys/lab")),
            extra_args: Vec::new(),
        });
        let target = config().target_for(&host);
        assert_eq!(target.host, "192.0.2.11");
        assert_eq!(target.port, 2222);
        assert_eq!(target.username, "admin");
        assert_eq!(target.identity_file, Some(PathBuf::from("/keys/lab")));
    }

    #[test]
    fn test_password_is_redacted() {
        let rendered = format!("{:?}", config().auth);
        assert!(!rendered.contains("secret"));
    }
}
