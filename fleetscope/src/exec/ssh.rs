//! In-process SSH executor using russh.
//!
//! Each call opens its own connection, runs the command on an exec channel
//! (no PTY, so vendor CLIs skip paging and prompts) and disconnects.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::BytesMut;
use log::{debug, trace, warn};
use russh::ChannelMsg;
use russh::client::{self, Handle};
use russh::keys::{PrivateKeyWithHashAlg, PublicKey, load_secret_key};
use secrecy::{ExposeSecret, SecretString};
use tokio_util::sync::CancellationToken;

use super::config::{AuthMethod, HostKeyVerification, SshConfig, Target};
use super::{ExecOutput, RemoteExecutor, bounded};
use crate::error::{ConfigError, ExecError, Result};
use crate::inventory::HostRecord;

/// Extended data type code carrying stderr.
const SSH_EXTENDED_DATA_STDERR: u32 = 1;

/// Executor that runs commands over russh exec channels.
#[derive(Debug, Clone)]
pub struct SshExecutor {
    config: Arc<SshConfig>,
}

impl SshExecutor {
    pub fn new(config: SshConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn builder() -> SshExecutorBuilder {
        SshExecutorBuilder::new()
    }

    pub fn config(&self) -> &SshConfig {
        &self.config
    }

    /// Client settings for one attempt.
    ///
    /// A command may stay silent for its whole attempt, so the session must
    /// not be dropped for inactivity before the attempt deadline.
    fn client_config(&self, attempt_timeout: Duration) -> client::Config {
        client::Config {
            inactivity_timeout: Some(attempt_timeout.max(self.config.connect_timeout)),
            ..Default::default()
        }
    }

    /// Connect to the target and authenticate.
    async fn connect(
        &self,
        target: &Target,
        attempt_timeout: Duration,
    ) -> std::result::Result<Handle<SshHandler>, ExecError> {
        let ssh_config = Arc::new(self.client_config(attempt_timeout));

        let host_key_error: Arc<Mutex<Option<ExecError>>> = Arc::new(Mutex::new(None));

        let handler = SshHandler {
            host: target.host.clone(),
            port: target.port,
            host_key_verification: self.config.host_key_verification.clone(),
            known_hosts_path: self.config.known_hosts_path.clone(),
            host_key_error: host_key_error.clone(),
        };

        let mut session = tokio::time::timeout(
            self.config.connect_timeout,
            client::connect(ssh_config, (target.host.as_str(), target.port), handler),
        )
        .await
        .map_err(|_| ExecError::Timeout(self.config.connect_timeout))?
        .map_err(|e| {
            // Prefer the detailed error stored by check_server_key over the
            // generic russh::Error::UnknownKey
            let stored = host_key_error.lock().ok().and_then(|mut slot| slot.take());
            match (stored, e) {
                (Some(hk_err), _) => hk_err,
                (None, russh::Error::IO(source)) => ExecError::ConnectionFailed {
                    host: target.host.clone(),
                    port: target.port,
                    source,
                },
                (None, e) => ExecError::Ssh(e),
            }
        })?;

        self.authenticate(&mut session, target).await?;
        Ok(session)
    }

    async fn authenticate(
        &self,
        session: &mut Handle<SshHandler>,
        target: &Target,
    ) -> std::result::Result<(), ExecError> {
        let user = target.username.as_str();

        // A per-host identity file replaces the fleet-wide method
        let success = if let Some(path) = &target.identity_file {
            Self::authenticate_key(session, user, path, None).await?
        } else {
            match &self.config.auth {
                AuthMethod::None => session.authenticate_none(user).await?.success(),
                AuthMethod::Password(password) => session
                    .authenticate_password(user, password.expose_secret())
                    .await?
                    .success(),
                AuthMethod::PrivateKey { path, passphrase } => {
                    Self::authenticate_key(session, user, path, passphrase.as_ref()).await?
                }
            }
        };

        if !success {
            return Err(ExecError::AuthenticationFailed {
                user: user.to_string(),
            });
        }
        Ok(())
    }

    async fn authenticate_key(
        session: &mut Handle<SshHandler>,
        user: &str,
        path: &Path,
        passphrase: Option<&SecretString>,
    ) -> std::result::Result<bool, ExecError> {
        let key = load_secret_key(path, passphrase.map(|p| p.expose_secret()))
            .map_err(|e| ExecError::Key(e.to_string()))?;

        // Get the best RSA hash algorithm supported by the server
        let hash_alg = session.best_supported_rsa_hash().await?.flatten();

        Ok(session
            .authenticate_publickey(user, PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg))
            .await?
            .success())
    }

    async fn run(
        &self,
        target: &Target,
        command: &str,
        timeout: Duration,
    ) -> std::result::Result<ExecOutput, ExecError> {
        let started = Instant::now();
        let session = self.connect(target, timeout).await?;

        let mut channel = session.channel_open_session().await?;
        channel.exec(true, command).await?;

        let mut stdout = BytesMut::new();
        let mut stderr = BytesMut::new();
        let mut exit_status = None;

        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { ref data } => stdout.extend_from_slice(data),
                ChannelMsg::ExtendedData { ref data, ext } if ext == SSH_EXTENDED_DATA_STDERR => {
                    stderr.extend_from_slice(data)
                }
                ChannelMsg::ExitStatus { exit_status: status } => exit_status = Some(status),
                ChannelMsg::ExitSignal { signal_name, .. } => {
                    debug!("{}: remote command killed by {:?}", target.host, signal_name);
                    return Err(ExecError::Terminated);
                }
                _ => {}
            }
        }

        if let Err(e) = session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
        {
            trace!("{}: disconnect failed: {}", target.host, e);
        }

        trace!(
            "{}: {} bytes stdout, {} bytes stderr, status {:?}",
            target.host,
            stdout.len(),
            stderr.len(),
            exit_status
        );

        Ok(ExecOutput {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            exit_status,
            elapsed: started.elapsed(),
        })
    }
}

#[async_trait]
impl RemoteExecutor for SshExecutor {
    async fn exec(
        &self,
        host: &HostRecord,
        command: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> std::result::Result<ExecOutput, ExecError> {
        let target = self.config.target_for(host);
        debug!(
            "{}: ssh {}@{}:{} {:?}",
            host.host_key, target.username, target.host, target.port, command
        );
        // Dropping the session handle on timeout or cancel closes the channel
        bounded(timeout, cancel, self.run(&target, command, timeout)).await
    }
}

/// Builder for [`SshExecutor`].
///
/// # Example
///
/// ```rust,no_run
/// use fleetscope::exec::SshExecutor;
///
/// # fn example() -> Result<(), fleetscope::Error> {
/// let executor = SshExecutor::builder()
///     .username("netops")
///     .private_key("/home/netops/.ssh/id_ed25519")
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct SshExecutorBuilder {
    port: u16,
    username: Option<String>,
    auth: AuthMethod,
    connect_timeout: Duration,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
}

impl SshExecutorBuilder {
    pub fn new() -> Self {
        Self {
            port: 22,
            username: None,
            auth: AuthMethod::None,
            connect_timeout: Duration::from_secs(10),
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
        }
    }

    /// Set the default SSH port (default: 22).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the default username.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set password authentication.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.auth = AuthMethod::Password(SecretString::from(password.into()));
        self
    }

    /// Set private key authentication.
    pub fn private_key(mut self, key_path: impl Into<PathBuf>) -> Self {
        self.auth = AuthMethod::PrivateKey {
            path: key_path.into(),
            passphrase: None,
        };
        self
    }

    /// Set private key authentication with passphrase.
    pub fn private_key_with_passphrase(
        mut self,
        key_path: impl Into<PathBuf>,
        passphrase: impl Into<String>,
    ) -> Self {
        self.auth = AuthMethod::PrivateKey {
            path: key_path.into(),
            passphrase: Some(SecretString::from(passphrase.into())),
        };
        self
    }

    /// Set the connect and handshake timeout (default: 10s).
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the host key verification mode.
    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.host_key_verification = mode;
        self
    }

    /// Use a known_hosts file other than the user's default.
    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<SshExecutor> {
        let username = self.username.ok_or_else(|| ConfigError::InvalidConfig {
            message: "Username is required".to_string(),
        })?;
        if self.connect_timeout.is_zero() {
            return Err(ConfigError::InvalidConfig {
                message: "Connect timeout must be non-zero".to_string(),
            }
            .into());
        }

        Ok(SshExecutor::new(SshConfig {
            port: self.port,
            username,
            auth: self.auth,
            connect_timeout: self.connect_timeout,
            host_key_verification: self.host_key_verification,
            known_hosts_path: self.known_hosts_path,
        }))
    }
}

impl Default for SshExecutorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// SSH client handler for russh.
struct SshHandler {
    host: String,
    port: u16,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    /// Stores a detailed host-key error so connect() can surface it
    /// instead of the generic russh::Error::UnknownKey.
    host_key_error: Arc<Mutex<Option<ExecError>>>,
}

impl SshHandler {
    /// Check the host key against known_hosts.
    ///
    /// Returns `Ok(true)` if matched, `Ok(false)` if host not found,
    /// `Err(ExecError::HostKeyChanged)` if key changed.
    fn check_known_hosts(&self, pubkey: &PublicKey) -> std::result::Result<bool, ExecError> {
        let result = if let Some(ref path) = self.known_hosts_path {
            russh::keys::check_known_hosts_path(&self.host, self.port, pubkey, path)
        } else {
            russh::keys::check_known_hosts(&self.host, self.port, pubkey)
        };

        match result {
            Ok(matched) => Ok(matched),
            Err(russh::keys::Error::KeyChanged { line }) => Err(ExecError::HostKeyChanged {
                host: self.host.clone(),
                port: self.port,
                line,
            }),
            Err(e) => Err(ExecError::KnownHosts(e.to_string())),
        }
    }

    /// Save a new host key to known_hosts.
    fn learn_host_key(&self, pubkey: &PublicKey) -> std::result::Result<(), ExecError> {
        let result = if let Some(ref path) = self.known_hosts_path {
            russh::keys::known_hosts::learn_known_hosts_path(&self.host, self.port, pubkey, path)
        } else {
            russh::keys::known_hosts::learn_known_hosts(&self.host, self.port, pubkey)
        };

        result.map_err(|e| ExecError::KnownHosts(e.to_string()))
    }

    fn reject(&self, error: ExecError) -> bool {
        if let Ok(mut slot) = self.host_key_error.lock() {
            *slot = Some(error);
        }
        false
    }
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        match self.host_key_verification {
            HostKeyVerification::Disabled => Ok(true),

            HostKeyVerification::AcceptNew => match self.check_known_hosts(server_public_key) {
                Ok(true) => Ok(true),
                Ok(false) => {
                    if let Err(e) = self.learn_host_key(server_public_key) {
                        warn!("Failed to save host key for {}: {}", self.host, e);
                    }
                    Ok(true)
                }
                Err(e) => Ok(self.reject(e)),
            },

            HostKeyVerification::Strict => match self.check_known_hosts(server_public_key) {
                Ok(true) => Ok(true),
                Ok(false) => Ok(self.reject(ExecError::HostKeyUnknown {
                    host: self.host.clone(),
                    port: self.port,
                })),
                Err(e) => Ok(self.reject(e)),
            },
        }
    }
}
