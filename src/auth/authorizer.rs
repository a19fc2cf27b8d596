//! The service provider interface (SPI) for authentication and authorization.

use super::Perm;

use async_trait::async_trait;
use std::{
    fmt::Debug,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// The error returned by [`Authorizer::validate_authentication`].
#[derive(Debug, Error)]
pub enum AuthenticationError {
    /// The username is not known to the authorizer.
    #[error("unknown user")]
    UnknownUser,

    /// The password did not match.
    #[error("bad password")]
    BadPassword,

    /// The backing credential store failed.
    #[error("authentication backend error")]
    ImplPropagated(#[source] crate::BoxError),
}

/// Defines the requirements for implementations that validate credentials and
/// answer per-command permission questions.
///
/// Queries other than [`validate_authentication`](Authorizer::validate_authentication)
/// are synchronous and must be cheap: they are consulted on every command that
/// touches the filesystem. Implementations are shared between all sessions and
/// must not be mutated while the server is running.
#[async_trait]
pub trait Authorizer: Send + Sync + Debug + 'static {
    /// Validates the given credentials.
    async fn validate_authentication(&self, username: &str, password: &str) -> Result<(), AuthenticationError>;

    /// Tells whether the given user is known at all.
    fn has_user(&self, username: &str) -> bool;

    /// Tells whether `username` may perform the operation expressed by `perm`
    /// on the given host path. `None` stands for an operation without a path
    /// argument (the user's default permission set applies).
    fn has_perm(&self, username: &str, perm: Perm, path: Option<&Path>) -> bool;

    /// Returns the user's home directory, the root of their virtual filesystem.
    fn home_dir(&self, username: &str) -> Option<PathBuf>;

    /// An optional message sent as part of the reply to a successful login.
    fn msg_login(&self, _username: &str) -> Option<String> {
        None
    }

    /// An optional message sent as the goodbye reply to QUIT.
    fn msg_quit(&self, _username: &str) -> Option<String> {
        None
    }
}
