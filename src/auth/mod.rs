//! Contains the [`Authorizer`] trait and the [`UserRegistry`] of virtual users.
//!
//! The authorizer answers two questions for the server: "are these
//! credentials valid?" and "may this user perform operation O on path P?".
//! The bundled [`UserRegistry`] keeps virtual user records (password, home
//! directory, permission set, per-directory overrides) and is good enough
//! for most deployments. Integrations with OS accounts (PAM, LogonUser)
//! can be plugged in by implementing [`Authorizer`] yourself:
//!
//! ```no_run
//! use ftpdlib::auth::{AuthenticationError, Authorizer, Perm};
//! use async_trait::async_trait;
//! use std::path::{Path, PathBuf};
//!
//! #[derive(Debug)]
//! struct AcceptAll;
//!
//! #[async_trait]
//! impl Authorizer for AcceptAll {
//!     async fn validate_authentication(&self, _user: &str, _password: &str) -> Result<(), AuthenticationError> {
//!         Ok(())
//!     }
//!
//!     fn has_user(&self, _user: &str) -> bool {
//!         true
//!     }
//!
//!     fn has_perm(&self, _user: &str, _perm: Perm, _path: Option<&Path>) -> bool {
//!         true
//!     }
//!
//!     fn home_dir(&self, _user: &str) -> Option<PathBuf> {
//!         Some("/srv/ftp".into())
//!     }
//! }
//! ```
//!
//! All mutation of a registry happens before the server starts serving;
//! afterwards it is shared read-only between sessions.

mod authorizer;
pub use authorizer::{AuthenticationError, Authorizer};

mod permissions;
pub use permissions::Perm;

mod registry;
pub use registry::{ANONYMOUS_USER, RegistryError, UserRegistry};
