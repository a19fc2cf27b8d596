use super::{AuthenticationError, Authorizer, Perm};

use async_trait::async_trait;
use std::{
    collections::HashMap,
    fmt::{self, Debug, Formatter},
    path::{Path, PathBuf},
};
use thiserror::Error;

/// The reserved login name of the anonymous user. It authenticates with any
/// password.
pub const ANONYMOUS_USER: &str = "anonymous";

/// The error returned by the mutating [`UserRegistry`] operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A user with this name was already registered.
    #[error("user {0:?} already exists")]
    UserExists(String),

    /// The name is not registered.
    #[error("no such user {0:?}")]
    NoSuchUser(String),

    /// The given home directory does not exist or could not be resolved.
    #[error("home directory {0:?} does not exist")]
    HomeDirectoryMissing(PathBuf),

    /// The permission string contained a letter outside the `elradfmwMT`
    /// alphabet.
    #[error("no such permission {0:?}")]
    InvalidPermission(char),

    /// A permission override may not target the home directory itself.
    #[error("can't override home directory permissions")]
    OverridesHome,

    /// A permission override may not point above the home directory.
    #[error("path escapes user home directory: {0:?}")]
    OverrideEscapesHome(PathBuf),
}

struct UserRecord {
    password: String,
    home: PathBuf,
    perm: Perm,
    msg_login: Option<String>,
    msg_quit: Option<String>,
    // override directory (canonical) -> (perm, recursive)
    overrides: Vec<(PathBuf, Perm, bool)>,
}

/// A registry of virtual users, the default [`Authorizer`] implementation.
///
/// Populate it before handing it to the [`Server`](crate::Server); it is
/// shared read-only between sessions from then on.
///
/// ```no_run
/// use ftpdlib::auth::{Perm, UserRegistry};
///
/// let mut users = UserRegistry::new();
/// users.add_user("alice", "s3cret", "/srv/ftp/alice", Perm::all()).unwrap();
/// users.add_anonymous("/srv/ftp/pub").unwrap();
/// ```
#[derive(Default)]
pub struct UserRegistry {
    users: HashMap<String, UserRecord>,
}

impl UserRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        UserRegistry { users: HashMap::new() }
    }

    /// Registers a user with the given password, home directory and
    /// permission set. The home directory must exist.
    pub fn add_user<P: Into<PathBuf>>(&mut self, name: &str, password: &str, home: P, perm: Perm) -> Result<(), RegistryError> {
        self.add_user_with(name, password, home, perm, None, None)
    }

    /// Like [`add_user`](Self::add_user) but also sets the per-user login and
    /// quit messages.
    pub fn add_user_with<P: Into<PathBuf>>(
        &mut self,
        name: &str,
        password: &str,
        home: P,
        perm: Perm,
        msg_login: Option<String>,
        msg_quit: Option<String>,
    ) -> Result<(), RegistryError> {
        if self.users.contains_key(name) {
            return Err(RegistryError::UserExists(name.to_string()));
        }
        let home = home.into();
        let home = std::fs::canonicalize(&home).map_err(|_| RegistryError::HomeDirectoryMissing(home.clone()))?;
        if !home.is_dir() {
            return Err(RegistryError::HomeDirectoryMissing(home));
        }
        if name == ANONYMOUS_USER && perm.intersects(Perm::WRITE_ANY) {
            tracing::warn!("write permissions assigned to anonymous user");
        }
        self.users.insert(
            name.to_string(),
            UserRecord {
                password: password.to_string(),
                home,
                perm,
                msg_login,
                msg_quit,
                overrides: Vec::new(),
            },
        );
        Ok(())
    }

    /// Registers the anonymous user with read-only (`elr`) permissions.
    pub fn add_anonymous<P: Into<PathBuf>>(&mut self, home: P) -> Result<(), RegistryError> {
        self.add_user(ANONYMOUS_USER, "", home, Perm::READ_ANY)
    }

    /// Registers the anonymous user with an explicit permission set. Granting
    /// any write letter is legal but logged as a warning.
    pub fn add_anonymous_with<P: Into<PathBuf>>(&mut self, home: P, perm: Perm) -> Result<(), RegistryError> {
        self.add_user(ANONYMOUS_USER, "", home, perm)
    }

    /// Removes a user.
    pub fn remove_user(&mut self, name: &str) -> Result<(), RegistryError> {
        self.users.remove(name).map(|_| ()).ok_or_else(|| RegistryError::NoSuchUser(name.to_string()))
    }

    /// Replaces the user's default permissions for `directory` (and, if
    /// `recursive`, everything under it). The directory must lie below the
    /// user's home; the home itself cannot be overridden.
    pub fn override_perm<P: Into<PathBuf>>(&mut self, name: &str, directory: P, perm: Perm, recursive: bool) -> Result<(), RegistryError> {
        let directory = directory.into();
        let directory = std::fs::canonicalize(&directory).map_err(|_| RegistryError::HomeDirectoryMissing(directory.clone()))?;
        let record = self.users.get_mut(name).ok_or_else(|| RegistryError::NoSuchUser(name.to_string()))?;
        if directory == record.home {
            return Err(RegistryError::OverridesHome);
        }
        if !directory.starts_with(&record.home) {
            return Err(RegistryError::OverrideEscapesHome(directory));
        }
        record.overrides.retain(|(dir, _, _)| *dir != directory);
        record.overrides.push((directory, perm, recursive));
        Ok(())
    }
}

#[async_trait]
impl Authorizer for UserRegistry {
    async fn validate_authentication(&self, username: &str, password: &str) -> Result<(), AuthenticationError> {
        let record = self.users.get(username).ok_or(AuthenticationError::UnknownUser)?;
        // The anonymous user accepts any password (customarily an email address).
        if username == ANONYMOUS_USER || record.password == password {
            Ok(())
        } else {
            Err(AuthenticationError::BadPassword)
        }
    }

    fn has_user(&self, username: &str) -> bool {
        self.users.contains_key(username)
    }

    fn has_perm(&self, username: &str, perm: Perm, path: Option<&Path>) -> bool {
        let Some(record) = self.users.get(username) else {
            return false;
        };
        if let Some(path) = path {
            // Most specific match wins: the override with the longest
            // directory prefix decides. Non-recursive overrides only cover
            // the directory itself and entries directly inside it.
            let best = record
                .overrides
                .iter()
                .filter(|(dir, _, recursive)| {
                    if !path.starts_with(dir) {
                        return false;
                    }
                    *recursive || path == dir || path.parent() == Some(dir)
                })
                .max_by_key(|(dir, _, _)| dir.components().count());
            if let Some((_, operm, _)) = best {
                return operm.contains(perm);
            }
        }
        record.perm.contains(perm)
    }

    fn home_dir(&self, username: &str) -> Option<PathBuf> {
        self.users.get(username).map(|r| r.home.clone())
    }

    fn msg_login(&self, username: &str) -> Option<String> {
        self.users.get(username).and_then(|r| r.msg_login.clone())
    }

    fn msg_quit(&self, username: &str) -> Option<String> {
        self.users.get(username).and_then(|r| r.msg_quit.clone())
    }
}

impl Debug for UserRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        // Passwords stay out of the debug output.
        f.debug_struct("UserRegistry").field("users", &self.users.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn registry_with(name: &str, perm: Perm) -> (tempfile::TempDir, UserRegistry) {
        let home = tempfile::tempdir().unwrap();
        let mut registry = UserRegistry::new();
        registry.add_user(name, "pw", home.path(), perm).unwrap();
        (home, registry)
    }

    #[tokio::test]
    async fn authentication() {
        let (_home, registry) = registry_with("alice", Perm::all());
        assert!(registry.validate_authentication("alice", "pw").await.is_ok());
        assert!(matches!(
            registry.validate_authentication("alice", "nope").await,
            Err(AuthenticationError::BadPassword)
        ));
        assert!(matches!(
            registry.validate_authentication("bob", "pw").await,
            Err(AuthenticationError::UnknownUser)
        ));
    }

    #[tokio::test]
    async fn anonymous_accepts_any_password() {
        let home = tempfile::tempdir().unwrap();
        let mut registry = UserRegistry::new();
        registry.add_anonymous(home.path()).unwrap();
        assert!(registry.validate_authentication(ANONYMOUS_USER, "guest@example.org").await.is_ok());
        assert!(registry.validate_authentication(ANONYMOUS_USER, "").await.is_ok());
    }

    #[test]
    fn duplicate_user_rejected() {
        let (home, mut registry) = registry_with("alice", Perm::all());
        let err = registry.add_user("alice", "pw", home.path(), Perm::all()).unwrap_err();
        assert!(matches!(err, RegistryError::UserExists(_)));
    }

    #[test]
    fn missing_home_rejected() {
        let mut registry = UserRegistry::new();
        let err = registry.add_user("alice", "pw", "/no/such/dir", Perm::all()).unwrap_err();
        assert!(matches!(err, RegistryError::HomeDirectoryMissing(_)));
    }

    #[test]
    fn override_must_stay_below_home() {
        let (home, mut registry) = registry_with("alice", Perm::all());
        let err = registry.override_perm("alice", home.path(), Perm::READ_ANY, false).unwrap_err();
        assert!(matches!(err, RegistryError::OverridesHome));

        let outside = tempfile::tempdir().unwrap();
        let err = registry.override_perm("alice", outside.path(), Perm::READ_ANY, false).unwrap_err();
        assert!(matches!(err, RegistryError::OverrideEscapesHome(_)));
    }

    #[test]
    fn override_replaces_default() {
        let (home, mut registry) = registry_with("alice", Perm::all());
        let sub = home.path().join("readonly");
        std::fs::create_dir(&sub).unwrap();
        registry.override_perm("alice", &sub, Perm::READ_ANY, true).unwrap();

        let inside = sub.join("deeper/file.txt");
        assert!(!registry.has_perm("alice", Perm::STORE, Some(&inside)));
        assert!(registry.has_perm("alice", Perm::RETRIEVE, Some(&inside)));
        // Outside the override the default set still applies.
        assert!(registry.has_perm("alice", Perm::STORE, Some(&home.path().join("elsewhere.txt"))));
    }

    #[test]
    fn non_recursive_override_covers_direct_children_only() {
        let (home, mut registry) = registry_with("alice", Perm::all());
        let sub = home.path().join("drop");
        std::fs::create_dir(&sub).unwrap();
        registry.override_perm("alice", &sub, Perm::STORE, false).unwrap();

        assert!(!registry.has_perm("alice", Perm::RETRIEVE, Some(&sub.join("direct.txt"))));
        // A deeper path falls back to the user default.
        assert!(registry.has_perm("alice", Perm::RETRIEVE, Some(&sub.join("a/b.txt"))));
    }

    #[test]
    fn most_specific_override_wins() {
        let (home, mut registry) = registry_with("alice", Perm::READ_ANY);
        let outer = home.path().join("outer");
        let inner = outer.join("inner");
        std::fs::create_dir_all(&inner).unwrap();
        registry.override_perm("alice", &outer, Perm::READ_ANY, true).unwrap();
        registry.override_perm("alice", &inner, Perm::READ_ANY | Perm::STORE, true).unwrap();

        assert!(registry.has_perm("alice", Perm::STORE, Some(&inner.join("f"))));
        assert!(!registry.has_perm("alice", Perm::STORE, Some(&outer.join("f"))));
    }
}
