//! The virtual filesystem layer.
//!
//! Every session sees an FTP path namespace rooted at `/`, backed by the
//! authenticated user's home directory on the host. [`VirtualFs`] translates
//! between the two namespaces and enforces containment: no resolved path may
//! escape the home directory, not even through symlinks.

mod error;
pub use error::{Error, ErrorKind};

pub(crate) mod listing;
pub(crate) mod mlsx;

use chrono::{DateTime, Utc};
use std::{
    io,
    path::{Component, Path, PathBuf},
    time::SystemTime,
};
use tokio::io::AsyncSeekExt;

/// Result type used by the [`VirtualFs`] operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Where an upload should start writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteMode {
    /// Truncate the file at `offset` and write from there (STOR, possibly
    /// preceded by REST).
    Offset(u64),
    /// Append to whatever is there (APPE).
    Append,
}

/// A per-session view on the host filesystem, rooted at the user's home
/// directory and carrying the session's FTP-visible working directory.
#[derive(Debug, Clone)]
pub struct VirtualFs {
    // canonicalized home directory
    root: PathBuf,
    // FTP-visible current working directory, always absolute
    cwd: PathBuf,
    use_gmt_times: bool,
}

impl VirtualFs {
    /// Creates a view rooted at `root`, which must be an existing directory.
    /// The working directory starts at `/`.
    pub fn new<P: Into<PathBuf>>(root: P, use_gmt_times: bool) -> io::Result<Self> {
        let root = std::fs::canonicalize(root.into())?;
        Ok(VirtualFs {
            root,
            cwd: PathBuf::from("/"),
            use_gmt_times,
        })
    }

    /// The host path acting as this session's `/`.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The FTP-visible current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Whether timestamps are rendered in UTC (otherwise local time).
    pub fn use_gmt_times(&self) -> bool {
        self.use_gmt_times
    }

    /// Replaces the working directory with the normalized form of `ftp_path`.
    pub fn set_cwd(&mut self, ftp_path: &str) {
        self.cwd = self.ftpnorm(ftp_path);
    }

    /// Normalizes an FTP path against the working directory: makes it
    /// absolute, collapses `.` and `..`, and never ascends above `/`.
    pub fn ftpnorm(&self, ftp_path: &str) -> PathBuf {
        let joined = if ftp_path.starts_with('/') {
            PathBuf::from(ftp_path)
        } else {
            self.cwd.join(ftp_path)
        };
        let mut normalized = PathBuf::from("/");
        for component in joined.components() {
            match component {
                Component::RootDir | Component::CurDir => {}
                Component::ParentDir => {
                    normalized.pop();
                }
                Component::Normal(part) => normalized.push(part),
                // FTP paths have no prefixes; keep the compiler happy on Windows.
                Component::Prefix(_) => {}
            }
        }
        normalized
    }

    /// Translates an FTP path into the backing host path.
    pub fn ftp2fs(&self, ftp_path: &str) -> PathBuf {
        let normalized = self.ftpnorm(ftp_path);
        let relative = normalized.strip_prefix("/").unwrap_or(&normalized);
        self.root.join(relative)
    }

    /// Translates a host path back into the FTP namespace. Host paths outside
    /// the root map to `/` so the host layout never leaks to the client.
    pub fn fs2ftp(&self, host_path: &Path) -> PathBuf {
        match host_path.strip_prefix(&self.root) {
            Ok(relative) => Path::new("/").join(relative),
            Err(_) => PathBuf::from("/"),
        }
    }

    /// Resolves symlinks in `host_path` and expands the deepest existing
    /// ancestor, so paths that do not exist yet (upload targets) can still be
    /// containment-checked.
    async fn realpath(&self, host_path: &Path) -> io::Result<PathBuf> {
        let mut existing = host_path.to_path_buf();
        let mut trailer: Vec<std::ffi::OsString> = Vec::new();
        loop {
            match tokio::fs::canonicalize(&existing).await {
                Ok(resolved) => {
                    let mut result = resolved;
                    for part in trailer.iter().rev() {
                        result.push(part);
                    }
                    return Ok(result);
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    let name = existing.file_name().ok_or(err)?.to_os_string();
                    trailer.push(name);
                    if !existing.pop() {
                        return Err(io::Error::from(io::ErrorKind::NotFound));
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Tells whether `host_path`, after symlink expansion, stays at or below
    /// the root. Every path handed to a filesystem operation must pass this.
    #[tracing_attributes::instrument(skip(self))]
    pub async fn validpath(&self, host_path: &Path) -> bool {
        match self.realpath(host_path).await {
            Ok(resolved) => resolved.starts_with(&self.root),
            Err(_) => false,
        }
    }

    /// Returns metadata for the given host path, following symlinks.
    pub async fn stat(&self, host_path: &Path) -> Result<std::fs::Metadata> {
        Ok(tokio::fs::metadata(host_path).await?)
    }

    /// Returns metadata without following a final symlink.
    pub async fn lstat(&self, host_path: &Path) -> Result<std::fs::Metadata> {
        Ok(tokio::fs::symlink_metadata(host_path).await?)
    }

    /// Opens the directory for iteration.
    pub async fn listdir(&self, host_path: &Path) -> Result<tokio::fs::ReadDir> {
        Ok(tokio::fs::read_dir(host_path).await?)
    }

    /// Opens a file for reading, positioned at `offset`.
    pub(crate) async fn open_read(&self, host_path: &Path, offset: u64) -> Result<tokio::fs::File> {
        let mut file = tokio::fs::File::open(host_path).await?;
        if offset > 0 {
            file.seek(io::SeekFrom::Start(offset)).await?;
        }
        Ok(file)
    }

    /// Opens (creating if necessary) a file for writing. `WriteMode::Offset`
    /// truncates at the offset and continues from there, which is what a
    /// restarted STOR needs; `WriteMode::Append` is APPE.
    pub(crate) async fn open_write(&self, host_path: &Path, mode: WriteMode) -> Result<tokio::fs::File> {
        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true);
        if mode == WriteMode::Append {
            options.append(true);
        }
        let mut file = options.open(host_path).await?;
        if let WriteMode::Offset(offset) = mode {
            file.set_len(offset).await?;
            file.seek(io::SeekFrom::Start(offset)).await?;
        }
        Ok(file)
    }

    /// Creates a directory.
    pub async fn mkdir(&self, host_path: &Path) -> Result<()> {
        Ok(tokio::fs::create_dir(host_path).await?)
    }

    /// Removes an empty directory.
    pub async fn rmdir(&self, host_path: &Path) -> Result<()> {
        Ok(tokio::fs::remove_dir(host_path).await?)
    }

    /// Removes a file.
    pub async fn remove(&self, host_path: &Path) -> Result<()> {
        Ok(tokio::fs::remove_file(host_path).await?)
    }

    /// Renames a file or directory.
    pub async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        Ok(tokio::fs::rename(from, to).await?)
    }

    /// Changes the file mode bits (SITE CHMOD).
    #[cfg(unix)]
    pub async fn chmod(&self, host_path: &Path, mode: u32) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;
        Ok(tokio::fs::set_permissions(host_path, std::fs::Permissions::from_mode(mode)).await?)
    }

    /// Sets the file modification time (MFMT).
    pub async fn set_mtime(&self, host_path: &Path, mtime: SystemTime) -> Result<()> {
        let file = tokio::fs::OpenOptions::new().write(true).open(host_path).await?;
        let file = file.into_std().await;
        let times = std::fs::FileTimes::new().set_modified(mtime);
        tokio::task::spawn_blocking(move || file.set_times(times))
            .await
            .map_err(|e| Error::new(ErrorKind::LocalError, e))??;
        Ok(())
    }

    /// Returns the size of a regular file. Directories are refused so SIZE
    /// cannot be used to probe them.
    pub async fn getsize(&self, host_path: &Path) -> Result<u64> {
        let meta = self.stat(host_path).await?;
        if !meta.is_file() {
            return Err(ErrorKind::PermanentFileNotAvailable.into());
        }
        Ok(meta.len())
    }

    /// Returns the modification time of a file as a UTC timestamp.
    pub async fn getmtime(&self, host_path: &Path) -> Result<DateTime<Utc>> {
        let meta = self.stat(host_path).await?;
        let mtime = meta.modified().map_err(|e| Error::new(ErrorKind::LocalError, e))?;
        Ok(mtime.into())
    }

    /// Picks a name that does not exist yet inside `host_dir` (STOU).
    pub(crate) async fn unique_name(&self, host_dir: &Path) -> Result<String> {
        for _ in 0..8 {
            let candidate = format!("ftpd.{}", &uuid::Uuid::new_v4().simple().to_string()[..12]);
            if tokio::fs::symlink_metadata(host_dir.join(&candidate)).await.is_err() {
                return Ok(candidate);
            }
        }
        Err(ErrorKind::FileNameNotAllowedError.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn vfs_at(root: &Path) -> VirtualFs {
        VirtualFs::new(root, true).unwrap()
    }

    #[test]
    fn ftpnorm_collapses() {
        let root = tempfile::tempdir().unwrap();
        let fs = vfs_at(root.path());
        assert_eq!(fs.ftpnorm("//a/b/../c"), PathBuf::from("/a/c"));
        assert_eq!(fs.ftpnorm("/"), PathBuf::from("/"));
        assert_eq!(fs.ftpnorm(".."), PathBuf::from("/"));
        assert_eq!(fs.ftpnorm("../../.."), PathBuf::from("/"));
        assert_eq!(fs.ftpnorm("a/./b"), PathBuf::from("/a/b"));
    }

    #[test]
    fn ftpnorm_is_relative_to_cwd() {
        let root = tempfile::tempdir().unwrap();
        let mut fs = vfs_at(root.path());
        fs.set_cwd("/sub/dir");
        assert_eq!(fs.ftpnorm("file.txt"), PathBuf::from("/sub/dir/file.txt"));
        assert_eq!(fs.ftpnorm(".."), PathBuf::from("/sub"));
        assert_eq!(fs.ftpnorm("/other"), PathBuf::from("/other"));
    }

    #[test]
    fn ftp2fs_fs2ftp_round_trip() {
        let root = tempfile::tempdir().unwrap();
        let fs = vfs_at(root.path());
        let canonical_root = std::fs::canonicalize(root.path()).unwrap();
        for ftp_path in ["/a/b", "/", "/x"] {
            let host = fs.ftp2fs(ftp_path);
            assert!(host.starts_with(&canonical_root));
            assert_eq!(fs.fs2ftp(&host), fs.ftpnorm(ftp_path));
        }
    }

    #[test]
    fn fs2ftp_never_leaks_host_layout() {
        let root = tempfile::tempdir().unwrap();
        let fs = vfs_at(root.path());
        assert_eq!(fs.fs2ftp(Path::new("/etc/passwd")), PathBuf::from("/"));
    }

    #[test]
    fn dotdot_cannot_escape() {
        let root = tempfile::tempdir().unwrap();
        let fs = vfs_at(root.path());
        let canonical_root = std::fs::canonicalize(root.path()).unwrap();
        let host = fs.ftp2fs("../../etc/passwd");
        assert_eq!(host, canonical_root.join("etc/passwd"));
    }

    #[tokio::test]
    async fn validpath_accepts_inside_rejects_outside() {
        let root = tempfile::tempdir().unwrap();
        let fs = vfs_at(root.path());
        let inside = root.path().join("f.txt");
        std::fs::write(&inside, b"x").unwrap();
        assert!(fs.validpath(&inside).await);
        // Not-yet-existing targets below the root are fine too.
        assert!(fs.validpath(&root.path().join("new.txt")).await);
        assert!(!fs.validpath(Path::new("/etc/passwd")).await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn validpath_rejects_symlink_escape() {
        let root = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let link = root.path().join("escape");
        std::os::unix::fs::symlink(outside.path(), &link).unwrap();
        let fs = vfs_at(root.path());
        assert!(!fs.validpath(&link).await);
        assert!(!fs.validpath(&link.join("f.txt")).await);
    }

    #[tokio::test]
    async fn write_modes() {
        let root = tempfile::tempdir().unwrap();
        let fs = vfs_at(root.path());
        let path = root.path().join("f.bin");
        std::fs::write(&path, b"0123456789").unwrap();

        // Truncate-at-offset keeps the prefix.
        let mut file = fs.open_write(&path, WriteMode::Offset(4)).await.unwrap();
        tokio::io::AsyncWriteExt::write_all(&mut file, b"ABCDEF").await.unwrap();
        tokio::io::AsyncWriteExt::flush(&mut file).await.unwrap();
        drop(file);
        assert_eq!(std::fs::read(&path).unwrap(), b"0123ABCDEF");

        // Append adds to the end.
        let mut file = fs.open_write(&path, WriteMode::Append).await.unwrap();
        tokio::io::AsyncWriteExt::write_all(&mut file, b"!").await.unwrap();
        tokio::io::AsyncWriteExt::flush(&mut file).await.unwrap();
        drop(file);
        assert_eq!(std::fs::read(&path).unwrap(), b"0123ABCDEF!");
    }

    #[tokio::test]
    async fn getsize_refuses_directories() {
        let root = tempfile::tempdir().unwrap();
        let fs = vfs_at(root.path());
        assert!(fs.getsize(root.path()).await.is_err());
    }

    #[tokio::test]
    async fn unique_names_do_not_collide() {
        let root = tempfile::tempdir().unwrap();
        let fs = vfs_at(root.path());
        let a = fs.unique_name(root.path()).await.unwrap();
        std::fs::write(root.path().join(&a), b"").unwrap();
        let b = fs.unique_name(root.path()).await.unwrap();
        assert_ne!(a, b);
    }
}
