//! Renders directory entries in the Unix `ls -l` format used by LIST and
//! STAT, and provides the lazily evaluated line streams sent over the data
//! channel.

use bytes::Bytes;
use chrono::{DateTime, Local, Utc};
use futures_util::StreamExt;
use std::{
    fmt::{self, Display, Formatter, Write as _},
    io,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};
use tokio_stream::wrappers::ReadDirStream;
use tokio_util::io::StreamReader;

// A modification time older than this is shown with the year instead of the
// time of day, like ls does.
const SIX_MONTHS: Duration = Duration::from_secs(180 * 24 * 60 * 60);

/// A single directory entry with everything needed to render a listing line.
#[derive(Debug)]
pub(crate) struct NodeInfo {
    pub name: String,
    pub metadata: std::fs::Metadata,
    pub link_target: Option<PathBuf>,
    pub use_gmt: bool,
}

impl NodeInfo {
    pub(crate) async fn from_dir_entry(entry: &tokio::fs::DirEntry, use_gmt: bool) -> io::Result<NodeInfo> {
        let metadata = entry.metadata().await?;
        let link_target = if metadata.is_symlink() {
            tokio::fs::read_link(entry.path()).await.ok()
        } else {
            None
        };
        Ok(NodeInfo {
            name: entry.file_name().to_string_lossy().into_owned(),
            metadata,
            link_target,
            use_gmt,
        })
    }

    pub(crate) async fn from_path(path: &Path, use_gmt: bool) -> io::Result<NodeInfo> {
        let metadata = tokio::fs::symlink_metadata(path).await?;
        let link_target = if metadata.is_symlink() {
            tokio::fs::read_link(path).await.ok()
        } else {
            None
        };
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| ".".to_string());
        Ok(NodeInfo { name, metadata, link_target, use_gmt })
    }

    fn format_mtime(&self) -> String {
        let Ok(mtime) = self.metadata.modified() else {
            return "--- -- --:--".to_string();
        };
        let recent = SystemTime::now().duration_since(mtime).map(|age| age < SIX_MONTHS).unwrap_or(true);
        let pattern = if recent { "%b %d %H:%M" } else { "%b %d  %Y" };
        if self.use_gmt {
            DateTime::<Utc>::from(mtime).format(pattern).to_string()
        } else {
            DateTime::<Local>::from(mtime).format(pattern).to_string()
        }
    }
}

#[cfg(unix)]
fn mode_string(metadata: &std::fs::Metadata) -> String {
    use std::os::unix::fs::PermissionsExt;
    let mode = metadata.permissions().mode();
    let mut out = String::with_capacity(9);
    for shift in [6u32, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    out
}

#[cfg(not(unix))]
fn mode_string(metadata: &std::fs::Metadata) -> String {
    if metadata.permissions().readonly() {
        "r--r--r--".to_string()
    } else {
        "rw-rw-rw-".to_string()
    }
}

impl Display for NodeInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let file_type = if self.metadata.is_dir() {
            'd'
        } else if self.metadata.is_symlink() {
            'l'
        } else {
            '-'
        };
        #[cfg(unix)]
        let (links, owner, group) = {
            use std::os::unix::fs::MetadataExt;
            (
                self.metadata.nlink(),
                self.metadata.uid().to_string(),
                self.metadata.gid().to_string(),
            )
        };
        #[cfg(not(unix))]
        let (links, owner, group) = (1u64, "owner".to_string(), "group".to_string());

        write!(
            f,
            "{file_type}{mode} {links:>3} {owner:<8} {group:<8} {size:>8} {mtime} {name}",
            mode = mode_string(&self.metadata),
            size = self.metadata.len(),
            mtime = self.format_mtime(),
            name = self.name,
        )?;
        if let Some(target) = &self.link_target {
            write!(f, " -> {}", target.display())?;
        }
        Ok(())
    }
}

type BoxedLineReader = Box<dyn tokio::io::AsyncRead + Send + Unpin>;

// Builds an AsyncRead over lazily formatted lines, one dir entry at a time,
// so that very large directories never get buffered in memory.
fn line_reader<F, Fut>(dir: tokio::fs::ReadDir, format: F) -> BoxedLineReader
where
    F: FnMut(tokio::fs::DirEntry) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = io::Result<String>> + Send + 'static,
{
    let mut format = format;
    let stream = ReadDirStream::new(dir).then(move |entry| {
        let formatted = entry.map(&mut format);
        async move {
            let mut line = formatted?.await?;
            line.push_str("\r\n");
            Ok::<Bytes, io::Error>(Bytes::from(line))
        }
    });
    Box::new(StreamReader::new(Box::pin(stream)))
}

/// `ls -l` lines for LIST.
pub(crate) fn unix_listing_reader(dir: tokio::fs::ReadDir, use_gmt: bool) -> BoxedLineReader {
    line_reader(dir, move |entry| async move {
        let info = NodeInfo::from_dir_entry(&entry, use_gmt).await?;
        Ok(info.to_string())
    })
}

/// Bare names for NLST.
pub(crate) fn names_only_reader(dir: tokio::fs::ReadDir) -> BoxedLineReader {
    line_reader(dir, |entry| async move { Ok(entry.file_name().to_string_lossy().into_owned()) })
}

/// A reader over an already rendered set of lines (single-file LIST, or a
/// LIST of a path that is not a directory).
pub(crate) fn fixed_lines_reader(lines: Vec<String>) -> BoxedLineReader {
    let mut buffer = String::new();
    for line in lines {
        let _ = write!(buffer, "{line}\r\n");
    }
    Box::new(std::io::Cursor::new(buffer.into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn listing_line_shape() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hello.txt"), b"hello world").unwrap();
        let info = NodeInfo::from_path(&dir.path().join("hello.txt"), true).await.unwrap();
        let line = info.to_string();
        assert!(line.starts_with('-'), "not a regular file line: {line}");
        assert!(line.ends_with("hello.txt"), "name missing: {line}");
        assert!(line.contains("11"), "size missing: {line}");
    }

    #[tokio::test]
    async fn directory_line_starts_with_d() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let info = NodeInfo::from_path(&dir.path().join("sub"), true).await.unwrap();
        assert!(info.to_string().starts_with('d'));
    }

    #[tokio::test]
    async fn reader_streams_all_entries() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.txt", "b.txt", "c.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let read_dir = tokio::fs::read_dir(dir.path()).await.unwrap();
        let mut reader = names_only_reader(read_dir);
        let mut out = String::new();
        reader.read_to_string(&mut out).await.unwrap();
        let mut names: Vec<&str> = out.lines().collect();
        names.sort_unstable();
        assert_eq!(names, vec!["a.txt", "b.txt", "c.txt"]);
        assert!(out.ends_with("\r\n"));
    }
}
