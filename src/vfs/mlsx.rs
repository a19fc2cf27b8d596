//! RFC 3659 machine-readable listing facts (MLST/MLSD) and their formatting.

use bitflags::bitflags;
use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use std::time::SystemTime;

bitflags! {
    /// The facts this server can emit, selectable with `OPTS MLST`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Facts: u16 {
        /// `type` - file, dir, cdir or pdir
        const TYPE      = 0b000000001;
        /// `size` - size in bytes
        const SIZE      = 0b000000010;
        /// `perm` - what the current user may do, in MLST letters
        const PERM      = 0b000000100;
        /// `modify` - modification time, YYYYMMDDHHMMSS UTC
        const MODIFY    = 0b000001000;
        /// `create` - creation time where the platform tracks it
        const CREATE    = 0b000010000;
        /// `unique` - a token unique per file (device/inode)
        const UNIQUE    = 0b000100000;
        /// `unix.mode` - the octal mode bits
        const UNIX_MODE = 0b001000000;
        /// `unix.uid` - owning user id
        const UNIX_UID  = 0b010000000;
        /// `unix.gid` - owning group id
        const UNIX_GID  = 0b100000000;
    }
}

const FACT_NAMES: [(&str, Facts); 9] = [
    ("type", Facts::TYPE),
    ("size", Facts::SIZE),
    ("perm", Facts::PERM),
    ("modify", Facts::MODIFY),
    ("create", Facts::CREATE),
    ("unique", Facts::UNIQUE),
    ("unix.mode", Facts::UNIX_MODE),
    ("unix.uid", Facts::UNIX_UID),
    ("unix.gid", Facts::UNIX_GID),
];

impl Default for Facts {
    fn default() -> Self {
        Facts::TYPE | Facts::SIZE | Facts::PERM | Facts::MODIFY
    }
}

impl Facts {
    /// Parses the argument of `OPTS MLST fact;fact;…`. Unknown facts are
    /// ignored, as RFC 3659 requires; an empty argument disables all facts.
    pub fn from_opts(arg: &str) -> Facts {
        let mut facts = Facts::empty();
        for name in arg.split(';').map(str::trim).filter(|n| !n.is_empty()) {
            if let Some((_, fact)) = FACT_NAMES.iter().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
                facts |= *fact;
            }
        }
        facts
    }

    /// The `MLST …` line advertised in FEAT, with a `*` marking each
    /// currently selected fact.
    pub fn feat_line(&self) -> String {
        let mut line = String::from("MLST ");
        for (name, fact) in FACT_NAMES {
            let marker = if self.contains(fact) { "*" } else { "" };
            let _ = write!(line, "{name}{marker};");
        }
        line
    }

    /// The reply body for `OPTS MLST`, listing the selected facts.
    pub fn opts_line(&self) -> String {
        let mut line = String::from("MLST OPTS ");
        for (name, fact) in FACT_NAMES {
            if self.contains(fact) {
                let _ = write!(line, "{name};");
            }
        }
        line
    }
}

/// What the `type` fact of an entry should say.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntryKind {
    File,
    Dir,
    /// The listed directory itself.
    Cdir,
    /// The parent of the listed directory.
    Pdir,
}

fn timeval(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).format("%Y%m%d%H%M%S").to_string()
}

#[cfg(unix)]
fn unique_token(metadata: &std::fs::Metadata) -> String {
    use std::os::unix::fs::MetadataExt;
    format!("{:x}g{:x}", metadata.dev(), metadata.ino())
}

#[cfg(not(unix))]
fn unique_token(_metadata: &std::fs::Metadata) -> String {
    "0".to_string()
}

/// Renders one `fact=value;fact=value; name` line. `perm_letters` carries the
/// MLST permission letters already derived from the session user's rights.
pub(crate) fn format_line(name: &str, metadata: &std::fs::Metadata, kind: EntryKind, facts: Facts, perm_letters: &str) -> String {
    let mut line = String::new();
    if facts.contains(Facts::TYPE) {
        let kind = match kind {
            EntryKind::File => "file",
            EntryKind::Dir => "dir",
            EntryKind::Cdir => "cdir",
            EntryKind::Pdir => "pdir",
        };
        let _ = write!(line, "type={kind};");
    }
    if facts.contains(Facts::SIZE) && metadata.is_file() {
        let _ = write!(line, "size={};", metadata.len());
    }
    if facts.contains(Facts::PERM) {
        let _ = write!(line, "perm={perm_letters};");
    }
    if facts.contains(Facts::MODIFY) {
        let _ = metadata.modified().map(|mtime| write!(line, "modify={};", timeval(mtime)));
    }
    if facts.contains(Facts::CREATE) {
        let _ = metadata.created().map(|btime| write!(line, "create={};", timeval(btime)));
    }
    if facts.contains(Facts::UNIQUE) {
        let _ = write!(line, "unique={};", unique_token(metadata));
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        if facts.contains(Facts::UNIX_MODE) {
            let _ = write!(line, "unix.mode={:o};", metadata.mode() & 0o7777);
        }
        if facts.contains(Facts::UNIX_UID) {
            let _ = write!(line, "unix.uid={};", metadata.uid());
        }
        if facts.contains(Facts::UNIX_GID) {
            let _ = write!(line, "unix.gid={};", metadata.gid());
        }
    }
    let _ = write!(line, " {name}");
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn opts_parsing_ignores_unknown_facts() {
        let facts = Facts::from_opts("type;bogus;size;");
        assert_eq!(facts, Facts::TYPE | Facts::SIZE);
        assert_eq!(Facts::from_opts(""), Facts::empty());
    }

    #[test]
    fn feat_line_marks_selected() {
        let line = Facts::default().feat_line();
        assert!(line.starts_with("MLST type*;size*;perm*;modify*;"));
        assert!(line.contains("unique;"));
        assert!(!line.contains("unique*"));
    }

    #[test]
    fn line_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, vec![0u8; 42]).unwrap();
        let metadata = std::fs::metadata(&path).unwrap();
        let line = format_line("data.bin", &metadata, EntryKind::File, Facts::default(), "rw");
        assert!(line.starts_with("type=file;size=42;perm=rw;modify="), "{line}");
        assert!(line.ends_with(" data.bin"), "{line}");
        // modify is 14 digits
        let modify = line.split("modify=").nth(1).unwrap().split(';').next().unwrap();
        assert_eq!(modify.len(), 14);
        assert!(modify.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn size_omitted_for_directories() {
        let dir = tempfile::tempdir().unwrap();
        let metadata = std::fs::metadata(dir.path()).unwrap();
        let line = format_line("sub", &metadata, EntryKind::Dir, Facts::TYPE | Facts::SIZE, "");
        assert_eq!(line, "type=dir; sub");
    }
}
