//! The RFC 3659 Machine Listing (`MLSD`) command
//
// A machine-parseable directory listing over the data connection. The fact
// set is the one selected with OPTS MLST; the `perm` fact reflects what the
// logged-in user may actually do with each entry.

use crate::auth::{Authorizer, Perm};
use crate::server::chancomms::SendSource;
use crate::server::controlchan::Reply;
use crate::server::controlchan::commands::retr::dispatch_send;
use crate::server::controlchan::commands::{check_perm, fs_error_reply, no_such_file, resolve_path};
use crate::server::controlchan::error::{ControlChanError, ControlChanErrorKind};
use crate::server::controlchan::handler::{CommandContext, CommandHandler};
use crate::server::session::TransferType;
use crate::vfs::mlsx::{self, EntryKind, Facts};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tokio_stream::wrappers::ReadDirStream;
use tokio_util::io::StreamReader;

#[derive(Debug)]
pub struct Mlsd {
    path: Option<String>,
}

impl Mlsd {
    pub fn new(path: Option<String>) -> Self {
        Mlsd { path }
    }
}

// Derives the MLST `perm` fact letters from the user's rights on the entry.
pub(crate) fn mlsx_perm_letters<A: Authorizer>(authorizer: &Arc<A>, username: &str, path: &Path, is_dir: bool) -> String {
    let mut letters = String::new();
    let table: &[(Perm, char)] = if is_dir {
        // e: can CWD into it, l: can list it, m: can make dirs inside,
        // c: can store files inside, d: can delete it, f: can rename it.
        &[
            (Perm::CHANGE_DIR, 'e'),
            (Perm::LIST, 'l'),
            (Perm::MKDIR, 'm'),
            (Perm::STORE, 'c'),
            (Perm::DELETE, 'd'),
            (Perm::RENAME, 'f'),
        ]
    } else {
        // r: can retrieve, w: can overwrite, a: can append, d: can delete,
        // f: can rename.
        &[
            (Perm::RETRIEVE, 'r'),
            (Perm::STORE, 'w'),
            (Perm::APPEND, 'a'),
            (Perm::DELETE, 'd'),
            (Perm::RENAME, 'f'),
        ]
    };
    for (perm, letter) in table {
        if authorizer.has_perm(username, *perm, Some(path)) {
            letters.push(*letter);
        }
    }
    letters
}

#[async_trait]
impl<A: Authorizer> CommandHandler<A> for Mlsd {
    async fn handle(&self, args: CommandContext<A>) -> Result<Reply, ControlChanError> {
        let mut session = args.session.lock().await;
        let arg = self.path.clone().unwrap_or_default();
        let (host_path, ftp_path) = match resolve_path(&session, &arg).await {
            Ok(resolved) => resolved,
            Err(reply) => return Ok(reply),
        };
        if let Err(reply) = check_perm(&session, Perm::LIST, &host_path) {
            return Ok(reply);
        }
        let facts = session.mlst_facts;
        let username = session.username_or_empty();
        let authorizer = Arc::clone(&session.authorizer);
        let Some(vfs) = session.vfs.as_ref() else {
            return Err(ControlChanErrorKind::IllegalState.into());
        };

        let dir_meta = match vfs.stat(&host_path).await {
            Ok(meta) => meta,
            Err(err) => return Ok(fs_error_reply(&err, &ftp_path)),
        };
        if !dir_meta.is_dir() {
            return Ok(no_such_file(&ftp_path));
        }
        let dir = match vfs.listdir(&host_path).await {
            Ok(dir) => dir,
            Err(err) => return Ok(fs_error_reply(&err, &ftp_path)),
        };

        // The listed directory itself leads the listing as "cdir".
        let cdir_letters = mlsx_perm_letters(&authorizer, &username, &host_path, true);
        let mut cdir_line = mlsx::format_line(&ftp_path, &dir_meta, EntryKind::Cdir, facts, &cdir_letters);
        cdir_line.push_str("\r\n");
        let header = tokio_stream::once(Ok::<Bytes, io::Error>(Bytes::from(cdir_line)));

        let entries = ReadDirStream::new(dir).then(move |res| {
            let authorizer = Arc::clone(&authorizer);
            let username = username.clone();
            async move {
                let entry = res?;
                let meta = entry.metadata().await?;
                let kind = if meta.is_dir() { EntryKind::Dir } else { EntryKind::File };
                let letters = mlsx_perm_letters(&authorizer, &username, &entry.path(), meta.is_dir());
                let name = entry.file_name().to_string_lossy().into_owned();
                let mut line = mlsx::format_line(&name, &meta, kind, facts, &letters);
                line.push_str("\r\n");
                Ok::<Bytes, io::Error>(Bytes::from(line))
            }
        });
        let reader = Box::new(StreamReader::new(Box::pin(header.chain(entries))));

        if let Err(reply) = dispatch_send(&mut session, SendSource::Reader(reader), None, TransferType::Image).await {
            return Ok(reply);
        }
        Ok(crate::server::controlchan::commands::preliminary_reply(&session))
    }
}
