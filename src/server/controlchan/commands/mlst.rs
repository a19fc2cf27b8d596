//! The RFC 3659 Machine List Single (`MLST`) command
//
// Facts about one path, returned over the control channel in a 250
// multi-line reply. The fact line is indented by one space as the RFC
// requires.

use crate::auth::{Authorizer, Perm};
use crate::server::controlchan::commands::mlsd::mlsx_perm_letters;
use crate::server::controlchan::commands::{check_perm, fs_error_reply, resolve_path};
use crate::server::controlchan::error::{ControlChanError, ControlChanErrorKind};
use crate::server::controlchan::handler::{CommandContext, CommandHandler};
use crate::server::controlchan::{Reply, ReplyCode};
use crate::vfs::mlsx::{self, EntryKind};

use async_trait::async_trait;
use std::sync::Arc;

#[derive(Debug)]
pub struct Mlst {
    path: Option<String>,
}

impl Mlst {
    pub fn new(path: Option<String>) -> Self {
        Mlst { path }
    }
}

#[async_trait]
impl<A: Authorizer> CommandHandler<A> for Mlst {
    async fn handle(&self, args: CommandContext<A>) -> Result<Reply, ControlChanError> {
        let session = args.session.lock().await;
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
        let meta = match vfs.stat(&host_path).await {
            Ok(meta) => meta,
            Err(err) => return Ok(fs_error_reply(&err, &ftp_path)),
        };
        let kind = if meta.is_dir() { EntryKind::Dir } else { EntryKind::File };
        let letters = mlsx_perm_letters(&authorizer, &username, &host_path, meta.is_dir());
        let line = mlsx::format_line(&ftp_path, &meta, kind, facts, &letters);
        let lines = vec![format!("Listing \"{ftp_path}\":"), format!(" {line}"), "End MLST.".to_string()];
        Ok(Reply::new_multiline(ReplyCode::FileActionOkay, lines))
    }
}
