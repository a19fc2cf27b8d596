//! The RFC 3659 File Size (`SIZE`) command
//
// Returns the transfer size of a file. In ASCII type the transfer size
// differs from the on-disk size and computing it would mean reading the
// whole file, so the command is refused, as servers customarily do.

use crate::auth::{Authorizer, Perm};
use crate::server::controlchan::commands::{check_perm, fs_error_reply, resolve_path};
use crate::server::controlchan::error::{ControlChanError, ControlChanErrorKind};
use crate::server::controlchan::handler::{CommandContext, CommandHandler};
use crate::server::controlchan::{Reply, ReplyCode};
use crate::server::session::TransferType;

use async_trait::async_trait;

#[derive(Debug)]
pub struct Size {
    path: String,
}

impl Size {
    pub fn new(path: String) -> Self {
        Size { path }
    }
}

#[async_trait]
impl<A: Authorizer> CommandHandler<A> for Size {
    async fn handle(&self, args: CommandContext<A>) -> Result<Reply, ControlChanError> {
        let session = args.session.lock().await;
        if session.transfer_type == TransferType::Ascii {
            return Ok(Reply::new(ReplyCode::FileError, "SIZE not allowed in ASCII mode."));
        }
        let (host_path, ftp_path) = match resolve_path(&session, &self.path).await {
            Ok(resolved) => resolved,
            Err(reply) => return Ok(reply),
        };
        if let Err(reply) = check_perm(&session, Perm::LIST, &host_path) {
            return Ok(reply);
        }
        let Some(vfs) = session.vfs.as_ref() else {
            return Err(ControlChanErrorKind::IllegalState.into());
        };
        match vfs.getsize(&host_path).await {
            Ok(size) => Ok(Reply::new_with_string(ReplyCode::FileStatus, size.to_string())),
            Err(err) => Ok(fs_error_reply(&err, &ftp_path)),
        }
    }
}
