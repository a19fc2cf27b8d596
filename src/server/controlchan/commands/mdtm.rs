//! The RFC 3659 Modification Time (`MDTM`) command

use crate::auth::{Authorizer, Perm};
use crate::server::controlchan::commands::{check_perm, fs_error_reply, resolve_path};
use crate::server::controlchan::error::{ControlChanError, ControlChanErrorKind};
use crate::server::controlchan::handler::{CommandContext, CommandHandler};
use crate::server::controlchan::{Reply, ReplyCode};

use async_trait::async_trait;
use chrono::{DateTime, Local};

#[derive(Debug)]
pub struct Mdtm {
    path: String,
}

impl Mdtm {
    pub fn new(path: String) -> Self {
        Mdtm { path }
    }
}

#[async_trait]
impl<A: Authorizer> CommandHandler<A> for Mdtm {
    async fn handle(&self, args: CommandContext<A>) -> Result<Reply, ControlChanError> {
        let session = args.session.lock().await;
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
        match vfs.getmtime(&host_path).await {
            Ok(mtime) => {
                let stamp = if vfs.use_gmt_times() {
                    mtime.format("%Y%m%d%H%M%S").to_string()
                } else {
                    DateTime::<Local>::from(mtime).format("%Y%m%d%H%M%S").to_string()
                };
                Ok(Reply::new_with_string(ReplyCode::FileStatus, stamp))
            }
            Err(err) => Ok(fs_error_reply(&err, &ftp_path)),
        }
    }
}
