//! The RFC 959 Append (`APPE`) command
//
// Like STOR, but writes are added to the end of an existing file. The file
// is created when it does not exist yet.

use crate::auth::{Authorizer, Perm};
use crate::server::controlchan::commands::stor::dispatch_receive;
use crate::server::controlchan::commands::{check_perm, fs_error_reply, preliminary_reply, resolve_path};
use crate::server::controlchan::error::{ControlChanError, ControlChanErrorKind};
use crate::server::controlchan::handler::{CommandContext, CommandHandler};
use crate::server::controlchan::Reply;
use crate::vfs::WriteMode;

use async_trait::async_trait;

#[derive(Debug)]
pub struct Appe {
    path: String,
}

impl Appe {
    pub fn new(path: String) -> Self {
        Appe { path }
    }
}

#[async_trait]
impl<A: Authorizer> CommandHandler<A> for Appe {
    async fn handle(&self, args: CommandContext<A>) -> Result<Reply, ControlChanError> {
        let mut session = args.session.lock().await;
        let (host_path, ftp_path) = match resolve_path(&session, &self.path).await {
            Ok(resolved) => resolved,
            Err(reply) => return Ok(reply),
        };
        if let Err(reply) = check_perm(&session, Perm::APPEND, &host_path) {
            return Ok(reply);
        }
        let Some(vfs) = session.vfs.as_ref() else {
            return Err(ControlChanErrorKind::IllegalState.into());
        };
        let file = match vfs.open_write(&host_path, WriteMode::Append).await {
            Ok(file) => file,
            Err(err) => return Ok(fs_error_reply(&err, &ftp_path)),
        };
        if let Err(reply) = dispatch_receive(&mut session, file, ftp_path).await {
            return Ok(reply);
        }
        Ok(preliminary_reply(&session))
    }
}
