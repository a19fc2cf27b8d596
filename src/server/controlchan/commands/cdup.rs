//! The RFC 959 Change To Parent Directory (`CDUP`) command
//
// A special case of CWD; going up from `/` stays at `/`.

use crate::auth::{Authorizer, Perm};
use crate::server::controlchan::commands::{check_perm, resolve_path};
use crate::server::controlchan::error::{ControlChanError, ControlChanErrorKind};
use crate::server::controlchan::handler::{CommandContext, CommandHandler};
use crate::server::controlchan::{Reply, ReplyCode};

use async_trait::async_trait;

#[derive(Debug)]
pub struct Cdup;

#[async_trait]
impl<A: Authorizer> CommandHandler<A> for Cdup {
    async fn handle(&self, args: CommandContext<A>) -> Result<Reply, ControlChanError> {
        let mut session = args.session.lock().await;
        let (host_path, ftp_path) = match resolve_path(&session, "..").await {
            Ok(resolved) => resolved,
            Err(reply) => return Ok(reply),
        };
        if let Err(reply) = check_perm(&session, Perm::CHANGE_DIR, &host_path) {
            return Ok(reply);
        }
        let Some(vfs) = session.vfs.as_mut() else {
            return Err(ControlChanErrorKind::IllegalState.into());
        };
        vfs.set_cwd("..");
        Ok(Reply::new_with_string(ReplyCode::FileActionOkay, format!("\"{ftp_path}\" is the current directory.")))
    }
}
