//! The RFC 959 Store Unique (`STOU`) command
//
// Like STOR, but the server picks a name that does not exist yet in the
// working directory and announces it in the preliminary reply.

use crate::auth::{Authorizer, Perm};
use crate::server::controlchan::commands::stor::dispatch_receive;
use crate::server::controlchan::commands::{check_perm, fs_error_reply};
use crate::server::controlchan::error::{ControlChanError, ControlChanErrorKind};
use crate::server::controlchan::handler::{CommandContext, CommandHandler};
use crate::server::controlchan::{Reply, ReplyCode};
use crate::vfs::WriteMode;

use async_trait::async_trait;

#[derive(Debug)]
pub struct Stou;

#[async_trait]
impl<A: Authorizer> CommandHandler<A> for Stou {
    async fn handle(&self, args: CommandContext<A>) -> Result<Reply, ControlChanError> {
        let mut session = args.session.lock().await;
        let Some(vfs) = session.vfs.as_ref() else {
            return Err(ControlChanErrorKind::IllegalState.into());
        };
        let cwd_host = vfs.ftp2fs(".");
        let name = match vfs.unique_name(&cwd_host).await {
            Ok(name) => name,
            Err(err) => return Ok(fs_error_reply(&err, ".")),
        };
        let host_path = cwd_host.join(&name);
        let ftp_path = vfs.ftpnorm(&name).display().to_string();
        if let Err(reply) = check_perm(&session, Perm::STORE, &host_path) {
            return Ok(reply);
        }
        let file = match vfs.open_write(&host_path, WriteMode::Offset(0)).await {
            Ok(file) => file,
            Err(err) => return Ok(fs_error_reply(&err, &ftp_path)),
        };
        if let Err(reply) = dispatch_receive(&mut session, file, ftp_path).await {
            return Ok(reply);
        }
        // RFC 1123 wants the chosen name in the preliminary reply.
        Ok(Reply::new_with_string(ReplyCode::FileStatusOkay, format!("FILE: {name}")))
    }
}
