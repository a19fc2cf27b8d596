//! The RFC 959 Rename To (`RNTO`) command

use crate::auth::{Authorizer, Perm};
use crate::notification::event::DataEvent;
use crate::server::controlchan::commands::{check_perm, fs_error_reply, resolve_path};
use crate::server::controlchan::control_loop::event_meta;
use crate::server::controlchan::error::{ControlChanError, ControlChanErrorKind};
use crate::server::controlchan::handler::{CommandContext, CommandHandler};
use crate::server::controlchan::{Reply, ReplyCode};

use async_trait::async_trait;

#[derive(Debug)]
pub struct Rnto {
    path: String,
}

impl Rnto {
    pub fn new(path: String) -> Self {
        Rnto { path }
    }
}

#[async_trait]
impl<A: Authorizer> CommandHandler<A> for Rnto {
    async fn handle(&self, args: CommandContext<A>) -> Result<Reply, ControlChanError> {
        let mut session = args.session.lock().await;
        let Some(source) = session.rename_from.take() else {
            return Ok(Reply::new(ReplyCode::BadCommandSequence, "Bad sequence of commands: use RNFR first."));
        };
        let (dest, ftp_dest) = match resolve_path(&session, &self.path).await {
            Ok(resolved) => resolved,
            Err(reply) => return Ok(reply),
        };
        if let Err(reply) = check_perm(&session, Perm::RENAME, &dest) {
            return Ok(reply);
        }
        let Some(vfs) = session.vfs.as_ref() else {
            return Err(ControlChanErrorKind::IllegalState.into());
        };
        let ftp_source = vfs.fs2ftp(&source).display().to_string();
        match vfs.rename(&source, &dest).await {
            Ok(()) => {
                let meta = event_meta(&mut session);
                args.opts
                    .data_listener
                    .receive_data_event(DataEvent::Renamed { from: ftp_source, to: ftp_dest }, meta)
                    .await;
                Ok(Reply::new(ReplyCode::FileActionOkay, "Renaming ok."))
            }
            Err(err) => Ok(fs_error_reply(&err, &ftp_dest)),
        }
    }
}
