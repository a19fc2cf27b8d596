//! The RFC 959 Make Directory (`MKD`) command

use crate::auth::{Authorizer, Perm};
use crate::notification::event::DataEvent;
use crate::server::controlchan::commands::{check_perm, fs_error_reply, resolve_path};
use crate::server::controlchan::control_loop::event_meta;
use crate::server::controlchan::error::ControlChanError;
use crate::server::controlchan::handler::{CommandContext, CommandHandler};
use crate::server::controlchan::{Reply, ReplyCode};

use async_trait::async_trait;

#[derive(Debug)]
pub struct Mkd {
    path: String,
}

impl Mkd {
    pub fn new(path: String) -> Self {
        Mkd { path }
    }
}

#[async_trait]
impl<A: Authorizer> CommandHandler<A> for Mkd {
    async fn handle(&self, args: CommandContext<A>) -> Result<Reply, ControlChanError> {
        let mut session = args.session.lock().await;
        let (host_path, ftp_path) = match resolve_path(&session, &self.path).await {
            Ok(resolved) => resolved,
            Err(reply) => return Ok(reply),
        };
        if let Err(reply) = check_perm(&session, Perm::MKDIR, &host_path) {
            return Ok(reply);
        }
        let Some(vfs) = session.vfs.as_ref() else {
            return Err(crate::server::ControlChanErrorKind::IllegalState.into());
        };
        match vfs.mkdir(&host_path).await {
            Ok(()) => {
                let meta = event_meta(&mut session);
                args.opts
                    .data_listener
                    .receive_data_event(DataEvent::MadeDir { path: ftp_path.clone() }, meta)
                    .await;
                let quoted = ftp_path.replace('"', "\"\"");
                Ok(Reply::new_with_string(ReplyCode::DirCreated, format!("\"{quoted}\" directory created.")))
            }
            Err(err) => Ok(fs_error_reply(&err, &ftp_path)),
        }
    }
}
