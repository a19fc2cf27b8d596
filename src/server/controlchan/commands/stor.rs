//! The RFC 959 Store (`STOR`) command
//
// This command causes the server-DTP to accept the data transferred via the
// data connection and to store the data as a file at the server site. An
// earlier REST moves the write offset; the file is truncated there first.

use crate::auth::{Authorizer, Perm};
use crate::server::chancomms::DataCommand;
use crate::server::controlchan::commands::{check_perm, fs_error_reply, preliminary_reply, resolve_path};
use crate::server::controlchan::error::{ControlChanError, ControlChanErrorKind};
use crate::server::controlchan::handler::{CommandContext, CommandHandler};
use crate::server::controlchan::{Reply, ReplyCode};
use crate::server::session::Session;
use crate::vfs::WriteMode;

use async_trait::async_trait;

#[derive(Debug)]
pub struct Stor {
    path: String,
}

impl Stor {
    pub fn new(path: String) -> Self {
        Stor { path }
    }
}

// Hands an inbound transfer to the session's data channel. Shared by STOR,
// STOU and APPE.
pub(crate) async fn dispatch_receive<A: Authorizer>(session: &mut Session<A>, file: tokio::fs::File, ftp_path: String) -> Result<(), Reply> {
    let Some(tx) = session.data_cmd_tx.take() else {
        return Err(Reply::new(ReplyCode::CantOpenDataConnection, "Use PORT or PASV first."));
    };
    let cmd = DataCommand::Receive {
        file,
        ftp_path,
        transfer_type: session.transfer_type,
    };
    if tx.send(cmd).await.is_err() {
        session.clear_data_channel();
        return Err(Reply::new(ReplyCode::CantOpenDataConnection, "Can't open data connection."));
    }
    session.transfer_active = true;
    Ok(())
}

#[async_trait]
impl<A: Authorizer> CommandHandler<A> for Stor {
    async fn handle(&self, args: CommandContext<A>) -> Result<Reply, ControlChanError> {
        let mut session = args.session.lock().await;
        let (host_path, ftp_path) = match resolve_path(&session, &self.path).await {
            Ok(resolved) => resolved,
            Err(reply) => return Ok(reply),
        };
        if let Err(reply) = check_perm(&session, Perm::STORE, &host_path) {
            return Ok(reply);
        }
        let offset = std::mem::take(&mut session.start_pos);
        let Some(vfs) = session.vfs.as_ref() else {
            return Err(ControlChanErrorKind::IllegalState.into());
        };
        let file = match vfs.open_write(&host_path, WriteMode::Offset(offset)).await {
            Ok(file) => file,
            Err(err) => return Ok(fs_error_reply(&err, &ftp_path)),
        };
        if let Err(reply) = dispatch_receive(&mut session, file, ftp_path).await {
            return Ok(reply);
        }
        Ok(preliminary_reply(&session))
    }
}
