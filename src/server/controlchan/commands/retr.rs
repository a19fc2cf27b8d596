//! The RFC 959 Retrieve (`RETR`) command
//
// This command causes the server-DTP to transfer a copy of the file,
// specified in the pathname, over the data connection. The status and
// contents of the file at the server site are unaffected.

use crate::auth::{Authorizer, Perm};
use crate::server::chancomms::{DataCommand, SendSource};
use crate::server::controlchan::commands::{check_perm, fs_error_reply, preliminary_reply, resolve_path};
use crate::server::controlchan::error::{ControlChanError, ControlChanErrorKind};
use crate::server::controlchan::handler::{CommandContext, CommandHandler};
use crate::server::controlchan::{Reply, ReplyCode};
use crate::server::session::{Session, TransferType};

use async_trait::async_trait;

#[derive(Debug)]
pub struct Retr {
    path: String,
}

impl Retr {
    pub fn new(path: String) -> Self {
        Retr { path }
    }
}

// Hands an outbound transfer to the session's data channel. The Err reply is
// what the client gets when no data channel is there to take it.
pub(crate) async fn dispatch_send<A: Authorizer>(
    session: &mut Session<A>,
    source: SendSource,
    ftp_path: Option<String>,
    transfer_type: TransferType,
) -> Result<(), Reply> {
    let Some(tx) = session.data_cmd_tx.take() else {
        return Err(Reply::new(ReplyCode::CantOpenDataConnection, "Use PORT or PASV first."));
    };
    let cmd = DataCommand::Send { source, ftp_path, transfer_type };
    if tx.send(cmd).await.is_err() {
        // The dispatcher task is gone, e.g. the passive accept timed out.
        session.clear_data_channel();
        return Err(Reply::new(ReplyCode::CantOpenDataConnection, "Can't open data connection."));
    }
    session.transfer_active = true;
    Ok(())
}

#[async_trait]
impl<A: Authorizer> CommandHandler<A> for Retr {
    async fn handle(&self, args: CommandContext<A>) -> Result<Reply, ControlChanError> {
        let mut session = args.session.lock().await;
        let (host_path, ftp_path) = match resolve_path(&session, &self.path).await {
            Ok(resolved) => resolved,
            Err(reply) => return Ok(reply),
        };
        if let Err(reply) = check_perm(&session, Perm::RETRIEVE, &host_path) {
            return Ok(reply);
        }
        let offset = std::mem::take(&mut session.start_pos);
        let Some(vfs) = session.vfs.as_ref() else {
            return Err(ControlChanErrorKind::IllegalState.into());
        };
        let file = match vfs.open_read(&host_path, offset).await {
            Ok(file) => file,
            Err(err) => return Ok(fs_error_reply(&err, &ftp_path)),
        };
        let transfer_type = session.transfer_type;
        if let Err(reply) = dispatch_send(&mut session, SendSource::File(file), Some(ftp_path), transfer_type).await {
            return Ok(reply);
        }
        Ok(preliminary_reply(&session))
    }
}
