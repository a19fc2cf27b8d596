//! The RFC 959 Abort (`ABOR`) command
//
// Cuts a running transfer short. Per RFC 959 the aborted transfer answers
// with a 426 first and the ABOR itself with a 226, in that order and on the
// control channel.

use crate::auth::Authorizer;
use crate::server::controlchan::error::ControlChanError;
use crate::server::controlchan::handler::{CommandContext, CommandHandler};
use crate::server::controlchan::{Reply, ReplyCode};

use async_trait::async_trait;

#[derive(Debug)]
pub struct Abor;

#[async_trait]
impl<A: Authorizer> CommandHandler<A> for Abor {
    async fn handle(&self, args: CommandContext<A>) -> Result<Reply, ControlChanError> {
        let mut session = args.session.lock().await;
        if session.transfer_active {
            session.transfer_active = false;
            if let Some(abort_tx) = session.data_abort_tx.take() {
                // The data task closes the socket and reports back for the
                // bookkeeping; the replies go out right here.
                let _ = abort_tx.send(()).await;
            }
            Ok(Reply::Sequence(vec![
                Reply::new(ReplyCode::ConnectionClosed, "Connection closed; transfer aborted."),
                Reply::new(ReplyCode::ClosingDataConnection, "ABOR command successful."),
            ]))
        } else if session.data_task.is_some() {
            // A listener or connector was pending but no transfer ran yet.
            session.clear_data_channel();
            Ok(Reply::new(ReplyCode::DataConnectionOpen, "ABOR command successful; data channel closed."))
        } else {
            Ok(Reply::new(ReplyCode::DataConnectionOpen, "No transfer to abort."))
        }
    }
}
