//! The RFC 959 Logout (`QUIT`) command
//
// This command terminates a USER and, if file transfer is not in progress,
// the server closes the control connection. If file transfer is in progress,
// the connection will remain open for result response and the server will
// then close it.

use crate::auth::Authorizer;
use crate::server::controlchan::error::ControlChanError;
use crate::server::controlchan::handler::{CommandContext, CommandHandler};
use crate::server::controlchan::{Reply, ReplyCode};

use async_trait::async_trait;

#[derive(Debug)]
pub struct Quit;

#[async_trait]
impl<A: Authorizer> CommandHandler<A> for Quit {
    async fn handle(&self, args: CommandContext<A>) -> Result<Reply, ControlChanError> {
        let mut session = args.session.lock().await;
        session.closing = true;
        let goodbye = session
            .username
            .as_deref()
            .and_then(|u| args.authorizer.msg_quit(u))
            .unwrap_or_else(|| "Goodbye.".to_string());
        Ok(Reply::new_with_string(ReplyCode::ClosingControlConnection, goodbye))
    }
}
