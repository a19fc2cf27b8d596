//! The RFC 959 No Operation (`NOOP`) command
//
// This command does not affect any parameters or previously entered
// commands. It specifies no action other than that the server send an OK
// reply.

use crate::auth::Authorizer;
use crate::server::controlchan::error::ControlChanError;
use crate::server::controlchan::handler::{CommandContext, CommandHandler};
use crate::server::controlchan::{Reply, ReplyCode};

use async_trait::async_trait;

#[derive(Debug)]
pub struct Noop;

#[async_trait]
impl<A: Authorizer> CommandHandler<A> for Noop {
    async fn handle(&self, _args: CommandContext<A>) -> Result<Reply, ControlChanError> {
        Ok(Reply::new(ReplyCode::CommandOkay, "NOOP command successful."))
    }
}
