//! The RFC 959 System (`SYST`) command
//
// Used to find out the type of operating system at the server. We always
// answer UNIX, because that is the listing format we emit; clients use this
// reply to decide how to parse LIST output.

use crate::auth::Authorizer;
use crate::server::controlchan::error::ControlChanError;
use crate::server::controlchan::handler::{CommandContext, CommandHandler};
use crate::server::controlchan::{Reply, ReplyCode};

use async_trait::async_trait;

#[derive(Debug)]
pub struct Syst;

#[async_trait]
impl<A: Authorizer> CommandHandler<A> for Syst {
    async fn handle(&self, _args: CommandContext<A>) -> Result<Reply, ControlChanError> {
        Ok(Reply::new(ReplyCode::SystemType, "UNIX Type: L8"))
    }
}
