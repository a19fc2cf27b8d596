//! The RFC 959 Allocate (`ALLO`) command
//
// Storage is not preallocated on any modern filesystem, so this is a noop.

use crate::auth::Authorizer;
use crate::server::controlchan::error::ControlChanError;
use crate::server::controlchan::handler::{CommandContext, CommandHandler};
use crate::server::controlchan::{Reply, ReplyCode};

use async_trait::async_trait;

#[derive(Debug)]
pub struct Allo;

#[async_trait]
impl<A: Authorizer> CommandHandler<A> for Allo {
    async fn handle(&self, _args: CommandContext<A>) -> Result<Reply, ControlChanError> {
        Ok(Reply::new(ReplyCode::CommandOkayNotImplemented, "No storage allocation necessary."))
    }
}
