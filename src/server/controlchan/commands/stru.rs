//! The RFC 959 File Structure (`STRU`) command
//
// Only the File structure ever saw real use; Record and Page are refused.

use crate::auth::Authorizer;
use crate::server::controlchan::commands::StruParam;
use crate::server::controlchan::error::ControlChanError;
use crate::server::controlchan::handler::{CommandContext, CommandHandler};
use crate::server::controlchan::{Reply, ReplyCode};

use async_trait::async_trait;

#[derive(Debug)]
pub struct Stru {
    structure: StruParam,
}

impl Stru {
    pub fn new(structure: StruParam) -> Self {
        Stru { structure }
    }
}

#[async_trait]
impl<A: Authorizer> CommandHandler<A> for Stru {
    async fn handle(&self, _args: CommandContext<A>) -> Result<Reply, ControlChanError> {
        match self.structure {
            StruParam::File => Ok(Reply::new(ReplyCode::CommandOkay, "File transfer structure set to: F.")),
            _ => Ok(Reply::new(ReplyCode::CommandNotImplementedForParameter, "Unimplemented STRU type.")),
        }
    }
}
