//! The RFC 959 Transfer Mode (`MODE`) command
//
// Only Stream mode is supported; Block and Compressed are museum pieces.

use crate::auth::Authorizer;
use crate::server::controlchan::commands::ModeParam;
use crate::server::controlchan::error::ControlChanError;
use crate::server::controlchan::handler::{CommandContext, CommandHandler};
use crate::server::controlchan::{Reply, ReplyCode};

use async_trait::async_trait;

#[derive(Debug)]
pub struct Mode {
    mode: ModeParam,
}

impl Mode {
    pub fn new(mode: ModeParam) -> Self {
        Mode { mode }
    }
}

#[async_trait]
impl<A: Authorizer> CommandHandler<A> for Mode {
    async fn handle(&self, _args: CommandContext<A>) -> Result<Reply, ControlChanError> {
        match self.mode {
            ModeParam::Stream => Ok(Reply::new(ReplyCode::CommandOkay, "Transfer mode set to: S.")),
            _ => Ok(Reply::new(ReplyCode::CommandNotImplementedForParameter, "Unimplemented MODE type.")),
        }
    }
}
