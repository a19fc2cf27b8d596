//! The RFC 3659 Restart (`REST`) command
//
// Sets the byte offset the next RETR/STOR/APPE should resume from. The
// offset is forgotten again if the next command is not a transfer.

use crate::auth::Authorizer;
use crate::server::controlchan::error::ControlChanError;
use crate::server::controlchan::handler::{CommandContext, CommandHandler};
use crate::server::controlchan::{Reply, ReplyCode};
use crate::server::session::TransferType;

use async_trait::async_trait;

#[derive(Debug)]
pub struct Rest {
    offset: u64,
}

impl Rest {
    pub fn new(offset: u64) -> Self {
        Rest { offset }
    }
}

#[async_trait]
impl<A: Authorizer> CommandHandler<A> for Rest {
    async fn handle(&self, args: CommandContext<A>) -> Result<Reply, ControlChanError> {
        let mut session = args.session.lock().await;
        if session.transfer_type == TransferType::Ascii {
            // With line-ending translation in play a byte offset is
            // meaningless.
            return Ok(Reply::new(ReplyCode::ParameterSyntaxError, "Resuming transfers not allowed in ASCII mode."));
        }
        session.start_pos = self.offset;
        Ok(Reply::new_with_string(
            ReplyCode::FileActionPending,
            format!("Restarting at {}. Now use RETR/STOR for resuming.", self.offset),
        ))
    }
}
