//! The RFC 959 Representation Type (`TYPE`) command
//
// Switches between ASCII (line endings are translated to CRLF on the wire)
// and Image (verbatim bytes) representation for subsequent transfers.

use crate::auth::Authorizer;
use crate::server::controlchan::commands::TypeParam;
use crate::server::controlchan::error::ControlChanError;
use crate::server::controlchan::handler::{CommandContext, CommandHandler};
use crate::server::controlchan::{Reply, ReplyCode};
use crate::server::session::TransferType;

use async_trait::async_trait;

#[derive(Debug)]
pub struct Type {
    transfer_type: TypeParam,
}

impl Type {
    pub fn new(transfer_type: TypeParam) -> Self {
        Type { transfer_type }
    }
}

#[async_trait]
impl<A: Authorizer> CommandHandler<A> for Type {
    async fn handle(&self, args: CommandContext<A>) -> Result<Reply, ControlChanError> {
        let mut session = args.session.lock().await;
        match self.transfer_type {
            TypeParam::Ascii => {
                session.transfer_type = TransferType::Ascii;
                Ok(Reply::new(ReplyCode::CommandOkay, "Type set to: ASCII."))
            }
            TypeParam::Image => {
                session.transfer_type = TransferType::Image;
                Ok(Reply::new(ReplyCode::CommandOkay, "Type set to: Binary."))
            }
        }
    }
}
