//! The RFC 2228/4217 Data Channel Protection Level (`PROT`) command
//
// `PROT P` makes the next data connection TLS-wrapped, `PROT C` switches
// back to plaintext data. The Safe and Confidential levels do not exist in
// TLS land.

use crate::auth::Authorizer;
use crate::server::controlchan::commands::ProtParam;
use crate::server::controlchan::error::ControlChanError;
use crate::server::controlchan::handler::{CommandContext, CommandHandler};
use crate::server::controlchan::{Reply, ReplyCode};

use async_trait::async_trait;

#[derive(Debug)]
pub struct Prot {
    param: ProtParam,
}

impl Prot {
    pub fn new(param: ProtParam) -> Self {
        Prot { param }
    }
}

#[async_trait]
impl<A: Authorizer> CommandHandler<A> for Prot {
    async fn handle(&self, args: CommandContext<A>) -> Result<Reply, ControlChanError> {
        let mut session = args.session.lock().await;
        if !session.cmd_tls {
            return Ok(Reply::new(ReplyCode::BadCommandSequence, "PROT not allowed on insecure control connection."));
        }
        if !session.pbsz_seen {
            return Ok(Reply::new(ReplyCode::BadCommandSequence, "PBSZ=0 must be issued first."));
        }
        match self.param {
            ProtParam::Clear => {
                session.prot_private = false;
                Ok(Reply::new(ReplyCode::CommandOkay, "Protection set to Clear"))
            }
            ProtParam::Private => {
                session.prot_private = true;
                Ok(Reply::new(ReplyCode::CommandOkay, "Protection set to Private"))
            }
            ProtParam::Safe => Ok(Reply::new(ReplyCode::UnsupportedProtLevel, "PROT S unsupported (use C or P).")),
            ProtParam::Confidential => Ok(Reply::new(ReplyCode::UnsupportedProtLevel, "PROT E unsupported (use C or P).")),
        }
    }
}
