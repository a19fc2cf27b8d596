//! The RFC 2228/4217 Protection Buffer Size (`PBSZ`) command
//
// A formality on stream-oriented TLS: only 0 makes sense, and RFC 4217 says
// to answer any other value with PBSZ=0 as well. Must precede PROT and is
// only allowed on a secured control connection.

use crate::auth::Authorizer;
use crate::server::controlchan::error::ControlChanError;
use crate::server::controlchan::handler::{CommandContext, CommandHandler};
use crate::server::controlchan::{Reply, ReplyCode};

use async_trait::async_trait;

#[derive(Debug)]
pub struct Pbsz;

#[async_trait]
impl<A: Authorizer> CommandHandler<A> for Pbsz {
    async fn handle(&self, args: CommandContext<A>) -> Result<Reply, ControlChanError> {
        let mut session = args.session.lock().await;
        if !session.cmd_tls {
            return Ok(Reply::new(ReplyCode::BadCommandSequence, "PBSZ not allowed on insecure control connection."));
        }
        session.pbsz_seen = true;
        Ok(Reply::new(ReplyCode::CommandOkay, "PBSZ=0 successful."))
    }
}
