//! The RFC 2389 Options (`OPTS`) command
//
// Sets options on other commands: UTF8 path handling on or off, and the
// fact selection for MLST/MLSD.

use crate::auth::Authorizer;
use crate::server::controlchan::commands::Opt;
use crate::server::controlchan::error::ControlChanError;
use crate::server::controlchan::handler::{CommandContext, CommandHandler};
use crate::server::controlchan::{Reply, ReplyCode};
use crate::vfs::mlsx::Facts;

use async_trait::async_trait;

#[derive(Debug)]
pub struct Opts {
    option: Opt,
}

impl Opts {
    pub fn new(option: Opt) -> Self {
        Opts { option }
    }
}

#[async_trait]
impl<A: Authorizer> CommandHandler<A> for Opts {
    async fn handle(&self, args: CommandContext<A>) -> Result<Reply, ControlChanError> {
        let mut session = args.session.lock().await;
        match &self.option {
            Opt::Utf8 { on } => {
                session.utf8_on = *on;
                if *on {
                    Ok(Reply::new(ReplyCode::CommandOkay, "UTF8 mode enabled."))
                } else {
                    Ok(Reply::new(ReplyCode::CommandOkay, "UTF8 mode disabled."))
                }
            }
            Opt::MlstFacts { facts } => {
                session.mlst_facts = Facts::from_opts(facts);
                Ok(Reply::new_with_string(ReplyCode::CommandOkay, session.mlst_facts.opts_line()))
            }
        }
    }
}
