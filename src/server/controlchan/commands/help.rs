//! The RFC 959 Help (`HELP`) command
//
// Without an argument the full list of recognized verbs is returned; with
// one, the syntax line of that verb.

use crate::auth::Authorizer;
use crate::server::controlchan::commands::PROTO_CMDS;
use crate::server::controlchan::error::ControlChanError;
use crate::server::controlchan::handler::{CommandContext, CommandHandler};
use crate::server::controlchan::{Reply, ReplyCode};

use async_trait::async_trait;

#[derive(Debug)]
pub struct Help {
    target: Option<String>,
}

impl Help {
    pub fn new(target: Option<String>) -> Self {
        Help { target }
    }
}

#[async_trait]
impl<A: Authorizer> CommandHandler<A> for Help {
    async fn handle(&self, _args: CommandContext<A>) -> Result<Reply, ControlChanError> {
        match &self.target {
            Some(verb) => match PROTO_CMDS.get(verb.as_str()) {
                Some(spec) => Ok(Reply::new(ReplyCode::HelpMessage, spec.help)),
                None => Ok(Reply::new_with_string(
                    ReplyCode::ParameterSyntaxError,
                    format!("Unrecognized command \"{verb}\"."),
                )),
            },
            None => {
                let mut lines = vec!["Recognized commands:".to_string()];
                // Eight verbs per row keeps the reply narrow enough for
                // ancient clients.
                let verbs: Vec<&str> = PROTO_CMDS.keys().copied().collect();
                for row in verbs.chunks(8) {
                    lines.push(format!(" {}", row.join(" ")));
                }
                lines.push("Help command successful.".to_string());
                Ok(Reply::new_multiline(ReplyCode::HelpMessage, lines))
            }
        }
    }
}
