//! The RFC 2428 Extended Passive Mode (`EPSV`) command
//
// Like PASV but with a reply format that works for any address family. The
// special argument `ALL` commits the session to extended passive mode: from
// then on PASV, PORT and EPRT are refused.

use crate::auth::Authorizer;
use crate::server::controlchan::commands::pasv::establish_passive;
use crate::server::controlchan::error::ControlChanError;
use crate::server::controlchan::handler::{CommandContext, CommandHandler};
use crate::server::controlchan::{Reply, ReplyCode};

use async_trait::async_trait;

#[derive(Debug)]
pub struct Epsv {
    arg: Option<String>,
}

impl Epsv {
    pub fn new(arg: Option<String>) -> Self {
        Epsv { arg }
    }
}

#[async_trait]
impl<A: Authorizer> CommandHandler<A> for Epsv {
    async fn handle(&self, args: CommandContext<A>) -> Result<Reply, ControlChanError> {
        match self.arg.as_deref() {
            None | Some("1") | Some("2") => {}
            Some("ALL") => {
                let mut session = args.session.lock().await;
                session.epsv_all = true;
                return Ok(Reply::new(ReplyCode::CommandOkay, "EPSV ALL command successful."));
            }
            Some(_) => {
                return Ok(Reply::new(ReplyCode::ParameterSyntaxError, "Unknown network protocol."));
            }
        }
        let port = match establish_passive(&args).await {
            Ok(port) => port,
            Err(reply) => return Ok(reply),
        };
        Ok(Reply::new_with_string(
            ReplyCode::EnteringExtendedPassiveMode,
            format!("Entering extended passive mode (|||{port}|)."),
        ))
    }
}
