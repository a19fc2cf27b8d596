//! The RFC 4217 Authentication/Security Mechanism (`AUTH`) command
//
// Upgrades the plaintext control connection to TLS. The reply goes out in
// plaintext; the handshake follows immediately after, driven by the control
// loop.

use crate::auth::Authorizer;
use crate::server::controlchan::commands::AuthParam;
use crate::server::controlchan::error::ControlChanError;
use crate::server::controlchan::handler::{CommandContext, CommandHandler};
use crate::server::controlchan::{Reply, ReplyCode};

use async_trait::async_trait;

#[derive(Debug)]
pub struct Auth {
    protocol: AuthParam,
}

impl Auth {
    pub fn new(protocol: AuthParam) -> Self {
        Auth { protocol }
    }
}

#[async_trait]
impl<A: Authorizer> CommandHandler<A> for Auth {
    async fn handle(&self, args: CommandContext<A>) -> Result<Reply, ControlChanError> {
        if !args.opts.ftps_config.is_enabled() {
            return Ok(Reply::new(ReplyCode::CommandNotImplemented, "TLS/SSL support not available."));
        }
        let mut session = args.session.lock().await;
        if session.cmd_tls {
            return Ok(Reply::new(ReplyCode::BadCommandSequence, "Already using TLS."));
        }
        session.upgrade_tls_requested = true;
        let mechanism = match self.protocol {
            AuthParam::Tls => "TLS",
            AuthParam::Ssl => "SSL",
        };
        Ok(Reply::new_with_string(ReplyCode::AuthOkayNoDataNeeded, format!("AUTH {mechanism} successful.")))
    }
}
