//! The RFC 959 Reinitialize (`REIN`) command
//
// This command flushes a USER, without affecting the control connection:
// transfer parameters and account information are reset and the session is
// back at the point where USER is expected.

use crate::auth::Authorizer;
use crate::notification::event::PresenceEvent;
use crate::server::controlchan::control_loop::event_meta;
use crate::server::controlchan::error::ControlChanError;
use crate::server::controlchan::handler::{CommandContext, CommandHandler};
use crate::server::controlchan::{Reply, ReplyCode};

use async_trait::async_trait;

#[derive(Debug)]
pub struct Rein;

#[async_trait]
impl<A: Authorizer> CommandHandler<A> for Rein {
    async fn handle(&self, args: CommandContext<A>) -> Result<Reply, ControlChanError> {
        let mut session = args.session.lock().await;
        if session.logged_in() {
            let meta = event_meta(&mut session);
            args.opts.presence_listener.receive_presence_event(PresenceEvent::LoggedOut, meta).await;
        }
        session.flush_account();
        Ok(Reply::new(ReplyCode::UserLoggedIn, "Ready for new user."))
    }
}
