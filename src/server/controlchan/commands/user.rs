//! The RFC 959 User Name (`USER`) command
//
// The argument field is a Telnet string identifying the user. The user
// identification is that which is required by the server for access to its
// file system.

use crate::auth::Authorizer;
use crate::server::controlchan::error::ControlChanError;
use crate::server::controlchan::handler::{CommandContext, CommandHandler};
use crate::server::controlchan::{Reply, ReplyCode};
use crate::server::session::SessionState;

use async_trait::async_trait;

#[derive(Debug)]
pub struct User {
    username: String,
}

impl User {
    pub fn new(username: String) -> Self {
        User { username }
    }
}

#[async_trait]
impl<A: Authorizer> CommandHandler<A> for User {
    async fn handle(&self, args: CommandContext<A>) -> Result<Reply, ControlChanError> {
        let mut session = args.session.lock().await;
        if session.state == SessionState::Authenticated {
            // A fresh USER during a logged-in session starts the login over.
            session.flush_account();
        }
        session.username = Some(self.username.clone());
        session.state = SessionState::WaitPass;
        Ok(Reply::new(ReplyCode::NeedPassword, "Username ok, send password."))
    }
}
