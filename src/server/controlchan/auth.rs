//! The authentication gate in front of the command dispatch: while a session
//! is not logged in, only the commands marked as pre-authentication in the
//! command table are honored.

use crate::auth::Authorizer;
use crate::server::controlchan::commands::PROTO_CMDS;
use crate::server::session::Session;
use crate::server::{Command, Reply, ReplyCode};

// Returns the rejection for commands that need a login first, None when the
// command may proceed.
pub(crate) fn check_auth<A: Authorizer>(session: &Session<A>, command: &Command) -> Option<Reply> {
    if session.logged_in() {
        return None;
    }
    let needs_auth = PROTO_CMDS.get(command.verb()).map(|spec| spec.needs_auth).unwrap_or(true);
    if needs_auth {
        Some(Reply::new(ReplyCode::NotLoggedIn, "Log in with USER and PASS first."))
    } else {
        None
    }
}
