//! Enforcement of the `tls_control_required` / `tls_data_required` policies:
//! login is refused on a plaintext control channel, and data connections are
//! refused while the data channel protection level is not Private.

use crate::auth::Authorizer;
use crate::server::session::Session;
use crate::server::{Command, Reply, ReplyCode};

// Gate applied before dispatch; None lets the command through.
pub(crate) fn check_ftps_requirement<A: Authorizer>(
    session: &Session<A>,
    command: &Command,
    control_required: bool,
    data_required: bool,
) -> Option<Reply> {
    let is_login = matches!(command, Command::User { .. } | Command::Pass { .. });
    if control_required && !session.cmd_tls && is_login {
        return Some(Reply::new(ReplyCode::FileError, "SSL/TLS required on the control channel."));
    }
    let opens_data_conn = matches!(
        command,
        Command::Pasv | Command::Port { .. } | Command::Epsv { .. } | Command::Eprt { .. }
    );
    if data_required && !session.prot_private && opens_data_conn {
        return Some(Reply::new(ReplyCode::FileError, "SSL/TLS required on the data channel."));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::UserRegistry;
    use crate::server::session::Session as RawSession;
    use std::sync::Arc;

    fn session() -> RawSession<UserRegistry> {
        RawSession::new(Arc::new(UserRegistry::new()))
    }

    #[test]
    fn control_requirement_blocks_login_commands_only() {
        let session = session();
        let user = Command::User { username: "u".into() };
        let reply = check_ftps_requirement(&session, &user, true, false);
        assert!(reply.is_some());
        let noop = Command::Noop;
        assert!(check_ftps_requirement(&session, &noop, true, false).is_none());
    }

    #[test]
    fn data_requirement_blocks_until_prot_private() {
        let mut session = session();
        assert!(check_ftps_requirement(&session, &Command::Pasv, false, true).is_some());
        session.prot_private = true;
        assert!(check_ftps_requirement(&session, &Command::Pasv, false, true).is_none());
    }

    #[test]
    fn secured_control_lets_login_through() {
        let mut session = session();
        session.cmd_tls = true;
        let user = Command::User { username: "u".into() };
        assert!(check_ftps_requirement(&session, &user, true, false).is_none());
    }
}
