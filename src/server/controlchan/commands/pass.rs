//! The RFC 959 Password (`PASS`) command
//
// The argument field is a Telnet string specifying the user's password. This
// command must be immediately preceded by the user name command, and, for
// some sites, completes the user's identification for access control.

use crate::auth::Authorizer;
use crate::notification::event::PresenceEvent;
use crate::server::Password;
use crate::server::controlchan::error::{ControlChanError, ControlChanErrorKind};
use crate::server::controlchan::handler::{CommandContext, CommandHandler};
use crate::server::controlchan::{Reply, ReplyCode};
use crate::server::session::SessionState;
use crate::vfs::VirtualFs;

use async_trait::async_trait;
use slog::{info, warn};

#[derive(Debug)]
pub struct Pass {
    password: Password,
}

impl Pass {
    pub fn new(password: Password) -> Self {
        Pass { password }
    }
}

#[async_trait]
impl<A: Authorizer> CommandHandler<A> for Pass {
    async fn handle(&self, args: CommandContext<A>) -> Result<Reply, ControlChanError> {
        let mut session = args.session.lock().await;
        match session.state {
            SessionState::WaitPass => {}
            SessionState::WaitUser => return Ok(Reply::new(ReplyCode::BadCommandSequence, "Login with USER first.")),
            SessionState::Authenticated => return Ok(Reply::new(ReplyCode::BadCommandSequence, "User already authenticated.")),
        }
        let username = session.username.clone().ok_or(ControlChanErrorKind::IllegalState)?;
        let password = String::from_utf8_lossy(self.password.as_ref()).to_string();

        match args.authorizer.validate_authentication(&username, &password).await {
            Ok(()) => {
                let Some(home) = args.authorizer.home_dir(&username) else {
                    warn!(args.logger, "User {} has no home directory", username);
                    return Ok(Reply::new(ReplyCode::NotLoggedIn, "Authentication failed."));
                };
                let vfs = match VirtualFs::new(&home, args.opts.use_gmt_times) {
                    Ok(vfs) => vfs,
                    Err(err) => {
                        warn!(args.logger, "Home directory of {} is not usable: {:?}", username, err);
                        return Ok(Reply::new(ReplyCode::NotLoggedIn, "Authentication failed."));
                    }
                };
                session.vfs = Some(vfs);
                session.state = SessionState::Authenticated;
                session.failed_logins = 0;
                info!(args.logger, "User {} logged in", username);
                let meta = crate::server::controlchan::control_loop::event_meta(&mut session);
                args.opts.presence_listener.receive_presence_event(PresenceEvent::LoggedIn, meta).await;

                let mut lines: Vec<String> = Vec::new();
                if let Some(msg) = args.authorizer.msg_login(&username) {
                    lines.extend(msg.lines().map(str::to_string));
                }
                lines.push("Login successful.".to_string());
                Ok(Reply::new_multiline(ReplyCode::UserLoggedIn, lines))
            }
            Err(err) => {
                session.failed_logins += 1;
                info!(args.logger, "Failed login for {}: {}", username, err);
                let meta = crate::server::controlchan::control_loop::event_meta(&mut session);
                args.opts
                    .presence_listener
                    .receive_presence_event(PresenceEvent::LoginFailed { password }, meta)
                    .await;
                session.state = SessionState::WaitUser;
                session.username = None;

                // Once the attempt budget is used up the connection goes
                // down immediately, without the anti-brute-force delay.
                if session.failed_logins > args.opts.max_login_attempts {
                    session.closing = true;
                    return Ok(Reply::new(ReplyCode::ServiceNotAvailable, "Too many failed login attempts. Closing control connection."));
                }
                // Each failed attempt is answered only after a delay, to slow
                // down brute forcing.
                tokio::time::sleep(args.opts.auth_failed_delay).await;
                Ok(Reply::new(ReplyCode::NotLoggedIn, "Authentication failed."))
            }
        }
    }
}
