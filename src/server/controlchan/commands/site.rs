//! The `SITE` command with its HELP and CHMOD sub-commands.

use crate::auth::{Authorizer, Perm};
use crate::server::controlchan::commands::{SiteParam, check_perm, fs_error_reply, resolve_path};
use crate::server::controlchan::error::{ControlChanError, ControlChanErrorKind};
use crate::server::controlchan::handler::{CommandContext, CommandHandler};
use crate::server::controlchan::{Reply, ReplyCode};

use async_trait::async_trait;

#[derive(Debug)]
pub struct Site {
    param: SiteParam,
}

impl Site {
    pub fn new(param: SiteParam) -> Self {
        Site { param }
    }
}

#[async_trait]
impl<A: Authorizer> CommandHandler<A> for Site {
    async fn handle(&self, args: CommandContext<A>) -> Result<Reply, ControlChanError> {
        match &self.param {
            SiteParam::Help { target } => match target.as_deref() {
                None => Ok(Reply::new_multiline(
                    ReplyCode::HelpMessage,
                    vec!["Recognized SITE commands:", " CHMOD", " HELP", "Help SITE command successful."],
                )),
                Some("CHMOD") => Ok(Reply::new(ReplyCode::HelpMessage, "Syntax: SITE CHMOD <SP> mode path (change file mode).")),
                Some("HELP") => Ok(Reply::new(ReplyCode::HelpMessage, "Syntax: SITE HELP [<SP> cmd] (show SITE command help).")),
                Some(other) => Ok(Reply::new_with_string(
                    ReplyCode::ParameterSyntaxError,
                    format!("Unrecognized SITE command \"{other}\"."),
                )),
            },
            SiteParam::Chmod { mode, path } => self.chmod(args, mode, path).await,
            SiteParam::Unknown { command } => Ok(Reply::new_with_string(
                ReplyCode::CommandSyntaxError,
                format!("SITE {command} is not understood."),
            )),
        }
    }
}

impl Site {
    #[cfg(unix)]
    async fn chmod<A: Authorizer>(&self, args: CommandContext<A>, mode: &str, path: &str) -> Result<Reply, ControlChanError> {
        let Ok(mode) = u32::from_str_radix(mode, 8) else {
            return Ok(Reply::new(ReplyCode::ParameterSyntaxError, "Invalid SITE CHMOD format."));
        };
        if mode > 0o7777 {
            return Ok(Reply::new(ReplyCode::ParameterSyntaxError, "Invalid SITE CHMOD format."));
        }
        let session = args.session.lock().await;
        let (host_path, ftp_path) = match resolve_path(&session, path).await {
            Ok(resolved) => resolved,
            Err(reply) => return Ok(reply),
        };
        if let Err(reply) = check_perm(&session, Perm::CHMOD, &host_path) {
            return Ok(reply);
        }
        let Some(vfs) = session.vfs.as_ref() else {
            return Err(ControlChanErrorKind::IllegalState.into());
        };
        match vfs.chmod(&host_path, mode).await {
            Ok(()) => Ok(Reply::new(ReplyCode::CommandOkay, "SITE CHMOD successful.")),
            Err(err) => Ok(fs_error_reply(&err, &ftp_path)),
        }
    }

    #[cfg(not(unix))]
    async fn chmod<A: Authorizer>(&self, _args: CommandContext<A>, _mode: &str, _path: &str) -> Result<Reply, ControlChanError> {
        Ok(Reply::new(ReplyCode::CommandNotImplemented, "SITE CHMOD not supported on this platform."))
    }
}
