//! The RFC 959 Change Working Directory (`CWD`) command

use crate::auth::{Authorizer, Perm};
use crate::server::controlchan::commands::{check_perm, fs_error_reply, no_such_file, resolve_path};
use crate::server::controlchan::error::ControlChanError;
use crate::server::controlchan::handler::{CommandContext, CommandHandler};
use crate::server::controlchan::{Reply, ReplyCode};

use async_trait::async_trait;

#[derive(Debug)]
pub struct Cwd {
    path: String,
}

impl Cwd {
    pub fn new(path: String) -> Self {
        Cwd { path }
    }
}

#[async_trait]
impl<A: Authorizer> CommandHandler<A> for Cwd {
    async fn handle(&self, args: CommandContext<A>) -> Result<Reply, ControlChanError> {
        let mut session = args.session.lock().await;
        let (host_path, ftp_path) = match resolve_path(&session, &self.path).await {
            Ok(resolved) => resolved,
            Err(reply) => return Ok(reply),
        };
        if let Err(reply) = check_perm(&session, Perm::CHANGE_DIR, &host_path) {
            return Ok(reply);
        }
        let Some(vfs) = session.vfs.as_mut() else {
            return Err(crate::server::ControlChanErrorKind::IllegalState.into());
        };
        match vfs.stat(&host_path).await {
            Ok(meta) if meta.is_dir() => {
                let arg = self.path.clone();
                vfs.set_cwd(&arg);
                Ok(Reply::new_with_string(ReplyCode::FileActionOkay, format!("\"{ftp_path}\" is the current directory.")))
            }
            Ok(_) => Ok(no_such_file(&ftp_path)),
            Err(err) => Ok(fs_error_reply(&err, &ftp_path)),
        }
    }
}
