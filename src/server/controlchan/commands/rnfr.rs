//! The RFC 959 Rename From (`RNFR`) command
//
// Remembers the rename source; any command other than RNTO forgets it again.

use crate::auth::{Authorizer, Perm};
use crate::server::controlchan::commands::{check_perm, no_such_file, resolve_path};
use crate::server::controlchan::error::{ControlChanError, ControlChanErrorKind};
use crate::server::controlchan::handler::{CommandContext, CommandHandler};
use crate::server::controlchan::{Reply, ReplyCode};

use async_trait::async_trait;

#[derive(Debug)]
pub struct Rnfr {
    path: String,
}

impl Rnfr {
    pub fn new(path: String) -> Self {
        Rnfr { path }
    }
}

#[async_trait]
impl<A: Authorizer> CommandHandler<A> for Rnfr {
    async fn handle(&self, args: CommandContext<A>) -> Result<Reply, ControlChanError> {
        let mut session = args.session.lock().await;
        let (host_path, ftp_path) = match resolve_path(&session, &self.path).await {
            Ok(resolved) => resolved,
            Err(reply) => return Ok(reply),
        };
        if let Err(reply) = check_perm(&session, Perm::RENAME, &host_path) {
            return Ok(reply);
        }
        let Some(vfs) = session.vfs.as_ref() else {
            return Err(ControlChanErrorKind::IllegalState.into());
        };
        // The source must exist now, so the failure surfaces here and not at
        // RNTO time.
        if vfs.lstat(&host_path).await.is_err() {
            return Ok(no_such_file(&ftp_path));
        }
        session.rename_from = Some(host_path);
        Ok(Reply::new(ReplyCode::FileActionPending, "Ready for destination name."))
    }
}
