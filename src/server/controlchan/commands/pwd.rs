//! The RFC 959 Print Working Directory (`PWD`) command
//
// Returns the FTP-visible working directory, never the host path.

use crate::auth::Authorizer;
use crate::server::controlchan::error::{ControlChanError, ControlChanErrorKind};
use crate::server::controlchan::handler::{CommandContext, CommandHandler};
use crate::server::controlchan::{Reply, ReplyCode};

use async_trait::async_trait;

#[derive(Debug)]
pub struct Pwd;

#[async_trait]
impl<A: Authorizer> CommandHandler<A> for Pwd {
    async fn handle(&self, args: CommandContext<A>) -> Result<Reply, ControlChanError> {
        let session = args.session.lock().await;
        let vfs = session.vfs.as_ref().ok_or(ControlChanErrorKind::IllegalState)?;
        // Embedded quotes are doubled, as RFC 959 appendix II prescribes.
        let cwd = vfs.cwd().display().to_string().replace('"', "\"\"");
        Ok(Reply::new_with_string(ReplyCode::DirCreated, format!("\"{cwd}\" is the current directory.")))
    }
}
