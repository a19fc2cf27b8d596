//! The RFC 959 Name List (`NLST`) command
//
// Sends bare file names, one per line, over the data connection.

use crate::auth::{Authorizer, Perm};
use crate::server::chancomms::SendSource;
use crate::server::controlchan::Reply;
use crate::server::controlchan::commands::retr::dispatch_send;
use crate::server::controlchan::commands::{check_perm, fs_error_reply, preliminary_reply, resolve_path};
use crate::server::controlchan::error::{ControlChanError, ControlChanErrorKind};
use crate::server::controlchan::handler::{CommandContext, CommandHandler};
use crate::server::session::TransferType;
use crate::vfs::listing::{fixed_lines_reader, names_only_reader};

use async_trait::async_trait;

#[derive(Debug)]
pub struct Nlst {
    path: Option<String>,
}

impl Nlst {
    pub fn new(path: Option<String>) -> Self {
        Nlst { path }
    }
}

#[async_trait]
impl<A: Authorizer> CommandHandler<A> for Nlst {
    async fn handle(&self, args: CommandContext<A>) -> Result<Reply, ControlChanError> {
        let mut session = args.session.lock().await;
        let arg = self.path.clone().unwrap_or_default();
        let (host_path, ftp_path) = match resolve_path(&session, &arg).await {
            Ok(resolved) => resolved,
            Err(reply) => return Ok(reply),
        };
        if let Err(reply) = check_perm(&session, Perm::LIST, &host_path) {
            return Ok(reply);
        }
        let Some(vfs) = session.vfs.as_ref() else {
            return Err(ControlChanErrorKind::IllegalState.into());
        };
        let meta = match vfs.stat(&host_path).await {
            Ok(meta) => meta,
            Err(err) => return Ok(fs_error_reply(&err, &ftp_path)),
        };
        let reader = if meta.is_dir() {
            match vfs.listdir(&host_path).await {
                Ok(dir) => names_only_reader(dir),
                Err(err) => return Ok(fs_error_reply(&err, &ftp_path)),
            }
        } else {
            let name = host_path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            fixed_lines_reader(vec![name])
        };
        if let Err(reply) = dispatch_send(&mut session, SendSource::Reader(reader), None, TransferType::Image).await {
            return Ok(reply);
        }
        Ok(preliminary_reply(&session))
    }
}
