//! The RFC 959 Status (`STAT`) command
//
// Without an argument: a status report on this session. With a path: a
// directory listing returned over the control channel, which some clients
// use to avoid opening a data connection.

use crate::auth::{Authorizer, Perm};
use crate::server::controlchan::commands::{check_perm, fs_error_reply, resolve_path};
use crate::server::controlchan::error::{ControlChanError, ControlChanErrorKind};
use crate::server::controlchan::handler::{CommandContext, CommandHandler};
use crate::server::controlchan::{Reply, ReplyCode};
use crate::server::session::TransferType;
use crate::vfs::listing::NodeInfo;

use async_trait::async_trait;

#[derive(Debug)]
pub struct Stat {
    path: Option<String>,
}

impl Stat {
    pub fn new(path: Option<String>) -> Self {
        Stat { path }
    }
}

#[async_trait]
impl<A: Authorizer> CommandHandler<A> for Stat {
    async fn handle(&self, args: CommandContext<A>) -> Result<Reply, ControlChanError> {
        let session = args.session.lock().await;
        let Some(path) = &self.path else {
            let transfer_type = match session.transfer_type {
                TransferType::Ascii => "ASCII",
                TransferType::Image => "Binary",
            };
            let lines = vec![
                "FTP server status:".to_string(),
                format!(" Connected to: {}", args.local_addr),
                format!(" Client address: {}", args.peer_addr),
                format!(" Logged in as: {}", session.username.as_deref().unwrap_or("-")),
                format!(" TYPE: {transfer_type}; STRUcture: File; MODE: Stream"),
                "End of status.".to_string(),
            ];
            return Ok(Reply::new_multiline(ReplyCode::SystemStatus, lines));
        };

        let (host_path, ftp_path) = match resolve_path(&session, path).await {
            Ok(resolved) => resolved,
            Err(reply) => return Ok(reply),
        };
        if let Err(reply) = check_perm(&session, Perm::LIST, &host_path) {
            return Ok(reply);
        }
        let Some(vfs) = session.vfs.as_ref() else {
            return Err(ControlChanErrorKind::IllegalState.into());
        };

        let mut lines = vec![format!("Status of \"{ftp_path}\":")];
        let meta = match vfs.stat(&host_path).await {
            Ok(meta) => meta,
            Err(err) => return Ok(fs_error_reply(&err, &ftp_path)),
        };
        if meta.is_dir() {
            let mut dir = match vfs.listdir(&host_path).await {
                Ok(dir) => dir,
                Err(err) => return Ok(fs_error_reply(&err, &ftp_path)),
            };
            while let Ok(Some(entry)) = dir.next_entry().await {
                if let Ok(info) = NodeInfo::from_dir_entry(&entry, vfs.use_gmt_times()).await {
                    lines.push(info.to_string());
                }
            }
        } else {
            match NodeInfo::from_path(&host_path, vfs.use_gmt_times()).await {
                Ok(info) => lines.push(info.to_string()),
                Err(err) => return Ok(fs_error_reply(&err.into(), &ftp_path)),
            }
        }
        lines.push("End of status.".to_string());
        Ok(Reply::new_multiline(ReplyCode::FileStatus, lines))
    }
}
