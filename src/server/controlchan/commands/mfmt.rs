//! The Modify Fact (`MFMT`) command
//
// Sets the modification time of a file to a client-supplied YYYYMMDDHHMMSS
// timestamp, interpreted as UTC.

use crate::auth::{Authorizer, Perm};
use crate::server::controlchan::commands::{check_perm, fs_error_reply, no_such_file, resolve_path};
use crate::server::controlchan::error::{ControlChanError, ControlChanErrorKind};
use crate::server::controlchan::handler::{CommandContext, CommandHandler};
use crate::server::controlchan::{Reply, ReplyCode};

use async_trait::async_trait;
use chrono::{NaiveDateTime, TimeZone, Utc};
use std::time::SystemTime;

#[derive(Debug)]
pub struct Mfmt {
    timeval: String,
    path: String,
}

impl Mfmt {
    pub fn new(timeval: String, path: String) -> Self {
        Mfmt { timeval, path }
    }
}

#[async_trait]
impl<A: Authorizer> CommandHandler<A> for Mfmt {
    async fn handle(&self, args: CommandContext<A>) -> Result<Reply, ControlChanError> {
        let Ok(naive) = NaiveDateTime::parse_from_str(&self.timeval, "%Y%m%d%H%M%S") else {
            return Ok(Reply::new(ReplyCode::ParameterSyntaxError, "Invalid time format."));
        };
        let Some(mtime) = Utc.from_local_datetime(&naive).single() else {
            return Ok(Reply::new(ReplyCode::ParameterSyntaxError, "Invalid time format."));
        };
        let session = args.session.lock().await;
        let (host_path, ftp_path) = match resolve_path(&session, &self.path).await {
            Ok(resolved) => resolved,
            Err(reply) => return Ok(reply),
        };
        if let Err(reply) = check_perm(&session, Perm::MFMT, &host_path) {
            return Ok(reply);
        }
        let Some(vfs) = session.vfs.as_ref() else {
            return Err(ControlChanErrorKind::IllegalState.into());
        };
        // MFMT applies to regular files only.
        match vfs.stat(&host_path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Ok(no_such_file(&ftp_path)),
            Err(err) => return Ok(fs_error_reply(&err, &ftp_path)),
        }
        match vfs.set_mtime(&host_path, SystemTime::from(mtime)).await {
            Ok(()) => Ok(Reply::new_with_string(
                ReplyCode::FileStatus,
                format!("Modify={}; {}.", self.timeval, ftp_path),
            )),
            Err(err) => Ok(fs_error_reply(&err, &ftp_path)),
        }
    }
}
