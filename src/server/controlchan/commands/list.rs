//! The RFC 959 List (`LIST`) command
//
// Sends an `ls -l` style listing over the data connection. Options like
// `-la` that clients habitually send are accepted and ignored. Listing a
// single file yields that one line.

use crate::auth::{Authorizer, Perm};
use crate::server::chancomms::SendSource;
use crate::server::controlchan::commands::retr::dispatch_send;
use crate::server::controlchan::commands::{check_perm, fs_error_reply, preliminary_reply, resolve_path};
use crate::server::controlchan::error::{ControlChanError, ControlChanErrorKind};
use crate::server::controlchan::Reply;
use crate::server::controlchan::handler::{CommandContext, CommandHandler};
use crate::server::session::TransferType;
use crate::vfs::listing::{NodeInfo, fixed_lines_reader, unix_listing_reader};

use async_trait::async_trait;

#[derive(Debug)]
pub struct List {
    path: Option<String>,
}

impl List {
    pub fn new(path: Option<String>) -> Self {
        List { path }
    }
}

#[async_trait]
impl<A: Authorizer> CommandHandler<A> for List {
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
        let use_gmt = vfs.use_gmt_times();
        let meta = match vfs.stat(&host_path).await {
            Ok(meta) => meta,
            Err(err) => return Ok(fs_error_reply(&err, &ftp_path)),
        };
        let reader = if meta.is_dir() {
            match vfs.listdir(&host_path).await {
                Ok(dir) => unix_listing_reader(dir, use_gmt),
                Err(err) => return Ok(fs_error_reply(&err, &ftp_path)),
            }
        } else {
            match NodeInfo::from_path(&host_path, use_gmt).await {
                Ok(info) => fixed_lines_reader(vec![info.to_string()]),
                Err(err) => return Ok(fs_error_reply(&err.into(), &ftp_path)),
            }
        };
        // The listing lines already carry CRLF, so they go out as Image.
        if let Err(reply) = dispatch_send(&mut session, SendSource::Reader(reader), None, TransferType::Image).await {
            return Ok(reply);
        }
        Ok(preliminary_reply(&session))
    }
}
