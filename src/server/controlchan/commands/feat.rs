//! The RFC 2389 Feature (`FEAT`) command
//
// Advertises the extensions this server implements beyond plain RFC 959, so
// clients don't have to probe for them.

use crate::auth::Authorizer;
use crate::server::controlchan::error::ControlChanError;
use crate::server::controlchan::handler::{CommandContext, CommandHandler};
use crate::server::controlchan::{Reply, ReplyCode};

use async_trait::async_trait;

#[derive(Debug)]
pub struct Feat;

#[async_trait]
impl<A: Authorizer> CommandHandler<A> for Feat {
    async fn handle(&self, args: CommandContext<A>) -> Result<Reply, ControlChanError> {
        let mlst_line = {
            let session = args.session.lock().await;
            session.mlst_facts.feat_line()
        };
        let mut lines = vec!["Features supported:".to_string()];
        let mut feature = |f: &str| lines.push(format!(" {f}"));
        if args.opts.ftps_config.is_enabled() {
            feature("AUTH TLS");
            feature("AUTH SSL");
        }
        feature("EPRT");
        feature("EPSV");
        feature("MDTM");
        feature("MFMT");
        feature("MLSD");
        feature(&mlst_line);
        if args.opts.ftps_config.is_enabled() {
            feature("PBSZ");
            feature("PROT");
        }
        feature("REST STREAM");
        feature("SIZE");
        feature("TVFS");
        feature("UTF8");
        lines.push("End FEAT.".to_string());
        Ok(Reply::new_multiline(ReplyCode::SystemStatus, lines))
    }
}
