//! The RFC 959 Passive (`PASV`) command
//
// This command requests the server-DTP to "listen" on a data port and to
// wait for a connection rather than initiate one upon receipt of a transfer
// command. The response includes the host and port the server is listening
// on.

use crate::auth::Authorizer;
use crate::server::controlchan::error::ControlChanError;
use crate::server::controlchan::handler::{CommandContext, CommandHandler};
use crate::server::controlchan::{Reply, ReplyCode};
use crate::server::dispatcher;
use crate::server::controlchan::commands::data_chan_ctx;
use crate::options::PassiveHost;

use async_trait::async_trait;
use std::net::IpAddr;

#[derive(Debug)]
pub struct Pasv;

// Binds the listener, arms the accept task and installs the new data channel
// in the session. Shared between PASV and EPSV. Returns the bound port.
pub(crate) async fn establish_passive<A: Authorizer>(args: &CommandContext<A>) -> Result<u16, Reply> {
    let mut session = args.session.lock().await;
    let local_ip = args.local_addr.ip();
    let listener = dispatcher::bind_passive(local_ip, args.opts.passive_ports.as_ref(), &args.logger)
        .await
        .map_err(|_| Reply::new(ReplyCode::CantOpenDataConnection, "Can't open data connection."))?;
    let port = listener
        .local_addr()
        .map_err(|_| Reply::new(ReplyCode::CantOpenDataConnection, "Can't open data connection."))?
        .port();
    // A second PASV/PORT silently replaces any earlier listener or connector.
    session.clear_data_channel();
    let spawned = dispatcher::spawn_passive(data_chan_ctx(args), listener, session.data_connected.clone(), session.data_bytes.clone());
    session.set_data_channel(spawned);
    Ok(port)
}

#[async_trait]
impl<A: Authorizer> CommandHandler<A> for Pasv {
    async fn handle(&self, args: CommandContext<A>) -> Result<Reply, ControlChanError> {
        {
            let session = args.session.lock().await;
            if session.epsv_all {
                return Ok(Reply::new(ReplyCode::ParameterSyntaxError, "PASV not allowed after EPSV ALL."));
            }
        }
        // The 227 reply can only carry an IPv4 address: the masquerade
        // address if one is configured, the control connection's interface
        // otherwise.
        let advertised = match &args.opts.passive_host {
            PassiveHost::Ip(ip) => IpAddr::V4(*ip),
            PassiveHost::FromConnection => args.local_addr.ip().to_canonical(),
        };
        let IpAddr::V4(ip) = advertised else {
            return Ok(Reply::new(ReplyCode::ParameterSyntaxError, "PASV not available on IPv6 connections (use EPSV)."));
        };
        let port = match establish_passive(&args).await {
            Ok(port) => port,
            Err(reply) => return Ok(reply),
        };
        let octets = ip.octets();
        Ok(Reply::new_with_string(
            ReplyCode::EnteringPassiveMode,
            format!(
                "Entering passive mode ({},{},{},{},{},{}).",
                octets[0],
                octets[1],
                octets[2],
                octets[3],
                port / 256,
                port % 256
            ),
        ))
    }
}
