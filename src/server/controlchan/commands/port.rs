//! The RFC 959 Data Port (`PORT`) command
//
// The client tells us the h1,h2,h3,h4,p1,p2 endpoint it is listening on and
// we connect out to it. The endpoint is policed before any connect happens:
// foreign addresses and privileged ports are refused unless explicitly
// permitted.

use crate::auth::Authorizer;
use crate::server::controlchan::commands::data_chan_ctx;
use crate::server::controlchan::error::ControlChanError;
use crate::server::controlchan::handler::{CommandContext, CommandHandler};
use crate::server::controlchan::{Reply, ReplyCode};
use crate::server::dispatcher;

use async_trait::async_trait;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

#[derive(Debug)]
pub struct Port {
    addr: String,
}

impl Port {
    pub fn new(addr: String) -> Self {
        Port { addr }
    }
}

// Parses the h1,h2,h3,h4,p1,p2 form.
fn parse_port_argument(arg: &str) -> Option<SocketAddr> {
    let fields: Vec<u8> = arg.split(',').map(|f| f.trim().parse::<u8>().ok()).collect::<Option<Vec<u8>>>()?;
    let [h1, h2, h3, h4, p1, p2] = fields.as_slice() else {
        return None;
    };
    let ip = Ipv4Addr::new(*h1, *h2, *h3, *h4);
    let port = u16::from(*p1) * 256 + u16::from(*p2);
    Some(SocketAddr::new(IpAddr::V4(ip), port))
}

// Policing and connect kick-off shared between PORT and EPRT. Returns the
// immediate reply; the 200 for a successful connect arrives later through
// the control message channel.
pub(crate) async fn establish_active<A: Authorizer>(args: &CommandContext<A>, remote: SocketAddr) -> Reply {
    let mut session = args.session.lock().await;
    if session.epsv_all {
        return Reply::new(ReplyCode::ParameterSyntaxError, "PORT not allowed after EPSV ALL.");
    }
    // The foreign-address verdict wins over the privileged-port one when an
    // endpoint trips both.
    let foreign = remote.ip().to_canonical() != args.peer_addr.ip().to_canonical();
    if foreign && !args.opts.permit_foreign_addresses {
        return Reply::new_with_string(
            ReplyCode::ParameterSyntaxError,
            format!("Rejected data connection from foreign address {}:{}.", remote.ip(), remote.port()),
        );
    }
    if remote.port() < 1024 && !args.opts.permit_privileged_ports {
        return Reply::new(ReplyCode::ParameterSyntaxError, "Can't connect over a privileged port.");
    }
    session.clear_data_channel();
    let spawned = dispatcher::spawn_active(
        data_chan_ctx(args),
        remote,
        args.local_addr.ip(),
        session.data_connected.clone(),
        session.data_bytes.clone(),
    );
    session.set_data_channel(spawned);
    Reply::none()
}

#[async_trait]
impl<A: Authorizer> CommandHandler<A> for Port {
    async fn handle(&self, args: CommandContext<A>) -> Result<Reply, ControlChanError> {
        let Some(remote) = parse_port_argument(&self.addr) else {
            return Ok(Reply::new(ReplyCode::ParameterSyntaxError, "Invalid PORT format."));
        };
        Ok(establish_active(&args, remote).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_dotted_quad_and_port() {
        let addr = parse_port_argument("127,0,0,1,4,210").unwrap();
        assert_eq!(addr, "127.0.0.1:1234".parse().unwrap());
    }

    #[test]
    fn rejects_malformed_arguments() {
        assert_eq!(parse_port_argument("1,2,3,4,5"), None);
        assert_eq!(parse_port_argument("256,0,0,1,0,20"), None);
        assert_eq!(parse_port_argument("garbage"), None);
    }
}
