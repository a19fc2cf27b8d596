//! The RFC 2428 Extended Data Port (`EPRT`) command
//
// The address-family-agnostic sibling of PORT: `EPRT |2|::1|1234|`. The
// first character of the argument is the delimiter.

use crate::auth::Authorizer;
use crate::server::controlchan::commands::port::establish_active;
use crate::server::controlchan::error::ControlChanError;
use crate::server::controlchan::handler::{CommandContext, CommandHandler};
use crate::server::controlchan::{Reply, ReplyCode};

use async_trait::async_trait;
use std::net::{IpAddr, SocketAddr};

#[derive(Debug)]
pub struct Eprt {
    addr: String,
}

impl Eprt {
    pub fn new(addr: String) -> Self {
        Eprt { addr }
    }
}

fn parse_eprt_argument(arg: &str) -> Option<SocketAddr> {
    let delim = arg.chars().next()?;
    let fields: Vec<&str> = arg.split(delim).collect();
    // "|2|::1|1234|" splits into ["", "2", "::1", "1234", ""].
    let [_, proto, host, port, _] = fields.as_slice() else {
        return None;
    };
    let ip: IpAddr = host.parse().ok()?;
    match (*proto, &ip) {
        ("1", IpAddr::V4(_)) | ("2", IpAddr::V6(_)) => {}
        _ => return None,
    }
    let port: u16 = port.parse().ok()?;
    Some(SocketAddr::new(ip, port))
}

#[async_trait]
impl<A: Authorizer> CommandHandler<A> for Eprt {
    async fn handle(&self, args: CommandContext<A>) -> Result<Reply, ControlChanError> {
        let Some(remote) = parse_eprt_argument(&self.addr) else {
            return Ok(Reply::new(ReplyCode::ParameterSyntaxError, "Invalid EPRT format."));
        };
        Ok(establish_active(&args, remote).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_v4_and_v6() {
        assert_eq!(parse_eprt_argument("|1|132.235.1.2|6275|").unwrap(), "132.235.1.2:6275".parse().unwrap());
        assert_eq!(parse_eprt_argument("|2|::1|1234|").unwrap(), "[::1]:1234".parse().unwrap());
    }

    #[test]
    fn protocol_must_match_address_family() {
        assert_eq!(parse_eprt_argument("|2|127.0.0.1|1234|"), None);
        assert_eq!(parse_eprt_argument("|1|::1|1234|"), None);
        assert_eq!(parse_eprt_argument("|3|127.0.0.1|1234|"), None);
    }
}
