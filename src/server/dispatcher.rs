//! Establishes data connections: a listening socket for passive mode
//! (PASV/EPSV), an outbound connect for active mode (PORT/EPRT). The
//! resulting connection is handed to a [`DataChannel`](super::datachan::DataChannel).

use crate::auth::Authorizer;
use crate::server::chancomms::{ControlChanMsg, DataCommand};
use crate::server::datachan::DataChannel;
use crate::server::io::FtpStream;
use crate::server::session::SharedSession;

use slog::{info, warn};
use std::{
    io,
    net::{IpAddr, SocketAddr},
    ops::RangeInclusive,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};
use tokio::{
    net::{TcpListener, TcpSocket, TcpStream},
    sync::mpsc::{Receiver, Sender, channel},
    task::JoinHandle,
};

// Everything a dispatcher task needs to police, wrap and run a data
// connection. Built by the PASV/EPSV/PORT/EPRT handlers from their command
// context.
pub(crate) struct DataChanCtx<A: Authorizer> {
    pub session: SharedSession<A>,
    pub logger: slog::Logger,
    pub msg_tx: Sender<ControlChanMsg>,
    pub tls_config: Option<Arc<rustls::ServerConfig>>,
    pub permit_foreign_addresses: bool,
    // The control connection's peer; passive accepts from other addresses
    // are rejected unless foreign addresses are permitted.
    pub control_peer_ip: IpAddr,
    pub establish_timeout: Duration,
    pub stall_timeout: Duration,
    pub read_limit: u64,
    pub write_limit: u64,
    pub use_sendfile: bool,
}

// The handles the spawning command handler stores in the session.
pub(crate) struct SpawnedDataChannel {
    pub cmd_tx: Sender<DataCommand>,
    pub abort_tx: Sender<()>,
    pub task: JoinHandle<()>,
}

// Draws the ports of the configured passive range in random order.
fn shuffled_ports(range: &RangeInclusive<u16>) -> Vec<u16> {
    let mut ports: Vec<u16> = range.clone().collect();
    let mut randomness = vec![0u8; ports.len().saturating_mul(4)];
    if getrandom::fill(&mut randomness).is_err() {
        // No randomness available; scanning in order is still correct.
        return ports;
    }
    for i in (1..ports.len()).rev() {
        let chunk = &randomness[i * 4..i * 4 + 4];
        let value = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        ports.swap(i, value as usize % (i + 1));
    }
    ports
}

// Binds the passive listener on the interface the control connection came in
// on. Ports from the configured range are tried in random order; EPERM and
// in-use ports are skipped. When the whole range is occupied we fall back to
// a kernel-assigned ephemeral port and log a warning.
pub(crate) async fn bind_passive(local_ip: IpAddr, passive_ports: Option<&RangeInclusive<u16>>, logger: &slog::Logger) -> io::Result<TcpListener> {
    let Some(range) = passive_ports else {
        return TcpListener::bind(SocketAddr::new(local_ip, 0)).await;
    };
    for port in shuffled_ports(range) {
        match TcpListener::bind(SocketAddr::new(local_ip, port)).await {
            Ok(listener) => return Ok(listener),
            Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
                info!(logger, "ignoring EPERM when binding port {}", port);
            }
            Err(err) if err.kind() == io::ErrorKind::AddrInUse => {}
            Err(err) => return Err(err),
        }
    }
    warn!(
        logger,
        "Can't find a valid passive port in the configured range. A random kernel-assigned port will be used."
    );
    TcpListener::bind(SocketAddr::new(local_ip, 0)).await
}

// Spawns the accept side of a passive data connection. The returned channel
// handles go into the session; the task polices the accepted peer address and
// then turns into the data channel.
pub(crate) fn spawn_passive<A: Authorizer>(
    ctx: DataChanCtx<A>,
    listener: TcpListener,
    connected: Arc<AtomicBool>,
    bytes: Arc<AtomicU64>,
) -> SpawnedDataChannel {
    let (cmd_tx, cmd_rx) = channel(1);
    let (abort_tx, abort_rx) = channel(1);
    let task = tokio::spawn(async move {
        match tokio::time::timeout(ctx.establish_timeout, listener.accept()).await {
            Err(_) => {
                let _ = ctx.msg_tx.send(ControlChanMsg::PassiveAcceptTimeout).await;
            }
            Ok(Err(err)) => {
                warn!(ctx.logger, "Error accepting incoming data connection: {:?}", err);
            }
            Ok(Ok((socket, peer))) => {
                if peer.ip().to_canonical() != ctx.control_peer_ip.to_canonical() && !ctx.permit_foreign_addresses {
                    drop(socket);
                    let _ = ctx.msg_tx.send(ControlChanMsg::ForeignAddressRejected(peer)).await;
                    return;
                }
                // We accept only one connection per listener.
                drop(listener);
                establish(ctx, socket, cmd_rx, abort_rx, connected, bytes, false).await;
            }
        }
    });
    SpawnedDataChannel { cmd_tx, abort_tx, task }
}

// Spawns the connect side of an active data connection (PORT/EPRT). The
// connect originates from the interface the control connection came in on.
pub(crate) fn spawn_active<A: Authorizer>(
    ctx: DataChanCtx<A>,
    remote: SocketAddr,
    local_ip: IpAddr,
    connected: Arc<AtomicBool>,
    bytes: Arc<AtomicU64>,
) -> SpawnedDataChannel {
    let (cmd_tx, cmd_rx) = channel(1);
    let (abort_tx, abort_rx) = channel(1);
    let task = tokio::spawn(async move {
        let socket = match if remote.is_ipv4() { TcpSocket::new_v4() } else { TcpSocket::new_v6() } {
            Ok(socket) => socket,
            Err(err) => {
                warn!(ctx.logger, "Could not create active data socket: {:?}", err);
                let _ = ctx.msg_tx.send(ControlChanMsg::ActiveConnectFailed).await;
                return;
            }
        };
        if let Err(err) = socket.bind(SocketAddr::new(local_ip, 0)) {
            warn!(ctx.logger, "Could not bind active data socket: {:?}", err);
            let _ = ctx.msg_tx.send(ControlChanMsg::ActiveConnectFailed).await;
            return;
        }
        match tokio::time::timeout(ctx.establish_timeout, socket.connect(remote)).await {
            Err(_) => {
                let _ = ctx.msg_tx.send(ControlChanMsg::ActiveConnectTimeout).await;
            }
            Ok(Err(err)) => {
                info!(ctx.logger, "Active data connection to {} failed: {:?}", remote, err);
                let _ = ctx.msg_tx.send(ControlChanMsg::ActiveConnectFailed).await;
            }
            Ok(Ok(socket)) => {
                establish(ctx, socket, cmd_rx, abort_rx, connected, bytes, true).await;
            }
        }
    });
    SpawnedDataChannel { cmd_tx, abort_tx, task }
}

// Wraps the fresh connection in TLS when the session negotiated PROT P, then
// runs the data channel on it.
async fn establish<A: Authorizer>(
    ctx: DataChanCtx<A>,
    socket: TcpStream,
    cmd_rx: Receiver<DataCommand>,
    abort_rx: Receiver<()>,
    connected: Arc<AtomicBool>,
    bytes: Arc<AtomicU64>,
    active: bool,
) {
    let prot_private = ctx.session.lock().await.prot_private;
    let stream = if prot_private {
        let Some(config) = ctx.tls_config else {
            // PROT P is only reachable on a secured session; not having a
            // TLS config here is a bug, but the client still gets an answer.
            let _ = ctx.msg_tx.send(ControlChanMsg::TlsDataHandshakeFailed).await;
            return;
        };
        let acceptor = tokio_rustls::TlsAcceptor::from(config);
        match acceptor.accept(socket).await {
            Ok(tls_stream) => FtpStream::Tls(Box::new(tls_stream)),
            Err(err) => {
                warn!(ctx.logger, "TLS handshake on data connection failed: {:?}", err);
                let _ = ctx.msg_tx.send(ControlChanMsg::TlsDataHandshakeFailed).await;
                return;
            }
        }
    } else {
        FtpStream::Plain(socket)
    };

    connected.store(true, Ordering::Relaxed);
    if ctx.msg_tx.send(ControlChanMsg::DataConnected { active }).await.is_err() {
        return;
    }

    let chan = DataChannel {
        logger: ctx.logger.clone(),
        msg_tx: ctx.msg_tx.clone(),
        bytes_counter: bytes,
        stall_timeout: ctx.stall_timeout,
        read_limit: ctx.read_limit,
        write_limit: ctx.write_limit,
        use_sendfile: ctx.use_sendfile,
    };
    chan.run(stream, cmd_rx, abort_rx).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shuffle_is_a_permutation() {
        let range = 50000..=50016;
        let mut ports = shuffled_ports(&range);
        ports.sort_unstable();
        let expected: Vec<u16> = range.collect();
        assert_eq!(ports, expected);
    }

    #[tokio::test]
    async fn bind_falls_back_to_ephemeral_when_range_is_taken() {
        let logger = slog::Logger::root(slog::Discard, slog::o!());
        let ip: IpAddr = "127.0.0.1".parse().unwrap();
        // Occupy a one-port range, then ask for a listener in it.
        let holder = TcpListener::bind((ip, 0)).await.unwrap();
        let taken = holder.local_addr().unwrap().port();
        let range = taken..=taken;
        let listener = bind_passive(ip, Some(&range), &logger).await.unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), taken);
    }

    #[tokio::test]
    async fn bind_prefers_the_configured_range() {
        let logger = slog::Logger::root(slog::Discard, slog::o!());
        let ip: IpAddr = "127.0.0.1".parse().unwrap();
        // A wide range somewhere in the dynamic area; at least one port of it
        // should be free.
        let range = 49152..=49407;
        if let Ok(listener) = bind_passive(ip, Some(&range), &logger).await {
            let port = listener.local_addr().unwrap().port();
            assert!(range.contains(&port));
        }
    }
}
