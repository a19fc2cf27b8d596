//! Contains the code that listens for control channel connections and
//! enforces the connection limits at accept time.

use super::chosen::SessionOptions;
use super::error::ServerError;
use crate::auth::Authorizer;
use crate::server::controlchan::control_loop::{self, LoopConfig};
use crate::server::shutdown;

use dashmap::DashMap;
use slog::{error, info};
use std::net::{IpAddr, SocketAddr};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

// Listener listens for control channel connections on a TCP port and spawns
// a control channel loop in a new task for each incoming connection.
pub(crate) struct Listener<A: Authorizer> {
    pub bind_address: SocketAddr,
    pub logger: slog::Logger,
    pub authorizer: Arc<A>,
    pub opts: Arc<SessionOptions>,
    pub shutdown_topic: Arc<shutdown::Notifier>,
    pub max_cons: usize,
    pub max_cons_per_ip: usize,
}

// Keeps the accept-time connection accounting honest: dropping the guard
// (when the session task ends) releases the slots again.
struct ConnectionGuard {
    total: Arc<AtomicUsize>,
    per_ip: Arc<DashMap<IpAddr, usize>>,
    ip: IpAddr,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.total.fetch_sub(1, Ordering::AcqRel);
        if let Some(mut count) = self.per_ip.get_mut(&self.ip) {
            *count = count.saturating_sub(1);
        }
        self.per_ip.remove_if(&self.ip, |_, count| *count == 0);
    }
}

impl<A: Authorizer> Listener<A> {
    // Starts listening, returning an error if the TCP address could not be
    // bound.
    pub async fn listen(self) -> std::result::Result<(), ServerError> {
        let Listener {
            bind_address,
            logger,
            authorizer,
            opts,
            shutdown_topic,
            max_cons,
            max_cons_per_ip,
        } = self;
        let listener = TcpListener::bind(bind_address).await?;
        let total = Arc::new(AtomicUsize::new(0));
        let per_ip: Arc<DashMap<IpAddr, usize>> = Arc::new(DashMap::new());
        loop {
            let shutdown_listener = shutdown_topic.subscribe().await;
            match listener.accept().await {
                Ok((tcp_stream, socket_addr)) => {
                    info!(logger, "Incoming control connection from {:?}", socket_addr);
                    let ip = socket_addr.ip();
                    let total_now = total.load(Ordering::Acquire);
                    let ip_now = per_ip.get(&ip).map(|c| *c).unwrap_or(0);
                    let over_limit = (max_cons > 0 && total_now >= max_cons) || (max_cons_per_ip > 0 && ip_now >= max_cons_per_ip);
                    if over_limit {
                        info!(logger, "Refusing connection from {:?}: connection limit reached", socket_addr);
                        tokio::spawn(async move {
                            let mut tcp_stream = tcp_stream;
                            let _ = tcp_stream.write_all(b"421 Too many connections.\r\n").await;
                            let _ = tcp_stream.shutdown().await;
                        });
                        continue;
                    }
                    total.fetch_add(1, Ordering::AcqRel);
                    *per_ip.entry(ip).or_insert(0) += 1;
                    let guard = ConnectionGuard {
                        total: Arc::clone(&total),
                        per_ip: Arc::clone(&per_ip),
                        ip,
                    };
                    let config = LoopConfig {
                        authorizer: Arc::clone(&authorizer),
                        opts: Arc::clone(&opts),
                        logger: logger.clone(),
                        shutdown: shutdown_listener,
                    };
                    tokio::spawn(async move {
                        let _guard = guard;
                        control_loop::run(config, tcp_stream).await;
                    });
                }
                Err(err) => {
                    error!(logger, "Error accepting incoming control connection {:?}", err);
                }
            }
        }
    }
}
