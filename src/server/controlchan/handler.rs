use crate::{
    auth::Authorizer,
    server::{
        ControlChanMsg,
        controlchan::{Reply, error::ControlChanError},
        ftpserver::chosen::SessionOptions,
        session::SharedSession,
    },
};
use async_trait::async_trait;
use std::{net::SocketAddr, sync::Arc};
use tokio::sync::mpsc::Sender;

// Common interface for all handlers of `Command`s
#[async_trait]
pub(crate) trait CommandHandler<A: Authorizer>: Send + Sync + std::fmt::Debug {
    async fn handle(&self, args: CommandContext<A>) -> Result<Reply, ControlChanError>;
}

// Represents the arguments passed to a `CommandHandler`.
#[derive(Debug)]
pub(crate) struct CommandContext<A: Authorizer> {
    pub session: SharedSession<A>,
    pub authorizer: Arc<A>,
    pub opts: Arc<SessionOptions>,
    pub tx_control_chan: Sender<ControlChanMsg>,
    pub local_addr: SocketAddr,
    pub peer_addr: SocketAddr,
    pub logger: slog::Logger,
}
