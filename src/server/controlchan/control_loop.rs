//! The per-connection control channel event loop: reads command lines
//! through the codec, routes them through the FTPS/auth gates into the
//! command handlers, interleaves status messages from the data channel, and
//! enforces the idle timeout.

use crate::auth::Authorizer;
use crate::notification::event::{DataEvent, EventMeta, PresenceEvent};
use crate::server::chancomms::ControlChanMsg;
use crate::server::controlchan::codecs::FtpCodec;
use crate::server::controlchan::command::Command;
use crate::server::controlchan::error::{ControlChanError, ControlChanErrorKind};
use crate::server::controlchan::handler::{CommandContext, CommandHandler};
use crate::server::controlchan::{Reply, ReplyCode, auth, commands, ftps};
use crate::server::ftpserver::chosen::SessionOptions;
use crate::server::io::FtpStream;
use crate::server::session::{Session, SharedSession};
use crate::server::shutdown;

use futures_util::{SinkExt, StreamExt};
use slog::{debug, error, info, o, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc};
use tokio_util::codec::Framed;

// Everything a control loop needs to serve one connection.
pub(crate) struct LoopConfig<A: Authorizer> {
    pub authorizer: Arc<A>,
    pub opts: Arc<SessionOptions>,
    pub logger: slog::Logger,
    pub shutdown: shutdown::Listener,
}

// Builds the metadata attached to every notification event.
pub(crate) fn event_meta<A: Authorizer>(session: &mut Session<A>) -> EventMeta {
    EventMeta {
        username: session.username_or_empty(),
        trace_id: session.trace_id.clone(),
        sequence_number: session.next_sequence_number(),
    }
}

// Serves one control connection until the client quits, times out or the
// server shuts down.
pub(crate) async fn run<A: Authorizer>(config: LoopConfig<A>, tcp_stream: TcpStream) {
    let LoopConfig {
        authorizer,
        opts,
        logger,
        mut shutdown,
    } = config;
    let (local_addr, peer_addr) = match (tcp_stream.local_addr(), tcp_stream.peer_addr()) {
        (Ok(local), Ok(peer)) => (local, peer),
        _ => return,
    };

    let session_inner = Session::new(Arc::clone(&authorizer));
    let logger = logger.new(o!("trace" => session_inner.trace_id.clone(), "peer" => peer_addr.to_string()));
    let (msg_tx, mut msg_rx) = mpsc::channel::<ControlChanMsg>(8);
    let session: SharedSession<A> = Arc::new(Mutex::new(session_inner));

    {
        let mut session = session.lock().await;
        let meta = event_meta(&mut session);
        opts.presence_listener.receive_presence_event(PresenceEvent::Connected, meta).await;
    }

    let mut framed = Framed::new(FtpStream::Plain(tcp_stream), FtpCodec::new(opts.encoding));
    if framed
        .send(Reply::new_with_string(ReplyCode::ServiceReady, opts.greeting.clone()))
        .await
        .is_err()
    {
        return;
    }

    loop {
        let mut close_after_reply = false;
        let reply = tokio::select! {
            biased;
            _ = shutdown.listen() => {
                debug!(logger, "Server shutdown; closing control connection");
                close_after_reply = true;
                Reply::new(ReplyCode::ServiceNotAvailable, "Service not available, closing control connection.")
            }
            Some(msg) = msg_rx.recv() => {
                let (reply, close) = handle_msg(msg, &session, &opts, &logger).await;
                close_after_reply = close;
                reply
            }
            item = framed.next() => match item {
                None => break,
                Some(Err(err)) => {
                    debug!(logger, "Control channel IO error: {:?}", err);
                    break;
                }
                Some(Ok(Err(err))) => match error_reply(&err) {
                    Some(reply) => reply,
                    None => {
                        debug!(logger, "Unrecoverable command error: {:?}", err);
                        break;
                    }
                },
                Some(Ok(Ok(command))) => {
                    debug!(logger, "Received command {:?}", command);
                    let reply = dispatch(command.clone(), &session, &authorizer, &opts, &msg_tx, local_addr, peer_addr, &logger).await;
                    let mut session = session.lock().await;
                    // One-shot state dies with the next command: REST is
                    // consumed by the transfer commands, RNFR by RNTO.
                    if command.verb() != "REST" {
                        session.start_pos = 0;
                    }
                    if command.verb() != "RNFR" {
                        session.rename_from = None;
                    }
                    reply
                }
            },
            _ = tokio::time::sleep(opts.idle_session_timeout) => {
                // A running transfer keeps the control channel quiet without
                // the session being idle; progress is policed by the data
                // channel's stall watchdog. The timer re-arms on the next
                // loop iteration.
                if session.lock().await.transfer_active {
                    Reply::none()
                } else {
                    info!(logger, "Control connection timed out after {:?} of inactivity", opts.idle_session_timeout);
                    close_after_reply = true;
                    Reply::new(ReplyCode::ServiceNotAvailable, "Control connection closed due to inactivity.")
                }
            }
        };

        if !matches!(reply, Reply::None) && framed.send(reply).await.is_err() {
            warn!(logger, "Could not send reply");
            break;
        }
        if close_after_reply {
            break;
        }

        // AUTH was accepted; re-frame the connection through the TLS
        // acceptor. A handshake failure closes the connection without any
        // further reply.
        let wants_upgrade = {
            let mut session = session.lock().await;
            std::mem::take(&mut session.upgrade_tls_requested)
        };
        if wants_upgrade {
            let Some(tls_config) = opts.ftps_config.config() else {
                break;
            };
            let parts = framed.into_parts();
            let FtpStream::Plain(tcp) = parts.io else {
                break;
            };
            let acceptor = tokio_rustls::TlsAcceptor::from(tls_config);
            match acceptor.accept(tcp).await {
                Ok(tls_stream) => {
                    framed = Framed::new(FtpStream::Tls(Box::new(tls_stream)), FtpCodec::new(opts.encoding));
                    let mut session = session.lock().await;
                    session.cmd_tls = true;
                    info!(logger, "Control channel upgraded to TLS");
                }
                Err(err) => {
                    warn!(logger, "TLS handshake on control channel failed: {:?}", err);
                    break;
                }
            }
        }

        let session_guard = session.lock().await;
        if session_guard.closing && !session_guard.transfer_active {
            break;
        }
    }

    let mut session = session.lock().await;
    session.clear_data_channel();
    if session.logged_in() {
        let meta = event_meta(&mut session);
        opts.presence_listener.receive_presence_event(PresenceEvent::LoggedOut, meta).await;
    }
    let meta = event_meta(&mut session);
    opts.presence_listener.receive_presence_event(PresenceEvent::Disconnected, meta).await;
    info!(logger, "Control connection closed");
}

// Replies for recoverable command line errors; None means the connection is
// beyond saving.
fn error_reply(err: &ControlChanError) -> Option<Reply> {
    match err.kind() {
        ControlChanErrorKind::UnknownCommand { command } => Some(Reply::new_with_string(
            ReplyCode::CommandSyntaxError,
            format!("Command \"{command}\" not understood."),
        )),
        ControlChanErrorKind::DecodeError => Some(Reply::new(ReplyCode::ParameterSyntaxError, "Can't decode command.")),
        ControlChanErrorKind::InvalidCommand => Some(Reply::new(ReplyCode::ParameterSyntaxError, "Syntax error.")),
        ControlChanErrorKind::CommandTooLong => Some(Reply::new(ReplyCode::CommandSyntaxError, "Command too long.")),
        _ => None,
    }
}

// Routes one command through the FTPS and authentication gates into its
// handler. Handler failures become a 451; the session carries on.
#[allow(clippy::too_many_arguments)]
async fn dispatch<A: Authorizer>(
    command: Command,
    session: &SharedSession<A>,
    authorizer: &Arc<A>,
    opts: &Arc<SessionOptions>,
    msg_tx: &mpsc::Sender<ControlChanMsg>,
    local_addr: SocketAddr,
    peer_addr: SocketAddr,
    logger: &slog::Logger,
) -> Reply {
    {
        let session = session.lock().await;
        if let Some(reply) = ftps::check_ftps_requirement(&session, &command, opts.ftps_required_control_chan, opts.ftps_required_data_chan) {
            return reply;
        }
        if let Some(reply) = auth::check_auth(&session, &command) {
            return reply;
        }
    }

    let context = CommandContext {
        session: Arc::clone(session),
        authorizer: Arc::clone(authorizer),
        opts: Arc::clone(opts),
        tx_control_chan: msg_tx.clone(),
        local_addr,
        peer_addr,
        logger: logger.clone(),
    };

    let handler: Box<dyn CommandHandler<A>> = match command {
        Command::User { username } => Box::new(commands::User::new(username)),
        Command::Pass { password } => Box::new(commands::Pass::new(password)),
        Command::Quit => Box::new(commands::Quit),
        Command::Rein => Box::new(commands::Rein),
        Command::Noop => Box::new(commands::Noop),
        Command::Syst => Box::new(commands::Syst),
        Command::Help { target } => Box::new(commands::Help::new(target)),
        Command::Stat { path } => Box::new(commands::Stat::new(path)),
        Command::Feat => Box::new(commands::Feat),
        Command::Opts { option } => Box::new(commands::Opts::new(option)),
        Command::Site { param } => Box::new(commands::Site::new(param)),
        Command::Type { transfer_type } => Box::new(commands::Type::new(transfer_type)),
        Command::Stru { structure } => Box::new(commands::Stru::new(structure)),
        Command::Mode { mode } => Box::new(commands::Mode::new(mode)),
        Command::Allo => Box::new(commands::Allo),
        Command::Rest { offset } => Box::new(commands::Rest::new(offset)),
        Command::Abor => Box::new(commands::Abor),
        Command::Pwd => Box::new(commands::Pwd),
        Command::Cwd { path } => Box::new(commands::Cwd::new(path)),
        Command::Cdup => Box::new(commands::Cdup),
        Command::Mkd { path } => Box::new(commands::Mkd::new(path)),
        Command::Rmd { path } => Box::new(commands::Rmd::new(path)),
        Command::Dele { path } => Box::new(commands::Dele::new(path)),
        Command::Rnfr { path } => Box::new(commands::Rnfr::new(path)),
        Command::Rnto { path } => Box::new(commands::Rnto::new(path)),
        Command::Pasv => Box::new(commands::Pasv),
        Command::Epsv { arg } => Box::new(commands::Epsv::new(arg)),
        Command::Port { addr } => Box::new(commands::Port::new(addr)),
        Command::Eprt { addr } => Box::new(commands::Eprt::new(addr)),
        Command::List { path } => Box::new(commands::List::new(path)),
        Command::Nlst { path } => Box::new(commands::Nlst::new(path)),
        Command::Mlsd { path } => Box::new(commands::Mlsd::new(path)),
        Command::Mlst { path } => Box::new(commands::Mlst::new(path)),
        Command::Retr { path } => Box::new(commands::Retr::new(path)),
        Command::Stor { path } => Box::new(commands::Stor::new(path)),
        Command::Stou => Box::new(commands::Stou),
        Command::Appe { path } => Box::new(commands::Appe::new(path)),
        Command::Size { path } => Box::new(commands::Size::new(path)),
        Command::Mdtm { path } => Box::new(commands::Mdtm::new(path)),
        Command::Mfmt { timeval, path } => Box::new(commands::Mfmt::new(timeval, path)),
        Command::Auth { protocol } => Box::new(commands::Auth::new(protocol)),
        Command::Pbsz { .. } => Box::new(commands::Pbsz),
        Command::Prot { param } => Box::new(commands::Prot::new(param)),
    };

    match handler.handle(context).await {
        Ok(reply) => reply,
        Err(err) => {
            error!(logger, "Command handler failed: {:?}", err);
            Reply::new(ReplyCode::LocalError, "Internal error.")
        }
    }
}

// Turns a status message from the data channel into the reply on the control
// channel, fires the transfer hooks and cleans the session's data channel
// slot. The bool says whether the control connection must close.
async fn handle_msg<A: Authorizer>(msg: ControlChanMsg, session: &SharedSession<A>, opts: &Arc<SessionOptions>, logger: &slog::Logger) -> (Reply, bool) {
    use ControlChanMsg::*;

    let mut session = session.lock().await;
    match msg {
        DataConnected { active } => {
            if active {
                (Reply::new(ReplyCode::CommandOkay, "Active data connection established."), false)
            } else {
                (Reply::none(), false)
            }
        }
        SentData { path, bytes } => {
            session.clear_data_channel();
            let meta = event_meta(&mut session);
            opts.data_listener
                .receive_data_event(DataEvent::FileSent { path, bytes }, meta)
                .await;
            (Reply::new(ReplyCode::ClosingDataConnection, "Transfer complete."), false)
        }
        ReceivedData { path, bytes } => {
            session.clear_data_channel();
            let meta = event_meta(&mut session);
            opts.data_listener
                .receive_data_event(DataEvent::FileReceived { path, bytes }, meta)
                .await;
            (Reply::new(ReplyCode::ClosingDataConnection, "Transfer complete."), false)
        }
        DirectoryListed => {
            session.clear_data_channel();
            (Reply::new(ReplyCode::ClosingDataConnection, "Transfer complete."), false)
        }
        TransferAborted { path, bytes, receiving } => {
            session.clear_data_channel();
            if let Some(path) = path {
                let meta = event_meta(&mut session);
                let event = if receiving {
                    DataEvent::IncompleteFileReceived { path, bytes }
                } else {
                    DataEvent::IncompleteFileSent { path, bytes }
                };
                opts.data_listener.receive_data_event(event, meta).await;
            }
            (
                Reply::new_with_string(ReplyCode::ConnectionClosed, format!("Transfer aborted; {bytes} bytes transmitted.")),
                false,
            )
        }
        AbortedByClient { path, bytes, receiving } => {
            // The 426/226 pair went out when ABOR was handled.
            session.clear_data_channel();
            if let Some(path) = path {
                let meta = event_meta(&mut session);
                let event = if receiving {
                    DataEvent::IncompleteFileReceived { path, bytes }
                } else {
                    DataEvent::IncompleteFileSent { path, bytes }
                };
                opts.data_listener.receive_data_event(event, meta).await;
            }
            (Reply::none(), false)
        }
        DataStalled => {
            warn!(logger, "Data connection stalled; closing control connection");
            session.clear_data_channel();
            (Reply::new(ReplyCode::ServiceNotAvailable, "Data connection timed out."), true)
        }
        PassiveAcceptTimeout => {
            session.clear_data_channel();
            (Reply::new(ReplyCode::ServiceNotAvailable, "Passive data channel timed out."), false)
        }
        ActiveConnectTimeout => {
            session.clear_data_channel();
            (Reply::new(ReplyCode::ServiceNotAvailable, "Active data channel timed out."), false)
        }
        ActiveConnectFailed => {
            session.clear_data_channel();
            (Reply::new(ReplyCode::CantOpenDataConnection, "Can't connect to specified address."), false)
        }
        ForeignAddressRejected(addr) => {
            session.clear_data_channel();
            (
                Reply::new_with_string(
                    ReplyCode::CantOpenDataConnection,
                    format!("Rejected data connection from foreign address {}:{}.", addr.ip(), addr.port()),
                ),
                false,
            )
        }
        TlsDataHandshakeFailed => {
            session.clear_data_channel();
            (Reply::new(ReplyCode::TlsHandshakeFailed, "SSL handshake failed."), false)
        }
    }
}
