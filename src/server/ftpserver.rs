//! Contains the [`Server`] and its [`ServerBuilder`].

pub(crate) mod chosen;
pub mod error;
mod listen;
pub mod options;

use super::{
    controlchan::control_loop::{self, LoopConfig},
    shutdown,
    tls::FtpsConfig,
};
use crate::{
    auth::Authorizer,
    notification::{DataListener, PresenceListener, nop::NopListener},
    server::tls,
};
use chosen::SessionOptions;
use error::{ServerError, ShutdownError};
use options::{Encoding, PassiveHost, Shutdown};
use slog::Drain;
use std::{fmt::Debug, future::Future, net::SocketAddr, ops::RangeInclusive, path::PathBuf, pin::Pin, sync::Arc, time::Duration};

/// An instance of an FTP(S) server. It aggregates an
/// [`Authorizer`](crate::auth::Authorizer) implementation that will be used
/// both for authentication and for per-path permission decisions.
///
/// The server can be started with the [`listen`](crate::Server::listen)
/// method.
///
/// # Example
///
/// ```no_run
/// use ftpdlib::Server;
/// use ftpdlib::auth::UserRegistry;
///
/// #[tokio::main]
/// async fn main() {
///     let mut users = UserRegistry::new();
///     users.add_anonymous("/srv/ftp/pub").unwrap();
///     let server = Server::with_authorizer(users).build().unwrap();
///     server.listen("127.0.0.1:2121").await.unwrap();
/// }
/// ```
pub struct Server<A: Authorizer> {
    authorizer: Arc<A>,
    opts: Arc<SessionOptions>,
    max_cons: usize,
    max_cons_per_ip: usize,
    logger: slog::Logger,
    shutdown: Pin<Box<dyn Future<Output = Shutdown> + Send + Sync>>,
}

/// Used to create [`Server`]s.
pub struct ServerBuilder<A: Authorizer> {
    authorizer: Arc<A>,
    greeting: String,
    passive_ports: Option<RangeInclusive<u16>>,
    passive_host: PassiveHost,
    idle_session_timeout: Duration,
    data_stall_timeout: Duration,
    read_limit: u64,
    write_limit: u64,
    permit_foreign_addresses: bool,
    permit_privileged_ports: bool,
    max_login_attempts: u32,
    auth_failed_delay: Duration,
    ftps_mode: FtpsConfig,
    ftps_required_control_chan: bool,
    ftps_required_data_chan: bool,
    encoding: Encoding,
    use_gmt_times: bool,
    use_sendfile: bool,
    max_cons: usize,
    max_cons_per_ip: usize,
    data_listener: Arc<dyn DataListener>,
    presence_listener: Arc<dyn PresenceListener>,
    logger: slog::Logger,
    shutdown: Pin<Box<dyn Future<Output = Shutdown> + Send + Sync>>,
}

impl<A: Authorizer> ServerBuilder<A> {
    fn new(authorizer: A) -> Self {
        ServerBuilder {
            authorizer: Arc::new(authorizer),
            greeting: options::DEFAULT_GREETING.to_string(),
            passive_ports: Some(options::DEFAULT_PASSIVE_PORTS),
            passive_host: PassiveHost::FromConnection,
            idle_session_timeout: Duration::from_secs(options::DEFAULT_IDLE_SESSION_TIMEOUT_SECS),
            data_stall_timeout: Duration::from_secs(options::DEFAULT_DATA_STALL_TIMEOUT_SECS),
            read_limit: 0,
            write_limit: 0,
            permit_foreign_addresses: false,
            permit_privileged_ports: false,
            max_login_attempts: options::DEFAULT_MAX_LOGIN_ATTEMPTS,
            auth_failed_delay: Duration::from_secs(options::DEFAULT_AUTH_FAILED_DELAY_SECS),
            ftps_mode: FtpsConfig::Off,
            ftps_required_control_chan: false,
            ftps_required_data_chan: false,
            encoding: Encoding::Utf8,
            use_gmt_times: true,
            use_sendfile: true,
            max_cons: 0,
            max_cons_per_ip: 0,
            data_listener: Arc::new(NopListener {}),
            presence_listener: Arc::new(NopListener {}),
            logger: slog::Logger::root(slog_stdlog::StdLog {}.fuse(), slog::o!()),
            shutdown: Box::pin(futures_util::future::pending()),
        }
    }

    /// Sets the greeting sent to the client right after connecting.
    pub fn greeting<S: Into<String>>(mut self, greeting: S) -> Self {
        self.greeting = greeting.into();
        self
    }

    /// Sets the range of ports used for passive data connections. Without a
    /// configured range an ephemeral port is taken each time.
    pub fn passive_ports(mut self, range: RangeInclusive<u16>) -> Self {
        self.passive_ports = Some(range);
        self
    }

    /// Specifies how the IP address in the `227` reply to PASV is determined,
    /// e.g. a masquerade address when the server sits behind NAT.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use ftpdlib::{Server, auth::UserRegistry};
    /// let server = Server::with_authorizer(UserRegistry::new())
    ///     .passive_host([203, 0, 113, 10])
    ///     .build();
    /// ```
    pub fn passive_host<H: Into<PassiveHost>>(mut self, host: H) -> Self {
        self.passive_host = host.into();
        self
    }

    /// Sets the idle timeout on the control channel. The default is 300
    /// seconds; an idle session is answered a 421 and closed.
    pub fn idle_session_timeout(mut self, timeout: Duration) -> Self {
        self.idle_session_timeout = timeout;
        self
    }

    /// Sets the data transfer stall timeout: a transfer making no progress
    /// at all for this long is cut, together with its control connection.
    pub fn data_stall_timeout(mut self, timeout: Duration) -> Self {
        self.data_stall_timeout = timeout;
        self
    }

    /// Limits upload bandwidth per data connection, in bytes per second.
    /// Zero means no limit.
    pub fn read_limit(mut self, bytes_per_second: u64) -> Self {
        self.read_limit = bytes_per_second;
        self
    }

    /// Limits download bandwidth per data connection, in bytes per second.
    /// Zero means no limit.
    pub fn write_limit(mut self, bytes_per_second: u64) -> Self {
        self.write_limit = bytes_per_second;
        self
    }

    /// Permits data connections from or to addresses other than the control
    /// connection's peer (site-to-site FTP). Off by default.
    pub fn permit_foreign_addresses(mut self, permit: bool) -> Self {
        self.permit_foreign_addresses = permit;
        self
    }

    /// Permits PORT/EPRT to ports below 1024. Off by default.
    pub fn permit_privileged_ports(mut self, permit: bool) -> Self {
        self.permit_privileged_ports = permit;
        self
    }

    /// Sets how many PASS failures one session may accumulate before the
    /// connection is closed. The default is 3.
    pub fn max_login_attempts(mut self, attempts: u32) -> Self {
        self.max_login_attempts = attempts;
        self
    }

    /// Sets the artificial delay before a failed PASS is answered, slowing
    /// down password guessing. The default is 5 seconds.
    pub fn auth_failed_delay(mut self, delay: Duration) -> Self {
        self.auth_failed_delay = delay;
        self
    }

    /// Enables FTPS with the given certificate chain and private key, both
    /// in PEM format.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use ftpdlib::{Server, auth::UserRegistry};
    /// let server = Server::with_authorizer(UserRegistry::new())
    ///     .ftps("/srv/unftp/server.certs", "/srv/unftp/server.key")
    ///     .build();
    /// ```
    pub fn ftps<P: Into<PathBuf>>(mut self, certs_file: P, key_file: P) -> Self {
        self.ftps_mode = FtpsConfig::Building {
            certs_file: certs_file.into(),
            key_file: key_file.into(),
        };
        self
    }

    /// Configures whether plaintext sessions may log in (`for_control_chan`)
    /// and whether plaintext data connections are allowed
    /// (`for_data_chan`).
    pub fn ftps_required(mut self, for_control_chan: bool, for_data_chan: bool) -> Self {
        self.ftps_required_control_chan = for_control_chan;
        self.ftps_required_data_chan = for_data_chan;
        self
    }

    /// Sets the text encoding used on the control channel. UTF-8 by default.
    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Renders LIST/MDTM/MLSx timestamps in UTC (the default) or local time.
    pub fn use_gmt_times(mut self, use_gmt: bool) -> Self {
        self.use_gmt_times = use_gmt;
        self
    }

    /// Allows or forbids the kernel sendfile fast path for plain binary
    /// downloads. On by default; only effective on Linux.
    pub fn use_sendfile(mut self, use_sendfile: bool) -> Self {
        self.use_sendfile = use_sendfile;
        self
    }

    /// Caps the number of simultaneous connections. Zero (the default) means
    /// no limit. The connection over the limit is told `421 Too many
    /// connections.` and dropped.
    pub fn max_cons(mut self, max: usize) -> Self {
        self.max_cons = max;
        self
    }

    /// Caps the number of simultaneous connections per client IP address.
    /// Zero (the default) means no limit.
    pub fn max_cons_per_ip(mut self, max: usize) -> Self {
        self.max_cons_per_ip = max;
        self
    }

    /// Sets a [`DataListener`] that will be notified of file transfers and
    /// directory changes in any session.
    pub fn notify_data(mut self, listener: impl DataListener + 'static) -> Self {
        self.data_listener = Arc::new(listener);
        self
    }

    /// Sets a [`PresenceListener`] that will be notified of connections,
    /// logins and logouts.
    pub fn notify_presence(mut self, listener: impl PresenceListener + 'static) -> Self {
        self.presence_listener = Arc::new(listener);
        self
    }

    /// Sets the structured logger ([slog](https://crates.io/crates/slog)::Logger) to use.
    pub fn logger<L: Into<Option<slog::Logger>>>(mut self, logger: L) -> Self {
        self.logger = logger.into().unwrap_or_else(|| slog::Logger::root(slog_stdlog::StdLog {}.fuse(), slog::o!()));
        self
    }

    /// Tells the server when and how to shut down gracefully: the passed
    /// future resolves when the server should go down.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use ftpdlib::{Server, auth::UserRegistry};
    /// use std::time::Duration;
    ///
    /// let server = Server::with_authorizer(UserRegistry::new())
    ///     .shutdown_indicator(async {
    ///         // Shut the server down after 10 seconds.
    ///         tokio::time::sleep(Duration::from_secs(10)).await;
    ///         ftpdlib::options::Shutdown::new().grace_period(Duration::from_secs(5))
    ///     })
    ///     .build();
    /// ```
    pub fn shutdown_indicator<I>(mut self, indicator: I) -> Self
    where
        I: Future<Output = Shutdown> + Send + Sync + 'static,
    {
        self.shutdown = Box::pin(indicator);
        self
    }

    /// Finalizes the options and builds a [`Server`].
    pub fn build(self) -> std::result::Result<Server<A>, ServerError> {
        let ftps_mode = match self.ftps_mode {
            FtpsConfig::Off => FtpsConfig::Off,
            FtpsConfig::Building { certs_file, key_file } => FtpsConfig::On {
                tls_config: tls::new_config(certs_file, key_file)?,
            },
            FtpsConfig::On { tls_config } => FtpsConfig::On { tls_config },
        };
        Ok(Server {
            authorizer: self.authorizer,
            opts: Arc::new(SessionOptions {
                greeting: self.greeting,
                passive_ports: self.passive_ports,
                passive_host: self.passive_host,
                idle_session_timeout: self.idle_session_timeout,
                data_stall_timeout: self.data_stall_timeout,
                establish_timeout: Duration::from_secs(options::DEFAULT_ESTABLISH_TIMEOUT_SECS),
                read_limit: self.read_limit,
                write_limit: self.write_limit,
                permit_foreign_addresses: self.permit_foreign_addresses,
                permit_privileged_ports: self.permit_privileged_ports,
                max_login_attempts: self.max_login_attempts,
                auth_failed_delay: self.auth_failed_delay,
                ftps_config: ftps_mode,
                ftps_required_control_chan: self.ftps_required_control_chan,
                ftps_required_data_chan: self.ftps_required_data_chan,
                encoding: self.encoding,
                use_gmt_times: self.use_gmt_times,
                use_sendfile: self.use_sendfile,
                data_listener: self.data_listener,
                presence_listener: self.presence_listener,
            }),
            max_cons: self.max_cons,
            max_cons_per_ip: self.max_cons_per_ip,
            logger: self.logger,
            shutdown: self.shutdown,
        })
    }
}

impl<A: Authorizer> Server<A> {
    /// Construct a new [`ServerBuilder`] around the given [`Authorizer`].
    pub fn with_authorizer(authorizer: A) -> ServerBuilder<A> {
        ServerBuilder::new(authorizer)
    }

    /// Runs the main FTP process asynchronously. Should be started in a
    /// Tokio runtime context.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use ftpdlib::{Server, auth::UserRegistry};
    /// #[tokio::main]
    /// async fn main() {
    ///     let server = Server::with_authorizer(UserRegistry::new()).build().unwrap();
    ///     server.listen("127.0.0.1:2121").await.unwrap();
    /// }
    /// ```
    #[tracing_attributes::instrument(skip(self))]
    pub async fn listen<T: Into<String> + Debug>(self, bind_address: T) -> std::result::Result<(), ServerError> {
        let logger = self.logger.clone();
        let bind_address: SocketAddr = bind_address.into().parse()?;
        let shutdown_notifier = Arc::new(shutdown::Notifier::new());

        let listener = listen::Listener {
            bind_address,
            logger: self.logger.clone(),
            authorizer: Arc::clone(&self.authorizer),
            opts: Arc::clone(&self.opts),
            shutdown_topic: Arc::clone(&shutdown_notifier),
            max_cons: self.max_cons,
            max_cons_per_ip: self.max_cons_per_ip,
        };

        tokio::select! {
            result = listener.listen() => result,
            opts = self.shutdown => {
                slog::debug!(logger, "Shutting down within {:?}", opts.grace_period);
                shutdown_notifier.notify().await;
                Self::shutdown_linger(logger, shutdown_notifier, opts.grace_period).await
            }
        }
    }

    /// Services an already accepted connection as a control connection.
    ///
    /// Use this instead of [`listen`](Server::listen) if you want to accept
    /// connections yourself: per-session threads with their own runtime, or
    /// a socket inherited from a parent process.
    pub async fn service(self, tcp_stream: tokio::net::TcpStream) -> std::result::Result<(), ServerError> {
        let shutdown_notifier = shutdown::Notifier::new();
        let config = LoopConfig {
            authorizer: Arc::clone(&self.authorizer),
            opts: Arc::clone(&self.opts),
            logger: self.logger.clone(),
            shutdown: shutdown_notifier.subscribe().await,
        };
        control_loop::run(config, tcp_stream).await;
        Ok(())
    }

    // Waits for the session tasks to finish or aborts when the grace period
    // expires.
    async fn shutdown_linger(logger: slog::Logger, shutdown_notifier: Arc<shutdown::Notifier>, grace_period: Duration) -> std::result::Result<(), ServerError> {
        let timeout = Box::pin(tokio::time::sleep(grace_period));
        tokio::select! {
            _ = shutdown_notifier.linger() => {
                slog::debug!(logger, "Graceful shutdown complete");
                Ok(())
            },
            _ = timeout => {
                Err(ShutdownError{ msg: "shutdown grace period expired".to_string()}.into())
            }
        }
    }
}

impl<A: Authorizer> Debug for Server<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("authorizer", &self.authorizer)
            .field("opts", &self.opts)
            .field("max_cons", &self.max_cons)
            .field("max_cons_per_ip", &self.max_cons_per_ip)
            .finish()
    }
}

impl<A: Authorizer> Debug for ServerBuilder<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerBuilder")
            .field("authorizer", &self.authorizer)
            .field("greeting", &self.greeting)
            .field("passive_ports", &self.passive_ports)
            .field("passive_host", &self.passive_host)
            .field("idle_session_timeout", &self.idle_session_timeout)
            .field("data_stall_timeout", &self.data_stall_timeout)
            .field("ftps_mode", &self.ftps_mode)
            .field("ftps_required_control_chan", &self.ftps_required_control_chan)
            .field("ftps_required_data_chan", &self.ftps_required_data_chan)
            .field("encoding", &self.encoding)
            .field("max_cons", &self.max_cons)
            .field("max_cons_per_ip", &self.max_cons_per_ip)
            .finish()
    }
}
