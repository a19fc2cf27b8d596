//! Contains the messages exchanged between the data channel task and the
//! per-connection control loop.

use std::net::SocketAddr;

use crate::server::TransferType;

pub type BoxedReader = Box<dyn tokio::io::AsyncRead + Send + Unpin>;

// The source of the bytes for an outbound (server to client) transfer.
pub enum SendSource {
    // A regular file, already opened and positioned. Kept separate from the
    // generic reader so the sendfile fast path can get at the descriptor.
    File(tokio::fs::File),
    // A rendered byte stream, e.g. a directory listing.
    Reader(BoxedReader),
}

impl std::fmt::Debug for SendSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SendSource::File(_) => write!(f, "SendSource::File"),
            SendSource::Reader(_) => write!(f, "SendSource::Reader"),
        }
    }
}

// One transfer, fully prepared by the control side: the file or stream was
// opened, permission-checked and positioned before it is handed over here.
#[derive(Debug)]
pub enum DataCommand {
    // Server-to-client: RETR, LIST, NLST, MLSD.
    Send {
        source: SendSource,
        ftp_path: Option<String>,
        transfer_type: TransferType,
    },
    // Client-to-server: STOR, STOU, APPE.
    Receive {
        file: tokio::fs::File,
        ftp_path: String,
        transfer_type: TransferType,
    },
}

/// ControlChanMsg represents a status message from the data channel (or one
/// of the dispatcher tasks) to the per-connection control loop.
#[derive(Debug)]
pub enum ControlChanMsg {
    /// The data connection is established; an active-mode one answers the
    /// earlier PORT/EPRT with `200` now.
    DataConnected {
        /// Whether this was an active (PORT/EPRT) connection.
        active: bool,
    },
    /// Bytes went out successfully (RETR).
    SentData {
        /// FTP path of the file that was sent.
        path: String,
        /// Number of bytes sent.
        bytes: u64,
    },
    /// Bytes were stored successfully (STOR/STOU/APPE).
    ReceivedData {
        /// FTP path of the file that was stored.
        path: String,
        /// Number of bytes stored.
        bytes: u64,
    },
    /// A directory listing was sent successfully.
    DirectoryListed,
    /// The transfer ended early: peer close, IO error.
    TransferAborted {
        /// FTP path if a real file was involved.
        path: Option<String>,
        /// Bytes that made it across before the failure.
        bytes: u64,
        /// Direction: true when the server was receiving.
        receiving: bool,
    },
    /// The transfer was cut by ABOR; the 426/226 pair was already sent, only
    /// the bookkeeping and hooks remain.
    AbortedByClient {
        /// FTP path if a real file was involved.
        path: Option<String>,
        /// Bytes that made it across before the abort.
        bytes: u64,
        /// Direction: true when the server was receiving.
        receiving: bool,
    },
    /// No bytes moved for a full stall-timeout period; the control connection
    /// goes down with the data connection.
    DataStalled,
    /// Nobody connected to the passive listener within the accept timeout.
    PassiveAcceptTimeout,
    /// The outbound active connection attempt timed out.
    ActiveConnectTimeout,
    /// The outbound active connection attempt was refused.
    ActiveConnectFailed,
    /// A passive connection arrived from an address other than the control
    /// peer and foreign addresses are not permitted.
    ForeignAddressRejected(SocketAddr),
    /// The TLS handshake on the data connection failed.
    TlsDataHandshakeFailed,
}
