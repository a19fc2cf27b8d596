use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

/// An event pertaining to a client's presence: connection, login and logout
/// actions. Instances of these are passed to a [`PresenceListener`]. To
/// identify the corresponding user or session see the [`EventMeta`] struct.
#[derive(Debug, Clone)]
pub enum PresenceEvent {
    /// A control connection was accepted.
    Connected,
    /// The control connection went away, for whatever reason.
    Disconnected,
    /// The user logged in successfully.
    LoggedIn,
    /// A login attempt failed.
    LoginFailed {
        /// The password that was offered.
        password: String,
    },
    /// The user logged out (QUIT or REIN).
    LoggedOut,
}

/// An event signalling a change in data made through a user's session. To
/// identify the corresponding user or session see the [`EventMeta`] struct.
#[derive(Debug, Clone)]
pub enum DataEvent {
    /// A download (RETR) finished successfully.
    FileSent {
        /// The FTP path of the file that was sent.
        path: String,
        /// The number of bytes transferred to the client.
        bytes: u64,
    },
    /// An upload (STOR, STOU, APPE) finished successfully.
    FileReceived {
        /// The FTP path of the file that was stored.
        path: String,
        /// The number of bytes stored.
        bytes: u64,
    },
    /// A download was cut short by an abort, disconnect or timeout.
    IncompleteFileSent {
        /// The FTP path of the file that was being sent.
        path: String,
        /// The number of bytes that were transferred before the cut.
        bytes: u64,
    },
    /// An upload was cut short by an abort, disconnect or timeout.
    IncompleteFileReceived {
        /// The FTP path of the file that was being stored.
        path: String,
        /// The number of bytes that made it to disk.
        bytes: u64,
    },
    /// A DELE command finished successfully.
    Deleted {
        /// The FTP path of the file that was deleted.
        path: String,
    },
    /// A MKD command finished successfully.
    MadeDir {
        /// The FTP path of the directory that was created.
        path: String,
    },
    /// A RMD command finished successfully.
    RemovedDir {
        /// The FTP path of the directory that was removed.
        path: String,
    },
    /// A RNFR/RNTO sequence finished successfully. This can be for a file or
    /// a directory.
    Renamed {
        /// The original FTP path.
        from: String,
        /// The new FTP path.
        to: String,
    },
}

/// Metadata identifying the user and session an event pertains to. A sequence
/// number is included to allow ordering in systems where event ordering is
/// not otherwise guaranteed.
#[derive(Debug, Clone)]
pub struct EventMeta {
    /// The user this event pertains to. Empty before login. A user may have
    /// more than one connection or session.
    pub username: String,
    /// Identifies a single session pertaining to a connected client.
    pub trace_id: String,
    /// The event sequence number, incremented per session.
    pub sequence_number: u64,
}

/// A listener for [`DataEvent`]s. Implementations can be passed to
/// [`ServerBuilder::notify_data`](crate::ServerBuilder::notify_data) in order
/// to receive notifications.
#[async_trait]
pub trait DataListener: Sync + Send + Debug {
    /// Called after the event happened. Event metadata is also passed to
    /// allow pinpointing the user session for which it happened.
    async fn receive_data_event(&self, e: DataEvent, m: EventMeta);
}

/// A listener for [`PresenceEvent`]s. Implementations can be passed to
/// [`ServerBuilder::notify_presence`](crate::ServerBuilder::notify_presence)
/// in order to receive notifications.
#[async_trait]
pub trait PresenceListener: Sync + Send + Debug {
    /// Called after the event happened. Event metadata is also passed to
    /// allow pinpointing the user session for which it happened.
    async fn receive_presence_event(&self, e: PresenceEvent, m: EventMeta);
}

#[async_trait]
impl DataListener for Arc<dyn DataListener> {
    async fn receive_data_event(&self, e: DataEvent, m: EventMeta) {
        self.as_ref().receive_data_event(e, m).await
    }
}

#[async_trait]
impl PresenceListener for Arc<dyn PresenceListener> {
    async fn receive_presence_event(&self, e: PresenceEvent, m: EventMeta) {
        self.as_ref().receive_presence_event(e, m).await
    }
}
