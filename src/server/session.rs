//! Keeps the state of one control connection.

use crate::auth::Authorizer;
use crate::server::chancomms::DataCommand;
use crate::vfs::{VirtualFs, mlsx::Facts};

use std::{
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};
use tokio::sync::{Mutex, mpsc::Sender};
use tokio::task::JoinHandle;

pub type SharedSession<A> = Arc<Mutex<Session<A>>>;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SessionState {
    // Waiting for USER.
    WaitUser,
    // USER was given, waiting for PASS.
    WaitPass,
    // Login complete.
    Authenticated,
}

// The TYPE in effect for data transfers.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TransferType {
    // `TYPE A`: line endings are translated to CRLF on the wire. The RFC 959
    // default.
    Ascii,
    // `TYPE I`: bytes pass through untouched.
    Image,
}

// This is where we keep the state for an FTP session.
pub struct Session<A: Authorizer> {
    pub authorizer: Arc<A>,
    // Present from successful login onwards, rooted at the user's home.
    pub vfs: Option<VirtualFs>,
    pub username: Option<String>,
    pub state: SessionState,
    pub transfer_type: TransferType,
    // Offset set by REST, consumed by the next RETR/STOR/APPE.
    pub start_pos: u64,
    // Source path set by RNFR, consumed by RNTO.
    pub rename_from: Option<PathBuf>,
    pub failed_logins: u32,
    // True once the control channel runs over TLS.
    pub cmd_tls: bool,
    // RFC 4217: PBSZ 0 must precede PROT.
    pub pbsz_seen: bool,
    // PROT P: wrap data connections in TLS.
    pub prot_private: bool,
    // After EPSV ALL only EPSV may open data connections.
    pub epsv_all: bool,
    // QUIT was seen; close once any running transfer finishes.
    pub closing: bool,
    // AUTH was accepted; the control loop performs the TLS handshake right
    // after sending the 234 reply.
    pub upgrade_tls_requested: bool,
    pub utf8_on: bool,
    pub mlst_facts: Facts,
    // At most one data channel: these all belong to the current one.
    pub data_cmd_tx: Option<Sender<DataCommand>>,
    pub data_abort_tx: Option<Sender<()>>,
    pub data_task: Option<JoinHandle<()>>,
    pub data_connected: Arc<AtomicBool>,
    pub data_bytes: Arc<AtomicU64>,
    // A DataCommand is with the data channel and has not completed yet.
    pub transfer_active: bool,
    pub trace_id: String,
    pub event_sequence: u64,
}

impl<A: Authorizer> Session<A> {
    pub(super) fn new(authorizer: Arc<A>) -> Self {
        Session {
            authorizer,
            vfs: None,
            username: None,
            state: SessionState::WaitUser,
            transfer_type: TransferType::Ascii,
            start_pos: 0,
            rename_from: None,
            failed_logins: 0,
            cmd_tls: false,
            pbsz_seen: false,
            prot_private: false,
            epsv_all: false,
            closing: false,
            upgrade_tls_requested: false,
            utf8_on: true,
            mlst_facts: Facts::default(),
            data_cmd_tx: None,
            data_abort_tx: None,
            data_task: None,
            data_connected: Arc::new(AtomicBool::new(false)),
            data_bytes: Arc::new(AtomicU64::new(0)),
            transfer_active: false,
            trace_id: uuid::Uuid::new_v4().simple().to_string(),
            event_sequence: 0,
        }
    }

    pub fn logged_in(&self) -> bool {
        self.state == SessionState::Authenticated
    }

    pub fn username_or_empty(&self) -> String {
        self.username.clone().unwrap_or_default()
    }

    pub fn next_sequence_number(&mut self) -> u64 {
        self.event_sequence += 1;
        self.event_sequence
    }

    // Tears down the pending dispatcher or live data channel, if any. Called
    // when a new PASV/PORT replaces the old one and on session close.
    pub fn clear_data_channel(&mut self) {
        if let Some(task) = self.data_task.take() {
            task.abort();
        }
        self.data_cmd_tx = None;
        self.data_abort_tx = None;
        self.data_connected = Arc::new(AtomicBool::new(false));
        self.data_bytes = Arc::new(AtomicU64::new(0));
        self.transfer_active = false;
    }

    // Installs a freshly spawned data channel. The caller must have called
    // clear_data_channel() before spawning, so that the byte counter and
    // connected flag handed to the new task are this session's current ones.
    pub fn set_data_channel(&mut self, spawned: crate::server::dispatcher::SpawnedDataChannel) {
        self.data_cmd_tx = Some(spawned.cmd_tx);
        self.data_abort_tx = Some(spawned.abort_tx);
        self.data_task = Some(spawned.task);
    }

    pub fn data_connected(&self) -> bool {
        self.data_connected.load(Ordering::Relaxed)
    }

    // REIN, and USER given mid-session: forget everything about the current
    // login but keep the connection (and its TLS state).
    pub fn flush_account(&mut self) {
        self.clear_data_channel();
        self.vfs = None;
        self.username = None;
        self.state = SessionState::WaitUser;
        self.transfer_type = TransferType::Ascii;
        self.start_pos = 0;
        self.rename_from = None;
    }
}

impl<A: Authorizer> Drop for Session<A> {
    fn drop(&mut self) {
        // A dropped session must not leave a listener or transfer behind.
        self.clear_data_channel();
    }
}

impl<A: Authorizer> std::fmt::Debug for Session<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("username", &self.username)
            .field("state", &self.state)
            .field("transfer_type", &self.transfer_type)
            .field("cmd_tls", &self.cmd_tls)
            .field("prot_private", &self.prot_private)
            .field("trace_id", &self.trace_id)
            .finish()
    }
}
