//! One module per FTP verb, each implementing the
//! [`CommandHandler`](super::handler::CommandHandler) trait, plus the static
//! command table that drives HELP and the authentication gate.

mod abor;
mod allo;
mod appe;
mod auth;
mod cdup;
mod cwd;
mod dele;
mod eprt;
mod epsv;
mod feat;
mod help;
mod list;
mod mdtm;
mod mfmt;
mod mkd;
mod mlsd;
mod mlst;
mod mode;
mod nlst;
mod noop;
mod opts;
mod pass;
mod pasv;
mod pbsz;
mod port;
mod prot;
mod pwd;
mod quit;
mod rein;
mod rest;
mod retr;
mod rmd;
mod rnfr;
mod rnto;
mod site;
mod size;
mod stat;
mod stor;
mod stou;
mod stru;
mod syst;
mod type_;
mod user;

pub use abor::Abor;
pub use allo::Allo;
pub use appe::Appe;
pub use auth::Auth;
pub use cdup::Cdup;
pub use cwd::Cwd;
pub use dele::Dele;
pub use eprt::Eprt;
pub use epsv::Epsv;
pub use feat::Feat;
pub use help::Help;
pub use list::List;
pub use mdtm::Mdtm;
pub use mfmt::Mfmt;
pub use mkd::Mkd;
pub use mlsd::Mlsd;
pub use mlst::Mlst;
pub use mode::Mode;
pub use nlst::Nlst;
pub use noop::Noop;
pub use opts::Opts;
pub use pass::Pass;
pub use pasv::Pasv;
pub use pbsz::Pbsz;
pub use port::Port;
pub use prot::Prot;
pub use pwd::Pwd;
pub use quit::Quit;
pub use rein::Rein;
pub use rest::Rest;
pub use retr::Retr;
pub use rmd::Rmd;
pub use rnfr::Rnfr;
pub use rnto::Rnto;
pub use site::Site;
pub use size::Size;
pub use stat::Stat;
pub use stor::Stor;
pub use stou::Stou;
pub use stru::Stru;
pub use syst::Syst;
pub use type_::Type;
pub use user::User;

use crate::auth::{Authorizer, Perm};
use crate::server::controlchan::handler::CommandContext;
use crate::server::dispatcher::DataChanCtx;
use crate::server::session::Session;
use crate::server::{Reply, ReplyCode};
use crate::vfs;

use lazy_static::lazy_static;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// The AUTH mechanism the client asks for.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum AuthParam {
    /// `AUTH TLS`, RFC 4217.
    Tls,
    /// `AUTH SSL`, the pre-standard alias; treated the same as TLS.
    Ssl,
}

/// The data channel protection level of the PROT command.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ProtParam {
    /// `PROT C`: plaintext data connections.
    Clear,
    /// `PROT S`: integrity only. Not supported.
    Safe,
    /// `PROT E`: confidentiality only. Not supported.
    Confidential,
    /// `PROT P`: TLS-wrapped data connections.
    Private,
}

/// The STRU parameter. Only `File` is supported.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum StruParam {
    /// "Regular" file structure.
    File,
    /// Files are structured as records. Unsupported.
    Record,
    /// Files are structured as pages. Unsupported.
    Page,
}

/// The MODE parameter. Only `Stream` is supported.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ModeParam {
    /// Data is sent in a continuous stream of bytes.
    Stream,
    /// Data is sent as a series of blocks preceded by one or more header
    /// bytes. Unsupported.
    Block,
    /// Some round-about way of sending compressed data. Unsupported.
    Compressed,
}

/// The TYPE parameter: the representation type of transferred data.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TypeParam {
    /// `TYPE A`: line endings become CRLF on the wire.
    Ascii,
    /// `TYPE I`: verbatim bytes.
    Image,
}

/// The option the client wants to set with OPTS.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Opt {
    /// Switch UTF-8 path handling on or off.
    Utf8 {
        /// Whether UTF8 should be on or off.
        on: bool,
    },
    /// Select the facts MLST/MLSD should emit.
    MlstFacts {
        /// The `fact;fact;…` selection string.
        facts: String,
    },
}

/// A SITE sub-command.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum SiteParam {
    /// `SITE HELP [cmd]`.
    Help {
        /// The SITE sub-command help is wanted for.
        target: Option<String>,
    },
    /// `SITE CHMOD mode path`.
    Chmod {
        /// The octal mode string.
        mode: String,
        /// The FTP path to change.
        path: String,
    },
    /// Anything else.
    Unknown {
        /// The sub-command we did not recognize.
        command: String,
    },
}

// One row of the command table: the permission letter guarding the verb, the
// authentication requirement, and the HELP text.
pub(crate) struct CmdSpec {
    pub perm: Option<Perm>,
    pub needs_auth: bool,
    pub help: &'static str,
}

lazy_static! {
    // The verbs this server understands. Only USER, PASS, QUIT, AUTH, FEAT,
    // HELP and NOOP are honored before login.
    pub(crate) static ref PROTO_CMDS: BTreeMap<&'static str, CmdSpec> = {
        let mut t = BTreeMap::new();
        let mut add = |verb, perm, needs_auth, help| {
            t.insert(verb, CmdSpec { perm, needs_auth, help });
        };
        add("ABOR", None, true, "Syntax: ABOR (abort transfer).");
        add("ALLO", None, true, "Syntax: ALLO <SP> bytes (noop; allocate storage).");
        add("APPE", Some(Perm::APPEND), true, "Syntax: APPE <SP> file-name (append data to file).");
        add("AUTH", None, false, "Syntax: AUTH <SP> TLS|SSL (set up secure control channel).");
        add("CDUP", Some(Perm::CHANGE_DIR), true, "Syntax: CDUP (go to parent directory).");
        add("CWD", Some(Perm::CHANGE_DIR), true, "Syntax: CWD [<SP> dir-name] (change working directory).");
        add("DELE", Some(Perm::DELETE), true, "Syntax: DELE <SP> file-name (delete file).");
        add("EPRT", None, true, "Syntax: EPRT <SP> |proto|ip|port| (extended active mode).");
        add("EPSV", None, true, "Syntax: EPSV [<SP> proto/\"ALL\"] (extended passive mode).");
        add("FEAT", None, false, "Syntax: FEAT (list all new features supported).");
        add("HELP", None, false, "Syntax: HELP [<SP> cmd] (show help).");
        add("LIST", Some(Perm::LIST), true, "Syntax: LIST [<SP> path] (list files).");
        add("MDTM", Some(Perm::LIST), true, "Syntax: MDTM [<SP> path] (file last modification time).");
        add("MFMT", Some(Perm::MFMT), true, "Syntax: MFMT <SP> timeval <SP> path (file update last modification time).");
        add("MKD", Some(Perm::MKDIR), true, "Syntax: MKD <SP> path (create directory).");
        add("MLSD", Some(Perm::LIST), true, "Syntax: MLSD [<SP> path] (list directory).");
        add("MLST", Some(Perm::LIST), true, "Syntax: MLST [<SP> path] (show information about path).");
        add("MODE", None, true, "Syntax: MODE <SP> mode (noop; set data transfer mode).");
        add("NLST", Some(Perm::LIST), true, "Syntax: NLST [<SP> path] (list path in a compact form).");
        add("NOOP", None, false, "Syntax: NOOP (just do nothing).");
        add("OPTS", None, true, "Syntax: OPTS <SP> cmd [<SP> option] (set option for command).");
        add("PASS", None, false, "Syntax: PASS [<SP> password] (set user password).");
        add("PASV", None, true, "Syntax: PASV (open passive data connection).");
        add("PBSZ", None, true, "Syntax: PBSZ <SP> 0 (negotiate TLS buffer size).");
        add("PORT", None, true, "Syntax: PORT <SP> h,h,h,h,p,p (open active data connection).");
        add("PROT", None, true, "Syntax: PROT <SP> C|P (set up un/secure data channel).");
        add("PWD", None, true, "Syntax: PWD (get current working directory).");
        add("QUIT", None, false, "Syntax: QUIT (quit current session).");
        add("REIN", None, true, "Syntax: REIN (flush account).");
        add("REST", None, true, "Syntax: REST <SP> offset (set file offset).");
        add("RETR", Some(Perm::RETRIEVE), true, "Syntax: RETR <SP> file-name (retrieve a file).");
        add("RMD", Some(Perm::DELETE), true, "Syntax: RMD <SP> dir-name (remove directory).");
        add("RNFR", Some(Perm::RENAME), true, "Syntax: RNFR <SP> file-name (rename (source name)).");
        add("RNTO", Some(Perm::RENAME), true, "Syntax: RNTO <SP> file-name (rename (destination name)).");
        add("SITE", None, true, "Syntax: SITE <SP> site-command (execute SITE command).");
        add("SIZE", Some(Perm::LIST), true, "Syntax: SIZE <SP> file-name (get file size).");
        add("STAT", Some(Perm::LIST), true, "Syntax: STAT [<SP> path name] (server stats [list files]).");
        add("STOR", Some(Perm::STORE), true, "Syntax: STOR <SP> file-name (store a file).");
        add("STOU", Some(Perm::STORE), true, "Syntax: STOU [<SP> name] (store a file with a unique name).");
        add("STRU", None, true, "Syntax: STRU <SP> type (noop; set file structure).");
        add("SYST", None, true, "Syntax: SYST (get operating system type).");
        add("TYPE", None, true, "Syntax: TYPE <SP> [A | I] (set transfer type).");
        add("USER", None, false, "Syntax: USER <SP> user-name (set username).");
        t
    };
}

// The reply for a missing permission letter.
pub(crate) fn not_enough_privileges() -> Reply {
    Reply::new(ReplyCode::FileError, "Not enough privileges.")
}

// The reply for a path that could not be resolved inside the user's home.
// All resolution failures collapse into this one to avoid leaking what
// exists outside the tree.
pub(crate) fn no_such_file(ftp_path: &str) -> Reply {
    Reply::new_with_string(ReplyCode::FileError, format!("{ftp_path}: No such file or directory."))
}

// Maps a filesystem error onto the reply the client gets to see.
pub(crate) fn fs_error_reply(err: &vfs::Error, ftp_path: &str) -> Reply {
    use vfs::ErrorKind::*;
    match err.kind() {
        TransientFileNotAvailable => Reply::new(ReplyCode::TransientFileError, "Transient file not available."),
        PermanentFileNotAvailable | PermanentDirectoryNotAvailable => no_such_file(ftp_path),
        PermanentDirectoryNotEmpty => Reply::new(ReplyCode::FileError, "The directory is not empty."),
        PermissionDenied => Reply::new(ReplyCode::FileError, "Permission denied."),
        ConnectionClosed => Reply::new(ReplyCode::ConnectionClosed, "Connection closed; transfer aborted."),
        LocalError => Reply::new(ReplyCode::LocalError, "Local processing error."),
        InsufficientStorageSpaceError => Reply::new(ReplyCode::OutOfSpace, "Insufficient storage space."),
        ExceededStorageAllocationError => Reply::new(ReplyCode::ExceededStorageAllocation, "Exceeded storage allocation."),
        FileNameNotAllowedError => Reply::new(ReplyCode::BadFileName, "File name not allowed."),
    }
}

// Resolves an FTP path argument against the session's virtual filesystem and
// checks containment. The Ok value is the host path plus the normalized FTP
// path used in replies and events.
pub(crate) async fn resolve_path<A: Authorizer>(session: &Session<A>, arg: &str) -> Result<(PathBuf, String), Reply> {
    let vfs = session.vfs.as_ref().ok_or_else(|| Reply::new(ReplyCode::NotLoggedIn, "Log in with USER and PASS first."))?;
    let host_path = vfs.ftp2fs(arg);
    if !vfs.validpath(&host_path).await {
        return Err(no_such_file(&vfs.ftpnorm(arg).display().to_string()));
    }
    let ftp_path = vfs.ftpnorm(arg).display().to_string();
    Ok((host_path, ftp_path))
}

// Permission check against the authorizer, on an already resolved host path.
pub(crate) fn check_perm<A: Authorizer>(session: &Session<A>, perm: Perm, host_path: &std::path::Path) -> Result<(), Reply> {
    let username = session.username.as_deref().unwrap_or("");
    if session.authorizer.has_perm(username, perm, Some(host_path)) {
        Ok(())
    } else {
        Err(not_enough_privileges())
    }
}

// The preliminary reply for a transfer command: 125 when the data connection
// is already up, 150 when it is still being established.
pub(crate) fn preliminary_reply<A: Authorizer>(session: &Session<A>) -> Reply {
    if session.data_connected() {
        Reply::new(ReplyCode::DataConnectionAlreadyOpen, "Data connection already open. Transfer starting.")
    } else {
        Reply::new(ReplyCode::FileStatusOkay, "File status okay. About to open data connection.")
    }
}

// Assembles the context a dispatcher task needs, from the command context.
pub(crate) fn data_chan_ctx<A: Authorizer>(args: &CommandContext<A>) -> DataChanCtx<A> {
    DataChanCtx {
        session: args.session.clone(),
        logger: args.logger.clone(),
        msg_tx: args.tx_control_chan.clone(),
        tls_config: args.opts.ftps_config.config(),
        permit_foreign_addresses: args.opts.permit_foreign_addresses,
        control_peer_ip: args.peer_addr.ip(),
        establish_timeout: args.opts.establish_timeout,
        stall_timeout: args.opts.data_stall_timeout,
        read_limit: args.opts.read_limit,
        write_limit: args.opts.write_limit,
        use_sendfile: args.opts.use_sendfile,
    }
}
