use crate::server::controlchan::commands::{AuthParam, ModeParam, Opt, ProtParam, SiteParam, StruParam, TypeParam};
use crate::server::password::Password;

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Command {
    User {
        /// The username the client wants to log in as.
        username: String,
    },
    Pass {
        /// The password belonging to the preceding USER.
        password: Password,
    },
    Quit,
    Rein,
    Noop,
    Syst,
    Help {
        /// The verb the client wants help on, if any.
        target: Option<String>,
    },
    Stat {
        /// Without a path this is a server status request; with one it is a
        /// listing over the control channel.
        path: Option<String>,
    },
    Feat,
    Opts {
        /// The option the client wants to set
        option: Opt,
    },
    Site {
        /// The SITE sub-command.
        param: SiteParam,
    },
    Type {
        /// The representation type, ASCII or Image.
        transfer_type: TypeParam,
    },
    Stru {
        /// The structure to which the client would like to switch. Only the
        /// `File` structure is supported.
        structure: StruParam,
    },
    Mode {
        /// The transfer mode to which the client would like to switch. Only
        /// the `Stream` mode is supported.
        mode: ModeParam,
    },
    Allo,
    Rest {
        /// Where to resume the next transfer from.
        offset: u64,
    },
    Abor,
    Pwd,
    Cwd {
        /// The FTP path the client would like to change directory to.
        path: String,
    },
    Cdup,
    Mkd {
        /// The FTP path to the directory the client wants to create.
        path: String,
    },
    Rmd {
        /// The FTP path to the directory the client wants removed.
        path: String,
    },
    Dele {
        /// The FTP path to the file the client wants removed.
        path: String,
    },
    Rnfr {
        /// The file or directory to be renamed.
        path: String,
    },
    Rnto {
        /// The new name.
        path: String,
    },
    Pasv,
    Epsv {
        /// `ALL`, a protocol number, or nothing.
        arg: Option<String>,
    },
    Port {
        /// The h1,h2,h3,h4,p1,p2 endpoint string.
        addr: String,
    },
    Eprt {
        /// The |proto|ip|port| endpoint string.
        addr: String,
    },
    List {
        /// The FTP path the client wants listed; the working directory if
        /// absent.
        path: Option<String>,
    },
    Nlst {
        /// The FTP path the client wants listed; the working directory if
        /// absent.
        path: Option<String>,
    },
    Mlsd {
        /// The FTP path the client wants listed; the working directory if
        /// absent.
        path: Option<String>,
    },
    Mlst {
        /// The FTP path to report facts on; the working directory if absent.
        path: Option<String>,
    },
    Retr {
        /// The FTP path to the file the client would like to retrieve.
        path: String,
    },
    Stor {
        /// The FTP path to the file the client would like to store.
        path: String,
    },
    Stou,
    Appe {
        /// The FTP path to the file the client would like to append to.
        path: String,
    },
    Size {
        /// The FTP path to the file whose size is requested.
        path: String,
    },
    Mdtm {
        /// The FTP path to the file whose modification time is requested.
        path: String,
    },
    Mfmt {
        /// The new modification time as YYYYMMDDHHMMSS.
        timeval: String,
        /// The FTP path to the file to touch.
        path: String,
    },
    Auth {
        protocol: AuthParam,
    },
    Pbsz {
        size: String,
    },
    Prot {
        param: ProtParam,
    },
}

impl Command {
    // The canonical verb, used for the command table lookups (HELP, the
    // authentication gate) and for logging.
    pub fn verb(&self) -> &'static str {
        match self {
            Command::User { .. } => "USER",
            Command::Pass { .. } => "PASS",
            Command::Quit => "QUIT",
            Command::Rein => "REIN",
            Command::Noop => "NOOP",
            Command::Syst => "SYST",
            Command::Help { .. } => "HELP",
            Command::Stat { .. } => "STAT",
            Command::Feat => "FEAT",
            Command::Opts { .. } => "OPTS",
            Command::Site { .. } => "SITE",
            Command::Type { .. } => "TYPE",
            Command::Stru { .. } => "STRU",
            Command::Mode { .. } => "MODE",
            Command::Allo => "ALLO",
            Command::Rest { .. } => "REST",
            Command::Abor => "ABOR",
            Command::Pwd => "PWD",
            Command::Cwd { .. } => "CWD",
            Command::Cdup => "CDUP",
            Command::Mkd { .. } => "MKD",
            Command::Rmd { .. } => "RMD",
            Command::Dele { .. } => "DELE",
            Command::Rnfr { .. } => "RNFR",
            Command::Rnto { .. } => "RNTO",
            Command::Pasv => "PASV",
            Command::Epsv { .. } => "EPSV",
            Command::Port { .. } => "PORT",
            Command::Eprt { .. } => "EPRT",
            Command::List { .. } => "LIST",
            Command::Nlst { .. } => "NLST",
            Command::Mlsd { .. } => "MLSD",
            Command::Mlst { .. } => "MLST",
            Command::Retr { .. } => "RETR",
            Command::Stor { .. } => "STOR",
            Command::Stou => "STOU",
            Command::Appe { .. } => "APPE",
            Command::Size { .. } => "SIZE",
            Command::Mdtm { .. } => "MDTM",
            Command::Mfmt { .. } => "MFMT",
            Command::Auth { .. } => "AUTH",
            Command::Pbsz { .. } => "PBSZ",
            Command::Prot { .. } => "PROT",
        }
    }
}
