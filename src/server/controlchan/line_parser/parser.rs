use super::error::{ParseErrorKind, Result};
use crate::options::Encoding;
use crate::server::controlchan::{
    command::Command,
    commands::{AuthParam, ModeParam, Opt, ProtParam, SiteParam, StruParam, TypeParam},
};
use crate::server::password::Password;

/// Parse a raw command line (CRLF included or not) into a [`Command`].
///
/// [`Command`]: ../command/enum.Command.html
#[allow(clippy::cognitive_complexity)]
pub fn parse<T: AsRef<[u8]>>(line: T, encoding: Encoding) -> Result<Command> {
    let line = decode(line.as_ref(), encoding)?;
    let line = line.trim_end_matches(['\r', '\n']);
    let (verb, params) = match line.split_once(' ') {
        Some((verb, params)) => (verb.to_ascii_uppercase(), params.trim()),
        None => (line.to_ascii_uppercase(), ""),
    };

    let cmd = match verb.as_str() {
        "USER" => Command::User {
            username: required(params)?.to_string(),
        },
        "PASS" => Command::Pass {
            // An empty password is legal (and common for anonymous).
            password: Password::new(params.to_string().into()),
        },
        "QUIT" => {
            no_arguments(params)?;
            Command::Quit
        }
        "REIN" => {
            no_arguments(params)?;
            Command::Rein
        }
        "NOOP" => {
            // NOOP params are prohibited
            no_arguments(params)?;
            Command::Noop
        }
        "SYST" => {
            no_arguments(params)?;
            Command::Syst
        }
        "HELP" => Command::Help {
            target: optional(params).map(|s| s.to_ascii_uppercase()),
        },
        "STAT" => Command::Stat {
            path: optional(params).map(str::to_string),
        },
        "FEAT" => {
            no_arguments(params)?;
            Command::Feat
        }
        "OPTS" => {
            let (name, value) = match required(params)?.split_once(' ') {
                Some((name, value)) => (name.to_ascii_uppercase(), value.trim()),
                None => (params.to_ascii_uppercase(), ""),
            };
            match name.as_str() {
                "UTF8" => match value.to_ascii_uppercase().as_str() {
                    "ON" => Command::Opts { option: Opt::Utf8 { on: true } },
                    "OFF" => Command::Opts { option: Opt::Utf8 { on: false } },
                    _ => return Err(ParseErrorKind::InvalidCommand.into()),
                },
                "MLST" => Command::Opts {
                    option: Opt::MlstFacts { facts: value.to_string() },
                },
                _ => return Err(ParseErrorKind::InvalidCommand.into()),
            }
        }
        "SITE" => {
            let (sub, rest) = match required(params)?.split_once(' ') {
                Some((sub, rest)) => (sub.to_ascii_uppercase(), rest.trim()),
                None => (params.to_ascii_uppercase(), ""),
            };
            match sub.as_str() {
                "HELP" => Command::Site {
                    param: SiteParam::Help {
                        target: optional(rest).map(|s| s.to_ascii_uppercase()),
                    },
                },
                "CHMOD" => {
                    let (mode, path) = required(rest)?.split_once(' ').ok_or(ParseErrorKind::InvalidCommand)?;
                    Command::Site {
                        param: SiteParam::Chmod {
                            mode: mode.to_string(),
                            path: path.trim().to_string(),
                        },
                    }
                }
                other => Command::Site {
                    param: SiteParam::Unknown { command: other.to_string() },
                },
            }
        }
        "TYPE" => {
            // Accept the optional format specifier forms from RFC 959:
            // "A N" means plain ASCII, "L 8" is how some clients spell binary.
            match required(params)?.to_ascii_uppercase().as_str() {
                "A" | "A N" => Command::Type {
                    transfer_type: TypeParam::Ascii,
                },
                "I" | "L 8" => Command::Type {
                    transfer_type: TypeParam::Image,
                },
                _ => return Err(ParseErrorKind::InvalidCommand.into()),
            }
        }
        "STRU" => match required(params)?.to_ascii_uppercase().as_str() {
            "F" => Command::Stru { structure: StruParam::File },
            "R" => Command::Stru { structure: StruParam::Record },
            "P" => Command::Stru { structure: StruParam::Page },
            _ => return Err(ParseErrorKind::InvalidCommand.into()),
        },
        "MODE" => match required(params)?.to_ascii_uppercase().as_str() {
            "S" => Command::Mode { mode: ModeParam::Stream },
            "B" => Command::Mode { mode: ModeParam::Block },
            "C" => Command::Mode { mode: ModeParam::Compressed },
            _ => return Err(ParseErrorKind::InvalidCommand.into()),
        },
        "ALLO" => {
            // ALLO takes an optional size argument but we regard it as a
            // no-op either way.
            Command::Allo
        }
        "REST" => {
            let offset = required(params)?.parse::<u64>().map_err(|_| ParseErrorKind::InvalidCommand)?;
            Command::Rest { offset }
        }
        "ABOR" => {
            no_arguments(params)?;
            Command::Abor
        }
        "PWD" | "XPWD" => {
            no_arguments(params)?;
            Command::Pwd
        }
        "CWD" | "XCWD" => Command::Cwd {
            path: required(params)?.to_string(),
        },
        "CDUP" | "XCUP" => {
            no_arguments(params)?;
            Command::Cdup
        }
        "MKD" | "XMKD" => Command::Mkd {
            path: required(params)?.to_string(),
        },
        "RMD" | "XRMD" => Command::Rmd {
            path: required(params)?.to_string(),
        },
        "DELE" => Command::Dele {
            path: required(params)?.to_string(),
        },
        "RNFR" => Command::Rnfr {
            path: required(params)?.to_string(),
        },
        "RNTO" => Command::Rnto {
            path: required(params)?.to_string(),
        },
        "PASV" => {
            no_arguments(params)?;
            Command::Pasv
        }
        "EPSV" => Command::Epsv {
            arg: optional(params).map(|s| s.to_ascii_uppercase()),
        },
        "PORT" => Command::Port {
            addr: required(params)?.to_string(),
        },
        "EPRT" => Command::Eprt {
            addr: required(params)?.to_string(),
        },
        "LIST" => Command::List {
            path: listing_path(params),
        },
        "NLST" => Command::Nlst {
            path: listing_path(params),
        },
        "MLSD" => Command::Mlsd {
            path: optional(params).map(str::to_string),
        },
        "MLST" => Command::Mlst {
            path: optional(params).map(str::to_string),
        },
        "RETR" => Command::Retr {
            path: required(params)?.to_string(),
        },
        "STOR" => Command::Stor {
            path: required(params)?.to_string(),
        },
        "STOU" => {
            // A suggested name may follow but we always generate our own.
            Command::Stou
        }
        "APPE" => Command::Appe {
            path: required(params)?.to_string(),
        },
        "SIZE" => Command::Size {
            path: required(params)?.to_string(),
        },
        "MDTM" => Command::Mdtm {
            path: required(params)?.to_string(),
        },
        "MFMT" => {
            let (timeval, path) = required(params)?.split_once(' ').ok_or(ParseErrorKind::InvalidCommand)?;
            if timeval.len() != 14 || !timeval.bytes().all(|b| b.is_ascii_digit()) {
                return Err(ParseErrorKind::InvalidCommand.into());
            }
            Command::Mfmt {
                timeval: timeval.to_string(),
                path: path.trim().to_string(),
            }
        }
        "AUTH" => match required(params)?.to_ascii_uppercase().as_str() {
            "TLS" | "TLS-C" => Command::Auth { protocol: AuthParam::Tls },
            "SSL" | "TLS-P" => Command::Auth { protocol: AuthParam::Ssl },
            _ => return Err(ParseErrorKind::InvalidCommand.into()),
        },
        "PBSZ" => Command::Pbsz {
            size: required(params)?.to_string(),
        },
        "PROT" => match required(params)?.to_ascii_uppercase().as_str() {
            "C" => Command::Prot { param: ProtParam::Clear },
            "S" => Command::Prot { param: ProtParam::Safe },
            "E" => Command::Prot { param: ProtParam::Confidential },
            "P" => Command::Prot { param: ProtParam::Private },
            _ => return Err(ParseErrorKind::InvalidCommand.into()),
        },
        "" => return Err(ParseErrorKind::InvalidCommand.into()),
        unknown => {
            return Err(ParseErrorKind::UnknownCommand {
                command: unknown.to_string(),
            }
            .into());
        }
    };

    Ok(cmd)
}

fn decode(bytes: &[u8], encoding: Encoding) -> Result<String> {
    match encoding {
        Encoding::Utf8 => std::str::from_utf8(bytes).map(str::to_string).map_err(|_| ParseErrorKind::InvalidEncoding.into()),
        Encoding::Latin1 => Ok(bytes.iter().map(|&b| b as char).collect()),
    }
}

fn required(params: &str) -> Result<&str> {
    if params.is_empty() {
        Err(ParseErrorKind::InvalidCommand.into())
    } else {
        Ok(params)
    }
}

fn optional(params: &str) -> Option<&str> {
    if params.is_empty() { None } else { Some(params) }
}

fn no_arguments(params: &str) -> Result<()> {
    if params.is_empty() {
        Ok(())
    } else {
        Err(ParseErrorKind::InvalidCommand.into())
    }
}

// Clients routinely send `LIST -la`; options are accepted and ignored, the
// first non-option word is the path.
fn listing_path(params: &str) -> Option<String> {
    params
        .split(' ')
        .filter(|s| !s.is_empty() && !s.starts_with('-'))
        .map(str::to_string)
        .next()
}
