use super::error::ParseErrorKind;
use super::parse;
use crate::options::Encoding;
use crate::server::controlchan::command::Command;
use crate::server::controlchan::commands::{AuthParam, ModeParam, Opt, ProtParam, SiteParam, StruParam, TypeParam};

use pretty_assertions::assert_eq;

fn parse_utf8(line: &str) -> Result<Command, ParseErrorKind> {
    parse(line.as_bytes(), Encoding::Utf8).map_err(|e| e.kind().clone())
}

#[test]
fn user_and_pass() {
    assert_eq!(parse_utf8("USER alice\r\n"), Ok(Command::User { username: "alice".into() }));
    assert_eq!(parse_utf8("user alice\r\n"), Ok(Command::User { username: "alice".into() }));
    assert_eq!(parse_utf8("USER\r\n"), Err(ParseErrorKind::InvalidCommand));
    // An empty password is allowed.
    assert_eq!(parse_utf8("PASS\r\n"), Ok(Command::Pass { password: "".into() }));
    assert_eq!(parse_utf8("PASS s3cret\r\n"), Ok(Command::Pass { password: "s3cret".into() }));
}

#[test]
fn verbs_are_case_insensitive_arguments_are_not() {
    assert_eq!(parse_utf8("cwd Mixed/Case\r\n"), Ok(Command::Cwd { path: "Mixed/Case".into() }));
}

#[test]
fn bare_commands_reject_arguments() {
    assert_eq!(parse_utf8("NOOP\r\n"), Ok(Command::Noop));
    assert_eq!(parse_utf8("NOOP please\r\n"), Err(ParseErrorKind::InvalidCommand));
    assert_eq!(parse_utf8("PASV x\r\n"), Err(ParseErrorKind::InvalidCommand));
    assert_eq!(parse_utf8("QUIT\r\n"), Ok(Command::Quit));
}

#[test]
fn type_params() {
    assert_eq!(
        parse_utf8("TYPE A\r\n"),
        Ok(Command::Type {
            transfer_type: TypeParam::Ascii
        })
    );
    assert_eq!(
        parse_utf8("TYPE I\r\n"),
        Ok(Command::Type {
            transfer_type: TypeParam::Image
        })
    );
    assert_eq!(
        parse_utf8("TYPE L 8\r\n"),
        Ok(Command::Type {
            transfer_type: TypeParam::Image
        })
    );
    assert_eq!(parse_utf8("TYPE E\r\n"), Err(ParseErrorKind::InvalidCommand));
}

#[test]
fn stru_and_mode() {
    assert_eq!(parse_utf8("STRU F\r\n"), Ok(Command::Stru { structure: StruParam::File }));
    assert_eq!(parse_utf8("MODE S\r\n"), Ok(Command::Mode { mode: ModeParam::Stream }));
    assert_eq!(parse_utf8("STRU X\r\n"), Err(ParseErrorKind::InvalidCommand));
}

#[test]
fn rest_offset() {
    assert_eq!(parse_utf8("REST 1024\r\n"), Ok(Command::Rest { offset: 1024 }));
    assert_eq!(parse_utf8("REST many\r\n"), Err(ParseErrorKind::InvalidCommand));
}

#[test]
fn obsolete_x_aliases() {
    assert_eq!(parse_utf8("XPWD\r\n"), Ok(Command::Pwd));
    assert_eq!(parse_utf8("XCWD sub\r\n"), Ok(Command::Cwd { path: "sub".into() }));
    assert_eq!(parse_utf8("XCUP\r\n"), Ok(Command::Cdup));
    assert_eq!(parse_utf8("XMKD d\r\n"), Ok(Command::Mkd { path: "d".into() }));
    assert_eq!(parse_utf8("XRMD d\r\n"), Ok(Command::Rmd { path: "d".into() }));
}

#[test]
fn list_options_are_ignored() {
    assert_eq!(parse_utf8("LIST\r\n"), Ok(Command::List { path: None }));
    assert_eq!(parse_utf8("LIST -la\r\n"), Ok(Command::List { path: None }));
    assert_eq!(parse_utf8("LIST -la sub\r\n"), Ok(Command::List { path: Some("sub".into()) }));
}

#[test]
fn epsv_argument() {
    assert_eq!(parse_utf8("EPSV\r\n"), Ok(Command::Epsv { arg: None }));
    assert_eq!(parse_utf8("EPSV ALL\r\n"), Ok(Command::Epsv { arg: Some("ALL".into()) }));
    assert_eq!(parse_utf8("epsv all\r\n"), Ok(Command::Epsv { arg: Some("ALL".into()) }));
}

#[test]
fn site_subcommands() {
    assert_eq!(
        parse_utf8("SITE CHMOD 644 a.txt\r\n"),
        Ok(Command::Site {
            param: SiteParam::Chmod {
                mode: "644".into(),
                path: "a.txt".into()
            }
        })
    );
    assert_eq!(parse_utf8("SITE HELP\r\n"), Ok(Command::Site { param: SiteParam::Help { target: None } }));
    assert_eq!(
        parse_utf8("SITE EXEC rm -rf\r\n"),
        Ok(Command::Site {
            param: SiteParam::Unknown { command: "EXEC".into() }
        })
    );
    assert_eq!(parse_utf8("SITE CHMOD 644\r\n"), Err(ParseErrorKind::InvalidCommand));
}

#[test]
fn mfmt_wants_a_14_digit_timeval() {
    assert_eq!(
        parse_utf8("MFMT 20250301123000 f.txt\r\n"),
        Ok(Command::Mfmt {
            timeval: "20250301123000".into(),
            path: "f.txt".into()
        })
    );
    assert_eq!(parse_utf8("MFMT 2025 f.txt\r\n"), Err(ParseErrorKind::InvalidCommand));
}

#[test]
fn tls_commands() {
    assert_eq!(parse_utf8("AUTH TLS\r\n"), Ok(Command::Auth { protocol: AuthParam::Tls }));
    assert_eq!(parse_utf8("AUTH SSL\r\n"), Ok(Command::Auth { protocol: AuthParam::Ssl }));
    assert_eq!(parse_utf8("AUTH KERBEROS\r\n"), Err(ParseErrorKind::InvalidCommand));
    assert_eq!(parse_utf8("PBSZ 0\r\n"), Ok(Command::Pbsz { size: "0".into() }));
    assert_eq!(parse_utf8("PROT P\r\n"), Ok(Command::Prot { param: ProtParam::Private }));
    assert_eq!(parse_utf8("PROT Z\r\n"), Err(ParseErrorKind::InvalidCommand));
}

#[test]
fn opts_variants() {
    assert_eq!(parse_utf8("OPTS UTF8 ON\r\n"), Ok(Command::Opts { option: Opt::Utf8 { on: true } }));
    assert_eq!(parse_utf8("OPTS UTF8 OFF\r\n"), Ok(Command::Opts { option: Opt::Utf8 { on: false } }));
    assert_eq!(
        parse_utf8("OPTS MLST type;size;\r\n"),
        Ok(Command::Opts {
            option: Opt::MlstFacts { facts: "type;size;".into() }
        })
    );
    assert_eq!(parse_utf8("OPTS BOGUS\r\n"), Err(ParseErrorKind::InvalidCommand));
}

#[test]
fn unknown_verb_is_reported() {
    assert_eq!(
        parse_utf8("MAKEMEASANDWICH\r\n"),
        Err(ParseErrorKind::UnknownCommand {
            command: "MAKEMEASANDWICH".into()
        })
    );
}

#[test]
fn utf8_decode_errors_are_surfaced() {
    let line = [b'C', b'W', b'D', b' ', 0xff, 0xfe, b'\r', b'\n'];
    assert_eq!(
        parse(&line[..], Encoding::Utf8).map_err(|e| e.kind().clone()),
        Err(ParseErrorKind::InvalidEncoding)
    );
    // The same bytes are fine in Latin-1.
    assert!(parse(&line[..], Encoding::Latin1).is_ok());
}

#[test]
fn trailing_whitespace_is_tolerated() {
    assert_eq!(parse_utf8("NOOP\n"), Ok(Command::Noop));
    assert_eq!(parse_utf8("RETR file with spaces.txt\r\n"), Ok(Command::Retr { path: "file with spaces.txt".into() }));
}
