use derive_more::Display;
use thiserror::Error;

/// The error type returned by the [parse](super::parse) function.
#[derive(Debug, Error)]
#[error("parse error: {kind}")]
pub struct ParseError {
    kind: ParseErrorKind,
}

/// A list specifying categories of parse errors.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum ParseErrorKind {
    /// The client issued a command we don't know about.
    #[display("unknown command: {}", command)]
    UnknownCommand {
        /// The verb we did not recognize.
        command: String,
    },
    /// The command line could not be decoded with the configured encoding.
    #[display("invalid character encoding in command")]
    InvalidEncoding,
    /// A known command with a missing, forbidden or malformed argument.
    #[display("invalid command (bad argument)")]
    InvalidCommand,
    /// A token outside what the FTP grammar allows on a command line.
    #[display("invalid token: {:?}", token)]
    InvalidToken {
        /// The offending byte.
        token: u8,
    },
}

impl ParseError {
    /// The kind of parse error.
    pub fn kind(&self) -> &ParseErrorKind {
        &self.kind
    }
}

impl From<ParseErrorKind> for ParseError {
    fn from(kind: ParseErrorKind) -> ParseError {
        ParseError { kind }
    }
}

/// The Result type used by the parser.
pub type Result<T> = std::result::Result<T, ParseError>;
