use crate::BoxError;
use derive_more::Display;
use thiserror::Error;

/// The error returned by [`VirtualFs`](super::VirtualFs) operations. The
/// `ErrorKind` determines which FTP reply the client will see.
#[derive(Debug, Error)]
#[error("filesystem error: {kind}")]
pub struct Error {
    kind: ErrorKind,
    #[source]
    source: Option<BoxError>,
}

impl Error {
    /// Creates a new filesystem error with an underlying cause.
    pub fn new<E>(kind: ErrorKind, error: E) -> Error
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error {
            kind,
            source: Some(error.into()),
        }
    }

    /// Detailed information about what the FTP server should do with the failure.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error { kind, source: None }
    }
}

/// The `ErrorKind` variants that [`VirtualFs`](super::VirtualFs) operations
/// can produce.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Display)]
pub enum ErrorKind {
    /// A failure that may be retried, e.g. a busy file. Reply code 450.
    #[display("450 Transient file not available")]
    TransientFileNotAvailable,
    /// The path does not resolve to a usable file. Reply code 550. Path
    /// resolution failures (including containment violations) collapse into
    /// this kind so the client cannot distinguish them.
    #[display("550 Permanent file not available")]
    PermanentFileNotAvailable,
    /// The path does not resolve to a usable directory. Reply code 550.
    #[display("550 Permanent directory not available")]
    PermanentDirectoryNotAvailable,
    /// RMD on a directory that still has entries. Reply code 550.
    #[display("550 The directory is not empty")]
    PermanentDirectoryNotEmpty,
    /// The OS denied access. Reply code 550.
    #[display("550 Permission denied")]
    PermissionDenied,
    /// The peer went away mid-transfer. Reply code 426.
    #[display("426 Connection closed transfer aborted")]
    ConnectionClosed,
    /// A local, probably transient, processing error. Reply code 451.
    #[display("451 Local error")]
    LocalError,
    /// The disk filled up. Reply code 452.
    #[display("452 Insufficient storage space error")]
    InsufficientStorageSpaceError,
    /// A quota was exhausted. Reply code 552.
    #[display("552 Exceeded storage allocation error")]
    ExceededStorageAllocationError,
    /// The file name itself is not acceptable. Reply code 553.
    #[display("553 File name not allowed error")]
    FileNameNotAllowedError,
}

// Maps IO errors to FTP errors in a sensible way: permanent failures are
// captured explicitly, the rest is assumed retryable and maps to a 4xx reply.
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind as Io;
        match err.kind() {
            Io::NotFound => Error::new(ErrorKind::PermanentFileNotAvailable, err),
            // Could also be a directory, but we don't know.
            Io::AlreadyExists => Error::new(ErrorKind::PermanentFileNotAvailable, err),
            Io::PermissionDenied => Error::new(ErrorKind::PermissionDenied, err),
            Io::DirectoryNotEmpty => Error::new(ErrorKind::PermanentDirectoryNotEmpty, err),
            Io::NotADirectory => Error::new(ErrorKind::PermanentDirectoryNotAvailable, err),
            Io::IsADirectory | Io::FileTooLarge | Io::InvalidFilename => {
                Error::new(ErrorKind::PermanentFileNotAvailable, err)
            }
            Io::StorageFull => Error::new(ErrorKind::InsufficientStorageSpaceError, err),
            // A read-only filesystem can be considered a permission error.
            Io::ReadOnlyFilesystem => Error::new(ErrorKind::PermissionDenied, err),
            // The client forcefully aborted the connection, intentionally
            // closed it, or there was a network issue.
            Io::ConnectionReset | Io::BrokenPipe | Io::ConnectionAborted => Error::new(ErrorKind::ConnectionClosed, err),
            // Other errors are assumed to be local transient problems,
            // retryable for the client.
            _ => Error::new(ErrorKind::LocalError, err),
        }
    }
}
