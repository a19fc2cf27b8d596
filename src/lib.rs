#![deny(clippy::all)]
#![deny(missing_docs)]
#![forbid(unsafe_code)]

//! ftpdlib is an embeddable, async FTP(S) server library.
//!
//! It speaks the RFC 959 command set with the usual modern extensions
//! (FEAT/OPTS, EPRT/EPSV, MDTM/MLSD/MLST/SIZE/REST, explicit FTPS per
//! RFC 4217) and mediates all file access through a virtual filesystem
//! rooted at the authenticated user's home directory. Users are virtual:
//! they live in a [`UserRegistry`](auth::UserRegistry) together with a
//! per-user permission set and optional per-directory overrides, so no
//! OS accounts are needed.
//!
//! It runs on top of the Tokio asynchronous run-time and tries to make
//! use of async IO as much as possible.
//!
//! # Quick Start
//!
//! ```no_run
//! use ftpdlib::auth::UserRegistry;
//!
//! #[tokio::main]
//! pub async fn main() {
//!     let mut users = UserRegistry::new();
//!     users.add_anonymous(std::env::temp_dir()).unwrap();
//!
//!     let server = ftpdlib::Server::with_authorizer(users)
//!         .greeting("Welcome to my FTP server")
//!         .passive_ports(50000..=65535)
//!         .build()
//!         .unwrap();
//!
//!     server.listen("127.0.0.1:2121").await.unwrap();
//! }
//! ```
//!
//! You can now connect to localhost:2121 with your favourite FTP client:
//!
//! ```sh
//! lftp -p 2121 localhost
//! ```
pub mod auth;
pub mod notification;
pub(crate) mod server;
pub mod vfs;

pub use crate::server::ftpserver::{Server, ServerBuilder, error::ServerError, options};

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
