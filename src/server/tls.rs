//! TLS plumbing for explicit FTPS (RFC 4217): configuration loading and the
//! session cache shared between the control and data channel acceptors.

use moka::sync::Cache;
use rustls::ServerConfig;
use rustls::server::StoresServerSessions;
use std::fmt;
use std::fmt::Formatter;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

// FtpsConfig shows how TLS security is configured for the server.
#[derive(Clone)]
pub enum FtpsConfig {
    Off,
    Building { certs_file: PathBuf, key_file: PathBuf },
    On { tls_config: Arc<ServerConfig> },
}

impl FtpsConfig {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, FtpsConfig::Off)
    }

    pub fn config(&self) -> Option<Arc<ServerConfig>> {
        match self {
            FtpsConfig::On { tls_config } => Some(tls_config.clone()),
            _ => None,
        }
    }
}

impl fmt::Debug for FtpsConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            FtpsConfig::Off => write!(f, "Off"),
            FtpsConfig::Building { .. } => write!(f, "Building"),
            FtpsConfig::On { .. } => write!(f, "On"),
        }
    }
}

/// The error returned when the TLS configuration could not be built.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The certificates or key file could not be read.
    #[error("could not read PEM file: {0}")]
    Load(#[from] std::io::Error),

    /// The certificates file contained no usable certificate.
    #[error("no certificates found")]
    NoCertificates,

    /// The key file contained no usable private key.
    #[error("no private key found")]
    NoPrivateKey,

    /// rustls rejected the certificate/key combination.
    #[error("bad certificate or key: {0}")]
    BadCertOrKey(#[from] rustls::Error),
}

pub fn new_config<P: AsRef<Path>>(certs_file: P, key_file: P) -> Result<Arc<ServerConfig>, ConfigError> {
    let certs = {
        let mut reader = BufReader::new(File::open(certs_file)?);
        rustls_pemfile::certs(&mut reader).collect::<Result<Vec<_>, _>>()?
    };
    if certs.is_empty() {
        return Err(ConfigError::NoCertificates);
    }
    let key = {
        let mut reader = BufReader::new(File::open(key_file)?);
        rustls_pemfile::private_key(&mut reader)?.ok_or(ConfigError::NoPrivateKey)?
    };

    let mut config = ServerConfig::builder().with_no_client_auth().with_single_cert(certs, key)?;
    // Server-side session state so that data connections can resume the
    // session negotiated on the control connection.
    config.session_storage = TlsSessionCache::new(1024);
    Ok(Arc::new(config))
}

// Stores server TLS sessions in a bounded cache.
struct TlsSessionCache {
    cache: Cache<Vec<u8>, Vec<u8>>,
}

impl TlsSessionCache {
    pub fn new(size: u64) -> Arc<TlsSessionCache> {
        Arc::new(TlsSessionCache {
            cache: Cache::new(size),
        })
    }
}

impl fmt::Debug for TlsSessionCache {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "TlsSessionCache")
    }
}

impl StoresServerSessions for TlsSessionCache {
    fn put(&self, key: Vec<u8>, value: Vec<u8>) -> bool {
        self.cache.insert(key, value);
        true
    }

    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.cache.get(&key.to_vec())
    }

    fn take(&self, key: &[u8]) -> Option<Vec<u8>> {
        let key_as_vec = key.to_vec();
        let value = self.cache.get(&key_as_vec);
        self.cache.invalidate(&key_as_vec);
        value
    }

    fn can_cache(&self) -> bool {
        true
    }
}
