//! The resolved option set handed to every control loop, after the builder
//! has done its work.

use crate::notification::{DataListener, PresenceListener};
use crate::options::{Encoding, PassiveHost};
use crate::server::tls::FtpsConfig;

use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

// All per-session configuration, read-only once the server runs.
#[derive(Debug)]
pub(crate) struct SessionOptions {
    pub greeting: String,
    pub passive_ports: Option<RangeInclusive<u16>>,
    pub passive_host: PassiveHost,
    pub idle_session_timeout: Duration,
    pub data_stall_timeout: Duration,
    pub establish_timeout: Duration,
    pub read_limit: u64,
    pub write_limit: u64,
    pub permit_foreign_addresses: bool,
    pub permit_privileged_ports: bool,
    pub max_login_attempts: u32,
    pub auth_failed_delay: Duration,
    pub ftps_config: FtpsConfig,
    pub ftps_required_control_chan: bool,
    pub ftps_required_data_chan: bool,
    pub encoding: Encoding,
    pub use_gmt_times: bool,
    pub use_sendfile: bool,
    pub data_listener: Arc<dyn DataListener>,
    pub presence_listener: Arc<dyn PresenceListener>,
}
