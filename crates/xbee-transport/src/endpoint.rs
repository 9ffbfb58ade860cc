use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{Result, TransportError};
use crate::serial::{self, PortConfig};
use crate::stream::XBeeStream;

/// Where a radio is reached.
///
/// Parsed from `tcp:HOST:PORT`, `unix:PATH`, or a bare device path such as
/// `/dev/ttyUSB0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Serial(PathBuf),
    Tcp(String),
    Unix(PathBuf),
}

impl Endpoint {
    /// Open the endpoint. `config` applies to serial devices only.
    pub fn open(&self, config: &PortConfig) -> Result<XBeeStream> {
        match self {
            Endpoint::Serial(path) => serial::open(path, config),
            Endpoint::Tcp(addr) => XBeeStream::connect_tcp(addr),
            #[cfg(unix)]
            Endpoint::Unix(path) => XBeeStream::connect_unix(path),
            #[cfg(not(unix))]
            Endpoint::Unix(_) => Err(TransportError::Unsupported("unix sockets")),
        }
    }
}

impl FromStr for Endpoint {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(addr) = s.strip_prefix("tcp:") {
            let valid = addr
                .rsplit_once(':')
                .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok());
            if !valid {
                return Err(TransportError::InvalidEndpoint(format!(
                    "expected tcp:HOST:PORT, got {s:?}"
                )));
            }
            return Ok(Endpoint::Tcp(addr.to_string()));
        }
        if let Some(path) = s.strip_prefix("unix:") {
            if path.is_empty() {
                return Err(TransportError::InvalidEndpoint(
                    "unix: needs a socket path".to_string(),
                ));
            }
            return Ok(Endpoint::Unix(PathBuf::from(path)));
        }
        if s.is_empty() {
            return Err(TransportError::InvalidEndpoint("empty endpoint".to_string()));
        }
        Ok(Endpoint::Serial(PathBuf::from(s)))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Serial(path) => write!(f, "{}", path.display()),
            Endpoint::Tcp(addr) => write!(f, "tcp:{addr}"),
            Endpoint::Unix(path) => write!(f, "unix:{}", path.display()),
        }
    }
}
