use xbee_transport::{Endpoint, PortConfig};

use crate::error::Result;
use crate::interface::{InterfaceConfig, XBeeInterface};

/// Open a radio at `endpoint` with default port and interface settings.
pub fn open(endpoint: &Endpoint) -> Result<XBeeInterface> {
    open_with_config(endpoint, &PortConfig::default(), InterfaceConfig::default())
}

/// Open a radio with explicit configuration.
pub fn open_with_config(
    endpoint: &Endpoint,
    port: &PortConfig,
    config: InterfaceConfig,
) -> Result<XBeeInterface> {
    let stream = endpoint.open(port)?;
    XBeeInterface::from_stream(stream, config)
}
