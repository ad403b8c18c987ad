use super::{DeviceConfig, DeviceState};
use crate::network::CidrAddress;

// Error handling
use wgtool_error::WgError;

/**
The kernel side of wireguard: links, addresses and devices.

Calls block until the kernel (or the tool driving it) answers.
Nothing here is synchronized: callers serialize mutating calls
on a given interface name.
*/
pub trait ControlSurface {
    /// Create a link of type "wireguard".
    fn link_add(&self, name: &str) -> Result<(), WgError>;
    fn link_delete(&self, name: &str) -> Result<(), WgError>;
    fn address_add(&self, name: &str, address: &CidrAddress) -> Result<(), WgError>;
    fn device(&self, name: &str) -> Result<DeviceState, WgError>;
    fn configure_device(&self, name: &str, config: &DeviceConfig) -> Result<(), WgError>;
}
