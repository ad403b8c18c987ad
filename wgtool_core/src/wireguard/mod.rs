pub mod command;
pub mod control;
pub mod key;
pub mod provision;

// Reexport
pub use command::WgCommand;
pub use control::ControlSurface;
pub use key::{Key, KeyPair};
pub use provision::{InterfaceState, Provisioner, Rollback};

use crate::network::CidrAddress;

use bon::Builder;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/**
What is needed to bring a wireguard interface up on this host.
Derived from an uplink node record.
*/
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
pub struct InterfaceConfig {
    #[builder(into)]
    pub name: String,
    /// Base64 private key, parsed on provisioning.
    #[builder(into)]
    pub private_key: String,
    /// Checked on provisioning to be in 1..=65535.
    pub listen_port: u32,
    pub address: CidrAddress,
}

/// A peer as it is pushed to a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerConfig {
    pub public_key: Key,
    pub preshared_key: Option<Key>,
    pub endpoint: Option<SocketAddr>,
    pub allowed_ips: Vec<CidrAddress>,
    pub keepalive: Option<Duration>,
    /// Overwrite the peer allowed ips instead of appending to them.
    pub replace_allowed_ips: bool,
}

/// A peer as it is reported by a device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    pub public_key: Key,
    /// Zero when unset.
    pub preshared_key: Key,
    pub endpoint: Option<SocketAddr>,
    pub allowed_ips: Vec<CidrAddress>,
    /// Zero when disabled.
    pub keepalive: Duration,
    pub last_handshake: u64,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

/*
* Turn a running peer back into a configuration,
* so that it survives a full peer replacement.
*/
impl From<&Peer> for PeerConfig {
    fn from(e: &Peer) -> Self {
        PeerConfig {
            public_key: e.public_key,
            preshared_key: (!e.preshared_key.is_zero()).then_some(e.preshared_key),
            endpoint: e.endpoint,
            allowed_ips: e.allowed_ips.clone(),
            keepalive: (!e.keepalive.is_zero()).then_some(e.keepalive),
            replace_allowed_ips: true,
        }
    }
}

/// Current state of a wireguard device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceState {
    pub name: String,
    pub private_key: Option<Key>,
    pub public_key: Option<Key>,
    pub listen_port: u16,
    pub peers: Vec<Peer>,
}

/// Configuration pushed to a wireguard device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub private_key: Option<Key>,
    pub listen_port: Option<u16>,
    pub peers: Vec<PeerConfig>,
    /// Drop every peer the device knows that is not in `peers`.
    pub replace_peers: bool,
}

/*
* Shorten an interface name to Unix MAX_LENGTH.
* Unix iface can't have names longer than 15 chars.
*/
pub fn unix_name(name: &str) -> String {
    name.chars().take(15).collect()
}
