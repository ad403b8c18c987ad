pub mod config;
pub mod database;
pub mod network;
pub mod topology;
pub mod wireguard;

// Reexport
pub use config::WgToolConfig;
pub use network::{Address, CidrAddress, LeaseAllocator, SubnetList};
pub use topology::{NodeRecord, NodeType};
pub use wireguard::{InterfaceConfig, PeerConfig, Provisioner};
