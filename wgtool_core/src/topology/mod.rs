//! Overlay nodes and their single uplink.
//!
//! A node reaches the overlay through one uplink node (star topology).
//! The uplink is referenced by id and looked up on demand.

pub mod crud;
pub mod from;
pub mod resolve;

pub use resolve::{allowed_ips, connect, peer_config, resolve};

use crate::network::{CidrAddress, LeaseAllocator, LeaseStorage, SubnetList};
use crate::wireguard::{InterfaceConfig, KeyPair};

use bon::Builder;
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use strum::{Display, EnumString};

// Error handling
use log::info;
use wgtool_error::WgError;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeType {
    /// Only reaches the uplink network.
    #[default]
    PointToPoint,
    /// Also routes the subnets advertised by the uplink.
    SubnetGateway,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
pub struct NodeRecord {
    /// Set by the store, 0 until then.
    #[builder(default)]
    pub id: u64,
    #[builder(into)]
    pub name: String,
    #[builder(into)]
    pub interface_name: String,
    /// Where peers reach this node.
    #[builder(into, default)]
    pub public_ip: String,
    pub address: CidrAddress,
    #[builder(default)]
    pub subnets: SubnetList,
    #[builder(default)]
    pub node_type: NodeType,
    #[builder(default)]
    pub is_uplink: bool,
    /// Id of the uplink node, 0 when there is none.
    #[builder(default)]
    pub uplink_id: u64,
    #[builder(default)]
    pub listen_port: u16,
    #[builder(into)]
    pub private_key: String,
    #[builder(into)]
    pub public_key: String,
    /// Seconds, disabled when <= 0.
    #[builder(default)]
    pub keepalive_interval: i32,
    #[builder(into, default)]
    pub remark: String,
    #[builder(default = Utc::now().naive_utc())]
    pub created_at: NaiveDateTime,
    #[builder(default = Utc::now().naive_utc())]
    pub updated_at: NaiveDateTime,
}

impl NodeRecord {
    /// Replace the node keys with a freshly generated pair.
    pub fn generate_keys(&mut self) {
        let keys = KeyPair::generate();
        self.private_key = keys.private_key.to_string();
        self.public_key = keys.public_key.to_string();
    }
    /// Where peers reach this node.
    pub fn endpoint(&self) -> Result<SocketAddr, WgError> {
        if self.listen_port == 0 {
            return Err(WgError::InvalidPort(0));
        }
        let ip: IpAddr = self
            .public_ip
            .parse()
            .map_err(|_| WgError::InvalidAddress(self.public_ip.clone()))?;
        Ok(SocketAddr::new(ip, self.listen_port))
    }
    pub fn keepalive(&self) -> Option<Duration> {
        match self.keepalive_interval {
            v if v <= 0 => None,
            v => Some(Duration::from_secs(v as u64)),
        }
    }
    /// The wireguard interface an uplink node brings up on its host.
    pub fn to_interface_config(&self) -> Result<InterfaceConfig, WgError> {
        if !self.is_uplink {
            return Err(WgError::NotUplink(self.id));
        }
        Ok(InterfaceConfig::builder()
            .name(&self.interface_name)
            .private_key(&self.private_key)
            .listen_port(self.listen_port as u32)
            .address(self.address)
            .build())
    }
    /**
    Give the node an address of the network, leased under the node name.
    Run before the node is stored.
    */
    pub async fn lease_address<S: LeaseStorage>(
        &mut self,
        allocator: &LeaseAllocator<S>,
        network: &CidrAddress,
    ) -> Result<CidrAddress, WgError> {
        let address = allocator.allocate_address(network, &self.name).await?;
        self.address = network.with_host(address)?;
        info!("node {} gets address {}", self.name, self.address);
        Ok(self.address)
    }
}
