use super::{NodeRecord, NodeType};
use crate::network::CidrAddress;
use crate::wireguard::{ControlSurface, Key, PeerConfig, Provisioner};

use sea_orm::DatabaseConnection;
use std::str::FromStr;

// Error Handling
use log::info;
use wgtool_error::WgError;

/**
The peer configuration a node needs to reach its uplink.

Fails without touching the store when the node has no uplink
or names itself as uplink.
*/
pub async fn resolve(db: &DatabaseConnection, node: &NodeRecord) -> Result<PeerConfig, WgError> {
    if node.uplink_id == 0 {
        return Err(WgError::NoConnectPeer(node.id));
    }
    if node.uplink_id == node.id {
        return Err(WgError::UplinkCycle(node.id));
    }
    let uplink = NodeRecord::get_by_id(db, node.uplink_id).await?;
    peer_config(node, &uplink)
}

/// The uplink as a peer of the node.
pub fn peer_config(node: &NodeRecord, uplink: &NodeRecord) -> Result<PeerConfig, WgError> {
    let public_key = Key::from_str(&uplink.public_key)?;
    let endpoint = uplink.endpoint()?;
    Ok(PeerConfig {
        public_key,
        preshared_key: None,
        endpoint: Some(endpoint),
        allowed_ips: allowed_ips(node.node_type, uplink),
        keepalive: node.keepalive(),
        replace_allowed_ips: true,
    })
}

/*
* The uplink network, followed for gateways by
* the networks the uplink advertises. Duplicates are dropped.
*/
pub fn allowed_ips(node_type: NodeType, uplink: &NodeRecord) -> Vec<CidrAddress> {
    let mut ips = vec![uplink.address.network()];
    if node_type == NodeType::SubnetGateway {
        for network in uplink.subnets.networks() {
            if !ips.contains(&network) {
                ips.push(network);
            }
        }
    }
    ips
}

/// Add the node uplink as a peer of the node interface.
pub async fn connect<C: ControlSurface>(
    db: &DatabaseConnection,
    provisioner: &Provisioner<C>,
    node: &NodeRecord,
) -> Result<PeerConfig, WgError> {
    let peer = resolve(db, node).await?;
    provisioner.add_peer(&node.interface_name, peer.clone())?;
    info!(
        "connected node {} to its uplink {}",
        node.name, node.uplink_id
    );
    Ok(peer)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::database::{connect_db, connect_memory_db};
    use crate::topology::test::node;
    use crate::wireguard::provision::test::FakeControl;
    use crate::wireguard::InterfaceConfig;
    use miette::Result;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    async fn relay(db: &DatabaseConnection) -> Result<NodeRecord> {
        let mut relay = node("relay", "10.0.0.1/24")?;
        relay.is_uplink = true;
        relay.public_ip = "203.0.113.7".to_owned();
        relay.listen_port = 51820;
        relay.subnets = "10.1.0.0/24, 10.2.0.9/24, 10.1.0.0/24".parse()?;
        Ok(relay.create(db).await?)
    }

    #[tokio::test]
    async fn no_uplink_fails_without_lookup() -> Result<()> {
        // No tables: any lookup would fail with a store error.
        let db = connect_db("sqlite::memory:").await?;
        let leaf = node("leaf", "10.0.0.2/24")?;
        let res = resolve(&db, &leaf).await;
        assert!(matches!(res, Err(WgError::NoConnectPeer(_))));

        let mut leaf = leaf;
        leaf.id = 7;
        leaf.uplink_id = 7;
        let res = resolve(&db, &leaf).await;
        assert!(matches!(res, Err(WgError::UplinkCycle(7))));
        Ok(())
    }

    #[tokio::test]
    async fn point_to_point_peer() -> Result<()> {
        let db = connect_memory_db().await?;
        let relay = relay(&db).await?;
        let mut leaf = node("leaf", "10.0.0.2/24")?;
        leaf.uplink_id = relay.id;
        leaf.keepalive_interval = 25;
        let leaf = leaf.create(&db).await?;

        let peer = resolve(&db, &leaf).await?;
        assert_eq!(peer.public_key.to_string(), relay.public_key);
        assert_eq!(peer.endpoint, Some("203.0.113.7:51820".parse().unwrap()));
        assert_eq!(peer.allowed_ips, vec![CidrAddress::from_str("10.0.0.0/24")?]);
        assert_eq!(peer.keepalive, Some(Duration::from_secs(25)));
        assert!(peer.replace_allowed_ips);
        Ok(())
    }

    #[tokio::test]
    async fn subnet_gateway_peer() -> Result<()> {
        let db = connect_memory_db().await?;
        let relay = relay(&db).await?;
        let mut gateway = node("gateway", "10.0.0.3/24")?;
        gateway.uplink_id = relay.id;
        gateway.node_type = NodeType::SubnetGateway;
        let gateway = gateway.create(&db).await?;

        let peer = resolve(&db, &gateway).await?;
        let allowed: Vec<String> = peer.allowed_ips.iter().map(|e| e.to_string()).collect();
        assert_eq!(allowed, vec!["10.0.0.0/24", "10.1.0.0/24", "10.2.0.0/24"]);
        assert_eq!(peer.keepalive, None);
        Ok(())
    }

    #[tokio::test]
    async fn missing_uplink() -> Result<()> {
        let db = connect_memory_db().await?;
        let mut leaf = node("leaf", "10.0.0.2/24")?;
        leaf.uplink_id = 99;
        let res = resolve(&db, &leaf).await;
        assert!(matches!(res, Err(WgError::NotFound(_))));
        Ok(())
    }

    #[tokio::test]
    async fn uplink_without_port_or_key() -> Result<()> {
        let db = connect_memory_db().await?;
        let mut relay = relay(&db).await?;

        let mut leaf = node("leaf", "10.0.0.2/24")?;
        leaf.uplink_id = relay.id;

        relay.listen_port = 0;
        relay.update(&db).await?;
        let res = resolve(&db, &leaf).await;
        assert!(matches!(res, Err(WgError::InvalidPort(0))));

        relay.listen_port = 51820;
        relay.public_key = "garbage".to_owned();
        relay.update(&db).await?;
        let res = resolve(&db, &leaf).await;
        assert!(matches!(res, Err(WgError::InvalidKey(_))));
        Ok(())
    }

    #[tokio::test]
    async fn connect_leaf_to_relay() -> Result<()> {
        let db = connect_memory_db().await?;
        let relay = relay(&db).await?;
        let mut leaf = node("leaf", "10.0.0.2/24")?;
        leaf.uplink_id = relay.id;
        leaf.listen_port = 51821;
        let leaf = leaf.create(&db).await?;

        let provisioner = Provisioner::new(FakeControl::default());
        provisioner.create_interface(&relay.to_interface_config()?)?;
        // Leaves bring their own interface up.
        let interface = InterfaceConfig::builder()
            .name(&leaf.interface_name)
            .private_key(&leaf.private_key)
            .listen_port(leaf.listen_port as u32)
            .address(leaf.address)
            .build();
        provisioner.create_interface(&interface)?;
        let peer = connect(&db, &provisioner, &leaf).await?;

        let device = provisioner.control().state(&leaf.interface_name);
        assert_eq!(device.peers.len(), 1);
        assert_eq!(device.peers[0].public_key, peer.public_key);
        assert_eq!(device.peers[0].allowed_ips, peer.allowed_ips);
        Ok(())
    }
}
