use super::{NodeRecord, NodeType};
use crate::network::{CidrAddress, SubnetList};

use std::str::FromStr;

//Database
use crate::database::entity::node;
use sea_orm::ActiveValue;

// Error Handling
use log::warn;
use wgtool_error::WgError;

impl TryFrom<node::Model> for NodeRecord {
    type Error = WgError;
    /*
     * Stored subnets are admitted partially:
     * entries that don't parse are logged and left out.
     */
    fn try_from(e: node::Model) -> Result<Self, Self::Error> {
        let (subnets, err) = SubnetList::parse(e.subnets.as_deref().unwrap_or_default());
        if let Some(err) = err {
            warn!("node {}: skipped invalid stored subnets: {}", e.name, err);
        }
        let listen_port =
            u16::try_from(e.listen_port).map_err(|_| WgError::InvalidPort(e.listen_port as u32))?;

        Ok(NodeRecord {
            id: e.id as u64,
            name: e.name,
            interface_name: e.interface_name,
            public_ip: e.public_ip,
            address: CidrAddress::from_str(&e.address)?,
            subnets,
            node_type: NodeType::from_str(&e.node_type)?,
            is_uplink: e.is_uplink,
            uplink_id: e.uplink_id as u64,
            listen_port,
            private_key: e.private_key,
            public_key: e.public_key,
            keepalive_interval: e.keepalive_interval,
            remark: e.remark,
            created_at: e.created_at,
            updated_at: e.updated_at,
        })
    }
}

impl From<&NodeRecord> for node::ActiveModel {
    /// The id is left to the store when it is 0.
    fn from(e: &NodeRecord) -> Self {
        let id = match e.id {
            0 => ActiveValue::NotSet,
            v => ActiveValue::Unchanged(v as i32),
        };
        let subnets = match e.subnets.is_empty() {
            true => None,
            false => Some(e.subnets.to_string()),
        };
        node::ActiveModel {
            id,
            name: ActiveValue::Set(e.name.clone()),
            interface_name: ActiveValue::Set(e.interface_name.clone()),
            public_ip: ActiveValue::Set(e.public_ip.clone()),
            address: ActiveValue::Set(e.address.to_string()),
            subnets: ActiveValue::Set(subnets),
            node_type: ActiveValue::Set(e.node_type.to_string()),
            is_uplink: ActiveValue::Set(e.is_uplink),
            uplink_id: ActiveValue::Set(e.uplink_id as i64),
            listen_port: ActiveValue::Set(e.listen_port as i32),
            private_key: ActiveValue::Set(e.private_key.clone()),
            public_key: ActiveValue::Set(e.public_key.clone()),
            keepalive_interval: ActiveValue::Set(e.keepalive_interval),
            remark: ActiveValue::Set(e.remark.clone()),
            created_at: ActiveValue::Set(e.created_at),
            updated_at: ActiveValue::Set(e.updated_at),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::Utc;
    use miette::Result;
    use pretty_assertions::assert_eq;

    fn model() -> node::Model {
        let now = Utc::now().naive_utc();
        node::Model {
            id: 3,
            name: "gateway".to_owned(),
            interface_name: "wg-gateway".to_owned(),
            public_ip: "203.0.113.7".to_owned(),
            address: "10.0.0.3/24".to_owned(),
            subnets: Some("10.1.0.0/24, not-a-cidr, 10.2.0.0/24".to_owned()),
            node_type: "subnet_gateway".to_owned(),
            is_uplink: false,
            uplink_id: 1,
            listen_port: 51820,
            private_key: String::new(),
            public_key: String::new(),
            keepalive_interval: 25,
            remark: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn stored_node_skips_invalid_subnets() -> Result<()> {
        let node = NodeRecord::try_from(model())?;
        assert_eq!(node.subnets.to_string(), "10.1.0.0/24,10.2.0.0/24");
        assert_eq!(node.node_type, NodeType::SubnetGateway);
        assert_eq!(node.uplink_id, 1);
        Ok(())
    }

    #[test]
    fn stored_node_without_subnets() -> Result<()> {
        let node = NodeRecord::try_from(node::Model {
            subnets: None,
            ..model()
        })?;
        assert!(node.subnets.is_empty());
        Ok(())
    }

    #[test]
    fn stored_node_with_bad_address() {
        let res = NodeRecord::try_from(node::Model {
            address: "10.0.0.300/24".to_owned(),
            ..model()
        });
        assert!(matches!(res, Err(WgError::InvalidAddress(_))));
    }

    #[test]
    fn stored_node_with_bad_port() {
        let res = NodeRecord::try_from(node::Model {
            listen_port: 70000,
            ..model()
        });
        assert!(matches!(res, Err(WgError::InvalidPort(70000))));
    }
}
