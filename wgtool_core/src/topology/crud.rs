use super::NodeRecord;

use chrono::Utc;

//Database
use crate::database::entity::node;
use crate::database::prelude;
use sea_orm::{prelude::*, query::*, Condition, DatabaseConnection};

// Error Handling
use log::info;
use wgtool_error::WgError;

impl NodeRecord {
    /*
     * Store a new node.
     * Returns the node as stored, with its id.
     */
    pub async fn create(&self, db: &DatabaseConnection) -> Result<NodeRecord, WgError> {
        let mut record = node::ActiveModel::from(self);
        record.id = sea_orm::ActiveValue::NotSet;
        let record = record.insert(db).await?;
        let node = NodeRecord::try_from(record)?;
        info!("created node {} (id {})", node.name, node.id);
        Ok(node)
    }
    /*
     * Overwrite a stored node.
     */
    pub async fn update(&mut self, db: &DatabaseConnection) -> Result<NodeRecord, WgError> {
        if self.id == 0 {
            return Err(WgError::NotFound(format!("node {}", self.name)));
        }
        if self.uplink_id == self.id {
            return Err(WgError::UplinkCycle(self.id));
        }
        self.updated_at = Utc::now().naive_utc();
        let record = node::ActiveModel::from(&*self).update(db).await?;
        NodeRecord::try_from(record)
    }
    /*
     * Remove a node.
     * A node that is still the uplink of others is kept.
     */
    pub async fn delete(&self, db: &DatabaseConnection) -> Result<(), WgError> {
        let count = prelude::Node::find()
            .filter(node::Column::UplinkId.eq(self.id as i64))
            .count(db)
            .await?;
        if count != 0 {
            return Err(WgError::NodeReferenced {
                id: self.id,
                count: count as usize,
            });
        }
        let res = prelude::Node::delete_by_id(self.id as i32).exec(db).await?;
        if res.rows_affected == 0 {
            return Err(WgError::NotFound(format!("node {}", self.id)));
        }
        info!("deleted node {} (id {})", self.name, self.id);
        Ok(())
    }

    pub async fn get_by_id(db: &DatabaseConnection, id: u64) -> Result<NodeRecord, WgError> {
        let record = prelude::Node::find_by_id(id as i32).one(db).await?;
        match record {
            Some(record) => NodeRecord::try_from(record),
            None => Err(WgError::NotFound(format!("node {id}"))),
        }
    }
    pub async fn get_by_name(db: &DatabaseConnection, name: &str) -> Result<NodeRecord, WgError> {
        let record = prelude::Node::find()
            .filter(node::Column::Name.eq(name))
            .one(db)
            .await?;
        match record {
            Some(record) => NodeRecord::try_from(record),
            None => Err(WgError::NotFound(format!("node {name}"))),
        }
    }
    pub async fn get_all(db: &DatabaseConnection) -> Result<Vec<NodeRecord>, WgError> {
        Self::find(db, Condition::all()).await
    }
    /// Nodes matching a condition, in id order.
    pub async fn find(
        db: &DatabaseConnection,
        condition: Condition,
    ) -> Result<Vec<NodeRecord>, WgError> {
        let records: Vec<node::Model> = prelude::Node::find()
            .filter(condition)
            .order_by_asc(node::Column::Id)
            .all(db)
            .await?;
        records.into_iter().map(NodeRecord::try_from).collect()
    }
    /// Nodes that use this one as uplink.
    pub async fn get_downstream(&self, db: &DatabaseConnection) -> Result<Vec<NodeRecord>, WgError> {
        let condition = Condition::all().add(node::Column::UplinkId.eq(self.id as i64));
        Self::find(db, condition).await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::database::connect_memory_db;
    use crate::topology::test::node;
    use miette::Result;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn create_and_get() -> Result<()> {
        let db = connect_memory_db().await?;
        let mut relay = node("relay", "10.0.0.1/24")?;
        relay.subnets = "10.1.0.0/24,10.2.0.0/24".parse()?;
        let relay = relay.create(&db).await?;
        assert_ne!(relay.id, 0);

        let by_id = NodeRecord::get_by_id(&db, relay.id).await?;
        let by_name = NodeRecord::get_by_name(&db, "relay").await?;
        assert_eq!(by_id, relay);
        assert_eq!(by_name, relay);
        assert_eq!(by_id.subnets.to_string(), "10.1.0.0/24,10.2.0.0/24");

        let res = NodeRecord::get_by_id(&db, 42).await;
        assert!(matches!(res, Err(WgError::NotFound(_))));
        let res = NodeRecord::get_by_name(&db, "nope").await;
        assert!(matches!(res, Err(WgError::NotFound(_))));
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_name_is_rejected() -> Result<()> {
        let db = connect_memory_db().await?;
        node("relay", "10.0.0.1/24")?.create(&db).await?;
        let res = node("relay", "10.0.0.2/24")?.create(&db).await;
        assert!(matches!(res, Err(WgError::SeaOrmError(_))));
        Ok(())
    }

    #[tokio::test]
    async fn update_node() -> Result<()> {
        let db = connect_memory_db().await?;
        let mut relay = node("relay", "10.0.0.1/24")?.create(&db).await?;
        relay.listen_port = 51820;
        relay.remark = "main relay".to_owned();
        relay.update(&db).await?;

        let stored = NodeRecord::get_by_id(&db, relay.id).await?;
        assert_eq!(stored.listen_port, 51820);
        assert_eq!(stored.remark, "main relay");

        relay.uplink_id = relay.id;
        let res = relay.update(&db).await;
        assert!(matches!(res, Err(WgError::UplinkCycle(_))));
        Ok(())
    }

    #[tokio::test]
    async fn referenced_node_is_kept() -> Result<()> {
        let db = connect_memory_db().await?;
        let relay = node("relay", "10.0.0.1/24")?.create(&db).await?;
        let mut leaf = node("leaf", "10.0.0.2/24")?;
        leaf.uplink_id = relay.id;
        let leaf = leaf.create(&db).await?;

        let downstream = relay.get_downstream(&db).await?;
        assert_eq!(downstream, vec![leaf.clone()]);

        let res = relay.delete(&db).await;
        assert!(matches!(
            res,
            Err(WgError::NodeReferenced { count: 1, .. })
        ));

        leaf.delete(&db).await?;
        relay.delete(&db).await?;
        assert!(NodeRecord::get_all(&db).await?.is_empty());

        let res = relay.delete(&db).await;
        assert!(matches!(res, Err(WgError::NotFound(_))));
        Ok(())
    }

    #[tokio::test]
    async fn find_uplinks() -> Result<()> {
        let db = connect_memory_db().await?;
        let mut relay = node("relay", "10.0.0.1/24")?;
        relay.is_uplink = true;
        relay.create(&db).await?;
        node("leaf", "10.0.0.2/24")?.create(&db).await?;

        let uplinks =
            NodeRecord::find(&db, Condition::all().add(node::Column::IsUplink.eq(true))).await?;
        assert_eq!(uplinks.len(), 1);
        assert_eq!(uplinks[0].name, "relay");
        assert_eq!(NodeRecord::get_all(&db).await?.len(), 2);
        Ok(())
    }
}
