use crate::network::{Address, CidrAddress, Lease, LeaseStorage, NewLease};

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashSet;
use std::str::FromStr;

//Database
use super::entity::lease;
use super::prelude;
use sea_orm::{prelude::*, query::*, ActiveValue, DatabaseConnection};

// Error Handling
use wgtool_error::WgError;

/// Leases stored in the `lease` table.
#[derive(Debug, Clone)]
pub struct DbLeaseStorage {
    db: DatabaseConnection,
}
impl DbLeaseStorage {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
    fn select(network: &CidrAddress) -> Select<prelude::Lease> {
        prelude::Lease::find().filter(lease::Column::Network.eq(network.to_string()))
    }
}

impl TryFrom<lease::Model> for Lease {
    type Error = WgError;
    fn try_from(e: lease::Model) -> Result<Self, Self::Error> {
        Ok(Lease {
            id: e.id as u64,
            network: CidrAddress::from_str(&e.network)?,
            address: Address::from_str(&e.address)?,
            holder: e.holder,
            enable: e.enable,
            enable_time: e.enable_time,
            created_at: e.created_at,
            updated_at: e.updated_at,
        })
    }
}

fn to_lease(record: Option<lease::Model>) -> Result<Option<Lease>, WgError> {
    record.map(Lease::try_from).transpose()
}

#[async_trait]
impl LeaseStorage for DbLeaseStorage {
    async fn get_by_holder(
        &self,
        network: &CidrAddress,
        holder: &str,
    ) -> Result<Option<Lease>, WgError> {
        let record = Self::select(network)
            .filter(lease::Column::Holder.eq(holder))
            .filter(lease::Column::Enable.eq(true))
            .one(&self.db)
            .await?;
        to_lease(record)
    }
    async fn get_one_unused(&self, network: &CidrAddress) -> Result<Option<Lease>, WgError> {
        let record = Self::select(network)
            .filter(lease::Column::Enable.eq(false))
            .order_by_asc(lease::Column::Id)
            .one(&self.db)
            .await?;
        to_lease(record)
    }
    async fn get_last_assigned(&self, network: &CidrAddress) -> Result<Option<Lease>, WgError> {
        let record = Self::select(network)
            .order_by_desc(lease::Column::Id)
            .one(&self.db)
            .await?;
        to_lease(record)
    }
    async fn find(
        &self,
        network: &CidrAddress,
        address: &Address,
    ) -> Result<Option<Lease>, WgError> {
        let record = Self::select(network)
            .filter(lease::Column::Address.eq(address.to_string()))
            .one(&self.db)
            .await?;
        to_lease(record)
    }
    async fn enabled_addresses(&self, network: &CidrAddress) -> Result<HashSet<Address>, WgError> {
        let records: Vec<lease::Model> = Self::select(network)
            .filter(lease::Column::Enable.eq(true))
            .all(&self.db)
            .await?;
        let mut addresses = HashSet::new();
        for e in records {
            addresses.insert(Address::from_str(&e.address)?);
        }
        Ok(addresses)
    }
    async fn create(&self, lease: NewLease) -> Result<Lease, WgError> {
        let now = Utc::now().naive_utc();
        let record = lease::ActiveModel {
            network: ActiveValue::Set(lease.network.to_string()),
            address: ActiveValue::Set(lease.address.to_string()),
            holder: ActiveValue::Set(lease.holder),
            enable: ActiveValue::Set(true),
            enable_time: ActiveValue::Set(now),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
            ..Default::default()
        };
        let record = record.insert(&self.db).await?;
        Lease::try_from(record)
    }
    async fn update(&self, lease: &Lease) -> Result<(), WgError> {
        let record = lease::ActiveModel {
            id: ActiveValue::Unchanged(lease.id as i32),
            holder: ActiveValue::Set(lease.holder.clone()),
            enable: ActiveValue::Set(lease.enable),
            enable_time: ActiveValue::Set(lease.enable_time),
            updated_at: ActiveValue::Set(lease.updated_at),
            ..Default::default()
        };
        record.update(&self.db).await?;
        Ok(())
    }
}
