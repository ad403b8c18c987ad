//! Stable holder to address assignment inside a network.
//!
//! Leases are never deleted: releasing one disables it,
//! and disabled leases are handed out again before the network is extended.

use super::{Address, CidrAddress};

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tokio::sync::Mutex;

// Error handling
use log::{debug, info};
use wgtool_error::WgError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    pub id: u64,
    /// Network projection of the pool, like "10.0.0.0/24".
    pub network: CidrAddress,
    pub address: Address,
    pub holder: String,
    pub enable: bool,
    pub enable_time: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// A lease about to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLease {
    pub network: CidrAddress,
    pub address: Address,
    pub holder: String,
}

/**
Where leases live.

Every `network` argument is already a network projection.
*/
#[async_trait]
pub trait LeaseStorage: Send + Sync {
    /// The enabled lease of a holder.
    async fn get_by_holder(
        &self,
        network: &CidrAddress,
        holder: &str,
    ) -> Result<Option<Lease>, WgError>;
    /// First disabled lease, in storage order.
    async fn get_one_unused(&self, network: &CidrAddress) -> Result<Option<Lease>, WgError>;
    /// Newest lease record.
    async fn get_last_assigned(&self, network: &CidrAddress) -> Result<Option<Lease>, WgError>;
    async fn find(
        &self,
        network: &CidrAddress,
        address: &Address,
    ) -> Result<Option<Lease>, WgError>;
    async fn enabled_addresses(&self, network: &CidrAddress) -> Result<HashSet<Address>, WgError>;
    async fn create(&self, lease: NewLease) -> Result<Lease, WgError>;
    async fn update(&self, lease: &Lease) -> Result<(), WgError>;
}

pub struct LeaseAllocator<S: LeaseStorage> {
    storage: S,
    // Serializes allocations and releases of this allocator.
    lock: Mutex<()>,
}

impl<S: LeaseStorage> LeaseAllocator<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            lock: Mutex::new(()),
        }
    }
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /**
    Give an address of the network to the holder.

    A holder keeps its address as long as its lease is enabled.
    Otherwise the first disabled lease is reused, and only then
    the first host address without a lease is taken.
    */
    pub async fn allocate_address(
        &self,
        network: &CidrAddress,
        holder: &str,
    ) -> Result<Address, WgError> {
        let _guard = self.lock.lock().await;
        let network = network.network();

        if let Some(lease) = self.storage.get_by_holder(&network, holder).await? {
            debug!("{} already holds {} in {}", holder, lease.address, network);
            return Ok(lease.address);
        }

        if let Some(mut lease) = self.storage.get_one_unused(&network).await? {
            let now = Utc::now().naive_utc();
            lease.holder = holder.to_owned();
            lease.enable = true;
            lease.enable_time = now;
            lease.updated_at = now;
            self.storage.update(&lease).await?;
            info!("reclaimed {} in {} for {}", lease.address, network, holder);
            return Ok(lease.address);
        }

        let used = self.storage.enabled_addresses(&network).await?;
        match network.hosts().find(|e| !used.contains(e)) {
            Some(address) => {
                let lease = NewLease {
                    network,
                    address,
                    holder: holder.to_owned(),
                };
                let lease = self.storage.create(lease).await?;
                info!("leased {} in {} to {}", lease.address, network, holder);
                Ok(lease.address)
            }
            None => Err(WgError::AddressSpaceExhausted(network.to_string())),
        }
    }

    /// Disable the enabled lease of an address.
    pub async fn release_address(
        &self,
        network: &CidrAddress,
        address: &Address,
    ) -> Result<(), WgError> {
        let _guard = self.lock.lock().await;
        let network = network.network();

        match self.storage.find(&network, address).await? {
            Some(mut lease) if lease.enable => {
                lease.enable = false;
                lease.updated_at = Utc::now().naive_utc();
                self.storage.update(&lease).await?;
                info!("released {} in {} from {}", address, network, lease.holder);
                Ok(())
            }
            _ => Err(WgError::NotFound(format!(
                "enabled lease of {address} in {network}"
            ))),
        }
    }

    /// False when the address was never leased.
    pub async fn is_used(&self, network: &CidrAddress, address: &Address) -> Result<bool, WgError> {
        let lease = self.storage.find(&network.network(), address).await?;
        Ok(lease.map(|e| e.enable).unwrap_or(false))
    }

    pub async fn get_by_holder(
        &self,
        network: &CidrAddress,
        holder: &str,
    ) -> Result<Option<Lease>, WgError> {
        self.storage.get_by_holder(&network.network(), holder).await
    }

    pub async fn get_last_assigned(&self, network: &CidrAddress) -> Result<Option<Lease>, WgError> {
        self.storage.get_last_assigned(&network.network()).await
    }

    /*
     * The address after the last assigned one,
     * or the first host of an empty network.
     * None when it would fall outside the usable hosts.
     */
    pub async fn next_address_hint(&self, network: &CidrAddress) -> Result<Option<Address>, WgError> {
        let network = network.network();
        let hint = match self.storage.get_last_assigned(&network).await? {
            Some(lease) => lease.address.next().filter(|e| network.is_host(e)),
            None => network.hosts().next(),
        };
        Ok(hint)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::database::{connect_memory_db, DbLeaseStorage};
    use miette::Result;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;
    use std::sync::Arc;

    async fn allocator() -> Result<LeaseAllocator<DbLeaseStorage>> {
        let db = connect_memory_db().await?;
        Ok(LeaseAllocator::new(DbLeaseStorage::new(db)))
    }

    #[tokio::test]
    async fn allocate_until_exhausted_then_reclaim() -> Result<()> {
        let allocator = allocator().await?;
        let network = CidrAddress::from_str("127.0.0.0/30")?;

        let a = allocator.allocate_address(&network, "A").await?;
        let b = allocator.allocate_address(&network, "B").await?;
        assert_eq!(a.to_string(), "127.0.0.1");
        assert_eq!(b.to_string(), "127.0.0.2");

        let c = allocator.allocate_address(&network, "C").await;
        assert!(matches!(c, Err(WgError::AddressSpaceExhausted(_))));
        assert_eq!(allocator.get_by_holder(&network, "C").await?, None);

        allocator.release_address(&network, &a).await?;
        assert!(!allocator.is_used(&network, &a).await?);

        let d = allocator.allocate_address(&network, "D").await?;
        assert_eq!(d.to_string(), "127.0.0.1");
        assert!(allocator.is_used(&network, &d).await?);

        let lease = allocator.get_by_holder(&network, "D").await?;
        assert_eq!(lease.map(|e| e.address), Some(d));
        Ok(())
    }

    #[tokio::test]
    async fn allocation_is_idempotent_per_holder() -> Result<()> {
        let allocator = allocator().await?;
        let network = CidrAddress::from_str("10.20.0.0/24")?;

        let first = allocator.allocate_address(&network, "node-a").await?;
        let again = allocator.allocate_address(&network, "node-a").await?;
        assert_eq!(first, again);

        let other = allocator.allocate_address(&network, "node-b").await?;
        assert_ne!(first, other);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_allocations_get_distinct_addresses() -> Result<()> {
        let allocator = Arc::new(allocator().await?);
        let network = CidrAddress::from_str("10.5.0.0/24")?;

        let mut handles = vec![];
        for i in 0..20 {
            let allocator = allocator.clone();
            handles.push(tokio::spawn(async move {
                allocator
                    .allocate_address(&network, &format!("node-{i}"))
                    .await
            }));
        }
        let mut addresses = HashSet::new();
        for handle in handles {
            let address = handle.await.map_err(|e| miette::miette!("{e}"))??;
            assert!(network.is_host(&address));
            addresses.insert(address);
        }
        assert_eq!(addresses.len(), 20);
        Ok(())
    }

    #[tokio::test]
    async fn pool_is_keyed_by_network() -> Result<()> {
        let allocator = allocator().await?;
        // Both name the same pool.
        let a = allocator
            .allocate_address(&CidrAddress::from_str("10.20.0.7/24")?, "node-a")
            .await?;
        let b = allocator
            .allocate_address(&CidrAddress::from_str("10.20.0.0/24")?, "node-b")
            .await?;
        assert_eq!(a.to_string(), "10.20.0.1");
        assert_eq!(b.to_string(), "10.20.0.2");

        let lease = allocator
            .get_last_assigned(&CidrAddress::from_str("10.20.0.0/24")?)
            .await?;
        assert_eq!(
            lease.map(|e| e.network.to_string()),
            Some("10.20.0.0/24".to_owned())
        );
        Ok(())
    }

    #[tokio::test]
    async fn release_unknown_address() -> Result<()> {
        let allocator = allocator().await?;
        let network = CidrAddress::from_str("10.20.0.0/24")?;
        let address = Address::from_str("10.20.0.9")?;

        let res = allocator.release_address(&network, &address).await;
        assert!(matches!(res, Err(WgError::NotFound(_))));
        assert!(!allocator.is_used(&network, &address).await?);

        // Releasing twice fails the second time.
        let address = allocator.allocate_address(&network, "node-a").await?;
        allocator.release_address(&network, &address).await?;
        let res = allocator.release_address(&network, &address).await;
        assert!(matches!(res, Err(WgError::NotFound(_))));
        Ok(())
    }

    #[tokio::test]
    async fn next_address_hint() -> Result<()> {
        let allocator = allocator().await?;
        let network = CidrAddress::from_str("127.0.0.0/30")?;

        let hint = allocator.next_address_hint(&network).await?;
        assert_eq!(hint.map(|e| e.to_string()), Some("127.0.0.1".to_owned()));

        allocator.allocate_address(&network, "A").await?;
        let hint = allocator.next_address_hint(&network).await?;
        assert_eq!(hint.map(|e| e.to_string()), Some("127.0.0.2".to_owned()));

        allocator.allocate_address(&network, "B").await?;
        assert_eq!(allocator.next_address_hint(&network).await?, None);
        Ok(())
    }
}
