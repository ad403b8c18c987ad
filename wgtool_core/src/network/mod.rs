pub mod address;
pub mod lease;
pub mod subnet;

pub use address::{Address, CidrAddress};
pub use lease::{Lease, LeaseAllocator, LeaseStorage, NewLease};
pub use subnet::SubnetList;
