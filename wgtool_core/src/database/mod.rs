pub mod connect;
pub mod entity;
pub mod lease;

pub use connect::*;
pub use entity::prelude;
pub use lease::DbLeaseStorage;
