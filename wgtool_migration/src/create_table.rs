//!
//! Generate entities.
//!
//! ```sh
//! # on the repo root
//! sea-orm-cli generate entity --output-dir ./wgtool_core/src/database/entity
//! ```
//!

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Overlay nodes
        manager
            .create_table(
                Table::create()
                    .table(Node::Table)
                    .if_not_exists()
                    .col(pk_auto(Node::Id))
                    .col(string_uniq(Node::Name))
                    .col(string(Node::InterfaceName))
                    .col(string(Node::PublicIp).default(""))
                    .col(string(Node::Address))
                    .col(string_null(Node::Subnets))
                    .col(string(Node::NodeType))
                    .col(boolean(Node::IsUplink).default(false))
                    // 0 means "no uplink".
                    .col(big_integer(Node::UplinkId).default(0))
                    .col(integer(Node::ListenPort).default(0))
                    .col(string(Node::PrivateKey))
                    .col(string(Node::PublicKey))
                    .col(integer(Node::KeepaliveInterval).default(0))
                    .col(string(Node::Remark).default(""))
                    .col(date_time(Node::CreatedAt))
                    .col(date_time(Node::UpdatedAt))
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx-node-uplink_id")
                    .table(Node::Table)
                    .col(Node::UplinkId)
                    .to_owned(),
            )
            .await?;

        // Ip leases
        manager
            .create_table(
                Table::create()
                    .table(Lease::Table)
                    .if_not_exists()
                    .col(pk_auto(Lease::Id))
                    .col(string(Lease::Network))
                    .col(string(Lease::Address))
                    .col(string(Lease::Holder))
                    .col(boolean(Lease::Enable))
                    .col(date_time(Lease::EnableTime))
                    .col(date_time(Lease::CreatedAt))
                    .col(date_time(Lease::UpdatedAt))
                    .to_owned(),
            )
            .await?;
        // Leases are reused, never deleted,
        // so an address appears once per network.
        manager
            .create_index(
                Index::create()
                    .name("idx-lease-network-address")
                    .table(Lease::Table)
                    .col(Lease::Network)
                    .col(Lease::Address)
                    .unique()
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Lease::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Node::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden, Debug)]
pub enum Node {
    Table,
    Id,
    Name,
    InterfaceName,
    PublicIp,
    Address,
    Subnets,
    NodeType,
    IsUplink,
    UplinkId,
    ListenPort,
    PrivateKey,
    PublicKey,
    KeepaliveInterval,
    Remark,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden, Debug)]
pub enum Lease {
    Table,
    Id,
    Network,
    Address,
    Holder,
    Enable,
    EnableTime,
    CreatedAt,
    UpdatedAt,
}
