//! Schema migrations, one per table, in dependency order.

use sea_orm_migration::prelude::*;

use crate::entities::{order, order_item, product, scheduling_draft, store, user, vehicle};

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(CreateUsersTable),
            Box::new(CreateVehiclesTable),
            Box::new(CreateProductsTable),
            Box::new(CreateStoresTable),
            Box::new(CreateOrdersTable),
            Box::new(CreateOrderItemsTable),
            Box::new(CreateSchedulingDraftsTable),
        ]
    }
}

fn id_column<C: IntoIden>(column: C) -> ColumnDef {
    ColumnDef::new(column).uuid().not_null().primary_key().to_owned()
}

fn timestamp_column<C: IntoIden>(column: C) -> ColumnDef {
    ColumnDef::new(column).timestamp_with_time_zone().not_null().to_owned()
}

pub struct CreateUsersTable;

impl MigrationName for CreateUsersTable {
    fn name(&self) -> &'static str {
        "m20240101_000001_create_users_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateUsersTable {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let table = Table::create()
            .table(user::Entity)
            .if_not_exists()
            .col(id_column(user::Column::Id))
            .col(ColumnDef::new(user::Column::Name).string_len(100).not_null())
            .col(ColumnDef::new(user::Column::Phone).string_len(20).not_null().unique_key())
            .col(ColumnDef::new(user::Column::Email).string_len(255).null())
            .col(ColumnDef::new(user::Column::Role).string_len(32).not_null())
            .col(ColumnDef::new(user::Column::IsActive).boolean().not_null().default(true))
            .col(ColumnDef::new(user::Column::WorkingArea).string_len(100).null())
            .col(ColumnDef::new(user::Column::MaxDailyOrders).integer().not_null().default(30))
            .col(ColumnDef::new(user::Column::ApiToken).string_len(64).not_null().unique_key())
            .col(timestamp_column(user::Column::CreatedAt))
            .col(timestamp_column(user::Column::UpdatedAt))
            .to_owned();
        manager.create_table(table).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(user::Entity).to_owned()).await
    }
}

pub struct CreateVehiclesTable;

impl MigrationName for CreateVehiclesTable {
    fn name(&self) -> &'static str {
        "m20240101_000002_create_vehicles_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateVehiclesTable {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let table = Table::create()
            .table(vehicle::Entity)
            .if_not_exists()
            .col(id_column(vehicle::Column::Id))
            .col(ColumnDef::new(vehicle::Column::PlateNumber).string_len(20).not_null().unique_key())
            .col(ColumnDef::new(vehicle::Column::VehicleType).string_len(32).not_null())
            .col(ColumnDef::new(vehicle::Column::Brand).string_len(100).null())
            .col(ColumnDef::new(vehicle::Column::Model).string_len(100).null())
            .col(ColumnDef::new(vehicle::Column::Year).integer().null())
            .col(ColumnDef::new(vehicle::Column::CapacityKg).decimal_len(10, 2).not_null())
            .col(ColumnDef::new(vehicle::Column::Status).string_len(32).not_null())
            .col(ColumnDef::new(vehicle::Column::DistributorId).uuid().null())
            .col(ColumnDef::new(vehicle::Column::MileageKm).integer().not_null().default(0))
            .col(ColumnDef::new(vehicle::Column::LastMaintenanceDate).date().null())
            .col(ColumnDef::new(vehicle::Column::NextMaintenanceDate).date().null())
            .col(ColumnDef::new(vehicle::Column::InsuranceExpiry).date().null())
            .col(ColumnDef::new(vehicle::Column::Notes).text().null())
            .col(timestamp_column(vehicle::Column::CreatedAt))
            .col(timestamp_column(vehicle::Column::UpdatedAt))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_vehicles_distributor")
                    .from(vehicle::Entity, vehicle::Column::DistributorId)
                    .to(user::Entity, user::Column::Id)
                    .on_delete(ForeignKeyAction::SetNull),
            )
            .to_owned();
        manager.create_table(table).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(vehicle::Entity).to_owned()).await
    }
}

pub struct CreateProductsTable;

impl MigrationName for CreateProductsTable {
    fn name(&self) -> &'static str {
        "m20240101_000003_create_products_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateProductsTable {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let table = Table::create()
            .table(product::Entity)
            .if_not_exists()
            .col(id_column(product::Column::Id))
            .col(ColumnDef::new(product::Column::Name).string_len(150).not_null())
            .col(ColumnDef::new(product::Column::Sku).string_len(50).not_null().unique_key())
            .col(ColumnDef::new(product::Column::Category).string_len(100).null())
            .col(ColumnDef::new(product::Column::Unit).string_len(16).not_null())
            .col(ColumnDef::new(product::Column::PriceEur).decimal_len(12, 2).not_null())
            .col(ColumnDef::new(product::Column::PriceSyp).decimal_len(14, 2).not_null())
            .col(ColumnDef::new(product::Column::IsActive).boolean().not_null().default(true))
            .col(ColumnDef::new(product::Column::Description).text().null())
            .col(timestamp_column(product::Column::CreatedAt))
            .col(timestamp_column(product::Column::UpdatedAt))
            .to_owned();
        manager.create_table(table).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(product::Entity).to_owned()).await
    }
}

pub struct CreateStoresTable;

impl MigrationName for CreateStoresTable {
    fn name(&self) -> &'static str {
        "m20240101_000004_create_stores_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateStoresTable {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let table = Table::create()
            .table(store::Entity)
            .if_not_exists()
            .col(id_column(store::Column::Id))
            .col(ColumnDef::new(store::Column::Name).string_len(150).not_null())
            .col(ColumnDef::new(store::Column::OwnerName).string_len(100).null())
            .col(ColumnDef::new(store::Column::Phone).string_len(20).null())
            .col(ColumnDef::new(store::Column::Address).text().null())
            .col(ColumnDef::new(store::Column::Area).string_len(100).not_null())
            .col(ColumnDef::new(store::Column::Latitude).double().null())
            .col(ColumnDef::new(store::Column::Longitude).double().null())
            .col(ColumnDef::new(store::Column::IsActive).boolean().not_null().default(true))
            .col(ColumnDef::new(store::Column::PreferredDistributorId).uuid().null())
            .col(ColumnDef::new(store::Column::Notes).text().null())
            .col(timestamp_column(store::Column::CreatedAt))
            .col(timestamp_column(store::Column::UpdatedAt))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_stores_preferred_distributor")
                    .from(store::Entity, store::Column::PreferredDistributorId)
                    .to(user::Entity, user::Column::Id)
                    .on_delete(ForeignKeyAction::SetNull),
            )
            .to_owned();
        manager.create_table(table).await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_stores_area")
                    .table(store::Entity)
                    .col(store::Column::Area)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(store::Entity).to_owned()).await
    }
}

pub struct CreateOrdersTable;

impl MigrationName for CreateOrdersTable {
    fn name(&self) -> &'static str {
        "m20240101_000005_create_orders_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateOrdersTable {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let table = Table::create()
            .table(order::Entity)
            .if_not_exists()
            .col(id_column(order::Column::Id))
            .col(ColumnDef::new(order::Column::OrderNumber).string_len(32).not_null().unique_key())
            .col(ColumnDef::new(order::Column::StoreId).uuid().not_null())
            .col(ColumnDef::new(order::Column::DistributorId).uuid().null())
            .col(ColumnDef::new(order::Column::OrderDate).date().not_null())
            .col(ColumnDef::new(order::Column::DeliveryDate).date().null())
            .col(ColumnDef::new(order::Column::Status).string_len(32).not_null())
            .col(ColumnDef::new(order::Column::Priority).string_len(16).not_null())
            .col(ColumnDef::new(order::Column::PaymentStatus).string_len(16).not_null())
            .col(ColumnDef::new(order::Column::TotalEur).decimal_len(12, 2).not_null())
            .col(ColumnDef::new(order::Column::TotalSyp).decimal_len(14, 2).not_null())
            .col(ColumnDef::new(order::Column::Notes).text().null())
            .col(ColumnDef::new(order::Column::CancelReason).text().null())
            .col(timestamp_column(order::Column::CreatedAt))
            .col(timestamp_column(order::Column::UpdatedAt))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_orders_store")
                    .from(order::Entity, order::Column::StoreId)
                    .to(store::Entity, store::Column::Id)
                    .on_delete(ForeignKeyAction::Restrict),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_orders_distributor")
                    .from(order::Entity, order::Column::DistributorId)
                    .to(user::Entity, user::Column::Id)
                    .on_delete(ForeignKeyAction::SetNull),
            )
            .to_owned();
        manager.create_table(table).await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_orders_distributor_delivery")
                    .table(order::Entity)
                    .col(order::Column::DistributorId)
                    .col(order::Column::DeliveryDate)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_orders_status")
                    .table(order::Entity)
                    .col(order::Column::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(order::Entity).to_owned()).await
    }
}

pub struct CreateOrderItemsTable;

impl MigrationName for CreateOrderItemsTable {
    fn name(&self) -> &'static str {
        "m20240101_000006_create_order_items_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateOrderItemsTable {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let table = Table::create()
            .table(order_item::Entity)
            .if_not_exists()
            .col(id_column(order_item::Column::Id))
            .col(ColumnDef::new(order_item::Column::OrderId).uuid().not_null())
            .col(ColumnDef::new(order_item::Column::ProductId).uuid().not_null())
            .col(ColumnDef::new(order_item::Column::Quantity).integer().not_null())
            .col(ColumnDef::new(order_item::Column::UnitPriceEur).decimal_len(12, 2).not_null())
            .col(ColumnDef::new(order_item::Column::UnitPriceSyp).decimal_len(14, 2).not_null())
            .col(ColumnDef::new(order_item::Column::LineTotalEur).decimal_len(12, 2).not_null())
            .col(ColumnDef::new(order_item::Column::LineTotalSyp).decimal_len(14, 2).not_null())
            .col(timestamp_column(order_item::Column::CreatedAt))
            .col(timestamp_column(order_item::Column::UpdatedAt))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_order_items_order")
                    .from(order_item::Entity, order_item::Column::OrderId)
                    .to(order::Entity, order::Column::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_order_items_product")
                    .from(order_item::Entity, order_item::Column::ProductId)
                    .to(product::Entity, product::Column::Id)
                    .on_delete(ForeignKeyAction::Restrict),
            )
            .to_owned();
        manager.create_table(table).await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_order_items_order")
                    .table(order_item::Entity)
                    .col(order_item::Column::OrderId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(order_item::Entity).to_owned()).await
    }
}

pub struct CreateSchedulingDraftsTable;

impl MigrationName for CreateSchedulingDraftsTable {
    fn name(&self) -> &'static str {
        "m20240101_000007_create_scheduling_drafts_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateSchedulingDraftsTable {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let table = Table::create()
            .table(scheduling_draft::Entity)
            .if_not_exists()
            .col(id_column(scheduling_draft::Column::Id))
            .col(ColumnDef::new(scheduling_draft::Column::OrderId).uuid().not_null())
            .col(ColumnDef::new(scheduling_draft::Column::SuggestedDistributorId).uuid().not_null())
            .col(ColumnDef::new(scheduling_draft::Column::SuggestedDate).date().not_null())
            .col(ColumnDef::new(scheduling_draft::Column::Confidence).double().not_null())
            .col(ColumnDef::new(scheduling_draft::Column::Reasons).text().null())
            .col(ColumnDef::new(scheduling_draft::Column::Source).string_len(100).null())
            .col(ColumnDef::new(scheduling_draft::Column::Status).string_len(16).not_null())
            .col(ColumnDef::new(scheduling_draft::Column::FinalDistributorId).uuid().null())
            .col(ColumnDef::new(scheduling_draft::Column::FinalDate).date().null())
            .col(ColumnDef::new(scheduling_draft::Column::ReviewedBy).uuid().null())
            .col(ColumnDef::new(scheduling_draft::Column::ReviewedAt).timestamp_with_time_zone().null())
            .col(ColumnDef::new(scheduling_draft::Column::ReviewNotes).text().null())
            .col(ColumnDef::new(scheduling_draft::Column::Superseded).boolean().not_null().default(false))
            .col(timestamp_column(scheduling_draft::Column::CreatedAt))
            .col(timestamp_column(scheduling_draft::Column::UpdatedAt))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_scheduling_drafts_order")
                    .from(scheduling_draft::Entity, scheduling_draft::Column::OrderId)
                    .to(order::Entity, order::Column::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_scheduling_drafts_distributor")
                    .from(scheduling_draft::Entity, scheduling_draft::Column::SuggestedDistributorId)
                    .to(user::Entity, user::Column::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .to_owned();
        manager.create_table(table).await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_scheduling_drafts_status")
                    .table(scheduling_draft::Entity)
                    .col(scheduling_draft::Column::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(scheduling_draft::Entity).to_owned())
            .await
    }
}
