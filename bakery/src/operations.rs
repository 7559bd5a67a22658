//! Business rules layered over [`CRUDResource`].
//!
//! A resource's storage code only reads and writes its table. Rules such as
//! "a product on an order cannot be deleted" live in a `CRUDOperations` impl,
//! which overrides the hook it needs and keeps the defaults for the rest. Each
//! public operation calls its `before_*` hook, the storage step, then `after_*`.
//!
//! ```rust,ignore
//! #[derive(Default)]
//! pub struct ProductOperations;
//!
//! #[async_trait]
//! impl CRUDOperations for ProductOperations {
//!     type Resource = Product;
//!
//!     async fn before_delete(&self, db: &DatabaseConnection, id: Uuid) -> Result<(), ApiError> {
//!         if product_is_ordered(db, id).await? {
//!             return Err(ApiError::conflict("لا يمكن حذف منتج مرتبط بطلبات"));
//!         }
//!         Ok(())
//!     }
//! }
//! ```

use async_trait::async_trait;
use sea_orm::{Condition, DatabaseConnection, Order};
use uuid::Uuid;

use crate::ApiError;
use crate::core::{CRUDResource, MergeIntoActiveModel};

/// Upper bound on ids accepted by a single batch delete
pub const MAX_BATCH_SIZE: usize = 100;

#[async_trait]
pub trait CRUDOperations: Send + Sync {
    /// Table-backed model these rules apply to
    type Resource: CRUDResource;

    // single record reads

    async fn before_get_one(&self, _db: &DatabaseConnection, _id: Uuid) -> Result<(), ApiError> {
        Ok(())
    }

    /// Enrichment after loading, e.g. attaching child rows
    async fn after_get_one(
        &self,
        _db: &DatabaseConnection,
        _entity: &mut Self::Resource,
    ) -> Result<(), ApiError> {
        Ok(())
    }

    async fn fetch_one(&self, db: &DatabaseConnection, id: Uuid) -> Result<Self::Resource, ApiError> {
        find_model::<Self::Resource>(db, id).await.map(Self::Resource::from)
    }

    // list reads

    async fn after_get_all(
        &self,
        _db: &DatabaseConnection,
        _entities: &mut Vec<<Self::Resource as CRUDResource>::ListModel>,
    ) -> Result<(), ApiError> {
        Ok(())
    }

    async fn fetch_all(
        &self,
        db: &DatabaseConnection,
        condition: &Condition,
        order_column: <Self::Resource as CRUDResource>::ColumnType,
        order_direction: Order,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<<Self::Resource as CRUDResource>::ListModel>, ApiError> {
        <Self::Resource as CRUDResource>::get_all(db, condition, order_column, order_direction, offset, limit)
            .await
            .map_err(ApiError::from)
    }

    // inserts

    /// Cross-record checks that payload validation cannot express (uniqueness, references)
    async fn before_create(
        &self,
        _db: &DatabaseConnection,
        _data: &<Self::Resource as CRUDResource>::CreateModel,
    ) -> Result<(), ApiError> {
        Ok(())
    }

    async fn after_create(&self, _db: &DatabaseConnection, _entity: &mut Self::Resource) -> Result<(), ApiError> {
        Ok(())
    }

    async fn perform_create(
        &self,
        db: &DatabaseConnection,
        data: <Self::Resource as CRUDResource>::CreateModel,
    ) -> Result<Self::Resource, ApiError> {
        <Self::Resource as CRUDResource>::create(db, data)
            .await
            .map_err(ApiError::from)
    }

    // updates

    async fn before_update(
        &self,
        _db: &DatabaseConnection,
        _id: Uuid,
        _data: &<Self::Resource as CRUDResource>::UpdateModel,
    ) -> Result<(), ApiError> {
        Ok(())
    }

    async fn after_update(&self, _db: &DatabaseConnection, _entity: &mut Self::Resource) -> Result<(), ApiError> {
        Ok(())
    }

    async fn perform_update(
        &self,
        db: &DatabaseConnection,
        id: Uuid,
        data: <Self::Resource as CRUDResource>::UpdateModel,
    ) -> Result<Self::Resource, ApiError> {
        use sea_orm::{ActiveModelTrait, IntoActiveModel};

        let current: <Self::Resource as CRUDResource>::ActiveModelType =
            find_model::<Self::Resource>(db, id).await?.into_active_model();
        let saved = data.merge_into_activemodel(current)?.update(db).await?;
        Ok(Self::Resource::from(saved))
    }

    // deletes

    /// Refuse deletes that would orphan dependent records
    async fn before_delete(&self, _db: &DatabaseConnection, _id: Uuid) -> Result<(), ApiError> {
        Ok(())
    }

    async fn after_delete(&self, _db: &DatabaseConnection, _id: Uuid) -> Result<(), ApiError> {
        Ok(())
    }

    async fn perform_delete(&self, db: &DatabaseConnection, id: Uuid) -> Result<Uuid, ApiError> {
        <Self::Resource as CRUDResource>::delete(db, id)
            .await
            .map_err(|err| match err {
                sea_orm::DbErr::RecordNotFound(_) => {
                    ApiError::not_found(<Self::Resource as CRUDResource>::RESOURCE_LABEL, Some(id.to_string()))
                }
                other => ApiError::from(other),
            })
    }

    // entry points used by the handlers

    /// Loads one record by id; a missing row becomes a 404 carrying the resource label.
    async fn get_one(&self, db: &DatabaseConnection, id: Uuid) -> Result<Self::Resource, ApiError> {
        self.before_get_one(db, id).await?;
        let mut entity = self.fetch_one(db, id).await?;
        self.after_get_one(db, &mut entity).await?;
        Ok(entity)
    }

    /// One page of rows plus the count of every row the condition matches,
    /// which feeds the `Content-Range` header.
    async fn get_all(
        &self,
        db: &DatabaseConnection,
        condition: Condition,
        order_column: <Self::Resource as CRUDResource>::ColumnType,
        order_direction: Order,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<<Self::Resource as CRUDResource>::ListModel>, u64), ApiError> {
        let mut entities = self
            .fetch_all(db, &condition, order_column, order_direction, offset, limit)
            .await?;
        self.after_get_all(db, &mut entities).await?;
        let total = <Self::Resource as CRUDResource>::total_count(db, &condition)
            .await
            .map_err(ApiError::from)?;
        Ok((entities, total))
    }

    async fn create(
        &self,
        db: &DatabaseConnection,
        data: <Self::Resource as CRUDResource>::CreateModel,
    ) -> Result<Self::Resource, ApiError> {
        self.before_create(db, &data).await?;
        let mut entity = self.perform_create(db, data).await?;
        self.after_create(db, &mut entity).await?;
        Ok(entity)
    }

    async fn update(
        &self,
        db: &DatabaseConnection,
        id: Uuid,
        data: <Self::Resource as CRUDResource>::UpdateModel,
    ) -> Result<Self::Resource, ApiError> {
        self.before_update(db, id, &data).await?;
        let mut entity = self.perform_update(db, id, data).await?;
        self.after_update(db, &mut entity).await?;
        Ok(entity)
    }

    /// Returns the removed id.
    async fn delete(&self, db: &DatabaseConnection, id: Uuid) -> Result<Uuid, ApiError> {
        self.before_delete(db, id).await?;
        let deleted_id = self.perform_delete(db, id).await?;
        self.after_delete(db, deleted_id).await?;
        Ok(deleted_id)
    }

    /// Deletes ids one at a time through [`Self::delete`] and stops at the first
    /// refusal. More than [`MAX_BATCH_SIZE`] ids is a 400.
    async fn delete_many(&self, db: &DatabaseConnection, ids: Vec<Uuid>) -> Result<Vec<Uuid>, ApiError> {
        if ids.len() > MAX_BATCH_SIZE {
            return Err(ApiError::bad_request(format!(
                "لا يمكن حذف أكثر من {MAX_BATCH_SIZE} عنصر في عملية واحدة"
            )));
        }

        let mut deleted = Vec::with_capacity(ids.len());
        for id in ids {
            deleted.push(self.delete(db, id).await?);
        }
        Ok(deleted)
    }
}

async fn find_model<R: CRUDResource>(
    db: &DatabaseConnection,
    id: Uuid,
) -> Result<<R::EntityType as sea_orm::EntityTrait>::Model, ApiError> {
    use sea_orm::EntityTrait;

    R::EntityType::find_by_id(id)
        .one(db)
        .await
        .map_err(ApiError::database)?
        .ok_or_else(|| ApiError::not_found(R::RESOURCE_LABEL, Some(id.to_string())))
}
