use async_trait::async_trait;
use sea_orm::{
    Condition, DatabaseConnection, EntityTrait, IntoActiveModel, Order, PaginatorTrait, QueryOrder,
    QuerySelect, entity::prelude::*,
};
use uuid::Uuid;

/// Applies a partial update payload: fields left out of the request keep their stored value.
pub trait MergeIntoActiveModel<ActiveModelType> {
    fn merge_into_activemodel(self, existing: ActiveModelType) -> Result<ActiveModelType, DbErr>;
}

/// A table served by the shared list/read/create/update/delete handlers.
///
/// `Self` is what `GET /{id}` answers with. `ListModel` is the row shape of list
/// responses; orders use it to leave out their item lines.
#[async_trait]
pub trait CRUDResource: Sized + Send + Sync
where
    Self: From<<Self::EntityType as EntityTrait>::Model>,
{
    type EntityType: EntityTrait<
            Model: Sync + IntoActiveModel<Self::ActiveModelType>,
            PrimaryKey: PrimaryKeyTrait<ValueType: From<Uuid> + Into<Uuid>>,
        > + Sync;
    type ColumnType: ColumnTrait + std::fmt::Debug;
    type ActiveModelType: ActiveModelTrait<Entity = Self::EntityType> + ActiveModelBehavior + Send + Sync;
    type CreateModel: Into<Self::ActiveModelType> + Send + Sync;
    type UpdateModel: Send + Sync + MergeIntoActiveModel<Self::ActiveModelType>;
    type ListModel: From<Self> + Send + Sync;

    const ID_COLUMN: Self::ColumnType;
    const RESOURCE_NAME_SINGULAR: &'static str;
    const RESOURCE_NAME_PLURAL: &'static str;
    /// Arabic name used in user-facing messages
    const RESOURCE_LABEL: &'static str;

    /// One page in the requested order. Paging and sorting are applied in SQL.
    async fn get_all(
        db: &DatabaseConnection,
        condition: &Condition,
        order_column: Self::ColumnType,
        order_direction: Order,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Self::ListModel>, DbErr> {
        let rows = Self::EntityType::find()
            .filter(condition.clone())
            .order_by(order_column, order_direction)
            .offset(offset)
            .limit(limit)
            .all(db)
            .await?;
        Ok(rows.into_iter().map(Self::from).map(Self::ListModel::from).collect())
    }

    async fn create(db: &DatabaseConnection, create_model: Self::CreateModel) -> Result<Self, DbErr> {
        let active_model: Self::ActiveModelType = create_model.into();
        // ids are generated client side, so insert can hand back the stored row
        let model = active_model.insert(db).await?;
        Ok(Self::from(model))
    }

    async fn delete(db: &DatabaseConnection, id: Uuid) -> Result<Uuid, DbErr> {
        let outcome = Self::EntityType::delete_by_id(id).exec(db).await?;
        if outcome.rows_affected == 0 {
            return Err(DbErr::RecordNotFound(Self::RESOURCE_LABEL.to_string()));
        }
        Ok(id)
    }

    async fn total_count(db: &DatabaseConnection, condition: &Condition) -> Result<u64, DbErr> {
        Self::EntityType::find().filter(condition.clone()).count(db).await
    }

    #[must_use]
    fn default_index_column() -> Self::ColumnType {
        Self::ID_COLUMN
    }

    #[must_use]
    fn sortable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![("id", Self::ID_COLUMN)]
    }

    #[must_use]
    fn filterable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![("id", Self::ID_COLUMN)]
    }

    /// Status and role style columns. A filter value on them is compared whole,
    /// ignoring case, never as a substring.
    #[must_use]
    fn is_enum_field(field_name: &str) -> bool {
        let _ = field_name;
        false
    }

    /// Text fields where `filter={"name": "خب"}` matches any row containing the value.
    #[must_use]
    fn like_filterable_columns() -> Vec<&'static str> {
        vec![]
    }

    /// Fields the free-text `q` filter looks through.
    #[must_use]
    fn fulltext_searchable_columns() -> Vec<(&'static str, Self::ColumnType)> {
        vec![]
    }
}
