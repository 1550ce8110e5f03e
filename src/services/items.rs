use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::item::{self, Entity as ItemEntity, ItemGroup, ItemUnit};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct NewItem {
    #[validate(length(min = 1, max = 50, message = "Item name must be 1-50 characters"))]
    pub item_name: String,
    pub item_group: String,
    pub unit_of_measurement: String,
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    #[serde(default)]
    pub quantity: i32,
    pub price_without_vat: Decimal,
    #[validate(length(max = 50))]
    pub status: String,
    pub storage_location: Option<String>,
    pub contact_person: Option<String>,
    pub photo_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateItem {
    #[validate(length(min = 1, max = 50))]
    pub item_name: Option<String>,
    pub item_group: Option<String>,
    pub unit_of_measurement: Option<String>,
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: Option<i32>,
    pub price_without_vat: Option<Decimal>,
    #[validate(length(max = 50))]
    pub status: Option<String>,
    pub storage_location: Option<String>,
    pub contact_person: Option<String>,
    pub photo_path: Option<String>,
}

#[derive(Clone)]
pub struct ItemService {
    db: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl ItemService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self { db, event_sender }
    }

    /// Creates a new stocked item.
    #[instrument(skip(self, new), fields(item_name = %new.item_name))]
    pub async fn create_item(&self, new: NewItem) -> Result<item::Model, ServiceError> {
        new.validate()?;
        validate_group_code(&new.item_group)?;
        validate_unit_code(&new.unit_of_measurement)?;

        let db = &*self.db;

        let created = item::ActiveModel {
            item_name: Set(new.item_name.clone()),
            item_group: Set(new.item_group),
            unit_of_measurement: Set(new.unit_of_measurement),
            quantity: Set(new.quantity),
            price_without_vat: Set(new.price_without_vat),
            status: Set(new.status),
            storage_location: Set(new.storage_location),
            contact_person: Set(new.contact_person),
            photo_path: Set(new.photo_path),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(|e| {
            warn!(error = %e, item_name = %new.item_name, "Failed to create item");
            ServiceError::Conflict(format!("Item '{}' could not be created", new.item_name))
        })?;

        info!(item_id = created.item_id, "Item created");
        self.emit(Event::ItemCreated(created.item_id)).await;

        Ok(created)
    }

    /// Applies a partial update. Direct quantity edits are allowed here; the
    /// reservation core only ever decrements through the transition engine.
    #[instrument(skip(self, update))]
    pub async fn update_item(
        &self,
        item_id: i64,
        update: UpdateItem,
    ) -> Result<item::Model, ServiceError> {
        update.validate()?;
        if let Some(group) = &update.item_group {
            validate_group_code(group)?;
        }
        if let Some(unit) = &update.unit_of_measurement {
            validate_unit_code(unit)?;
        }

        let db = &*self.db;

        let existing = self.get_item(item_id).await?;
        let mut active: item::ActiveModel = existing.into();

        if let Some(name) = update.item_name {
            active.item_name = Set(name);
        }
        if let Some(group) = update.item_group {
            active.item_group = Set(group);
        }
        if let Some(unit) = update.unit_of_measurement {
            active.unit_of_measurement = Set(unit);
        }
        if let Some(quantity) = update.quantity {
            active.quantity = Set(quantity);
        }
        if let Some(price) = update.price_without_vat {
            active.price_without_vat = Set(price);
        }
        if let Some(status) = update.status {
            active.status = Set(status);
        }
        if let Some(location) = update.storage_location {
            active.storage_location = Set(Some(location));
        }
        if let Some(contact) = update.contact_person {
            active.contact_person = Set(Some(contact));
        }
        if let Some(photo) = update.photo_path {
            active.photo_path = Set(Some(photo));
        }

        let updated = active.update(db).await.map_err(|e| {
            error!(error = %e, item_id, "Failed to update item");
            ServiceError::DatabaseError(e)
        })?;

        info!(item_id, "Item updated");
        self.emit(Event::ItemUpdated(item_id)).await;

        Ok(updated)
    }

    /// Deletes an item. Requests referencing it cascade away with it.
    #[instrument(skip(self))]
    pub async fn delete_item(&self, item_id: i64) -> Result<(), ServiceError> {
        let db = &*self.db;

        let existing = self.get_item(item_id).await?;
        existing.delete(db).await.map_err(|e| {
            error!(error = %e, item_id, "Failed to delete item");
            ServiceError::DatabaseError(e)
        })?;

        info!(item_id, "Item deleted");
        self.emit(Event::ItemDeleted(item_id)).await;

        Ok(())
    }

    /// Fetches one item by id.
    #[instrument(skip(self))]
    pub async fn get_item(&self, item_id: i64) -> Result<item::Model, ServiceError> {
        let db = &*self.db;

        ItemEntity::find_by_id(item_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", item_id)))
    }

    /// Exact-name lookup.
    #[instrument(skip(self))]
    pub async fn find_by_name(&self, item_name: &str) -> Result<item::Model, ServiceError> {
        let db = &*self.db;

        ItemEntity::find()
            .filter(item::Column::ItemName.eq(item_name))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Item '{}' not found", item_name)))
    }

    /// Lists items with sorting and pagination.
    #[instrument(skip(self))]
    pub async fn list_items(
        &self,
        page: u64,
        limit: u64,
        sort_by: Option<&str>,
        sort_order: Option<&str>,
    ) -> Result<(Vec<item::Model>, u64), ServiceError> {
        if page == 0 {
            return Err(ServiceError::ValidationError(
                "Page number must be greater than 0".to_string(),
            ));
        }
        if limit == 0 || limit > 1000 {
            return Err(ServiceError::ValidationError(
                "Limit must be between 1 and 1000".to_string(),
            ));
        }

        let db = &*self.db;

        let column = match sort_by {
            Some(name) => order_column(name).ok_or_else(|| {
                ServiceError::InvalidInput(format!("Cannot sort items by '{name}'"))
            })?,
            None => item::Column::ItemName,
        };
        let mut query = ItemEntity::find();
        query = match sort_order {
            Some(order) if order.eq_ignore_ascii_case("desc") => query.order_by_desc(column),
            _ => query.order_by_asc(column),
        };

        let paginator = query.paginate(db, limit);
        let total = paginator.num_items().await.map_err(|e| {
            error!(error = %e, "Failed to count items");
            ServiceError::DatabaseError(e)
        })?;
        let items = paginator.fetch_page(page - 1).await.map_err(|e| {
            error!(error = %e, page, limit, "Failed to fetch items page");
            ServiceError::DatabaseError(e)
        })?;

        Ok((items, total))
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "Failed to send item event");
            }
        }
    }
}

fn validate_group_code(code: &str) -> Result<(), ServiceError> {
    ItemGroup::from_str(code)
        .map(|_| ())
        .ok_or_else(|| ServiceError::InvalidInput(format!("Unknown item group '{code}'")))
}

fn validate_unit_code(code: &str) -> Result<(), ServiceError> {
    ItemUnit::from_str(code)
        .map(|_| ())
        .ok_or_else(|| ServiceError::InvalidInput(format!("Unknown unit of measurement '{code}'")))
}

fn order_column(name: &str) -> Option<item::Column> {
    match name {
        "item_id" => Some(item::Column::ItemId),
        "item_name" => Some(item::Column::ItemName),
        "item_group" => Some(item::Column::ItemGroup),
        "quantity" => Some(item::Column::Quantity),
        "price_without_vat" => Some(item::Column::PriceWithoutVat),
        "status" => Some(item::Column::Status),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn group_and_unit_codes_are_checked() {
        assert!(validate_group_code("G-1").is_ok());
        assert_matches!(
            validate_group_code("G-7"),
            Err(ServiceError::InvalidInput(_))
        );
        assert!(validate_unit_code("U-2").is_ok());
        assert_matches!(validate_unit_code("kg"), Err(ServiceError::InvalidInput(_)));
    }

    #[test]
    fn items_sort_whitelist_rejects_unknown_columns() {
        assert!(order_column("item_name").is_some());
        assert!(order_column("photo_path").is_none());
    }
}
