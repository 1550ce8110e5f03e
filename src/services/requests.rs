use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::item::{self, Entity as ItemEntity};
use crate::entities::request::{self, Entity as RequestEntity, RequestStatus};
use crate::entities::request_row;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::filter::FilterSelection;
use crate::services::grouping::{self, MemberDraft};

/// Payload for a new request, standalone or grouped. The unit of measurement
/// is not accepted from the caller: it is copied from the item, and the total
/// price is computed from the item's unit price at creation time.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewRequest {
    pub employee_id: i64,
    pub item_id: i64,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    #[validate(length(max = 250, message = "Comment is limited to 250 characters"))]
    #[serde(default)]
    pub comment: String,
}

/// Where a new request should land. The tagged form makes the legacy
/// "both or neither selector" shape unrepresentable: a payload either names
/// one target or none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum GroupTarget {
    /// Plain standalone request.
    Standalone,
    /// Promote this standalone request into a new group; the submitted data
    /// becomes the group's second member.
    ExistingRequest(i64),
    /// Append the submitted data to this group.
    ExistingGroup(i32),
}

impl Default for GroupTarget {
    fn default() -> Self {
        GroupTarget::Standalone
    }
}

/// What a creation call produced.
#[derive(Debug, Clone, Serialize)]
pub enum CreatedRequest {
    Standalone(request::Model),
    Grouped {
        group_id: i32,
        members: Vec<request_row::Model>,
    },
}

#[derive(Clone)]
pub struct RequestService {
    db: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl RequestService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self { db, event_sender }
    }

    /// Creates a plain standalone request.
    #[instrument(skip(self, new), fields(employee_id = %new.employee_id, item_id = %new.item_id))]
    pub async fn create_request(&self, new: NewRequest) -> Result<request::Model, ServiceError> {
        new.validate()?;

        let db = &*self.db;
        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to begin request creation transaction");
            ServiceError::DatabaseError(e)
        })?;

        let item = find_item(&txn, new.item_id).await?;

        let created = request::ActiveModel {
            employee_id: Set(new.employee_id),
            item_id: Set(item.item_id),
            unit_of_measurement: Set(item.unit_of_measurement.clone()),
            quantity: Set(new.quantity),
            price_without_vat: Set(total_price(&item, new.quantity)),
            comment: Set(new.comment.clone()),
            status: Set(RequestStatus::New.as_str().to_string()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit request creation");
            ServiceError::DatabaseError(e)
        })?;

        info!(request_id = created.request_id, "Request created");
        self.emit(Event::RequestCreated(created.request_id)).await;

        Ok(created)
    }

    /// Creates a request routed by `target`: standalone, promoting an
    /// existing standalone request into a new group, or appending to an
    /// existing group. Grouped paths run in one transaction.
    #[instrument(skip(self, new), fields(item_id = %new.item_id, target = ?target))]
    pub async fn create_grouped_request(
        &self,
        new: NewRequest,
        target: GroupTarget,
    ) -> Result<CreatedRequest, ServiceError> {
        new.validate()?;

        match target {
            GroupTarget::Standalone => {
                let created = self.create_request(new).await?;
                Ok(CreatedRequest::Standalone(created))
            }
            GroupTarget::ExistingRequest(request_id) => {
                let db = &*self.db;
                let txn = db.begin().await.map_err(|e| {
                    error!(error = %e, "Failed to begin promotion transaction");
                    ServiceError::DatabaseError(e)
                })?;

                let item = find_item(&txn, new.item_id).await?;
                let (group_id, first) = grouping::promote_to_group(&txn, request_id).await?;
                let second =
                    grouping::append_to_group(&txn, group_id, fresh_draft(&item, &new)).await?;

                txn.commit().await.map_err(|e| {
                    error!(error = %e, "Failed to commit promotion");
                    ServiceError::DatabaseError(e)
                })?;

                self.emit(Event::RequestPromoted {
                    request_id,
                    group_id,
                })
                .await;
                self.emit(Event::GroupMemberAppended {
                    group_id,
                    position: second.position,
                })
                .await;

                Ok(CreatedRequest::Grouped {
                    group_id,
                    members: vec![first, second],
                })
            }
            GroupTarget::ExistingGroup(group_id) => {
                let db = &*self.db;
                let txn = db.begin().await.map_err(|e| {
                    error!(error = %e, "Failed to begin append transaction");
                    ServiceError::DatabaseError(e)
                })?;

                let item = find_item(&txn, new.item_id).await?;
                let member =
                    grouping::append_to_group(&txn, group_id, fresh_draft(&item, &new)).await?;

                txn.commit().await.map_err(|e| {
                    error!(error = %e, "Failed to commit append");
                    ServiceError::DatabaseError(e)
                })?;

                self.emit(Event::GroupMemberAppended {
                    group_id,
                    position: member.position,
                })
                .await;

                Ok(CreatedRequest::Grouped {
                    group_id,
                    members: vec![member],
                })
            }
        }
    }

    /// Fetches one request by id.
    #[instrument(skip(self))]
    pub async fn get_request(&self, request_id: i64) -> Result<request::Model, ServiceError> {
        let db = &*self.db;

        RequestEntity::find_by_id(request_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Request {} not found", request_id)))
    }

    /// Lists requests with the given filter, sort and pagination.
    #[instrument(skip(self, selection))]
    pub async fn list_requests(
        &self,
        selection: &FilterSelection,
        page: u64,
        limit: u64,
        sort_by: Option<&str>,
        sort_order: Option<&str>,
    ) -> Result<(Vec<request::Model>, u64), ServiceError> {
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
        selection.validate()?;

        let db = &*self.db;

        let mut query = RequestEntity::find().filter(selection.condition());

        let column = match sort_by {
            Some(name) => order_column(name).ok_or_else(|| {
                ServiceError::InvalidInput(format!("Cannot sort requests by '{name}'"))
            })?,
            None => request::Column::ItemId,
        };
        query = match sort_order {
            Some(order) if order.eq_ignore_ascii_case("desc") => query.order_by_desc(column),
            _ => query.order_by_asc(column),
        };

        let paginator = query.paginate(db, limit);
        let total = paginator.num_items().await.map_err(|e| {
            error!(error = %e, "Failed to count requests");
            ServiceError::DatabaseError(e)
        })?;
        let requests = paginator.fetch_page(page - 1).await.map_err(|e| {
            error!(error = %e, page, limit, "Failed to fetch requests page");
            ServiceError::DatabaseError(e)
        })?;

        Ok((requests, total))
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "Failed to send request event");
            }
        }
    }
}

async fn find_item<C: sea_orm::ConnectionTrait>(
    conn: &C,
    item_id: i64,
) -> Result<item::Model, ServiceError> {
    ItemEntity::find_by_id(item_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", item_id)))
}

fn total_price(item: &item::Model, quantity: i32) -> Decimal {
    Decimal::from(quantity) * item.price_without_vat
}

fn fresh_draft(item: &item::Model, new: &NewRequest) -> MemberDraft {
    MemberDraft {
        item_id: item.item_id,
        unit_of_measurement: item.unit_of_measurement.clone(),
        quantity: new.quantity,
        price_without_vat: total_price(item, new.quantity),
        comment: new.comment.clone(),
        status: RequestStatus::New.as_str().to_string(),
    }
}

fn order_column(name: &str) -> Option<request::Column> {
    match name {
        "request_id" => Some(request::Column::RequestId),
        "item_id" => Some(request::Column::ItemId),
        "quantity" => Some(request::Column::Quantity),
        "price_without_vat" => Some(request::Column::PriceWithoutVat),
        "status" => Some(request::Column::Status),
        "created_at" => Some(request::Column::CreatedAt),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn widget(price: Decimal) -> item::Model {
        item::Model {
            item_id: 1,
            item_name: "Widget".to_string(),
            item_group: "G-1".to_string(),
            unit_of_measurement: "U-1".to_string(),
            quantity: 10,
            price_without_vat: price,
            status: "stocked".to_string(),
            storage_location: None,
            contact_person: None,
            photo_path: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn total_price_is_quantity_times_unit_price() {
        assert_eq!(total_price(&widget(dec!(2.50)), 4), dec!(10.00));
    }

    #[test]
    fn fresh_draft_copies_unit_from_item_and_starts_new() {
        let new = NewRequest {
            employee_id: 7,
            item_id: 1,
            quantity: 3,
            comment: "for line 2".to_string(),
        };
        let draft = fresh_draft(&widget(dec!(1.10)), &new);
        assert_eq!(draft.unit_of_measurement, "U-1");
        assert_eq!(draft.price_without_vat, dec!(3.30));
        assert_eq!(draft.status, "new");
    }

    #[test]
    fn group_target_json_is_single_valued() {
        let target: GroupTarget =
            serde_json::from_value(serde_json::json!({"kind": "existing_group", "id": 4}))
                .expect("decode target");
        assert_eq!(target, GroupTarget::ExistingGroup(4));

        let standalone: GroupTarget =
            serde_json::from_value(serde_json::json!({"kind": "standalone"}))
                .expect("decode standalone");
        assert_eq!(standalone, GroupTarget::Standalone);

        // Naming two targets at once does not decode into anything.
        assert!(serde_json::from_value::<GroupTarget>(serde_json::json!({
            "kind": ["existing_group", "existing_request"],
            "id": 4
        }))
        .is_err());
    }

    #[test]
    fn unknown_sort_column_is_rejected() {
        assert!(order_column("employee_salary").is_none());
        assert!(order_column("quantity").is_some());
    }
}
