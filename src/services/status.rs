//! Status transition engine: the single authority for moving a request or a
//! request-row member between `New`, `Approved` and `Rejected`, and for the
//! stock decrement that approval implies.
//!
//! Every public operation runs inside one transaction. Approval reads the
//! linked item under an exclusive row lock, so two concurrent approvals of
//! the same item serialize instead of both passing the sufficiency check
//! against a stale quantity.

use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use tracing::{error, info, instrument, warn};

use crate::db::DbPool;
use crate::entities::item::Entity as ItemEntity;
use crate::entities::request::{self, Entity as RequestEntity, RequestStatus};
use crate::entities::request_row::{self, Entity as RequestRowEntity};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::stock;

/// The shape the engine needs from anything it transitions: requests and
/// request-row members both carry a status, a linked item and a quantity.
pub trait StockDemand {
    fn status(&self) -> &str;
    fn item_id(&self) -> i64;
    fn quantity(&self) -> i32;
}

impl StockDemand for request::Model {
    fn status(&self) -> &str {
        &self.status
    }

    fn item_id(&self) -> i64 {
        self.item_id
    }

    fn quantity(&self) -> i32 {
        self.quantity
    }
}

impl StockDemand for request_row::Model {
    fn status(&self) -> &str {
        &self.status
    }

    fn item_id(&self) -> i64 {
        self.item_id
    }

    fn quantity(&self) -> i32 {
        self.quantity
    }
}

/// Parses the stored status and rejects a transition whose target equals the
/// current status. Re-approving an approved record would decrement stock a
/// second time; the guard closes that hole for every status uniformly.
fn ensure_transition_allowed(
    current: &str,
    target: RequestStatus,
) -> Result<RequestStatus, ServiceError> {
    let current = RequestStatus::from_str(current)
        .ok_or_else(|| ServiceError::InvalidStatus(format!("Unknown stored status: {current}")))?;

    if current == target {
        return Err(ServiceError::InvalidStatus(format!(
            "Record is already {}",
            target.as_str()
        )));
    }

    Ok(current)
}

/// Outcome of a stock reservation performed during approval.
struct StockEffect {
    item_id: i64,
    amount: i32,
    remaining: i32,
}

/// Locks the linked item row, checks sufficiency and decrements.
///
/// Row lock and decrement happen on the caller's transaction; on
/// `InsufficientStock` nothing was written.
async fn reserve_stock<C, R>(conn: &C, record: &R) -> Result<StockEffect, ServiceError>
where
    C: sea_orm::ConnectionTrait,
    R: StockDemand,
{
    let item = ItemEntity::find_by_id(record.item_id())
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", record.item_id())))?;

    if !stock::in_stock(item.quantity, record.quantity()) {
        return Err(ServiceError::InsufficientStock(format!(
            "Item '{}' has {} on hand, {} requested",
            item.item_name,
            item.quantity,
            record.quantity()
        )));
    }

    let amount = record.quantity();
    let updated = stock::decrement(conn, item, amount).await?;

    Ok(StockEffect {
        item_id: updated.item_id,
        amount,
        remaining: updated.quantity,
    })
}

#[derive(Clone)]
pub struct StatusTransitionService {
    db: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl StatusTransitionService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self { db, event_sender }
    }

    /// Applies `target` to a standalone request inside one transaction.
    ///
    /// Approval decrements the linked item's stock; rejection and reopening
    /// have no stock effect. Reopening does not restore stock.
    #[instrument(skip(self), fields(request_id = %request_id, target = %target.as_str()))]
    pub async fn transition_request(
        &self,
        request_id: i64,
        target: RequestStatus,
    ) -> Result<request::Model, ServiceError> {
        let db = &*self.db;
        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to begin status transition transaction");
            ServiceError::DatabaseError(e)
        })?;

        let request = RequestEntity::find_by_id(request_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Request {} not found", request_id)))?;

        let old_status = request.status().to_string();
        ensure_transition_allowed(&old_status, target)?;

        let effect = match target {
            RequestStatus::Approved => Some(reserve_stock(&txn, &request).await?),
            RequestStatus::Rejected | RequestStatus::New => None,
        };

        let mut active: request::ActiveModel = request.into();
        active.status = Set(target.as_str().to_string());
        let updated = active.update(&txn).await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, request_id, "Failed to commit status transition");
            ServiceError::DatabaseError(e)
        })?;

        info!(
            request_id,
            old_status = %old_status,
            new_status = %target.as_str(),
            "Request status updated"
        );

        self.emit(Event::RequestStatusChanged {
            request_id,
            old_status,
            new_status: target.as_str().to_string(),
        })
        .await;
        if let Some(effect) = effect {
            self.emit(Event::StockDecremented {
                item_id: effect.item_id,
                amount: effect.amount,
                remaining: effect.remaining,
            })
            .await;
        }

        Ok(updated)
    }

    /// Applies `target` to every member of a group, ascending position, in
    /// one transaction. If any member fails (insufficient stock on any line,
    /// or a guard rejection) the whole batch rolls back and no status or
    /// quantity changes.
    #[instrument(skip(self), fields(group_id = %group_id, target = %target.as_str()))]
    pub async fn transition_group(
        &self,
        group_id: i32,
        target: RequestStatus,
    ) -> Result<Vec<request_row::Model>, ServiceError> {
        let db = &*self.db;
        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to begin group transition transaction");
            ServiceError::DatabaseError(e)
        })?;

        let members = RequestRowEntity::find()
            .filter(request_row::Column::GroupId.eq(group_id))
            .order_by_asc(request_row::Column::Position)
            .all(&txn)
            .await?;

        if members.is_empty() {
            return Err(ServiceError::NotFound(format!(
                "Request row {} not found",
                group_id
            )));
        }

        let member_count = members.len();
        let mut updated_members = Vec::with_capacity(member_count);
        let mut effects = Vec::new();

        for member in members {
            ensure_transition_allowed(member.status(), target)?;

            if target == RequestStatus::Approved {
                effects.push(reserve_stock(&txn, &member).await?);
            }

            let mut active: request_row::ActiveModel = member.into();
            active.status = Set(target.as_str().to_string());
            updated_members.push(active.update(&txn).await?);
        }

        txn.commit().await.map_err(|e| {
            error!(error = %e, group_id, "Failed to commit group transition");
            ServiceError::DatabaseError(e)
        })?;

        info!(
            group_id,
            members = member_count,
            new_status = %target.as_str(),
            "Request row status updated"
        );

        self.emit(Event::GroupStatusChanged {
            group_id,
            new_status: target.as_str().to_string(),
            members: member_count,
        })
        .await;
        for effect in effects {
            self.emit(Event::StockDecremented {
                item_id: effect.item_id,
                amount: effect.amount,
                remaining: effect.remaining,
            })
            .await;
        }

        Ok(updated_members)
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "Failed to send status event");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn guard_rejects_same_status_transitions() {
        assert_matches!(
            ensure_transition_allowed("apr", RequestStatus::Approved),
            Err(ServiceError::InvalidStatus(_))
        );
        assert_matches!(
            ensure_transition_allowed("new", RequestStatus::New),
            Err(ServiceError::InvalidStatus(_))
        );
    }

    #[test]
    fn guard_allows_resolution_and_reopening() {
        assert_matches!(
            ensure_transition_allowed("new", RequestStatus::Approved),
            Ok(RequestStatus::New)
        );
        assert_matches!(
            ensure_transition_allowed("apr", RequestStatus::New),
            Ok(RequestStatus::Approved)
        );
        assert_matches!(
            ensure_transition_allowed("rej", RequestStatus::Approved),
            Ok(RequestStatus::Rejected)
        );
    }

    #[test]
    fn guard_rejects_unknown_stored_status() {
        assert_matches!(
            ensure_transition_allowed("done", RequestStatus::Approved),
            Err(ServiceError::InvalidStatus(_))
        );
    }
}
