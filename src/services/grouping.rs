//! Grouping allocator: assigns group ids and positions, promotes a
//! standalone request into a new group and appends members to existing
//! groups.
//!
//! Allocation is max-plus-one computed on the caller's transaction, so the
//! number is consumed by the insert that follows it atomically. Count-based
//! allocation would hand out colliding ids after a deletion or under
//! concurrent writers.

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, QueryFilter,
    QuerySelect, Set,
};
use tracing::{error, info};

use crate::entities::request::{self, Entity as RequestEntity, RequestStatus};
use crate::entities::request_row::{self, Entity as RequestRowEntity};
use crate::errors::ServiceError;

/// Field set a new member is built from, whether copied from an existing
/// request or entered fresh.
#[derive(Debug, Clone)]
pub struct MemberDraft {
    pub item_id: i64,
    pub unit_of_measurement: String,
    pub quantity: i32,
    pub price_without_vat: Decimal,
    pub comment: String,
    pub status: String,
}

impl From<&request::Model> for MemberDraft {
    fn from(model: &request::Model) -> Self {
        Self {
            item_id: model.item_id,
            unit_of_measurement: model.unit_of_measurement.clone(),
            quantity: model.quantity,
            price_without_vat: model.price_without_vat,
            comment: model.comment.clone(),
            status: model.status.clone(),
        }
    }
}

/// Next unused group id: one past the highest id ever handed out.
pub async fn next_group_id<C: ConnectionTrait>(conn: &C) -> Result<i32, ServiceError> {
    let max: Option<i32> = RequestRowEntity::find()
        .select_only()
        .column_as(request_row::Column::GroupId.max(), "max_group_id")
        .into_tuple::<Option<i32>>()
        .one(conn)
        .await?
        .flatten();

    Ok(max.unwrap_or(0) + 1)
}

/// Next position inside a group: one past its current highest position.
/// Positions stay dense because members are only ever appended.
pub async fn next_position<C: ConnectionTrait>(
    conn: &C,
    group_id: i32,
) -> Result<i32, ServiceError> {
    let max: Option<i32> = RequestRowEntity::find()
        .select_only()
        .column_as(request_row::Column::Position.max(), "max_position")
        .filter(request_row::Column::GroupId.eq(group_id))
        .into_tuple::<Option<i32>>()
        .one(conn)
        .await?
        .flatten();

    Ok(max.unwrap_or(0) + 1)
}

fn insert_failed(group_id: i32, e: sea_orm::DbErr) -> ServiceError {
    error!(error = %e, group_id, "Failed to persist request row member");
    ServiceError::Conflict(format!(
        "Could not add the request to request row {}",
        group_id
    ))
}

/// Promotes a standalone request into a brand-new group.
///
/// Inserts the group's position-1 member with the request's fields, then
/// deletes the source request; one logical record, never in both tables.
/// Runs entirely on the caller's transaction: if the insert fails the caller
/// rolls back and the request is untouched.
pub async fn promote_to_group<C: ConnectionTrait>(
    conn: &C,
    request_id: i64,
) -> Result<(i32, request_row::Model), ServiceError> {
    let source = RequestEntity::find_by_id(request_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Request {} not found", request_id)))?;

    // Only pending requests are eligible; a resolved one already had its
    // stock effect applied or refused.
    if source.status != RequestStatus::New.as_str() {
        return Err(ServiceError::InvalidInput(format!(
            "Request {} is not new and cannot join a request row",
            request_id
        )));
    }

    let group_id = next_group_id(conn).await?;
    let draft = MemberDraft::from(&source);

    let member = request_row::ActiveModel {
        group_id: Set(group_id),
        position: Set(1),
        item_id: Set(draft.item_id),
        unit_of_measurement: Set(draft.unit_of_measurement),
        quantity: Set(draft.quantity),
        price_without_vat: Set(draft.price_without_vat),
        comment: Set(draft.comment),
        status: Set(draft.status),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(|e| insert_failed(group_id, e))?;

    source.delete(conn).await?;

    info!(request_id, group_id, "Request promoted into a new request row");

    Ok((group_id, member))
}

/// Appends fresh-entered data to an existing group at the next position.
pub async fn append_to_group<C: ConnectionTrait>(
    conn: &C,
    group_id: i32,
    draft: MemberDraft,
) -> Result<request_row::Model, ServiceError> {
    let position = next_position(conn, group_id).await?;
    if position == 1 {
        return Err(ServiceError::NotFound(format!(
            "Request row {} not found",
            group_id
        )));
    }

    let resolved = RequestRowEntity::find()
        .filter(request_row::Column::GroupId.eq(group_id))
        .filter(request_row::Column::Status.ne(RequestStatus::New.as_str()))
        .one(conn)
        .await?;
    if resolved.is_some() {
        return Err(ServiceError::InvalidInput(format!(
            "Request row {} is already resolved and cannot grow",
            group_id
        )));
    }

    let member = request_row::ActiveModel {
        group_id: Set(group_id),
        position: Set(position),
        item_id: Set(draft.item_id),
        unit_of_measurement: Set(draft.unit_of_measurement),
        quantity: Set(draft.quantity),
        price_without_vat: Set(draft.price_without_vat),
        comment: Set(draft.comment),
        status: Set(draft.status),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(|e| insert_failed(group_id, e))?;

    info!(group_id, position, "Appended member to request row");

    Ok(member)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[test]
    fn member_draft_copies_every_request_field() {
        let source = request::Model {
            request_id: 9,
            employee_id: 4,
            item_id: 2,
            unit_of_measurement: "U-1".to_string(),
            quantity: 5,
            price_without_vat: dec!(42.50),
            comment: "restock shelf 4".to_string(),
            status: "new".to_string(),
            created_at: Utc::now(),
            updated_at: None,
        };

        let draft = MemberDraft::from(&source);
        assert_eq!(draft.item_id, 2);
        assert_eq!(draft.unit_of_measurement, "U-1");
        assert_eq!(draft.quantity, 5);
        assert_eq!(draft.price_without_vat, dec!(42.50));
        assert_eq!(draft.comment, "restock shelf 4");
        assert_eq!(draft.status, "new");
    }
}
