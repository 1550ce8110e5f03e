//! Stock ledger: the single source of truth for item availability.
//!
//! The ledger performs no sufficiency validation of its own. The
//! check-then-decrement sequence is owned by the status transition engine so
//! the invariant lives in exactly one place; callers hand this module an
//! already-validated amount.

use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, Set};
use tracing::debug;

use crate::entities::item::{self, Entity as ItemEntity};
use crate::errors::ServiceError;

/// Sufficiency check: can `requested` units be taken from `on_hand`?
pub fn in_stock(on_hand: i32, requested: i32) -> bool {
    on_hand - requested >= 0
}

/// Current quantity on hand for an item.
pub async fn quantity_on_hand<C: ConnectionTrait>(
    conn: &C,
    item_id: i64,
) -> Result<i32, ServiceError> {
    let item = ItemEntity::find_by_id(item_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", item_id)))?;

    Ok(item.quantity)
}

/// Persists `item.quantity - amount` as a single field update.
///
/// The caller must already have validated sufficiency and must hold the row
/// inside its own transaction; this function only writes.
pub async fn decrement<C: ConnectionTrait>(
    conn: &C,
    item: item::Model,
    amount: i32,
) -> Result<item::Model, ServiceError> {
    let item_id = item.item_id;
    let remaining = item.quantity - amount;

    let mut active: item::ActiveModel = item.into();
    active.quantity = Set(remaining);
    let updated = active.update(conn).await?;

    debug!(item_id, amount, remaining, "Stock decremented");

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_quantity_is_still_in_stock() {
        assert!(in_stock(5, 5));
    }

    #[test]
    fn shortfall_is_out_of_stock() {
        assert!(!in_stock(4, 5));
    }

    #[test]
    fn zero_request_against_empty_stock_passes() {
        assert!(in_stock(0, 0));
    }
}
