use std::sync::Arc;

use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use tracing::{error, instrument};

use crate::db::DbPool;
use crate::entities::request_row::{self, Entity as RequestRowEntity};
use crate::errors::ServiceError;

/// Read side of request rows (linked orders). A group is implicit: it is the
/// set of members sharing a group id, so every query works on members
/// ordered by group and position.
#[derive(Clone)]
pub struct RequestRowService {
    db: Arc<DbPool>,
}

impl RequestRowService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Lists members across all groups, ordered by group then position.
    #[instrument(skip(self))]
    pub async fn list_members(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<request_row::Model>, u64), ServiceError> {
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

        let paginator = RequestRowEntity::find()
            .order_by_asc(request_row::Column::GroupId)
            .order_by_asc(request_row::Column::Position)
            .paginate(db, limit);

        let total = paginator.num_items().await.map_err(|e| {
            error!(error = %e, "Failed to count request row members");
            ServiceError::DatabaseError(e)
        })?;
        let members = paginator.fetch_page(page - 1).await.map_err(|e| {
            error!(error = %e, page, limit, "Failed to fetch request row page");
            ServiceError::DatabaseError(e)
        })?;

        Ok((members, total))
    }

    /// All members of one group, ascending position.
    #[instrument(skip(self))]
    pub async fn get_group(&self, group_id: i32) -> Result<Vec<request_row::Model>, ServiceError> {
        let db = &*self.db;

        let members = RequestRowEntity::find()
            .filter(request_row::Column::GroupId.eq(group_id))
            .order_by_asc(request_row::Column::Position)
            .all(db)
            .await?;

        if members.is_empty() {
            return Err(ServiceError::NotFound(format!(
                "Request row {} not found",
                group_id
            )));
        }

        Ok(members)
    }
}
