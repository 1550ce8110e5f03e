pub mod health;
pub mod items;
pub mod request_rows;
pub mod requests;

use std::sync::Arc;

use crate::db::DbPool;
use crate::events::EventSender;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub items: Arc<crate::services::items::ItemService>,
    pub requests: Arc<crate::services::requests::RequestService>,
    pub request_rows: Arc<crate::services::request_rows::RequestRowService>,
    pub status: Arc<crate::services::status::StatusTransitionService>,
}

impl AppServices {
    /// Builds the service container shared by all handlers.
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        let items = Arc::new(crate::services::items::ItemService::new(
            db.clone(),
            Some(event_sender.clone()),
        ));
        let requests = Arc::new(crate::services::requests::RequestService::new(
            db.clone(),
            Some(event_sender.clone()),
        ));
        let request_rows = Arc::new(crate::services::request_rows::RequestRowService::new(
            db.clone(),
        ));
        let status = Arc::new(crate::services::status::StatusTransitionService::new(
            db,
            Some(event_sender),
        ));

        Self {
            items,
            requests,
            request_rows,
            status,
        }
    }
}

/// Maps a wire status name to the internal status enum. Accepts both the
/// spelled-out form and the stored three-letter code.
pub(crate) fn map_status_str(
    status: &str,
) -> Result<crate::entities::RequestStatus, crate::errors::ServiceError> {
    use crate::entities::RequestStatus;

    match status.to_ascii_lowercase().as_str() {
        "new" => Ok(RequestStatus::New),
        "approved" | "apr" => Ok(RequestStatus::Approved),
        "rejected" | "rej" => Ok(RequestStatus::Rejected),
        other => Err(crate::errors::ServiceError::InvalidStatus(format!(
            "Unknown request status: {other}"
        ))),
    }
}

/// Spelled-out wire name for a stored status code.
pub(crate) fn status_wire_name(stored: &str) -> String {
    match crate::entities::RequestStatus::from_str(stored) {
        Some(crate::entities::RequestStatus::New) => "new".to_string(),
        Some(crate::entities::RequestStatus::Approved) => "approved".to_string(),
        Some(crate::entities::RequestStatus::Rejected) => "rejected".to_string(),
        None => stored.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::RequestStatus;

    #[test]
    fn wire_statuses_map_both_spellings() {
        assert_eq!(map_status_str("approved").unwrap(), RequestStatus::Approved);
        assert_eq!(map_status_str("APR").unwrap(), RequestStatus::Approved);
        assert_eq!(map_status_str("new").unwrap(), RequestStatus::New);
        assert!(map_status_str("done").is_err());
    }

    #[test]
    fn stored_codes_render_spelled_out() {
        assert_eq!(status_wire_name("apr"), "approved");
        assert_eq!(status_wire_name("rej"), "rejected");
        assert_eq!(status_wire_name("new"), "new");
    }
}
