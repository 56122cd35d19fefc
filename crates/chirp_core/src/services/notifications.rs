//! crates/chirp_core/src/services/notifications.rs
//!
//! The per-user notification inbox.

use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{Notification, NotificationDetails};
use crate::error::{ServiceError, ServiceResult};
use crate::ports::{DatabaseService, PortError};

#[derive(Clone)]
pub struct NotificationService {
    db: Arc<dyn DatabaseService>,
}

impl NotificationService {
    pub fn new(db: Arc<dyn DatabaseService>) -> Self {
        Self { db }
    }

    /// Newest first.
    pub async fn list(&self, user_id: Uuid) -> ServiceResult<Vec<NotificationDetails>> {
        Ok(self.db.list_notifications(user_id).await?)
    }

    pub async fn unread_count(&self, user_id: Uuid) -> ServiceResult<u64> {
        Ok(self.db.count_unread_notifications(user_id).await?)
    }

    pub async fn mark_read(
        &self,
        user_id: Uuid,
        notification_id: Uuid,
    ) -> ServiceResult<Notification> {
        self.db
            .mark_notification_read(user_id, notification_id)
            .await
            .map_err(|e| match e {
                PortError::NotFound(_) => ServiceError::not_found(format!(
                    "Notification with ID {notification_id} not found"
                )),
                other => other.into(),
            })
    }

    pub async fn mark_all_read(&self, user_id: Uuid) -> ServiceResult<u64> {
        Ok(self.db.mark_all_notifications_read(user_id).await?)
    }
}
