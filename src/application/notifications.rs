//! Outbound notification delivery for grant state transitions.
//!
//! The transport is an external collaborator: whatever implements
//! [`NotificationsService`] is assumed to retry and de-duplicate on its own,
//! so the grant service fires and forgets.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    AccessGranted,
    AccessRevoked,
}

impl NotificationKind {
    #[must_use]
    pub fn event_name(self) -> &'static str {
        match self {
            Self::AccessGranted => "access_granted",
            Self::AccessRevoked => "access_revoked",
        }
    }
}

#[derive(Debug, Clone)]
pub struct StateChangeNotification {
    pub uuid: Uuid,
    pub kind: NotificationKind,
    pub timestamp: DateTime<Utc>,
    pub user_id: UserId,
    pub feature: String,
}

/// Delivers `access_granted`/`access_revoked` notifications to configured
/// subscribers. Implementations are not expected to block the caller on
/// delivery failure — see module docs.
#[async_trait]
pub trait NotificationsService: Send + Sync {
    async fn notify(&self, notification: StateChangeNotification);
}

/// Logs notifications via `tracing` instead of delivering them anywhere.
/// Used when no subscriber URLs are configured, and in tests.
pub struct LoggingNotificationsService;

#[async_trait]
impl NotificationsService for LoggingNotificationsService {
    async fn notify(&self, notification: StateChangeNotification) {
        tracing::info!(
            event = notification.kind.event_name(),
            user_id = %notification.user_id,
            feature = %notification.feature,
            "state change notification"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn logging_service_does_not_panic() {
        let service = LoggingNotificationsService;
        service
            .notify(StateChangeNotification {
                uuid: Uuid::new_v4(),
                kind: NotificationKind::AccessGranted,
                timestamp: Utc::now(),
                user_id: UserId::new("u1"),
                feature: "message".to_string(),
            })
            .await;
    }
}
