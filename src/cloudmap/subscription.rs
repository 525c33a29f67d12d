//! Push subscriptions.
//!
//! A subscription asks the store to notify the device whenever a record of
//! one entity matching a predicate is created, updated or deleted. It uses the
//! same [`Predicate`] as the query path and is otherwise independent of the
//! DAO stack.

use crate::error::Result;
use crate::fields::Predicate;
use crate::model::RecordId;
use crate::store::CloudDatabase;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationReason {
    RecordCreated,
    RecordUpdated,
    RecordDeleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionOptions {
    pub fires_on_create: bool,
    pub fires_on_update: bool,
    pub fires_on_delete: bool,
}

impl SubscriptionOptions {
    pub fn all() -> Self {
        Self {
            fires_on_create: true,
            fires_on_update: true,
            fires_on_delete: true,
        }
    }

    pub fn fires_on(&self, reason: NotificationReason) -> bool {
        match reason {
            NotificationReason::RecordCreated => self.fires_on_create,
            NotificationReason::RecordUpdated => self.fires_on_update,
            NotificationReason::RecordDeleted => self.fires_on_delete,
        }
    }
}

/// What the device shows when a notification arrives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationInfo {
    pub alert_body: String,
    pub sound_name: Option<String>,
    pub should_badge: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Subscription {
    pub subscription_id: String,
    pub record_type: String,
    pub predicate: Predicate,
    pub options: SubscriptionOptions,
    pub notification_info: NotificationInfo,
}

/// A notification fired by the store for one subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub subscription_id: String,
    pub record_id: RecordId,
    pub reason: NotificationReason,
    pub alert_body: String,
}

pub struct CloudSubscriptions<D: ?Sized> {
    database: Arc<D>,
}

impl<D: CloudDatabase + ?Sized> CloudSubscriptions<D> {
    pub fn new(database: Arc<D>) -> Self {
        Self { database }
    }

    /// Subscribe with an empty alert body.
    pub async fn create_subscription(
        &self,
        subscription_id: &str,
        entity_name: &str,
        predicate: Option<Predicate>,
    ) -> Result<Subscription> {
        self.create_subscription_with_info(
            subscription_id,
            entity_name,
            predicate,
            NotificationInfo::default(),
        )
        .await
    }

    /// Subscribe to creates, updates and deletes of matching records.
    /// A missing predicate matches every record of the entity.
    pub async fn create_subscription_with_info(
        &self,
        subscription_id: &str,
        entity_name: &str,
        predicate: Option<Predicate>,
        notification_info: NotificationInfo,
    ) -> Result<Subscription> {
        let subscription = Subscription {
            subscription_id: subscription_id.to_string(),
            record_type: entity_name.to_string(),
            predicate: predicate.unwrap_or(Predicate::All),
            options: SubscriptionOptions::all(),
            notification_info,
        };
        debug!(subscription_id, entity = entity_name, "saving subscription");
        self.database.save_subscription(subscription).await
    }

    /// Returns the id of the removed subscription.
    pub async fn delete_subscription(&self, subscription_id: &str) -> Result<String> {
        debug!(subscription_id, "deleting subscription");
        self.database.delete_subscription(subscription_id).await
    }
}
