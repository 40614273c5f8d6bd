use chrono::Utc;
use serde::Serialize;

use crate::error::AppResult;
use crate::models::{new_id, Notification, NotificationKind, NotificationPriority};
use crate::repository::FleetStore;

pub struct NewNotification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub priority: NotificationPriority,
    pub link_to: Option<String>,
    pub related_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationFeed {
    pub data: Vec<Notification>,
    pub unread_count: usize,
}

pub async fn emit(store: &FleetStore, notification: NewNotification) -> AppResult<Notification> {
    let record = Notification {
        id: new_id(),
        kind: notification.kind,
        title: notification.title,
        message: notification.message,
        timestamp: Utc::now(),
        read: false,
        link_to: notification.link_to,
        related_id: notification.related_id,
        priority: notification.priority,
    };
    store.put(&record).await
}

pub async fn feed(store: &FleetStore) -> AppResult<NotificationFeed> {
    let mut data = store.list::<Notification>().await?;
    // Stable sort: equal timestamps keep the later insert first.
    data.reverse();
    data.sort_by(|left, right| right.timestamp.cmp(&left.timestamp));
    let unread_count = data.iter().filter(|item| !item.read).count();
    Ok(NotificationFeed { data, unread_count })
}

pub async fn mark_read(store: &FleetStore, notification_id: &str) -> AppResult<Notification> {
    let mut notification = store.get::<Notification>(notification_id).await?;
    if notification.read {
        return Ok(notification);
    }
    notification.read = true;
    store.put(&notification).await
}

/// Returns how many notifications changed.
pub async fn mark_all_read(store: &FleetStore) -> AppResult<usize> {
    let mut changed = 0;
    for mut notification in store.list::<Notification>().await? {
        if notification.read {
            continue;
        }
        notification.read = true;
        store.put(&notification).await?;
        changed += 1;
    }
    Ok(changed)
}

pub async fn delete(store: &FleetStore, notification_id: &str) -> AppResult<Notification> {
    store.delete::<Notification>(notification_id).await
}

pub async fn clear_all(store: &FleetStore) -> AppResult<usize> {
    let all = store.list::<Notification>().await?;
    for notification in &all {
        store.delete::<Notification>(&notification.id).await?;
    }
    Ok(all.len())
}
