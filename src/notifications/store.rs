//! Durable notification log, one row per recipient.

use crate::db::{timestamp, DbPool, Notification, NotificationType};
use crate::error::{BoardError, BoardResult};

#[derive(Clone)]
pub struct NotificationStore {
    db: DbPool,
}

impl NotificationStore {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        user_id: &str,
        message: &str,
        notification_type: NotificationType,
        related_id: Option<&str>,
    ) -> BoardResult<Notification> {
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO notifications (id, user_id, message, notification_type, related_id, is_read, created_at)
            VALUES (?, ?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(message)
        .bind(notification_type)
        .bind(related_id)
        .bind(timestamp())
        .execute(&self.db)
        .await?;

        self.get(&id).await
    }

    async fn get(&self, id: &str) -> BoardResult<Notification> {
        sqlx::query_as::<_, Notification>("SELECT * FROM notifications WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| BoardError::not_found("Notification not found"))
    }

    /// Newest first
    pub async fn list_for_user(&self, user_id: &str) -> BoardResult<Vec<Notification>> {
        let rows = sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    pub async fn unread_for_user(&self, user_id: &str) -> BoardResult<Vec<Notification>> {
        let rows = sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications WHERE user_id = ? AND is_read = 0 \
             ORDER BY created_at DESC, rowid DESC",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    pub async fn unread_count(&self, user_id: &str) -> BoardResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND is_read = 0",
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;
        Ok(count)
    }

    async fn owned(&self, id: &str, user_id: &str, action: &str) -> BoardResult<Notification> {
        let notification = self.get(id).await?;
        if notification.user_id != user_id {
            return Err(BoardError::forbidden(format!(
                "You are not authorized to {} this notification",
                action
            )));
        }
        Ok(notification)
    }

    pub async fn mark_read(&self, id: &str, user_id: &str) -> BoardResult<Notification> {
        self.owned(id, user_id, "update").await?;
        sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?;
        self.get(id).await
    }

    /// Returns the number of notifications that changed
    pub async fn mark_all_read(&self, user_id: &str) -> BoardResult<u64> {
        let result =
            sqlx::query("UPDATE notifications SET is_read = 1 WHERE user_id = ? AND is_read = 0")
                .bind(user_id)
                .execute(&self.db)
                .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete(&self, id: &str, user_id: &str) -> BoardResult<()> {
        self.owned(id, user_id, "delete").await?;
        sqlx::query("DELETE FROM notifications WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{self, UserRole};
    use crate::users::{registration, UserDirectory};

    async fn setup() -> (NotificationStore, String, String) {
        let pool = db::init_memory().await.unwrap();
        let users = UserDirectory::new(pool.clone());
        let alice = users.register(registration("alice@example.com", UserRole::JobSeeker)).await.unwrap();
        let bob = users.register(registration("bob@example.com", UserRole::Recruiter)).await.unwrap();
        (NotificationStore::new(pool), alice.id, bob.id)
    }

    #[tokio::test]
    async fn test_create_and_list_newest_first() {
        let (store, alice, _) = setup().await;
        store.create(&alice, "first", NotificationType::General, None).await.unwrap();
        let second = store
            .create(&alice, "second", NotificationType::ApplicationStatus, Some("app-1"))
            .await
            .unwrap();

        assert!(!second.is_read);
        assert_eq!(second.related_id.as_deref(), Some("app-1"));

        let all = store.list_for_user(&alice).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].message, "second");
    }

    #[tokio::test]
    async fn test_mark_read_and_counts() {
        let (store, alice, _) = setup().await;
        let n = store.create(&alice, "one", NotificationType::General, None).await.unwrap();
        store.create(&alice, "two", NotificationType::General, None).await.unwrap();
        assert_eq!(store.unread_count(&alice).await.unwrap(), 2);

        assert!(store.mark_read(&n.id, &alice).await.unwrap().is_read);
        assert_eq!(store.unread_for_user(&alice).await.unwrap().len(), 1);

        assert_eq!(store.mark_all_read(&alice).await.unwrap(), 1);
        assert_eq!(store.unread_count(&alice).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_only_recipient_may_touch() {
        let (store, alice, bob) = setup().await;
        let n = store.create(&alice, "private", NotificationType::General, None).await.unwrap();

        assert!(matches!(store.mark_read(&n.id, &bob).await, Err(BoardError::Forbidden(_))));
        assert!(matches!(store.delete(&n.id, &bob).await, Err(BoardError::Forbidden(_))));

        store.delete(&n.id, &alice).await.unwrap();
        assert!(matches!(
            store.delete(&n.id, &alice).await,
            Err(BoardError::NotFound(_))
        ));
    }
}
