//! Notification dispatch.
//!
//! Workflows hand a [`NotificationEvent`] to a [`Notifier`], which queues
//! it without waiting. The [`NotificationWorker`] drains the queue in the
//! background: addressed events are written to the notification log
//! first, then pushed to connected clients through the [`PushHub`].
//! Nothing here reports back to the request that raised the event; a
//! full queue or an offline recipient is logged and the event moves on.

pub mod hub;
pub mod store;

pub use hub::{PushHub, PushMessage, Topic, UserSubscription, USER_DESTINATION};
pub use store::NotificationStore;

use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::api::metrics::record_notification;
use crate::db::{timestamp, ApplicationStatus, DbPool, JobType, NotificationType};

#[derive(Debug, Clone, PartialEq)]
pub enum NotificationEvent {
    /// Broadcast only, no log rows
    JobPosted {
        job_id: String,
        title: String,
        company: String,
        location: String,
        salary: f64,
        job_type: JobType,
    },
    /// Broadcast only, no log rows
    JobReactivated {
        job_id: String,
        title: String,
        company: String,
    },
    ApplicationReceived {
        application_id: String,
        job_id: String,
        job_title: String,
        recruiter_id: String,
        applicant_name: String,
    },
    ApplicationStatusChanged {
        application_id: String,
        job_id: String,
        job_title: String,
        applicant_id: String,
        status: ApplicationStatus,
    },
}

impl NotificationEvent {
    pub fn kind(&self) -> NotificationType {
        match self {
            Self::JobPosted { .. } => NotificationType::NewJob,
            Self::JobReactivated { .. } => NotificationType::JobActivated,
            Self::ApplicationReceived { .. } => NotificationType::NewApplication,
            Self::ApplicationStatusChanged { .. } => NotificationType::ApplicationStatus,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::JobPosted { title, company, .. } => {
                format!("New job posted: {} at {}", title, company)
            }
            Self::JobReactivated { title, company, .. } => {
                format!("Job reopened: {} at {}", title, company)
            }
            Self::ApplicationReceived {
                job_title,
                applicant_name,
                ..
            } => format!("{} applied for {}", applicant_name, job_title),
            Self::ApplicationStatusChanged {
                job_title, status, ..
            } => format!("Your application for {} is now {}", job_title, status),
        }
    }
}

/// Cloneable, non-blocking handle for raising notification events
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::Sender<NotificationEvent>,
}

impl Notifier {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<NotificationEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    pub fn notify(&self, event: NotificationEvent) {
        let kind = event.kind();
        match self.tx.try_send(event) {
            Ok(()) => debug!(kind = %kind, "Queued notification"),
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(kind = %kind, "Notification queue full, dropping event");
                record_notification("queue", "dropped");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(kind = %kind, "Notification worker stopped, dropping event");
                record_notification("queue", "dropped");
            }
        }
    }
}

pub struct NotificationWorker {
    store: NotificationStore,
    hub: Arc<PushHub>,
}

impl NotificationWorker {
    pub fn new(db: DbPool, hub: Arc<PushHub>) -> Self {
        Self {
            store: NotificationStore::new(db),
            hub,
        }
    }

    pub async fn run(self, mut rx: mpsc::Receiver<NotificationEvent>) {
        info!("Notification worker started");
        while let Some(event) = rx.recv().await {
            self.process(event).await;
        }
        info!("Notification worker stopped");
    }

    pub async fn process(&self, event: NotificationEvent) {
        let message = event.message();
        let kind = event.kind();

        match &event {
            NotificationEvent::JobPosted {
                job_id,
                title,
                company,
                location,
                salary,
                job_type,
            } => {
                let payload = json!({
                    "type": kind,
                    "message": message,
                    "job_id": job_id,
                    "title": title,
                    "company": company,
                    "location": location,
                    "salary": salary,
                    "job_type": job_type,
                    "timestamp": timestamp(),
                });
                self.broadcast(Topic::NewJobs, payload.clone());
                self.broadcast(Topic::Notifications, payload);
            }
            NotificationEvent::JobReactivated {
                job_id,
                title,
                company,
            } => {
                let payload = json!({
                    "type": kind,
                    "message": message,
                    "job_id": job_id,
                    "title": title,
                    "company": company,
                    "timestamp": timestamp(),
                });
                self.broadcast(Topic::JobUpdates, payload);
            }
            NotificationEvent::ApplicationReceived {
                application_id,
                job_id,
                recruiter_id,
                applicant_name,
                ..
            } => {
                let notification_id = self.persist(recruiter_id, &message, kind, job_id).await;
                let mut payload = json!({
                    "type": kind,
                    "message": message,
                    "notification_id": notification_id,
                    "application_id": application_id,
                    "job_id": job_id,
                    "applicant_name": applicant_name,
                    "timestamp": timestamp(),
                });
                self.push(recruiter_id, payload.clone());
                payload["recruiter_id"] = Value::from(recruiter_id.as_str());
                self.broadcast(Topic::Recruiters, payload);
            }
            NotificationEvent::ApplicationStatusChanged {
                application_id,
                job_id,
                applicant_id,
                status,
                ..
            } => {
                let notification_id = self
                    .persist(applicant_id, &message, kind, application_id)
                    .await;
                let payload = json!({
                    "type": kind,
                    "message": message,
                    "notification_id": notification_id,
                    "application_id": application_id,
                    "job_id": job_id,
                    "status": status,
                    "timestamp": timestamp(),
                });
                self.push(applicant_id, payload);
            }
        }
    }

    /// Write a log row. Failures are logged; the push still goes out.
    async fn persist(
        &self,
        user_id: &str,
        message: &str,
        kind: NotificationType,
        related_id: &str,
    ) -> Option<String> {
        match self.store.create(user_id, message, kind, Some(related_id)).await {
            Ok(notification) => {
                record_notification("log", "stored");
                Some(notification.id)
            }
            Err(e) => {
                warn!(user_id = %user_id, kind = %kind, error = %e, "Failed to store notification");
                record_notification("log", "failed");
                None
            }
        }
    }

    fn push(&self, user_id: &str, payload: Value) {
        let delivered = self.hub.send_to_user(user_id, payload);
        if delivered == 0 {
            debug!(user_id = %user_id, "Recipient not connected, push skipped");
            record_notification("private", "offline");
        } else {
            record_notification("private", "delivered");
        }
    }

    fn broadcast(&self, topic: Topic, payload: Value) {
        let receivers = self.hub.broadcast(topic, payload);
        debug!(topic = %topic, receivers, "Broadcast notification");
        record_notification("topic", if receivers == 0 { "no_subscribers" } else { "delivered" });
    }
}
