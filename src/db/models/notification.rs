//! Per-user notification log.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// What triggered a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    NewJob,
    JobActivated,
    NewApplication,
    ApplicationStatus,
    General,
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NewJob => write!(f, "NEW_JOB"),
            Self::JobActivated => write!(f, "JOB_ACTIVATED"),
            Self::NewApplication => write!(f, "NEW_APPLICATION"),
            Self::ApplicationStatus => write!(f, "APPLICATION_STATUS"),
            Self::General => write!(f, "GENERAL"),
        }
    }
}

impl std::str::FromStr for NotificationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "NEW_JOB" => Ok(Self::NewJob),
            "JOB_ACTIVATED" => Ok(Self::JobActivated),
            "NEW_APPLICATION" => Ok(Self::NewApplication),
            "APPLICATION_STATUS" => Ok(Self::ApplicationStatus),
            "GENERAL" => Ok(Self::General),
            _ => Err(format!("Unknown notification type: {}", s)),
        }
    }
}

impl From<String> for NotificationType {
    fn from(s: String) -> Self {
        s.parse().unwrap_or(Self::General)
    }
}

/// A persisted notification. Only its recipient may read, mark or delete it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub message: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub related_id: Option<String>,
    pub is_read: bool,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_type_falls_back_to_general() {
        assert_eq!(NotificationType::from("NEW_JOB".to_string()), NotificationType::NewJob);
        assert_eq!(NotificationType::from("bogus".to_string()), NotificationType::General);
    }

    #[test]
    fn test_type_serialized_under_type_key() {
        let n = Notification {
            id: "n1".into(),
            user_id: "u1".into(),
            message: "hello".into(),
            notification_type: NotificationType::NewApplication,
            related_id: Some("j1".into()),
            is_read: false,
            created_at: super::super::timestamp(),
        };
        let value = serde_json::to_value(&n).unwrap();
        assert_eq!(value["type"], "NEW_APPLICATION");
        assert_eq!(value["related_id"], "j1");
    }
}
