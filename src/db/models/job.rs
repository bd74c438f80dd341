//! Job postings, search filters and listing views.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobType {
    FullTime,
    PartTime,
    Contract,
    Internship,
    Remote,
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FullTime => write!(f, "FULL_TIME"),
            Self::PartTime => write!(f, "PART_TIME"),
            Self::Contract => write!(f, "CONTRACT"),
            Self::Internship => write!(f, "INTERNSHIP"),
            Self::Remote => write!(f, "REMOTE"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExperienceLevel {
    EntryLevel,
    MidLevel,
    SeniorLevel,
    Executive,
}

impl std::fmt::Display for ExperienceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EntryLevel => write!(f, "ENTRY_LEVEL"),
            Self::MidLevel => write!(f, "MID_LEVEL"),
            Self::SeniorLevel => write!(f, "SENIOR_LEVEL"),
            Self::Executive => write!(f, "EXECUTIVE"),
        }
    }
}

/// Job posting owned by the recruiter in `posted_by`
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Job {
    pub id: String,
    pub title: String,
    pub description: String,
    pub company: String,
    pub location: String,
    pub salary: f64,
    pub job_type: JobType,
    pub experience_level: Option<ExperienceLevel>,
    pub requirements: Option<String>,
    pub responsibilities: Option<String>,
    pub posted_by: String,
    pub deadline: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Job {
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.posted_by == user_id
    }

    /// True when a deadline is set and lies before `now`.
    /// Unparseable deadlines count as passed.
    pub fn deadline_passed(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        match self.deadline.as_deref() {
            None => false,
            Some(deadline) => match super::parse_timestamp(deadline) {
                Some(at) => at < now,
                None => true,
            },
        }
    }
}

/// Job with the poster's name and its application count, for listings
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct JobSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub job: Job,
    pub posted_by_name: String,
    pub application_count: i64,
}

/// Create/update payload. Required fields are validated by the job store.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub location: String,
    pub salary: Option<f64>,
    pub job_type: Option<JobType>,
    pub experience_level: Option<ExperienceLevel>,
    pub requirements: Option<String>,
    pub responsibilities: Option<String>,
    /// RFC 3339 or ISO local date-time (UTC)
    pub deadline: Option<String>,
}

/// Free-text search over active jobs (`GET /jobs/search`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobSearch {
    pub title: Option<String>,
    pub location: Option<String>,
    pub company: Option<String>,
    pub job_type: Option<JobType>,
    pub min_salary: Option<f64>,
    pub max_salary: Option<f64>,
}

/// Structured filter over active jobs (`GET /jobs/filter`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobFilter {
    pub job_type: Option<JobType>,
    pub experience_level: Option<ExperienceLevel>,
    pub min_salary: Option<f64>,
    pub max_salary: Option<f64>,
}
