//! Job store: postings, search and owner-only mutations.

use chrono::{Duration, Utc};
use sqlx::{QueryBuilder, Sqlite};
use tracing::info;

use crate::api::metrics::record_job_posted;
use crate::auth::Principal;
use crate::db::{
    format_timestamp, parse_timestamp, timestamp, DbPool, Job, JobDraft, JobFilter, JobSearch,
    JobSummary, JobType,
};
use crate::error::{BoardError, BoardResult};
use crate::notifications::{NotificationEvent, Notifier};

const SUMMARY_SELECT: &str = r#"
    SELECT j.*, u.full_name AS posted_by_name,
           (SELECT COUNT(*) FROM job_applications a WHERE a.job_id = j.id) AS application_count
    FROM jobs j
    JOIN users u ON u.id = j.posted_by
"#;

/// A draft that passed validation
struct ValidJob {
    title: String,
    description: String,
    company: String,
    location: String,
    salary: f64,
    job_type: JobType,
    deadline: Option<String>,
}

fn required(value: &str, field: &str, label: &str) -> BoardResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(BoardError::validation(field, format!("{} is required", label)));
    }
    Ok(trimmed.to_string())
}

fn validate_draft(draft: &JobDraft) -> BoardResult<ValidJob> {
    let title = required(&draft.title, "title", "Job title")?;
    let description = required(&draft.description, "description", "Job description")?;
    let company = required(&draft.company, "company", "Company name")?;
    let location = required(&draft.location, "location", "Location")?;

    let salary = draft
        .salary
        .ok_or_else(|| BoardError::validation("salary", "Salary is required"))?;
    if !salary.is_finite() || salary < 0.0 {
        return Err(BoardError::validation("salary", "Salary must be a positive number"));
    }
    let job_type = draft
        .job_type
        .ok_or_else(|| BoardError::validation("job_type", "Job type is required"))?;

    // Stored normalised so string comparison orders by time
    let deadline = match draft.deadline.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(format_timestamp(parse_timestamp(raw).ok_or_else(|| {
            BoardError::validation("deadline", "Deadline must be an ISO 8601 date-time")
        })?)),
    };

    Ok(ValidJob {
        title,
        description,
        company,
        location,
        salary,
        job_type,
        deadline,
    })
}

#[derive(Clone)]
pub struct JobStore {
    db: DbPool,
    notifier: Notifier,
}

impl JobStore {
    pub fn new(db: DbPool, notifier: Notifier) -> Self {
        Self { db, notifier }
    }

    pub async fn create(&self, draft: JobDraft, recruiter: &Principal) -> BoardResult<Job> {
        let valid = validate_draft(&draft)?;
        let id = uuid::Uuid::new_v4().to_string();
        let now = timestamp();

        sqlx::query(
            r#"
            INSERT INTO jobs (id, title, description, company, location, salary, job_type,
                              experience_level, requirements, responsibilities, posted_by,
                              deadline, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&valid.title)
        .bind(&valid.description)
        .bind(&valid.company)
        .bind(&valid.location)
        .bind(valid.salary)
        .bind(valid.job_type)
        .bind(draft.experience_level)
        .bind(&draft.requirements)
        .bind(&draft.responsibilities)
        .bind(&recruiter.user_id)
        .bind(&valid.deadline)
        .bind(&now)
        .bind(&now)
        .execute(&self.db)
        .await?;

        let job = self.get(&id).await?;
        info!(job_id = %job.id, recruiter_id = %recruiter.user_id, "Job posted");
        record_job_posted();

        self.notifier.notify(NotificationEvent::JobPosted {
            job_id: job.id.clone(),
            title: job.title.clone(),
            company: job.company.clone(),
            location: job.location.clone(),
            salary: job.salary,
            job_type: job.job_type,
        });
        Ok(job)
    }

    pub async fn get(&self, id: &str) -> BoardResult<Job> {
        sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| BoardError::not_found(format!("Job not found with id: {}", id)))
    }

    pub async fn get_with_count(&self, id: &str) -> BoardResult<JobSummary> {
        sqlx::query_as::<_, JobSummary>(&format!("{} WHERE j.id = ?", SUMMARY_SELECT))
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| BoardError::not_found(format!("Job not found with id: {}", id)))
    }

    pub async fn list_active(&self) -> BoardResult<Vec<JobSummary>> {
        let jobs = sqlx::query_as::<_, JobSummary>(&format!(
            "{} WHERE j.is_active = 1 ORDER BY j.created_at DESC",
            SUMMARY_SELECT
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(jobs)
    }

    /// Every job the recruiter posted, active or not
    pub async fn list_by_recruiter(&self, recruiter_id: &str) -> BoardResult<Vec<JobSummary>> {
        let jobs = sqlx::query_as::<_, JobSummary>(&format!(
            "{} WHERE j.posted_by = ? ORDER BY j.created_at DESC",
            SUMMARY_SELECT
        ))
        .bind(recruiter_id)
        .fetch_all(&self.db)
        .await?;
        Ok(jobs)
    }

    /// Case-insensitive substring search over active jobs
    pub async fn search(&self, search: &JobSearch) -> BoardResult<Vec<JobSummary>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(SUMMARY_SELECT);
        query.push(" WHERE j.is_active = 1");

        for (column, value) in [
            ("j.title", &search.title),
            ("j.location", &search.location),
            ("j.company", &search.company),
        ] {
            if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                query
                    .push(format!(" AND LOWER({}) LIKE ", column))
                    .push_bind(format!("%{}%", value.to_lowercase()));
            }
        }
        if let Some(job_type) = search.job_type {
            query.push(" AND j.job_type = ").push_bind(job_type);
        }
        push_salary_range(&mut query, search.min_salary, search.max_salary);
        query.push(" ORDER BY j.created_at DESC");

        let jobs = query.build_query_as::<JobSummary>().fetch_all(&self.db).await?;
        Ok(jobs)
    }

    /// Conjunctive structured filter over active jobs
    pub async fn filter(&self, filter: &JobFilter) -> BoardResult<Vec<JobSummary>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(SUMMARY_SELECT);
        query.push(" WHERE j.is_active = 1");
        if let Some(job_type) = filter.job_type {
            query.push(" AND j.job_type = ").push_bind(job_type);
        }
        if let Some(level) = filter.experience_level {
            query.push(" AND j.experience_level = ").push_bind(level);
        }
        push_salary_range(&mut query, filter.min_salary, filter.max_salary);
        query.push(" ORDER BY j.created_at DESC");

        let jobs = query.build_query_as::<JobSummary>().fetch_all(&self.db).await?;
        Ok(jobs)
    }

    /// Active jobs posted within the last `hours`
    pub async fn recent(&self, hours: i64) -> BoardResult<Vec<JobSummary>> {
        let out_of_range = || BoardError::validation("hours", "Hours is out of range");
        let window = Duration::try_hours(hours.max(0)).ok_or_else(out_of_range)?;
        let since = Utc::now()
            .checked_sub_signed(window)
            .ok_or_else(out_of_range)?;
        let since = format_timestamp(since);
        let jobs = sqlx::query_as::<_, JobSummary>(&format!(
            "{} WHERE j.is_active = 1 AND j.created_at >= ? ORDER BY j.created_at DESC",
            SUMMARY_SELECT
        ))
        .bind(since)
        .fetch_all(&self.db)
        .await?;
        Ok(jobs)
    }

    pub async fn count(&self) -> BoardResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs")
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }

    async fn owned(&self, id: &str, recruiter: &Principal, action: &str) -> BoardResult<Job> {
        let job = self.get(id).await?;
        if !job.is_owned_by(&recruiter.user_id) {
            return Err(BoardError::forbidden(format!(
                "You are not authorized to {} this job",
                action
            )));
        }
        Ok(job)
    }

    pub async fn update(&self, id: &str, draft: JobDraft, recruiter: &Principal) -> BoardResult<Job> {
        self.owned(id, recruiter, "update").await?;
        let valid = validate_draft(&draft)?;

        sqlx::query(
            r#"
            UPDATE jobs SET title = ?, description = ?, company = ?, location = ?, salary = ?,
                            job_type = ?, experience_level = ?, requirements = ?,
                            responsibilities = ?, deadline = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&valid.title)
        .bind(&valid.description)
        .bind(&valid.company)
        .bind(&valid.location)
        .bind(valid.salary)
        .bind(valid.job_type)
        .bind(draft.experience_level)
        .bind(&draft.requirements)
        .bind(&draft.responsibilities)
        .bind(&valid.deadline)
        .bind(timestamp())
        .bind(id)
        .execute(&self.db)
        .await?;

        info!(job_id = %id, "Job updated");
        self.get(id).await
    }

    /// Delete a job together with its applications
    pub async fn delete(&self, id: &str, recruiter: &Principal) -> BoardResult<()> {
        self.owned(id, recruiter, "delete").await?;

        let mut tx = self.db.begin().await?;
        let removed = sqlx::query("DELETE FROM job_applications WHERE job_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM jobs WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(job_id = %id, applications_removed = removed, "Job deleted");
        Ok(())
    }

    /// Flip the active flag. Reopening a job notifies the job-updates topic.
    pub async fn toggle_status(&self, id: &str, recruiter: &Principal) -> BoardResult<Job> {
        let job = self.owned(id, recruiter, "update").await?;
        let active = !job.is_active;

        sqlx::query("UPDATE jobs SET is_active = ?, updated_at = ? WHERE id = ?")
            .bind(active)
            .bind(timestamp())
            .bind(id)
            .execute(&self.db)
            .await?;

        let job = self.get(id).await?;
        info!(job_id = %id, active, "Job status toggled");
        if job.is_active {
            self.notifier.notify(NotificationEvent::JobReactivated {
                job_id: job.id.clone(),
                title: job.title.clone(),
                company: job.company.clone(),
            });
        }
        Ok(job)
    }
}

fn push_salary_range(query: &mut QueryBuilder<'_, Sqlite>, min: Option<f64>, max: Option<f64>) {
    if let Some(min) = min {
        query.push(" AND j.salary >= ").push_bind(min);
    }
    if let Some(max) = max {
        query.push(" AND j.salary <= ").push_bind(max);
    }
}

#[cfg(test)]
pub(crate) fn draft(title: &str) -> JobDraft {
    JobDraft {
        title: title.to_string(),
        description: "Build reliable services".to_string(),
        company: "Acme".to_string(),
        location: "Accra".to_string(),
        salary: Some(90_000.0),
        job_type: Some(JobType::FullTime),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{self, ExperienceLevel, UserRole};
    use crate::notifications::NotificationEvent;
    use crate::users::{registration, UserDirectory};
    use tokio::sync::mpsc;

    struct Fixture {
        jobs: JobStore,
        rx: mpsc::Receiver<NotificationEvent>,
        owner: Principal,
        rival: Principal,
    }

    async fn fixture() -> Fixture {
        let pool = db::init_memory().await.unwrap();
        let users = UserDirectory::new(pool.clone());
        let owner = users.register(registration("owner@example.com", UserRole::Recruiter)).await.unwrap();
        let rival = users.register(registration("rival@example.com", UserRole::Recruiter)).await.unwrap();
        let (notifier, rx) = Notifier::channel(16);
        Fixture {
            jobs: JobStore::new(pool, notifier),
            rx,
            owner: Principal::from(&owner),
            rival: Principal::from(&rival),
        }
    }

    #[tokio::test]
    async fn test_create_posts_active_job_and_queues_broadcast() {
        let mut f = fixture().await;
        let job = f.jobs.create(draft("Rust Engineer"), &f.owner).await.unwrap();

        assert!(job.is_active);
        assert_eq!(job.posted_by, f.owner.user_id);
        assert_eq!(job.created_at, job.updated_at);
        match f.rx.try_recv().unwrap() {
            NotificationEvent::JobPosted { job_id, title, .. } => {
                assert_eq!(job_id, job.id);
                assert_eq!(title, "Rust Engineer");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_draft_validation() {
        let f = fixture().await;
        let mut missing_title = draft("  ");
        missing_title.title = "  ".into();
        let err = f.jobs.create(missing_title, &f.owner).await.unwrap_err();
        assert!(matches!(err, BoardError::Validation { ref field, .. } if field == "title"));

        let mut negative = draft("Ops");
        negative.salary = Some(-1.0);
        assert!(f.jobs.create(negative, &f.owner).await.is_err());

        let mut no_type = draft("Ops");
        no_type.job_type = None;
        assert!(f.jobs.create(no_type, &f.owner).await.is_err());

        let mut bad_deadline = draft("Ops");
        bad_deadline.deadline = Some("next tuesday".into());
        assert!(f.jobs.create(bad_deadline, &f.owner).await.is_err());
    }

    #[tokio::test]
    async fn test_non_owner_mutations_are_forbidden() {
        let f = fixture().await;
        let job = f.jobs.create(draft("Rust Engineer"), &f.owner).await.unwrap();

        assert!(matches!(
            f.jobs.update(&job.id, draft("Hijacked"), &f.rival).await,
            Err(BoardError::Forbidden(_))
        ));
        assert!(matches!(
            f.jobs.delete(&job.id, &f.rival).await,
            Err(BoardError::Forbidden(_))
        ));
        assert!(matches!(
            f.jobs.toggle_status(&job.id, &f.rival).await,
            Err(BoardError::Forbidden(_))
        ));
        assert_eq!(f.jobs.get(&job.id).await.unwrap().title, "Rust Engineer");
    }

    #[tokio::test]
    async fn test_missing_job_is_not_found() {
        let f = fixture().await;
        let err = f.jobs.get("nope").await.unwrap_err();
        assert_eq!(err.to_string(), "Job not found with id: nope");
        assert!(matches!(
            f.jobs.update("nope", draft("x"), &f.owner).await,
            Err(BoardError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_by_owner() {
        let f = fixture().await;
        let job = f.jobs.create(draft("Rust Engineer"), &f.owner).await.unwrap();
        let mut changed = draft("Senior Rust Engineer");
        changed.experience_level = Some(ExperienceLevel::SeniorLevel);
        changed.deadline = Some("2030-01-31T17:00".into());

        let updated = f.jobs.update(&job.id, changed, &f.owner).await.unwrap();
        assert_eq!(updated.title, "Senior Rust Engineer");
        assert_eq!(updated.experience_level, Some(ExperienceLevel::SeniorLevel));
        assert_eq!(updated.deadline.as_deref(), Some("2030-01-31T17:00:00.000000Z"));
        assert!(updated.updated_at >= updated.created_at);
    }

    #[tokio::test]
    async fn test_toggle_reactivation_notifies_once() {
        let mut f = fixture().await;
        let job = f.jobs.create(draft("Rust Engineer"), &f.owner).await.unwrap();
        f.rx.try_recv().unwrap();

        let closed = f.jobs.toggle_status(&job.id, &f.owner).await.unwrap();
        assert!(!closed.is_active);
        assert!(f.rx.try_recv().is_err());
        assert!(f.jobs.list_active().await.unwrap().is_empty());

        let reopened = f.jobs.toggle_status(&job.id, &f.owner).await.unwrap();
        assert!(reopened.is_active);
        assert!(matches!(
            f.rx.try_recv().unwrap(),
            NotificationEvent::JobReactivated { .. }
        ));
    }

    #[tokio::test]
    async fn test_listings_and_search() {
        let f = fixture().await;
        f.jobs.create(draft("Rust Engineer"), &f.owner).await.unwrap();
        let mut contract = draft("Frontend Developer");
        contract.job_type = Some(JobType::Contract);
        contract.salary = Some(40_000.0);
        contract.location = "Lagos".into();
        f.jobs.create(contract, &f.rival).await.unwrap();

        assert_eq!(f.jobs.list_active().await.unwrap().len(), 2);
        let mine = f.jobs.list_by_recruiter(&f.owner.user_id).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].posted_by_name, "owner");
        assert_eq!(mine[0].application_count, 0);

        let by_title = f
            .jobs
            .search(&JobSearch {
                title: Some("rust".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_title.len(), 1);
        assert_eq!(by_title[0].job.title, "Rust Engineer");

        let by_location_and_pay = f
            .jobs
            .search(&JobSearch {
                location: Some("LAG".into()),
                min_salary: Some(50_000.0),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(by_location_and_pay.is_empty());

        let contracts = f
            .jobs
            .filter(&JobFilter {
                job_type: Some(JobType::Contract),
                max_salary: Some(50_000.0),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(contracts.len(), 1);

        assert_eq!(f.jobs.recent(24).await.unwrap().len(), 2);
        assert_eq!(f.jobs.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_recent_rejects_out_of_range_window() {
        let f = fixture().await;
        f.jobs.create(draft("Rust Engineer"), &f.owner).await.unwrap();

        assert_eq!(f.jobs.recent(24).await.unwrap().len(), 1);
        for hours in [9_000_000_000_000_000, i64::MAX] {
            let err = f.jobs.recent(hours).await.unwrap_err();
            assert!(matches!(err, BoardError::Validation { ref field, .. } if field == "hours"));
        }
    }

    #[tokio::test]
    async fn test_delete_by_owner() {
        let f = fixture().await;
        let job = f.jobs.create(draft("Rust Engineer"), &f.owner).await.unwrap();
        f.jobs.delete(&job.id, &f.owner).await.unwrap();
        assert!(matches!(f.jobs.get(&job.id).await, Err(BoardError::NotFound(_))));
    }
}
